//! Move-file schema for the `replay` CLI subcommand: a JSON array of
//! commands, played through the [`crate::engine::Engine`] one at a time.
//! Mirrors `klipper-host`'s gcode-line-by-line batch file, except the host
//! here has no gcode parser of its own, so the file is already the parsed
//! command stream.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::RuntimeError;

/// One entry in a move file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// A non-cutting positioning move to `(x, y)` at feedrate `f` (user
    /// units/min).
    Rapid { x: f64, y: f64, f: f64 },
    /// A cutting move to `(x, y)` at feedrate `f`. Carries the pierce/cut
    /// geometry the Motion Sync sequence needs once the planner signals this
    /// move has become current.
    Line {
        x: f64,
        y: f64,
        f: f64,
        pierce_height: f64,
        pierce_delay_secs: f64,
        clearance_height: f64,
        cut_height: f64,
    },
    /// Requests a feed-hold.
    Feedhold,
    /// Clears a feed-hold and resumes.
    Run,
    /// Feed-hold-then-clear-queue.
    SoftAbort,
    /// Immediate queue clear.
    Abort,
    /// Overrides the scripted ADC reading `ArcVoltageSource` will report
    /// from this point on, simulating a plate-voltage change mid-replay.
    ArcVoltage { raw: u16 },
    /// Overrides when the scripted probe will next report triggered,
    /// counted in Z steps commanded since the override (relative to the
    /// *next* probe move, not the whole replay).
    ProbeTriggerAfter { steps: u32 },
}

/// Loads and parses a move file (one JSON array of [`Command`]).
pub fn load_commands(path: &Path) -> Result<Vec<Command>, RuntimeError> {
    let contents = fs::read_to_string(path).map_err(|e| RuntimeError::MoveFileRead {
        path: path.display().to_string(),
        source: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| RuntimeError::MoveFileParse {
        path: path.display().to_string(),
        source: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json() {
        let cmds = vec![
            Command::Rapid { x: 1.0, y: 2.0, f: 600.0 },
            Command::Line {
                x: 3.0,
                y: 2.0,
                f: 120.0,
                pierce_height: 0.1,
                pierce_delay_secs: 0.3,
                clearance_height: 1.0,
                cut_height: 0.02,
            },
            Command::Feedhold,
            Command::Run,
        ];
        let json = serde_json::to_string(&cmds).unwrap();
        let parsed: Vec<Command> = serde_json::from_str(&json).unwrap();
        assert_eq!(cmds, parsed);
    }

    #[test]
    fn unreadable_path_is_a_move_file_read_error() {
        let err = load_commands(Path::new("/nonexistent/path/does-not-exist.json")).unwrap_err();
        assert!(matches!(err, RuntimeError::MoveFileRead { .. }));
    }

    #[test]
    fn malformed_json_is_a_move_file_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        let err = load_commands(&path).unwrap_err();
        assert!(matches!(err, RuntimeError::MoveFileParse { .. }));
    }
}

//! Runtime configuration loader.
//!
//! Parameterises the configuration surface spec.md §6 enumerates — per-axis
//! step scale/jerk/accel, the torch THC parameters, the sync feed rates, and
//! the two timing constants — from an ini-style file, following
//! `klipper-host`'s `PrinterConfig::load` (`[section] key = value` parsed with
//! `configparser::ini::Ini`) rather than hard-coding the original firmware's
//! `#define`s. Any key absent from the file keeps its `Default`.

use configparser::ini::Ini;
use std::path::Path;

use crate::errors::RuntimeError;
use motion::PlannerConfig;
use torch::controller::TorchConfig;
use torch::sync::SyncConfig;

/// The full runtime configuration: one section per collaborator the spec's
/// configuration surface names.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub planner: PlannerConfig,
    pub torch: TorchConfig,
    pub sync: SyncConfig,
    /// `num_readings` for the ATHC averaging window (bounded by the
    /// controller's compile-time `ADC_CAP`, see [`crate::engine`]).
    pub thc_num_readings: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            planner: PlannerConfig::default(),
            torch: TorchConfig::default(),
            sync: SyncConfig::default(),
            thc_num_readings: 64,
        }
    }
}

impl RuntimeConfig {
    /// Loads configuration from an ini-style file at `path`.
    pub fn load(path: &Path) -> Result<Self, RuntimeError> {
        let mut ini = Ini::new();
        ini.load(path).map_err(|e| RuntimeError::ConfigLoad {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_ini(&ini)
    }

    /// Parses configuration already in memory (used by tests so they don't
    /// have to touch the filesystem).
    pub fn parse(contents: &str) -> Result<Self, RuntimeError> {
        let mut ini = Ini::new();
        ini.read(contents.to_string()).map_err(|e| RuntimeError::ConfigLoad {
            path: "<inline>".to_string(),
            source: e,
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, RuntimeError> {
        let mut cfg = Self::default();

        cfg.planner.step_scale.x = float(ini, "planner", "step_scale_x", cfg.planner.step_scale.x)?;
        cfg.planner.step_scale.y = float(ini, "planner", "step_scale_y", cfg.planner.step_scale.y)?;
        cfg.planner.feed_jerk.x = float(ini, "planner", "feed_jerk_x", cfg.planner.feed_jerk.x)?;
        cfg.planner.feed_jerk.y = float(ini, "planner", "feed_jerk_y", cfg.planner.feed_jerk.y)?;
        cfg.planner.feed_accel.x = float(ini, "planner", "feed_accel_x", cfg.planner.feed_accel.x)?;
        cfg.planner.feed_accel.y = float(ini, "planner", "feed_accel_y", cfg.planner.feed_accel.y)?;
        cfg.planner.min_feed_rate = float(ini, "planner", "min_feed_rate", cfg.planner.min_feed_rate)?;
        cfg.planner.feed_ramp_update_interval_ms = float(
            ini,
            "planner",
            "feed_ramp_update_interval_ms",
            cfg.planner.feed_ramp_update_interval_ms as f64,
        )? as u32;

        cfg.torch.set_voltage = float(ini, "torch", "set_voltage", cfg.torch.set_voltage)?;
        cfg.torch.voltage_tolerance = float(ini, "torch", "voltage_tolerance", cfg.torch.voltage_tolerance)?;
        cfg.torch.comp_velocity = float(ini, "torch", "comp_velocity", cfg.torch.comp_velocity)?;
        cfg.torch.enabled = boolean(ini, "torch", "enabled", cfg.torch.enabled)?;
        cfg.torch.thc_pin = float(ini, "torch", "thc_pin", cfg.torch.thc_pin as f64)? as i32;
        cfg.torch.adc_at_zero = float(ini, "torch", "adc_at_zero", cfg.torch.adc_at_zero as f64)? as i32;
        cfg.torch.adc_at_one_hundred = float(ini, "torch", "adc_at_one_hundred", cfg.torch.adc_at_one_hundred as f64)? as i32;
        cfg.torch.step_scale = float(ini, "torch", "step_scale", cfg.torch.step_scale)?;
        cfg.torch.invert_dir = boolean(ini, "torch", "invert_dir", cfg.torch.invert_dir)?;
        cfg.thc_num_readings = (float(ini, "torch", "num_readings", cfg.thc_num_readings as f64)? as usize).min(20_000);

        cfg.sync.z_rapid_feed = float(ini, "sync", "z_rapid_feed", cfg.sync.z_rapid_feed)?;
        cfg.sync.z_probe_feed = float(ini, "sync", "z_probe_feed", cfg.sync.z_probe_feed)?;
        cfg.sync.floating_head_takeup = float(ini, "sync", "floating_head_takeup", cfg.sync.floating_head_takeup)?;

        Ok(cfg)
    }
}

/// Reads a float key, falling back to `default` when the key is absent.
/// A key that is present but unparsable is reported as `InvalidValue`.
fn float(ini: &Ini, section: &str, key: &str, default: f64) -> Result<f64, RuntimeError> {
    ini.getfloat(section, key)
        .map_err(|message| RuntimeError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            message,
        })
        .map(|opt| opt.unwrap_or(default))
}

/// As [`float`], but for boolean keys (`true`/`false`/`1`/`0`/`yes`/`no`,
/// whatever `configparser`'s `getbool` accepts).
fn boolean(ini: &Ini, section: &str, key: &str, default: bool) -> Result<bool, RuntimeError> {
    ini.getbool(section, key)
        .map_err(|message| RuntimeError::InvalidValue {
            section: section.to_string(),
            key: key.to_string(),
            message,
        })
        .map(|opt| opt.unwrap_or(default))
}

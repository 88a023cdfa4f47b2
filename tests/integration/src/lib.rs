//! Cross-crate integration coverage for the motion planner and torch
//! controller. No production code lives here — this package exists only so
//! `tests/motion_integration_test.rs` has a home cargo will actually build
//! and run as part of the workspace (a bare file under `tests/` with no
//! owning package is never discovered by `cargo test --workspace`).

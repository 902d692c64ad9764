// src/config/mod.rs

//! Configuration loading and validation for specflow.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load an experiment file from disk (`loader.rs`).
//! - Validate and normalise it into [`model::ExperimentConfig`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{
    BatchParams, BatchSection, CalibrationParams, CalibrationSection, ExperimentConfig,
    ExposureParams, ExposureSection, FileNaming, LampSwitch, PositionParams, RangeSection,
    RawExperimentFile, StageParams, StageSection, SweepParams, SweepSection,
};

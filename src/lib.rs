pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod models;
pub mod utils;

pub use adapters::LocalStorage;
pub use app::{ScoringPipeline, TrainingPipeline};
#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;
pub use core::engine::PipelineEngine;
pub use utils::error::{ChurnError, Result};

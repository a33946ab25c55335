pub mod config;
pub mod core;
pub mod domain;
pub mod render;
pub mod utils;

pub use config::{cli::LocalStorage, toml_config::AnalysisConfig};
#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use core::{engine::AnalysisEngine, pipeline::AnalysisPipeline};
pub use utils::error::{AnalysisError, Result};

pub mod aggregate;
pub mod archive;
pub mod engine;
pub mod friendship;
pub mod loader;
pub mod pipeline;
pub mod preferences;
pub mod survey;

pub use crate::domain::ports::{ConfigProvider, PhaseSummary, Pipeline, Storage};
pub use crate::utils::error::Result;

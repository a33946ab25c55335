use crate::utils::error::Result;
use std::path::{Path, PathBuf};

pub trait Storage {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()>;
    /// Recursively copies `from` into `to`, both relative to the storage root.
    fn copy_tree(&self, from: &Path, to: &Path) -> Result<usize>;
    fn resolve(&self, path: &Path) -> PathBuf;
}

/// Paths are relative to the storage root.
pub trait ConfigProvider {
    fn archives_dir(&self) -> &Path;
    fn data_dir(&self) -> &Path;
    fn results_dir(&self) -> &Path;
    fn friendship_file(&self) -> &Path;
    fn charts_enabled(&self) -> bool;
    fn chart_size(&self) -> (u32, u32);
}

pub trait Pipeline {
    type Extracted: PhaseSummary;
    type Transformed: PhaseSummary;

    fn extract(&self) -> Result<Self::Extracted>;
    fn transform(&self, data: Self::Extracted) -> Result<Self::Transformed>;
    fn load(&self, result: Self::Transformed) -> Result<String>;
}

/// Summary counts the engine logs between phases.
pub trait PhaseSummary {
    fn summary(&self) -> String;
}


use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AnalysisError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Optional `analysis.toml` next to the experiment folders. Every field has a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub paths: PathsConfig,
    pub charts: ChartsConfig,
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub archives: PathBuf,
    pub data: PathBuf,
    pub results: PathBuf,
    pub raw: PathBuf,
    pub staging: PathBuf,
    pub friendship: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            archives: PathBuf::from("Archives"),
            data: PathBuf::from("Data"),
            results: PathBuf::from("Results"),
            raw: PathBuf::from("Raw"),
            staging: PathBuf::from("Exps"),
            friendship: PathBuf::from("friendship.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartsConfig {
    pub enabled: bool,
    pub width: u32,
    pub height: u32,
}

impl Default for ChartsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            width: 1200,
            height: 800,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl AnalysisConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${RESULTS_DIR})
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").expect("static regex");

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        result.to_string()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }
}

impl ConfigProvider for AnalysisConfig {
    fn archives_dir(&self) -> &Path {
        &self.paths.archives
    }

    fn data_dir(&self) -> &Path {
        &self.paths.data
    }

    fn results_dir(&self) -> &Path {
        &self.paths.results
    }

    fn friendship_file(&self) -> &Path {
        &self.paths.friendship
    }

    fn charts_enabled(&self) -> bool {
        self.charts.enabled
    }

    fn chart_size(&self) -> (u32, u32) {
        (self.charts.width, self.charts.height)
    }
}

fn path_field(field: &str, path: &Path) -> Result<()> {
    let as_str = path.to_str().ok_or_else(|| AnalysisError::InvalidConfigValueError {
        field: field.to_string(),
        value: path.to_string_lossy().into_owned(),
        reason: "Path is not valid UTF-8".to_string(),
    })?;
    validation::validate_path(field, as_str)
}

impl Validate for AnalysisConfig {
    fn validate(&self) -> Result<()> {
        path_field("paths.archives", &self.paths.archives)?;
        path_field("paths.data", &self.paths.data)?;
        path_field("paths.results", &self.paths.results)?;
        path_field("paths.raw", &self.paths.raw)?;
        path_field("paths.staging", &self.paths.staging)?;
        path_field("paths.friendship", &self.paths.friendship)?;

        validation::validate_positive_number("charts.width", self.charts.width as usize, 200)?;
        validation::validate_positive_number("charts.height", self.charts.height as usize, 150)?;

        if self.paths.data == self.paths.results {
            return Err(AnalysisError::InvalidConfigValueError {
                field: "paths.results".to_string(),
                value: self.paths.results.display().to_string(),
                reason: "Results must not share a directory with extracted data".to_string(),
            });
        }

        Ok(())
    }
}

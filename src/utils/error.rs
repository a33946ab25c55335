use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unrecognised archive name '{name}'")]
    ArchiveNameError { name: String },

    #[error("Malformed data in {file}: {message}")]
    DataFormatError { file: String, message: String },

    #[error("No data for {experiment} at {axis_value}")]
    MissingExperimentError {
        experiment: String,
        axis_value: u32,
    },

    #[error("Chart rendering failed for {chart}: {message}")]
    PlotError { chart: String, message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Data,
    Rendering,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnalysisError {
    pub fn data_format(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataFormatError {
            file: file.into(),
            message: message.into(),
        }
    }

    pub fn plot(chart: impl Into<String>, message: impl ToString) -> Self {
        Self::PlotError {
            chart: chart.into(),
            message: message.to_string(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::ArchiveNameError { .. } | Self::ZipError(_) => ErrorCategory::Input,
            Self::DataFormatError { .. }
            | Self::MissingExperimentError { .. }
            | Self::CsvError(_)
            | Self::ProcessingError { .. } => ErrorCategory::Data,
            Self::PlotError { .. } => ErrorCategory::Rendering,
            Self::IoError(_) | Self::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 圖表失敗不影響已寫出的表格結果
            ErrorCategory::Rendering => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Input | ErrorCategory::Data => {
                ErrorSeverity::High
            }
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::MissingConfigError { field } => {
                format!("Set '{}' in the config file or on the command line", field)
            }
            Self::InvalidConfigValueError { field, .. } => {
                format!("Check the value of '{}'", field)
            }
            Self::TomlError(_) => "Make sure the config file is valid TOML".to_string(),
            Self::ArchiveNameError { .. } => {
                "Archives must be named courseAlgo_<date>_<agents|courseLimit>_x<weight>.zip"
                    .to_string()
            }
            Self::ZipError(_) => "Re-create the archive; it may be truncated".to_string(),
            Self::DataFormatError { file, .. } => format!(
                "Each row of {} must hold seven numeric columns: utility,courses,gini,friends,first_agent,mid_agent,last_agent",
                file
            ),
            Self::MissingExperimentError { experiment, .. } => format!(
                "Every archive must contain the same axis values; check the {} results",
                experiment
            ),
            Self::CsvError(_) | Self::ProcessingError { .. } => {
                "Inspect the input CSV files for malformed rows".to_string()
            }
            Self::PlotError { .. } => {
                "Re-run with --no-charts, or install a sans-serif system font".to_string()
            }
            Self::IoError(_) => "Check that the directories exist and are writable".to_string(),
            Self::SerializationError(_) => "Report this as a bug".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Could not read the result archives: {}", self),
            ErrorCategory::Data => format!("Experiment data is invalid: {}", self),
            ErrorCategory::Rendering => format!("Charts could not be drawn: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

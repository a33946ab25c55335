use crate::utils::error::{AnalysisError, Result};

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AnalysisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(AnalysisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(AnalysisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AnalysisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AnalysisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

/// Archive dates become directory names, so they may not contain separators.
pub fn validate_date_token(field_name: &str, value: &str) -> Result<()> {
    validate_non_empty_string(field_name, value)?;
    if value.contains(['_', '/', '\\']) {
        return Err(AnalysisError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot contain '_', '/' or '\\'".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_path() {
        assert!(validate_path("paths.archives", "Archives").is_ok());
        assert!(validate_path("paths.archives", "").is_err());
        assert!(validate_path("paths.archives", "bad\0path").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("charts.width", 1200, 100).is_ok());
        assert!(validate_positive_number("charts.width", 10, 100).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("prepare.weight", 2u32, 1, 100).is_ok());
        assert!(validate_range("prepare.weight", 0u32, 1, 100).is_err());
    }

    #[test]
    fn test_validate_date_token() {
        assert!(validate_date_token("pack.date", "2022-05-01").is_ok());
        assert!(validate_date_token("pack.date", "2022_05_01").is_err());
        assert!(validate_date_token("pack.date", "  ").is_err());
    }
}

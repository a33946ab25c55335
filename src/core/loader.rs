use crate::domain::model::{Axis, Experiment, ExperimentRow, Metric};
use crate::utils::error::{AnalysisError, Result};
use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

const AGENT_DIR_SUFFIX: &str = "_Agent";

/// Experiment name for an `<Name>_Agent` directory. The iterative agent is reported as RSD.
pub fn experiment_name(dir_name: &str, unary: bool) -> Option<String> {
    let base = dir_name.strip_suffix(AGENT_DIR_SUFFIX)?;
    let base = base.replace("Iterative", "RSD");
    Some(if unary && !base.ends_with("_Unary") {
        format!("{}_Unary", base)
    } else {
        base
    })
}

/// Axis value encoded as the integer prefix of a result file, e.g. `10agents.csv`.
pub fn axis_value_from_file(file_name: &str, axis: Axis) -> Result<u32> {
    let prefix = file_name
        .find(axis.name())
        .map(|idx| &file_name[..idx])
        .ok_or_else(|| {
            AnalysisError::data_format(file_name, format!("file name does not contain '{}'", axis))
        })?;

    prefix.parse::<u32>().map_err(|_| {
        AnalysisError::data_format(file_name, format!("'{}' is not an integer prefix", prefix))
    })
}

/// Averages every metric column of a header-less result CSV.
pub fn average_runs<R: Read>(reader: R, source: &str) -> Result<[f64; 7]> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut sums = [0.0f64; 7];
    let mut count = 0usize;

    for (line, record) in csv_reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        if record.len() != Metric::ALL.len() {
            return Err(AnalysisError::data_format(
                source,
                format!(
                    "row {} has {} columns, expected {}",
                    line + 1,
                    record.len(),
                    Metric::ALL.len()
                ),
            ));
        }

        for (sum, (field, metric)) in sums.iter_mut().zip(record.iter().zip(Metric::ALL)) {
            let value: f64 = field.parse().map_err(|_| {
                AnalysisError::data_format(
                    source,
                    format!("row {} {}: '{}' is not a number", line + 1, metric, field),
                )
            })?;
            *sum += value;
        }
        count += 1;
    }

    if count == 0 {
        return Err(AnalysisError::data_format(source, "file contains no runs"));
    }

    Ok(sums.map(|sum| sum / count as f64))
}

fn load_experiment_dir(dir: &Path, name: &str, axis: Axis) -> Result<Experiment> {
    let mut rows = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().into_owned();
        let axis_value = axis_value_from_file(&file_name, axis)?;
        let source = entry.path().display().to_string();
        let values = average_runs(fs::File::open(entry.path())?, &source)?;
        rows.push(ExperimentRow { axis_value, values });
    }

    Ok(Experiment::new(name, rows))
}

/// Loads every `*_Agent` directory under `data_dir` into experiments keyed by name.
pub fn load_experiments(
    data_dir: &Path,
    axis: Axis,
    unary: bool,
) -> Result<BTreeMap<String, Experiment>> {
    let mut experiments = BTreeMap::new();

    for entry in fs::read_dir(data_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }

        let dir_name = entry.file_name().to_string_lossy().into_owned();
        let Some(name) = experiment_name(&dir_name, unary) else {
            tracing::debug!("Skipping non-agent directory {}", dir_name);
            continue;
        };

        let experiment = load_experiment_dir(&entry.path(), &name, axis)?;
        tracing::debug!(
            "Loaded {} with {} {} points",
            experiment.name,
            experiment.rows.len(),
            axis
        );
        experiments.insert(name, experiment);
    }

    Ok(experiments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_experiment_name() {
        assert_eq!(experiment_name("DSA_RC_Agent", false).as_deref(), Some("DSA_RC"));
        assert_eq!(experiment_name("Iterative_Agent", false).as_deref(), Some("RSD"));
        assert_eq!(experiment_name("HBS_Agent", true).as_deref(), Some("HBS_Unary"));
        assert_eq!(experiment_name("HBS_Unary_Agent", true).as_deref(), Some("HBS_Unary"));
        assert_eq!(experiment_name("plots", false), None);
    }

    #[test]
    fn test_axis_value_from_file() {
        assert_eq!(axis_value_from_file("10agents.csv", Axis::Agents).unwrap(), 10);
        assert_eq!(axis_value_from_file("3courseLimit.csv", Axis::CourseLimit).unwrap(), 3);
        assert!(axis_value_from_file("10agents.csv", Axis::CourseLimit).is_err());
        assert!(axis_value_from_file("tenagents.csv", Axis::Agents).is_err());
    }

    #[test]
    fn test_average_runs() {
        let data = "10,1,0.2,4,3,2,1\n20,3,0.4,6,5,4,3\n";
        let averages = average_runs(data.as_bytes(), "test.csv").unwrap();
        assert_eq!(averages[0], 15.0);
        assert_eq!(averages[1], 2.0);
        assert!((averages[2] - 0.3).abs() < 1e-12);
        assert_eq!(averages[6], 2.0);
    }

    #[test]
    fn test_average_runs_rejects_bad_rows() {
        let short = average_runs("1,2,3\n".as_bytes(), "short.csv");
        assert!(matches!(short, Err(AnalysisError::DataFormatError { .. })));

        let text = average_runs("1,2,3,4,5,6,x\n".as_bytes(), "text.csv");
        assert!(text.unwrap_err().to_string().contains("last_agent"));

        assert!(average_runs("".as_bytes(), "empty.csv").is_err());
    }

    #[test]
    fn test_load_experiments() {
        let dir = TempDir::new().unwrap();
        let dsa = dir.path().join("DSA_Agent");
        let rsd = dir.path().join("Iterative_Agent");
        fs::create_dir_all(dsa.join("nested")).unwrap();
        fs::create_dir_all(&rsd).unwrap();
        fs::create_dir_all(dir.path().join("leftovers")).unwrap();
        fs::write(dsa.join("20agents.csv"), "4,0,0.1,2,3,3,3\n").unwrap();
        fs::write(dsa.join("10agents.csv"), "2,0,0.2,1,1,1,1\n4,0,0.2,1,1,1,1\n").unwrap();
        fs::write(rsd.join("10agents.csv"), "1,1,1,1,1,1,1\n").unwrap();

        let experiments = load_experiments(dir.path(), Axis::Agents, false).unwrap();
        assert_eq!(experiments.len(), 2);

        let dsa = &experiments["DSA"];
        assert!(!dsa.unary);
        assert_eq!(dsa.axis_values(), vec![10, 20]);
        assert_eq!(dsa.rows[0].get(Metric::Utility), 3.0);
        assert!(experiments.contains_key("RSD"));
    }
}

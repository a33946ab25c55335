use crate::domain::model::{Algorithm, ArchiveRun, Experiment, Metric};
use crate::utils::error::{AnalysisError, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Area under a piecewise-linear curve, rounded to two decimals.
pub fn trapezoid_area(points: &[(f64, f64)]) -> f64 {
    let area: f64 = points
        .windows(2)
        .map(|w| {
            let ((x1, y1), (x2, y2)) = (w[0], w[1]);
            (x2 - x1) * (y1 + y2) / 2.0
        })
        .sum();
    (area * 100.0).round() / 100.0
}

impl Experiment {
    pub fn compute_areas(&mut self) {
        for metric in Metric::ALL {
            let area = trapezoid_area(&self.series(metric));
            self.area.insert(metric, area);
        }
    }
}

/// `Area.csv`: one row per `(row name, experiment)`, one column per metric.
///
/// Areas are always written with a decimal point (`3.0`, `0.4`).
pub fn area_table_csv<'a, I>(rows: I) -> Result<String>
where
    I: IntoIterator<Item = (&'a str, &'a Experiment)>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["algorithms".to_string()];
    header.extend(Metric::ALL.iter().map(|m| m.name().to_string()));
    writer.write_record(&header)?;

    for (name, experiment) in rows {
        let mut record = vec![name.to_string()];
        for metric in Metric::ALL {
            let area = experiment.area.get(&metric).copied().unwrap_or(0.0);
            record.push(format!("{:?}", area));
        }
        writer.write_record(&record)?;
    }

    let bytes = writer.into_inner().map_err(|e| AnalysisError::ProcessingError {
        message: format!("failed to flush area table: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| AnalysisError::ProcessingError {
        message: e.to_string(),
    })
}

/// Every algorithm's experiment per weight tag, across all archives of one axis.
#[derive(Debug, Clone, Default)]
pub struct CombinedExperiments {
    by_algorithm: BTreeMap<Algorithm, BTreeMap<u32, Experiment>>,
}

impl CombinedExperiments {
    /// Binary experiments are filed under their archive's weight, unary ones under weight 0.
    pub fn from_runs<'a, I>(runs: I) -> Self
    where
        I: IntoIterator<Item = &'a ArchiveRun>,
    {
        let mut combined = Self::default();
        for run in runs {
            for experiment in run.experiments.values() {
                let Some(algorithm) = experiment.algorithm() else {
                    tracing::warn!("⚠️ Unknown algorithm '{}' ignored", experiment.name);
                    continue;
                };
                let weight = if experiment.unary {
                    0
                } else {
                    run.archive.weight
                };
                combined
                    .by_algorithm
                    .entry(algorithm)
                    .or_default()
                    .insert(weight, experiment.clone());
            }
        }
        combined
    }

    pub fn is_empty(&self) -> bool {
        self.by_algorithm.is_empty()
    }

    pub fn weights(&self) -> Vec<u32> {
        let set: BTreeSet<u32> = self
            .by_algorithm
            .values()
            .flat_map(|w| w.keys().copied())
            .collect();
        set.into_iter().collect()
    }

    pub fn index_values(&self) -> Vec<u32> {
        let set: BTreeSet<u32> = self
            .by_algorithm
            .values()
            .flat_map(|w| w.values())
            .flat_map(|e| e.axis_values())
            .collect();
        set.into_iter().collect()
    }

    /// Experiments of one algorithm in ascending weight order.
    pub fn weights_of(&self, algorithm: Algorithm) -> impl Iterator<Item = (u32, &Experiment)> {
        self.by_algorithm
            .get(&algorithm)
            .into_iter()
            .flat_map(|w| w.iter().map(|(weight, exp)| (*weight, exp)))
    }

    pub fn get(&self, algorithm: Algorithm, weight: u32) -> Option<&Experiment> {
        self.by_algorithm.get(&algorithm)?.get(&weight)
    }

    pub fn metric_at(
        &self,
        algorithm: Algorithm,
        weight: u32,
        axis_value: u32,
        metric: Metric,
    ) -> Result<f64> {
        self.get(algorithm, weight)
            .ok_or_else(|| AnalysisError::MissingExperimentError {
                experiment: format!("{}x{}", algorithm, weight),
                axis_value,
            })?
            .value_at(axis_value, metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ArchiveName, Axis, ExperimentRow};

    fn experiment(name: &str, points: &[(u32, f64)]) -> Experiment {
        let rows = points
            .iter()
            .map(|&(axis_value, v)| ExperimentRow {
                axis_value,
                values: [v; 7],
            })
            .collect();
        Experiment::new(name, rows)
    }

    fn run(weight: u32, experiments: Vec<Experiment>) -> ArchiveRun {
        ArchiveRun {
            archive: ArchiveName {
                date: "2022-05-01".to_string(),
                axis: Axis::CourseLimit,
                tag: format!("x{}", weight),
                weight,
            },
            experiments: experiments.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }

    #[test]
    fn test_trapezoid_area() {
        assert_eq!(trapezoid_area(&[(10.0, 2.0), (20.0, 4.0), (30.0, 4.0)]), 70.0);
        assert_eq!(trapezoid_area(&[(1.0, 1.0 / 3.0), (2.0, 0.0)]), 0.17);
        assert_eq!(trapezoid_area(&[(1.0, 5.0)]), 0.0);
        assert_eq!(trapezoid_area(&[]), 0.0);
    }

    #[test]
    fn test_area_table_csv() {
        let mut exp = experiment("DSA", &[(1, 1.0), (3, 2.0)]);
        exp.compute_areas();
        assert_eq!(exp.area[&Metric::Gini], 3.0);

        let mut unary = experiment("HBS_Unary", &[(1, 0.25), (2, 0.5)]);
        unary.compute_areas();

        let table = area_table_csv([("DSA", &exp), ("HBS", &unary)]).unwrap();
        let mut lines = table.lines();
        assert_eq!(
            lines.next().unwrap(),
            "algorithms,utility,courses,gini,friends,first_agent,mid_agent,last_agent"
        );
        assert_eq!(lines.next().unwrap(), "DSA,3.0,3.0,3.0,3.0,3.0,3.0,3.0");
        assert_eq!(lines.next().unwrap(), "HBS,0.38,0.38,0.38,0.38,0.38,0.38,0.38");
    }

    #[test]
    fn test_combined_files_unary_under_weight_zero() {
        let runs = vec![
            run(0, vec![experiment("HBS_Unary", &[(1, 1.0)])]),
            run(
                2,
                vec![
                    experiment("HBS", &[(1, 5.0), (2, 6.0)]),
                    experiment("HBS_Unary", &[(1, 1.0)]),
                ],
            ),
            run(1, vec![experiment("HBS", &[(1, 3.0)])]),
        ];

        let combined = CombinedExperiments::from_runs(&runs);
        assert_eq!(combined.weights(), vec![0, 1, 2]);
        assert_eq!(combined.index_values(), vec![1, 2]);

        let weights: Vec<u32> = combined.weights_of(Algorithm::Hbs).map(|(w, _)| w).collect();
        assert_eq!(weights, vec![0, 1, 2]);

        assert_eq!(
            combined.metric_at(Algorithm::Hbs, 2, 2, Metric::Utility).unwrap(),
            6.0
        );
        assert!(combined.metric_at(Algorithm::Hbs, 1, 2, Metric::Utility).is_err());
        assert!(combined.metric_at(Algorithm::Dsa, 1, 1, Metric::Utility).is_err());
    }
}

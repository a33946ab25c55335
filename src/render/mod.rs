//! Comparison charts for experiment results.
//!
//! Every chart lands under `<results>/<Axis>/...` with the same layout the
//! study's notebooks expect:
//!
//! ```text
//! Friendship/{Included,Excluded}/<metric>_fig.png
//! Groups/Group<i>/<metric>_fig.png
//! Experiments/Group<i>/<metric>_fig.png
//! Utility/<axis>-<value>_fig.png
//! Combined/Total/<Algo>_fig.png, Combined/Total/Group-<i>.png
//! Combined/<Metric>/<axis>-<value>_fig.png
//! Reversed/<Metric>/<axis>-<value>_fig.png
//! ```

pub mod bar;
pub mod line;
pub mod style;

use crate::core::aggregate::CombinedExperiments;
use crate::domain::model::{Algorithm, ArchiveRun, Axis, Experiment, MarkerShape, Metric};
use crate::utils::error::Result;
use bar::{draw_bar_chart, BarChartSpec, BarSeriesSpec};
use line::{draw_line_chart, LineChartSpec, LineSeriesSpec};
use std::fs;
use std::path::{Path, PathBuf};
use style::{algorithm_color, palette};

/// Creates the full result tree for both axes.
pub fn create_result_dirs(results_root: &Path) -> Result<()> {
    for axis in Axis::ALL {
        let base = results_root.join(axis.dir_name());
        let mut dirs = vec![
            base.join("Friendship/Included"),
            base.join("Friendship/Excluded"),
            base.join("Utility"),
            base.join("Combined/Total"),
        ];
        for group in 1..=Algorithm::GROUPS.len() {
            dirs.push(base.join(format!("Groups/Group{}", group)));
            dirs.push(base.join(format!("Experiments/Group{}", group)));
        }
        for metric in Metric::ALL {
            dirs.push(base.join("Combined").join(metric.dir_name()));
            dirs.push(base.join("Reversed").join(metric.dir_name()));
        }
        for dir in dirs {
            fs::create_dir_all(dir)?;
        }
    }
    Ok(())
}

/// Either kind of chart the renderer knows how to draw.
#[derive(Debug, Clone)]
pub enum ChartSpec {
    Line(LineChartSpec),
    Bar(BarChartSpec),
}

impl ChartSpec {
    /// Legend entries in drawing order. Unlabelled line series are skipped.
    pub fn labels(&self) -> Vec<&str> {
        match self {
            ChartSpec::Line(spec) => spec
                .series
                .iter()
                .filter_map(|s| s.label.as_deref())
                .collect(),
            ChartSpec::Bar(spec) => spec.series.iter().map(|s| s.label.as_str()).collect(),
        }
    }
}

/// A chart and the file it is drawn to.
#[derive(Debug, Clone)]
pub struct PlannedChart {
    pub path: PathBuf,
    pub spec: ChartSpec,
}

impl PlannedChart {
    fn line(path: PathBuf, spec: LineChartSpec) -> Self {
        Self {
            path,
            spec: ChartSpec::Line(spec),
        }
    }

    fn bar(path: PathBuf, spec: BarChartSpec) -> Self {
        Self {
            path,
            spec: ChartSpec::Bar(spec),
        }
    }

    pub fn draw(&self, size: (u32, u32)) -> Result<()> {
        match &self.spec {
            ChartSpec::Line(spec) => draw_line_chart(&self.path, size, spec),
            ChartSpec::Bar(spec) => draw_bar_chart(&self.path, size, spec),
        }
    }
}

pub struct ChartRenderer {
    results_root: PathBuf,
    size: (u32, u32),
}

impl ChartRenderer {
    pub fn new(results_root: impl Into<PathBuf>, size: (u32, u32)) -> Self {
        Self {
            results_root: results_root.into(),
            size,
        }
    }

    fn axis_dir(&self, axis: Axis) -> PathBuf {
        self.results_root.join(axis.dir_name())
    }

    fn draw_all(&self, charts: &[PlannedChart]) -> Result<()> {
        for chart in charts {
            chart.draw(self.size)?;
        }
        tracing::debug!("🖼️ Drew {} charts", charts.len());
        Ok(())
    }

    fn line_series(
        experiment: &Experiment,
        metric: Metric,
        label: String,
        dashed: bool,
    ) -> LineSeriesSpec {
        let algorithm = experiment.algorithm();
        LineSeriesSpec {
            label: Some(label),
            points: experiment.series(metric),
            color: algorithm.map(algorithm_color).unwrap_or_else(|| palette(0)),
            marker: algorithm.map(|a| a.marker()).unwrap_or(MarkerShape::Circle),
            dashed,
        }
    }

    /// Friendship-aware experiments, one line per algorithm.
    pub fn binary_charts(&self, run: &ArchiveRun) -> Vec<PlannedChart> {
        let axis = run.archive.axis;
        Metric::ALL
            .iter()
            .map(|&metric| {
                let mut spec = LineChartSpec::new(axis.label(), metric.description());
                for experiment in run.experiments.values().filter(|e| !e.unary) {
                    spec.push(Self::line_series(
                        experiment,
                        metric,
                        experiment.name.clone(),
                        false,
                    ));
                }
                let path = self
                    .axis_dir(axis)
                    .join(format!("Friendship/Included/{}_fig.png", metric));
                PlannedChart::line(path, spec)
            })
            .collect()
    }

    /// Friendship-blind experiments, dashed and labelled by their base algorithm.
    pub fn unary_charts(&self, run: &ArchiveRun) -> Vec<PlannedChart> {
        let axis = run.archive.axis;
        Metric::ALL
            .iter()
            .map(|&metric| {
                let mut spec = LineChartSpec::new(axis.label(), metric.description());
                for experiment in run.experiments.values().filter(|e| e.unary) {
                    let label = experiment.base_name().to_string();
                    spec.push(Self::line_series(experiment, metric, label, true));
                }
                let path = self
                    .axis_dir(axis)
                    .join(format!("Friendship/Excluded/{}_fig.png", metric));
                PlannedChart::line(path, spec)
            })
            .collect()
    }

    /// Each group's algorithms with (solid) and without (dashed) friendship.
    pub fn unary_vs_binary_charts(&self, run: &ArchiveRun) -> Vec<PlannedChart> {
        let axis = run.archive.axis;
        let mut charts = Vec::new();
        for (g, group) in Algorithm::GROUPS.iter().enumerate() {
            for metric in Metric::ALL {
                let mut spec = LineChartSpec::new(axis.label(), metric.description());
                for &algorithm in group {
                    if let Some(experiment) = run.binary(algorithm) {
                        spec.push(Self::line_series(
                            experiment,
                            metric,
                            format!("{} (w)", algorithm),
                            false,
                        ));
                    }
                }
                for &algorithm in group {
                    match run.unary(algorithm) {
                        Some(experiment) => spec.push(Self::line_series(
                            experiment,
                            metric,
                            format!("{} (w/o)", algorithm),
                            true,
                        )),
                        None => tracing::warn!(
                            "⚠️ No friendship-blind run of {} for {}",
                            algorithm,
                            run.archive.file_name()
                        ),
                    }
                }
                let path = self
                    .axis_dir(axis)
                    .join(format!("Groups/Group{}/{}_fig.png", g + 1, metric));
                charts.push(PlannedChart::line(path, spec));
            }
        }
        charts
    }

    /// Per group and metric: axis values on x, one bar per algorithm.
    pub fn histogram_charts(
        &self,
        run: &ArchiveRun,
        axis_values: &[u32],
    ) -> Result<Vec<PlannedChart>> {
        let axis = run.archive.axis;
        let categories: Vec<String> = axis_values.iter().map(|v| v.to_string()).collect();
        let mut charts = Vec::new();

        for (g, group) in Algorithm::GROUPS.iter().enumerate() {
            for metric in Metric::ALL {
                let mut spec = BarChartSpec::new(categories.clone()).with_labels(
                    Some(axis.histogram_label()),
                    Some(metric.histogram_label().as_str()),
                );
                for &algorithm in group {
                    let Some(experiment) = run.binary(algorithm).or_else(|| run.unary(algorithm))
                    else {
                        continue;
                    };
                    let values = axis_values
                        .iter()
                        .map(|&v| experiment.value_at(v, metric))
                        .collect::<Result<Vec<f64>>>()?;
                    spec.push(BarSeriesSpec {
                        label: algorithm.to_string(),
                        values,
                        color: algorithm_color(algorithm),
                    });
                }
                let path = self
                    .axis_dir(axis)
                    .join(format!("Experiments/Group{}/{}_fig.png", g + 1, metric));
                charts.push(PlannedChart::bar(path, spec));
            }
        }
        Ok(charts)
    }

    /// Per axis value: algorithms on x, bars for the first, middle and last agent.
    pub fn position_bar_charts(
        &self,
        run: &ArchiveRun,
        axis_values: &[u32],
    ) -> Result<Vec<PlannedChart>> {
        let axis = run.archive.axis;
        let algorithms: Vec<(Algorithm, &Experiment)> = Algorithm::ALL
            .iter()
            .filter_map(|&a| run.binary(a).or_else(|| run.unary(a)).map(|e| (a, e)))
            .collect();
        let categories: Vec<String> = algorithms.iter().map(|(a, _)| a.to_string()).collect();
        let mut charts = Vec::new();

        for &value in axis_values {
            let mut spec = BarChartSpec::new(categories.clone());
            for (i, metric) in Metric::POSITIONS.iter().enumerate() {
                let values = algorithms
                    .iter()
                    .map(|(_, e)| e.value_at(value, *metric))
                    .collect::<Result<Vec<f64>>>()?;
                spec.push(BarSeriesSpec {
                    label: metric.position_label(),
                    values,
                    color: palette(i),
                });
            }
            let path = self
                .axis_dir(axis)
                .join(format!("Utility/{}-{}_fig.png", axis, value));
            charts.push(PlannedChart::bar(path, spec));
        }
        Ok(charts)
    }

    /// Utility across weights: one chart per algorithm and one per group.
    pub fn utility_charts(&self, combined: &CombinedExperiments, axis: Axis) -> Vec<PlannedChart> {
        let total_dir = self.axis_dir(axis).join("Combined/Total");
        let mut charts = Vec::new();

        for algorithm in Algorithm::ALL {
            let mut spec = LineChartSpec::new(axis.label(), Metric::Utility.description());
            for (i, (weight, experiment)) in combined.weights_of(algorithm).enumerate() {
                spec.push(LineSeriesSpec {
                    label: Some(format!("{}x{}", algorithm, weight)),
                    points: experiment.series(Metric::Utility),
                    color: palette(i),
                    marker: algorithm.marker(),
                    dashed: false,
                });
            }
            charts.push(PlannedChart::line(
                total_dir.join(format!("{}_fig.png", algorithm)),
                spec,
            ));
        }

        for (g, group) in Algorithm::GROUPS.iter().enumerate() {
            let mut spec = LineChartSpec::new(axis.label(), Metric::Utility.description());
            for &algorithm in group {
                // 每個演算法只標註第一條線
                for (i, (_, experiment)) in combined.weights_of(algorithm).enumerate() {
                    spec.push(LineSeriesSpec {
                        label: (i == 0).then(|| algorithm.to_string()),
                        points: experiment.series(Metric::Utility),
                        color: algorithm_color(algorithm),
                        marker: algorithm.marker(),
                        dashed: false,
                    });
                }
            }
            charts.push(PlannedChart::line(
                total_dir.join(format!("Group-{}.png", g + 1)),
                spec,
            ));
        }
        charts
    }

    /// Per axis value and metric: algorithms on x, one bar per weight.
    pub fn combined_charts(
        &self,
        combined: &CombinedExperiments,
        axis: Axis,
    ) -> Result<Vec<PlannedChart>> {
        let weights = combined.weights();
        let categories: Vec<String> = Algorithm::ALL.iter().map(|a| a.to_string()).collect();
        let mut charts = Vec::new();

        for value in combined.index_values() {
            for metric in Metric::ALL {
                let mut spec = BarChartSpec::new(categories.clone())
                    .with_labels(None, Some(metric.description()));
                for (i, &weight) in weights.iter().enumerate() {
                    let values = Algorithm::ALL
                        .iter()
                        .map(|&a| combined.metric_at(a, weight, value, metric))
                        .collect::<Result<Vec<f64>>>()?;
                    spec.push(BarSeriesSpec {
                        label: format!("w={}", weight),
                        values,
                        color: palette(i),
                    });
                }
                let path = self
                    .axis_dir(axis)
                    .join("Combined")
                    .join(metric.dir_name())
                    .join(format!("{}-{}_fig.png", axis, value));
                charts.push(PlannedChart::bar(path, spec));
            }
        }
        Ok(charts)
    }

    /// Per axis value and metric: weights on x, one bar per algorithm.
    pub fn reversed_charts(
        &self,
        combined: &CombinedExperiments,
        axis: Axis,
    ) -> Result<Vec<PlannedChart>> {
        let weights = combined.weights();
        let categories: Vec<String> = weights.iter().map(|w| format!("w={}", w)).collect();
        let mut charts = Vec::new();

        for value in combined.index_values() {
            for metric in Metric::ALL {
                let mut spec = BarChartSpec::new(categories.clone())
                    .with_labels(None, Some(metric.description()));
                for algorithm in Algorithm::ALL {
                    let values = weights
                        .iter()
                        .map(|&w| combined.metric_at(algorithm, w, value, metric))
                        .collect::<Result<Vec<f64>>>()?;
                    spec.push(BarSeriesSpec {
                        label: algorithm.to_string(),
                        values,
                        color: algorithm_color(algorithm),
                    });
                }
                let path = self
                    .axis_dir(axis)
                    .join("Reversed")
                    .join(metric.dir_name())
                    .join(format!("{}-{}_fig.png", axis, value));
                charts.push(PlannedChart::bar(path, spec));
            }
        }
        Ok(charts)
    }

    pub fn plot_binary(&self, run: &ArchiveRun) -> Result<()> {
        self.draw_all(&self.binary_charts(run))
    }

    pub fn plot_unary(&self, run: &ArchiveRun) -> Result<()> {
        self.draw_all(&self.unary_charts(run))
    }

    pub fn plot_unary_vs_binary(&self, run: &ArchiveRun) -> Result<()> {
        self.draw_all(&self.unary_vs_binary_charts(run))
    }

    pub fn plot_histograms(&self, run: &ArchiveRun, axis_values: &[u32]) -> Result<()> {
        self.draw_all(&self.histogram_charts(run, axis_values)?)
    }

    pub fn plot_position_bars(&self, run: &ArchiveRun, axis_values: &[u32]) -> Result<()> {
        self.draw_all(&self.position_bar_charts(run, axis_values)?)
    }

    pub fn plot_utility(&self, combined: &CombinedExperiments, axis: Axis) -> Result<()> {
        self.draw_all(&self.utility_charts(combined, axis))
    }

    pub fn plot_combined(&self, combined: &CombinedExperiments, axis: Axis) -> Result<()> {
        self.draw_all(&self.combined_charts(combined, axis)?)
    }

    pub fn plot_reversed(&self, combined: &CombinedExperiments, axis: Axis) -> Result<()> {
        self.draw_all(&self.reversed_charts(combined, axis)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ArchiveName, ExperimentRow};
    use crate::utils::error::{AnalysisError, ErrorCategory};
    use tempfile::TempDir;

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

    fn run(axis: Axis, weight: u32, experiments: Vec<Experiment>) -> ArchiveRun {
        ArchiveRun {
            archive: ArchiveName {
                date: "2022-05-01".to_string(),
                axis,
                tag: format!("x{}", weight),
                weight,
            },
            experiments: experiments.into_iter().map(|e| (e.name.clone(), e)).collect(),
        }
    }

    /// Every algorithm, binary when `weight > 0`, unary otherwise.
    fn full_run(axis: Axis, weight: u32) -> ArchiveRun {
        let experiments = Algorithm::ALL
            .iter()
            .map(|a| {
                let name = if weight == 0 {
                    a.unary_name()
                } else {
                    a.to_string()
                };
                experiment(&name, &[(1, 1.0 + weight as f64), (2, 2.0)])
            })
            .collect();
        run(axis, weight, experiments)
    }

    fn relative(renderer: &ChartRenderer, charts: &[PlannedChart]) -> Vec<String> {
        charts
            .iter()
            .map(|c| {
                c.path
                    .strip_prefix(&renderer.results_root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_create_result_dirs() {
        let dir = TempDir::new().unwrap();
        create_result_dirs(dir.path()).unwrap();

        for sub in [
            "Agents/Friendship/Included",
            "Agents/Groups/Group2",
            "CourseLimit/Experiments/Group1",
            "CourseLimit/Combined/Total",
            "CourseLimit/Combined/First",
            "Agents/Reversed/Gini",
        ] {
            assert!(dir.path().join(sub).is_dir(), "missing {}", sub);
        }
    }

    #[test]
    fn test_unary_vs_binary_labels_and_paths() {
        let renderer = ChartRenderer::new("/results", (800, 600));
        let mut weighted = full_run(Axis::Agents, 3);
        weighted.experiments.extend(full_run(Axis::Agents, 0).experiments);

        let charts = renderer.unary_vs_binary_charts(&weighted);
        assert_eq!(charts.len(), 14);
        let paths = relative(&renderer, &charts);
        assert_eq!(paths[0], "Agents/Groups/Group1/utility_fig.png");
        assert_eq!(paths[13], "Agents/Groups/Group2/last_agent_fig.png");

        assert_eq!(
            charts[0].spec.labels(),
            vec!["DSA_RC (w)", "RSD (w)", "HBS (w)", "DSA_RC (w/o)", "RSD (w/o)", "HBS (w/o)"]
        );
        let ChartSpec::Line(spec) = &charts[0].spec else {
            panic!("expected a line chart");
        };
        assert!(!spec.series[0].dashed);
        assert!(spec.series[3].dashed);
    }

    #[test]
    fn test_unary_vs_binary_without_unary_runs() {
        let renderer = ChartRenderer::new("/results", (800, 600));
        let charts = renderer.unary_vs_binary_charts(&full_run(Axis::Agents, 3));

        assert_eq!(
            charts[7].spec.labels(),
            vec!["DSA (w)", "Greedy (w)", "Random (w)"]
        );
    }

    #[test]
    fn test_binary_and_unary_chart_paths() {
        let renderer = ChartRenderer::new("/results", (800, 600));
        let mut weighted = full_run(Axis::CourseLimit, 1);
        weighted.experiments.extend(full_run(Axis::CourseLimit, 0).experiments);

        let binary = renderer.binary_charts(&weighted);
        assert_eq!(
            relative(&renderer, &binary)[2],
            "CourseLimit/Friendship/Included/gini_fig.png"
        );
        assert_eq!(binary[0].spec.labels().len(), 6);
        assert!(binary[0].spec.labels().iter().all(|l| !l.ends_with("_Unary")));

        let unary = renderer.unary_charts(&weighted);
        assert_eq!(
            relative(&renderer, &unary)[0],
            "CourseLimit/Friendship/Excluded/utility_fig.png"
        );
        assert!(unary[0].spec.labels().contains(&"DSA_RC"));
    }

    #[test]
    fn test_histogram_and_position_bars() {
        let renderer = ChartRenderer::new("/results", (800, 600));
        let run = full_run(Axis::Agents, 2);

        let histograms = renderer.histogram_charts(&run, &[1, 2]).unwrap();
        assert_eq!(histograms.len(), 14);
        assert_eq!(
            relative(&renderer, &histograms)[0],
            "Agents/Experiments/Group1/utility_fig.png"
        );
        let ChartSpec::Bar(spec) = &histograms[0].spec else {
            panic!("expected a bar chart");
        };
        assert_eq!(spec.categories, vec!["1", "2"]);
        assert_eq!(spec.x_label.as_deref(), Some(Axis::Agents.histogram_label()));
        assert_eq!(spec.series[0].values, vec![3.0, 2.0]);

        let positions = renderer.position_bar_charts(&run, &[1, 2]).unwrap();
        assert_eq!(
            relative(&renderer, &positions),
            vec!["Agents/Utility/agents-1_fig.png", "Agents/Utility/agents-2_fig.png"]
        );
        assert_eq!(positions[0].spec.labels(), vec!["First", "Mid", "Last"]);
        let ChartSpec::Bar(spec) = &positions[0].spec else {
            panic!("expected a bar chart");
        };
        assert_eq!(spec.categories, vec!["DSA_RC", "DSA", "Greedy", "RSD", "HBS", "Random"]);
    }

    #[test]
    fn test_histogram_missing_axis_value_is_an_error() {
        let renderer = ChartRenderer::new("/results", (800, 600));
        let err = renderer
            .histogram_charts(&full_run(Axis::Agents, 2), &[1, 5])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingExperimentError { axis_value: 5, .. }));
    }

    #[test]
    fn test_combined_and_reversed_charts() {
        let renderer = ChartRenderer::new("/results", (800, 600));
        let runs = [full_run(Axis::CourseLimit, 0), full_run(Axis::CourseLimit, 2)];
        let combined = CombinedExperiments::from_runs(&runs);

        let charts = renderer.combined_charts(&combined, Axis::CourseLimit).unwrap();
        assert_eq!(charts.len(), 14);
        let paths = relative(&renderer, &charts);
        assert!(paths.contains(&"CourseLimit/Combined/First/courseLimit-2_fig.png".to_string()));
        assert!(paths.contains(&"CourseLimit/Combined/Utility/courseLimit-1_fig.png".to_string()));
        assert_eq!(charts[0].spec.labels(), vec!["w=0", "w=2"]);

        let reversed = renderer.reversed_charts(&combined, Axis::CourseLimit).unwrap();
        assert_eq!(
            relative(&renderer, &reversed)[0],
            "CourseLimit/Reversed/Utility/courseLimit-1_fig.png"
        );
        let ChartSpec::Bar(spec) = &reversed[0].spec else {
            panic!("expected a bar chart");
        };
        assert_eq!(spec.categories, vec!["w=0", "w=2"]);
        assert_eq!(spec.series.len(), 6);
        // DSA_RC at axis value 1: unary 1.0, weight 2 gives 3.0
        assert_eq!(spec.series[0].values, vec![1.0, 3.0]);
    }

    #[test]
    fn test_combined_missing_weight_is_an_error() {
        let renderer = ChartRenderer::new("/results", (800, 600));
        let mut partial = full_run(Axis::Agents, 2);
        partial.experiments.remove("Greedy");
        let runs = [full_run(Axis::Agents, 0), partial];
        let combined = CombinedExperiments::from_runs(&runs);

        for result in [
            renderer.combined_charts(&combined, Axis::Agents),
            renderer.reversed_charts(&combined, Axis::Agents),
        ] {
            let err = result.unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Data);
            assert!(
                matches!(&err, AnalysisError::MissingExperimentError { experiment, .. } if experiment == "Greedyx2")
            );
        }
    }

    #[test]
    fn test_utility_chart_labels() {
        let renderer = ChartRenderer::new("/results", (800, 600));
        let runs = [full_run(Axis::Agents, 0), full_run(Axis::Agents, 4)];
        let combined = CombinedExperiments::from_runs(&runs);

        let charts = renderer.utility_charts(&combined, Axis::Agents);
        assert_eq!(charts.len(), 8);
        let paths = relative(&renderer, &charts);
        assert_eq!(paths[0], "Agents/Combined/Total/DSA_RC_fig.png");
        assert_eq!(paths[6], "Agents/Combined/Total/Group-1.png");
        assert_eq!(charts[0].spec.labels(), vec!["DSA_RCx0", "DSA_RCx4"]);
        // 群組圖每個演算法只有一個圖例
        assert_eq!(charts[6].spec.labels(), vec!["DSA_RC", "RSD", "HBS"]);
    }
}

use crate::core::aggregate::{area_table_csv, CombinedExperiments};
use crate::core::archive::{discover_archives, extract_archive};
use crate::core::friendship::FriendshipGraph;
use crate::core::loader::load_experiments;
use crate::domain::model::{ArchiveName, ArchiveRun, Axis, Experiment};
use crate::domain::ports::{ConfigProvider, PhaseSummary, Pipeline, Storage};
use crate::render::{create_result_dirs, ChartRenderer};
use crate::utils::error::{AnalysisError, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// One archive unpacked under the data directory.
#[derive(Debug, Clone)]
pub struct ExtractedArchive {
    pub name: ArchiveName,
    /// Relative to the storage root, e.g. `Data/Agents/x1`.
    pub data_dir: PathBuf,
    pub files: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractedArchives {
    pub archives: Vec<ExtractedArchive>,
}

impl PhaseSummary for ExtractedArchives {
    fn summary(&self) -> String {
        let files: usize = self.archives.iter().map(|a| a.files).sum();
        format!("{} archives ({} files)", self.archives.len(), files)
    }
}

/// Loaded runs plus the weight comparison of the last axis seen.
#[derive(Debug, Clone)]
pub struct AnalyzedRuns {
    pub runs: Vec<ArchiveRun>,
    pub combined: Option<(Axis, CombinedExperiments)>,
}

impl PhaseSummary for AnalyzedRuns {
    fn summary(&self) -> String {
        let experiments: usize = self.runs.iter().map(|r| r.experiments.len()).sum();
        let weights = self
            .combined
            .as_ref()
            .map(|(_, c)| c.weights().len())
            .unwrap_or(0);
        format!(
            "{} runs, {} experiments, {} weights combined",
            self.runs.len(),
            experiments,
            weights
        )
    }
}

pub struct AnalysisPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> AnalysisPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }

    fn renderer(&self) -> Option<ChartRenderer> {
        self.config.charts_enabled().then(|| {
            ChartRenderer::new(
                self.storage.resolve(self.config.results_dir()),
                self.config.chart_size(),
            )
        })
    }

    fn render_run(&self, renderer: &ChartRenderer, run: &ArchiveRun) -> Result<()> {
        let axis_values = run.axis_values();
        renderer.plot_histograms(run, &axis_values)?;
        if !run.archive.is_unary() {
            renderer.plot_binary(run)?;
            renderer.plot_unary(run)?;
            renderer.plot_unary_vs_binary(run)?;
        }
        renderer.plot_position_bars(run, &axis_values)?;
        Ok(())
    }

    /// Writes `Area.csv` for the run's axis. Rows of an x0 run carry bare algorithm names.
    fn write_area_table(&self, run: &ArchiveRun) -> Result<PathBuf> {
        let axis_dir = self.config.results_dir().join(run.archive.axis.dir_name());
        let unary_archive = run.archive.is_unary();
        let rows = run.experiments.values().map(|e| {
            let name = if unary_archive {
                e.base_name()
            } else {
                e.name.as_str()
            };
            (name, e)
        });
        let table = area_table_csv(rows)?;
        self.storage
            .write_file(&axis_dir.join("Area.csv"), table.as_bytes())?;
        Ok(axis_dir)
    }

    /// Copies the axis results to `<date>/<Axis>/<tag>`.
    fn snapshot_run(&self, run: &ArchiveRun, axis_dir: &Path) -> Result<PathBuf> {
        let snapshot = self
            .config
            .results_dir()
            .join(&run.archive.date)
            .join(run.archive.axis.dir_name())
            .join(&run.archive.tag);
        let copied = self.storage.copy_tree(axis_dir, &snapshot)?;
        tracing::debug!("Snapshot {} ({} files)", snapshot.display(), copied);
        Ok(snapshot)
    }

    fn render_combined(
        &self,
        renderer: &ChartRenderer,
        combined: &CombinedExperiments,
        axis: Axis,
    ) -> Result<()> {
        renderer.plot_utility(combined, axis)?;
        renderer.plot_combined(combined, axis)?;
        renderer.plot_reversed(combined, axis)?;
        Ok(())
    }

    fn write_friendship_graph(&self) -> Result<()> {
        let friendship = self.storage.resolve(self.config.friendship_file());
        if !friendship.is_file() {
            tracing::info!(
                "ℹ️ No friendship matrix at {}, graph skipped",
                friendship.display()
            );
            return Ok(());
        }

        let graph = FriendshipGraph::from_csv(&friendship)?;
        let html_path = self.config.results_dir().join("friendships.html");
        self.storage
            .write_file(&html_path, graph.to_html()?.as_bytes())?;
        tracing::info!(
            "🕸️ Friendship graph with {} students and {} edges written to {}",
            graph.node_count(),
            graph.edge_count(),
            html_path.display()
        );

        let report = graph.statistics().report();
        tracing::debug!("{}", report);
        println!("{}", report);
        Ok(())
    }
}

impl<S: Storage, C: ConfigProvider> Pipeline for AnalysisPipeline<S, C> {
    type Extracted = ExtractedArchives;
    type Transformed = AnalyzedRuns;

    fn extract(&self) -> Result<ExtractedArchives> {
        create_result_dirs(&self.storage.resolve(self.config.results_dir()))?;

        let archives_dir = self.storage.resolve(self.config.archives_dir());
        let entries = discover_archives(&archives_dir)?;
        if entries.is_empty() {
            tracing::warn!("⚠️ No result archives found in {}", archives_dir.display());
        }

        let mut extracted = ExtractedArchives::default();
        for entry in entries {
            let data_dir = self
                .config
                .data_dir()
                .join(entry.name.axis.dir_name())
                .join(&entry.name.tag);
            tracing::info!("📦 Extracting {}", entry.name.file_name());
            let files = extract_archive(&entry.path, &self.storage.resolve(&data_dir))?;
            extracted.archives.push(ExtractedArchive {
                name: entry.name,
                data_dir,
                files,
            });
        }

        Ok(extracted)
    }

    fn transform(&self, data: ExtractedArchives) -> Result<AnalyzedRuns> {
        // 每個軸最近一次 x0 的單向實驗
        let mut latest_unary: HashMap<Axis, BTreeMap<String, Experiment>> = HashMap::new();
        let mut runs = Vec::with_capacity(data.archives.len());

        for archive in data.archives {
            let axis = archive.name.axis;
            let dir = self.storage.resolve(&archive.data_dir);

            let experiments = if archive.name.is_unary() {
                let unary = load_experiments(&dir, axis, true)?;
                latest_unary.insert(axis, unary.clone());
                unary
            } else {
                let mut experiments = match latest_unary.get(&axis) {
                    Some(unary) => unary.clone(),
                    None => {
                        tracing::warn!(
                            "⚠️ {} has no preceding x0 archive, friendship-blind results missing",
                            archive.name.file_name()
                        );
                        BTreeMap::new()
                    }
                };
                experiments.extend(load_experiments(&dir, axis, false)?);
                experiments
            };

            let mut run = ArchiveRun {
                archive: archive.name,
                experiments,
            };
            for experiment in run.experiments.values_mut() {
                experiment.compute_areas();
            }
            tracing::info!(
                "📈 Loaded {} with {} experiments",
                run.archive.file_name(),
                run.experiments.len()
            );
            runs.push(run);
        }

        let combined = runs.last().map(|last| {
            let axis = last.archive.axis;
            let same_axis = runs.iter().filter(|r| r.archive.axis == axis);
            (axis, CombinedExperiments::from_runs(same_axis))
        });

        Ok(AnalyzedRuns { runs, combined })
    }

    fn load(&self, result: AnalyzedRuns) -> Result<String> {
        let renderer = self.renderer();
        if renderer.is_none() {
            tracing::info!("ℹ️ Chart rendering disabled, writing tables only");
        }

        // 圖表失敗不影響表格輸出，最後才回報第一個錯誤
        let mut chart_error: Option<AnalysisError> = None;

        for run in &result.runs {
            let axis_dir = self.write_area_table(run)?;
            if let Some(renderer) = &renderer {
                if let Err(e) = self.render_run(renderer, run) {
                    tracing::error!("❌ Charts for {} failed: {}", run.archive.file_name(), e);
                    chart_error.get_or_insert(e);
                }
            }
            let snapshot = self.snapshot_run(run, &axis_dir)?;
            tracing::info!(
                "💾 Saved {} results to {}",
                run.archive.file_name(),
                snapshot.display()
            );
        }

        if let Some((axis, combined)) = &result.combined {
            if let Some(renderer) = &renderer {
                if combined.is_empty() {
                    tracing::warn!("⚠️ Nothing to combine for {}", axis);
                } else if let Err(e) = self.render_combined(renderer, combined, *axis) {
                    tracing::error!("❌ Combined charts for {} failed: {}", axis, e);
                    chart_error.get_or_insert(e);
                }
            }
            if *axis == Axis::CourseLimit {
                self.write_friendship_graph()?;
            }
        }

        if let Some(e) = chart_error {
            return Err(e);
        }

        Ok(self
            .storage
            .resolve(self.config.results_dir())
            .display()
            .to_string())
    }
}

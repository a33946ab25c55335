use crate::domain::ports::{PhaseSummary, Pipeline};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct AnalysisEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> AnalysisEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting analysis");
        self.monitor.log_stats("Start");

        // Extract
        tracing::info!("📦 Extracting archives...");
        let extracted = self.pipeline.extract()?;
        tracing::info!("Extracted {}", extracted.summary());
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("🔄 Aggregating experiments...");
        let analyzed = self.pipeline.transform(extracted)?;
        tracing::info!("Aggregated {}", analyzed.summary());
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("🎨 Writing results...");
        let output_path = self.pipeline.load(analyzed)?;
        self.monitor.log_stats("Load");
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Counted(usize);

    impl PhaseSummary for Counted {
        fn summary(&self) -> String {
            format!("{} items", self.0)
        }
    }

    #[derive(Default)]
    struct RecordingPipeline {
        calls: RefCell<Vec<&'static str>>,
    }

    impl Pipeline for RecordingPipeline {
        type Extracted = Counted;
        type Transformed = Counted;

        fn extract(&self) -> Result<Counted> {
            self.calls.borrow_mut().push("extract");
            Ok(Counted(3))
        }

        fn transform(&self, data: Counted) -> Result<Counted> {
            self.calls.borrow_mut().push("transform");
            Ok(Counted(data.0 * 2))
        }

        fn load(&self, result: Counted) -> Result<String> {
            self.calls.borrow_mut().push("load");
            Ok(format!("Results/{}", result.0))
        }
    }

    #[test]
    fn test_engine_runs_phases_in_order() {
        let engine = AnalysisEngine::new(RecordingPipeline::default());
        assert_eq!(engine.run().unwrap(), "Results/6");
        assert_eq!(
            *engine.pipeline.calls.borrow(),
            vec!["extract", "transform", "load"]
        );
    }
}

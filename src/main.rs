use clap::Parser;
use course_alloc_analysis::config::Command;
use course_alloc_analysis::core::archive::pack_raw_results;
use course_alloc_analysis::core::friendship::FriendshipGraph;
use course_alloc_analysis::core::preferences;
use course_alloc_analysis::core::survey;
use course_alloc_analysis::domain::ports::{ConfigProvider, Storage};
use course_alloc_analysis::utils::error::ErrorSeverity;
use course_alloc_analysis::utils::{logger, validation::{self, Validate}};
use course_alloc_analysis::{
    AnalysisConfig, AnalysisEngine, AnalysisError, AnalysisPipeline, CliConfig, LocalStorage,
    Result,
};
use rand::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_FILE: &str = "analysis.toml";

fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting course-alloc-analysis CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證參數
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    // generate 直接把排名輸出到 stdout
    let rows_on_stdout = matches!(config.command, Command::Generate { out: None, .. });

    let result = match config.command {
        Command::Analyze {
            base_dir,
            config,
            no_charts,
            monitor,
        } => run_analyze(&base_dir, config.as_deref(), no_charts, monitor),
        Command::Pack {
            base_dir,
            config,
            date,
        } => run_pack(&base_dir, config.as_deref(), date),
        Command::Prepare {
            survey,
            weight,
            out_dir,
        } => run_prepare(&survey, weight, &out_dir),
        Command::Graph {
            friendship,
            out,
            json,
        } => run_graph(&friendship, &out, json),
        Command::Generate {
            students,
            courses,
            theta,
            seed,
            out,
        } => run_generate(students, courses, theta, seed, out.as_deref()),
    };

    match result {
        Ok(output_path) => {
            tracing::info!("✅ Completed successfully!");
            tracing::info!("📁 Output saved to: {}", output_path);
            if !rows_on_stdout {
                println!("✅ Completed successfully!");
                println!("📁 Output saved to: {}", output_path);
            }
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2, // 表格已寫出，僅圖表失敗
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}

/// Explicit `--config` must exist; otherwise `analysis.toml` in the base dir is used when present.
fn load_config(base_dir: &Path, config: Option<&Path>) -> Result<AnalysisConfig> {
    let loaded = match config {
        Some(path) => {
            let path = base_dir.join(path);
            if !path.is_file() {
                return Err(AnalysisError::MissingConfigError {
                    field: path.display().to_string(),
                });
            }
            tracing::info!("📄 Loading config from {}", path.display());
            AnalysisConfig::from_file(&path)?
        }
        None => {
            let default_path = base_dir.join(DEFAULT_CONFIG_FILE);
            if default_path.is_file() {
                tracing::info!("📄 Loading config from {}", default_path.display());
                AnalysisConfig::from_file(&default_path)?
            } else {
                AnalysisConfig::default()
            }
        }
    };

    loaded.validate()?;
    Ok(loaded)
}

fn run_analyze(
    base_dir: &Path,
    config: Option<&Path>,
    no_charts: bool,
    monitor: bool,
) -> Result<String> {
    let mut config = load_config(base_dir, config)?;
    if no_charts {
        config.charts.enabled = false;
    }

    let monitor_enabled = monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    // 創建存儲和管道
    let storage = LocalStorage::new(base_dir);
    let pipeline = AnalysisPipeline::new(storage, config);

    let engine = AnalysisEngine::new_with_monitoring(pipeline, monitor_enabled);
    engine.run()
}

fn run_pack(base_dir: &Path, config: Option<&Path>, date: Option<String>) -> Result<String> {
    let config = load_config(base_dir, config)?;
    let date = date.unwrap_or_else(|| chrono::Local::now().date_naive().to_string());
    validation::validate_date_token("date", &date)?;

    let storage = LocalStorage::new(base_dir);
    let archives_dir = storage.resolve(config.archives_dir());
    let created = pack_raw_results(
        &storage.resolve(&config.paths.raw),
        &storage.resolve(&config.paths.staging),
        &archives_dir,
        &date,
    )?;

    if created.is_empty() {
        tracing::warn!("⚠️ No raw results found to pack");
    }
    tracing::info!("🗜️ Packed {} archives dated {}", created.len(), date);
    Ok(archives_dir.display().to_string())
}

fn run_prepare(survey_path: &Path, weight: u32, out_dir: &Path) -> Result<String> {
    let rows = survey::read_survey(File::open(survey_path)?)?;
    tracing::info!("📝 Read {} survey answers", rows.len());

    let friendship = survey::friendship_matrix(&rows, weight)?;
    let courses = survey::course_matrix(&rows)?;

    let storage = LocalStorage::new(out_dir);
    storage.write_file(
        Path::new("friendship.csv"),
        survey::friendship_csv(&friendship)?.as_bytes(),
    )?;
    storage.write_file(
        Path::new("courses.csv"),
        survey::courses_csv(&courses)?.as_bytes(),
    )?;

    Ok(storage.base_path().display().to_string())
}

fn run_graph(friendship: &Path, out: &Path, json: bool) -> Result<String> {
    let graph = FriendshipGraph::from_csv(friendship)?;
    let storage = LocalStorage::new(PathBuf::new());

    storage.write_file(out, graph.to_html()?.as_bytes())?;
    tracing::info!(
        "🕸️ Friendship graph with {} students and {} edges",
        graph.node_count(),
        graph.edge_count()
    );

    let statistics = graph.statistics();
    if json {
        let json_path = out.with_extension("json");
        storage.write_file(&json_path, &serde_json::to_vec_pretty(&statistics)?)?;
        tracing::info!("📊 Statistics written to {}", json_path.display());
    }
    println!("{}", statistics.report());

    Ok(out.display().to_string())
}

fn run_generate(
    students: usize,
    courses: usize,
    theta: f64,
    seed: Option<u64>,
    out: Option<&Path>,
) -> Result<String> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let rankings = preferences::generate_preferences(&mut rng, students, courses, theta)?;
    let csv = preferences::preferences_csv(&rankings);

    match out {
        Some(out) => {
            LocalStorage::new(PathBuf::new()).write_file(out, csv.as_bytes())?;
            tracing::info!(
                "🎲 {} rankings over {} courses written to {}",
                students,
                courses,
                out.display()
            );
            Ok(out.display().to_string())
        }
        None => {
            print!("{}", csv);
            Ok("stdout".to_string())
        }
    }
}

pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "course-alloc-analysis")]
#[command(about = "Analyse and chart course-allocation simulation results")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON lines")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Unpack result archives, aggregate them and render every chart
    Analyze {
        /// Directory holding Archives/, Data/ and Results/
        #[arg(long, default_value = ".")]
        base_dir: PathBuf,

        /// Path to TOML configuration file (relative to the base dir)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Only write tabular results, skip chart rendering
        #[arg(long)]
        no_charts: bool,

        /// Log CPU and memory usage between phases
        #[arg(long)]
        monitor: bool,
    },

    /// Re-bundle raw simulator output into dated result archives
    Pack {
        #[arg(long, default_value = ".")]
        base_dir: PathBuf,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Date stamped into archive names, defaults to today
        #[arg(long)]
        date: Option<String>,
    },

    /// Build friendship.csv and courses.csv from survey answers
    Prepare {
        /// Survey CSV with Name, F1..F3 and CR1..CR9 columns
        #[arg(long)]
        survey: PathBuf,

        /// Multiplier applied to friendship ranks
        #[arg(long, default_value = "1")]
        weight: u32,

        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Render the friendship network and print centrality statistics
    Graph {
        #[arg(long, default_value = "friendship.csv")]
        friendship: PathBuf,

        #[arg(long, default_value = "Results/friendships.html")]
        out: PathBuf,

        /// Also write the statistics as JSON next to the HTML page
        #[arg(long)]
        json: bool,
    },

    /// Sample Mallows-distributed course rankings, one student per line
    Generate {
        #[arg(long, default_value = "146")]
        students: usize,

        #[arg(long, default_value = "9")]
        courses: usize,

        /// Dispersion; larger values stay closer to the reference order
        #[arg(long, default_value = "1.5")]
        theta: f64,

        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,

        /// Write to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn path_arg(field: &str, path: &std::path::Path) -> crate::utils::error::Result<()> {
    crate::utils::validation::validate_path(field, &path.to_string_lossy())
}

#[cfg(feature = "cli")]
impl crate::utils::validation::Validate for CliConfig {
    fn validate(&self) -> crate::utils::error::Result<()> {
        use crate::utils::validation::{
            validate_date_token, validate_positive_number, validate_range,
        };

        match &self.command {
            Command::Analyze { base_dir, .. } => path_arg("base_dir", base_dir),
            Command::Pack { base_dir, date, .. } => {
                path_arg("base_dir", base_dir)?;
                if let Some(date) = date {
                    validate_date_token("date", date)?;
                }
                Ok(())
            }
            Command::Prepare {
                survey,
                weight,
                out_dir,
            } => {
                path_arg("survey", survey)?;
                path_arg("out_dir", out_dir)?;
                validate_range("weight", *weight, 1, 100)
            }
            Command::Graph {
                friendship, out, ..
            } => {
                path_arg("friendship", friendship)?;
                path_arg("out", out)
            }
            Command::Generate {
                students,
                courses,
                theta,
                out,
                ..
            } => {
                validate_positive_number("students", *students, 1)?;
                crate::core::preferences::validate_params(*courses, *theta)?;
                match out {
                    Some(out) => path_arg("out", out),
                    None => Ok(()),
                }
            }
        }
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;
    use crate::utils::validation::Validate;

    #[test]
    fn test_parse_analyze_flags() {
        let cli = CliConfig::parse_from([
            "course-alloc-analysis",
            "analyze",
            "--base-dir",
            "runs",
            "--no-charts",
            "-v",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Command::Analyze {
                base_dir,
                no_charts,
                monitor,
                ..
            } => {
                assert_eq!(base_dir, PathBuf::from("runs"));
                assert!(no_charts);
                assert!(!monitor);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_validation_rejects_bad_arguments() {
        let zero_weight = CliConfig::parse_from([
            "course-alloc-analysis",
            "prepare",
            "--survey",
            "survey.csv",
            "--weight",
            "0",
        ]);
        assert!(zero_weight.validate().is_err());

        let bad_date = CliConfig::parse_from(["course-alloc-analysis", "pack", "--date", "2022_05"]);
        assert!(bad_date.validate().is_err());

        let graph = CliConfig::parse_from(["course-alloc-analysis", "graph"]);
        assert!(graph.validate().is_ok());

        let no_courses =
            CliConfig::parse_from(["course-alloc-analysis", "generate", "--courses", "0"]);
        assert!(no_courses.validate().is_err());

        let bad_theta =
            CliConfig::parse_from(["course-alloc-analysis", "generate", "--theta=-2"]);
        assert!(bad_theta.validate().is_err());

        let nan_theta =
            CliConfig::parse_from(["course-alloc-analysis", "generate", "--theta", "NaN"]);
        assert!(nan_theta.validate().is_err());
    }

    #[test]
    fn test_parse_generate_defaults() {
        let cli = CliConfig::parse_from(["course-alloc-analysis", "generate", "--seed", "5"]);
        assert!(cli.validate().is_ok());
        match cli.command {
            Command::Generate {
                students,
                courses,
                theta,
                seed,
                out,
            } => {
                assert_eq!((students, courses), (146, 9));
                assert_eq!(theta, 1.5);
                assert_eq!(seed, Some(5));
                assert!(out.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}

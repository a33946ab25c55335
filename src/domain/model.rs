use crate::utils::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The experiment parameter varied across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Axis {
    #[serde(rename = "agents")]
    Agents,
    #[serde(rename = "courseLimit")]
    CourseLimit,
}

impl Axis {
    pub const ALL: [Axis; 2] = [Axis::Agents, Axis::CourseLimit];

    pub fn name(&self) -> &'static str {
        match self {
            Axis::Agents => "agents",
            Axis::CourseLimit => "courseLimit",
        }
    }

    /// Directory name under `Data/` and `Results/`.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Axis::Agents => "Agents",
            Axis::CourseLimit => "CourseLimit",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Axis::Agents => "Number of agents",
            Axis::CourseLimit => "Course Limit",
        }
    }

    pub fn histogram_label(&self) -> &'static str {
        match self {
            Axis::Agents => "Number of agents",
            Axis::CourseLimit => "Course limit",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Axis {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "agents" => Ok(Axis::Agents),
            "courseLimit" => Ok(Axis::CourseLimit),
            other => Err(AnalysisError::InvalidConfigValueError {
                field: "axis".to_string(),
                value: other.to_string(),
                reason: "Expected 'agents' or 'courseLimit'".to_string(),
            }),
        }
    }
}

/// Per-run metrics written by the simulator, in CSV column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Utility,
    Courses,
    Gini,
    Friends,
    FirstAgent,
    MidAgent,
    LastAgent,
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Utility,
        Metric::Courses,
        Metric::Gini,
        Metric::Friends,
        Metric::FirstAgent,
        Metric::MidAgent,
        Metric::LastAgent,
    ];

    pub const POSITIONS: [Metric; 3] = [Metric::FirstAgent, Metric::MidAgent, Metric::LastAgent];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::Utility => "utility",
            Metric::Courses => "courses",
            Metric::Gini => "gini",
            Metric::Friends => "friends",
            Metric::FirstAgent => "first_agent",
            Metric::MidAgent => "mid_agent",
            Metric::LastAgent => "last_agent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Metric::Utility => "Total utility",
            Metric::Courses => "Number of illegal assignments",
            Metric::Gini => "Gini coefficient",
            Metric::Friends => "Number of friends shared among the courses",
            Metric::FirstAgent => "First agent utility",
            Metric::MidAgent => "Middle agent utility",
            Metric::LastAgent => "Last agent utility",
        }
    }

    /// Sub-directory of `Combined/` and `Reversed/`, e.g. `First` for `first_agent`.
    pub fn dir_name(&self) -> String {
        capitalize(&self.name().replace("_agent", ""))
    }

    /// Label of a per-position bar, e.g. `Mid`.
    pub fn position_label(&self) -> String {
        self.dir_name()
    }

    /// Y label of experiment histograms, e.g. `First Agent Utility`.
    pub fn histogram_label(&self) -> String {
        capitalize(self.name()).replace("_agent", " Agent Utility")
    }

    pub fn index(&self) -> usize {
        Metric::ALL.iter().position(|m| m == self).unwrap_or(0)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The compared allocation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Algorithm {
    #[serde(rename = "DSA_RC")]
    DsaRc,
    #[serde(rename = "DSA")]
    Dsa,
    Greedy,
    #[serde(rename = "RSD")]
    Rsd,
    #[serde(rename = "HBS")]
    Hbs,
    Random,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Diamond,
    Plus,
    Circle,
    Square,
    Cross,
    Hexagon,
}

impl Algorithm {
    pub const ALL: [Algorithm; 6] = [
        Algorithm::DsaRc,
        Algorithm::Dsa,
        Algorithm::Greedy,
        Algorithm::Rsd,
        Algorithm::Hbs,
        Algorithm::Random,
    ];

    pub const GROUPS: [[Algorithm; 3]; 2] = [
        [Algorithm::DsaRc, Algorithm::Rsd, Algorithm::Hbs],
        [Algorithm::Dsa, Algorithm::Greedy, Algorithm::Random],
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::DsaRc => "DSA_RC",
            Algorithm::Dsa => "DSA",
            Algorithm::Greedy => "Greedy",
            Algorithm::Rsd => "RSD",
            Algorithm::Hbs => "HBS",
            Algorithm::Random => "Random",
        }
    }

    pub fn unary_name(&self) -> String {
        format!("{}_Unary", self.name())
    }

    pub fn from_name(name: &str) -> Option<Algorithm> {
        Algorithm::ALL.into_iter().find(|a| a.name() == name)
    }

    pub fn marker(&self) -> MarkerShape {
        match self {
            Algorithm::DsaRc => MarkerShape::Diamond,
            Algorithm::Dsa => MarkerShape::Plus,
            Algorithm::Greedy => MarkerShape::Circle,
            Algorithm::Rsd => MarkerShape::Square,
            Algorithm::Hbs => MarkerShape::Cross,
            Algorithm::Random => MarkerShape::Hexagon,
        }
    }

    /// Chart colour as RGB.
    pub fn rgb(&self) -> (u8, u8, u8) {
        match self {
            Algorithm::DsaRc => (0, 0, 255),
            Algorithm::Dsa => (165, 42, 42),
            Algorithm::Greedy => (0, 128, 0),
            Algorithm::Rsd => (255, 165, 0),
            Algorithm::Hbs => (128, 0, 128),
            Algorithm::Random => (255, 0, 0),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Averages of one result CSV, i.e. one point on the experiment axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentRow {
    pub axis_value: u32,
    pub values: [f64; 7],
}

impl ExperimentRow {
    pub fn get(&self, metric: Metric) -> f64 {
        self.values[metric.index()]
    }
}

/// Aggregated results of one algorithm variant across the axis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub name: String,
    pub unary: bool,
    pub rows: Vec<ExperimentRow>,
    pub area: BTreeMap<Metric, f64>,
}

impl Experiment {
    pub fn new(name: impl Into<String>, mut rows: Vec<ExperimentRow>) -> Self {
        let name = name.into();
        rows.sort_by_key(|row| row.axis_value);
        Self {
            unary: name.contains("Unary"),
            name,
            rows,
            area: BTreeMap::new(),
        }
    }

    /// Algorithm this experiment belongs to, ignoring the `_Unary` suffix.
    pub fn algorithm(&self) -> Option<Algorithm> {
        Algorithm::from_name(self.base_name())
    }

    pub fn base_name(&self) -> &str {
        self.name.strip_suffix("_Unary").unwrap_or(&self.name)
    }

    pub fn axis_values(&self) -> Vec<u32> {
        self.rows.iter().map(|r| r.axis_value).collect()
    }

    pub fn series(&self, metric: Metric) -> Vec<(f64, f64)> {
        self.rows
            .iter()
            .map(|r| (r.axis_value as f64, r.get(metric)))
            .collect()
    }

    pub fn row(&self, axis_value: u32) -> Option<&ExperimentRow> {
        self.rows.iter().find(|r| r.axis_value == axis_value)
    }

    pub fn value_at(&self, axis_value: u32, metric: Metric) -> Result<f64> {
        self.row(axis_value)
            .map(|r| r.get(metric))
            .ok_or_else(|| AnalysisError::MissingExperimentError {
                experiment: self.name.clone(),
                axis_value,
            })
    }
}

/// `courseAlgo_<date>_<axis>_x<weight>.zip`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveName {
    pub date: String,
    pub axis: Axis,
    pub tag: String,
    pub weight: u32,
}

impl ArchiveName {
    pub fn is_unary(&self) -> bool {
        self.weight == 0
    }

    pub fn file_name(&self) -> String {
        format!("courseAlgo_{}_{}_{}.zip", self.date, self.axis, self.tag)
    }
}

/// One archive after loading: its experiments keyed by name.
#[derive(Debug, Clone)]
pub struct ArchiveRun {
    pub archive: ArchiveName,
    pub experiments: BTreeMap<String, Experiment>,
}

impl ArchiveRun {
    pub fn axis_values(&self) -> Vec<u32> {
        let mut values: Vec<u32> = self
            .experiments
            .values()
            .flat_map(|e| e.axis_values())
            .collect();
        values.sort_unstable();
        values.dedup();
        values
    }

    pub fn binary(&self, algorithm: Algorithm) -> Option<&Experiment> {
        self.experiments.get(algorithm.name())
    }

    pub fn unary(&self, algorithm: Algorithm) -> Option<&Experiment> {
        self.experiments.get(&algorithm.unary_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_labels() {
        assert_eq!(Metric::FirstAgent.dir_name(), "First");
        assert_eq!(Metric::Utility.dir_name(), "Utility");
        assert_eq!(Metric::MidAgent.histogram_label(), "Mid Agent Utility");
        assert_eq!(Metric::Gini.histogram_label(), "Gini");
        assert_eq!(Metric::LastAgent.index(), 6);
    }

    #[test]
    fn test_axis_parse() {
        assert_eq!("courseLimit".parse::<Axis>().unwrap(), Axis::CourseLimit);
        assert_eq!(Axis::Agents.dir_name(), "Agents");
        assert!("students".parse::<Axis>().is_err());
    }

    #[test]
    fn test_experiment_sorts_rows_and_detects_unary() {
        let rows = vec![
            ExperimentRow { axis_value: 30, values: [3.0; 7] },
            ExperimentRow { axis_value: 10, values: [1.0; 7] },
        ];
        let exp = Experiment::new("HBS_Unary", rows);
        assert!(exp.unary);
        assert_eq!(exp.base_name(), "HBS");
        assert_eq!(exp.algorithm(), Some(Algorithm::Hbs));
        assert_eq!(exp.axis_values(), vec![10, 30]);
        assert_eq!(exp.value_at(30, Metric::Gini).unwrap(), 3.0);
        assert!(exp.value_at(20, Metric::Gini).is_err());
    }

    #[test]
    fn test_algorithm_lookup() {
        assert_eq!(Algorithm::from_name("DSA_RC"), Some(Algorithm::DsaRc));
        assert_eq!(Algorithm::from_name("Iterative"), None);
        assert_eq!(Algorithm::Rsd.unary_name(), "RSD_Unary");
    }
}

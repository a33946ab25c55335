//! Directed friendship network built from the simulator's friendship matrix.

use crate::utils::error::{AnalysisError, Result};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, EdgeRef};
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Write as _;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub label: String,
    /// One more than the in-degree.
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStatistics {
    pub in_degree_centrality: Vec<(String, f64)>,
    pub reaching_centrality: Vec<(String, f64)>,
    pub closeness_centrality: Vec<(String, f64)>,
    pub in_degree_histogram: BTreeMap<usize, usize>,
    pub vote_rank: Vec<String>,
}

pub struct FriendshipGraph {
    graph: DiGraph<Student, f64>,
    by_label: HashMap<String, NodeIndex>,
}

impl FriendshipGraph {
    pub fn from_csv(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, &path.display().to_string())
    }

    /// Row `i` holds the ratings student `a{i+1}` gives to the students named in the header.
    pub fn from_reader<R: Read>(reader: R, source: &str) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = csv_reader.headers()?.iter().map(str::to_string).collect();

        let mut graph = DiGraph::new();
        let mut by_label = HashMap::new();
        for (i, _) in headers.iter().enumerate() {
            let label = format!("a{}", i + 1);
            let idx = graph.add_node(Student {
                label: label.clone(),
                size: 1,
            });
            by_label.insert(label, idx);
        }
        for header in &headers {
            if !by_label.contains_key(header) {
                let idx = graph.add_node(Student {
                    label: header.clone(),
                    size: 1,
                });
                by_label.insert(header.clone(), idx);
            }
        }

        let mut rows = 0;
        for (row, record) in csv_reader.records().enumerate() {
            let record = record?;
            let from = *by_label.get(&format!("a{}", row + 1)).ok_or_else(|| {
                AnalysisError::data_format(
                    source,
                    format!("row {} has no matching column; the matrix must be square", row + 1),
                )
            })?;

            for (header, cell) in headers.iter().zip(record.iter()) {
                let rate: f64 = cell.parse().map_err(|_| {
                    AnalysisError::data_format(
                        source,
                        format!("row {} column {}: '{}' is not a number", row + 1, header, cell),
                    )
                })?;
                if rate > 0.0 {
                    graph.add_edge(from, by_label[header], rate);
                }
            }
            rows += 1;
        }

        if rows != headers.len() {
            return Err(AnalysisError::data_format(
                source,
                format!("{} rows for {} students", rows, headers.len()),
            ));
        }

        let mut this = Self { graph, by_label };
        this.update_sizes();
        Ok(this)
    }

    fn update_sizes(&mut self) {
        let sizes: Vec<usize> = self
            .graph
            .node_indices()
            .map(|n| 1 + self.in_degree(n))
            .collect();
        for (node, size) in self.graph.node_indices().zip(sizes) {
            self.graph[node].size = size;
        }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn student(&self, label: &str) -> Option<&Student> {
        self.by_label.get(label).map(|&idx| &self.graph[idx])
    }

    fn in_degree(&self, node: NodeIndex) -> usize {
        self.graph.edges_directed(node, Direction::Incoming).count()
    }

    fn out_degree(&self, node: NodeIndex) -> usize {
        self.graph.edges_directed(node, Direction::Outgoing).count()
    }

    fn labelled<F: Fn(NodeIndex) -> f64>(&self, f: F) -> Vec<(String, f64)> {
        self.graph
            .node_indices()
            .map(|n| (self.graph[n].label.clone(), f(n)))
            .collect()
    }

    fn scale(&self) -> f64 {
        let n = self.node_count();
        if n > 1 {
            1.0 / (n - 1) as f64
        } else {
            0.0
        }
    }

    pub fn in_degree_centrality(&self) -> Vec<(String, f64)> {
        let scale = self.scale();
        self.labelled(|n| self.in_degree(n) as f64 * scale)
    }

    /// Share of the other students reachable along friendship ties.
    pub fn local_reaching_centrality(&self) -> Vec<(String, f64)> {
        let scale = self.scale();
        self.labelled(|n| {
            let mut bfs = Bfs::new(&self.graph, n);
            let mut reached = 0usize;
            while bfs.next(&self.graph).is_some() {
                reached += 1;
            }
            reached.saturating_sub(1) as f64 * scale
        })
    }

    /// Closeness over incoming hop distances, scaled by the reachable fraction.
    pub fn closeness_centrality(&self) -> Vec<(String, f64)> {
        let n = self.node_count();

        self.labelled(|source| {
            let mut dist: HashMap<NodeIndex, usize> = HashMap::from([(source, 0)]);
            let mut queue = VecDeque::from([source]);
            while let Some(node) = queue.pop_front() {
                let d = dist[&node];
                for edge in self.graph.edges_directed(node, Direction::Incoming) {
                    let next = edge.source();
                    if !dist.contains_key(&next) {
                        dist.insert(next, d + 1);
                        queue.push_back(next);
                    }
                }
            }

            let total: usize = dist.values().sum();
            let reachable = dist.len();
            if total == 0 || n <= 1 {
                return 0.0;
            }
            let closeness = (reachable - 1) as f64 / total as f64;
            closeness * (reachable - 1) as f64 / (n - 1) as f64
        })
    }

    /// In-degree -> number of students, omitting empty buckets.
    pub fn in_degree_histogram(&self) -> BTreeMap<usize, usize> {
        let mut histogram = BTreeMap::new();
        for node in self.graph.node_indices() {
            *histogram.entry(self.in_degree(node)).or_insert(0) += 1;
        }
        histogram
    }

    /// Nodes in the order they first appear as edge endpoints, then the isolated ones.
    fn edge_insertion_order(&self) -> Vec<NodeIndex> {
        let mut seen = vec![false; self.node_count()];
        let mut order = Vec::with_capacity(self.node_count());
        for edge in self.graph.edge_references() {
            for node in [edge.source(), edge.target()] {
                if !seen[node.index()] {
                    seen[node.index()] = true;
                    order.push(node);
                }
            }
        }
        order.extend(self.graph.node_indices().filter(|v| !seen[v.index()]));
        order
    }

    /// VoteRank spreader ranking, at most `k` students.
    ///
    /// Ties go to the node that entered the graph first, where nodes enter as
    /// edge endpoints in matrix row order and students without friendships last.
    pub fn vote_rank(&self, k: usize) -> Vec<String> {
        let n = self.node_count();
        if n == 0 {
            return Vec::new();
        }
        let k = k.min(n);
        let total_out: usize = self.graph.node_indices().map(|v| self.out_degree(v)).sum();
        let avg_degree = total_out as f64 / n as f64;

        let order = self.edge_insertion_order();
        let mut score = vec![0.0f64; n];
        let mut ability = vec![1.0f64; n];
        let mut elected: Vec<NodeIndex> = Vec::new();

        for _ in 0..k {
            score.iter_mut().for_each(|s| *s = 0.0);
            // 有向圖中每個節點只投票給指向它的節點
            for edge in self.graph.edge_references() {
                score[edge.source().index()] += ability[edge.target().index()];
            }
            for node in &elected {
                score[node.index()] = 0.0;
            }

            let mut best = order[0];
            for &node in &order[1..] {
                if score[node.index()] > score[best.index()] {
                    best = node;
                }
            }
            if score[best.index()] == 0.0 {
                break;
            }

            elected.push(best);
            ability[best.index()] = 0.0;
            for succ in self.graph.neighbors_directed(best, Direction::Outgoing) {
                let a = &mut ability[succ.index()];
                *a = (*a - 1.0 / avg_degree).max(0.0);
            }
        }

        elected
            .into_iter()
            .map(|idx| self.graph[idx].label.clone())
            .collect()
    }

    pub fn statistics(&self) -> GraphStatistics {
        GraphStatistics {
            in_degree_centrality: self.in_degree_centrality(),
            reaching_centrality: self.local_reaching_centrality(),
            closeness_centrality: self.closeness_centrality(),
            in_degree_histogram: self.in_degree_histogram(),
            vote_rank: self.vote_rank(self.node_count()),
        }
    }

    /// Standalone vis-network page of the graph.
    pub fn to_html(&self) -> Result<String> {
        let nodes: Vec<serde_json::Value> = self
            .graph
            .node_indices()
            .map(|n| {
                let student = &self.graph[n];
                serde_json::json!({
                    "id": student.label,
                    "label": student.label,
                    "title": student.label,
                    "value": student.size,
                    "shape": "dot",
                })
            })
            .collect();
        let edges: Vec<serde_json::Value> = self
            .graph
            .edge_references()
            .map(|e| {
                serde_json::json!({
                    "from": self.graph[e.source()].label,
                    "to": self.graph[e.target()].label,
                    "title": e.weight(),
                    "value": e.weight(),
                    "arrows": "to",
                })
            })
            .collect();

        let nodes_json = serde_json::to_string(&nodes)?;
        let edges_json = serde_json::to_string(&edges)?;

        Ok(format!(
            r#"<html>
<head>
<meta charset="utf-8">
<script src="https://unpkg.com/vis-network/standalone/umd/vis-network.min.js"></script>
<style type="text/css">
#mynetwork {{ width: 1200px; height: 800px; border: 1px solid lightgray; }}
</style>
</head>
<body>
<div id="mynetwork"></div>
<script type="text/javascript">
var nodes = new vis.DataSet({nodes_json});
var edges = new vis.DataSet({edges_json});
var container = document.getElementById("mynetwork");
var options = {{ edges: {{ arrows: {{ to: {{ enabled: true }} }} }}, physics: {{ solver: "barnesHut" }} }};
var network = new vis.Network(container, {{ nodes: nodes, edges: edges }}, options);
</script>
</body>
</html>
"#
        ))
    }
}

impl GraphStatistics {
    pub fn report(&self) -> String {
        fn pairs(values: &[(String, f64)]) -> String {
            let body: Vec<String> = values
                .iter()
                .map(|(label, v)| format!("'{}': {}", label, v))
                .collect();
            format!("{{{}}}", body.join(", "))
        }

        let histogram: Vec<String> = self
            .in_degree_histogram
            .iter()
            .map(|(degree, count)| format!("'Degree: {}': {}", degree, count))
            .collect();

        let mut out = String::new();
        let _ = writeln!(
            out,
            "===== In-Degree Centrality =====\n{}\n",
            pairs(&self.in_degree_centrality)
        );
        let _ = writeln!(
            out,
            "===== Reaching Centrality =====\n{}\n",
            pairs(&self.reaching_centrality)
        );
        let _ = writeln!(
            out,
            "===== Closeness Centrality =====\n{}\n",
            pairs(&self.closeness_centrality)
        );
        let _ = writeln!(
            out,
            "===== In-Degree Histogram =====\n{{{}}}\n",
            histogram.join(", ")
        );
        let _ = writeln!(
            out,
            "===== Degree Vote Rank =====\n{:?}",
            self.vote_rank
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // a1 -> a2 (3), a1 -> a3 (1), a2 -> a3 (2), a3 -> a1 (2), a4 -> a3 (1)
    const MATRIX: &str = "a1,a2,a3,a4\n0,3,1,0\n0,0,2,0\n2,0,0,0\n0,0,1,0\n";

    fn graph() -> FriendshipGraph {
        FriendshipGraph::from_reader(MATRIX.as_bytes(), "friendship.csv").unwrap()
    }

    fn value(values: &[(String, f64)], label: &str) -> f64 {
        values.iter().find(|(l, _)| l == label).map(|(_, v)| *v).unwrap()
    }

    #[test]
    fn test_build_graph() {
        let g = graph();
        assert_eq!(g.node_count(), 4);
        assert_eq!(g.edge_count(), 5);
        assert_eq!(g.student("a3").unwrap().size, 4);
        assert_eq!(g.student("a4").unwrap().size, 1);
    }

    #[test]
    fn test_rejects_non_square_matrix() {
        let result = FriendshipGraph::from_reader("a1,a2\n0,1\n".as_bytes(), "f.csv");
        assert!(matches!(result, Err(AnalysisError::DataFormatError { .. })));
    }

    #[test]
    fn test_in_degree_centrality() {
        let c = graph().in_degree_centrality();
        assert!((value(&c, "a3") - 1.0).abs() < 1e-12);
        assert!((value(&c, "a1") - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(value(&c, "a4"), 0.0);
    }

    #[test]
    fn test_local_reaching_centrality() {
        let c = graph().local_reaching_centrality();
        // a1 reaches a2, a3; a4 reaches a3, a1, a2
        assert!((value(&c, "a1") - 2.0 / 3.0).abs() < 1e-12);
        assert!((value(&c, "a4") - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_closeness_centrality() {
        let c = graph().closeness_centrality();
        // a3 is reached by a1, a2, a4 in one hop
        assert!((value(&c, "a3") - 1.0).abs() < 1e-12);
        // nobody reaches a4
        assert_eq!(value(&c, "a4"), 0.0);
        // a2 <- a1 (1), a3 (2), a2 <- a4 (3)
        let expected = (3.0 / 6.0) * (3.0 / 3.0);
        assert!((value(&c, "a2") - expected).abs() < 1e-12);
    }

    #[test]
    fn test_in_degree_histogram() {
        let h = graph().in_degree_histogram();
        assert_eq!(h.get(&0), Some(&1));
        assert_eq!(h.get(&1), Some(&2));
        assert_eq!(h.get(&3), Some(&1));
        assert_eq!(h.get(&2), None);
    }

    #[test]
    fn test_vote_rank() {
        let g = graph();
        let ranked = g.vote_rank(4);
        // a1 collects votes from a2 and a3 in the first round
        assert_eq!(ranked.first().map(String::as_str), Some("a1"));
        assert!(ranked.len() <= 4);
        assert!(!ranked.is_empty());
        assert!(g.vote_rank(0).is_empty());
    }

    #[test]
    fn test_vote_rank_ties_follow_edge_order() {
        // a2 and a4 tie in the first round; a4 enters the graph first via a1 -> a4
        let matrix = "a1,a2,a3,a4\n0,0,0,1\n1,0,1,0\n0,0,0,0\n1,0,1,0\n";
        let g = FriendshipGraph::from_reader(matrix.as_bytes(), "friendship.csv").unwrap();
        assert_eq!(g.vote_rank(4), vec!["a4", "a2"]);
    }

    #[test]
    fn test_report_and_html() {
        let g = graph();
        let report = g.statistics().report();
        assert!(report.contains("===== Closeness Centrality ====="));
        assert!(report.contains("'Degree: 3': 1"));

        let html = g.to_html().unwrap();
        assert!(html.contains("vis.Network"));
        assert!(html.contains("\"from\":\"a4\""));
    }
}

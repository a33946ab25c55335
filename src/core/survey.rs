//! Converts raw survey answers into the simulator's `friendship.csv` and `courses.csv`.

use crate::utils::error::{AnalysisError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;

pub const FRIEND_SLOTS: usize = 3;
pub const COURSE_SLOTS: usize = 9;

/// One survey answer: the student, three ranked friends and nine ranked courses.
#[derive(Debug, Clone, Deserialize)]
pub struct SurveyRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "F1")]
    pub f1: String,
    #[serde(rename = "F2")]
    pub f2: String,
    #[serde(rename = "F3")]
    pub f3: String,
    #[serde(rename = "CR1")]
    pub cr1: String,
    #[serde(rename = "CR2")]
    pub cr2: String,
    #[serde(rename = "CR3")]
    pub cr3: String,
    #[serde(rename = "CR4")]
    pub cr4: String,
    #[serde(rename = "CR5")]
    pub cr5: String,
    #[serde(rename = "CR6")]
    pub cr6: String,
    #[serde(rename = "CR7")]
    pub cr7: String,
    #[serde(rename = "CR8")]
    pub cr8: String,
    #[serde(rename = "CR9")]
    pub cr9: String,
}

impl SurveyRow {
    pub fn friends(&self) -> [&str; FRIEND_SLOTS] {
        [&self.f1, &self.f2, &self.f3]
    }

    pub fn courses(&self) -> [&str; COURSE_SLOTS] {
        [
            &self.cr1, &self.cr2, &self.cr3, &self.cr4, &self.cr5, &self.cr6, &self.cr7,
            &self.cr8, &self.cr9,
        ]
    }
}

pub fn read_survey<R: Read>(reader: R) -> Result<Vec<SurveyRow>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut rows = Vec::new();
    for row in csv_reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

/// Student index in order of first appearance in the `Name` column.
fn index_students(rows: &[SurveyRow]) -> HashMap<&str, usize> {
    let mut index = HashMap::new();
    for row in rows {
        let next = index.len();
        index.entry(row.name.as_str()).or_insert(next);
    }
    index
}

/// Square matrix where row `i` rates friend `j` with `(3 - rank) * weight`.
pub fn friendship_matrix(rows: &[SurveyRow], weight: u32) -> Result<Vec<Vec<u32>>> {
    let index = index_students(rows);
    let n = rows.len();
    let mut matrix = vec![vec![0u32; n]; n];

    for (i, row) in rows.iter().enumerate() {
        for (rank, friend) in row.friends().into_iter().enumerate() {
            let &j = index.get(friend).ok_or_else(|| {
                AnalysisError::data_format(
                    "survey",
                    format!("{} names unknown friend '{}'", row.name, friend),
                )
            })?;
            matrix[i][j] = (FRIEND_SLOTS - rank) as u32 * weight;
        }
    }

    Ok(matrix)
}

/// Per-student course ratings; the top choice scores 9, unlisted courses stay empty.
pub fn course_matrix(rows: &[SurveyRow]) -> Result<Vec<[Option<u32>; COURSE_SLOTS]>> {
    rows.iter()
        .map(|row| {
            let mut ratings = [None; COURSE_SLOTS];
            for (rank, course) in row.courses().into_iter().enumerate() {
                let slot = course
                    .strip_prefix('C')
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|n| (1..=COURSE_SLOTS).contains(n))
                    .ok_or_else(|| {
                        AnalysisError::data_format(
                            "survey",
                            format!("{} ranks unknown course '{}'", row.name, course),
                        )
                    })?;
                ratings[slot - 1] = Some((COURSE_SLOTS - rank) as u32);
            }
            Ok(ratings)
        })
        .collect()
}

pub fn friendship_csv(matrix: &[Vec<u32>]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let header: Vec<String> = (1..=matrix.len()).map(|i| format!("a{}", i)).collect();
    writer.write_record(&header)?;
    for row in matrix {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    into_string(writer)
}

pub fn courses_csv(matrix: &[[Option<u32>; COURSE_SLOTS]]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let header: Vec<String> = (1..=COURSE_SLOTS).map(|i| format!("c{}", i)).collect();
    writer.write_record(&header)?;
    for row in matrix {
        writer.write_record(row.iter().map(|v| v.map(|r| r.to_string()).unwrap_or_default()))?;
    }
    into_string(writer)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer.into_inner().map_err(|e| AnalysisError::ProcessingError {
        message: format!("failed to flush csv: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| AnalysisError::ProcessingError {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SURVEY: &str = "\
Name,F1,F2,F3,CR1,CR2,CR3,CR4,CR5,CR6,CR7,CR8,CR9
Ann,Bob,Cid,Dee,C9,C2,C3,C5,C8,C7,C1,C4,C6
Bob,Ann,Dee,Cid,C1,C2,C3,C4,C5,C6,C7,C8,C9
Cid,Dee,Ann,Bob,C2,C1,C3,C4,C5,C6,C7,C8,C9
Dee,Cid,Bob,Ann,C3,C2,C1,C4,C5,C6,C7,C8,C9
";

    #[test]
    fn test_friendship_matrix() {
        let rows = read_survey(SURVEY.as_bytes()).unwrap();
        let matrix = friendship_matrix(&rows, 2).unwrap();
        assert_eq!(matrix[0], vec![0, 6, 4, 2]);
        assert_eq!(matrix[3], vec![2, 4, 6, 0]);

        let csv = friendship_csv(&matrix).unwrap();
        assert!(csv.starts_with("a1,a2,a3,a4\n0,6,4,2\n"));
    }

    #[test]
    fn test_course_matrix() {
        let rows = read_survey(SURVEY.as_bytes()).unwrap();
        let matrix = course_matrix(&rows).unwrap();
        // Ann ranks C9 first and C6 last
        assert_eq!(matrix[0][8], Some(9));
        assert_eq!(matrix[0][5], Some(1));
        assert_eq!(matrix[1][0], Some(9));

        let csv = courses_csv(&matrix).unwrap();
        assert!(csv.starts_with("c1,c2,c3,c4,c5,c6,c7,c8,c9\n3,8,7,2,6,1,4,5,9\n"));
    }

    #[test]
    fn test_unknown_names_are_errors() {
        let bad_friend = SURVEY.replace("Ann,Bob,Cid,Dee", "Ann,Bob,Cid,Eve");
        let rows = read_survey(bad_friend.as_bytes()).unwrap();
        assert!(friendship_matrix(&rows, 1).is_err());

        let bad_course = SURVEY.replace("C9,C2,C3", "C10,C2,C3");
        let rows = read_survey(bad_course.as_bytes()).unwrap();
        assert!(course_matrix(&rows).is_err());
    }
}

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::models::{ScoredItem, UserRecommendations};

/// Read the user manifest: one id per line, blank lines skipped
pub fn load_manifest(path: &Path) -> Result<Vec<String>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(parse_manifest(&raw))
}

pub fn parse_manifest(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Numeric ids ascending, then non-numeric ids lexicographically
fn compare_items(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

pub fn format_line(user: &str, items: &[ScoredItem]) -> String {
    let mut ids: Vec<&str> = items.iter().map(|s| s.item.as_str()).collect();
    ids.sort_by(|a, b| compare_items(a, b));
    format!("{}:{}", user, ids.join(","))
}

/// One line per manifest user; users without votes get an empty list
pub fn write_recommendations<W: Write>(
    recommendations: &UserRecommendations,
    users: &[String],
    mut writer: W,
) -> Result<()> {
    for user in users {
        writeln!(writer, "{}", format_line(user, recommendations.get(user)))?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes final and intermediate result files against a fixed manifest
#[derive(Debug, Clone)]
pub struct ResultsWriter {
    users: Vec<String>,
    results_file: String,
}

impl ResultsWriter {
    pub fn new(users: Vec<String>, results_file: &str) -> Self {
        Self {
            users,
            results_file: results_file.to_string(),
        }
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn final_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.txt", self.results_file))
    }

    pub fn intermediate_path(&self, member_number: usize) -> PathBuf {
        PathBuf::from(format!("{}_{}.txt", self.results_file, member_number))
    }

    pub fn save(&self, recommendations: &UserRecommendations, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        write_recommendations(recommendations, &self.users, BufWriter::new(file))?;
        info!(path = %path.display(), users = self.users.len(), "Saved results");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(items: &[(&str, f64)]) -> Vec<ScoredItem> {
        items
            .iter()
            .map(|(item, weight)| ScoredItem {
                item: item.to_string(),
                weight: *weight,
            })
            .collect()
    }

    #[test]
    fn test_items_sorted_numerically() {
        let line = format_line("5", &scored(&[("100", 3.0), ("20", 5.0), ("3", 1.0)]));
        assert_eq!(line, "5:3,20,100");
    }

    #[test]
    fn test_non_numeric_items_after_numeric() {
        let line = format_line("u", &scored(&[("b", 1.0), ("7", 1.0), ("a", 1.0)]));
        assert_eq!(line, "u:7,a,b");
    }

    #[test]
    fn test_missing_user_gets_empty_line() {
        let mut recs = UserRecommendations::new();
        recs.insert("1".to_string(), scored(&[("10", 1.0), ("9", 2.0)]));
        let users = vec!["1".to_string(), "2".to_string()];

        let mut out = Vec::new();
        write_recommendations(&recs, &users, &mut out).expect("write");

        assert_eq!(String::from_utf8(out).expect("utf8"), "1:9,10\n2:\n");
    }

    #[test]
    fn test_parse_manifest_skips_blank_lines() {
        assert_eq!(parse_manifest("1\n\n 2 \n3\r\n"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_writer_paths_and_save() {
        let dir = tempfile::tempdir().expect("tempdir");
        let base = dir.path().join("out").join("results");
        let writer = ResultsWriter::new(vec!["1".to_string()], &base.to_string_lossy());

        assert!(writer.final_path().ends_with("out/results.txt"));
        assert!(writer.intermediate_path(3).ends_with("out/results_3.txt"));

        writer
            .save(&UserRecommendations::new(), &writer.final_path())
            .expect("save");
        let written = std::fs::read_to_string(writer.final_path()).expect("read");
        assert_eq!(written, "1:\n");
    }
}

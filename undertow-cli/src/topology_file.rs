//! Topology file loading.
//!
//! One link per line as `RouterA RouterB cost`; blank lines and `#` comments
//! are skipped.

use std::path::Path;

use undertow_core::{EdgeRecord, Topology, TopologyError};

/// Topology used when no file is given. Never written to disk.
pub const SAMPLE_TOPOLOGY: &str = "\
# Sample network topology
# Format: RouterA RouterB Cost
A B 2
A C 5
B C 1
B D 3
C D 2
";

#[derive(Debug, thiserror::Error)]
pub enum TopologyFileError {
    #[error("Line {line}: expected `RouterA RouterB cost`, found {found:?}")]
    Malformed { line: usize, found: String },

    #[error("Line {line}: cost {value:?} is not an integer")]
    BadCost { line: usize, value: String },

    #[error("Line {line}: {source}")]
    Invalid {
        line: usize,
        #[source]
        source: TopologyError,
    },

    #[error("{0}")]
    Topology(#[from] TopologyError),

    #[error("Cannot read topology file: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses topology text, reporting problems by 1-based line number.
///
/// # Errors
/// - `TopologyFileError::Malformed` - Line does not have exactly three fields
/// - `TopologyFileError::BadCost` - Cost field is not an integer
/// - `TopologyFileError::Invalid` - Record rejected by topology validation
/// - `TopologyFileError::Topology` - No links at all
pub fn parse_topology(text: &str) -> Result<Topology, TopologyFileError> {
    let mut records = Vec::new();
    let mut lines = Vec::new();

    for (index, raw) in text.lines().enumerate() {
        let line = index + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let [a, b, cost] = fields.as_slice() else {
            return Err(TopologyFileError::Malformed {
                line,
                found: trimmed.to_string(),
            });
        };
        let cost = cost.parse::<i64>().map_err(|_| TopologyFileError::BadCost {
            line,
            value: (*cost).to_string(),
        })?;

        records.push(EdgeRecord::new(*a, *b, cost));
        lines.push(line);
    }

    Topology::from_records(records).map_err(|source| match record_index(&source) {
        Some(index) => TopologyFileError::Invalid {
            line: lines.get(index).copied().unwrap_or(index + 1),
            source,
        },
        None => TopologyFileError::Topology(source),
    })
}

/// Reads a topology file, or the built-in sample when `path` is `None`.
///
/// # Errors
/// - `TopologyFileError::Io` - File cannot be read
/// - Any error of [`parse_topology`]
pub async fn load_topology(path: Option<&Path>) -> Result<Topology, TopologyFileError> {
    match path {
        Some(path) => {
            let text = tokio::fs::read_to_string(path).await?;
            tracing::info!("Loading topology from {}", path.display());
            parse_topology(&text)
        }
        None => {
            tracing::info!("No topology file given, using the built-in sample");
            parse_topology(SAMPLE_TOPOLOGY)
        }
    }
}

fn record_index(error: &TopologyError) -> Option<usize> {
    match error {
        TopologyError::Empty => None,
        TopologyError::SelfLoop { index, .. }
        | TopologyError::NonPositiveCost { index, .. }
        | TopologyError::CostTooLarge { index, .. }
        | TopologyError::ConflictingDuplicate { index, .. } => Some(*index),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use undertow_core::NodeId;

    use super::*;

    #[test]
    fn test_sample_topology_parses() {
        let topology = parse_topology(SAMPLE_TOPOLOGY).unwrap();
        assert_eq!(topology.nodes().len(), 4);
        assert_eq!(topology.edge_count(), 5);
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let text = "\n# header\n  A B 4  \n\n# tail\n";
        let topology = parse_topology(text).unwrap();
        assert_eq!(topology.edge_count(), 1);
        assert_eq!(
            topology.link_cost(&NodeId::from("B"), &NodeId::from("A")),
            Some(undertow_core::Cost::new(4))
        );
    }

    #[test]
    fn test_errors_report_line_numbers() {
        let err = parse_topology("A B 1\nA B\n").unwrap_err();
        assert!(matches!(err, TopologyFileError::Malformed { line: 2, .. }));

        let err = parse_topology("# c\nA B x\n").unwrap_err();
        assert!(matches!(err, TopologyFileError::BadCost { line: 2, .. }));

        let err = parse_topology("A B 1\n\n# skip\nC C 3\n").unwrap_err();
        assert!(matches!(
            err,
            TopologyFileError::Invalid {
                line: 4,
                source: TopologyError::SelfLoop { .. }
            }
        ));
        assert!(err.to_string().starts_with("Line 4:"));

        let err = parse_topology("# only comments\n").unwrap_err();
        assert!(matches!(err, TopologyFileError::Topology(TopologyError::Empty)));
    }

    #[tokio::test]
    async fn test_load_from_file_and_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "X Y 7").unwrap();

        let topology = load_topology(Some(file.path())).await.unwrap();
        assert_eq!(topology.edge_count(), 1);

        let sample = load_topology(None).await.unwrap();
        assert_eq!(sample.edge_count(), 5);

        let missing = tempfile::tempdir().unwrap().path().join("missing.txt");
        assert!(matches!(
            load_topology(Some(&missing)).await,
            Err(TopologyFileError::Io(_))
        ));
    }
}

//! Save file inspection
//!
//! The converter writes a fixed header (a warning line, a version line, a
//! blank line and 64 color rows) followed by `Linecount <n>`. The total is
//! read from that fixed line, and the label is checked before the number is
//! trusted.

use crate::config::ArtifactConfig;
use crate::error::{Error, Result};
use std::path::Path;
use tracing::debug;

/// Read the declared brick total from a save file on disk
pub fn read_declared_total(path: &Path, layout: &ArtifactConfig) -> Result<u64> {
    let content = std::fs::read_to_string(path)?;
    let total = parse_declared_total(&content, layout)?;
    debug!("Save {} declares {} bricks", path.display(), total);
    Ok(total)
}

/// Parse the declared brick total out of save file text
pub fn parse_declared_total(content: &str, layout: &ArtifactConfig) -> Result<u64> {
    let index = layout.total_line_index;
    // Reported line numbers are 1-based
    let line_no = index + 1;

    let line = content.lines().nth(index).ok_or_else(|| Error::ArtifactFormat {
        line: line_no,
        reason: format!(
            "file has only {} lines",
            content.lines().count()
        ),
    })?;

    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.as_slice() {
        [label, total] if *label == layout.total_label => {
            total.parse::<u64>().map_err(|e| Error::ArtifactFormat {
                line: line_no,
                reason: format!("total '{}' is not a count: {}", total, e),
            })
        }
        [label, ..] if *label != layout.total_label => Err(Error::ArtifactFormat {
            line: line_no,
            reason: format!(
                "expected label '{}', found '{}'",
                layout.total_label, label
            ),
        }),
        _ => Err(Error::ArtifactFormat {
            line: line_no,
            reason: format!(
                "expected '{} <count>', found '{}'",
                layout.total_label, line
            ),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Save text shaped like the converter's output
    fn save_text(total_line: &str, bricks: usize) -> String {
        let mut out = String::from(
            "This is a Blockland save file.  You probably shouldn't modify it cause you'll screw it up.\r\n",
        );
        out.push_str("1\r\n\r\n");
        for _ in 0..64 {
            out.push_str("1.000000 0.000000 1.000000 0.000000\r\n");
        }
        out.push_str(total_line);
        out.push_str("\r\n");
        for i in 0..bricks {
            out.push_str(&format!("4x Cube\" {} 0 0.6 0 1 1 0  0 1 1 1\r\n", i));
            out.push_str("+-OWNER 999999\r\n");
        }
        out
    }

    #[test]
    fn test_reads_total_written_by_converter() {
        let text = save_text("Linecount 3", 3);
        let total = parse_declared_total(&text, &ArtifactConfig::default()).unwrap();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_reads_large_total() {
        let text = save_text("Linecount 1234", 0);
        assert_eq!(
            parse_declared_total(&text, &ArtifactConfig::default()).unwrap(),
            1234
        );
    }

    #[test]
    fn test_wrong_label_is_loud() {
        let text = save_text("Brickcount 12", 0);
        let err = parse_declared_total(&text, &ArtifactConfig::default()).unwrap_err();
        match err {
            Error::ArtifactFormat { line, reason } => {
                assert_eq!(line, 68);
                assert!(reason.contains("Brickcount"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_truncated_file_is_loud() {
        let err = parse_declared_total("Linecount 5\r\n", &ArtifactConfig::default()).unwrap_err();
        assert!(matches!(err, Error::ArtifactFormat { line: 68, .. }));
    }

    #[test]
    fn test_non_numeric_total_rejected() {
        let text = save_text("Linecount many", 0);
        assert!(parse_declared_total(&text, &ArtifactConfig::default()).is_err());
    }

    #[test]
    fn test_extra_tokens_rejected() {
        let text = save_text("Linecount 12 13", 0);
        assert!(parse_declared_total(&text, &ArtifactConfig::default()).is_err());
    }

    #[test]
    fn test_custom_layout() {
        let layout = ArtifactConfig {
            total_line_index: 1,
            total_label: "Total".to_string(),
        };
        assert_eq!(parse_declared_total("header\nTotal 9\n", &layout).unwrap(), 9);
    }

    #[test]
    fn test_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output.bls");
        std::fs::write(&path, save_text("Linecount 7", 7)).unwrap();
        assert_eq!(
            read_declared_total(&path, &ArtifactConfig::default()).unwrap(),
            7
        );
    }
}

//! Parsed unified-diff model: one `FileDiff` per file, each with ordered hunks.

use serde::{Deserialize, Serialize};

use crate::domain::error::{PatchError, Result};

/// One line of a hunk body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "text", rename_all = "snake_case")]
pub enum HunkLine {
    Context(String),
    Removed(String),
    Added(String),
}

/// A contiguous block of changes (`@@ -old_start,old_count +new_start,new_count @@`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
    pub lines: Vec<HunkLine>,
    /// The last pre-image line ends the file without a newline
    /// (`\ No newline at end of file` on the old side)
    #[serde(default)]
    pub old_missing_newline: bool,
    /// The last post-image line ends the file without a newline
    #[serde(default)]
    pub new_missing_newline: bool,
}

impl Hunk {
    /// Zero-based index of the first pre-image line. A zero-count range
    /// names the line *after which* the hunk applies.
    pub fn old_index(&self) -> usize {
        anchor(self.old_start, self.old_count)
    }

    /// Zero-based index of the first post-image line.
    pub fn new_index(&self) -> usize {
        anchor(self.new_start, self.new_count)
    }

    /// The hunk reaches the end of the file and states its newline.
    pub fn touches_end_of_file(&self) -> bool {
        self.old_missing_newline || self.new_missing_newline
    }

    /// `true` when at least one line is removed.
    pub fn removes_lines(&self) -> bool {
        self.lines.iter().any(|l| matches!(l, HunkLine::Removed(_)))
    }

    /// Lines the prior content must contain (context + removed).
    pub fn pre_image(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            HunkLine::Context(t) | HunkLine::Removed(t) => Some(t.as_str()),
            HunkLine::Added(_) => None,
        })
    }

    /// Lines the patched content contains (context + added).
    pub fn post_image(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|l| match l {
            HunkLine::Context(t) | HunkLine::Added(t) => Some(t.as_str()),
            HunkLine::Removed(_) => None,
        })
    }
}

fn anchor(start: usize, count: usize) -> usize {
    if count == 0 {
        start
    } else {
        start.saturating_sub(1)
    }
}

/// All changes to a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDiff {
    /// `None` for a new file (`--- /dev/null`)
    pub source: Option<String>,
    /// `None` for a deleted file (`+++ /dev/null`)
    pub destination: Option<String>,
    pub hunks: Vec<Hunk>,
}

/// What a diff entry does to the remote file. Exactly one per entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction<'a> {
    Create { path: &'a str },
    Modify { path: &'a str },
    Delete { path: &'a str },
}

impl FileDiff {
    pub fn action(&self) -> Result<FileAction<'_>> {
        match (self.source.as_deref(), self.destination.as_deref()) {
            (Some(path), None) => Ok(FileAction::Delete { path }),
            (None, Some(path)) => Ok(FileAction::Create { path }),
            (Some(source), Some(destination)) if source == destination => {
                Ok(FileAction::Modify { path: destination })
            }
            (Some(source), Some(destination)) => Err(PatchError::Unsupported(format!(
                "renaming {source} to {destination}"
            ))),
            (None, None) => Err(PatchError::Input(
                "diff entry has neither a source nor a destination path".to_string(),
            )),
        }
    }

    /// Path used in logs and reports.
    pub fn display_path(&self) -> &str {
        self.destination
            .as_deref()
            .or(self.source.as_deref())
            .unwrap_or("<unnamed>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(source: Option<&str>, destination: Option<&str>) -> FileDiff {
        FileDiff {
            source: source.map(String::from),
            destination: destination.map(String::from),
            hunks: vec![],
        }
    }

    #[test]
    fn test_action_per_path_combination() {
        assert_eq!(
            file(None, Some("foo.txt")).action().unwrap(),
            FileAction::Create { path: "foo.txt" }
        );
        assert_eq!(
            file(Some("bar.txt"), Some("bar.txt")).action().unwrap(),
            FileAction::Modify { path: "bar.txt" }
        );
        assert_eq!(
            file(Some("old.txt"), None).action().unwrap(),
            FileAction::Delete { path: "old.txt" }
        );
    }

    #[test]
    fn test_rename_is_unsupported() {
        let err = file(Some("a.txt"), Some("b.txt")).action().unwrap_err();
        assert!(matches!(err, PatchError::Unsupported(_)));
    }

    #[test]
    fn test_hunk_anchor_for_insertions() {
        let hunk = Hunk {
            old_start: 0,
            old_count: 0,
            new_start: 1,
            new_count: 2,
            lines: vec![
                HunkLine::Added("a".into()),
                HunkLine::Added("b".into()),
            ],
            old_missing_newline: false,
            new_missing_newline: false,
        };
        assert_eq!(hunk.old_index(), 0);
        assert_eq!(hunk.new_index(), 0);
        assert_eq!(hunk.pre_image().count(), 0);
        assert_eq!(hunk.post_image().collect::<Vec<_>>(), vec!["a", "b"]);

        let append = Hunk {
            old_start: 5,
            old_count: 0,
            new_start: 6,
            new_count: 1,
            lines: vec![HunkLine::Added("tail".into())],
            old_missing_newline: false,
            new_missing_newline: false,
        };
        assert_eq!(append.old_index(), 5);
        assert_eq!(append.new_index(), 5);
    }
}

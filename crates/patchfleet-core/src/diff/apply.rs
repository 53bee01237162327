//! Hunk application against line-oriented file content.
//!
//! Content is modelled as the result of splitting on `\n`: a trailing newline
//! survives as a final empty line, and the empty file is the empty sequence.
//! Nothing is added or stripped when the lines are joined back. The final
//! newline changes only when a hunk's `\ No newline at end of file` markers
//! say it does.

use crate::domain::{FileAction, FileDiff, Hunk, HunkLine, PatchError, Result};

/// Result of applying one `FileDiff`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// The patched lines
    Content(Vec<String>),
    /// The file is to be removed
    Deleted,
}

/// Split file content into lines.
pub fn split_lines(content: &str) -> Vec<String> {
    if content.is_empty() {
        return Vec::new();
    }
    content.split('\n').map(str::to_string).collect()
}

/// Inverse of [`split_lines`].
pub fn join_lines(lines: &[String]) -> String {
    lines.join("\n")
}

/// Applies parsed hunks to prior content. Stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiffApplier;

impl DiffApplier {
    pub fn new() -> Self {
        DiffApplier
    }

    /// Apply `file` to `prior`.
    ///
    /// - deletion: when `prior` is given, the hunks must remove all of it
    /// - creation: `prior` is ignored; hunks build the file from nothing
    /// - modification: every hunk's context and removed lines must match
    ///   `prior` exactly at the hunk's position
    pub fn apply(&self, prior: Option<&[String]>, file: &FileDiff) -> Result<Applied> {
        match file.action()? {
            FileAction::Delete { path } => {
                let Some(prior) = prior else {
                    return Ok(Applied::Deleted);
                };
                let remaining = apply_hunks(prior, &file.hunks, path)?;
                // a final newline is all that may be left over
                let fully_removed = match remaining.as_slice() {
                    [] => true,
                    [last] => last.is_empty(),
                    _ => false,
                };
                if !fully_removed {
                    return Err(PatchError::PatchDoesNotApply {
                        path: path.to_string(),
                        hunk: file.hunks.len(),
                        reason: format!(
                            "{} line(s) would remain after deleting the file",
                            remaining.len()
                        ),
                    });
                }
                Ok(Applied::Deleted)
            }
            FileAction::Create { path } => {
                apply_hunks(&[], &file.hunks, path).map(Applied::Content)
            }
            FileAction::Modify { path } => {
                apply_hunks(prior.unwrap_or(&[]), &file.hunks, path).map(Applied::Content)
            }
        }
    }

    /// `true` when `current` already holds the result of every hunk.
    ///
    /// A hunk counts as applied when its post-image is present at its new
    /// position and, if it removes lines, its pre-image is no longer present
    /// at its old position. Hunks with an empty post-image can never be
    /// confirmed this way.
    pub fn is_already_applied(&self, current: &[String], file: &FileDiff) -> bool {
        !file.hunks.is_empty()
            && file.hunks.iter().all(|hunk| {
                let eof = hunk.touches_end_of_file();
                hunk.post_image().next().is_some()
                    && image_at(
                        current,
                        hunk.new_index(),
                        hunk.post_image(),
                        eof.then_some(hunk.new_missing_newline),
                    )
                    && !(hunk.removes_lines()
                        && image_at(
                            current,
                            hunk.old_index(),
                            hunk.pre_image(),
                            eof.then_some(hunk.old_missing_newline),
                        ))
            })
    }
}

/// Whether `image` appears in `current` starting at `at`.
///
/// `end_of_file` is `None` when the hunk says nothing about the end of the
/// file; otherwise `Some(missing_newline)` requires the image to end the
/// file, with or without a final newline.
fn image_at<'a>(
    current: &[String],
    at: usize,
    image: impl Iterator<Item = &'a str>,
    end_of_file: Option<bool>,
) -> bool {
    let mut end = at;
    for expected in image {
        match current.get(end) {
            Some(found) if found.as_str() == expected => end += 1,
            _ => return false,
        }
    }
    match end_of_file {
        None => true,
        Some(true) => end == current.len(),
        Some(false) => end + 1 == current.len() && current[end].is_empty(),
    }
}

fn apply_hunks(prior: &[String], hunks: &[Hunk], path: &str) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(prior.len());
    let mut cursor = 0;

    for (index, hunk) in hunks.iter().enumerate() {
        let number = index + 1;
        let fail = |reason: String| PatchError::PatchDoesNotApply {
            path: path.to_string(),
            hunk: number,
            reason,
        };

        let start = hunk.old_index();
        if start < cursor {
            return Err(fail("overlaps the previous hunk".to_string()));
        }
        if start > prior.len() {
            return Err(fail(format!(
                "starts at line {} but the file has {} line(s)",
                hunk.old_start,
                prior.len()
            )));
        }
        out.extend_from_slice(&prior[cursor..start]);

        let mut pos = start;
        for line in &hunk.lines {
            match line {
                HunkLine::Context(expected) | HunkLine::Removed(expected) => {
                    match prior.get(pos) {
                        Some(found) if found == expected => {}
                        Some(found) => {
                            return Err(fail(format!(
                                "line {}: expected {expected:?}, found {found:?}",
                                pos + 1
                            )))
                        }
                        None => {
                            return Err(fail(format!(
                                "line {}: expected {expected:?}, found end of file",
                                pos + 1
                            )))
                        }
                    }
                    if let HunkLine::Context(text) = line {
                        out.push(text.clone());
                    }
                    pos += 1;
                }
                HunkLine::Added(text) => out.push(text.clone()),
            }
        }
        cursor = pos;
    }

    let tail = &prior[cursor..];
    let Some(last) = hunks.last().filter(|h| h.touches_end_of_file()) else {
        out.extend_from_slice(tail);
        return Ok(out);
    };
    let fail = |reason: &str| PatchError::PatchDoesNotApply {
        path: path.to_string(),
        hunk: hunks.len(),
        reason: reason.to_string(),
    };

    // with no trailing newline the old side must be the end of the file
    if last.old_missing_newline && !tail.is_empty() {
        return Err(fail("expected end of file without a final newline"));
    }
    if last.new_missing_newline {
        match tail {
            [] => {}
            [newline] if newline.is_empty() => {}
            _ => return Err(fail("expected end of file after the last line")),
        }
    } else if last.old_missing_newline {
        out.push(String::new());
    } else {
        out.extend_from_slice(tail);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_split_and_join_preserve_trailing_newline() {
        assert_eq!(split_lines(""), Vec::<String>::new());
        assert_eq!(split_lines("a\nb"), lines(&["a", "b"]));
        assert_eq!(split_lines("a\nb\n"), lines(&["a", "b", ""]));
        assert_eq!(join_lines(&split_lines("a\nb\n")), "a\nb\n");
        assert_eq!(join_lines(&split_lines("x\r\ny")), "x\r\ny");
    }

    #[test]
    fn test_hunk_past_end_of_file() {
        let hunk = Hunk {
            old_start: 9,
            old_count: 1,
            new_start: 9,
            new_count: 1,
            lines: vec![
                HunkLine::Removed("a".into()),
                HunkLine::Added("b".into()),
            ],
            old_missing_newline: false,
            new_missing_newline: false,
        };
        let err = apply_hunks(&lines(&["a"]), &[hunk], "f.txt").unwrap_err();
        match err {
            PatchError::PatchDoesNotApply { hunk, reason, .. } => {
                assert_eq!(hunk, 1);
                assert!(reason.contains("line(s)"), "{reason}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

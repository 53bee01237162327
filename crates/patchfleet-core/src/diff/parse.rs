//! Unified-diff text parser.
//!
//! Accepts the output of `diff -u` and `git diff`: per-file `---`/`+++`
//! headers followed by `@@ -a,b +c,d @@` hunks. Git extended headers
//! (`diff --git`, `index`, `new file mode`, ...) and any other text between
//! files are skipped. Hunk bodies are delimited by the counts in the hunk
//! header, so removed lines that look like `--- ` headers are still parsed
//! as removals.

use crate::domain::{FileDiff, Hunk, HunkLine, PatchError, Result};

const DEV_NULL: &str = "/dev/null";

/// Parse a multi-file unified diff.
///
/// Fails with `PatchError::DiffParse` on malformed headers or truncated
/// hunks, and with `PatchError::Input` when the text holds no file changes.
pub fn parse_unified_diff(text: &str) -> Result<Vec<FileDiff>> {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut files: Vec<FileDiff> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        if let Some(old) = line.strip_prefix("--- ") {
            let new = lines
                .get(i + 1)
                .and_then(|l| l.strip_prefix("+++ "))
                .ok_or_else(|| parse_error(i + 2, "expected '+++ ' after '--- ' header"))?;
            files.push(FileDiff {
                source: header_path(old, "a/"),
                destination: header_path(new, "b/"),
                hunks: Vec::new(),
            });
            i += 2;
            continue;
        }

        if line.starts_with("@@") {
            let file = files
                .last_mut()
                .ok_or_else(|| parse_error(i + 1, "hunk before any file header"))?;
            let (hunk, next) = parse_hunk(&lines, i)?;
            file.hunks.push(hunk);
            i = next;
            continue;
        }

        i += 1;
    }

    if files.is_empty() {
        return Err(PatchError::Input(
            "patch contains no file changes".to_string(),
        ));
    }
    Ok(files)
}

/// Parse the hunk whose header is at `lines[at]`; returns the hunk and the
/// index of the first line after it.
fn parse_hunk(lines: &[&str], at: usize) -> Result<(Hunk, usize)> {
    let (old_start, old_count, new_start, new_count) = parse_hunk_header(lines[at], at + 1)?;

    let mut body = Vec::new();
    let (mut old_seen, mut new_seen) = (0usize, 0usize);
    let mut missing_newline = MissingNewline::default();
    let mut i = at + 1;

    while old_seen < old_count || new_seen < new_count {
        let line = *lines
            .get(i)
            .ok_or_else(|| parse_error(i + 1, "unexpected end of diff inside hunk"))?;
        let line_no = i + 1;
        i += 1;

        let (tag, text) = match line.chars().next() {
            Some(tag) => (tag, &line[tag.len_utf8()..]),
            // blank lines inside a hunk are empty context lines whose
            // leading space was stripped by an editor
            None => (' ', ""),
        };
        match tag {
            ' ' => {
                old_seen += 1;
                new_seen += 1;
                body.push(HunkLine::Context(text.to_string()));
            }
            '-' => {
                old_seen += 1;
                body.push(HunkLine::Removed(text.to_string()));
            }
            '+' => {
                new_seen += 1;
                body.push(HunkLine::Added(text.to_string()));
            }
            '\\' => {
                missing_newline.mark(body.last());
                continue;
            }
            _ => {
                return Err(parse_error(
                    line_no,
                    &format!("unexpected line in hunk body: {line:?}"),
                ))
            }
        }
        if old_seen > old_count || new_seen > new_count {
            return Err(parse_error(line_no, "hunk is longer than its header says"));
        }
    }

    // "\ No newline at end of file" after the last body line
    while lines.get(i).is_some_and(|l| l.starts_with('\\')) {
        missing_newline.mark(body.last());
        i += 1;
    }

    let hunk = Hunk {
        old_start,
        old_count,
        new_start,
        new_count,
        lines: body,
        old_missing_newline: missing_newline.old,
        new_missing_newline: missing_newline.new,
    };
    Ok((hunk, i))
}

/// Which side(s) of a hunk end without a trailing newline.
#[derive(Debug, Default)]
struct MissingNewline {
    old: bool,
    new: bool,
}

impl MissingNewline {
    /// A marker applies to the line just before it.
    fn mark(&mut self, previous: Option<&HunkLine>) {
        match previous {
            Some(HunkLine::Context(_)) => {
                self.old = true;
                self.new = true;
            }
            Some(HunkLine::Removed(_)) => self.old = true,
            Some(HunkLine::Added(_)) => self.new = true,
            None => {}
        }
    }
}

/// `@@ -old_start[,old_count] +new_start[,new_count] @@[ section]`
fn parse_hunk_header(line: &str, line_no: usize) -> Result<(usize, usize, usize, usize)> {
    let ranges = line
        .strip_prefix("@@ ")
        .and_then(|rest| rest.split(" @@").next())
        .ok_or_else(|| parse_error(line_no, "malformed hunk header"))?;

    let mut parts = ranges.split_whitespace();
    let old = parts
        .next()
        .and_then(|p| p.strip_prefix('-'))
        .ok_or_else(|| parse_error(line_no, "hunk header is missing the '-' range"))?;
    let new = parts
        .next()
        .and_then(|p| p.strip_prefix('+'))
        .ok_or_else(|| parse_error(line_no, "hunk header is missing the '+' range"))?;

    let (old_start, old_count) = parse_range(old, line_no)?;
    let (new_start, new_count) = parse_range(new, line_no)?;
    Ok((old_start, old_count, new_start, new_count))
}

fn parse_range(range: &str, line_no: usize) -> Result<(usize, usize)> {
    let number = |s: &str| {
        s.parse::<usize>()
            .map_err(|_| parse_error(line_no, &format!("invalid hunk range {range:?}")))
    };
    match range.split_once(',') {
        Some((start, count)) => Ok((number(start)?, number(count)?)),
        None => Ok((number(range)?, 1)),
    }
}

/// Path from a `---`/`+++` header: drops a trailing timestamp, optional
/// quotes and the git `a/` or `b/` prefix. `/dev/null` means "no file".
fn header_path(raw: &str, git_prefix: &str) -> Option<String> {
    let raw = raw.split('\t').next().unwrap_or(raw).trim();
    let raw = raw
        .strip_prefix('"')
        .and_then(|r| r.strip_suffix('"'))
        .unwrap_or(raw);
    if raw == DEV_NULL {
        return None;
    }
    let path = raw.strip_prefix(git_prefix).unwrap_or(raw);
    Some(path.to_string())
}

fn parse_error(line: usize, reason: &str) -> PatchError {
    PatchError::DiffParse {
        line,
        reason: reason.to_string(),
    }
}

//! Interactive repository selection through a text buffer.
//!
//! The buffer is a header line followed by one `[] <name>` line per
//! repository; the user marks the ones to patch as `[X] <name>`.

use patchfleet_store::RepoRef;

use crate::domain::{PatchError, Result};

pub const SELECTION_HEADER: &str = "Select repositories to patch (with 'X'):";

const SELECTED: &str = "[X]";
const UNSELECTED: &str = "[]";

/// Something that lets the user edit a text buffer and returns the result.
pub trait TextEditor {
    fn edit(&self, initial: &str) -> Result<String>;
}

impl<F> TextEditor for F
where
    F: Fn(&str) -> Result<String>,
{
    fn edit(&self, initial: &str) -> Result<String> {
        self(initial)
    }
}

/// The initial buffer: header, then repositories sorted by name.
pub fn render_selection(repos: &[RepoRef]) -> String {
    let mut names: Vec<&str> = repos.iter().map(|r| r.name.as_str()).collect();
    names.sort_unstable();

    let mut buffer = String::from(SELECTION_HEADER);
    buffer.push('\n');
    for name in names {
        buffer.push_str(UNSELECTED);
        buffer.push(' ');
        buffer.push_str(name);
        buffer.push('\n');
    }
    buffer
}

/// Repositories marked `[X]` in an edited buffer, in buffer order.
///
/// The first line is ignored, as are blank lines. Any other line that does
/// not start with `[X]` or `[]`, or names an unknown repository, is an input
/// error.
pub fn parse_selection(buffer: &str, repos: &[RepoRef]) -> Result<Vec<RepoRef>> {
    let mut selected = Vec::new();

    for (index, line) in buffer.lines().enumerate().skip(1) {
        let line = line.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let (chosen, name) = if let Some(rest) = line.strip_prefix(SELECTED) {
            (true, rest.trim())
        } else if let Some(rest) = line.strip_prefix(UNSELECTED) {
            (false, rest.trim())
        } else {
            return Err(PatchError::Input(format!(
                "selection line {}: expected '{SELECTED}' or '{UNSELECTED}' prefix, got {line:?}",
                index + 1
            )));
        };

        let repo = repos.iter().find(|r| r.name == name).ok_or_else(|| {
            PatchError::Input(format!(
                "selection line {}: unknown repository {name:?}",
                index + 1
            ))
        })?;
        if chosen && !selected.contains(repo) {
            selected.push(repo.clone());
        }
    }
    Ok(selected)
}

/// Render, let the user edit, parse.
pub fn select_repositories<E>(editor: &E, repos: &[RepoRef]) -> Result<Vec<RepoRef>>
where
    E: TextEditor + ?Sized,
{
    let edited = editor.edit(&render_selection(repos))?;
    parse_selection(&edited, repos)
}

//! `$VISUAL` / `$EDITOR` on a temporary file.

use std::io::Write;
use std::process::Command;

use patchfleet_core::{PatchError, Result, TextEditor};

const FALLBACK_EDITOR: &str = "vi";

pub struct ExternalEditor {
    /// Program plus leading arguments, e.g. `code --wait`
    command: String,
}

impl ExternalEditor {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }

    /// `$VISUAL`, then `$EDITOR`, then `vi`.
    pub fn from_env() -> Self {
        let command = ["VISUAL", "EDITOR"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.trim().is_empty())
            .unwrap_or_else(|| FALLBACK_EDITOR.to_string());
        Self::new(&command)
    }
}

impl TextEditor for ExternalEditor {
    fn edit(&self, initial: &str) -> Result<String> {
        let mut file = tempfile::Builder::new()
            .prefix("patchfleet-")
            .suffix(".txt")
            .tempfile()?;
        file.write_all(initial.as_bytes())?;
        file.flush()?;

        let mut parts = self.command.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| PatchError::Input("editor command is empty".to_string()))?;
        let status = Command::new(program)
            .args(parts)
            .arg(file.path())
            .status()?;
        if !status.success() {
            return Err(PatchError::Input(format!(
                "editor `{}` exited with {status}",
                self.command
            )));
        }

        Ok(std::fs::read_to_string(file.path())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_buffer_is_returned() {
        let edited = ExternalEditor::new("true").edit("header\n[] api\n").unwrap();
        assert_eq!(edited, "header\n[] api\n");
    }

    #[test]
    fn test_failing_editor_is_input_error() {
        let err = ExternalEditor::new("false").edit("header\n").unwrap_err();
        assert!(matches!(err, PatchError::Input(_)));
    }

    #[test]
    fn test_blank_command_is_rejected() {
        assert!(ExternalEditor::new("   ").edit("x").is_err());
    }
}

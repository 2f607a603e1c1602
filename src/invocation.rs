use crate::error::ProbeError;

/// The command to probe, plus an optional label such as a CVE id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub label: Option<String>,
    pub command: Vec<String>,
}

impl Invocation {
    pub const fn new(label: Option<String>, command: Vec<String>) -> Self {
        Self { label, command }
    }

    /// Resolve the two command-line forms into an invocation.
    ///
    /// `words` is everything after the tool's own flags. The first `--` in it,
    /// if any, separates an optional label from the command.
    ///
    /// - `<command> [args...]`: no `--`, everything is the command.
    /// - `<label> -- <command> [args...]`: one leading word is the label.
    /// - `-- <command> [args...]`: the label, if any, comes from `--label`.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Usage`] when more than one word precedes `--`,
    /// or when a positional label is combined with `--label`.
    pub fn from_args(label_flag: Option<String>, mut words: Vec<String>) -> Result<Self, ProbeError> {
        let Some(sep) = words.iter().position(|w| w == "--") else {
            return Ok(Self::new(label_flag, words));
        };
        let trailing = words.split_off(sep + 1);
        words.pop();
        let mut leading = words;

        match (leading.len(), label_flag) {
            (0, label_flag) => Ok(Self::new(label_flag, trailing)),
            (1, None) => {
                let label = leading.pop();
                tracing::debug!(
                    label = label.as_deref().unwrap_or_default(),
                    "`--` after one word, treating first word as label"
                );
                Ok(Self::new(label, trailing))
            }
            (1, Some(_)) => Err(ProbeError::Usage(
                "label given both positionally and with --label".to_string(),
            )),
            (n, _) => Err(ProbeError::Usage(format!(
                "expected at most one label before `--`, got {n} words"
            ))),
        }
    }

    /// The command as one display string.
    pub fn display_command(&self) -> String {
        self.command.join(" ")
    }
}

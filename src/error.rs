use std::path::PathBuf;

/// Errors raised before a verdict can be reached.
///
/// A probe that crashes is not an error: that is the `Vulnerable` verdict.
/// These variants cover the tool itself failing to do its job.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("empty command")]
    EmptyCommand,

    #[error("usage: {0}")]
    Usage(String),

    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to capture output of `{program}`: {source}")]
    Capture {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl ProbeError {
    /// True when the target program never started.
    pub const fn is_launch_failure(&self) -> bool {
        matches!(self, Self::EmptyCommand | Self::Launch { .. })
    }
}

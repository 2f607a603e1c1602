/// Exit codes the zlib probe produces when the library is patched.
///
/// 1 is the probe's own "expected internal error" path, not a general rule
/// for process exit codes. Other probes may need a different set.
pub const DEFAULT_BENIGN_EXIT_CODES: [i32; 2] = [0, 1];

/// Exit status used for a vulnerable run whose probe exited 0 or 1.
///
/// Only reachable with a custom benign set. 0 would read as a pass and 1 is
/// the tool-fault status, so neither can carry a vulnerable verdict.
pub const REMAPPED_VULNERABLE_EXIT_CODE: i32 = 3;

/// Outcome of one probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    NotVulnerable,
    Vulnerable(i32),
}

impl Verdict {
    /// Classify a child exit code against the benign set.
    pub fn classify(exit_code: i32, benign: &[i32]) -> Self {
        if benign.contains(&exit_code) {
            Self::NotVulnerable
        } else {
            Self::Vulnerable(exit_code)
        }
    }

    /// The exit status this tool should terminate with.
    ///
    /// Never 0 or 1 for a vulnerable run.
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::NotVulnerable => 0,
            Self::Vulnerable(0 | 1) => REMAPPED_VULNERABLE_EXIT_CODE,
            Self::Vulnerable(code) => code,
        }
    }

    /// Stable machine-readable name, used in JSON reports.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotVulnerable => "not_vulnerable",
            Self::Vulnerable(_) => "vulnerable",
        }
    }

    pub const fn is_vulnerable(self) -> bool {
        matches!(self, Self::Vulnerable(_))
    }

    /// Human-readable classification line.
    ///
    /// `observed` is the child's exit code, which for `NotVulnerable` differs
    /// from the tool's own exit status.
    pub fn message(self, target: &str, label: Option<&str>, observed: i32) -> String {
        let body = match self {
            Self::NotVulnerable => format!("{target} is not vulnerable (exit code {observed})"),
            Self::Vulnerable(code) => format!("{target} VULNERABLE (exit code {code})"),
        };
        match label {
            Some(label) => format!("{label}: {body}"),
            None => body,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotVulnerable => write!(f, "not vulnerable"),
            Self::Vulnerable(_) => write!(f, "VULNERABLE"),
        }
    }
}

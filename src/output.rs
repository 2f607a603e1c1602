use std::io::Write;

use serde::Serialize;

use crate::invocation::Invocation;
use crate::runner::Outcome;

/// Machine-readable verdict, printed with `--json`.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub label: Option<&'a str>,
    pub target: &'a str,
    pub command: &'a [String],
    /// Exit code observed from the probe.
    pub exit_code: i32,
    pub verdict: &'static str,
    /// Exit code this tool terminates with.
    pub tool_exit_code: i32,
}

impl<'a> Report<'a> {
    pub fn new(invocation: &'a Invocation, target: &'a str, outcome: &Outcome) -> Self {
        Self {
            label: invocation.label.as_deref(),
            target,
            command: &invocation.command,
            exit_code: outcome.result.exit_code,
            verdict: outcome.verdict.as_str(),
            tool_exit_code: outcome.verdict.exit_code(),
        }
    }
}

/// Write the probe's combined output verbatim, then the verdict.
///
/// A newline is inserted before the verdict when the probe's output does not
/// end with one, so the verdict always sits on its own line.
///
/// # Errors
///
/// Returns an error if writing to `out` fails.
pub fn write_report(
    out: &mut impl Write,
    invocation: &Invocation,
    target: &str,
    outcome: &Outcome,
    json: bool,
) -> anyhow::Result<()> {
    let combined = &outcome.result.combined;
    out.write_all(combined)?;
    if !combined.is_empty() && !combined.ends_with(b"\n") {
        out.write_all(b"\n")?;
    }

    if json {
        let report = Report::new(invocation, target, outcome);
        let rendered = serde_json::to_string_pretty(&report)?;
        writeln!(out, "{rendered}")?;
    } else {
        let line = outcome.verdict.message(
            target,
            invocation.label.as_deref(),
            outcome.result.exit_code,
        );
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::runner::ExecutionResult;
    use crate::verdict::Verdict;

    fn outcome(combined: &[u8], exit_code: i32, verdict: Verdict) -> Outcome {
        Outcome {
            result: ExecutionResult {
                combined: combined.to_vec(),
                exit_code,
            },
            verdict,
        }
    }

    fn render(inv: &Invocation, o: &Outcome, json: bool) -> String {
        let mut buf = Vec::new();
        write_report(&mut buf, inv, "zlib", o, json).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn output_then_verdict_line() {
        let inv = Invocation::new(None, vec!["./probe".to_string()]);
        let text = render(&inv, &outcome(b"hello\n", 1, Verdict::NotVulnerable), false);
        assert_eq!(text, "hello\nzlib is not vulnerable (exit code 1)\n");
    }

    #[test]
    fn separator_added_for_unterminated_output() {
        let inv = Invocation::new(None, vec!["./probe".to_string()]);
        let text = render(&inv, &outcome(b"partial", 134, Verdict::Vulnerable(134)), false);
        assert_eq!(text, "partial\nzlib VULNERABLE (exit code 134)\n");
    }

    #[test]
    fn empty_output_prints_only_verdict() {
        let inv = Invocation::new(Some("CVE-2018-25032".to_string()), vec!["./probe".to_string()]);
        let text = render(&inv, &outcome(b"", 0, Verdict::NotVulnerable), false);
        assert_eq!(text, "CVE-2018-25032: zlib is not vulnerable (exit code 0)\n");
    }

    #[test]
    fn json_report_fields() {
        let inv = Invocation::new(Some("CVE-1".to_string()), vec!["./probe".to_string()]);
        let text = render(&inv, &outcome(b"boom\n", 134, Verdict::Vulnerable(134)), true);
        let (child, json) = text.split_once('\n').unwrap();
        assert_eq!(child, "boom");
        let value: serde_json::Value = serde_json::from_str(json).unwrap();
        assert_eq!(value["label"], "CVE-1");
        assert_eq!(value["target"], "zlib");
        assert_eq!(value["command"][0], "./probe");
        assert_eq!(value["exit_code"], 134);
        assert_eq!(value["verdict"], "vulnerable");
        assert_eq!(value["tool_exit_code"], 134);
    }

    #[test]
    fn json_report_benign_exit_one() {
        let inv = Invocation::new(None, vec!["./probe".to_string()]);
        let text = render(&inv, &outcome(b"", 1, Verdict::NotVulnerable), true);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert!(value["label"].is_null());
        assert_eq!(value["exit_code"], 1);
        assert_eq!(value["verdict"], "not_vulnerable");
        assert_eq!(value["tool_exit_code"], 0);
    }
}

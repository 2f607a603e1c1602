use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use run_cve_check::config::ProbeConfig;
use run_cve_check::invocation::Invocation;
use run_cve_check::output;
use run_cve_check::runner::Runner;

#[derive(Parser)]
#[command(
    name = "run_cve_check",
    version,
    about = "Run a CVE probe and report whether the target library is vulnerable",
    after_help = "Exit status is 0 when the probe exits with a benign code, otherwise the probe's own exit code\n\
                  (3 if that code is 0 or 1, and 1 if the probe could not be run).\n\
                  Use `<label> -- <command>` to tag the run with a CVE id."
)]
struct Cli {
    /// Label printed with the verdict (e.g. a CVE id)
    #[arg(long)]
    label: Option<String>,

    /// Library name printed in the verdict line [default: zlib]
    #[arg(long)]
    target: Option<String>,

    /// Exit code treated as "not vulnerable"; repeat or comma-separate [default: 0,1]
    #[arg(long = "benign-code", value_delimiter = ',')]
    benign_codes: Vec<i32>,

    /// Join the command words with spaces, unescaped, and run the line through the platform shell
    #[arg(long)]
    shell: bool,

    /// Print the verdict as JSON
    #[arg(long)]
    json: bool,

    /// Read settings from this config file instead of the discovered ones
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log spawn and classification details to stderr
    #[arg(short, long)]
    verbose: bool,

    /// The probe command, optionally preceded by `<label> --`
    #[arg(trailing_var_arg = true, value_name = "COMMAND")]
    command_args: Vec<String>,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("RUN_CVE_CHECK_LOG").unwrap_or_else(|_| default.into());
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn resolve_config(cli: &Cli) -> anyhow::Result<ProbeConfig> {
    let mut config = ProbeConfig::load(cli.config.as_deref())?;
    if let Some(target) = &cli.target {
        config.target.clone_from(target);
    }
    if !cli.benign_codes.is_empty() {
        config.benign_exit_codes.clone_from(&cli.benign_codes);
    }
    if cli.shell {
        config.shell = true;
    }
    Ok(config)
}

fn cmd_probe(cli: Cli) -> anyhow::Result<i32> {
    let config = resolve_config(&cli)?;
    let invocation = Invocation::from_args(cli.label, cli.command_args)?;

    let outcome = Runner::new(&config).run(&invocation).inspect_err(|e| {
        if e.is_launch_failure() {
            tracing::error!(command = %invocation.display_command(), "probe did not start");
        }
    })?;

    tracing::info!(
        exit_code = outcome.result.exit_code,
        verdict = %outcome.verdict,
        "probe classified"
    );

    let mut stdout = std::io::stdout().lock();
    output::write_report(&mut stdout, &invocation, &config.target, &outcome, cli.json)?;
    Ok(outcome.verdict.exit_code())
}

/// Tool faults exit 1. No verdict maps to 1, so automation can tell
/// "could not probe" from "vulnerable".
fn or_exit(r: anyhow::Result<i32>) -> i32 {
    r.unwrap_or_else(|e| {
        eprintln!("[run_cve_check] error: {e:#}");
        1
    })
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let exit_code = or_exit(cmd_probe(cli));
    std::process::exit(exit_code);
}

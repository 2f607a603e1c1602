use std::path::{Path, PathBuf};

use crate::error::ProbeError;
use crate::verdict::DEFAULT_BENIGN_EXIT_CODES;

/// Directory name used for both the project-local and the global config.
pub const CONFIG_DIR_NAME: &str = "run_cve_check";

/// Resolved probe settings.
///
/// Priority, highest first: CLI flags (applied by the binary), environment
/// variables, config file, defaults.
/// - `RUN_CVE_CHECK_TARGET`: library name printed in the verdict line
/// - `RUN_CVE_CHECK_BENIGN_CODES`: comma-separated exit codes that mean "not vulnerable"
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub target: String,
    pub benign_exit_codes: Vec<i32>,
    pub shell: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            target: "zlib".to_string(),
            benign_exit_codes: DEFAULT_BENIGN_EXIT_CODES.to_vec(),
            shell: false,
        }
    }
}

/// Private: parsed representation of a config file.
#[derive(serde::Deserialize)]
struct ConfigFile {
    probe: Option<ProbeSection>,
}

#[derive(serde::Deserialize)]
struct ProbeSection {
    target: Option<String>,
    benign_exit_codes: Option<Vec<i32>>,
    shell: Option<bool>,
}

fn read_config_file(path: &Path) -> Result<ConfigFile, ProbeError> {
    let content = std::fs::read_to_string(path).map_err(|e| ProbeError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    toml::from_str(&content).map_err(|e| ProbeError::Config {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parse a comma-separated list of exit codes, skipping malformed entries.
fn parse_codes(s: &str) -> Vec<i32> {
    s.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

impl ProbeConfig {
    fn apply_file(&mut self, file: ConfigFile) {
        let Some(probe) = file.probe else {
            return;
        };
        if let Some(target) = probe.target {
            self.target = target;
        }
        if let Some(codes) = probe.benign_exit_codes {
            self.benign_exit_codes = codes;
        }
        if let Some(shell) = probe.shell {
            self.shell = shell;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("RUN_CVE_CHECK_TARGET")
            && !val.trim().is_empty()
        {
            self.target = val;
        }
        if let Ok(val) = std::env::var("RUN_CVE_CHECK_BENIGN_CODES") {
            let codes = parse_codes(&val);
            if !codes.is_empty() {
                self.benign_exit_codes = codes;
            }
        }
    }

    /// Load config using auto-detected paths. Priority:
    /// 1. `explicit` (from `--config`), which must exist and parse
    /// 2. `{project_root}/.run_cve_check/config.toml`
    /// 3. `{config_dir}/run_cve_check/config.toml` (e.g. `~/.config/run_cve_check/config.toml`)
    ///
    /// Environment variables are applied on top.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] if `explicit` cannot be read or parsed.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ProbeError> {
        let cwd = std::env::current_dir().unwrap_or_default();
        let project = project_root_for(&cwd);
        let global = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join("config.toml"));
        Self::load_from(explicit, Some(project.as_path()), global.as_deref())
    }

    /// Load config from explicit paths. Useful for testing.
    ///
    /// # Errors
    ///
    /// Returns [`ProbeError::Config`] if `explicit` cannot be read or parsed.
    pub fn load_from(
        explicit: Option<&Path>,
        project_root: Option<&Path>,
        global_config: Option<&Path>,
    ) -> Result<Self, ProbeError> {
        let mut config = Self::default();

        if let Some(path) = explicit {
            config.apply_file(read_config_file(path)?);
        } else if let Some(path) = discovered_config(project_root, global_config) {
            match read_config_file(&path) {
                Ok(file) => config.apply_file(file),
                Err(e) => tracing::warn!("ignoring config: {e}"),
            }
        }

        config.apply_env();
        tracing::debug!(?config, "resolved probe config");
        Ok(config)
    }
}

/// First existing config file: project-local, then global.
fn discovered_config(project_root: Option<&Path>, global_config: Option<&Path>) -> Option<PathBuf> {
    let project =
        project_root.map(|root| root.join(format!(".{CONFIG_DIR_NAME}")).join("config.toml"));
    project
        .into_iter()
        .chain(global_config.map(Path::to_path_buf))
        .find(|p| p.is_file())
}

/// Walk up from `dir` to find the nearest ancestor containing `.git` or `.run_cve_check/`.
/// Falls back to `dir` itself if neither is found.
pub fn project_root_for(dir: &Path) -> PathBuf {
    let marker = format!(".{CONFIG_DIR_NAME}");
    let mut current = dir.to_path_buf();
    loop {
        if current.join(".git").exists() || current.join(&marker).is_dir() {
            return current;
        }
        if !current.pop() {
            break;
        }
    }
    dir.to_path_buf()
}

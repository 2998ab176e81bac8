//! User configuration for shipcheck.
//!
//! Read once at startup from `<config dir>/shipcheck/config.toml`. Every key
//! is optional and a missing or unparsable file is a soft failure: defaults are
//! used and the problem is reported through the log once logging is up.

use std::path::PathBuf;

use serde::Deserialize;
use shipcheck_core::github::GITHUB_API;

/// Analysis service address used when neither the config file nor `--server`
/// name one.
pub const DEFAULT_SERVER: &str = "http://localhost:5000";

/// Default `EnvFilter` directive.
pub const DEFAULT_LOG_FILTER: &str = "shipcheck=info,shipcheck_core=info";

/// Settings loaded from `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the analysis service (`http://` or `https://`).
    pub server: String,
    /// Theme name, see [`crate::theme::Theme::from_name`].
    pub theme: String,
    /// GitHub REST API base, overridable for GitHub Enterprise.
    pub github_api: String,
    /// `EnvFilter` directive; `SHIPCHECK_LOG` / `RUST_LOG` take precedence.
    pub log_filter: String,
    /// Record finished assessments in the local history database.
    pub history: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_owned(),
            theme: "catppuccin-mocha".to_owned(),
            github_api: GITHUB_API.to_owned(),
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
            history: true,
        }
    }
}

/// `<config dir>/shipcheck/config.toml`, e.g. `~/.config/shipcheck/config.toml`
/// on Linux.
pub fn config_path() -> PathBuf {
    platform_dir(dirs::config_dir()).join("config.toml")
}

/// Directory holding the log file and the history database:
/// `<local data dir>/shipcheck`, e.g. `~/.local/share/shipcheck` on Linux.
pub fn data_dir() -> PathBuf {
    platform_dir(dirs::data_local_dir())
}

/// Falls back to the working directory when the platform reports no home.
fn platform_dir(base: Option<PathBuf>) -> PathBuf {
    base.unwrap_or_else(|| PathBuf::from(".")).join("shipcheck")
}

/// Loads the config file.
///
/// Returns the defaults plus a warning when the file exists but cannot be read
/// or parsed. A missing file yields the defaults and no warning. Never panics.
pub fn load() -> (Config, Option<String>) {
    let path = config_path();
    let raw = match std::fs::read_to_string(&path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return (Config::default(), None),
        Err(e) => {
            return (Config::default(), Some(format!("cannot read {}: {e}", path.display())));
        }
    };
    parse(&raw).map_or_else(
        |e| (Config::default(), Some(format!("config parse error in {}: {e}", path.display()))),
        |config| (config, None),
    )
}

fn parse(raw: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(raw)
}

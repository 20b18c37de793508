//! Configuration loading and environment factory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use proctor_core::monitor::ProctoringPolicy;
use proctor_core::session::SessionOptions;
use proctor_core::signal::{KeyBlocklist, KeyChord};
use proctor_core::timer::UrgencyThresholds;
use proctor_core::traits::ProctoringEnvironment;

use crate::console::ConsoleEnvironment;
use crate::recording::RecordingEnvironment;

/// Which environment a session runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentKind {
    /// Notices and warnings on stderr.
    #[default]
    Console,
    /// Silent; everything is only recorded.
    Headless,
}

impl std::str::FromStr for EnvironmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "console" => Ok(EnvironmentKind::Console),
            "headless" => Ok(EnvironmentKind::Headless),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

/// The `[policy]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Soft violations that end the test. Must be at least 1.
    #[serde(default = "default_soft_limit")]
    pub soft_violation_limit: u32,
    /// Shortcuts blocked in addition to the built-in list.
    #[serde(default)]
    pub extra_blocked_shortcuts: Vec<String>,
    #[serde(default = "default_warning_below")]
    pub warning_below_secs: u32,
    #[serde(default = "default_critical_below")]
    pub critical_below_secs: u32,
}

fn default_soft_limit() -> u32 {
    2
}
fn default_warning_below() -> u32 {
    60
}
fn default_critical_below() -> u32 {
    30
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            soft_violation_limit: default_soft_limit(),
            extra_blocked_shortcuts: Vec::new(),
            warning_below_secs: default_warning_below(),
            critical_below_secs: default_critical_below(),
        }
    }
}

/// Top-level proctor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProctorConfig {
    /// Catalog file or directory.
    #[serde(default = "default_catalog")]
    pub catalog: PathBuf,
    /// Attempt history file.
    #[serde(default = "default_history")]
    pub history: PathBuf,
    /// Wall-clock milliseconds per engine second.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default)]
    pub environment: EnvironmentKind,
    #[serde(default)]
    pub policy: PolicyConfig,
}

fn default_catalog() -> PathBuf {
    PathBuf::from("./catalogs")
}
fn default_history() -> PathBuf {
    PathBuf::from("./proctor-history.json")
}
fn default_tick_ms() -> u64 {
    1000
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            catalog: default_catalog(),
            history: default_history(),
            tick_ms: default_tick_ms(),
            environment: EnvironmentKind::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl ProctorConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// Build session options, validating the policy table.
    pub fn session_options(&self) -> Result<SessionOptions> {
        if self.policy.soft_violation_limit == 0 {
            anyhow::bail!("policy.soft_violation_limit must be at least 1");
        }

        let mut blocklist = KeyBlocklist::default();
        for shortcut in &self.policy.extra_blocked_shortcuts {
            let chord = shortcut
                .parse::<KeyChord>()
                .map_err(|e| anyhow::anyhow!(e))
                .with_context(|| format!("invalid shortcut in policy.extra_blocked_shortcuts: '{shortcut}'"))?;
            blocklist.insert(chord);
        }

        Ok(SessionOptions {
            policy: ProctoringPolicy {
                soft_violation_limit: self.policy.soft_violation_limit,
                blocklist,
            },
            thresholds: UrgencyThresholds {
                warning_below_secs: self.policy.warning_below_secs,
                critical_below_secs: self.policy.critical_below_secs,
            },
        })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
///
/// Substituted values are inserted verbatim and never expanded again.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        let var_name = &rest[start + 2..start + end];
        result.push_str(&rest[..start]);
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `proctor.toml` in the current directory
/// 2. `~/.config/proctor/config.toml`
///
/// Environment variable overrides: `PROCTOR_CATALOG`, `PROCTOR_HISTORY`.
pub fn load_config() -> Result<ProctorConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<ProctorConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("proctor.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            if global.exists() {
                Some(global)
            } else {
                None
            }
        } else {
            None
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<ProctorConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => ProctorConfig::default(),
    };

    if let Ok(catalog) = std::env::var("PROCTOR_CATALOG") {
        config.catalog = PathBuf::from(catalog);
    }
    if let Ok(history) = std::env::var("PROCTOR_HISTORY") {
        config.history = PathBuf::from(history);
    }

    config.catalog = resolve_path(&config.catalog);
    config.history = resolve_path(&config.history);
    config.policy.extra_blocked_shortcuts = config
        .policy
        .extra_blocked_shortcuts
        .iter()
        .map(|s| resolve_env_vars(s))
        .collect();

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("proctor"))
}

/// Create an environment instance of the configured kind.
pub fn create_environment(kind: EnvironmentKind) -> Box<dyn ProctoringEnvironment> {
    match kind {
        EnvironmentKind::Console => Box::new(ConsoleEnvironment::stderr()),
        EnvironmentKind::Headless => Box::new(RecordingEnvironment::new()),
    }
}

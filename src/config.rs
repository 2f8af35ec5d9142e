use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

// ── Profile ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    /// Base URL of the decision backend. Required — there is no sensible
    /// default; every deployment points at its operator's own backend.
    pub backend_url: Option<String>,
    /// Greeting shown as the first bot turn after Start.
    #[serde(default = "default_greeting")]
    pub greeting: String,
    /// Sentinel message sent to seed the first backend turn.
    #[serde(default = "default_start_message")]
    pub start_message: String,
    /// External application URL, surfaced once the apply-gate unlocks.
    #[serde(default)]
    pub apply_url: Option<String>,
    /// Request timeout in seconds. A hung backend surfaces as a network
    /// error after this long instead of blocking the dialog forever.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_greeting() -> String {
    "👋 Willkommen beim Studiencheck! Ich prüfe mit Ihnen, ob eine Zulassung möglich ist."
        .to_string()
}

fn default_start_message() -> String {
    "init".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

// ── Config file ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Which profile to use when none is specified
    #[serde(default = "default_profile_name")]
    pub default_profile: String,

    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

fn default_profile_name() -> String {
    "default".to_string()
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            default_profile: default_profile_name(),
            profiles: HashMap::new(),
        }
    }
}

impl ConfigFile {
    /// Load from disk, or return a default config if the file doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))
    }

    /// Write a starter config file to disk (only if it doesn't exist).
    pub fn write_default_if_missing() -> Result<PathBuf> {
        let path = config_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, DEFAULT_CONFIG_TOML)?;
        Ok(path)
    }

    pub fn resolve_profile(&self, name: Option<&str>) -> Option<&Profile> {
        let key = name.unwrap_or(&self.default_profile);
        self.profiles.get(key)
    }
}

// ── Resolved runtime config (after merging file + CLI overrides) ──────────────

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub backend_url: String,
    pub greeting: String,
    pub start_message: String,
    pub apply_url: Option<String>,
    pub timeout_secs: u64,
    /// Profile name that was resolved (for display)
    pub profile_name: String,
}

impl ResolvedConfig {
    /// Merge config file profile with CLI overrides.
    /// Priority: CLI args > env vars (handled by clap) > config file profile.
    /// Fails when no backend URL is configured anywhere — the client cannot
    /// guess where the operator's backend lives.
    pub fn resolve(
        file: &ConfigFile,
        profile_override: Option<&str>,
        backend_override: Option<&str>,
        apply_url_override: Option<&str>,
    ) -> Result<Self> {
        let profile_name = profile_override.unwrap_or(&file.default_profile).to_string();

        let base = file
            .resolve_profile(profile_override)
            .cloned()
            .unwrap_or_default();

        let Some(backend_url) = backend_override.map(str::to_string).or(base.backend_url) else {
            bail!(
                "no backend URL configured — set backend_url in profile '{profile_name}' \
                 or pass --backend (run `studicheck --init` to create a config file)"
            );
        };

        Ok(Self {
            backend_url,
            greeting: if base.greeting.is_empty() {
                default_greeting()
            } else {
                base.greeting
            },
            start_message: if base.start_message.is_empty() {
                default_start_message()
            } else {
                base.start_message
            },
            apply_url: apply_url_override.map(str::to_string).or(base.apply_url),
            timeout_secs: base.timeout_secs.max(1),
            profile_name,
        })
    }
}

// ── Paths ─────────────────────────────────────────────────────────────────────

pub fn config_path() -> PathBuf {
    dirs_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("studicheck")
        .join("config.toml")
}

fn dirs_config_dir() -> Option<PathBuf> {
    // XDG_CONFIG_HOME or ~/.config on Linux/macOS
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
}

// ── Default config template written on first run ──────────────────────────────

const DEFAULT_CONFIG_TOML: &str = r#"# studicheck configuration
# Run `studicheck --init` to regenerate this file.

default_profile = "local"

# ── Local decision backend ────────────────────────────────────────────────────
[profiles.local]
backend_url   = "http://127.0.0.1:8000"
# The identifier sent with every request is a fresh UUID per session, in the
# `session_id` field. greeting/start_message defaults are in German, matching
# the reference backend; override them for your deployment.
# greeting      = "👋 Willkommen beim Studiencheck!"
# start_message = "init"
# apply_url     = "https://www.hsbi.de/bewerbung"
# timeout_secs  = 30

# ── Staging backend example ──────────────────────────────────────────────────
# [profiles.staging]
# backend_url = "https://studicheck-staging.example.org"
# apply_url   = "https://bewerbung-staging.example.org"
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_with(backend: Option<&str>) -> ConfigFile {
        let mut profiles = HashMap::new();
        profiles.insert(
            "default".to_string(),
            Profile {
                backend_url: backend.map(str::to_string),
                greeting: default_greeting(),
                start_message: default_start_message(),
                apply_url: None,
                timeout_secs: default_timeout_secs(),
            },
        );
        ConfigFile {
            default_profile: "default".to_string(),
            profiles,
        }
    }

    #[test]
    fn test_resolve_requires_backend_url() {
        let file = file_with(None);
        assert!(ResolvedConfig::resolve(&file, None, None, None).is_err());
        // A CLI override satisfies the requirement
        let r = ResolvedConfig::resolve(&file, None, Some("http://localhost:8000"), None).unwrap();
        assert_eq!(r.backend_url, "http://localhost:8000");
    }

    #[test]
    fn test_resolve_applies_defaults() {
        let file = file_with(Some("http://localhost:8000"));
        let r = ResolvedConfig::resolve(&file, None, None, None).unwrap();
        assert_eq!(r.start_message, "init");
        assert_eq!(r.timeout_secs, 30);
        assert!(r.greeting.contains("Willkommen"));
        assert_eq!(r.apply_url, None);
    }

    #[test]
    fn test_cli_override_wins_over_profile() {
        let file = file_with(Some("http://profile:8000"));
        let r = ResolvedConfig::resolve(
            &file,
            None,
            Some("http://cli:9000"),
            Some("https://apply.example"),
        )
        .unwrap();
        assert_eq!(r.backend_url, "http://cli:9000");
        assert_eq!(r.apply_url.as_deref(), Some("https://apply.example"));
    }

    #[test]
    fn test_load_parses_profile_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"default_profile = "hsbi"

[profiles.hsbi]
backend_url = "http://127.0.0.1:8000"
start_message = "Start"
timeout_secs = 10
"#
        )
        .unwrap();

        let file = ConfigFile::load_from(&path).unwrap();
        assert_eq!(file.default_profile, "hsbi");
        let r = ResolvedConfig::resolve(&file, None, None, None).unwrap();
        assert_eq!(r.start_message, "Start");
        assert_eq!(r.timeout_secs, 10);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let file = ConfigFile::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(file.default_profile, "default");
        assert!(file.profiles.is_empty());
    }

    #[test]
    fn test_default_template_parses_and_resolves() {
        let file: ConfigFile = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        let r = ResolvedConfig::resolve(&file, None, None, None).unwrap();
        assert_eq!(r.profile_name, "local");
        assert_eq!(r.backend_url, "http://127.0.0.1:8000");
    }
}

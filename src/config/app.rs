// src/config/app.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const ENV_CONFIG_PATH: &str = "BLOGSENT_CONFIG_PATH";
pub const ENV_REPORT_PATH: &str = "BLOGSENT_REPORT_PATH";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "BLOGSENT_FETCH_TIMEOUT_SECS";
pub const ENV_RUN_DEADLINE_SECS: &str = "BLOGSENT_RUN_DEADLINE_SECS";

pub const DEFAULT_CONFIG_PATH: &str = "config/app.toml";

fn default_listing_path() -> String {
    "blog/".to_string()
}
fn default_report_path() -> PathBuf {
    PathBuf::from("sentiment_analysis.txt")
}
fn default_fetch_timeout_secs() -> u64 {
    15
}
fn default_run_deadline_secs() -> u64 {
    900
}
fn default_user_agent() -> String {
    concat!("bearblog-sentiment/", env!("CARGO_PKG_VERSION")).to_string()
}
fn default_metrics_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Relative path joined onto the domain to reach the post listing.
    #[serde(default = "default_listing_path")]
    pub listing_path: String,
    /// Where the text report is written; overwritten on every successful run.
    #[serde(default = "default_report_path")]
    pub report_path: PathBuf,
    /// Per-request timeout for outbound fetches.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    /// Upper bound for a whole run; the job is cancelled once it elapses.
    #[serde(default = "default_run_deadline_secs")]
    pub run_deadline_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listing_path: default_listing_path(),
            report_path: default_report_path(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            run_deadline_secs: default_run_deadline_secs(),
            user_agent: default_user_agent(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

impl AppConfig {
    /// Load from an explicit TOML file, then apply env overrides.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let cfg: AppConfig =
            toml::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
        Ok(cfg.with_env_overrides().sanitized())
    }

    /// Resolution order:
    /// 1) $BLOGSENT_CONFIG_PATH (must exist)
    /// 2) config/app.toml
    /// 3) built-in defaults
    ///
    /// Env overrides apply in every case.
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from_file(&pb);
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from_file(&default_p);
        }
        Ok(Self::default().with_env_overrides().sanitized())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn run_deadline(&self) -> Duration {
        Duration::from_secs(self.run_deadline_secs)
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(p) = env::var(ENV_REPORT_PATH) {
            if !p.trim().is_empty() {
                self.report_path = PathBuf::from(p.trim());
            }
        }
        if let Some(v) = parse_secs_env(env::var(ENV_FETCH_TIMEOUT_SECS).ok()) {
            self.fetch_timeout_secs = v;
        }
        if let Some(v) = parse_secs_env(env::var(ENV_RUN_DEADLINE_SECS).ok()) {
            self.run_deadline_secs = v;
        }
        self
    }

    fn sanitized(mut self) -> Self {
        if self.fetch_timeout_secs == 0 {
            self.fetch_timeout_secs = default_fetch_timeout_secs();
        }
        if self.run_deadline_secs == 0 {
            self.run_deadline_secs = default_run_deadline_secs();
        }
        let trimmed = self.listing_path.trim().trim_start_matches('/');
        self.listing_path = if trimmed.is_empty() {
            default_listing_path()
        } else if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };
        if self.user_agent.trim().is_empty() {
            self.user_agent = default_user_agent();
        }
        self
    }
}

fn parse_secs_env(raw: Option<String>) -> Option<u64> {
    raw.and_then(|s| s.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: AppConfig = toml::from_str(r#"fetch_timeout_secs = 3"#).unwrap();
        let cfg = cfg.sanitized();
        assert_eq!(cfg.fetch_timeout_secs, 3);
        assert_eq!(cfg.listing_path, "blog/");
        assert_eq!(cfg.report_path, PathBuf::from("sentiment_analysis.txt"));
        assert!(cfg.metrics_enabled);
    }

    #[test]
    fn sanitize_fixes_zero_timeouts_and_listing_slashes() {
        let cfg = AppConfig {
            listing_path: "/posts".into(),
            fetch_timeout_secs: 0,
            run_deadline_secs: 0,
            user_agent: "  ".into(),
            ..AppConfig::default()
        }
        .sanitized();
        assert_eq!(cfg.listing_path, "posts/");
        assert_eq!(cfg.fetch_timeout_secs, 15);
        assert_eq!(cfg.run_deadline_secs, 900);
        assert!(cfg.user_agent.starts_with("bearblog-sentiment/"));
    }

    #[serial_test::serial]
    #[test]
    fn env_path_then_overrides() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("app.toml");
        fs::write(&p, "report_path = \"from_file.txt\"\nrun_deadline_secs = 60\n").unwrap();

        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        env::set_var(ENV_FETCH_TIMEOUT_SECS, "7");
        let cfg = AppConfig::load_default().unwrap();
        assert_eq!(cfg.report_path, PathBuf::from("from_file.txt"));
        assert_eq!(cfg.run_deadline_secs, 60);
        assert_eq!(cfg.fetch_timeout_secs, 7);

        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(AppConfig::load_default().is_err());

        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_FETCH_TIMEOUT_SECS);
    }

    #[test]
    fn bad_env_numbers_are_ignored() {
        assert_eq!(parse_secs_env(Some("abc".into())), None);
        assert_eq!(parse_secs_env(Some("0".into())), None);
        assert_eq!(parse_secs_env(Some(" 12 ".into())), Some(12));
    }
}

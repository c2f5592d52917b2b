use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use url::Url;

use crate::guard::GuardSettings;
use crate::session::SessionSettings;

/// Longest accepted idle timeout (one year).
pub const MAX_IDLE_TIMEOUT_SECS: u64 = 365 * 24 * 60 * 60;

#[derive(Parser, Debug, Default, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE", global = true)]
    pub config: Option<String>,

    /// Backend base URL
    #[arg(long, env = "BACKEND_URL", global = true)]
    pub backend_url: Option<String>,

    /// Where the session is persisted
    #[arg(long, env = "STORAGE_PATH", global = true)]
    pub storage_path: Option<PathBuf>,

    /// Idle timeout in seconds
    #[arg(long, env = "IDLE_TIMEOUT_SECS", global = true)]
    pub idle_timeout_secs: Option<u64>,

    /// HMAC secret; when set, token signatures are verified
    #[arg(long, env = "TOKEN_SECRET", global = true, hide_env_values = true)]
    pub token_secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub guard: GuardConfig,
    pub checkout: CheckoutConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub request_timeout_ms: u64,
    pub probe_timeout_ms: u64,
}

impl BackendConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
    #[serde(default)]
    pub token_secret: Option<String>,
    pub storage_path: PathBuf,
}

impl SessionConfig {
    pub fn idle_timeout(&self) -> TimeDelta {
        i64::try_from(self.idle_timeout_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            idle_timeout: self.idle_timeout(),
            token_secret: self
                .token_secret
                .clone()
                .filter(|secret| !secret.is_empty()),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardConfig {
    pub verify_grace_ms: u64,
    pub login_path: String,
    pub default_path: String,
    pub post_login_path: String,
}

impl GuardConfig {
    pub fn settings(&self) -> GuardSettings {
        let grace = i64::try_from(self.verify_grace_ms)
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX);
        GuardSettings {
            login_path: self.login_path.clone(),
            default_path: self.default_path.clone(),
            post_login_path: self.post_login_path.clone(),
            verify_grace: grace,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutConfig {
    pub script_url: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Priority: CLI flag (or its env var) > `SKYBOOK_` env > config file > defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .set_default("backend.base_url", "http://localhost:8080")?
            .set_default("backend.request_timeout_ms", 10_000)?
            .set_default("backend.probe_timeout_ms", 2_000)?
            .set_default("session.idle_timeout_secs", 3_600)?
            .set_default("session.storage_path", ".skybook/session.json")?
            .set_default("guard.verify_grace_ms", 300)?
            .set_default("guard.login_path", "/login")?
            .set_default("guard.default_path", "/")?
            .set_default("guard.post_login_path", "/flights")?
            .set_default("checkout.script_url", crate::checkout::DEFAULT_SCRIPT_URL)?;

        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("skybook").required(false)),
        };

        // E.g. SKYBOOK_BACKEND__BASE_URL=http://api:8080
        builder = builder.add_source(
            Environment::with_prefix("SKYBOOK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(url) = &cli.backend_url {
            builder = builder.set_override("backend.base_url", url.as_str())?;
        }
        if let Some(path) = &cli.storage_path {
            builder = builder.set_override("session.storage_path", path.to_string_lossy().into_owned())?;
        }
        if let Some(secs) = cli.idle_timeout_secs {
            builder = builder.set_override("session.idle_timeout_secs", secs)?;
        }
        if let Some(secret) = &cli.token_secret {
            builder = builder.set_override("session.token_secret", secret.as_str())?;
        }

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.backend.base_url).map_err(|e| {
            ConfigError::Message(format!("backend.base_url {:?}: {e}", self.backend.base_url))
        })?;
        Url::parse(&self.checkout.script_url).map_err(|e| {
            ConfigError::Message(format!(
                "checkout.script_url {:?}: {e}",
                self.checkout.script_url
            ))
        })?;
        if self.session.idle_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "session.idle_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.session.idle_timeout_secs > MAX_IDLE_TIMEOUT_SECS {
            return Err(ConfigError::Message(format!(
                "session.idle_timeout_secs must be at most {MAX_IDLE_TIMEOUT_SECS}"
            )));
        }
        for (key, path) in [
            ("guard.login_path", &self.guard.login_path),
            ("guard.default_path", &self.guard.default_path),
            ("guard.post_login_path", &self.guard.post_login_path),
        ] {
            if !path.starts_with('/') {
                return Err(ConfigError::Message(format!(
                    "{key} must start with '/': {path:?}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_conversions() {
        let session = SessionConfig {
            idle_timeout_secs: 90,
            token_secret: Some(String::new()),
            storage_path: PathBuf::from("s.json"),
        };
        let settings = session.settings();
        assert_eq!(settings.idle_timeout, TimeDelta::seconds(90));
        assert_eq!(settings.token_secret, None);

        let guard = GuardConfig {
            verify_grace_ms: 150,
            login_path: "/signin".into(),
            default_path: "/".into(),
            post_login_path: "/flights".into(),
        };
        let settings = guard.settings();
        assert_eq!(settings.verify_grace, TimeDelta::milliseconds(150));
        assert_eq!(settings.login_path, "/signin");
    }
}

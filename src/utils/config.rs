use core::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use duration_string::DurationString;
use serde::{Deserialize, Serialize};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings, from a YAML file and/or the command line.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Config {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout: Option<DurationString>,
}

/// Complete settings needed to open a session.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub url: String,
    pub user: String,
    pub password: String,
    pub timeout: Duration,
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Configured to {} as {}",
            self.url.as_deref().unwrap_or("<no url>"),
            self.user.as_deref().unwrap_or("<no user>")
        )
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    /// Values set in `overrides` win.
    pub fn merge(self, overrides: Config) -> Config {
        Config {
            url: overrides.url.or(self.url),
            user: overrides.user.or(self.user),
            password: overrides.password.or(self.password),
            timeout: overrides.timeout.or(self.timeout),
        }
    }

    pub fn connection(&self) -> Result<ConnectionSettings> {
        let url = self.url.clone().context("Zabbix URL must be set (--url or ZABBIX_URL)")?;
        let user = self.user.clone().context("Zabbix user must be set (--user or ZABBIX_USER)")?;
        let password = self
            .password
            .clone()
            .context("Zabbix password must be set (--password or ZABBIX_PASSWORD)")?;
        let timeout = self.timeout.clone().map(Duration::from).unwrap_or(DEFAULT_TIMEOUT);

        Ok(ConnectionSettings {
            url,
            user,
            password,
            timeout,
        })
    }
}

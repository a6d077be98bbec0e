//! Runtime configuration read from environment variables

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;

use crate::store::StorePaths;

/// Which names are accepted as vote targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetPolicy {
    /// Target must be a roster name or a question author
    #[default]
    Roster,
    /// Any non-empty name
    Open,
}

impl FromStr for TargetPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "roster" => Ok(TargetPolicy::Roster),
            "open" => Ok(TargetPolicy::Open),
            other => Err(format!("Unknown target policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub paths: StorePaths,
    pub target_policy: TargetPolicy,
    pub bind_addr: IpAddr,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            paths: StorePaths::in_dir("."),
            target_policy: TargetPolicy::default(),
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
        }
    }
}

/// Non-empty trimmed value of an env var
fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an env var, warning and falling back on bad input
fn env_parsed<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_value(key) {
        Some(raw) => match raw.parse() {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Ignoring invalid {}='{}': {}", key, raw, e);
                default
            }
        },
        None => default,
    }
}

impl AppConfig {
    /// Load config from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let dir = env_value("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.paths.dir);
        let mut paths = StorePaths::in_dir(dir);
        if let Some(name) = env_value("QUESTIONS_FILE") {
            paths.questions = name;
        }
        if let Some(name) = env_value("USED_FILE") {
            paths.used = name;
        }
        if let Some(name) = env_value("VOTES_FILE") {
            paths.votes = name;
        }
        if let Some(name) = env_value("PLAYERS_FILE") {
            paths.players = name;
        }

        let config = Self {
            paths,
            target_policy: env_parsed("TARGET_POLICY", defaults.target_policy),
            bind_addr: env_parsed("BIND_ADDR", defaults.bind_addr),
            port: env_parsed("PORT", defaults.port),
        };

        tracing::info!(
            "Data directory {}, target policy {:?}",
            config.paths.dir.display(),
            config.target_policy
        );
        config
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}

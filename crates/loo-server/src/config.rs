use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use loo_gate::GateConfig;
use loo_stats::StatsConfig;
use loo_store::{SyncMode, WalConfig};

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding the write-ahead log. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub read_only: bool,
    pub require_contributor: bool,
    pub allow_anonymous: bool,
    pub max_page_limit: u32,
    pub max_proximity_radius_m: f64,
    pub default_proximity_radius_m: f64,
    pub wal_sync: SyncMode,
    pub stats: StatsConfig,
    pub tokens: Vec<TokenConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            data_dir: None,
            read_only: false,
            require_contributor: true,
            allow_anonymous: true,
            max_page_limit: 100,
            max_proximity_radius_m: 50_000.0,
            default_proximity_radius_m: 5_000.0,
            wal_sync: SyncMode::EveryWrite,
            stats: StatsConfig::default(),
            tokens: Vec::new(),
        }
    }
}

/// A bearer token and the identity it stands for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    pub token: String,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub admin: bool,
}

impl ServerConfig {
    /// Read a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.max_page_limit == 0 {
            return Err(ServerError::Config("max_page_limit must be positive".into()));
        }
        if !positive(self.max_proximity_radius_m) {
            return Err(ServerError::Config(
                "max_proximity_radius_m must be positive".into(),
            ));
        }
        if !positive(self.default_proximity_radius_m)
            || self.default_proximity_radius_m > self.max_proximity_radius_m
        {
            return Err(ServerError::Config(
                "default_proximity_radius_m must be positive and within max_proximity_radius_m"
                    .into(),
            ));
        }
        if let Some(dup) = self
            .tokens
            .iter()
            .enumerate()
            .find(|(i, t)| self.tokens[..*i].iter().any(|o| o.token == t.token))
        {
            return Err(ServerError::Config(format!(
                "token for '{}' is configured more than once",
                dup.1.name
            )));
        }
        self.gate_config()
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn gate_config(&self) -> GateConfig {
        GateConfig {
            read_only: self.read_only,
            require_contributor: self.require_contributor,
            ..Default::default()
        }
    }

    pub fn wal_config(&self) -> WalConfig {
        WalConfig {
            sync_mode: self.wal_sync,
        }
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

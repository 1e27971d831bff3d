//! Engine configuration

use crate::builder::DEFAULT_MAX_FEE;
use crate::{Error, Result};
use lovelace_params::{Network, NetworkType, TOKEN_OUTPUT_FLOOR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// `cardano-cli` adapter settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Path or name of the `cardano-cli` binary
    pub binary: PathBuf,
    /// Ledger era flag (`babbage` becomes `--babbage-era`)
    pub era: String,
    /// Node socket, exported as `CARDANO_NODE_SOCKET_PATH`
    pub socket_path: Option<PathBuf>,
    /// Directory for transaction files; a temporary one when absent
    pub work_dir: Option<PathBuf>,
    /// Directory holding one sub-directory of key files per wallet
    pub wallets_dir: PathBuf,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("cardano-cli"),
            era: "babbage".to_string(),
            socket_path: None,
            work_dir: None,
            wallets_dir: PathBuf::from("wallets"),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target network
    pub network: NetworkType,
    /// Provisional lovelace placed on token outputs before the oracle runs
    pub token_output_floor: u64,
    /// Fee safety limit
    pub max_fee: u64,
    /// Toolchain adapter settings
    pub cli: CliConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            network: NetworkType::Mainnet,
            token_output_floor: TOKEN_OUTPUT_FLOOR,
            max_fee: DEFAULT_MAX_FEE,
            cli: CliConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults for a network
    pub fn for_network(network: NetworkType) -> Self {
        Self {
            network,
            ..Default::default()
        }
    }

    /// Load a JSON configuration file
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject settings the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.token_output_floor == 0 {
            return Err(Error::InvalidConfig(
                "token_output_floor must be positive".to_string(),
            ));
        }
        if self.max_fee == 0 {
            return Err(Error::InvalidConfig("max_fee must be positive".to_string()));
        }
        if self.cli.era.trim().is_empty() {
            return Err(Error::InvalidConfig("cli.era must not be empty".to_string()));
        }
        Ok(())
    }

    /// Network parameters
    pub fn network_params(&self) -> Network {
        Network::from_type(self.network)
    }
}

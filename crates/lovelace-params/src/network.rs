//! Cardano network definitions

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Network type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkType {
    /// Mainnet
    Mainnet,
    /// Pre-production testnet
    Preprod,
    /// Preview testnet
    Preview,
}

impl FromStr for NetworkType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(NetworkType::Mainnet),
            "preprod" => Ok(NetworkType::Preprod),
            "preview" => Ok(NetworkType::Preview),
            other => Err(crate::Error::InvalidNetwork(other.to_string())),
        }
    }
}

/// Network configuration
#[derive(Debug, Clone)]
pub struct Network {
    /// Network type
    pub network_type: NetworkType,
    /// Human-readable name
    pub name: &'static str,
    /// Network magic
    pub magic: u32,
    /// Bech32 prefix of payment addresses
    pub address_hrp: &'static str,
    /// Bech32 prefix of reward (stake) addresses
    pub stake_hrp: &'static str,
}

impl Network {
    /// Get mainnet parameters
    pub const fn mainnet() -> Self {
        Self {
            network_type: NetworkType::Mainnet,
            name: "mainnet",
            magic: 764_824_073,
            address_hrp: "addr",
            stake_hrp: "stake",
        }
    }

    /// Get pre-production parameters
    pub const fn preprod() -> Self {
        Self {
            network_type: NetworkType::Preprod,
            name: "preprod",
            magic: 1,
            address_hrp: "addr_test",
            stake_hrp: "stake_test",
        }
    }

    /// Get preview parameters
    pub const fn preview() -> Self {
        Self {
            network_type: NetworkType::Preview,
            name: "preview",
            magic: 2,
            address_hrp: "addr_test",
            stake_hrp: "stake_test",
        }
    }

    /// Get network by type
    pub const fn from_type(network_type: NetworkType) -> Self {
        match network_type {
            NetworkType::Mainnet => Self::mainnet(),
            NetworkType::Preprod => Self::preprod(),
            NetworkType::Preview => Self::preview(),
        }
    }

    /// Whether this is the production network
    pub const fn is_mainnet(&self) -> bool {
        matches!(self.network_type, NetworkType::Mainnet)
    }

    /// Network selection flags understood by `cardano-cli`
    pub fn cli_args(&self) -> Vec<String> {
        if self.is_mainnet() {
            vec!["--mainnet".to_string()]
        } else {
            vec!["--testnet-magic".to_string(), self.magic.to_string()]
        }
    }
}

impl Default for Network {
    fn default() -> Self {
        Self::mainnet()
    }
}

//! Configuration and genesis loading.
//!
//! Startup inputs are loaded once and validated fail-fast: a missing
//! genesis file or an invalid private key aborts before the event loop
//! starts and can never surface mid-operation.

use palisade_types::{Address, KeyPair, PublicKey, ValidatorInfo, ValidatorSet};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fatal configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid private key seed: {0}")]
    InvalidKey(String),

    #[error("invalid public key for validator {0}")]
    InvalidValidatorKey(String),

    #[error("genesis validator set is empty")]
    EmptyValidatorSet,
}

/// Node configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Path to the genesis file.
    pub genesis: PathBuf,

    /// 32-byte hex seed for the node's Ed25519 signing key.
    pub private_key_seed: String,

    /// Start with the pacemaker in manual mode (driven by debug messages).
    #[serde(default)]
    pub manual_pacemaker: bool,

    /// Base view timeout in milliseconds (pacemaker).
    #[serde(default = "default_view_timeout_ms")]
    pub base_view_timeout_ms: u64,

    /// DKG ceremony deadline in milliseconds.
    #[serde(default = "default_dkg_deadline_ms")]
    pub dkg_deadline_ms: u64,
}

fn default_view_timeout_ms() -> u64 {
    5_000
}

fn default_dkg_deadline_ms() -> u64 {
    30_000
}

impl NodeConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: NodeConfig =
            serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        // Surface a bad key immediately rather than at first signature.
        config.keypair()?;
        Ok(config)
    }

    /// The node's signing keypair.
    pub fn keypair(&self) -> Result<KeyPair, ConfigError> {
        let bytes = hex::decode(&self.private_key_seed)
            .map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
        let seed: [u8; 32] = bytes
            .try_into()
            .map_err(|_| ConfigError::InvalidKey("seed must be 32 bytes".to_string()))?;
        Ok(KeyPair::from_seed(seed))
    }
}

/// One validator's genesis entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisValidator {
    /// Hex-encoded Ed25519 public key.
    pub public_key: String,
    pub voting_power: u64,
    #[serde(default)]
    pub service_url: String,
}

/// The genesis file: the height-0 validator set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisState {
    pub validators: Vec<GenesisValidator>,
}

impl GenesisState {
    /// Load a genesis file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let bytes = std::fs::read(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build the height-0 validator set, deriving addresses from keys.
    pub fn validator_set(&self) -> Result<ValidatorSet, ConfigError> {
        let mut validators = Vec::with_capacity(self.validators.len());
        for entry in &self.validators {
            let bytes = hex::decode(&entry.public_key)
                .map_err(|_| ConfigError::InvalidValidatorKey(entry.public_key.clone()))?;
            let key_bytes: [u8; 32] = bytes
                .try_into()
                .map_err(|_| ConfigError::InvalidValidatorKey(entry.public_key.clone()))?;
            let public_key = PublicKey::from_bytes(key_bytes);
            validators.push(ValidatorInfo {
                address: Address::from_public_key(&public_key),
                public_key,
                voting_power: entry.voting_power,
                service_url: entry.service_url.clone(),
            });
        }
        let set = ValidatorSet::new(validators);
        if set.is_empty() {
            return Err(ConfigError::EmptyValidatorSet);
        }
        Ok(set)
    }
}

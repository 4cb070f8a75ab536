use std::net::IpAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ban::AddressBlock;
use crate::error::{Result, ScoringError};
use crate::punishment::PunishmentParameters;
use crate::reputation::ScoringPolicy;

/// Everything the scoring manager is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Maximum number of node ids tracked at once.
    pub node_peers_capacity: usize,
    /// Maximum number of addresses tracked at once.
    pub address_peers_capacity: usize,
    pub node_punishment: PunishmentParameters,
    pub address_punishment: PunishmentParameters,
    pub scoring: ScoringPolicy,
    /// Manager-wide first-punishment length overriding both parameter sets.
    pub punishment_duration_ms: Option<u64>,
    pub banned_addresses: Vec<IpAddr>,
    pub banned_address_blocks: Vec<AddressBlock>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            node_peers_capacity: 100,
            address_peers_capacity: 10_000,
            node_punishment: PunishmentParameters::default(),
            address_punishment: PunishmentParameters::default(),
            scoring: ScoringPolicy::default(),
            punishment_duration_ms: None,
            banned_addresses: Vec::new(),
            banned_address_blocks: Vec::new(),
        }
    }
}

impl ScoringConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        let config: ScoringConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_peers_capacity == 0 {
            return Err(ScoringError::ZeroCapacity { table: "node peers" });
        }
        if self.address_peers_capacity == 0 {
            return Err(ScoringError::ZeroCapacity { table: "address peers" });
        }
        self.node_punishment.validate()?;
        self.address_punishment.validate()?;
        Ok(())
    }
}

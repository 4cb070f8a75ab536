//! Peer reputation and punishment tracking for a node's peer-to-peer layer.
//!
//! The network layer reports classified peer behaviour through
//! [`PeerScoringManager::record_event`] and consults
//! [`PeerScoringManager::has_good_reputation`] before admitting traffic.

pub mod ban;
pub mod config;
pub mod error;
pub mod event;
pub mod info;
pub mod lru;
pub mod manager;
pub mod punishment;
pub mod reputation;
pub mod scoring;
pub mod types;

pub use ban::{AddressBlock, BannedAddressTable};
pub use config::ScoringConfig;
pub use error::{Result, ScoringError};
pub use event::{EventImpact, EventType};
pub use info::{PeerKind, PeerScoringInformation};
pub use manager::PeerScoringManager;
pub use punishment::{PunishmentCalculator, PunishmentParameters};
pub use reputation::ScoringPolicy;
pub use scoring::PeerScoring;
pub use types::{Clock, ManualClock, NodeId, SystemClock, Timestamp};

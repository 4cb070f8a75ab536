use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::EventType;
use crate::scoring::PeerScoring;
use crate::types::Timestamp;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerKind {
    Node,
    Address,
}

/// Point-in-time view of one reputation record, for operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerScoringInformation {
    pub kind: PeerKind,
    pub id: String,
    pub good_reputation: bool,
    pub score: i64,
    pub punishment_count: u32,
    pub punished_until: Option<Timestamp>,
    pub event_counts: BTreeMap<EventType, u32>,
}

impl PeerScoringInformation {
    pub fn new(kind: PeerKind, id: String, scoring: &PeerScoring, now: Timestamp) -> Self {
        let punished = scoring.is_punished(now);
        Self {
            kind,
            id,
            good_reputation: !punished,
            score: scoring.score(),
            punishment_count: scoring.punishment_counter(),
            punished_until: if punished { scoring.punishment_expires_at() } else { None },
            event_counts: scoring.event_counts().collect(),
        }
    }

    pub fn event_count(&self, event: EventType) -> u32 {
        self.event_counts.get(&event).copied().unwrap_or(0)
    }
}

pub fn encode_peer_list(peers: &[PeerScoringInformation]) -> Result<String> {
    Ok(serde_json::to_string(peers)?)
}

pub fn decode_peer_list(s: &str) -> Result<Vec<PeerScoringInformation>> {
    Ok(serde_json::from_str(s)?)
}

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::EventType;
use crate::scoring::PeerScoring;

/// Decides whether a record's history amounts to good or bad reputation.
///
/// A record is bad once any configured event count reaches its threshold, or
/// once its score falls to `min_score`. Counters never decrease and a
/// negative score never rises, so a bad verdict is never withdrawn by later
/// events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub event_thresholds: BTreeMap<EventType, u32>,
    pub min_score: Option<i64>,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        let event_thresholds = BTreeMap::from([
            (EventType::InvalidBlock, 1),
            (EventType::InvalidHeader, 1),
            (EventType::InvalidNetwork, 1),
            (EventType::IncompatibleProtocol, 1),
            (EventType::InvalidMessage, 5),
            (EventType::InvalidTransaction, 10),
        ]);

        Self {
            event_thresholds,
            min_score: None,
        }
    }
}

impl ScoringPolicy {
    /// A policy that never judges a peer bad.
    pub fn permissive() -> Self {
        Self {
            event_thresholds: BTreeMap::new(),
            min_score: None,
        }
    }

    pub fn with_threshold(mut self, event: EventType, threshold: u32) -> Self {
        self.event_thresholds.insert(event, threshold);
        self
    }

    pub fn with_min_score(mut self, min_score: i64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn has_good_reputation(&self, scoring: &PeerScoring) -> bool {
        !self.has_bad_reputation(scoring)
    }

    pub fn has_bad_reputation(&self, scoring: &PeerScoring) -> bool {
        // zero thresholds are treated as switched off
        let over_threshold = self
            .event_thresholds
            .iter()
            .any(|(event, threshold)| *threshold > 0 && scoring.event_counter(*event) >= *threshold);

        over_threshold || self.min_score.is_some_and(|min| scoring.score() <= min)
    }
}

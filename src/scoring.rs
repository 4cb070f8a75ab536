use std::time::Duration;

use crate::event::{EventImpact, EventType};
use crate::types::Timestamp;

/// Reputation record kept for one node id or one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerScoring {
    counters: [u32; EventType::COUNT],
    score: i64,
    good_reputation: bool,
    punishment_counter: u32,
    punished_at: Option<Timestamp>,
    punishment_expires_at: Option<Timestamp>,
}

impl Default for PeerScoring {
    fn default() -> Self {
        Self::new()
    }
}

impl PeerScoring {
    pub fn new() -> Self {
        Self {
            counters: [0; EventType::COUNT],
            score: 0,
            good_reputation: true,
            punishment_counter: 0,
            punished_at: None,
            punishment_expires_at: None,
        }
    }

    /// Count the event and update the score.
    ///
    /// A negative event first wipes any positive credit, so a long good
    /// history cannot absorb a burst of bad behaviour. Once the score is
    /// negative, positive events no longer raise it.
    pub fn record_event(&mut self, event: EventType) {
        let counter = &mut self.counters[event.index()];
        *counter = counter.saturating_add(1);

        match event.impact() {
            EventImpact::Negative => {
                if self.score > 0 {
                    self.score = 0;
                }
                self.score = self.score.saturating_sub(1);
            }
            EventImpact::Positive => {
                if self.score >= 0 {
                    self.score = self.score.saturating_add(1);
                }
            }
            EventImpact::Neutral => {}
        }
    }

    pub fn event_counter(&self, event: EventType) -> u32 {
        self.counters[event.index()]
    }

    /// Total number of events recorded, all kinds.
    pub fn total_events(&self) -> u64 {
        self.counters.iter().map(|c| *c as u64).sum()
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    pub fn punishment_counter(&self) -> u32 {
        self.punishment_counter
    }

    pub fn punished_at(&self) -> Option<Timestamp> {
        self.punished_at
    }

    pub fn punishment_expires_at(&self) -> Option<Timestamp> {
        self.punishment_expires_at
    }

    /// Cached verdict of the last review. Use [`PeerScoring::has_good_reputation`]
    /// for the effective answer at a given time.
    pub fn good_reputation_flag(&self) -> bool {
        self.good_reputation
    }

    pub fn is_punished(&self, now: Timestamp) -> bool {
        !self.good_reputation && self.punishment_expires_at.is_some_and(|expiry| expiry > now)
    }

    pub fn has_good_reputation(&self, now: Timestamp) -> bool {
        !self.is_punished(now)
    }

    /// Enter punished state. The counter is bumped even when `duration` is
    /// zero so that the escalation history survives a disabled policy.
    pub fn start_punishment(&mut self, now: Timestamp, duration: Duration) {
        self.good_reputation = false;
        self.punishment_counter = self.punishment_counter.saturating_add(1);
        self.punished_at = Some(now);
        self.punishment_expires_at = if duration.is_zero() {
            None
        } else {
            Some(now.saturating_add(duration))
        };
    }

    /// Lift a punishment whose expiry has passed. Returns true if one was lifted.
    pub fn refresh(&mut self, now: Timestamp) -> bool {
        match self.punishment_expires_at {
            Some(expiry) if !self.good_reputation && expiry <= now => {
                self.good_reputation = true;
                self.punishment_expires_at = None;
                true
            }
            _ => false,
        }
    }

    /// Non-zero counters in taxonomy order.
    pub fn event_counts(&self) -> impl Iterator<Item = (EventType, u32)> + '_ {
        EventType::ALL
            .iter()
            .map(move |e| (*e, self.counters[e.index()]))
            .filter(|(_, c)| *c > 0)
    }
}

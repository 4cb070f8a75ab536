use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::ban::{AddressBlock, BannedAddressTable};
use crate::config::ScoringConfig;
use crate::error::Result;
use crate::event::EventType;
use crate::info::{PeerKind, PeerScoringInformation};
use crate::lru::BoundedPeerMap;
use crate::punishment::PunishmentCalculator;
use crate::reputation::ScoringPolicy;
use crate::scoring::PeerScoring;
use crate::types::{Clock, NodeId, SystemClock, Timestamp};

/// Punishment started by one review, kept for logging after the lock is released.
struct Punishment {
    duration: Duration,
    score: i64,
    counter: u32,
}

/// State guarded by the manager's single lock.
struct ScoringState {
    peers_by_node: BoundedPeerMap<NodeId, PeerScoring>,
    peers_by_address: BoundedPeerMap<IpAddr, PeerScoring>,
    banned: BannedAddressTable,
    punishment_duration: Option<Duration>,
}

/// Tracks reputation per node id and per address and decides when a peer
/// is punished.
///
/// The manager only reports verdicts; disconnecting or refusing a peer is up
/// to the caller. All state sits behind one lock so that the node and
/// address halves of [`PeerScoringManager::record_event`] are updated
/// together.
pub struct PeerScoringManager {
    scoring_policy: ScoringPolicy,
    node_punishment: PunishmentCalculator,
    address_punishment: PunishmentCalculator,
    clock: Arc<dyn Clock>,
    state: Mutex<ScoringState>,
}

impl PeerScoringManager {
    /// Build a manager from already constructed policies.
    ///
    /// Unlike [`PeerScoringManager::from_config`] nothing is validated here:
    /// a zero capacity is raised to one and punishment parameters are used
    /// as given.
    pub fn new(
        node_peers_capacity: usize,
        address_peers_capacity: usize,
        scoring_policy: ScoringPolicy,
        node_punishment: PunishmentCalculator,
        address_punishment: PunishmentCalculator,
    ) -> Self {
        Self {
            scoring_policy,
            node_punishment,
            address_punishment,
            clock: Arc::new(SystemClock),
            state: Mutex::new(ScoringState {
                peers_by_node: BoundedPeerMap::new(node_peers_capacity),
                peers_by_address: BoundedPeerMap::new(address_peers_capacity),
                banned: BannedAddressTable::new(),
                punishment_duration: None,
            }),
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Result<Self> {
        config.validate()?;

        let manager = Self::new(
            config.node_peers_capacity,
            config.address_peers_capacity,
            config.scoring.clone(),
            PunishmentCalculator::new(config.node_punishment),
            PunishmentCalculator::new(config.address_punishment),
        );

        {
            let mut state = manager.state.lock();
            state.punishment_duration = config
                .punishment_duration_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis);
            for address in &config.banned_addresses {
                state.banned.add(*address);
            }
            for block in &config.banned_address_blocks {
                state.banned.add_block(*block);
            }
        }

        info!(
            node_peers_capacity = config.node_peers_capacity,
            address_peers_capacity = config.address_peers_capacity,
            banned = config.banned_addresses.len() + config.banned_address_blocks.len(),
            "peer scoring manager configured"
        );
        Ok(manager)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Record one observed behaviour against the peer's node id and/or
    /// address. Either key may be absent; each present key is scored on its
    /// own track.
    pub fn record_event(&self, node_id: Option<&NodeId>, address: Option<IpAddr>, event: EventType) {
        let now = self.clock.now();
        let address = address.map(|a| a.to_canonical());

        let mut node_outcome = None;
        let mut address_outcome = None;
        {
            let mut state = self.state.lock();
            let base = state.punishment_duration;

            if let Some(node_id) = node_id {
                let (scoring, evicted) = state.peers_by_node.get_or_insert_with(*node_id, PeerScoring::new);
                let punished = self.review_reputation(scoring, event, &self.node_punishment, base, now);
                node_outcome = Some((punished, evicted.map(|(old, _)| old)));
            }

            if let Some(address) = address {
                let (scoring, evicted) = state.peers_by_address.get_or_insert_with(address, PeerScoring::new);
                let punished = self.review_reputation(scoring, event, &self.address_punishment, base, now);
                address_outcome = Some((punished, evicted.map(|(old, _)| old)));
            }
        }

        // logging happens outside the lock
        if let (Some(node_id), Some((punished, evicted))) = (node_id, node_outcome) {
            if let Some(p) = punished {
                warn!(
                    node = %node_id,
                    %event,
                    score = p.score,
                    punishments = p.counter,
                    duration_ms = p.duration.as_millis() as u64,
                    "node lost good reputation"
                );
            }
            if let Some(old) = evicted {
                debug!(node = %old, "evicted least recently used node scoring");
            }
        }

        if let (Some(address), Some((punished, evicted))) = (address, address_outcome) {
            if let Some(p) = punished {
                warn!(
                    %address,
                    %event,
                    score = p.score,
                    punishments = p.counter,
                    duration_ms = p.duration.as_millis() as u64,
                    "address lost good reputation"
                );
            }
            if let Some(old) = evicted {
                debug!(%old, "evicted least recently used address scoring");
            }
        }

        debug!(node = ?node_id.map(|n| n.to_string()), ?address, %event, "peer event recorded");
    }

    /// Apply `event` and punish on a good to bad transition.
    ///
    /// A record left without expiry by a zero-length punishment counts as
    /// good again as soon as the calculator would hand out a real one.
    fn review_reputation(
        &self,
        scoring: &mut PeerScoring,
        event: EventType,
        calculator: &PunishmentCalculator,
        base: Option<Duration>,
        now: Timestamp,
    ) -> Option<Punishment> {
        scoring.refresh(now);
        scoring.record_event(event);

        if self.scoring_policy.has_good_reputation(scoring) {
            return None;
        }

        let unenforced = !scoring.good_reputation_flag() && scoring.punishment_expires_at().is_none();
        if !scoring.good_reputation_flag() && !unenforced {
            return None;
        }

        let counter = scoring.punishment_counter().saturating_add(1);
        let duration = match base {
            Some(base) => calculator.calculate_with_base(base, counter, scoring.score()),
            None => calculator.calculate(counter, scoring.score()),
        };
        if unenforced && duration.is_zero() {
            return None;
        }

        scoring.start_punishment(now, duration);
        Some(Punishment {
            duration,
            score: scoring.score(),
            counter: scoring.punishment_counter(),
        })
    }

    /// Verdict for a node id. Unknown nodes are trusted.
    pub fn has_good_reputation(&self, node_id: &NodeId) -> bool {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state
            .peers_by_node
            .get(node_id)
            .map_or(true, |scoring| scoring.has_good_reputation(now))
    }

    /// Verdict for an address. Banned addresses are never good, whatever
    /// their score.
    pub fn has_good_reputation_address(&self, address: IpAddr) -> bool {
        let address = address.to_canonical();
        let now = self.clock.now();
        let mut state = self.state.lock();
        if state.banned.contains(address) {
            return false;
        }
        state
            .peers_by_address
            .get(&address)
            .map_or(true, |scoring| scoring.has_good_reputation(now))
    }

    /// Override the first-punishment length of both calculators. Zero
    /// restores the configured parameters.
    pub fn set_punishment_duration(&self, duration: Duration) {
        self.state.lock().punishment_duration = if duration.is_zero() { None } else { Some(duration) };
        info!(duration_ms = duration.as_millis() as u64, "punishment duration override set");
    }

    pub fn punishment_duration(&self) -> Option<Duration> {
        self.state.lock().punishment_duration
    }

    pub fn add_banned_address(&self, address: IpAddr) -> bool {
        let added = self.state.lock().banned.add(address);
        if added {
            info!(%address, "address banned");
        }
        added
    }

    pub fn remove_banned_address(&self, address: IpAddr) -> bool {
        let removed = self.state.lock().banned.remove(address);
        if removed {
            info!(%address, "address unbanned");
        }
        removed
    }

    pub fn add_banned_address_block(&self, block: AddressBlock) -> bool {
        let added = self.state.lock().banned.add_block(block);
        if added {
            info!(%block, "address block banned");
        }
        added
    }

    pub fn remove_banned_address_block(&self, block: &AddressBlock) -> bool {
        let removed = self.state.lock().banned.remove_block(block);
        if removed {
            info!(%block, "address block unbanned");
        }
        removed
    }

    /// Banned addresses followed by banned blocks, as strings.
    pub fn banned_addresses(&self) -> Vec<String> {
        let state = self.state.lock();
        let mut addresses: Vec<String> = state.banned.addresses().map(|a| a.to_string()).collect();
        addresses.sort();
        addresses.extend(state.banned.blocks().iter().map(|b| b.to_string()));
        addresses
    }

    /// Forget everything known about a node id.
    pub fn clear_peer_scoring(&self, node_id: &NodeId) -> bool {
        let removed = self.state.lock().peers_by_node.remove(node_id).is_some();
        if removed {
            info!(node = %node_id, "node scoring cleared");
        }
        removed
    }

    /// Forget everything known about an address. Bans are unaffected.
    pub fn clear_address_scoring(&self, address: IpAddr) -> bool {
        let address = address.to_canonical();
        let removed = self.state.lock().peers_by_address.remove(&address).is_some();
        if removed {
            info!(%address, "address scoring cleared");
        }
        removed
    }

    pub fn is_empty(&self) -> bool {
        let state = self.state.lock();
        state.peers_by_node.is_empty() && state.peers_by_address.is_empty()
    }

    pub fn len_nodes(&self) -> usize {
        self.state.lock().peers_by_node.len()
    }

    pub fn len_addresses(&self) -> usize {
        self.state.lock().peers_by_address.len()
    }

    /// Copy of the node's record, or a fresh one if the node is not tracked.
    /// Does not insert or change recency.
    pub fn peer_scoring(&self, node_id: &NodeId) -> PeerScoring {
        self.state
            .lock()
            .peers_by_node
            .peek(node_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn address_scoring(&self, address: IpAddr) -> PeerScoring {
        self.state
            .lock()
            .peers_by_address
            .peek(&address.to_canonical())
            .cloned()
            .unwrap_or_default()
    }

    pub fn peers_information(&self) -> Vec<PeerScoringInformation> {
        let now = self.clock.now();
        let state = self.state.lock();

        let nodes = state
            .peers_by_node
            .iter()
            .map(|(id, scoring)| PeerScoringInformation::new(PeerKind::Node, id.to_hex(), scoring, now));
        let addresses = state
            .peers_by_address
            .iter()
            .map(|(address, scoring)| PeerScoringInformation::new(PeerKind::Address, address.to_string(), scoring, now));

        nodes.chain(addresses).collect()
    }
}

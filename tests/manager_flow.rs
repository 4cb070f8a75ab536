use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use peer_scoring::{
    EventType, ManualClock, NodeId, PeerScoringManager, PunishmentCalculator, PunishmentParameters,
    ScoringPolicy, Timestamp,
};

const MINUTE: Duration = Duration::from_secs(60);

fn manager_with_clock(node_capacity: usize) -> (PeerScoringManager, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(Timestamp(1_000_000)));
    let params = PunishmentParameters::new(10 * MINUTE, 10, Duration::from_secs(7 * 24 * 3600));
    let manager = PeerScoringManager::new(
        node_capacity,
        1000,
        ScoringPolicy::default(),
        PunishmentCalculator::new(params),
        PunishmentCalculator::new(params),
    )
    .with_clock(clock.clone());
    (manager, clock)
}

fn node(name: &str) -> NodeId {
    NodeId::from_public_key(name.as_bytes())
}

fn addr(s: &str) -> IpAddr {
    s.parse().unwrap()
}

fn punishment_length(manager: &PeerScoringManager, id: &NodeId) -> u128 {
    let scoring = manager.peer_scoring(id);
    scoring.punishment_expires_at().unwrap().0 - scoring.punished_at().unwrap().0
}

#[test]
fn new_manager_is_empty_and_trusts_strangers() {
    let (manager, _) = manager_with_clock(10);

    assert!(manager.is_empty());
    assert!(manager.has_good_reputation(&node("stranger")));
    assert!(manager.has_good_reputation_address(addr("10.0.0.1")));

    // queries must not create entries
    assert!(manager.is_empty());
    assert_eq!(manager.peer_scoring(&node("stranger")).total_events(), 0);
}

#[test]
fn invalid_messages_punish_node_once_per_transition() {
    let (manager, clock) = manager_with_clock(10);
    let x = node("X");

    // 1. four invalid messages stay below the threshold of five
    for _ in 0..4 {
        manager.record_event(Some(&x), None, EventType::InvalidMessage);
        assert!(manager.has_good_reputation(&x));
    }
    assert_eq!(manager.peer_scoring(&x).punishment_counter(), 0);

    // 2. the fifth flips the verdict
    manager.record_event(Some(&x), None, EventType::InvalidMessage);
    assert!(!manager.has_good_reputation(&x));
    assert_eq!(manager.peer_scoring(&x).punishment_counter(), 1);
    let first = punishment_length(&manager, &x);

    // 3. more bad events while punished do not re-punish
    for _ in 0..5 {
        manager.record_event(Some(&x), None, EventType::InvalidMessage);
    }
    assert!(!manager.has_good_reputation(&x));
    assert_eq!(manager.peer_scoring(&x).punishment_counter(), 1);
    assert_eq!(manager.peer_scoring(&x).event_counter(EventType::InvalidMessage), 10);

    // 4. once the punishment runs out the node is good again
    clock.advance(Duration::from_millis(first as u64));
    assert!(manager.has_good_reputation(&x));

    // 5. a second burst starts a second, longer punishment
    for _ in 0..10 {
        manager.record_event(Some(&x), None, EventType::InvalidMessage);
    }
    let scoring = manager.peer_scoring(&x);
    println!("first punishment = {} ms, second = {} ms", first, punishment_length(&manager, &x));
    assert!(!manager.has_good_reputation(&x));
    assert_eq!(scoring.punishment_counter(), 2);
    assert!(punishment_length(&manager, &x) >= first);
}

#[test]
fn node_and_address_tracks_are_independent() {
    let (manager, _) = manager_with_clock(10);
    let a = node("A");
    let shared = addr("192.168.1.7");

    // one invalid block is enough to punish under the default policy
    manager.record_event(Some(&a), Some(shared), EventType::InvalidBlock);
    assert!(!manager.has_good_reputation(&a));
    assert!(!manager.has_good_reputation_address(shared));

    // a second identity behind the same address starts clean
    let b = node("B");
    manager.record_event(Some(&b), Some(shared), EventType::ValidBlock);
    assert!(manager.has_good_reputation(&b));
    assert!(!manager.has_good_reputation_address(shared));
    assert_eq!(manager.address_scoring(shared).event_counter(EventType::ValidBlock), 1);
    assert_eq!(manager.address_scoring(shared).punishment_counter(), 1);

    // absent keys are skipped
    manager.record_event(None, Some(addr("10.0.0.9")), EventType::ValidBlock);
    manager.record_event(Some(&node("C")), None, EventType::ValidBlock);
    assert_eq!(manager.len_nodes(), 3);
    assert_eq!(manager.len_addresses(), 2);
}

#[test]
fn score_follows_positive_and_negative_events() {
    let (manager, _) = manager_with_clock(10);
    let p = node("P");

    for _ in 0..3 {
        manager.record_event(Some(&p), None, EventType::ValidBlock);
    }
    assert_eq!(manager.peer_scoring(&p).score(), 3);

    // neutral events leave the score alone
    manager.record_event(Some(&p), None, EventType::RepeatedMessage);
    manager.record_event(Some(&p), None, EventType::TimeoutMessage);
    assert_eq!(manager.peer_scoring(&p).score(), 3);

    // a negative event wipes the credit
    manager.record_event(Some(&p), None, EventType::InvalidTransaction);
    assert_eq!(manager.peer_scoring(&p).score(), -1);

    // and a negative score does not recover
    manager.record_event(Some(&p), None, EventType::ValidTransaction);
    assert_eq!(manager.peer_scoring(&p).score(), -1);
    assert!(manager.has_good_reputation(&p), "one invalid transaction is below threshold");
}

#[test]
fn queries_are_read_only() {
    let (manager, clock) = manager_with_clock(10);
    let q = node("Q");
    let ip = addr("172.16.0.3");

    for _ in 0..6 {
        manager.record_event(Some(&q), Some(ip), EventType::InvalidMessage);
    }
    let node_before = manager.peer_scoring(&q);
    let addr_before = manager.address_scoring(ip);

    for _ in 0..3 {
        manager.has_good_reputation(&q);
        manager.has_good_reputation_address(ip);
    }
    // even after expiry, asking does not lift the punishment in the record
    clock.advance(Duration::from_secs(365 * 24 * 3600));
    assert!(manager.has_good_reputation(&q));
    assert!(manager.has_good_reputation_address(ip));

    assert_eq!(manager.peer_scoring(&q), node_before);
    assert_eq!(manager.address_scoring(ip), addr_before);
}

#[test]
fn disabled_punishment_keeps_history_without_punishing() {
    let clock = Arc::new(ManualClock::new(Timestamp(0)));
    let manager = PeerScoringManager::new(
        10,
        10,
        ScoringPolicy::default(),
        PunishmentCalculator::new(PunishmentParameters::disabled()),
        PunishmentCalculator::new(PunishmentParameters::default()),
    )
    .with_clock(clock);
    let d = node("D");
    let ip = addr("10.1.1.1");

    for _ in 0..8 {
        manager.record_event(Some(&d), Some(ip), EventType::InvalidMessage);
    }

    // nodes: counted but never punished
    assert!(manager.has_good_reputation(&d));
    assert_eq!(manager.peer_scoring(&d).punishment_counter(), 1);
    assert_eq!(manager.peer_scoring(&d).punishment_expires_at(), None);

    // addresses still use the enabled calculator
    assert!(!manager.has_good_reputation_address(ip));
}

#[test]
fn punishment_duration_override_replaces_base() {
    let (manager, _) = manager_with_clock(10);
    let o = node("O");

    manager.set_punishment_duration(Duration::from_secs(1));
    assert_eq!(manager.punishment_duration(), Some(Duration::from_secs(1)));

    manager.record_event(Some(&o), None, EventType::InvalidHeader);
    // base 1s times |score| of 1
    assert_eq!(punishment_length(&manager, &o), 1000);

    manager.set_punishment_duration(Duration::ZERO);
    assert_eq!(manager.punishment_duration(), None);

    let p = node("P");
    manager.record_event(Some(&p), None, EventType::InvalidHeader);
    assert_eq!(punishment_length(&manager, &p), 10 * 60 * 1000);
}

#[test]
fn clearing_scoring_forgets_history() {
    let (manager, _) = manager_with_clock(10);
    let c = node("C");
    let ip = addr("10.9.9.9");

    manager.record_event(Some(&c), Some(ip), EventType::InvalidNetwork);
    assert!(!manager.has_good_reputation(&c));

    assert!(manager.clear_peer_scoring(&c));
    assert!(!manager.clear_peer_scoring(&c));
    assert!(manager.has_good_reputation(&c));
    assert_eq!(manager.peer_scoring(&c).punishment_counter(), 0);

    assert!(manager.clear_address_scoring(ip));
    assert!(manager.has_good_reputation_address(ip));
    assert!(manager.is_empty());
}

#[test]
fn min_score_policy_punishes_on_score_alone() {
    let clock = Arc::new(ManualClock::new(Timestamp(0)));
    let calculator = PunishmentCalculator::new(PunishmentParameters::default());
    let manager = PeerScoringManager::new(
        10,
        10,
        ScoringPolicy::permissive().with_min_score(-3),
        calculator,
        calculator,
    )
    .with_clock(clock);
    let m = node("M");

    manager.record_event(Some(&m), None, EventType::InvalidTransaction);
    manager.record_event(Some(&m), None, EventType::InvalidTransaction);
    assert!(manager.has_good_reputation(&m));

    manager.record_event(Some(&m), None, EventType::InvalidTransaction);
    assert!(!manager.has_good_reputation(&m));
}

#[test]
fn zero_length_punishment_does_not_lock_record() {
    let clock = Arc::new(ManualClock::new(Timestamp(0)));
    let zero = PunishmentParameters::new(Duration::ZERO, 10, 10 * MINUTE);
    let manager = PeerScoringManager::new(
        10,
        10,
        ScoringPolicy::default(),
        PunishmentCalculator::new(zero),
        PunishmentCalculator::new(zero),
    )
    .with_clock(clock);
    let z = node("Z");

    // 1. zero-length punishment: counted, not enforced
    manager.record_event(Some(&z), None, EventType::InvalidBlock);
    assert!(manager.has_good_reputation(&z));
    assert_eq!(manager.peer_scoring(&z).punishment_counter(), 1);

    // 2. further bad events do not count while nothing is enforced
    manager.record_event(Some(&z), None, EventType::InvalidBlock);
    assert_eq!(manager.peer_scoring(&z).punishment_counter(), 1);

    // 3. once a real duration is available the peer is punished again
    manager.set_punishment_duration(Duration::from_secs(60));
    manager.record_event(Some(&z), None, EventType::InvalidBlock);
    assert!(!manager.has_good_reputation(&z));
    assert_eq!(manager.peer_scoring(&z).punishment_counter(), 2);
    assert!(punishment_length(&manager, &z) >= 60_000);
}

#[test]
fn any_event_after_expiry_restarts_punishment() {
    let (manager, clock) = manager_with_clock(10);
    let r = node("R");

    for _ in 0..5 {
        manager.record_event(Some(&r), None, EventType::InvalidMessage);
    }
    assert_eq!(manager.peer_scoring(&r).punishment_counter(), 1);
    let first = punishment_length(&manager, &r);

    clock.advance(Duration::from_millis(first as u64));
    assert!(manager.has_good_reputation(&r));

    // the counters are still over the threshold, so even a valid block
    // brings a new and longer punishment
    manager.record_event(Some(&r), None, EventType::ValidBlock);
    assert!(!manager.has_good_reputation(&r));
    assert_eq!(manager.peer_scoring(&r).punishment_counter(), 2);
    assert!(punishment_length(&manager, &r) > first);
}

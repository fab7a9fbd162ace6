//! Per-peer partition state machine.
//!
//! ONLINE → SUSPECT after N consecutive failures → OFFLINE after M,
//! recovering to ONLINE after K consecutive successes. Peers are never
//! permanently disabled: state only changes what observers see, every
//! call is still attempted per policy.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Bounded ring of retained partition/recovery events.
const EVENT_CAP: usize = 200;

/// Reachability state of one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeerState {
    #[default]
    Online,
    Suspect,
    Offline,
}

/// One state transition, for observability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartitionEvent {
    pub timestamp: String,
    pub peer_id: String,
    /// partition | recovery
    pub event_type: String,
    pub from_state: PeerState,
    pub to_state: PeerState,
    pub reason: String,
}

/// Counters summarizing partition history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PartitionMetrics {
    pub partition_events: usize,
    pub recovery_events: usize,
    pub suspect_peers: usize,
    pub offline_peers: usize,
}

#[derive(Debug, Clone, Default)]
struct PeerHealth {
    state: PeerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
}

/// Tracks reachability for a set of peers.
#[derive(Debug)]
pub struct PeerTracker {
    suspect_after: u32,
    offline_after: u32,
    recovery_successes: u32,
    peers: BTreeMap<String, PeerHealth>,
    events: VecDeque<PartitionEvent>,
}

impl PeerTracker {
    pub fn new(suspect_after: u32, offline_after: u32, recovery_successes: u32) -> Self {
        Self {
            suspect_after,
            offline_after,
            recovery_successes,
            peers: BTreeMap::new(),
            events: VecDeque::new(),
        }
    }

    /// Record a successful call to a peer.
    pub fn record_success(&mut self, peer_id: &str) {
        let recovery_threshold = self.recovery_successes;
        let health = self.peers.entry(peer_id.to_string()).or_default();
        health.consecutive_failures = 0;
        health.consecutive_successes += 1;
        if health.state != PeerState::Online && health.consecutive_successes >= recovery_threshold {
            self.transition(peer_id, PeerState::Online, "request_succeeded");
        }
    }

    /// Record a failed call (after retries) to a peer.
    pub fn record_failure(&mut self, peer_id: &str, reason: &str) {
        let (suspect_after, offline_after) = (self.suspect_after, self.offline_after);
        let health = self.peers.entry(peer_id.to_string()).or_default();
        health.consecutive_successes = 0;
        health.consecutive_failures += 1;
        let failures = health.consecutive_failures;
        if failures >= offline_after {
            self.transition(peer_id, PeerState::Offline, reason);
        } else if failures >= suspect_after {
            self.transition(peer_id, PeerState::Suspect, reason);
        }
    }

    /// Current state of one peer (ONLINE if never seen).
    pub fn state_of(&self, peer_id: &str) -> PeerState {
        self.peers.get(peer_id).map(|h| h.state).unwrap_or_default()
    }

    /// Current state map.
    pub fn states(&self) -> BTreeMap<String, PeerState> {
        self.peers
            .iter()
            .map(|(id, health)| (id.clone(), health.state))
            .collect()
    }

    /// Retained transition events, oldest first.
    pub fn events(&self) -> Vec<PartitionEvent> {
        self.events.iter().cloned().collect()
    }

    /// Summary counters over retained events and current states.
    pub fn metrics(&self) -> PartitionMetrics {
        PartitionMetrics {
            partition_events: self
                .events
                .iter()
                .filter(|e| e.event_type == "partition")
                .count(),
            recovery_events: self
                .events
                .iter()
                .filter(|e| e.event_type == "recovery")
                .count(),
            suspect_peers: self
                .peers
                .values()
                .filter(|h| h.state == PeerState::Suspect)
                .count(),
            offline_peers: self
                .peers
                .values()
                .filter(|h| h.state == PeerState::Offline)
                .count(),
        }
    }

    fn transition(&mut self, peer_id: &str, new_state: PeerState, reason: &str) {
        let health = self.peers.entry(peer_id.to_string()).or_default();
        let prev = health.state;
        if prev == new_state {
            return;
        }
        health.state = new_state;

        let event_type = if new_state == PeerState::Online {
            "recovery"
        } else {
            "partition"
        };
        if new_state == PeerState::Online {
            info!(peer_id, ?prev, "peer recovered");
        } else {
            warn!(peer_id, ?prev, ?new_state, reason, "peer demoted");
        }
        self.events.push_back(PartitionEvent {
            timestamp: chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            peer_id: peer_id.to_string(),
            event_type: event_type.to_string(),
            from_state: prev,
            to_state: new_state,
            reason: reason.to_string(),
        });
        while self.events.len() > EVENT_CAP {
            self.events.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_starts_online() {
        let tracker = PeerTracker::new(1, 2, 1);
        assert_eq!(tracker.state_of("peer-1"), PeerState::Online);
    }

    #[test]
    fn test_failure_path_online_suspect_offline() {
        let mut tracker = PeerTracker::new(1, 2, 1);
        tracker.record_failure("peer-1", "connect_error");
        assert_eq!(tracker.state_of("peer-1"), PeerState::Suspect);
        tracker.record_failure("peer-1", "connect_error");
        assert_eq!(tracker.state_of("peer-1"), PeerState::Offline);
    }

    #[test]
    fn test_recovery_after_successes() {
        let mut tracker = PeerTracker::new(1, 2, 2);
        tracker.record_failure("peer-1", "timeout");
        tracker.record_failure("peer-1", "timeout");
        assert_eq!(tracker.state_of("peer-1"), PeerState::Offline);

        tracker.record_success("peer-1");
        assert_eq!(tracker.state_of("peer-1"), PeerState::Offline);
        tracker.record_success("peer-1");
        assert_eq!(tracker.state_of("peer-1"), PeerState::Online);
    }

    #[test]
    fn test_success_resets_failure_streak() {
        let mut tracker = PeerTracker::new(2, 4, 1);
        tracker.record_failure("peer-1", "timeout");
        tracker.record_success("peer-1");
        tracker.record_failure("peer-1", "timeout");
        // Streak restarted: one failure is below the suspect threshold.
        assert_eq!(tracker.state_of("peer-1"), PeerState::Online);
    }

    #[test]
    fn test_events_recorded_for_both_directions() {
        let mut tracker = PeerTracker::new(1, 1, 1);
        tracker.record_failure("peer-1", "boom");
        tracker.record_success("peer-1");
        let events = tracker.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, "partition");
        assert_eq!(events[0].to_state, PeerState::Offline);
        assert_eq!(events[1].event_type, "recovery");
        assert_eq!(events[1].to_state, PeerState::Online);
    }

    #[test]
    fn test_event_ring_is_bounded() {
        let mut tracker = PeerTracker::new(1, 1, 1);
        for _ in 0..300 {
            tracker.record_failure("peer-1", "boom");
            tracker.record_success("peer-1");
        }
        assert!(tracker.events().len() <= EVENT_CAP);
    }

    #[test]
    fn test_metrics_counts() {
        let mut tracker = PeerTracker::new(1, 2, 1);
        tracker.record_failure("peer-1", "boom");
        tracker.record_failure("peer-2", "boom");
        tracker.record_failure("peer-2", "boom");
        let metrics = tracker.metrics();
        assert_eq!(metrics.suspect_peers, 1);
        assert_eq!(metrics.offline_peers, 1);
        assert!(metrics.partition_events >= 2);
    }

    #[test]
    fn test_peer_state_serializes_screaming() {
        assert_eq!(serde_json::to_string(&PeerState::Online).unwrap(), "\"ONLINE\"");
        assert_eq!(serde_json::to_string(&PeerState::Suspect).unwrap(), "\"SUSPECT\"");
    }
}

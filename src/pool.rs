//! Provider pool: ordered (kind, credential) entries with health tracking.
//!
//! The pool owns the process-lifetime failover state. Entries are created
//! at construction in priority order (all keys of the preferred kind
//! first, then the next kind) and never removed — repeated failures only
//! soft-disable an entry until its cool-down elapses.
//!
//! Health updates are serialized per entry, not across the pool, so
//! concurrent turns never contend on a global lock and never
//! double-penalize the same entry.

use crate::backend::ProviderKind;
use crate::error::{AgentError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Health of a single pool entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    /// Never used yet.
    Unknown,
    /// Last attempt succeeded.
    Healthy,
    /// Crossed the failure threshold; skipped until the cool-down elapses.
    Unhealthy,
}

/// Outcome of one provider attempt, reported back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

#[derive(Debug)]
struct EntryState {
    health: Health,
    consecutive_failures: u32,
    unhealthy_since: Option<Instant>,
}

#[derive(Debug)]
struct PoolEntry {
    kind: ProviderKind,
    credential: String,
    label: String,
    state: Mutex<EntryState>,
}

/// A claim on a pool entry for one provider attempt.
///
/// Carries everything the gateway needs to issue the call; `index` is
/// passed back to [`ProviderPool::report`] afterwards.
#[derive(Debug, Clone)]
pub struct Lease {
    pub index: usize,
    pub kind: ProviderKind,
    pub credential: String,
    pub label: String,
}

/// A monitoring snapshot row. Never exposes the raw credential.
#[derive(Debug, Clone, Serialize)]
pub struct EntryStatus {
    pub label: String,
    pub kind: ProviderKind,
    pub credential_id: String,
    pub health: Health,
    pub consecutive_failures: u32,
}

/// Ordered pool of provider entries with per-entry health state.
///
/// Shared across all in-flight turns; all methods take `&self`.
#[derive(Debug)]
pub struct ProviderPool {
    entries: Vec<PoolEntry>,
    failure_threshold: u32,
    cooldown: Duration,
}

impl ProviderPool {
    /// Build a pool from `(kind, credential)` pairs in priority order.
    ///
    /// Entries are labeled `"{kind}-{n}"` with `n` counting within each
    /// kind (`groq-1`, `groq-2`, `gemini-1`, …). Fails with
    /// [`AgentError::InvalidConfig`] if no credentials were supplied.
    pub fn new(
        credentials: Vec<(ProviderKind, String)>,
        failure_threshold: u32,
        cooldown: Duration,
    ) -> Result<Self> {
        if credentials.is_empty() {
            return Err(AgentError::InvalidConfig(
                "provider pool cannot be empty; configure at least one credential".to_string(),
            ));
        }

        let mut per_kind: HashMap<ProviderKind, u32> = HashMap::new();
        let entries = credentials
            .into_iter()
            .map(|(kind, credential)| {
                let n = per_kind.entry(kind).or_insert(0);
                *n += 1;
                PoolEntry {
                    kind,
                    credential,
                    label: format!("{}-{}", kind, n),
                    state: Mutex::new(EntryState {
                        health: Health::Unknown,
                        consecutive_failures: 0,
                        unhealthy_since: None,
                    }),
                }
            })
            .collect();

        Ok(Self {
            entries,
            failure_threshold: failure_threshold.max(1),
            cooldown,
        })
    }

    /// Number of configured entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false — construction rejects empty pools.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Select the next usable entry, skipping indices already in `tried`.
    ///
    /// Entries are considered in configured priority order. Unhealthy
    /// entries are skipped until their cool-down has elapsed; if *every*
    /// remaining entry is unhealthy and still cooling down, the first
    /// untried one is re-admitted anyway so a fully-dark pool still gets
    /// probed rather than failing until a timer expires.
    ///
    /// Returns `None` once every entry has been tried — the caller must
    /// treat that as exhaustion for the current request.
    pub fn acquire(&self, tried: &[usize]) -> Option<Lease> {
        let mut first_untried: Option<usize> = None;

        for (index, entry) in self.entries.iter().enumerate() {
            if tried.contains(&index) {
                continue;
            }
            if first_untried.is_none() {
                first_untried = Some(index);
            }

            let state = entry.state.lock().unwrap();
            let eligible = match state.health {
                Health::Unhealthy => state
                    .unhealthy_since
                    .map_or(true, |since| since.elapsed() >= self.cooldown),
                _ => true,
            };
            if eligible {
                return Some(self.lease(index));
            }
        }

        // Full-pass fallback: everything left is unhealthy and cooling down.
        first_untried.map(|index| {
            debug!(
                entry = %self.entries[index].label,
                "all entries unhealthy; re-admitting for a full pass"
            );
            self.lease(index)
        })
    }

    fn lease(&self, index: usize) -> Lease {
        let entry = &self.entries[index];
        Lease {
            index,
            kind: entry.kind,
            credential: entry.credential.clone(),
            label: entry.label.clone(),
        }
    }

    /// Record the outcome of an attempt against the entry at `index`.
    ///
    /// The read-modify-write happens under the entry's own lock, so
    /// concurrent turns cannot double-penalize or double-reset it.
    pub fn report(&self, index: usize, outcome: Outcome) {
        let Some(entry) = self.entries.get(index) else {
            return;
        };
        let mut state = entry.state.lock().unwrap();
        match outcome {
            Outcome::Success => {
                if state.health == Health::Unhealthy {
                    info!(entry = %entry.label, "provider entry recovered");
                }
                state.health = Health::Healthy;
                state.consecutive_failures = 0;
                state.unhealthy_since = None;
            }
            Outcome::Failure => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.failure_threshold {
                    if state.health != Health::Unhealthy {
                        warn!(
                            entry = %entry.label,
                            failures = state.consecutive_failures,
                            "provider entry marked unhealthy"
                        );
                    }
                    state.health = Health::Unhealthy;
                    state.unhealthy_since = Some(Instant::now());
                }
            }
        }
    }

    /// Snapshot every entry's health for monitoring surfaces.
    ///
    /// Read-only: calling this never mutates pool state. Credentials are
    /// masked.
    pub fn status(&self) -> Vec<EntryStatus> {
        self.entries
            .iter()
            .map(|entry| {
                let state = entry.state.lock().unwrap();
                EntryStatus {
                    label: entry.label.clone(),
                    kind: entry.kind,
                    credential_id: mask_credential(&entry.credential),
                    health: state.health,
                    consecutive_failures: state.consecutive_failures,
                }
            })
            .collect()
    }
}

/// Keep a short identifying prefix, hide the rest.
fn mask_credential(credential: &str) -> String {
    if credential.len() > 6 {
        format!("{}***", &credential[..6])
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(threshold: u32, cooldown: Duration) -> ProviderPool {
        ProviderPool::new(
            vec![
                (ProviderKind::Groq, "gsk_key_one".into()),
                (ProviderKind::Groq, "gsk_key_two".into()),
                (ProviderKind::Gemini, "AIza_key_one".into()),
            ],
            threshold,
            cooldown,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_pool_rejected() {
        let result = ProviderPool::new(Vec::new(), 2, Duration::from_secs(60));
        assert!(matches!(result, Err(AgentError::InvalidConfig(_))));
    }

    #[test]
    fn test_labels_count_within_kind() {
        let pool = pool(2, Duration::from_secs(60));
        let labels: Vec<String> = pool.status().into_iter().map(|s| s.label).collect();
        assert_eq!(labels, vec!["groq-1", "groq-2", "gemini-1"]);
    }

    #[test]
    fn test_acquire_priority_order() {
        let pool = pool(2, Duration::from_secs(60));
        let lease = pool.acquire(&[]).unwrap();
        assert_eq!(lease.label, "groq-1");
        assert_eq!(lease.kind, ProviderKind::Groq);
    }

    #[test]
    fn test_acquire_skips_tried() {
        let pool = pool(2, Duration::from_secs(60));
        let first = pool.acquire(&[]).unwrap();
        let second = pool.acquire(&[first.index]).unwrap();
        let third = pool.acquire(&[first.index, second.index]).unwrap();
        assert_eq!(second.label, "groq-2");
        assert_eq!(third.label, "gemini-1");
        assert!(pool.acquire(&[0, 1, 2]).is_none());
    }

    #[test]
    fn test_unhealthy_after_threshold_is_skipped() {
        let pool = pool(2, Duration::from_secs(60));
        pool.report(0, Outcome::Failure);
        // One failure is below the threshold — still selectable.
        assert_eq!(pool.acquire(&[]).unwrap().index, 0);

        pool.report(0, Outcome::Failure);
        // Threshold crossed — entry 0 is skipped.
        assert_eq!(pool.acquire(&[]).unwrap().index, 1);
        assert_eq!(pool.status()[0].health, Health::Unhealthy);
    }

    #[test]
    fn test_success_resets_failures() {
        let pool = pool(2, Duration::from_secs(60));
        pool.report(0, Outcome::Failure);
        pool.report(0, Outcome::Success);
        let status = pool.status();
        assert_eq!(status[0].health, Health::Healthy);
        assert_eq!(status[0].consecutive_failures, 0);
    }

    #[test]
    fn test_cooldown_readmits_entry() {
        let pool = pool(1, Duration::from_millis(5));
        pool.report(0, Outcome::Failure);
        assert_eq!(pool.acquire(&[]).unwrap().index, 1);

        std::thread::sleep(Duration::from_millis(10));
        // Cool-down elapsed — entry 0 is eligible again, in priority order.
        assert_eq!(pool.acquire(&[]).unwrap().index, 0);
        // Health stays Unhealthy until it actually succeeds.
        assert_eq!(pool.status()[0].health, Health::Unhealthy);
    }

    #[test]
    fn test_full_pass_when_all_unhealthy() {
        let pool = pool(1, Duration::from_secs(3600));
        for i in 0..3 {
            pool.report(i, Outcome::Failure);
        }
        // All unhealthy with an hour of cool-down left; acquire still
        // hands out untried entries in order.
        let lease = pool.acquire(&[]).unwrap();
        assert_eq!(lease.index, 0);
        let lease = pool.acquire(&[0]).unwrap();
        assert_eq!(lease.index, 1);
        assert!(pool.acquire(&[0, 1, 2]).is_none());
    }

    #[test]
    fn test_never_same_entry_twice_in_a_row_with_alternative() {
        let pool = pool(2, Duration::from_secs(60));
        let mut tried = Vec::new();
        let mut selected = Vec::new();
        while let Some(lease) = pool.acquire(&tried) {
            tried.push(lease.index);
            selected.push(lease.index);
            pool.report(lease.index, Outcome::Failure);
        }
        // Each entry appears exactly once per invocation.
        let mut dedup = selected.clone();
        dedup.dedup();
        assert_eq!(selected.len(), 3);
        assert_eq!(dedup, selected);
    }

    #[test]
    fn test_status_is_idempotent() {
        let pool = pool(2, Duration::from_secs(60));
        pool.report(0, Outcome::Failure);
        let before = pool.status();
        let again = pool.status();
        assert_eq!(before.len(), again.len());
        for (a, b) in before.iter().zip(again.iter()) {
            assert_eq!(a.health, b.health);
            assert_eq!(a.consecutive_failures, b.consecutive_failures);
        }
    }

    #[test]
    fn test_status_masks_credentials() {
        let pool = pool(2, Duration::from_secs(60));
        for status in pool.status() {
            assert!(!status.credential_id.contains("key"));
            assert!(status.credential_id.ends_with("***"));
        }
        assert_eq!(mask_credential("short"), "***");
        assert_eq!(mask_credential("gsk_key_one"), "gsk_ke***");
    }

    #[test]
    fn test_report_out_of_range_is_noop() {
        let pool = pool(2, Duration::from_secs(60));
        pool.report(99, Outcome::Failure);
        assert_eq!(pool.status().len(), 3);
    }

    #[test]
    fn test_threshold_floor_of_one() {
        let pool = ProviderPool::new(
            vec![(ProviderKind::Groq, "gsk_x".into())],
            0,
            Duration::from_secs(60),
        )
        .unwrap();
        pool.report(0, Outcome::Failure);
        assert_eq!(pool.status()[0].health, Health::Unhealthy);
    }

    #[test]
    fn test_concurrent_reports_stay_consistent() {
        use std::sync::Arc;

        let pool = Arc::new(pool(1000, Duration::from_secs(60)));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let pool = pool.clone();
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    pool.report(0, Outcome::Failure);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(pool.status()[0].consecutive_failures, 800);
    }
}

//! Health-aware service selection
//!
//! Per-service call statistics live in memory only and are rebuilt on
//! process start: a ring buffer of the last 100 outcomes plus lifetime
//! counters. The aggregation handler dampens a service's selection weight
//! by its recent error rate.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::Rng;

/// Ring buffer capacity for recent outcomes
const WINDOW_SIZE: usize = 100;

/// Error-rate dampening factor applied to weights
const ERROR_RATE_PENALTY: f64 = 0.5;

/// Sliding-window statistics for one service
#[derive(Debug, Default)]
struct ServiceStats {
    total_calls: u64,
    error_calls: u64,
    last_error_at: Option<DateTime<Utc>>,
    last_error: String,
    /// true = success; at most the last 100 outcomes
    window: Vec<bool>,
    /// Next write position once the window is full
    idx: usize,
}

impl ServiceStats {
    fn record(&mut self, success: bool, error: Option<&str>) {
        self.total_calls += 1;
        if !success {
            self.error_calls += 1;
            self.last_error_at = Some(Utc::now());
            self.last_error = error.unwrap_or("").to_string();
        }
        if self.window.len() < WINDOW_SIZE {
            self.window.push(success);
        } else {
            self.window[self.idx] = success;
            self.idx = (self.idx + 1) % WINDOW_SIZE;
        }
    }

    /// Failure fraction over the window; lifetime ratio when no window
    /// samples exist yet
    fn error_rate(&self) -> f64 {
        if !self.window.is_empty() {
            let errors = self.window.iter().filter(|ok| !**ok).count();
            errors as f64 / self.window.len() as f64
        } else if self.total_calls > 0 {
            self.error_calls as f64 / self.total_calls as f64
        } else {
            0.0
        }
    }
}

/// Read-only view of one service's stats
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub total_calls: u64,
    pub error_calls: u64,
    pub error_rate: f64,
    pub last_error_at: Option<DateTime<Utc>>,
    pub last_error: String,
}

/// Thread-safe registry of per-service stats, keyed by service id
#[derive(Default)]
pub struct ServiceStatsRegistry {
    stats: RwLock<HashMap<i32, ServiceStats>>,
}

impl ServiceStatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, service_id: i32, success: bool, error: Option<&str>) {
        let mut stats = self.stats.write();
        stats.entry(service_id).or_default().record(success, error);
    }

    pub fn error_rate(&self, service_id: i32) -> f64 {
        let stats = self.stats.read();
        stats.get(&service_id).map(|s| s.error_rate()).unwrap_or(0.0)
    }

    pub fn snapshot(&self, service_id: i32) -> StatsSnapshot {
        let stats = self.stats.read();
        match stats.get(&service_id) {
            Some(s) => StatsSnapshot {
                total_calls: s.total_calls,
                error_calls: s.error_calls,
                error_rate: s.error_rate(),
                last_error_at: s.last_error_at,
                last_error: s.last_error.clone(),
            },
            None => StatsSnapshot {
                total_calls: 0,
                error_calls: 0,
                error_rate: 0.0,
                last_error_at: None,
                last_error: String::new(),
            },
        }
    }
}

/// One selectable candidate
#[derive(Debug, Clone)]
pub struct Candidate {
    pub service_id: i32,
    pub weight: u32,
    pub error_rate: f64,
}

impl Candidate {
    /// `max(1, weight * (1 − 0.5 * error_rate))`
    pub fn effective_weight(&self) -> u64 {
        let damped = self.weight as f64 * (1.0 - ERROR_RATE_PENALTY * self.error_rate);
        (damped as u64).max(1)
    }
}

/// Weighted-random pick over the candidates; `None` on an empty slate.
/// Each candidate's probability is its effective weight over the sum.
pub fn pick_weighted(candidates: &[Candidate]) -> Option<&Candidate> {
    if candidates.is_empty() {
        return None;
    }
    let total: u64 = candidates.iter().map(|c| c.effective_weight()).sum();
    let mut roll = rand::thread_rng().gen_range(0..total);
    for candidate in candidates {
        let weight = candidate.effective_weight();
        if roll < weight {
            return Some(candidate);
        }
        roll -= weight;
    }
    // Unreachable: the roll is strictly below the sum
    candidates.last()
}

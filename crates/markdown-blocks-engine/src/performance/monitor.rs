use std::collections::VecDeque;
use std::time::Duration;

use serde::Serialize;

use super::complexity::Strategy;

/// One parse, as recorded by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseMetrics {
    pub strategy: Strategy,
    pub score: usize,
    pub bytes: usize,
    pub block_count: usize,
    pub duration: Duration,
    pub cache_hit: bool,
}

/// Bounded history of recent parses; the oldest record drops off first.
#[derive(Debug, Clone)]
pub struct PerformanceMonitor {
    capacity: usize,
    history: VecDeque<ParseMetrics>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(64)
    }
}

impl PerformanceMonitor {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    pub fn record(&mut self, metrics: ParseMetrics) {
        log::debug!(
            "parsed {} bytes ({} strategy, score {}) into {} blocks in {:?}{}",
            metrics.bytes,
            metrics.strategy,
            metrics.score,
            metrics.block_count,
            metrics.duration,
            if metrics.cache_hit { " from cache" } else { "" }
        );
        if self.capacity == 0 {
            return;
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(metrics);
    }

    pub fn history(&self) -> impl Iterator<Item = &ParseMetrics> {
        self.history.iter()
    }

    pub fn last(&self) -> Option<&ParseMetrics> {
        self.history.back()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Mean duration of recorded parses that missed the cache.
    pub fn average_parse_time(&self) -> Option<Duration> {
        let parsed: Vec<Duration> = self
            .history
            .iter()
            .filter(|m| !m.cache_hit)
            .map(|m| m.duration)
            .collect();
        if parsed.is_empty() {
            return None;
        }
        Some(parsed.iter().sum::<Duration>() / parsed.len() as u32)
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}

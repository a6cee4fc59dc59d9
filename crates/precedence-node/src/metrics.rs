use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide relay counters, shared between pipelines, the monitor and
/// the health server.
#[derive(Debug, Default)]
pub struct RelayMetrics {
    pub records_seen: AtomicU64,
    pub tombstones: AtomicU64,
    pub decode_failures: AtomicU64,
    pub created: AtomicU64,
    pub conflicts: AtomicU64,
    pub transient_failures: AtomicU64,
    pub pipeline_starts: AtomicU64,
    /// Gauge: size of the topic set of the running pipeline.
    pub subscribed_topics: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_seen: u64,
    pub tombstones: u64,
    pub decode_failures: u64,
    pub created: u64,
    pub conflicts: u64,
    pub transient_failures: u64,
    pub pipeline_starts: u64,
    pub subscribed_topics: u64,
}

impl RelayMetrics {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_seen: self.records_seen.load(Ordering::Relaxed),
            tombstones: self.tombstones.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            created: self.created.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
            transient_failures: self.transient_failures.load(Ordering::Relaxed),
            pipeline_starts: self.pipeline_starts.load(Ordering::Relaxed),
            subscribed_topics: self.subscribed_topics.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::RelayMetrics;

    #[test]
    fn snapshot_reads_every_counter() {
        let metrics = RelayMetrics::default();
        RelayMetrics::bump(&metrics.records_seen);
        RelayMetrics::bump(&metrics.records_seen);
        RelayMetrics::bump(&metrics.conflicts);
        metrics.subscribed_topics.store(3, Ordering::Relaxed);

        let snap = metrics.snapshot();
        assert_eq!(snap.records_seen, 2);
        assert_eq!(snap.conflicts, 1);
        assert_eq!(snap.subscribed_topics, 3);
        assert_eq!(snap.created, 0);
    }
}

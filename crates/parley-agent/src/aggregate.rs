use thiserror::Error;

/// The upstream stream failed; `partial` is everything received before it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("stream failed after {} bytes: {reason}", partial.len())]
pub struct StreamError {
    pub partial: String,
    pub reason: String,
}

/// Accumulates text deltas into the growing reply.
///
/// The snapshot only ever grows; empty deltas leave it unchanged.
#[derive(Debug, Default)]
pub struct StreamAggregator {
    snapshot: String,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a delta and return the full snapshot so far.
    pub fn feed(&mut self, delta: &str) -> &str {
        self.snapshot.push_str(delta);
        &self.snapshot
    }

    pub fn snapshot(&self) -> &str {
        &self.snapshot
    }

    pub fn finish(self) -> String {
        self.snapshot
    }

    /// End the stream with an error, keeping the partial reply.
    pub fn fail(self, reason: impl Into<String>) -> StreamError {
        StreamError {
            partial: self.snapshot,
            reason: reason.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshots_grow_with_each_delta() {
        let mut agg = StreamAggregator::new();
        assert_eq!(agg.feed("Hel"), "Hel");
        assert_eq!(agg.feed("lo wor"), "Hello wor");
        assert_eq!(agg.feed("ld."), "Hello world.");
        assert_eq!(agg.finish(), "Hello world.");
    }

    #[test]
    fn empty_delta_is_a_no_op() {
        let mut agg = StreamAggregator::new();
        agg.feed("a");
        assert_eq!(agg.feed(""), "a");
        assert_eq!(agg.len(), 1);
    }

    #[test]
    fn fresh_aggregator_is_empty() {
        let agg = StreamAggregator::new();
        assert!(agg.is_empty());
        assert_eq!(agg.finish(), "");
    }

    #[test]
    fn fail_keeps_partial_reply() {
        let mut agg = StreamAggregator::new();
        agg.feed("partial ");
        agg.feed("answer");
        let err = agg.fail("connection reset");
        assert_eq!(err.partial, "partial answer");
        assert_eq!(err.reason, "connection reset");
        assert_eq!(err.to_string(), "stream failed after 14 bytes: connection reset");
    }
}

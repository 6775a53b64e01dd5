// src/feedback.rs
//
// Engine -> UI trigger feedback.

use std::collections::VecDeque;

use crossbeam_channel::Sender;

/// How long the UI keeps a feedback record (ms).
pub const FEEDBACK_WINDOW_MS: f64 = 1000.0;

/// A dot crossing as reported to the UI, fired or not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggeredDotInfo {
    pub dot_index: usize,

    /// Engine clock time of the crossing (ms since the engine started).
    pub timestamp_ms: f64,

    pub velocity: u8,
    pub gate_time_ms: f32,

    /// False when the probability gate skipped the crossing.
    pub was_triggered: bool,

    pub beat_count: u32,
}

/// Where the engine puts feedback records.
///
/// Implementations must never block; the engine calls this from the
/// audio thread.
pub trait FeedbackSink {
    fn push(&mut self, info: TriggeredDotInfo);
}

/// Collects everything. Used offline and in tests.
impl FeedbackSink for Vec<TriggeredDotInfo> {
    #[inline]
    fn push(&mut self, info: TriggeredDotInfo) {
        Vec::push(self, info);
    }
}

/// Bounded channel to the UI. A full queue drops the record.
impl FeedbackSink for Sender<TriggeredDotInfo> {
    #[inline]
    fn push(&mut self, info: TriggeredDotInfo) {
        let _ = self.try_send(info);
    }
}

/// Discards feedback.
impl FeedbackSink for () {
    #[inline]
    fn push(&mut self, _info: TriggeredDotInfo) {}
}

/// UI-side record of recent crossings, pruned to the last second.
#[derive(Debug, Clone, Default)]
pub struct FeedbackWindow {
    records: VecDeque<TriggeredDotInfo>,
}

impl FeedbackWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, info: TriggeredDotInfo) {
        self.records.push_back(info);
    }

    /// Drop records older than the window at `now_ms`.
    pub fn prune(&mut self, now_ms: f64) {
        self.records
            .retain(|info| now_ms - info.timestamp_ms <= FEEDBACK_WINDOW_MS);
    }

    pub fn iter(&self) -> impl Iterator<Item = &TriggeredDotInfo> {
        self.records.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

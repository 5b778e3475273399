//! Ordered, contiguous log of activity segments for one recording unit.

use super::state::{Segment, SegmentKind};

/// Append-only timeline where at most the last segment is open.
#[derive(Debug, Clone, Default)]
pub struct SegmentLog {
    segments: Vec<Segment>,
}

impl SegmentLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh timeline with one open segment
    pub fn begin(&mut self, kind: SegmentKind, at_ms: f64) {
        self.segments.clear();
        self.segments.push(Segment::open(kind, at_ms));
    }

    /// The currently open segment, if any
    pub fn current(&self) -> Option<&Segment> {
        self.segments.last().filter(|s| s.is_open())
    }

    /// Close the open segment and open one of `kind` at `at_ms`.
    ///
    /// Returns false when nothing changed. A zero-length open segment is
    /// discarded instead of closed; if that leaves a closed segment of the
    /// requested kind at the tail, that segment is reopened.
    pub fn transition(&mut self, kind: SegmentKind, at_ms: f64) -> bool {
        let Some(open) = self.segments.last_mut().filter(|s| s.is_open()) else {
            let start = self
                .segments
                .last()
                .and_then(|s| s.end_time)
                .unwrap_or(at_ms);
            self.push_open(kind, start);
            return true;
        };

        if open.kind == kind {
            return false;
        }

        let at_ms = at_ms.max(open.start_time);
        if at_ms == open.start_time {
            self.segments.pop();
            if let Some(previous) = self.segments.last_mut() {
                if previous.kind == kind {
                    previous.end_time = None;
                    previous.duration_seconds = None;
                    return true;
                }
            }
        } else {
            open.close(at_ms);
        }

        self.push_open(kind, at_ms);
        true
    }

    /// Close the open segment, dropping it if it never accumulated time
    pub fn close(&mut self, at_ms: f64) {
        let Some(open) = self.segments.last_mut().filter(|s| s.is_open()) else {
            return;
        };

        if at_ms <= open.start_time {
            self.segments.pop();
        } else {
            open.close(at_ms);
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    fn push_open(&mut self, kind: SegmentKind, at_ms: f64) {
        let mut segment = Segment::open(kind, at_ms);
        let follows_erasing = self
            .segments
            .last()
            .is_some_and(|s| s.kind == SegmentKind::Erasing);
        if kind == SegmentKind::Writing && follows_erasing {
            segment.mark_rework();
        }
        self.segments.push(segment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SegmentKind::*;

    fn kinds(log: &SegmentLog) -> Vec<SegmentKind> {
        log.segments().iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_transitions_are_contiguous() {
        let mut log = SegmentLog::new();
        log.begin(Writing, 0.0);
        assert!(log.transition(Paused, 5000.0));
        assert!(log.transition(Writing, 9000.0));
        assert!(log.transition(Erasing, 11000.0));
        log.close(13000.0);

        let segments = log.segments();
        assert_eq!(kinds(&log), vec![Writing, Paused, Writing, Erasing]);
        for pair in segments.windows(2) {
            assert_eq!(pair[0].end_time, Some(pair[1].start_time));
        }
        let total: f64 = segments.iter().map(|s| s.duration()).sum();
        assert!((total - 13.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_kind_is_ignored() {
        let mut log = SegmentLog::new();
        log.begin(Writing, 0.0);
        assert!(!log.transition(Writing, 1000.0));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_zero_length_segment_is_replaced() {
        let mut log = SegmentLog::new();
        log.begin(Writing, 0.0);
        log.transition(Paused, 0.0);
        assert_eq!(kinds(&log), vec![Paused]);
        assert_eq!(log.current().unwrap().start_time, 0.0);
    }

    #[test]
    fn test_zero_length_churn_reopens_previous() {
        let mut log = SegmentLog::new();
        log.begin(Writing, 0.0);
        log.transition(Paused, 2000.0);
        log.transition(Writing, 2000.0);

        assert_eq!(kinds(&log), vec![Writing]);
        assert!(log.current().is_some());
        log.close(4000.0);
        assert_eq!(log.segments()[0].duration(), 4.0);
    }

    #[test]
    fn test_writing_after_erasing_is_rework() {
        let mut log = SegmentLog::new();
        log.begin(Writing, 0.0);
        log.transition(Erasing, 1000.0);
        log.transition(Writing, 2000.0);
        log.close(3000.0);

        let segments = log.segments();
        assert!(!segments[0].is_rework());
        assert!(segments[2].is_rework());
    }

    #[test]
    fn test_earlier_instant_is_clamped() {
        let mut log = SegmentLog::new();
        log.begin(Writing, 1000.0);
        log.transition(Paused, 2000.0);
        log.transition(Writing, 1500.0);

        assert_eq!(kinds(&log), vec![Writing]);
    }

    #[test]
    fn test_close_drops_empty_tail() {
        let mut log = SegmentLog::new();
        log.begin(Writing, 0.0);
        log.transition(Answering, 3000.0);
        log.close(3000.0);

        assert_eq!(kinds(&log), vec![Writing]);
        assert!(log.current().is_none());
    }
}

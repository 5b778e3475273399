//! Activity analytics
//!
//! Reduces a finalized segment timeline into the metrics shown on the
//! grading screen. Pure functions only; nothing here runs during capture.

use crate::recorder::{RecordingResult, Segment, SegmentKind};
use serde::{Deserialize, Serialize};

/// Per-problem summary, all times in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub writing_time: f64,
    pub thinking_time: f64,
    pub erasing_time: f64,
    pub first_reaction_time: f64,
    pub max_pause_time: f64,
    pub rework_count: usize,
    pub answering_time: f64,
    pub total_time: f64,
}

/// Summarize a timeline.
///
/// A leading pause is the first-reaction window: it is reported as
/// `first_reaction_time` and left out of thinking time and the longest pause.
/// Without one, `first_reaction` (if given) is used. A rework is a writing
/// segment directly after an erasing segment.
pub fn summarize(segments: &[Segment], first_reaction: Option<f64>) -> ActivitySummary {
    let leading_pause = segments
        .first()
        .filter(|s| s.kind == SegmentKind::Paused)
        .map(Segment::duration);

    let mut summary = ActivitySummary {
        first_reaction_time: leading_pause.or(first_reaction).unwrap_or(0.0),
        ..ActivitySummary::default()
    };

    for (index, segment) in segments.iter().enumerate() {
        let duration = segment.duration();
        summary.total_time += duration;

        match segment.kind {
            SegmentKind::Writing => {
                summary.writing_time += duration;
                let after_erasing = index
                    .checked_sub(1)
                    .is_some_and(|prev| segments[prev].kind == SegmentKind::Erasing);
                if after_erasing {
                    summary.rework_count += 1;
                }
            }
            SegmentKind::Erasing => summary.erasing_time += duration,
            SegmentKind::Answering => summary.answering_time += duration,
            SegmentKind::Paused if index == 0 => {}
            SegmentKind::Paused => {
                summary.thinking_time += duration;
                summary.max_pause_time = summary.max_pause_time.max(duration);
            }
        }
    }

    summary
}

impl RecordingResult {
    pub fn summary(&self) -> ActivitySummary {
        summarize(&self.segments, self.first_reaction_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SegmentKind::*;

    fn timeline(spans: &[(SegmentKind, f64, f64)]) -> Vec<Segment> {
        spans
            .iter()
            .map(|&(kind, start, end)| {
                let mut segment = Segment::open(kind, start * 1000.0);
                segment.close(end * 1000.0);
                segment
            })
            .collect()
    }

    #[test]
    fn test_end_to_end_timeline() {
        let segments = timeline(&[
            (Writing, 0.0, 5.0),
            (Paused, 5.0, 9.0),
            (Writing, 9.0, 11.0),
            (Erasing, 11.0, 13.0),
            (Answering, 13.0, 15.0),
        ]);

        let summary = summarize(&segments, Some(0.0));
        assert_eq!(summary.writing_time, 7.0);
        assert_eq!(summary.erasing_time, 2.0);
        assert_eq!(summary.thinking_time, 4.0);
        assert_eq!(summary.first_reaction_time, 0.0);
        assert_eq!(summary.max_pause_time, 4.0);
        assert_eq!(summary.rework_count, 0);
        assert_eq!(summary.answering_time, 2.0);
        assert_eq!(summary.total_time, 15.0);
    }

    #[test]
    fn test_leading_pause_is_first_reaction() {
        let segments = timeline(&[
            (Paused, 0.0, 4.2),
            (Writing, 4.2, 6.0),
            (Paused, 6.0, 9.5),
            (Writing, 9.5, 10.0),
            (Paused, 10.0, 14.0),
        ]);

        let summary = summarize(&segments, Some(99.0));
        assert!((summary.first_reaction_time - 4.2).abs() < 1e-9);
        assert!((summary.thinking_time - 7.5).abs() < 1e-9);
        assert_eq!(summary.max_pause_time, 4.0);
    }

    #[test]
    fn test_rework_follows_erasing() {
        let segments = timeline(&[
            (Writing, 0.0, 1.0),
            (Erasing, 1.0, 2.0),
            (Writing, 2.0, 3.0),
            (Paused, 3.0, 7.0),
            (Erasing, 7.0, 8.0),
            (Paused, 8.0, 12.0),
            (Writing, 12.0, 13.0),
            (Erasing, 13.0, 14.0),
            (Writing, 14.0, 15.0),
        ]);

        assert_eq!(summarize(&segments, None).rework_count, 2);
    }

    #[test]
    fn test_empty_timeline() {
        let summary = summarize(&[], None);
        assert_eq!(summary, ActivitySummary::default());
        assert_eq!(summarize(&[], Some(2.5)).first_reaction_time, 2.5);
    }

    #[test]
    fn test_summary_wire_names() {
        let json = serde_json::to_value(summarize(&[], None)).unwrap();
        for key in [
            "writingTime",
            "thinkingTime",
            "erasingTime",
            "firstReactionTime",
            "maxPauseTime",
            "reworkCount",
        ] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}

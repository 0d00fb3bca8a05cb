//! Time resolution: elapsed milliseconds to (slide, local progress).

use slidecast_timeline_model::{Slide, Timeline};

/// Largest `f64` below one; keeps unclamped progress strictly inside `[0, 1)`.
const PROGRESS_CEILING: f64 = 1.0 - f64::EPSILON / 2.0;

/// The slide active at an instant and how far into it the instant is.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedFrame<'a> {
    pub slide: &'a Slide,
    pub slide_index: usize,
    /// Position within the slide, `0.0` at its start.
    pub local_progress: f64,
}

/// Find the slide containing `elapsed_ms`.
///
/// Returns `None` for an empty timeline, a zero total duration, or an
/// instant at or past the end. Negative times are treated as zero.
pub fn resolve(timeline: &Timeline, elapsed_ms: f64) -> Option<ResolvedFrame<'_>> {
    let t = elapsed_ms.max(0.0);
    let mut start = 0.0;
    for (slide_index, slide) in timeline.slides().iter().enumerate() {
        let duration = slide.duration_ms();
        if duration <= 0.0 {
            continue;
        }
        let end = start + duration;
        if t < end {
            return Some(ResolvedFrame {
                slide,
                slide_index,
                local_progress: ((t - start) / duration).min(PROGRESS_CEILING),
            });
        }
        start = end;
    }
    None
}

/// Like [`resolve`], but instants at or past the end select the last slide
/// with progress measured from its start (so exactly the end yields `1.0`).
pub fn resolve_clamped(timeline: &Timeline, elapsed_ms: f64) -> Option<ResolvedFrame<'_>> {
    if let Some(frame) = resolve(timeline, elapsed_ms) {
        return Some(frame);
    }

    let slide_index = timeline.len().checked_sub(1)?;
    let slide = &timeline.slides()[slide_index];
    let duration = slide.duration_ms();
    if duration <= 0.0 {
        return None;
    }
    let start = timeline.total_duration_ms() - duration;
    Some(ResolvedFrame {
        slide,
        slide_index,
        local_progress: ((elapsed_ms.max(0.0) - start) / duration).clamp(0.0, 1.0),
    })
}

/// Index of the slide an editor should highlight at `elapsed_ms`; past the
/// end this is the last slide.
pub fn current_slide_index(timeline: &Timeline, elapsed_ms: f64) -> Option<usize> {
    resolve_clamped(timeline, elapsed_ms).map(|frame| frame.slide_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use slidecast_timeline_model::Color;

    fn timeline_of(secs: &[f64]) -> Timeline {
        Timeline::from_slides(secs.iter().map(|s| Slide::new(*s, Color::BLACK)).collect())
    }

    #[test]
    fn test_empty_timeline_resolves_to_none() {
        let timeline = Timeline::new();
        assert!(resolve(&timeline, 0.0).is_none());
        assert!(resolve(&timeline, 1234.0).is_none());
        assert!(resolve_clamped(&timeline, 0.0).is_none());
        assert_eq!(timeline.total_duration_ms(), 0.0);
    }

    #[test]
    fn test_two_slides_midpoint_of_second() {
        let timeline = timeline_of(&[2.0, 1.0]);
        let frame = resolve(&timeline, 2500.0).unwrap();
        assert_eq!(frame.slide_index, 1);
        assert!((frame.local_progress - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_slide_start_and_tenth() {
        let timeline = timeline_of(&[3.0]);
        let start = resolve(&timeline, 0.0).unwrap();
        assert_eq!(start.local_progress, 0.0);
        let tenth = resolve(&timeline, 300.0).unwrap();
        assert!((tenth.local_progress - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_end_of_timeline_is_none_unless_clamped() {
        let timeline = timeline_of(&[2.0, 1.0]);
        assert!(resolve(&timeline, 3000.0).is_none());

        let clamped = resolve_clamped(&timeline, 3000.0).unwrap();
        assert_eq!(clamped.slide_index, 1);
        assert!((clamped.local_progress - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_time_is_start() {
        let timeline = timeline_of(&[2.0]);
        let frame = resolve(&timeline, -50.0).unwrap();
        assert_eq!(frame.slide_index, 0);
        assert_eq!(frame.local_progress, 0.0);
    }

    #[test]
    fn test_current_slide_index_clamps_past_end() {
        let timeline = timeline_of(&[1.0, 1.0]);
        assert_eq!(current_slide_index(&timeline, 500.0), Some(0));
        assert_eq!(current_slide_index(&timeline, 1500.0), Some(1));
        assert_eq!(current_slide_index(&timeline, 99_000.0), Some(1));
        assert_eq!(current_slide_index(&Timeline::new(), 0.0), None);
    }

    proptest! {
        #[test]
        fn prop_slide_boundaries(secs in prop::collection::vec(1u32..=60, 1..8)) {
            let timeline = timeline_of(&secs.iter().map(|s| *s as f64).collect::<Vec<_>>());
            let mut cumulative = 0.0;
            for (k, s) in secs.iter().enumerate() {
                cumulative += *s as f64 * 1000.0;

                let before = resolve(&timeline, cumulative - 1.0).unwrap();
                prop_assert_eq!(before.slide_index, k);
                prop_assert!(before.local_progress < 1.0);
                prop_assert!(before.local_progress > 0.9);

                match resolve(&timeline, cumulative) {
                    Some(at) => {
                        prop_assert_eq!(at.slide_index, k + 1);
                        prop_assert_eq!(at.local_progress, 0.0);
                    }
                    None => prop_assert_eq!(k, secs.len() - 1),
                }
            }
        }

        #[test]
        fn prop_progress_in_unit_interval(
            ms in prop::collection::vec(1000u32..=60_000, 1..6),
            t in 0.0f64..400_000.0,
        ) {
            let secs: Vec<f64> = ms.iter().map(|m| *m as f64 / 1000.0).collect();
            let timeline = timeline_of(&secs);
            if let Some(frame) = resolve(&timeline, t) {
                prop_assert!(frame.local_progress >= 0.0);
                prop_assert!(frame.local_progress < 1.0);
            } else {
                prop_assert!(t >= timeline.total_duration_ms());
            }
        }
    }
}

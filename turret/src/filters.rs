//! Per-frame target confidence filter
//!
//! Turns the noisy stream of single-frame circle detections into a stable
//! current target. The filter smooths persistence, not position: a matching
//! detection is adopted as-is, while short detection gaps keep the last
//! target alive until the lost-frame limit is reached.

use serde::{Deserialize, Serialize};

use crate::config::TrackingFilterConfig;
use crate::detection::Detection;

/// Filtered belief about the target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTarget {
    pub x: i32,
    pub y: i32,
    pub radius: i32,
    /// Persistence score in `[0, max_confidence]`
    pub confidence: u32,
    /// Consecutive frames without a detection
    pub lost_count: u32,
}

/// Confidence filter state
#[derive(Debug, Clone)]
pub struct ConfidenceFilter {
    config: TrackingFilterConfig,
    target: Option<Detection>,
    confidence: u32,
    lost_count: u32,
}

impl ConfidenceFilter {
    pub fn new(config: TrackingFilterConfig) -> Self {
        Self {
            config,
            target: None,
            confidence: 0,
            lost_count: 0,
        }
    }

    /// Feed one frame's detection result
    ///
    /// Must not be called while the fired latch is set; the controller never
    /// runs detection in that state.
    pub fn update(&mut self, detection: Option<Detection>) -> Option<TrackedTarget> {
        match detection {
            Some(detection) => {
                self.confidence = match &self.target {
                    Some(previous)
                        if detection.distance_to(previous) < self.config.match_radius_px =>
                    {
                        (self.confidence + 1).min(self.config.max_confidence)
                    }
                    // New candidate, or a jump too large to be the same target
                    _ => 1,
                };
                self.lost_count = 0;
                self.target = Some(detection);
            }
            None => {
                self.confidence = self.confidence.saturating_sub(1);
                self.lost_count += 1;
                if self.lost_count >= self.config.lost_frame_limit {
                    self.target = None;
                }
            }
        }

        self.current()
    }

    /// Current target, if any
    pub fn current(&self) -> Option<TrackedTarget> {
        self.target.map(|target| TrackedTarget {
            x: target.x,
            y: target.y,
            radius: target.radius,
            confidence: self.confidence,
            lost_count: self.lost_count,
        })
    }

    pub fn confidence(&self) -> u32 {
        self.confidence
    }

    pub fn lost_count(&self) -> u32 {
        self.lost_count
    }

    /// Forget the target and all persistence state
    pub fn reset(&mut self) {
        self.target = None;
        self.confidence = 0;
        self.lost_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> ConfidenceFilter {
        ConfidenceFilter::new(TrackingFilterConfig::default())
    }

    #[test]
    fn test_first_detection_adopted_immediately() {
        let mut filter = filter();
        let target = filter.update(Some(Detection::new(100, 80, 40))).unwrap();
        assert_eq!((target.x, target.y, target.radius), (100, 80, 40));
        assert_eq!(target.confidence, 1);
        assert_eq!(target.lost_count, 0);
    }

    #[test]
    fn test_nearby_detections_build_confidence_up_to_cap() {
        let mut filter = filter();
        let mut previous = 0;
        for i in 0..20 {
            // Drifts 3 px per frame, always within the 20 px match radius
            let target = filter.update(Some(Detection::new(100 + 3 * i, 100, 40))).unwrap();
            assert!(target.confidence >= previous);
            assert!(target.confidence <= 10);
            previous = target.confidence;
        }
        assert_eq!(filter.confidence(), 10);
    }

    #[test]
    fn test_position_follows_latest_detection() {
        let mut filter = filter();
        filter.update(Some(Detection::new(100, 100, 40)));
        let target = filter.update(Some(Detection::new(112, 95, 41))).unwrap();
        assert_eq!((target.x, target.y, target.radius), (112, 95, 41));
        assert_eq!(target.confidence, 2);
    }

    #[test]
    fn test_jump_resets_confidence_to_one() {
        let mut filter = filter();
        for _ in 0..6 {
            filter.update(Some(Detection::new(100, 100, 40)));
        }
        assert_eq!(filter.confidence(), 6);

        // Exactly 20 px away is not a match
        let target = filter.update(Some(Detection::new(120, 100, 40))).unwrap();
        assert_eq!(target.confidence, 1);
        assert_eq!(target.x, 120);

        // 19 px is a match again
        let target = filter.update(Some(Detection::new(120, 119, 40))).unwrap();
        assert_eq!(target.confidence, 2);
    }

    #[test]
    fn test_target_dropped_after_exactly_five_misses() {
        let mut filter = filter();
        for _ in 0..8 {
            filter.update(Some(Detection::new(50, 50, 39)));
        }

        for miss in 1..=4 {
            let target = filter.update(None).expect("target held through short gaps");
            assert_eq!(target.lost_count, miss);
            assert_eq!((target.x, target.y), (50, 50));
        }
        assert_eq!(filter.confidence(), 4);

        assert!(filter.update(None).is_none());
        assert_eq!(filter.lost_count(), 5);
        assert!(filter.update(None).is_none());
    }

    #[test]
    fn test_confidence_floors_at_zero() {
        let mut filter = filter();
        filter.update(Some(Detection::new(10, 10, 40)));
        for _ in 0..10 {
            filter.update(None);
        }
        assert_eq!(filter.confidence(), 0);
    }

    #[test]
    fn test_detection_after_loss_starts_new_track() {
        let mut filter = filter();
        filter.update(Some(Detection::new(10, 10, 40)));
        filter.update(Some(Detection::new(10, 10, 40)));
        for _ in 0..5 {
            filter.update(None);
        }
        assert!(filter.current().is_none());

        // Same place, but the old track is gone
        let target = filter.update(Some(Detection::new(10, 10, 40))).unwrap();
        assert_eq!(target.confidence, 1);
        assert_eq!(target.lost_count, 0);
    }

    #[test]
    fn test_gap_shorter_than_limit_keeps_track() {
        let mut filter = filter();
        for _ in 0..3 {
            filter.update(Some(Detection::new(10, 10, 40)));
        }
        filter.update(None);
        filter.update(None);
        let target = filter.update(Some(Detection::new(12, 10, 40))).unwrap();
        // 3, decayed twice to 1, then continued
        assert_eq!(target.confidence, 2);
        assert_eq!(target.lost_count, 0);
    }

    #[test]
    fn test_reset() {
        let mut filter = filter();
        filter.update(Some(Detection::new(10, 10, 40)));
        filter.update(None);
        filter.reset();
        assert!(filter.current().is_none());
        assert_eq!(filter.confidence(), 0);
        assert_eq!(filter.lost_count(), 0);
    }
}

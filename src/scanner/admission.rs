//! Scan admission — decides whether a cadence tick is worth a decode call.
//!
//! Pure logic: the caller supplies the last admitted scan, the current
//! frame and the clock reading.

use std::time::Duration;

use tokio::time::Instant;

use super::geometry::Frame;

/// Snapshot taken at the moment a scan is admitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastScan {
    pub at: Instant,
    pub frame: Frame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmitReason {
    FirstScan,
    Moved,
    Resized,
    StaticResample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Admit(AdmitReason),
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionPolicy {
    pub position_threshold_px: f64,
    pub size_threshold_px: f64,
    pub static_resample: Duration,
}

impl AdmissionPolicy {
    pub fn evaluate(&self, last: Option<&LastScan>, current: &Frame, now: Instant) -> Verdict {
        let Some(last) = last else {
            return Verdict::Admit(AdmitReason::FirstScan);
        };

        if current.center.distance_to(&last.frame.center) >= self.position_threshold_px {
            return Verdict::Admit(AdmitReason::Moved);
        }
        if (current.size - last.frame.size).abs() >= self.size_threshold_px {
            return Verdict::Admit(AdmitReason::Resized);
        }
        if now.saturating_duration_since(last.at) >= self.static_resample {
            return Verdict::Admit(AdmitReason::StaticResample);
        }

        Verdict::Reject
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::geometry::Point;

    fn policy() -> AdmissionPolicy {
        AdmissionPolicy {
            position_threshold_px: 12.0,
            size_threshold_px: 12.0,
            static_resample: Duration::from_millis(1500),
        }
    }

    fn frame(size: f64, x: f64, y: f64) -> Frame {
        Frame::new(size, Point::new(x, y))
    }

    #[test]
    fn first_scan_always_admitted() {
        let v = policy().evaluate(None, &frame(240.0, 0.0, 0.0), Instant::now());
        assert_eq!(v, Verdict::Admit(AdmitReason::FirstScan));
    }

    #[test]
    fn movement_beyond_threshold_admits_immediately() {
        let t0 = Instant::now();
        let last = LastScan {
            at: t0,
            frame: frame(240.0, 100.0, 100.0),
        };
        // 3-4-5 triangle scaled to exactly 12.5px
        let v = policy().evaluate(Some(&last), &frame(240.0, 107.5, 110.0), t0);
        assert_eq!(v, Verdict::Admit(AdmitReason::Moved));
    }

    #[test]
    fn size_change_beyond_threshold_admits() {
        let t0 = Instant::now();
        let last = LastScan {
            at: t0,
            frame: frame(240.0, 100.0, 100.0),
        };
        let v = policy().evaluate(Some(&last), &frame(260.0, 100.0, 100.0), t0);
        assert_eq!(v, Verdict::Admit(AdmitReason::Resized));
    }

    #[test]
    fn static_frame_waits_for_resample() {
        let t0 = Instant::now();
        let last = LastScan {
            at: t0,
            frame: frame(240.0, 100.0, 100.0),
        };
        let jitter = frame(240.0, 103.0, 99.0);
        let p = policy();
        assert_eq!(
            p.evaluate(Some(&last), &jitter, t0 + Duration::from_millis(1499)),
            Verdict::Reject
        );
        assert_eq!(
            p.evaluate(Some(&last), &jitter, t0 + Duration::from_millis(1500)),
            Verdict::Admit(AdmitReason::StaticResample)
        );
    }

    #[test]
    fn thresholds_are_independent() {
        let t0 = Instant::now();
        let last = LastScan {
            at: t0,
            frame: frame(240.0, 100.0, 100.0),
        };
        let p = AdmissionPolicy {
            size_threshold_px: 40.0,
            ..policy()
        };
        assert_eq!(
            p.evaluate(Some(&last), &frame(260.0, 100.0, 100.0), t0),
            Verdict::Reject
        );
        assert_eq!(
            p.evaluate(Some(&last), &frame(240.0, 120.0, 100.0), t0),
            Verdict::Admit(AdmitReason::Moved)
        );
    }
}

//! Reelsmith Core Type Definitions
//!
//! Defines fundamental types used throughout the pipeline.

use serde::{Deserialize, Serialize};

use crate::core::{CoreError, CoreResult};

// =============================================================================
// ID Types
// =============================================================================

/// Asset unique identifier (ULID)
pub type AssetId = String;

// =============================================================================
// Time Types
// =============================================================================

/// Time in seconds (floating point)
pub type TimeSec = f64;

/// A validated `[start, end)` window on the media timeline.
///
/// Construction rejects non-finite, negative, or inverted windows rather
/// than repairing them; a malformed window must never reach a directive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub start_sec: TimeSec,
    pub end_sec: TimeSec,
}

impl TimeWindow {
    pub fn new(start_sec: TimeSec, end_sec: TimeSec) -> CoreResult<Self> {
        if !start_sec.is_finite() || !end_sec.is_finite() {
            return Err(CoreError::Validation(format!(
                "time window must be finite: {start_sec}~{end_sec}"
            )));
        }
        if start_sec < 0.0 {
            return Err(CoreError::Validation(format!(
                "time window start must be >= 0: {start_sec}"
            )));
        }
        if end_sec <= start_sec {
            return Err(CoreError::Validation(format!(
                "time window end must be after start: {start_sec}~{end_sec}"
            )));
        }
        Ok(Self { start_sec, end_sec })
    }

    /// Returns duration in seconds
    pub fn duration(&self) -> TimeSec {
        self.end_sec - self.start_sec
    }
}

// =============================================================================
// Spatial Types
// =============================================================================

/// Axis-aligned pixel rectangle for region edits (blur).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> CoreResult<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::Validation(format!(
                "region must have positive extent: {width}x{height}"
            )));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    /// Checks the region against known frame bounds.
    pub fn check_within(&self, frame_width: u32, frame_height: u32) -> CoreResult<()> {
        let fits_x = self.x.checked_add(self.width).is_some_and(|r| r <= frame_width);
        let fits_y = self
            .y
            .checked_add(self.height)
            .is_some_and(|b| b <= frame_height);
        if !fits_x || !fits_y {
            return Err(CoreError::Validation(format!(
                "region {}x{}+{}+{} exceeds frame {}x{}",
                self.width, self.height, self.x, self.y, frame_width, frame_height
            )));
        }
        Ok(())
    }
}

/// Arrow annotation endpoints in pixel coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArrowSpec {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl ArrowSpec {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> CoreResult<Self> {
        for (label, v) in [("x1", x1), ("y1", y1), ("x2", x2), ("y2", y2)] {
            if !v.is_finite() || v < 0.0 {
                return Err(CoreError::Validation(format!(
                    "arrow coordinate {label} must be finite and >= 0: {v}"
                )));
            }
        }
        if x1 == x2 && y1 == y2 {
            return Err(CoreError::Validation(
                "arrow endpoints must be distinct".to_string(),
            ));
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    /// Shaft length in pixels.
    pub fn length(&self) -> f64 {
        ((self.x2 - self.x1).powi(2) + (self.y2 - self.y1).powi(2)).sqrt()
    }

    /// Checks both endpoints against known frame bounds.
    pub fn check_within(&self, frame_width: u32, frame_height: u32) -> CoreResult<()> {
        let w = frame_width as f64;
        let h = frame_height as f64;
        if self.x1 > w || self.x2 > w || self.y1 > h || self.y2 > h {
            return Err(CoreError::Validation(format!(
                "arrow ({},{})~({},{}) exceeds frame {}x{}",
                self.x1, self.y1, self.x2, self.y2, frame_width, frame_height
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_window_accepts_ordered_finite_bounds() {
        let w = TimeWindow::new(2.0, 7.0).unwrap();
        assert_eq!(w.duration(), 5.0);
    }

    #[test]
    fn time_window_rejects_inverted_and_degenerate() {
        assert!(TimeWindow::new(7.0, 2.0).is_err());
        assert!(TimeWindow::new(3.0, 3.0).is_err());
    }

    #[test]
    fn time_window_rejects_non_finite_and_negative() {
        assert!(TimeWindow::new(f64::NAN, 1.0).is_err());
        assert!(TimeWindow::new(0.0, f64::INFINITY).is_err());
        assert!(TimeWindow::new(-1.0, 1.0).is_err());
    }

    #[test]
    fn region_bounds_check() {
        let r = Region::new(100, 50, 200, 100).unwrap();
        assert!(r.check_within(1920, 1080).is_ok());
        assert!(r.check_within(250, 1080).is_err());
        assert!(r.check_within(1920, 149).is_err());
    }

    #[test]
    fn region_rejects_zero_extent() {
        assert!(Region::new(0, 0, 0, 10).is_err());
        assert!(Region::new(0, 0, 10, 0).is_err());
    }

    #[test]
    fn arrow_length_and_bounds() {
        let a = ArrowSpec::new(0.0, 0.0, 3.0, 4.0).unwrap();
        assert_eq!(a.length(), 5.0);
        assert!(a.check_within(10, 10).is_ok());
        assert!(a.check_within(2, 10).is_err());
    }

    #[test]
    fn arrow_rejects_identical_endpoints() {
        assert!(ArrowSpec::new(5.0, 5.0, 5.0, 5.0).is_err());
    }
}

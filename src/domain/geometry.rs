// ============================================================
// Layer 3 — Crop and Resize Geometry
// ============================================================
// CropSpec removes fixed pixel margins from a frame (e.g. sky
// at the top, the car hood at the bottom). ResizeSpec is the
// exact output plane size every sample is resampled to.
//
// Margins are absolute pixel counts, not fractions.

use serde::{Deserialize, Serialize};

/// Pixel margins removed from each edge before resizing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSpec {
    pub top:    u32,
    pub bottom: u32,
    pub left:   u32,
    pub right:  u32,
}

/// The rectangle that survives a crop: (x, y, width, height).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x:      u32,
    pub y:      u32,
    pub width:  u32,
    pub height: u32,
}

impl CropSpec {
    pub fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self { top, bottom, left, right }
    }

    /// True when every margin is zero
    pub fn is_noop(&self) -> bool {
        self.top == 0 && self.bottom == 0 && self.left == 0 && self.right == 0
    }

    /// Compute the window left over in an image of the given size.
    /// Returns None if the margins consume the whole width or height.
    pub fn window(&self, width: u32, height: u32) -> Option<CropWindow> {
        let horizontal = self.left.checked_add(self.right)?;
        let vertical   = self.top.checked_add(self.bottom)?;
        if horizontal >= width || vertical >= height {
            return None;
        }
        Some(CropWindow {
            x:      self.left,
            y:      self.top,
            width:  width - horizontal,
            height: height - vertical,
        })
    }
}

impl From<(u32, u32, u32, u32)> for CropSpec {
    /// Tuple order is (top, bottom, left, right)
    fn from((top, bottom, left, right): (u32, u32, u32, u32)) -> Self {
        Self::new(top, bottom, left, right)
    }
}

/// Target plane size for every sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResizeSpec {
    pub height: u32,
    pub width:  u32,
}

impl ResizeSpec {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// Number of pixels in one channel plane
    pub fn plane_len(&self) -> usize {
        self.height as usize * self.width as usize
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }
}

impl Default for ResizeSpec {
    /// PilotNet's native input size
    fn default() -> Self {
        Self::new(66, 200)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_crop_is_noop_and_keeps_full_frame() {
        let crop = CropSpec::default();
        assert!(crop.is_noop());
        let w = crop.window(320, 240).unwrap();
        assert_eq!(w, CropWindow { x: 0, y: 0, width: 320, height: 240 });
    }

    #[test]
    fn test_crop_window_removes_margins() {
        let crop = CropSpec::from((20, 8, 3, 5));
        let w    = crop.window(100, 60).unwrap();
        assert_eq!(w.x, 3);
        assert_eq!(w.y, 20);
        assert_eq!(w.width, 92);
        assert_eq!(w.height, 32);
    }

    #[test]
    fn test_crop_consuming_whole_image_is_rejected() {
        assert!(CropSpec::new(30, 30, 0, 0).window(100, 60).is_none());
        assert!(CropSpec::new(0, 0, 100, 0).window(100, 60).is_none());
        assert!(CropSpec::new(0, 0, u32::MAX, 1).window(100, 60).is_none());
    }

    #[test]
    fn test_default_resize_is_pilotnet_input() {
        let r = ResizeSpec::default();
        assert_eq!((r.height, r.width), (66, 200));
        assert_eq!(r.plane_len(), 13_200);
        assert!(!r.is_empty());
        assert!(ResizeSpec::new(0, 10).is_empty());
    }
}

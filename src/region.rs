//! Capture rectangles.
//!
//! [`Rect`] uses exclusive right/bottom edges, matching the Win32 `RECT`
//! convention. [`CaptureRequest`] describes an optional explicit
//! offset+size which [`select_capture_rect`] turns into the final physical
//! capture rectangle for a session.

use std::fmt;

use crate::error::{CaptureError, CaptureResult};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A rectangle with exclusive `right` and `bottom` edges.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Rect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Rect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn from_origin_size(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            left: x,
            top: y,
            right: x.saturating_add(width),
            bottom: y.saturating_add(height),
        }
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn origin(&self) -> Point {
        Point::new(self.left, self.top)
    }

    pub fn is_empty(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }

    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.left <= x && x < self.right && self.top <= y && y < self.bottom
    }

    /// `true` when `other` lies entirely inside `self` (margins >= 0 on all
    /// four sides).
    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.left >= self.left
            && other.top >= self.top
            && other.right <= self.right
            && other.bottom <= self.bottom
    }

    /// Smallest rectangle covering both. An empty `self` is ignored.
    pub fn union(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.left + self.width() / 2,
            self.top + self.height() / 2,
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{}),({},{})",
            self.left, self.top, self.right, self.bottom
        )
    }
}

/// Explicit sub-area to grab, in physical pixels of the resolved area.
///
/// A zero `width` or `height` means "the full resolved area".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureRequest {
    pub width: u32,
    pub height: u32,
    pub offset_x: i32,
    pub offset_y: i32,
}

impl CaptureRequest {
    pub fn full_area() -> Self {
        Self::default()
    }

    pub fn is_full_area(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Pick the capture rectangle inside `area` and validate it.
///
/// Bounds are checked first so an explicit area hanging off the screen is
/// reported as such rather than as a generic invalid size.
pub fn select_capture_rect(
    area: Rect,
    request: &CaptureRequest,
    bits_per_pixel: u16,
) -> CaptureResult<Rect> {
    let clip = if request.is_full_area() {
        area
    } else {
        let width = i32::try_from(request.width).map_err(|_| CaptureError::BufferOverflow)?;
        let height = i32::try_from(request.height).map_err(|_| CaptureError::BufferOverflow)?;
        Rect::from_origin_size(request.offset_x, request.offset_y, width, height)
    };

    if !area.contains_rect(&clip) {
        return Err(CaptureError::OutOfBounds {
            area: clip,
            bounds: area,
        });
    }

    if clip.is_empty() || bits_per_pixel == 0 || bits_per_pixel % 8 != 0 {
        return Err(CaptureError::InvalidConfig(format!(
            "capture area {}x{} with {} bits per pixel",
            clip.width(),
            clip.height(),
            bits_per_pixel
        )));
    }

    Ok(clip)
}

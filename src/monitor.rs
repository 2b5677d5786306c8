//! Monitor topology: every display's logical rectangle and its
//! logical vs. physical resolution, snapshotted once per session.

use std::fmt;

use crate::backend::DisplayBackend;
use crate::error::{CaptureError, CaptureResult};
use crate::region::Rect;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: i32,
    pub height: i32,
}

impl Resolution {
    pub const fn new(width: i32, height: i32) -> Self {
        Self { width, height }
    }

    fn is_positive(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Per-axis DPI scale factor, `physical / logical`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scale {
    logical: Resolution,
    physical: Resolution,
}

impl Scale {
    pub fn new(logical: Resolution, physical: Resolution) -> CaptureResult<Self> {
        if !logical.is_positive() || !physical.is_positive() {
            return Err(CaptureError::InvalidConfig(format!(
                "display resolution must be positive (logical {logical}, physical {physical})"
            )));
        }
        Ok(Self { logical, physical })
    }

    pub const fn identity() -> Self {
        let unit = Resolution::new(1, 1);
        Self {
            logical: unit,
            physical: unit,
        }
    }

    pub fn logical(&self) -> Resolution {
        self.logical
    }

    pub fn physical(&self) -> Resolution {
        self.physical
    }

    /// `value * physical / logical` on the X axis, rounded toward negative
    /// infinity.
    pub fn x(&self, value: i32) -> i32 {
        scale_floor(value, self.physical.width, self.logical.width)
    }

    pub fn y(&self, value: i32) -> i32 {
        scale_floor(value, self.physical.height, self.logical.height)
    }

    /// Horizontal ratio of `x_axis` paired with the vertical ratio of
    /// `y_axis`.
    pub fn combine(x_axis: Scale, y_axis: Scale) -> Self {
        Self {
            logical: Resolution::new(x_axis.logical.width, y_axis.logical.height),
            physical: Resolution::new(x_axis.physical.width, y_axis.physical.height),
        }
    }
}

fn scale_floor(value: i32, numerator: i32, denominator: i32) -> i32 {
    let scaled = (i64::from(value) * i64::from(numerator)).div_euclid(i64::from(denominator));
    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

/// One physical display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Monitor {
    rect: Rect,
    scale: Scale,
}

impl Monitor {
    pub fn new(rect: Rect, logical: Resolution, physical: Resolution) -> CaptureResult<Self> {
        Ok(Self {
            rect,
            scale: Scale::new(logical, physical)?,
        })
    }

    /// Bounds in logical screen coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn logical(&self) -> Resolution {
        self.scale.logical
    }

    pub fn physical(&self) -> Resolution {
        self.scale.physical
    }

    pub fn scale(&self) -> Scale {
        self.scale
    }
}

/// Snapshot of all displays, in enumeration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MonitorTopology {
    monitors: Vec<Monitor>,
    combined: Rect,
}

impl MonitorTopology {
    pub fn from_monitors(monitors: Vec<Monitor>) -> CaptureResult<Self> {
        if monitors.is_empty() {
            return Err(CaptureError::NoMonitors);
        }
        let combined = monitors
            .iter()
            .fold(Rect::default(), |acc, monitor| acc.union(&monitor.rect));
        Ok(Self { monitors, combined })
    }

    pub fn monitors(&self) -> &[Monitor] {
        &self.monitors
    }

    pub fn get(&self, index: usize) -> Option<&Monitor> {
        self.monitors.get(index)
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }

    /// Bounding rectangle of every monitor, in logical coordinates.
    pub fn combined(&self) -> Rect {
        self.combined
    }

    pub fn monitor_at(&self, x: i32, y: i32) -> Option<usize> {
        self.monitors
            .iter()
            .position(|monitor| monitor.rect.contains_point(x, y))
    }

    /// Monitor containing the center of `rect`.
    pub fn monitor_for_rect(&self, rect: &Rect) -> Option<usize> {
        let center = rect.center();
        self.monitor_at(center.x, center.y)
    }

    pub fn monitor_at_x(&self, x: i32) -> Option<usize> {
        self.monitors
            .iter()
            .position(|monitor| monitor.rect.left <= x && x < monitor.rect.right)
    }

    pub fn monitor_at_y(&self, y: i32) -> Option<usize> {
        self.monitors
            .iter()
            .position(|monitor| monitor.rect.top <= y && y < monitor.rect.bottom)
    }

    /// Monitor indices to use for the X and Y axes of a point.
    ///
    /// Tries the direct point lookup first; when the point falls in a gap
    /// between monitors each axis is resolved on its own.
    pub fn locate(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        if let Some(index) = self.monitor_at(x, y) {
            return Some((index, index));
        }
        Some((self.monitor_at_x(x)?, self.monitor_at_y(y)?))
    }

    /// Scale for a window, chosen by the center of its on-screen rect.
    ///
    /// A center that falls between monitors takes the X ratio of the
    /// monitor spanning its column and the Y ratio of the one spanning its
    /// row.
    pub fn scale_for_rect(&self, rect: &Rect) -> Option<Scale> {
        let center = rect.center();
        let (x_index, y_index) = self.locate(center.x, center.y)?;
        Some(Scale::combine(
            self.get(x_index)?.scale,
            self.get(y_index)?.scale,
        ))
    }
}

/// Enumerate displays through `backend` and snapshot their geometry.
pub fn resolve_topology(backend: &dyn DisplayBackend) -> CaptureResult<MonitorTopology> {
    let monitors = backend.enumerate_monitors()?;
    let topology = MonitorTopology::from_monitors(monitors)?;
    for (index, monitor) in topology.monitors().iter().enumerate() {
        tracing::debug!(
            "Monitor {index} {}, logical res:({}), physical res:({})",
            monitor.rect(),
            monitor.logical(),
            monitor.physical()
        );
    }
    Ok(topology)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(rect: Rect, logical: (i32, i32), physical: (i32, i32)) -> Monitor {
        Monitor::new(
            rect,
            Resolution::new(logical.0, logical.1),
            Resolution::new(physical.0, physical.1),
        )
        .unwrap()
    }

    /// 4K panel at 150% on the left, 1080p at 100% on the right, lowered
    /// by 200 logical pixels.
    fn mixed_dpi() -> MonitorTopology {
        MonitorTopology::from_monitors(vec![
            monitor(Rect::new(0, 0, 2560, 1440), (2560, 1440), (3840, 2160)),
            monitor(Rect::new(2560, 200, 4480, 1280), (1920, 1080), (1920, 1080)),
        ])
        .unwrap()
    }

    #[test]
    fn scale_uses_integer_floor_per_axis() {
        let scale = Scale::new(Resolution::new(2560, 1440), Resolution::new(3840, 2160)).unwrap();
        assert_eq!(scale.x(0), 0);
        assert_eq!(scale.x(1), 1);
        assert_eq!(scale.x(3), 4);
        assert_eq!(scale.x(2559), 2559 * 3840 / 2560);
        assert_eq!(scale.y(1439), 1439 * 2160 / 1440);
        assert_eq!(scale.x(-1), -2);
    }

    #[test]
    fn scale_matches_formula_for_every_in_bounds_coordinate() {
        let scale = Scale::new(Resolution::new(1536, 864), Resolution::new(1920, 1080)).unwrap();
        for x in 0..1536 {
            assert_eq!(scale.x(x), x * 1920 / 1536);
        }
        for y in 0..864 {
            assert_eq!(scale.y(y), y * 1080 / 864);
        }
    }

    #[test]
    fn non_positive_resolution_is_rejected() {
        let err = Monitor::new(
            Rect::new(0, 0, 1920, 1080),
            Resolution::new(0, 1080),
            Resolution::new(1920, 1080),
        )
        .unwrap_err();
        assert!(matches!(err, CaptureError::InvalidConfig(_)));
    }

    #[test]
    fn empty_topology_is_an_error() {
        assert!(matches!(
            MonitorTopology::from_monitors(Vec::new()),
            Err(CaptureError::NoMonitors)
        ));
    }

    #[test]
    fn combined_rect_is_the_union_of_monitors() {
        assert_eq!(mixed_dpi().combined(), Rect::new(0, 0, 4480, 1440));
    }

    #[test]
    fn topology_has_no_monitor_cap() {
        let monitors = (0..6)
            .map(|i| monitor(Rect::new(i * 1920, 0, (i + 1) * 1920, 1080), (1920, 1080), (1920, 1080)))
            .collect();
        let topology = MonitorTopology::from_monitors(monitors).unwrap();
        assert_eq!(topology.len(), 6);
        assert_eq!(topology.monitor_at(5 * 1920 + 10, 10), Some(5));
    }

    #[test]
    fn point_lookup_respects_exclusive_edges() {
        let topology = mixed_dpi();
        assert_eq!(topology.monitor_at(2559, 0), Some(0));
        assert_eq!(topology.monitor_at(2560, 200), Some(1));
        assert_eq!(topology.monitor_at(2560, 100), None);
        assert_eq!(topology.monitor_at(4480, 300), None);
    }

    #[test]
    fn rect_lookup_uses_the_center() {
        let topology = mixed_dpi();
        assert_eq!(topology.monitor_for_rect(&Rect::new(2000, 100, 3400, 700)), Some(1));
        assert_eq!(topology.monitor_for_rect(&Rect::new(100, 100, 900, 700)), Some(0));
    }

    #[test]
    fn locate_falls_back_to_independent_axes() {
        let topology = mixed_dpi();
        // Above the right monitor: no monitor contains the point directly.
        assert_eq!(topology.monitor_at(3000, 100), None);
        assert_eq!(topology.locate(3000, 100), Some((1, 0)));
        assert_eq!(topology.locate(10, 10), Some((0, 0)));
        assert_eq!(topology.locate(-5, 10), None);
    }

    #[test]
    fn rect_centered_between_monitors_mixes_axis_scales() {
        let topology = mixed_dpi();
        let straddling = Rect::new(2500, 0, 3500, 200);
        assert_eq!(topology.monitor_for_rect(&straddling), None);

        let scale = topology.scale_for_rect(&straddling).unwrap();
        assert_eq!(scale.x(1000), 1000);
        assert_eq!(scale.y(200), 300);

        assert_eq!(topology.scale_for_rect(&Rect::new(-500, -500, -100, -100)), None);
    }
}

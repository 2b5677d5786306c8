//! Logical to physical coordinate conversion.

use crate::error::{CaptureError, CaptureResult};
use crate::monitor::{MonitorTopology, Scale};
use crate::region::Rect;

/// Convert `rect` from logical to physical pixels.
///
/// Each defining corner is scaled by the monitor that owns it. The
/// bottom-right corner is located at `(right - 1, bottom - 1)` since those
/// edges are exclusive. A rectangle straddling monitors of different DPI is
/// therefore mapped approximately, one scale per corner.
pub fn logical_to_physical(rect: Rect, topology: &MonitorTopology) -> CaptureResult<Rect> {
    let (x_index, y_index) = locate(topology, rect.left, rect.top)?;
    let left = scale_x(topology, x_index, rect.left);
    let top = scale_y(topology, y_index, rect.top);

    let (x_index, y_index) = locate(topology, rect.right - 1, rect.bottom - 1)?;
    let right = scale_x(topology, x_index, rect.right);
    let bottom = scale_y(topology, y_index, rect.bottom);

    Ok(Rect::new(left, top, right, bottom))
}

/// Scale a window rectangle by the one ratio picked for the whole window.
pub fn window_to_physical(rect: Rect, scale: Scale) -> Rect {
    Rect::new(
        scale.x(rect.left),
        scale.y(rect.top),
        scale.x(rect.right),
        scale.y(rect.bottom),
    )
}

fn locate(topology: &MonitorTopology, x: i32, y: i32) -> CaptureResult<(usize, usize)> {
    topology
        .locate(x, y)
        .ok_or(CaptureError::UnmappedPoint { x, y })
}

fn scale_x(topology: &MonitorTopology, index: usize, value: i32) -> i32 {
    topology
        .get(index)
        .map_or(value, |monitor| monitor.scale().x(value))
}

fn scale_y(topology: &MonitorTopology, index: usize, value: i32) -> i32 {
    topology
        .get(index)
        .map_or(value, |monitor| monitor.scale().y(value))
}

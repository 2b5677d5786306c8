//! Turns a [`CaptureTarget`] into the physical rectangle grabbed every tick.

use crate::backend::DisplayBackend;
use crate::error::{CaptureError, CaptureResult};
use crate::mapping::{logical_to_physical, window_to_physical};
use crate::monitor::{MonitorTopology, Scale};
use crate::region::{CaptureRequest, Rect, select_capture_rect};
use crate::window::{CaptureTarget, TargetHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub handle: TargetHandle,
    /// Everything that could be captured, in physical pixels.
    pub area: Rect,
    /// The validated capture rectangle inside `area`.
    pub capture_rect: Rect,
    /// Scale of the window's monitor at setup. `None` for the desktop.
    pub window_scale: Option<Scale>,
}

/// Find the OS object behind `target`.
pub fn find_target(backend: &dyn DisplayBackend, target: &CaptureTarget) -> CaptureResult<TargetHandle> {
    match target {
        CaptureTarget::Desktop => Ok(TargetHandle::Desktop),
        CaptureTarget::Window { title } => backend
            .find_window(title)?
            .map(TargetHandle::Window)
            .ok_or_else(|| CaptureError::WindowNotFound(title.clone())),
    }
}

/// Compute and validate the capture rectangle for an already located
/// target.
pub fn resolve_target(
    backend: &dyn DisplayBackend,
    topology: &MonitorTopology,
    handle: TargetHandle,
    request: &CaptureRequest,
    bits_per_pixel: u16,
) -> CaptureResult<ResolvedTarget> {
    let (area, window_scale) = match handle {
        TargetHandle::Desktop => {
            let logical = backend.virtual_screen()?;
            let physical = logical_to_physical(logical, topology)?;
            tracing::debug!("Desktop {logical} converted to physical {physical}");
            (physical, None)
        }
        TargetHandle::Window(window) => {
            let window_rect = backend.window_rect(window)?;
            let scale = match topology.scale_for_rect(&window_rect) {
                Some(scale) => scale,
                None => {
                    tracing::debug!(
                        "Window {window_rect} is on no monitor, using the first monitor's scale"
                    );
                    topology.get(0).ok_or(CaptureError::NoMonitors)?.scale()
                }
            };
            let client = backend.client_rect(window)?;
            let physical = window_to_physical(client, scale);
            tracing::debug!("Window client {client} converted to physical {physical}");
            (physical, Some(scale))
        }
    };

    let capture_rect = select_capture_rect(area, request, bits_per_pixel)?;

    match handle {
        TargetHandle::Desktop => tracing::info!(
            "Capturing whole desktop as {}x{}x{} at ({},{})",
            capture_rect.width(),
            capture_rect.height(),
            bits_per_pixel,
            capture_rect.left,
            capture_rect.top
        ),
        TargetHandle::Window(window) => tracing::info!(
            "Found window {}, capturing {}x{}x{} at ({},{})",
            window.stable_id(),
            capture_rect.width(),
            capture_rect.height(),
            bits_per_pixel,
            capture_rect.left,
            capture_rect.top
        ),
    }

    Ok(ResolvedTarget {
        handle,
        area,
        capture_rect,
        window_scale,
    })
}

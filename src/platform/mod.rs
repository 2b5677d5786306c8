use std::sync::Arc;

use crate::backend::DisplayBackend;
#[cfg(not(target_os = "windows"))]
use crate::backend::{CaptureSource, RegionOutline};
#[cfg(not(target_os = "windows"))]
use crate::error::CaptureError;
use crate::error::CaptureResult;
#[cfg(not(target_os = "windows"))]
use crate::monitor::Monitor;
#[cfg(not(target_os = "windows"))]
use crate::region::Rect;
#[cfg(not(target_os = "windows"))]
use crate::window::{TargetHandle, WindowId};

#[cfg(test)]
pub(crate) mod fake;
#[cfg(target_os = "windows")]
pub(crate) mod windows;

#[cfg(not(target_os = "windows"))]
struct UnsupportedBackend;

#[cfg(not(target_os = "windows"))]
impl DisplayBackend for UnsupportedBackend {
    fn enumerate_monitors(&self) -> CaptureResult<Vec<Monitor>> {
        Err(CaptureError::Unsupported)
    }

    fn virtual_screen(&self) -> CaptureResult<Rect> {
        Err(CaptureError::Unsupported)
    }

    fn find_window(&self, _title: &str) -> CaptureResult<Option<WindowId>> {
        Err(CaptureError::Unsupported)
    }

    fn window_rect(&self, _window: WindowId) -> CaptureResult<Rect> {
        Err(CaptureError::Unsupported)
    }

    fn client_rect(&self, _window: WindowId) -> CaptureResult<Rect> {
        Err(CaptureError::Unsupported)
    }

    fn open_source(&self, _target: TargetHandle) -> CaptureResult<Box<dyn CaptureSource>> {
        Err(CaptureError::Unsupported)
    }

    fn create_outline(&self, _area: Rect) -> CaptureResult<Box<dyn RegionOutline>> {
        Err(CaptureError::Unsupported)
    }
}

#[cfg(target_os = "windows")]
pub(crate) fn build_backend() -> CaptureResult<Arc<dyn DisplayBackend>> {
    Ok(Arc::new(windows::WindowsBackend::new()))
}

#[cfg(not(target_os = "windows"))]
pub(crate) fn build_backend() -> CaptureResult<Arc<dyn DisplayBackend>> {
    Ok(Arc::new(UnsupportedBackend))
}

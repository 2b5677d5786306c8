pub(crate) mod gdi;
pub(crate) mod monitor;
pub(crate) mod outline;

use std::ffi::c_void;

use anyhow::Context;
use windows::Win32::Foundation::{HWND, RECT};
use windows::Win32::UI::WindowsAndMessaging::{
    FindWindowW, GetClientRect, GetSystemMetrics, GetWindowRect, SM_CXVIRTUALSCREEN,
    SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN, SM_YVIRTUALSCREEN,
};
use windows::core::PCWSTR;

use crate::backend::{CaptureSource, DisplayBackend, RegionOutline};
use crate::error::{CaptureError, CaptureResult};
use crate::monitor::Monitor;
use crate::region::Rect;
use crate::window::{TargetHandle, WindowId};

fn to_hwnd(window: WindowId) -> HWND {
    HWND(window.raw_handle() as *mut c_void)
}

fn to_rect(rect: RECT) -> Rect {
    Rect::new(rect.left, rect.top, rect.right, rect.bottom)
}

/// GDI screen grabbing.
pub(crate) struct WindowsBackend;

impl WindowsBackend {
    pub(crate) fn new() -> Self {
        Self
    }
}

impl DisplayBackend for WindowsBackend {
    fn enumerate_monitors(&self) -> CaptureResult<Vec<Monitor>> {
        monitor::enumerate_monitors()
    }

    fn virtual_screen(&self) -> CaptureResult<Rect> {
        let (x, y, width, height) = unsafe {
            (
                GetSystemMetrics(SM_XVIRTUALSCREEN),
                GetSystemMetrics(SM_YVIRTUALSCREEN),
                GetSystemMetrics(SM_CXVIRTUALSCREEN),
                GetSystemMetrics(SM_CYVIRTUALSCREEN),
            )
        };
        Ok(Rect::from_origin_size(x, y, width, height))
    }

    fn find_window(&self, title: &str) -> CaptureResult<Option<WindowId>> {
        let wide: Vec<u16> = title.encode_utf16().chain(std::iter::once(0)).collect();
        // FindWindowW reports "not found" as an error.
        let found = unsafe { FindWindowW(PCWSTR::null(), PCWSTR(wide.as_ptr())) };
        Ok(found
            .ok()
            .filter(|hwnd| !hwnd.0.is_null())
            .map(|hwnd| WindowId::from_raw_handle(hwnd.0 as isize)))
    }

    fn window_rect(&self, window: WindowId) -> CaptureResult<Rect> {
        let mut rect = RECT::default();
        unsafe { GetWindowRect(to_hwnd(window), &mut rect) }
            .context("Couldn't get window rectangle")
            .map_err(CaptureError::Platform)?;
        Ok(to_rect(rect))
    }

    fn client_rect(&self, window: WindowId) -> CaptureResult<Rect> {
        let mut rect = RECT::default();
        unsafe { GetClientRect(to_hwnd(window), &mut rect) }
            .context("Couldn't get window client rectangle")
            .map_err(CaptureError::Platform)?;
        Ok(to_rect(rect))
    }

    fn open_source(&self, target: TargetHandle) -> CaptureResult<Box<dyn CaptureSource>> {
        Ok(Box::new(gdi::GdiSource::open(target)?))
    }

    fn create_outline(&self, area: Rect) -> CaptureResult<Box<dyn RegionOutline>> {
        Ok(Box::new(outline::OutlineWindow::create(area)?))
    }
}

use std::mem::size_of;
use std::ptr::null_mut;

use windows::Win32::Foundation::{BOOL, LPARAM, RECT};
use windows::Win32::Graphics::Gdi::{
    CreateDCW, DESKTOPHORZRES, DESKTOPVERTRES, DeleteDC, EnumDisplayMonitors,
    GET_DEVICE_CAPS_INDEX, GetDeviceCaps, GetMonitorInfoW, HDC, HMONITOR, HORZRES, MONITORINFO,
    MONITORINFOEXW, VERTRES,
};
use windows::core::PCWSTR;

use crate::error::{CaptureError, CaptureResult};
use crate::monitor::{Monitor, Resolution};
use crate::region::Rect;

/// Information context for one display device, deleted on drop.
struct DeviceContext(HDC);

impl DeviceContext {
    fn for_device(device: &[u16]) -> CaptureResult<Self> {
        let hdc = unsafe { CreateDCW(PCWSTR::null(), PCWSTR(device.as_ptr()), PCWSTR::null(), None) };
        if hdc.0.is_null() {
            let name = String::from_utf16_lossy(device);
            return Err(CaptureError::resource(
                "monitor device context",
                anyhow::anyhow!("CreateDCW failed for {}", name.trim_end_matches('\0')),
            ));
        }
        Ok(Self(hdc))
    }

    fn caps(&self, index: GET_DEVICE_CAPS_INDEX) -> i32 {
        unsafe { GetDeviceCaps(self.0, index) }
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        unsafe {
            let _ = DeleteDC(self.0);
        }
    }
}

unsafe extern "system" fn collect_monitor(
    monitor: HMONITOR,
    _hdc: HDC,
    _rect: *mut RECT,
    context: LPARAM,
) -> BOOL {
    // SAFETY: `context` is the `Vec` owned by `enumerate_monitors`, which
    // outlives the synchronous enumeration.
    let handles = unsafe { &mut *(context.0 as *mut Vec<HMONITOR>) };
    handles.push(monitor);
    true.into()
}

/// Every attached display, in enumeration order.
pub(crate) fn enumerate_monitors() -> CaptureResult<Vec<Monitor>> {
    let mut handles: Vec<HMONITOR> = Vec::new();
    let ok = unsafe {
        EnumDisplayMonitors(
            HDC(null_mut()),
            None,
            Some(collect_monitor),
            LPARAM(&mut handles as *mut Vec<HMONITOR> as isize),
        )
    };
    if !ok.as_bool() {
        return Err(CaptureError::Platform(anyhow::anyhow!(
            "EnumDisplayMonitors failed"
        )));
    }

    handles.into_iter().map(describe_monitor).collect()
}

fn describe_monitor(handle: HMONITOR) -> CaptureResult<Monitor> {
    let mut info = MONITORINFOEXW {
        monitorInfo: MONITORINFO {
            cbSize: size_of::<MONITORINFOEXW>() as u32,
            ..Default::default()
        },
        ..Default::default()
    };

    if !unsafe { GetMonitorInfoW(handle, (&mut info as *mut MONITORINFOEXW).cast()) }.as_bool() {
        return Err(CaptureError::Platform(anyhow::anyhow!(
            "GetMonitorInfoW failed"
        )));
    }

    let dc = DeviceContext::for_device(&info.szDevice)?;
    let logical = Resolution::new(dc.caps(HORZRES), dc.caps(VERTRES));
    let physical = Resolution::new(dc.caps(DESKTOPHORZRES), dc.caps(DESKTOPVERTRES));

    let rect = info.monitorInfo.rcMonitor;
    Monitor::new(
        Rect::new(rect.left, rect.top, rect.right, rect.bottom),
        logical,
        physical,
    )
}

use std::ptr::null_mut;
use std::sync::Once;

use anyhow::Context;
use windows::Win32::Foundation::{BOOL, HWND, LPARAM, LRESULT, RECT, WPARAM};
use windows::Win32::Graphics::Gdi::{
    BLACK_BRUSH, BeginPaint, CombineRgn, CreateRectRgn, DeleteObject, EndPaint, FrameRect,
    GetStockObject, HBRUSH, PAINTSTRUCT, RGN_DIFF, SetWindowRgn, WHITE_BRUSH,
};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::{
    AdjustWindowRectEx, CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW,
    GetClientRect, MSG, PM_REMOVE, PeekMessageW, RegisterClassW, SW_SHOW, ShowWindow, WM_PAINT,
    WNDCLASSW, WS_EX_TOOLWINDOW, WS_EX_TOPMOST, WS_EX_TRANSPARENT, WS_POPUP, WS_VISIBLE,
};
use windows::core::{PCWSTR, w};

use crate::backend::RegionOutline;
use crate::error::{CaptureError, CaptureResult};
use crate::region::Rect;

const BORDER: i32 = 3;
const CLASS_NAME: PCWSTR = w!("SnowGrabRegionOutline");

static REGISTER_CLASS: Once = Once::new();

fn register_class() {
    REGISTER_CLASS.call_once(|| {
        let Ok(instance) = (unsafe { GetModuleHandleW(None) }) else {
            return;
        };
        let class = WNDCLASSW {
            lpfnWndProc: Some(outline_wnd_proc),
            hInstance: instance.into(),
            lpszClassName: CLASS_NAME,
            ..Default::default()
        };
        // A failed registration surfaces as a CreateWindowExW error.
        unsafe {
            let _ = RegisterClassW(&class);
        }
    });
}

unsafe extern "system" fn outline_wnd_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    if msg != WM_PAINT {
        return unsafe { DefWindowProcW(hwnd, msg, wparam, lparam) };
    }

    let mut paint = PAINTSTRUCT::default();
    unsafe {
        let hdc = BeginPaint(hwnd, &mut paint);
        let mut rect = RECT::default();
        let _ = GetClientRect(hwnd, &mut rect);

        let black = HBRUSH(GetStockObject(BLACK_BRUSH).0);
        let white = HBRUSH(GetStockObject(WHITE_BRUSH).0);
        for brush in [black, white, black] {
            FrameRect(hdc, &rect, brush);
            rect.left += 1;
            rect.top += 1;
            rect.right -= 1;
            rect.bottom -= 1;
        }

        let _ = EndPaint(hwnd, &paint);
    }
    LRESULT(0)
}

/// Click-through, top-most frame drawn just outside the capture area.
pub(crate) struct OutlineWindow {
    hwnd: HWND,
}

// SAFETY: the window is pumped and destroyed by the session that created
// it. Sessions are not shared between threads.
unsafe impl Send for OutlineWindow {}

impl OutlineWindow {
    pub(crate) fn create(area: Rect) -> CaptureResult<Self> {
        register_class();

        let style = WS_POPUP | WS_VISIBLE;
        let ex_style = WS_EX_TOOLWINDOW | WS_EX_TOPMOST | WS_EX_TRANSPARENT;
        let mut rect = RECT {
            left: area.left - BORDER,
            top: area.top - BORDER,
            right: area.right + BORDER,
            bottom: area.bottom + BORDER,
        };
        unsafe { AdjustWindowRectEx(&mut rect, style, BOOL::from(false), ex_style) }
            .context("AdjustWindowRectEx failed")
            .map_err(|err| CaptureError::resource("region outline window", err))?;

        let hwnd = unsafe {
            CreateWindowExW(
                ex_style,
                CLASS_NAME,
                PCWSTR::null(),
                style,
                rect.left,
                rect.top,
                rect.right - rect.left,
                rect.bottom - rect.top,
                None,
                None,
                None,
                None,
            )
        }
        .context("Could not create region display window")
        .map_err(|err| CaptureError::resource("region outline window", err))?;
        let window = Self { hwnd };

        let mut client = RECT::default();
        unsafe { GetClientRect(hwnd, &mut client) }
            .context("GetClientRect failed")
            .map_err(|err| CaptureError::resource("region outline window", err))?;
        let width = client.right - client.left;
        let height = client.bottom - client.top;

        unsafe {
            let region = CreateRectRgn(0, 0, width, height);
            let interior = CreateRectRgn(BORDER, BORDER, width - BORDER, height - BORDER);
            let _ = CombineRgn(region, region, interior, RGN_DIFF);
            let _ = DeleteObject(interior);
            // On success the window owns the region.
            if SetWindowRgn(hwnd, region, BOOL::from(false)) == 0 {
                let _ = DeleteObject(region);
                return Err(CaptureError::resource(
                    "region outline window",
                    anyhow::anyhow!("Could not set window region"),
                ));
            }
            let _ = ShowWindow(hwnd, SW_SHOW);
        }

        Ok(window)
    }
}

impl RegionOutline for OutlineWindow {
    fn pump(&mut self) {
        let mut msg = MSG::default();
        while unsafe { PeekMessageW(&mut msg, self.hwnd, 0, 0, PM_REMOVE) }.as_bool() {
            unsafe {
                DispatchMessageW(&msg);
            }
        }
    }
}

impl Drop for OutlineWindow {
    fn drop(&mut self) {
        if !self.hwnd.0.is_null() {
            unsafe {
                let _ = DestroyWindow(self.hwnd);
            }
            self.hwnd = HWND(null_mut());
        }
    }
}

use std::ffi::c_void;
use std::mem::size_of;
use std::ptr::null_mut;

use anyhow::Context;
use windows::Win32::Foundation::{HANDLE, HWND};
use windows::Win32::Graphics::Gdi::{
    BI_RGB, BITMAPINFO, BITMAPINFOHEADER, BITSPIXEL, BitBlt, CAPTUREBLT, CreateCompatibleDC,
    CreateDIBSection, DESKTOPHORZRES, DESKTOPVERTRES, DIB_RGB_COLORS, DeleteDC, DeleteObject,
    GET_DEVICE_CAPS_INDEX, GdiFlush, GetDC, GetDIBColorTable, GetDeviceCaps, HBITMAP, HDC,
    HGDIOBJ, HORZRES, RGBQUAD, ROP_CODE, ReleaseDC, SRCCOPY, SelectObject, VERTRES,
};
use windows::Win32::UI::WindowsAndMessaging::{
    CURSOR_SHOWING, CURSORINFO, CopyIcon, DestroyIcon, DrawIcon, GetCursorInfo, GetIconInfo,
    HCURSOR, HICON, ICONINFO, IDC_ARROW, LoadCursorW,
};

use crate::backend::{CaptureSource, PointerState};
use crate::bitmap::BitmapLayout;
use crate::error::{CaptureError, CaptureResult};
use crate::monitor::{Resolution, Scale};
use crate::region::{Point, Rect};
use crate::window::TargetHandle;

fn overlay_error(err: anyhow::Error) -> CaptureError {
    CaptureError::Overlay(format!("{err:#}"))
}

/// A private copy of the current cursor and the bitmaps `GetIconInfo`
/// hands back with it.
struct CursorIcon {
    icon: HICON,
    mask: HBITMAP,
    color: HBITMAP,
}

impl CursorIcon {
    /// Copy `cursor`, falling back to the standard arrow when the current
    /// cursor can't be copied.
    fn copy(cursor: HCURSOR) -> CaptureResult<Self> {
        let icon = unsafe { CopyIcon(HICON(cursor.0)) }
            .or_else(|_| {
                let arrow = unsafe { LoadCursorW(None, IDC_ARROW) }?;
                unsafe { CopyIcon(HICON(arrow.0)) }
            })
            .context("Could not copy cursor")
            .map_err(overlay_error)?;

        Ok(Self {
            icon,
            mask: HBITMAP(null_mut()),
            color: HBITMAP(null_mut()),
        })
    }

    fn hotspot(&mut self) -> CaptureResult<Point> {
        let mut info = ICONINFO::default();
        unsafe { GetIconInfo(self.icon, &mut info) }
            .context("Could not get icon info")
            .map_err(overlay_error)?;
        self.mask = info.hbmMask;
        self.color = info.hbmColor;
        Ok(Point::new(info.xHotspot as i32, info.yHotspot as i32))
    }
}

impl Drop for CursorIcon {
    fn drop(&mut self) {
        unsafe {
            if !self.mask.0.is_null() {
                let _ = DeleteObject(self.mask);
            }
            if !self.color.0.is_null() {
                let _ = DeleteObject(self.color);
            }
            let _ = DestroyIcon(self.icon);
        }
    }
}

/// Device context on the desktop or a window, a compatible memory DC and
/// the DIB section selected into it.
pub(crate) struct GdiSource {
    hwnd: HWND,
    source_dc: HDC,
    mem_dc: HDC,
    bitmap: Option<HBITMAP>,
    old_bitmap: Option<HGDIOBJ>,
    bits: *const u8,
    frame_size: usize,
    bits_per_pixel: u16,
    cursor: Option<CursorIcon>,
}

// SAFETY: the GDI handles are only touched through `&mut self` by the
// session that owns this source, one thread at a time.
unsafe impl Send for GdiSource {}

impl GdiSource {
    pub(crate) fn open(target: TargetHandle) -> CaptureResult<Self> {
        let hwnd = match target {
            TargetHandle::Desktop => HWND(null_mut()),
            TargetHandle::Window(window) => HWND(window.raw_handle() as *mut c_void),
        };

        let source_dc = unsafe { GetDC(hwnd) };
        if source_dc.0.is_null() {
            return Err(CaptureError::resource(
                "window device context",
                anyhow::anyhow!("GetDC returned null"),
            ));
        }

        // From here on `Drop` releases whatever has been acquired.
        let mut source = Self {
            hwnd,
            source_dc,
            mem_dc: HDC(null_mut()),
            bitmap: None,
            old_bitmap: None,
            bits: std::ptr::null(),
            frame_size: 0,
            bits_per_pixel: 0,
            cursor: None,
        };

        let mem_dc = unsafe { CreateCompatibleDC(source_dc) };
        if mem_dc.0.is_null() {
            return Err(CaptureError::resource(
                "memory device context",
                anyhow::anyhow!("CreateCompatibleDC failed"),
            ));
        }
        source.mem_dc = mem_dc;

        let bits_per_pixel = source.caps(BITSPIXEL);
        source.bits_per_pixel = u16::try_from(bits_per_pixel).map_err(|_| {
            CaptureError::InvalidConfig(format!("device reports {bits_per_pixel} bits per pixel"))
        })?;
        Ok(source)
    }

    fn caps(&self, index: GET_DEVICE_CAPS_INDEX) -> i32 {
        unsafe { GetDeviceCaps(self.source_dc, index) }
    }

    fn release_bitmap(&mut self) {
        if let Some(old_bitmap) = self.old_bitmap.take() {
            unsafe {
                let _ = SelectObject(self.mem_dc, old_bitmap);
            }
        }
        if let Some(bitmap) = self.bitmap.take() {
            unsafe {
                let _ = DeleteObject(bitmap);
            }
        }
        self.bits = std::ptr::null();
        self.frame_size = 0;
    }
}

impl CaptureSource for GdiSource {
    fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    fn device_scale(&self) -> Scale {
        Scale::new(
            Resolution::new(self.caps(HORZRES), self.caps(VERTRES)),
            Resolution::new(self.caps(DESKTOPHORZRES), self.caps(DESKTOPVERTRES)),
        )
        .unwrap_or_else(|_| Scale::identity())
    }

    fn allocate_surface(&mut self, layout: &BitmapLayout) -> CaptureResult<()> {
        self.release_bitmap();

        let mut info = BITMAPINFO::default();
        info.bmiHeader.biSize = size_of::<BITMAPINFOHEADER>() as u32;
        info.bmiHeader.biWidth = layout.width() as i32;
        info.bmiHeader.biHeight = -(layout.height() as i32);
        info.bmiHeader.biPlanes = 1;
        info.bmiHeader.biBitCount = layout.bits_per_pixel();
        info.bmiHeader.biCompression = BI_RGB.0;

        let mut bits: *mut c_void = null_mut();
        let bitmap = unsafe {
            CreateDIBSection(
                self.mem_dc,
                &info,
                DIB_RGB_COLORS,
                &mut bits,
                HANDLE::default(),
                0,
            )
        }
        .context("CreateDIBSection failed")
        .map_err(|err| CaptureError::resource("DIB section", err))?;

        let selected = unsafe { SelectObject(self.mem_dc, bitmap) };
        if selected.0.is_null() {
            unsafe {
                let _ = DeleteObject(bitmap);
            }
            return Err(CaptureError::resource(
                "DIB section",
                anyhow::anyhow!("SelectObject failed for capture bitmap"),
            ));
        }

        self.bitmap = Some(bitmap);
        self.old_bitmap = Some(selected);
        self.bits = bits.cast_const().cast();
        self.frame_size = layout.frame_size();
        Ok(())
    }

    fn blit(&mut self, rect: Rect) -> CaptureResult<()> {
        unsafe {
            BitBlt(
                self.mem_dc,
                0,
                0,
                rect.width(),
                rect.height(),
                self.source_dc,
                rect.left,
                rect.top,
                ROP_CODE(SRCCOPY.0 | CAPTUREBLT.0),
            )
        }
        .context("BitBlt failed")
        .map_err(CaptureError::Capture)?;
        unsafe {
            let _ = GdiFlush();
        }
        Ok(())
    }

    fn pixels(&self) -> CaptureResult<&[u8]> {
        if self.bits.is_null() {
            return Err(CaptureError::Platform(anyhow::anyhow!(
                "no capture bitmap selected"
            )));
        }
        // SAFETY: the DIB section stays selected and alive until
        // `release_bitmap`, which needs `&mut self`.
        Ok(unsafe { std::slice::from_raw_parts(self.bits, self.frame_size) })
    }

    fn read_palette(&self, out: &mut [u8]) -> CaptureResult<()> {
        let mut table = vec![RGBQUAD::default(); out.len() / 4];
        let read = unsafe { GetDIBColorTable(self.mem_dc, 0, &mut table) };
        if (read as usize) < table.len() {
            return Err(CaptureError::Platform(anyhow::anyhow!(
                "GetDIBColorTable returned {read} of {} entries",
                table.len()
            )));
        }
        for (quad, entry) in out.chunks_exact_mut(4).zip(&table) {
            quad.copy_from_slice(&[
                entry.rgbBlue,
                entry.rgbGreen,
                entry.rgbRed,
                entry.rgbReserved,
            ]);
        }
        Ok(())
    }

    fn pointer(&mut self) -> CaptureResult<PointerState> {
        self.cursor = None;

        let mut info = CURSORINFO {
            cbSize: size_of::<CURSORINFO>() as u32,
            ..Default::default()
        };
        unsafe { GetCursorInfo(&mut info) }
            .context("GetCursorInfo failed")
            .map_err(overlay_error)?;

        let position = Point::new(info.ptScreenPos.x, info.ptScreenPos.y);
        if info.flags != CURSOR_SHOWING {
            return Ok(PointerState {
                visible: false,
                position,
                hotspot: Point::default(),
            });
        }

        let mut icon = CursorIcon::copy(info.hCursor)?;
        let hotspot = icon.hotspot()?;
        self.cursor = Some(icon);
        Ok(PointerState {
            visible: true,
            position,
            hotspot,
        })
    }

    fn draw_pointer(&mut self, at: Point) -> CaptureResult<()> {
        let Some(cursor) = self.cursor.as_ref() else {
            return Err(CaptureError::Overlay("no cursor sampled".into()));
        };
        unsafe { DrawIcon(self.mem_dc, at.x, at.y, cursor.icon) }
            .context("Couldn't draw icon")
            .map_err(overlay_error)
    }
}

impl Drop for GdiSource {
    fn drop(&mut self) {
        self.cursor = None;
        self.release_bitmap();

        if !self.mem_dc.0.is_null() {
            unsafe {
                let _ = DeleteDC(self.mem_dc);
            }
        }
        if !self.source_dc.0.is_null() {
            unsafe {
                let _ = ReleaseDC(self.hwnd, self.source_dc);
            }
        }
    }
}

use std::sync::Arc;

use crate::bitmap::BitmapLayout;
use crate::error::CaptureResult;
use crate::monitor::{Monitor, Scale};
use crate::region::{Point, Rect};
use crate::window::{TargetHandle, WindowId};

/// Cursor state sampled by [`CaptureSource::pointer`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PointerState {
    pub visible: bool,
    /// Cursor position in logical screen coordinates.
    pub position: Point,
    /// Hotspot offset inside the cursor image.
    pub hotspot: Point,
}

/// A device context opened on the capture target, plus the persistent
/// pixel surface frames are copied into.
///
/// Dropping the source releases the surface first, then the device
/// contexts, in reverse order of acquisition.
pub trait CaptureSource: Send {
    /// Color depth of the source device.
    fn bits_per_pixel(&self) -> u16;

    /// DPI scale of the device the source was opened on.
    fn device_scale(&self) -> Scale;

    /// Create the top-down, uncompressed surface described by `layout` and
    /// make it the blit destination.
    fn allocate_surface(&mut self, layout: &BitmapLayout) -> CaptureResult<()>;

    /// Block-copy `rect` (physical pixels, source coordinates) into the
    /// surface origin.
    fn blit(&mut self, rect: Rect) -> CaptureResult<()>;

    /// Surface pixel rows, top to bottom, `layout.frame_size()` bytes.
    fn pixels(&self) -> CaptureResult<&[u8]>;

    /// Fill `out` with the surface color table as BGRA0 quads.
    fn read_palette(&self, out: &mut [u8]) -> CaptureResult<()>;

    /// Sample the system cursor. The cursor image is kept until the next
    /// call so [`draw_pointer`](Self::draw_pointer) can composite it.
    fn pointer(&mut self) -> CaptureResult<PointerState>;

    /// Draw the last sampled cursor with its top-left corner at `at`
    /// (surface pixels).
    fn draw_pointer(&mut self, at: Point) -> CaptureResult<()>;
}

/// On-screen outline drawn around the capture area. Destroyed on drop.
pub trait RegionOutline: Send {
    /// Drain pending window messages so the outline stays responsive.
    fn pump(&mut self);
}

pub trait DisplayBackend: Send + Sync {
    fn enumerate_monitors(&self) -> CaptureResult<Vec<Monitor>>;

    /// Virtual screen bounds in logical coordinates.
    fn virtual_screen(&self) -> CaptureResult<Rect>;

    fn find_window(&self, title: &str) -> CaptureResult<Option<WindowId>>;

    /// Window bounds in logical screen coordinates.
    fn window_rect(&self, window: WindowId) -> CaptureResult<Rect>;

    /// Client area in logical window coordinates.
    fn client_rect(&self, window: WindowId) -> CaptureResult<Rect>;

    fn open_source(&self, target: TargetHandle) -> CaptureResult<Box<dyn CaptureSource>>;

    fn create_outline(&self, area: Rect) -> CaptureResult<Box<dyn RegionOutline>>;
}

pub fn default_backend() -> CaptureResult<Arc<dyn DisplayBackend>> {
    crate::platform::build_backend()
}

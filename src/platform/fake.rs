//! In-memory backend for tests. Records every acquisition and release so
//! tests can assert nothing is leaked and that teardown runs in reverse
//! order.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::backend::{CaptureSource, DisplayBackend, PointerState, RegionOutline};
use crate::bitmap::BitmapLayout;
use crate::error::{CaptureError, CaptureResult};
use crate::monitor::{Monitor, Resolution, Scale};
use crate::pacer::Clock;
use crate::region::{Point, Rect};
use crate::window::{TargetHandle, WindowId};

#[derive(Clone, Debug)]
pub(crate) struct FakeWindow {
    pub title: String,
    pub id: WindowId,
    pub window_rect: Rect,
    pub client_rect: Rect,
}

#[derive(Debug, Default)]
pub(crate) struct Probe {
    events: Mutex<Vec<String>>,
    live: AtomicUsize,
    pub blits: AtomicUsize,
    pub pumps: AtomicUsize,
    pub pointer_queries: AtomicUsize,
    pub fail_blit: AtomicBool,
    pub fail_pointer: AtomicBool,
    pub fail_surface: AtomicBool,
    pub pointer: Mutex<PointerState>,
    pub draws: Mutex<Vec<Point>>,
}

impl Probe {
    fn acquire(&self, what: &str) {
        self.live.fetch_add(1, Ordering::SeqCst);
        self.record(format!("acquire {what}"));
    }

    fn release(&self, what: &str) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        self.record(format!("release {what}"));
    }

    fn record(&self, event: String) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Resources acquired and not yet released.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    pub fn blits(&self) -> usize {
        self.blits.load(Ordering::SeqCst)
    }

    pub fn set_pointer(&self, state: PointerState) {
        if let Ok(mut pointer) = self.pointer.lock() {
            *pointer = state;
        }
    }

    pub fn draws(&self) -> Vec<Point> {
        self.draws.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

pub(crate) struct FakeBackend {
    monitors: Vec<Monitor>,
    virtual_screen: Rect,
    windows: Mutex<Vec<FakeWindow>>,
    bits_per_pixel: u16,
    device_scale: Scale,
    probe: Arc<Probe>,
}

impl FakeBackend {
    /// One 1920x1080 monitor at 100% scale, 32 bits per pixel.
    pub fn full_hd() -> Self {
        let rect = Rect::new(0, 0, 1920, 1080);
        let res = Resolution::new(1920, 1080);
        Self::with_monitors(vec![
            Monitor::new(rect, res, res).expect("valid monitor"),
        ])
    }

    pub fn with_monitors(monitors: Vec<Monitor>) -> Self {
        let virtual_screen = monitors
            .iter()
            .fold(Rect::default(), |acc, m| acc.union(&m.rect()));
        let device_scale = monitors
            .first()
            .map_or(Scale::identity(), |m| m.scale());
        Self {
            monitors,
            virtual_screen,
            windows: Mutex::new(Vec::new()),
            bits_per_pixel: 32,
            device_scale,
            probe: Arc::default(),
        }
    }

    pub fn bits_per_pixel(mut self, bits_per_pixel: u16) -> Self {
        self.bits_per_pixel = bits_per_pixel;
        self
    }

    pub fn window(self, title: &str, window_rect: Rect, client_rect: Rect) -> Self {
        if let Ok(mut windows) = self.windows.lock() {
            let id = WindowId::from_raw_handle(0x1000 + windows.len() as isize);
            windows.push(FakeWindow {
                title: title.to_string(),
                id,
                window_rect,
                client_rect,
            });
        }
        self
    }

    pub fn move_window(&self, title: &str, window_rect: Rect) {
        if let Ok(mut windows) = self.windows.lock() {
            if let Some(window) = windows.iter_mut().find(|w| w.title == title) {
                window.window_rect = window_rect;
            }
        }
    }

    pub fn probe(&self) -> Arc<Probe> {
        self.probe.clone()
    }

    fn lookup(&self, id: WindowId) -> CaptureResult<FakeWindow> {
        self.windows
            .lock()
            .ok()
            .and_then(|windows| windows.iter().find(|w| w.id == id).cloned())
            .ok_or_else(|| CaptureError::Platform(anyhow::anyhow!("invalid window handle")))
    }
}

impl DisplayBackend for FakeBackend {
    fn enumerate_monitors(&self) -> CaptureResult<Vec<Monitor>> {
        Ok(self.monitors.clone())
    }

    fn virtual_screen(&self) -> CaptureResult<Rect> {
        Ok(self.virtual_screen)
    }

    fn find_window(&self, title: &str) -> CaptureResult<Option<WindowId>> {
        Ok(self.windows.lock().ok().and_then(|windows| {
            windows.iter().find(|w| w.title == title).map(|w| w.id)
        }))
    }

    fn window_rect(&self, window: WindowId) -> CaptureResult<Rect> {
        Ok(self.lookup(window)?.window_rect)
    }

    fn client_rect(&self, window: WindowId) -> CaptureResult<Rect> {
        Ok(self.lookup(window)?.client_rect)
    }

    fn open_source(&self, _target: TargetHandle) -> CaptureResult<Box<dyn CaptureSource>> {
        self.probe.acquire("source");
        Ok(Box::new(FakeSource {
            probe: self.probe.clone(),
            bits_per_pixel: self.bits_per_pixel,
            scale: self.device_scale,
            surface: None,
            pointer: None,
        }))
    }

    fn create_outline(&self, _area: Rect) -> CaptureResult<Box<dyn RegionOutline>> {
        self.probe.acquire("outline");
        Ok(Box::new(FakeOutline {
            probe: self.probe.clone(),
        }))
    }
}

struct FakeSource {
    probe: Arc<Probe>,
    bits_per_pixel: u16,
    scale: Scale,
    surface: Option<Vec<u8>>,
    pointer: Option<PointerState>,
}

impl CaptureSource for FakeSource {
    fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    fn device_scale(&self) -> Scale {
        self.scale
    }

    fn allocate_surface(&mut self, layout: &BitmapLayout) -> CaptureResult<()> {
        if self.probe.fail_surface.load(Ordering::SeqCst) {
            return Err(CaptureError::resource(
                "DIB section",
                anyhow::anyhow!("out of memory"),
            ));
        }
        self.probe.acquire("surface");
        self.surface = Some(vec![0; layout.frame_size()]);
        Ok(())
    }

    fn blit(&mut self, _rect: Rect) -> CaptureResult<()> {
        if self.probe.fail_blit.load(Ordering::SeqCst) {
            return Err(CaptureError::Capture(anyhow::anyhow!(
                "BitBlt failed: the window handle is invalid"
            )));
        }
        let count = self.probe.blits.fetch_add(1, Ordering::SeqCst) + 1;
        let surface = self
            .surface
            .as_mut()
            .ok_or_else(|| CaptureError::Platform(anyhow::anyhow!("no surface selected")))?;
        surface.fill(count as u8);
        Ok(())
    }

    fn pixels(&self) -> CaptureResult<&[u8]> {
        self.surface
            .as_deref()
            .ok_or_else(|| CaptureError::Platform(anyhow::anyhow!("no surface selected")))
    }

    fn read_palette(&self, out: &mut [u8]) -> CaptureResult<()> {
        for (index, quad) in out.chunks_exact_mut(4).enumerate() {
            let gray = index as u8;
            quad.copy_from_slice(&[gray, gray, gray, 0]);
        }
        Ok(())
    }

    fn pointer(&mut self) -> CaptureResult<PointerState> {
        self.probe.pointer_queries.fetch_add(1, Ordering::SeqCst);
        if self.probe.fail_pointer.load(Ordering::SeqCst) {
            return Err(CaptureError::Overlay("could not get icon info".into()));
        }
        let state = self
            .probe
            .pointer
            .lock()
            .map(|p| *p)
            .unwrap_or_default();
        self.pointer = Some(state);
        Ok(state)
    }

    fn draw_pointer(&mut self, at: Point) -> CaptureResult<()> {
        if self.pointer.is_none() {
            return Err(CaptureError::Overlay("no cursor sampled".into()));
        }
        if let Ok(mut draws) = self.probe.draws.lock() {
            draws.push(at);
        }
        Ok(())
    }
}

impl Drop for FakeSource {
    fn drop(&mut self) {
        if self.surface.take().is_some() {
            self.probe.release("surface");
        }
        self.probe.release("source");
    }
}

struct FakeOutline {
    probe: Arc<Probe>,
}

impl RegionOutline for FakeOutline {
    fn pump(&mut self) {
        self.probe.pumps.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for FakeOutline {
    fn drop(&mut self) {
        self.probe.release("outline");
    }
}

/// Clock whose sleeps advance time instantly.
#[derive(Clone, Debug, Default)]
pub(crate) struct ManualClock {
    now: Arc<AtomicI64>,
    slept: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn starting_at(now_us: i64) -> Self {
        let clock = Self::default();
        clock.now.store(now_us, Ordering::SeqCst);
        clock
    }

    pub fn advance(&self, micros: i64) {
        self.now.fetch_add(micros, Ordering::SeqCst);
    }

    /// Total time spent in `sleep_us`.
    pub fn slept(&self) -> i64 {
        self.slept.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now_us(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }

    fn sleep_us(&self, micros: i64) {
        if micros > 0 {
            self.now.fetch_add(micros, Ordering::SeqCst);
            self.slept.fetch_add(micros, Ordering::SeqCst);
        }
    }
}

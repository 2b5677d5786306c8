use std::sync::Arc;
use std::time::Instant;

use crate::backend::{self, CaptureSource, DisplayBackend, RegionOutline};
use crate::bitmap::BitmapLayout;
use crate::config::{CaptureOptions, VideoSize};
use crate::cursor::{Placement, PointerOverlay};
use crate::error::{CaptureError, CaptureResult};
use crate::frame::{Frame, FrameMetadata, StreamInfo};
use crate::monitor::{MonitorTopology, Scale, resolve_topology};
use crate::pacer::{Clock, FramePacer, FrameRate, SystemClock};
use crate::region::Rect;
use crate::target::{ResolvedTarget, find_target, resolve_target};
use crate::window::{CaptureTarget, TargetHandle};

pub struct CaptureSessionBuilder {
    backend_override: Option<Arc<dyn DisplayBackend>>,
    clock: Option<Box<dyn Clock>>,
    options: CaptureOptions,
}

impl CaptureSessionBuilder {
    pub fn new() -> Self {
        Self {
            backend_override: None,
            clock: None,
            options: CaptureOptions::default(),
        }
    }

    pub fn with_backend(mut self, backend: Arc<dyn DisplayBackend>) -> Self {
        self.backend_override = Some(backend);
        self
    }

    /// Replace the wall clock used for pacing and timestamps.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    pub fn options(mut self, options: CaptureOptions) -> Self {
        self.options = options;
        self
    }

    pub fn draw_mouse(mut self, enabled: bool) -> Self {
        self.options.draw_mouse = enabled;
        self
    }

    /// Outline the captured area on screen. Ignored for window targets.
    pub fn show_region(mut self, enabled: bool) -> Self {
        self.options.show_region = enabled;
        self
    }

    pub fn framerate(mut self, rate: FrameRate) -> Self {
        self.options.framerate = rate;
        self
    }

    pub fn video_size(mut self, size: Option<VideoSize>) -> Self {
        self.options.video_size = size;
        self
    }

    pub fn offset(mut self, x: i32, y: i32) -> Self {
        self.options.offset_x = x;
        self.options.offset_y = y;
        self
    }

    pub fn nonblocking(mut self, enabled: bool) -> Self {
        self.options.nonblocking = enabled;
        self
    }

    /// Resolve `target`, validate the capture area and acquire every
    /// resource the session needs.
    ///
    /// Anything acquired before a failure is released on the way out.
    pub fn open(self, target: &CaptureTarget) -> CaptureResult<CaptureSession> {
        let backend = match self.backend_override {
            Some(b) => b,
            None => backend::default_backend()?,
        };
        let clock = self.clock.unwrap_or_else(|| Box::new(SystemClock));
        let mut options = self.options;

        let handle = find_target(backend.as_ref(), target)?;
        if options.show_region && handle != TargetHandle::Desktop {
            tracing::warn!("Can't show region when grabbing a window.");
            options.show_region = false;
        }

        let mut source = backend.open_source(handle)?;
        let bits_per_pixel = source.bits_per_pixel();
        let topology = resolve_topology(backend.as_ref())?;
        let resolved = resolve_target(
            backend.as_ref(),
            &topology,
            handle,
            &options.request(),
            bits_per_pixel,
        )?;

        let rect = resolved.capture_rect;
        let layout = BitmapLayout::new(rect.width() as u32, rect.height() as u32, bits_per_pixel)?;
        source.allocate_surface(&layout)?;

        let outline = if options.show_region {
            Some(backend.create_outline(rect)?)
        } else {
            None
        };

        let overlay = options.draw_mouse.then(|| {
            PointerOverlay::new(match handle {
                TargetHandle::Desktop => Placement::Desktop {
                    scale: source.device_scale(),
                },
                TargetHandle::Window(window) => Placement::Window {
                    window,
                    scale: resolved.window_scale.unwrap_or_else(Scale::identity),
                },
            })
        });

        let pacer = FramePacer::new(options.framerate, clock.now_us());
        let stream_info = StreamInfo::new(&layout, options.framerate);
        tracing::debug!(
            "Stream {}x{} at {} fps, {} bytes per frame, {} bit/s",
            stream_info.width,
            stream_info.height,
            options.framerate,
            layout.file_size(),
            stream_info.bit_rate
        );

        Ok(CaptureSession {
            backend,
            clock,
            palette: vec![0; layout.palette_len()],
            options,
            topology,
            target: resolved,
            layout,
            stream_info,
            pacer,
            overlay,
            source: Some(source),
            outline,
            sequence: 0,
        })
    }
}

impl Default for CaptureSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A live capture of one target, producing one BMP frame per
/// [`read_frame`](Self::read_frame).
pub struct CaptureSession {
    backend: Arc<dyn DisplayBackend>,
    clock: Box<dyn Clock>,
    options: CaptureOptions,
    topology: MonitorTopology,
    target: ResolvedTarget,
    layout: BitmapLayout,
    stream_info: StreamInfo,
    pacer: FramePacer,
    overlay: Option<PointerOverlay>,
    palette: Vec<u8>,
    source: Option<Box<dyn CaptureSource>>,
    outline: Option<Box<dyn RegionOutline>>,
    sequence: u64,
}

impl CaptureSession {
    pub fn builder() -> CaptureSessionBuilder {
        CaptureSessionBuilder::new()
    }

    /// Open `target` on the platform backend with default options.
    pub fn open(target: &CaptureTarget) -> CaptureResult<Self> {
        Self::builder().open(target)
    }

    pub fn stream_info(&self) -> &StreamInfo {
        &self.stream_info
    }

    /// Physical pixels grabbed each tick.
    pub fn capture_rect(&self) -> Rect {
        self.target.capture_rect
    }

    pub fn layout(&self) -> &BitmapLayout {
        &self.layout
    }

    pub fn topology(&self) -> &MonitorTopology {
        &self.topology
    }

    pub fn options(&self) -> &CaptureOptions {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_none()
    }

    /// Wait for the next frame deadline, grab the capture rectangle and
    /// encode it.
    ///
    /// In non-blocking mode a frame that is not due yet yields
    /// [`CaptureError::WouldBlock`] without touching the screen.
    pub fn read_frame(&mut self) -> CaptureResult<Frame> {
        let Some(source) = self.source.as_mut() else {
            return Err(CaptureError::Closed);
        };

        if let Some(outline) = self.outline.as_mut() {
            outline.pump();
        }

        let (schedule, pts_us) = loop {
            let now_us = self.clock.now_us();
            let schedule = self.pacer.schedule(now_us);
            if schedule.is_due() {
                break (schedule, now_us);
            }
            if self.options.nonblocking {
                return Err(CaptureError::WouldBlock);
            }
            self.clock.sleep_us(schedule.delay_us);
        };

        let started = Instant::now();
        let rect = self.target.capture_rect;
        source.blit(rect).map_err(|err| {
            tracing::error!("Failed to capture image: {err}");
            match err {
                CaptureError::Capture(_) => err,
                other => CaptureError::Capture(anyhow::Error::new(other)),
            }
        })?;

        if let Some(overlay) = self.overlay.as_mut() {
            overlay.draw(source.as_mut(), self.backend.as_ref(), &self.topology, rect);
        }

        if !self.palette.is_empty() {
            source.read_palette(&mut self.palette)?;
        }
        let data = self.layout.encode(&self.palette, source.pixels()?)?;

        self.pacer.commit(&schedule);
        let sequence = self.sequence;
        self.sequence += 1;

        Ok(Frame::new(
            data,
            self.layout,
            FrameMetadata {
                pts_us,
                capture_time: Instant::now(),
                capture_duration: started.elapsed(),
                sequence,
            },
        ))
    }

    /// Release the outline window, then the pixel surface and device
    /// contexts. Safe to call more than once.
    pub fn close(&mut self) {
        let outline = self.outline.take();
        let source = self.source.take();
        if outline.is_none() && source.is_none() {
            return;
        }
        drop(outline);
        drop(source);
        tracing::debug!("Capture session closed after {} frames", self.sequence);
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.close();
    }
}

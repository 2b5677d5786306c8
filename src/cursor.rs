use crate::backend::{CaptureSource, DisplayBackend, PointerState};
use crate::error::{CaptureError, CaptureResult};
use crate::monitor::{MonitorTopology, Scale};
use crate::region::{Point, Rect};
use crate::window::WindowId;

/// How cursor screen coordinates relate to the captured pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Scale by the source device, then shift by the capture origin.
    Desktop { scale: Scale },
    /// Shift into window space, then scale by the window's monitor.
    Window { window: WindowId, scale: Scale },
}

/// Position of the cursor image's top-left corner on a desktop capture.
pub fn desktop_pointer_position(pointer: &PointerState, scale: Scale, capture_rect: Rect) -> Point {
    Point::new(
        scale.x(pointer.position.x) - capture_rect.left - pointer.hotspot.x,
        scale.y(pointer.position.y) - capture_rect.top - pointer.hotspot.y,
    )
}

/// Position of the cursor image's top-left corner on a window capture.
pub fn window_pointer_position(
    pointer: &PointerState,
    window_origin: Point,
    scale: Scale,
    capture_rect: Rect,
) -> Point {
    let x = pointer.position.x - capture_rect.left - pointer.hotspot.x - window_origin.x;
    let y = pointer.position.y - capture_rect.top - pointer.hotspot.y - window_origin.y;
    Point::new(scale.x(x), scale.y(y))
}

/// Composites the system cursor into captured frames.
///
/// Failures never fail the frame. The first one is logged, later ones are
/// dropped silently for the rest of the session.
#[derive(Debug)]
pub struct PointerOverlay {
    placement: Placement,
    reported: bool,
}

impl PointerOverlay {
    pub fn new(placement: Placement) -> Self {
        Self {
            placement,
            reported: false,
        }
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn error_reported(&self) -> bool {
        self.reported
    }

    pub fn draw(
        &mut self,
        source: &mut dyn CaptureSource,
        backend: &dyn DisplayBackend,
        topology: &MonitorTopology,
        capture_rect: Rect,
    ) {
        if let Err(err) = self.try_draw(source, backend, topology, capture_rect) {
            if !self.reported {
                tracing::warn!("{err}");
                self.reported = true;
            }
        }
    }

    fn try_draw(
        &self,
        source: &mut dyn CaptureSource,
        backend: &dyn DisplayBackend,
        topology: &MonitorTopology,
        capture_rect: Rect,
    ) -> CaptureResult<()> {
        let pointer = source.pointer().map_err(into_overlay)?;
        if !pointer.visible {
            return Ok(());
        }

        let position = match self.placement {
            Placement::Desktop { scale } => desktop_pointer_position(&pointer, scale, capture_rect),
            Placement::Window { window, scale } => {
                let window_rect = backend.window_rect(window).map_err(|err| {
                    CaptureError::Overlay(format!("couldn't get window rectangle: {err}"))
                })?;
                let scale = topology.scale_for_rect(&window_rect).unwrap_or(scale);
                window_pointer_position(&pointer, window_rect.origin(), scale, capture_rect)
            }
        };

        tracing::trace!(
            "Cursor pos ({},{}) -> ({},{})",
            pointer.position.x,
            pointer.position.y,
            position.x,
            position.y
        );

        let bounds = Rect::new(0, 0, capture_rect.width(), capture_rect.height());
        if !bounds.contains_point(position.x, position.y) {
            return Ok(());
        }
        source.draw_pointer(position).map_err(into_overlay)
    }
}

fn into_overlay(err: CaptureError) -> CaptureError {
    match err {
        CaptureError::Overlay(_) => err,
        other => CaptureError::Overlay(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::backend::DisplayBackend;
    use crate::monitor::{Monitor, Resolution, resolve_topology};
    use crate::platform::fake::FakeBackend;
    use crate::window::TargetHandle;

    fn pointer(x: i32, y: i32) -> PointerState {
        PointerState {
            visible: true,
            position: Point::new(x, y),
            hotspot: Point::new(2, 3),
        }
    }

    fn scale_150() -> Scale {
        Scale::new(Resolution::new(1280, 720), Resolution::new(1920, 1080)).unwrap()
    }

    #[test]
    fn desktop_position_scales_before_shifting() {
        let at = desktop_pointer_position(&pointer(100, 200), scale_150(), Rect::new(50, 60, 850, 660));
        assert_eq!(at, Point::new(150 - 50 - 2, 300 - 60 - 3));
    }

    #[test]
    fn window_position_shifts_before_scaling() {
        let at = window_pointer_position(
            &pointer(500, 400),
            Point::new(300, 200),
            scale_150(),
            Rect::new(0, 0, 800, 600),
        );
        assert_eq!(at, Point::new((500 - 2 - 300) * 3 / 2, (400 - 3 - 200) * 3 / 2));
    }

    #[test]
    fn draws_visible_pointer_inside_capture() {
        let backend = FakeBackend::full_hd();
        let probe = backend.probe();
        let topology = resolve_topology(&backend).unwrap();
        let mut source = backend.open_source(TargetHandle::Desktop).unwrap();
        probe.set_pointer(pointer(100, 100));

        let mut overlay = PointerOverlay::new(Placement::Desktop {
            scale: Scale::identity(),
        });
        overlay.draw(source.as_mut(), &backend, &topology, Rect::new(0, 0, 1920, 1080));
        assert_eq!(probe.draws(), vec![Point::new(98, 97)]);
        assert!(!overlay.error_reported());
    }

    #[test]
    fn hidden_or_outside_pointer_is_skipped() {
        let backend = FakeBackend::full_hd();
        let probe = backend.probe();
        let topology = resolve_topology(&backend).unwrap();
        let mut source = backend.open_source(TargetHandle::Desktop).unwrap();
        let mut overlay = PointerOverlay::new(Placement::Desktop {
            scale: Scale::identity(),
        });
        let capture = Rect::new(100, 100, 500, 400);

        probe.set_pointer(PointerState {
            visible: false,
            ..pointer(200, 200)
        });
        overlay.draw(source.as_mut(), &backend, &topology, capture);

        // Left of the capture area.
        probe.set_pointer(pointer(50, 200));
        overlay.draw(source.as_mut(), &backend, &topology, capture);

        // Exactly on the exclusive right edge.
        probe.set_pointer(pointer(502, 200));
        overlay.draw(source.as_mut(), &backend, &topology, capture);

        assert!(probe.draws().is_empty());
        assert!(!overlay.error_reported());
    }

    #[test]
    fn window_placement_follows_the_window() {
        let backend = FakeBackend::with_monitors(vec![
            Monitor::new(
                Rect::new(0, 0, 1920, 1080),
                Resolution::new(1920, 1080),
                Resolution::new(1920, 1080),
            )
            .unwrap(),
            Monitor::new(
                Rect::new(1920, 0, 3200, 720),
                Resolution::new(1280, 720),
                Resolution::new(2560, 1440),
            )
            .unwrap(),
        ])
        .window("Editor", Rect::new(100, 100, 900, 700), Rect::new(0, 0, 780, 560));
        let probe = backend.probe();
        let topology = resolve_topology(&backend).unwrap();
        let window = backend.find_window("Editor").unwrap().unwrap();
        let mut source = backend.open_source(TargetHandle::Window(window)).unwrap();
        let mut overlay = PointerOverlay::new(Placement::Window {
            window,
            scale: Scale::identity(),
        });
        let capture = Rect::new(0, 0, 780, 560);

        probe.set_pointer(pointer(112, 113));
        overlay.draw(source.as_mut(), &backend, &topology, capture);

        // Moved to the 200% monitor after setup.
        backend.move_window("Editor", Rect::new(2000, 100, 2400, 400));
        probe.set_pointer(pointer(2012, 113));
        overlay.draw(source.as_mut(), &backend, &topology, capture);

        assert_eq!(probe.draws(), vec![Point::new(10, 10), Point::new(20, 20)]);
    }

    #[test]
    fn failures_are_reported_once_and_never_propagate() {
        let backend = FakeBackend::full_hd();
        let probe = backend.probe();
        let topology = resolve_topology(&backend).unwrap();
        let mut source = backend.open_source(TargetHandle::Desktop).unwrap();
        probe.fail_pointer.store(true, Ordering::SeqCst);

        let mut overlay = PointerOverlay::new(Placement::Desktop {
            scale: Scale::identity(),
        });
        for _ in 0..3 {
            overlay.draw(source.as_mut(), &backend, &topology, Rect::new(0, 0, 1920, 1080));
        }
        assert!(overlay.error_reported());
        assert_eq!(probe.pointer_queries.load(Ordering::SeqCst), 3);
        assert!(probe.draws().is_empty());
    }
}

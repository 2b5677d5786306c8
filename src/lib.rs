pub mod backend;
pub mod bitmap;
pub mod capture_session;
pub mod config;
pub mod cursor;
pub mod error;
pub mod frame;
pub mod mapping;
pub mod monitor;
pub mod pacer;
mod platform;
pub mod region;
pub mod target;
pub mod window;

pub use backend::{CaptureSource, DisplayBackend, PointerState, RegionOutline};
pub use bitmap::BitmapLayout;
pub use capture_session::{CaptureSession, CaptureSessionBuilder};
pub use config::{CaptureOptions, VideoSize};
pub use error::{CaptureError, CaptureErrorClass, CaptureResult};
pub use frame::{Codec, Frame, FrameMetadata, MediaKind, StreamInfo};
pub use monitor::{Monitor, MonitorTopology, Resolution, Scale};
pub use pacer::{Clock, FramePacer, FrameRate, SystemClock};
pub use region::{CaptureRequest, Point, Rect};
pub use window::{CaptureTarget, TargetHandle, WindowId};

/// Open `target` with default options and grab a single frame.
pub fn capture_once(target: &CaptureTarget) -> CaptureResult<Frame> {
    let mut session = CaptureSession::builder().open(target)?;
    session.read_frame()
}

use thiserror::Error;

use crate::region::Rect;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid capture target '{0}': use \"desktop\" or \"title=<window name>\"")]
    InvalidTarget(String),

    #[error("can't find window '{0}'")]
    WindowNotFound(String),

    #[error("capture area {area} extends outside available area {bounds}")]
    OutOfBounds { area: Rect, bounds: Rect },

    #[error("invalid capture configuration: {0}")]
    InvalidConfig(String),

    /// No monitor contains the logical point, not even on a single axis.
    #[error("no monitor contains logical point ({x}, {y})")]
    UnmappedPoint { x: i32, y: i32 },

    #[error("no monitors were enumerated")]
    NoMonitors,

    #[error("failed to acquire {what}: {source:#}")]
    Resource {
        what: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("frame buffer size overflow")]
    BufferOverflow,

    #[error("screen capture is not supported on this platform")]
    Unsupported,

    /// The per-frame block copy failed, e.g. the target window was destroyed.
    #[error("failed to capture image: {0:#}")]
    Capture(anyhow::Error),

    #[error("capture session is closed")]
    Closed,

    #[error("pointer overlay failed: {0}")]
    Overlay(String),

    /// Non-blocking mode only: the next frame is not due yet.
    #[error("frame not ready yet, try again")]
    WouldBlock,

    #[error(transparent)]
    Platform(anyhow::Error),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureErrorClass {
    Configuration,
    Resource,
    Capture,
    Overlay,
    Backpressure,
}

impl CaptureError {
    pub fn class(&self) -> CaptureErrorClass {
        match self {
            Self::InvalidTarget(_)
            | Self::WindowNotFound(_)
            | Self::OutOfBounds { .. }
            | Self::InvalidConfig(_)
            | Self::UnmappedPoint { .. }
            | Self::NoMonitors => CaptureErrorClass::Configuration,
            Self::Resource { .. } | Self::BufferOverflow | Self::Unsupported | Self::Platform(_) => {
                CaptureErrorClass::Resource
            }
            Self::Capture(_) | Self::Closed => CaptureErrorClass::Capture,
            Self::Overlay(_) => CaptureErrorClass::Overlay,
            Self::WouldBlock => CaptureErrorClass::Backpressure,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.class(), CaptureErrorClass::Backpressure)
    }

    pub(crate) fn resource(what: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Resource {
            what,
            source: source.into(),
        }
    }
}

pub type CaptureResult<T> = Result<T, CaptureError>;

use std::fmt;
use std::str::FromStr;

use crate::error::CaptureError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WindowId {
    handle: isize,
}

impl WindowId {
    pub const fn from_raw_handle(raw_handle: isize) -> Self {
        Self { handle: raw_handle }
    }

    pub const fn raw_handle(&self) -> isize {
        self.handle
    }

    pub fn stable_id(&self) -> String {
        format!("{:016x}", self.handle as usize as u64)
    }
}

/// What a session grabs: the whole virtual desktop or one top-level
/// window found by its exact title.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CaptureTarget {
    Desktop,
    Window { title: String },
}

impl CaptureTarget {
    pub fn window(title: impl Into<String>) -> Self {
        Self::Window {
            title: title.into(),
        }
    }
}

impl FromStr for CaptureTarget {
    type Err = CaptureError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        if raw == "desktop" {
            return Ok(Self::Desktop);
        }
        match raw.strip_prefix("title=") {
            Some(title) if !title.is_empty() => Ok(Self::window(title)),
            _ => Err(CaptureError::InvalidTarget(raw.to_string())),
        }
    }
}

impl fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Desktop => f.write_str("desktop"),
            Self::Window { title } => write!(f, "title={title}"),
        }
    }
}

/// The OS object a source device context was opened on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TargetHandle {
    Desktop,
    Window(WindowId),
}

impl TargetHandle {
    pub fn window(&self) -> Option<WindowId> {
        match self {
            Self::Desktop => None,
            Self::Window(id) => Some(*id),
        }
    }
}

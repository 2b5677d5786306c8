//! Session options and their string grammar.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;
use crate::pacer::FrameRate;
use crate::region::CaptureRequest;

/// Named frame sizes accepted by `video_size`.
const VIDEO_SIZE_ABBREVIATIONS: &[(&str, u32, u32)] = &[
    ("ntsc", 720, 480),
    ("pal", 720, 576),
    ("qntsc", 352, 240),
    ("qpal", 352, 288),
    ("sntsc", 640, 480),
    ("spal", 768, 576),
    ("film", 352, 240),
    ("ntsc-film", 352, 240),
    ("sqcif", 128, 96),
    ("qcif", 176, 144),
    ("cif", 352, 288),
    ("4cif", 704, 576),
    ("16cif", 1408, 1152),
    ("qqvga", 160, 120),
    ("qvga", 320, 240),
    ("vga", 640, 480),
    ("svga", 800, 600),
    ("xga", 1024, 768),
    ("uxga", 1600, 1200),
    ("qxga", 2048, 1536),
    ("sxga", 1280, 1024),
    ("qsxga", 2560, 2048),
    ("hsxga", 5120, 4096),
    ("wvga", 852, 480),
    ("wxga", 1366, 768),
    ("wsxga", 1600, 1024),
    ("wuxga", 1920, 1200),
    ("woxga", 2560, 1600),
    ("wqsxga", 3200, 2048),
    ("wquxga", 3840, 2400),
    ("whsxga", 6400, 4096),
    ("whuxga", 7680, 4800),
    ("cga", 320, 200),
    ("ega", 640, 350),
    ("hd480", 852, 480),
    ("hd720", 1280, 720),
    ("hd1080", 1920, 1080),
    ("2k", 2048, 1080),
    ("2kflat", 1998, 1080),
    ("2kscope", 2048, 858),
    ("4k", 4096, 2160),
    ("4kflat", 3996, 2160),
    ("4kscope", 4096, 1716),
    ("nhd", 640, 360),
    ("hqvga", 240, 160),
    ("wqvga", 400, 240),
    ("fwqvga", 432, 240),
    ("hvga", 480, 320),
    ("qhd", 960, 540),
    ("2kdci", 2048, 1080),
    ("4kdci", 4096, 2160),
    ("uhd2160", 3840, 2160),
    ("uhd4320", 7680, 4320),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VideoSize {
    pub width: u32,
    pub height: u32,
}

impl VideoSize {
    pub fn new(width: u32, height: u32) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::InvalidConfig(format!(
                "video size {width}x{height} must be positive"
            )));
        }
        Ok(Self { width, height })
    }
}

impl FromStr for VideoSize {
    type Err = CaptureError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let invalid = || CaptureError::InvalidConfig(format!("invalid video size '{raw}'"));

        if let Some((_, width, height)) = VIDEO_SIZE_ABBREVIATIONS
            .iter()
            .find(|(name, _, _)| name.eq_ignore_ascii_case(raw))
        {
            return Ok(Self {
                width: *width,
                height: *height,
            });
        }

        let (width, height) = raw.split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = width.parse::<u32>().map_err(|_| invalid())?;
        let height = height.parse::<u32>().map_err(|_| invalid())?;
        Self::new(width, height).map_err(|_| invalid())
    }
}

impl TryFrom<String> for VideoSize {
    type Error = CaptureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VideoSize> for String {
    fn from(size: VideoSize) -> Self {
        size.to_string()
    }
}

impl fmt::Display for VideoSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Options for one capture session.
///
/// Every field has a default, so partial documents deserialize:
///
/// ```
/// # use snow_grab::config::CaptureOptions;
/// let options: CaptureOptions = serde_json::from_str(r#"{"framerate": "pal"}"#).unwrap();
/// assert!(options.draw_mouse);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureOptions {
    /// Composite the system cursor into each frame.
    pub draw_mouse: bool,
    /// Draw an outline around the captured area (desktop targets only).
    pub show_region: bool,
    pub framerate: FrameRate,
    /// Explicit capture size. `None` grabs the whole target.
    pub video_size: Option<VideoSize>,
    pub offset_x: i32,
    pub offset_y: i32,
    /// Return [`CaptureError::WouldBlock`] instead of sleeping until the
    /// next frame is due.
    pub nonblocking: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            draw_mouse: true,
            show_region: false,
            framerate: FrameRate::NTSC,
            video_size: None,
            offset_x: 0,
            offset_y: 0,
            nonblocking: false,
        }
    }
}

impl CaptureOptions {
    pub fn request(&self) -> CaptureRequest {
        let (width, height) = self
            .video_size
            .map_or((0, 0), |size| (size.width, size.height));
        CaptureRequest {
            width,
            height,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
        }
    }

    /// Set one option from its `name` and string value, as given on a
    /// command line.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), CaptureError> {
        match name {
            "draw_mouse" => self.draw_mouse = parse_flag(name, value)?,
            "show_region" => self.show_region = parse_flag(name, value)?,
            "nonblocking" => self.nonblocking = parse_flag(name, value)?,
            "framerate" => self.framerate = value.parse()?,
            "video_size" => self.video_size = Some(value.parse()?),
            "offset_x" => self.offset_x = parse_offset(name, value)?,
            "offset_y" => self.offset_y = parse_offset(name, value)?,
            _ => {
                return Err(CaptureError::InvalidConfig(format!(
                    "unknown option '{name}'"
                )));
            }
        }
        Ok(())
    }
}

/// Accepts `1`/`true`/`yes`/`on` and `0`/`false`/`no`/`off`,
/// case-insensitive.
fn parse_flag(name: &str, raw: &str) -> Result<bool, CaptureError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(CaptureError::InvalidConfig(format!(
            "option '{name}' expects a boolean, got '{raw}'"
        ))),
    }
}

fn parse_offset(name: &str, raw: &str) -> Result<i32, CaptureError> {
    raw.trim().parse().map_err(|_| {
        CaptureError::InvalidConfig(format!("option '{name}' expects an integer, got '{raw}'"))
    })
}

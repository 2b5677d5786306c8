use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::bitmap::BitmapLayout;
use crate::pacer::FrameRate;

/// Microseconds per time-base unit denominator.
pub const TIME_BASE_DEN: u32 = 1_000_000;

/// Metadata attached to each captured frame.
#[derive(Clone, Debug)]
pub struct FrameMetadata {
    /// Presentation timestamp: wall clock at acquisition, in microseconds
    /// since the UNIX epoch.
    pub pts_us: i64,
    /// Monotonic timestamp taken right after the pixels were copied.
    pub capture_time: Instant,
    /// Time spent in the block copy, pointer overlay and encode.
    pub capture_duration: Duration,
    /// Monotonic sequence number, starting at zero for each session.
    pub sequence: u64,
}

/// One complete BMP file.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Bytes,
    layout: BitmapLayout,
    pub metadata: FrameMetadata,
}

impl Frame {
    pub(crate) fn new(data: Bytes, layout: BitmapLayout, metadata: FrameMetadata) -> Self {
        Self {
            data,
            layout,
            metadata,
        }
    }

    /// Headers, palette and pixel rows.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn into_data(self) -> Bytes {
        self.data
    }

    /// Pixel rows only, top to bottom.
    pub fn pixels(&self) -> &[u8] {
        &self.data[self.layout.header_size()..]
    }

    pub fn layout(&self) -> &BitmapLayout {
        &self.layout
    }

    pub fn width(&self) -> u32 {
        self.layout.width()
    }

    pub fn height(&self) -> u32 {
        self.layout.height()
    }

    pub fn pts_us(&self) -> i64 {
        self.metadata.pts_us
    }

    pub fn sequence(&self) -> u64 {
        self.metadata.sequence
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Video,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Codec {
    Bmp,
}

/// Describes the synthetic video stream a session produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamInfo {
    /// `(numerator, denominator)` of one timestamp unit in seconds.
    pub time_base: (u32, u32),
    pub avg_frame_rate: FrameRate,
    pub media_kind: MediaKind,
    pub codec: Codec,
    pub width: u32,
    pub height: u32,
    /// Bits per second of raw frames at the nominal frame rate.
    pub bit_rate: u64,
}

impl StreamInfo {
    pub fn new(layout: &BitmapLayout, rate: FrameRate) -> Self {
        let frame_bits = layout.file_size() as u128 * 8;
        let bit_rate = frame_bits * u128::from(rate.num()) / u128::from(rate.den());
        Self {
            time_base: (1, TIME_BASE_DEN),
            avg_frame_rate: rate,
            media_kind: MediaKind::Video,
            codec: Codec::Bmp,
            width: layout.width(),
            height: layout.height(),
            bit_rate: u64::try_from(bit_rate).unwrap_or(u64::MAX),
        }
    }
}

//! BMP file layout for emitted frames.
//!
//! ```text
//! BITMAPFILEHEADER  14 bytes  "BM", file size, 0, 0, pixel offset
//! BITMAPINFOHEADER  40 bytes  40, width, -height, 1, bpp, BI_RGB, 0...
//! RGBQUAD[2^bpp]              only when bpp <= 8
//! pixel rows                  top to bottom, DWORD aligned
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{CaptureError, CaptureResult};

pub const FILE_HEADER_LEN: usize = 14;
pub const INFO_HEADER_LEN: usize = 40;
pub const PALETTE_ENTRY_LEN: usize = 4;

const BMP_TAG: u16 = 0x4d42;
const BI_RGB: u32 = 0;

/// Bytes per pixel row, padded to a 32-bit boundary.
pub fn row_stride(width: u32, bits_per_pixel: u16) -> CaptureResult<usize> {
    let bits = u64::from(width) * u64::from(bits_per_pixel);
    let stride = bits.div_ceil(32) * 4;
    usize::try_from(stride).map_err(|_| CaptureError::BufferOverflow)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BitmapLayout {
    width: u32,
    height: u32,
    bits_per_pixel: u16,
    row_stride: usize,
    header_size: usize,
    frame_size: usize,
}

impl BitmapLayout {
    pub fn new(width: u32, height: u32, bits_per_pixel: u16) -> CaptureResult<Self> {
        if width == 0 || height == 0 || bits_per_pixel == 0 || bits_per_pixel % 8 != 0 {
            return Err(CaptureError::InvalidConfig(format!(
                "bitmap {width}x{height} with {bits_per_pixel} bits per pixel"
            )));
        }
        // Info header stores signed dimensions.
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(CaptureError::BufferOverflow);
        }

        let row_stride = row_stride(width, bits_per_pixel)?;
        let frame_size = row_stride
            .checked_mul(height as usize)
            .ok_or(CaptureError::BufferOverflow)?;
        let header_size =
            FILE_HEADER_LEN + INFO_HEADER_LEN + palette_entries(bits_per_pixel) * PALETTE_ENTRY_LEN;
        let total = header_size
            .checked_add(frame_size)
            .ok_or(CaptureError::BufferOverflow)?;
        // The file header stores the total size in 32 bits.
        if u32::try_from(total).is_err() {
            return Err(CaptureError::BufferOverflow);
        }

        Ok(Self {
            width,
            height,
            bits_per_pixel,
            row_stride,
            header_size,
            frame_size,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bits_per_pixel(&self) -> u16 {
        self.bits_per_pixel
    }

    pub fn row_stride(&self) -> usize {
        self.row_stride
    }

    pub fn palette_entries(&self) -> usize {
        palette_entries(self.bits_per_pixel)
    }

    pub fn palette_len(&self) -> usize {
        self.palette_entries() * PALETTE_ENTRY_LEN
    }

    /// File header + info header + palette.
    pub fn header_size(&self) -> usize {
        self.header_size
    }

    /// Pixel payload size.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    pub fn file_size(&self) -> usize {
        self.header_size + self.frame_size
    }

    /// Append the file and info headers.
    pub fn put_headers(&self, buf: &mut BytesMut) {
        buf.put_u16_le(BMP_TAG);
        buf.put_u32_le(self.file_size() as u32);
        buf.put_u16_le(0);
        buf.put_u16_le(0);
        buf.put_u32_le(self.header_size as u32);

        buf.put_u32_le(INFO_HEADER_LEN as u32);
        buf.put_i32_le(self.width as i32);
        // Negative height marks top-down row order.
        buf.put_i32_le(-(self.height as i32));
        buf.put_u16_le(1);
        buf.put_u16_le(self.bits_per_pixel);
        buf.put_u32_le(BI_RGB);
        buf.put_u32_le(0);
        buf.put_i32_le(0);
        buf.put_i32_le(0);
        buf.put_u32_le(0);
        buf.put_u32_le(0);
    }

    /// Serialize one complete frame.
    ///
    /// `palette` must be [`palette_len`](Self::palette_len) bytes (empty
    /// above 8 bits per pixel) and `pixels` exactly
    /// [`frame_size`](Self::frame_size) bytes.
    pub fn encode(&self, palette: &[u8], pixels: &[u8]) -> CaptureResult<Bytes> {
        if palette.len() != self.palette_len() {
            return Err(CaptureError::Platform(anyhow::anyhow!(
                "palette length mismatch: got {}, expected {}",
                palette.len(),
                self.palette_len()
            )));
        }
        if pixels.len() != self.frame_size {
            return Err(CaptureError::Platform(anyhow::anyhow!(
                "pixel buffer length mismatch: got {}, expected {} for {}x{}x{}",
                pixels.len(),
                self.frame_size,
                self.width,
                self.height,
                self.bits_per_pixel
            )));
        }

        let mut buf = BytesMut::with_capacity(self.file_size());
        self.put_headers(&mut buf);
        buf.put_slice(palette);
        buf.put_slice(pixels);
        debug_assert_eq!(buf.len(), self.file_size());
        Ok(buf.freeze())
    }
}

fn palette_entries(bits_per_pixel: u16) -> usize {
    if bits_per_pixel <= 8 {
        1usize << bits_per_pixel
    } else {
        0
    }
}

//! Frame types for video, audio, and metadata.
//!
//! Captured frames wrap buffers the native runtime owns until they are
//! released. Each frame releases its buffer exactly once: explicitly via
//! [`crate::Receiver::free_frame`], or implicitly on drop as a backstop.
//! After release the descriptive fields remain readable but the data
//! accessors return empty slices.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use std::{borrow::Cow, ffi::CStr, fmt, slice};

use crate::{ndi_lib::*, receiver::Receiver, Error, Result};

/// Video pixel format identifiers (FourCC codes).
///
/// Marked `#[non_exhaustive]`: future runtime versions may report formats
/// this crate does not know. Always match with a wildcard arm.
#[derive(Debug, TryFromPrimitive, IntoPrimitive, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
#[repr(u32)]
pub enum PixelFormat {
    /// YCbCr 4:2:2 format (16 bits per pixel), bandwidth efficient.
    UYVY = NDIlib_FourCC_video_type_UYVY,
    /// YCbCr 4:2:2 with alpha channel.
    UYVA = NDIlib_FourCC_video_type_UYVA,
    /// 16-bit YCbCr 4:2:2 format.
    P216 = NDIlib_FourCC_video_type_P216,
    /// 16-bit YCbCr 4:2:2 with alpha.
    PA16 = NDIlib_FourCC_video_type_PA16,
    /// Planar YCbCr 4:2:0 format.
    YV12 = NDIlib_FourCC_video_type_YV12,
    /// Planar YCbCr 4:2:0 format.
    I420 = NDIlib_FourCC_video_type_I420,
    /// Semi-planar YCbCr 4:2:0 format.
    NV12 = NDIlib_FourCC_video_type_NV12,
    /// Blue-Green-Red-Alpha, 32 bits per pixel.
    BGRA = NDIlib_FourCC_video_type_BGRA,
    /// Blue-Green-Red with padding, 32 bits per pixel.
    BGRX = NDIlib_FourCC_video_type_BGRX,
    /// Red-Green-Blue-Alpha, 32 bits per pixel.
    RGBA = NDIlib_FourCC_video_type_RGBA,
    /// Red-Green-Blue with padding, 32 bits per pixel.
    RGBX = NDIlib_FourCC_video_type_RGBX,
}

/// Video scan type (progressive, interlaced, or field-based).
#[derive(Debug, TryFromPrimitive, IntoPrimitive, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
#[repr(u32)]
pub enum ScanType {
    /// Progressive scan, full frames rendered sequentially.
    Progressive = NDIlib_frame_format_type_progressive,
    /// Interlaced scan, alternating even/odd lines.
    Interlaced = NDIlib_frame_format_type_interleaved,
    /// Field 0 only (first field of interlaced content).
    Field0 = NDIlib_frame_format_type_field_0,
    /// Field 1 only (second field of interlaced content).
    Field1 = NDIlib_frame_format_type_field_1,
}

/// One unit of captured media.
///
/// Exactly one variant is populated per capture call; check the
/// discriminant before reading fields. `None` means the timeout elapsed
/// with nothing to deliver, an expected and frequent outcome when polling
/// a live stream.
#[derive(Debug, Default)]
pub enum Frame<'rx> {
    Video(VideoFrame<'rx>),
    Audio(AudioFrame<'rx>),
    Metadata(MetadataFrame<'rx>),
    #[default]
    None,
}

impl Frame<'_> {
    /// Returns `true` when the capture yielded nothing within its timeout.
    pub fn is_none(&self) -> bool {
        matches!(self, Frame::None)
    }

    /// The receiver this frame's buffer belongs to, if it wraps one.
    pub(crate) fn owner(&self) -> Option<&Receiver> {
        match self {
            Frame::Video(f) => f.recv,
            Frame::Audio(f) => f.recv,
            Frame::Metadata(f) => f.recv,
            Frame::None => None,
        }
    }

    /// Release the native buffer backing this frame.
    ///
    /// `Frame::None` is a no-op; a second release of the same frame fails
    /// with [`Error::DoubleRelease`] without touching native memory.
    pub(crate) fn release(&mut self) -> Result<()> {
        match self {
            Frame::Video(f) => f.release(),
            Frame::Audio(f) => f.release(),
            Frame::Metadata(f) => f.release(),
            Frame::None => Ok(()),
        }
    }
}

/// A captured video frame borrowing a native buffer.
pub struct VideoFrame<'rx> {
    raw: NDIlib_video_frame_v2_t,
    recv: Option<&'rx Receiver>,
    released: bool,
}

impl<'rx> VideoFrame<'rx> {
    /// Wrap a raw frame populated by a successful capture.
    ///
    /// `recv` is the receiver whose buffer this is; `None` means nothing
    /// owns native memory and release is bookkeeping only (used by unit
    /// tests that fabricate frames).
    ///
    /// # Safety
    ///
    /// `raw` must describe a live capture result: `p_data`, if non-null,
    /// points to at least `line_stride_in_bytes * yres` readable bytes
    /// until the frame is released.
    pub(crate) unsafe fn from_raw(
        raw: NDIlib_video_frame_v2_t,
        recv: Option<&'rx Receiver>,
    ) -> Self {
        Self {
            raw,
            recv,
            released: false,
        }
    }

    /// Frame width in pixels.
    pub fn width(&self) -> i32 {
        self.raw.xres
    }

    /// Frame height in pixels.
    pub fn height(&self) -> i32 {
        self.raw.yres
    }

    /// Bytes per row of video data.
    pub fn line_stride_bytes(&self) -> i32 {
        self.raw.line_stride_in_bytes
    }

    /// Pixel format, when the FourCC is one this crate knows.
    pub fn pixel_format(&self) -> Option<PixelFormat> {
        PixelFormat::try_from(self.raw.FourCC).ok()
    }

    /// The raw FourCC value as reported by the runtime.
    pub fn fourcc(&self) -> u32 {
        self.raw.FourCC
    }

    /// Frame rate as a (numerator, denominator) pair.
    pub fn frame_rate(&self) -> (i32, i32) {
        (self.raw.frame_rate_N, self.raw.frame_rate_D)
    }

    /// Scan type, when the reported value is one this crate knows.
    pub fn scan_type(&self) -> Option<ScanType> {
        ScanType::try_from(self.raw.frame_format_type).ok()
    }

    /// Stream timecode in 100ns units.
    pub fn timecode(&self) -> i64 {
        self.raw.timecode
    }

    /// Receive timestamp in 100ns units, or
    /// [`None`] when the runtime did not stamp the frame.
    pub fn timestamp(&self) -> Option<i64> {
        (self.raw.timestamp != NDIlib_recv_timestamp_undefined).then_some(self.raw.timestamp)
    }

    /// The pixel data, still owned by the native runtime.
    ///
    /// Empty once the frame has been released; reading after release is a
    /// contract violation and asserts in debug builds.
    pub fn data(&self) -> &[u8] {
        debug_assert!(!self.released, "video frame read after release");
        if self.data_len() == 0 {
            return &[];
        }
        // SAFETY: the runtime guarantees the buffer stays valid until the
        // matching free call, which the released flag gates.
        unsafe { slice::from_raw_parts(self.raw.p_data.cast::<u8>(), self.data_len()) }
    }

    fn data_len(&self) -> usize {
        if self.released || self.raw.p_data.is_null() {
            return 0;
        }
        (self.raw.line_stride_in_bytes.max(0) as usize) * (self.raw.yres.max(0) as usize)
    }

    /// Per-frame metadata attached by the sender, if any.
    pub fn metadata(&self) -> Option<Cow<'_, str>> {
        if self.released || self.raw.p_metadata.is_null() {
            return None;
        }
        // SAFETY: non-null metadata is a NUL-terminated string valid until
        // release.
        Some(unsafe { CStr::from_ptr(self.raw.p_metadata) }.to_string_lossy())
    }

    pub(crate) fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(Error::DoubleRelease);
        }
        if let Some(recv) = self.recv {
            recv.free_video_raw(&self.raw);
        }
        self.released = true;
        Ok(())
    }
}

impl Drop for VideoFrame<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Some(recv) = self.recv {
                recv.free_video_raw(&self.raw);
            }
        }
    }
}

impl fmt::Debug for VideoFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VideoFrame")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("pixel_format", &self.pixel_format())
            .field("frame_rate", &self.frame_rate())
            .field("scan_type", &self.scan_type())
            .field("data (bytes)", &self.data_len())
            .field("released", &self.released)
            .finish()
    }
}

/// A captured audio frame borrowing a native buffer.
///
/// Audio arrives as planar 32-bit float: one contiguous plane per channel,
/// `channel_stride_bytes` apart.
pub struct AudioFrame<'rx> {
    raw: NDIlib_audio_frame_v2_t,
    recv: Option<&'rx Receiver>,
    released: bool,
}

impl<'rx> AudioFrame<'rx> {
    /// # Safety
    ///
    /// `raw` must describe a live capture result; see
    /// [`VideoFrame::from_raw`].
    pub(crate) unsafe fn from_raw(
        raw: NDIlib_audio_frame_v2_t,
        recv: Option<&'rx Receiver>,
    ) -> Self {
        Self {
            raw,
            recv,
            released: false,
        }
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> i32 {
        self.raw.sample_rate
    }

    /// Number of audio channels.
    pub fn channels(&self) -> i32 {
        self.raw.no_channels
    }

    /// Number of samples per channel.
    pub fn samples(&self) -> i32 {
        self.raw.no_samples
    }

    /// Bytes between the start of consecutive channel planes.
    pub fn channel_stride_bytes(&self) -> i32 {
        self.raw.channel_stride_in_bytes
    }

    /// Stream timecode in 100ns units.
    pub fn timecode(&self) -> i64 {
        self.raw.timecode
    }

    /// Receive timestamp in 100ns units, when the runtime stamped the frame.
    pub fn timestamp(&self) -> Option<i64> {
        (self.raw.timestamp != NDIlib_recv_timestamp_undefined).then_some(self.raw.timestamp)
    }

    /// All channel planes as one float slice, still owned by the runtime.
    ///
    /// Empty once the frame has been released.
    pub fn data(&self) -> &[f32] {
        debug_assert!(!self.released, "audio frame read after release");
        if self.data_len() == 0 {
            return &[];
        }
        // SAFETY: planar layout, no_channels planes of stride bytes each,
        // valid until the matching free call.
        unsafe { slice::from_raw_parts(self.raw.p_data, self.data_len()) }
    }

    fn data_len(&self) -> usize {
        if self.released || self.raw.p_data.is_null() {
            return 0;
        }
        let stride_floats = self.raw.channel_stride_in_bytes.max(0) as usize / 4;
        stride_floats * self.raw.no_channels.max(0) as usize
    }

    /// The samples of one channel, or `None` for an out-of-range channel.
    pub fn channel_data(&self, channel: i32) -> Option<&[f32]> {
        if channel < 0 || channel >= self.raw.no_channels {
            return None;
        }
        let data = self.data();
        let stride_floats = self.raw.channel_stride_in_bytes.max(0) as usize / 4;
        let offset = channel as usize * stride_floats;
        let samples = self.raw.no_samples.max(0) as usize;
        data.get(offset..offset + samples)
    }

    pub(crate) fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(Error::DoubleRelease);
        }
        if let Some(recv) = self.recv {
            recv.free_audio_raw(&self.raw);
        }
        self.released = true;
        Ok(())
    }
}

impl Drop for AudioFrame<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Some(recv) = self.recv {
                recv.free_audio_raw(&self.raw);
            }
        }
    }
}

impl fmt::Debug for AudioFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFrame")
            .field("sample_rate", &self.sample_rate())
            .field("channels", &self.channels())
            .field("samples", &self.samples())
            .field("data (floats)", &self.data_len())
            .field("released", &self.released)
            .finish()
    }
}

/// A captured metadata frame (UTF-8 XML payload).
pub struct MetadataFrame<'rx> {
    raw: NDIlib_metadata_frame_t,
    recv: Option<&'rx Receiver>,
    released: bool,
}

impl<'rx> MetadataFrame<'rx> {
    /// # Safety
    ///
    /// `raw` must describe a live capture result; see
    /// [`VideoFrame::from_raw`].
    pub(crate) unsafe fn from_raw(
        raw: NDIlib_metadata_frame_t,
        recv: Option<&'rx Receiver>,
    ) -> Self {
        Self {
            raw,
            recv,
            released: false,
        }
    }

    /// Payload length in bytes, including the terminating NUL.
    pub fn length(&self) -> i32 {
        self.raw.length
    }

    /// Stream timecode in 100ns units.
    pub fn timecode(&self) -> i64 {
        self.raw.timecode
    }

    /// The metadata payload. Empty once the frame has been released.
    pub fn content(&self) -> Cow<'_, str> {
        debug_assert!(!self.released, "metadata frame read after release");
        if self.released || self.raw.p_data.is_null() {
            return Cow::Borrowed("");
        }
        // SAFETY: non-null payload is a NUL-terminated string valid until
        // release.
        unsafe { CStr::from_ptr(self.raw.p_data) }.to_string_lossy()
    }

    pub(crate) fn release(&mut self) -> Result<()> {
        if self.released {
            return Err(Error::DoubleRelease);
        }
        if let Some(recv) = self.recv {
            recv.free_metadata_raw(&self.raw);
        }
        self.released = true;
        Ok(())
    }
}

impl Drop for MetadataFrame<'_> {
    fn drop(&mut self) {
        if !self.released {
            if let Some(recv) = self.recv {
                recv.free_metadata_raw(&self.raw);
            }
        }
    }
}

impl fmt::Debug for MetadataFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataFrame")
            .field("length", &self.length())
            .field("timecode", &self.timecode())
            .field("released", &self.released)
            .finish()
    }
}

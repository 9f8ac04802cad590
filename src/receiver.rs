//! NDI receiving functionality for video, audio, and metadata.
//!
//! A [`Receiver`] is bound to one discovered source and yields frames
//! through a blocking capture call. The capture/release cycle is the heart
//! of the ownership handoff: the runtime owns every frame buffer until the
//! caller releases it, and each handle is destroyed exactly once when the
//! receiver drops.

use std::{ffi::CString, ptr};

use tracing::{debug, info, trace};

use crate::{
    finder::{RawSource, Source},
    frames::{AudioFrame, Frame, MetadataFrame, VideoFrame},
    ndi_lib::*,
    Error, Result, NDI,
};

/// Color format preference for received video frames.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverColorFormat {
    /// BGRX/BGRA output, the most widely supported.
    #[default]
    BGRX_BGRA,
    /// UYVY for opaque video, BGRA when alpha is present.
    UYVY_BGRA,
    /// RGBX/RGBA output.
    RGBX_RGBA,
    /// UYVY for opaque video, RGBA when alpha is present.
    UYVY_RGBA,
    /// Whatever format is cheapest for the runtime to produce.
    Fastest,
    /// Whatever format preserves the most fidelity.
    Best,
}

impl From<ReceiverColorFormat> for NDIlib_recv_color_format_e {
    fn from(format: ReceiverColorFormat) -> Self {
        match format {
            ReceiverColorFormat::BGRX_BGRA => NDIlib_recv_color_format_BGRX_BGRA,
            ReceiverColorFormat::UYVY_BGRA => NDIlib_recv_color_format_UYVY_BGRA,
            ReceiverColorFormat::RGBX_RGBA => NDIlib_recv_color_format_RGBX_RGBA,
            ReceiverColorFormat::UYVY_RGBA => NDIlib_recv_color_format_UYVY_RGBA,
            ReceiverColorFormat::Fastest => NDIlib_recv_color_format_fastest,
            ReceiverColorFormat::Best => NDIlib_recv_color_format_best,
        }
    }
}

/// Bandwidth class for a receiver connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverBandwidth {
    /// Metadata only, no audio or video.
    MetadataOnly,
    /// Audio only.
    AudioOnly,
    /// Reduced-bandwidth preview quality.
    Lowest,
    /// Full stream quality.
    #[default]
    Highest,
}

impl From<ReceiverBandwidth> for NDIlib_recv_bandwidth_e {
    fn from(bandwidth: ReceiverBandwidth) -> Self {
        match bandwidth {
            ReceiverBandwidth::MetadataOnly => NDIlib_recv_bandwidth_metadata_only,
            ReceiverBandwidth::AudioOnly => NDIlib_recv_bandwidth_audio_only,
            ReceiverBandwidth::Lowest => NDIlib_recv_bandwidth_lowest,
            ReceiverBandwidth::Highest => NDIlib_recv_bandwidth_highest,
        }
    }
}

/// Configuration for creating a [`Receiver`] bound to one source.
#[derive(Debug, Default, Clone)]
pub struct ReceiverOptions {
    /// The discovered source to connect to.
    pub source: Source,
    /// Preferred color format for video frames.
    pub color_format: ReceiverColorFormat,
    /// Bandwidth class of the connection.
    pub bandwidth: ReceiverBandwidth,
    /// Whether fielded (interlaced) video may be delivered as fields.
    pub allow_video_fields: bool,
    /// Diagnostic name for this receiver, visible to the source.
    pub name: Option<String>,
}

impl ReceiverOptions {
    /// Create a builder for configuring a receiver bound to `source`.
    pub fn builder(source: Source) -> ReceiverOptionsBuilder {
        ReceiverOptionsBuilder::new(source)
    }

    /// Convert to raw format for FFI use. The holder keeps the source and
    /// name CStrings alive for as long as the raw struct borrows them.
    pub(crate) fn to_raw(&self) -> Result<RawRecvCreate> {
        let source = self.source.to_raw()?;
        let name = self
            .name
            .as_deref()
            .map(CString::new)
            .transpose()
            .map_err(Error::InvalidCString)?;

        let p_ndi_recv_name = name.as_ref().map_or(ptr::null(), |n| n.as_ptr());
        let source_raw = source.raw;

        Ok(RawRecvCreate {
            raw: NDIlib_recv_create_v3_t {
                source_to_connect_to: source_raw,
                color_format: self.color_format.into(),
                bandwidth: self.bandwidth.into(),
                allow_video_fields: self.allow_video_fields,
                p_ndi_recv_name,
            },
            _source: source,
            _name: name,
        })
    }
}

/// Builder for configuring ReceiverOptions with ergonomic method chaining
#[derive(Debug, Clone)]
pub struct ReceiverOptionsBuilder {
    source: Source,
    color_format: Option<ReceiverColorFormat>,
    bandwidth: Option<ReceiverBandwidth>,
    allow_video_fields: Option<bool>,
    name: Option<String>,
}

impl ReceiverOptionsBuilder {
    /// Create a new builder with the specified source
    pub fn new(source: Source) -> Self {
        Self {
            source,
            color_format: None,
            bandwidth: None,
            allow_video_fields: None,
            name: None,
        }
    }

    /// Set the color format for received video
    #[must_use]
    pub fn color(mut self, format: ReceiverColorFormat) -> Self {
        self.color_format = Some(format);
        self
    }

    /// Set the bandwidth class for the receiver
    #[must_use]
    pub fn bandwidth(mut self, bandwidth: ReceiverBandwidth) -> Self {
        self.bandwidth = Some(bandwidth);
        self
    }

    /// Configure whether to allow fielded video
    #[must_use]
    pub fn allow_video_fields(mut self, allow: bool) -> Self {
        self.allow_video_fields = Some(allow);
        self
    }

    /// Set the diagnostic name for this receiver
    #[must_use]
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Build the ReceiverOptions
    #[must_use]
    pub fn build(self) -> ReceiverOptions {
        ReceiverOptions {
            source: self.source,
            color_format: self.color_format.unwrap_or_default(),
            bandwidth: self.bandwidth.unwrap_or_default(),
            allow_video_fields: self.allow_video_fields.unwrap_or(true),
            name: self.name,
        }
    }
}

// Holds the CStrings so their pointers stay valid while the raw struct is
// passed to the runtime.
pub(crate) struct RawRecvCreate {
    _source: RawSource,
    _name: Option<CString>,
    pub raw: NDIlib_recv_create_v3_t,
}

/// Receives frames from one NDI source.
///
/// The receiver moves through `Created → (capturing ⇄ idle) → Destroyed`.
/// [`Receiver::capture`] blocks for up to its timeout, so run the capture
/// loop on a worker thread (see the crate docs for the stop-flag pattern).
/// Destruction is `Drop`: the borrow checker guarantees no capture call or
/// unreleased frame is still borrowing the receiver when the native object
/// is freed.
///
/// # Examples
///
/// ```no_run
/// # use ndi_bridge::{NDI, Finder, FinderOptions, Frame, ReceiverOptions, Receiver};
/// # fn main() -> Result<(), ndi_bridge::Error> {
/// # let ndi = NDI::new()?;
/// # let finder = Finder::new(&ndi, &FinderOptions::default())?;
/// let source = finder.sources(5000).into_iter().next().expect("no sources");
/// let options = ReceiverOptions::builder(source).name("bridge-rx").build();
/// let receiver = Receiver::new(&ndi, &options)?;
///
/// let mut frame = receiver.capture(1000)?;
/// if let Frame::Video(video) = &frame {
///     println!("{}x{}", video.width(), video.height());
/// }
/// receiver.free_frame(&mut frame)?;
/// # Ok(())
/// # }
/// ```
pub struct Receiver {
    instance: NDIlib_recv_instance_t,
    session: NDI,
}

impl Receiver {
    /// Creates a receiver bound to the given source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NativeCreateFailed`] if the runtime returns a null
    /// receiver handle.
    pub fn new(ndi: &NDI, options: &ReceiverOptions) -> Result<Self> {
        let create = options.to_raw()?;

        // SAFETY: the create struct and its strings outlive this call; the
        // runtime connects to the source named in it.
        let instance = unsafe { (ndi.funcs().recv_create_v3)(&create.raw) };
        if instance.is_null() {
            return Err(Error::NativeCreateFailed("NDIlib_recv_create_v3"));
        }

        info!(source = %options.source, "created NDI receiver");
        Ok(Self {
            instance,
            session: ndi.clone(),
        })
    }

    /// Captures the next frame, blocking for up to `timeout_ms`
    /// milliseconds.
    ///
    /// Exactly one frame kind is populated per call. A timeout yields
    /// [`Frame::None`], which is an expected, frequent outcome when polling
    /// a live stream, not an error. Status-change notifications carry no
    /// buffer and are also reported as [`Frame::None`].
    ///
    /// Every Video/Audio/Metadata frame must be handed back through
    /// [`Receiver::free_frame`] (or dropped, which releases it as a
    /// backstop) before the runtime reuses its buffer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CaptureFailed`] when the runtime reports an error
    /// frame, typically a lost connection.
    pub fn capture(&self, timeout_ms: u32) -> Result<Frame<'_>> {
        let mut video = NDIlib_video_frame_v2_t::default();
        let mut audio = NDIlib_audio_frame_v2_t::default();
        let mut metadata = NDIlib_metadata_frame_t::default();

        // SAFETY: the out-params live across the call and the SDK documents
        // recv capture as thread-safe on a live instance.
        let frame_type = unsafe {
            (self.session.funcs().recv_capture_v2)(
                self.instance,
                &mut video,
                &mut audio,
                &mut metadata,
                timeout_ms,
            )
        };

        match frame_type {
            NDIlib_frame_type_video => {
                trace!(
                    width = video.xres,
                    height = video.yres,
                    "captured video frame"
                );
                // SAFETY: the runtime populated `video` for this instance.
                Ok(Frame::Video(unsafe {
                    VideoFrame::from_raw(video, Some(self))
                }))
            }
            NDIlib_frame_type_audio => {
                trace!(samples = audio.no_samples, "captured audio frame");
                // SAFETY: the runtime populated `audio` for this instance.
                Ok(Frame::Audio(unsafe {
                    AudioFrame::from_raw(audio, Some(self))
                }))
            }
            NDIlib_frame_type_metadata => {
                trace!(length = metadata.length, "captured metadata frame");
                // SAFETY: the runtime populated `metadata` for this instance.
                Ok(Frame::Metadata(unsafe {
                    MetadataFrame::from_raw(metadata, Some(self))
                }))
            }
            NDIlib_frame_type_none => {
                trace!(timeout_ms, "capture timed out with no frame");
                Ok(Frame::None)
            }
            NDIlib_frame_type_status_change => Ok(Frame::None),
            NDIlib_frame_type_error => Err(Error::CaptureFailed(
                "runtime reported an error frame".into(),
            )),
            other => Err(Error::CaptureFailed(format!(
                "unknown frame type: {other}"
            ))),
        }
    }

    /// Releases a captured frame's native buffer back to the runtime.
    ///
    /// Dispatches on the frame's discriminant to the matching native free
    /// operation. Releasing [`Frame::None`] is a no-op. Releasing the same
    /// frame twice fails with [`Error::DoubleRelease`], and a frame captured
    /// by a different receiver fails with [`Error::InvalidHandle`]; in
    /// neither case is a stale pointer forwarded into native memory.
    pub fn free_frame(&self, frame: &mut Frame<'_>) -> Result<()> {
        if let Some(owner) = frame.owner() {
            if !ptr::eq(owner, self) {
                return Err(Error::InvalidHandle(
                    "frame was captured by a different receiver",
                ));
            }
        }
        frame.release()
    }

    pub(crate) fn free_video_raw(&self, raw: &NDIlib_video_frame_v2_t) {
        // SAFETY: `raw` came from a capture on this instance and is freed
        // exactly once; the released flag in the frame wrapper gates this.
        unsafe { (self.session.funcs().recv_free_video_v2)(self.instance, raw) };
    }

    pub(crate) fn free_audio_raw(&self, raw: &NDIlib_audio_frame_v2_t) {
        // SAFETY: as for free_video_raw.
        unsafe { (self.session.funcs().recv_free_audio_v2)(self.instance, raw) };
    }

    pub(crate) fn free_metadata_raw(&self, raw: &NDIlib_metadata_frame_t) {
        // Runtimes that omit the metadata free own the buffer lifecycle
        // themselves; bookkeeping in the frame wrapper still applies.
        if let Some(free_metadata) = &self.session.funcs().recv_free_metadata {
            // SAFETY: as for free_video_raw.
            unsafe { free_metadata(self.instance, raw) };
        }
    }
}

impl Drop for Receiver {
    fn drop(&mut self) {
        // SAFETY: single-owner handle, destroyed exactly once; captured
        // frames borrow the receiver, so none can be alive here.
        unsafe { (self.session.funcs().recv_destroy)(self.instance) };
        debug!("destroyed NDI receiver");
    }
}

/// # Safety
///
/// The NDI SDK documents recv operations as thread-safe with internal
/// synchronization. The Receiver only holds the opaque handle returned by
/// the runtime plus a session handle.
unsafe impl Send for Receiver {}

/// # Safety
///
/// Capture and free entry points are internally synchronized by the SDK, so
/// a shared Receiver may be used from multiple threads.
unsafe impl Sync for Receiver {}

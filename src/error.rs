//! Error types for the ndi-bridge library.

use std::ffi::NulError;
use thiserror::Error;

/// The main error type for NDI operations.
///
/// Binding and session errors are definite failures for the current attempt;
/// the caller decides whether to retry `NDI::new()`. An empty source list and
/// a capture timeout are values ([`Vec::new`] / [`crate::Frame::None`]), not
/// errors.
#[derive(Debug, Error)]
pub enum Error {
    /// The NDI runtime library could not be loaded.
    ///
    /// Carries the loader's diagnostic for the last candidate path tried.
    #[error("failed to load the NDI runtime library: {reason}")]
    LibraryNotFound { reason: String },

    /// A mandatory entry point is missing from the loaded library.
    ///
    /// The library is unloaded before this is returned; no half-initialized
    /// runtime handle survives.
    #[error("NDI runtime is missing the '{name}' entry point")]
    MissingSymbol { name: &'static str },

    /// `NDIlib_initialize` reported failure.
    ///
    /// Typically means the CPU or platform is unsupported by the runtime.
    #[error("NDI runtime refused to initialize")]
    InitializationFailed,

    /// An operation required an open session but none exists.
    #[error("NDI runtime is not initialized")]
    SessionNotReady,

    /// The native library returned a null handle from a create call.
    #[error("NDI runtime returned a null handle from {0}")]
    NativeCreateFailed(&'static str),

    /// An operation was handed a handle it does not own.
    #[error("invalid handle: {0}")]
    InvalidHandle(&'static str),

    /// A frame was released more than once.
    #[error("frame has already been released")]
    DoubleRelease,

    /// The runtime reported an error frame during capture.
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),

    /// Failed to create a C string due to interior null bytes.
    #[error("invalid CString: {0}")]
    InvalidCString(#[from] NulError),
}

//! Runtime-loaded Rust bindings for NDI® source discovery and frame capture.
//!
//! This crate talks to a vendor-supplied NDI runtime that is loaded at
//! process start rather than linked at build time: the shared library is
//! opened by its platform-conventional name, every required entry point is
//! resolved by symbol and validated up front, and only then are protocol
//! objects created. The native protocol engine stays the vendor's; this
//! layer makes crossing into it safe.
//!
//! # Quick Start
//!
//! ```no_run
//! use ndi_bridge::{NDI, FinderOptions, Finder, ReceiverOptions, Receiver, Frame};
//!
//! # fn main() -> Result<(), ndi_bridge::Error> {
//! // Load the runtime and initialize the protocol
//! let ndi = NDI::new()?;
//!
//! // Discover sources on the network
//! let options = FinderOptions::builder().show_local_sources(true).build();
//! let finder = Finder::new(&ndi, &options)?;
//! let sources = finder.sources(5000);
//!
//! for source in &sources {
//!     println!("Found: {}", source);
//! }
//!
//! // Bind a receiver to the first source and capture
//! let source = sources.into_iter().next().expect("no sources visible");
//! let receiver = Receiver::new(&ndi, &ReceiverOptions::builder(source).build())?;
//!
//! let mut frame = receiver.capture(1000)?;
//! match &frame {
//!     Frame::Video(video) => println!("video {}x{}", video.width(), video.height()),
//!     Frame::Audio(audio) => println!("audio {} samples", audio.samples()),
//!     Frame::Metadata(meta) => println!("metadata: {}", meta.content()),
//!     Frame::None => println!("timeout"),
//! }
//! receiver.free_frame(&mut frame)?;
//! # Ok(())
//! # }
//! ```
//!
//! # Core Concepts
//!
//! ## Runtime Management
//!
//! The [`NDI`] struct manages the runtime lifecycle. The first handle loads
//! the library and resolves the full entry-point surface — a missing library
//! or symbol fails the open with a specific reason before any protocol call
//! is attempted. The last handle to drop tears everything down; nothing
//! stays loaded across `open → close` cycles.
//!
//! ## Source Discovery
//!
//! Use [`Finder`] to poll for sources currently visible on the network.
//! Zero visible sources is a normal result, not an error.
//!
//! ## Receiving
//!
//! The [`Receiver`] type is bound to one source and yields [`Frame`]s from
//! a blocking capture call. Frame buffers belong to the native runtime
//! until released; release each frame exactly once via
//! [`Receiver::free_frame`], or let the frame's drop return the buffer as a
//! backstop.
//!
//! # Blocking and Threads
//!
//! [`Finder::sources`] and [`Receiver::capture`] genuinely block the
//! calling thread for up to their timeout, so keep them off
//! latency-sensitive threads. The intended shape is one worker per active
//! receiver running a sequential capture/release loop with a cooperative
//! stop flag — capture calls cannot be interrupted mid-call, so
//! cancellation latency is bounded by the in-flight timeout:
//!
//! ```no_run
//! # use std::sync::{Arc, atomic::{AtomicBool, Ordering}};
//! # use ndi_bridge::{NDI, Receiver, ReceiverOptions, Frame, Source};
//! # fn main() -> Result<(), ndi_bridge::Error> {
//! # let ndi = NDI::new()?;
//! # let source = Source::default();
//! let receiver = Receiver::new(&ndi, &ReceiverOptions::builder(source).build())?;
//! let stop = Arc::new(AtomicBool::new(false));
//!
//! let worker = {
//!     let stop = stop.clone();
//!     std::thread::spawn(move || -> Result<(), ndi_bridge::Error> {
//!         while !stop.load(Ordering::Relaxed) {
//!             let mut frame = receiver.capture(250)?;
//!             if let Frame::Video(video) = &frame {
//!                 // hand pixels to the renderer here
//!                 let _ = video.data();
//!             }
//!             receiver.free_frame(&mut frame)?;
//!         }
//!         Ok(())
//!     })
//! };
//!
//! stop.store(true, Ordering::Relaxed);
//! worker.join().expect("worker panicked")?;
//! # Ok(())
//! # }
//! ```
//!
//! Finders and receivers are `Send + Sync`; destruction is `Drop`, and the
//! borrow checker refuses to destroy a handle while a capture or an
//! unreleased frame still borrows it.
//!
//! # Diagnostics
//!
//! Every lifecycle event — bind success/failure, session open/close, handle
//! create/destroy, source counts, capture timeouts — is emitted through
//! [`tracing`] with a stable message shape. The crate installs no
//! subscriber; that is the host application's concern.

#![allow(non_camel_case_types)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

// Internal modules
mod error;
mod ndi_lib;

// Public modules
pub mod finder;
pub mod frames;
pub mod receiver;
pub mod runtime;

// Re-exports
pub use {
    error::*,
    finder::{Finder, FinderOptions, FinderOptionsBuilder, Source, UNKNOWN_SOURCE_NAME},
    frames::{AudioFrame, Frame, MetadataFrame, PixelFormat, ScanType, VideoFrame},
    receiver::{
        Receiver, ReceiverBandwidth, ReceiverColorFormat, ReceiverOptions, ReceiverOptionsBuilder,
    },
    runtime::NDI,
};

/// Alias for Result with our Error type
pub type Result<T> = std::result::Result<T, crate::error::Error>;

// Tests
#[cfg(test)]
#[path = "tests.rs"]
mod tests;

//! NDI source discovery and network browsing.

use std::{
    ffi::{CStr, CString},
    fmt::{self, Display, Formatter},
    ptr,
};

use tracing::{debug, info};

use crate::{ndi_lib::*, Error, Result, NDI};

/// Name substituted for a discovered source whose native record carries no
/// name. A missing address becomes the empty string.
pub const UNKNOWN_SOURCE_NAME: &str = "Unknown source";

/// Configuration for NDI source discovery.
///
/// Use the builder pattern to create instances with specific settings.
///
/// # Examples
///
/// ```
/// use ndi_bridge::FinderOptions;
///
/// // Find all sources including local ones
/// let options = FinderOptions::builder()
///     .show_local_sources(true)
///     .build();
///
/// // Find sources in specific groups
/// let options = FinderOptions::builder()
///     .groups("Public,Studio")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct FinderOptions {
    /// Whether to include local sources in discovery.
    pub show_local_sources: bool,
    /// Comma-separated list of groups to search (e.g., "Public,Private").
    pub groups: Option<String>,
    /// Additional IP addresses or ranges to search.
    pub extra_ips: Option<String>,
}

impl FinderOptions {
    /// Create a builder for configuring find options
    pub fn builder() -> FinderOptionsBuilder {
        FinderOptionsBuilder::new()
    }

    /// Convert to raw format for FFI use. The returned holder keeps the
    /// CStrings alive for as long as the raw struct borrows their pointers.
    pub(crate) fn to_raw(&self) -> Result<RawFinderCreate> {
        let groups = self
            .groups
            .as_deref()
            .map(CString::new)
            .transpose()
            .map_err(Error::InvalidCString)?;
        let extra_ips = self
            .extra_ips
            .as_deref()
            .map(CString::new)
            .transpose()
            .map_err(Error::InvalidCString)?;

        let raw = NDIlib_find_create_t {
            show_local_sources: self.show_local_sources,
            p_groups: groups.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
            p_extra_ips: extra_ips.as_ref().map_or(ptr::null(), |s| s.as_ptr()),
        };

        Ok(RawFinderCreate {
            _groups: groups,
            _extra_ips: extra_ips,
            raw,
        })
    }
}

/// Builder for configuring FinderOptions with ergonomic method chaining
#[derive(Debug, Clone)]
pub struct FinderOptionsBuilder {
    show_local_sources: Option<bool>,
    groups: Option<String>,
    extra_ips: Option<String>,
}

impl FinderOptionsBuilder {
    /// Creates a new builder with default settings.
    ///
    /// Default settings:
    /// - `show_local_sources`: `true`
    /// - `groups`: `None` (search all groups)
    /// - `extra_ips`: `None` (no additional IPs)
    pub fn new() -> Self {
        Self {
            show_local_sources: None,
            groups: None,
            extra_ips: None,
        }
    }

    /// Configure whether to show local sources
    #[must_use]
    pub fn show_local_sources(mut self, show: bool) -> Self {
        self.show_local_sources = Some(show);
        self
    }

    /// Set the groups to search
    #[must_use]
    pub fn groups<S: Into<String>>(mut self, groups: S) -> Self {
        self.groups = Some(groups.into());
        self
    }

    /// Set extra IPs to search
    #[must_use]
    pub fn extra_ips<S: Into<String>>(mut self, ips: S) -> Self {
        self.extra_ips = Some(ips.into());
        self
    }

    /// Build the FinderOptions
    #[must_use]
    pub fn build(self) -> FinderOptions {
        FinderOptions {
            show_local_sources: self.show_local_sources.unwrap_or(true),
            groups: self.groups,
            extra_ips: self.extra_ips,
        }
    }
}

impl Default for FinderOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// Holds the CStrings so their pointers stay valid while the raw struct is
// passed to the runtime.
pub(crate) struct RawFinderCreate {
    _groups: Option<CString>,
    _extra_ips: Option<CString>,
    pub raw: NDIlib_find_create_t,
}

/// Represents an NDI source discovered on the network.
///
/// A caller-owned copy of the native record: the name (typically
/// "MACHINE (Source Name)") and the network address. Once returned from
/// [`Finder::sources`] it has no remaining relationship to native memory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Source {
    /// The NDI source name (e.g., "MACHINE (Source Name)").
    pub name: String,
    /// The network address for connecting to this source; empty when the
    /// runtime reported none.
    pub address: String,
}

// This struct holds the CStrings to ensure they live as long as needed
pub(crate) struct RawSource {
    _name: CString,
    _address: Option<CString>,
    pub raw: NDIlib_source_t,
}

impl Source {
    /// Copy a foreign-owned native record into a caller-owned value.
    ///
    /// The record's strings are only valid for the duration of the poll
    /// call that produced them; nothing of the pointers survives here. A
    /// null name becomes [`UNKNOWN_SOURCE_NAME`], a null address the empty
    /// string.
    ///
    /// # Safety
    ///
    /// Non-null pointers in `raw` must point to valid NUL-terminated
    /// strings.
    pub(crate) unsafe fn from_raw(raw: &NDIlib_source_t) -> Self {
        let name = if raw.p_ndi_name.is_null() {
            UNKNOWN_SOURCE_NAME.to_owned()
        } else {
            CStr::from_ptr(raw.p_ndi_name).to_string_lossy().into_owned()
        };
        let address = if raw.p_url_address.is_null() {
            String::new()
        } else {
            CStr::from_ptr(raw.p_url_address)
                .to_string_lossy()
                .into_owned()
        };

        Source { name, address }
    }

    /// Convert to raw format for FFI use, for binding a receiver to this
    /// source. The holder keeps the CStrings alive alongside the raw struct.
    pub(crate) fn to_raw(&self) -> Result<RawSource> {
        let name = CString::new(self.name.clone()).map_err(Error::InvalidCString)?;
        let address = if self.address.is_empty() {
            None
        } else {
            Some(CString::new(self.address.clone()).map_err(Error::InvalidCString)?)
        };

        let p_ndi_name = name.as_ptr();
        let p_url_address = address.as_ref().map_or(ptr::null(), |s| s.as_ptr());

        Ok(RawSource {
            _name: name,
            _address: address,
            raw: NDIlib_source_t {
                p_ndi_name,
                p_url_address,
            },
        })
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.address.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}@{}", self.name, self.address)
        }
    }
}

/// Discovers NDI sources on the network.
///
/// Wraps a native finder instance. [`Finder::sources`] blocks for up to the
/// supplied timeout, so run it off any latency-sensitive thread; the finder
/// keeps its session alive, so it can be moved freely to a worker.
///
/// # Examples
///
/// ```no_run
/// # use ndi_bridge::{NDI, FinderOptions, Finder};
/// # fn main() -> Result<(), ndi_bridge::Error> {
/// let ndi = NDI::new()?;
/// let options = FinderOptions::builder().show_local_sources(true).build();
/// let finder = Finder::new(&ndi, &options)?;
///
/// for source in finder.sources(5000) {
///     println!("Found: {}", source);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Finder {
    instance: NDIlib_find_instance_t,
    session: NDI,
}

impl Finder {
    /// Creates a new source finder with the specified settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NativeCreateFailed`] if the runtime returns a null
    /// finder handle.
    pub fn new(ndi: &NDI, options: &FinderOptions) -> Result<Self> {
        let create = options.to_raw()?;

        // SAFETY: the create struct and its strings outlive this call.
        let instance = unsafe { (ndi.funcs().find_create_v2)(&create.raw) };
        if instance.is_null() {
            return Err(Error::NativeCreateFailed("NDIlib_find_create_v2"));
        }

        info!(
            show_local_sources = options.show_local_sources,
            "created NDI finder"
        );
        Ok(Self {
            instance,
            session: ndi.clone(),
        })
    }

    /// Polls for the sources currently visible on the network.
    ///
    /// Blocks for up to `timeout_ms` milliseconds waiting for the source
    /// list, then copies each native record into an owned [`Source`]. An
    /// empty vec is a normal outcome, not an error; sources come and go as
    /// they are announced and withdrawn. No reference into the native list
    /// is retained past this call.
    ///
    /// Runtimes that lack `NDIlib_find_wait_for_sources` return the current
    /// snapshot immediately regardless of `timeout_ms`.
    pub fn sources(&self, timeout_ms: u32) -> Vec<Source> {
        let funcs = self.session.funcs();

        // SAFETY: the instance is live for as long as self exists; the SDK
        // documents find operations as thread-safe.
        if let Some(wait_for_sources) = &funcs.find_wait_for_sources {
            if timeout_ms > 0 {
                let changed = unsafe { wait_for_sources(self.instance, timeout_ms) };
                if !changed {
                    debug!(timeout_ms, "source list unchanged within timeout");
                }
            }
        }

        let mut num_sources = 0u32;
        let sources_ptr =
            unsafe { (funcs.find_get_current_sources)(self.instance, &mut num_sources) };
        if sources_ptr.is_null() || num_sources == 0 {
            debug!("no NDI sources currently visible");
            return Vec::new();
        }

        // The native list is owned by the finder and only valid until the
        // next poll; copy every record out before returning.
        let sources = unsafe {
            (0..num_sources as usize)
                .map(|i| Source::from_raw(&*sources_ptr.add(i)))
                .collect::<Vec<_>>()
        };

        info!(count = sources.len(), "discovered NDI sources");
        sources
    }
}

impl Drop for Finder {
    fn drop(&mut self) {
        // SAFETY: single-owner handle; this is the only destroy call, and
        // the borrow checker has already ended any in-flight poll borrows.
        unsafe { (self.session.funcs().find_destroy)(self.instance) };
        debug!("destroyed NDI finder");
    }
}

/// # Safety
///
/// The NDI SDK documents find operations as thread-safe. The Finder only
/// holds the opaque handle returned by the runtime plus a session handle,
/// and performs no unsynchronized mutation.
unsafe impl Send for Finder {}

/// # Safety
///
/// The SDK handles synchronization of concurrent find calls internally, so
/// a shared Finder may be polled from multiple threads.
unsafe impl Sync for Finder {}

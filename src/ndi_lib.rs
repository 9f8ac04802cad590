//! Vendor ABI declarations and the runtime-loaded function table.
//!
//! The NDI runtime is not linked at build time. [`FunctionTable::bind`] opens
//! the shared library by its platform-conventional name and resolves every
//! required entry point by symbol name, failing with a specific reason if the
//! library is absent or the surface is incomplete. Struct layouts below match
//! the vendor's documented ABI; field order and types are load-bearing.

#![allow(non_camel_case_types, non_upper_case_globals, non_snake_case)]

use std::os::raw::{c_char, c_float, c_int, c_void};

#[cfg(unix)]
use libloading::os::unix::{Library, Symbol};
#[cfg(windows)]
use libloading::os::windows::{Library, Symbol};

use tracing::{debug, info};

use crate::{Error, Result};

#[cfg(all(target_arch = "x86_64", target_os = "windows"))]
const LIBRARY_NAMES: &[&str] = &["Processing.NDI.Lib.x64.dll"];
#[cfg(all(target_arch = "x86", target_os = "windows"))]
const LIBRARY_NAMES: &[&str] = &["Processing.NDI.Lib.x86.dll"];
#[cfg(any(target_os = "linux", target_os = "android"))]
const LIBRARY_NAMES: &[&str] = &["libndi.so.6", "libndi.so.5", "libndi.so"];
#[cfg(target_os = "macos")]
const LIBRARY_NAMES: &[&str] = &["libndi.dylib"];
#[cfg(all(unix, not(any(target_os = "linux", target_os = "android", target_os = "macos"))))]
const LIBRARY_NAMES: &[&str] = &["libndi.so"];

/// Directories searched before the system loader path, newest SDK first.
const ENV_VARS: &[&str] = &["NDI_RUNTIME_DIR_V6", "NDI_RUNTIME_DIR_V5", ""];

pub type NDIlib_find_instance_t = *mut c_void;
pub type NDIlib_recv_instance_t = *mut c_void;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_find_create_t {
    pub show_local_sources: bool,
    pub p_groups: *const c_char,
    pub p_extra_ips: *const c_char,
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_source_t {
    pub p_ndi_name: *const c_char,
    pub p_url_address: *const c_char,
}

pub type NDIlib_recv_bandwidth_e = i32;

pub const NDIlib_recv_bandwidth_metadata_only: NDIlib_recv_bandwidth_e = -10;
pub const NDIlib_recv_bandwidth_audio_only: NDIlib_recv_bandwidth_e = 10;
pub const NDIlib_recv_bandwidth_lowest: NDIlib_recv_bandwidth_e = 0;
pub const NDIlib_recv_bandwidth_highest: NDIlib_recv_bandwidth_e = 100;

pub type NDIlib_recv_color_format_e = u32;

pub const NDIlib_recv_color_format_BGRX_BGRA: NDIlib_recv_color_format_e = 0;
pub const NDIlib_recv_color_format_UYVY_BGRA: NDIlib_recv_color_format_e = 1;
pub const NDIlib_recv_color_format_RGBX_RGBA: NDIlib_recv_color_format_e = 2;
pub const NDIlib_recv_color_format_UYVY_RGBA: NDIlib_recv_color_format_e = 3;
pub const NDIlib_recv_color_format_fastest: NDIlib_recv_color_format_e = 100;
pub const NDIlib_recv_color_format_best: NDIlib_recv_color_format_e = 101;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_recv_create_v3_t {
    pub source_to_connect_to: NDIlib_source_t,
    pub color_format: NDIlib_recv_color_format_e,
    pub bandwidth: NDIlib_recv_bandwidth_e,
    pub allow_video_fields: bool,
    pub p_ndi_recv_name: *const c_char,
}

// The frame-type discriminant crosses the boundary from a runtime we never
// linked against, so it stays a plain integer; an unexpected value must be
// matchable, not undefined behavior.
pub type NDIlib_frame_type_e = i32;

pub const NDIlib_frame_type_none: NDIlib_frame_type_e = 0;
pub const NDIlib_frame_type_video: NDIlib_frame_type_e = 1;
pub const NDIlib_frame_type_audio: NDIlib_frame_type_e = 2;
pub const NDIlib_frame_type_metadata: NDIlib_frame_type_e = 3;
pub const NDIlib_frame_type_error: NDIlib_frame_type_e = 4;
pub const NDIlib_frame_type_status_change: NDIlib_frame_type_e = 100;

pub const fn make_fourcc(fourcc: &[u8; 4]) -> u32 {
    (fourcc[0] as u32)
        | ((fourcc[1] as u32) << 8)
        | ((fourcc[2] as u32) << 16)
        | ((fourcc[3] as u32) << 24)
}

pub type NDIlib_FourCC_video_type_e = u32;
pub const NDIlib_FourCC_video_type_UYVY: NDIlib_FourCC_video_type_e = make_fourcc(b"UYVY");
pub const NDIlib_FourCC_video_type_UYVA: NDIlib_FourCC_video_type_e = make_fourcc(b"UYVA");
pub const NDIlib_FourCC_video_type_P216: NDIlib_FourCC_video_type_e = make_fourcc(b"P216");
pub const NDIlib_FourCC_video_type_PA16: NDIlib_FourCC_video_type_e = make_fourcc(b"PA16");
pub const NDIlib_FourCC_video_type_YV12: NDIlib_FourCC_video_type_e = make_fourcc(b"YV12");
pub const NDIlib_FourCC_video_type_I420: NDIlib_FourCC_video_type_e = make_fourcc(b"I420");
pub const NDIlib_FourCC_video_type_NV12: NDIlib_FourCC_video_type_e = make_fourcc(b"NV12");
pub const NDIlib_FourCC_video_type_BGRA: NDIlib_FourCC_video_type_e = make_fourcc(b"BGRA");
pub const NDIlib_FourCC_video_type_BGRX: NDIlib_FourCC_video_type_e = make_fourcc(b"BGRX");
pub const NDIlib_FourCC_video_type_RGBA: NDIlib_FourCC_video_type_e = make_fourcc(b"RGBA");
pub const NDIlib_FourCC_video_type_RGBX: NDIlib_FourCC_video_type_e = make_fourcc(b"RGBX");

pub type NDIlib_frame_format_type_e = u32;

pub const NDIlib_frame_format_type_progressive: NDIlib_frame_format_type_e = 1;
pub const NDIlib_frame_format_type_interleaved: NDIlib_frame_format_type_e = 0;
pub const NDIlib_frame_format_type_field_0: NDIlib_frame_format_type_e = 2;
pub const NDIlib_frame_format_type_field_1: NDIlib_frame_format_type_e = 3;

pub const NDIlib_recv_timestamp_undefined: i64 = i64::MAX;

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_video_frame_v2_t {
    pub xres: c_int,
    pub yres: c_int,
    pub FourCC: NDIlib_FourCC_video_type_e,
    pub frame_rate_N: c_int,
    pub frame_rate_D: c_int,
    pub picture_aspect_ratio: c_float,
    pub frame_format_type: NDIlib_frame_format_type_e,
    pub timecode: i64,
    pub p_data: *const c_char,
    pub line_stride_in_bytes: c_int,
    pub p_metadata: *const c_char,
    pub timestamp: i64,
}

impl Default for NDIlib_video_frame_v2_t {
    fn default() -> Self {
        // All-zero bits are a valid capture out-parameter; the runtime fills
        // every field it populates.
        unsafe { std::mem::zeroed() }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_audio_frame_v2_t {
    pub sample_rate: c_int,
    pub no_channels: c_int,
    pub no_samples: c_int,
    pub timecode: i64,
    pub p_data: *const c_float,
    pub channel_stride_in_bytes: c_int,
    pub p_metadata: *const c_char,
    pub timestamp: i64,
}

impl Default for NDIlib_audio_frame_v2_t {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone)]
pub struct NDIlib_metadata_frame_t {
    pub length: c_int,
    pub timecode: i64,
    pub p_data: *const c_char,
}

impl Default for NDIlib_metadata_frame_t {
    fn default() -> Self {
        unsafe { std::mem::zeroed() }
    }
}

/// Mandatory entry points, critical-path symbols first so a broken runtime
/// fails fastest.
pub(crate) const MANDATORY_SYMBOLS: [&str; 10] = [
    "NDIlib_initialize",
    "NDIlib_find_create_v2",
    "NDIlib_recv_create_v3",
    "NDIlib_destroy",
    "NDIlib_find_destroy",
    "NDIlib_find_get_current_sources",
    "NDIlib_recv_destroy",
    "NDIlib_recv_capture_v2",
    "NDIlib_recv_free_video_v2",
    "NDIlib_recv_free_audio_v2",
];

/// Resolved entry points of the loaded NDI runtime.
///
/// A table is either complete (every mandatory symbol resolved) or it is
/// never constructed; no partially-usable table escapes
/// [`FunctionTable::bind`]. Immutable after construction. Dropping the table
/// unloads the library.
#[allow(clippy::type_complexity)]
pub(crate) struct FunctionTable {
    _library: Library,
    pub initialize: Symbol<unsafe extern "C" fn() -> bool>,
    pub destroy: Symbol<unsafe extern "C" fn()>,
    pub find_create_v2:
        Symbol<unsafe extern "C" fn(*const NDIlib_find_create_t) -> NDIlib_find_instance_t>,
    pub find_destroy: Symbol<unsafe extern "C" fn(NDIlib_find_instance_t)>,
    pub find_get_current_sources:
        Symbol<unsafe extern "C" fn(NDIlib_find_instance_t, *mut u32) -> *const NDIlib_source_t>,
    pub recv_create_v3:
        Symbol<unsafe extern "C" fn(*const NDIlib_recv_create_v3_t) -> NDIlib_recv_instance_t>,
    pub recv_destroy: Symbol<unsafe extern "C" fn(NDIlib_recv_instance_t)>,
    pub recv_capture_v2: Symbol<
        unsafe extern "C" fn(
            NDIlib_recv_instance_t,
            *mut NDIlib_video_frame_v2_t,
            *mut NDIlib_audio_frame_v2_t,
            *mut NDIlib_metadata_frame_t,
            u32,
        ) -> NDIlib_frame_type_e,
    >,
    pub recv_free_video_v2:
        Symbol<unsafe extern "C" fn(NDIlib_recv_instance_t, *const NDIlib_video_frame_v2_t)>,
    pub recv_free_audio_v2:
        Symbol<unsafe extern "C" fn(NDIlib_recv_instance_t, *const NDIlib_audio_frame_v2_t)>,
    // Present in every shipping runtime but outside the mandatory surface;
    // callers degrade gracefully when these are absent.
    pub find_wait_for_sources:
        Option<Symbol<unsafe extern "C" fn(NDIlib_find_instance_t, u32) -> bool>>,
    pub recv_free_metadata:
        Option<Symbol<unsafe extern "C" fn(NDIlib_recv_instance_t, *const NDIlib_metadata_frame_t)>>,
}

impl FunctionTable {
    /// Load the NDI runtime and resolve its entry points.
    ///
    /// Search order: `NDI_RUNTIME_DIR_V6`, then `NDI_RUNTIME_DIR_V5`, then
    /// the system loader path, each tried against the platform library
    /// names. If no candidate loads, fails with [`Error::LibraryNotFound`]
    /// carrying the loader diagnostic. If any mandatory symbol is missing,
    /// fails with [`Error::MissingSymbol`]; the half-resolved library is
    /// dropped (unloaded) before returning.
    pub(crate) fn bind() -> Result<Self> {
        use std::env;
        use std::path::PathBuf;

        let mut library = None;
        let mut last_error = String::new();

        'outer: for env_var in ENV_VARS {
            let library_directory = if env_var.is_empty() {
                None
            } else {
                match env::var_os(env_var) {
                    Some(dir) => Some(dir),
                    None => continue,
                }
            };

            for library_name in LIBRARY_NAMES {
                let library_path = match &library_directory {
                    Some(dir) => {
                        let mut path = PathBuf::from(dir);
                        path.push(library_name);
                        path
                    }
                    None => PathBuf::from(library_name),
                };

                // SAFETY: loading the vendor runtime runs its initializers;
                // that is the entire point of this crate.
                match unsafe { Library::new(&library_path) } {
                    Ok(lib) => {
                        info!(path = %library_path.display(), "loaded NDI runtime");
                        library = Some(lib);
                        break 'outer;
                    }
                    Err(err) => {
                        debug!(
                            path = %library_path.display(),
                            error = %err,
                            "NDI runtime candidate did not load"
                        );
                        last_error = err.to_string();
                    }
                }
            }
        }

        let Some(library) = library else {
            return Err(Error::LibraryNotFound { reason: last_error });
        };

        macro_rules! load_symbol {
            ($name:ident) => {
                // SAFETY: the symbol types above are the vendor's documented
                // C signatures for these entry points.
                match unsafe { library.get(stringify!($name).as_bytes()) } {
                    Ok(symbol) => symbol,
                    Err(_) => {
                        return Err(Error::MissingSymbol {
                            name: stringify!($name),
                        })
                    }
                }
            };
        }

        macro_rules! try_symbol {
            ($name:ident) => {
                unsafe { library.get(stringify!($name).as_bytes()) }.ok()
            };
        }

        // Literal order is evaluation order: critical-path symbols resolve
        // first, matching MANDATORY_SYMBOLS.
        let table = FunctionTable {
            initialize: load_symbol!(NDIlib_initialize),
            find_create_v2: load_symbol!(NDIlib_find_create_v2),
            recv_create_v3: load_symbol!(NDIlib_recv_create_v3),
            destroy: load_symbol!(NDIlib_destroy),
            find_destroy: load_symbol!(NDIlib_find_destroy),
            find_get_current_sources: load_symbol!(NDIlib_find_get_current_sources),
            recv_destroy: load_symbol!(NDIlib_recv_destroy),
            recv_capture_v2: load_symbol!(NDIlib_recv_capture_v2),
            recv_free_video_v2: load_symbol!(NDIlib_recv_free_video_v2),
            recv_free_audio_v2: load_symbol!(NDIlib_recv_free_audio_v2),
            find_wait_for_sources: try_symbol!(NDIlib_find_wait_for_sources),
            recv_free_metadata: try_symbol!(NDIlib_recv_free_metadata),
            _library: library,
        };

        debug!(
            mandatory = MANDATORY_SYMBOLS.len(),
            wait_for_sources = table.find_wait_for_sources.is_some(),
            free_metadata = table.recv_free_metadata.is_some(),
            "resolved NDI entry points"
        );
        Ok(table)
    }
}

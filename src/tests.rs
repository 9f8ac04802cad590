//! Unit tests for the ndi-bridge library.
//!
//! Frames are fabricated from raw structs with no owning receiver, so the
//! suite exercises the ownership bookkeeping without requiring an NDI
//! runtime to be installed.

use std::ffi::CString;

use crate::{
    error::Error,
    finder::{FinderOptions, Source, UNKNOWN_SOURCE_NAME},
    frames::{AudioFrame, Frame, MetadataFrame, PixelFormat, ScanType, VideoFrame},
    ndi_lib::*,
    receiver::{ReceiverBandwidth, ReceiverColorFormat, ReceiverOptions},
    NDI,
};

fn test_video_raw(width: i32, height: i32, stride: i32, data: &[u8]) -> NDIlib_video_frame_v2_t {
    let mut raw = NDIlib_video_frame_v2_t::default();
    raw.xres = width;
    raw.yres = height;
    raw.line_stride_in_bytes = stride;
    raw.FourCC = NDIlib_FourCC_video_type_BGRA;
    raw.frame_rate_N = 30;
    raw.frame_rate_D = 1;
    raw.frame_format_type = NDIlib_frame_format_type_progressive;
    raw.timestamp = NDIlib_recv_timestamp_undefined;
    raw.p_data = data.as_ptr().cast();
    raw
}

#[test]
fn test_error_display() {
    let err = Error::LibraryNotFound {
        reason: "libndi.so: cannot open shared object file".into(),
    };
    assert!(err.to_string().contains("cannot open shared object file"));

    let err = Error::MissingSymbol {
        name: "NDIlib_recv_capture_v2",
    };
    assert!(err.to_string().contains("NDIlib_recv_capture_v2"));

    let err = Error::NativeCreateFailed("NDIlib_find_create_v2");
    assert!(err.to_string().contains("NDIlib_find_create_v2"));

    assert_eq!(
        Error::DoubleRelease.to_string(),
        "frame has already been released"
    );
}

#[test]
fn test_finder_options_builder_defaults() {
    let options = FinderOptions::builder().build();
    assert!(options.show_local_sources);
    assert!(options.groups.is_none());
    assert!(options.extra_ips.is_none());

    let options = FinderOptions::builder()
        .show_local_sources(false)
        .groups("Public,Studio")
        .extra_ips("192.168.1.0/24")
        .build();
    assert!(!options.show_local_sources);
    assert_eq!(options.groups.as_deref(), Some("Public,Studio"));
    assert_eq!(options.extra_ips.as_deref(), Some("192.168.1.0/24"));
}

#[test]
fn test_finder_options_to_raw() {
    let options = FinderOptions::builder().build();
    let create = options.to_raw().unwrap();
    assert!(create.raw.show_local_sources);
    assert!(create.raw.p_groups.is_null());
    assert!(create.raw.p_extra_ips.is_null());

    let options = FinderOptions::builder().groups("Public").build();
    let create = options.to_raw().unwrap();
    assert!(!create.raw.p_groups.is_null());
    assert!(create.raw.p_extra_ips.is_null());
}

#[test]
fn test_source_from_raw_substitutes_missing_fields() {
    let name = CString::new("CAMERA1 (Chan1)").unwrap();
    let address = CString::new("192.168.0.107:5961").unwrap();

    let raw = NDIlib_source_t {
        p_ndi_name: name.as_ptr(),
        p_url_address: address.as_ptr(),
    };
    let source = unsafe { Source::from_raw(&raw) };
    assert_eq!(source.name, "CAMERA1 (Chan1)");
    assert_eq!(source.address, "192.168.0.107:5961");

    // A record with no name gets the documented placeholder, a record with
    // no address the empty string.
    let raw = NDIlib_source_t {
        p_ndi_name: std::ptr::null(),
        p_url_address: std::ptr::null(),
    };
    let source = unsafe { Source::from_raw(&raw) };
    assert_eq!(source.name, UNKNOWN_SOURCE_NAME);
    assert_eq!(source.address, "");
}

#[test]
fn test_source_to_raw_round_trip() {
    let source = Source {
        name: "STUDIO (Main)".into(),
        address: "192.168.0.42:5961".into(),
    };
    let raw = source.to_raw().unwrap();
    assert!(!raw.raw.p_ndi_name.is_null());
    assert!(!raw.raw.p_url_address.is_null());

    let round_tripped = unsafe { Source::from_raw(&raw.raw) };
    assert_eq!(round_tripped, source);

    // An empty address maps back to a null pointer, not an empty string.
    let source = Source {
        name: "LOCAL".into(),
        address: String::new(),
    };
    let raw = source.to_raw().unwrap();
    assert!(raw.raw.p_url_address.is_null());
}

#[test]
fn test_source_display() {
    let source = Source {
        name: "CAMERA1".into(),
        address: "192.168.0.107:5961".into(),
    };
    assert_eq!(source.to_string(), "CAMERA1@192.168.0.107:5961");

    let source = Source {
        name: "CAMERA1".into(),
        address: String::new(),
    };
    assert_eq!(source.to_string(), "CAMERA1");
}

#[test]
fn test_receiver_options_builder_defaults() {
    let options = ReceiverOptions::builder(Source::default()).build();
    assert_eq!(options.color_format, ReceiverColorFormat::BGRX_BGRA);
    assert_eq!(options.bandwidth, ReceiverBandwidth::Highest);
    assert!(options.allow_video_fields);
    assert!(options.name.is_none());
}

#[test]
fn test_receiver_options_to_raw() {
    let source = Source {
        name: "CAMERA1".into(),
        address: "192.168.0.107:5961".into(),
    };
    let options = ReceiverOptions::builder(source)
        .bandwidth(ReceiverBandwidth::Lowest)
        .color(ReceiverColorFormat::UYVY_BGRA)
        .allow_video_fields(false)
        .name("bridge-rx")
        .build();

    let create = options.to_raw().unwrap();
    assert_eq!(create.raw.bandwidth, NDIlib_recv_bandwidth_lowest);
    assert_eq!(create.raw.color_format, NDIlib_recv_color_format_UYVY_BGRA);
    assert!(!create.raw.allow_video_fields);
    assert!(!create.raw.p_ndi_recv_name.is_null());
    assert!(!create.raw.source_to_connect_to.p_ndi_name.is_null());

    // No diagnostic name means a null pointer in the create struct.
    let options = ReceiverOptions::builder(Source::default()).build();
    let create = options.to_raw().unwrap();
    assert!(create.raw.p_ndi_recv_name.is_null());
}

#[test]
fn test_bandwidth_and_color_raw_values() {
    assert_eq!(
        NDIlib_recv_bandwidth_e::from(ReceiverBandwidth::MetadataOnly),
        -10
    );
    assert_eq!(NDIlib_recv_bandwidth_e::from(ReceiverBandwidth::AudioOnly), 10);
    assert_eq!(NDIlib_recv_bandwidth_e::from(ReceiverBandwidth::Lowest), 0);
    assert_eq!(NDIlib_recv_bandwidth_e::from(ReceiverBandwidth::Highest), 100);

    assert_eq!(
        NDIlib_recv_color_format_e::from(ReceiverColorFormat::BGRX_BGRA),
        0
    );
    assert_eq!(
        NDIlib_recv_color_format_e::from(ReceiverColorFormat::Fastest),
        100
    );
}

#[test]
fn test_video_frame_field_extraction() {
    let data = vec![0u8; (1920 * 4 * 1080) as usize];
    let raw = test_video_raw(1920, 1080, 1920 * 4, &data);

    let frame = unsafe { VideoFrame::from_raw(raw, None) };
    assert_eq!(frame.width(), 1920);
    assert_eq!(frame.height(), 1080);
    assert_eq!(frame.line_stride_bytes(), 1920 * 4);
    assert_eq!(frame.pixel_format(), Some(PixelFormat::BGRA));
    assert_eq!(frame.frame_rate(), (30, 1));
    assert_eq!(frame.scan_type(), Some(ScanType::Progressive));
    assert_eq!(frame.timestamp(), None);
    assert_eq!(frame.data().len(), 1920 * 4 * 1080);
}

#[test]
fn test_video_frame_double_release_rejected() {
    let data = vec![0u8; 64 * 4 * 16];
    let raw = test_video_raw(64, 16, 64 * 4, &data);

    let mut frame = Frame::Video(unsafe { VideoFrame::from_raw(raw, None) });
    assert!(frame.release().is_ok());
    assert!(matches!(frame.release(), Err(Error::DoubleRelease)));
    // Dropping after an explicit release must not free a second time.
    drop(frame);
}

#[test]
fn test_none_frame_release_is_noop() {
    let mut frame = Frame::None;
    assert!(frame.is_none());
    assert!(frame.release().is_ok());
    assert!(frame.release().is_ok());
}

#[test]
fn test_video_frame_null_data_is_empty() {
    let mut raw = NDIlib_video_frame_v2_t::default();
    raw.xres = 640;
    raw.yres = 480;
    raw.line_stride_in_bytes = 640 * 4;

    let frame = unsafe { VideoFrame::from_raw(raw, None) };
    assert!(frame.data().is_empty());
}

#[test]
fn test_audio_frame_channel_data() {
    // 2 channels, 3 samples, planes padded to 4 floats (16-byte stride).
    let data: Vec<f32> = vec![1.0, 2.0, 3.0, 0.0, 4.0, 5.0, 6.0, 0.0];
    let mut raw = NDIlib_audio_frame_v2_t::default();
    raw.sample_rate = 48000;
    raw.no_channels = 2;
    raw.no_samples = 3;
    raw.channel_stride_in_bytes = 16;
    raw.timestamp = NDIlib_recv_timestamp_undefined;
    raw.p_data = data.as_ptr();

    let frame = unsafe { AudioFrame::from_raw(raw, None) };
    assert_eq!(frame.sample_rate(), 48000);
    assert_eq!(frame.channels(), 2);
    assert_eq!(frame.samples(), 3);
    assert_eq!(frame.data().len(), 8);

    assert_eq!(frame.channel_data(0).unwrap(), &[1.0, 2.0, 3.0]);
    assert_eq!(frame.channel_data(1).unwrap(), &[4.0, 5.0, 6.0]);
    assert!(frame.channel_data(2).is_none());
    assert!(frame.channel_data(-1).is_none());
}

#[test]
fn test_audio_frame_double_release_rejected() {
    let data: Vec<f32> = vec![0.0; 4];
    let mut raw = NDIlib_audio_frame_v2_t::default();
    raw.no_channels = 1;
    raw.no_samples = 4;
    raw.channel_stride_in_bytes = 16;
    raw.p_data = data.as_ptr();

    let mut frame = Frame::Audio(unsafe { AudioFrame::from_raw(raw, None) });
    assert!(frame.release().is_ok());
    assert!(matches!(frame.release(), Err(Error::DoubleRelease)));
}

#[test]
fn test_metadata_frame_content() {
    let payload = CString::new("<ndi_tally on_program=\"true\"/>").unwrap();
    let mut raw = NDIlib_metadata_frame_t::default();
    raw.length = payload.as_bytes_with_nul().len() as i32;
    raw.timecode = 7;
    raw.p_data = payload.as_ptr();

    let mut frame = unsafe { MetadataFrame::from_raw(raw, None) };
    assert_eq!(frame.content(), "<ndi_tally on_program=\"true\"/>");
    assert_eq!(frame.timecode(), 7);

    assert!(frame.release().is_ok());
    assert!(matches!(frame.release(), Err(Error::DoubleRelease)));
}

#[test]
fn test_pixel_format_fourcc_values() {
    assert_eq!(u32::from(PixelFormat::BGRA), make_fourcc(b"BGRA"));
    assert_eq!(u32::from(PixelFormat::UYVY), make_fourcc(b"UYVY"));
    assert_eq!(
        PixelFormat::try_from(make_fourcc(b"RGBA")).unwrap(),
        PixelFormat::RGBA
    );
    // An unknown FourCC is not undefined behavior, just unrecognized.
    assert!(PixelFormat::try_from(make_fourcc(b"ZZZZ")).is_err());
}

#[test]
fn test_scan_type_values() {
    assert_eq!(u32::from(ScanType::Progressive), 1);
    assert_eq!(u32::from(ScanType::Interlaced), 0);
    assert_eq!(ScanType::try_from(2).unwrap(), ScanType::Field0);
    assert_eq!(ScanType::try_from(3).unwrap(), ScanType::Field1);
}

#[test]
fn test_mandatory_symbol_list() {
    assert_eq!(MANDATORY_SYMBOLS.len(), 10);
    // Critical-path entry points resolve first so a broken runtime fails
    // fastest.
    assert_eq!(MANDATORY_SYMBOLS[0], "NDIlib_initialize");
    assert_eq!(MANDATORY_SYMBOLS[1], "NDIlib_find_create_v2");
    assert_eq!(MANDATORY_SYMBOLS[2], "NDIlib_recv_create_v3");
    assert!(MANDATORY_SYMBOLS.contains(&"NDIlib_recv_capture_v2"));
    assert!(MANDATORY_SYMBOLS.contains(&"NDIlib_recv_free_video_v2"));
    assert!(MANDATORY_SYMBOLS.contains(&"NDIlib_recv_free_audio_v2"));
}

/// Session open/close lifecycle, with or without an installed runtime.
///
/// The only test that touches the process-wide session state, so it owns
/// the whole open/close sequence.
#[test]
fn test_session_lifecycle() {
    match NDI::new() {
        Ok(ndi) => {
            assert!(NDI::is_running());

            // Attaching and cloning share the session.
            let attached = NDI::current().unwrap();
            let cloned = ndi.clone();
            drop(attached);
            drop(cloned);
            assert!(NDI::is_running());

            drop(ndi);
            assert!(!NDI::is_running());

            // A second open/close cycle starts from a clean slate.
            let ndi = NDI::new().unwrap();
            assert!(NDI::is_running());
            drop(ndi);
            assert!(!NDI::is_running());
        }
        Err(err) => {
            // No runtime on this machine: the failure is a definite,
            // enumerable reason and nothing stays loaded.
            assert!(matches!(
                err,
                Error::LibraryNotFound { .. }
                    | Error::MissingSymbol { .. }
                    | Error::InitializationFailed
            ));
            assert!(!NDI::is_running());
        }
    }

    // With no session open, attach fails rather than initializing one.
    assert!(matches!(NDI::current(), Err(Error::SessionNotReady)));
}

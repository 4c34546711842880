#![allow(non_upper_case_globals)]

use camhub_core::pixel_format::{FourCC, SampleFormat};
use camhub_core::traits::FormatRepresentation;
use windows::core::GUID;
use windows::Win32::Foundation::RECT;
use windows::Win32::Graphics::Gdi::BITMAPINFOHEADER;

// DirectShow 的媒体类型 GUID (uuids.h)
pub const MEDIATYPE_Video: GUID = GUID::from_u128(0x73646976_0000_0010_8000_00aa00389b71);
pub const MEDIASUBTYPE_RGB24: GUID = GUID::from_u128(0xe436eb7d_524f_11ce_9f53_0020af0ba770);
pub const MEDIASUBTYPE_MJPG: GUID = GUID::from_u128(0x47504a4d_0000_0010_8000_00aa00389b71);
pub const FORMAT_VideoInfo: GUID = GUID::from_u128(0x05589f80_c356_11ce_bf01_00aa0055595a);
pub const FORMAT_VideoInfo2: GUID = GUID::from_u128(0xf72a76a0_eb0a_11d0_ace4_0000c0cc16ba);
pub const PIN_CATEGORY_CAPTURE: GUID = GUID::from_u128(0xfb6c4281_0353_11d1_905f_0000c0cc16ba);
pub const PIN_CATEGORY_PREVIEW: GUID = GUID::from_u128(0xfb6c4282_0353_11d1_905f_0000c0cc16ba);

/// amvideo.h 中的 VIDEOINFOHEADER
#[repr(C)]
#[derive(Clone, Copy)]
pub struct VideoInfoHeader {
    pub source: RECT,
    pub target: RECT,
    pub bit_rate: u32,
    pub bit_error_rate: u32,
    pub avg_time_per_frame: i64,
    pub bmi_header: BITMAPINFOHEADER,
}

pub fn representation(format_type: &GUID) -> FormatRepresentation {
    match *format_type {
        FORMAT_VideoInfo => FormatRepresentation::VideoInfo,
        FORMAT_VideoInfo2 => FormatRepresentation::VideoInfo2,
        _ => FormatRepresentation::Other,
    }
}

/// biCompression 就是编码的 FourCC；未压缩 RGB 为 0 (BI_RGB)
pub fn fourcc_from_compression(compression: u32) -> FourCC {
    FourCC(compression)
}

/// 采样器输出使用的子类型
pub fn sample_subtype(format: SampleFormat) -> GUID {
    match format {
        SampleFormat::Jpeg => MEDIASUBTYPE_MJPG,
        SampleFormat::Bgr24 => MEDIASUBTYPE_RGB24,
    }
}

pub fn pin_category(pin: camhub_core::capability::PinCategory) -> GUID {
    match pin {
        camhub_core::capability::PinCategory::Capture => PIN_CATEGORY_CAPTURE,
        camhub_core::capability::PinCategory::Preview => PIN_CATEGORY_PREVIEW,
    }
}

use camhub_core::error::{CameraError, Result};
use camhub_core::traits::{FormatRepresentation, StreamCaps, StreamConfig};
use std::mem::{size_of, ManuallyDrop};
use windows::Win32::Media::DirectShow::{IAMStreamConfig, VIDEO_STREAM_CONFIG_CAPS};
use windows::Win32::Media::MediaFoundation::AM_MEDIA_TYPE;
use windows::Win32::System::Com::CoTaskMemFree;

use crate::hresult_error;
use crate::pixel_map::{self, VideoInfoHeader, FORMAT_VideoInfo};

/// 释放 AM_MEDIA_TYPE 内部分配的格式块与 pUnk (FreeMediaType)
pub(crate) unsafe fn free_media_type_fields(mt: &mut AM_MEDIA_TYPE) {
    if mt.cbFormat != 0 && !mt.pbFormat.is_null() {
        CoTaskMemFree(Some(mt.pbFormat as *const _));
    }
    mt.cbFormat = 0;
    mt.pbFormat = std::ptr::null_mut();
    drop(ManuallyDrop::take(&mut mt.pUnk));
}

/// 读取基本表示的视频头；其他表示返回 None
pub(crate) unsafe fn video_info(mt: &AM_MEDIA_TYPE) -> Option<&mut VideoInfoHeader> {
    if mt.formattype != FORMAT_VideoInfo
        || mt.pbFormat.is_null()
        || (mt.cbFormat as usize) < size_of::<VideoInfoHeader>()
    {
        return None;
    }
    Some(&mut *(mt.pbFormat as *mut VideoInfoHeader))
}

/// GetStreamCaps 分配的媒体类型 (DeleteMediaType on drop)
struct MediaType(*mut AM_MEDIA_TYPE);

impl MediaType {
    fn get(&self) -> &AM_MEDIA_TYPE {
        unsafe { &*self.0 }
    }
}

impl Drop for MediaType {
    fn drop(&mut self) {
        if self.0.is_null() {
            return;
        }
        unsafe {
            free_media_type_fields(&mut *self.0);
            CoTaskMemFree(Some(self.0 as *const _));
        }
    }
}

pub struct DshowStreamConfig {
    config: IAMStreamConfig,
}

unsafe impl Send for DshowStreamConfig {}

impl DshowStreamConfig {
    pub fn new(config: IAMStreamConfig) -> Self {
        Self { config }
    }

    fn read_caps(&self, index: u32) -> Result<(MediaType, VIDEO_STREAM_CONFIG_CAPS)> {
        let mut caps = VIDEO_STREAM_CONFIG_CAPS::default();
        let mut mt: *mut AM_MEDIA_TYPE = std::ptr::null_mut();
        unsafe {
            self.config
                .GetStreamCaps(index as i32, &mut mt, &mut caps as *mut _ as *mut u8)
                .map_err(hresult_error)?;
        }
        if mt.is_null() {
            return Err(CameraError::InvalidConfigHandle(index as i32));
        }
        Ok((MediaType(mt), caps))
    }
}

impl StreamConfig for DshowStreamConfig {
    fn capability_count(&self) -> Result<u32> {
        let (mut count, mut size) = (0i32, 0i32);
        unsafe {
            self.config
                .GetNumberOfCapabilities(&mut count, &mut size)
                .map_err(hresult_error)?;
        }
        // 视频引脚的能力结构必须是 VIDEO_STREAM_CONFIG_CAPS
        if size as usize != size_of::<VIDEO_STREAM_CONFIG_CAPS>() {
            return Err(CameraError::EnumerationUnavailable(format!(
                "unexpected stream capability size {size}"
            )));
        }
        Ok(count.max(0) as u32)
    }

    fn stream_caps(&self, index: u32) -> Result<StreamCaps> {
        let (mt, caps) = self.read_caps(index)?;
        let media = mt.get();

        let mut out = StreamCaps {
            index,
            representation: pixel_map::representation(&media.formattype),
            width: 0,
            height: 0,
            color_depth: 0,
            fourcc: Default::default(),
            min_interval: caps.MinFrameInterval,
            max_interval: caps.MaxFrameInterval,
            interval: 0,
        };
        if out.representation == FormatRepresentation::VideoInfo {
            if let Some(vih) = unsafe { video_info(media) } {
                out.width = vih.bmi_header.biWidth;
                out.height = vih.bmi_header.biHeight;
                out.color_depth = vih.bmi_header.biBitCount;
                out.fourcc = pixel_map::fourcc_from_compression(vih.bmi_header.biCompression);
                out.interval = vih.avg_time_per_frame;
            }
        }
        Ok(out)
    }

    fn set_format(&self, caps: &StreamCaps) -> Result<()> {
        let (mt, _) = self.read_caps(caps.index)?;
        let media = mt.get();
        let vih = unsafe { video_info(media) }
            .ok_or_else(|| CameraError::NegotiationFailed("configuration has no VIDEOINFOHEADER".to_string()))?;
        vih.avg_time_per_frame = caps.interval;

        tracing::debug!(
            target: "camhub::dshow",
            index = caps.index,
            interval = caps.interval,
            "setting stream format"
        );
        unsafe { self.config.SetFormat(media).map_err(hresult_error) }
    }
}

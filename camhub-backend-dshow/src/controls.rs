use camhub_core::capability::{ControlFlags, PropertyRange};
use camhub_core::error::Result;
use camhub_core::traits::PropertyControl;
use windows::Win32::Media::DirectShow::{IAMCameraControl, IAMVideoProcAmp};

use crate::hresult_error;

/// IAMCameraControl / IAMVideoProcAmp 的统一封装 (两者方法签名一致)
pub enum DshowPropertyControl {
    Camera(IAMCameraControl),
    VideoProc(IAMVideoProcAmp),
}

unsafe impl Send for DshowPropertyControl {}

impl PropertyControl for DshowPropertyControl {
    fn range(&self, property: i32) -> Result<PropertyRange> {
        let (mut min, mut max, mut step, mut default, mut flags) = (0, 0, 0, 0, 0);
        unsafe {
            match self {
                Self::Camera(c) => c.GetRange(property, &mut min, &mut max, &mut step, &mut default, &mut flags),
                Self::VideoProc(v) => v.GetRange(property, &mut min, &mut max, &mut step, &mut default, &mut flags),
            }
        }
        .map_err(hresult_error)?;
        Ok(PropertyRange::from_platform(min, max, step, default, ControlFlags::from_bits_truncate(flags)))
    }

    fn get(&self, property: i32) -> Result<(i32, ControlFlags)> {
        let (mut value, mut flags) = (0, 0);
        unsafe {
            match self {
                Self::Camera(c) => c.Get(property, &mut value, &mut flags),
                Self::VideoProc(v) => v.Get(property, &mut value, &mut flags),
            }
        }
        .map_err(hresult_error)?;
        Ok((value, ControlFlags::from_bits_truncate(flags)))
    }

    fn set(&self, property: i32, value: i32, flags: ControlFlags) -> Result<()> {
        unsafe {
            match self {
                Self::Camera(c) => c.Set(property, value, flags.bits()),
                Self::VideoProc(v) => v.Set(property, value, flags.bits()),
            }
        }
        .map_err(hresult_error)
    }
}

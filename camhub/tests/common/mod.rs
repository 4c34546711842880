#![allow(dead_code)]

use camhub::{CameraProperty, ControlFlags, FourCC, PropertyRange, VideoProcProperty};
use camhub_simulation::{SimDevice, SimDriver};
use std::sync::{Arc, Mutex};

pub const WEBCAM: &str = "\\\\?\\usb#vid_046d&pid_082d#c920";

pub fn webcam(path: &str) -> SimDevice {
    let full = ControlFlags::AUTO | ControlFlags::MANUAL;
    SimDevice::new("HD Pro Webcam C920", path)
        .camera_property(CameraProperty::Focus, PropertyRange::from_platform(0, 250, 5, 0, full))
        .camera_property(CameraProperty::Zoom, PropertyRange::from_platform(100, 500, 1, 100, ControlFlags::MANUAL))
        .video_proc_property(VideoProcProperty::Brightness, PropertyRange::from_platform(0, 255, 1, 128, ControlFlags::MANUAL))
        .video_proc_property(VideoProcProperty::Gain, PropertyRange::from_platform(0, 255, 1, 0, full))
        .capture_config(1920, 1080, 16, FourCC::MJPG, 333_333, 10_000_000)
        .capture_config(640, 480, 16, FourCC::YUY2, 333_333, 10_000_000)
        .preview_config(640, 480, 16, FourCC::YUY2, 333_333, 10_000_000)
}

pub fn driver_with(devices: impl IntoIterator<Item = SimDevice>) -> SimDriver {
    devices.into_iter().fold(SimDriver::new(), SimDriver::with_device)
}

/// 收集交付的帧 (长度, 宽, 高, 是否压缩, 是否自底向上)
#[derive(Debug, Clone, Default)]
pub struct Collected(pub Arc<Mutex<Vec<(usize, u32, u32, bool, bool)>>>);

impl Collected {
    pub fn handler(&self) -> impl Fn(camhub::Frame<'_>) + Send + Sync + 'static {
        let frames = self.0.clone();
        move |frame: camhub::Frame<'_>| {
            frames.lock().unwrap().push((
                frame.data.len(),
                frame.width,
                frame.height,
                frame.is_compressed(),
                frame.bottom_up,
            ));
        }
    }

    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<(usize, u32, u32, bool, bool)> {
        self.0.lock().unwrap().last().copied()
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

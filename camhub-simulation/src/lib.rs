//! 仿真后端：在内存里模拟采集设备、属性控制、流配置与处理管线。
//!
//! [`SimDriver`] 可以克隆，所有克隆共享同一份设备状态；测试把一个克隆交给服务，
//! 再用另一个检查管线状态、注入帧与事件。

#![warn(missing_debug_implementations, rust_2018_idioms)]

mod device;
mod pipeline;

pub use device::{SimDevice, SimProperty};

use camhub_core::capability::{
    CameraProperty, Control, ControlFamily, ControlFlags, PinCategory, PropertyRange, VideoProcProperty,
};
use camhub_core::error::{CameraError, Result};
use camhub_core::event::EventCode;
use camhub_core::pixel_format::{FourCC, SampleFormat};
use camhub_core::traits::{DeviceMoniker, Driver, SampleCallback, StreamCaps};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// 仿真使用的平台错误码 (与 DirectShow 的 HRESULT 取值一致)
pub mod hresult {
    pub const E_FAIL: u32 = 0x8000_4005;
    pub const E_NOINTERFACE: u32 = 0x8000_4002;
    pub const E_INVALIDARG: u32 = 0x8007_0057;
    pub const E_PROP_ID_UNSUPPORTED: u32 = 0x8007_0490;
    pub const ERROR_GEN_FAILURE: u32 = 0x8007_001F;
    pub const VFW_E_INVALIDMEDIATYPE: u32 = 0x8004_0200;
    pub const VFW_E_NOT_CONNECTED: u32 = 0x8004_0209;
    pub const VFW_E_CANNOT_CONNECT: u32 = 0x8004_0217;
    pub const VFW_E_WRONG_STATE: u32 = 0x8004_0227;
}

pub(crate) fn platform_error(code: u32, message: &str) -> CameraError {
    CameraError::platform(code as i64, message)
}

/// 一次管线构建过程中记录下来的状态
#[derive(Debug, Default)]
pub(crate) struct PipelineState {
    pub(crate) format: Option<SampleFormat>,
    pub(crate) buffer_samples: Option<bool>,
    pub(crate) clock_disabled: bool,
    pub(crate) discard_sink: bool,
    pub(crate) rendered: Option<PinCategory>,
    pub(crate) callback: Option<Weak<dyn SampleCallback>>,
    pub(crate) running: bool,
    pub(crate) events: VecDeque<EventCode>,
    /// 图对象还被持有；释放后采样器不再交付
    pub(crate) graph_held: bool,
}

#[derive(Debug)]
pub(crate) struct DeviceState {
    pub(crate) profile: SimDevice,
    /// 每创建一个管线加一；旧管线的句柄因此失效
    pub(crate) generation: u64,
    pub(crate) negotiated: Option<(PinCategory, StreamCaps)>,
    pub(crate) pipeline: PipelineState,
}

#[derive(Debug)]
pub(crate) struct World {
    pub(crate) available: bool,
    pub(crate) devices: Vec<DeviceState>,
}

#[derive(Debug, Clone)]
pub(crate) struct Shared(Arc<Mutex<World>>);

impl Shared {
    pub(crate) fn lock(&self) -> MutexGuard<'_, World> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// 仿真驱动
#[derive(Debug, Clone)]
pub struct SimDriver {
    shared: Shared,
}

impl Default for SimDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl SimDriver {
    pub fn new() -> Self {
        Self {
            shared: Shared(Arc::new(Mutex::new(World {
                available: true,
                devices: Vec::new(),
            }))),
        }
    }

    pub fn with_device(self, device: SimDevice) -> Self {
        self.add_device(device);
        self
    }

    /// 热插入一个设备
    pub fn add_device(&self, device: SimDevice) {
        self.shared.lock().devices.push(DeviceState {
            profile: device,
            generation: 0,
            negotiated: None,
            pipeline: PipelineState::default(),
        });
    }

    /// 让设备枚举本身失败
    pub fn set_available(&self, available: bool) {
        self.shared.lock().available = available;
    }

    /// 一个带常见能力的演示设备组合
    pub fn demo() -> Self {
        let full = ControlFlags::AUTO | ControlFlags::MANUAL;
        let webcam = SimDevice::new("Integrated Webcam", "\\\\?\\usb#vid_0c45&pid_6366&mi_00#integrated")
            .camera_property(CameraProperty::Exposure, PropertyRange::from_platform(-11, -2, 1, -6, full))
            .camera_property(CameraProperty::Focus, PropertyRange::from_platform(0, 255, 5, 0, full))
            .camera_property(CameraProperty::Zoom, PropertyRange::from_platform(100, 400, 10, 100, ControlFlags::MANUAL))
            .video_proc_property(VideoProcProperty::Brightness, PropertyRange::from_platform(-64, 64, 1, 0, ControlFlags::MANUAL))
            .video_proc_property(VideoProcProperty::Contrast, PropertyRange::from_platform(0, 95, 1, 32, ControlFlags::MANUAL))
            .video_proc_property(VideoProcProperty::WhiteBalance, PropertyRange::from_platform(2800, 6500, 10, 4600, full))
            .video_proc_property(
                VideoProcProperty::BacklightCompensation,
                PropertyRange::from_platform(0, 1, 0, 0, ControlFlags::MANUAL),
            )
            .capture_config(1920, 1080, 16, FourCC::MJPG, 333_333, 10_000_000)
            .capture_config(1280, 720, 16, FourCC::MJPG, 166_666, 10_000_000)
            .capture_config_extended(1280, 720, 16, FourCC::MJPG, 166_666, 10_000_000)
            .capture_config(640, 480, 16, FourCC::YUY2, 333_333, 10_000_000)
            .preview_config(640, 480, 16, FourCC::YUY2, 333_333, 10_000_000)
            .preview_config(320, 240, 16, FourCC::YUY2, 333_333, 10_000_000);

        let virtual_cam = SimDevice::new("Virtual Camera", "@device:sw:{860BB310-5D01-11D0-BD3B-00A0C911CE86}\\virtual")
            .without_capture_pin()
            .without_preview_pin();

        Self::new().with_device(webcam).with_device(virtual_cam)
    }

    fn with_state<T>(&self, path: &str, f: impl FnOnce(&mut DeviceState) -> T) -> Option<T> {
        let mut world = self.shared.lock();
        world
            .devices
            .iter_mut()
            .find(|d| d.profile.path() == Some(path))
            .map(f)
    }

    // --- 检查 ---

    pub fn is_running(&self, path: &str) -> bool {
        self.with_state(path, |d| d.pipeline.running).unwrap_or(false)
    }

    /// 当前在运行的管线数
    pub fn running_pipelines(&self) -> usize {
        self.shared.lock().devices.iter().filter(|d| d.pipeline.running).count()
    }

    pub fn negotiated(&self, path: &str) -> Option<(PinCategory, StreamCaps)> {
        self.with_state(path, |d| d.negotiated).flatten()
    }

    pub fn sample_format(&self, path: &str) -> Option<SampleFormat> {
        self.with_state(path, |d| d.pipeline.format).flatten()
    }

    pub fn buffers_samples(&self, path: &str) -> Option<bool> {
        self.with_state(path, |d| d.pipeline.buffer_samples).flatten()
    }

    pub fn reference_clock_disabled(&self, path: &str) -> bool {
        self.with_state(path, |d| d.pipeline.clock_disabled).unwrap_or(false)
    }

    /// 最近一次创建的图是否还被持有
    pub fn graph_held(&self, path: &str) -> bool {
        self.with_state(path, |d| d.pipeline.graph_held).unwrap_or(false)
    }

    /// 管线持有的回调是否还指向一个活着的交付端
    pub fn has_live_callback(&self, path: &str) -> bool {
        self.with_state(path, |d| d.pipeline.callback.as_ref().is_some_and(|w| w.strong_count() > 0))
            .unwrap_or(false)
    }

    pub fn control_value(&self, path: &str, control: Control) -> Option<(i32, ControlFlags)> {
        self.with_state(path, |d| {
            let family = match control.family() {
                ControlFamily::Camera => d.profile.camera.as_ref(),
                ControlFamily::VideoProc => d.profile.video_proc.as_ref(),
            };
            family
                .and_then(|props| props.get(&control.selector()))
                .map(|p| (p.value, p.flags))
        })
        .flatten()
    }

    // --- 注入 ---

    /// 模拟设备产出一帧；管线未运行、图已释放或没有回调时返回 false
    pub fn push_frame(&self, path: &str, sample_time: f64, data: &[u8]) -> bool {
        // 在锁外调用回调，回调里可能会再访问驱动
        let callback = self
            .with_state(path, |d| {
                if d.pipeline.running && d.pipeline.graph_held {
                    d.pipeline.callback.clone()
                } else {
                    None
                }
            })
            .flatten();

        match callback.and_then(|weak| weak.upgrade()) {
            Some(callback) => {
                callback.buffer_cb(sample_time, data);
                true
            }
            None => false,
        }
    }

    /// 向运行中的管线追加一个事件
    pub fn push_event(&self, path: &str, code: EventCode) {
        self.with_state(path, |d| d.pipeline.events.push_back(code));
    }
}

impl Driver for SimDriver {
    fn backend(&self) -> &str {
        "Simulation"
    }

    fn video_inputs(&self) -> Result<Vec<Box<dyn DeviceMoniker>>> {
        let world = self.shared.lock();
        if !world.available {
            return Err(platform_error(hresult::E_FAIL, "Unspecified error"));
        }
        Ok((0..world.devices.len())
            .map(|index| Box::new(pipeline::SimMoniker::new(self.shared.clone(), index)) as Box<dyn DeviceMoniker>)
            .collect())
    }
}

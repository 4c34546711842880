// 开启一些 Clippy 检查，保证代码质量
#![warn(missing_debug_implementations, rust_2018_idioms, unreachable_pub)]

// 模块定义
pub mod audit;
pub mod capability;
pub mod error;
pub mod event;
pub mod frame;
pub mod pixel_format;
pub mod traits;

// 方便用户使用的 Prelude
pub mod prelude {
    pub use crate::audit::{Audit, AuditLog};
    pub use crate::capability::{
        CameraProperty, ConfigHandle, Control, ControlFamily, ControlFlags, ControlReading,
        DeviceDescriptor, PinCategory, PropertyRange, StreamConfigDescriptor, VideoProcProperty,
    };
    pub use crate::error::{CameraError, Result};
    pub use crate::event::{EventCode, EventPoll};
    pub use crate::frame::{Frame, FrameHandler};
    pub use crate::pixel_format::{FourCC, SampleFormat};
    pub use crate::traits::{
        CaptureFilter, DeviceMoniker, Driver, FilterGraph, MediaControl, MediaEvent,
        PropertyControl, SampleCallback, StreamConfig,
    };
}

// 版本与构建信息常量
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! camhub：视频采集设备的探测、会话管理与帧交付。
//!
//! 典型流程：
//! 1. [`CaptureService::enumerate`] 列出设备及其控制范围、流配置；
//! 2. [`CaptureService::connect`] 选定一个配置，建立并运行采集管线；
//! 3. 帧在管线线程上交付给调用方的 [`FrameHandler`]；
//! 4. 通过设备路径调整控制、轮询事件，最后 [`CaptureService::disconnect`]。

#![warn(missing_debug_implementations, rust_2018_idioms)]

pub mod backend;
pub mod channel;
pub mod config;
pub mod modes;
pub mod pipeline;
pub mod prober;
pub mod registry;
pub mod service;
pub mod sink;
pub mod verifier;

// 重新导出 core 中的常用类型，用户不需要直接依赖 camhub-core
pub use camhub_core::prelude::*;
pub use camhub_core::{audit, capability, event, frame, pixel_format, traits};

pub use backend::BackendType;
pub use channel::{frame_channel, FrameReceiver, FrameSender};
pub use config::ServiceConfig;
pub use modes::CaptureMode;
pub use pipeline::{ConnectStage, StreamInfo};
pub use service::CaptureService;

#![cfg(target_os = "windows")]

pub mod controls;
pub mod device;
pub mod graph;
pub mod grabber;
pub mod pixel_map;
pub mod stream;

use camhub_core::error::{CameraError, Result};
use camhub_core::traits::{DeviceMoniker, Driver};
use std::cell::Cell;
use std::sync::Arc;
use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::{CoInitializeEx, COINIT_MULTITHREADED};

#[derive(Debug, Clone)]
pub struct DshowDriver;

impl Default for DshowDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl DshowDriver {
    pub fn new() -> Self {
        Self
    }
}

impl Driver for DshowDriver {
    fn backend(&self) -> &str {
        "DirectShow"
    }

    fn video_inputs(&self) -> Result<Vec<Box<dyn DeviceMoniker>>> {
        initialize_com()?;
        device::video_inputs()
    }
}

pub fn default_driver() -> Arc<dyn Driver> {
    Arc::new(DshowDriver::new())
}

thread_local! {
    static COM_READY: Cell<bool> = const { Cell::new(false) };
}

/// 在当前线程初始化 COM (多线程套间)；已用其他模式初始化时沿用现状
pub(crate) fn initialize_com() -> Result<()> {
    if COM_READY.with(Cell::get) {
        return Ok(());
    }
    let hr = unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) };
    if hr.is_err() && hr != RPC_E_CHANGED_MODE {
        return Err(hresult_error(hr.into()));
    }
    COM_READY.with(|ready| ready.set(true));
    Ok(())
}

/// HRESULT -> CameraError，保留原生错误码与系统翻译的错误文本
pub(crate) fn hresult_error(e: windows::core::Error) -> CameraError {
    CameraError::platform(e.code().0 as u32 as i64, e.message().trim_end())
}

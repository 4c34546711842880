use camhub_core::error::{CameraError, Result};
use camhub_core::traits::Driver;
use std::sync::Arc;

/// 后端枚举，用于内部标记当前使用的是哪个驱动
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    DirectShow,
    Simulation,
    Dummy, // 用于不支持的系统
}

/// 创建首选后端的驱动实例
pub fn create_driver() -> Result<Arc<dyn Driver>> {
    create_driver_for(default_backend())
}

/// 创建指定后端的驱动实例；该后端没有编译进来时返回错误
pub fn create_driver_for(backend: BackendType) -> Result<Arc<dyn Driver>> {
    tracing::debug!(?backend, "creating capture driver");
    match backend {
        #[cfg(all(feature = "windows-dshow", target_os = "windows"))]
        BackendType::DirectShow => Ok(Arc::new(camhub_backend_dshow::DshowDriver::new())),
        #[cfg(feature = "simulation")]
        BackendType::Simulation => Ok(Arc::new(camhub_simulation::SimDriver::demo())),
        other => Err(CameraError::EnumerationUnavailable(format!(
            "Backend {other:?} is not available on this build. Please check Cargo features."
        ))),
    }
}

/// 辅助：获取首选后端类型
pub fn default_backend() -> BackendType {
    cfg_if::cfg_if! {
        if #[cfg(all(feature = "windows-dshow", target_os = "windows"))] {
            BackendType::DirectShow
        } else if #[cfg(feature = "simulation")] {
            BackendType::Simulation
        } else {
            BackendType::Dummy
        }
    }
}

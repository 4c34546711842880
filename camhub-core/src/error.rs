use thiserror::Error;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device not connected: {0}")]
    NotConnected(String),

    /// 平台调用失败，携带原生错误码 (e.g. HRESULT) 与翻译后的错误文本
    #[error("Platform call failed, code = {code:#010x} = {message}")]
    Platform { code: i64, message: String },

    #[error("Format negotiation failed: {0}")]
    NegotiationFailed(String),

    /// 启动后的事件校验失败，通常意味着设备已被其他进程独占
    #[error("Device busy: Exclusive access required")]
    DeviceBusy,

    #[error("Device registry exhausted: all {capacity} session slots are in use")]
    RegistryExhausted { capacity: usize },

    #[error("Invalid configuration handle {0:#010x}")]
    InvalidConfigHandle(i32),

    #[error("Control not supported by this device")]
    UnsupportedControl,

    #[error("Video input enumeration unavailable: {0}")]
    EnumerationUnavailable(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CameraError {
    /// 构造平台错误的便捷方法
    pub fn platform(code: i64, message: impl Into<String>) -> Self {
        Self::Platform {
            code,
            message: message.into(),
        }
    }

    /// 原生错误码 (仅 Platform 变体)
    pub fn native_code(&self) -> Option<i64> {
        match self {
            Self::Platform { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, CameraError>;

use std::fmt;

/// 管线异步事件码，数值与平台事件通知码一致
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct EventCode(pub i32);

impl EventCode {
    pub const COMPLETE: Self = Self(0x01);
    pub const USER_ABORT: Self = Self(0x02);
    /// 管线因错误中止 (设备已被占用时最常见)
    pub const ERROR_ABORT: Self = Self(0x03);
    pub const REPAINT: Self = Self(0x05);
    pub const STREAM_ERROR_STOPPED: Self = Self(0x06);
    pub const STREAM_ERROR_STILL_PLAYING: Self = Self(0x07);
    pub const ERROR_STILL_PLAYING: Self = Self(0x08);
    pub const VIDEO_SIZE_CHANGED: Self = Self(0x0A);
    pub const QUALITY_CHANGE: Self = Self(0x0B);
    pub const SHUTTING_DOWN: Self = Self(0x0C);
    /// 启动后第一个事件：参考时钟变化
    pub const CLOCK_CHANGED: Self = Self(0x0D);
    /// 启动后第二个事件：暂停过渡完成
    pub const PAUSED: Self = Self(0x0E);
    pub const STARVATION: Self = Self(0x17);
    pub const DEVICE_LOST: Self = Self(0x1F);

    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::COMPLETE => "complete",
            Self::USER_ABORT => "user abort",
            Self::ERROR_ABORT => "error abort",
            Self::REPAINT => "repaint",
            Self::STREAM_ERROR_STOPPED => "stream error stopped",
            Self::STREAM_ERROR_STILL_PLAYING => "stream error still playing",
            Self::ERROR_STILL_PLAYING => "error still playing",
            Self::VIDEO_SIZE_CHANGED => "video size changed",
            Self::QUALITY_CHANGE => "quality change",
            Self::SHUTTING_DOWN => "shutting down",
            Self::CLOCK_CHANGED => "clock changed",
            Self::PAUSED => "paused",
            Self::STARVATION => "starvation",
            Self::DEVICE_LOST => "device lost",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Debug for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "EventCode({} = {})", self.0, name),
            None => write!(f, "EventCode({})", self.0),
        }
    }
}

impl fmt::Display for EventCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "code {}: {}", self.0, name),
            None => write!(f, "code {}", self.0),
        }
    }
}

/// 一次事件轮询的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPoll {
    /// 设备未连接 (不在注册表中)
    NotConnected,
    /// 已连接，没有待处理事件
    Empty,
    Event(EventCode),
}

impl EventPoll {
    /// 打包形式：-1 = 未连接，0 = 无事件，>0 = 事件码
    pub fn to_raw(self) -> i32 {
        match self {
            Self::NotConnected => -1,
            Self::Empty => 0,
            Self::Event(code) => code.0,
        }
    }
}

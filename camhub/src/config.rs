/// 会话表的容量
pub const MAX_SESSIONS: usize = 16;

/// 单次枚举最多描述的设备数
pub const MAX_DEVICES: usize = 16;

/// 每个设备最多记录的流配置数 (两个引脚合计)
pub const MAX_CONFIGS_PER_DEVICE: usize = 32;

/// 采集服务的配置
///
/// 默认值与固定容量的会话表一致；测试与嵌入场景可以用 Builder 方法调小。
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct ServiceConfig {
    pub registry_capacity: usize,
    pub max_devices: usize,
    pub max_configs_per_device: usize,
    /// 启动后是否校验事件序列以确认独占访问
    pub verify_events: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            registry_capacity: MAX_SESSIONS,
            max_devices: MAX_DEVICES,
            max_configs_per_device: MAX_CONFIGS_PER_DEVICE,
            verify_events: true,
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // --- Builder ---

    pub fn registry_capacity(mut self, capacity: usize) -> Self {
        self.registry_capacity = capacity;
        self
    }

    pub fn max_devices(mut self, count: usize) -> Self {
        self.max_devices = count;
        self
    }

    pub fn max_configs_per_device(mut self, count: usize) -> Self {
        self.max_configs_per_device = count;
        self
    }

    pub fn verify_events(mut self, enabled: bool) -> Self {
        self.verify_events = enabled;
        self
    }

    /// 从 JSON 读取配置，缺省字段取默认值
    #[cfg(feature = "serialize")]
    pub fn from_json(text: &str) -> camhub_core::error::Result<Self> {
        serde_json::from_str(text).map_err(|e| std::io::Error::from(e).into())
    }
}

//! 平台接口：核心子系统消费的"设备发现 + 媒体管线"能力。
//!
//! 后端 (DirectShow, 仿真) 实现这些 Trait；探测器、管线构建器与注册表只依赖这里的定义。

use crate::capability::{ControlFamily, ControlFlags, PinCategory, PropertyRange};
use crate::error::Result;
use crate::event::EventCode;
use crate::pixel_format::{FourCC, SampleFormat};
use std::sync::Weak;

// --- 数据结构 ---

/// 流能力条目的格式表示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatRepresentation {
    /// 基本表示 (VIDEOINFOHEADER)
    VideoInfo,
    /// 带隔行/版权保护元数据的扩展表示 (VIDEOINFOHEADER2)，内容与基本表示重复
    VideoInfo2,
    /// 其他表示
    Other,
}

/// 引脚能力列表中的一个条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamCaps {
    /// 在该引脚能力列表中的索引
    pub index: u32,
    pub representation: FormatRepresentation,
    pub width: i32,
    pub height: i32,
    pub color_depth: u16,
    pub fourcc: FourCC,
    pub min_interval: i64,
    pub max_interval: i64,
    /// 当前请求的帧间隔 (100ns)，协商前由调用方改写
    pub interval: i64,
}

/// 管线实际协商出的图像尺寸
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: i32,
    /// 平台原样报告；对未压缩 DIB，正值表示自底向上存储
    pub height: i32,
}

// --- 核心 Trait 定义 ---

/// 1. 驱动入口：枚举视频输入设备
pub trait Driver: Send + Sync {
    /// 后端类型标识 (e.g. "DirectShow", "Simulation")
    fn backend(&self) -> &str;

    /// 返回当前可见的全部视频输入设备，按平台枚举顺序
    fn video_inputs(&self) -> Result<Vec<Box<dyn DeviceMoniker>>>;
}

/// 2. 设备标识：读取身份字符串，绑定到设备对象
pub trait DeviceMoniker: Send {
    fn friendly_name(&self) -> Result<String>;
    fn device_path(&self) -> Result<String>;
    fn bind(&self) -> Result<Box<dyn CaptureFilter>>;
}

/// 3. 已绑定的采集设备
pub trait CaptureFilter: Send {
    /// 查询某一属性族的控制接口；设备不支持时返回错误
    fn property_control(&self, family: ControlFamily) -> Result<Box<dyn PropertyControl>>;

    /// 查询某一引脚的流配置接口；设备没有该引脚时返回错误
    fn stream_config(&self, pin: PinCategory) -> Result<Box<dyn StreamConfig>>;

    /// 创建一个以本设备为源的处理管线
    fn create_graph(&self) -> Result<Box<dyn FilterGraph>>;
}

/// 属性族控制接口 (property 为平台属性选择子)
pub trait PropertyControl: Send {
    fn range(&self, property: i32) -> Result<PropertyRange>;
    fn get(&self, property: i32) -> Result<(i32, ControlFlags)>;
    fn set(&self, property: i32, value: i32, flags: ControlFlags) -> Result<()>;
}

/// 引脚的流配置接口
pub trait StreamConfig: Send {
    fn capability_count(&self) -> Result<u32>;
    fn stream_caps(&self, index: u32) -> Result<StreamCaps>;

    /// 请求设备协商到给定格式 (使用 `caps.index` 定位条目，`caps.interval` 为帧间隔)
    fn set_format(&self, caps: &StreamCaps) -> Result<()>;
}

/// 4. 处理管线：源 -> 采样器 -> 丢弃终端
pub trait FilterGraph: Send {
    /// 添加采样器并要求给定的输出格式
    fn add_sample_grabber(&mut self, format: SampleFormat) -> Result<()>;

    /// 是否在采样器内部缓存样本
    fn set_buffer_samples(&mut self, buffer: bool) -> Result<()>;

    /// 取消参考时钟同步，设备产出多快就交付多快
    fn disable_reference_clock(&mut self) -> Result<()>;

    /// 添加丢弃所有样本的终端
    fn add_discard_sink(&mut self) -> Result<()>;

    /// 沿指定引脚连接 源 -> 采样器 -> 终端
    fn render_stream(&mut self, pin: PinCategory) -> Result<()>;

    /// 连接后采样器实际协商出的尺寸
    fn connected_geometry(&self) -> Result<Geometry>;

    /// 安装帧回调。管线只持有弱引用，回调对象的生命周期归会话所有
    fn set_sample_callback(&mut self, callback: Weak<dyn SampleCallback>) -> Result<()>;

    fn media_control(&self) -> Result<Box<dyn MediaControl>>;
    fn media_event(&self) -> Result<Box<dyn MediaEvent>>;
}

/// 管线运行控制
pub trait MediaControl: Send {
    fn run(&self) -> Result<()>;

    /// 同步停止，返回时不再有帧回调
    fn stop(&self) -> Result<()>;
}

/// 管线事件通道
pub trait MediaEvent: Send {
    /// 不阻塞地取出一个事件
    fn poll(&self) -> Result<Option<EventCode>>;
}

/// 采样器在交付线程上调用的回调
pub trait SampleCallback: Send + Sync {
    fn buffer_cb(&self, sample_time: f64, buffer: &[u8]);
}

//! 设备能力描述：可控属性的范围、流配置、配置句柄与控制读数。
//!
//! 这些类型由探测器 (prober) 每次枚举时重新填充，不跨调用缓存。

use crate::pixel_format::FourCC;
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// 属性的自动/手动模式标志，数值与平台定义一致
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
    pub struct ControlFlags: i32 {
        const AUTO = 0x0001;
        const MANUAL = 0x0002;
    }
}

impl ControlFlags {
    pub fn for_mode(manual: bool) -> Self {
        if manual {
            Self::MANUAL
        } else {
            Self::AUTO
        }
    }
}

/// 两个互不相交的属性族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlFamily {
    /// 镜头/几何控制 (pan, tilt, zoom, exposure ...)
    Camera = 0,
    /// 图像处理控制 (brightness, contrast, gain ...)
    VideoProc = 1,
}

impl ControlFamily {
    pub const ALL: [Self; 2] = [Self::Camera, Self::VideoProc];

    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Camera),
            1 => Some(Self::VideoProc),
            _ => None,
        }
    }
}

/// 镜头/几何属性，判别值即平台的属性选择子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum CameraProperty {
    Pan = 0,
    Tilt = 1,
    Roll = 2,
    Zoom = 3,
    Exposure = 4,
    Iris = 5,
    Focus = 6,
}

impl CameraProperty {
    pub const ALL: [Self; 7] = [
        Self::Pan,
        Self::Tilt,
        Self::Roll,
        Self::Zoom,
        Self::Exposure,
        Self::Iris,
        Self::Focus,
    ];

    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pan => "Pan",
            Self::Tilt => "Tilt",
            Self::Roll => "Roll",
            Self::Zoom => "Zoom",
            Self::Exposure => "Exposure",
            Self::Iris => "Iris",
            Self::Focus => "Focus",
        }
    }
}

/// 图像处理属性，判别值即平台的属性选择子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum VideoProcProperty {
    Brightness = 0,
    Contrast = 1,
    Hue = 2,
    Saturation = 3,
    Sharpness = 4,
    Gamma = 5,
    ColorEnable = 6,
    WhiteBalance = 7,
    BacklightCompensation = 8,
    Gain = 9,
}

impl VideoProcProperty {
    pub const ALL: [Self; 10] = [
        Self::Brightness,
        Self::Contrast,
        Self::Hue,
        Self::Saturation,
        Self::Sharpness,
        Self::Gamma,
        Self::ColorEnable,
        Self::WhiteBalance,
        Self::BacklightCompensation,
        Self::Gain,
    ];

    pub fn from_raw(raw: i32) -> Option<Self> {
        usize::try_from(raw).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Hue => "Hue",
            Self::Saturation => "Saturation",
            Self::Sharpness => "Sharpness",
            Self::Gamma => "Gamma",
            Self::ColorEnable => "Color",
            Self::WhiteBalance => "White Balance",
            Self::BacklightCompensation => "Backlight Compensation",
            Self::Gain => "Gain",
        }
    }
}

/// 属性选择：族 + 族内属性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Control {
    Camera(CameraProperty),
    VideoProc(VideoProcProperty),
}

impl Control {
    /// 按 (family, property) 原始选择子解析，未知组合返回 None
    pub fn from_raw(family: i32, property: i32) -> Option<Self> {
        match ControlFamily::from_raw(family)? {
            ControlFamily::Camera => CameraProperty::from_raw(property).map(Self::Camera),
            ControlFamily::VideoProc => VideoProcProperty::from_raw(property).map(Self::VideoProc),
        }
    }

    pub fn family(&self) -> ControlFamily {
        match self {
            Self::Camera(_) => ControlFamily::Camera,
            Self::VideoProc(_) => ControlFamily::VideoProc,
        }
    }

    /// 平台属性选择子
    pub fn selector(&self) -> i32 {
        match self {
            Self::Camera(p) => *p as i32,
            Self::VideoProc(p) => *p as i32,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Camera(p) => p.name(),
            Self::VideoProc(p) => p.name(),
        }
    }

    /// 所有已定义的属性，镜头族在前
    pub fn all() -> impl Iterator<Item = Control> {
        CameraProperty::ALL
            .into_iter()
            .map(Self::Camera)
            .chain(VideoProcProperty::ALL.into_iter().map(Self::VideoProc))
    }
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 单个可控属性的范围描述
///
/// `supported == false` 时其余字段均为 0，没有意义，调用方不应解读。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyRange {
    pub supported: bool,
    pub minimum: i32,
    pub maximum: i32,
    pub default: i32,
    pub step: i32,
    pub automatic_allowed: bool,
    pub manual_allowed: bool,
}

impl PropertyRange {
    /// 由平台 GetRange 的输出构造
    pub fn from_platform(minimum: i32, maximum: i32, step: i32, default: i32, flags: ControlFlags) -> Self {
        Self {
            supported: true,
            minimum,
            maximum,
            default,
            step,
            automatic_allowed: flags.contains(ControlFlags::AUTO),
            manual_allowed: flags.contains(ControlFlags::MANUAL),
        }
    }

    /// 开关型属性 (只能手动开/关，例如逆光补偿)
    pub fn is_toggle(&self) -> bool {
        self.supported && self.manual_allowed && self.step == 0
    }

    pub fn contains(&self, value: i32) -> bool {
        self.supported && value >= self.minimum && value <= self.maximum
    }
}

/// 设备的逻辑输出引脚
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum PinCategory {
    /// 主 (capture) 引脚
    Capture,
    /// 次 (preview) 引脚
    Preview,
}

impl fmt::Display for PinCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capture => f.write_str("Capture"),
            Self::Preview => f.write_str("Preview"),
        }
    }
}

/// 流配置句柄：来自哪个引脚，以及该引脚能力列表中的索引
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfigHandle {
    pub pin: PinCategory,
    pub index: u32,
}

impl ConfigHandle {
    const PREVIEW_BIT: u32 = 1 << 31;
    const INDEX_MASK: u32 = !Self::PREVIEW_BIT;

    pub fn new(pin: PinCategory, index: u32) -> Self {
        Self {
            pin,
            index: index & Self::INDEX_MASK,
        }
    }

    pub fn capture(index: u32) -> Self {
        Self::new(PinCategory::Capture, index)
    }

    pub fn preview(index: u32) -> Self {
        Self::new(PinCategory::Preview, index)
    }

    /// 打包形式：最高位 0 = capture 引脚，1 = preview 引脚；低 31 位为索引
    pub fn to_raw(self) -> i32 {
        let bits = match self.pin {
            PinCategory::Capture => self.index & Self::INDEX_MASK,
            PinCategory::Preview => self.index | Self::PREVIEW_BIT,
        };
        bits as i32
    }

    pub fn from_raw(raw: i32) -> Self {
        let bits = raw as u32;
        let pin = if bits & Self::PREVIEW_BIT == 0 {
            PinCategory::Capture
        } else {
            PinCategory::Preview
        };
        Self::new(pin, bits & Self::INDEX_MASK)
    }
}

/// 一个可协商的流配置 (分辨率, 位深, 编码, 帧间隔范围)
///
/// 帧间隔单位为 100ns，例如 333333 ≈ 30 FPS。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamConfigDescriptor {
    pub handle: ConfigHandle,
    pub width: i32,
    pub height: i32,
    pub color_depth: u16,
    pub fourcc: FourCC,
    pub min_interval: i64,
    pub max_interval: i64,
}

impl StreamConfigDescriptor {
    /// 去重判据：间隔范围、尺寸、位深与编码完全一致 (忽略句柄)
    pub fn same_format(&self, other: &Self) -> bool {
        self.min_interval == other.min_interval
            && self.max_interval == other.max_interval
            && self.width == other.width
            && self.height == other.height
            && self.color_depth == other.color_depth
            && self.fourcc == other.fourcc
    }

    pub fn supports_interval(&self, interval: i64) -> bool {
        interval >= self.min_interval && interval <= self.max_interval
    }
}

/// 一次枚举中发现的一个设备
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceDescriptor {
    /// 探测失败时为 false；此时其余字段只保证存在，不保证有意义
    pub valid: bool,

    /// 对用户友好的显示名称 (e.g. "Logitech C920")
    pub name: String,

    /// 稳定的设备路径，后续所有调用都以它寻址设备
    pub path: String,

    pub camera: [PropertyRange; 7],
    pub video_proc: [PropertyRange; 10],

    /// 去重后的流配置，capture 引脚在前
    pub configs: Vec<StreamConfigDescriptor>,
}

impl DeviceDescriptor {
    pub fn property(&self, control: Control) -> &PropertyRange {
        match control {
            Control::Camera(p) => &self.camera[p as usize],
            Control::VideoProc(p) => &self.video_proc[p as usize],
        }
    }

    pub fn property_mut(&mut self, control: Control) -> &mut PropertyRange {
        match control {
            Control::Camera(p) => &mut self.camera[p as usize],
            Control::VideoProc(p) => &mut self.video_proc[p as usize],
        }
    }

    /// 设备支持的属性 (按族顺序)
    pub fn supported_controls(&self) -> impl Iterator<Item = (Control, &PropertyRange)> + '_ {
        Control::all()
            .map(move |c| (c, self.property(c)))
            .filter(|(_, range)| range.supported)
    }

    pub fn config(&self, handle: ConfigHandle) -> Option<&StreamConfigDescriptor> {
        self.configs.iter().find(|c| c.handle == handle)
    }
}

/// 一次控制读取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlReading {
    pub value: i32,
    pub manual: bool,
}

impl ControlReading {
    /// 打包形式的失败哨兵 (所有位为 1)
    pub const PACKED_FAILURE: i64 = -1;

    /// 低 32 位为有符号值，高 32 位为手动标志 (0 或 1)。
    ///
    /// 高半部分只可能是 0 或 1，因此成功读数永远不会与 [`Self::PACKED_FAILURE`] 相同。
    pub fn to_packed(self) -> i64 {
        ((self.manual as i64) << 32) | (self.value as u32 as i64)
    }

    pub fn from_packed(raw: i64) -> Option<Self> {
        let manual = match (raw as u64) >> 32 {
            0 => false,
            1 => true,
            _ => return None,
        };
        Some(Self {
            value: raw as u32 as i32,
            manual,
        })
    }

    /// `Result` 到打包形式，失败时返回哨兵
    pub fn pack_result<E>(result: std::result::Result<Self, E>) -> i64 {
        result.map_or(Self::PACKED_FAILURE, Self::to_packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_handle_sign_bit_selects_pin() {
        let capture = ConfigHandle::capture(5);
        assert_eq!(capture.to_raw(), 5);

        let preview = ConfigHandle::preview(5);
        assert!(preview.to_raw() < 0);
        assert_eq!(preview.to_raw() as u32, 0x8000_0005);

        assert_eq!(ConfigHandle::from_raw(preview.to_raw()), preview);
        assert_eq!(ConfigHandle::from_raw(5), capture);
        assert_eq!(ConfigHandle::from_raw(i32::MIN).index, 0);
    }

    #[test]
    fn config_handle_masks_oversized_index() {
        let handle = ConfigHandle::capture(u32::MAX);
        assert_eq!(handle.index, 0x7FFF_FFFF);
        assert_eq!(handle.pin, PinCategory::Capture);
    }

    #[test]
    fn packed_reading_never_collides_with_failure_sentinel() {
        let worst = ControlReading { value: -1, manual: true };
        let packed = worst.to_packed();
        assert_ne!(packed, ControlReading::PACKED_FAILURE);
        assert_eq!(ControlReading::from_packed(packed), Some(worst));

        let auto = ControlReading { value: -1, manual: false };
        assert_eq!(auto.to_packed(), 0x0000_0000_FFFF_FFFF);
        assert_eq!(ControlReading::from_packed(auto.to_packed()), Some(auto));

        assert_eq!(ControlReading::from_packed(ControlReading::PACKED_FAILURE), None);
    }

    #[test]
    fn pack_result_uses_sentinel_on_error() {
        let err: std::result::Result<ControlReading, ()> = Err(());
        assert_eq!(ControlReading::pack_result(err), -1);
        let ok: std::result::Result<ControlReading, ()> = Ok(ControlReading { value: 120, manual: true });
        assert_eq!(ControlReading::pack_result(ok), (1 << 32) | 120);
    }

    #[test]
    fn control_raw_selectors() {
        assert_eq!(
            Control::from_raw(0, 3),
            Some(Control::Camera(CameraProperty::Zoom))
        );
        assert_eq!(
            Control::from_raw(1, 9),
            Some(Control::VideoProc(VideoProcProperty::Gain))
        );
        assert_eq!(Control::from_raw(0, 7), None);
        assert_eq!(Control::from_raw(2, 0), None);
        assert_eq!(Control::from_raw(1, -1), None);
        assert_eq!(Control::all().count(), 17);
    }

    #[test]
    fn range_flags_and_toggle() {
        let range = PropertyRange::from_platform(0, 1, 0, 1, ControlFlags::MANUAL);
        assert!(range.supported);
        assert!(range.manual_allowed);
        assert!(!range.automatic_allowed);
        assert!(range.is_toggle());

        let slider = PropertyRange::from_platform(-10, 10, 1, 0, ControlFlags::AUTO | ControlFlags::MANUAL);
        assert!(!slider.is_toggle());
        assert!(slider.contains(-10));
        assert!(!slider.contains(11));
        assert!(!PropertyRange::default().contains(0));
    }

    #[test]
    fn descriptor_dedup_key_ignores_handle() {
        let a = StreamConfigDescriptor {
            handle: ConfigHandle::capture(0),
            width: 640,
            height: 480,
            color_depth: 16,
            fourcc: FourCC::YUY2,
            min_interval: 333_333,
            max_interval: 333_333,
        };
        let b = StreamConfigDescriptor {
            handle: ConfigHandle::preview(3),
            ..a
        };
        assert!(a.same_format(&b));
        let c = StreamConfigDescriptor { color_depth: 12, ..b };
        assert!(!a.same_format(&c));
    }
}

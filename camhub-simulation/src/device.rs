use camhub_core::capability::{CameraProperty, ControlFlags, PropertyRange, VideoProcProperty};
use camhub_core::event::EventCode;
use camhub_core::pixel_format::FourCC;
use camhub_core::traits::{FormatRepresentation, Geometry, StreamCaps};
use std::collections::BTreeMap;

/// 一个仿真属性：范围 + 当前值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimProperty {
    pub range: PropertyRange,
    pub value: i32,
    pub flags: ControlFlags,
}

impl SimProperty {
    fn new(range: PropertyRange) -> Self {
        let flags = if range.automatic_allowed {
            ControlFlags::AUTO
        } else {
            ControlFlags::MANUAL
        };
        Self {
            range,
            value: range.default,
            flags,
        }
    }
}

/// 仿真设备的描述 (Builder)
///
/// 默认情况下：身份可读、可绑定、两族控制接口和两个引脚都存在 (但为空)，
/// 启动后的事件序列与独占打开时一致。
#[derive(Debug, Clone)]
pub struct SimDevice {
    pub(crate) name: Option<String>,
    pub(crate) path: Option<String>,
    pub(crate) bind_fails: bool,
    pub(crate) camera: Option<BTreeMap<i32, SimProperty>>,
    pub(crate) video_proc: Option<BTreeMap<i32, SimProperty>>,
    pub(crate) capture: Option<Vec<StreamCaps>>,
    pub(crate) preview: Option<Vec<StreamCaps>>,
    pub(crate) startup_events: Vec<EventCode>,
    pub(crate) reject_formats: bool,
    pub(crate) render_fails: bool,
    pub(crate) run_fails: bool,
    pub(crate) geometry: Option<Geometry>,
}

impl SimDevice {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            path: Some(path.into()),
            bind_fails: false,
            camera: Some(BTreeMap::new()),
            video_proc: Some(BTreeMap::new()),
            capture: Some(Vec::new()),
            preview: Some(Vec::new()),
            startup_events: vec![EventCode::CLOCK_CHANGED, EventCode::PAUSED],
            reject_formats: false,
            render_fails: false,
            run_fails: false,
            geometry: None,
        }
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    // --- 控制 ---

    pub fn camera_property(mut self, property: CameraProperty, range: PropertyRange) -> Self {
        self.camera
            .get_or_insert_with(BTreeMap::new)
            .insert(property as i32, SimProperty::new(range));
        self
    }

    pub fn video_proc_property(mut self, property: VideoProcProperty, range: PropertyRange) -> Self {
        self.video_proc
            .get_or_insert_with(BTreeMap::new)
            .insert(property as i32, SimProperty::new(range));
        self
    }

    pub fn without_camera_control(mut self) -> Self {
        self.camera = None;
        self
    }

    pub fn without_video_proc(mut self) -> Self {
        self.video_proc = None;
        self
    }

    // --- 流配置 ---

    #[allow(clippy::too_many_arguments)]
    fn push_caps(
        list: &mut Option<Vec<StreamCaps>>,
        representation: FormatRepresentation,
        width: i32,
        height: i32,
        color_depth: u16,
        fourcc: FourCC,
        min_interval: i64,
        max_interval: i64,
    ) {
        let list = list.get_or_insert_with(Vec::new);
        list.push(StreamCaps {
            index: list.len() as u32,
            representation,
            width,
            height,
            color_depth,
            fourcc,
            min_interval,
            max_interval,
            interval: min_interval,
        });
    }

    pub fn capture_config(
        mut self,
        width: i32,
        height: i32,
        color_depth: u16,
        fourcc: FourCC,
        min_interval: i64,
        max_interval: i64,
    ) -> Self {
        Self::push_caps(
            &mut self.capture,
            FormatRepresentation::VideoInfo,
            width,
            height,
            color_depth,
            fourcc,
            min_interval,
            max_interval,
        );
        self
    }

    /// 在 capture 引脚上追加一个扩展表示的条目 (探测时应被忽略)
    pub fn capture_config_extended(
        mut self,
        width: i32,
        height: i32,
        color_depth: u16,
        fourcc: FourCC,
        min_interval: i64,
        max_interval: i64,
    ) -> Self {
        Self::push_caps(
            &mut self.capture,
            FormatRepresentation::VideoInfo2,
            width,
            height,
            color_depth,
            fourcc,
            min_interval,
            max_interval,
        );
        self
    }

    pub fn preview_config(
        mut self,
        width: i32,
        height: i32,
        color_depth: u16,
        fourcc: FourCC,
        min_interval: i64,
        max_interval: i64,
    ) -> Self {
        Self::push_caps(
            &mut self.preview,
            FormatRepresentation::VideoInfo,
            width,
            height,
            color_depth,
            fourcc,
            min_interval,
            max_interval,
        );
        self
    }

    pub fn without_capture_pin(mut self) -> Self {
        self.capture = None;
        self
    }

    pub fn without_preview_pin(mut self) -> Self {
        self.preview = None;
        self
    }

    // --- 故障注入 ---

    pub fn unreadable_name(mut self) -> Self {
        self.name = None;
        self
    }

    pub fn unreadable_path(mut self) -> Self {
        self.path = None;
        self
    }

    pub fn failing_bind(mut self) -> Self {
        self.bind_fails = true;
        self
    }

    /// 设备已被其他进程占用：启动后出现错误终止事件
    pub fn in_use(mut self) -> Self {
        self.startup_events = vec![EventCode::CLOCK_CHANGED, EventCode::PAUSED, EventCode::ERROR_ABORT];
        self
    }

    pub fn startup_events(mut self, events: Vec<EventCode>) -> Self {
        self.startup_events = events;
        self
    }

    pub fn rejecting_formats(mut self) -> Self {
        self.reject_formats = true;
        self
    }

    pub fn failing_render(mut self) -> Self {
        self.render_fails = true;
        self
    }

    pub fn failing_run(mut self) -> Self {
        self.run_fails = true;
        self
    }

    /// 让采样器报告与所选配置不同的尺寸 (高度按平台原样，正值表示自底向上)
    pub fn negotiates_to(mut self, width: i32, height: i32) -> Self {
        self.geometry = Some(Geometry { width, height });
        self
    }
}

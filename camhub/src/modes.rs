//! 面向用户的采集模式：把设备的流配置展开成 "分辨率 + 帧率" 的扁平列表。

use camhub_core::capability::{ConfigHandle, StreamConfigDescriptor};
use camhub_core::pixel_format::FourCC;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// 常用帧率对应的帧间隔 (100ns)
pub const INTERVAL_30_FPS: i64 = 333_333;
pub const INTERVAL_50_FPS: i64 = 200_000;
pub const INTERVAL_60_FPS: i64 = 166_666;

const INTERVALS_PER_SECOND: f64 = 10_000_000.0;

/// 一个具体的采集模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct CaptureMode {
    /// 来源配置；从文本解析出来的模式没有句柄，需要用 [`CaptureMode::resolve`] 找回
    pub handle: Option<ConfigHandle>,
    pub width: i32,
    pub height: i32,
    pub interval: i64,
    pub color_depth: u16,
    pub fourcc: FourCC,
}

impl CaptureMode {
    fn from_config(config: &StreamConfigDescriptor, interval: i64) -> Self {
        Self {
            handle: Some(config.handle),
            width: config.width,
            height: config.height,
            interval,
            color_depth: config.color_depth,
            fourcc: config.fourcc,
        }
    }

    /// 四舍五入后的帧率
    pub fn fps(&self) -> u32 {
        if self.interval <= 0 {
            return 0;
        }
        (INTERVALS_PER_SECOND / self.interval as f64).round() as u32
    }

    /// 展开并排序设备的所有流配置
    ///
    /// 每个配置产生最小、最大两个帧间隔；30/50/60 FPS 严格位于二者之间时也各产生一个。
    pub fn expand(configs: &[StreamConfigDescriptor]) -> Vec<Self> {
        let mut modes = Vec::new();
        for config in configs {
            modes.push(Self::from_config(config, config.min_interval));
            if config.max_interval != config.min_interval {
                modes.push(Self::from_config(config, config.max_interval));
            }
            for interval in [INTERVAL_30_FPS, INTERVAL_50_FPS, INTERVAL_60_FPS] {
                if interval > config.min_interval && interval < config.max_interval {
                    modes.push(Self::from_config(config, interval));
                }
            }
        }
        modes.sort_by(Self::display_order);
        modes
    }

    /// 宽度降序，高度降序，帧间隔升序 (帧率高的在前)，位深降序
    pub fn display_order(a: &Self, b: &Self) -> Ordering {
        b.width
            .cmp(&a.width)
            .then(b.height.cmp(&a.height))
            .then(a.interval.cmp(&b.interval))
            .then(b.color_depth.cmp(&a.color_depth))
    }

    /// 在设备的配置里找回能满足该模式的配置句柄
    pub fn resolve(&self, configs: &[StreamConfigDescriptor]) -> Option<ConfigHandle> {
        configs
            .iter()
            .find(|c| {
                c.width == self.width
                    && c.height == self.height
                    && c.color_depth == self.color_depth
                    && c.fourcc == self.fourcc
                    && c.supports_interval(self.interval)
            })
            .map(|c| c.handle)
    }
}

impl fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}  {} FPS  ({}bit {})",
            self.width,
            self.height,
            self.fps(),
            self.color_depth,
            self.fourcc
        )
    }
}

/// 解析 [`CaptureMode`] 的显示文本失败
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError(String);

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid capture mode text: {:?}", self.0)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for CaptureMode {
    type Err = ParseModeError;

    /// 解析 `"1920x1080  30 FPS  (16bit MJPG)"`
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let err = || ParseModeError(text.to_string());

        let (size, rest) = text.trim().split_once(" FPS").ok_or_else(err)?;
        let mut size_parts = size.split_whitespace();
        let (width, height) = size_parts.next().and_then(|s| s.split_once('x')).ok_or_else(err)?;
        let fps: u32 = size_parts.next().and_then(|s| s.parse().ok()).ok_or_else(err)?;
        if size_parts.next().is_some() || fps == 0 {
            return Err(err());
        }

        let inner = rest
            .trim()
            .strip_prefix('(')
            .and_then(|s| s.strip_suffix(')'))
            .ok_or_else(err)?;
        let (depth, fourcc) = inner.split_once("bit ").ok_or_else(err)?;

        Ok(Self {
            handle: None,
            width: width.parse().map_err(|_| err())?,
            height: height.parse().map_err(|_| err())?,
            interval: (INTERVALS_PER_SECOND / fps as f64).round() as i64,
            color_depth: depth.trim().parse().map_err(|_| err())?,
            fourcc: fourcc.parse().map_err(|_| err())?,
        })
    }
}

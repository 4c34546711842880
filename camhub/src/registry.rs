//! 会话与固定容量的会话表。

use crate::pipeline::StreamInfo;
use crate::sink::FrameSink;
use camhub_core::capability::{Control, ControlFamily, ControlFlags, ControlReading};
use camhub_core::error::{CameraError, Result};
use camhub_core::event::EventPoll;
use camhub_core::traits::{FilterGraph, MediaControl, MediaEvent, PropertyControl};
use std::sync::Arc;

/// 构建完成的管线：图本身及其控制/事件句柄
pub(crate) struct Pipeline {
    pub(crate) graph: Box<dyn FilterGraph>,
    pub(crate) control: Box<dyn MediaControl>,
    pub(crate) events: Box<dyn MediaEvent>,
}

/// 一个正在运行的采集会话
///
/// 持有管线 (图、控制与事件句柄)、可选的两族属性控制接口，以及帧交付端。
/// 释放时先同步停止管线，再让交付端失效，最后释放图。
pub struct Session {
    device_id: String,
    info: StreamInfo,
    control: Box<dyn MediaControl>,
    events: Box<dyn MediaEvent>,
    // 图持有采样器与回调对象，必须活得比运行中的管线久
    graph: Option<Box<dyn FilterGraph>>,
    camera: Option<Box<dyn PropertyControl>>,
    video_proc: Option<Box<dyn PropertyControl>>,
    sink: Arc<FrameSink>,
}

impl Session {
    pub(crate) fn new(
        device_id: String,
        info: StreamInfo,
        pipeline: Pipeline,
        camera: Option<Box<dyn PropertyControl>>,
        video_proc: Option<Box<dyn PropertyControl>>,
        sink: Arc<FrameSink>,
    ) -> Self {
        Self {
            device_id,
            info,
            control: pipeline.control,
            events: pipeline.events,
            graph: Some(pipeline.graph),
            camera,
            video_proc,
            sink,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn frames_delivered(&self) -> u64 {
        self.sink.frames_delivered()
    }

    pub(crate) fn run(&self) -> Result<()> {
        self.control.run()
    }

    pub(crate) fn events(&self) -> &dyn MediaEvent {
        self.events.as_ref()
    }

    /// 非阻塞地取出一个管线事件
    pub fn poll_event(&self) -> EventPoll {
        match self.events.poll() {
            Ok(Some(code)) => EventPoll::Event(code),
            Ok(None) => EventPoll::Empty,
            Err(e) => {
                tracing::warn!(device = %self.device_id, error = %e, "event poll failed");
                EventPoll::Empty
            }
        }
    }

    fn property_control(&self, family: ControlFamily) -> Result<&dyn PropertyControl> {
        let control = match family {
            ControlFamily::Camera => self.camera.as_deref(),
            ControlFamily::VideoProc => self.video_proc.as_deref(),
        };
        control.ok_or(CameraError::UnsupportedControl)
    }

    pub fn set_control(&self, control: Control, manual: bool, value: i32) -> Result<()> {
        self.property_control(control.family())?
            .set(control.selector(), value, ControlFlags::for_mode(manual))
    }

    pub fn get_control(&self, control: Control) -> Result<ControlReading> {
        let (value, flags) = self.property_control(control.family())?.get(control.selector())?;
        Ok(ControlReading {
            value,
            manual: flags.contains(ControlFlags::MANUAL),
        })
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Err(e) = self.control.stop() {
            tracing::warn!(device = %self.device_id, error = %e, "failed to stop the pipeline");
        }
        self.sink.invalidate();
        drop(self.graph.take());
        tracing::debug!(
            device = %self.device_id,
            frames = self.sink.frames_delivered(),
            "session closed"
        );
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("device_id", &self.device_id)
            .field("info", &self.info)
            .field("camera_controls", &self.camera.is_some())
            .field("video_proc_controls", &self.video_proc.is_some())
            .field("sink", &self.sink)
            .finish()
    }
}

/// 以设备路径为键的固定容量会话表
///
/// 每个槽要么为空，要么持有一个完整的会话；同一路径最多占用一个槽。
#[derive(Debug)]
pub struct DeviceRegistry {
    slots: Vec<Option<Session>>,
    /// 空闲槽索引 (栈)
    free: Vec<usize>,
}

impl DeviceRegistry {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            free: (0..capacity).rev().collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.free.is_empty()
    }

    fn position(&self, device_id: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| matches!(slot, Some(s) if s.device_id == device_id))
    }

    pub fn contains(&self, device_id: &str) -> bool {
        self.position(device_id).is_some()
    }

    pub fn get(&self, device_id: &str) -> Option<&Session> {
        self.position(device_id).and_then(|i| self.slots[i].as_ref())
    }

    /// 放入会话，返回槽索引
    ///
    /// 同一路径的旧会话会先被关闭；表满时把会话原样还给调用方。
    pub fn insert(&mut self, session: Session) -> std::result::Result<usize, Session> {
        drop(self.remove(&session.device_id));

        let Some(index) = self.free.pop() else {
            return Err(session);
        };
        self.slots[index] = Some(session);
        Ok(index)
    }

    /// 取出会话；调用方丢弃它即关闭管线
    pub fn remove(&mut self, device_id: &str) -> Option<Session> {
        let index = self.position(device_id)?;
        let session = self.slots[index].take();
        self.free.push(index);
        session
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.slots.iter().flatten().map(|s| s.device_id.as_str())
    }

    pub fn sessions(&self) -> impl Iterator<Item = &Session> + '_ {
        self.slots.iter().flatten()
    }

    /// 关闭全部会话
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            drop(slot.take());
        }
        self.free = (0..self.slots.len()).rev().collect();
    }
}

//! 采集管线的构建：从设备路径与流配置句柄，到一个正在运行的会话。

use crate::registry::{Pipeline, Session};
use crate::sink::FrameSink;
use camhub_core::audit::Audit;
use camhub_core::capability::{ConfigHandle, ControlFamily};
use camhub_core::error::{CameraError, Result};
use camhub_core::frame::FrameHandler;
use camhub_core::pixel_format::SampleFormat;
use camhub_core::traits::{CaptureFilter, DeviceMoniker, Driver, SampleCallback};
use std::fmt;
use std::sync::Arc;

/// 连接过程所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectStage {
    Idle,
    Enumerating,
    DeviceBound,
    FormatNegotiated,
    PipelineRunning,
    Verified,
    Failed,
}

impl fmt::Display for ConnectStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Enumerating => "enumerating",
            Self::DeviceBound => "device bound",
            Self::FormatNegotiated => "format negotiated",
            Self::PipelineRunning => "pipeline running",
            Self::Verified => "verified",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// 连接成功后协商出的流信息
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StreamInfo {
    pub device_id: String,
    pub handle: ConfigHandle,
    /// 请求的帧间隔 (100ns)
    pub interval: i64,
    /// 实际协商出的尺寸，可能与所选配置不同
    pub width: u32,
    pub height: u32,
    pub format: SampleFormat,
    pub bottom_up: bool,
}

/// 按阶段推进并记录日志
#[derive(Debug)]
pub(crate) struct StageTracker<'a> {
    device_id: &'a str,
    stage: ConnectStage,
}

impl<'a> StageTracker<'a> {
    pub(crate) fn new(device_id: &'a str) -> Self {
        Self {
            device_id,
            stage: ConnectStage::Idle,
        }
    }

    pub(crate) fn advance(&mut self, next: ConnectStage) {
        tracing::debug!(device = self.device_id, from = %self.stage, to = %next, "connect stage");
        self.stage = next;
    }

    /// 记录失败阶段并原样返回错误
    pub(crate) fn fail(&mut self, error: CameraError) -> CameraError {
        tracing::warn!(device = self.device_id, stage = %self.stage, error = %error, "connect failed");
        self.stage = ConnectStage::Failed;
        error
    }
}

/// 找到路径完全一致的设备；读不出路径的设备被跳过
fn find_device(driver: &dyn Driver, device_id: &str, audit: &mut Audit<'_>) -> Result<Box<dyn DeviceMoniker>> {
    let monikers = audit.check("Creating the Video Input Device Enumerator", driver.video_inputs())?;

    for moniker in monikers {
        audit.note("Enumerating a Device...");
        let Ok(path) = audit.check("Reading the Device Path", moniker.device_path()) else {
            continue;
        };
        if path == device_id {
            audit.note("Found the requested device");
            return Ok(moniker);
        }
        audit.note("Skipping this device, it is not the requested device");
    }

    audit.check("Finding the requested device", Err(CameraError::DeviceNotFound(device_id.to_string())))
}

/// 建立并启动管线，返回已在运行的会话 (尚未校验事件)
///
/// 任何一步失败时已创建的对象都会被释放；启动后失败的会话在返回前停止。
pub(crate) fn open_session(
    driver: &dyn Driver,
    device_id: &str,
    handle: ConfigHandle,
    interval: i64,
    handler: Box<dyn FrameHandler>,
    tracker: &mut StageTracker<'_>,
    audit: &mut Audit<'_>,
) -> Result<Session> {
    tracker.advance(ConnectStage::Enumerating);
    let moniker = find_device(driver, device_id, audit)?;
    let filter = audit.check("Getting the Base Filter", moniker.bind())?;
    tracker.advance(ConnectStage::DeviceBound);

    let mut graph = audit.check("Adding the Base Filter to the graph", filter.create_graph())?;

    // 控制接口缺失不影响采集，只是之后的控制调用会失败
    let camera = audit
        .check("Getting the Camera Control interface", filter.property_control(ControlFamily::Camera))
        .ok();
    let video_proc = audit
        .check("Getting the Video Proc Amp interface", filter.property_control(ControlFamily::VideoProc))
        .ok();

    let format = negotiate(filter.as_ref(), handle, interval, audit)?;
    tracker.advance(ConnectStage::FormatNegotiated);

    audit.check("Creating the Sample Grabber", graph.add_sample_grabber(format))?;
    audit.check("Disabling Sample Grabber buffering", graph.set_buffer_samples(false))?;
    audit.check("Disabling the reference clock", graph.disable_reference_clock())?;
    audit.check("Adding the Null Renderer to the graph", graph.add_discard_sink())?;
    audit.check("Rendering the Stream", graph.render_stream(handle.pin))?;
    let geometry = audit.check("Getting the Sample Grabber's connected media type", graph.connected_geometry())?;

    let sink = Arc::new(FrameSink::new(handler, geometry, format));
    let callback: Arc<dyn SampleCallback> = sink.clone();
    audit.check(
        "Setting the Sample Grabber's callback",
        graph.set_sample_callback(Arc::downgrade(&callback)),
    )?;

    let control = audit.check("Getting the Media Control interface", graph.media_control())?;
    let events = audit.check("Getting the Media Event interface", graph.media_event())?;

    let info = StreamInfo {
        device_id: device_id.to_string(),
        handle,
        interval,
        width: sink.width(),
        height: sink.height(),
        format,
        bottom_up: sink.bottom_up(),
    };
    let pipeline = Pipeline { graph, control, events };
    let session = Session::new(device_id.to_string(), info, pipeline, camera, video_proc, sink);

    // 失败时 session 被丢弃，Drop 会停止管线
    audit.check("Running the Graph", session.run())?;
    tracker.advance(ConnectStage::PipelineRunning);

    tracing::info!(
        device = device_id,
        width = session.info().width,
        height = session.info().height,
        format = ?format,
        "pipeline running"
    );
    Ok(session)
}

/// 选定配置、改写帧间隔并让设备协商；返回采样器应输出的格式
fn negotiate(
    filter: &dyn CaptureFilter,
    handle: ConfigHandle,
    interval: i64,
    audit: &mut Audit<'_>,
) -> Result<SampleFormat> {
    let config = audit.check(
        "Getting the Stream Configuration interface",
        filter.stream_config(handle.pin),
    )?;

    let caps = config
        .stream_caps(handle.index)
        .map_err(|_| CameraError::InvalidConfigHandle(handle.to_raw()));
    let mut caps = audit.check("Getting the requested Stream Capability", caps)?;

    // JPEG 原样交付，其他编码一律转换为 BGR24
    let format = SampleFormat::for_encoding(caps.fourcc);
    caps.interval = interval;

    let negotiated = config
        .set_format(&caps)
        .map_err(|e| CameraError::NegotiationFailed(e.to_string()));
    audit.check("Configuring the Stream with the requested frame interval", negotiated)?;

    Ok(format)
}

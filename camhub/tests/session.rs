mod common;

use camhub::config::MAX_SESSIONS;
use camhub::{
    frame_channel, AuditLog, CameraError, CameraProperty, CaptureService, ConfigHandle, Control, ControlFlags,
    ControlReading, EventCode, EventPoll, FourCC, SampleFormat, ServiceConfig, VideoProcProperty,
};
use camhub_simulation::{SimDevice, SimDriver};
use common::*;
use std::sync::Arc;
use std::time::Duration;

const MJPG_1080P: ConfigHandle = ConfigHandle {
    pin: camhub::PinCategory::Capture,
    index: 0,
};
const YUY2_VGA: ConfigHandle = ConfigHandle {
    pin: camhub::PinCategory::Capture,
    index: 1,
};

fn service(driver: &SimDriver) -> CaptureService {
    CaptureService::new(Arc::new(driver.clone()))
}

#[test]
fn connect_builds_the_documented_pipeline() {
    init_tracing();
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);

    let info = service.connect(WEBCAM, MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();
    assert_eq!((info.width, info.height), (1920, 1080));
    assert_eq!(info.format, SampleFormat::Jpeg);
    assert!(!info.bottom_up);

    assert!(driver.is_running(WEBCAM));
    assert_eq!(driver.sample_format(WEBCAM), Some(SampleFormat::Jpeg));
    assert_eq!(driver.buffers_samples(WEBCAM), Some(false));
    assert!(driver.reference_clock_disabled(WEBCAM));
    let (pin, caps) = driver.negotiated(WEBCAM).unwrap();
    assert_eq!(pin, camhub::PinCategory::Capture);
    assert_eq!(caps.interval, 333_333);
    assert!(service.is_connected(WEBCAM));
}

#[test]
fn raw_formats_are_delivered_as_bgr() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    let frames = Collected::default();

    let info = service.connect(WEBCAM, YUY2_VGA, 666_666, frames.handler(), None).unwrap();
    assert_eq!(info.format, SampleFormat::Bgr24);
    assert!(info.bottom_up);
    assert_eq!(driver.sample_format(WEBCAM), Some(SampleFormat::Bgr24));

    assert!(driver.push_frame(WEBCAM, 0.033, &vec![0u8; 640 * 480 * 3]));
    assert_eq!(frames.last(), Some((640 * 480 * 3, 640, 480, false, true)));
}

#[test]
fn negotiated_geometry_wins_over_request() {
    let driver = driver_with([webcam(WEBCAM).negotiates_to(1280, -720)]);
    let mut service = service(&driver);
    let frames = Collected::default();

    let info = service.connect(WEBCAM, YUY2_VGA, 333_333, frames.handler(), None).unwrap();
    assert_eq!((info.width, info.height, info.bottom_up), (1280, 720, false));

    driver.push_frame(WEBCAM, 0.0, &[0; 12]);
    assert_eq!(frames.last(), Some((12, 1280, 720, false, false)));
}

#[test]
fn preview_pin_handles_are_honoured() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);

    let handle = ConfigHandle::from_raw(i32::MIN);
    assert_eq!(handle, ConfigHandle::preview(0));
    service.connect(WEBCAM, handle, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();
    assert_eq!(driver.negotiated(WEBCAM).unwrap().0, camhub::PinCategory::Preview);
}

#[test]
fn reconnect_is_idempotent() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    let first = Collected::default();
    let second = Collected::default();

    service.connect(WEBCAM, MJPG_1080P, 333_333, first.handler(), None).unwrap();
    service.connect(WEBCAM, YUY2_VGA, 333_333, second.handler(), None).unwrap();

    assert_eq!(service.connected_devices().collect::<Vec<_>>(), vec![WEBCAM]);
    assert_eq!(driver.running_pipelines(), 1);

    driver.push_frame(WEBCAM, 0.0, &[0xFF, 0xD8, 0xFF]);
    assert_eq!(first.len(), 0);
    assert_eq!(second.len(), 1);
    assert_eq!(service.session_info(WEBCAM).unwrap().handle, YUY2_VGA);
}

#[test]
fn disconnect_unknown_is_a_no_op() {
    let driver = driver_with([webcam(WEBCAM), webcam("cam1")]);
    let mut service = service(&driver);
    service.connect("cam1", MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();

    assert!(!service.disconnect(WEBCAM));
    assert!(!service.disconnect("cam1-typo"));
    assert!(service.is_connected("cam1"));
    assert!(driver.is_running("cam1"));
}

#[test]
fn session_keeps_the_graph_until_disconnect() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    let frames = Collected::default();
    service.connect(WEBCAM, MJPG_1080P, 333_333, frames.handler(), None).unwrap();

    assert!(driver.graph_held(WEBCAM));
    assert!(driver.push_frame(WEBCAM, 0.0, &[0xFF, 0xD8]));
    assert!(driver.push_frame(WEBCAM, 0.033, &[0xFF, 0xD8]));
    assert_eq!(frames.len(), 2);

    assert!(service.disconnect(WEBCAM));
    assert!(!driver.graph_held(WEBCAM));
}

#[test]
fn disconnect_stops_delivery() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    let frames = Collected::default();
    service.connect(WEBCAM, MJPG_1080P, 333_333, frames.handler(), None).unwrap();

    assert!(driver.push_frame(WEBCAM, 0.0, &[1, 2, 3]));
    assert_eq!(service.frames_delivered(WEBCAM), Some(1));
    assert!(service.disconnect(WEBCAM));

    assert!(!driver.is_running(WEBCAM));
    assert!(!driver.has_live_callback(WEBCAM));
    assert!(!driver.push_frame(WEBCAM, 0.1, &[1, 2, 3]));
    assert_eq!(frames.len(), 1);
    assert_eq!(service.poll_event(WEBCAM), EventPoll::NotConnected);
    assert_eq!(service.poll_event(WEBCAM).to_raw(), -1);
}

#[test]
fn startup_events_are_observable_without_verification() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = CaptureService::with_config(Arc::new(driver.clone()), ServiceConfig::new().verify_events(false));
    service.connect(WEBCAM, MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();

    let polls: Vec<i32> = (0..4).map(|_| service.poll_event(WEBCAM).to_raw()).collect();
    assert_eq!(polls, vec![0x0D, 0x0E, 0, 0]);
}

#[test]
fn verification_consumes_startup_events() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    service.connect(WEBCAM, MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();

    assert_eq!(service.poll_event(WEBCAM), EventPoll::Empty);
    driver.push_event(WEBCAM, EventCode::DEVICE_LOST);
    assert_eq!(service.poll_event(WEBCAM), EventPoll::Event(EventCode::DEVICE_LOST));
    assert_eq!(service.poll_event(WEBCAM).to_raw(), 0);
}

#[test]
fn busy_device_is_rolled_back() {
    let driver = driver_with([webcam(WEBCAM).in_use()]);
    let mut service = service(&driver);
    let mut log = AuditLog::with_capacity(64 * 1024);

    let err = service
        .connect(WEBCAM, MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, Some(&mut log))
        .unwrap_err();
    assert!(matches!(err, CameraError::DeviceBusy));
    assert!(!service.is_connected(WEBCAM));
    assert_eq!(driver.running_pipelines(), 0);
    assert!(!driver.has_live_callback(WEBCAM));
    assert!(log.as_str().contains("code 3"), "{}", log.as_str());
}

#[test]
fn unknown_device_fails_without_side_effects() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    let mut log = AuditLog::with_capacity(64 * 1024);

    let err = service
        .connect("no-such-device", MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, Some(&mut log))
        .unwrap_err();
    assert!(matches!(err, CameraError::DeviceNotFound(_)));
    assert!(log.as_str().contains("Skipping this device"));
    assert!(log.as_str().contains("[FAILURE] Finding the requested device"));
    assert_eq!(driver.running_pipelines(), 0);
}

#[test]
fn rejected_interval_is_a_negotiation_failure() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    let mut log = AuditLog::with_capacity(64 * 1024);

    let err = service
        .connect(WEBCAM, MJPG_1080P, 1, |_: camhub::Frame<'_>| {}, Some(&mut log))
        .unwrap_err();
    assert!(matches!(err, CameraError::NegotiationFailed(_)));
    // 日志里带有平台的原生错误文本
    assert!(log.as_str().contains("An invalid media type was specified."), "{}", log.as_str());
    assert!(!service.is_connected(WEBCAM));
}

#[test]
fn out_of_range_handle_is_rejected() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    let err = service
        .connect(WEBCAM, ConfigHandle::capture(9), 333_333, |_: camhub::Frame<'_>| {}, None)
        .unwrap_err();
    assert!(matches!(err, CameraError::InvalidConfigHandle(9)));
}

#[test]
fn failures_after_graph_creation_leak_nothing() {
    for device in [webcam(WEBCAM).failing_render(), webcam(WEBCAM).failing_run()] {
        let driver = driver_with([device]);
        let mut service = service(&driver);
        assert!(service
            .connect(WEBCAM, MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None)
            .is_err());
        assert_eq!(driver.running_pipelines(), 0);
        assert!(!driver.has_live_callback(WEBCAM));
        assert!(service.connected_devices().next().is_none());
    }
}

#[test]
fn failed_reconnect_keeps_the_old_session_closed() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    service.connect(WEBCAM, MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();

    assert!(service
        .connect(WEBCAM, MJPG_1080P, 1, |_: camhub::Frame<'_>| {}, None)
        .is_err());
    assert!(!service.is_connected(WEBCAM));
    assert_eq!(driver.running_pipelines(), 0);
}

#[test]
fn control_round_trip() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    service.connect(WEBCAM, MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();

    let zoom = Control::Camera(CameraProperty::Zoom);
    service.set_control(WEBCAM, zoom, true, 250).unwrap();
    assert_eq!(service.get_control(WEBCAM, zoom).unwrap(), ControlReading { value: 250, manual: true });
    assert_eq!(driver.control_value(WEBCAM, zoom), Some((250, ControlFlags::MANUAL)));

    let gain = Control::VideoProc(VideoProcProperty::Gain);
    service.set_control(WEBCAM, gain, false, 0).unwrap();
    assert!(!service.get_control(WEBCAM, gain).unwrap().manual);

    // 超出范围、不支持的属性
    assert!(service.set_control(WEBCAM, zoom, true, 9_999).is_err());
    assert!(service.set_control(WEBCAM, Control::Camera(CameraProperty::Pan), true, 0).is_err());
}

#[test]
fn packed_reads_never_collide_with_the_sentinel() {
    let device = webcam(WEBCAM).video_proc_property(
        VideoProcProperty::Hue,
        camhub::PropertyRange::from_platform(-180, 180, 1, -1, ControlFlags::MANUAL),
    );
    let driver = driver_with([device]);
    let mut service = service(&driver);

    let hue = Control::VideoProc(VideoProcProperty::Hue);
    assert_eq!(service.get_control_packed(WEBCAM, hue), ControlReading::PACKED_FAILURE);

    service.connect(WEBCAM, MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();
    service.set_control(WEBCAM, hue, true, -1).unwrap();
    let packed = service.get_control_packed(WEBCAM, hue);
    assert_ne!(packed, ControlReading::PACKED_FAILURE);
    assert_eq!(ControlReading::from_packed(packed), Some(ControlReading { value: -1, manual: true }));
}

#[test]
fn controls_on_unregistered_device_fail() {
    let driver = driver_with([webcam(WEBCAM)]);
    let service = service(&driver);
    let zoom = Control::Camera(CameraProperty::Zoom);
    assert!(matches!(service.set_control(WEBCAM, zoom, true, 200), Err(CameraError::NotConnected(_))));
    assert!(matches!(service.get_control(WEBCAM, zoom), Err(CameraError::NotConnected(_))));
}

#[test]
fn missing_control_family_does_not_block_connect() {
    let driver = driver_with([webcam(WEBCAM).without_camera_control()]);
    let mut service = service(&driver);
    service.connect(WEBCAM, MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();

    let zoom = Control::Camera(CameraProperty::Zoom);
    assert!(matches!(service.get_control(WEBCAM, zoom), Err(CameraError::UnsupportedControl)));
    let brightness = Control::VideoProc(VideoProcProperty::Brightness);
    assert_eq!(service.get_control(WEBCAM, brightness).unwrap().value, 128);
}

#[test]
fn seventeenth_connect_fails_cleanly() {
    let paths: Vec<String> = (0..=MAX_SESSIONS).map(|i| format!("cam{i}")).collect();
    let driver = driver_with(paths.iter().map(|p| webcam(p)));
    let mut service = service(&driver);

    for path in &paths[..MAX_SESSIONS] {
        service.connect(path, MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();
    }

    let mut log = AuditLog::with_capacity(4096);
    let err = service
        .connect(&paths[MAX_SESSIONS], MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, Some(&mut log))
        .unwrap_err();
    assert!(matches!(err, CameraError::RegistryExhausted { capacity: 16 }));
    assert!(log.as_str().contains("[FAILURE] Reserving a session slot"));

    // 没有启动孤儿管线，已有的 16 个会话不受影响
    assert!(!driver.is_running(&paths[MAX_SESSIONS]));
    assert_eq!(driver.running_pipelines(), MAX_SESSIONS);
    assert_eq!(service.connected_devices().count(), MAX_SESSIONS);

    // 释放一个槽后可以再连接
    assert!(service.disconnect(&paths[0]));
    service
        .connect(&paths[MAX_SESSIONS], MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None)
        .unwrap();
    assert!(service.is_connected(&paths[MAX_SESSIONS]));
}

#[test]
fn reconnect_at_full_capacity_reuses_its_own_slot() {
    let driver = driver_with([webcam("cam0"), webcam("cam1")]);
    let mut service = CaptureService::with_config(Arc::new(driver.clone()), ServiceConfig::new().registry_capacity(2));
    service.connect("cam0", MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();
    service.connect("cam1", MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();

    service.connect("cam1", YUY2_VGA, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();
    assert_eq!(service.connected_devices().count(), 2);
}

#[test]
fn channel_handler_feeds_a_consumer() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    let (tx, rx) = frame_channel(2);
    service.connect(WEBCAM, MJPG_1080P, 333_333, tx, None).unwrap();

    for i in 0..4u8 {
        driver.push_frame(WEBCAM, i as f64 / 30.0, &[0xFF, 0xD8, i]);
    }
    assert_eq!(rx.dropped(), 2);
    let frame = rx.recv_timeout(Duration::from_millis(100)).unwrap();
    assert_eq!(frame.sequence, 1);
    assert!(frame.as_frame().is_compressed());

    service.disconnect(WEBCAM);
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_some());
    // 发送端随会话一起释放
    assert!(rx.recv().is_none());
}

#[test]
fn export_state_lists_readable_controls() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    assert!(service.export_state(WEBCAM).is_err());

    service.connect(WEBCAM, MJPG_1080P, 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();
    service.set_control(WEBCAM, Control::Camera(CameraProperty::Focus), true, 40).unwrap();

    let state = service.export_state(WEBCAM).unwrap();
    assert_eq!(state["backend"], "Simulation");
    assert_eq!(state["stream"]["width"], 1920);
    assert_eq!(state["controls"]["Focus"]["value"], 40);
    assert_eq!(state["controls"]["Focus"]["manual"], true);
    assert!(state["controls"].get("Pan").is_none());
    assert_eq!(state["controls"].as_object().unwrap().len(), 4);
}

#[test]
fn handler_runs_on_the_delivery_thread() {
    let driver = driver_with([webcam(WEBCAM)]);
    let mut service = service(&driver);
    let frames = Collected::default();
    service.connect(WEBCAM, MJPG_1080P, 333_333, frames.handler(), None).unwrap();

    let producer = driver.clone();
    std::thread::spawn(move || {
        for _ in 0..10 {
            producer.push_frame(WEBCAM, 0.0, &[0xFF, 0xD8]);
        }
    })
    .join()
    .unwrap();
    assert_eq!(frames.len(), 10);
    assert_eq!(service.frames_delivered(WEBCAM), Some(10));
}

#[test]
fn other_encodings_are_converted_to_bgr() {
    // 非 MJPG 的任何编码都走 BGR24 转换
    let device = SimDevice::new("Cam", "cam0").capture_config(320, 240, 12, FourCC::NV12, 333_333, 333_333);
    let driver = driver_with([device]);
    let mut service = service(&driver);
    let info = service.connect("cam0", ConfigHandle::capture(0), 333_333, |_: camhub::Frame<'_>| {}, None).unwrap();
    assert_eq!(info.format, SampleFormat::Bgr24);
}

//! 设备探测：枚举视频输入设备，读取身份、控制范围与流配置。
//!
//! 单个设备的任何失败只会把该条目标记为无效，枚举继续进行。

use camhub_core::audit::Audit;
use camhub_core::capability::{
    ConfigHandle, Control, ControlFamily, DeviceDescriptor, PinCategory, StreamConfigDescriptor,
};
use camhub_core::error::Result;
use camhub_core::traits::{CaptureFilter, DeviceMoniker, Driver, FormatRepresentation, StreamConfig};

/// 把设备描述写入调用方提供的缓冲区，返回访问过的设备数
///
/// 返回值永远不超过 `out.len()`；`out` 为空时不触碰任何条目。
/// 无法获得设备列表 (包括系统里没有任何设备) 时返回 0。
pub fn enumerate_into(
    driver: &dyn Driver,
    out: &mut [DeviceDescriptor],
    max_configs: usize,
    audit: Audit<'_>,
) -> usize {
    let capacity = out.len();
    walk_devices(driver, capacity, max_configs, audit, |index, descriptor| {
        out[index] = descriptor;
    })
}

/// 返回最多 `max_count` 个设备描述 (包括无效条目)
///
/// 只为实际访问到的设备分配空间，`max_count` 只是上限。
pub fn enumerate(
    driver: &dyn Driver,
    max_count: usize,
    max_configs: usize,
    audit: Audit<'_>,
) -> Vec<DeviceDescriptor> {
    let mut devices = Vec::new();
    walk_devices(driver, max_count, max_configs, audit, |_, descriptor| devices.push(descriptor));
    devices
}

/// 依次探测至多 `limit` 个设备，把每个描述交给 `emit`，返回访问过的设备数
fn walk_devices(
    driver: &dyn Driver,
    limit: usize,
    max_configs: usize,
    mut audit: Audit<'_>,
    mut emit: impl FnMut(usize, DeviceDescriptor),
) -> usize {
    audit.note(">>> Log for enumerate() <<<");

    let monikers = match audit.check("Creating the Video Input Device Enumerator", driver.video_inputs()) {
        Ok(list) => list,
        Err(_) => return 0,
    };

    let mut count = 0;
    for moniker in monikers.into_iter().take(limit) {
        audit.note("Enumerating a Device...");
        let mut descriptor = DeviceDescriptor::default();
        if let Err(e) = probe_device(moniker.as_ref(), &mut descriptor, max_configs, &mut audit) {
            tracing::debug!(index = count, error = %e, "device marked invalid");
        }
        emit(count, descriptor);
        count += 1;
    }

    tracing::info!(backend = driver.backend(), devices = count, "enumeration finished");
    count
}

fn probe_device(
    moniker: &dyn DeviceMoniker,
    slot: &mut DeviceDescriptor,
    max_configs: usize,
    audit: &mut Audit<'_>,
) -> Result<()> {
    *slot = DeviceDescriptor::default();

    let result = fill_descriptor(moniker, slot, max_configs, audit);
    if result.is_err() {
        // 身份字符串保留下来方便诊断，其余内容清空
        let name = std::mem::take(&mut slot.name);
        let path = std::mem::take(&mut slot.path);
        *slot = DeviceDescriptor {
            name,
            path,
            ..DeviceDescriptor::default()
        };
    }
    result
}

fn fill_descriptor(
    moniker: &dyn DeviceMoniker,
    slot: &mut DeviceDescriptor,
    max_configs: usize,
    audit: &mut Audit<'_>,
) -> Result<()> {
    slot.name = audit.check("Reading the Friendly Name", moniker.friendly_name())?;
    slot.path = audit.check("Reading the Device Path", moniker.device_path())?;

    let filter = audit.check("Getting the Base Filter", moniker.bind())?;

    probe_properties(filter.as_ref(), slot, audit);

    let capture = audit.check(
        "Getting the Stream Configuration interface for the Capture Pin",
        filter.stream_config(PinCategory::Capture),
    )?;
    collect_pin_configs(capture.as_ref(), PinCategory::Capture, &mut slot.configs, max_configs, audit)?;

    // preview 引脚是可选的，失败不影响设备有效性
    let preview = audit
        .check(
            "Getting the Stream Configuration interface for the Preview Pin",
            filter.stream_config(PinCategory::Preview),
        )
        .and_then(|config| {
            collect_pin_configs(config.as_ref(), PinCategory::Preview, &mut slot.configs, max_configs, audit)
        });
    if preview.is_err() {
        audit.note("Preview Pin not available, continuing with the Capture Pin only");
    }

    slot.valid = true;
    Ok(())
}

/// 读取两族属性的范围；没有某族接口或某个属性都是正常情况
fn probe_properties(filter: &dyn CaptureFilter, slot: &mut DeviceDescriptor, audit: &mut Audit<'_>) {
    for family in ControlFamily::ALL {
        let step = match family {
            ControlFamily::Camera => "Getting the Camera Control interface",
            ControlFamily::VideoProc => "Getting the Video Proc Amp interface",
        };
        let Ok(control) = audit.check(step, filter.property_control(family)) else {
            continue;
        };

        for selector in Control::all().filter(|c| c.family() == family) {
            if let Ok(range) = control.range(selector.selector()) {
                *slot.property_mut(selector) = range;
            }
        }
    }
}

/// 追加一个引脚的视频配置
///
/// 只保留基本表示的条目；preview 引脚上与已有条目重复的格式会被跳过。
fn collect_pin_configs(
    config: &dyn StreamConfig,
    pin: PinCategory,
    out: &mut Vec<StreamConfigDescriptor>,
    max_configs: usize,
    audit: &mut Audit<'_>,
) -> Result<()> {
    let count = audit.check("Getting the number of Stream Capabilities", config.capability_count())?;

    for index in 0..count {
        if out.len() >= max_configs {
            audit.note("Reached the maximum number of Stream Configurations");
            break;
        }

        let caps = audit.check("Getting a Stream Capability", config.stream_caps(index))?;
        if caps.representation != FormatRepresentation::VideoInfo {
            continue;
        }

        let descriptor = StreamConfigDescriptor {
            handle: ConfigHandle::new(pin, index),
            width: caps.width,
            height: caps.height,
            color_depth: caps.color_depth,
            fourcc: caps.fourcc,
            min_interval: caps.min_interval,
            max_interval: caps.max_interval,
        };

        if pin == PinCategory::Preview && out.iter().any(|c| c.same_format(&descriptor)) {
            continue;
        }
        out.push(descriptor);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camhub_core::capability::{CameraProperty, ControlFlags, PropertyRange, VideoProcProperty};
    use camhub_core::pixel_format::FourCC;
    use camhub_simulation::{SimDevice, SimDriver};

    fn webcam() -> SimDevice {
        SimDevice::new("Webcam", "\\\\?\\usb#cam0")
            .camera_property(CameraProperty::Zoom, PropertyRange::from_platform(100, 500, 1, 100, ControlFlags::MANUAL))
            .video_proc_property(
                VideoProcProperty::Brightness,
                PropertyRange::from_platform(-64, 64, 1, 0, ControlFlags::all()),
            )
            .capture_config(1920, 1080, 16, FourCC::MJPG, 333_333, 10_000_000)
            .capture_config(640, 480, 16, FourCC::YUY2, 333_333, 10_000_000)
            .preview_config(640, 480, 16, FourCC::YUY2, 333_333, 10_000_000)
            .preview_config(320, 240, 16, FourCC::YUY2, 333_333, 10_000_000)
    }

    #[test]
    fn zero_capacity_touches_nothing() {
        let driver = SimDriver::new().with_device(webcam());
        let mut out: [DeviceDescriptor; 0] = [];
        assert_eq!(enumerate_into(&driver, &mut out, 32, Audit::disabled()), 0);
    }

    #[test]
    fn count_is_clipped_to_buffer() {
        let driver = SimDriver::new()
            .with_device(webcam())
            .with_device(SimDevice::new("Second", "cam1"))
            .with_device(SimDevice::new("Third", "cam2"));
        let devices = enumerate(&driver, 2, 32, Audit::disabled());
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[1].name, "Second");
    }

    #[test]
    fn preview_duplicates_are_dropped() {
        let driver = SimDriver::new().with_device(webcam());
        let devices = enumerate(&driver, 4, 32, Audit::disabled());
        let cam = &devices[0];
        assert!(cam.valid);
        assert_eq!(cam.configs.len(), 3);
        assert_eq!(cam.configs[2].handle, ConfigHandle::preview(1));
        assert_eq!(cam.configs[2].width, 320);
    }

    #[test]
    fn records_only_supported_properties() {
        let driver = SimDriver::new().with_device(webcam());
        let cam = &enumerate(&driver, 1, 32, Audit::disabled())[0];

        let zoom = cam.property(Control::Camera(CameraProperty::Zoom));
        assert!(zoom.supported);
        assert_eq!((zoom.minimum, zoom.maximum), (100, 500));
        assert!(!zoom.automatic_allowed);

        assert!(!cam.property(Control::Camera(CameraProperty::Pan)).supported);
        assert_eq!(cam.supported_controls().count(), 2);
    }

    #[test]
    fn config_cap_applies_across_pins() {
        let driver = SimDriver::new().with_device(webcam());
        let cam = &enumerate(&driver, 1, 2, Audit::disabled())[0];
        assert!(cam.valid);
        assert_eq!(cam.configs.len(), 2);
        assert!(cam.configs.iter().all(|c| c.handle.pin == PinCategory::Capture));
    }

    #[test]
    fn huge_capacity_allocates_only_what_exists() {
        let driver = SimDriver::new().with_device(webcam());
        let devices = enumerate(&driver, usize::MAX / 2, 32, Audit::disabled());
        assert_eq!(devices.len(), 1);
        assert!(devices[0].valid);
    }
}

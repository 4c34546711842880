//! 平台接口的仿真实现。每个对象只记住 (共享状态, 设备索引)，调用时再加锁访问。

use crate::{hresult, platform_error, DeviceState, PipelineState, Shared, SimProperty};
use camhub_core::capability::{ControlFamily, ControlFlags, PinCategory, PropertyRange};
use camhub_core::error::Result;
use camhub_core::event::EventCode;
use camhub_core::pixel_format::SampleFormat;
use camhub_core::traits::{
    CaptureFilter, DeviceMoniker, FilterGraph, Geometry, MediaControl, MediaEvent, PropertyControl,
    SampleCallback, StreamCaps, StreamConfig,
};
use std::collections::BTreeMap;
use std::sync::Weak;

#[derive(Debug, Clone)]
struct DeviceRef {
    shared: Shared,
    index: usize,
}

impl DeviceRef {
    fn with<T>(&self, f: impl FnOnce(&mut DeviceState) -> Result<T>) -> Result<T> {
        let mut world = self.shared.lock();
        match world.devices.get_mut(self.index) {
            Some(device) => f(device),
            None => Err(platform_error(hresult::E_FAIL, "Unspecified error")),
        }
    }
}

// --- 设备标识 ---

#[derive(Debug)]
pub(crate) struct SimMoniker(DeviceRef);

impl SimMoniker {
    pub(crate) fn new(shared: Shared, index: usize) -> Self {
        Self(DeviceRef { shared, index })
    }
}

impl DeviceMoniker for SimMoniker {
    fn friendly_name(&self) -> Result<String> {
        self.0.with(|d| {
            d.profile
                .name
                .clone()
                .ok_or_else(|| platform_error(hresult::E_FAIL, "Unspecified error"))
        })
    }

    fn device_path(&self) -> Result<String> {
        self.0.with(|d| {
            d.profile
                .path
                .clone()
                .ok_or_else(|| platform_error(hresult::E_FAIL, "Unspecified error"))
        })
    }

    fn bind(&self) -> Result<Box<dyn CaptureFilter>> {
        self.0.with(|d| {
            if d.profile.bind_fails {
                return Err(platform_error(hresult::ERROR_GEN_FAILURE, "A device attached to the system is not functioning."));
            }
            Ok(())
        })?;
        Ok(Box::new(SimFilter(self.0.clone())))
    }
}

// --- 设备对象 ---

#[derive(Debug)]
struct SimFilter(DeviceRef);

impl CaptureFilter for SimFilter {
    fn property_control(&self, family: ControlFamily) -> Result<Box<dyn PropertyControl>> {
        self.0.with(|d| {
            let present = match family {
                ControlFamily::Camera => d.profile.camera.is_some(),
                ControlFamily::VideoProc => d.profile.video_proc.is_some(),
            };
            if present {
                Ok(())
            } else {
                Err(platform_error(hresult::E_NOINTERFACE, "No such interface supported"))
            }
        })?;
        Ok(Box::new(SimPropertyControl {
            device: self.0.clone(),
            family,
        }))
    }

    fn stream_config(&self, pin: PinCategory) -> Result<Box<dyn StreamConfig>> {
        self.0.with(|d| {
            if pins(d, pin).is_some() {
                Ok(())
            } else {
                Err(platform_error(hresult::E_PROP_ID_UNSUPPORTED, "Element not found."))
            }
        })?;
        Ok(Box::new(SimStreamConfig {
            device: self.0.clone(),
            pin,
        }))
    }

    fn create_graph(&self) -> Result<Box<dyn FilterGraph>> {
        let generation = self.0.with(|d| {
            d.generation += 1;
            d.pipeline = PipelineState {
                graph_held: true,
                ..PipelineState::default()
            };
            Ok(d.generation)
        })?;
        Ok(Box::new(SimGraph {
            device: self.0.clone(),
            generation,
            owner: true,
        }))
    }
}

fn pins(d: &DeviceState, pin: PinCategory) -> Option<&Vec<StreamCaps>> {
    match pin {
        PinCategory::Capture => d.profile.capture.as_ref(),
        PinCategory::Preview => d.profile.preview.as_ref(),
    }
}

// --- 属性控制 ---

#[derive(Debug)]
struct SimPropertyControl {
    device: DeviceRef,
    family: ControlFamily,
}

impl SimPropertyControl {
    fn with_property<T>(&self, property: i32, f: impl FnOnce(&mut SimProperty) -> Result<T>) -> Result<T> {
        let family = self.family;
        self.device.with(|d| {
            let props: Option<&mut BTreeMap<i32, SimProperty>> = match family {
                ControlFamily::Camera => d.profile.camera.as_mut(),
                ControlFamily::VideoProc => d.profile.video_proc.as_mut(),
            };
            match props.and_then(|p| p.get_mut(&property)) {
                Some(prop) => f(prop),
                None => Err(platform_error(hresult::E_PROP_ID_UNSUPPORTED, "Element not found.")),
            }
        })
    }
}

impl PropertyControl for SimPropertyControl {
    fn range(&self, property: i32) -> Result<PropertyRange> {
        self.with_property(property, |p| Ok(p.range))
    }

    fn get(&self, property: i32) -> Result<(i32, ControlFlags)> {
        self.with_property(property, |p| Ok((p.value, p.flags)))
    }

    fn set(&self, property: i32, value: i32, flags: ControlFlags) -> Result<()> {
        self.with_property(property, |p| {
            let invalid = || platform_error(hresult::E_INVALIDARG, "The parameter is incorrect.");
            if flags.contains(ControlFlags::MANUAL) {
                if !p.range.manual_allowed || !p.range.contains(value) {
                    return Err(invalid());
                }
                p.value = value;
            } else if !p.range.automatic_allowed {
                return Err(invalid());
            }
            p.flags = flags;
            Ok(())
        })
    }
}

// --- 流配置 ---

#[derive(Debug)]
struct SimStreamConfig {
    device: DeviceRef,
    pin: PinCategory,
}

impl StreamConfig for SimStreamConfig {
    fn capability_count(&self) -> Result<u32> {
        let pin = self.pin;
        self.device.with(|d| Ok(pins(d, pin).map_or(0, |list| list.len() as u32)))
    }

    fn stream_caps(&self, index: u32) -> Result<StreamCaps> {
        let pin = self.pin;
        self.device.with(|d| {
            pins(d, pin)
                .and_then(|list| list.get(index as usize))
                .copied()
                .ok_or_else(|| platform_error(hresult::E_INVALIDARG, "The parameter is incorrect."))
        })
    }

    fn set_format(&self, caps: &StreamCaps) -> Result<()> {
        let pin = self.pin;
        self.device.with(|d| {
            let entry = pins(d, pin)
                .and_then(|list| list.get(caps.index as usize))
                .copied()
                .ok_or_else(|| platform_error(hresult::E_INVALIDARG, "The parameter is incorrect."))?;

            let in_range = caps.interval >= entry.min_interval && caps.interval <= entry.max_interval;
            if d.profile.reject_formats || !in_range {
                return Err(platform_error(hresult::VFW_E_INVALIDMEDIATYPE, "An invalid media type was specified."));
            }
            d.negotiated = Some((pin, StreamCaps { interval: caps.interval, ..entry }));
            Ok(())
        })
    }
}

// --- 管线 ---

#[derive(Debug)]
struct SimGraph {
    device: DeviceRef,
    generation: u64,
    // 只有 create_graph 返回的那个对象代表图本身，控制/事件句柄不算
    owner: bool,
}

impl SimGraph {
    fn with_pipeline<T>(&self, f: impl FnOnce(&mut DeviceState) -> Result<T>) -> Result<T> {
        let generation = self.generation;
        self.device.with(|d| {
            if d.generation != generation {
                return Err(platform_error(hresult::VFW_E_WRONG_STATE, "The operation could not be performed because the filter is in the wrong state."));
            }
            f(d)
        })
    }
}

impl Drop for SimGraph {
    fn drop(&mut self) {
        if !self.owner {
            return;
        }
        // 已被新图取代时状态属于新图，不去碰它
        let _ = self.with_pipeline(|d| {
            d.pipeline.graph_held = false;
            Ok(())
        });
    }
}

impl FilterGraph for SimGraph {
    fn add_sample_grabber(&mut self, format: SampleFormat) -> Result<()> {
        self.with_pipeline(|d| {
            d.pipeline.format = Some(format);
            Ok(())
        })
    }

    fn set_buffer_samples(&mut self, buffer: bool) -> Result<()> {
        self.with_pipeline(|d| {
            d.pipeline.buffer_samples = Some(buffer);
            Ok(())
        })
    }

    fn disable_reference_clock(&mut self) -> Result<()> {
        self.with_pipeline(|d| {
            d.pipeline.clock_disabled = true;
            Ok(())
        })
    }

    fn add_discard_sink(&mut self) -> Result<()> {
        self.with_pipeline(|d| {
            d.pipeline.discard_sink = true;
            Ok(())
        })
    }

    fn render_stream(&mut self, pin: PinCategory) -> Result<()> {
        self.with_pipeline(|d| {
            let complete = d.pipeline.format.is_some() && d.pipeline.discard_sink && pins(d, pin).is_some();
            if d.profile.render_fails || !complete {
                return Err(platform_error(
                    hresult::VFW_E_CANNOT_CONNECT,
                    "No combination of intermediate filters could be found to make the connection.",
                ));
            }
            d.pipeline.rendered = Some(pin);
            Ok(())
        })
    }

    fn connected_geometry(&self) -> Result<Geometry> {
        self.with_pipeline(|d| {
            let not_connected = || {
                platform_error(
                    hresult::VFW_E_NOT_CONNECTED,
                    "The operation cannot be performed because the pins are not connected.",
                )
            };
            let pin = d.pipeline.rendered.ok_or_else(not_connected)?;
            if let Some(geometry) = d.profile.geometry {
                return Ok(geometry);
            }
            match d.negotiated {
                Some((negotiated_pin, caps)) if negotiated_pin == pin => Ok(Geometry {
                    width: caps.width,
                    height: caps.height,
                }),
                _ => Err(not_connected()),
            }
        })
    }

    fn set_sample_callback(&mut self, callback: Weak<dyn SampleCallback>) -> Result<()> {
        self.with_pipeline(|d| {
            d.pipeline.callback = Some(callback);
            Ok(())
        })
    }

    fn media_control(&self) -> Result<Box<dyn MediaControl>> {
        Ok(Box::new(SimMediaControl(SimGraph {
            device: self.device.clone(),
            generation: self.generation,
            owner: false,
        })))
    }

    fn media_event(&self) -> Result<Box<dyn MediaEvent>> {
        Ok(Box::new(SimMediaEvent(SimGraph {
            device: self.device.clone(),
            generation: self.generation,
            owner: false,
        })))
    }
}

#[derive(Debug)]
struct SimMediaControl(SimGraph);

impl MediaControl for SimMediaControl {
    fn run(&self) -> Result<()> {
        self.0.with_pipeline(|d| {
            if d.profile.run_fails {
                return Err(platform_error(hresult::ERROR_GEN_FAILURE, "A device attached to the system is not functioning."));
            }
            if d.pipeline.rendered.is_none() {
                return Err(platform_error(
                    hresult::VFW_E_NOT_CONNECTED,
                    "The operation cannot be performed because the pins are not connected.",
                ));
            }
            d.pipeline.running = true;
            d.pipeline.events = d.profile.startup_events.iter().copied().collect();
            tracing::trace!(device = ?d.profile.path(), "simulated pipeline running");
            Ok(())
        })
    }

    fn stop(&self) -> Result<()> {
        let stopped = self.0.with_pipeline(|d| {
            d.pipeline.running = false;
            tracing::trace!(device = ?d.profile.path(), "simulated pipeline stopped");
            Ok(())
        });
        // 已被新管线取代时没有什么可停的
        if let Err(e) = stopped {
            tracing::trace!(error = %e, "stop on a stale pipeline");
        }
        Ok(())
    }
}

#[derive(Debug)]
struct SimMediaEvent(SimGraph);

impl MediaEvent for SimMediaEvent {
    fn poll(&self) -> Result<Option<EventCode>> {
        self.0.with_pipeline(|d| Ok(d.pipeline.events.pop_front()))
    }
}

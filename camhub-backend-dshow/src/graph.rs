#![allow(non_upper_case_globals)]

use camhub_core::capability::PinCategory;
use camhub_core::error::{CameraError, Result};
use camhub_core::event::EventCode;
use camhub_core::pixel_format::SampleFormat;
use camhub_core::traits::{FilterGraph, Geometry, MediaControl, MediaEvent, SampleCallback};
use std::sync::Weak;
use windows::core::{w, Interface, GUID};
use windows::Win32::Foundation::E_ABORT;
use windows::Win32::Media::DirectShow::{
    IBaseFilter, ICaptureGraphBuilder2, IGraphBuilder, IMediaControl, IMediaEvent, IMediaFilter, IReferenceClock,
};
use windows::Win32::Media::MediaFoundation::AM_MEDIA_TYPE;
use windows::Win32::System::Com::{CoCreateInstance, CLSCTX_INPROC_SERVER};

use crate::grabber::{GrabberCallback, ISampleGrabber, ISampleGrabberCB, CALLBACK_BUFFER, CLSID_NullRenderer, CLSID_SampleGrabber};
use crate::pixel_map::{self, MEDIATYPE_Video};
use crate::stream::{free_media_type_fields, video_info};
use crate::hresult_error;

pub const CLSID_FilterGraph: GUID = GUID::from_u128(0xe436ebb3_524f_11ce_9f53_0020af0ba770);
pub const CLSID_CaptureGraphBuilder2: GUID = GUID::from_u128(0xbf87b6e1_8c27_11d0_b3f0_00aa003761c5);

/// 源 -> Sample Grabber -> Null Renderer
pub struct DshowGraph {
    graph: IGraphBuilder,
    builder: ICaptureGraphBuilder2,
    source: IBaseFilter,
    grabber_filter: Option<IBaseFilter>,
    grabber: Option<ISampleGrabber>,
    renderer: Option<IBaseFilter>,
    // 回调对象的生命周期跟随图；会话在停止管线之后才释放图
    callback: Option<ISampleGrabberCB>,
}

unsafe impl Send for DshowGraph {}

impl DshowGraph {
    pub fn new(source: &IBaseFilter) -> Result<Self> {
        unsafe {
            let graph: IGraphBuilder =
                CoCreateInstance(&CLSID_FilterGraph, None, CLSCTX_INPROC_SERVER).map_err(hresult_error)?;
            let builder: ICaptureGraphBuilder2 =
                CoCreateInstance(&CLSID_CaptureGraphBuilder2, None, CLSCTX_INPROC_SERVER).map_err(hresult_error)?;
            builder.SetFiltergraph(&graph).map_err(hresult_error)?;
            graph.AddFilter(source, w!("Capture Filter")).map_err(hresult_error)?;

            Ok(Self {
                graph,
                builder,
                source: source.clone(),
                grabber_filter: None,
                grabber: None,
                renderer: None,
                callback: None,
            })
        }
    }

    fn grabber(&self) -> Result<&ISampleGrabber> {
        self.grabber
            .as_ref()
            .ok_or_else(|| CameraError::NegotiationFailed("sample grabber not added".to_string()))
    }
}

impl FilterGraph for DshowGraph {
    fn add_sample_grabber(&mut self, format: SampleFormat) -> Result<()> {
        unsafe {
            let filter: IBaseFilter =
                CoCreateInstance(&CLSID_SampleGrabber, None, CLSCTX_INPROC_SERVER).map_err(hresult_error)?;
            self.graph.AddFilter(&filter, w!("Sample Grabber")).map_err(hresult_error)?;
            let grabber: ISampleGrabber = filter.cast().map_err(hresult_error)?;

            let media_type = AM_MEDIA_TYPE {
                majortype: MEDIATYPE_Video,
                subtype: pixel_map::sample_subtype(format),
                ..Default::default()
            };
            grabber.SetMediaType(&media_type).ok().map_err(hresult_error)?;

            self.grabber_filter = Some(filter);
            self.grabber = Some(grabber);
        }
        Ok(())
    }

    fn set_buffer_samples(&mut self, buffer: bool) -> Result<()> {
        let grabber = self.grabber()?;
        unsafe { grabber.SetBufferSamples(buffer.into()).ok().map_err(hresult_error) }
    }

    fn disable_reference_clock(&mut self) -> Result<()> {
        unsafe {
            let filter: IMediaFilter = self.graph.cast().map_err(hresult_error)?;
            filter.SetSyncSource(None::<&IReferenceClock>).map_err(hresult_error)
        }
    }

    fn add_discard_sink(&mut self) -> Result<()> {
        unsafe {
            let renderer: IBaseFilter =
                CoCreateInstance(&CLSID_NullRenderer, None, CLSCTX_INPROC_SERVER).map_err(hresult_error)?;
            self.graph.AddFilter(&renderer, w!("Null Renderer")).map_err(hresult_error)?;
            self.renderer = Some(renderer);
        }
        Ok(())
    }

    fn render_stream(&mut self, pin: PinCategory) -> Result<()> {
        let (Some(grabber), Some(renderer)) = (self.grabber_filter.as_ref(), self.renderer.as_ref()) else {
            return Err(CameraError::NegotiationFailed("graph is missing grabber or renderer".to_string()));
        };
        let category = pixel_map::pin_category(pin);
        unsafe {
            self.builder
                .RenderStream(
                    Some(&category as *const GUID),
                    Some(&MEDIATYPE_Video as *const GUID),
                    &self.source,
                    grabber,
                    renderer,
                )
                .map_err(|e| CameraError::NegotiationFailed(format!("RenderStream failed: {}", e.message())))
        }
    }

    fn connected_geometry(&self) -> Result<Geometry> {
        let grabber = self.grabber()?;
        unsafe {
            let mut media_type = AM_MEDIA_TYPE::default();
            grabber
                .GetConnectedMediaType(&mut media_type)
                .ok()
                .map_err(hresult_error)?;
            let geometry = video_info(&media_type).map(|vih| Geometry {
                width: vih.bmi_header.biWidth,
                height: vih.bmi_header.biHeight,
            });
            free_media_type_fields(&mut media_type);
            geometry.ok_or_else(|| CameraError::NegotiationFailed("connected type has no VIDEOINFOHEADER".to_string()))
        }
    }

    fn set_sample_callback(&mut self, callback: Weak<dyn SampleCallback>) -> Result<()> {
        let grabber = self.grabber()?.clone();
        let callback: ISampleGrabberCB = GrabberCallback::new(callback).into();
        unsafe {
            grabber
                .SetCallback(callback.as_raw(), CALLBACK_BUFFER)
                .ok()
                .map_err(hresult_error)?;
        }
        self.callback = Some(callback);
        Ok(())
    }

    fn media_control(&self) -> Result<Box<dyn MediaControl>> {
        let control: IMediaControl = self.graph.cast().map_err(hresult_error)?;
        Ok(Box::new(DshowMediaControl { control }))
    }

    fn media_event(&self) -> Result<Box<dyn MediaEvent>> {
        let events: IMediaEvent = self.graph.cast().map_err(hresult_error)?;
        Ok(Box::new(DshowMediaEvent { events }))
    }
}

impl Drop for DshowGraph {
    fn drop(&mut self) {
        // 先让采样器放开回调，再释放回调对象
        if let (Some(grabber), Some(_)) = (self.grabber.as_ref(), self.callback.as_ref()) {
            let hr = unsafe { grabber.SetCallback(std::ptr::null_mut(), CALLBACK_BUFFER) };
            if hr.is_err() {
                tracing::trace!(target: "camhub::dshow", "clearing the grabber callback failed: {hr:?}");
            }
        }
        self.callback = None;
    }
}

pub struct DshowMediaControl {
    control: IMediaControl,
}

unsafe impl Send for DshowMediaControl {}

impl MediaControl for DshowMediaControl {
    fn run(&self) -> Result<()> {
        unsafe { self.control.Run().map_err(hresult_error) }
    }

    fn stop(&self) -> Result<()> {
        unsafe { self.control.Stop().map_err(hresult_error) }
    }
}

pub struct DshowMediaEvent {
    events: IMediaEvent,
}

unsafe impl Send for DshowMediaEvent {}

impl MediaEvent for DshowMediaEvent {
    fn poll(&self) -> Result<Option<EventCode>> {
        let (mut code, mut param1, mut param2) = (0i32, 0isize, 0isize);
        unsafe {
            match self.events.GetEvent(&mut code, &mut param1, &mut param2, 0) {
                Ok(()) => {
                    if let Err(e) = self.events.FreeEventParams(code, param1, param2) {
                        tracing::trace!(target: "camhub::dshow", "FreeEventParams failed: {e}");
                    }
                    Ok(Some(EventCode(code)))
                }
                // 队列为空时返回 E_ABORT
                Err(e) => {
                    if e.code() != E_ABORT {
                        tracing::trace!(target: "camhub::dshow", "GetEvent failed: {e}");
                    }
                    Ok(None)
                }
            }
        }
    }
}

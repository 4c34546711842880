#![allow(non_upper_case_globals)]

use camhub_core::capability::{ControlFamily, PinCategory};
use camhub_core::error::Result;
use camhub_core::traits::{CaptureFilter, DeviceMoniker, FilterGraph, PropertyControl, StreamConfig};
use windows::core::{w, Interface, BSTR, GUID, PCWSTR, VARIANT};
use windows::Win32::Media::DirectShow::{
    IAMCameraControl, IAMStreamConfig, IAMVideoProcAmp, IBaseFilter, ICaptureGraphBuilder2, ICreateDevEnum,
};
use windows::Win32::Foundation::S_OK;
use windows::Win32::System::Com::StructuredStorage::IPropertyBag;
use windows::Win32::System::Com::{CoCreateInstance, IEnumMoniker, IMoniker, CLSCTX_INPROC_SERVER};

use crate::controls::DshowPropertyControl;
use crate::graph::{DshowGraph, CLSID_CaptureGraphBuilder2};
use crate::pixel_map::{self, MEDIATYPE_Video};
use crate::stream::DshowStreamConfig;
use crate::{hresult_error, initialize_com};

pub const CLSID_SystemDeviceEnum: GUID = GUID::from_u128(0x62be5d10_60eb_11d0_bd3b_00a0c911ce86);
pub const CLSID_VideoInputDeviceCategory: GUID = GUID::from_u128(0x860bb310_5d01_11d0_bd3b_00a0c911ce86);

/// 按系统枚举顺序列出视频输入设备
pub(crate) fn video_inputs() -> Result<Vec<Box<dyn DeviceMoniker>>> {
    unsafe {
        let dev_enum: ICreateDevEnum =
            CoCreateInstance(&CLSID_SystemDeviceEnum, None, CLSCTX_INPROC_SERVER).map_err(hresult_error)?;

        let mut enumerator: Option<IEnumMoniker> = None;
        dev_enum
            .CreateClassEnumerator(&CLSID_VideoInputDeviceCategory, &mut enumerator, 0)
            .map_err(hresult_error)?;

        // 没有任何设备时返回 S_FALSE 且枚举器为空
        let Some(enumerator) = enumerator else {
            tracing::debug!(target: "camhub::dshow", "no video input devices");
            return Ok(Vec::new());
        };

        let mut devices: Vec<Box<dyn DeviceMoniker>> = Vec::new();
        loop {
            let mut slot = [None];
            if enumerator.Next(&mut slot, None) != S_OK {
                break;
            }
            if let Some(moniker) = slot[0].take() {
                devices.push(Box::new(DshowMoniker { moniker }));
            }
        }
        Ok(devices)
    }
}

pub struct DshowMoniker {
    moniker: IMoniker,
}

// COM 对象在多线程套间中创建
unsafe impl Send for DshowMoniker {}

impl DshowMoniker {
    fn read_property(&self, name: PCWSTR) -> Result<String> {
        unsafe {
            let bag: IPropertyBag = self.moniker.BindToStorage(None, None).map_err(hresult_error)?;
            let mut value = VARIANT::default();
            bag.Read(name, &mut value, None).map_err(hresult_error)?;
            let text = BSTR::try_from(&value).map_err(hresult_error)?;
            Ok(text.to_string())
        }
    }
}

impl DeviceMoniker for DshowMoniker {
    fn friendly_name(&self) -> Result<String> {
        self.read_property(w!("FriendlyName"))
    }

    fn device_path(&self) -> Result<String> {
        self.read_property(w!("DevicePath"))
    }

    fn bind(&self) -> Result<Box<dyn CaptureFilter>> {
        initialize_com()?;
        unsafe {
            let filter: IBaseFilter = self.moniker.BindToObject(None, None).map_err(hresult_error)?;
            let builder: ICaptureGraphBuilder2 =
                CoCreateInstance(&CLSID_CaptureGraphBuilder2, None, CLSCTX_INPROC_SERVER).map_err(hresult_error)?;
            Ok(Box::new(DshowFilter { filter, builder }))
        }
    }
}

/// 已绑定的采集设备 (Base Filter)
pub struct DshowFilter {
    filter: IBaseFilter,
    builder: ICaptureGraphBuilder2,
}

unsafe impl Send for DshowFilter {}

impl DshowFilter {
    /// 在指定引脚上查找接口
    unsafe fn find_interface<T: Interface>(&self, pin: PinCategory) -> Result<T> {
        let category = pixel_map::pin_category(pin);
        let mut raw = std::ptr::null_mut();
        self.builder
            .FindInterface(
                Some(&category as *const GUID),
                Some(&MEDIATYPE_Video as *const GUID),
                &self.filter,
                &T::IID,
                &mut raw,
            )
            .map_err(hresult_error)?;
        Ok(T::from_raw(raw))
    }
}

impl CaptureFilter for DshowFilter {
    fn property_control(&self, family: ControlFamily) -> Result<Box<dyn PropertyControl>> {
        let control = match family {
            ControlFamily::Camera => {
                DshowPropertyControl::Camera(self.filter.cast::<IAMCameraControl>().map_err(hresult_error)?)
            }
            ControlFamily::VideoProc => {
                DshowPropertyControl::VideoProc(self.filter.cast::<IAMVideoProcAmp>().map_err(hresult_error)?)
            }
        };
        Ok(Box::new(control))
    }

    fn stream_config(&self, pin: PinCategory) -> Result<Box<dyn StreamConfig>> {
        let config: IAMStreamConfig = unsafe { self.find_interface(pin)? };
        Ok(Box::new(DshowStreamConfig::new(config)))
    }

    fn create_graph(&self) -> Result<Box<dyn FilterGraph>> {
        Ok(Box::new(DshowGraph::new(&self.filter)?))
    }
}

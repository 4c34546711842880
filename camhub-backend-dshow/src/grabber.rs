//! Sample Grabber (qedit.h)。新版 SDK 已移除这些声明，这里按原始 vtable 布局重新定义。

#![allow(non_snake_case)]

use camhub_core::traits::SampleCallback;
use std::ffi::c_void;
use std::sync::Weak;
use windows::core::GUID;
use windows::Win32::Foundation::{E_NOTIMPL, S_OK};
use windows::Win32::Media::MediaFoundation::AM_MEDIA_TYPE;
use windows_core::{implement, interface, IUnknown, IUnknown_Vtbl, BOOL, HRESULT};

pub const CLSID_SampleGrabber: GUID = GUID::from_u128(0xc1f400a0_3f08_11d3_9f0b_006008039e37);
pub const CLSID_NullRenderer: GUID = GUID::from_u128(0xc1f400a4_3f08_11d3_9f0b_006008039e37);

/// SetCallback 的第二个参数：1 = BufferCB
pub const CALLBACK_BUFFER: i32 = 1;

#[interface("6b652fff-11fe-4fce-92ad-0266b5d7c78f")]
pub unsafe trait ISampleGrabber: IUnknown {
    unsafe fn SetOneShot(&self, one_shot: BOOL) -> HRESULT;
    unsafe fn SetMediaType(&self, media_type: *const AM_MEDIA_TYPE) -> HRESULT;
    unsafe fn GetConnectedMediaType(&self, media_type: *mut AM_MEDIA_TYPE) -> HRESULT;
    unsafe fn SetBufferSamples(&self, buffer: BOOL) -> HRESULT;
    unsafe fn GetCurrentBuffer(&self, size: *mut i32, buffer: *mut i32) -> HRESULT;
    unsafe fn GetCurrentSample(&self, sample: *mut *mut c_void) -> HRESULT;
    unsafe fn SetCallback(&self, callback: *mut c_void, which: i32) -> HRESULT;
}

#[interface("0579154a-2b53-4994-b0d0-e773148eff85")]
pub unsafe trait ISampleGrabberCB: IUnknown {
    unsafe fn SampleCB(&self, sample_time: f64, sample: *mut c_void) -> HRESULT;
    unsafe fn BufferCB(&self, sample_time: f64, buffer: *mut u8, len: i32) -> HRESULT;
}

/// 采样器回调：只持有会话交付端的弱引用
#[implement(ISampleGrabberCB)]
pub struct GrabberCallback {
    target: Weak<dyn SampleCallback>,
}

impl GrabberCallback {
    pub fn new(target: Weak<dyn SampleCallback>) -> Self {
        Self { target }
    }
}

impl ISampleGrabberCB_Impl for GrabberCallback_Impl {
    unsafe fn SampleCB(&self, _sample_time: f64, _sample: *mut c_void) -> HRESULT {
        E_NOTIMPL
    }

    unsafe fn BufferCB(&self, sample_time: f64, buffer: *mut u8, len: i32) -> HRESULT {
        if buffer.is_null() || len <= 0 {
            return S_OK;
        }
        if let Some(target) = self.target.upgrade() {
            // 缓冲区只在本次调用期间有效
            let data = std::slice::from_raw_parts(buffer as *const u8, len as usize);
            target.buffer_cb(sample_time, data);
        }
        S_OK
    }
}

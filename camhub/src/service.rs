use crate::backend::BackendType;
use crate::config::ServiceConfig;
use crate::pipeline::{self, ConnectStage, StageTracker, StreamInfo};
use crate::prober;
use crate::registry::{DeviceRegistry, Session};
use crate::verifier;
use camhub_core::audit::{Audit, AuditLog};
use camhub_core::capability::{ConfigHandle, Control, ControlReading, DeviceDescriptor};
use camhub_core::error::{CameraError, Result};
use camhub_core::event::EventPoll;
use camhub_core::frame::FrameHandler;
use camhub_core::traits::Driver;
use std::sync::Arc;

/// 采集服务：设备探测 + 会话表
///
/// 所有以设备路径寻址的调用都在这里按会话表分发。会话表不是线程安全的，
/// 需要跨线程使用时由调用方加锁 (e.g. `Mutex<CaptureService>`)；帧回调本身运行在
/// 管线线程上，不受此限制。
pub struct CaptureService {
    driver: Arc<dyn Driver>,
    config: ServiceConfig,
    registry: DeviceRegistry,
}

impl CaptureService {
    pub fn new(driver: Arc<dyn Driver>) -> Self {
        Self::with_config(driver, ServiceConfig::default())
    }

    pub fn with_config(driver: Arc<dyn Driver>, config: ServiceConfig) -> Self {
        tracing::debug!(backend = driver.backend(), ?config, "capture service created");
        Self {
            registry: DeviceRegistry::with_capacity(config.registry_capacity),
            driver,
            config,
        }
    }

    /// 使用当前平台的默认后端
    pub fn with_default_backend() -> Result<Self> {
        Self::with_backend(crate::backend::default_backend())
    }

    pub fn with_backend(backend: BackendType) -> Result<Self> {
        Ok(Self::new(crate::backend::create_driver_for(backend)?))
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // --- 设备探测 ---

    /// 返回最多 `max_count` 个设备描述，包括探测失败 (`valid == false`) 的条目
    pub fn enumerate(&self, max_count: usize, log: Option<&mut AuditLog>) -> Vec<DeviceDescriptor> {
        prober::enumerate(
            self.driver.as_ref(),
            max_count,
            self.config.max_configs_per_device,
            Audit::new(log),
        )
    }

    /// 写入调用方的缓冲区，返回访问过的设备数
    pub fn enumerate_into(&self, out: &mut [DeviceDescriptor], log: Option<&mut AuditLog>) -> usize {
        prober::enumerate_into(
            self.driver.as_ref(),
            out,
            self.config.max_configs_per_device,
            Audit::new(log),
        )
    }

    /// 便捷方法：只返回有效设备
    pub fn list_devices(&self) -> Vec<DeviceDescriptor> {
        let mut devices = self.enumerate(self.config.max_devices, None);
        devices.retain(|d| d.valid);
        devices
    }

    // --- 会话生命周期 ---

    /// 连接设备并开始交付帧
    ///
    /// 同一设备已有会话时先断开它。`handler` 在管线线程上被调用，直到断开为止。
    /// 失败时不会留下任何运行中的管线或占用的会话槽。
    pub fn connect<H>(
        &mut self,
        device_id: &str,
        handle: ConfigHandle,
        interval: i64,
        handler: H,
        log: Option<&mut AuditLog>,
    ) -> Result<StreamInfo>
    where
        H: FrameHandler + 'static,
    {
        let mut audit = Audit::new(log);
        audit.note(">>> Log for connect() <<<");

        if self.disconnect(device_id) {
            audit.note("Disconnected the existing session for this device");
        }

        let mut tracker = StageTracker::new(device_id);
        let result = self.open_and_register(device_id, handle, interval, Box::new(handler), &mut tracker, &mut audit);
        match result {
            Ok(info) => {
                tracing::info!(device = device_id, ?handle, interval, "device connected");
                Ok(info)
            }
            Err(e) => Err(tracker.fail(e)),
        }
    }

    fn open_and_register(
        &mut self,
        device_id: &str,
        handle: ConfigHandle,
        interval: i64,
        handler: Box<dyn FrameHandler>,
        tracker: &mut StageTracker<'_>,
        audit: &mut Audit<'_>,
    ) -> Result<StreamInfo> {
        // 先确认有空槽，避免无谓地打开硬件
        let capacity = self.registry.capacity();
        audit.ensure("Reserving a session slot", !self.registry.is_full(), || {
            CameraError::RegistryExhausted { capacity }
        })?;

        let session = pipeline::open_session(
            self.driver.as_ref(),
            device_id,
            handle,
            interval,
            handler,
            tracker,
            audit,
        )?;
        let info = session.info().clone();

        let inserted = self.registry.insert(session).map_err(|rejected: Session| {
            drop(rejected);
            CameraError::RegistryExhausted { capacity }
        });
        audit.check("Saving the session", inserted)?;

        if self.config.verify_events {
            let verified = match self.registry.get(device_id) {
                Some(session) => verifier::verify_exclusive_access(session.events(), audit),
                None => Err(CameraError::NotConnected(device_id.to_string())),
            };
            if let Err(e) = verified {
                drop(self.registry.remove(device_id));
                return Err(e);
            }
        }
        tracker.advance(ConnectStage::Verified);

        Ok(info)
    }

    /// 断开设备；返回之前是否存在会话
    ///
    /// 返回时管线已停止，处理器不会再被调用。
    pub fn disconnect(&mut self, device_id: &str) -> bool {
        match self.registry.remove(device_id) {
            Some(session) => {
                drop(session);
                tracing::info!(device = device_id, "device disconnected");
                true
            }
            None => false,
        }
    }

    /// 断开所有设备
    pub fn disconnect_all(&mut self) {
        self.registry.clear();
    }

    pub fn is_connected(&self, device_id: &str) -> bool {
        self.registry.contains(device_id)
    }

    pub fn connected_devices(&self) -> impl Iterator<Item = &str> + '_ {
        self.registry.device_ids()
    }

    pub fn session_info(&self, device_id: &str) -> Option<&StreamInfo> {
        self.registry.get(device_id).map(|s| s.info())
    }

    /// 已交付给处理器的帧数
    pub fn frames_delivered(&self, device_id: &str) -> Option<u64> {
        self.registry.get(device_id).map(|s| s.frames_delivered())
    }

    // --- 事件与控制 ---

    /// 非阻塞地取出一个管线事件
    pub fn poll_event(&self, device_id: &str) -> EventPoll {
        match self.registry.get(device_id) {
            Some(session) => session.poll_event(),
            None => EventPoll::NotConnected,
        }
    }

    fn session(&self, device_id: &str) -> Result<&Session> {
        self.registry
            .get(device_id)
            .ok_or_else(|| CameraError::NotConnected(device_id.to_string()))
    }

    pub fn set_control(&self, device_id: &str, control: Control, manual: bool, value: i32) -> Result<()> {
        let result = self.session(device_id)?.set_control(control, manual, value);
        if let Err(e) = &result {
            tracing::debug!(device = device_id, %control, value, manual, error = %e, "set control failed");
        }
        result
    }

    pub fn get_control(&self, device_id: &str, control: Control) -> Result<ControlReading> {
        self.session(device_id)?.get_control(control)
    }

    /// 以打包形式读取控制：低 32 位为值，高 32 位为手动标志，失败时为 -1
    pub fn get_control_packed(&self, device_id: &str, control: Control) -> i64 {
        ControlReading::pack_result(self.get_control(device_id, control))
    }

    /// 导出会话的流信息与当前可读的全部控制值
    #[cfg(feature = "serialize")]
    pub fn export_state(&self, device_id: &str) -> Result<serde_json::Value> {
        let session = self.session(device_id)?;

        let mut controls = serde_json::Map::new();
        for control in Control::all() {
            if let Ok(reading) = session.get_control(control) {
                controls.insert(
                    control.name().to_string(),
                    serde_json::json!({ "value": reading.value, "manual": reading.manual }),
                );
            }
        }

        Ok(serde_json::json!({
            "backend": self.driver.backend(),
            "stream": session.info(),
            "frames_delivered": session.frames_delivered(),
            "controls": controls,
        }))
    }
}

impl std::fmt::Debug for CaptureService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureService")
            .field("backend", &self.driver.backend())
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

use camhub_core::frame::{Frame, FrameHandler};
use camhub_core::pixel_format::SampleFormat;
use camhub_core::traits::{Geometry, SampleCallback};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// 会话的帧交付端
///
/// 管线只持有它的弱引用；会话拥有强引用并在关闭时先停止管线、再使其失效，
/// 因此会话释放后不会再有帧进入调用方的处理器。
pub struct FrameSink {
    handler: Box<dyn FrameHandler>,
    width: u32,
    height: u32,
    format: SampleFormat,
    bottom_up: bool,
    active: AtomicBool,
    delivered: AtomicU64,
}

impl FrameSink {
    pub fn new(handler: Box<dyn FrameHandler>, geometry: Geometry, format: SampleFormat) -> Self {
        Self {
            handler,
            width: geometry.width.unsigned_abs(),
            height: geometry.height.unsigned_abs(),
            format,
            // 未压缩 DIB 的正高度表示自底向上
            bottom_up: !format.is_compressed() && geometry.height > 0,
            active: AtomicBool::new(true),
            delivered: AtomicU64::new(0),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn bottom_up(&self) -> bool {
        self.bottom_up
    }

    /// 之后到达的样本全部丢弃
    pub fn invalidate(&self) {
        self.active.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn frames_delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }
}

impl SampleCallback for FrameSink {
    fn buffer_cb(&self, sample_time: f64, buffer: &[u8]) {
        if !self.is_active() {
            return;
        }
        let sequence = self.delivered.fetch_add(1, Ordering::Relaxed) + 1;
        self.handler.on_frame(Frame {
            data: buffer,
            width: self.width,
            height: self.height,
            format: self.format,
            bottom_up: self.bottom_up,
            sequence,
            sample_time,
        });
    }
}

impl std::fmt::Debug for FrameSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSink")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("bottom_up", &self.bottom_up)
            .field("active", &self.is_active())
            .field("delivered", &self.frames_delivered())
            .finish()
    }
}

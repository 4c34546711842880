//! 把帧回调桥接到消费线程的有界通道。
//!
//! 发送端作为 [`FrameHandler`] 交给会话；它在管线线程上运行，永不阻塞：
//! 通道满时当前帧被丢弃并计数。

use camhub_core::frame::{Frame, FrameHandler, OwnedFrame};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// 创建容量为 `capacity` 的帧通道 (至少为 1)
pub fn frame_channel(capacity: usize) -> (FrameSender, FrameReceiver) {
    let (tx, rx) = bounded(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        FrameSender {
            tx,
            dropped: dropped.clone(),
        },
        FrameReceiver { rx, dropped },
    )
}

#[derive(Debug)]
pub struct FrameSender {
    tx: Sender<OwnedFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameHandler for FrameSender {
    fn on_frame(&self, frame: Frame<'_>) {
        // 满了就不必拷贝
        if self.tx.is_full() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        match self.tx.try_send(frame.to_owned_frame()) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
            // 接收端已经不在了，帧没有去处
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

#[derive(Debug)]
pub struct FrameReceiver {
    rx: Receiver<OwnedFrame>,
    dropped: Arc<AtomicU64>,
}

impl FrameReceiver {
    /// 阻塞等待下一帧；会话断开且通道为空时返回 None
    pub fn recv(&self) -> Option<OwnedFrame> {
        self.rx.recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<OwnedFrame> {
        match self.rx.recv_timeout(timeout) {
            Ok(frame) => Some(frame),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    pub fn try_recv(&self) -> Option<OwnedFrame> {
        self.rx.try_recv().ok()
    }

    /// 只保留最新的一帧，丢掉积压的旧帧
    pub fn latest(&self) -> Option<OwnedFrame> {
        self.rx.try_iter().last()
    }

    /// 因通道满而被丢弃的帧数
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camhub_core::pixel_format::SampleFormat;

    fn frame(data: &[u8], sequence: u64) -> Frame<'_> {
        Frame {
            data,
            width: 1,
            height: 1,
            format: SampleFormat::Bgr24,
            bottom_up: true,
            sequence,
            sample_time: 0.0,
        }
    }

    #[test]
    fn full_channel_drops_instead_of_blocking() {
        let (tx, rx) = frame_channel(2);
        for seq in 1..=5 {
            tx.on_frame(frame(&[1, 2, 3], seq));
        }
        assert_eq!(rx.len(), 2);
        assert_eq!(rx.dropped(), 3);
        assert_eq!(rx.try_recv().unwrap().sequence, 1);
    }

    #[test]
    fn latest_skips_backlog() {
        let (tx, rx) = frame_channel(4);
        for seq in 1..=3 {
            tx.on_frame(frame(&[seq as u8; 3], seq));
        }
        let last = rx.latest().unwrap();
        assert_eq!(last.sequence, 3);
        assert_eq!(last.data, vec![3, 3, 3]);
        assert!(rx.is_empty());
    }

    #[test]
    fn recv_ends_when_sender_is_gone() {
        let (tx, rx) = frame_channel(1);
        tx.on_frame(frame(&[0; 3], 1));
        drop(tx);
        assert!(rx.recv().is_some());
        assert!(rx.recv().is_none());
        assert!(rx.recv_timeout(Duration::from_millis(1)).is_none());
    }
}

//! 启动后的事件校验。
//!
//! 独占打开设备的管线，运行后事件队列里依次是"时钟改变"、"已暂停"，之后为空。
//! 设备已被其他进程占用时会出现错误终止等别的事件，此时连接视为失败。

use camhub_core::audit::Audit;
use camhub_core::error::{CameraError, Result};
use camhub_core::event::EventCode;
use camhub_core::traits::MediaEvent;

/// 依次期望的事件；`None` 表示队列应当为空
pub const EXPECTED_STARTUP_EVENTS: [Option<EventCode>; 3] =
    [Some(EventCode::CLOCK_CHANGED), Some(EventCode::PAUSED), None];

// 与 EXPECTED_STARTUP_EVENTS 一一对应的步骤名
const STEPS: [&str; 3] = [
    "Checking if the next event is as expected (code 13: clock changed)",
    "Checking if the next event is as expected (code 14: paused)",
    "Checking if there is another event (should not have one)",
];

/// 读取三次事件并与期望序列比较，任何偏差都返回 [`CameraError::DeviceBusy`]
pub fn verify_exclusive_access(events: &dyn MediaEvent, audit: &mut Audit<'_>) -> Result<()> {
    for (expected, step) in EXPECTED_STARTUP_EVENTS.into_iter().zip(STEPS) {
        let observed = events.poll();
        let matches = matches!(&observed, Ok(got) if *got == expected);
        if !matches {
            match &observed {
                Ok(got) => tracing::warn!(?expected, observed = ?got, "unexpected startup event"),
                Err(e) => tracing::warn!(error = %e, "event poll failed during verification"),
            }
            // 只有挂了日志时才格式化
            if let (true, Ok(Some(code))) = (audit.is_enabled(), &observed) {
                audit.note(&format!("Unexpected event: {code}"));
            }
        }
        audit.ensure(step, matches, || CameraError::DeviceBusy)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camhub_core::audit::AuditLog;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct Script(Mutex<VecDeque<Result<Option<EventCode>>>>);

    impl Script {
        fn new(events: Vec<Result<Option<EventCode>>>) -> Self {
            Self(Mutex::new(events.into()))
        }
    }

    impl MediaEvent for Script {
        fn poll(&self) -> Result<Option<EventCode>> {
            self.0.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }
    }

    #[test]
    fn clean_startup_passes() {
        let script = Script::new(vec![
            Ok(Some(EventCode::CLOCK_CHANGED)),
            Ok(Some(EventCode::PAUSED)),
        ]);
        let mut log = AuditLog::with_capacity(4096);
        verify_exclusive_access(&script, &mut Audit::new(Some(&mut log))).unwrap();
        assert_eq!(log.lines().filter(|l| l.starts_with("[SUCCESS]")).count(), 3);
    }

    #[test]
    fn error_abort_means_busy() {
        let script = Script::new(vec![
            Ok(Some(EventCode::CLOCK_CHANGED)),
            Ok(Some(EventCode::PAUSED)),
            Ok(Some(EventCode::ERROR_ABORT)),
        ]);
        let mut log = AuditLog::with_capacity(4096);
        let err = verify_exclusive_access(&script, &mut Audit::new(Some(&mut log))).unwrap_err();
        assert!(matches!(err, CameraError::DeviceBusy));
        assert!(log.as_str().contains("code 3"), "{}", log.as_str());
    }

    #[test]
    fn out_of_order_events_fail() {
        let script = Script::new(vec![Ok(Some(EventCode::PAUSED)), Ok(Some(EventCode::CLOCK_CHANGED))]);
        assert!(verify_exclusive_access(&script, &mut Audit::disabled()).is_err());
    }

    #[test]
    fn poll_failure_fails_verification() {
        let script = Script::new(vec![Err(CameraError::platform(0x8000_4005, "Unspecified error"))]);
        assert!(matches!(
            verify_exclusive_access(&script, &mut Audit::disabled()),
            Err(CameraError::DeviceBusy)
        ));
    }

    #[test]
    fn step_names_follow_expected_events() {
        for (expected, step) in EXPECTED_STARTUP_EVENTS.into_iter().zip(STEPS) {
            match expected {
                Some(code) => assert!(step.ends_with(&format!("({code})")), "{step}"),
                None => assert!(step.contains("should not have one")),
            }
        }

        let script = Script::new(vec![Ok(Some(EventCode::CLOCK_CHANGED)), Ok(Some(EventCode::PAUSED))]);
        let mut log = AuditLog::with_capacity(4096);
        verify_exclusive_access(&script, &mut Audit::new(Some(&mut log))).unwrap();
        let expected: Vec<String> = STEPS.iter().map(|s| format!("[SUCCESS] {s}")).collect();
        assert_eq!(log.lines().collect::<Vec<_>>(), expected);
    }
}

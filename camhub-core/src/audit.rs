//! 诊断日志：调用方可选提供的定长文本缓冲区。
//!
//! 每一步追加一行 `[SUCCESS] ...` 或 `[FAILURE] ...`；写满后静默停止追加。
//! 同一信息总会以 `tracing` 事件输出，缓冲区只是额外的、给调用方看的副本。

use crate::error::{CameraError, Result};
use std::fmt::Write as _;

#[derive(Debug, Clone, Default)]
pub struct AuditLog {
    text: String,
    capacity: usize,
    full: bool,
}

impl AuditLog {
    /// 创建一个最多容纳 `capacity` 字节的日志
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            text: String::with_capacity(capacity.min(64 * 1024)),
            capacity,
            full: capacity == 0,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.lines()
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.full = self.capacity == 0;
    }

    /// 追加一行纯文本
    pub fn note(&mut self, message: &str) {
        self.append(format_args!("{message}"));
    }

    pub fn success(&mut self, step: &str) {
        self.append(format_args!("[SUCCESS] {step}"));
    }

    pub fn failure(&mut self, step: &str, error: &CameraError) {
        match error {
            CameraError::Platform { code, message } => {
                self.append(format_args!("[FAILURE] {step}, code = {code:#010x} = {message}"))
            }
            other => self.append(format_args!("[FAILURE] {step}, {other}")),
        }
    }

    fn append(&mut self, line: std::fmt::Arguments<'_>) {
        if self.full {
            return;
        }
        let mut rendered = String::new();
        let _ = writeln!(rendered, "{line}");
        if self.text.len() + rendered.len() > self.capacity {
            // 写不下就视为已满，之后不再追加
            self.full = true;
            return;
        }
        self.text.push_str(&rendered);
    }
}

/// 把每个步骤同时记录到 tracing 与 (可选的) [`AuditLog`]
#[derive(Debug)]
pub struct Audit<'a> {
    log: Option<&'a mut AuditLog>,
}

impl<'a> Audit<'a> {
    pub fn new(log: Option<&'a mut AuditLog>) -> Self {
        Self { log }
    }

    pub fn disabled() -> Self {
        Self { log: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.log.is_some()
    }

    pub fn note(&mut self, message: &str) {
        tracing::debug!(target: "camhub", "{}", message);
        if let Some(log) = self.log.as_deref_mut() {
            log.note(message);
        }
    }

    /// 记录一个步骤的结果并原样返回
    pub fn check<T>(&mut self, step: &str, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => {
                tracing::debug!(target: "camhub", step, "step succeeded");
                if let Some(log) = self.log.as_deref_mut() {
                    log.success(step);
                }
            }
            Err(e) => {
                tracing::warn!(target: "camhub", step, error = %e, "step failed");
                if let Some(log) = self.log.as_deref_mut() {
                    log.failure(step, e);
                }
            }
        }
        result
    }

    /// 把一个布尔判定当作步骤记录，false 时返回给定错误
    pub fn ensure(&mut self, step: &str, ok: bool, error: impl FnOnce() -> CameraError) -> Result<()> {
        let result = if ok { Ok(()) } else { Err(error()) };
        self.check(step, result)
    }
}

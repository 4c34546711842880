use anyhow::Result;
use camhub::{AuditLog, CaptureMode, CaptureService};
use std::time::Duration;

fn main() -> Result<()> {
    // 1. 初始化日志
    tracing_subscriber::fmt().with_max_level(tracing::Level::INFO).init();

    let mut service = CaptureService::with_default_backend()?;
    println!("Backend: {}", service.driver().backend());

    // 2. 枚举设备
    let mut log = AuditLog::with_capacity(16 * 1024);
    let devices = service.enumerate(16, Some(&mut log));
    if devices.is_empty() {
        println!("No video input devices found.\n{}", log.as_str());
        return Ok(());
    }

    for (i, dev) in devices.iter().enumerate() {
        if !dev.valid {
            println!("[{}] {} (unusable)", i, dev.name);
            continue;
        }
        println!("[{}] {}  ->  {}", i, dev.name, dev.path);
        for (control, range) in dev.supported_controls() {
            let kind = if range.is_toggle() { "toggle" } else { "range" };
            println!(
                "      {:<24} {} {}..{} (default {}, step {})",
                control.name(),
                kind,
                range.minimum,
                range.maximum,
                range.default,
                range.step
            );
        }
        for mode in CaptureMode::expand(&dev.configs) {
            println!("      {}", mode);
        }
    }

    // 3. 打开第一个可用设备的最高模式，收几帧
    let Some(dev) = devices.iter().find(|d| d.valid && !d.configs.is_empty()) else {
        return Ok(());
    };
    let Some(mode) = CaptureMode::expand(&dev.configs).into_iter().next() else {
        return Ok(());
    };
    let handle = mode.handle.ok_or_else(|| anyhow::anyhow!("mode without a configuration handle"))?;

    let (tx, rx) = camhub::frame_channel(4);
    let info = service.connect(&dev.path, handle, mode.interval, tx, None)?;
    println!("Streaming {}x{} {:?} from {}", info.width, info.height, info.format, dev.name);

    for _ in 0..30 {
        match rx.recv_timeout(Duration::from_secs(2)) {
            Some(frame) => println!("frame #{} ({} bytes)", frame.sequence, frame.data.len()),
            None => break,
        }
    }
    println!("dropped: {}", rx.dropped());

    service.disconnect(&dev.path);
    Ok(())
}

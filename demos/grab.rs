//! Grab a few frames and write them out as BMP files.
//!
//! ```text
//! cargo run --example grab -- desktop 10 framerate=10 video_size=vga
//! cargo run --example grab -- "title=Untitled - Notepad" 5 draw_mouse=0
//! ```

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use snow_grab::{CaptureOptions, CaptureSession, CaptureTarget};
use tracing_subscriber::EnvFilter;

const DEFAULT_FRAMES: usize = 5;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let target: CaptureTarget = args
        .next()
        .unwrap_or_else(|| "desktop".to_string())
        .parse()
        .context("invalid capture target")?;
    let frames = match args.next() {
        Some(raw) => raw
            .parse::<usize>()
            .with_context(|| format!("invalid frame count '{raw}'"))?,
        None => DEFAULT_FRAMES,
    };

    let mut options = CaptureOptions::default();
    for arg in args {
        let Some((name, value)) = arg.split_once('=') else {
            bail!("expected option=value, got '{arg}'");
        };
        options.set(name, value)?;
    }

    let begin = Instant::now();
    let mut session = CaptureSession::builder()
        .options(options)
        .open(&target)
        .with_context(|| format!("failed to open capture session for {target}"))?;
    let info = *session.stream_info();
    println!(
        "Opened {target} in {:.3} ms: {}x{} at {} fps, {} bit/s",
        begin.elapsed().as_secs_f64() * 1000.0,
        info.width,
        info.height,
        info.avg_frame_rate,
        info.bit_rate
    );

    let out_dir = PathBuf::from("grab-output");
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("failed to create {}", out_dir.display()))?;

    let mut written = 0;
    while written < frames {
        let frame = match session.read_frame() {
            Ok(frame) => frame,
            Err(err) if err.is_retryable() => {
                std::thread::sleep(std::time::Duration::from_millis(1));
                continue;
            }
            Err(err) => return Err(err).context("failed to read frame"),
        };
        let path = out_dir.join(format!("frame-{:04}.bmp", frame.sequence()));
        fs::write(&path, frame.data())
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!(
            "frame {} pts={}us {} bytes in {:.3} ms -> {}",
            frame.sequence(),
            frame.pts_us(),
            frame.len(),
            frame.metadata.capture_duration.as_secs_f64() * 1000.0,
            path.display()
        );
        written += 1;
    }

    session.close();
    Ok(())
}

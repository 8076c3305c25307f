//! Media duration probing.

use super::cmd::{path_arg, status_text, ToolRunner};
use std::path::Path;

/// Container duration in milliseconds.
///
/// Uses the `ffprobe` CLI through `runner`; with the `native-probe` feature the
/// container is opened in-process through libav instead.
#[cfg(not(feature = "native-probe"))]
pub async fn probe_duration_ms(runner: &dyn ToolRunner, path: &Path) -> Result<u64, String> {
    let args = vec![
        "-v".to_string(),
        "error".to_string(),
        "-show_entries".to_string(),
        "format=duration".to_string(),
        "-of".to_string(),
        "default=noprint_wrappers=1:nokey=1".to_string(),
        path_arg(path),
    ];
    let cwd = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let output = runner
        .run("ffprobe", &args, cwd)
        .await
        .map_err(|e| format!("ffprobe failed to start: {}", e))?;

    if !output.status.success() {
        return Err(format!(
            "ffprobe {} for {}: {}",
            status_text(&output),
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    parse_duration_output(&String::from_utf8_lossy(&output.stdout))
}

#[cfg(feature = "native-probe")]
pub async fn probe_duration_ms(_runner: &dyn ToolRunner, path: &Path) -> Result<u64, String> {
    use ffmpeg_next as ffmpeg;

    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        ffmpeg::init().map_err(|e| e.to_string())?;
        let context = ffmpeg::format::input(&path)
            .map_err(|e| format!("Error opening {}: {}", path.display(), e))?;
        let duration = context.duration();
        if duration <= 0 {
            return Err(format!("No duration for {}", path.display()));
        }
        Ok((duration as f64 / f64::from(ffmpeg::ffi::AV_TIME_BASE) * 1000.0).round() as u64)
    })
    .await
    .map_err(|e| e.to_string())?
}

/// Parse ffprobe's bare `format=duration` output (seconds).
pub fn parse_duration_output(stdout: &str) -> Result<u64, String> {
    let raw = stdout.trim();
    let seconds: f64 = raw
        .parse()
        .map_err(|_| format!("unexpected ffprobe duration '{}'", raw))?;
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(format!("invalid duration '{}'", raw));
    }
    Ok((seconds * 1000.0).round() as u64)
}

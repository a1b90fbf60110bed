//! Local audio capture: ffmpeg grabs the configured input device and encodes MP3 to
//! stdout, which is streamed to the HTTP client as it arrives.

use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::Bytes;
use futures_util::Stream;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::io::ReaderStream;

use crate::config::CaptureConfig;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("capture process has no stdout")]
    NoStdout,
}

pub fn ffmpeg_command(config: &CaptureConfig) -> Command {
    let mut cmd = Command::new(&config.ffmpeg);
    cmd.args(["-hide_banner", "-loglevel", "error"]);
    cmd.arg("-f").arg(&config.input_format);
    cmd.arg("-i").arg(&config.input_device);
    cmd.args(["-vn", "-ac", "2", "-codec:a", "libmp3lame"]);
    cmd.arg("-b:a").arg(&config.bitrate);
    cmd.args(["-f", "mp3", "pipe:1"]);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Owns the ffmpeg child for as long as the response body is alive.
struct CaptureSession {
    child: Child,
    started: Instant,
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        tracing::info!(
            "Capture client gone after {:.1}s, stopping ffmpeg (pid {:?})",
            self.started.elapsed().as_secs_f64(),
            self.child.id()
        );
        if let Err(e) = self.child.start_kill() {
            tracing::debug!("ffmpeg already exited: {}", e);
        }
    }
}

/// MP3 bytes from a running capture. Dropping it (client disconnect, server
/// shutdown) kills the ffmpeg process.
pub struct CaptureStream {
    inner: ReaderStream<ChildStdout>,
    _session: CaptureSession,
}

impl Stream for CaptureStream {
    type Item = std::io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Start ffmpeg and return its MP3 output as a byte stream.
pub fn start(config: &CaptureConfig) -> Result<CaptureStream, CaptureError> {
    let mut child = ffmpeg_command(config).spawn().map_err(|source| CaptureError::Spawn {
        program: config.ffmpeg.display().to_string(),
        source,
    })?;
    tracing::info!(
        "Started audio capture from {}:{} (pid {:?})",
        config.input_format,
        config.input_device,
        child.id()
    );

    let stdout = child.stdout.take().ok_or(CaptureError::NoStdout)?;
    if let Some(stderr) = child.stderr.take() {
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::warn!("ffmpeg: {}", line);
            }
        });
    }

    Ok(CaptureStream {
        inner: ReaderStream::new(stdout),
        _session: CaptureSession {
            child,
            started: Instant::now(),
        },
    })
}

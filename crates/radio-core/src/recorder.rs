//! Short audio capture for song recognition.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use radio_proto::config::RecognitionConfig;
use tracing::{debug, info};

/// Records `clip_seconds` of the configured input device as raw mono
/// 44.1 kHz s16le, the format the recognition API expects.
pub struct ClipRecorder {
    ffmpeg: PathBuf,
    config: RecognitionConfig,
}

impl ClipRecorder {
    pub fn new(ffmpeg: PathBuf, config: RecognitionConfig) -> Self {
        Self { ffmpeg, config }
    }

    /// Uses `FFMPEG_PATH`, beside the exe, then PATH.
    pub fn from_config(config: RecognitionConfig) -> Result<Self> {
        let ffmpeg = radio_proto::platform::find_ffmpeg_binary()
            .context("ffmpeg not found (install it or set FFMPEG_PATH)")?;
        Ok(Self::new(ffmpeg, config))
    }

    pub async fn record(&self) -> Result<Vec<u8>> {
        let out = &self.config.clip_file;
        if let Some(parent) = out.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let args = ffmpeg_args(&self.config, out);
        debug!("recorder: {} {}", self.ffmpeg.display(), args.join(" "));
        info!("recorder: capturing {} s", self.config.clip_seconds);

        let output = tokio::process::Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .context("Failed to run ffmpeg")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: Vec<&str> = stderr.lines().rev().take(3).collect();
            anyhow::bail!(
                "recording failed ({}): {}",
                output.status,
                tail.into_iter().rev().collect::<Vec<_>>().join(" | ")
            );
        }

        let clip = tokio::fs::read(out)
            .await
            .with_context(|| format!("Failed to read clip {:?}", out))?;
        if clip.is_empty() {
            anyhow::bail!("recorded clip is empty");
        }
        Ok(clip)
    }
}

pub fn ffmpeg_args(config: &RecognitionConfig, out: &Path) -> Vec<String> {
    vec![
        "-y".into(),
        "-f".into(),
        config.input_format.clone(),
        "-i".into(),
        config.input_device.clone(),
        "-t".into(),
        config.clip_seconds.to_string(),
        "-filter:a".into(),
        format!("volume={:.1}", config.volume_boost),
        "-ac".into(),
        "1".into(),
        "-ar".into(),
        "44100".into(),
        "-acodec".into(),
        "pcm_s16le".into(),
        "-f".into(),
        "s16le".into(),
        out.display().to_string(),
    ]
}

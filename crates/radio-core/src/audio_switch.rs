//! Output-device switching through `SwitchAudioSource` (macOS).
//!
//! Bluetooth output can't be captured for song recognition, so while the
//! player runs we route audio through a multi-output device that also feeds
//! a loopback input.  The returned guard puts the original device back when
//! dropped.

use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use radio_proto::config::AudioConfig;
use tracing::{info, warn};

pub fn is_bluetooth(device: &str, keywords: &[String]) -> bool {
    let device = device.to_lowercase();
    keywords.iter().any(|k| device.contains(&k.to_lowercase()))
}

pub struct AudioSwitcher {
    binary: PathBuf,
    config: AudioConfig,
}

impl AudioSwitcher {
    pub fn new(binary: PathBuf, config: AudioConfig) -> Self {
        Self { binary, config }
    }

    pub fn from_config(config: AudioConfig) -> Result<Self> {
        let binary = radio_proto::platform::find_switch_audio_source_binary().context(
            "SwitchAudioSource not found. Install it with 'brew install switchaudio-osx'",
        )?;
        Ok(Self::new(binary, config))
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.binary)
            .args(args)
            .output()
            .with_context(|| format!("Failed to run {}", self.binary.display()))?;
        if !output.status.success() {
            anyhow::bail!(
                "SwitchAudioSource {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    pub fn current_device(&self) -> Result<String> {
        Ok(self.run(&["-c"])?.trim().to_string())
    }

    pub fn output_devices(&self) -> Result<Vec<String>> {
        Ok(self
            .run(&["-a", "-t", "output"])?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    pub fn switch_to(&self, device: &str) -> Result<()> {
        self.run(&["-s", device])?;
        info!("audio: switched output to {}", device);
        Ok(())
    }

    /// Route through the multi-output device if the current output is
    /// bluetooth.  Keep the guard alive for the whole session.
    pub fn setup(self) -> Result<AudioRouteGuard> {
        let original = self.current_device()?;
        info!("audio: current output device {}", original);

        let mut switched = false;
        if is_bluetooth(&original, &self.config.bluetooth_keywords) {
            let devices = self.output_devices()?;
            if !devices.iter().any(|d| d == &self.config.multi_output_device) {
                anyhow::bail!(
                    "multi-output device {:?} not configured; set it up with BlackHole first",
                    self.config.multi_output_device
                );
            }
            self.switch_to(&self.config.multi_output_device)?;
            switched = true;
        }

        Ok(AudioRouteGuard {
            switcher: self,
            original,
            switched,
        })
    }
}

#[must_use = "dropping the guard restores the original output device"]
pub struct AudioRouteGuard {
    switcher: AudioSwitcher,
    original: String,
    switched: bool,
}

impl AudioRouteGuard {
    pub fn original_device(&self) -> &str {
        &self.original
    }

    pub fn switched(&self) -> bool {
        self.switched
    }

    /// Put the original device back, or the fallback speakers if it went
    /// away (headphones turned off mid-session).
    pub fn restore(&mut self) -> Result<()> {
        if !self.switched {
            return Ok(());
        }
        self.switched = false;

        let available = self.switcher.output_devices()?;
        let target = if available.iter().any(|d| d == &self.original) {
            self.original.as_str()
        } else {
            self.switcher.config.fallback_device.as_str()
        };
        self.switcher.switch_to(target)
    }
}

impl Drop for AudioRouteGuard {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            warn!("audio: failed to restore output device: {:#}", e);
        }
    }
}

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// Directory name used under the config / data / cache roots.
const APP_DIR: &str = "cli-radio";

/// Global flag to control whether to use system-installed binaries from PATH
/// instead of ones shipped beside the executable.
/// Defaults to false (look beside the executable first).
static USE_SYSTEM_DEPS: AtomicBool = AtomicBool::new(false);

/// Set whether to use system dependencies (from PATH) instead of bundled ones.
pub fn set_use_system_deps(use_system: bool) {
    USE_SYSTEM_DEPS.store(use_system, Ordering::Relaxed);
}

/// Check whether to use system dependencies from PATH.
pub fn should_use_system_deps() -> bool {
    USE_SYSTEM_DEPS.load(Ordering::Relaxed)
}

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/cli-radio/ (XDG standard)
    // instead of macOS Application Support for consistency
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_DIR)
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn config_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn temp_dir() -> PathBuf {
    std::env::temp_dir()
}

pub fn cache_dir() -> PathBuf {
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(temp_dir)
            .join(".cache")
            .join(APP_DIR)
    }
    #[cfg(windows)]
    {
        dirs::cache_dir().unwrap_or_else(temp_dir).join(APP_DIR)
    }
}

#[cfg(unix)]
fn mpv_binary_names() -> &'static [&'static str] {
    &["mpv"]
}

#[cfg(windows)]
fn mpv_binary_names() -> &'static [&'static str] {
    &["mpv.exe", "mpv"]
}

#[cfg(unix)]
fn ffmpeg_binary_names() -> &'static [&'static str] {
    &["ffmpeg"]
}

#[cfg(windows)]
fn ffmpeg_binary_names() -> &'static [&'static str] {
    &["ffmpeg.exe", "ffmpeg"]
}

fn find_beside_exe(names: &[&str]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.exists() {
            return Some(p);
        }
        let p = dir.join("external").join(name);
        if p.exists() {
            return Some(p);
        }
    }
    None
}

fn find_on_path(names: &[&str]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        for name in names {
            let p = dir.join(name);
            if p.is_file() {
                return Some(p);
            }
        }
    }
    None
}

fn find_binary(names: &[&str], env_override: &str) -> Option<PathBuf> {
    if let Ok(p) = std::env::var(env_override) {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!("{} points at missing {}", env_override, path.display());
    }

    let bundled = if should_use_system_deps() {
        None
    } else {
        find_beside_exe(names)
    };
    let found = bundled.or_else(|| find_on_path(names));
    match &found {
        Some(p) => tracing::debug!("using {}", p.display()),
        None => tracing::debug!("none of {:?} found", names),
    }
    found
}

/// Find mpv binary for playback.
/// `MPV_PATH` wins; then beside the exe (unless use_system_deps); then PATH.
pub fn find_mpv_binary() -> Option<PathBuf> {
    find_binary(mpv_binary_names(), "MPV_PATH")
}

/// Find ffmpeg binary for audio capture.
pub fn find_ffmpeg_binary() -> Option<PathBuf> {
    find_binary(ffmpeg_binary_names(), "FFMPEG_PATH")
}

/// Find the macOS `SwitchAudioSource` helper (brew install switchaudio-osx).
pub fn find_switch_audio_source_binary() -> Option<PathBuf> {
    find_on_path(&["SwitchAudioSource"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_are_namespaced() {
        assert!(data_dir().ends_with(APP_DIR));
        assert!(config_dir().ends_with(APP_DIR));
        assert!(cache_dir().ends_with(APP_DIR));
    }

    #[test]
    fn test_missing_binary_is_none() {
        assert!(find_on_path(&["definitely-not-a-real-binary-4f2a"]).is_none());
    }
}

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Explicit mpv path.  When unset, mpv is looked up beside the exe / on PATH.
    #[serde(default)]
    pub binary: Option<PathBuf>,
    /// lavfi chain applied to every station so loudness is consistent.
    #[serde(default = "default_audio_filter")]
    pub audio_filter: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// How long `stop` waits for the killed process group to be reaped.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

/// radio-browser.info search filters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Host whose `/json/servers` lists the live mirrors.
    #[serde(default = "default_bootstrap_host")]
    pub bootstrap_host: String,
    /// Mirror used when server discovery fails.
    #[serde(default = "default_fallback_server")]
    pub fallback_server: String,
    #[serde(default = "default_min_bitrate")]
    pub min_bitrate: u32,
    #[serde(default = "default_true")]
    pub hide_broken: bool,
    #[serde(default = "default_excluded_tags")]
    pub excluded_tags: Vec<String>,
    #[serde(default = "default_excluded_languages")]
    pub excluded_languages: Vec<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default = "default_playlist_name")]
    pub playlist_name: String,
    /// Local port for the OAuth redirect (`http://127.0.0.1:<port>/callback`).
    #[serde(default = "default_redirect_port")]
    pub redirect_port: u16,
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,
    #[serde(default = "default_playlist_file")]
    pub playlist_file: PathBuf,
    #[serde(default = "default_auth_timeout_secs")]
    pub auth_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognitionConfig {
    /// ffmpeg `-f` input format used for capture (avfoundation, pulse, dshow...).
    #[serde(default = "default_input_format")]
    pub input_format: String,
    /// ffmpeg `-i` capture device.
    #[serde(default = "default_input_device")]
    pub input_device: String,
    #[serde(default = "default_clip_seconds")]
    pub clip_seconds: u32,
    #[serde(default = "default_volume_boost")]
    pub volume_boost: f32,
    #[serde(default = "default_clip_file")]
    pub clip_file: PathBuf,
    #[serde(default = "default_rapidapi_host")]
    pub rapidapi_host: String,
}

/// Output-device switching (macOS `SwitchAudioSource`).  Bluetooth output
/// cannot be captured directly, so the session routes through a
/// multi-output device that includes a loopback input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_audio_switch_enabled")]
    pub enabled: bool,
    #[serde(default = "default_multi_output_device")]
    pub multi_output_device: String,
    #[serde(default = "default_fallback_device")]
    pub fallback_device: String,
    #[serde(default = "default_bluetooth_keywords")]
    pub bluetooth_keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationConfig {
    /// Ask before adding a search hit that looks different from the
    /// now-playing text.
    #[serde(default = "default_true")]
    pub confirm_fuzzy_matches: bool,
    /// When true, `play` also moves the current station into the
    /// previous slot instead of discarding it.
    #[serde(default)]
    pub random_remembers_current: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            binary: None,
            audio_filter: default_audio_filter(),
            extra_args: Vec::new(),
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            bootstrap_host: default_bootstrap_host(),
            fallback_server: default_fallback_server(),
            min_bitrate: default_min_bitrate(),
            hide_broken: true,
            excluded_tags: default_excluded_tags(),
            excluded_languages: default_excluded_languages(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            playlist_name: default_playlist_name(),
            redirect_port: default_redirect_port(),
            token_file: default_token_file(),
            playlist_file: default_playlist_file(),
            auth_timeout_secs: default_auth_timeout_secs(),
        }
    }
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            input_format: default_input_format(),
            input_device: default_input_device(),
            clip_seconds: default_clip_seconds(),
            volume_boost: default_volume_boost(),
            clip_file: default_clip_file(),
            rapidapi_host: default_rapidapi_host(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enabled: default_audio_switch_enabled(),
            multi_output_device: default_multi_output_device(),
            fallback_device: default_fallback_device(),
            bluetooth_keywords: default_bluetooth_keywords(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            confirm_fuzzy_matches: true,
            random_remembers_current: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_audio_filter() -> String {
    "lavfi=[loudnorm=I=-16:TP=-1.5:LRA=11],lavfi=[aresample=48000]".to_string()
}

fn default_stop_grace_ms() -> u64 {
    2000
}

fn default_bootstrap_host() -> String {
    "all.api.radio-browser.info".to_string()
}

fn default_fallback_server() -> String {
    "https://de1.api.radio-browser.info".to_string()
}

fn default_min_bitrate() -> u32 {
    96
}

fn default_excluded_tags() -> Vec<String> {
    ["news", "news+talk", "military", "sports", "podcast", "podcasts"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_excluded_languages() -> Vec<String> {
    ["chinese", "iranian", "mandarin"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_request_timeout_secs() -> u64 {
    15
}

fn default_playlist_name() -> String {
    "TEMPLE".to_string()
}

fn default_redirect_port() -> u16 {
    8888
}

fn default_token_file() -> PathBuf {
    platform::data_dir().join("spotify_token.json")
}

fn default_playlist_file() -> PathBuf {
    platform::data_dir().join("spotify_playlist.json")
}

fn default_auth_timeout_secs() -> u64 {
    300
}

fn default_input_format() -> String {
    if cfg!(target_os = "macos") {
        "avfoundation".to_string()
    } else if cfg!(windows) {
        "dshow".to_string()
    } else {
        "pulse".to_string()
    }
}

fn default_input_device() -> String {
    if cfg!(target_os = "macos") {
        // audio-only capture from the second avfoundation device (loopback)
        ":1".to_string()
    } else {
        "default".to_string()
    }
}

fn default_clip_seconds() -> u32 {
    7
}

fn default_volume_boost() -> f32 {
    7.0
}

fn default_clip_file() -> PathBuf {
    platform::cache_dir().join("clip.raw")
}

fn default_rapidapi_host() -> String {
    "shazam.p.rapidapi.com".to_string()
}

fn default_audio_switch_enabled() -> bool {
    cfg!(target_os = "macos")
}

fn default_multi_output_device() -> String {
    "Blackhole+Bose".to_string()
}

fn default_fallback_device() -> String {
    "MacBook Pro Speakers".to_string()
}

fn default_bluetooth_keywords() -> Vec<String> {
    ["Headphones", "Bose", "Sony", "AirPods", "Bluetooth", "BT"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load `path`, writing a default config there first if it does not exist.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

/// API secrets.  Read from the environment (a `.env` file is honoured by the
/// binaries) and never written to the config file.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub spotify: Option<SpotifyCredentials>,
    pub rapidapi_key: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SpotifyCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl Credentials {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let spotify = match (var("CLIENT_ID"), var("CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(SpotifyCredentials {
                client_id,
                client_secret,
            }),
            _ => None,
        };

        Self {
            spotify,
            rapidapi_key: var("RAPID_API_KEY"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.directory.min_bitrate, 96);
        assert!(config.directory.excluded_tags.contains(&"news".to_string()));
        assert_eq!(config.spotify.playlist_name, "TEMPLE");
        assert_eq!(config.spotify.redirect_port, 8888);
        assert_eq!(config.recognition.clip_seconds, 7);
        assert!(config.navigation.confirm_fuzzy_matches);
        assert!(!config.navigation.random_remembers_current);
        assert!(config.player.audio_filter.contains("loudnorm"));
        assert!(config.player.audio_filter.contains("aresample"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [directory]
            min_bitrate = 128

            [navigation]
            confirm_fuzzy_matches = false
            "#,
        )
        .unwrap();
        assert_eq!(config.directory.min_bitrate, 128);
        assert_eq!(config.directory.excluded_languages.len(), 3);
        assert!(!config.navigation.confirm_fuzzy_matches);
        assert_eq!(config.spotify.playlist_name, "TEMPLE");
    }

    #[test]
    fn test_load_from_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.spotify.redirect_port, 8888);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.directory.bootstrap_host, config.directory.bootstrap_host);
    }
}

//! radio-browser.info station directory.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use radio_proto::config::DirectoryConfig;
use radio_proto::protocol::Station;
use serde::Deserialize;
use tracing::{debug, warn};

use super::StationDirectory;

#[derive(Debug, Deserialize)]
struct ServerEntry {
    name: String,
}

#[derive(Debug, Deserialize)]
struct StationEntry {
    #[serde(default)]
    name: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    url_resolved: String,
    #[serde(default)]
    tags: String,
}

impl From<StationEntry> for Station {
    fn from(entry: StationEntry) -> Self {
        let url = if entry.url_resolved.trim().is_empty() {
            entry.url
        } else {
            entry.url_resolved
        };
        Station {
            name: entry.name.trim().to_string(),
            url,
            tags: entry.tags,
        }
    }
}

pub struct RadioBrowser {
    client: reqwest::Client,
    config: DirectoryConfig,
}

impl RadioBrowser {
    pub fn new(config: DirectoryConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("cli-radio/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    /// Pick a live mirror at random; fall back to the configured one.
    async fn pick_server(&self) -> String {
        match self.list_servers().await {
            Ok(names) => match names.choose(&mut rand::thread_rng()) {
                Some(name) => format!("https://{}", name),
                None => self.config.fallback_server.clone(),
            },
            Err(e) => {
                warn!("radio-browser: server discovery failed: {:#}", e);
                self.config.fallback_server.clone()
            }
        }
    }

    async fn list_servers(&self) -> Result<Vec<String>> {
        let url = format!("https://{}/json/servers", self.config.bootstrap_host);
        let servers: Vec<ServerEntry> = self
            .client
            .get(&url)
            .send()
            .await
            .context("Server list request failed")?
            .error_for_status()?
            .json()
            .await
            .context("Failed to parse server list")?;

        let mut names: Vec<String> = servers.into_iter().map(|s| s.name).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// Query for `/json/stations/search`.  `nocache` defeats caching proxies so
/// every call gets a fresh random pick.
pub fn search_query(config: &DirectoryConfig, nocache: i64) -> Vec<(&'static str, String)> {
    let mut query = vec![
        ("bitrateMin", config.min_bitrate.to_string()),
        ("hidebroken", config.hide_broken.to_string()),
    ];
    for tag in &config.excluded_tags {
        query.push(("tagNot", tag.clone()));
    }
    for lang in &config.excluded_languages {
        query.push(("languageNot", lang.clone()));
    }
    query.push(("order", "random".to_string()));
    query.push(("limit", "1".to_string()));
    query.push(("nocache", nocache.to_string()));
    query
}

#[async_trait]
impl StationDirectory for RadioBrowser {
    async fn fetch_station(&self) -> Result<Station> {
        let server = self.pick_server().await;
        let nocache = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let url = format!("{}/json/stations/search", server.trim_end_matches('/'));
        debug!("radio-browser: searching {}", url);

        let response = self
            .client
            .get(&url)
            .query(&search_query(&self.config, nocache))
            .send()
            .await
            .context("Station search request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Station search failed with status {}: {}", status, body);
        }

        let stations: Vec<StationEntry> = response
            .json()
            .await
            .context("Failed to decode station list")?;

        stations
            .into_iter()
            .map(Station::from)
            .find(|s| !s.url.trim().is_empty())
            .context("no stations found")
    }
}

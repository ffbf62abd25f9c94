//! Jackett discovery backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex_lite::Regex;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::{FeedEntry, JackettConfig};

use super::{DiscoveryFeed, FeedError, FeedItem};

/// Searches Jackett once per feed entry and keeps the latest results.
pub struct JackettFeed {
    client: Client,
    config: JackettConfig,
    items: RwLock<Vec<FeedItem>>,
}

impl JackettFeed {
    /// Create a new JackettFeed with the given configuration.
    pub fn new(config: JackettConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| FeedError::ConnectionFailed(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            items: RwLock::new(Vec::new()),
        })
    }

    /// Build the Jackett API URL for an entry.
    fn build_search_url(&self, entry: &FeedEntry) -> String {
        format!(
            "{}/api/v2.0/indexers/{}/results?apikey={}&Query={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&entry.indexer),
            urlencoding::encode(&self.config.api_key),
            urlencoding::encode(&entry.query)
        )
    }

    /// Search the entry's indexer and convert the results.
    async fn search_entry(&self, entry: &FeedEntry) -> Result<Vec<FeedItem>, FeedError> {
        let pattern = Regex::new(&entry.episode_pattern)
            .map_err(|e| FeedError::Api(format!("invalid episode pattern: {}", e)))?;

        let url = self.build_search_url(entry);
        debug!(feed = %entry.name, indexer = %entry.indexer, "Searching Jackett");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(FeedError::Api(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let jackett_response: JackettResponse = response
            .json()
            .await
            .map_err(|e| FeedError::Api(format!("Failed to parse response: {}", e)))?;

        debug!(
            feed = %entry.name,
            results = jackett_response.Results.len(),
            "Jackett search complete"
        );

        Ok(convert_results(entry, &pattern, jackett_response.Results))
    }
}

/// Turn raw results into feed items, oldest first.
///
/// Results without an identifiable hash, link, or episode number are skipped.
fn convert_results(entry: &FeedEntry, pattern: &Regex, results: Vec<JackettResult>) -> Vec<FeedItem> {
    let mut items: Vec<FeedItem> = results
        .into_iter()
        .filter_map(|r| {
            let hash = r
                .InfoHash
                .as_deref()
                .filter(|h| !h.is_empty())
                .map(str::to_lowercase)
                .or_else(|| r.MagnetUri.as_deref().and_then(extract_hash_from_magnet));
            let Some(hash) = hash else {
                warn!(title = %r.Title, "Skipping result without info hash");
                return None;
            };

            let Some(link) = r.MagnetUri.clone().or_else(|| r.Link.clone()) else {
                warn!(title = %r.Title, "Skipping result without link");
                return None;
            };

            let Some(episode) = extract_episode(pattern, &r.Title) else {
                debug!(title = %r.Title, "No episode number in title");
                return None;
            };

            Some(FeedItem {
                name: entry.name.clone(),
                episode,
                title: r.Title,
                link,
                hash,
                published_at: r.PublishDate.as_deref().and_then(parse_jackett_date),
                size_bytes: r.Size.filter(|s| *s >= 0).map(|s| s as u64),
            })
        })
        .collect();

    items.sort_by(|a, b| a.published_at.cmp(&b.published_at));
    items
}

/// Episode number from the first capture group.
fn extract_episode(pattern: &Regex, title: &str) -> Option<u32> {
    pattern
        .captures(title)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Extract info hash from a magnet URI.
fn extract_hash_from_magnet(magnet: &str) -> Option<String> {
    let (_, query) = magnet.split_once('?')?;
    query
        .split('&')
        .find_map(|param| param.strip_prefix("xt=urn:btih:"))
        .filter(|hash| !hash.is_empty())
        .map(str::to_lowercase)
}

/// Parse Jackett's date format.
fn parse_jackett_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            // Try parsing without timezone
            chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

#[async_trait]
impl DiscoveryFeed for JackettFeed {
    fn name(&self) -> &str {
        "jackett"
    }

    async fn refresh(&self, entries: &[FeedEntry]) -> Result<(), FeedError> {
        let searches = entries.iter().map(|entry| async move {
            let result = self.search_entry(entry).await;
            (entry, result)
        });
        let results = futures::future::join_all(searches).await;

        let mut items = Vec::new();
        let mut succeeded = 0;
        let mut last_error = None;
        for (entry, result) in results {
            match result {
                Ok(mut found) => {
                    succeeded += 1;
                    items.append(&mut found);
                }
                Err(e) => {
                    warn!(feed = %entry.name, error = %e, "Feed search failed");
                    last_error = Some(e);
                }
            }
        }

        // Keep the previous list if every search failed
        if succeeded == 0 {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        *self.items.write().await = items;
        Ok(())
    }

    async fn list(&self) -> Vec<FeedItem> {
        self.items.read().await.clone()
    }
}

// Jackett API response types
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResponse {
    Results: Vec<JackettResult>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct JackettResult {
    Title: String,
    MagnetUri: Option<String>,
    Link: Option<String>,
    InfoHash: Option<String>,
    Size: Option<i64>,
    PublishDate: Option<String>,
}

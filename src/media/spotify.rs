//! Spotify track downloads through a third-party downloader API.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Duration;
use tracing::{info, warn};

const USER_AGENT: &str = "Mozilla/5.0";

static TRACK_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://open\.spotify\.com/(?:intl-[a-z]{2}/)?track/[a-zA-Z0-9]+").expect("static regex")
});

/// Extract the track URL from user input.
pub fn find_track_url(text: &str) -> Option<&str> {
    TRACK_URL.find(text).map(|m| m.as_str())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DownloadResponse {
    audio_url: Option<String>,
    title: Option<String>,
    artist: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpotifyTrack {
    pub audio_url: String,
    pub title: String,
    pub artist: String,
}

pub struct SpotifyClient {
    base_url: String,
    api: reqwest::Client,
    audio: reqwest::Client,
}

impl SpotifyClient {
    pub fn new(base_url: String) -> Result<Self, String> {
        let api = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        let audio = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        Ok(Self { base_url, api, audio })
    }

    /// Ask the downloader API for a direct audio link.
    pub async fn resolve(&self, track_url: &str) -> Result<SpotifyTrack, String> {
        let url = format!("{}/download?url={}", self.base_url, urlencoding::encode(track_url));
        info!("🎵 Resolving Spotify track {}", track_url);

        let response = self
            .api
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Spotify API request failed: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("Spotify API returned {}", response.status()));
        }
        let body: DownloadResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse Spotify API response: {e}"))?;

        parse_track(body)
    }

    /// Download the audio. `Ok(None)` when it is larger than `max_bytes`.
    pub async fn fetch_audio(&self, audio_url: &str, max_bytes: u64) -> Result<Option<Vec<u8>>, String> {
        let mut response = self
            .audio
            .get(audio_url)
            .send()
            .await
            .map_err(|e| format!("Audio request failed: {e}"))?;
        if !response.status().is_success() {
            return Err(format!("Audio host returned {}", response.status()));
        }
        if let Some(len) = response.content_length()
            && len > max_bytes
        {
            warn!("🎵 Audio is {} bytes, over the {} byte cap", len, max_bytes);
            return Ok(None);
        }

        let mut data = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| format!("Failed to read audio: {e}"))?
        {
            data.extend_from_slice(&chunk);
            if data.len() as u64 > max_bytes {
                warn!("🎵 Audio exceeded the {} byte cap while streaming", max_bytes);
                return Ok(None);
            }
        }
        info!("🎵 Fetched {} bytes of audio", data.len());
        Ok(Some(data))
    }
}

fn parse_track(body: DownloadResponse) -> Result<SpotifyTrack, String> {
    let audio_url = body
        .audio_url
        .filter(|u| !u.is_empty())
        .ok_or("No download link from Spotify API")?;
    Ok(SpotifyTrack {
        audio_url,
        title: body.title.filter(|t| !t.is_empty()).unwrap_or_else(|| "Spotify Track".to_string()),
        artist: body.artist.unwrap_or_default(),
    })
}

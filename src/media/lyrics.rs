//! lyrics.ovh client.

use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// WhatsApp renders very long messages badly; cut well below its limit.
pub const MAX_LYRICS_CHARS: usize = 3500;

#[derive(Deserialize)]
struct LyricsResponse {
    lyrics: Option<String>,
}

pub struct LyricsClient {
    base_url: String,
    client: reqwest::Client,
}

impl LyricsClient {
    pub fn new(base_url: String) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {e}"))?;
        Ok(Self { base_url, client })
    }

    pub fn lyrics_url(&self, artist: &str, song: &str) -> String {
        format!(
            "{}/v1/{}/{}",
            self.base_url,
            urlencoding::encode(artist),
            urlencoding::encode(song)
        )
    }

    /// `Ok(None)` when the API has no lyrics for the pair.
    pub async fn fetch(&self, artist: &str, song: &str) -> Result<Option<String>, String> {
        let url = self.lyrics_url(artist, song);
        info!("📄 Fetching lyrics: {} - {}", artist, song);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("Lyrics request failed: {e}"))?;

        let status = response.status();
        debug!("Lyrics response status: {status}");
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(format!("Lyrics API returned {status}"));
        }

        let body: LyricsResponse = response
            .json()
            .await
            .map_err(|e| format!("Failed to parse lyrics response: {e}"))?;

        Ok(body.lyrics.filter(|l| !l.trim().is_empty()))
    }
}

/// Derive `(artist, song)` from a video title like `Artist - Song (Official Video)`.
///
/// Without a dash the whole title is the song and the channel is the artist.
pub fn split_artist_title(title: &str, author: Option<&str>) -> (String, String) {
    let mut parts = title.split('-').map(str::trim);
    if title.contains('-')
        && let (Some(artist), Some(song)) = (parts.next(), parts.next())
        && !artist.is_empty()
        && !song.is_empty()
    {
        return (artist.to_string(), song.to_string());
    }
    (author.unwrap_or("").trim().to_string(), title.trim().to_string())
}

/// Cut to `max_chars` characters with a marker.
pub fn truncate_lyrics(lyrics: &str, max_chars: usize) -> String {
    if lyrics.chars().count() <= max_chars {
        return lyrics.to_string();
    }
    let cut: String = lyrics.chars().take(max_chars).collect();
    format!("{}\n\n…(truncated)", cut)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_artist_title() {
        assert_eq!(
            split_artist_title("Adele - Hello (Official Music Video)", Some("AdeleVEVO")),
            ("Adele".to_string(), "Hello (Official Music Video)".to_string())
        );
        assert_eq!(
            split_artist_title("A - B - Live", None),
            ("A".to_string(), "B".to_string())
        );
        assert_eq!(
            split_artist_title("Hello", Some("Adele")),
            ("Adele".to_string(), "Hello".to_string())
        );
        assert_eq!(split_artist_title("Hello", None), ("".to_string(), "Hello".to_string()));
        assert_eq!(
            split_artist_title("-Hello", Some("Adele")),
            ("Adele".to_string(), "-Hello".to_string())
        );
    }

    #[test]
    fn test_truncate_lyrics() {
        assert_eq!(truncate_lyrics("short", 10), "short");
        let long = "é".repeat(20);
        let cut = truncate_lyrics(&long, 5);
        assert_eq!(cut, format!("{}\n\n…(truncated)", "é".repeat(5)));
    }

    #[test]
    fn test_lyrics_url_encodes_parts() {
        let client = LyricsClient::new("https://api.lyrics.ovh".into()).unwrap();
        assert_eq!(
            client.lyrics_url("AC/DC", "Back In Black"),
            "https://api.lyrics.ovh/v1/AC%2FDC/Back%20In%20Black"
        );
    }

    // ==================== HTTP ====================

    mod http {
        use super::*;
        use crate::http_stub::{Route, serve};

        #[tokio::test]
        async fn test_fetch_found() {
            let base = serve(|_| {
                vec![Route::json("/v1/Adele/Hello", 200, r#"{"lyrics": "Hello, it's me"}"#)]
            })
            .await;
            let client = LyricsClient::new(base).unwrap();
            assert_eq!(
                client.fetch("Adele", "Hello").await.unwrap(),
                Some("Hello, it's me".to_string())
            );
        }

        #[tokio::test]
        async fn test_fetch_not_found_is_none() {
            let base = serve(|_| vec![]).await;
            let client = LyricsClient::new(base).unwrap();
            assert_eq!(client.fetch("Adele", "Hello").await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_fetch_empty_or_missing_lyrics_is_none() {
            let base = serve(|_| {
                vec![
                    Route::json("/v1/Adele/Hello", 200, r#"{"lyrics": "  \n "}"#),
                    Route::json("/v1/Adele/Skyfall", 200, r#"{"error": "none"}"#),
                ]
            })
            .await;
            let client = LyricsClient::new(base).unwrap();
            assert_eq!(client.fetch("Adele", "Hello").await.unwrap(), None);
            assert_eq!(client.fetch("Adele", "Skyfall").await.unwrap(), None);
        }

        #[tokio::test]
        async fn test_fetch_server_error_is_err() {
            let base = serve(|_| vec![Route::json("/v1/Adele/Hello", 500, "{}")]).await;
            let client = LyricsClient::new(base).unwrap();
            let err = client.fetch("Adele", "Hello").await.unwrap_err();
            assert!(err.contains("500"), "{err}");
        }
    }
}

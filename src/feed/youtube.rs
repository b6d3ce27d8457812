//! YouTube Data API v3 live chat client

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::{ChatMessage, ContinuationToken, FeedClient, FeedHandle, FeedPage};
use crate::{Error, Result};

/// Default YouTube Data API base URL
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// Per-request timeout; a hung request must not stall the poller forever
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Reads live chat messages for a YouTube broadcast
#[derive(Clone)]
pub struct YouTubeChatClient {
    client: Client,
    api_key: SecretString,
    base_url: String,
}

impl YouTubeChatClient {
    /// Create a new client against the public API
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new(api_key: SecretString) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a new client against a custom base URL
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn with_base_url(api_key: SecretString, base_url: impl Into<String>) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("YouTube API key required for chat feed".to_string()));
        }

        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Look up the active live chat for a video
    ///
    /// Returns `None` when the video exists but is not (or no longer) live.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the API reports an error
    pub async fn resolve_live_chat(&self, video_id: &str) -> Result<Option<FeedHandle>> {
        let url = format!("{}/videos", self.base_url);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "liveStreamingDetails"),
                ("id", video_id),
                ("key", self.api_key.expose_secret()),
            ])
            .send()
            .await?;

        let body = response_body(response).await?;
        let videos: VideosResponse = serde_json::from_str(&body)?;

        let handle = parse_live_chat_id(videos);
        tracing::debug!(video_id, found = handle.is_some(), "resolved live chat");
        Ok(handle)
    }
}

#[async_trait]
impl FeedClient for YouTubeChatClient {
    async fn fetch(
        &self,
        handle: &FeedHandle,
        token: Option<&ContinuationToken>,
    ) -> Result<FeedPage> {
        let url = format!("{}/liveChat/messages", self.base_url);

        let mut params = vec![
            ("liveChatId", handle.as_str()),
            ("part", "snippet,authorDetails"),
            ("key", self.api_key.expose_secret()),
        ];
        if let Some(token) = token {
            params.push(("pageToken", token.as_str()));
        }

        let response = self.client.get(&url).query(&params).send().await?;
        let body = response_body(response).await?;
        let messages: LiveChatMessagesResponse = serde_json::from_str(&body)?;

        Ok(into_feed_page(messages))
    }
}

/// Read the body, turning HTTP and API-level errors into `Error::Feed`
async fn response_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;

    if let Ok(ApiErrorEnvelope { error: Some(err) }) = serde_json::from_str(&body) {
        let code = err.code.unwrap_or_else(|| status.as_u16());
        return Err(Error::Feed(format!("YouTube API error {code}: {}", err.message)));
    }

    if !status.is_success() {
        return Err(Error::Feed(format!("YouTube API error {status}: {body}")));
    }

    Ok(body)
}

fn parse_live_chat_id(videos: VideosResponse) -> Option<FeedHandle> {
    videos
        .items
        .into_iter()
        .next()?
        .live_streaming_details?
        .active_live_chat_id
        .map(FeedHandle::new)
}

fn into_feed_page(response: LiveChatMessagesResponse) -> FeedPage {
    let messages = response
        .items
        .into_iter()
        .filter_map(|item| {
            let text = item.snippet.display_message?;
            let author = item
                .author_details
                .map_or_else(|| "Unknown".to_string(), |a| a.display_name);
            let published_at = item
                .snippet
                .published_at
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .map(|dt| dt.with_timezone(&Utc));

            Some(ChatMessage {
                author,
                text,
                published_at,
            })
        })
        .collect();

    FeedPage {
        messages,
        next_token: response.next_page_token.map(ContinuationToken::new),
        suggested_interval: response.polling_interval_millis.map(Duration::from_millis),
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: String,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoItem {
    live_streaming_details: Option<LiveStreamingDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveStreamingDetails {
    active_live_chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveChatMessagesResponse {
    #[serde(default)]
    items: Vec<LiveChatItem>,
    next_page_token: Option<String>,
    polling_interval_millis: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveChatItem {
    snippet: LiveChatSnippet,
    author_details: Option<AuthorDetails>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveChatSnippet {
    display_message: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthorDetails {
    display_name: String,
}

//! Telegram Bot API adapter
//!
//! Implements the MessagingSurfacePort trait over the Bot API's
//! `sendPhoto` / `sendVideo` / `sendDocument` methods using multipart uploads.

use std::time::Duration;

use async_trait::async_trait;
use prachar_core::config::TelegramConfig;
use prachar_core::credentials::SecretToken;
use prachar_core::error::ConfigError;
use prachar_core::media::{MediaKind, MediaPayload};
use prachar_core::ports::surface::{
    MessageId, MessagingSurfacePort, SendMediaRequest, SurfaceError, SurfaceErrorKind,
    SurfaceReceipt,
};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, warn};

/// Public Bot API endpoint
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Bot API method and form field for a media kind
pub fn endpoint_for(kind: MediaKind) -> (&'static str, &'static str) {
    match kind {
        MediaKind::Photo => ("sendPhoto", "photo"),
        MediaKind::Video => ("sendVideo", "video"),
        MediaKind::Document => ("sendDocument", "document"),
    }
}

/// Telegram Bot API adapter
///
/// Holds one HTTP client for the whole run. The bot token is only ever
/// placed into the request path and is stripped from transport errors.
pub struct TelegramAdapter {
    client: Client,
    api_base: String,
    token: SecretToken,
}

impl TelegramAdapter {
    /// Creates a new adapter
    ///
    /// # Arguments
    /// * `token` - Bot token
    /// * `api_base` - Bot API base URL, e.g. `https://api.telegram.org`
    /// * `timeout` - Per-request timeout applied by the HTTP client
    pub fn new(
        token: SecretToken,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Creates an adapter from the `[telegram]` config section
    pub fn from_config(token: SecretToken, config: &TelegramConfig) -> Result<Self, ConfigError> {
        Self::new(token, config.api_base.as_str(), config.request_timeout())
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token.expose(), method)
    }

    /// Builds the multipart form for one send call
    fn build_form(request: &SendMediaRequest<'_>) -> Result<Form, SurfaceError> {
        let (_, field) = endpoint_for(request.media.kind);
        let mut form = Form::new().text("chat_id", request.chat_id.to_string());

        form = match &request.media.payload {
            MediaPayload::Bytes(bytes) => {
                let part = Part::bytes(bytes.clone())
                    .file_name(request.media.file_name.clone())
                    .mime_str(request.media.mime_type)
                    .map_err(|e| {
                        SurfaceError::new(SurfaceErrorKind::Transport, e.without_url().to_string())
                    })?;
                form.part(field, part)
            }
            MediaPayload::Url(url) => form.text(field, url.clone()),
        };

        if let Some(caption) = request.caption {
            form = form.text("caption", caption.to_string());
        }
        if let Some(MessageId(id)) = request.reply_to {
            form = form.text("reply_to_message_id", id.to_string());
        }
        Ok(form)
    }
}

#[async_trait]
impl MessagingSurfacePort for TelegramAdapter {
    async fn send_media(
        &self,
        request: SendMediaRequest<'_>,
    ) -> Result<SurfaceReceipt, SurfaceError> {
        let (method, _) = endpoint_for(request.media.kind);
        let form = Self::build_form(&request)?;

        debug!(
            method,
            ordinal = request.media.ordinal,
            reply_to = ?request.reply_to,
            "Sending to Telegram"
        );

        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!(error = %e, "Failed to send request to Telegram");
                transport_error(e)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| transport_error(e.without_url()))?;

        interpret_response(status, body)
    }
}

fn transport_error(e: reqwest::Error) -> SurfaceError {
    let kind = if e.is_timeout() {
        SurfaceErrorKind::Timeout
    } else {
        SurfaceErrorKind::Transport
    };
    SurfaceError::new(kind, e.to_string())
}

// === Response Types ===

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<MessageResult>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct MessageResult {
    message_id: i64,
    #[serde(default)]
    date: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

fn classify(status: u16, retry_after: Option<u64>) -> SurfaceErrorKind {
    match status {
        401 | 403 => SurfaceErrorKind::Unauthorized,
        429 => SurfaceErrorKind::RateLimited { retry_after },
        400..=499 => SurfaceErrorKind::Rejected,
        500..=599 => SurfaceErrorKind::Unavailable,
        _ => SurfaceErrorKind::InvalidResponse,
    }
}

/// Maps an HTTP status and body onto a receipt or a classified error
///
/// The body is kept verbatim in both cases.
pub fn interpret_response(status: u16, body: String) -> Result<SurfaceReceipt, SurfaceError> {
    let parsed: Option<ApiResponse> = serde_json::from_str(&body).ok();

    if (200..300).contains(&status) {
        return match parsed {
            Some(ApiResponse {
                ok: true,
                result: Some(result),
                ..
            }) => Ok(SurfaceReceipt {
                message_id: MessageId(result.message_id),
                date: result.date,
                raw_body: body,
            }),
            Some(ApiResponse {
                ok: false,
                description,
                error_code,
                parameters,
                ..
            }) => {
                let retry_after = parameters.and_then(|p| p.retry_after);
                let kind = classify(error_code.unwrap_or(400), retry_after);
                Err(SurfaceError::new(
                    kind,
                    description.unwrap_or_else(|| "request not ok".to_string()),
                )
                .with_body(body))
            }
            _ => {
                warn!(status, "Unparsable Telegram response");
                Err(SurfaceError::new(
                    SurfaceErrorKind::InvalidResponse,
                    "response has no message_id",
                )
                .with_body(body))
            }
        };
    }

    let (description, retry_after) = match parsed {
        Some(api) => (
            api.description,
            api.parameters.and_then(|p| p.retry_after),
        ),
        None => (None, None),
    };
    let kind = classify(status, retry_after);
    error!(status, kind = kind.as_str(), "Telegram API error");

    Err(SurfaceError::new(
        kind,
        description.unwrap_or_else(|| format!("HTTP {}", status)),
    )
    .with_body(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use prachar_core::media::MediaItem;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const TOKEN: &str = "123456:test-token";

    fn token() -> SecretToken {
        SecretToken::new(TOKEN).unwrap()
    }

    fn photo_item() -> MediaItem {
        MediaItem {
            ordinal: 1,
            label: "assets/1.jpg".to_string(),
            file_name: "1.jpg".to_string(),
            kind: MediaKind::Photo,
            mime_type: "image/jpeg",
            payload: MediaPayload::Bytes(vec![0xFF, 0xD8, 0xFF, 0xE0]),
        }
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|w| w == needle)
    }

    /// Serves one canned response per connection and keeps the raw requests
    async fn serve(responses: Vec<(u16, &'static str)>) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_server = Arc::clone(&seen);

        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];
                loop {
                    let n = socket.read(&mut chunk).await.unwrap();
                    if n == 0 {
                        break;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(end) = find(&buf, b"\r\n\r\n") {
                        let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                        let length = head
                            .lines()
                            .find_map(|l| l.strip_prefix("content-length:"))
                            .and_then(|v| v.trim().parse::<usize>().ok());
                        let complete = match length {
                            Some(len) => buf.len() >= end + 4 + len,
                            None => find(&buf[end..], b"0\r\n\r\n").is_some(),
                        };
                        if complete {
                            break;
                        }
                    }
                }
                seen_by_server
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&buf).into_owned());

                let response = format!(
                    "HTTP/1.1 {} X\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (format!("http://{}", addr), seen)
    }

    // === Request Construction Tests ===

    #[test]
    fn test_endpoint_for_kind() {
        assert_eq!(endpoint_for(MediaKind::Photo), ("sendPhoto", "photo"));
        assert_eq!(endpoint_for(MediaKind::Video), ("sendVideo", "video"));
        assert_eq!(endpoint_for(MediaKind::Document), ("sendDocument", "document"));
    }

    #[test]
    fn test_method_url_trims_trailing_slash() {
        let adapter =
            TelegramAdapter::new(token(), "https://api.telegram.org/", Duration::from_secs(5))
                .unwrap();
        assert_eq!(adapter.api_base(), "https://api.telegram.org");
        assert_eq!(
            adapter.method_url("sendPhoto"),
            format!("https://api.telegram.org/bot{}/sendPhoto", TOKEN)
        );
    }

    #[test]
    fn test_from_config() {
        let config = TelegramConfig::default();
        let adapter = TelegramAdapter::from_config(token(), &config).unwrap();
        assert_eq!(adapter.api_base(), DEFAULT_API_BASE);
    }

    // === Response Interpretation Tests ===

    #[test]
    fn test_interpret_success() {
        let body = r#"{"ok":true,"result":{"message_id":42,"date":1760000000,"chat":{"id":-100}}}"#;
        let receipt = interpret_response(200, body.to_string()).unwrap();

        assert_eq!(receipt.message_id, MessageId(42));
        assert_eq!(receipt.date, Some(1_760_000_000));
        assert_eq!(receipt.raw_body, body);
    }

    #[test]
    fn test_interpret_status_classes() {
        let cases = [
            (401, SurfaceErrorKind::Unauthorized),
            (403, SurfaceErrorKind::Unauthorized),
            (400, SurfaceErrorKind::Rejected),
            (413, SurfaceErrorKind::Rejected),
            (502, SurfaceErrorKind::Unavailable),
        ];
        for (status, expected) in cases {
            let err = interpret_response(status, "oops".to_string()).unwrap_err();
            assert_eq!(err.kind, expected, "status {}", status);
            assert_eq!(err.raw_body.as_deref(), Some("oops"));
        }
    }

    #[test]
    fn test_interpret_rate_limit_keeps_retry_after() {
        let body = r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 7","parameters":{"retry_after":7}}"#;
        let err = interpret_response(429, body.to_string()).unwrap_err();

        assert_eq!(err.kind, SurfaceErrorKind::RateLimited { retry_after: Some(7) });
        assert!(err.detail.contains("Too Many Requests"));
        assert_eq!(err.raw_body.as_deref(), Some(body));
    }

    #[test]
    fn test_interpret_ok_false_with_200() {
        let body = r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;
        let err = interpret_response(200, body.to_string()).unwrap_err();
        assert_eq!(err.kind, SurfaceErrorKind::Rejected);
        assert!(err.detail.contains("chat not found"));
    }

    #[test]
    fn test_interpret_garbage_success_body() {
        let err = interpret_response(200, "<html>proxy</html>".to_string()).unwrap_err();
        assert_eq!(err.kind, SurfaceErrorKind::InvalidResponse);
        assert_eq!(err.raw_body.as_deref(), Some("<html>proxy</html>"));
    }

    // === Loopback HTTP Tests ===

    #[tokio::test]
    async fn test_send_photo_reply_over_http() {
        let (base, seen) = serve(vec![(
            200,
            r#"{"ok":true,"result":{"message_id":43,"date":1760000001}}"#,
        )])
        .await;
        let adapter = TelegramAdapter::new(token(), base, Duration::from_secs(5)).unwrap();
        let item = photo_item();

        let receipt = adapter
            .send_media(SendMediaRequest {
                chat_id: "@prachar_test",
                media: &item,
                caption: Some("Diya (2/3)"),
                reply_to: Some(MessageId(42)),
            })
            .await
            .unwrap();
        assert_eq!(receipt.message_id, MessageId(43));

        let requests = seen.lock().unwrap().clone();
        let raw = &requests[0];
        assert!(raw.starts_with(&format!("POST /bot{}/sendPhoto ", TOKEN)));
        assert!(raw.contains("name=\"chat_id\""));
        assert!(raw.contains("@prachar_test"));
        assert!(raw.contains("name=\"photo\"; filename=\"1.jpg\""));
        assert!(raw.contains("image/jpeg"));
        assert!(raw.contains("name=\"caption\""));
        assert!(raw.contains("Diya (2/3)"));
        assert!(raw.contains("name=\"reply_to_message_id\""));
    }

    #[tokio::test]
    async fn test_url_payload_sent_as_text_field() {
        let (base, seen) = serve(vec![(200, r#"{"ok":true,"result":{"message_id":1}}"#)]).await;
        let adapter = TelegramAdapter::new(token(), base, Duration::from_secs(5)).unwrap();
        let item = MediaItem {
            ordinal: 0,
            label: "https://cdn.example.com/reel.mp4".to_string(),
            file_name: "reel.mp4".to_string(),
            kind: MediaKind::Video,
            mime_type: "video/mp4",
            payload: MediaPayload::Url("https://cdn.example.com/reel.mp4".to_string()),
        };

        adapter
            .send_media(SendMediaRequest {
                chat_id: "@prachar_test",
                media: &item,
                caption: None,
                reply_to: None,
            })
            .await
            .unwrap();

        let raw = seen.lock().unwrap()[0].clone();
        assert!(raw.contains("/sendVideo "));
        assert!(raw.contains("name=\"video\"\r\n\r\nhttps://cdn.example.com/reel.mp4"));
        assert!(!raw.contains("name=\"caption\""));
        assert!(!raw.contains("reply_to_message_id"));
    }

    #[tokio::test]
    async fn test_http_error_is_classified() {
        let (base, _seen) = serve(vec![(
            401,
            r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#,
        )])
        .await;
        let adapter = TelegramAdapter::new(token(), base, Duration::from_secs(5)).unwrap();
        let item = photo_item();

        let err = adapter
            .send_media(SendMediaRequest {
                chat_id: "@prachar_test",
                media: &item,
                caption: None,
                reply_to: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, SurfaceErrorKind::Unauthorized);
        assert!(err.raw_body.unwrap().contains("\"error_code\":401"));
    }

    #[tokio::test]
    async fn test_connection_refused_hides_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let adapter =
            TelegramAdapter::new(token(), format!("http://{}", addr), Duration::from_secs(5))
                .unwrap();
        let item = photo_item();

        let err = adapter
            .send_media(SendMediaRequest {
                chat_id: "@prachar_test",
                media: &item,
                caption: None,
                reply_to: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, SurfaceErrorKind::Transport);
        assert!(!err.to_string().contains("test-token"));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let adapter =
            TelegramAdapter::new(token(), format!("http://{}", addr), Duration::from_millis(300))
                .unwrap();
        let item = photo_item();

        let err = adapter
            .send_media(SendMediaRequest {
                chat_id: "@prachar_test",
                media: &item,
                caption: None,
                reply_to: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind, SurfaceErrorKind::Timeout);
        assert!(!err.to_string().contains("test-token"));
    }
}

//! Webhook Notification
//!
//! Signs and delivers game-result callbacks to the configured external
//! endpoint. Delivery is best-effort: one POST with a bounded timeout,
//! HTTP 200 exactly counts as success, anything else is logged and
//! discarded. No retry, no queue.
//!
//! The signature is an HMAC-SHA256 over the canonical serialization of
//! the body (compact JSON with lexicographically sorted keys), so any
//! receiver applying the same canonicalization can reproduce it.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{error, info, warn};

use crate::WEBHOOK_TIMEOUT_SECS;

type HmacSha256 = Hmac<Sha256>;

/// Name of the signature header attached to every delivery.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Event name carried in every payload.
const EVENT_NAME: &str = "game_completed";

/// Webhook destination configuration.
///
/// Delivery is a no-op unless both fields are set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Destination URL.
    pub url: Option<String>,
    /// Shared signing secret.
    pub secret: Option<String>,
}

/// Terminal outcome of one game session, as reported downstream.
#[derive(Debug, Clone)]
pub struct GameResult {
    /// Session id (`game_id` on the wire).
    pub game_id: u64,
    /// Player identity.
    pub player_email: String,
    /// Whether the player won.
    pub won: bool,
    /// Final display score.
    pub score: u32,
    /// Flip moves taken.
    pub moves: u32,
    /// Elapsed seconds; rounded to 2 decimals on the wire.
    pub time_taken: f64,
    /// Pairs matched before termination.
    pub matches_found: u32,
    /// Level name (travels as `level_id`).
    pub level_name: String,
    /// Points awarded or deducted.
    pub points_change: i64,
}

/// Outcome of a connectivity test delivery.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookTestOutcome {
    /// Whether the endpoint answered HTTP 200.
    pub success: bool,
    /// Response status code; zero when no response arrived.
    pub status_code: u16,
    /// Human-readable detail.
    pub message: String,
}

/// Build the wire payload for a game result.
fn build_payload(result: &GameResult, timestamp: &str) -> Value {
    json!({
        "event": EVENT_NAME,
        "timestamp": timestamp,
        "game_id": result.game_id,
        "data": {
            "player_email": result.player_email,
            "won": result.won,
            "score": result.score,
            "moves": result.moves,
            "time_taken": round2(result.time_taken),
            "matches_found": result.matches_found,
            "level_id": result.level_name,
            "points_change": result.points_change,
        }
    })
}

/// Round to 2 decimal places for the wire format.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Canonical serialization of a payload: compact JSON with keys in
/// lexicographic order. `serde_json` maps are BTree-backed, so object
/// keys already serialize sorted.
pub fn canonical_json(payload: &Value) -> String {
    payload.to_string()
}

/// Hex-encoded HMAC-SHA256 of the canonical payload bytes.
pub fn sign_payload(secret: &str, canonical: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(canonical.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Signs and delivers game-result payloads.
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl WebhookNotifier {
    /// Create a notifier with the standard delivery timeout.
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .build()
            .expect("failed to construct HTTP client");
        Self { client }
    }

    /// Deliver one game result.
    ///
    /// Returns `true` only when the endpoint answered HTTP 200. A
    /// missing URL or secret makes this a warned no-op; failures are
    /// logged and swallowed.
    pub async fn send_game_result(&self, config: &WebhookConfig, result: &GameResult) -> bool {
        let (Some(url), Some(secret)) = (config.url.as_deref(), config.secret.as_deref()) else {
            warn!("Webhook URL or secret not configured, skipping webhook");
            return false;
        };

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let payload = build_payload(result, &timestamp);
        self.deliver(url, secret, &payload, result.game_id).await
    }

    /// POST a signed canonical payload. The request body is the exact
    /// canonical string the signature covers.
    async fn deliver(&self, url: &str, secret: &str, payload: &Value, game_id: u64) -> bool {
        let canonical = canonical_json(payload);
        let signature = sign_payload(secret, &canonical);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(canonical)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status() == reqwest::StatusCode::OK => {
                info!("Webhook sent successfully for game {}", game_id);
                true
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                error!(
                    "Webhook failed for game {}: Status {}, Response: {}",
                    game_id, status, body
                );
                false
            }
            Err(e) => {
                error!("Error sending webhook for game {}: {}", game_id, e);
                false
            }
        }
    }

    /// Send a dummy payload to verify endpoint connectivity.
    pub async fn send_test(&self, url: &str, secret: &str) -> WebhookTestOutcome {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let test_result = GameResult {
            game_id: 0,
            player_email: "test@example.com".to_string(),
            won: true,
            score: 100,
            moves: 15,
            time_taken: 45.5,
            matches_found: 8,
            level_name: "Test".to_string(),
            points_change: 0,
        };
        let payload = build_payload(&test_result, &timestamp);
        let canonical = canonical_json(&payload);
        let signature = sign_payload(secret, &canonical);

        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(canonical)
            .send()
            .await;

        match response {
            Ok(resp) => {
                let status = resp.status().as_u16();
                let body = resp.text().await.unwrap_or_default();
                let detail: String = body.chars().take(500).collect();
                WebhookTestOutcome {
                    success: status == 200,
                    status_code: status,
                    message: format!("Status: {status}, Response: {detail}"),
                }
            }
            Err(e) => WebhookTestOutcome {
                success: false,
                status_code: 0,
                message: format!("Error: {e}"),
            },
        }
    }
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_result() -> GameResult {
        GameResult {
            game_id: 42,
            player_email: "player@example.com".to_string(),
            won: true,
            score: 80,
            moves: 12,
            time_taken: 33.333,
            matches_found: 8,
            level_name: "Hard".to_string(),
            points_change: 20,
        }
    }

    #[test]
    fn canonical_form_sorts_keys() {
        let payload = build_payload(&test_result(), "2026-01-01T00:00:00.000000Z");
        let canonical = canonical_json(&payload);

        // Top-level keys in lexicographic order.
        let data_pos = canonical.find("\"data\"").unwrap();
        let event_pos = canonical.find("\"event\"").unwrap();
        let game_id_pos = canonical.find("\"game_id\"").unwrap();
        let ts_pos = canonical.find("\"timestamp\"").unwrap();
        assert!(data_pos < event_pos && event_pos < game_id_pos && game_id_pos < ts_pos);

        // No whitespace in the compact form.
        assert!(!canonical.contains(": "));
        assert!(!canonical.contains(", "));
    }

    #[test]
    fn payload_carries_wire_fields() {
        let payload = build_payload(&test_result(), "2026-01-01T00:00:00.000000Z");
        assert_eq!(payload["event"], "game_completed");
        assert_eq!(payload["game_id"], 42);
        assert_eq!(payload["data"]["player_email"], "player@example.com");
        assert_eq!(payload["data"]["won"], true);
        assert_eq!(payload["data"]["level_id"], "Hard");
        assert_eq!(payload["data"]["points_change"], 20);
        // time_taken rounded to 2 decimals.
        assert_eq!(payload["data"]["time_taken"], 33.33);
    }

    #[test]
    fn signature_is_deterministic() {
        let payload = build_payload(&test_result(), "2026-01-01T00:00:00.000000Z");
        let canonical = canonical_json(&payload);
        let a = sign_payload("shared-secret", &canonical);
        let b = sign_payload("shared-secret", &canonical);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64); // hex SHA-256
    }

    #[test]
    fn signature_matches_independent_recomputation() {
        let canonical = canonical_json(&build_payload(
            &test_result(),
            "2026-01-01T00:00:00.000000Z",
        ));
        let signature = sign_payload("shared-secret", &canonical);

        // Receiver-side recomputation from scratch.
        let mut mac = HmacSha256::new_from_slice(b"shared-secret").unwrap();
        mac.update(canonical.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());
        assert_eq!(signature, expected);
    }

    #[test]
    fn signature_depends_on_secret_and_body() {
        let canonical = canonical_json(&build_payload(
            &test_result(),
            "2026-01-01T00:00:00.000000Z",
        ));
        let a = sign_payload("secret-a", &canonical);
        let b = sign_payload("secret-b", &canonical);
        assert_ne!(a, b);

        let mut tampered = test_result();
        tampered.points_change = -20;
        let other = canonical_json(&build_payload(&tampered, "2026-01-01T00:00:00.000000Z"));
        assert_ne!(sign_payload("secret-a", &other), a);
    }

    #[test]
    fn round2_truncates_to_cents() {
        assert_eq!(round2(45.456), 45.46);
        assert_eq!(round2(45.454), 45.45);
        assert_eq!(round2(45.5), 45.5);
        assert_eq!(round2(0.0), 0.0);
    }

    /// Read one HTTP request off the socket and answer 200, returning
    /// the raw request text.
    async fn answer_ok(listener: tokio::net::TcpListener) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (mut socket, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            raw.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&raw);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if raw.len() >= header_end + 4 + content_length {
                    break;
                }
            }
            if n == 0 {
                break;
            }
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
            .await
            .unwrap();
        String::from_utf8(raw).unwrap()
    }

    #[tokio::test]
    async fn send_test_delivers_a_signed_payload() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(answer_ok(listener));

        let notifier = WebhookNotifier::new();
        let outcome = notifier
            .send_test(&format!("http://{addr}/hook"), "shared-secret")
            .await;
        assert!(outcome.success);
        assert_eq!(outcome.status_code, 200);

        let request = server.await.unwrap();
        let (head, body) = request.split_once("\r\n\r\n").unwrap();
        // The signature header covers the exact body bytes on the wire.
        let signature = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case(SIGNATURE_HEADER)
                    .then(|| value.trim().to_string())
            })
            .unwrap();
        assert_eq!(signature, sign_payload("shared-secret", body));

        let payload: Value = serde_json::from_str(body).unwrap();
        assert_eq!(payload["event"], "game_completed");
        assert_eq!(payload["data"]["player_email"], "test@example.com");
    }

    #[tokio::test]
    async fn send_test_reports_unreachable_endpoint() {
        let notifier = WebhookNotifier::new();
        let outcome = notifier.send_test("http://127.0.0.1:1/hook", "shared-secret").await;
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, 0);
        assert!(outcome.message.starts_with("Error:"));
    }

    #[tokio::test]
    async fn unconfigured_destination_is_a_no_op() {
        let notifier = WebhookNotifier::new();
        let sent = notifier
            .send_game_result(&WebhookConfig::default(), &test_result())
            .await;
        assert!(!sent);

        let url_only = WebhookConfig {
            url: Some("http://localhost:1/hook".to_string()),
            secret: None,
        };
        assert!(!notifier.send_game_result(&url_only, &test_result()).await);
    }
}

//! Google Translate backend using the public `translate_a/single` endpoint.

use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use transverse_core::{CoreError, TranslationService};

const GOOGLE_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Default timeout for HTTP requests (10 seconds)
const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Default number of retry attempts
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Google Translate translation service
pub struct GoogleTranslateService {
    client: ClientWithMiddleware,
    source_language: String,
    base_url: String,
}

impl GoogleTranslateService {
    /// Create a new Google Translate service with default 10-second timeout and 3 retries.
    ///
    /// # Arguments
    ///
    /// * `source_language` - Source language code, or `"auto"` to let Google detect it
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(source_language: impl Into<String>) -> Result<Self, CoreError> {
        let base_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(5))
            .user_agent("Transverse/0.1 (https://github.com/transverse-lyrics/transverse)")
            .build()?;

        // Wrap with retry middleware (exponential backoff)
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(DEFAULT_MAX_RETRIES);
        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            source_language: source_language.into(),
            base_url: GOOGLE_TRANSLATE_URL.to_string(),
        })
    }

    fn request_url(&self, text: &str, target_language: &str) -> String {
        format!(
            "{}?client=gtx&sl={}&tl={}&dt=t&q={}",
            self.base_url,
            urlencoding::encode(&self.source_language),
            urlencoding::encode(target_language),
            urlencoding::encode(text)
        )
    }
}

/// Extract the translated text from a `translate_a/single` response.
///
/// The response is a positional JSON array. Element 0 holds one segment per
/// sentence, each segment starting with its translated text; element 2 holds
/// the detected source language.
fn parse_translation(body: &Value) -> Option<String> {
    let segments = body.get(0)?.as_array()?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0)?.as_str())
        .collect();

    if translated.is_empty() {
        None
    } else {
        Some(translated)
    }
}

fn unavailable(error: impl std::fmt::Display) -> CoreError {
    CoreError::TranslationUnavailable {
        reason: format!("Google Translate request failed: {error}"),
    }
}

fn detected_language(body: &Value) -> Option<&str> {
    body.get(2)?.as_str()
}

#[async_trait]
impl TranslationService for GoogleTranslateService {
    fn name(&self) -> &'static str {
        "google_translate"
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String, CoreError> {
        let url = self.request_url(text, target_language);
        let response = self.client.get(&url).send().await.map_err(unavailable)?;

        if !response.status().is_success() {
            warn!("Google Translate returned status: {}", response.status());
            return Err(CoreError::TranslationUnavailable {
                reason: format!("Google Translate returned status: {}", response.status()),
            });
        }

        let body: Value = response.json().await.map_err(unavailable)?;
        debug!(
            "Google Translate detected language {:?} for '{}'",
            detected_language(&body),
            text
        );

        parse_translation(&body).ok_or_else(|| CoreError::TranslationUnavailable {
            reason: "Google Translate response contained no translation".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::{Read, Write};
    use std::net::TcpListener;

    fn local_service(base_url: String) -> GoogleTranslateService {
        GoogleTranslateService {
            client: ClientBuilder::new(reqwest::Client::new()).build(),
            source_language: "auto".into(),
            base_url,
        }
    }

    #[test]
    fn test_parse_single_segment() {
        let body = json!([[["Hello world", "Hola mundo", null, null, 10]], null, "es"]);

        assert_eq!(parse_translation(&body).as_deref(), Some("Hello world"));
        assert_eq!(detected_language(&body), Some("es"));
    }

    #[test]
    fn test_parse_joins_sentence_segments() {
        let body = json!([
            [
                ["I love you. ", "Te quiero. ", null, null, 10],
                ["Do not go.", "No te vayas.", null, null, 10]
            ],
            null,
            "es"
        ]);

        assert_eq!(
            parse_translation(&body).as_deref(),
            Some("I love you. Do not go.")
        );
    }

    #[test]
    fn test_parse_unexpected_shapes() {
        assert_eq!(parse_translation(&json!([])), None);
        assert_eq!(parse_translation(&json!({"error": "quota"})), None);
        assert_eq!(parse_translation(&json!([null, null, "ja"])), None);
        assert_eq!(parse_translation(&json!([[[null, "x"]]])), None);
    }

    #[test]
    fn test_request_url_encodes_text() {
        let service = GoogleTranslateService::new("auto").unwrap();
        let url = service.request_url("¿Qué pasa? a&b", "en");

        assert!(url.starts_with(GOOGLE_TRANSLATE_URL));
        assert!(url.contains("sl=auto"));
        assert!(url.contains("tl=en"));
        assert!(url.contains("q=%C2%BFQu%C3%A9%20pasa%3F%20a%26b"));
    }

    #[tokio::test]
    async fn test_connection_failure_is_translation_unavailable() {
        let port = TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let service = local_service(format!("http://127.0.0.1:{port}/translate_a/single"));

        let result = service.translate("hola", "en").await;

        assert!(matches!(result, Err(CoreError::TranslationUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_undecodable_body_is_translation_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = [0_u8; 1024];
            let _ = stream.read(&mut request).unwrap();
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\nConnection: close\r\n\r\nnope!")
                .unwrap();
        });
        let service = local_service(format!("http://127.0.0.1:{port}/translate_a/single"));

        let result = service.translate("hola", "en").await;

        assert!(matches!(result, Err(CoreError::TranslationUnavailable { .. })));
        server.join().unwrap();
    }
}

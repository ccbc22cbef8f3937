use std::time::Duration;

use async_trait::async_trait;
use bishop_session::Service;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::router::service_spec;

/// One outbound call to a backend capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    pub service: Service,
    pub text: String,
    /// Backend correlation id; only sent for general chat.
    pub backend_session_id: Option<String>,
}

impl ServiceRequest {
    pub fn new(service: Service, text: impl Into<String>) -> Self {
        Self {
            service,
            text: text.into(),
            backend_session_id: None,
        }
    }

    pub fn chat(message: impl Into<String>, backend_session_id: Option<&str>) -> Self {
        Self {
            service: Service::Chat,
            text: message.into(),
            backend_session_id: backend_session_id.map(str::to_string),
        }
    }

    /// JSON body for the service's endpoint.
    pub fn body(&self) -> Value {
        let spec = service_spec(self.service);
        let mut body = Map::new();
        body.insert(spec.request_field.to_string(), Value::String(self.text.clone()));
        if self.service == Service::Chat {
            if let Some(ref id) = self.backend_session_id {
                body.insert("sessionId".to_string(), Value::String(id.clone()));
            }
        }
        Value::Object(body)
    }
}

/// Reply text plus the correlation id the chat endpoint hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceReply {
    pub text: String,
    pub backend_session_id: Option<String>,
}

impl ServiceReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            backend_session_id: None,
        }
    }

    /// Pull the reply out of a response body for `service`.
    pub fn from_body(service: Service, body: &Value) -> ClientResult<Self> {
        let field = service_spec(service).response_field;
        let text = body
            .get(field)
            .and_then(Value::as_str)
            .ok_or(ClientError::MissingField { field })?
            .to_string();

        let backend_session_id = match service {
            Service::Chat => body
                .get("sessionId")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            _ => None,
        };

        Ok(Self {
            text,
            backend_session_id,
        })
    }
}

/// The remote AI backend.
#[async_trait]
pub trait FaithBackend: Send + Sync {
    async fn send(&self, request: ServiceRequest) -> ClientResult<ServiceReply>;

    /// General chat; the reply may carry a (new) backend session id.
    async fn chat(
        &self,
        message: &str,
        backend_session_id: Option<&str>,
    ) -> ClientResult<ServiceReply> {
        self.send(ServiceRequest::chat(message, backend_session_id))
            .await
    }

    async fn devotional(&self, story: &str) -> ClientResult<String> {
        self.send(ServiceRequest::new(Service::Devotional, story))
            .await
            .map(|reply| reply.text)
    }

    async fn explain_verse(&self, verse: &str) -> ClientResult<String> {
        self.send(ServiceRequest::new(Service::ExplainVerse, verse))
            .await
            .map(|reply| reply.text)
    }
}

/// `FaithBackend` over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, service: Service) -> String {
        format!("{}{}", self.base_url, service_spec(service).path)
    }
}

#[async_trait]
impl FaithBackend for HttpBackend {
    async fn send(&self, request: ServiceRequest) -> ClientResult<ServiceReply> {
        let url = self.endpoint(request.service);
        debug!("POST {} ({})", url, request.service);

        let response = self.client.post(&url).json(&request.body()).send().await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text)?;
        ServiceReply::from_body(request.service, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn backend(server: &mockito::ServerGuard) -> HttpBackend {
        HttpBackend::new(&server.url(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_request_bodies() {
        assert_eq!(
            ServiceRequest::chat("Hello", None).body(),
            json!({"message": "Hello"})
        );
        assert_eq!(
            ServiceRequest::chat("Again", Some("be-123")).body(),
            json!({"message": "Again", "sessionId": "be-123"})
        );

        let mut devotional = ServiceRequest::new(Service::Devotional, "David and Goliath");
        devotional.backend_session_id = Some("be-123".to_string());
        assert_eq!(devotional.body(), json!({"story": "David and Goliath"}));
    }

    #[tokio::test]
    async fn test_chat_without_session_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/ai/my-story")
            .match_body(Matcher::Json(json!({"message": "Hello"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"response": "Hi!", "sessionId": "be-123"}"#)
            .create_async()
            .await;

        let reply = backend(&server).chat("Hello", None).await.unwrap();
        assert_eq!(reply.text, "Hi!");
        assert_eq!(reply.backend_session_id.as_deref(), Some("be-123"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_chat_forwards_session_id() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/ai/my-story")
            .match_body(Matcher::Json(
                json!({"message": "Tell me more", "sessionId": "be-123"}),
            ))
            .with_status(200)
            .with_body(r#"{"response": "Gladly.", "sessionId": "be-123"}"#)
            .create_async()
            .await;

        let reply = backend(&server)
            .chat("Tell me more", Some("be-123"))
            .await
            .unwrap();
        assert_eq!(reply.text, "Gladly.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_devotional_and_verse() {
        let mut server = mockito::Server::new_async().await;
        let devotional = server
            .mock("POST", "/api/ai/daily-devotional")
            .match_body(Matcher::Json(json!({"story": "Jonah"})))
            .with_status(200)
            .with_body(r#"{"devotional": "Even in the deep, God hears."}"#)
            .create_async()
            .await;
        let verse = server
            .mock("POST", "/api/ai/explain-verse")
            .match_body(Matcher::Json(json!({"verse": "John 3:16"})))
            .with_status(200)
            .with_body(r#"{"explanation": "God's love is for everyone."}"#)
            .create_async()
            .await;

        let backend = backend(&server);
        assert_eq!(
            backend.devotional("Jonah").await.unwrap(),
            "Even in the deep, God hears."
        );
        assert_eq!(
            backend.explain_verse("John 3:16").await.unwrap(),
            "God's love is for everyone."
        );
        devotional.assert_async().await;
        verse.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/ai/explain-verse")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let err = backend(&server).explain_verse("Psalm 23").await.unwrap_err();
        match err {
            ClientError::Status { status, body } => {
                assert_eq!(status, 502);
                assert_eq!(body, "bad gateway");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_reply_field() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/ai/daily-devotional")
            .with_status(200)
            .with_body(r#"{"explanation": "wrong field"}"#)
            .create_async()
            .await;

        let err = backend(&server).devotional("Ruth").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::MissingField {
                field: "devotional"
            }
        ));
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/ai/explain-verse")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = backend(&server).explain_verse("John 3:16").await.unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn test_reply_ignores_session_id_outside_chat() {
        let body = json!({"devotional": "text", "sessionId": "be-1"});
        let reply = ServiceReply::from_body(Service::Devotional, &body).unwrap();
        assert_eq!(reply.backend_session_id, None);
    }
}

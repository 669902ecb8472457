use crate::config::ApiSettings;
use crate::error::ApiError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Agent descriptor returned by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub is_system: bool,
    pub text: String,
    pub date_created: DateTime<Utc>,
}

impl Message {
    /// Build a user message locally, before the service has seen it
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            is_system: false,
            text: text.into(),
            date_created: Utc::now(),
        }
    }
}

/// Result of creating a conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedConversation {
    pub id: String,
    pub messages: Vec<Message>,
}

/// Every response body wraps its payload in `data`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ConversationPayload {
    id: Option<String>,
    #[serde(default)]
    messages: Option<Vec<Message>>,
}

#[derive(Debug, Serialize)]
struct TextBody<'a> {
    text: &'a str,
}

/// Operations the conversation controller needs from the agent service
#[async_trait]
pub trait AgentApi: Send + Sync {
    async fn fetch_agent(&self) -> Result<Agent, ApiError>;

    async fn create_conversation(&self, text: &str) -> Result<CreatedConversation, ApiError>;

    async fn append_message(&self, conversation_id: &str, text: &str)
    -> Result<Message, ApiError>;
}

/// HTTP client for the agent service
#[derive(Clone)]
pub struct HttpAgentClient {
    client: reqwest::Client,
    base_url: String,
    agent_id: String,
    api_key: String,
}

impl HttpAgentClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(ApiError::Transport)?;

        Ok(Self {
            client,
            base_url: format!("{}/v1", settings.api_url.trim_end_matches('/')),
            agent_id: settings.agent_id.clone(),
            api_key: settings.api_key.clone(),
        })
    }

    fn agent_url(&self) -> String {
        format!("{}/agents/{}", self.base_url, self.agent_id)
    }

    /// Check the status, then unwrap the `data` envelope
    async fn read_data<T: DeserializeOwned>(
        response: reqwest::Response,
        what: &'static str,
    ) -> Result<T, ApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status { status, body });
        }

        let envelope: Envelope<T> = response.json().await.map_err(ApiError::Decode)?;
        envelope.data.ok_or(ApiError::InvalidResponse(what))
    }

    async fn post_text(&self, url: &str, text: &str) -> Result<reqwest::Response, ApiError> {
        self.client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&TextBody { text })
            .send()
            .await
            .map_err(ApiError::Transport)
    }
}

#[async_trait]
impl AgentApi for HttpAgentClient {
    async fn fetch_agent(&self) -> Result<Agent, ApiError> {
        let url = self.agent_url();
        tracing::debug!(%url, "fetching agent");

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(ApiError::Transport)?;

        Self::read_data(response, "agent").await
    }

    async fn create_conversation(&self, text: &str) -> Result<CreatedConversation, ApiError> {
        let url = format!("{}/conversations", self.agent_url());
        tracing::debug!(%url, "creating conversation");

        let response = self.post_text(&url, text).await?;
        let payload: ConversationPayload = Self::read_data(response, "conversation").await?;
        let id = payload
            .id
            .filter(|id| !id.is_empty())
            .ok_or(ApiError::InvalidResponse("conversation"))?;

        Ok(CreatedConversation {
            id,
            messages: payload.messages.unwrap_or_default(),
        })
    }

    async fn append_message(
        &self,
        conversation_id: &str,
        text: &str,
    ) -> Result<Message, ApiError> {
        let url = format!(
            "{}/conversations/{}/messages",
            self.agent_url(),
            conversation_id
        );
        tracing::debug!(%url, "sending message");

        let response = self.post_text(&url, text).await?;
        Self::read_data(response, "message").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpAgentClient {
        HttpAgentClient::new(&ApiSettings {
            api_url: format!("{}/", server.uri()),
            agent_id: "a1".into(),
            api_key: "secret".into(),
            request_timeout: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn fetch_agent_unwraps_data_and_sends_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agents/a1"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "a1", "title": "Helper", "avatarUrl": "https://cdn/a.png"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let agent = client_for(&server).fetch_agent().await.unwrap();
        assert_eq!(agent.title, "Helper");
        assert_eq!(agent.avatar_url.as_deref(), Some("https://cdn/a.png"));
    }

    #[tokio::test]
    async fn fetch_agent_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agents/a1"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_agent().await.unwrap_err();
        match err {
            ApiError::Status { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn fetch_agent_without_data_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agents/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": null})))
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_agent().await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse("agent")));
    }

    #[tokio::test]
    async fn create_conversation_posts_text_and_keeps_attached_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/agents/a1/conversations"))
            .and(header("Authorization", "Bearer secret"))
            .and(body_json(json!({"text": "Hello"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {
                    "id": "c1",
                    "messages": [{
                        "id": "m1",
                        "isSystem": true,
                        "text": "Hi there",
                        "dateCreated": "2024-05-01T10:00:00Z"
                    }]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let created = client_for(&server)
            .create_conversation("Hello")
            .await
            .unwrap();
        assert_eq!(created.id, "c1");
        assert_eq!(created.messages.len(), 1);
        assert!(created.messages[0].is_system);
    }

    #[tokio::test]
    async fn create_conversation_without_id_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/agents/a1/conversations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"messages": null}
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_conversation("Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidResponse("conversation")));
        assert_eq!(err.to_string(), "invalid conversation response format");
    }

    #[tokio::test]
    async fn append_message_targets_conversation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/agents/a1/conversations/c1/messages"))
            .and(body_json(json!({"text": "How are you?"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {
                    "id": "m2",
                    "isSystem": true,
                    "text": "I'm fine",
                    "dateCreated": "2024-05-01T10:01:00Z"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let message = client_for(&server)
            .append_message("c1", "How are you?")
            .await
            .unwrap();
        assert_eq!(message.id, "m2");
        assert_eq!(message.text, "I'm fine");
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/agents/a1/conversations/c1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .append_message("c1", "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn user_messages_get_unique_ids() {
        let a = Message::user("one");
        let b = Message::user("one");
        assert!(!a.is_system);
        assert_ne!(a.id, b.id);
    }
}

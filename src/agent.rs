use crate::api::{Agent, AgentApi};
use crate::error::ApiError;

/// Load state of the agent descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentState {
    Loading,
    Ready(Agent),
    Failed(String),
}

/// Fetches the agent descriptor once and holds it for the lifetime of the app
#[derive(Debug)]
pub struct AgentLoader {
    state: AgentState,
    fallback_title: Option<String>,
}

impl AgentLoader {
    pub fn new(fallback_title: Option<String>) -> Self {
        Self {
            state: AgentState::Loading,
            fallback_title,
        }
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, AgentState::Loading)
    }

    pub fn agent(&self) -> Option<&Agent> {
        match &self.state {
            AgentState::Ready(agent) => Some(agent),
            _ => None,
        }
    }

    /// Fetch the agent. Only the first call reaches the service.
    pub async fn load(&mut self, api: &dyn AgentApi) -> &AgentState {
        if self.is_loading() {
            let result = api.fetch_agent().await;
            self.settle(result);
        }
        &self.state
    }

    /// Record the result of a fetch made elsewhere. Ignored once settled.
    pub fn settle(&mut self, result: Result<Agent, ApiError>) -> &AgentState {
        if !self.is_loading() {
            return &self.state;
        }

        self.state = match result {
            Ok(agent) => {
                tracing::info!(agent_id = %agent.id, title = %agent.title, "agent loaded");
                AgentState::Ready(agent)
            }
            Err(err) => {
                tracing::error!(error = %err, "error fetching agent");
                AgentState::Failed(err.to_string())
            }
        };
        &self.state
    }

    /// Title to show in the header, falling back to the configured one
    pub fn display_title(&self) -> Option<String> {
        let agent = self.agent()?;
        if agent.title.trim().is_empty() {
            Some(
                self.fallback_title
                    .clone()
                    .unwrap_or_else(|| agent.id.clone()),
            )
        } else {
            Some(agent.title.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::HttpAgentClient;
    use crate::config::ApiSettings;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> HttpAgentClient {
        HttpAgentClient::new(&ApiSettings {
            api_url: server.uri(),
            agent_id: "a1".into(),
            api_key: "secret".into(),
            request_timeout: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn loads_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agents/a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"id": "a1", "title": "Concierge"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut loader = AgentLoader::new(None);
        assert!(loader.is_loading());

        loader.load(&client).await;
        loader.load(&client).await;

        assert!(!loader.is_loading());
        assert_eq!(loader.display_title().as_deref(), Some("Concierge"));
        assert_eq!(loader.agent().and_then(|a| a.avatar_url.clone()), None);
    }

    #[tokio::test]
    async fn server_error_settles_as_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agents/a1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut loader = AgentLoader::new(None);
        let state = loader.load(&client).await.clone();

        assert!(matches!(state, AgentState::Failed(ref msg) if msg.contains("500")));
        assert!(loader.agent().is_none());
        assert_eq!(loader.display_title(), None);

        // No automatic retry
        loader.load(&client).await;
    }

    #[test]
    fn settled_state_is_not_overwritten() {
        let mut loader = AgentLoader::new(None);
        loader.settle(Err(ApiError::InvalidResponse("agent")));
        loader.settle(Ok(Agent {
            id: "a1".into(),
            title: "late".into(),
            avatar_url: None,
        }));

        assert!(matches!(loader.state(), AgentState::Failed(_)));
    }

    #[test]
    fn untitled_agent_uses_fallback_title() {
        let mut loader = AgentLoader::new(Some("Support Bot".into()));
        loader.settle(Ok(Agent {
            id: "a1".into(),
            title: String::new(),
            avatar_url: None,
        }));
        assert_eq!(loader.display_title().as_deref(), Some("Support Bot"));

        let mut bare = AgentLoader::new(None);
        bare.settle(Ok(Agent {
            id: "a1".into(),
            title: " ".into(),
            avatar_url: None,
        }));
        assert_eq!(bare.display_title().as_deref(), Some("a1"));
    }
}

//! Agent endpoint lookup and runtime chat clients.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::endpoints;
use crate::error::ClientError;
use crate::signer::Signer;
use crate::transport::{CHAT_READ_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, Transport};

const API_VERSION: &str = "20240531";

/// Agent endpoint metadata relevant to starting a conversation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEndpoint {
    pub id: String,
    /// Whether the endpoint expects a session to thread turns together.
    #[serde(default)]
    pub should_enable_session: bool,
}

/// Regional agent management client.
pub struct AgentClient {
    transport: Transport,
}

impl AgentClient {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(region: &str, signer: Arc<dyn Signer>) -> Result<Self, ClientError> {
        let transport = Transport::new(
            endpoints::agent(region),
            signer,
            DEFAULT_CONNECT_TIMEOUT,
            DEFAULT_READ_TIMEOUT,
        )?;
        Ok(Self { transport })
    }

    /// Fetch an agent endpoint's configuration.
    ///
    /// # Errors
    ///
    /// Fails if the endpoint does not exist or is inaccessible.
    pub async fn get_agent_endpoint(&self, endpoint_id: &str) -> Result<AgentEndpoint, ClientError> {
        self.transport
            .get_json(&format!("/{API_VERSION}/agentEndpoints/{endpoint_id}"), &[])
            .await
    }
}

/// Regional agent runtime client.
pub struct AgentRuntimeClient {
    transport: Transport,
}

impl AgentRuntimeClient {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(region: &str, signer: Arc<dyn Signer>) -> Result<Self, ClientError> {
        let transport = Transport::new(
            endpoints::agent_runtime(region),
            signer,
            DEFAULT_CONNECT_TIMEOUT,
            CHAT_READ_TIMEOUT,
        )?;
        Ok(Self { transport })
    }

    /// Create a conversation session; returns the session identifier.
    ///
    /// # Errors
    ///
    /// Fails on transport errors.
    pub async fn create_session(
        &self,
        endpoint_id: &str,
        display_name: &str,
        description: &str,
    ) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        struct Session {
            id: String,
        }
        let body = json!({
            "displayName": display_name,
            "description": description,
        });
        let session: Session = self
            .transport
            .post_json(
                &format!("/{API_VERSION}/agentEndpoints/{endpoint_id}/sessions"),
                &body,
            )
            .await?;
        Ok(session.id)
    }

    /// One non-streaming turn; returns the agent's reply text.
    ///
    /// # Errors
    ///
    /// Fails on transport errors.
    pub async fn chat(
        &self,
        endpoint_id: &str,
        user_message: &str,
        session_id: Option<&str>,
    ) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        struct ChatResult {
            message: AgentMessage,
        }
        #[derive(Deserialize)]
        struct AgentMessage {
            content: AgentContent,
        }
        #[derive(Deserialize)]
        struct AgentContent {
            text: String,
        }

        let body = match session_id {
            Some(session) => json!({
                "userMessage": user_message,
                "shouldStream": false,
                "sessionId": session,
            }),
            None => json!({
                "userMessage": user_message,
                "shouldStream": false,
            }),
        };

        let result: ChatResult = self
            .transport
            .post_json(
                &format!("/{API_VERSION}/agentEndpoints/{endpoint_id}/actions/chat"),
                &body,
            )
            .await?;
        Ok(result.message.content.text)
    }
}

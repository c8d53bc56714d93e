//! Generative-AI inference client.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ClientError;
use crate::signer::Signer;
use crate::transport::{CHAT_READ_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, Transport};

const API_VERSION: &str = "20231130";

/// One chat message: a role plus its text fragments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: Vec<MessageContent>,
}

/// A single text fragment of a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

impl Message {
    /// A user-authored text message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "USER".to_owned(),
            content: vec![MessageContent {
                kind: "TEXT".to_owned(),
                text: text.into(),
            }],
        }
    }

    /// All text fragments concatenated.
    pub fn text(&self) -> String {
        self.content.iter().map(|c| c.text.as_str()).collect()
    }
}

/// Sampling controls applied to every turn of a session.
#[derive(Debug, Clone)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    pub top_p: f64,
    pub top_k: i32,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_tokens: 600,
            temperature: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            top_p: 0.75,
            top_k: -1,
        }
    }
}

/// Client for on-demand chat against a hosted model.
///
/// Holds the compartment, model, and sampling parameters for the whole
/// session; each call carries the full conversation so far.
pub struct InferenceClient {
    transport: Transport,
    compartment_id: String,
    model_id: String,
    params: SamplingParams,
}

impl InferenceClient {
    /// # Errors
    ///
    /// Fails if the underlying HTTP client cannot be constructed.
    pub fn new(
        endpoint: &str,
        compartment_id: impl Into<String>,
        model_id: impl Into<String>,
        params: SamplingParams,
        signer: Arc<dyn Signer>,
    ) -> Result<Self, ClientError> {
        let transport = Transport::new(endpoint, signer, DEFAULT_CONNECT_TIMEOUT, CHAT_READ_TIMEOUT)?;
        Ok(Self {
            transport,
            compartment_id: compartment_id.into(),
            model_id: model_id.into(),
            params,
        })
    }

    /// Send the conversation so far and return the assistant's reply.
    ///
    /// # Errors
    ///
    /// Fails on transport errors or when the service returns no choices.
    pub async fn chat(&self, messages: &[Message]) -> Result<Message, ClientError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ChatResult {
            chat_response: ChatResponse,
        }
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }

        let body = json!({
            "compartmentId": self.compartment_id,
            "servingMode": {
                "servingType": "ON_DEMAND",
                "modelId": self.model_id,
            },
            "chatRequest": {
                "apiFormat": "GENERIC",
                "messages": messages,
                "maxTokens": self.params.max_tokens,
                "temperature": self.params.temperature,
                "frequencyPenalty": self.params.frequency_penalty,
                "presencePenalty": self.params.presence_penalty,
                "topP": self.params.top_p,
                "topK": self.params.top_k,
            },
        });

        let result: ChatResult = self
            .transport
            .post_json(&format!("/{API_VERSION}/actions/chat"), &body)
            .await?;
        result
            .chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| {
                ClientError::UnexpectedResponse("chat response contained no choices".to_owned())
            })
    }
}

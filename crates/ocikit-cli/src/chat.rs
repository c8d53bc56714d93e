//! Interactive chat loops for the inference and agent services.
//!
//! Each loop is a plain request/response cycle: read a line, send the
//! explicit conversation state, print the reply. History lives in a local
//! value owned by the loop, never in a shared mutable object.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use ocikit_client::agent::{AgentClient, AgentRuntimeClient};
use ocikit_client::endpoints;
use ocikit_client::genai::{InferenceClient, Message, SamplingParams};

use super::{CYAN, DIM, RESET, resolve_signer};

/// Flags for `ocikit chat`.
#[derive(Args)]
pub struct ChatArgs {
    /// Region hosting the inference service.
    #[arg(long, env = "OCIKIT_GENAI_REGION", default_value = "us-chicago-1")]
    pub region: String,

    /// Full service endpoint override.
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Compartment the chat runs in.
    #[arg(long, env = "OCIKIT_COMPARTMENT")]
    pub compartment: String,

    /// Model OCID to converse with.
    #[arg(long, env = "OCIKIT_MODEL")]
    pub model: String,

    /// Maximum tokens per reply.
    #[arg(long, default_value_t = 600)]
    pub max_tokens: u32,

    #[arg(long, default_value_t = 1.0)]
    pub temperature: f64,

    #[arg(long, default_value_t = 0.0)]
    pub frequency_penalty: f64,

    #[arg(long, default_value_t = 0.0)]
    pub presence_penalty: f64,

    #[arg(long, default_value_t = 0.75)]
    pub top_p: f64,

    /// -1 disables top-k sampling.
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub top_k: i32,
}

/// Flags for `ocikit agent`.
#[derive(Args)]
pub struct AgentArgs {
    /// Region hosting the agent services.
    #[arg(long, env = "OCIKIT_AGENT_REGION", default_value = "us-chicago-1")]
    pub region: String,

    /// Agent endpoint OCID.
    #[arg(long, env = "OCIKIT_AGENT_ENDPOINT")]
    pub agent_endpoint: String,

    /// Display name for the created session.
    #[arg(long)]
    pub session_name: Option<String>,
}

/// `ocikit chat` — converse with a hosted model, threading the full message
/// history through every turn.
pub async fn cmd_chat(args: ChatArgs) -> Result<()> {
    let signer = resolve_signer()?;
    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| endpoints::genai_inference(&args.region));
    let params = SamplingParams {
        max_tokens: args.max_tokens,
        temperature: args.temperature,
        frequency_penalty: args.frequency_penalty,
        presence_penalty: args.presence_penalty,
        top_p: args.top_p,
        top_k: args.top_k,
    };
    let client = InferenceClient::new(&endpoint, &args.compartment, &args.model, params, signer)?;

    println!();
    println!("  {DIM}Chatting with{RESET} {CYAN}{}{RESET}{DIM}; Ctrl+D ends the session.{RESET}", args.model);

    let mut history: Vec<Message> = Vec::new();
    loop {
        let Some(user_input) = prompt_line()? else {
            break;
        };
        if user_input.is_empty() {
            continue;
        }

        history.push(Message::user(user_input));
        let reply = client.chat(&history).await?;
        println!("{}", "-".repeat(72));
        println!("{}", reply.text());
        history.push(reply);
    }

    println!();
    Ok(())
}

/// `ocikit agent` — converse with an agent endpoint, creating a session
/// first when the endpoint asks for one.
pub async fn cmd_agent(args: AgentArgs) -> Result<()> {
    let signer = resolve_signer()?;
    let agent = AgentClient::new(&args.region, Arc::clone(&signer))?;
    let runtime = AgentRuntimeClient::new(&args.region, signer)?;

    let endpoint_info = agent.get_agent_endpoint(&args.agent_endpoint).await?;
    let session_id = if endpoint_info.should_enable_session {
        let stamp = chrono::Utc::now().format("%Y-%m-%d_%H:%M:%S");
        let name = args
            .session_name
            .clone()
            .unwrap_or_else(|| format!("chat_session_{stamp}"));
        let description = format!("Chat session started at {stamp}");
        let session = runtime
            .create_session(&args.agent_endpoint, &name, &description)
            .await?;
        println!();
        println!("  {DIM}Session{RESET} {CYAN}{name}{RESET} {DIM}created.{RESET}");
        Some(session)
    } else {
        None
    };

    loop {
        let Some(user_input) = prompt_line()? else {
            break;
        };
        if user_input.is_empty() {
            continue;
        }

        println!("{}", "-".repeat(72));
        let reply = runtime
            .chat(&args.agent_endpoint, &user_input, session_id.as_deref())
            .await?;
        println!("{reply}");
        println!();
    }

    println!();
    Ok(())
}

/// Print the prompt separator and read one user line.
///
/// Returns `None` on end of input.
fn prompt_line() -> Result<Option<String>> {
    println!("{}", "=".repeat(72));
    print!("You: ");
    std::io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    let read = std::io::stdin()
        .read_line(&mut line)
        .context("failed to read input")?;
    if read == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_owned()))
}

//! `ocikit` — command-line toolkit for vault replication and hosted-model
//! chat sessions.
//!
//! A standalone client binary: everything goes through the service REST
//! APIs via `ocikit-client`, and the only credential it ever touches is the
//! opaque session token handed to the signer.

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod chat;
mod profile;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use ocikit_client::kms::DEFAULT_WRAPPING_ALGORITHM;
use ocikit_client::{SecurityTokenSigner, Signer};
use ocikit_core::{
    CopyOutcome, KeyBackupConfig, ReplicationEvent, SecretBackupConfig, VaultRef,
};

// ── ANSI color helpers ───────────────────────────────────────────────

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";

// ── CLI structure ────────────────────────────────────────────────────

/// ocikit — vault backup and chat tooling.
#[derive(Parser)]
#[command(
    name = "ocikit",
    version,
    about = "ocikit CLI — copy vault keys and secrets across regions, chat with hosted models",
    long_about = None,
    after_help = format!(
        "{DIM}Environment variables:{RESET}\n  \
         OCIKIT_AUTH_TOKEN   Session token used to sign requests\n  \
         OCIKIT_PROFILE      Path to an ocikit.toml profile\n\n\
         {DIM}Examples:{RESET}\n  \
         ocikit backup keys --profile ocikit.toml\n  \
         ocikit backup secrets --profile ocikit.toml --target-key ocid1.key.oc1..\n  \
         ocikit chat --compartment ocid1.compartment.oc1.. --model ocid1.generativeaimodel.oc1.."
    ),
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy keys or secrets from one vault to another.
    Backup {
        #[command(subcommand)]
        action: BackupCommands,
    },
    /// Interactive chat against a hosted inference model.
    Chat(chat::ChatArgs),
    /// Interactive chat against a retrieval-augmented agent endpoint.
    Agent(chat::AgentArgs),
}

#[derive(Subcommand)]
enum BackupCommands {
    /// Export software-protected keys and import them into the target vault.
    Keys(BackupKeysArgs),
    /// Copy active secrets into the target vault.
    Secrets(BackupSecretsArgs),
}

/// Source/target vault coordinates shared by both backup flows.
#[derive(Args)]
struct VaultPairArgs {
    /// Path to an ocikit.toml profile with [source] and [target] sections.
    #[arg(long, env = "OCIKIT_PROFILE")]
    profile: Option<String>,

    /// Source region identifier (e.g. us-phoenix-1).
    #[arg(long, env = "OCIKIT_SOURCE_REGION")]
    source_region: Option<String>,

    /// Source compartment OCID.
    #[arg(long, env = "OCIKIT_SOURCE_COMPARTMENT")]
    source_compartment: Option<String>,

    /// Source vault OCID.
    #[arg(long, env = "OCIKIT_SOURCE_VAULT")]
    source_vault: Option<String>,

    /// Target region identifier (e.g. us-ashburn-1).
    #[arg(long, env = "OCIKIT_TARGET_REGION")]
    target_region: Option<String>,

    /// Target compartment OCID.
    #[arg(long, env = "OCIKIT_TARGET_COMPARTMENT")]
    target_compartment: Option<String>,

    /// Target vault OCID.
    #[arg(long, env = "OCIKIT_TARGET_VAULT")]
    target_vault: Option<String>,
}

#[derive(Args)]
struct BackupKeysArgs {
    #[command(flatten)]
    vaults: VaultPairArgs,

    /// Wrapping algorithm for key transport.
    #[arg(long, default_value = DEFAULT_WRAPPING_ALGORITHM)]
    wrapping_algorithm: String,
}

#[derive(Args)]
struct BackupSecretsArgs {
    #[command(flatten)]
    vaults: VaultPairArgs,

    /// Encryption key OCID in the target vault for newly created secrets.
    #[arg(long, env = "OCIKIT_TARGET_KEY")]
    target_key: Option<String>,
}

// ── Entry point ──────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!();
            eprintln!("  {RED}{BOLD}✗ Error:{RESET} {e:#}");
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Backup { action } => match action {
            BackupCommands::Keys(args) => cmd_backup_keys(args).await,
            BackupCommands::Secrets(args) => cmd_backup_secrets(args).await,
        },
        Commands::Chat(args) => chat::cmd_chat(args).await,
        Commands::Agent(args) => chat::cmd_agent(args).await,
    }
}

// ── Backup commands ──────────────────────────────────────────────────

async fn cmd_backup_keys(args: BackupKeysArgs) -> Result<()> {
    let resolved = resolve_vaults(&args.vaults)?;
    let signer = resolve_signer()?;

    println!();
    header(
        "🔑",
        &format!(
            "Copying keys {} → {}",
            resolved.source.region, resolved.target.region
        ),
    );
    println!();
    kv_line("Source vault", &resolved.source.vault_id);
    kv_line("Target vault", &resolved.target.vault_id);
    kv_line("Wrapping algorithm", &args.wrapping_algorithm);
    println!();

    let config = KeyBackupConfig {
        source: resolved.source,
        target: resolved.target,
        wrapping_algorithm: args.wrapping_algorithm,
    };
    ocikit_core::keys::run_key_backup(config, signer, print_event).await?;
    println!();
    Ok(())
}

async fn cmd_backup_secrets(args: BackupSecretsArgs) -> Result<()> {
    let resolved = resolve_vaults(&args.vaults)?;
    let target_key_id = match args.target_key {
        Some(key) if !key.is_empty() => key,
        _ if !resolved.target_key.is_empty() => resolved.target_key.clone(),
        _ => bail!("missing --target-key — pass the flag or set key under [target] in the profile"),
    };
    let signer = resolve_signer()?;

    println!();
    header(
        "🔐",
        &format!(
            "Copying secrets {} → {}",
            resolved.source.region, resolved.target.region
        ),
    );
    println!();
    kv_line("Source vault", &resolved.source.vault_id);
    kv_line("Target vault", &resolved.target.vault_id);
    kv_line("Target key", &target_key_id);
    println!();

    let config = SecretBackupConfig {
        source: resolved.source,
        target: resolved.target,
        target_key_id,
    };
    ocikit_core::secrets::run_secret_backup(config, signer, print_event).await?;
    println!();
    Ok(())
}

/// One line per asset; failures and skips always get exactly one.
fn print_event(event: ReplicationEvent) {
    match event {
        ReplicationEvent::Copying { name, .. } => {
            println!("  {DIM}Backing up {name}...{RESET}");
        }
        ReplicationEvent::Copied { name, outcome, .. } => {
            let label = match outcome {
                CopyOutcome::Created => "created",
                CopyOutcome::Updated => "updated",
            };
            println!("  {GREEN}✓{RESET} {name} {DIM}({label}){RESET}");
        }
        ReplicationEvent::Skipped {
            name,
            source_id,
            reason,
        } => {
            println!("  {YELLOW}↷{RESET} {name} {DIM}({source_id}){RESET} — {reason}");
        }
        ReplicationEvent::Failed {
            name,
            source_id,
            error,
        } => {
            println!("  {RED}✗{RESET} {name} {DIM}({source_id}){RESET} — {RED}{error}{RESET}");
        }
    }
}

// ── Configuration resolution ─────────────────────────────────────────

struct ResolvedVaults {
    source: VaultRef,
    target: VaultRef,
    /// Encryption key from the profile's [target] section, possibly empty.
    target_key: String,
}

/// Merge flags (and their env fallbacks) over the optional profile file.
fn resolve_vaults(args: &VaultPairArgs) -> Result<ResolvedVaults> {
    let profile = match &args.profile {
        Some(path) => profile::load(path)?,
        None if std::path::Path::new("ocikit.toml").exists() => profile::load("ocikit.toml")?,
        None => profile::Profile::default(),
    };

    let source = VaultRef {
        region: require(
            args.source_region.as_deref(),
            &profile.source.region,
            "--source-region",
        )?,
        compartment_id: require(
            args.source_compartment.as_deref(),
            &profile.source.compartment,
            "--source-compartment",
        )?,
        vault_id: require(
            args.source_vault.as_deref(),
            &profile.source.vault,
            "--source-vault",
        )?,
    };
    let target = VaultRef {
        region: require(
            args.target_region.as_deref(),
            &profile.target.region,
            "--target-region",
        )?,
        compartment_id: require(
            args.target_compartment.as_deref(),
            &profile.target.compartment,
            "--target-compartment",
        )?,
        vault_id: require(
            args.target_vault.as_deref(),
            &profile.target.vault,
            "--target-vault",
        )?,
    };

    Ok(ResolvedVaults {
        source,
        target,
        target_key: profile.target.key,
    })
}

fn require(flag: Option<&str>, profile_value: &str, option: &str) -> Result<String> {
    if let Some(value) = flag {
        if !value.is_empty() {
            return Ok(value.to_owned());
        }
    }
    if !profile_value.is_empty() {
        return Ok(profile_value.to_owned());
    }
    bail!("missing {option} — pass the flag or set it in the profile")
}

// ── Authentication ───────────────────────────────────────────────────

/// Build the signer from the resolved session token.
fn resolve_signer() -> Result<Arc<dyn Signer>> {
    let token = resolve_token()?;
    Ok(Arc::new(SecurityTokenSigner::new(token)?))
}

/// Resolve the session token: `OCIKIT_AUTH_TOKEN` env > saved token > error.
fn resolve_token() -> Result<String> {
    if let Ok(token) = std::env::var("OCIKIT_AUTH_TOKEN") {
        if !token.is_empty() {
            return Ok(token);
        }
    }

    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .context("HOME not set")?;
    let path = std::path::Path::new(&home).join(".ocikit").join("token");
    if path.exists() {
        let token = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let token = token.trim().to_owned();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    bail!("not authenticated — set OCIKIT_AUTH_TOKEN or write a session token to ~/.ocikit/token")
}

// ── Output helpers ───────────────────────────────────────────────────

fn header(icon: &str, title: &str) {
    println!("  {icon} {BOLD}{title}{RESET}");
}

fn kv_line(key: &str, value: &str) {
    println!("  {DIM}{key}:{RESET} {value}");
}

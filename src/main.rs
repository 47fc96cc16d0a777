//! cephkey - CLI entry point
//!
//! Reconciles Ceph authentication keyrings to a desired state and prints a
//! structured JSON result on stdout.
//!
//! Usage:
//!   cephkey key --name client.admin --dest /etc/ceph \
//!       --secret AQCxyz== --cap "mon=allow *" --cap "osd=allow *"
//!   cephkey key --name client.admin --state generate_secret
//!   cephkey info --name client.admin --user-key /etc/ceph/ceph.client.admin.keyring

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing::warn;

use cephkey::config::{DEFAULT_CLUSTER, DEFAULT_CONTAINER_IMAGE};
use cephkey::reconcile::ReconcileError;
use cephkey::{
    query, CapabilitySet, DesiredState, HostInvoker, InfoParams, KeyParams, ReconciliationResult,
    Reconciler,
};

#[derive(Parser)]
#[command(
    name = "cephkey",
    about = "Keyring provisioning and inspection for Ceph cluster daemons"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Reconcile a key to its desired state (present, absent, generate_secret).
    Key(KeyArgs),
    /// Read-only check whether key material exists at a path.
    Info(InfoArgs),
}

#[derive(Args)]
struct KeyArgs {
    /// Entity name, e.g. client.admin.
    #[arg(long)]
    name: String,

    /// Cluster namespace prefix for the keyring filename.
    #[arg(long, default_value = DEFAULT_CLUSTER)]
    cluster: String,

    /// Desired state: present, absent, or generate_secret.
    #[arg(long, default_value = "present", value_parser = parse_state)]
    state: DesiredState,

    /// Pre-supplied key material; generated by the tool when omitted.
    #[arg(long)]
    secret: Option<String>,

    /// Capability grant as scope=grant, repeatable; order is preserved.
    #[arg(long = "cap", value_name = "SCOPE=GRANT")]
    caps: Vec<String>,

    /// Destination directory for the keyring file.
    #[arg(long)]
    dest: Option<PathBuf>,

    /// Owner to apply to the created keyring.
    #[arg(long)]
    owner: Option<String>,

    /// Group to apply to the created keyring.
    #[arg(long)]
    group: Option<String>,

    /// Octal mode to apply to the created keyring, e.g. 0600.
    #[arg(long)]
    mode: Option<String>,

    /// Run ceph-authtool inside a container.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    containerized: bool,

    /// Container image used when containerized.
    #[arg(long, default_value = DEFAULT_CONTAINER_IMAGE)]
    container_image: String,
}

#[derive(Args)]
struct InfoArgs {
    /// Entity name, e.g. client.admin.
    #[arg(long)]
    name: String,

    #[arg(long, default_value = DEFAULT_CLUSTER)]
    cluster: String,

    #[arg(long)]
    user: Option<String>,

    /// Path to previously materialized key material.
    #[arg(long)]
    user_key: Option<PathBuf>,

    #[arg(long, default_value = "json")]
    output_format: String,

    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    containerized: bool,

    #[arg(long)]
    container_image: Option<String>,
}

fn parse_state(value: &str) -> Result<DesiredState, String> {
    DesiredState::parse(value)
        .ok_or_else(|| format!("expected present, absent, or generate_secret, got {:?}", value))
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cephkey=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Key(args) => run_key(args),
        Command::Info(args) => run_info(args),
    }
}

fn run_key(args: KeyArgs) -> ExitCode {
    let caps = match CapabilitySet::parse_pairs(&args.caps) {
        Ok(caps) => caps,
        Err(e) => return fail(&e, None),
    };

    let params = KeyParams {
        cluster: args.cluster,
        name: args.name,
        state: args.state,
        secret: args.secret,
        caps,
        dest: args.dest,
        owner: args.owner,
        group: args.group,
        mode: args.mode,
        containerized: args.containerized,
        container_image: args.container_image,
    };

    let invoker = HostInvoker;
    match Reconciler::new(&invoker).reconcile(&params) {
        Ok(result) => emit(&result),
        Err(ReconcileError::CommandFailed { result }) => {
            fail("Failed to create key", Some(&result))
        }
        Err(ReconcileError::Key(e)) => fail(&e.to_string(), None),
    }
}

fn run_info(args: InfoArgs) -> ExitCode {
    let params = InfoParams {
        name: args.name,
        cluster: args.cluster,
        user: args.user,
        user_key: args.user_key,
        output_format: args.output_format,
        state: "info".to_string(),
        containerized: args.containerized,
        container_image: args.container_image,
    };

    emit(&query::key_info(&params))
}

/// Print the result object as JSON on stdout.
fn emit(result: &ReconciliationResult) -> ExitCode {
    match serde_json::to_string_pretty(result) {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("failed to serialize result: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Fatal path: message plus the full result payload, then non-zero exit.
fn fail(msg: &str, result: Option<&ReconciliationResult>) -> ExitCode {
    warn!(error = msg, "reconciliation failed");
    let mut payload = serde_json::Map::new();
    payload.insert("msg".to_string(), serde_json::json!(msg));
    payload.insert("failed".to_string(), serde_json::json!(true));
    if let Some(result) = result {
        if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(result) {
            payload.extend(fields);
        }
    }
    eprintln!("{}", serde_json::Value::Object(payload));
    ExitCode::FAILURE
}

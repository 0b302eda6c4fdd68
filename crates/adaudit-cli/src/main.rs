use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Duration;

use adaudit_contracts::comparison::{ComparisonResult, NormalizeMode};
use adaudit_contracts::events::EventLog;
use adaudit_contracts::history::{HistoryEntry, HistoryStore};
use adaudit_contracts::recovery::{normalize_completion, reconcile_result};
use adaudit_engine::{new_audit_id, AuditConfig, AuditEngine, AuditImage, AuditRequest, AuditResponse};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

const DEFAULT_HISTORY_PATH: &str = ".adaudit/history.json";

#[derive(Debug, Parser)]
#[command(
    name = "adaudit",
    version,
    about = "Compare a campaign request screenshot against the ad platform configuration"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Audit(AuditArgs),
    Normalize(NormalizeArgs),
    Reconcile(ReconcileArgs),
    History(HistoryArgs),
    Models(ModelsArgs),
}

#[derive(Debug, Parser)]
struct AuditArgs {
    /// Happy Fox request screenshot.
    #[arg(long)]
    source_of_truth: Option<PathBuf>,
    /// Ad platform configuration screenshot.
    #[arg(long)]
    platform: Option<PathBuf>,
    #[arg(long)]
    platform_name: Option<String>,
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    timeout_secs: Option<u64>,
    #[arg(long)]
    out: Option<PathBuf>,
    #[arg(long)]
    events: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_HISTORY_PATH)]
    history: PathBuf,
    #[arg(long)]
    no_discovery: bool,
}

#[derive(Debug, Parser)]
struct NormalizeArgs {
    /// Raw model text; `-` or absent reads stdin.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    client: bool,
    #[arg(long)]
    platform_name: Option<String>,
}

#[derive(Debug, Parser)]
struct ReconcileArgs {
    /// Envelope or bare result JSON; `-` or absent reads stdin.
    #[arg(long)]
    input: Option<PathBuf>,
    #[arg(long)]
    platform_name: Option<String>,
}

#[derive(Debug, Parser)]
struct HistoryArgs {
    #[arg(long, global = true)]
    path: Option<PathBuf>,
    #[command(subcommand)]
    action: HistoryAction,
}

#[derive(Debug, Subcommand)]
enum HistoryAction {
    List,
    Delete { index: usize },
    Clear,
}

#[derive(Debug, Parser)]
struct ModelsArgs {
    #[arg(long)]
    model: Option<String>,
    #[arg(long)]
    no_discovery: bool,
}

fn main() {
    dotenvy::dotenv_override().ok();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("adaudit error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Audit(args) => run_audit(args),
        Command::Normalize(args) => run_normalize(args),
        Command::Reconcile(args) => run_reconcile(args),
        Command::History(args) => run_history(args),
        Command::Models(args) => run_models(args),
    }
}

fn run_audit(args: AuditArgs) -> Result<i32> {
    let mut config = AuditConfig::from_env();
    apply_overrides(&mut config, args.model.as_deref(), args.no_discovery);
    if let Some(secs) = args.timeout_secs.filter(|secs| *secs > 0) {
        config.timeout = Duration::from_secs(secs);
    }

    let audit_id = new_audit_id();
    let events_path = args
        .events
        .clone()
        .or_else(|| args.out.as_ref().map(|out| out.join("events.jsonl")));
    let events = match events_path {
        Some(path) => EventLog::new(path, &audit_id),
        None => EventLog::disabled(&audit_id),
    };

    let request = AuditRequest {
        source_of_truth: load_image(args.source_of_truth.as_deref())?,
        platform: load_image(args.platform.as_deref())?,
        platform_name: args.platform_name.clone(),
    };
    eprintln!(
        "adaudit {audit_id}: auditing against {} with {}",
        request.platform_label(),
        config.model
    );

    let engine = AuditEngine::from_config(config, events);
    let response = AuditResponse::from_outcome(engine.audit(&request));
    if let AuditResponse::Success(result) = &response {
        eprintln!("adaudit {audit_id}: {}", result.verdict().headline());
        for field in &result.fields {
            eprintln!("  {}: {}", field.display_name(), field.status.as_str());
        }
        record_history(&args.history, result);
    }

    let body = serde_json::to_string_pretty(&response.to_value())?;
    if let Some(out) = &args.out {
        fs::create_dir_all(out).with_context(|| format!("failed creating {}", out.display()))?;
        let path = out.join("audit.json");
        fs::write(&path, &body).with_context(|| format!("failed writing {}", path.display()))?;
    }
    println!("{body}");
    Ok(exit_code_for_status(response.http_status()))
}

fn run_normalize(args: NormalizeArgs) -> Result<i32> {
    let text = read_input(args.input.as_deref())?;
    let mode = if args.client {
        NormalizeMode::Client
    } else {
        NormalizeMode::Server
    };
    let mut result = normalize_completion(&text, mode);
    if let Some(name) = non_empty(args.platform_name.as_deref()) {
        result = result.with_platform_name(Some(name));
    }
    print_result(&result)?;
    Ok(0)
}

fn run_reconcile(args: ReconcileArgs) -> Result<i32> {
    let text = read_input(args.input.as_deref())?;
    let value: Value =
        serde_json::from_str(text.trim()).context("reconcile input is not valid JSON")?;
    let result = reconcile_result(&value, args.platform_name.as_deref());
    print_result(&result)?;
    Ok(0)
}

fn run_history(args: HistoryArgs) -> Result<i32> {
    let store = HistoryStore::new(
        args.path
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_PATH)),
    );
    match args.action {
        HistoryAction::List => {
            println!("{}", serde_json::to_string_pretty(&store.entries())?);
        }
        HistoryAction::Delete { index } => {
            let Some(removed) = store.delete(index)? else {
                bail!(
                    "no history entry at index {index} in {}",
                    store.path().display()
                );
            };
            eprintln!(
                "adaudit: removed {} audit from {}",
                removed.platform, removed.recorded_at
            );
        }
        HistoryAction::Clear => {
            store.clear()?;
            eprintln!("adaudit: cleared {}", store.path().display());
        }
    }
    Ok(0)
}

fn run_models(args: ModelsArgs) -> Result<i32> {
    let mut config = AuditConfig::from_env();
    apply_overrides(&mut config, args.model.as_deref(), args.no_discovery);
    if config.require_api_key().is_err() {
        config.discover_models = false;
    }
    let engine = AuditEngine::from_config(config, EventLog::disabled(new_audit_id()));
    for model in engine.candidates() {
        println!("{model}");
    }
    Ok(0)
}

fn apply_overrides(config: &mut AuditConfig, model: Option<&str>, no_discovery: bool) {
    if let Some(model) = non_empty(model) {
        config.model = model;
    }
    if no_discovery {
        config.discover_models = false;
    }
}

fn record_history(path: &Path, result: &ComparisonResult) {
    if let Err(err) = HistoryStore::new(path).record(HistoryEntry::from_result(result)) {
        eprintln!("adaudit warning: history not updated ({err:#})");
    }
}

fn print_result(result: &ComparisonResult) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&result.to_value())?);
    Ok(())
}

fn exit_code_for_status(status: u16) -> i32 {
    match status {
        200..=299 => 0,
        400..=499 => 2,
        _ => 1,
    }
}

fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed reading {}", path.display())),
        _ => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("failed reading stdin")?;
            Ok(buffer)
        }
    }
}

fn load_image(path: Option<&Path>) -> Result<Option<AuditImage>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let bytes = fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
    let mime_type = mime_for_image(path, &bytes);
    Ok(Some(AuditImage::new(bytes, mime_type)))
}

/// MIME type sniffed from the bytes, falling back to the file extension.
fn mime_for_image(path: &Path, bytes: &[u8]) -> &'static str {
    if let Ok(format) = image::guess_format(bytes) {
        return format.to_mime_type();
    }
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

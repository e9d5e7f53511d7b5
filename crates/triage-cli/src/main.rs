mod display;

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use triage_ai::{Bundle, CategoryPolicy, InferenceService, evaluate};
use triage_core::PatientRequest;
use triage_server::ServerConfig;

#[derive(Parser)]
#[command(name = "triage", version, about = "Patient risk and department triage")]
struct Cli {
    /// Directory holding feature_metadata.json and the two classifier exports
    #[arg(long, global = true, env = "TRIAGE_BUNDLE_DIR", default_value = "ml/models")]
    bundle: PathBuf,

    /// Reject unrecognised gender, symptom, or condition values
    #[arg(long, global = true, env = "TRIAGE_STRICT")]
    strict: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the classification API over HTTP
    Serve {
        #[arg(long, env = "TRIAGE_BIND", default_value = "0.0.0.0:5000")]
        bind: String,
    },
    /// Classify one patient JSON document read from stdin
    Predict,
    /// Print the model card of the bundle
    Info,
    /// Score a labelled dataset CSV and report agreement with ground truth
    Evaluate {
        csv: PathBuf,
        /// Number of conflicting rows to list
        #[arg(long, default_value_t = 10)]
        show_conflicts: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // stdout is reserved for command output.
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();
    tracing::debug!("triage v{}", env!("CARGO_PKG_VERSION"));

    let policy = if cli.strict {
        CategoryPolicy::Strict
    } else {
        CategoryPolicy::Lenient
    };

    let outcome = match cli.command {
        Command::Predict => return predict(&cli.bundle, policy),
        Command::Serve { bind } => serve(ServerConfig {
            bind,
            bundle_dir: cli.bundle,
            policy,
        }),
        Command::Info => info(&cli.bundle),
        Command::Evaluate {
            csv,
            show_conflicts,
        } => run_evaluation(&cli.bundle, policy, &csv, show_conflicts),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_service(dir: &Path, policy: CategoryPolicy) -> anyhow::Result<InferenceService> {
    let bundle =
        Bundle::load(dir).with_context(|| format!("loading model bundle from {}", dir.display()))?;
    Ok(InferenceService::new(Arc::new(bundle)).with_policy(policy))
}

fn serve(config: ServerConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(triage_server::serve(config))
}

fn predict(dir: &Path, policy: CategoryPolicy) -> ExitCode {
    match predict_json(dir, policy, std::io::stdin().lock()) {
        Ok(doc) => {
            println!("{doc}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            println!("{}", serde_json::json!({ "error": format!("{err:#}") }));
            ExitCode::FAILURE
        }
    }
}

fn predict_json(dir: &Path, policy: CategoryPolicy, mut input: impl Read) -> anyhow::Result<String> {
    let mut text = String::new();
    input.read_to_string(&mut text).context("reading stdin")?;

    let service = load_service(dir, policy)?;
    let value: serde_json::Value = serde_json::from_str(&text).context("parsing patient JSON")?;
    anyhow::ensure!(value.is_object(), "patient JSON must be an object");
    let request: PatientRequest =
        serde_json::from_value(value).context("parsing patient JSON")?;
    let result = service.classify_request(&request)?;
    Ok(serde_json::to_string_pretty(&result)?)
}

fn info(dir: &Path) -> anyhow::Result<()> {
    let bundle =
        Bundle::load(dir).with_context(|| format!("loading model bundle from {}", dir.display()))?;
    display::print_model_card(dir, &bundle);
    Ok(())
}

fn run_evaluation(
    dir: &Path,
    policy: CategoryPolicy,
    csv: &Path,
    show_conflicts: usize,
) -> anyhow::Result<()> {
    let service = load_service(dir, policy)?;
    let batches = evaluate::read_csv(csv)?;
    let records = evaluate::records_from_batches(&batches)?;
    let evaluation = evaluate::evaluate(&service, &records)?;
    display::print_evaluation(csv, &evaluation, show_conflicts);
    Ok(())
}

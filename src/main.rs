use anyhow::{Context, anyhow};
use clap::Parser;
use dotenvy::dotenv;
use s3_bridge::config::BridgeConfig;
use s3_bridge::infrastructure::adapter::setup_adapter;
use s3_bridge::models::{CHANNEL, MethodCall, STREAM};
use s3_bridge::services::progress::ProgressSubscription;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Method to invoke (uploadToS3, createPreSignedURL)
    method: String,

    /// Call arguments as a JSON object
    #[arg(short, long, conflicts_with = "args_file")]
    args: Option<String>,

    /// Read call arguments from a JSON file
    #[arg(long)]
    args_file: Option<PathBuf>,
}

fn parse_arguments(args: &Args) -> anyhow::Result<Map<String, Value>> {
    let raw = match (&args.args, &args.args_file) {
        (Some(raw), _) => raw.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => "{}".to_string(),
    };

    match serde_json::from_str::<Value>(&raw).context("parsing call arguments")? {
        Value::Object(map) => Ok(map),
        other => Err(anyhow!("call arguments must be a JSON object, got {}", other)),
    }
}

/// Echoes stream events to stderr until the stream is closed.
fn spawn_progress_printer(mut subscription: ProgressSubscription) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(percent) = subscription.recv().await {
            eprintln!("{}: {}%", STREAM, percent);
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "s3_bridge=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("🚀 {} handling '{}'", CHANNEL, args.method);

    let arguments = parse_arguments(&args)?;
    let adapter = setup_adapter(BridgeConfig::from_env());

    let printer = spawn_progress_printer(adapter.on_listen());

    let response = adapter
        .handle_method_call(MethodCall::new(args.method, arguments))
        .await;

    adapter.on_cancel();
    println!("{}", serde_json::to_string_pretty(&response)?);

    printer.await.context("progress printer task failed")?;
    Ok(())
}

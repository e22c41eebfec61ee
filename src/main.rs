use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::Value;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use vertica_k8s_admission::admission::{
    AdmissionPipeline, AdmissionRequest, Operation, SchemeRegistry,
};
use vertica_k8s_admission::crd::ResourceKind;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the admission and conversion webhooks
    #[cfg(feature = "admission-webhook")]
    Serve(ServeArgs),
    /// Run admission on a manifest without a cluster
    Validate(ValidateArgs),
    /// Convert a manifest to another served apiVersion
    Convert(ConvertArgs),
    /// Show version information
    Version,
}

#[cfg(feature = "admission-webhook")]
#[derive(Parser, Debug)]
struct ServeArgs {
    /// Address the webhook server listens on
    #[arg(long, env = "WEBHOOK_BIND_ADDR", default_value = "0.0.0.0:9443")]
    bind_addr: std::net::SocketAddr,

    /// PEM certificate; TLS is enabled when both cert and key are set
    #[arg(long, env = "WEBHOOK_TLS_CERT", requires = "tls_key")]
    tls_cert: Option<String>,

    /// PEM private key
    #[arg(long, env = "WEBHOOK_TLS_KEY", requires = "tls_cert")]
    tls_key: Option<String>,
}

#[derive(Parser, Debug)]
struct ValidateArgs {
    /// YAML or JSON manifest
    file: PathBuf,

    /// Previously accepted version of the object; validates as an update
    #[arg(long)]
    old: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ConvertArgs {
    /// YAML or JSON manifest
    file: PathBuf,

    /// Target apiVersion, e.g. vertica.com/v1
    #[arg(long)]
    to: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let pipeline = AdmissionPipeline::new(Arc::new(SchemeRegistry::new()));

    match args.command {
        Commands::Version => {
            println!("vertica-admission v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        #[cfg(feature = "admission-webhook")]
        Commands::Serve(serve) => run_server(pipeline, serve).await,
        Commands::Validate(validate) => run_validate(&pipeline, validate),
        Commands::Convert(convert) => run_convert(&pipeline, convert),
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    // Logs go to stderr so that convert output can be piped
    let registry = tracing_subscriber::registry().with(env_filter);
    match format {
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
    }
}

#[cfg(feature = "admission-webhook")]
async fn run_server(pipeline: AdmissionPipeline, args: ServeArgs) -> anyhow::Result<()> {
    use vertica_k8s_admission::webhook::WebhookServer;

    info!(
        "Starting vertica-admission v{} on {}",
        env!("CARGO_PKG_VERSION"),
        args.bind_addr
    );
    let mut server = WebhookServer::new(pipeline);
    if let (Some(cert), Some(key)) = (args.tls_cert, args.tls_key) {
        server = server.with_tls(cert, key);
    }
    server.start(args.bind_addr).await?;
    Ok(())
}

fn read_manifest(path: &Path) -> anyhow::Result<Value> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn kind_of(object: &Value) -> anyhow::Result<ResourceKind> {
    let kind = object
        .get("kind")
        .and_then(Value::as_str)
        .context("manifest has no kind")?;
    Ok(kind.parse()?)
}

fn run_validate(pipeline: &AdmissionPipeline, args: ValidateArgs) -> anyhow::Result<()> {
    let object = read_manifest(&args.file)?;
    let kind = kind_of(&object)?;
    let old_object = args.old.as_deref().map(read_manifest).transpose()?;
    let operation = if old_object.is_some() {
        Operation::Update
    } else {
        Operation::Create
    };

    let verdict = pipeline.admit(AdmissionRequest {
        kind,
        operation,
        object: Some(object),
        old_object,
    })?;
    for warning in &verdict.warnings {
        warn!("{}", warning);
    }
    match verdict.message() {
        None => {
            println!("{} {} accepted", kind, args.file.display());
            Ok(())
        }
        Some(message) => bail!(message),
    }
}

fn run_convert(pipeline: &AdmissionPipeline, args: ConvertArgs) -> anyhow::Result<()> {
    let object = read_manifest(&args.file)?;
    let converted = pipeline.convert(object, &args.to)?;
    print!("{}", serde_yaml::to_string(&converted)?);
    Ok(())
}

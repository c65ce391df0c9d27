use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::io::AsyncReadExt;

use blogsmith::aws::Credentials;
use blogsmith::config::Settings;
use blogsmith::consts::{AUTHOR, REPO};
use blogsmith::handler::{InvocationEvent, Pipeline};
use blogsmith::logging::{LogFormat, init_logging};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatArg {
    Text,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => LogFormat::Text,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Parser)]
#[command(
    name = "blogsmith",
    version,
    author = AUTHOR,
    about = "Writes a short blog post on a topic and stores it.",
    after_help = REPO
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Config file (default: $BLOGSMITH_CONFIG, then ~/.blogsmith/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// AWS region for both services
    #[arg(long, global = true)]
    region: Option<String>,

    /// Destination bucket
    #[arg(long, global = true)]
    bucket: Option<String>,

    /// Model or inference-profile identifier
    #[arg(long, global = true)]
    model_id: Option<String>,

    /// Write artifacts under this directory instead of S3
    #[arg(long, global = true)]
    out_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormatArg>,
}

#[derive(Subcommand)]
enum Command {
    /// Handle one invocation event read from a file or stdin
    Invoke {
        /// Event JSON file (reads stdin when omitted)
        #[arg(short, long)]
        event: Option<PathBuf>,
    },
    /// Generate and store a post for a topic
    Topic {
        /// The subject of the post
        topic: String,
    },
    /// Print the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load config")?;
    apply_flags(&mut settings, &cli);
    settings.validate().context("invalid configuration")?;

    init_logging(&settings.logging).context("failed to initialize logging")?;

    let raw_event = match &cli.command {
        Command::Config => {
            print!("{}", settings.to_toml()?);
            return Ok(());
        }
        Command::Invoke { event: Some(path) } => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read event file {}", path.display()))?,
        Command::Invoke { event: None } => {
            let mut buf = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buf)
                .await
                .context("failed to read event from stdin")?;
            buf
        }
        Command::Topic { topic } => serde_json::to_string(&InvocationEvent::for_topic(topic))?,
    };

    let credentials = Credentials::from_env().context("failed to resolve AWS credentials")?;
    let pipeline = Pipeline::from_settings(&settings, credentials, cli.out_dir.as_deref())
        .context("failed to build pipeline")?;

    let response = pipeline
        .handle_json(&raw_event)
        .await
        .context("unhandled request error")?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn apply_flags(settings: &mut Settings, cli: &Cli) {
    if let Some(region) = &cli.region {
        settings.region = region.clone();
    }
    if let Some(bucket) = &cli.bucket {
        settings.storage.bucket = bucket.clone();
    }
    if let Some(model_id) = &cli.model_id {
        settings.generation.model_id = model_id.clone();
    }
    if let Some(format) = cli.log_format {
        settings.logging.format = format.into();
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use legal_summarizer::{
    config::Config,
    api::routes::create_router,
    AppState, SummaryClient, SummaryOutcome, SummaryRequestController,
};

#[derive(Parser)]
#[command(name = "legal-summarizer")]
#[command(
    version,
    about = "Summarize legal documents through a summarization backend",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a document to the backend and print its summary
    Summarize {
        /// Document text; read from stdin when neither this nor --file is given
        text: Option<String>,
        /// Read the document from a file
        #[arg(long, conflicts_with = "text")]
        file: Option<PathBuf>,
        /// Upload a .txt, .pdf or .docx file and let the backend extract it
        #[arg(long, conflicts_with_all = ["text", "file"])]
        upload: Option<PathBuf>,
        /// Print the tagged outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the summarization backend
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;

    match cli.command {
        Commands::Summarize { upload: Some(path), json, .. } => upload(&config, path, json).await,
        Commands::Summarize { text, file, json, .. } => {
            let document = match (text, file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(path).await?,
                (None, None) => {
                    let mut buf = String::new();
                    tokio::io::stdin().read_to_string(&mut buf).await?;
                    buf
                }
            };
            summarize(&config, document, json).await
        }
        Commands::Serve => serve(config).await,
    }
}

async fn summarize(
    config: &Config,
    document: String,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let controller = SummaryRequestController::new(SummaryClient::from_config(config)?);

    let canceller = controller.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            canceller.cancel();
        }
    });

    let result = controller.submit_text(document).await;
    ctrl_c.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(1);
        }
    };

    print_outcome(&outcome, json)
}

async fn upload(
    config: &Config,
    path: PathBuf,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = SummaryClient::from_config(config)?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let contents = tokio::fs::read(&path).await?;

    info!(%filename, size = contents.len(), "uploading document");
    let outcome = SummaryOutcome::from_result(client.summarize_file(&filename, contents).await);
    if let SummaryOutcome::Error { reason } = &outcome {
        warn!(failure = %reason, "summarization failed");
    }

    print_outcome(&outcome, json)
}

fn print_outcome(outcome: &SummaryOutcome, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else if outcome.is_cancelled() {
        eprintln!("Cancelled.");
    } else {
        println!("{}", outcome.display_text());
    }

    if !outcome.is_ok() {
        std::process::exit(2);
    }
    Ok(())
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    config.require_api_key()?;
    let server_addr = config.server_addr;

    let app_state = AppState {
        config: Arc::new(config),
    };
    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;
    info!(%server_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

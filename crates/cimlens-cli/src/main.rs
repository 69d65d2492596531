mod display;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use cimlens_core::upload::upload_file_name;
use cimlens_core::{RatingToken, ResultId, check_upload};
use cimlens_store::controller::DELETE_PROMPT;
use cimlens_store::{
    Action, ConfidenceController, DeleteController, DeleteOutcome, DetailState, DetailView,
    Interest, MutationError, RatingController, ResultStore, Session, StaticToken, UploadController,
    UploadFile,
};
use cimlens_sync::ApiClient;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cimlens", version)]
#[command(about = "CIMLens - review stored CIM analyses from the command line")]
struct Cli {
    /// Backend base URL
    #[arg(
        long,
        global = true,
        env = "CIMLENS_API_URL",
        default_value = "http://127.0.0.1:8000"
    )]
    api_url: String,

    /// Bearer token from the identity provider
    #[arg(long, global = true, env = "CIMLENS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "CIMLENS_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List results, most recent first
    List,
    /// Show the full analysis for one result
    Show { id: String },
    /// Upload a CIM (PDF) for analysis
    Upload { path: PathBuf },
    /// Rate a result up or down
    Rate { id: String, rating: RatingToken },
    /// Set the confidence score as a percentage (clamped to 0-100)
    Confidence {
        id: String,
        #[arg(allow_negative_numbers = true)]
        percent: i64,
    },
    /// Delete a result
    Delete {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "CIMLENS_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!("cimlens v{}", env!("CARGO_PKG_VERSION"));

    let store = connect(&cli)?;

    match cli.command {
        Commands::List => {
            store
                .fetch_all()
                .await
                .map_err(|e| MutationError::new(Action::Refresh, e))?;
            display::print_result_table(&store.rows());
        }
        Commands::Show { id } => {
            let view = DetailView::new(store);
            let state = view
                .open(&ResultId::new(id.as_str()), &Interest::new())
                .await
                .map_err(|e| MutationError::new(Action::Refresh, e))?;
            match state {
                DetailState::Loaded(detail) => display::print_detail(&detail),
                DetailState::NotFound => bail!("No result with id {id}."),
                DetailState::Withdrawn => {}
            }
        }
        Commands::Upload { path } => {
            let name = upload_file_name(&path)?;
            let len = tokio::fs::metadata(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?
                .len();
            check_upload(&name, len)?;
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("reading {}", path.display()))?;
            let file = UploadFile::new(name, bytes)?;

            let receipt = UploadController::new(store.clone()).upload(file).await?;
            display::print_upload_receipt(&receipt);
            display::print_result_table(&store.rows());
        }
        Commands::Rate { id, rating } => {
            let id = ResultId::new(id);
            RatingController::new(store).set(&id, rating).await?;
            println!("Rated {id}: {rating}");
        }
        Commands::Confidence { id, percent } => {
            let id = ResultId::new(id);
            let stored = ConfidenceController::new(store).set(&id, percent).await?;
            println!(
                "Confidence for {id}: {}",
                cimlens_core::confidence_to_percent(Some(stored))
            );
        }
        Commands::Delete { id, yes } => {
            let id = ResultId::new(id);
            // Ask on a blocking thread before any request goes out.
            let confirmed = yes
                || tokio::task::spawn_blocking(|| {
                    confirm(io::stdin().lock(), &mut io::stderr(), DELETE_PROMPT)
                })
                .await
                .context("reading confirmation")?;
            let outcome = DeleteController::new(store)
                .delete(&id, &move |_: &str| confirmed)
                .await?;
            match outcome {
                DeleteOutcome::Deleted => println!("Deleted {id}"),
                DeleteOutcome::Cancelled => println!("Cancelled"),
            }
        }
        Commands::Register { email, password } => {
            let message = store
                .session()
                .register(&email, &password)
                .await
                .map_err(|e| MutationError::new(Action::Register, e))?;
            println!("{message}");
        }
    }

    Ok(())
}

fn connect(cli: &Cli) -> anyhow::Result<Arc<ResultStore>> {
    let client =
        ApiClient::with_timeout(cli.api_url.clone(), Duration::from_secs(cli.timeout_secs))
            .context("building HTTP client")?;
    let session = Session::new(
        Arc::new(StaticToken::from(cli.token.clone())),
        Arc::new(client),
    );
    Ok(Arc::new(ResultStore::new(session)))
}

/// Write `prompt` and read a y/N answer. Anything but yes declines.
fn confirm(mut input: impl BufRead, output: &mut impl Write, prompt: &str) -> bool {
    let _ = write!(output, "{prompt} [y/N] ");
    let _ = output.flush();
    let mut line = String::new();
    if input.read_line(&mut line).is_err() {
        return false;
    }
    display::is_yes(&line)
}

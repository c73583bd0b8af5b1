//! CLI for Vivify - image-to-video generation.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vivify::{
    ImageMime, JobOrchestrator, JobStatus, PollingLoop, ProviderAdapter, ReplicateAdapter,
    SoraAdapter, SubmissionRequest,
};

#[derive(Parser)]
#[command(name = "vivify")]
#[command(about = "Animate a still image into a short AI-generated video")]
#[command(version)]
struct Cli {
    /// Path to the source image (png, jpg, or webp)
    #[arg(short, long)]
    image: PathBuf,

    /// Motion prompt describing the desired animation
    #[arg(short, long)]
    prompt: String,

    /// Backend to generate with
    #[arg(long, value_enum, default_value = "openai")]
    provider: ProviderArg,

    /// Seconds between polls
    #[arg(long, default_value_t = 2)]
    poll_interval: u64,

    /// Overall timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout: u64,

    /// Print only the resolved video URL
    #[arg(long)]
    url_only: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProviderArg {
    Openai,
    Replicate,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> vivify::Result<()> {
    let cli = Cli::parse();

    let adapter: Arc<dyn ProviderAdapter> = match cli.provider {
        ProviderArg::Openai => Arc::new(SoraAdapter::builder().build()?),
        ProviderArg::Replicate => Arc::new(ReplicateAdapter::builder().build()?),
    };
    let orchestrator = JobOrchestrator::new(adapter);

    let image = std::fs::read(&cli.image)?;
    let mime = cli
        .image
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(ImageMime::from_extension)
        .unwrap_or_default();
    let request = SubmissionRequest::new(image, mime, cli.prompt.clone());

    // Ctrl-C abandons the session; the loop observes the token and stops.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let url_only = cli.url_only;
    let job = PollingLoop::new()
        .poll_interval(Duration::from_secs(cli.poll_interval))
        .timeout(Duration::from_secs(cli.timeout))
        .run(&orchestrator, &request, &cancel, |update| {
            if !url_only {
                eprintln!("{}", update.message);
            }
        })
        .await?;

    match job.status {
        JobStatus::Succeeded => {
            if let Some(url) = &job.result_url {
                println!("{url}");
            }
            Ok(())
        }
        _ => {
            eprintln!(
                "generation {}: {}",
                job.status,
                job.error.as_deref().unwrap_or("no details")
            );
            std::process::exit(1);
        }
    }
}

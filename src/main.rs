use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use interview_capture::{
    create_router, AppState, CaptureError, Config, FeedbackChannel, FeedbackSocket,
    FileMediaDevice, HttpSpeechAnalyzer, ResultScores, ResultStore, SessionConfig,
    SessionController,
};
use interview_capture::session::questions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "interview-capture")]
#[command(about = "Capture an interview practice session for remote analysis")]
struct Args {
    /// Config file (TOML, extension optional)
    #[arg(short, long, default_value = "config/interview-capture")]
    config: String,

    /// WAV file used as the microphone
    #[arg(short, long, default_value = "fixtures/practice.wav")]
    audio: PathBuf,

    /// Image used as the camera (test pattern if omitted)
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Index into the behavioral question bank
    #[arg(short, long, default_value = "0")]
    question: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the session control API
    Serve,

    /// Record for a fixed time, then finalize and print the result
    Run {
        /// Recording length in seconds
        #[arg(short, long, default_value = "30")]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Interview Capture v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Feedback channel: {}", cfg.backend.ws_url);

    let mut device = FileMediaDevice::new(&args.audio).looping(true);
    if let Some(image) = &args.image {
        device = device.with_image(image);
    }

    let channel: Arc<dyn FeedbackChannel> = match FeedbackSocket::connect(&cfg.backend.ws_url).await {
        Ok(socket) => Arc::new(socket),
        Err(e) => {
            warn!("Live feedback unavailable: {}", e);
            Arc::new(FeedbackSocket::closed())
        }
    };
    let analyzer = Arc::new(HttpSpeechAnalyzer::new(
        &cfg.backend.http_base,
        &cfg.backend.analysis_path,
    ));
    let store = ResultStore::new(cfg.results_dir());

    let session_config = SessionConfig {
        question: questions::question(args.question).to_string(),
        constraints: cfg.media_constraints(),
        sampler: cfg.sampler_config(),
        finalize_timeout: cfg.finalize_timeout(),
        ..SessionConfig::default()
    };

    let controller = Arc::new(
        SessionController::mount(session_config, &mut device, channel, analyzer, store.clone())
            .await,
    );

    match args.command {
        Command::Serve => serve(&cfg, controller, store).await,
        Command::Run { seconds } => run(controller, seconds).await,
    }
}

async fn serve(cfg: &Config, controller: Arc<SessionController>, store: ResultStore) -> Result<()> {
    let app = create_router(AppState::new(Arc::clone(&controller), store));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Control API listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    controller.teardown();
    Ok(())
}

async fn run(controller: Arc<SessionController>, seconds: u64) -> Result<()> {
    controller.start().await?;
    info!("Recording for {} seconds (Ctrl+C to stop early)", seconds);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => {}
        _ = tokio::signal::ctrl_c() => info!("Stopping early"),
    }

    let result = tokio::select! {
        result = controller.stop() => result,
        _ = tokio::signal::ctrl_c() => {
            controller.teardown();
            Err(CaptureError::Cancelled)
        }
    };

    let result = match result {
        Ok(result) => result,
        Err(CaptureError::Upload(e)) => {
            warn!("Upload failed ({}); retrying once", e);
            controller.retry_upload().await?
        }
        Err(e) => return Err(e.into()),
    };

    let scores = ResultScores::compute(&result);
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({
            "result": result,
            "scores": scores,
        }))?
    );

    controller.teardown();
    Ok(())
}

//! CLI binary for EcoSmart.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use ecosmart::audio::{CpalBackend, list_output_devices};
use ecosmart::conversation::Role;
use ecosmart::insight::{WeatherRefresher, advice_suggestions, generate_advice};
use ecosmart::profile::{Gender, LOCATIONS, ProfileDraft};
use ecosmart::projects::ProjectBoard;
use ecosmart::voice::{ConsoleRecognizer, CycleOutcome, StartOutcome};
use ecosmart::{
    AiGateway, ConversationSession, EcoConfig, GeminiGateway, ProfileStore, ReplyOutcome,
    UserProfile, VoiceOrchestrator, app_dirs,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// EcoSmart: environmental-awareness assistant.
#[derive(Parser)]
#[command(name = "ecosmart", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = "ECOSMART_CONFIG")]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Create or replace the user profile.
    Onboard {
        #[arg(long)]
        name: String,
        /// `male`/`female` (or `ذكر`/`أنثى`).
        #[arg(long, default_value = "male")]
        gender: String,
        #[arg(long)]
        country: String,
        #[arg(long)]
        city: String,
    },

    /// Chat with the assistant in the terminal.
    Chat,

    /// Show the weather summary for the profile's city.
    Weather {
        /// Keep refreshing until Ctrl+C.
        #[arg(long)]
        watch: bool,
    },

    /// Generate ideas for an environmental topic.
    Advice {
        /// Topic; lists suggestions when omitted.
        topic: Option<String>,
    },

    /// Spoken conversation: type what you would say, hear the reply.
    Voice,

    /// Show the project board.
    Projects,

    /// List countries and cities offered during onboarding.
    Locations,

    /// List available audio output devices.
    Devices,

    /// Remove the stored profile.
    Logout,
}

fn init_logging(config: &EcoConfig) -> Option<WorkerGuard> {
    // Users can override with RUST_LOG=debug to see everything.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ecosmart=info,reqwest=warn"));

    if config.logging.file {
        let appender = tracing_appender::rolling::daily(app_dirs::logs_dir(), "ecosmart.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        None
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = EcoConfig::load_or_default(cli.config.as_deref())?;
    let _log_guard = init_logging(&config);

    let store = ProfileStore::in_data_dir();

    match cli.command.unwrap_or(Command::Chat) {
        Command::Onboard {
            name,
            gender,
            country,
            city,
        } => onboard(&store, name, &gender, country, city),
        Command::Chat => run_chat(&config, &store).await,
        Command::Weather { watch } => run_weather(&config, &store, watch).await,
        Command::Advice { topic } => run_advice(&config, &store, topic).await,
        Command::Voice => run_voice(&config, &store).await,
        Command::Projects => {
            show_projects();
            Ok(())
        }
        Command::Locations => {
            show_locations();
            Ok(())
        }
        Command::Devices => list_devices(),
        Command::Logout => {
            store.clear()?;
            println!("تم حذف الملف الشخصي.");
            Ok(())
        }
    }
}

fn gateway(config: &EcoConfig) -> anyhow::Result<Arc<GeminiGateway>> {
    let gateway = GeminiGateway::new(config.gateway.clone())
        .context("set GEMINI_API_KEY or gateway.api_key in the config file")?;
    Ok(Arc::new(gateway))
}

fn require_profile(store: &ProfileStore) -> anyhow::Result<UserProfile> {
    store
        .load()?
        .context("no profile yet; run `ecosmart onboard` first")
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, shutting down...");
            cancel_clone.cancel();
        }
    });
    cancel
}

fn onboard(
    store: &ProfileStore,
    name: String,
    gender: &str,
    country: String,
    city: String,
) -> anyhow::Result<()> {
    let gender = Gender::parse(gender).with_context(|| format!("unknown gender: {gender}"))?;
    let profile = ProfileDraft {
        name,
        gender,
        country,
        city,
    }
    .build()?;
    store.save(&profile)?;
    println!("مرحباً {}! تم حفظ ملفك الشخصي.", profile.name);
    Ok(())
}

async fn run_chat(config: &EcoConfig, store: &ProfileStore) -> anyhow::Result<()> {
    let gateway = gateway(config)?;
    let session = match store.load()? {
        Some(profile) => ConversationSession::with_greeting(gateway, profile),
        None => ConversationSession::new(gateway, None),
    };
    for turn in session.transcript() {
        println!("إيكو بوت: {}\n", turn.text);
    }

    let cancel = cancel_on_ctrl_c();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else { break };

        match session.send(&line).await {
            Some(ReplyOutcome::Replied(turn)) => println!("إيكو بوت: {}\n", turn.text),
            Some(ReplyOutcome::Apologized { turn, .. }) => println!("إيكو بوت: {}\n", turn.text),
            Some(ReplyOutcome::Busy | ReplyOutcome::NothingPending) | None => {}
        }
    }

    let exchanged = session
        .transcript()
        .iter()
        .filter(|t| t.role == Role::User)
        .count();
    info!(messages = exchanged, "chat ended");
    Ok(())
}

async fn run_weather(config: &EcoConfig, store: &ProfileStore, watch: bool) -> anyhow::Result<()> {
    let profile = require_profile(store)?;
    let gateway = gateway(config)?;

    if !watch {
        println!("{}", gateway.weather_insight(&profile).await);
        return Ok(());
    }

    let cancel = cancel_on_ctrl_c();
    let (refresher, mut rx) =
        WeatherRefresher::new(gateway, profile, &config.insight, cancel.child_token());
    let task = tokio::spawn(refresher.run());

    println!("{}", rx.borrow().as_str());
    while rx.changed().await.is_ok() {
        println!("{}", rx.borrow_and_update().as_str());
    }
    task.await?;
    Ok(())
}

async fn run_advice(
    config: &EcoConfig,
    store: &ProfileStore,
    topic: Option<String>,
) -> anyhow::Result<()> {
    let Some(topic) = topic else {
        println!("اقتراحات:");
        for suggestion in advice_suggestions() {
            println!("  - {suggestion}");
        }
        return Ok(());
    };

    let profile = store.load()?;
    let gateway = gateway(config)?;
    match generate_advice(gateway.as_ref(), &topic, profile.as_ref()).await {
        Some(advice) => println!("{advice}"),
        None => println!("يرجى إدخال موضوع."),
    }
    Ok(())
}

async fn run_voice(config: &EcoConfig, store: &ProfileStore) -> anyhow::Result<()> {
    let profile = store.load()?;
    let gateway = gateway(config)?;
    let mut voice = VoiceOrchestrator::new(
        gateway,
        ConsoleRecognizer::stdin(),
        CpalBackend::new(&config.voice),
        profile,
        config.voice.locale.clone(),
    );

    let cancel = cancel_on_ctrl_c();
    let stop = voice.stop_handle();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            cancel.cancelled().await;
            stop.stop();
        }
    });

    println!("\nجاهز! اكتب ما تريد قوله ثم اضغط Enter. اضغط Ctrl+C للإنهاء.\n");

    while !cancel.is_cancelled() {
        let outcome = voice.run_cycle().await;
        let session = voice.session();
        if let Some(text) = &session.transcript_text {
            println!("أنت: {text}");
        }
        if let Some(text) = &session.response_text {
            println!("إيكو بوت: {text}");
        }
        if let Some(message) = &session.last_error {
            println!("⚠ {message}");
        }

        match outcome {
            CycleOutcome::Cancelled => break,
            CycleOutcome::NotStarted(StartOutcome::Failed(e)) => {
                anyhow::bail!("voice input unavailable: {e}")
            }
            CycleOutcome::CaptureFailed(ecosmart::voice::CaptureError::Device(e)) => {
                info!("voice input closed: {e}");
                break;
            }
            _ => {}
        }
    }

    voice.shutdown();
    Ok(())
}

fn show_projects() {
    let board = ProjectBoard::seeded();
    for project in board.projects() {
        println!(
            "[{}] {} ({}%) - {}\n    {}",
            project.id,
            project.title,
            project.progress,
            project.status,
            project.description
        );
    }
}

fn show_locations() {
    for (country, cities) in LOCATIONS {
        println!("{country}: {}", cities.join("، "));
    }
}

fn list_devices() -> anyhow::Result<()> {
    println!("Output devices:");
    for name in list_output_devices()? {
        println!("  - {name}");
    }
    Ok(())
}

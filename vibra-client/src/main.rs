//! vibra - command-line front end for VibraAi
//!
//! Submits generation requests to vibra-proxy, follows them to completion
//! and keeps the resulting tracks in a local library file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vibra_client::api_client::{API_URL_ENV, DEFAULT_API_URL};
use vibra_client::notify::{ConsoleNavigator, ConsoleNotifier, Notice, Notifier};
use vibra_client::poller::IMAGE_URL_ENV;
use vibra_client::{
    describe_submission_error, ApiClient, GenerationForm, GenerationMode, GenerationPoller,
    LibraryStore, PollOutcome, PollerConfig,
};
use vibra_common::genres::ELECTRONIC_GENRES;
use vibra_common::ModelVersion;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "vibra")]
#[command(about = "Generate electronic music with VibraAi")]
#[command(version)]
struct Args {
    /// Backend API base URL
    #[arg(long, env = API_URL_ENV, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Fallback cover image for tracks without artwork
    #[arg(long, env = IMAGE_URL_ENV, default_value = "")]
    image_url: String,

    /// Library file (default: platform data dir, vibra/library.json)
    #[arg(long, env = "VIBRA_LIBRARY")]
    library: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a generation and wait for the tracks
    Generate(GenerateArgs),
    /// Show the raw status of a task
    Status {
        /// Task id returned by `generate`
        task_id: String,
    },
    /// List or edit the local library
    Library {
        /// Remove the track with this id
        #[arg(long)]
        remove: Option<String>,
    },
    /// List the genre catalog
    Genres,
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// Description of the music (style description in custom mode)
    #[arg(short, long)]
    description: String,

    /// Style from the genre catalog (repeat up to 5 times)
    #[arg(short, long = "style")]
    styles: Vec<String>,

    /// Send title, lyrics and style separately
    #[arg(long)]
    custom: bool,

    /// Track title (custom mode)
    #[arg(short, long)]
    title: Option<String>,

    /// Lyrics (custom mode)
    #[arg(short, long)]
    lyrics: Option<String>,

    /// Instrumental only
    #[arg(short, long)]
    instrumental: bool,

    /// Model version
    #[arg(short, long, value_enum, default_value_t = ModelArg::V5)]
    model: ModelArg,

    /// Return after submission instead of waiting for the tracks
    #[arg(long)]
    no_wait: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ModelArg {
    V3,
    V4,
    V5,
}

impl From<ModelArg> for ModelVersion {
    fn from(model: ModelArg) -> Self {
        match model {
            ModelArg::V3 => ModelVersion::V3,
            ModelArg::V4 => ModelVersion::V4,
            ModelArg::V5 => ModelVersion::V5,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vibra_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let library_path = match args.library {
        Some(path) => path,
        None => dirs::data_dir()
            .map(|d| d.join("vibra").join("library.json"))
            .context("No data directory on this platform; pass --library")?,
    };

    match args.command {
        Command::Generate(generate) => {
            let client = ApiClient::new(&args.api_url)?;
            let library = LibraryStore::load_json(&library_path).await?;
            let config = PollerConfig {
                fallback_image: args.image_url,
                ..PollerConfig::default()
            };
            run_generate(client, library.clone(), config, generate).await?;
            library.save_json(&library_path).await?;
        }
        Command::Status { task_id } => {
            let client = ApiClient::new(&args.api_url)?;
            let envelope = client.record_info(&task_id).await?;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Command::Library { remove } => {
            let library = LibraryStore::load_json(&library_path).await?;
            if let Some(id) = remove {
                let removed = library.remove(&id).await;
                library.save_json(&library_path).await?;
                println!("Removed {} track(s)", removed);
            }
            print_library(&library).await;
        }
        Command::Genres => {
            for (family, styles) in ELECTRONIC_GENRES {
                println!("{}: {}", family, styles.join(", "));
            }
        }
    }

    Ok(())
}

async fn run_generate(
    client: ApiClient,
    library: LibraryStore,
    config: PollerConfig,
    args: GenerateArgs,
) -> Result<()> {
    let notifier = Arc::new(ConsoleNotifier);

    let mut form = GenerationForm {
        description: args.description,
        lyrics: args.lyrics,
        title: args.title,
        styles: Vec::new(),
        instrumental: args.instrumental,
        model: args.model.into(),
        mode: if args.custom {
            GenerationMode::Custom
        } else {
            GenerationMode::Simple
        },
    };
    for style in &args.styles {
        form.toggle_style(style)?;
    }
    let request = form.compose()?;

    println!("Enviando para Suno AI...");
    let task = match client.generate(&request).await {
        Ok(task) => task,
        Err(e) => {
            let message = describe_submission_error(&e);
            notifier.notify(Notice::SubmissionFailed {
                message: message.clone(),
            });
            bail!(message);
        }
    };

    notifier.notify(Notice::Submitted {
        task_id: task.task_id.clone(),
    });
    println!("Task: {}", task);

    if args.no_wait {
        return Ok(());
    }

    let poller = GenerationPoller::new(
        Arc::new(client),
        library.clone(),
        notifier,
        Arc::new(ConsoleNavigator),
        config,
    );
    let session = poller.start(task, Some(form.submitted_title()), form.model);

    let outcome = tokio::select! {
        outcome = session.wait() => outcome,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, polling cancelled");
            PollOutcome::Cancelled
        }
    };

    match outcome {
        PollOutcome::Completed { tracks } => {
            for track in &tracks {
                println!("♪ {} [{}] {}", track.title, track.id, track.audio_url);
            }
            Ok(())
        }
        PollOutcome::NoAudio => Ok(()),
        PollOutcome::Failed { status } => bail!("generation failed: {}", status),
        PollOutcome::TimedOut { attempts } => bail!("gave up after {} status checks", attempts),
        PollOutcome::Aborted { consecutive_errors } => {
            bail!("status checks failed {} times in a row", consecutive_errors)
        }
        PollOutcome::Cancelled => bail!("cancelled"),
    }
}

async fn print_library(library: &LibraryStore) {
    let tracks = library.tracks().await;
    if tracks.is_empty() {
        println!("Biblioteca vazia");
        return;
    }
    for track in tracks {
        println!(
            "{}  {}  {}  {:.0}s  {}  {}",
            track.created_at.format("%Y-%m-%d %H:%M"),
            track.id,
            track.title,
            track.duration,
            track.model_name,
            track.audio_url
        );
    }
}

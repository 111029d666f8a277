//! qsolver - drive the solution session engine from the command line

mod backend;
mod config;
mod output;
mod transcript;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use qsolver_core::{
    EventBus, NotificationLevel, SettingsController, SolutionEvent, StreamRouter,
};
use qsolver_wire::Settings;
use qsolver_export::{CommandRasterizer, ExportEngine, ExportOutcome};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use crate::backend::LocalBackend;
use crate::config::Config;
use crate::transcript::TranscriptEntry;

/// qsolver - replay, inspect and export AI solution sessions
#[derive(Parser, Debug)]
#[command(name = "qsolver")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

/// Overrides for the `keepContext` setting
#[derive(clap::Args, Debug, Clone, Copy, Default)]
struct ContextArgs {
    /// Append successive exchanges to the same item
    #[arg(long, overrides_with = "no_keep_context")]
    keep_context: bool,
    /// Start a new item per exchange even if the config keeps context
    #[arg(long, overrides_with = "keep_context")]
    no_keep_context: bool,
}

impl ContextArgs {
    /// `None` leaves the configured value in place
    fn keep_context(self) -> Option<bool> {
        if self.keep_context {
            Some(true)
        } else if self.no_keep_context {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a JSONL transcript and print the resulting history
    Replay {
        transcript: PathBuf,
        #[command(flatten)]
        context: ContextArgs,
        /// Print thinking text and raw errors in full
        #[arg(long)]
        full: bool,
    },

    /// Replay a transcript and export one history item as a PNG
    Export {
        transcript: PathBuf,
        /// History index to export (0 is the newest)
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        /// Where to write the PNG
        #[arg(short, long)]
        output: PathBuf,
        /// Also write the HTML document that was rasterized
        #[arg(long)]
        html: Option<PathBuf>,
        #[command(flatten)]
        context: ContextArgs,
    },

    /// List models available on the configured endpoint
    Models {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Check that the key, endpoint and model answer a request
    TestConnection {
        #[arg(long)]
        api_key: Option<String>,
        #[arg(long)]
        base_url: Option<String>,
        #[arg(short, long)]
        model: Option<String>,
    },

    /// Create the config file
    InitConfig,

    /// Show the effective settings
    Settings {
        /// Print the camelCase JSON the backend exchanges
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        EnvFilter::new("qsolver=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match args.command {
        Command::InitConfig => {
            let path = Config::init().context("creating config file")?;
            println!("Config file at: {}", path.display());
            println!("\nExample config:\n{}", config::example_config());
            Ok(())
        }
        Command::Replay {
            transcript,
            context,
            full,
        } => {
            let router = replay(&transcript, context.keep_context())?;
            let mut stdout = io::stdout().lock();
            output::write_session(&mut stdout, &router, full)?;
            stdout.flush()?;
            Ok(())
        }
        Command::Export {
            transcript,
            index,
            output,
            html,
            context,
        } => export(&transcript, index, output, html, context.keep_context()).await,
        Command::Models { api_key, base_url } => models(api_key, base_url).await,
        Command::TestConnection {
            api_key,
            base_url,
            model,
        } => test_connection(api_key, base_url, model).await,
        Command::Settings { json } => {
            let (mut controller, _) = controller();
            let settings = controller.load().await;
            if json {
                let mut shown = settings.clone();
                shown.api_key = settings.masked_api_key();
                println!("{}", shown.to_json()?);
            } else {
                output::write_settings(&mut io::stdout().lock(), settings)?;
            }
            Ok(())
        }
    }
}

/// Router configured from the config file and fed with a transcript
fn replay(path: &std::path::Path, keep_context: Option<bool>) -> anyhow::Result<StreamRouter> {
    let cfg = Config::load();
    let entries = transcript::load(path)?;
    Ok(replay_entries(&cfg.settings, keep_context, entries))
}

fn replay_entries(
    settings: &Settings,
    keep_context: Option<bool>,
    entries: Vec<TranscriptEntry>,
) -> StreamRouter {
    let mut router = StreamRouter::new();
    router.apply_settings(settings);
    if let Some(keep_context) = keep_context {
        router.set_keep_context(keep_context);
    }
    transcript::replay(&mut router, entries);
    router
}

fn controller() -> (SettingsController, broadcast::Receiver<SolutionEvent>) {
    let path = Config::config_path();
    let backend = Arc::new(LocalBackend::new(Config::load_from(&path), path));
    let events = EventBus::new();
    let rx = events.subscribe();
    (SettingsController::new(backend, events), rx)
}

/// Print notifications that piled up on the bus
fn drain_notifications(rx: &mut broadcast::Receiver<SolutionEvent>) {
    while let Ok(event) = rx.try_recv() {
        if let SolutionEvent::Notification { level, message } = event {
            match level {
                NotificationLevel::Error | NotificationLevel::Warning => eprintln!("{message}"),
                NotificationLevel::Info | NotificationLevel::Success => println!("{message}"),
            }
        }
    }
}

async fn export(
    transcript: &std::path::Path,
    index: usize,
    output: PathBuf,
    html: Option<PathBuf>,
    keep_context: Option<bool>,
) -> anyhow::Result<()> {
    let router = replay(transcript, keep_context)?;
    let path = Config::config_path();
    let cfg = Config::load_from(&path);

    let rasterizer = match &cfg.export.command {
        Some(command) => CommandRasterizer::from_command_line(command)?,
        None => CommandRasterizer::default(),
    };
    let options = cfg.export.options();
    let backend = Arc::new(LocalBackend::new(cfg, path).with_save_target(output.clone()));
    let events = router.events().clone();
    let mut rx = events.subscribe();
    let engine = ExportEngine::new(Arc::new(rasterizer), backend, events).with_options(options);

    if let Some(html_path) = html {
        let item = router
            .history()
            .get(index)
            .with_context(|| format!("no history item at index {index}"))?;
        std::fs::write(&html_path, engine.document(item))
            .with_context(|| format!("writing {}", html_path.display()))?;
        println!("Wrote {}", html_path.display());
    }

    let outcome = engine.export(router.history(), index).await;
    drain_notifications(&mut rx);
    match outcome {
        ExportOutcome::Saved => {
            println!("Saved {}", output.display());
            Ok(())
        }
        ExportOutcome::Skipped => bail!(
            "nothing to export at index {index} ({} items)",
            router.history().len()
        ),
        ExportOutcome::Cancelled => {
            println!("Export cancelled");
            Ok(())
        }
        ExportOutcome::Failed(message) => bail!("export failed: {message}"),
    }
}

async fn models(api_key: Option<String>, base_url: Option<String>) -> anyhow::Result<()> {
    let (mut controller, mut rx) = controller();
    let settings = controller.load().await.clone();
    let api_key = api_key.unwrap_or(settings.api_key);
    let base_url = base_url.unwrap_or(settings.base_url);

    let result = controller.refresh_models(&api_key, &base_url).await;
    drain_notifications(&mut rx);
    result?;

    for model in controller.available_models() {
        let marker = if *model == controller.settings().model { '*' } else { ' ' };
        println!("{marker} {model}");
    }
    Ok(())
}

async fn test_connection(
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
) -> anyhow::Result<()> {
    let (mut controller, mut rx) = controller();
    let settings = controller.load().await.clone();
    let api_key = api_key.unwrap_or(settings.api_key);
    let base_url = base_url.unwrap_or(settings.base_url);
    let model = model.unwrap_or(settings.model);

    let status = controller.test_connection(&api_key, &base_url, &model).await;
    drain_notifications(&mut rx);

    match status {
        Some(status) if status.is_success() => {
            println!("{} {}", status.icon(), status.message());
            Ok(())
        }
        Some(status) => bail!("{} {}", status.icon(), status.message()),
        None => bail!("no model selected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_EXCHANGES: &str = r#"
{"type": "stream_start"}
{"type": "solution", "text": "first"}
{"type": "stream_start"}
{"type": "solution", "text": "second"}
"#;

    fn context_of(args: &[&str]) -> Option<bool> {
        let mut argv = vec!["qsolver", "replay", "session.jsonl"];
        argv.extend_from_slice(args);
        match Args::try_parse_from(argv).unwrap().command {
            Command::Replay { context, .. } => context.keep_context(),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_keep_context_flags() {
        assert_eq!(context_of(&[]), None);
        assert_eq!(context_of(&["--keep-context"]), Some(true));
        assert_eq!(context_of(&["--no-keep-context"]), Some(false));
        // last one wins
        assert_eq!(context_of(&["--keep-context", "--no-keep-context"]), Some(false));
        assert_eq!(context_of(&["--no-keep-context", "--keep-context"]), Some(true));
    }

    #[test]
    fn test_flag_overrides_configured_keep_context() {
        let settings = Settings {
            keep_context: true,
            ..Default::default()
        };
        let entries = || transcript::parse(TWO_EXCHANGES.as_bytes()).unwrap();

        let router = replay_entries(&settings, None, entries());
        assert_eq!(router.history().len(), 1);
        assert_eq!(router.history().get(0).unwrap().round_count(), 2);

        let router = replay_entries(&settings, Some(false), entries());
        assert!(!router.keep_context());
        assert_eq!(router.history().len(), 2);
    }
}

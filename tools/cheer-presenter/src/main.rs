//! Cheer CLI - host a room on this machine or act as an audience member
//!
//! `cheer present <code>` floats live reactions across the configured
//! displays; `cheer react`, `pace` and `ask` send audience input to a room.

use anyhow::{bail, Context, Result};
use cheer_client::{AudienceClient, ClientError, ConnectionState, ConnectionStatus};
use cheer_core::{PaceLevel, SystemClock};
use cheer_display::{AnimationPool, Bounds, MessageReader, PoolSurface, Surface};
use cheer_presenter::{run_overlay, PresenterConfig, PresenterContext, PresenterError};
use cheer_transport::{EventLog, HttpEventLog, HttpLogConfig, MemoryEventLog};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Cheer - live audience reactions on the presenter's screens
#[derive(Parser)]
#[command(name = "cheer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Event log URL (overrides `database_url` from the config file)
    #[arg(short, long, global = true, env = "CHEER_DATABASE_URL")]
    url: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Host a room and render its reactions
    Present {
        /// Room code
        code: String,
    },

    /// Render spawn requests read from stdin (started by `present`)
    Overlay {
        /// Display this overlay covers
        #[arg(long, default_value = "overlay")]
        display: String,

        #[arg(long, default_value = "1920")]
        width: f32,

        #[arg(long, default_value = "1080")]
        height: f32,

        /// Animation slots
        #[arg(long, default_value = "100")]
        capacity: usize,

        #[arg(long, default_value = "60")]
        frame_rate: u32,
    },

    /// Send a reaction
    React {
        code: String,
        emoji: String,
    },

    /// Vote on the pace (slow, good, fast)
    Pace {
        code: String,
        level: PaceLevel,
    },

    /// Ask a question
    Ask {
        code: String,
        #[arg(required = true)]
        text: Vec<String>,
    },

    /// Leave feedback for a room
    Feedback {
        code: String,
        #[arg(required = true)]
        message: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let mut config = PresenterConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.url {
        config.database_url = Some(url);
    }

    match cli.command {
        Commands::Present { code } => {
            let log = event_log(&config)?;
            present(&code, &config, log).await?;
        }

        Commands::Overlay {
            display,
            width,
            height,
            capacity,
            frame_rate,
        } => {
            let pool = AnimationPool::with_capacity(capacity, Bounds::new(width, height));
            let surface = PoolSurface::start(&display, pool, frame_rate);
            let reader = MessageReader::new(BufReader::new(tokio::io::stdin()));
            run_overlay(reader, &surface).await?;
            surface.close();
        }

        Commands::React { code, emoji } => {
            let audience = join(&config, &code).await?;
            audience.react(&emoji).await?;
            println!("{} Sent {} to {}", "CHEER".cyan().bold(), emoji, code.yellow());
        }

        Commands::Pace { code, level } => {
            let audience = join(&config, &code).await?;
            audience.pace(level).await?;
            println!(
                "{} Voted {} in {}",
                "CHEER".cyan().bold(),
                level.as_str().green(),
                code.yellow()
            );
        }

        Commands::Ask { code, text } => {
            let audience = join(&config, &code).await?;
            let id = audience.ask(&text.join(" ")).await?;
            println!("{} Asked {} ({})", "CHEER".cyan().bold(), code.yellow(), id.dimmed());
        }

        Commands::Feedback { code, message } => {
            let audience = join(&config, &code).await?;
            audience.feedback(&message.join(" ")).await?;
            println!("{} Feedback sent, thanks", "CHEER".cyan().bold());
        }
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .context("Failed to parse log level")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

fn http_log(config: &PresenterConfig, url: &str) -> Result<Arc<dyn EventLog>> {
    let mut http = HttpLogConfig::new(url);
    http.auth_token = config.auth_token.clone();
    Ok(Arc::new(HttpEventLog::new(http)?))
}

fn event_log(config: &PresenterConfig) -> Result<Arc<dyn EventLog>> {
    match &config.database_url {
        Some(url) => http_log(config, url),
        None => {
            warn!("No database URL configured, using an in-memory event log");
            Ok(Arc::new(MemoryEventLog::new()))
        }
    }
}

async fn join(config: &PresenterConfig, code: &str) -> Result<AudienceClient> {
    let Some(url) = &config.database_url else {
        bail!("audience commands need a database URL (--url or database_url)");
    };
    let log = http_log(config, url)?;
    Ok(AudienceClient::join(log, Arc::new(SystemClock), code).await?)
}

async fn present(code: &str, config: &PresenterConfig, log: Arc<dyn EventLog>) -> Result<()> {
    let overlay_program = std::env::current_exe().ok();
    let ctx = PresenterContext::from_config(config, log, overlay_program.as_deref())?;
    ctx.init()?;

    let status = ctx.connection().on_status(|status| match status {
        ConnectionStatus::StateChanged(state) => info!("Connection {:?}", state),
        ConnectionStatus::TransportLost { topic, reason } => {
            let reason = reason.as_deref().unwrap_or("stream closed");
            println!("{} {} stream lost: {}", "!".red().bold(), topic, reason);
        }
    });
    let questions = ctx.connection().router().on_question(|question| {
        println!("{} {} ({})", "?".cyan().bold(), question.text, question.id.dimmed());
    });

    let interrupt = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let room = match ctx.connect_until(code, interrupt).await {
        Ok(room) => room,
        Err(PresenterError::Client(ClientError::Cancelled)) => {
            status.detach();
            questions.detach();
            ctx.dispose().await;
            println!("{}", "Connect cancelled".yellow());
            return Ok(());
        }
        Err(e) => {
            ctx.dispose().await;
            return Err(e.into());
        }
    };

    println!(
        "{} Hosting room {} on {} display(s)",
        "CHEER".cyan().bold(),
        room.code.as_str().yellow(),
        ctx.broadcaster().len() + 1
    );
    println!("Commands: answer <id>, questions, stats, quit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            line = lines.next_line(), if stdin_open => match line? {
                Some(line) => {
                    if !run_command(&ctx, line.trim()).await {
                        break;
                    }
                }
                None => stdin_open = false,
            },
        }
    }

    status.detach();
    questions.detach();
    ctx.dispose().await;
    println!("{}", "Room closed".yellow());
    Ok(())
}

/// Handle one console command; false means quit
async fn run_command(ctx: &PresenterContext, line: &str) -> bool {
    let router = ctx.connection().router();
    let mut parts = line.split_whitespace();

    match parts.next() {
        Some("answer") => match parts.next() {
            Some(id) => match router.mark_answered(id).await {
                Ok(true) => println!("{} {}", "answered".green(), id),
                Ok(false) => println!("{} was already answered", id),
                Err(e) => println!("{}", e.to_string().red()),
            },
            None => println!("usage: answer <id>"),
        },
        Some("questions") => {
            for question in router.questions() {
                let mark = if question.answered { "x" } else { " " };
                println!("[{}] {} {}", mark, question.id.dimmed(), question.text);
            }
        }
        Some("stats") => {
            let pace = router.pace_counts();
            let active = ctx.connection().state() == ConnectionState::Connected;
            println!(
                "reactions {} | pace slow {} good {} fast {} | connected {}",
                router.reaction_count(),
                pace.slow,
                pace.good,
                pace.fast,
                active
            );
        }
        Some("quit") | Some("exit") => return false,
        Some(other) => println!("unknown command: {}", other),
        None => {}
    }
    true
}

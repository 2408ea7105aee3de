use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use music_platform_converter as lib;
use lib::commands::{self, PlaylistInfoReply};
use lib::config::Config;
use lib::convert::PlaylistEvent;
use lib::registry::ProviderRegistry;
use std::path::PathBuf;
use tracing::subscriber as tracing_subscriber_global;
use tracing_appender::rolling::RollingFileAppender;
use tracing_log::LogTracer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "music-platform-converter", version)]
struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a track url from one platform to another
    Track {
        from: String,
        to: String,
        url: String,
    },
    /// Convert a playlist track by track
    Playlist {
        from: String,
        to: String,
        url: String,
        /// The track to start converting from (1-based, inclusive)
        #[arg(long, default_value_t = 1)]
        start_index: usize,
        /// Lift the playlist size cap
        #[arg(long)]
        privileged: bool,
    },
    /// Convert every link in a message to the preferred platform
    Scan {
        text: String,
        /// Behave like the passive message listener (silent unless enabled)
        #[arg(long)]
        passive: bool,
    },
    /// Search a platform
    Search {
        platform: String,
        query: String,
        /// The maximum amount of urls to return
        #[arg(long, default_value_t = 1)]
        count: usize,
    },
    /// Show a playlist summary
    PlaylistInfo {
        platform: String,
        url: String,
        #[arg(long, default_value_t = 15)]
        max_tracks: usize,
    },
    /// List configured platforms
    Platforms,
    /// Validate config file and exit
    ConfigValidate,
    /// Check and refresh an OAuth platform's access token
    TokenCheck { platform: String },
}

fn load_config(explicit: Option<&PathBuf>) -> Result<Config> {
    if let Some(p) = explicit {
        return Config::from_path(p).with_context(|| format!("loading config from {}", p.display()));
    }
    // Fall back to the per-user config dir, then built-in defaults.
    if let Some(p) = dirs::config_dir().map(|d| d.join("music-convert").join("config.toml")) {
        if p.exists() {
            return Config::from_path(&p).with_context(|| format!("loading config from {}", p.display()));
        }
    }
    let mut cfg = Config::default();
    cfg.fill_from_env();
    Ok(cfg)
}

fn init_logging(cfg: &Config) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // Initialize log->tracing bridge so provider modules using `log` are captured.
    let _ = LogTracer::init();

    // Honor RUST_LOG if set, otherwise default to info.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (file_layer, guard) = if std::fs::create_dir_all(&cfg.log_dir).is_ok() {
        let file_appender: RollingFileAppender =
            tracing_appender::rolling::daily(&cfg.log_dir, "music-convert.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        (Some(fmt::layer().with_writer(non_blocking)), Some(guard))
    } else {
        (None, None)
    };
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer);

    tracing_subscriber_global::set_global_default(subscriber)
        .expect("failed to set global tracing subscriber");
    guard
}

fn print_event(event: PlaylistEvent) {
    match event {
        PlaylistEvent::Notice(text) => println!("{}\n", text),
        PlaylistEvent::Chunk { text, attachment } => {
            println!("{}", text);
            if let Some(file) = attachment {
                match std::fs::write(&file.filename, &file.content) {
                    Ok(()) => println!("[attachment written to {}]", file.filename),
                    Err(e) => eprintln!("Failed to write {}: {}", file.filename, e),
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_ref())?;
    let _guard = init_logging(&cfg);
    let registry = ProviderRegistry::from_config(&cfg);

    match cli.command {
        Commands::Track { from, to, url } => {
            println!("{}", commands::track_convert(&registry, &from, &to, &url).await?);
        }
        Commands::Playlist {
            from,
            to,
            url,
            start_index,
            privileged,
        } => {
            let options = cfg.playlist_options();
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let conversion = async move {
                let reply = commands::playlist_convert(
                    &registry,
                    &from,
                    &to,
                    &url,
                    start_index,
                    privileged,
                    &options,
                    &tx,
                )
                .await;
                drop(tx);
                reply
            };
            let printer = async move {
                while let Some(event) = rx.recv().await {
                    print_event(event);
                }
            };
            let (reply, ()) = tokio::join!(conversion, printer);
            if let Some(text) = reply? {
                println!("{}", text);
            }
        }
        Commands::Scan { text, passive } => {
            if passive {
                if let Some(reply) = commands::on_message(&registry, &cfg, &text).await? {
                    println!("{}", reply);
                }
            } else {
                println!("{}", commands::convert_message(&registry, &cfg, &text).await?);
            }
        }
        Commands::Search { platform, query, count } => {
            println!("{}", commands::search(&registry, &platform, &query, count).await?);
        }
        Commands::PlaylistInfo { platform, url, max_tracks } => {
            match commands::playlist_info(&registry, &platform, &url, max_tracks).await? {
                PlaylistInfoReply::Summary(summary) => {
                    println!("{}\n{}\n{}", summary.title, summary.url, summary.body);
                    if let Some(footer) = summary.footer {
                        println!("\n{}", footer);
                    }
                }
                PlaylistInfoReply::Message(text) => println!("{}", text),
            }
        }
        Commands::Platforms => {
            for name in registry.list_names() {
                let caps = registry.capabilities(&name).unwrap_or_default();
                println!("{} (playlists: {}, oauth: {})", name, caps.playlists, caps.oauth);
            }
        }
        Commands::ConfigValidate => match &cli.config {
            Some(p) => match Config::from_path(p) {
                Ok(_) => println!("OK"),
                Err(e) => {
                    eprintln!("Config validation failed: {}", e);
                    std::process::exit(2);
                }
            },
            None => println!("OK (no config file given, using defaults)"),
        },
        Commands::TokenCheck { platform } => {
            let provider = match registry.lookup(&platform) {
                Some(p) => p,
                None => {
                    eprintln!("{}: {}", commands::UNKNOWN_PLATFORM, platform);
                    std::process::exit(1);
                }
            };
            let oauth = match provider.as_oauth_provider() {
                Some(o) => o,
                None => {
                    println!("{} does not use OAuth tokens", provider.name());
                    return Ok(());
                }
            };
            println!("Token needs refresh: {}", oauth.should_update_token().await);
            oauth
                .refresh_access_token()
                .await
                .with_context(|| format!("refreshing {} token", provider.name()))?;
            println!("{} token refreshed.", provider.name());
        }
    }

    Ok(())
}

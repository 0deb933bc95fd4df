use anyhow::Result;
use clap::Parser;
use serde_json::{json, Value};
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use youtube_extract::dispatch::{OperationResponse, ToolCall};
use youtube_extract::{server, utils, Cli, Commands, Config, Dispatcher};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays reserved for results and the serve protocol
    let default_filter = if cli.verbose {
        "youtube_extract=debug"
    } else if cli.quiet {
        "youtube_extract=warn"
    } else {
        "youtube_extract=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::default_path()?,
    };
    let config = Config::load(&config_path)?;

    if matches!(
        cli.command,
        Commands::Video { .. } | Commands::Playlist { .. } | Commands::Serve
    ) {
        let missing_deps = utils::check_dependencies(&config.providers.yt_dlp_path).await;
        for dep in missing_deps {
            tracing::warn!("Dependency not found: {} (only the timedtext fallback will work)", dep);
        }
    }

    let is_serve = matches!(cli.command, Commands::Serve);
    let mut dispatcher =
        Dispatcher::new(config, Some(config_path.clone())).show_progress(!cli.quiet && !is_serve);

    let call = match cli.command {
        Commands::Video {
            url,
            language,
            no_timestamps,
            format,
            save,
        } => ToolCall {
            tool: "youtube_extract_video".to_string(),
            arguments: json!({
                "url": url,
                "language": language,
                "include_timestamps": !no_timestamps,
                "format": format,
                "save_locally": save,
            }),
        },
        Commands::Playlist {
            playlist_url,
            language,
            max_videos,
            save,
        } => ToolCall {
            tool: "youtube_extract_playlist".to_string(),
            arguments: json!({
                "playlist_url": playlist_url,
                "language": language,
                "max_videos": max_videos,
                "save_locally": save,
            }),
        },
        Commands::Configure { path } => ToolCall {
            tool: "configure_output_directory".to_string(),
            arguments: json!({ "path": path }),
        },
        Commands::Config { show } => {
            if !show {
                println!("Configuration file: {}", config_path.display());
                println!("Run `youtube-extract config --show` to print the current settings.");
                return Ok(());
            }
            ToolCall {
                tool: "show_current_config".to_string(),
                arguments: Value::Null,
            }
        }
        Commands::Serve => {
            server::serve(
                &mut dispatcher,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .await?;
            return Ok(());
        }
    };

    match dispatcher.call(call).await {
        OperationResponse::Success { result } => {
            match result {
                Value::String(text) => println!("{}", text),
                other => println!("{}", serde_json::to_string_pretty(&other)?),
            }
            Ok(())
        }
        failure @ OperationResponse::Failure { .. } => {
            println!("{}", serde_json::to_string_pretty(&failure)?);
            std::process::exit(1);
        }
    }
}

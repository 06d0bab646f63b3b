mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use plexclip::{config, probe, server};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "plexclip=trace,tower_http=debug".to_string()
        } else {
            "plexclip=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            // Create tokio runtime
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(serve(host, port, cli.config.as_deref()))
        }
        Commands::CheckTools => check_tools(cli.config.as_deref()),
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("plexclip {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn serve(
    host: Option<String>,
    port: Option<u16>,
    config_path: Option<&std::path::Path>,
) -> Result<()> {
    // Load config
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    tracing::info!("Starting plexclip server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );

    // A missing encoder only fails at request time, so flag it up front.
    for tool in probe::check_tools(&config.tools) {
        if tool.available {
            match tool.version.as_deref() {
                Some(version) => tracing::info!("Found {}: {}", tool.name, version),
                None => tracing::info!("Found {}", tool.name),
            }
        } else {
            tracing::warn!(
                "{} not found; encodes will fail until it is installed",
                tool.name
            );
        }
    }

    server::start_server(config).await
}

fn check_tools(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;

    println!("Checking external tools...\n");

    let tools = probe::check_tools(&config.tools);
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version);
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("ffmpeg and ffprobe are required. Install them or set [tools] paths in the config.");
    }

    Ok(())
}

fn validate_config(path: Option<&std::path::Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Auth enabled: {}", config.server.auth.enabled);
            if config.plex.host.is_empty() {
                println!("  Plex server: (not set)");
            } else {
                println!("  Plex server: {}", config.plex.host);
            }
            println!("  Encode backend: {}", config.transcode.backend);
            println!("  Encode slots: {}", config.transcode.max_concurrent);
            println!("  Clips kept for: {}s", config.transcode.keep_for_secs);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
        }
    }

    Ok(())
}

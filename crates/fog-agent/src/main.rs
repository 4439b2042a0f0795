//! FOG client communication tool
//!
//! Drives the communication layer from the command line: resolve the server
//! address, negotiate a session, and issue individual requests against the
//! FOG server the way the client service modules do.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fog_agent::Communicator;
use fog_core::config::{self, ClientConfig, ServerConfig};
use fog_protocol::Response;

#[derive(Parser)]
#[command(name = "fog-agent")]
#[command(about = "FOG client - authenticated requests to a FOG server")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Re-authentication attempts per request (overrides config)
    #[arg(long, global = true)]
    max_auth_retries: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default configuration file
    Init {
        /// Server host name or IP
        #[arg(long)]
        host: String,
        /// Web root of the FOG installation
        #[arg(long, default_value = "/fog/")]
        web_root: String,
        /// Talk to the server over HTTPS
        #[arg(long)]
        https: bool,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Print the resolved server address
    Resolve,

    /// Negotiate a new session key with the server
    Authenticate,

    /// GET a service endpoint and print the parsed reply
    Get {
        /// Path relative to the web root, e.g. /service/jobs.php
        postfix: String,
        /// Identify this host by its MAC addresses
        #[arg(long)]
        mac: bool,
    },

    /// GET an endpoint and print the body without decoding it
    Raw {
        /// Path relative to the web root
        postfix: String,
    },

    /// POST form fields to an endpoint and print the parsed reply
    Post {
        /// Path relative to the web root
        postfix: String,
        /// Form fields as key=value
        fields: Vec<String>,
    },

    /// Send a request without reading the reply
    Notify {
        /// Path relative to the web root
        postfix: String,
        /// Identify this host by its MAC addresses
        #[arg(long)]
        mac: bool,
    },

    /// Download a file
    Download {
        /// Path relative to the web root, or a full URL with --external
        source: String,
        /// Destination file
        dest: PathBuf,
        /// Treat the source as a full URL
        #[arg(long)]
        external: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| args.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = args.config.unwrap_or_else(config::default_config_path);

    match args.command {
        Command::Init {
            host,
            web_root,
            https,
            force,
        } => init(&config_path, &host, &web_root, https, force),
        command => run(&config_path, args.max_auth_retries, command),
    }
}

fn init(config_path: &Path, host: &str, web_root: &str, https: bool, force: bool) -> Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists, use --force to overwrite",
            config_path.display()
        );
    }

    let client = ClientConfig {
        server: ServerConfig::new(https, host, web_root),
        ..ClientConfig::default()
    };
    config::save_config(config_path, &client)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Wrote {}", config_path.display());
    Ok(())
}

fn run(config_path: &Path, max_auth_retries: Option<u32>, command: Command) -> Result<()> {
    let mut client: ClientConfig = config::load_config(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    tracing::debug!("Loaded config from {:?}", config_path);

    // Apply command-line overrides
    if let Some(retries) = max_auth_retries {
        client.max_auth_retries = retries;
    }

    let comm = Communicator::from_config(&client).context("Failed to set up communicator")?;

    match command {
        Command::Init { .. } | Command::Resolve => {
            let address = comm
                .session()
                .address()
                .context("Server address could not be resolved")?;
            println!("{}", address);
        }
        Command::Authenticate => {
            comm.try_authenticate().context("Authentication failed")?;
            println!("Authenticated");
        }
        Command::Get { postfix, mac } => {
            print_response(&comm.get_with_mac(&postfix, mac)?);
        }
        Command::Raw { postfix } => {
            println!("{}", comm.get_raw(&postfix)?);
        }
        Command::Post { postfix, fields } => {
            let form = parse_fields(&fields)?;
            print_response(&comm.post(&postfix, &form)?);
        }
        Command::Notify { postfix, mac } => {
            if !comm.notify_with_mac(&postfix, mac) {
                anyhow::bail!("Server could not be notified");
            }
        }
        Command::Download {
            source,
            dest,
            external,
        } => {
            if external {
                comm.download_external_file(&source, &dest)?;
            } else {
                comm.download_file(&source, &dest)?;
            }
            println!("Saved {}", dest.display());
        }
    }

    Ok(())
}

fn parse_fields(fields: &[String]) -> Result<Vec<(&str, &str)>> {
    fields
        .iter()
        .map(|field| {
            field
                .split_once('=')
                .with_context(|| format!("Form field '{}' is not key=value", field))
        })
        .collect()
}

fn print_response(response: &Response) {
    let status = if response.is_error { "error" } else { "ok" };
    match response.description() {
        Some(description) => println!("{} ({}): {}", response.return_code, status, description),
        None => println!("{} ({})", response.return_code, status),
    }
    for (key, value) in &response.fields {
        println!("  {} = {}", key, value);
    }
}

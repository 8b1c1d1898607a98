// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Guestlink - an ephemeral linked-session engine for guest chat access.
//!
//! This is the binary entry point for the Guestlink server.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use clap::{Parser, Subcommand};

/// Guestlink - an ephemeral linked-session engine for guest chat access.
#[derive(Parser, Debug)]
#[command(name = "guestlink", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Guestlink server.
    Serve,
    /// Show the resolved configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup
    let config = match guestlink_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            guestlink_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run(config).await {
                eprintln!("guestlink serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            print_config(&config);
        }
        None => {
            println!("guestlink: use --help for available commands");
        }
    }
}

/// Print the resolved configuration with credentials redacted.
fn print_config(config: &guestlink_config::GuestlinkConfig) {
    println!("server.bind          = {}:{}", config.server.host, config.server.port);
    println!("server.public_base   = {}", config.server.public_base_url);
    println!(
        "server.bearer_auth   = {}",
        if config.server.bearer_token.is_some() { "enabled" } else { "disabled" }
    );
    println!(
        "server.keypair_auth  = {}",
        if config.server.keypair_public_key.is_some() { "enabled" } else { "disabled" }
    );
    println!("server.log_level     = {}", config.server.log_level);
    println!("storage.database     = {}", config.storage.database_path);
    println!(
        "vault.master_key     = {}",
        if config.vault.master_key.is_some() { "configured" } else { "generated on first open" }
    );
    println!("guard.origin_rate    = {}/min", config.guard.origin_rate_per_minute);
    println!("guard.max_message    = {} bytes", config.guard.max_message_bytes);
    println!("links.default_expiry = {}h", config.links.default_expiry_hours);
    println!("links.max_expiry     = {}h", config.links.max_expiry_hours);
    println!("sessions.timeout     = {}m", config.sessions.timeout_minutes);
    println!("sessions.sweep       = {}s", config.sessions.sweep_interval_secs);
    println!(
        "webhook.inbound      = {}",
        if config.webhook.public_key.is_some() { "enabled" } else { "disabled" }
    );
}

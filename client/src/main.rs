use clap::Parser;
use client::connection::{ConnectionConfig, DEFAULT_ENDPOINTS};
use client::network::{Client, ClientOptions};
use client::profile;
use log::info;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to; repeat to list fail-over servers in order
    #[arg(short = 's', long = "server")]
    servers: Vec<String>,

    /// Display name (saved to the profile)
    #[arg(short = 'n', long)]
    name: Option<String>,

    /// Game id or invite link to join on startup
    #[arg(short = 'g', long)]
    game: Option<String>,

    /// Start in offline mode without contacting a server
    #[arg(long)]
    offline: bool,

    /// Failed connection attempts before giving up
    #[arg(long, default_value = "6")]
    max_attempts: u32,

    /// Per-attempt connection timeout in milliseconds
    #[arg(long, default_value = "5000")]
    timeout_ms: u64,

    /// Offline pause between rounds in milliseconds
    #[arg(long, default_value = "3000")]
    pause_ms: u64,

    /// Profile file (defaults to ~/.raja-mantri/profile.json)
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Base URL used for invite links
    #[arg(long, default_value = profile::DEFAULT_INVITE_BASE)]
    invite_base: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let servers = if args.servers.is_empty() {
        DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect()
    } else {
        args.servers
    };
    let game_id = match args.game.as_deref() {
        Some(game) => Some(
            profile::parse_invite(game)
                .ok_or_else(|| format!("invalid game id or invite link: {}", game))?,
        ),
        None => None,
    };

    info!("Starting client...");
    if args.offline {
        info!("Offline mode");
    } else {
        info!("Servers: {}", servers.join(", "));
    }

    let config = ConnectionConfig::default()
        .with_endpoints(servers)
        .with_connect_timeout(Duration::from_millis(args.timeout_ms))
        .with_max_attempts(args.max_attempts);

    let options = ClientOptions {
        player_name: args.name,
        game_id,
        offline: args.offline,
        round_pause: Duration::from_millis(args.pause_ms),
        profile_path: args.profile.unwrap_or_else(profile::default_path),
        invite_base: args.invite_base,
    };

    let mut client = Client::new(config, options);
    client.run().await?;

    Ok(())
}

//! # Raja Mantri Chor Sipahi Client Library
//!
//! This library provides the terminal client for the four-player party game
//! Raja Mantri Chor Sipahi. It handles command input, the connection to the game
//! server, the local mirror of the session, an offline fallback game and text
//! rendering.
//!
//! ## Architecture Overview
//!
//! The server is authoritative. The client sends intents (create, join, start,
//! guess) and redraws whenever the server pushes a new state. The only game
//! logic that runs locally is the offline mode, which uses the same rules
//! crate (`shared::rules`) the server does, so scores and reveals behave the
//! same in both modes.
//!
//! ### Connection Management
//! A [`connection::ConnectionManager`] keeps at most one live connection to
//! one of several candidate servers. Failed attempts move on to the next
//! endpoint, wait an exponentially growing delay, and give up after a fixed
//! number of attempts. After a lost connection the join for the current game
//! is replayed automatically.
//!
//! ### Notices
//! Everything the player should hear about (retries, joins, guess results,
//! validation errors) becomes a [`notice::Notice`] and is printed in order.
//!
//! ## Module Organization
//!
//! ### Connection Module (`connection`)
//! - Endpoint fail-over, timeouts and backoff
//! - Session affinity and join replay
//! - Outbound game operations
//!
//! ### Transport Module (`transport`)
//! - `Transport`/`Connector` traits, so tests can swap the wire out
//! - Length-prefixed bincode frames over TCP
//!
//! ### Game Module (`game`)
//! - `SessionView`, the mirror of the server's session
//! - Local validation of names, game ids and guesses
//!
//! ### Offline Module (`offline`)
//! - A local game against three placeholder players
//!
//! ### Input, Rendering and Profile Modules
//! - Command parsing, text screens, and the saved player name and game id
//!
//! ## Usage Example
//!
//! ```no_run
//! use client::connection::ConnectionConfig;
//! use client::network::{Client, ClientOptions};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConnectionConfig::default().with_endpoints(["127.0.0.1:7878"]);
//! let options = ClientOptions {
//!     player_name: Some("Asha".to_string()),
//!     game_id: None,
//!     offline: false,
//!     round_pause: Duration::from_secs(3),
//!     profile_path: client::profile::default_path(),
//!     invite_base: client::profile::DEFAULT_INVITE_BASE.to_string(),
//! };
//!
//! let mut client = Client::new(config, options);
//! client.run().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod game;
pub mod input;
pub mod network;
pub mod notice;
pub mod offline;
pub mod profile;
pub mod rendering;
pub mod transport;

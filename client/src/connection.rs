//! Connection manager: keeps at most one live connection to one of an ordered
//! list of candidate servers.
//!
//! Connection attempts walk the endpoint list round-robin. Each attempt runs
//! under a timeout; a failed attempt is counted and followed by a backoff
//! delay before the next endpoint is tried. Once `max_attempts` attempts have
//! failed in a row the manager reports [`ConnectionError::Exhausted`] and
//! stays in [`ConnectionState::Failed`] until [`ConnectionManager::reconnect`]
//! is called.
//!
//! The manager also remembers which session the player is in, so that a join
//! for that session is replayed every time a new connection comes up.

use crate::notice::{Notice, NoticeSender};
use crate::transport::{Connector, Transport, TransportError};
use log::{debug, error, info, warn};
use shared::{ClientMessage, PlayerId, ServerMessage};
use std::time::Duration;
use thiserror::Error;
use tokio::time::{sleep, timeout};

pub const DEFAULT_ENDPOINTS: [&str; 3] = [
    "raja-mantri-server.onrender.com:7878",
    "127.0.0.1:7878",
    "127.0.0.1:7879",
];

#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Candidate servers, tried in order.
    pub endpoints: Vec<String>,
    pub connect_timeout: Duration,
    /// Delay after the first failed attempt; doubles per attempt.
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Failed attempts, across all endpoints, before giving up.
    pub max_attempts: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|e| e.to_string()).collect(),
            connect_timeout: Duration::from_secs(5),
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(5),
            max_attempts: 6,
        }
    }
}

impl ConnectionConfig {
    pub fn with_endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_backoff(mut self, base_delay: Duration, max_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self.max_delay = max_delay;
        self
    }

    /// Values below 1 are clamped to 1.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Delay to wait after the `attempt`-th consecutive failure (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    /// Attempt budget exhausted; only `reconnect` leaves this state.
    Failed,
}

/// Read-only view of the manager, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub endpoint_index: usize,
    pub endpoint: Option<String>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub session_id: Option<String>,
}

impl ConnectionStatus {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("not connected to a game server")]
    NotConnected,
    #[error("not in a game session")]
    NoSession,
    #[error("no server endpoints configured")]
    NoEndpoints,
    #[error("connecting to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
    #[error("connecting to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: TransportError,
    },
    #[error("connection lost: {0}")]
    Lost(String),
    #[error("gave up after {attempts} failed connection attempts")]
    Exhausted { attempts: u32 },
}

pub struct ConnectionManager<C: Connector> {
    connector: C,
    config: ConnectionConfig,
    transport: Option<C::Transport>,
    state: ConnectionState,
    endpoint_index: usize,
    attempts: u32,
    session_id: Option<String>,
    player_name: Option<String>,
    notices: Option<NoticeSender>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, config: ConnectionConfig) -> Self {
        Self {
            connector,
            config,
            transport: None,
            state: ConnectionState::Disconnected,
            endpoint_index: 0,
            attempts: 0,
            session_id: None,
            player_name: None,
            notices: None,
        }
    }

    /// Routes connection notices (retries, loss, give-up) to the player.
    pub fn with_notices(mut self, notices: NoticeSender) -> Self {
        self.notices = Some(notices);
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected && self.transport.is_some()
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            state: self.state,
            endpoint_index: self.endpoint_index,
            endpoint: self.config.endpoints.get(self.endpoint_index).cloned(),
            attempts: self.attempts,
            max_attempts: self.config.max_attempts,
            session_id: self.session_id.clone(),
        }
    }

    fn notify(&self, notice: Notice) {
        notice.log();
        if let Some(tx) = &self.notices {
            let _ = tx.send(notice);
        }
    }

    /// Connects unless already connected, failing over across endpoints
    /// until one accepts or the attempt budget runs out.
    pub async fn connect(&mut self) -> Result<(), ConnectionError> {
        if self.is_connected() {
            return Ok(());
        }
        if self.config.endpoints.is_empty() {
            self.state = ConnectionState::Failed;
            return Err(ConnectionError::NoEndpoints);
        }
        if self.state == ConnectionState::Failed {
            return Err(ConnectionError::Exhausted {
                attempts: self.attempts,
            });
        }

        // The index may point past a shortened endpoint list.
        self.endpoint_index %= self.config.endpoints.len();

        loop {
            self.state = ConnectionState::Connecting;
            let endpoint = self.config.endpoints[self.endpoint_index].clone();
            info!(
                "Connecting to {} (attempt {}/{})",
                endpoint,
                self.attempts + 1,
                self.config.max_attempts
            );

            let failure = match timeout(
                self.config.connect_timeout,
                self.connector.connect(&endpoint),
            )
            .await
            {
                Ok(Ok(transport)) => match self.on_connected(transport, &endpoint).await {
                    Ok(()) => return Ok(()),
                    // The join replay failed; counts against the budget like
                    // any other failed attempt.
                    Err(failure) => failure,
                },
                Ok(Err(source)) => ConnectionError::Transport { endpoint, source },
                Err(_) => ConnectionError::Timeout {
                    endpoint,
                    timeout: self.config.connect_timeout,
                },
            };

            self.attempts += 1;
            self.endpoint_index = (self.endpoint_index + 1) % self.config.endpoints.len();

            if self.attempts >= self.config.max_attempts {
                self.state = ConnectionState::Failed;
                error!("{}", failure);
                self.notify(Notice::error(format!(
                    "Could not reach any game server after {} attempts. Type `retry` to try again or `offline` to play locally.",
                    self.attempts
                )));
                return Err(ConnectionError::Exhausted {
                    attempts: self.attempts,
                });
            }

            let delay = self.config.backoff(self.attempts);
            warn!("{}; retrying in {:?}", failure, delay);
            self.notify(Notice::error(format!(
                "Connection error: {}. Retrying in {} ms...",
                failure,
                delay.as_millis()
            )));
            sleep(delay).await;
        }
    }

    /// Starts the next `connect` over from the first endpoint with a fresh
    /// attempt budget. No-op while connected.
    pub fn rewind(&mut self) {
        if self.is_connected() {
            return;
        }
        self.endpoint_index = 0;
        self.attempts = 0;
        self.state = ConnectionState::Disconnected;
    }

    /// User-triggered retry: start over from the first endpoint with a fresh
    /// attempt budget.
    pub async fn reconnect(&mut self) -> Result<(), ConnectionError> {
        self.rewind();
        self.connect().await
    }

    async fn on_connected(
        &mut self,
        transport: C::Transport,
        endpoint: &str,
    ) -> Result<(), ConnectionError> {
        self.transport = Some(transport);
        self.state = ConnectionState::Connected;
        self.notify(Notice::success(format!(
            "Connected to game server {}",
            endpoint
        )));

        if let (Some(session_id), Some(player_name)) =
            (self.session_id.clone(), self.player_name.clone())
        {
            info!("Rejoining session {} as {}", session_id, player_name);
            self.send(ClientMessage::JoinSession {
                session_id,
                player_name,
            })
            .await?;
        }
        self.attempts = 0;
        Ok(())
    }

    fn drop_connection(&mut self, reason: &str) {
        if self.transport.take().is_some() {
            warn!("Connection dropped: {}", reason);
        }
        if self.state != ConnectionState::Failed {
            self.state = ConnectionState::Disconnected;
        }
    }

    async fn send(&mut self, message: ClientMessage) -> Result<(), ConnectionError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or(ConnectionError::NotConnected)?;

        debug!("Sending {:?}", message);
        if let Err(e) = transport.send(message).await {
            let reason = e.to_string();
            self.drop_connection(&reason);
            self.notify(Notice::error("Disconnected from server"));
            return Err(ConnectionError::Lost(reason));
        }
        Ok(())
    }

    fn require_connection(&self) -> Result<(), ConnectionError> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ConnectionError::NotConnected)
        }
    }

    fn require_session(&self) -> Result<String, ConnectionError> {
        self.require_connection()?;
        self.session_id.clone().ok_or(ConnectionError::NoSession)
    }

    pub async fn create_session(&mut self, player_name: &str) -> Result<(), ConnectionError> {
        self.require_connection()?;
        self.send(ClientMessage::CreateSession {
            player_name: player_name.to_string(),
        })
        .await?;
        self.player_name = Some(player_name.to_string());
        Ok(())
    }

    pub async fn join_session(
        &mut self,
        session_id: &str,
        player_name: &str,
    ) -> Result<(), ConnectionError> {
        self.require_connection()?;
        self.send(ClientMessage::JoinSession {
            session_id: session_id.to_string(),
            player_name: player_name.to_string(),
        })
        .await?;
        self.session_id = Some(session_id.to_string());
        self.player_name = Some(player_name.to_string());
        Ok(())
    }

    pub async fn start_game(&mut self) -> Result<(), ConnectionError> {
        let session_id = self.require_session()?;
        self.send(ClientMessage::StartGame { session_id }).await
    }

    pub async fn submit_guess(&mut self, target: &PlayerId) -> Result<(), ConnectionError> {
        let session_id = self.require_session()?;
        self.send(ClientMessage::SubmitGuess {
            session_id,
            target_player_id: target.clone(),
        })
        .await
    }

    /// Next message pushed by the server, in the order the transport
    /// delivered it. Never resolves while disconnected.
    pub async fn next_message(&mut self) -> Result<ServerMessage, ConnectionError> {
        let transport = match self.transport.as_mut() {
            Some(transport) => transport,
            None => return std::future::pending().await,
        };

        let reason = match transport.recv().await {
            Some(Ok(message)) => {
                if let ServerMessage::SessionState(snapshot) = &message {
                    if self.session_id.as_deref() != Some(snapshot.session_id.as_str()) {
                        debug!("Session affinity set to {}", snapshot.session_id);
                        self.session_id = Some(snapshot.session_id.clone());
                    }
                }
                return Ok(message);
            }
            Some(Err(e)) => e.to_string(),
            None => "server closed the connection".to_string(),
        };

        self.drop_connection(&reason);
        self.notify(Notice::error("Disconnected from server"));
        Err(ConnectionError::Lost(reason))
    }

    /// Tears down the connection and forgets the session.
    pub async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                debug!("Error while closing transport: {}", e);
            }
            info!("Disconnected from server");
        }
        self.state = ConnectionState::Disconnected;
        self.attempts = 0;
        self.session_id = None;
        self.player_name = None;
    }
}

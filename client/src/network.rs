use crate::connection::{ConnectionConfig, ConnectionError, ConnectionManager};
use crate::game::{validate_name, validate_session_id, SessionView};
use crate::input::{self, Command};
use crate::notice::{self, Notice, NoticeReceiver};
use crate::offline::OfflineGame;
use crate::profile::Profile;
use crate::rendering;
use crate::transport::{Connector, TcpConnector};
use log::{debug, info, warn};
use shared::{RoundPhase, RuleError, ServerMessage};
use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{sleep_until, Instant};

/// Name used offline when the player never set one.
const OFFLINE_DEFAULT_NAME: &str = "You";

/// What the connection side of the run loop waits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    /// Offline: notices only.
    Quiet,
    /// Server pushes. Pends forever while disconnected.
    Listen,
    /// A connect with fail-over. Dropped (and resumed later) whenever another
    /// branch of the loop fires first.
    Connect,
}

enum LinkEvent {
    Message(ServerMessage),
    Lost(ConnectionError),
    Connected,
    GaveUp(ConnectionError),
}

/// Waits for the next connection event, printing notices as they arrive so
/// retry messages show up while a connect is still running.
async fn next_link_event<C: Connector>(
    connection: &mut ConnectionManager<C>,
    notices: &mut NoticeReceiver,
    link: Link,
) -> LinkEvent {
    match link {
        Link::Connect => {
            let attempt = connection.connect();
            tokio::pin!(attempt);
            loop {
                tokio::select! {
                    result = &mut attempt => {
                        return match result {
                            Ok(()) => LinkEvent::Connected,
                            Err(e) => LinkEvent::GaveUp(e),
                        };
                    },
                    Some(notice) = notices.recv() => print_notice(&notice),
                }
            }
        }
        Link::Listen => loop {
            tokio::select! {
                message = connection.next_message() => {
                    return match message {
                        Ok(message) => LinkEvent::Message(message),
                        Err(e) => LinkEvent::Lost(e),
                    };
                },
                Some(notice) = notices.recv() => print_notice(&notice),
            }
        },
        Link::Quiet => loop {
            match notices.recv().await {
                Some(notice) => print_notice(&notice),
                None => return std::future::pending().await,
            }
        },
    }
}

pub struct ClientOptions {
    pub player_name: Option<String>,
    /// Game to join on startup; overrides the one remembered in the profile.
    pub game_id: Option<String>,
    pub offline: bool,
    /// Offline pause between a scored round and the next deal.
    pub round_pause: Duration,
    pub profile_path: PathBuf,
    pub invite_base: String,
}

pub struct Client<C: Connector> {
    connection: ConnectionManager<C>,
    notices: NoticeReceiver,
    connecting: bool,
    view: SessionView,

    offline: Option<OfflineGame>,
    advance_at: Option<Instant>,
    round_pause: Duration,
    start_offline: bool,

    profile: Profile,
    profile_path: PathBuf,
    pending_game: Option<String>,
    invite_base: String,
}

fn print_notice(notice: &Notice) {
    println!("{}", notice);
}

impl Client<TcpConnector> {
    pub fn new(config: ConnectionConfig, options: ClientOptions) -> Self {
        Self::with_connector(TcpConnector::default(), config, options)
    }
}

impl<C: Connector> Client<C> {
    pub fn with_connector(connector: C, config: ConnectionConfig, options: ClientOptions) -> Self {
        let (tx, rx) = notice::channel();
        let connection = ConnectionManager::new(connector, config).with_notices(tx);

        let mut profile = match Profile::load(&options.profile_path) {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Ignoring unreadable profile: {}", e);
                Profile::default()
            }
        };
        if let Some(name) = options.player_name {
            profile.player_name = Some(name);
        }
        let pending_game = options.game_id.or_else(|| profile.game_id.clone());

        Client {
            connection,
            notices: rx,
            connecting: false,
            view: SessionView::new(),
            offline: None,
            advance_at: None,
            round_pause: options.round_pause,
            start_offline: options.offline,
            profile,
            profile_path: options.profile_path,
            pending_game,
            invite_base: options.invite_base,
        }
    }

    pub fn view(&self) -> &SessionView {
        &self.view
    }

    pub fn is_offline(&self) -> bool {
        self.offline.is_some()
    }

    fn show(&self, text: impl Display) {
        println!("{}", text);
    }

    fn show_error(&self, err: impl Display) {
        print_notice(&Notice::error(err.to_string()));
    }

    fn drain_notices(&mut self) {
        while let Ok(notice) = self.notices.try_recv() {
            print_notice(&notice);
        }
    }

    fn redraw(&self) {
        self.show(rendering::screen(&self.view));
    }

    fn link(&self) -> Link {
        if self.offline.is_some() {
            Link::Quiet
        } else if self.connecting {
            Link::Connect
        } else {
            Link::Listen
        }
    }

    async fn on_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Message(message) => self.on_message(message),
            LinkEvent::Lost(e) => self.connection_lost(e),
            LinkEvent::Connected => {
                self.connecting = false;
                self.show(rendering::status_line(&self.connection.status()));
                self.join_pending().await;
                self.redraw();
            }
            LinkEvent::GaveUp(e) => {
                // The manager already offered `retry` and `offline`.
                self.connecting = false;
                debug!("Connect gave up: {}", e);
            }
        }
    }

    /// Schedules fail-over once the live connection is gone.
    fn connection_lost(&mut self, err: ConnectionError) {
        warn!("{}", err);
        self.connecting = true;
    }

    fn outbound_failed(&mut self, err: ConnectionError) {
        self.show_error(&err);
        if matches!(err, ConnectionError::Lost(_)) {
            self.connection_lost(err);
        }
    }

    async fn join_pending(&mut self) {
        let game_id = match self.pending_game.take() {
            Some(game_id) => game_id,
            None => return,
        };
        match self.profile.player_name.clone() {
            Some(name) => {
                print_notice(&Notice::info(format!("Rejoining game {}", game_id)));
                self.send_join(&game_id, &name).await;
            }
            None => print_notice(&Notice::info(format!(
                "Set a name with `name <name>`, then type `join {}`",
                game_id
            ))),
        }
    }

    async fn send_join(&mut self, game_id: &str, name: &str) {
        match self.connection.join_session(game_id, name).await {
            Ok(()) => info!("Joining {} as {}", game_id, name),
            Err(e) => {
                if matches!(e, ConnectionError::Lost(_)) {
                    self.pending_game = Some(game_id.to_string());
                }
                self.outbound_failed(e);
            }
        }
    }

    fn remember_game(&mut self, game_id: Option<String>) {
        if self.profile.game_id == game_id {
            return;
        }
        self.profile.game_id = game_id;
        self.save_profile();
    }

    fn save_profile(&self) {
        if let Err(e) = self.profile.save(&self.profile_path) {
            warn!("{}", e);
            self.show_error(e);
        }
    }

    /// Prints the help, then either goes offline or queues the first
    /// connect; the run loop rejoins the remembered game once it is up.
    pub async fn startup(&mut self) {
        self.show(rendering::help());
        if self.start_offline {
            self.go_offline().await;
        } else {
            self.connecting = true;
        }
    }

    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        self.startup().await;

        loop {
            let advance_at = self.advance_at.unwrap_or_else(Instant::now);
            let link = self.link();

            tokio::select! {
                line = lines.next_line() => {
                    match line? {
                        Some(line) => {
                            if !self.handle_line(&line).await {
                                break;
                            }
                        }
                        None => break,
                    }
                },

                event = next_link_event(&mut self.connection, &mut self.notices, link) => {
                    self.on_link_event(event).await;
                },

                _ = sleep_until(advance_at), if self.advance_at.is_some() => {
                    self.next_offline_round();
                },
            }
        }

        self.connection.disconnect().await;
        info!("Client stopped");
        Ok(())
    }

    fn on_message(&mut self, message: ServerMessage) {
        let snapshot_id = match &message {
            ServerMessage::SessionState(snapshot) => Some(snapshot.session_id.clone()),
            _ => None,
        };
        let redraw = !matches!(message, ServerMessage::Error { .. });

        for notice in self.view.apply(message) {
            print_notice(&notice);
        }
        if snapshot_id.is_some() {
            self.remember_game(snapshot_id);
        }
        if redraw {
            self.redraw();
        }
    }

    /// Handles one line of input. Returns false when the player quits.
    pub async fn handle_line(&mut self, line: &str) -> bool {
        match input::parse(line) {
            Ok(Some(Command::Quit)) => false,
            Ok(Some(command)) => {
                self.handle_command(command).await;
                true
            }
            Ok(None) => true,
            Err(e) => {
                self.show_error(e);
                true
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Name(name) => match validate_name(&name) {
                Ok(name) => {
                    print_notice(&Notice::success(format!("You will play as {}", name)));
                    self.profile.player_name = Some(name);
                    self.save_profile();
                }
                Err(e) => self.show_error(e),
            },

            Command::Create => {
                let name = match self.player_name() {
                    Some(name) => name,
                    None => return,
                };
                if self.offline.is_some() {
                    self.go_offline().await;
                } else if let Err(e) = self.connection.create_session(&name).await {
                    self.outbound_failed(e);
                }
            }

            Command::Join(game_id) => {
                if self.offline.is_some() {
                    self.show_error("Joining a game needs a server. Type `retry` to reconnect.");
                    return;
                }
                let game_id = match validate_session_id(Some(&game_id)) {
                    Ok(game_id) => game_id,
                    Err(e) => return self.show_error(e),
                };
                if let Some(name) = self.player_name() {
                    self.send_join(&game_id, &name).await;
                }
            }

            Command::Start => {
                if self.offline.is_some() {
                    self.step_offline(|game| game.start());
                } else if self.view.session_id.is_none() {
                    self.show_error("Create or join a game first");
                } else if self.view.missing_players() > 0 {
                    self.show_error(RuleError::NotEnoughPlayers(self.view.players.len()));
                } else if let Err(e) = self.connection.start_game().await {
                    self.outbound_failed(e);
                }
            }

            Command::Guess(token) => {
                let target = match self.view.validate_guess(&token) {
                    Ok(target) => target,
                    Err(e) => return self.show_error(e),
                };
                if self.offline.is_some() {
                    self.step_offline(|game| game.guess(&target));
                } else if let Err(e) = self.connection.submit_guess(&target).await {
                    self.outbound_failed(e);
                }
            }

            Command::Next => {
                if self.offline.is_some() {
                    self.next_offline_round();
                } else {
                    print_notice(&Notice::info(
                        "The server deals the next round automatically.",
                    ));
                }
            }

            Command::Status => self.show_status(),

            Command::Retry => {
                if self.offline.take().is_some() {
                    info!("Leaving offline mode");
                    self.advance_at = None;
                    self.view = SessionView::new();
                }
                print_notice(&Notice::info("Reconnecting..."));
                self.connection.rewind();
                self.connecting = true;
            }

            Command::Offline => self.go_offline().await,

            Command::Reset => self.reset().await,

            Command::Rules => self.show(rendering::rules()),
            Command::Help => self.show(rendering::help()),
            Command::Quit => {}
        }
    }

    fn player_name(&self) -> Option<String> {
        match self.profile.player_name.as_deref().map(validate_name) {
            Some(Ok(name)) => Some(name),
            Some(Err(e)) => {
                self.show_error(e);
                None
            }
            None => {
                self.show_error("Please enter a name with `name <name>`");
                None
            }
        }
    }

    fn show_status(&self) {
        if self.offline.is_some() {
            self.show("Playing offline against placeholder players");
            return;
        }
        self.show(rendering::status_line(&self.connection.status()));
        if let Some(game_id) = &self.view.session_id {
            self.show(rendering::invite(&self.invite_base, game_id));
        }
    }

    /// Leaves any server session and seats the player in a local game.
    async fn go_offline(&mut self) {
        if self.offline.is_none() {
            if let Some(game_id) = self.connection.session_id() {
                self.pending_game = Some(game_id.to_string());
            }
            self.connection.disconnect().await;
            self.connecting = false;
            self.drain_notices();
        }

        let name = self
            .profile
            .player_name
            .clone()
            .unwrap_or_else(|| OFFLINE_DEFAULT_NAME.to_string());
        match OfflineGame::new(&name) {
            Ok(game) => {
                info!("Offline game created for {}", name);
                self.view = game.view();
                self.offline = Some(game);
                self.advance_at = None;
                print_notice(&Notice::success(
                    "Playing offline against placeholder players. Type `start` to begin.",
                ));
                self.redraw();
            }
            Err(e) => self.show_error(e),
        }
    }

    /// Runs one offline step, lets a placeholder Sipahi guess, and schedules
    /// the next deal once the round is scored.
    fn step_offline<F>(&mut self, step: F)
    where
        F: FnOnce(&mut OfflineGame) -> Result<Vec<Notice>, RuleError>,
    {
        let game = match self.offline.as_mut() {
            Some(game) => game,
            None => return,
        };

        match step(game) {
            Ok(notices) => notices.iter().for_each(print_notice),
            Err(e) => print_notice(&Notice::error(e.to_string())),
        }
        if game.bot_to_guess() {
            match game.bot_turn() {
                Ok(notices) => notices.iter().for_each(print_notice),
                Err(e) => print_notice(&Notice::error(e.to_string())),
            }
        }

        self.advance_at = match game.session().phase() {
            RoundPhase::Revealed => Some(Instant::now() + self.round_pause),
            _ => None,
        };
        self.view = game.view();
        self.redraw();
    }

    fn next_offline_round(&mut self) {
        self.advance_at = None;
        self.step_offline(|game| game.next_round());
    }

    async fn reset(&mut self) {
        if self.offline.is_some() {
            self.step_offline(|game| game.reset());
            return;
        }

        self.connection.disconnect().await;
        self.pending_game = None;
        self.view = SessionView::new();
        self.remember_game(None);
        print_notice(&Notice::success("Game has been reset."));
        self.connection.rewind();
        self.connecting = true;
    }
}

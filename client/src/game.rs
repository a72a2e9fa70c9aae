use crate::input::InputError;
use crate::notice::Notice;
use log::debug;
use shared::{Player, PlayerId, Role, ServerMessage, SessionSnapshot, TOTAL_ROUNDS};

/// The client's mirror of the authoritative session. Only ever updated from
/// server pushes (or the offline session); never guessed at locally beyond
/// revealing roles once a guess result arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    pub session_id: Option<String>,
    pub players: Vec<Player>,
    pub round: u32,
    pub total_rounds: u32,
    pub started: bool,
    pub ended: bool,
    pub me: Option<PlayerId>,
    pub winner: Option<Player>,
}

impl Default for SessionView {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionView {
    pub fn new() -> Self {
        Self {
            session_id: None,
            players: Vec::new(),
            round: 0,
            total_rounds: TOTAL_ROUNDS,
            started: false,
            ended: false,
            me: None,
            winner: None,
        }
    }

    pub fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        let mut view = Self::new();
        view.apply_snapshot(snapshot);
        view
    }

    fn apply_snapshot(&mut self, snapshot: SessionSnapshot) {
        self.session_id = Some(snapshot.session_id);
        self.players = snapshot.players;
        self.round = snapshot.round;
        self.total_rounds = snapshot.total_rounds;
        self.started = snapshot.started;
        self.ended = snapshot.ended;
        if snapshot.your_id.is_some() {
            self.me = snapshot.your_id;
        }
        if !self.ended {
            self.winner = None;
        }
    }

    /// Folds one server push into the view and returns what the player
    /// should be told about it.
    pub fn apply(&mut self, message: ServerMessage) -> Vec<Notice> {
        debug!("Applying {:?}", message);
        match message {
            ServerMessage::SessionState(snapshot) => {
                let joined = self.session_id.as_deref() != Some(snapshot.session_id.as_str());
                let session_id = snapshot.session_id.clone();
                self.apply_snapshot(snapshot);
                if joined {
                    vec![Notice::success(format!("Joined game {}", session_id))]
                } else {
                    Vec::new()
                }
            }
            ServerMessage::PlayerJoined { player } => {
                let name = player.name.clone();
                if !self.players.iter().any(|p| p.id == player.id) {
                    self.players.push(player);
                }
                vec![Notice::success(format!("{} joined the game", name))]
            }
            ServerMessage::GameStarted { round } => {
                self.started = true;
                self.ended = false;
                self.round = round;
                vec![Notice::success("Game started! Roles have been distributed.")]
            }
            ServerMessage::GuessResult {
                correct,
                accuser,
                target,
            } => {
                for player in &mut self.players {
                    player.revealed = true;
                }
                if correct {
                    vec![Notice::success(format!(
                        "Correct! {} correctly identified {} as the Chor!",
                        accuser, target
                    ))]
                } else {
                    vec![Notice::error(format!(
                        "Wrong guess! {} was not the Chor, so the Chor gets the Sipahi's points!",
                        target
                    ))]
                }
            }
            ServerMessage::RoundEnded { round, players } => {
                self.players = players;
                self.round = round;
                if round < self.total_rounds {
                    vec![Notice::info(format!(
                        "Round {} has ended. Next round will start soon...",
                        round
                    ))]
                } else {
                    vec![Notice::info(format!("Round {} has ended.", round))]
                }
            }
            ServerMessage::GameEnded { winner } => {
                self.ended = true;
                let notice = Notice::success(format!(
                    "Game over! {} wins with {} points!",
                    winner.name, winner.score
                ));
                self.winner = Some(winner);
                vec![notice]
            }
            ServerMessage::Error { message } => vec![Notice::error(message)],
        }
    }

    pub fn me(&self) -> Option<&Player> {
        let me = self.me.as_ref()?;
        self.players.iter().find(|p| &p.id == me)
    }

    pub fn my_role(&self) -> Option<Role> {
        self.me().and_then(|p| p.role)
    }

    pub fn holder_of(&self, role: Role) -> Option<&Player> {
        self.players.iter().find(|p| p.role == Some(role))
    }

    pub fn all_revealed(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.revealed)
    }

    /// Players still needed before the game can start.
    pub fn missing_players(&self) -> usize {
        shared::PLAYERS_PER_GAME.saturating_sub(self.players.len())
    }

    /// Highest score, first seat on ties. Falls back to the pushed winner.
    pub fn leader(&self) -> Option<&Player> {
        if let Some(winner) = &self.winner {
            return Some(winner);
        }
        self.players.iter().fold(None, |best: Option<&Player>, p| match best {
            Some(b) if b.score >= p.score => Some(b),
            _ => Some(p),
        })
    }

    pub fn standings(&self) -> Vec<&Player> {
        let mut ranked: Vec<&Player> = self.players.iter().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// Resolves what the player typed to a seated player. An exact player id
    /// wins, then a 1-based list number, then a name (case-insensitive).
    pub fn resolve_player(&self, token: &str) -> Option<&Player> {
        let token = token.trim();
        if let Some(player) = self.players.iter().find(|p| p.id.as_str() == token) {
            return Some(player);
        }
        let by_number = token
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.players.get(i));
        by_number.or_else(|| {
            self.players
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(token))
        })
    }

    /// Checks a guess locally before it is sent, returning the target's id.
    pub fn validate_guess(&self, token: &str) -> Result<PlayerId, InputError> {
        if token.trim().is_empty() {
            return Err(InputError::MissingTarget);
        }
        if !self.started || self.ended {
            return Err(InputError::NotPlaying);
        }
        if self.all_revealed() {
            return Err(InputError::RoundOver);
        }
        if self.my_role() != Some(Role::Sipahi) {
            return Err(InputError::NotSipahi);
        }

        let target = self
            .resolve_player(token)
            .ok_or_else(|| InputError::UnknownPlayer(token.trim().to_string()))?;
        if Some(&target.id) == self.me.as_ref() {
            return Err(InputError::SelfGuess);
        }
        Ok(target.id.clone())
    }
}

pub fn validate_name(name: &str) -> Result<String, InputError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(InputError::EmptyName);
    }
    Ok(name.to_string())
}

pub fn validate_session_id(session_id: Option<&str>) -> Result<String, InputError> {
    match session_id.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id.to_string()),
        _ => Err(InputError::MissingGameId),
    }
}

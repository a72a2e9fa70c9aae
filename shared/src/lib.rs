//! Types shared by every participant in a Raja Mantri Chor Sipahi game: the
//! roles and players, the messages exchanged with the game server, and the
//! round rules used both by the server and by the client's offline mode.

use serde::{Deserialize, Serialize};
use std::fmt;

pub mod codec;
pub mod rules;

pub use rules::{
    score_round, shuffle_roles, Award, GameSession, GuessOutcome, RoleAssignment, RoundAdvance,
    RoundPhase, RoundScore, RuleError,
};

pub const TOTAL_ROUNDS: u32 = 7;
pub const PLAYERS_PER_GAME: usize = 4;
/// Points handed out in every scored round, whatever the guess.
pub const ROUND_POINTS: u32 = 2700;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Raja,
    Mantri,
    Chor,
    Sipahi,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Raja, Role::Mantri, Role::Chor, Role::Sipahi];

    /// Base award for holding this role in a round.
    pub fn points(self) -> u32 {
        match self {
            Role::Raja => 800,
            Role::Mantri => 900,
            Role::Chor => 0,
            Role::Sipahi => 1000,
        }
    }

    /// Raja and Sipahi are shown to everyone as soon as roles are dealt.
    pub fn is_public(self) -> bool {
        matches!(self, Role::Raja | Role::Sipahi)
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Raja => "Raja",
            Role::Mantri => "Mantri",
            Role::Chor => "Chor",
            Role::Sipahi => "Sipahi",
        }
    }

    fn index(self) -> usize {
        match self {
            Role::Raja => 0,
            Role::Mantri => 1,
            Role::Chor => 2,
            Role::Sipahi => 3,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifier handed out by the session, stable for as long as the player stays.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        PlayerId(id.to_string())
    }
}

impl From<String> for PlayerId {
    fn from(id: String) -> Self {
        PlayerId(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    /// Unset between rounds and while waiting in the lobby.
    pub role: Option<Role>,
    pub score: u32,
    pub revealed: bool,
}

impl Player {
    pub fn new(id: impl Into<PlayerId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role: None,
            score: 0,
            revealed: false,
        }
    }
}

/// Full view of a session as the server pushes it to one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub players: Vec<Player>,
    pub round: u32,
    pub total_rounds: u32,
    pub started: bool,
    pub ended: bool,
    /// The recipient's own player id, when the recipient is seated.
    pub your_id: Option<PlayerId>,
}

/// Messages a client sends to the game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    CreateSession {
        player_name: String,
    },
    JoinSession {
        session_id: String,
        player_name: String,
    },
    StartGame {
        session_id: String,
    },
    SubmitGuess {
        session_id: String,
        target_player_id: PlayerId,
    },
}

/// Messages pushed by the game server, in no particular request/response pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerMessage {
    SessionState(SessionSnapshot),
    PlayerJoined {
        player: Player,
    },
    GameStarted {
        round: u32,
    },
    GuessResult {
        correct: bool,
        accuser: String,
        target: String,
    },
    RoundEnded {
        round: u32,
        players: Vec<Player>,
    },
    GameEnded {
        winner: Player,
    },
    Error {
        message: String,
    },
}

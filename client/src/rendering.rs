//! Text rendering of the lobby, the board, final standings and the rules.
//!
//! Every function returns a `String`; printing is left to the caller.

use crate::connection::{ConnectionState, ConnectionStatus};
use crate::game::SessionView;
use crate::profile;
use shared::{Player, Role};
use std::fmt::Write;

/// Picks the screen for the current state of the session.
pub fn screen(view: &SessionView) -> String {
    if view.ended {
        standings(view)
    } else if view.started {
        board(view)
    } else {
        lobby(view)
    }
}

pub fn lobby(view: &SessionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Game Lobby ==");
    if let Some(id) = &view.session_id {
        let _ = writeln!(out, "Game id: {}", id);
    }
    for player in &view.players {
        let you = if Some(&player.id) == view.me.as_ref() {
            " (You)"
        } else {
            ""
        };
        let _ = writeln!(out, "  - {}{}  Ready", player.name, you);
    }

    match view.missing_players() {
        0 => {
            let _ = writeln!(out, "All players are here. Type `start` to begin.");
        }
        n => {
            let _ = writeln!(out, "Waiting for {} more players...", n);
        }
    }
    out
}

/// The role card as its holder sees it.
pub fn role_card(role: Option<Role>) -> String {
    match role {
        Some(role) => format!("[ {} | Points: {} ]", role, role.points()),
        None => "[ ? ]".to_string(),
    }
}

fn player_line(index: usize, player: &Player, view: &SessionView) -> String {
    let is_me = Some(&player.id) == view.me.as_ref();
    let role = match player.role {
        Some(role) if player.revealed || is_me => format!(" [{}]", role),
        _ => String::new(),
    };
    let you = if is_me { " (You)" } else { "" };
    format!(
        "  {}. {}{}{} - {} pts",
        index + 1,
        player.name,
        you,
        role,
        player.score
    )
}

pub fn board(view: &SessionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Round {} of {} ==", view.round, view.total_rounds);

    let public: Vec<String> = [Role::Raja, Role::Sipahi]
        .into_iter()
        .filter_map(|role| {
            view.holder_of(role)
                .filter(|p| p.revealed)
                .map(|p| format!("{}: {}", role, p.name))
        })
        .collect();
    if !public.is_empty() {
        let _ = writeln!(out, "Revealed roles: {}", public.join(", "));
    }

    let _ = writeln!(out, "Your role: {}", role_card(view.my_role()));
    let _ = writeln!(out, "Players:");
    for (i, player) in view.players.iter().enumerate() {
        let _ = writeln!(out, "{}", player_line(i, player, view));
    }

    if view.all_revealed() {
        if view.round < view.total_rounds {
            let _ = writeln!(
                out,
                "Round {} has ended. Next round will start soon...",
                view.round
            );
        }
    } else if view.my_role() == Some(Role::Sipahi) {
        let _ = writeln!(
            out,
            "Find the Chor: type `guess <number>` to accuse a player."
        );
    }
    out
}

pub fn standings(view: &SessionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== Game Over! ==");
    if let Some(winner) = view.leader() {
        let _ = writeln!(out, "{} wins with {} points!", winner.name, winner.score);
    }
    for (i, player) in view.standings().iter().enumerate() {
        let _ = writeln!(out, "  {}. {} - {} pts", i + 1, player.name, player.score);
    }
    out
}

pub fn status_line(status: &ConnectionStatus) -> String {
    let endpoint = status.endpoint.as_deref().unwrap_or("-");
    let mut line = match status.state {
        ConnectionState::Connected => format!("Connected to {}", endpoint),
        ConnectionState::Connecting => format!(
            "Connecting to {} (attempt {}/{})",
            endpoint,
            status.attempts + 1,
            status.max_attempts
        ),
        ConnectionState::Disconnected => "Disconnected".to_string(),
        ConnectionState::Failed => format!(
            "Offline: gave up after {} attempts (type `retry` or `offline`)",
            status.attempts
        ),
    };
    let _ = write!(line, " [server #{}]", status.endpoint_index + 1);
    if let Some(session_id) = &status.session_id {
        let _ = write!(line, ", game {}", session_id);
    }
    line
}

pub fn invite(base: &str, session_id: &str) -> String {
    format!(
        "Invite friends with: {}",
        profile::invite_link(base, session_id)
    )
}

pub fn rules() -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== How to Play ==");
    let _ = writeln!(
        out,
        "Raja Mantri Chor Sipahi is a traditional Indian guessing game where players are\n\
         assigned secret roles, and the Sipahi must identify who has the role of Chor."
    );
    let _ = writeln!(out, "Roles & Points:");
    let _ = writeln!(out, "  Raja    {} points", Role::Raja.points());
    let _ = writeln!(out, "  Mantri  {} points", Role::Mantri.points());
    let _ = writeln!(
        out,
        "  Chor    {} points (or {} if not caught)",
        Role::Chor.points(),
        Role::Sipahi.points()
    );
    let _ = writeln!(out, "  Sipahi  {} points (if correct)", Role::Sipahi.points());
    let _ = writeln!(out, "Game Rules:");
    let _ = writeln!(out, "  1. At the beginning of each round, players are randomly assigned roles.");
    let _ = writeln!(out, "  2. Raja and Sipahi roles are revealed to all players.");
    let _ = writeln!(out, "  3. Mantri and Chor remain hidden.");
    let _ = writeln!(out, "  4. The Sipahi must guess which player has been assigned the Chor role.");
    let _ = writeln!(out, "  5. A correct guess keeps the Sipahi's points; a wrong one hands them to the Chor.");
    let _ = writeln!(
        out,
        "  6. After {} rounds, the player with the highest score wins.",
        shared::TOTAL_ROUNDS
    );
    out
}

pub fn help() -> String {
    [
        "Commands:",
        "  name <name>        set your display name",
        "  create             create a new game",
        "  join <id|link>     join a game by id or invite link",
        "  start              start the game (needs 4 players)",
        "  guess <player>     as Sipahi, accuse a player by id, list number or name",
        "  next               go to the next round (offline)",
        "  status             show connection status and invite link",
        "  retry              reconnect from the first server",
        "  offline            play locally against placeholder players",
        "  reset              leave the game and return to the lobby",
        "  rules              show the rules",
        "  quit               leave",
    ]
    .join("\n")
}

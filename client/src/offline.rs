//! Local fallback game: the player against three placeholder seats, run on
//! the same rules the server uses.

use crate::game::SessionView;
use crate::notice::Notice;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use shared::{GameSession, GuessOutcome, PlayerId, Role, RoundAdvance, RuleError};

pub const OFFLINE_SESSION_ID: &str = "offline";
pub const BOT_NAMES: [&str; 3] = ["Player 2", "Player 3", "Player 4"];

pub struct OfflineGame<R: Rng = StdRng> {
    session: GameSession,
    me: PlayerId,
    name: String,
    rng: R,
}

impl OfflineGame<StdRng> {
    pub fn new(name: &str) -> Result<Self, RuleError> {
        Self::with_rng(name, StdRng::from_entropy())
    }
}

impl<R: Rng> OfflineGame<R> {
    pub fn with_rng(name: &str, rng: R) -> Result<Self, RuleError> {
        let (session, me) = Self::seat(name)?;
        Ok(Self {
            session,
            me,
            name: name.trim().to_string(),
            rng,
        })
    }

    fn seat(name: &str) -> Result<(GameSession, PlayerId), RuleError> {
        let mut session = GameSession::new(OFFLINE_SESSION_ID);
        let me = session.add_player(name)?;
        for bot in BOT_NAMES {
            session.add_player(bot)?;
        }
        Ok((session, me))
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    pub fn me(&self) -> &PlayerId {
        &self.me
    }

    /// What the local player is allowed to see.
    pub fn view(&self) -> SessionView {
        let mut view = SessionView::from_snapshot(self.session.snapshot(Some(&self.me)));
        if self.session.is_ended() {
            view.winner = self.session.winner().cloned();
        }
        view
    }

    pub fn start(&mut self) -> Result<Vec<Notice>, RuleError> {
        self.session.start(&mut self.rng)?;
        info!("Offline game started");
        let mut notices = vec![Notice::success("Game started! Roles have been distributed.")];
        notices.extend(self.role_notice());
        Ok(notices)
    }

    fn role_notice(&self) -> Option<Notice> {
        let role = self.session.player(&self.me)?.role?;
        Some(Notice::info(format!(
            "Round {}: you are the {} ({} points)",
            self.session.round(),
            role,
            role.points()
        )))
    }

    /// True while a placeholder seat holds the Sipahi and still has to guess.
    pub fn bot_to_guess(&self) -> bool {
        self.session.phase() == shared::RoundPhase::Guessing
            && self
                .session
                .holder_of(Role::Sipahi)
                .map_or(false, |p| p.id != self.me)
    }

    /// The local player, as Sipahi, accuses `target`.
    pub fn guess(&mut self, target: &PlayerId) -> Result<Vec<Notice>, RuleError> {
        let me = self.me.clone();
        let outcome = self.session.submit_guess(&me, target)?;
        Ok(vec![Self::outcome_notice(&outcome)])
    }

    /// A placeholder Sipahi accuses one of the other three seats at random.
    pub fn bot_turn(&mut self) -> Result<Vec<Notice>, RuleError> {
        let sipahi = self
            .session
            .holder_of(Role::Sipahi)
            .map(|p| p.id.clone())
            .ok_or(RuleError::IncompleteRoles)?;
        if sipahi == self.me {
            return Err(RuleError::NotInProgress);
        }

        let candidates: Vec<PlayerId> = self
            .session
            .players()
            .iter()
            .filter(|p| p.id != sipahi)
            .map(|p| p.id.clone())
            .collect();
        let target = candidates
            .choose(&mut self.rng)
            .cloned()
            .ok_or(RuleError::IncompleteRoles)?;

        let outcome = self.session.submit_guess(&sipahi, &target)?;
        Ok(vec![
            Notice::info(format!(
                "{} (Sipahi) accuses {}",
                outcome.accuser, outcome.target
            )),
            Self::outcome_notice(&outcome),
        ])
    }

    fn outcome_notice(outcome: &GuessOutcome) -> Notice {
        if outcome.correct {
            Notice::success(format!(
                "Correct! {} correctly identified {} as the Chor!",
                outcome.accuser, outcome.chor
            ))
        } else {
            Notice::error(format!(
                "Wrong guess! {} was the Chor and gets the Sipahi's points!",
                outcome.chor
            ))
        }
    }

    /// Deals the next round or finishes the game.
    pub fn next_round(&mut self) -> Result<Vec<Notice>, RuleError> {
        match self.session.advance_round(&mut self.rng)? {
            RoundAdvance::NextRound(round) => {
                let mut notices = vec![Notice::success(format!("Round {} begins!", round))];
                notices.extend(self.role_notice());
                Ok(notices)
            }
            RoundAdvance::Finished { winner } => Ok(vec![Notice::success(format!(
                "Game over! {} wins with {} points!",
                winner.name, winner.score
            ))]),
        }
    }

    /// Back to a fresh lobby with the same four seats.
    pub fn reset(&mut self) -> Result<Vec<Notice>, RuleError> {
        let (session, me) = Self::seat(&self.name)?;
        self.session = session;
        self.me = me;
        Ok(vec![Notice::success("Game has been reset.")])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{RoundPhase, ROUND_POINTS, TOTAL_ROUNDS};

    fn game(seed: u64) -> OfflineGame<StdRng> {
        OfflineGame::with_rng("Asha", StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn test_seats_placeholders() {
        let game = game(1);
        let names: Vec<&str> = game
            .session()
            .players()
            .iter()
            .map(|p| p.name.as_str())
            .collect();
        assert_eq!(names, vec!["Asha", "Player 2", "Player 3", "Player 4"]);
        assert_eq!(game.me(), &PlayerId::from("1"));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(matches!(
            OfflineGame::with_rng(" ", StdRng::seed_from_u64(1)),
            Err(RuleError::EmptyName)
        ));
    }

    #[test]
    fn test_start_tells_player_their_role() {
        let mut game = game(2);
        let notices = game.start().unwrap();
        assert_eq!(notices.len(), 2);
        assert!(notices[1].message.starts_with("Round 1: you are the"));
    }

    #[test]
    fn test_view_hides_other_secret_roles() {
        let mut game = game(3);
        game.start().unwrap();
        let view = game.view();

        assert!(view.my_role().is_some());
        for player in &view.players {
            if Some(&player.id) != view.me.as_ref() && !player.revealed {
                assert_eq!(player.role, None);
            }
        }
        assert!(view.holder_of(Role::Raja).is_some());
        assert!(view.holder_of(Role::Sipahi).is_some());
    }

    #[test]
    fn test_full_offline_game() {
        let mut game = game(4);
        game.start().unwrap();

        for round in 1..=TOTAL_ROUNDS {
            assert_eq!(game.session().round(), round);
            let before: u32 = game.session().players().iter().map(|p| p.score).sum();

            if game.bot_to_guess() {
                assert_eq!(game.bot_turn().unwrap().len(), 2);
            } else {
                let target = game
                    .session()
                    .players()
                    .iter()
                    .find(|p| &p.id != game.me())
                    .unwrap()
                    .id
                    .clone();
                game.guess(&target).unwrap();
            }

            let after: u32 = game.session().players().iter().map(|p| p.score).sum();
            assert_eq!(after - before, ROUND_POINTS);
            assert_eq!(game.session().phase(), RoundPhase::Revealed);
            assert!(!game.bot_to_guess());
            game.next_round().unwrap();
        }

        assert!(game.session().is_ended());
        let view = game.view();
        assert!(view.ended);
        let winner = view.leader().unwrap();
        assert!(view.players.iter().all(|p| winner.score >= p.score));
    }

    #[test]
    fn test_bot_turn_refused_when_player_is_sipahi() {
        // Find a seed that deals the Sipahi card to the local player.
        let mut game = (0..200)
            .map(|seed| {
                let mut g = game(seed);
                g.start().unwrap();
                g
            })
            .find(|g| !g.bot_to_guess())
            .expect("some seed deals the Sipahi to the local player");

        assert_eq!(game.bot_turn(), Err(RuleError::NotInProgress));
        let me = game.me().clone();
        assert_eq!(game.guess(&me), Err(RuleError::SelfGuess));
    }

    #[test]
    fn test_reset_returns_to_lobby() {
        let mut game = game(5);
        game.start().unwrap();
        game.reset().unwrap();

        assert!(!game.session().is_started());
        assert_eq!(game.session().players().len(), 4);
        assert!(game.session().players().iter().all(|p| p.score == 0));
    }
}

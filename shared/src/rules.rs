//! Round rules: dealing roles, scoring the Sipahi's guess, advancing rounds
//! and picking the winner.
//!
//! The same [`GameSession`] drives the client's offline mode and is what a
//! server implementation is expected to run authoritatively.

use crate::{Player, PlayerId, Role, SessionSnapshot, PLAYERS_PER_GAME, TOTAL_ROUNDS};
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("player name must not be empty")]
    EmptyName,
    #[error("the game already has {max} players", max = PLAYERS_PER_GAME)]
    SessionFull,
    #[error("need exactly {need} players to play, have {0}", need = PLAYERS_PER_GAME)]
    NotEnoughPlayers(usize),
    #[error("the game has already started")]
    AlreadyStarted,
    #[error("the game is not in progress")]
    NotInProgress,
    #[error("you cannot guess yourself")]
    SelfGuess,
    #[error("unknown player {0}")]
    UnknownPlayer(PlayerId),
    #[error("only the Sipahi may accuse a player")]
    NotSipahi,
    #[error("missing players or roles for this round")]
    IncompleteRoles,
    #[error("round {0} has already been scored")]
    AlreadyScored(u32),
    #[error("round {0} has not been scored yet")]
    NotScored(u32),
}

/// Which player holds each role this round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    holders: [PlayerId; 4],
}

impl RoleAssignment {
    /// Builds the assignment from the players' current roles.
    ///
    /// Only defined for exactly four players holding four distinct roles;
    /// anything else is [`RuleError::IncompleteRoles`].
    pub fn from_players(players: &[Player]) -> Result<Self, RuleError> {
        if players.len() != PLAYERS_PER_GAME {
            return Err(RuleError::IncompleteRoles);
        }

        let mut slots: [Option<PlayerId>; 4] = Default::default();
        for player in players {
            let role = player.role.ok_or(RuleError::IncompleteRoles)?;
            let slot = &mut slots[role.index()];
            if slot.is_some() {
                return Err(RuleError::IncompleteRoles);
            }
            *slot = Some(player.id.clone());
        }

        let [raja, mantri, chor, sipahi] = slots;
        match (raja, mantri, chor, sipahi) {
            (Some(raja), Some(mantri), Some(chor), Some(sipahi)) => Ok(Self {
                holders: [raja, mantri, chor, sipahi],
            }),
            _ => Err(RuleError::IncompleteRoles),
        }
    }

    pub fn holder(&self, role: Role) -> &PlayerId {
        &self.holders[role.index()]
    }

    pub fn role_of(&self, player: &PlayerId) -> Option<Role> {
        Role::ALL
            .into_iter()
            .find(|role| self.holder(*role) == player)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Award {
    pub player: PlayerId,
    pub role: Role,
    pub points: u32,
}

/// Per-player point deltas for one scored round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundScore {
    pub correct: bool,
    pub awards: Vec<Award>,
}

impl RoundScore {
    pub fn total(&self) -> u32 {
        self.awards.iter().map(|a| a.points).sum()
    }

    pub fn points_for(&self, player: &PlayerId) -> u32 {
        self.awards
            .iter()
            .find(|a| &a.player == player)
            .map(|a| a.points)
            .unwrap_or(0)
    }
}

/// Award for a role given whether the Sipahi caught the Chor. A missed guess
/// moves the Sipahi's points to the Chor.
fn award(role: Role, correct: bool) -> u32 {
    match role {
        Role::Raja | Role::Mantri => role.points(),
        Role::Sipahi if correct => role.points(),
        Role::Sipahi => 0,
        Role::Chor if correct => role.points(),
        Role::Chor => Role::Sipahi.points(),
    }
}

/// Scores `guesser` accusing `target` of being the Chor.
pub fn score_round(
    assignment: &RoleAssignment,
    guesser: &PlayerId,
    target: &PlayerId,
) -> Result<RoundScore, RuleError> {
    if guesser == target {
        return Err(RuleError::SelfGuess);
    }
    if assignment.holder(Role::Sipahi) != guesser {
        return Err(RuleError::NotSipahi);
    }
    let accused = assignment
        .role_of(target)
        .ok_or_else(|| RuleError::UnknownPlayer(target.clone()))?;

    let correct = accused == Role::Chor;
    let awards = Role::ALL
        .into_iter()
        .map(|role| Award {
            player: assignment.holder(role).clone(),
            role,
            points: award(role, correct),
        })
        .collect();

    Ok(RoundScore { correct, awards })
}

/// Uniform permutation of the four roles (Fisher-Yates).
pub fn shuffle_roles<R: Rng + ?Sized>(rng: &mut R) -> [Role; 4] {
    let mut roles = Role::ALL;
    for i in (1..roles.len()).rev() {
        let j = rng.gen_range(0..=i);
        roles.swap(i, j);
    }
    roles
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Lobby,
    /// Roles are dealt and the Sipahi has not guessed yet.
    Guessing,
    /// The guess is scored and every role is visible.
    Revealed,
    Ended,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessOutcome {
    pub round: u32,
    pub correct: bool,
    pub accuser: String,
    pub target: String,
    pub chor: String,
    pub score: RoundScore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundAdvance {
    NextRound(u32),
    Finished { winner: Player },
}

#[derive(Debug, Clone)]
pub struct GameSession {
    pub session_id: String,
    players: Vec<Player>,
    round: u32,
    total_rounds: u32,
    phase: RoundPhase,
    next_player_id: u32,
}

impl GameSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            players: Vec::new(),
            round: 0,
            total_rounds: TOTAL_ROUNDS,
            phase: RoundPhase::Lobby,
            next_player_id: 1,
        }
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn holder_of(&self, role: Role) -> Option<&Player> {
        self.players.iter().find(|p| p.role == Some(role))
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn total_rounds(&self) -> u32 {
        self.total_rounds
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn is_started(&self) -> bool {
        self.phase != RoundPhase::Lobby
    }

    pub fn is_ended(&self) -> bool {
        self.phase == RoundPhase::Ended
    }

    /// Seats a new player in the lobby and returns their id.
    pub fn add_player(&mut self, name: &str) -> Result<PlayerId, RuleError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RuleError::EmptyName);
        }
        if self.phase != RoundPhase::Lobby {
            return Err(RuleError::AlreadyStarted);
        }
        if self.players.len() >= PLAYERS_PER_GAME {
            return Err(RuleError::SessionFull);
        }

        let id = PlayerId(self.next_player_id.to_string());
        self.next_player_id += 1;
        self.players.push(Player::new(id.clone(), name));
        Ok(id)
    }

    /// Starts round 1 and deals the first roles.
    pub fn start<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), RuleError> {
        if self.phase != RoundPhase::Lobby {
            return Err(RuleError::AlreadyStarted);
        }
        if self.players.len() != PLAYERS_PER_GAME {
            return Err(RuleError::NotEnoughPlayers(self.players.len()));
        }

        self.round = 1;
        self.distribute_roles(rng)
    }

    /// Deals a fresh permutation of the four roles. Raja and Sipahi are
    /// revealed straight away; Mantri and Chor stay hidden until the guess.
    pub fn distribute_roles<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<(), RuleError> {
        if self.players.len() != PLAYERS_PER_GAME {
            return Err(RuleError::NotEnoughPlayers(self.players.len()));
        }

        let roles = shuffle_roles(rng);
        for (player, role) in self.players.iter_mut().zip(roles) {
            player.role = Some(role);
            player.revealed = role.is_public();
        }
        self.phase = RoundPhase::Guessing;
        Ok(())
    }

    /// Applies the Sipahi's accusation. On any error nothing changes.
    pub fn submit_guess(
        &mut self,
        guesser: &PlayerId,
        target: &PlayerId,
    ) -> Result<GuessOutcome, RuleError> {
        match self.phase {
            RoundPhase::Guessing => {}
            RoundPhase::Revealed => return Err(RuleError::AlreadyScored(self.round)),
            RoundPhase::Lobby | RoundPhase::Ended => return Err(RuleError::NotInProgress),
        }
        if guesser == target {
            return Err(RuleError::SelfGuess);
        }
        if self.player(target).is_none() {
            return Err(RuleError::UnknownPlayer(target.clone()));
        }

        let assignment = RoleAssignment::from_players(&self.players)?;
        let score = score_round(&assignment, guesser, target)?;

        for player in &mut self.players {
            player.score += score.points_for(&player.id);
            player.revealed = true;
        }
        self.phase = RoundPhase::Revealed;

        let name_of = |id: &PlayerId| {
            self.player(id)
                .map(|p| p.name.clone())
                .unwrap_or_else(|| id.to_string())
        };

        Ok(GuessOutcome {
            round: self.round,
            correct: score.correct,
            accuser: name_of(guesser),
            target: name_of(target),
            chor: name_of(assignment.holder(Role::Chor)),
            score,
        })
    }

    /// Moves past a scored round: deals the next round, or ends the game
    /// after the last one.
    pub fn advance_round<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<RoundAdvance, RuleError> {
        match self.phase {
            RoundPhase::Revealed => {}
            RoundPhase::Guessing => return Err(RuleError::NotScored(self.round)),
            RoundPhase::Lobby | RoundPhase::Ended => return Err(RuleError::NotInProgress),
        }

        if self.round < self.total_rounds {
            self.round += 1;
            for player in &mut self.players {
                player.role = None;
                player.revealed = false;
            }
            self.distribute_roles(rng)?;
            return Ok(RoundAdvance::NextRound(self.round));
        }

        self.phase = RoundPhase::Ended;
        let winner = self.winner().cloned().ok_or(RuleError::IncompleteRoles)?;
        Ok(RoundAdvance::Finished { winner })
    }

    /// Highest score wins; ties go to whoever was seated first.
    pub fn winner(&self) -> Option<&Player> {
        self.players.iter().fold(None, |best: Option<&Player>, p| match best {
            Some(b) if b.score >= p.score => Some(b),
            _ => Some(p),
        })
    }

    /// Players by descending score, seat order within ties.
    pub fn standings(&self) -> Vec<&Player> {
        let mut ranked: Vec<&Player> = self.players.iter().collect();
        ranked.sort_by(|a, b| b.score.cmp(&a.score));
        ranked
    }

    /// Clears the table back to an empty lobby.
    pub fn reset(&mut self) {
        self.players.clear();
        self.round = 0;
        self.phase = RoundPhase::Lobby;
        self.next_player_id = 1;
    }

    /// Snapshot as seen by `viewer`: hidden roles of other players are masked.
    pub fn snapshot(&self, viewer: Option<&PlayerId>) -> SessionSnapshot {
        let players = self
            .players
            .iter()
            .map(|p| {
                let mut p = p.clone();
                if !p.revealed && Some(&p.id) != viewer {
                    p.role = None;
                }
                p
            })
            .collect();

        SessionSnapshot {
            session_id: self.session_id.clone(),
            players,
            round: self.round,
            total_rounds: self.total_rounds,
            started: self.is_started(),
            ended: self.is_ended(),
            your_id: viewer.cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ROUND_POINTS;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn id(s: &str) -> PlayerId {
        PlayerId::from(s)
    }

    /// P1..P4 holding Raja, Mantri, Chor, Sipahi.
    fn dealt_session() -> GameSession {
        let mut session = GameSession::new("test");
        for name in ["P1", "P2", "P3", "P4"] {
            session.add_player(name).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(1);
        session.start(&mut rng).unwrap();
        for (player, role) in session.players.iter_mut().zip(Role::ALL) {
            player.role = Some(role);
            player.revealed = role.is_public();
        }
        session
    }

    fn scores(session: &GameSession) -> Vec<u32> {
        session.players().iter().map(|p| p.score).collect()
    }

    #[test]
    fn test_correct_guess_scores() {
        let mut session = dealt_session();
        let outcome = session.submit_guess(&id("4"), &id("3")).unwrap();

        assert!(outcome.correct);
        assert_eq!(outcome.accuser, "P4");
        assert_eq!(outcome.target, "P3");
        assert_eq!(outcome.chor, "P3");
        assert_eq!(outcome.score.total(), ROUND_POINTS);
        assert_eq!(scores(&session), vec![800, 900, 0, 1000]);
    }

    #[test]
    fn test_wrong_guess_moves_sipahi_points_to_chor() {
        let mut session = dealt_session();
        let outcome = session.submit_guess(&id("4"), &id("1")).unwrap();

        assert!(!outcome.correct);
        assert_eq!(outcome.chor, "P3");
        assert_eq!(outcome.score.total(), ROUND_POINTS);
        assert_eq!(scores(&session), vec![800, 900, 1000, 0]);
    }

    #[test]
    fn test_scored_round_reveals_everyone() {
        let mut session = dealt_session();
        assert!(!session.players().iter().all(|p| p.revealed));

        session.submit_guess(&id("4"), &id("2")).unwrap();
        assert!(session.players().iter().all(|p| p.revealed));
        assert_eq!(session.phase(), RoundPhase::Revealed);
    }

    #[test]
    fn test_self_guess_changes_nothing() {
        let mut session = dealt_session();
        let before: Vec<Player> = session.players().to_vec();

        assert_eq!(
            session.submit_guess(&id("4"), &id("4")),
            Err(RuleError::SelfGuess)
        );
        assert_eq!(session.players(), before.as_slice());
        assert_eq!(session.phase(), RoundPhase::Guessing);
    }

    #[test]
    fn test_only_sipahi_may_guess() {
        let mut session = dealt_session();
        assert_eq!(
            session.submit_guess(&id("1"), &id("3")),
            Err(RuleError::NotSipahi)
        );
        assert_eq!(scores(&session), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_unknown_target_rejected() {
        let mut session = dealt_session();
        assert_eq!(
            session.submit_guess(&id("4"), &id("9")),
            Err(RuleError::UnknownPlayer(id("9")))
        );
    }

    #[test]
    fn test_missing_role_holder_aborts_guess() {
        let mut session = dealt_session();
        session.players[2].role = None;
        assert_eq!(
            session.submit_guess(&id("4"), &id("1")),
            Err(RuleError::IncompleteRoles)
        );
        assert_eq!(scores(&session), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_second_guess_in_same_round_rejected() {
        let mut session = dealt_session();
        session.submit_guess(&id("4"), &id("3")).unwrap();
        assert_eq!(
            session.submit_guess(&id("4"), &id("3")),
            Err(RuleError::AlreadyScored(1))
        );
        assert_eq!(scores(&session), vec![800, 900, 0, 1000]);
    }

    #[test]
    fn test_assignment_requires_distinct_roles() {
        let mut players: Vec<Player> = (1..=4)
            .map(|i| Player::new(i.to_string(), format!("P{}", i)))
            .collect();
        let roles = [Role::Raja, Role::Raja, Role::Chor, Role::Sipahi];
        for (p, role) in players.iter_mut().zip(roles) {
            p.role = Some(role);
        }
        assert_eq!(
            RoleAssignment::from_players(&players),
            Err(RuleError::IncompleteRoles)
        );

        players[1].role = Some(Role::Mantri);
        let assignment = RoleAssignment::from_players(&players).unwrap();
        assert_eq!(assignment.holder(Role::Mantri), &id("2"));
        assert_eq!(assignment.role_of(&id("4")), Some(Role::Sipahi));
    }

    #[test]
    fn test_assignment_requires_four_players() {
        let mut players = vec![Player::new("1", "a"), Player::new("2", "b")];
        players[0].role = Some(Role::Raja);
        players[1].role = Some(Role::Sipahi);
        assert_eq!(
            RoleAssignment::from_players(&players),
            Err(RuleError::IncompleteRoles)
        );
    }

    #[test]
    fn test_shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let roles = shuffle_roles(&mut rng);
            let distinct: HashSet<Role> = roles.iter().copied().collect();
            assert_eq!(distinct.len(), 4);
        }
    }

    #[test]
    fn test_distribution_is_a_bijection() {
        let mut session = dealt_session();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            session.distribute_roles(&mut rng).unwrap();
            let assignment = RoleAssignment::from_players(session.players()).unwrap();
            let holders: HashSet<&PlayerId> =
                Role::ALL.iter().map(|r| assignment.holder(*r)).collect();
            assert_eq!(holders.len(), 4);
            for player in session.players() {
                let role = player.role.unwrap();
                assert_eq!(player.revealed, role.is_public());
            }
        }
    }

    #[test]
    fn test_round_advances_with_fresh_roles() {
        let mut session = dealt_session();
        let mut rng = StdRng::seed_from_u64(3);
        session.submit_guess(&id("4"), &id("3")).unwrap();

        assert_eq!(
            session.advance_round(&mut rng),
            Ok(RoundAdvance::NextRound(2))
        );
        assert_eq!(session.round(), 2);
        assert_eq!(session.phase(), RoundPhase::Guessing);
        assert!(RoleAssignment::from_players(session.players()).is_ok());
        assert_eq!(scores(&session), vec![800, 900, 0, 1000]);
    }

    #[test]
    fn test_cannot_advance_before_guess() {
        let mut session = dealt_session();
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(session.advance_round(&mut rng), Err(RuleError::NotScored(1)));
    }

    #[test]
    fn test_full_game_ends_after_seven_rounds() {
        let mut session = dealt_session();
        let mut rng = StdRng::seed_from_u64(5);

        let mut finished = None;
        for expected_round in 1..=TOTAL_ROUNDS {
            assert_eq!(session.round(), expected_round);
            let sipahi = session.holder_of(Role::Sipahi).unwrap().id.clone();
            let other = session
                .players()
                .iter()
                .find(|p| p.id != sipahi)
                .unwrap()
                .id
                .clone();
            session.submit_guess(&sipahi, &other).unwrap();

            match session.advance_round(&mut rng).unwrap() {
                RoundAdvance::NextRound(n) => assert_eq!(n, expected_round + 1),
                RoundAdvance::Finished { winner } => finished = Some(winner),
            }
        }

        let winner = finished.expect("game should finish after the last round");
        assert!(session.is_ended());
        assert_eq!(session.round(), TOTAL_ROUNDS);
        assert!(session.players().iter().all(|p| winner.score >= p.score));

        let total: u32 = session.players().iter().map(|p| p.score).sum();
        assert_eq!(total, ROUND_POINTS * TOTAL_ROUNDS);
        assert_eq!(session.advance_round(&mut rng), Err(RuleError::NotInProgress));
    }

    #[test]
    fn test_winner_tie_goes_to_first_seat() {
        let mut session = dealt_session();
        session.players[1].score = 1700;
        session.players[3].score = 1700;
        assert_eq!(session.winner().unwrap().name, "P2");

        let standings: Vec<&str> = session.standings().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(standings, vec!["P2", "P4", "P1", "P3"]);
    }

    #[test]
    fn test_lobby_rules() {
        let mut session = GameSession::new("lobby");
        assert_eq!(session.add_player("   "), Err(RuleError::EmptyName));

        for name in ["A", "B", "C"] {
            session.add_player(name).unwrap();
        }
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(session.start(&mut rng), Err(RuleError::NotEnoughPlayers(3)));

        assert_eq!(session.add_player(" D "), Ok(id("4")));
        assert_eq!(session.player(&id("4")).unwrap().name, "D");
        assert_eq!(session.add_player("E"), Err(RuleError::SessionFull));

        session.start(&mut rng).unwrap();
        assert_eq!(session.round(), 1);
        assert_eq!(session.start(&mut rng), Err(RuleError::AlreadyStarted));
    }

    #[test]
    fn test_reset_empties_the_table() {
        let mut session = dealt_session();
        session.reset();
        assert!(session.players().is_empty());
        assert_eq!(session.round(), 0);
        assert!(!session.is_started());
        assert_eq!(session.add_player("Z"), Ok(id("1")));
    }

    #[test]
    fn test_snapshot_masks_hidden_roles() {
        let session = dealt_session();
        let snapshot = session.snapshot(Some(&id("2")));

        let roles: Vec<Option<Role>> = snapshot.players.iter().map(|p| p.role).collect();
        // Raja and Sipahi are public, the viewer sees their own Mantri card.
        assert_eq!(
            roles,
            vec![Some(Role::Raja), Some(Role::Mantri), None, Some(Role::Sipahi)]
        );
        assert_eq!(snapshot.your_id, Some(id("2")));
        assert!(snapshot.started);
        assert!(!snapshot.ended);
    }
}

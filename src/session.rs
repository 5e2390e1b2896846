//! The whole tracker state: players, their games and the active player.
//!
//! Each player's game list keeps the current game at index 0; everything
//! after it is history and read-only except for deletion and summaries.

use crate::action::Action;
use crate::ledger::{CounterOverflow, StatLedger};
use crate::models::{
    Game, GameInfoUpdate, GameView, HistoryItem, LogEntry, Player, SessionView, Stats,
};
use crate::stats::{build_stat_line, points};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("player {0} not found")]
    PlayerNotFound(Uuid),
    #[error("game {0} not found")]
    GameNotFound(Uuid),
    #[error("log entry {0} not found")]
    EntryNotFound(Uuid),
    #[error("player name cannot be empty")]
    EmptyPlayerName,
    #[error("no stats recorded for this game")]
    EmptyLog,
    #[error(transparent)]
    CounterOverflow(#[from] CounterOverflow),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub players: Vec<Player>,
    pub active_player_id: Uuid,
    pub player_games: BTreeMap<Uuid, Vec<Game>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new_default()
    }
}

impl Session {
    pub fn new_default() -> Self {
        let player = Player::new("Player 1", None);
        let mut player_games = BTreeMap::new();
        player_games.insert(player.id, vec![Game::new()]);
        Self {
            active_player_id: player.id,
            players: vec![player],
            player_games,
        }
    }

    /// Restores the invariants a stored record may have lost: at least one
    /// player, a valid active player, a game per player and ledgers whose
    /// counters match their logs.
    pub fn normalize(&mut self) {
        if self.players.is_empty() {
            *self = Self::new_default();
            return;
        }
        if !self.players.iter().any(|p| p.id == self.active_player_id) {
            self.active_player_id = self.players[0].id;
        }
        let known: Vec<Uuid> = self.players.iter().map(|p| p.id).collect();
        self.player_games.retain(|id, _| known.contains(id));
        for id in known {
            let games = self.player_games.entry(id).or_default();
            if games.is_empty() {
                games.push(Game::new());
            }
            for game in games.iter_mut() {
                if !game.ledger.is_consistent() {
                    warn!(game = %game.id, "stored counters drifted from the log, rebuilding");
                    let logged = game.ledger.log().len();
                    game.ledger = StatLedger::rebuild(game.ledger.log().clone());
                    let dropped = logged - game.ledger.log().len();
                    if dropped > 0 {
                        warn!(game = %game.id, dropped, "dropped log entries out of counter range");
                    }
                }
            }
        }
    }

    pub fn active_player(&self) -> &Player {
        self.players
            .iter()
            .find(|p| p.id == self.active_player_id)
            .unwrap_or(&self.players[0])
    }

    fn games_mut(&mut self) -> &mut Vec<Game> {
        let games = self.player_games.entry(self.active_player_id).or_default();
        if games.is_empty() {
            games.push(Game::new());
        }
        games
    }

    pub fn games(&self) -> &[Game] {
        self.player_games
            .get(&self.active_player_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn current_game(&self) -> Option<&Game> {
        self.games().first()
    }

    pub fn current_game_mut(&mut self) -> &mut Game {
        &mut self.games_mut()[0]
    }

    pub fn find_game(&self, player_id: Uuid, game_id: Uuid) -> Result<&Game, SessionError> {
        self.player_games
            .get(&player_id)
            .ok_or(SessionError::PlayerNotFound(player_id))?
            .iter()
            .find(|game| game.id == game_id)
            .ok_or(SessionError::GameNotFound(game_id))
    }

    fn find_game_mut(&mut self, player_id: Uuid, game_id: Uuid) -> Result<&mut Game, SessionError> {
        self.player_games
            .get_mut(&player_id)
            .ok_or(SessionError::PlayerNotFound(player_id))?
            .iter_mut()
            .find(|game| game.id == game_id)
            .ok_or(SessionError::GameNotFound(game_id))
    }

    pub fn record(&mut self, action: Action) -> Result<LogEntry, SessionError> {
        Ok(self.current_game_mut().ledger.record(action)?)
    }

    pub fn apply(
        &mut self,
        action_text: impl Into<String>,
        delta: Stats,
    ) -> Result<LogEntry, SessionError> {
        Ok(self.current_game_mut().ledger.apply(action_text, delta)?)
    }

    pub fn undo(&mut self, entry_id: Uuid) -> Result<LogEntry, SessionError> {
        self.current_game_mut()
            .ledger
            .undo(entry_id)
            .ok_or(SessionError::EntryNotFound(entry_id))
    }

    /// Clears counters, log and summary. Identity, opponent and date stay.
    pub fn reset_current_game(&mut self) {
        let game = self.current_game_mut();
        game.ledger.reset();
        game.summary.clear();
    }

    pub fn start_new_game(&mut self) -> &Game {
        let games = self.games_mut();
        games.insert(0, Game::new());
        &games[0]
    }

    pub fn delete_game(&mut self, game_id: Uuid) -> Result<Game, SessionError> {
        let games = self.games_mut();
        let index = games
            .iter()
            .position(|game| game.id == game_id)
            .ok_or(SessionError::GameNotFound(game_id))?;
        let removed = games.remove(index);
        if games.is_empty() {
            games.push(Game::new());
        }
        Ok(removed)
    }

    pub fn update_game_info(&mut self, update: GameInfoUpdate) -> &Game {
        let game = self.current_game_mut();
        if let Some(opposition) = update.opposition {
            game.opposition = opposition;
        }
        if let Some(date) = update.game_date {
            game.game_date = date;
        }
        if let Some(score) = update.player_team_score {
            game.player_team_score = score;
        }
        if let Some(score) = update.opposition_team_score {
            game.opposition_team_score = score;
        }
        game
    }

    pub fn add_player(&mut self, name: &str, photo: Option<String>) -> Result<&Player, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyPlayerName);
        }
        let player = Player::new(name, photo);
        self.player_games.insert(player.id, vec![Game::new()]);
        self.active_player_id = player.id;
        self.players.push(player);
        Ok(self.active_player())
    }

    pub fn edit_player(
        &mut self,
        player_id: Uuid,
        name: &str,
        photo: Option<String>,
    ) -> Result<&Player, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyPlayerName);
        }
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(SessionError::PlayerNotFound(player_id))?;
        player.name = name.to_string();
        player.photo = photo;
        Ok(&*player)
    }

    pub fn select_player(&mut self, player_id: Uuid) -> Result<(), SessionError> {
        if !self.players.iter().any(|p| p.id == player_id) {
            return Err(SessionError::PlayerNotFound(player_id));
        }
        self.active_player_id = player_id;
        self.games_mut();
        Ok(())
    }

    /// Past games of the active player, newest date first.
    pub fn history(&self) -> Vec<HistoryItem> {
        let mut past: Vec<&Game> = self.games().iter().skip(1).collect();
        past.sort_by(|a, b| b.game_date.cmp(&a.game_date));
        past.into_iter()
            .map(|game| HistoryItem {
                id: game.id,
                opposition: game.opposition.clone(),
                game_date: game.game_date,
                points: points(game.ledger.stats()),
                player_team_score: game.player_team_score,
                opposition_team_score: game.opposition_team_score,
                result: game.result(),
                has_summary: !game.summary.is_empty(),
            })
            .collect()
    }

    pub fn game_view(&self, game_id: Uuid) -> Result<GameView, SessionError> {
        self.player_game_view(self.active_player_id, game_id)
    }

    pub fn player_game_view(&self, player_id: Uuid, game_id: Uuid) -> Result<GameView, SessionError> {
        let player = self
            .players
            .iter()
            .find(|p| p.id == player_id)
            .ok_or(SessionError::PlayerNotFound(player_id))?;
        let game = self.find_game(player_id, game_id)?;
        let read_only = self
            .player_games
            .get(&player_id)
            .and_then(|games| games.first())
            .is_none_or(|current| current.id != game.id);
        Ok(GameView {
            player: player.clone(),
            totals: build_stat_line(game.ledger.stats()),
            result: game.result(),
            game: game.clone(),
            read_only,
        })
    }

    pub fn view(&mut self) -> Result<SessionView, SessionError> {
        let current_id = self.current_game_mut().id;
        Ok(SessionView {
            players: self.players.clone(),
            active_player_id: self.active_player_id,
            current: self.game_view(current_id)?,
            history: self.history(),
        })
    }

    pub fn begin_summary(&mut self, player_id: Uuid, game_id: Uuid) -> Result<(), SessionError> {
        let game = self.find_game_mut(player_id, game_id)?;
        if game.ledger.is_empty() {
            return Err(SessionError::EmptyLog);
        }
        game.summary.clear();
        Ok(())
    }

    pub fn append_summary(
        &mut self,
        player_id: Uuid,
        game_id: Uuid,
        fragment: &str,
    ) -> Result<(), SessionError> {
        self.find_game_mut(player_id, game_id)?.summary.push_str(fragment);
        Ok(())
    }

    pub fn fail_summary(
        &mut self,
        player_id: Uuid,
        game_id: Uuid,
        message: &str,
    ) -> Result<(), SessionError> {
        self.find_game_mut(player_id, game_id)?.summary = format!("Error: {message}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn default_session_has_one_player_with_one_game() {
        let session = Session::new_default();
        assert_eq!(session.players.len(), 1);
        assert_eq!(session.active_player().name, "Player 1");
        assert_eq!(session.games().len(), 1);
        assert!(session.current_game().unwrap().ledger.is_empty());
    }

    #[test]
    fn actions_land_on_the_current_game_only() {
        let mut session = Session::new_default();
        session.record(Action::TwoMade).unwrap();
        let old_id = session.current_game().unwrap().id;

        session.start_new_game();
        session.record(Action::Assist).unwrap();

        let games = session.games();
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].ledger.stats().ast, 1);
        assert_eq!(games[0].ledger.stats().fgm, 0);
        assert_eq!(games[1].id, old_id);
        assert_eq!(games[1].ledger.stats().fgm, 1);

        let view = session.game_view(old_id).unwrap();
        assert!(view.read_only);
        assert_eq!(view.totals.points, 2);
    }

    #[test]
    fn undo_of_missing_entry_reports_not_found() {
        let mut session = Session::new_default();
        session.record(Action::Steal).unwrap();
        let before = session.clone();

        let missing = Uuid::new_v4();
        assert_eq!(session.undo(missing), Err(SessionError::EntryNotFound(missing)));
        assert_eq!(session, before);
    }

    #[test]
    fn reset_keeps_identity_but_clears_everything_else() {
        let mut session = Session::new_default();
        session.update_game_info(GameInfoUpdate {
            opposition: Some("Hawks".to_string()),
            ..GameInfoUpdate::default()
        });
        session.record(Action::ThreeMade).unwrap();
        session.current_game_mut().summary = "Great game!".to_string();
        let id = session.current_game().unwrap().id;

        session.reset_current_game();

        let game = session.current_game().unwrap();
        assert_eq!(game.id, id);
        assert_eq!(game.opposition, "Hawks");
        assert!(game.ledger.stats().is_zero());
        assert!(game.ledger.is_empty());
        assert!(game.summary.is_empty());
    }

    #[test]
    fn deleting_the_last_game_leaves_a_fresh_one() {
        let mut session = Session::new_default();
        let id = session.current_game().unwrap().id;

        let removed = session.delete_game(id).unwrap();

        assert_eq!(removed.id, id);
        assert_eq!(session.games().len(), 1);
        assert_ne!(session.current_game().unwrap().id, id);
        assert!(session.delete_game(id).is_err());
    }

    #[test]
    fn players_get_their_own_games() {
        let mut session = Session::new_default();
        let first = session.active_player_id;
        session.record(Action::Block).unwrap();

        assert_eq!(session.add_player("   ", None), Err(SessionError::EmptyPlayerName));
        let second = session.add_player(" Jordan ", None).unwrap().id;
        assert_eq!(session.active_player().name, "Jordan");
        assert!(session.current_game().unwrap().ledger.is_empty());

        session.select_player(first).unwrap();
        assert_eq!(session.current_game().unwrap().ledger.stats().blk, 1);

        session.edit_player(second, "MJ", Some("data:image/png;base64,AA".into())).unwrap();
        assert_eq!(session.players[1].name, "MJ");
        assert!(session.select_player(Uuid::new_v4()).is_err());
    }

    #[test]
    fn history_lists_past_games_newest_first() {
        let mut session = Session::new_default();
        session.update_game_info(GameInfoUpdate {
            game_date: NaiveDate::from_ymd_opt(2025, 1, 10),
            ..GameInfoUpdate::default()
        });
        session.start_new_game();
        session.update_game_info(GameInfoUpdate {
            game_date: NaiveDate::from_ymd_opt(2025, 2, 1),
            player_team_score: Some(Some(50)),
            opposition_team_score: Some(Some(44)),
            ..GameInfoUpdate::default()
        });
        session.start_new_game();

        let history = session.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].game_date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
        assert_eq!(history[0].result, Some(crate::models::GameResult::Won));
        assert_eq!(history[1].game_date, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap());
    }

    #[test]
    fn summary_slot_is_bound_to_its_game() {
        let mut session = Session::new_default();
        let player = session.active_player_id;
        let game = session.current_game().unwrap().id;

        assert_eq!(session.begin_summary(player, game), Err(SessionError::EmptyLog));

        session.record(Action::TwoMade).unwrap();
        session.begin_summary(player, game).unwrap();
        session.start_new_game();
        session.append_summary(player, game, "Nice ").unwrap();
        session.append_summary(player, game, "work!").unwrap();

        assert_eq!(session.find_game(player, game).unwrap().summary, "Nice work!");
        assert!(session.current_game().unwrap().summary.is_empty());

        session.fail_summary(player, game, "offline").unwrap();
        assert_eq!(session.find_game(player, game).unwrap().summary, "Error: offline");
    }

    #[test]
    fn normalize_repairs_drifted_counters_and_missing_games() {
        let mut session = Session::new_default();
        session.record(Action::ThreeMade).unwrap();
        let drifted = serde_json::from_value(serde_json::json!({
            "stats": {"FGM": 9},
            "log": session.current_game().unwrap().ledger.log(),
        }))
        .unwrap();
        session.current_game_mut().ledger = drifted;
        let stray = Player::new("Stray", None);
        session.players.push(stray.clone());
        session.active_player_id = Uuid::new_v4();

        session.normalize();

        assert_eq!(session.active_player_id, session.players[0].id);
        let ledger = &session.current_game().unwrap().ledger;
        assert_eq!(ledger.stats().fgm, 1);
        assert_eq!(ledger.stats().tpm, 1);
        assert_eq!(session.player_games[&stray.id].len(), 1);
    }

    #[test]
    fn out_of_range_delta_is_an_error_and_changes_nothing() {
        let mut session = Session::new_default();
        let huge = Stats {
            ast: i64::MAX,
            ..Stats::default()
        };
        session.apply("Huge", huge).unwrap();
        let before = session.clone();

        assert_eq!(
            session.record(Action::Assist),
            Err(SessionError::CounterOverflow(CounterOverflow))
        );
        assert_eq!(session, before);
    }
}

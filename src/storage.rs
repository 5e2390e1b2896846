use crate::ledger::StatLedger;
use crate::models::{Game, Player};
use crate::session::Session;
use chrono::NaiveDate;
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};
use tokio::fs;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to write state file: {0}")]
    Io(#[from] std::io::Error),
}

/// Every record shape the tracker has written, newest first.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredRecord {
    Current(CurrentRecord),
    PerPlayerGame(PerPlayerGameRecord),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurrentRecord {
    players: Vec<Player>,
    active_player_id: Option<Uuid>,
    player_games: BTreeMap<Uuid, Vec<Game>>,
}

/// One unnamed game per player, before game history existed.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PerPlayerGameRecord {
    players: Vec<Player>,
    active_player_id: Option<Uuid>,
    game_states: BTreeMap<Uuid, LegacyGame>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyGame {
    #[serde(flatten)]
    ledger: StatLedger,
    opposition: String,
    game_date: NaiveDate,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    player_team_score: Option<u32>,
    #[serde(default)]
    opposition_team_score: Option<u32>,
}

impl From<LegacyGame> for Game {
    fn from(legacy: LegacyGame) -> Self {
        Game {
            id: Uuid::new_v4(),
            ledger: legacy.ledger,
            opposition: legacy.opposition,
            game_date: legacy.game_date,
            summary: legacy.summary,
            player_team_score: legacy.player_team_score,
            opposition_team_score: legacy.opposition_team_score,
        }
    }
}

impl StoredRecord {
    fn into_session(self) -> Session {
        let (players, active_player_id, player_games) = match self {
            StoredRecord::Current(record) => {
                (record.players, record.active_player_id, record.player_games)
            }
            StoredRecord::PerPlayerGame(record) => {
                info!("migrating per-player game record to game history");
                let games = record
                    .game_states
                    .into_iter()
                    .map(|(player_id, game)| (player_id, vec![Game::from(game)]))
                    .collect();
                (record.players, record.active_player_id, games)
            }
        };

        let Some(first) = players.first() else {
            warn!("stored state has no players, starting fresh");
            return Session::new_default();
        };
        let mut session = Session {
            active_player_id: active_player_id.unwrap_or(first.id),
            players,
            player_games,
        };
        session.normalize();
        session
    }
}

pub fn parse_session(bytes: &[u8]) -> Result<Session, serde_json::Error> {
    let record: StoredRecord = serde_json::from_slice(bytes)?;
    Ok(record.into_session())
}

pub async fn load_session(path: &Path) -> Session {
    match fs::read(path).await {
        Ok(bytes) => match parse_session(&bytes) {
            Ok(session) => session,
            Err(err) => {
                error!("failed to parse state file, starting fresh: {err}");
                Session::new_default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Session::new_default(),
        Err(err) => {
            error!("failed to read state file, starting fresh: {err}");
            Session::new_default()
        }
    }
}

/// Writes to a sibling temp file first so a failed write never truncates the last good state.
pub async fn persist_session(path: &Path, session: &Session) -> Result<(), StorageError> {
    let payload = serde_json::to_vec_pretty(session)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::Action;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("stat_tracker_{name}_{}_{nanos}.json", std::process::id()))
    }

    #[tokio::test]
    async fn missing_file_yields_default_session() {
        let session = load_session(&temp_path("missing")).await;
        assert_eq!(session.players.len(), 1);
        assert_eq!(session.games().len(), 1);
    }

    #[tokio::test]
    async fn persisted_session_loads_back() {
        let path = temp_path("roundtrip");
        let mut session = Session::new_default();
        session.record(Action::ThreeMade).unwrap();
        session.record(Action::Assist).unwrap();
        session.add_player("Second", None).unwrap();

        persist_session(&path, &session).await.unwrap();
        let loaded = load_session(&path).await;
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn unrecognized_shape_falls_back_to_default() {
        let path = temp_path("garbage");
        std::fs::write(&path, br#"{"days": {"2026-01-01": {"add": 1}}}"#).unwrap();

        let session = load_session(&path).await;
        let _ = std::fs::remove_file(&path);

        assert_eq!(session.players.len(), 1);
        assert_eq!(session.active_player().name, "Player 1");
    }

    #[test]
    fn per_player_game_record_is_migrated() {
        let json = br#"{
            "players": [{"id": "8d1f6a52-2b5e-4c1e-9b0a-3f3f0c9f2a01", "name": "Riley", "photo": null}],
            "gameStates": {
                "8d1f6a52-2b5e-4c1e-9b0a-3f3f0c9f2a01": {
                    "stats": {"FTM": 1, "FTA": 2},
                    "log": [
                        {"id": "11111111-2b5e-4c1e-9b0a-3f3f0c9f2a01", "timestamp": "6:01:00 PM", "actionText": "Free Throw Missed", "statChanges": {"FTA": 1}},
                        {"id": "22222222-2b5e-4c1e-9b0a-3f3f0c9f2a01", "timestamp": "6:00:00 PM", "actionText": "Free Throw Made", "statChanges": {"FTM": 1, "FTA": 1}}
                    ],
                    "opposition": "Lions",
                    "gameDate": "2024-11-02",
                    "summary": ""
                }
            }
        }"#;

        let session = parse_session(json).unwrap();

        assert_eq!(session.active_player().name, "Riley");
        let games = session.games();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].opposition, "Lions");
        assert_eq!(games[0].ledger.stats().fta, 2);
        assert_eq!(games[0].ledger.log().len(), 2);
    }

    #[test]
    fn record_without_players_starts_fresh() {
        let session = parse_session(br#"{"players": [], "playerGames": {}}"#).unwrap();
        assert_eq!(session.players.len(), 1);
        assert_eq!(session.active_player().name, "Player 1");
    }
}

use crate::action::Action;
use crate::csv_export::{export_file_name, generate_csv};
use crate::errors::AppError;
use crate::models::{ActionRequest, GameInfoUpdate, GameView, LogRequest, PlayerRequest, SessionView};
use crate::session::{Session, SessionError};
use crate::state::AppState;
use crate::storage::persist_session;
use crate::summary::{SummaryError, SummaryTarget, accumulate, build_prompt};
use crate::ui::render_index;
use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse, Redirect},
};
use tracing::{error, info};
use uuid::Uuid;

pub async fn index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    let mut session = state.session.lock().await;
    Ok(Html(render_index(&session.view()?)))
}

pub async fn get_state(State(state): State<AppState>) -> Result<Json<SessionView>, AppError> {
    let mut session = state.session.lock().await;
    Ok(Json(session.view()?))
}

pub async fn get_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<GameView>, AppError> {
    let session = state.session.lock().await;
    Ok(Json(session.game_view(game_id)?))
}

pub async fn record_action(
    State(state): State<AppState>,
    Json(payload): Json<ActionRequest>,
) -> Result<Json<SessionView>, AppError> {
    apply_action(&state, payload.action).await
}

pub async fn record_action_form(
    State(state): State<AppState>,
    Path(action): Path<String>,
) -> Result<Redirect, AppError> {
    let action: Action = action.parse()?;
    apply_action(&state, action).await?;
    Ok(Redirect::to("/"))
}

async fn apply_action(state: &AppState, action: Action) -> Result<Json<SessionView>, AppError> {
    mutate(state, |session| session.record(action).map(|_| ())).await
}

pub async fn record_custom(
    State(state): State<AppState>,
    Json(payload): Json<LogRequest>,
) -> Result<Json<SessionView>, AppError> {
    let label = payload.label.trim();
    if label.is_empty() {
        return Err(AppError::bad_request("label cannot be empty"));
    }
    if payload.delta.is_zero() {
        return Err(AppError::bad_request("delta must change at least one counter"));
    }
    mutate(&state, |session| session.apply(label, payload.delta).map(|_| ())).await
}

pub async fn undo_entry(
    State(state): State<AppState>,
    Path(entry_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    mutate(&state, |session| session.undo(entry_id).map(|_| ())).await
}

pub async fn reset_game(State(state): State<AppState>) -> Result<Json<SessionView>, AppError> {
    mutate(&state, |session| {
        session.reset_current_game();
        Ok(())
    })
    .await
}

pub async fn update_game(
    State(state): State<AppState>,
    Json(update): Json<GameInfoUpdate>,
) -> Result<Json<SessionView>, AppError> {
    mutate(&state, |session| {
        session.update_game_info(update);
        Ok(())
    })
    .await
}

pub async fn start_game(State(state): State<AppState>) -> Result<Json<SessionView>, AppError> {
    mutate(&state, |session| {
        session.start_new_game();
        Ok(())
    })
    .await
}

pub async fn delete_game(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    mutate(&state, |session| session.delete_game(game_id).map(|_| ())).await
}

pub async fn add_player(
    State(state): State<AppState>,
    Json(payload): Json<PlayerRequest>,
) -> Result<Json<SessionView>, AppError> {
    mutate(&state, |session| {
        session.add_player(&payload.name, payload.photo).map(|_| ())
    })
    .await
}

pub async fn edit_player(
    State(state): State<AppState>,
    Path(player_id): Path<Uuid>,
    Json(payload): Json<PlayerRequest>,
) -> Result<Json<SessionView>, AppError> {
    mutate(&state, |session| {
        session
            .edit_player(player_id, &payload.name, payload.photo)
            .map(|_| ())
    })
    .await
}

pub async fn select_player(
    State(state): State<AppState>,
    Path(player_id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    mutate(&state, |session| session.select_player(player_id)).await
}

pub async fn export_csv(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.session.lock().await;
    let player = session.active_player();
    let game = session.find_game(player.id, game_id)?;
    if game.ledger.is_empty() {
        return Err(SessionError::EmptyLog.into());
    }

    let file_name = export_file_name(&player.name, &game.opposition, game.game_date);
    let body = generate_csv(&player.name, game);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        body,
    ))
}

/// Generation runs on its own task so a client that goes away mid-stream
/// cannot leave a half-written summary behind. The in-flight slot is held
/// until that task finishes.
pub async fn generate_summary(
    State(state): State<AppState>,
    Path(game_id): Path<Uuid>,
) -> Result<Json<GameView>, AppError> {
    let guard = state
        .claim_summary(game_id)
        .ok_or_else(|| AppError::conflict("a summary for this game is already being generated"))?;

    let (target, prompt) = {
        let mut session = state.session.lock().await;
        let player = session.active_player().clone();
        session.begin_summary(player.id, game_id)?;
        let game = session.find_game(player.id, game_id)?;
        let target = SummaryTarget {
            player_id: player.id,
            game_id,
        };
        (target, build_prompt(&player.name, game))
    };

    info!(game = %game_id, "generating summary");
    let task_state = state.clone();
    let generation = tokio::spawn(async move {
        let _guard = guard;
        let started = match &task_state.summary {
            Some(backend) => backend.stream_summary(&prompt).await,
            None => Err(SummaryError::NotConfigured),
        };
        accumulate(&task_state.session, target, started).await;
        let session = task_state.session.lock().await;
        save(&task_state, &session).await;
    });
    generation.await.map_err(|err| {
        error!(game = %game_id, "summary task failed: {err}");
        AppError::internal("summary generation failed")
    })?;

    let session = state.session.lock().await;
    Ok(Json(session.player_game_view(target.player_id, target.game_id)?))
}

/// Runs one mutation against the session, persists it and returns the fresh view.
async fn mutate(
    state: &AppState,
    change: impl FnOnce(&mut Session) -> Result<(), SessionError>,
) -> Result<Json<SessionView>, AppError> {
    let mut session = state.session.lock().await;
    change(&mut *session)?;
    save(state, &session).await;
    Ok(Json(session.view()?))
}

async fn save(state: &AppState, session: &Session) {
    if let Err(err) = persist_session(&state.data_path, session).await {
        error!("failed to persist state: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::{FragmentStream, SummaryBackend};
    use async_trait::async_trait;
    use futures_util::{StreamExt, stream};
    use std::{sync::Arc, time::Duration};
    use tokio::time::{sleep, timeout};

    struct SlowBackend;

    #[async_trait]
    impl SummaryBackend for SlowBackend {
        async fn stream_summary(&self, _prompt: &str) -> Result<FragmentStream, SummaryError> {
            let fragments = stream::iter(["Big ", "game!"]).then(|text| async move {
                sleep(Duration::from_millis(30)).await;
                Ok::<_, SummaryError>(text.to_string())
            });
            Ok(fragments.boxed())
        }
    }

    fn temp_data_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("stat_tracker_handlers_{}.json", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn summary_completes_after_the_request_is_dropped() {
        let path = temp_data_path();
        let mut session = Session::new_default();
        session.record(Action::Assist).unwrap();
        session.current_game_mut().summary = "Old summary".to_string();
        let game_id = session.current_game().unwrap().id;
        let state = AppState::new(path.clone(), session).with_summary_backend(Arc::new(SlowBackend));

        let request = generate_summary(State(state.clone()), Path(game_id));
        assert!(timeout(Duration::from_millis(10), request).await.is_err());

        let mut finished = false;
        for _ in 0..100 {
            if state.claim_summary(game_id).is_some() {
                finished = true;
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        assert!(finished, "summary task never released its slot");

        let session = state.session.lock().await;
        assert_eq!(session.current_game().unwrap().summary, "Big game!");
        drop(session);

        let stored = crate::storage::load_session(&path).await;
        assert_eq!(stored.current_game().unwrap().summary, "Big game!");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn second_summary_for_the_same_game_conflicts() {
        let mut session = Session::new_default();
        session.record(Action::Steal).unwrap();
        let game_id = session.current_game().unwrap().id;
        let state = AppState::new(temp_data_path(), session);

        let _held = state.claim_summary(game_id).unwrap();
        let err = generate_summary(State(state.clone()), Path(game_id))
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::CONFLICT);
    }
}

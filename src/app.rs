use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, patch, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/actions/:action", post(handlers::record_action_form))
        .route("/api/state", get(handlers::get_state))
        .route("/api/actions", post(handlers::record_action))
        .route("/api/log", post(handlers::record_custom))
        .route("/api/log/:entry_id/undo", post(handlers::undo_entry))
        .route("/api/game", patch(handlers::update_game))
        .route("/api/game/reset", post(handlers::reset_game))
        .route("/api/games", post(handlers::start_game))
        .route(
            "/api/games/:game_id",
            get(handlers::get_game).delete(handlers::delete_game),
        )
        .route("/api/games/:game_id/export.csv", get(handlers::export_csv))
        .route("/api/games/:game_id/summary", post(handlers::generate_summary))
        .route("/api/players", post(handlers::add_player))
        .route("/api/players/:player_id", put(handlers::edit_player))
        .route("/api/players/:player_id/select", post(handlers::select_player))
        .with_state(state)
}

use crate::session::Session;
use crate::summary::SummaryBackend;
use std::{
    collections::HashSet,
    path::PathBuf,
    sync::{Arc, Mutex as StdMutex, PoisonError},
};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub data_path: PathBuf,
    pub session: Arc<Mutex<Session>>,
    pub summary: Option<Arc<dyn SummaryBackend>>,
    in_flight: Arc<StdMutex<HashSet<Uuid>>>,
}

impl AppState {
    pub fn new(data_path: PathBuf, session: Session) -> Self {
        Self {
            data_path,
            session: Arc::new(Mutex::new(session)),
            summary: None,
            in_flight: Arc::default(),
        }
    }

    pub fn with_summary_backend(mut self, backend: Arc<dyn SummaryBackend>) -> Self {
        self.summary = Some(backend);
        self
    }

    /// Claims the summary slot for `game_id`; `None` if a request for it is already running.
    pub fn claim_summary(&self, game_id: Uuid) -> Option<InFlightGuard> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.insert(game_id).then(|| InFlightGuard {
            game_id,
            in_flight: Arc::clone(&self.in_flight),
        })
    }
}

/// Releases the game's summary slot when dropped, including when the request is abandoned.
pub struct InFlightGuard {
    game_id: Uuid,
    in_flight: Arc<StdMutex<HashSet<Uuid>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        in_flight.remove(&self.game_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_summary_per_game_at_a_time() {
        let state = AppState::new(PathBuf::from("unused.json"), Session::new_default());
        let game = Uuid::new_v4();

        let guard = state.claim_summary(game).expect("first claim");
        assert!(state.claim_summary(game).is_none());
        assert!(state.claim_summary(Uuid::new_v4()).is_some());

        drop(guard);
        assert!(state.claim_summary(game).is_some());
    }
}

pub mod action;
pub mod app;
pub mod config;
pub mod csv_export;
pub mod errors;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod session;
pub mod state;
pub mod stats;
pub mod storage;
pub mod summary;
pub mod ui;

pub use app::router;
pub use config::AppConfig;
pub use ledger::StatLedger;
pub use session::Session;
pub use state::AppState;
pub use storage::{load_session, persist_session};

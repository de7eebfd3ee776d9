pub mod web_server;
pub mod api;
pub mod transaction;
pub mod storage;
pub mod log;
pub mod docs;

// Ambient modules
pub mod config;
pub mod error;
pub mod logging;
pub mod structs;

// Public API
pub use api::RecordService;
pub use config::Config;
pub use error::{Error, Result};
pub use storage::RecordStore;
pub use structs::{Collection, LogEntry, Operation, Record, RecordId};
pub use web_server::{build_router, start_server, AppState};

/// Current version of userdb
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

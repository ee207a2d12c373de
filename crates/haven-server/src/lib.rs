pub mod auth;
pub mod chat_service;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod server;
pub mod state;

pub use auth::{CurrentUser, USER_ID_HEADER};
pub use chat_service::{ChatService, ChatSettings};
pub use error::{AppError, ErrorResponse};
pub use logging::init_logging;
pub use server::{create_router, run_server, ServerOptions};
pub use state::AppState;

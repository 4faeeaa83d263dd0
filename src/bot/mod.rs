//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `engine`: Event entry point, per-user serialization and failure policy
//! - `dialogue_manager`: Text transitions for each dialogue state
//! - `callback_router`: Inline button transitions
//! - `callback_actions`: Callback token grammar
//! - `ui_builder`: Creates keyboards and formats messages
//! - `message_handler` / `callback_handler`: teloxide endpoints
//! - `outbound`: Reply delivery

pub mod callback_actions;
pub mod callback_handler;
pub mod callback_router;
pub mod dialogue_manager;
pub mod engine;
pub mod message_handler;
pub mod outbound;
pub mod reply;
pub mod ui_builder;

pub use callback_handler::callback_handler;
pub use engine::{Engine, EventKind, InboundEvent};
pub use message_handler::message_handler;
pub use reply::{PhotoSource, Reply};

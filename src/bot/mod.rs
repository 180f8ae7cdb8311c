//! Bot module for handling Telegram interactions
//!
//! - `messenger`: transport-neutral inbound events and the outbound `Messenger` trait
//! - `context`: the shared `BotContext` handed to every handler
//! - `dialogue_manager`: state transitions and generation calls
//! - `message_handler`: Telegram adapter feeding the dialogue manager
//! - `ui_builder`: command menu

pub mod context;
pub mod dialogue_manager;
pub mod message_handler;
pub mod messenger;
pub mod ui_builder;

// Re-export main handler functions for use in main.rs
pub use context::BotContext;
pub use dialogue_manager::handle_event;
pub use message_handler::{message_handler, TelegramMessenger};
pub use messenger::{Command, Inbound, InboundContent, Messenger, Photo};
pub use ui_builder::create_command_menu;

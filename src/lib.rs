//! # Assistant Telegram Bot
//!
//! A Telegram bot that relays chat and image requests to an OpenAI-compatible
//! API, walks users through short image dialogues, and keeps a per-user usage
//! ledger in SQLite.

pub mod bot;
pub mod bot_config;
pub mod db;
pub mod generation;
pub mod generation_errors;
pub mod imaging;
pub mod localization;
pub mod openai;
pub mod session;

pub mod chat;
pub mod config;
pub mod discord;
pub mod dispatch;

pub use config::BotConfig;
pub use dispatch::Dispatcher;

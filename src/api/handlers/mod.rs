pub mod browser;
pub mod commands;
pub mod health;
pub mod messages;
pub mod prompts;
pub mod settings;

pub mod api;
pub mod browser;
pub mod config;
pub mod dom;
pub mod error;
pub mod insertion;
pub mod locator;
pub mod messaging;
pub mod models;
pub mod page;
pub mod selector;
pub mod storage;
pub mod variables;

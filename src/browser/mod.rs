pub mod host;
pub mod manager;

pub use host::CdpPageHost;
pub use manager::BrowserManager;

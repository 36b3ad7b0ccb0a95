pub mod client;
pub mod config;
pub mod error;
pub mod platform;
pub mod poller;
pub mod status;
pub mod store;

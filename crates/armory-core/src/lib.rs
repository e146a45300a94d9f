//! Armory core: authentication and session security for the account dashboard.

pub mod caches;
pub mod callback;
pub mod client;
pub mod config;
pub mod csrf;
pub mod error;
pub mod navigation;
pub mod session;

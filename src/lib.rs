pub mod config;
pub mod telegram;

pub use config::Config;

mod config;
mod frame;
mod lifecycle;
mod views;

pub use config::Config;

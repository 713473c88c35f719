pub mod allegro;
pub mod config;
pub mod error;
pub mod telemetry;

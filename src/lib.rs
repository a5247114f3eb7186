//! Sweeps old voicemail recordings from a paginated telephony API.
//!
//! A sweep lists recordings created before a retention cutoff and either
//! erases them from the API or archives their audio to durable storage,
//! with a bounded number of record actions in flight and early termination
//! on a record ceiling or failure budget.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use voicemail_sweeper::{SweeperConfig, Sweeper};
//!
//! let config = SweeperConfig::from_file("voicemail-sweeper.toml")?;
//! let result = Sweeper::from_config(&config).await?.run().await?;
//! println!("{} recordings, stopped: {}", result.observed, result.terminal_reason);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod models;
pub mod observability;
pub mod services;
pub mod sweep;

#[cfg(test)]
mod tests;

pub use config::{ConfigError, SweeperConfig};
pub use sweep::{SweepError, SweepResult, Sweeper, TerminalReason};

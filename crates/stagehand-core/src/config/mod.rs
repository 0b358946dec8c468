//! Shared configuration utilities
//!
//! - Generic YAML config loading/saving
//! - Standard config and session locations
//! - Transport timing configuration
//!
//! ```ignore
//! use stagehand_core::config::{load_config, save_config, TransportConfig};
//!
//! let config: PlayerConfig = load_config(&config_path);
//! save_config(&config, &config_path)?;
//! ```

mod io;
mod paths;
mod transport;

pub use io::{load_config, save_config};
pub use paths::{default_config_path, default_session_dir};
pub use transport::TransportConfig;

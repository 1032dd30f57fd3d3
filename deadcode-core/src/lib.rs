//! # deadcode-core
//!
//! Core library for deadcode - dead code detection from class load telemetry.
//!
//! This library provides:
//! - The batching emitter that reports first-time class loads over UDP
//! - The collector that receives those reports and tracks class usage
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Example
//!
//! ```rust,no_run
//! use deadcode_core::{Config, Emitter, EmitterHandle};
//!
//! let config = Config::load().expect("failed to load config");
//! let hooks = EmitterHandle::new(Emitter::from_config(&config.emitter));
//!
//! hooks.on_class_loaded("App\\Service\\Mailer");
//! hooks.on_shutdown();
//! ```

// Re-export commonly used items at the crate root
pub use collector::{CollectorListener, Inventory, SharedInventory};
pub use config::Config;
pub use emitter::{Emitter, EmitterHandle, Transport, UdpTransport};
pub use error::{Error, Result};

// Public modules
pub mod collector;
pub mod config;
pub mod emitter;
pub mod error;
pub mod logging;

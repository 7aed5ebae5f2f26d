//! # torctl
//!
//! Client for the Tor control protocol, built for peer-to-peer applications
//! that embed a Tor daemon: authenticate against a local control port,
//! discover the SOCKS endpoint, watch bootstrap progress, and publish
//! hidden services so the host can receive inbound connections through Tor.
//!
//! ## Model
//!
//! Everything is non-blocking and single-threaded cooperative. One driver
//! owns the [`TorControl`] client and calls [`TorControl::tick`] at a
//! steady cadence (or runs [`TorControl::run`] as a task); each tick pumps
//! the socket, parses complete reply lines, resolves typed commands in
//! issue order, and advances the state machine. Other tasks observe
//! through [`TorControl::subscribe`] and shared [`HiddenService`] handles.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use torctl::{HiddenService, TorControl, TorControlConfig};
//!
//! # fn main() -> torctl::Result<()> {
//! let mut control = TorControl::with_config(
//!     TorControlConfig::new().password("hunter2"),
//! );
//!
//! // Ask Tor for a fresh v3 service forwarding port 443 locally.
//! let service = HiddenService::create_new();
//! service.add_port(443, "127.0.0.1", 9878);
//! control.add_hidden_service(&service);
//!
//! control.connect("127.0.0.1", 9051)?;
//! loop {
//!     control.tick();
//!     if let Some(hostname) = service.hostname() {
//!         println!("reachable at {hostname}");
//!         break;
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(20));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Authentication
//!
//! The method is chosen from what `PROTOCOLINFO` advertises, in order:
//! NULL, then COOKIE (the cookie file must be exactly 32 bytes), then
//! HASHEDPASSWORD with the configured password. A short cookie file falls
//! back to the password rather than failing outright.
//!
//! ## Hidden services
//!
//! Daemons at 0.2.7 or newer get one `ADD_ONION` per service, with the key
//! imported from its [`CryptoKey`] wire form or created by Tor (`NEW:BEST`)
//! and handed back. Older daemons fall back to batched
//! `SETCONF HiddenServiceDir=… HiddenServicePort=…` for file-based
//! services.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod events;
pub mod key;
pub mod pending;
pub mod pipe;
pub mod protocol;
pub mod service;

mod command;
mod control;
mod socket;

pub mod test_utils;

pub use config::TorControlConfig;
pub use control::TorControl;
pub use error::{Error, Result};
pub use events::{BootstrapStatus, ControlStatus, TorEvent, TorStatus};
pub use key::{CryptoKey, KeyType};
pub use pending::{OperationState, PendingOperation};
pub use service::{HiddenService, ServiceStatus, Target};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Tor control port.
pub const DEFAULT_CONTROL_PORT: u16 = 9051;

//! Client configuration.

use std::time::Duration;

/// Configuration for [`TorControl`](crate::TorControl).
///
/// ```
/// use torctl::TorControlConfig;
///
/// let config = TorControlConfig::new()
///     .password("hunter2")
///     .own_tor_process(true);
/// ```
#[derive(Debug, Clone)]
pub struct TorControlConfig {
    /// Control-port password for HASHEDPASSWORD authentication.
    pub auth_password: Option<Vec<u8>>,
    /// Whether this controller owns the Tor process. Ownership enables
    /// shutdown signalling and torrc persistence, and makes Tor exit when
    /// the control connection closes.
    pub own_tor_process: bool,
    /// Cadence of the cooperative tick loop.
    pub tick_interval: Duration,
    /// Capacity of the host event channel.
    pub event_capacity: usize,
}

impl Default for TorControlConfig {
    fn default() -> Self {
        TorControlConfig {
            auth_password: None,
            own_tor_process: false,
            tick_interval: Duration::from_millis(20),
            event_capacity: 64,
        }
    }
}

impl TorControlConfig {
    /// Configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the control-port password.
    pub fn password(mut self, password: impl Into<Vec<u8>>) -> Self {
        self.auth_password = Some(password.into());
        self
    }

    /// Declare ownership of the Tor process.
    pub fn own_tor_process(mut self, own: bool) -> Self {
        self.own_tor_process = own;
        self
    }

    /// Set the tick cadence.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Set the host event channel capacity.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

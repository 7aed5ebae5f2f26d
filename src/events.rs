//! Host-facing status types and the event stream payloads.

use std::collections::HashMap;

use crate::protocol;

/// Connectivity state of the control channel itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlStatus {
    /// No control connection.
    NotConnected,
    /// TCP connection in progress.
    Connecting,
    /// Connected; PROTOCOLINFO in flight.
    SocketConnected,
    /// AUTHENTICATE in flight.
    Authenticating,
    /// Authenticated; queries and publication under way.
    Authenticated,
    /// At least one hidden service is online.
    HiddenServiceReady,
    /// Failed; terminal until the host reconnects.
    Error,
}

/// Tor's own bootstrap/circuit readiness, orthogonal to [`ControlStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TorStatus {
    /// Not connected to a daemon, or no status received yet.
    Unknown,
    /// Daemon running but circuits not established.
    Offline,
    /// Circuits established; traffic can flow.
    Ready,
}

/// Snapshot of Tor's most recent `BOOTSTRAP` status report.
///
/// Keys are lowercased (`progress`, `tag`, `summary`, plus `severity` for
/// the NOTICE/WARN level of the event itself).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapStatus {
    fields: HashMap<String, String>,
}

impl BootstrapStatus {
    /// Parse from the whitespace-split tokens following the event keyword,
    /// starting with the severity token.
    pub(crate) fn from_tokens(tokens: &[Vec<u8>]) -> Self {
        let mut fields = HashMap::new();
        let Some((severity, rest)) = tokens.split_first() else {
            return Self::default();
        };
        fields.insert(
            "severity".to_string(),
            String::from_utf8_lossy(severity).into_owned(),
        );

        for token in rest {
            match token.iter().position(|&b| b == b'=') {
                Some(pos) => {
                    let key = String::from_utf8_lossy(&token[..pos]).to_lowercase();
                    let value = protocol::unquoted(&token[pos + 1..]);
                    fields.insert(key, String::from_utf8_lossy(&value).into_owned());
                }
                None => {
                    fields.insert(String::from_utf8_lossy(token).to_lowercase(), String::new());
                }
            }
        }
        BootstrapStatus { fields }
    }

    /// Look up a field by its lowercase key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The `PROGRESS` percentage, when present and numeric.
    pub fn progress(&self) -> Option<u8> {
        self.get("progress")?.parse().ok()
    }

    /// The phase tag, e.g. `conn_done`.
    pub fn tag(&self) -> Option<&str> {
        self.get("tag")
    }

    /// The human-readable phase summary.
    pub fn summary(&self) -> Option<&str> {
        self.get("summary")
    }

    /// NOTICE or WARN severity of the last report.
    pub fn severity(&self) -> Option<&str> {
        self.get("severity")
    }

    /// Whether no bootstrap report has been seen.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// All fields as a map.
    pub fn as_map(&self) -> &HashMap<String, String> {
        &self.fields
    }
}

/// Events published to host subscribers.
#[derive(Debug, Clone)]
pub enum TorEvent {
    /// The control-channel state machine moved.
    StatusChanged {
        /// New state.
        status: ControlStatus,
        /// State before the transition.
        previous: ControlStatus,
    },
    /// Tor's own readiness changed.
    TorStatusChanged(TorStatus),
    /// A `BOOTSTRAP` report updated the progress map.
    BootstrapUpdated(BootstrapStatus),
    /// The SOCKS listener endpoint became known.
    SocksReady {
        /// Listener address.
        address: String,
        /// Listener port.
        port: u16,
    },
    /// Tor acknowledged a hidden service; it is now online.
    ServicePublished {
        /// Full `.onion` hostname of the service.
        onion_address: String,
    },
}

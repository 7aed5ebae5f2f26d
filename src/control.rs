//! Top-level Tor control orchestrator.
//!
//! [`TorControl`] drives the whole session: connect, authenticate with
//! whatever the daemon offers, discover the SOCKS endpoint, publish hidden
//! services, and mirror Tor's bootstrap reports. Everything runs on a
//! single cooperative driver that calls [`tick`](TorControl::tick) at a
//! steady cadence; host tasks observe through [`subscribe`](TorControl::subscribe)
//! and the snapshot accessors.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::net::TcpStream;
use std::path::Path;
use std::thread;
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use crate::auth;
use crate::command::{
    AddOnionCommand, AuthenticateCommand, Command, GetConfCommand, GetConfPurpose,
    ProtocolInfoCommand, RawCommand, SetConfCommand,
};
use crate::config::TorControlConfig;
use crate::error::{Error, Result};
use crate::events::{BootstrapStatus, ControlStatus, TorEvent, TorStatus};
use crate::pending::{pending_pair, PendingOperation};
use crate::pipe::Transport;
use crate::protocol::{self, version_at_least};
use crate::service::HiddenService;
use crate::socket::{ControlSocket, SocketEvent};

/// torrc directives generated at runtime and omitted when persisting.
const RUNTIME_TORRC_KEYS: [&str; 4] = [
    "ControlPortWriteToFile",
    "DataDirectory",
    "HiddenServiceDir",
    "HiddenServicePort",
];

/// Tor versions from here on take `ADD_ONION`; older daemons get SETCONF.
const ADD_ONION_MIN_VERSION: &str = "0.2.7";

/// Client for a local Tor daemon's control channel.
///
/// The client is single-threaded cooperative: one driver owns it and calls
/// [`tick`](Self::tick) every ~20 ms (or runs [`run`](Self::run) as a
/// task). Hidden services are shared handles, so the host keeps observing
/// them after registration.
pub struct TorControl<T: Transport = TcpStream> {
    socket: ControlSocket<T>,
    config: TorControlConfig,
    status: ControlStatus,
    tor_status: TorStatus,
    tor_version: String,
    error_message: String,
    tor_address: String,
    control_port: u16,
    socks_address: String,
    socks_port: u16,
    bootstrap: BootstrapStatus,
    services: Vec<HiddenService>,
    has_ownership: bool,
    events: broadcast::Sender<TorEvent>,
}

impl<T: Transport> TorControl<T> {
    /// Client with default configuration.
    pub fn new() -> Self {
        Self::with_config(TorControlConfig::default())
    }

    /// Client with explicit configuration.
    pub fn with_config(config: TorControlConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        TorControl {
            socket: ControlSocket::new(),
            config,
            status: ControlStatus::NotConnected,
            tor_status: TorStatus::Unknown,
            tor_version: String::new(),
            error_message: String::new(),
            tor_address: String::new(),
            control_port: 0,
            socks_address: String::new(),
            socks_port: 0,
            bootstrap: BootstrapStatus::default(),
            services: Vec::new(),
            has_ownership: false,
            events,
        }
    }

    // ==================== host-facing snapshots ====================

    /// Current control-channel state.
    pub fn status(&self) -> ControlStatus {
        self.status
    }

    /// Tor's own readiness, as last reported.
    pub fn tor_status(&self) -> TorStatus {
        self.tor_status
    }

    /// Version string of the connected daemon, empty before PROTOCOLINFO.
    pub fn tor_version(&self) -> &str {
        &self.tor_version
    }

    /// Message describing the last error, empty outside the `Error` state.
    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    /// Address of the SOCKS listener, once discovered.
    pub fn socks_address(&self) -> &str {
        &self.socks_address
    }

    /// Port of the SOCKS listener, once discovered.
    pub fn socks_port(&self) -> u16 {
        self.socks_port
    }

    /// Whether Tor is ready and the SOCKS endpoint is known.
    pub fn has_connectivity(&self) -> bool {
        self.tor_status == TorStatus::Ready && !self.socks_address.is_empty()
    }

    /// Snapshot of the latest bootstrap report.
    pub fn bootstrap_status(&self) -> BootstrapStatus {
        self.bootstrap.clone()
    }

    /// Handles of all registered hidden services.
    pub fn hidden_services(&self) -> Vec<HiddenService> {
        self.services.clone()
    }

    /// Whether this controller owns the Tor process.
    pub fn has_ownership(&self) -> bool {
        self.has_ownership
    }

    /// Subscribe to status/bootstrap/publication events.
    pub fn subscribe(&self) -> broadcast::Receiver<TorEvent> {
        self.events.subscribe()
    }

    // ==================== lifecycle ====================

    /// Adopt an already-connected, non-blocking transport and start the
    /// session on it. `connect` does this for TCP; tests inject scripted
    /// transports.
    pub fn adopt(&mut self, transport: T) {
        if self.status != ControlStatus::Connecting {
            self.set_status(ControlStatus::Connecting);
        }
        self.socket.attach(transport);
        self.set_status(ControlStatus::SocketConnected);
        // Connected and running, but no circuits yet.
        self.set_tor_status(TorStatus::Offline);
        self.socket
            .send_command(Command::ProtocolInfo(ProtocolInfoCommand::default()));
    }

    /// Register a hidden service to publish once authenticated.
    pub fn add_hidden_service(&mut self, service: &HiddenService) {
        if self.services.iter().any(|s| s.ptr_eq(service)) {
            return;
        }
        self.services.push(service.clone());
    }

    /// Run one iteration of the cooperative driver: pump the socket,
    /// process replies and events, advance the state machine.
    pub fn tick(&mut self) {
        let events = match self.socket.process() {
            Ok(events) => events,
            Err(e) => {
                // Resolve in-flight commands before the queue is dropped.
                self.set_error(e);
                self.socket.close();
                return;
            }
        };

        for event in events {
            match event {
                SocketEvent::Async { keyword, data } => self.handle_async(&keyword, &data),
                SocketEvent::Finished(command) => self.handle_finished(command),
                SocketEvent::Closed => self.handle_disconnect(),
            }
        }

        // Commands queued while handling replies go out within this tick.
        if let Err(e) = self.socket.flush() {
            self.set_error(e);
            self.socket.close();
        }
    }

    /// Drive the client as a task, ticking at the configured cadence until
    /// the connection is gone.
    pub async fn run(&mut self) {
        let mut interval = tokio::time::interval(self.config.tick_interval);
        loop {
            interval.tick().await;
            self.tick();
            if !self.socket.is_running()
                && matches!(self.status, ControlStatus::NotConnected | ControlStatus::Error)
            {
                break;
            }
        }
    }

    // ==================== ownership & shutdown ====================

    /// Take ownership of the Tor process: Tor exits when this control
    /// connection closes.
    pub fn take_ownership(&mut self) {
        self.has_ownership = true;
        self.socket
            .send_command(Command::Raw(RawCommand::new("TAKEOWNERSHIP")));

        // Reset PID-based polling.
        self.socket.send_command(Command::SetConf(SetConfCommand::reset(vec![(
            "__OwningControllerProcess".to_string(),
            String::new(),
        )])));
    }

    /// Ask Tor to shut down. Ignored unless this controller owns the
    /// process.
    pub fn shutdown(&mut self) {
        if !self.has_ownership {
            warn!("ignoring shutdown for a tor instance this controller does not own");
            return;
        }
        self.socket
            .send_command(Command::Raw(RawCommand::new("SIGNAL SHUTDOWN")));
    }

    /// [`shutdown`](Self::shutdown), then block until the outbound queue
    /// drains and close the socket. The only blocking call in the client.
    pub fn shutdown_sync(&mut self) {
        if !self.has_ownership {
            warn!("ignoring shutdown for a tor instance this controller does not own");
            return;
        }
        self.shutdown();
        while self.socket.more_to_write() {
            self.tick();
            thread::sleep(Duration::from_millis(100));
        }
        self.socket.close();
        self.set_status(ControlStatus::NotConnected);
    }

    // ==================== configuration ====================

    /// Apply configuration values over the control channel.
    pub fn set_configuration(&mut self, options: &[(&str, &str)]) {
        let options = options
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.socket
            .send_command(Command::SetConf(SetConfCommand::new(options)));
    }

    /// Query configuration values; the result arrives once Tor replies.
    pub fn get_configuration(
        &mut self,
        keys: &[&str],
    ) -> oneshot::Receiver<HashMap<String, Vec<String>>> {
        let (tx, rx) = oneshot::channel();
        self.socket
            .send_command(Command::GetConf(GetConfCommand::get_conf(keys, tx)));
        rx
    }

    /// Persist Tor's configuration back to its torrc file.
    ///
    /// Runtime-generated directives are omitted, and out of paranoia any
    /// path not named `torrc` or not already present on disk is refused.
    pub fn save_configuration(&mut self) -> PendingOperation {
        let (handle, operation) = pending_pair();
        if !self.has_ownership {
            warn!("ignoring save-configuration for a tor instance this controller does not own");
            handle.finish_with_error("tor instance is not owned by this controller");
            return operation;
        }
        self.socket
            .send_command(Command::GetConf(GetConfCommand::save_config(handle)));
        operation
    }

    // ==================== reply handling ====================

    fn handle_finished(&mut self, command: Command) {
        match command {
            Command::ProtocolInfo(info) => self.protocol_info_reply(info),
            Command::Authenticate(auth) => self.authenticate_reply(auth),
            Command::GetConf(get) => match get.purpose() {
                GetConfPurpose::TorInfo => self.tor_info_reply(&get),
                GetConfPurpose::SaveConfig => self.save_config_reply(get),
                GetConfPurpose::Plain => Self::plain_get_conf_reply(get),
            },
            Command::SetConf(set) => self.set_conf_reply(set),
            Command::AddOnion(onion) => self.add_onion_reply(onion),
            Command::Raw(_) => {
                if !command.is_successful() {
                    warn!(
                        command = command.keyword(),
                        error = command.error_message().unwrap_or("unknown error"),
                        "control command failed"
                    );
                }
            }
        }
    }

    fn protocol_info_reply(&mut self, info: ProtocolInfoCommand) {
        if !info.is_successful() {
            self.set_error(Error::Protocol(format!(
                "PROTOCOLINFO failed: {}",
                info.error_message().unwrap_or("unknown error")
            )));
            return;
        }

        self.tor_version = info.tor_version().to_string();
        info!(version = %self.tor_version, "connected to tor control port");

        if self.status != ControlStatus::SocketConnected {
            return;
        }
        self.set_status(ControlStatus::Authenticating);

        let methods = info.auth_methods();
        let credential: Option<Vec<u8>>;

        if methods.allows_null() {
            info!("using null authentication");
            credential = None;
        } else if methods.allows_cookie() && info.cookie_file().is_some() {
            let path = info.cookie_file().unwrap_or_default();
            info!(cookie_file = path, "using cookie authentication");
            match auth::read_cookie_file(Path::new(path)) {
                Ok(cookie) => credential = Some(cookie),
                Err(e) => {
                    // A password can still get us in; this happens when a
                    // daemon rotates its cookie out from under us.
                    if methods.allows_hashed_password() && self.config.auth_password.is_some() {
                        warn!(error = %e, "unable to read authentication cookie, using hashed password instead");
                        credential = self.config.auth_password.clone();
                    } else {
                        self.set_error(e);
                        return;
                    }
                }
            }
        } else if methods.allows_hashed_password() && self.config.auth_password.is_some() {
            info!("using hashed password authentication");
            credential = self.config.auth_password.clone();
        } else if methods.allows_hashed_password() {
            self.set_error(Error::AuthenticationUnavailable(
                "Tor requires a control password to connect, but no password is configured"
                    .to_string(),
            ));
            return;
        } else {
            self.set_error(Error::AuthenticationUnavailable(
                "Tor is not configured to accept any supported authentication methods".to_string(),
            ));
            return;
        }

        self.socket
            .send_command(Command::Authenticate(AuthenticateCommand::new(credential)));
    }

    fn authenticate_reply(&mut self, auth: AuthenticateCommand) {
        assert_eq!(
            self.status,
            ControlStatus::Authenticating,
            "authentication reply outside the Authenticating state"
        );

        if !auth.is_successful() {
            let detail = auth.error_message().unwrap_or("unknown error").to_string();
            if auth.was_rejected() {
                self.set_error(Error::AuthenticationRejected(detail));
            } else {
                self.set_error(Error::Protocol(format!("authentication failed: {detail}")));
            }
            return;
        }

        debug!("authentication successful");
        self.set_status(ControlStatus::Authenticated);
        self.socket.register_event("STATUS_CLIENT");

        if self.config.own_tor_process && !self.has_ownership {
            self.take_ownership();
        }

        self.get_tor_info();
        self.publish_services();

        if self.has_ownership {
            // Scrub runtime-only directives older releases left in torrc.
            let _ = self.save_configuration();
        }
    }

    fn get_tor_info(&mut self) {
        self.socket.send_command(Command::GetConf(GetConfCommand::tor_info(&[
            "status/circuit-established",
            "status/bootstrap-phase",
            "net/listeners/socks",
        ])));
    }

    fn tor_info_reply(&mut self, command: &GetConfCommand) {
        if !command.is_successful() {
            warn!(
                error = command.error_message().unwrap_or("unknown error"),
                "GETINFO for tor status failed"
            );
            return;
        }

        if let Some(listeners) = command.first("net/listeners/socks") {
            self.parse_socks_listeners(listeners);
        }

        if command.first("status/circuit-established") == Some("1") {
            info!("circuits are established; tor is ready");
            self.set_tor_status(TorStatus::Ready);
        }

        if let Some(bootstrap) = command.first("status/bootstrap-phase") {
            let tokens = protocol::split_quoted(bootstrap.as_bytes(), b' ');
            self.update_bootstrap(&tokens);
        }
    }

    fn parse_socks_listeners(&mut self, listeners: &str) {
        let peer = self.socket.peer_host();
        let previous = self.socks_address.clone();

        for entry in protocol::split_quoted(listeners.as_bytes(), b' ') {
            let value = protocol::unquoted(&entry);
            let text = String::from_utf8_lossy(&value);
            let Some((address, port)) = text.rsplit_once(':') else {
                continue;
            };
            let Ok(port) = port.parse::<u16>() else {
                continue;
            };

            // Prefer the listener on the address this control connection
            // uses; otherwise the first one stands.
            let matches_peer = peer.as_deref() == Some(address);
            if self.socks_address.is_empty() || matches_peer {
                self.socks_address = address.to_string();
                self.socks_port = port;
                if matches_peer {
                    break;
                }
            }
        }

        if !self.socks_address.is_empty() && self.socks_address != previous {
            info!(address = %self.socks_address, port = self.socks_port, "SOCKS listener discovered");
            let _ = self.events.send(TorEvent::SocksReady {
                address: self.socks_address.clone(),
                port: self.socks_port,
            });
        }
    }

    fn plain_get_conf_reply(mut command: GetConfCommand) {
        if !command.is_successful() {
            warn!(
                error = command.error_message().unwrap_or("unknown error"),
                "configuration query failed"
            );
        }
        if let Some(reply_to) = command.take_reply_to() {
            let _ = reply_to.send(command.values().clone());
        }
    }

    // ==================== hidden services ====================

    fn publish_services(&mut self) {
        if self.services.is_empty() {
            warn!("no hidden service registered; nothing to publish");
            return;
        }
        info!(count = self.services.len(), "publishing hidden services");

        if version_at_least(&self.tor_version, ADD_ONION_MIN_VERSION) {
            for service in self.services.clone() {
                match service.hostname() {
                    Some(hostname) => info!(%hostname, "publishing hidden service"),
                    None => info!("creating a new hidden service"),
                }
                self.socket
                    .send_command(Command::AddOnion(AddOnionCommand::new(service)));
            }
        } else {
            info!(version = %self.tor_version, "using legacy SETCONF hidden service configuration");
            let mut options: Vec<(String, String)> = Vec::new();
            let mut published: Vec<HiddenService> = Vec::new();

            for service in &self.services {
                let Some(data_dir) = service.data_dir() else {
                    continue;
                };
                if service.key().is_some() && !data_dir.join("private_key").exists() {
                    // Tor was downgraded after this profile was created.
                    warn!(
                        dir = %data_dir.display(),
                        "cannot publish an ephemeral hidden service with this tor version; skipping"
                    );
                    continue;
                }

                info!(dir = %data_dir.display(), "configuring hidden service");
                options.push((
                    "HiddenServiceDir".to_string(),
                    data_dir.display().to_string(),
                ));
                for target in service.targets() {
                    options.push((
                        "HiddenServicePort".to_string(),
                        format!(
                            "{} {}:{}",
                            target.service_port, target.target_address, target.target_port
                        ),
                    ));
                }
                published.push(service.clone());
            }

            if !options.is_empty() {
                self.socket
                    .send_command(Command::SetConf(SetConfCommand::publish(options, published)));
            }
        }
    }

    fn add_onion_reply(&mut self, mut command: AddOnionCommand) {
        if !command.is_successful() {
            let error = Error::PublicationFailed(
                command.error_message().unwrap_or("unknown error").to_string(),
            );
            warn!(error = %error, "hidden service publication failed");
            return;
        }

        let service = command.service().clone();
        if let Some(key) = command.take_private_key() {
            service.set_key(key);
        }
        if let Some(id) = command.service_id() {
            service.set_service_id(id);
        }
        self.service_published(&service);
    }

    fn set_conf_reply(&mut self, command: SetConfCommand) {
        if !command.is_successful() {
            let detail = command.error_message().unwrap_or("unknown error");
            if command.services().is_empty() {
                warn!(error = detail, "SETCONF failed");
            } else {
                let error = Error::PublicationFailed(detail.to_string());
                warn!(error = %error, "legacy hidden service publication failed");
            }
            return;
        }
        for service in command.services().to_vec() {
            self.service_published(&service);
        }
    }

    fn service_published(&mut self, service: &HiddenService) {
        let Some(hostname) = service.hostname() else {
            warn!("service acknowledged without a known hostname; leaving it offline");
            return;
        };
        service.mark_online();
        debug!(%hostname, "hidden service published and ready");
        let _ = self.events.send(TorEvent::ServicePublished {
            onion_address: hostname,
        });
        self.set_status(ControlStatus::HiddenServiceReady);
    }

    // ==================== async events ====================

    fn handle_async(&mut self, keyword: &str, data: &[u8]) {
        if keyword == "STATUS_CLIENT" {
            self.status_event(data);
        }
    }

    fn status_event(&mut self, data: &[u8]) {
        let tokens = protocol::split_quoted(protocol::trim(data), b' ');
        if tokens.len() < 3 {
            return;
        }

        match tokens[2].as_slice() {
            b"CIRCUIT_ESTABLISHED" => {
                self.set_tor_status(TorStatus::Ready);
                // With DisableNetwork the listener only appears now.
                if self.socks_address.is_empty() {
                    self.get_tor_info();
                }
            }
            b"CIRCUIT_NOT_ESTABLISHED" => self.set_tor_status(TorStatus::Offline),
            b"BOOTSTRAP" => self.update_bootstrap(&tokens[1..]),
            _ => {}
        }
    }

    fn update_bootstrap(&mut self, tokens: &[Vec<u8>]) {
        self.bootstrap = BootstrapStatus::from_tokens(tokens);
        debug!(progress = ?self.bootstrap.progress(), tag = ?self.bootstrap.tag(), "bootstrap status");
        let _ = self
            .events
            .send(TorEvent::BootstrapUpdated(self.bootstrap.clone()));
    }

    // ==================== configuration persistence ====================

    fn save_config_reply(&mut self, mut command: GetConfCommand) {
        let Some(handle) = command.take_save_handle() else {
            return;
        };

        if !command.is_successful() {
            handle.finish_with_error(format!(
                "GETINFO config-text failed: {}",
                command.error_message().unwrap_or("unknown error")
            ));
            return;
        }

        let path = command.first("config-file").unwrap_or("").to_string();
        if path.is_empty() {
            handle.finish_with_error("Cannot write torrc without knowing its path");
            return;
        }

        let target = Path::new(&path);
        let file_name = target.file_name().and_then(|name| name.to_str());
        if file_name != Some("torrc") || !target.exists() {
            handle.finish_with_error(format!(
                "Refusing to write torrc to unacceptable path {path}"
            ));
            return;
        }

        match write_torrc(target, command.get("config-text")) {
            Ok(()) => {
                info!(path = %target.display(), "wrote torrc file");
                handle.finish_with_success();
            }
            Err(e) => {
                handle.finish_with_error(format!(
                    "Failed opening torrc file for writing: {e}"
                ));
            }
        }
    }

    // ==================== state transitions ====================

    fn handle_disconnect(&mut self) {
        debug!("control connection closed");
        self.fail_pending("control connection closed");
        self.socket.close();

        self.tor_version.clear();
        self.socks_address.clear();
        self.socks_port = 0;
        for service in &self.services {
            service.mark_offline();
        }
        self.set_tor_status(TorStatus::Unknown);
        self.set_status(ControlStatus::NotConnected);
    }

    fn set_status(&mut self, status: ControlStatus) {
        if status == self.status {
            return;
        }
        let previous = self.status;
        self.status = status;
        if previous == ControlStatus::Error {
            self.error_message.clear();
        }
        let _ = self.events.send(TorEvent::StatusChanged { status, previous });
    }

    fn set_tor_status(&mut self, status: TorStatus) {
        if status == self.tor_status {
            return;
        }
        debug!(?status, "tor status changed");
        self.tor_status = status;
        let _ = self.events.send(TorEvent::TorStatusChanged(status));
    }

    fn set_error(&mut self, error: Error) {
        self.error_message = error.to_string();
        warn!(error = %self.error_message, "control channel error");
        self.fail_pending("control channel error");
        self.set_status(ControlStatus::Error);
    }

    fn fail_pending(&mut self, reason: &str) {
        for mut command in self.socket.clear_pending() {
            if let Command::GetConf(get) = &mut command {
                if let Some(handle) = get.take_save_handle() {
                    handle.finish_with_error(reason);
                }
            }
        }
    }
}

impl TorControl<TcpStream> {
    /// Connect to the control port at `address:port`. Ignored while a
    /// connection is already established.
    pub fn connect(&mut self, address: &str, port: u16) -> Result<()> {
        if self.is_connected() {
            debug!("ignoring connect; control connection already established");
            return Ok(());
        }

        self.tor_address = address.to_string();
        self.control_port = port;
        self.dial()
    }

    /// Re-dial the endpoint of the previous [`connect`](Self::connect) call.
    pub fn reconnect(&mut self) -> Result<()> {
        if self.tor_address.is_empty() || self.control_port == 0 {
            return Err(Error::ConnectFailed(
                "no previous control endpoint to reconnect to".to_string(),
            ));
        }
        if self.is_connected() {
            return Ok(());
        }
        self.dial()
    }

    fn is_connected(&self) -> bool {
        matches!(
            self.status,
            ControlStatus::SocketConnected
                | ControlStatus::Authenticating
                | ControlStatus::Authenticated
                | ControlStatus::HiddenServiceReady
        )
    }

    fn dial(&mut self) -> Result<()> {
        self.set_tor_status(TorStatus::Unknown);
        if self.socket.is_running() {
            self.socket.close();
        }
        self.set_status(ControlStatus::Connecting);

        let endpoint = (self.tor_address.as_str(), self.control_port);
        let stream = match TcpStream::connect(endpoint) {
            Ok(stream) => stream,
            Err(e) => {
                let message = format!("{}:{}: {e}", self.tor_address, self.control_port);
                self.set_error(Error::ConnectFailed(message.clone()));
                return Err(Error::ConnectFailed(message));
            }
        };
        // The whole client is built on non-blocking I/O; a blocking stream
        // would stall every tick.
        if let Err(e) = stream.set_nonblocking(true) {
            let message = format!("cannot set non-blocking mode: {e}");
            self.set_error(Error::ConnectFailed(message.clone()));
            return Err(Error::ConnectFailed(message));
        }

        self.adopt(stream);
        Ok(())
    }
}

impl<T: Transport> Default for TorControl<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn write_torrc(path: &Path, lines: &[String]) -> io::Result<()> {
    let mut out = String::new();
    for line in lines {
        if RUNTIME_TORRC_KEYS.iter().any(|key| line.starts_with(key)) {
            continue;
        }
        out.push_str(line);
        out.push('\n');
    }
    fs::write(path, out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torrc_writer_skips_runtime_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torrc");

        let lines = vec![
            "SocksPort 9050".to_string(),
            "DataDirectory /var/lib/tor".to_string(),
            "ControlPort 9051".to_string(),
            "HiddenServiceDir /var/lib/tor/svc".to_string(),
            "HiddenServicePort 9001 127.0.0.1:9001".to_string(),
            "ControlPortWriteToFile /run/tor/port".to_string(),
        ];
        write_torrc(&path, &lines).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "SocksPort 9050\nControlPort 9051\n");
    }
}

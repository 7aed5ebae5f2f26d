//! Typed control-channel commands.
//!
//! Each command builds its outgoing line and consumes the reply lines the
//! socket routes to it, accumulating a typed result. A closed enum keeps
//! the socket's queue homogeneous without trait objects or downcasts.

use std::collections::HashMap;

use tokio::sync::oneshot;
use tracing::warn;

use crate::auth::{AuthMethod, AuthMethods};
use crate::key::CryptoKey;
use crate::pending::OperationHandle;
use crate::protocol::{self, ReplyLine};
use crate::service::HiddenService;

/// Terminal status accumulated from reply lines.
#[derive(Debug, Default)]
pub(crate) struct ReplyState {
    final_code: Option<u16>,
    error: Option<String>,
}

impl ReplyState {
    fn record(&mut self, line: &ReplyLine) {
        if line.is_end() {
            assert!(self.final_code.is_none(), "command finished twice");
            self.final_code = Some(line.code);
            if !(250..=252).contains(&line.code) {
                self.error = Some(line.text().into_owned());
            }
        }
    }

    fn is_successful(&self) -> bool {
        matches!(self.final_code, Some(250..=252))
    }

    fn final_code(&self) -> Option<u16> {
        self.final_code
    }

    fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// A queued control command with its accumulated reply.
#[derive(Debug)]
pub(crate) enum Command {
    ProtocolInfo(ProtocolInfoCommand),
    Authenticate(AuthenticateCommand),
    GetConf(GetConfCommand),
    SetConf(SetConfCommand),
    AddOnion(AddOnionCommand),
    Raw(RawCommand),
}

impl Command {
    pub fn build(&self) -> Vec<u8> {
        match self {
            Command::ProtocolInfo(c) => c.build(),
            Command::Authenticate(c) => c.build(),
            Command::GetConf(c) => c.build(),
            Command::SetConf(c) => c.build(),
            Command::AddOnion(c) => c.build(),
            Command::Raw(c) => c.build(),
        }
    }

    pub fn on_reply_line(&mut self, line: ReplyLine) {
        match self {
            Command::ProtocolInfo(c) => c.on_reply_line(line),
            Command::Authenticate(c) => c.on_reply_line(line),
            Command::GetConf(c) => c.on_reply_line(line),
            Command::SetConf(c) => c.reply.record(&line),
            Command::AddOnion(c) => c.on_reply_line(line),
            Command::Raw(c) => c.reply.record(&line),
        }
    }

    /// A raw line from a `250+` data section.
    pub fn on_data_line(&mut self, line: &[u8]) {
        if let Command::GetConf(c) = self {
            c.on_data_line(line);
        }
    }

    pub fn is_successful(&self) -> bool {
        self.reply().is_successful()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.reply().error_message()
    }

    /// Keyword for log lines.
    pub fn keyword(&self) -> &str {
        match self {
            Command::ProtocolInfo(_) => "PROTOCOLINFO",
            Command::Authenticate(_) => "AUTHENTICATE",
            Command::GetConf(c) => {
                if c.info {
                    "GETINFO"
                } else {
                    "GETCONF"
                }
            }
            Command::SetConf(c) => {
                if c.reset {
                    "RESETCONF"
                } else {
                    "SETCONF"
                }
            }
            Command::AddOnion(_) => "ADD_ONION",
            Command::Raw(c) => c.line.split_whitespace().next().unwrap_or(""),
        }
    }

    fn reply(&self) -> &ReplyState {
        match self {
            Command::ProtocolInfo(c) => &c.reply,
            Command::Authenticate(c) => &c.reply,
            Command::GetConf(c) => &c.reply,
            Command::SetConf(c) => &c.reply,
            Command::AddOnion(c) => &c.reply,
            Command::Raw(c) => &c.reply,
        }
    }
}

/// `PROTOCOLINFO 1`: advertised auth methods, cookie path, Tor version.
#[derive(Debug, Default)]
pub(crate) struct ProtocolInfoCommand {
    reply: ReplyState,
    auth_methods: AuthMethods,
    cookie_file: Option<String>,
    tor_version: String,
}

impl ProtocolInfoCommand {
    pub fn build(&self) -> Vec<u8> {
        protocol::format_command("PROTOCOLINFO", &["1"]).into_bytes()
    }

    pub fn on_reply_line(&mut self, line: ReplyLine) {
        let text = line.text().into_owned();
        if let Some(rest) = text.strip_prefix("AUTH ") {
            for part in protocol::split_quoted(rest.as_bytes(), b' ') {
                let part = String::from_utf8_lossy(&part).into_owned();
                if let Some(methods) = part.strip_prefix("METHODS=") {
                    for token in methods.split(',') {
                        if let Some(method) = AuthMethod::parse(token) {
                            self.auth_methods.insert(method);
                        }
                    }
                } else if let Some(path) = part.strip_prefix("COOKIEFILE=") {
                    let path = protocol::unquoted(path.as_bytes());
                    self.cookie_file = Some(String::from_utf8_lossy(&path).into_owned());
                }
            }
        } else if let Some(rest) = text.strip_prefix("VERSION ") {
            if let Some(version) = rest.strip_prefix("Tor=") {
                let version = protocol::unquoted(version.as_bytes());
                self.tor_version = String::from_utf8_lossy(&version).into_owned();
            }
        }
        self.reply.record(&line);
    }

    pub fn is_successful(&self) -> bool {
        self.reply.is_successful()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.reply.error_message()
    }

    pub fn auth_methods(&self) -> &AuthMethods {
        &self.auth_methods
    }

    pub fn cookie_file(&self) -> Option<&str> {
        self.cookie_file.as_deref()
    }

    pub fn tor_version(&self) -> &str {
        &self.tor_version
    }
}

/// `AUTHENTICATE [hexdata]`.
#[derive(Debug)]
pub(crate) struct AuthenticateCommand {
    reply: ReplyState,
    credential: Option<Vec<u8>>,
}

impl AuthenticateCommand {
    pub fn new(credential: Option<Vec<u8>>) -> Self {
        AuthenticateCommand {
            reply: ReplyState::default(),
            credential,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        match &self.credential {
            None => protocol::format_command("AUTHENTICATE", &[]).into_bytes(),
            Some(bytes) => {
                let hexdata = hex::encode_upper(bytes);
                protocol::format_command("AUTHENTICATE", &[&hexdata]).into_bytes()
            }
        }
    }

    pub fn on_reply_line(&mut self, line: ReplyLine) {
        self.reply.record(&line);
    }

    pub fn is_successful(&self) -> bool {
        self.reply.is_successful()
    }

    pub fn was_rejected(&self) -> bool {
        self.reply.final_code() == Some(515)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.reply.error_message()
    }
}

/// What a finished `GetConfCommand` feeds in the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GetConfPurpose {
    /// Startup `GETINFO` for circuit/bootstrap/SOCKS state.
    TorInfo,
    /// `GETINFO config-text config-file` backing a save-configuration
    /// operation.
    SaveConfig,
    /// Fire-and-forget query.
    Plain,
}

/// `GETCONF`/`GETINFO` with a multimap result.
///
/// A `250+key=` line opens a data section whose raw lines each become one
/// value of `key` — `config-text` arrives that way, line by line.
#[derive(Debug)]
pub(crate) struct GetConfCommand {
    reply: ReplyState,
    info: bool,
    keys: Vec<String>,
    values: HashMap<String, Vec<String>>,
    data_key: Option<String>,
    purpose: GetConfPurpose,
    save_handle: Option<OperationHandle>,
    reply_to: Option<oneshot::Sender<HashMap<String, Vec<String>>>>,
}

impl GetConfCommand {
    fn new(info: bool, keys: &[&str], purpose: GetConfPurpose) -> Self {
        GetConfCommand {
            reply: ReplyState::default(),
            info,
            keys: keys.iter().map(|k| k.to_string()).collect(),
            values: HashMap::new(),
            data_key: None,
            purpose,
            save_handle: None,
            reply_to: None,
        }
    }

    pub fn get_conf(
        keys: &[&str],
        reply_to: oneshot::Sender<HashMap<String, Vec<String>>>,
    ) -> Self {
        let mut command = Self::new(false, keys, GetConfPurpose::Plain);
        command.reply_to = Some(reply_to);
        command
    }

    pub fn tor_info(keys: &[&str]) -> Self {
        Self::new(true, keys, GetConfPurpose::TorInfo)
    }

    pub fn save_config(handle: OperationHandle) -> Self {
        let mut command = Self::new(
            true,
            &["config-text", "config-file"],
            GetConfPurpose::SaveConfig,
        );
        command.save_handle = Some(handle);
        command
    }

    pub fn build(&self) -> Vec<u8> {
        let keyword = if self.info { "GETINFO" } else { "GETCONF" };
        let keys: Vec<&str> = self.keys.iter().map(String::as_str).collect();
        protocol::format_command(keyword, &keys).into_bytes()
    }

    pub fn on_reply_line(&mut self, line: ReplyLine) {
        if line.code == 250 && !line.data.is_empty() && line.data != b"OK" {
            let text = line.text().into_owned();
            match text.split_once('=') {
                Some((key, value)) => {
                    if line.is_data() {
                        self.data_key = Some(key.to_string());
                        if !value.is_empty() {
                            self.push_value(key.to_string(), value.to_string());
                        }
                    } else {
                        self.push_value(key.to_string(), value.to_string());
                    }
                }
                None => {
                    self.values.entry(text).or_default();
                }
            }
        }
        self.reply.record(&line);
    }

    pub fn on_data_line(&mut self, line: &[u8]) {
        if let Some(key) = self.data_key.clone() {
            self.push_value(key, String::from_utf8_lossy(line).into_owned());
        }
    }

    fn push_value(&mut self, key: String, value: String) {
        self.values.entry(key).or_default().push(value);
    }

    pub fn is_successful(&self) -> bool {
        self.reply.is_successful()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.reply.error_message()
    }

    pub fn purpose(&self) -> GetConfPurpose {
        self.purpose
    }

    pub fn take_save_handle(&mut self) -> Option<OperationHandle> {
        self.save_handle.take()
    }

    pub fn take_reply_to(&mut self) -> Option<oneshot::Sender<HashMap<String, Vec<String>>>> {
        self.reply_to.take()
    }

    /// Everything collected so far.
    pub fn values(&self) -> &HashMap<String, Vec<String>> {
        &self.values
    }

    /// All values collected under `key`.
    pub fn get(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The first value collected under `key`.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.get(key).first().map(String::as_str)
    }
}

/// `SETCONF`/`RESETCONF` with always-quoted values.
#[derive(Debug)]
pub(crate) struct SetConfCommand {
    reply: ReplyState,
    reset: bool,
    options: Vec<(String, String)>,
    services: Vec<HiddenService>,
}

impl SetConfCommand {
    pub fn new(options: Vec<(String, String)>) -> Self {
        SetConfCommand {
            reply: ReplyState::default(),
            reset: false,
            options,
            services: Vec::new(),
        }
    }

    /// `RESETCONF` variant: listed keys revert to their defaults when the
    /// value is empty.
    pub fn reset(options: Vec<(String, String)>) -> Self {
        let mut command = Self::new(options);
        command.reset = true;
        command
    }

    /// Legacy hidden-service publication; `services` go online on success.
    pub fn publish(options: Vec<(String, String)>, services: Vec<HiddenService>) -> Self {
        let mut command = Self::new(options);
        command.services = services;
        command
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = String::from(if self.reset { "RESETCONF" } else { "SETCONF" });
        for (key, value) in &self.options {
            out.push(' ');
            out.push_str(key);
            if !value.is_empty() {
                out.push('=');
                out.push_str(&protocol::quoted_str(value));
            }
        }
        out.push_str("\r\n");
        out.into_bytes()
    }

    pub fn is_successful(&self) -> bool {
        self.reply.is_successful()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.reply.error_message()
    }

    pub fn services(&self) -> &[HiddenService] {
        &self.services
    }
}

/// `ADD_ONION`: publish one hidden service, creating a key when none is
/// loaded.
#[derive(Debug)]
pub(crate) struct AddOnionCommand {
    reply: ReplyState,
    service: HiddenService,
    service_id: Option<String>,
    private_key: Option<CryptoKey>,
}

impl AddOnionCommand {
    pub fn new(service: HiddenService) -> Self {
        AddOnionCommand {
            reply: ReplyState::default(),
            service,
            service_id: None,
            private_key: None,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let keyspec = match self.service.key() {
            Some(key) => key.wire(),
            None => "NEW:BEST".to_string(),
        };
        let mut out = format!("ADD_ONION {keyspec}");
        for target in self.service.targets() {
            out.push_str(&format!(
                " Port={},{}:{}",
                target.service_port, target.target_address, target.target_port
            ));
        }
        out.push_str("\r\n");
        out.into_bytes()
    }

    pub fn on_reply_line(&mut self, line: ReplyLine) {
        let text = line.text().into_owned();
        if let Some(id) = text.strip_prefix("ServiceID=") {
            self.service_id = Some(id.to_string());
        } else if let Some(key) = text.strip_prefix("PrivateKey=") {
            match CryptoKey::from_wire(key) {
                Ok(key) => self.private_key = Some(key),
                Err(e) => warn!(error = %e, "discarding unusable PrivateKey reply"),
            }
        }
        self.reply.record(&line);
    }

    pub fn is_successful(&self) -> bool {
        self.reply.is_successful()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.reply.error_message()
    }

    pub fn service(&self) -> &HiddenService {
        &self.service
    }

    pub fn service_id(&self) -> Option<&str> {
        self.service_id.as_deref()
    }

    pub fn take_private_key(&mut self) -> Option<CryptoKey> {
        self.private_key.take()
    }
}

/// Single-line commands whose reply is only a status, e.g. `TAKEOWNERSHIP`
/// or `SIGNAL SHUTDOWN`.
#[derive(Debug)]
pub(crate) struct RawCommand {
    reply: ReplyState,
    line: String,
}

impl RawCommand {
    pub fn new(line: impl Into<String>) -> Self {
        RawCommand {
            reply: ReplyState::default(),
            line: line.into(),
        }
    }

    pub fn build(&self) -> Vec<u8> {
        format!("{}\r\n", self.line).into_bytes()
    }
}

//! Test utilities: scripted transports and canned reply streams.
//!
//! Everything a test needs to run the client against a fake daemon without
//! opening a socket: feed the transport the server's bytes, drive
//! [`tick`](crate::TorControl::tick) by hand, inspect what was written.
//!
//! ```rust,ignore
//! use torctl::test_utils::{fixtures, ScriptedTransport};
//! use torctl::TorControl;
//!
//! let transport = ScriptedTransport::new();
//! let mut control: TorControl<ScriptedTransport> = TorControl::new();
//! control.adopt(transport.clone());
//!
//! transport.feed(fixtures::protocolinfo_null());
//! control.tick();
//! ```

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};

use crate::pipe::Transport;

#[derive(Debug, Default)]
struct ScriptState {
    incoming: VecDeque<u8>,
    written: Vec<u8>,
    eof: bool,
    fail_reads: bool,
    read_chunk: Option<usize>,
    write_limit: Option<usize>,
}

/// In-memory transport fed by a test script.
///
/// Clones share the underlying state, so a test keeps one handle while the
/// client owns the other. Reads return `WouldBlock` when no script bytes
/// are queued, like a real non-blocking socket.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedTransport {
    /// A fresh transport with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().expect("scripted transport lock poisoned")
    }

    /// Queue bytes for the client to read.
    pub fn feed(&self, bytes: impl AsRef<[u8]>) {
        self.lock().incoming.extend(bytes.as_ref());
    }

    /// Everything the client has written so far.
    pub fn written(&self) -> Vec<u8> {
        self.lock().written.clone()
    }

    /// Everything the client has written so far, as text.
    pub fn written_text(&self) -> String {
        String::from_utf8_lossy(&self.written()).into_owned()
    }

    /// Drain and return the captured writes.
    pub fn take_written(&self) -> Vec<u8> {
        std::mem::take(&mut self.lock().written)
    }

    /// Signal end-of-stream once the queued bytes are drained.
    pub fn close(&self) {
        self.lock().eof = true;
    }

    /// Make every read fail with a hard I/O error.
    pub fn fail_reads(&self) {
        self.lock().fail_reads = true;
    }

    /// Serve at most `chunk` bytes per read call.
    pub fn set_read_chunk(&self, chunk: usize) {
        self.lock().read_chunk = Some(chunk);
    }

    /// Accept at most `limit` bytes per write call.
    pub fn set_write_limit(&self, limit: usize) {
        self.lock().write_limit = Some(limit);
    }
}

impl Read for ScriptedTransport {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.lock();
        if state.fail_reads {
            return Err(io::Error::new(io::ErrorKind::ConnectionReset, "scripted failure"));
        }
        if state.incoming.is_empty() {
            return if state.eof {
                Ok(0)
            } else {
                Err(io::ErrorKind::WouldBlock.into())
            };
        }

        let max = state.read_chunk.unwrap_or(buf.len()).min(buf.len());
        let mut n = 0;
        while n < max {
            match state.incoming.pop_front() {
                Some(byte) => {
                    buf[n] = byte;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for ScriptedTransport {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.lock();
        let n = state.write_limit.unwrap_or(buf.len()).min(buf.len());
        if n == 0 && !buf.is_empty() {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        state.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Transport for ScriptedTransport {
    fn peer_host(&self) -> Option<String> {
        Some("127.0.0.1".to_string())
    }
}

/// Canned reply streams for common exchanges.
pub mod fixtures {
    /// PROTOCOLINFO from a modern daemon advertising null auth.
    pub fn protocolinfo_null() -> &'static str {
        "250-PROTOCOLINFO 1\r\n\
         250-AUTH METHODS=NULL\r\n\
         250-VERSION Tor=\"0.4.7.13\"\r\n\
         250 OK\r\n"
    }

    /// PROTOCOLINFO advertising cookie and password auth.
    pub fn protocolinfo_cookie_password(cookie_path: &str) -> String {
        format!(
            "250-PROTOCOLINFO 1\r\n\
             250-AUTH METHODS=COOKIE,HASHEDPASSWORD COOKIEFILE=\"{cookie_path}\"\r\n\
             250-VERSION Tor=\"0.4.7.13\"\r\n\
             250 OK\r\n"
        )
    }

    /// PROTOCOLINFO from a daemon too old for `ADD_ONION`.
    pub fn protocolinfo_legacy() -> &'static str {
        "250-PROTOCOLINFO 1\r\n\
         250-AUTH METHODS=NULL\r\n\
         250-VERSION Tor=\"0.2.6.10\"\r\n\
         250 OK\r\n"
    }

    /// Successful AUTHENTICATE.
    pub fn auth_ok() -> &'static str {
        "250 OK\r\n"
    }

    /// Rejected AUTHENTICATE.
    pub fn auth_rejected() -> &'static str {
        "515 Bad authentication\r\n"
    }

    /// Startup GETINFO reply from a bootstrapped daemon.
    pub fn tor_info_ready() -> &'static str {
        "250-status/circuit-established=1\r\n\
         250-status/bootstrap-phase=NOTICE BOOTSTRAP PROGRESS=100 TAG=done SUMMARY=\"Done\"\r\n\
         250-net/listeners/socks=\"127.0.0.1:9050\"\r\n\
         250 OK\r\n"
    }

    /// Startup GETINFO reply from a daemon still without circuits.
    pub fn tor_info_offline() -> &'static str {
        "250-status/circuit-established=0\r\n\
         250-status/bootstrap-phase=NOTICE BOOTSTRAP PROGRESS=10 TAG=conn_dir SUMMARY=\"Connecting\"\r\n\
         250-net/listeners/socks=\r\n\
         250 OK\r\n"
    }

    /// ADD_ONION reply for a freshly created service.
    pub fn add_onion_created(service_id: &str, private_key: &str) -> String {
        format!(
            "250-ServiceID={service_id}\r\n\
             250-PrivateKey={private_key}\r\n\
             250 OK\r\n"
        )
    }

    /// ADD_ONION reply when the key was supplied by the controller.
    pub fn add_onion_republished(service_id: &str) -> String {
        format!("250-ServiceID={service_id}\r\n250 OK\r\n")
    }

    /// Async STATUS_CLIENT bootstrap report.
    pub fn bootstrap_event(progress: u8, tag: &str, summary: &str) -> String {
        format!(
            "650 STATUS_CLIENT NOTICE BOOTSTRAP PROGRESS={progress} TAG={tag} SUMMARY=\"{summary}\"\r\n"
        )
    }

    /// Async STATUS_CLIENT circuit-established report.
    pub fn circuit_established_event() -> &'static str {
        "650 STATUS_CLIENT NOTICE CIRCUIT_ESTABLISHED\r\n"
    }
}

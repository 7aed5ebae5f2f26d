//! Control socket: line framing, command queue, async event routing.
//!
//! Replies to synchronous commands arrive in issue order, so a FIFO of
//! outstanding commands is enough to pair every reply line with its
//! command. Async `650` lines are routed by their first token to whatever
//! the orchestrator registered, and never touch the queue.

use std::collections::{HashSet, VecDeque};

use tracing::{debug, trace, warn};

use crate::command::Command;
use crate::error::{Error, Result};
use crate::pipe::{ByteQueue, Transport};
use crate::protocol::ReplyLine;

/// Longest reply line accepted before the stream is considered corrupt.
const MAX_LINE: usize = 8192;

/// What one pump of the socket produced for the orchestrator.
#[derive(Debug)]
pub(crate) enum SocketEvent {
    /// A queued command received its terminal reply line.
    Finished(Command),
    /// An async `650` line for a registered event keyword. `data` is the
    /// full payload including the keyword.
    Async {
        keyword: String,
        data: Vec<u8>,
    },
    /// The peer closed the connection and the inbound buffer is drained.
    Closed,
}

/// Framing and queueing layer between the pipe and the orchestrator.
#[derive(Debug)]
pub(crate) struct ControlSocket<T: Transport> {
    pipe: Option<ByteQueue<T>>,
    queue: VecDeque<Command>,
    event_keywords: HashSet<String>,
    in_data_section: bool,
    closed_reported: bool,
}

impl<T: Transport> ControlSocket<T> {
    pub fn new() -> Self {
        ControlSocket {
            pipe: None,
            queue: VecDeque::new(),
            event_keywords: HashSet::new(),
            in_data_section: false,
            closed_reported: false,
        }
    }

    /// Adopt a connected transport. It must already be non-blocking.
    pub fn attach(&mut self, transport: T) {
        if self.pipe.is_some() {
            warn!("replacing an active control connection");
        }
        self.pipe = Some(ByteQueue::new(transport));
        self.queue.clear();
        self.event_keywords.clear();
        self.in_data_section = false;
        self.closed_reported = false;
    }

    pub fn is_running(&self) -> bool {
        self.pipe.as_ref().is_some_and(ByteQueue::is_active)
    }

    pub fn peer_host(&self) -> Option<String> {
        self.pipe.as_ref().and_then(ByteQueue::peer_host)
    }

    pub fn more_to_write(&self) -> bool {
        self.pipe.as_ref().is_some_and(ByteQueue::more_to_write)
    }

    /// Route async `650` lines whose first token is `keyword` to the
    /// orchestrator. Registration is local; no wire traffic.
    pub fn register_event(&mut self, keyword: &str) {
        self.event_keywords.insert(keyword.to_string());
    }

    /// Queue a command: its bytes go out, its reply lines come back to it
    /// in order.
    pub fn send_command(&mut self, command: Command) {
        let Some(pipe) = self.pipe.as_mut() else {
            warn!(
                command = command.keyword(),
                "dropping command; control socket is not connected"
            );
            return;
        };
        trace!(command = command.keyword(), "queueing control command");
        pipe.send_data(&command.build());
        self.queue.push_back(command);
    }

    /// Flush bytes queued by commands sent since the last pump.
    pub fn flush(&mut self) -> Result<()> {
        if let Some(pipe) = self.pipe.as_mut() {
            pipe.flush_pending()?;
        }
        Ok(())
    }

    /// Drop all in-flight commands, handing them back for cleanup.
    pub fn clear_pending(&mut self) -> Vec<Command> {
        self.in_data_section = false;
        self.queue.drain(..).collect()
    }

    pub fn close(&mut self) {
        if let Some(pipe) = self.pipe.as_mut() {
            pipe.close();
        }
        self.pipe = None;
        self.queue.clear();
        self.event_keywords.clear();
    }

    /// Pump the pipe and process every complete reply line.
    pub fn process(&mut self) -> Result<Vec<SocketEvent>> {
        let mut events = Vec::new();
        if self.pipe.is_none() {
            return Ok(events);
        }

        if let Some(pipe) = self.pipe.as_mut() {
            pipe.tick()?;
        }

        loop {
            let Some(raw) = self.pipe.as_mut().and_then(|p| p.read_line(MAX_LINE)) else {
                break;
            };
            let line = trim_crlf(&raw);

            if self.in_data_section {
                if line == b"." {
                    self.in_data_section = false;
                } else if let Some(front) = self.queue.front_mut() {
                    let unescaped = if line.starts_with(b"..") { &line[1..] } else { line };
                    front.on_data_line(unescaped);
                }
                continue;
            }

            let reply = ReplyLine::parse(line)?;
            trace!(code = reply.code, separator = %reply.separator, "control reply line");

            if reply.code == 650 {
                let keyword = first_token(&reply.data);
                if self.event_keywords.contains(&keyword) {
                    events.push(SocketEvent::Async {
                        keyword,
                        data: reply.data,
                    });
                } else {
                    debug!(keyword = %keyword, "ignoring unregistered async event");
                }
                continue;
            }

            let Some(front) = self.queue.front_mut() else {
                return Err(Error::Protocol(format!(
                    "reply {} with no outstanding command",
                    reply.code
                )));
            };

            if reply.is_data() {
                self.in_data_section = true;
            }
            let is_end = reply.is_end();
            front.on_reply_line(reply);
            if is_end {
                let command = self.queue.pop_front().expect("front existed above");
                events.push(SocketEvent::Finished(command));
            }
        }

        if let Some(pipe) = self.pipe.as_mut() {
            if !pipe.is_open() && pipe.more_to_read() {
                // Trailing bytes with no line terminator after EOF.
                if let Some(rest) = pipe.read_data(pipe.buffered_in()) {
                    debug!(len = rest.len(), "discarding trailing bytes after EOF");
                }
            }
            if !pipe.is_active() && !self.closed_reported {
                self.closed_reported = true;
                events.push(SocketEvent::Closed);
            }
        }

        Ok(events)
    }
}

fn trim_crlf(line: &[u8]) -> &[u8] {
    let mut end = line.len();
    while end > 0 && (line[end - 1] == b'\n' || line[end - 1] == b'\r') {
        end -= 1;
    }
    &line[..end]
}

fn first_token(data: &[u8]) -> String {
    let end = data.iter().position(|&b| b == b' ').unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

//! Non-blocking byte pipe over a socket-like transport.
//!
//! [`ByteQueue`] owns two FIFOs of byte segments. Each [`tick`] drains
//! whatever the transport has to offer into the inbound FIFO and flushes as
//! much of the outbound FIFO as the transport accepts, so callers above it
//! never block. Framed reads (`read_line`, `read_data`) consume the inbound
//! FIFO atomically.
//!
//! [`tick`]: ByteQueue::tick

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::TcpStream;

use tracing::{debug, warn};

/// Bytes read from the transport per syscall; each read gets a fresh segment.
const READ_CHUNK: usize = 1024;

/// Byte-stream transport the pipe can adopt.
///
/// Implementations must be non-blocking: reads and writes return
/// [`io::ErrorKind::WouldBlock`] instead of waiting.
pub trait Transport: Read + Write {
    /// Remote host of the connection, when known.
    fn peer_host(&self) -> Option<String> {
        None
    }
}

impl Transport for TcpStream {
    fn peer_host(&self) -> Option<String> {
        self.peer_addr().ok().map(|addr| addr.ip().to_string())
    }
}

/// Two FIFO byte queues pumped over a non-blocking transport.
#[derive(Debug)]
pub struct ByteQueue<T: Transport> {
    transport: Option<T>,
    in_buffer: VecDeque<Vec<u8>>,
    out_buffer: VecDeque<Vec<u8>>,
    in_buffered: usize,
    out_buffered: usize,
    total_read: u64,
    total_written: u64,
}

impl<T: Transport> ByteQueue<T> {
    /// Wrap a connected transport. The transport must already be
    /// non-blocking; see [`Transport`].
    pub fn new(transport: T) -> Self {
        ByteQueue {
            transport: Some(transport),
            in_buffer: VecDeque::new(),
            out_buffer: VecDeque::new(),
            in_buffered: 0,
            out_buffered: 0,
            total_read: 0,
            total_written: 0,
        }
    }

    /// Whether the transport is still attached.
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Whether the pipe is still useful: the transport is live, or inbound
    /// bytes remain to be drained after EOF.
    pub fn is_active(&self) -> bool {
        self.transport.is_some() || self.in_buffered > 0
    }

    /// Remote host of the underlying transport.
    pub fn peer_host(&self) -> Option<String> {
        self.transport.as_ref().and_then(Transport::peer_host)
    }

    /// Pump the transport once: drain readable bytes, flush queued writes.
    ///
    /// `WouldBlock` is a no-op, EOF detaches the transport, and any other
    /// error is logged, detaches the transport, and is returned once.
    pub fn tick(&mut self) -> io::Result<()> {
        self.read_pending()?;
        self.write_pending()
    }

    /// Flush queued writes without reading. Used after new commands are
    /// queued late in a tick.
    pub fn flush_pending(&mut self) -> io::Result<()> {
        self.write_pending()
    }

    fn read_pending(&mut self) -> io::Result<()> {
        loop {
            let Some(transport) = self.transport.as_mut() else {
                return Ok(());
            };
            let mut chunk = vec![0u8; READ_CHUNK];
            match transport.read(&mut chunk) {
                Ok(0) => {
                    debug!(buffered = self.in_buffered, "control stream reached end of input");
                    self.transport = None;
                    return Ok(());
                }
                Ok(n) => {
                    chunk.truncate(n);
                    self.in_buffered += n;
                    self.total_read += n as u64;
                    self.in_buffer.push_back(chunk);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(error = %e, "read on control stream failed");
                    self.transport = None;
                    return Err(e);
                }
            }
        }
    }

    fn write_pending(&mut self) -> io::Result<()> {
        loop {
            let Some(transport) = self.transport.as_mut() else {
                return Ok(());
            };
            let Some(front) = self.out_buffer.front_mut() else {
                return Ok(());
            };
            match transport.write(front) {
                Ok(0) => {
                    warn!("write on control stream made no progress");
                    return Ok(());
                }
                Ok(n) => {
                    self.out_buffered -= n;
                    self.total_written += n as u64;
                    if n < front.len() {
                        // Partial write; keep the unsent suffix at the front.
                        front.drain(..n);
                        return Ok(());
                    }
                    self.out_buffer.pop_front();
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    warn!(error = %e, "write on control stream failed");
                    self.transport = None;
                    return Err(e);
                }
            }
        }
    }

    /// The smallest buffered prefix that ends with `\n` or reaches `max - 1`
    /// bytes, or `None` if no complete line is buffered yet.
    pub fn read_line(&mut self, max: usize) -> Option<Vec<u8>> {
        let mut length = None;
        let mut n = 0;
        'scan: for segment in &self.in_buffer {
            for &byte in segment {
                if n + 1 == max || byte == b'\n' {
                    length = Some(n + 1);
                    break 'scan;
                }
                n += 1;
            }
        }
        self.read_data(length?)
    }

    /// Exactly `len` buffered bytes, or `None` without consuming anything.
    pub fn read_data(&mut self, len: usize) -> Option<Vec<u8>> {
        if len == 0 || self.in_buffered < len {
            return None;
        }

        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            let mut front = self
                .in_buffer
                .pop_front()
                .expect("buffered byte count out of sync");
            let want = len - out.len();
            if front.len() > want {
                let rest = front.split_off(want);
                out.extend_from_slice(&front);
                self.in_buffer.push_front(rest);
            } else {
                out.extend_from_slice(&front);
            }
        }
        self.in_buffered -= len;
        Some(out)
    }

    /// Copy `data` into the outbound FIFO. Never blocks; the next ticks
    /// flush it.
    pub fn send_data(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }
        self.out_buffered += data.len();
        self.out_buffer.push_back(data.to_vec());
    }

    /// Whether inbound bytes are buffered.
    pub fn more_to_read(&self) -> bool {
        self.in_buffered > 0
    }

    /// Whether outbound bytes are waiting to be flushed.
    pub fn more_to_write(&self) -> bool {
        self.out_buffered > 0
    }

    /// Inbound bytes currently buffered.
    pub fn buffered_in(&self) -> usize {
        self.in_buffered
    }

    /// Outbound bytes currently buffered.
    pub fn buffered_out(&self) -> usize {
        self.out_buffered
    }

    /// Total bytes ever read from the transport.
    pub fn total_read(&self) -> u64 {
        self.total_read
    }

    /// Total bytes ever written to the transport.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Detach the transport. Buffered bytes are dropped with the pipe.
    pub fn close(&mut self) {
        if self.in_buffered > 0 || self.out_buffered > 0 {
            warn!(
                inbound = self.in_buffered,
                outbound = self.out_buffered,
                "closing pipe with buffered bytes"
            );
        }
        self.transport = None;
    }
}

use std::collections::BTreeMap;
use std::io::{ErrorKind, Read, Write};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use smc3_transport::SerialStream;
use tracing::{debug, trace, warn, Span};

use crate::error::{MockError, Result};
use crate::stub::{Stub, StubHandle};

/// Written by `close()` to unblock the reader; never matched against stubs.
pub const QUIT_SENTINEL: &[u8] = b"mockserialquit";

/// Bytes requested per read by the device reader.
pub const DEFAULT_READ_CHUNK: usize = 32;

/// Default bound on each shutdown phase.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(1);

/// Mock endpoint configuration.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// How long `close()` waits for the reader to exit.
    pub join_timeout: Duration,
    /// How long `close()` waits for the channel ends to close.
    pub close_timeout: Duration,
    pub read_chunk: usize,
    /// Diagnostic context for every endpoint event.
    pub span: Span,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            join_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            close_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            read_chunk: DEFAULT_READ_CHUNK,
            span: Span::none(),
        }
    }
}

impl MockConfig {
    pub fn with_join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Stubs by name, plus the list the reader matches against.
///
/// The list is rebuilt on the first read after a registration, so reads
/// between registrations share one allocation.
#[derive(Default)]
struct StubRegistry {
    by_name: BTreeMap<String, StubHandle>,
    snapshot: Option<Arc<[StubHandle]>>,
}

impl StubRegistry {
    fn insert(&mut self, name: String, handle: StubHandle) {
        self.by_name.insert(name, handle);
        self.snapshot = None;
    }

    fn snapshot(&mut self) -> Arc<[StubHandle]> {
        let by_name = &self.by_name;
        let snapshot = self
            .snapshot
            .get_or_insert_with(|| by_name.values().cloned().collect());
        Arc::clone(snapshot)
    }
}

type StubTable = Arc<Mutex<StubRegistry>>;

/// Match stubs against the front of `buffer`, writing replies to `sink`.
///
/// Repeats until the remaining bytes match no stub and returns how many
/// bytes were consumed. A buffer whose front matches more than one stub is
/// held untouched, even when one prefix is longer than the other; resolving
/// the overlap by longest prefix would be the place to extend this.
pub fn match_and_reply<W: Write>(
    stubs: &[StubHandle],
    buffer: &[u8],
    sink: &mut W,
) -> std::io::Result<usize> {
    let mut consumed = 0usize;

    loop {
        let rest = &buffer[consumed..];
        if rest.is_empty() {
            return Ok(consumed);
        }

        let mut candidates = stubs.iter().filter(|stub| stub.matches(rest));
        let Some(stub) = candidates.next() else {
            return Ok(consumed);
        };
        if candidates.next().is_some() {
            let prefixes: Vec<String> = stubs
                .iter()
                .filter(|stub| stub.matches(rest))
                .map(|stub| stub.prefix().escape_ascii().to_string())
                .collect();
            warn!(?prefixes, "ambiguous stub match, holding buffer");
            return Ok(consumed);
        }

        let reply = stub.call();
        debug!(%stub, calls = stub.calls(), "stub matched");
        if reply.is_empty() {
            trace!("reply discarded");
        } else {
            sink.write_all(&reply)?;
            sink.flush()?;
            trace!(reply = %reply.escape_ascii(), "reply written");
        }

        consumed += stub.prefix().len();
    }
}

struct Worker {
    handle: JoinHandle<()>,
    done: mpsc::Receiver<()>,
}

/// A simulated SMC3 device on one end of a byte channel.
///
/// The host end is what a client talks to: either an in-process stream from
/// [`host_stream`](Self::host_stream) or, for [`pty`](Self::pty), the device
/// path from [`port_name`](Self::port_name).
pub struct MockEndpoint {
    device: Option<SerialStream>,
    host: Option<SerialStream>,
    port_name: Option<String>,
    stubs: StubTable,
    worker: Option<Worker>,
    config: MockConfig,
}

impl MockEndpoint {
    /// Endpoint on an in-process stream pair.
    pub fn loopback() -> Result<Self> {
        Self::loopback_with_config(MockConfig::default())
    }

    pub fn loopback_with_config(config: MockConfig) -> Result<Self> {
        let (host, device) = smc3_transport::loopback()?;
        Ok(Self::from_parts(device, host, None, config))
    }

    /// Endpoint on a pseudo-terminal; clients open [`port_name`](Self::port_name).
    #[cfg(unix)]
    pub fn pty() -> Result<Self> {
        Self::pty_with_config(MockConfig::default())
    }

    #[cfg(unix)]
    pub fn pty_with_config(config: MockConfig) -> Result<Self> {
        let (device, host, path) = smc3_transport::pty_pair()?;
        Ok(Self::from_parts(device, host, Some(path), config))
    }

    fn from_parts(
        device: SerialStream,
        host: SerialStream,
        port_name: Option<String>,
        config: MockConfig,
    ) -> Self {
        Self {
            device: Some(device),
            host: Some(host),
            port_name,
            stubs: Arc::default(),
            worker: None,
            config,
        }
    }

    /// Device path of a pty endpoint.
    pub fn port_name(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    /// A new handle on the host end of the channel.
    pub fn host_stream(&self) -> Result<SerialStream> {
        let host = self.host.as_ref().ok_or(MockError::Closed)?;
        Ok(host.try_clone()?)
    }

    /// Register `stub` under `name`, replacing any stub of the same name.
    ///
    /// Takes effect on the next read, also while the endpoint is open.
    pub fn stub(&self, name: impl Into<String>, stub: Stub) -> StubHandle {
        let handle = Arc::new(stub);
        let name = name.into();
        self.config
            .span
            .in_scope(|| trace!(%name, stub = %handle, "stub registered"));
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, Arc::clone(&handle));
        handle
    }

    /// Registered stub by name.
    pub fn get(&self, name: &str) -> Option<StubHandle> {
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_name
            .get(name)
            .cloned()
    }

    /// Number of registered stubs.
    pub fn stub_count(&self) -> usize {
        self.stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_name
            .len()
    }

    /// Start the reader thread.
    pub fn open(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Err(MockError::AlreadyOpen);
        }
        let device = self.device.as_ref().ok_or(MockError::Closed)?;
        let reader = device.try_clone()?;
        let writer = device.try_clone()?;

        let (done_tx, done) = mpsc::channel();
        let stubs = Arc::clone(&self.stubs);
        let span = self.config.span.clone();
        let chunk = self.config.read_chunk.max(1);
        let handle = std::thread::Builder::new()
            .name("smc3-mock-reader".to_string())
            .spawn(move || {
                let _entered = span.enter();
                serve(reader, writer, &stubs, chunk);
                let _ = done_tx.send(());
            })?;

        self.worker = Some(Worker { handle, done });
        self.config.span.in_scope(|| {
            debug!(port = self.port_name.as_deref().unwrap_or("loopback"), "attached mock device")
        });
        Ok(())
    }

    /// Write unsolicited bytes towards the host.
    pub fn send(&self, bytes: &[u8]) -> Result<()> {
        let mut device = self.device.as_ref().ok_or(MockError::Closed)?.try_clone()?;
        device.write_all(bytes)?;
        device.flush()?;
        self.config
            .span
            .in_scope(|| trace!(bytes = %bytes.escape_ascii(), "sent"));
        Ok(())
    }

    /// Stop the reader and close both ends of the channel.
    ///
    /// Best effort: each phase is bounded by its configured timeout and a
    /// phase that overruns is logged and abandoned.
    pub fn close(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let _entered = self.config.span.clone().entered();

        if let Some(worker) = self.worker.take() {
            debug!("detaching mock device");
            if let Some(host) = self.host.as_mut() {
                if let Err(err) = host.write_all(QUIT_SENTINEL).and_then(|()| host.flush()) {
                    debug!(error = %err, "could not write quit sentinel");
                }
            }

            match worker.done.recv_timeout(self.config.join_timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                    let _ = worker.handle.join();
                }
                Err(RecvTimeoutError::Timeout) => {
                    warn!(timeout = ?self.config.join_timeout, "unable to detach mock device");
                }
            }
        }

        let (device, host) = (self.device.take(), self.host.take());
        if device.is_none() && host.is_none() {
            return;
        }

        debug!("closing mock device");
        let (closed_tx, closed) = mpsc::channel();
        let closer = std::thread::Builder::new()
            .name("smc3-mock-close".to_string())
            .spawn(move || {
                for stream in [device, host].into_iter().flatten() {
                    let _ = stream.shutdown();
                    drop(stream);
                }
                let _ = closed_tx.send(());
            });
        if let Err(err) = closer {
            warn!(error = %err, "unable to close mock device");
            return;
        }

        match closed.recv_timeout(self.config.close_timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => debug!("closed mock device"),
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout = ?self.config.close_timeout, "unable to close mock device");
            }
        }
    }
}

impl Drop for MockEndpoint {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for MockEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockEndpoint")
            .field("port_name", &self.port_name)
            .field("stubs", &self.stub_count())
            .field("open", &self.worker.is_some())
            .finish()
    }
}

fn serve(mut reader: SerialStream, mut writer: SerialStream, stubs: &StubTable, chunk: usize) {
    let mut buffer = Vec::new();
    let mut chunk = vec![0u8; chunk];

    while !contains(&buffer, QUIT_SENTINEL) {
        let read = match reader.read(&mut chunk) {
            Ok(0) => {
                debug!("host end closed");
                break;
            }
            Ok(n) => n,
            Err(err)
                if matches!(
                    err.kind(),
                    ErrorKind::Interrupted | ErrorKind::WouldBlock | ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(err) => {
                warn!(error = %err, "mock read failed");
                break;
            }
        };

        buffer.extend_from_slice(&chunk[..read]);
        trace!(buffer = %buffer.escape_ascii(), "buffer read");

        let snapshot = stubs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .snapshot();
        match match_and_reply(&snapshot, &buffer, &mut writer) {
            Ok(consumed) => {
                buffer.drain(..consumed);
            }
            Err(err) => {
                warn!(error = %err, "mock reply failed");
                break;
            }
        }
    }

    debug!("detached mock device");
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

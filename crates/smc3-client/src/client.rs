use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use smc3_frame::{
    control_name, is_timeout, param_to_char, read_command, FrameError, FrameWriter, Motor, Packet,
    PacketReader, Parameter, DEFAULT_READ_CHUNK,
};
use smc3_transport::{SerialStream, TransportError, DEFAULT_READ_TIMEOUT};
use tokio::time::Instant;
use tracing::{debug, error, trace, warn, Instrument, Span};

use crate::dispatch::Dispatcher;
use crate::error::{ClientError, Result};
use crate::pending::Registration;
use crate::telemetry::TelemetrySubscriber;

/// Default time to wait for a reply.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Reply timeout used by callers that do not pass their own. Default: 1 s.
    pub timeout: Duration,
    /// Bytes requested per read on the reader thread. Default: 64.
    pub read_chunk: usize,
    /// How often the reader thread wakes to check for shutdown. Default: 100 ms.
    pub poll_interval: Duration,
    /// Diagnostic context every client event is recorded in.
    pub span: Span,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            read_chunk: DEFAULT_READ_CHUNK,
            poll_interval: DEFAULT_READ_TIMEOUT,
            span: Span::none(),
        }
    }
}

impl ClientConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_read_chunk(mut self, read_chunk: usize) -> Self {
        self.read_chunk = read_chunk;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Request/response correlator over one device stream.
///
/// Outbound frames are written synchronously. Inbound bytes are read on a
/// dedicated thread, framed, and either resolve a pending read or go to the
/// telemetry subscriber. There is no flow control: writes go straight to the
/// stream and a slow link simply blocks the caller.
///
/// Waiting requires a tokio runtime with the time driver enabled.
pub struct Client {
    dispatcher: Arc<Dispatcher>,
    writer: Mutex<FrameWriter<SerialStream>>,
    stop: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
    timeout: Duration,
    span: Span,
    name: String,
}

impl Client {
    /// Start a client on an already opened stream.
    pub fn new(
        stream: SerialStream,
        subscriber: impl TelemetrySubscriber + 'static,
        config: ClientConfig,
    ) -> Result<Self> {
        let name = stream.name();
        let mut reader_stream = stream.try_clone()?;
        reader_stream.set_read_timeout(Some(config.poll_interval))?;

        let dispatcher = Arc::new(Dispatcher::new(Box::new(subscriber)));
        let stop = Arc::new(AtomicBool::new(false));

        let reader = {
            let dispatcher = Arc::clone(&dispatcher);
            let stop = Arc::clone(&stop);
            let span = config.span.clone();
            let reader = PacketReader::with_chunk_size(reader_stream, config.read_chunk);
            std::thread::Builder::new()
                .name("smc3-client-reader".to_string())
                .spawn(move || {
                    let _entered = span.enter();
                    read_loop(reader, &dispatcher, &stop);
                })
                .map_err(TransportError::from)?
        };

        config.span.in_scope(|| debug!(device = %name, "client started"));

        Ok(Self {
            dispatcher,
            writer: Mutex::new(FrameWriter::new(stream)),
            stop,
            reader: Some(reader),
            timeout: config.timeout,
            span: config.span,
            name,
        })
    }

    /// Write a frame to the device. Does not wait for anything.
    pub fn send_command(&self, frame: &[u8]) -> Result<()> {
        let _entered = self.span.enter();
        if self.dispatcher.is_disconnected() {
            return Err(ClientError::Disconnected);
        }

        trace!(kind = control_name(frame), frame = ?frame, "send");
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writer.write_bytes(frame).map_err(|err| match err {
            FrameError::ConnectionClosed => ClientError::Disconnected,
            other => other.into(),
        })
    }

    /// Wait for the next frame tagged `tag`.
    ///
    /// Registering supersedes any earlier waiter on the same tag; that
    /// waiter keeps running until its own deadline and then times out.
    pub async fn wait_for_packet(&self, tag: u8, timeout: Duration) -> Result<Packet> {
        let registration = self.register(tag)?;
        self.wait(registration, timeout)
            .instrument(self.span.clone())
            .await
    }

    /// Send `frame`, then wait for the reply tagged `tag`.
    ///
    /// The waiter is registered before the frame goes out, so a fast reply
    /// cannot slip past it.
    pub async fn make_read_request(
        &self,
        frame: &[u8],
        tag: u8,
        timeout: Duration,
    ) -> Result<Packet> {
        let registration = self.register(tag)?;
        if let Err(err) = self.send_command(frame) {
            self.dispatcher
                .pending
                .remove(registration.tag, registration.id);
            return Err(err);
        }
        self.wait(registration, timeout)
            .instrument(self.span.clone())
            .await
    }

    /// Read `param` of `motor` with `[rd<code>]`.
    pub async fn read_parameter(
        &self,
        motor: Motor,
        param: Parameter,
        timeout: Duration,
    ) -> Result<Packet> {
        let frame = read_command(motor, param);
        self.make_read_request(&frame, param_to_char(motor, param), timeout)
            .await
    }

    /// Reply timeout from the configuration.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Name of the underlying stream.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// True once the device stream has closed or failed.
    pub fn is_disconnected(&self) -> bool {
        self.dispatcher.is_disconnected()
    }

    /// Tags with a registered waiter.
    pub fn pending_tags(&self) -> Vec<u8> {
        self.dispatcher.pending.tags()
    }

    /// Stop the reader thread and release the stream.
    pub fn close(self) {
        drop(self);
    }

    fn register(&self, tag: u8) -> Result<Registration> {
        self.dispatcher
            .pending
            .register(tag)
            .ok_or(ClientError::Disconnected)
    }

    async fn wait(&self, registration: Registration, timeout: Duration) -> Result<Packet> {
        let Registration { tag, id, rx } = registration;
        let deadline = Instant::now() + timeout;

        match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(packet)) => Ok(packet),
            Ok(Err(_)) if self.dispatcher.is_disconnected() => Err(ClientError::Disconnected),
            Ok(Err(_)) => {
                // Superseded: the newer waiter owns the tag now.
                tokio::time::sleep_until(deadline).await;
                debug!(tag = %std::ascii::escape_default(tag), "superseded read timed out");
                Err(ClientError::Timeout {
                    tag,
                    after: timeout,
                })
            }
            Err(_) => {
                self.dispatcher.pending.remove(tag, id);
                debug!(tag = %std::ascii::escape_default(tag), ?timeout, "read timed out");
                Err(ClientError::Timeout {
                    tag,
                    after: timeout,
                })
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                self.span
                    .in_scope(|| warn!(device = %self.name, "reader thread panicked"));
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("name", &self.name)
            .field("timeout", &self.timeout)
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}

fn read_loop(mut reader: PacketReader<SerialStream>, dispatcher: &Dispatcher, stop: &AtomicBool) {
    loop {
        if stop.load(Ordering::Acquire) {
            debug!("reader stopped");
            return;
        }

        match reader.read_packet() {
            Ok(packet) => dispatcher.packet_received(packet),
            Err(err) if is_timeout(&err) => continue,
            Err(FrameError::ConnectionClosed) => {
                if !stop.load(Ordering::Acquire) {
                    error!(buffered = reader.buffered(), "device closed the connection");
                }
                dispatcher.disconnect();
                return;
            }
            Err(err) => {
                error!(error = %err, "device read failed");
                dispatcher.disconnect();
                return;
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::{Read, Write};
    use std::thread;

    use smc3_frame::{ParamCode, Values, VERSION, VERSION_TAG};
    use smc3_transport::loopback;

    use super::*;
    use crate::telemetry::{ChannelSubscriber, TelemetryEvent};

    fn client_pair() -> (Client, SerialStream) {
        let (host, device) = loopback().unwrap();
        let config = ClientConfig::default().with_poll_interval(Duration::from_millis(20));
        (Client::new(host, (), config).unwrap(), device)
    }

    #[tokio::test]
    async fn unanswered_wait_times_out_after_deadline() {
        let (client, _device) = client_pair();

        let started = std::time::Instant::now();
        let err = client
            .wait_for_packet(VERSION_TAG, Duration::from_secs(1))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, ClientError::Timeout { tag: b'v', .. }));
        assert!(elapsed >= Duration::from_secs(1), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(1500), "{elapsed:?}");
        assert!(client.pending_tags().is_empty());
    }

    #[tokio::test]
    async fn read_request_resolves_with_reply() {
        let (client, mut device) = client_pair();
        let responder = thread::spawn(move || {
            let mut request = [0u8; 5];
            device.read_exact(&mut request).unwrap();
            assert_eq!(&request, b"[rdD]");
            device.write_all(b"[D\x00\x2a]").unwrap();
            device
        });

        let packet = client
            .read_parameter(Motor::A, Parameter::Kp, Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(packet.param, ParamCode::Known(Parameter::Kp));
        assert_eq!(packet.values, Values::Single(42));
        let _device = responder.join().unwrap();
    }

    #[tokio::test]
    async fn same_tag_waiters_resolve_only_once() {
        let (client, mut device) = client_pair();
        let writer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            device.write_all(b"[v\x00\x65]").unwrap();
            device
        });

        let timeout = Duration::from_millis(400);
        let (first, second) = tokio::join!(
            client.wait_for_packet(VERSION_TAG, timeout),
            client.wait_for_packet(VERSION_TAG, timeout),
        );

        assert!(matches!(first, Err(ClientError::Timeout { .. })));
        assert_eq!(second.unwrap().values, Values::Single(101));
        let _device = writer.join().unwrap();
    }

    #[tokio::test]
    async fn unmatched_frames_reach_the_subscriber() {
        let (host, mut device) = loopback().unwrap();
        let (subscriber, mut events) = ChannelSubscriber::new();
        let _client = Client::new(host, subscriber, ClientConfig::default()).unwrap();

        device
            .write_all(b"[A\x64\x0a][a\xc8\x0d][D\x00\x01][b\x01\x02]")
            .unwrap();

        let mut received = Vec::new();
        for _ in 0..3 {
            let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
                .await
                .unwrap()
                .unwrap();
            received.push(event);
        }

        assert!(matches!(
            received[0],
            TelemetryEvent::Position(p) if p.target == 100 && p.feedback == 10
        ));
        assert!(matches!(
            received[1],
            TelemetryEvent::PwmStatus(p) if p.pwm == 200 && p.status == 13
        ));
        assert!(matches!(received[2], TelemetryEvent::PwmStatus(p) if p.motor == Motor::B));
    }

    #[tokio::test]
    async fn late_reply_is_treated_as_unsolicited() {
        let (host, mut device) = loopback().unwrap();
        let (subscriber, mut events) = ChannelSubscriber::new();
        let client = Client::new(host, subscriber, ClientConfig::default()).unwrap();

        let err = client
            .wait_for_packet(b'A', Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Timeout { .. }));

        device.write_all(b"[A\x01\x02]").unwrap();
        let event = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, TelemetryEvent::Position(p) if p.motor == Motor::A));
    }

    #[tokio::test]
    async fn send_command_writes_frame() {
        let (client, mut device) = client_pair();

        client.send_command(&VERSION).unwrap();

        let mut buf = [0u8; 5];
        device.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"[ver]");
    }

    #[tokio::test]
    async fn disconnect_fails_pending_and_later_reads() {
        let (client, device) = client_pair();
        let closer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            device.shutdown().unwrap();
            drop(device);
        });

        let started = std::time::Instant::now();
        let err = client
            .wait_for_packet(VERSION_TAG, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Disconnected));
        assert!(started.elapsed() < Duration::from_secs(2));
        closer.join().unwrap();

        assert!(client.is_disconnected());
        let err = client
            .make_read_request(&VERSION, VERSION_TAG, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Disconnected));
    }

    #[test]
    fn config_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(1));
        assert_eq!(config.read_chunk, 64);
        assert_eq!(config.poll_interval, Duration::from_millis(100));
    }
}

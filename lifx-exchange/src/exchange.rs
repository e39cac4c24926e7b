//! The exchange engine
//!
//! Three exchange shapes share one engine:
//!
//! - [`ExchangeEngine::request_response`]: one request, one accepted reply,
//!   retransmitted identically until the attempt budget runs out
//! - [`ExchangeEngine::fire_and_forget`]: repeated sends, nothing awaited
//! - [`ExchangeEngine::broadcast_collector`]: one broadcast request, one
//!   reply per distinct device, up to an optional expected count
//!
//! Every exchange opens its own socket and drops it before returning, so
//! late duplicates of an already matched reply are never read.

use std::collections::HashSet;
use std::net::{SocketAddr, SocketAddrV4};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use lifx_protocol::{Codec, HardwareAddress, LanCodec, Message, MessageType, Payload};

use crate::config::{ExchangeConfig, ExchangeOptions};
use crate::error::{ExchangeError, Result};
use crate::matcher::{Matcher, TargetPolicy};
use crate::session::SessionId;
use crate::transport::{DatagramSocket, Received, Transport, UdpTransport};

/// Where a request goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Target {
    pub mac: HardwareAddress,
    /// Last address a valid reply came from. `None` sends to every
    /// broadcast address instead.
    pub addr: Option<SocketAddr>,
}

impl Target {
    pub fn device(mac: HardwareAddress, addr: Option<SocketAddr>) -> Self {
        Self { mac, addr }
    }

    /// Every device in the broadcast domain
    pub fn broadcast() -> Self {
        Self {
            mac: HardwareAddress::BROADCAST,
            addr: None,
        }
    }

    fn policy(&self) -> TargetPolicy {
        if self.mac.is_broadcast() {
            TargetPolicy::Any
        } else {
            TargetPolicy::Exact(self.mac)
        }
    }
}

/// An accepted reply and the address it arrived from.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub message: Message,
    pub from: SocketAddr,
}

impl Reply {
    /// Hardware address of the device that sent the reply
    pub fn origin(&self) -> HardwareAddress {
        self.message.target
    }

    pub fn payload(&self) -> &Payload {
        &self.message.payload
    }
}

/// What a fire-and-forget exchange did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendReport {
    pub sends: usize,
    pub pauses: usize,
}

/// Drives request/response exchanges over a [`Transport`].
///
/// The session id is chosen once at construction and stamped on every
/// outgoing message. The engine is `Send + Sync`; concurrent exchanges from
/// different threads each get their own socket.
pub struct ExchangeEngine {
    transport: Arc<dyn Transport>,
    codec: Arc<dyn Codec>,
    session: SessionId,
    config: ExchangeConfig,
    sequence: AtomicU8,
}

impl ExchangeEngine {
    /// Engine over real UDP sockets and the LAN codec
    pub fn new(config: ExchangeConfig) -> Result<Self> {
        let transport = Arc::new(UdpTransport::new(config.buffer_size));
        Self::with_parts(config, transport, Arc::new(LanCodec))
    }

    pub fn with_parts(
        config: ExchangeConfig,
        transport: Arc<dyn Transport>,
        codec: Arc<dyn Codec>,
    ) -> Result<Self> {
        Self::with_session(config, transport, codec, SessionId::random())
    }

    pub fn with_session(
        config: ExchangeConfig,
        transport: Arc<dyn Transport>,
        codec: Arc<dyn Codec>,
        session: SessionId,
    ) -> Result<Self> {
        config.validate()?;
        tracing::debug!("Exchange engine session {}", session);
        Ok(Self {
            transport,
            codec,
            session,
            config,
            sequence: AtomicU8::new(0),
        })
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn config(&self) -> &ExchangeConfig {
        &self.config
    }

    /// Send `payload` to `target` and wait for a reply of one of the
    /// `expected` types.
    ///
    /// The request asks for an acknowledgement when `expected` is exactly
    /// `[Acknowledgement]` and for a state reply otherwise. Each attempt
    /// sends once, then receives until a reply is accepted or
    /// `options.timeout` has elapsed since that send.
    pub fn request_response(
        &self,
        target: &Target,
        payload: Payload,
        expected: &[MessageType],
        options: ExchangeOptions,
    ) -> Result<Reply> {
        if expected.is_empty() {
            return Err(ExchangeError::InvalidParameter(
                "At least one expected reply type is required".to_string(),
            ));
        }
        options.validate()?;

        let ack_only = matches!(expected, [MessageType::Acknowledgement]);
        let request = self.build(target.mac, payload, ack_only, !ack_only);
        let request_type = request.message_type();
        let bytes = self.codec.encode(&request);
        let destinations = self.destinations(target);
        let matcher = Matcher::new(expected, self.session, target.policy());

        let mut socket = self.transport.open(options.timeout)?;
        for attempt in 1..=options.max_attempts {
            send_all(socket.as_mut(), &bytes, &destinations)?;
            tracing::debug!(
                "SEND {} to {} attempt {}/{}",
                request,
                target.mac,
                attempt,
                options.max_attempts
            );

            let sent_at = Instant::now();
            while let Some(wait) = remaining(sent_at, options.timeout) {
                if let Received::Datagram(datagram, from) = socket.recv(wait)? {
                    if let Some(message) = self.accept(&matcher, &datagram, from) {
                        return Ok(Reply { message, from });
                    }
                }
            }
        }

        Err(ExchangeError::NoResponse {
            request: request_type,
            expected: expected.to_vec(),
            target: target.mac,
        })
    }

    /// `request_response` specialised to an acknowledgement
    pub fn request_with_ack(
        &self,
        target: &Target,
        payload: Payload,
        options: ExchangeOptions,
    ) -> Result<Reply> {
        self.request_response(target, payload, &[MessageType::Acknowledgement], options)
    }

    /// Send `payload` `repeat_count` times without asking for any reply.
    ///
    /// Above the configured burst threshold consecutive sends are separated
    /// by `interval`, keeping within the roughly 20 messages per second a
    /// device can absorb. Nothing is ever received.
    pub fn fire_and_forget(
        &self,
        target: &Target,
        payload: Payload,
        repeat_count: usize,
        interval: Duration,
    ) -> Result<SendReport> {
        if repeat_count == 0 {
            return Err(ExchangeError::InvalidParameter(
                "Repeat count must be greater than 0".to_string(),
            ));
        }

        let message = self.build(target.mac, payload, false, false);
        let bytes = self.codec.encode(&message);
        let destinations = self.destinations(target);
        let paced = repeat_count > self.config.burst_threshold;

        let mut socket = self.transport.open(self.config.timeout)?;
        let mut report = SendReport::default();
        for _ in 0..repeat_count {
            if paced && report.sends > 0 {
                thread::sleep(interval);
                report.pauses += 1;
            }
            send_all(socket.as_mut(), &bytes, &destinations)?;
            report.sends += 1;
        }
        tracing::debug!(
            "SEND {} to {} x{} ({} pauses)",
            message,
            target.mac,
            report.sends,
            report.pauses
        );
        Ok(report)
    }

    pub fn broadcast_fire_and_forget(
        &self,
        payload: Payload,
        repeat_count: usize,
        interval: Duration,
    ) -> Result<SendReport> {
        self.fire_and_forget(&Target::broadcast(), payload, repeat_count, interval)
    }

    /// Start a broadcast exchange that yields each newly seen device's reply
    /// as it arrives.
    ///
    /// The socket opens here, the first send happens on the first call to
    /// `next`.
    pub fn broadcast_collector(
        &self,
        payload: Payload,
        expected: MessageType,
        options: ExchangeOptions,
        expected_count: Option<usize>,
    ) -> Result<BroadcastCollector> {
        options.validate()?;
        let ack_only = expected == MessageType::Acknowledgement;
        let request = self.build(HardwareAddress::BROADCAST, payload, ack_only, !ack_only);
        let socket = self.transport.open(options.timeout)?;

        Ok(BroadcastCollector {
            socket: Some(socket),
            codec: Arc::clone(&self.codec),
            bytes: self.codec.encode(&request),
            request,
            destinations: self.destinations(&Target::broadcast()),
            matcher: Matcher::new(&[expected], self.session, TargetPolicy::Any),
            options,
            expected_count,
            seen: HashSet::new(),
            attempt: 0,
            waited: None,
        })
    }

    /// Collect one reply per distinct device.
    ///
    /// Returns as soon as `expected_count` devices have replied, otherwise
    /// after the whole attempt budget.
    pub fn broadcast_collect(
        &self,
        payload: Payload,
        expected: MessageType,
        options: ExchangeOptions,
        expected_count: Option<usize>,
    ) -> Result<Vec<Reply>> {
        self.broadcast_collector(payload, expected, options, expected_count)?
            .collect()
    }

    /// Broadcast `payload` with an acknowledgement request and collect the
    /// acknowledgements, waiting the configured ack bonus longer per attempt.
    pub fn broadcast_with_ack(
        &self,
        payload: Payload,
        expected_count: Option<usize>,
    ) -> Result<Vec<Reply>> {
        self.broadcast_collect(
            payload,
            MessageType::Acknowledgement,
            self.config.broadcast_ack(),
            expected_count,
        )
    }

    fn build(&self, target: HardwareAddress, payload: Payload, ack: bool, res: bool) -> Message {
        Message::new(payload)
            .with_source(self.session.value())
            .with_target(target)
            .with_sequence(self.sequence.fetch_add(1, Ordering::Relaxed))
            .with_ack_required(ack)
            .with_res_required(res)
    }

    fn destinations(&self, target: &Target) -> Vec<SocketAddr> {
        match target.addr {
            Some(addr) => vec![addr],
            None => self
                .transport
                .broadcast_addresses()
                .into_iter()
                .map(|ip| SocketAddr::V4(SocketAddrV4::new(ip, self.config.port)))
                .collect(),
        }
    }

    fn accept(&self, matcher: &Matcher, datagram: &[u8], from: SocketAddr) -> Option<Message> {
        accept(self.codec.as_ref(), matcher, datagram, from)
    }
}

impl std::fmt::Debug for ExchangeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeEngine")
            .field("session", &self.session)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Incremental broadcast collect.
///
/// Yields each accepted reply from a device not seen before in this
/// exchange. Ends after `expected_count` devices, after the attempt budget,
/// or after the first network error. The socket is closed as soon as the
/// collector finishes or is dropped.
///
/// Only time spent blocked in `next` counts against an attempt, so a caller
/// that does slow work between replies does not lose the replies still
/// queued on the socket.
pub struct BroadcastCollector {
    socket: Option<Box<dyn DatagramSocket>>,
    codec: Arc<dyn Codec>,
    request: Message,
    bytes: Vec<u8>,
    destinations: Vec<SocketAddr>,
    matcher: Matcher,
    options: ExchangeOptions,
    expected_count: Option<usize>,
    seen: HashSet<HardwareAddress>,
    attempt: u32,
    /// Receive time spent in the current attempt
    waited: Option<Duration>,
}

impl BroadcastCollector {
    /// Devices that have replied so far
    pub fn seen(&self) -> usize {
        self.seen.len()
    }

    pub fn is_finished(&self) -> bool {
        self.socket.is_none()
    }

    fn finish(&mut self) {
        if self.socket.take().is_some() {
            tracing::debug!(
                "Broadcast {} finished: {} device(s) after {} attempt(s)",
                self.request.message_type(),
                self.seen.len(),
                self.attempt
            );
        }
    }

    fn satisfied(&self) -> bool {
        self.expected_count
            .is_some_and(|count| self.seen.len() >= count)
    }

    /// Time left in the current attempt, starting a new attempt when the
    /// previous one has run out. `None` once the budget is spent.
    fn next_wait(&mut self) -> Option<Result<Duration>> {
        if let Some(wait) = self
            .waited
            .and_then(|waited| self.options.timeout.checked_sub(waited))
            .filter(|wait| !wait.is_zero())
        {
            return Some(Ok(wait));
        }
        if self.attempt >= self.options.max_attempts {
            return None;
        }
        self.attempt += 1;
        let socket = self.socket.as_mut()?;
        if let Err(e) = send_all(socket.as_mut(), &self.bytes, &self.destinations) {
            return Some(Err(e));
        }
        tracing::debug!(
            "SEND {} broadcast attempt {}/{}",
            self.request,
            self.attempt,
            self.options.max_attempts
        );
        self.waited = Some(Duration::ZERO);
        Some(Ok(self.options.timeout))
    }
}

impl Iterator for BroadcastCollector {
    type Item = Result<Reply>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.is_finished() {
                return None;
            }
            if self.satisfied() {
                self.finish();
                return None;
            }

            let wait = match self.next_wait() {
                Some(Ok(wait)) => wait,
                Some(Err(e)) => {
                    self.finish();
                    return Some(Err(e));
                }
                None => {
                    self.finish();
                    return None;
                }
            };

            let started = Instant::now();
            let received = match self.socket.as_mut()?.recv(wait) {
                Ok(received) => received,
                Err(e) => {
                    self.finish();
                    return Some(Err(e));
                }
            };
            self.waited = match received {
                Received::Timeout => Some(self.options.timeout),
                Received::Datagram(..) => self.waited.map(|waited| waited + started.elapsed()),
            };

            if let Received::Datagram(datagram, from) = received {
                let Some(message) = accept(self.codec.as_ref(), &self.matcher, &datagram, from)
                else {
                    continue;
                };
                let origin = message.target;
                // Replies from the pseudo-address cannot be told apart
                if origin.is_broadcast() {
                    tracing::trace!("Skipping unattributable reply from {}", from);
                    continue;
                }
                if self.seen.insert(origin) {
                    return Some(Ok(Reply { message, from }));
                }
            }
        }
    }
}

fn remaining(sent_at: Instant, timeout: Duration) -> Option<Duration> {
    timeout
        .checked_sub(sent_at.elapsed())
        .filter(|wait| !wait.is_zero())
}

fn send_all(socket: &mut dyn DatagramSocket, bytes: &[u8], destinations: &[SocketAddr]) -> Result<()> {
    for addr in destinations {
        socket.send_to(bytes, *addr)?;
    }
    Ok(())
}

fn accept(codec: &dyn Codec, matcher: &Matcher, datagram: &[u8], from: SocketAddr) -> Option<Message> {
    let message = match codec.decode(datagram) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Discarding malformed datagram from {}: {}", from, e);
            return None;
        }
    };
    match matcher.check(&message) {
        Ok(()) => {
            tracing::debug!("RECV {} from {}", message, from);
            Some(message)
        }
        Err(rejection) => {
            tracing::trace!("Ignoring {} from {}: {:?}", message, from, rejection);
            None
        }
    }
}

//! WebSocket transport to the recognition backend.
//!
//! Owns one persistent connection, its reconnection state machine, and the
//! outbound frame throttle. The actual socket sits behind the `SocketLink`
//! and `Connector` traits so the state machine is testable with scripted
//! links and synthetic clocks.

use std::net::TcpStream;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};
use tungstenite::stream::MaybeTlsStream;
use tungstenite::{Message, WebSocket};

use crate::error::TransportError;
use crate::protocol::{FrameEnvelope, RecognitionMessage};

/// One established socket connection
pub trait SocketLink: Send {
    /// Send a text frame; an error means the link is unusable
    fn send_text(&mut self, text: &str) -> Result<(), TransportError>;

    /// Non-blocking read: `Ok(None)` when nothing is pending, `Err` when the
    /// link dropped
    fn poll_message(&mut self) -> Result<Option<String>, TransportError>;

    /// Close the link; errors during shutdown are ignored
    fn close(&mut self);
}

/// Factory for socket links; one call per connection attempt
pub trait Connector: Send {
    fn connect(&mut self, endpoint: &str) -> Result<Box<dyn SocketLink>, TransportError>;
}

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and none pending (initial state, or after a clean
    /// disconnect)
    Disconnected,

    /// A connection attempt is in flight
    Connecting,

    /// Connection established and usable
    Connected,

    /// Connection lost or never established; retry number `attempt` is
    /// scheduled
    Reconnecting { attempt: u32 },

    /// Retries exhausted; no further attempts until an explicit reconnect
    Failed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ConnectionState::Failed)
    }

    /// Get a human-readable description of the state
    pub fn description(&self) -> String {
        match self {
            ConnectionState::Disconnected => "Disconnected".to_string(),
            ConnectionState::Connecting => "Connecting".to_string(),
            ConnectionState::Connected => "Connected".to_string(),
            ConnectionState::Reconnecting { attempt } => {
                format!("Reconnecting (attempt {})", attempt)
            }
            ConnectionState::Failed => "Failed".to_string(),
        }
    }
}

/// Exponential backoff schedule for reconnection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10000),
            max_attempts: 5,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (zero-based): base * 2^attempt,
    /// capped at `max_delay`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        let delay = self.base_delay.saturating_mul(factor);
        delay.min(self.max_delay)
    }
}

/// Minimum-interval gate for outbound frames
///
/// Frames arriving faster than the interval are dropped, not queued; the
/// next capture supersedes them anyway.
#[derive(Debug)]
struct SendThrottle {
    min_interval: Duration,
    last_send: Option<Instant>,
}

impl SendThrottle {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_send: None,
        }
    }

    /// Check the gate at `now`; records the send time when allowed
    fn allow_at(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_send {
            if now.duration_since(last) < self.min_interval {
                return false;
            }
        }
        self.last_send = Some(now);
        true
    }

    fn reset(&mut self) {
        self.last_send = None;
    }
}

/// Events produced by polling the transport
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A connection was established (first connect or a successful retry)
    Connected,

    /// The connection dropped; reconnection is being scheduled
    ConnectionLost,

    /// All retries exhausted
    RetriesExhausted,

    /// A recognition result arrived
    Message(RecognitionMessage),
}

/// Outbound traffic counters, exposed through pipeline status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub frames_sent: u64,
    pub frames_throttled: u64,
    pub messages_received: u64,
}

/// The transport state machine
pub struct Transport {
    endpoint: String,
    connector: Box<dyn Connector>,
    link: Option<Box<dyn SocketLink>>,
    state: ConnectionState,
    backoff: BackoffPolicy,
    throttle: SendThrottle,
    attempt: u32,
    next_attempt_at: Option<Instant>,
    stats: TransportStats,
    // Events raised outside poll_at (a failed send, say) wait here for the
    // next poll so the caller sees every transition
    pending: Vec<TransportEvent>,
}

impl Transport {
    pub fn new(
        endpoint: String,
        connector: Box<dyn Connector>,
        backoff: BackoffPolicy,
        min_send_interval: Duration,
    ) -> Self {
        Self {
            endpoint,
            connector,
            link: None,
            state: ConnectionState::Disconnected,
            backoff,
            throttle: SendThrottle::new(min_send_interval),
            attempt: 0,
            next_attempt_at: None,
            stats: TransportStats::default(),
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    pub fn set_backoff(&mut self, backoff: BackoffPolicy) {
        self.backoff = backoff;
    }

    pub fn set_min_send_interval(&mut self, min_interval: Duration) {
        self.throttle.min_interval = min_interval;
    }

    /// Initiate a connection at `now`. A failed attempt schedules the first
    /// retry rather than returning an error; the caller observes progress
    /// through [`poll_at`](Self::poll_at) events.
    pub fn connect_at(&mut self, now: Instant) -> Vec<TransportEvent> {
        self.attempt = 0;
        self.next_attempt_at = None;
        self.pending.clear();
        match self.try_connect(now) {
            Some(event) => vec![event],
            None => Vec::new(),
        }
    }

    /// Close the connection and stop reconnecting
    pub fn disconnect(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
        self.state = ConnectionState::Disconnected;
        self.attempt = 0;
        self.next_attempt_at = None;
        self.throttle.reset();
        self.pending.clear();
        info!("Disconnected from {}", self.endpoint);
    }

    /// Advance the state machine to `now`: fire due reconnection attempts
    /// and drain pending inbound messages, in arrival order
    pub fn poll_at(&mut self, now: Instant) -> Vec<TransportEvent> {
        let mut events = std::mem::take(&mut self.pending);

        if let ConnectionState::Reconnecting { .. } = self.state {
            if self.next_attempt_at.map_or(false, |at| now >= at) {
                if let Some(event) = self.try_connect(now) {
                    events.push(event);
                }
            }
        }

        if self.state.is_connected() {
            self.drain_inbound(now, &mut events);
        }

        // A drain error queues its loss events; deliver them in this poll
        events.append(&mut self.pending);
        events
    }

    /// Send one frame at `now`, subject to the throttle. Returns whether the
    /// frame went out; throttled and disconnected frames are dropped
    /// silently.
    pub fn send_frame_at(&mut self, now: Instant, jpeg_b64: String) -> Result<bool, TransportError> {
        if !self.state.is_connected() {
            return Ok(false);
        }
        if !self.throttle.allow_at(now) {
            self.stats.frames_throttled += 1;
            return Ok(false);
        }

        let envelope = FrameEnvelope::frame(jpeg_b64);
        let sent = self.send_envelope(now, &envelope)?;
        if sent {
            self.stats.frames_sent += 1;
        }
        Ok(sent)
    }

    /// Send a target-reset control message. Control messages bypass the
    /// frame throttle. Returns whether the message went out.
    pub fn send_reset_at(
        &mut self,
        now: Instant,
        envelope: &FrameEnvelope,
    ) -> Result<bool, TransportError> {
        if !self.state.is_connected() {
            return Ok(false);
        }
        self.send_envelope(now, envelope)
    }

    /// Returns whether the envelope actually went out. A failed send tears
    /// the link down and surfaces as a ConnectionLost event on the next
    /// poll, not as a hard error to the caller.
    fn send_envelope(
        &mut self,
        now: Instant,
        envelope: &FrameEnvelope,
    ) -> Result<bool, TransportError> {
        let text = envelope.encode()?;
        let Some(link) = self.link.as_mut() else {
            return Err(TransportError::NotConnected);
        };
        if let Err(e) = link.send_text(&text) {
            warn!("Send failed, connection presumed lost: {}", e);
            self.handle_link_loss(now);
            return Ok(false);
        }
        Ok(true)
    }

    fn drain_inbound(&mut self, now: Instant, events: &mut Vec<TransportEvent>) {
        loop {
            let Some(link) = self.link.as_mut() else {
                return;
            };
            match link.poll_message() {
                Ok(Some(raw)) => match RecognitionMessage::decode(&raw) {
                    Ok(msg) => {
                        self.stats.messages_received += 1;
                        events.push(TransportEvent::Message(msg));
                    }
                    Err(e) => {
                        warn!("Skipping malformed backend message: {}", e);
                    }
                },
                Ok(None) => return,
                Err(e) => {
                    warn!("Connection lost: {}", e);
                    self.handle_link_loss(now);
                    return;
                }
            }
        }
    }

    fn try_connect(&mut self, now: Instant) -> Option<TransportEvent> {
        debug!(
            "Connecting to {} (attempt {})",
            self.endpoint,
            self.attempt + 1
        );
        self.state = ConnectionState::Connecting;
        match self.connector.connect(&self.endpoint) {
            Ok(link) => {
                info!("Connected to {}", self.endpoint);
                self.link = Some(link);
                self.state = ConnectionState::Connected;
                self.attempt = 0;
                self.next_attempt_at = None;
                self.throttle.reset();
                Some(TransportEvent::Connected)
            }
            Err(e) => {
                warn!("Connection attempt failed: {}", e);
                self.schedule_retry(now)
            }
        }
    }

    fn handle_link_loss(&mut self, now: Instant) {
        if let Some(mut link) = self.link.take() {
            link.close();
        }
        self.pending.push(TransportEvent::ConnectionLost);
        if let Some(event) = self.schedule_retry(now) {
            self.pending.push(event);
        }
    }

    fn schedule_retry(&mut self, now: Instant) -> Option<TransportEvent> {
        if self.attempt >= self.backoff.max_attempts {
            warn!(
                "Giving up after {} reconnection attempts",
                self.backoff.max_attempts
            );
            self.state = ConnectionState::Failed;
            self.next_attempt_at = None;
            return Some(TransportEvent::RetriesExhausted);
        }

        let delay = self.backoff.delay_for(self.attempt);
        self.attempt += 1;
        self.next_attempt_at = Some(now + delay);
        self.state = ConnectionState::Reconnecting {
            attempt: self.attempt,
        };
        info!(
            "Reconnect attempt {} scheduled in {:?}",
            self.attempt, delay
        );
        None
    }
}

/// Production connector backed by tungstenite
pub struct WsConnector;

impl Connector for WsConnector {
    fn connect(&mut self, endpoint: &str) -> Result<Box<dyn SocketLink>, TransportError> {
        let (socket, _response) =
            tungstenite::connect(endpoint).map_err(|e| TransportError::ConnectFailed {
                endpoint: endpoint.to_string(),
                source: Box::new(e),
            })?;

        // Reads must not block the pipeline loop
        if let MaybeTlsStream::Plain(stream) = socket.get_ref() {
            stream
                .set_nonblocking(true)
                .map_err(|e| TransportError::ConnectFailed {
                    endpoint: endpoint.to_string(),
                    source: Box::new(e),
                })?;
        }

        Ok(Box::new(WsLink { socket }))
    }
}

struct WsLink {
    socket: WebSocket<MaybeTlsStream<TcpStream>>,
}

impl SocketLink for WsLink {
    fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
        self.socket
            .send(Message::Text(text.to_string()))
            .map_err(|e| TransportError::SendFailed(Box::new(e)))
    }

    fn poll_message(&mut self) -> Result<Option<String>, TransportError> {
        match self.socket.read() {
            Ok(Message::Text(text)) => Ok(Some(text)),
            // Pings are answered by tungstenite internally; binary frames
            // are not part of the protocol
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Ok(None)
            }
            Err(e) => Err(TransportError::ConnectionLost(Box::new(e))),
        }
    }

    fn close(&mut self) {
        let _ = self.socket.close(None);
        // Flush the close frame best-effort
        let _ = self.socket.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    /// Shared test-side view of the fake network
    #[derive(Default)]
    struct FakeNet {
        connect_results: VecDeque<bool>,
        connect_calls: u32,
        sent: Vec<String>,
        inbound: VecDeque<String>,
        link_dropped: bool,
    }

    #[derive(Clone)]
    struct FakeConnector(Arc<Mutex<FakeNet>>);

    impl FakeConnector {
        fn new() -> Self {
            Self(Arc::new(Mutex::new(FakeNet::default())))
        }

        fn accept_next(&self, outcomes: &[bool]) {
            let mut net = self.0.lock();
            net.connect_results.extend(outcomes.iter().copied());
        }

        fn connect_calls(&self) -> u32 {
            self.0.lock().connect_calls
        }

        fn sent(&self) -> Vec<String> {
            self.0.lock().sent.clone()
        }

        fn push_inbound(&self, raw: &str) {
            self.0.lock().inbound.push_back(raw.to_string());
        }

        fn drop_link(&self) {
            self.0.lock().link_dropped = true;
        }
    }

    impl Connector for FakeConnector {
        fn connect(&mut self, endpoint: &str) -> Result<Box<dyn SocketLink>, TransportError> {
            let mut net = self.0.lock();
            net.connect_calls += 1;
            let accept = net.connect_results.pop_front().unwrap_or(true);
            if !accept {
                return Err(TransportError::ConnectFailed {
                    endpoint: endpoint.to_string(),
                    source: "connection refused".to_string().into(),
                });
            }
            net.link_dropped = false;
            Ok(Box::new(FakeLink(Arc::clone(&self.0))))
        }
    }

    struct FakeLink(Arc<Mutex<FakeNet>>);

    impl SocketLink for FakeLink {
        fn send_text(&mut self, text: &str) -> Result<(), TransportError> {
            let mut net = self.0.lock();
            if net.link_dropped {
                return Err(TransportError::SendFailed(
                    "broken pipe".to_string().into(),
                ));
            }
            net.sent.push(text.to_string());
            Ok(())
        }

        fn poll_message(&mut self) -> Result<Option<String>, TransportError> {
            let mut net = self.0.lock();
            if net.link_dropped {
                return Err(TransportError::ConnectionLost(
                    "reset by peer".to_string().into(),
                ));
            }
            Ok(net.inbound.pop_front())
        }

        fn close(&mut self) {}
    }

    fn transport(connector: &FakeConnector) -> Transport {
        Transport::new(
            "ws://localhost:8000/ws".to_string(),
            Box::new(connector.clone()),
            BackoffPolicy::default(),
            Duration::from_millis(100),
        )
    }

    #[test]
    fn test_connect_success() {
        // An empty connect script means every attempt is accepted
        let net = FakeConnector::new();
        let mut t = transport(&net);

        let events = t.connect_at(Instant::now());
        assert_eq!(events, vec![TransportEvent::Connected]);
        assert!(t.is_connected());
    }

    #[test]
    fn test_messages_delivered_in_arrival_order() {
        let net = FakeConnector::new();
        let mut t = transport(&net);
        let now = Instant::now();
        t.connect_at(now);

        net.push_inbound(r#"{"maxarg_letter":"A","target_arg_prob":0.3}"#);
        net.push_inbound(r#"{"maxarg_letter":"B","target_arg_prob":0.9}"#);

        let events = t.poll_at(now);
        let letters: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TransportEvent::Message(m) => m.maxarg_letter.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(letters, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_malformed_message_skipped() {
        let net = FakeConnector::new();
        let mut t = transport(&net);
        let now = Instant::now();
        t.connect_at(now);

        net.push_inbound("garbage");
        net.push_inbound(r#"{"maxarg_letter":"B","target_arg_prob":0.9}"#);

        let events = t.poll_at(now);
        // Bad message dropped, good one still delivered
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], TransportEvent::Message(m)
            if m.maxarg_letter.as_deref() == Some("B")));
    }

    #[test]
    fn test_backoff_schedule_doubles_and_caps() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(8000));
        // 16s capped to 10s
        assert_eq!(policy.delay_for(4), Duration::from_millis(10000));
    }

    #[test]
    fn test_retries_follow_backoff_then_fail() {
        let net = FakeConnector::new();
        net.accept_next(&[false, false, false, false, false, false]);
        let mut t = transport(&net);
        let t0 = Instant::now();

        let events = t.connect_at(t0);
        assert!(events.is_empty());
        assert_eq!(t.state(), ConnectionState::Reconnecting { attempt: 1 });
        assert_eq!(net.connect_calls(), 1);

        // Retry is not due yet just before each deadline; fires at it
        let deadlines = [1000u64, 3000, 7000, 15000, 25000];
        for (i, deadline) in deadlines.iter().enumerate() {
            let before = t0 + Duration::from_millis(deadline - 10);
            assert!(t.poll_at(before).is_empty());
            assert_eq!(net.connect_calls(), 1 + i as u32);

            let at = t0 + Duration::from_millis(*deadline);
            let events = t.poll_at(at);
            assert_eq!(net.connect_calls(), 2 + i as u32);
            if i < deadlines.len() - 1 {
                assert!(events.is_empty());
            } else {
                // Fifth retry failed: give up
                assert_eq!(events, vec![TransportEvent::RetriesExhausted]);
            }
        }

        assert_eq!(t.state(), ConnectionState::Failed);

        // No further attempts once failed
        assert!(t.poll_at(t0 + Duration::from_secs(120)).is_empty());
        assert_eq!(net.connect_calls(), 6);

        // An explicit connect leaves the terminal state
        let events = t.connect_at(t0 + Duration::from_secs(121));
        assert_eq!(events, vec![TransportEvent::Connected]);
        assert!(t.is_connected());
    }

    #[test]
    fn test_successful_reconnect_resets_backoff() {
        let net = FakeConnector::new();
        net.accept_next(&[false, true]);
        let mut t = transport(&net);
        let t0 = Instant::now();

        t.connect_at(t0);
        let events = t.poll_at(t0 + Duration::from_millis(1000));
        assert_eq!(events, vec![TransportEvent::Connected]);

        // Drop the link: the next poll detects it and schedules retry 1
        // with the base delay again
        net.drop_link();
        let t1 = t0 + Duration::from_millis(2000);
        let events = t.poll_at(t1);
        assert_eq!(events, vec![TransportEvent::ConnectionLost]);
        assert_eq!(t.state(), ConnectionState::Reconnecting { attempt: 1 });

        let events = t.poll_at(t1 + Duration::from_millis(1000));
        assert_eq!(events, vec![TransportEvent::Connected]);
    }

    #[test]
    fn test_frame_throttle_drops_fast_frames() {
        let net = FakeConnector::new();
        let mut t = transport(&net);
        let t0 = Instant::now();
        t.connect_at(t0);

        assert!(t.send_frame_at(t0, "f1".to_string()).unwrap());
        // 50ms later: inside the 100ms window, dropped
        assert!(!t
            .send_frame_at(t0 + Duration::from_millis(50), "f2".to_string())
            .unwrap());
        // 100ms later: allowed again
        assert!(t
            .send_frame_at(t0 + Duration::from_millis(100), "f3".to_string())
            .unwrap());

        let sent = net.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[0].contains("f1"));
        assert!(sent[1].contains("f3"));
        assert_eq!(t.stats().frames_throttled, 1);
    }

    #[test]
    fn test_burst_of_frames_transmits_exactly_one() {
        let net = FakeConnector::new();
        let mut t = transport(&net);
        let t0 = Instant::now();
        t.connect_at(t0);

        // 20 frames inside one 100ms window
        for i in 0..20 {
            let at = t0 + Duration::from_millis(i * 5);
            t.send_frame_at(at, format!("f{}", i)).unwrap();
        }

        assert_eq!(net.sent().len(), 1);
        assert_eq!(t.stats().frames_sent, 1);
        assert_eq!(t.stats().frames_throttled, 19);
    }

    #[test]
    fn test_reset_bypasses_throttle() {
        let net = FakeConnector::new();
        let mut t = transport(&net);
        let t0 = Instant::now();
        t.connect_at(t0);

        assert!(t.send_frame_at(t0, "f1".to_string()).unwrap());
        let reset = FrameEnvelope::letter_reset("B");
        assert!(t.send_reset_at(t0 + Duration::from_millis(1), &reset).unwrap());

        let sent = net.sent();
        assert_eq!(sent.len(), 2);
        assert!(sent[1].contains("\"new_letter\":\"B\""));
    }

    #[test]
    fn test_frames_dropped_while_disconnected() {
        let net = FakeConnector::new();
        net.accept_next(&[false]);
        let mut t = transport(&net);
        let t0 = Instant::now();
        t.connect_at(t0);

        assert!(!t.send_frame_at(t0, "f1".to_string()).unwrap());
        assert!(net.sent().is_empty());
    }

    #[test]
    fn test_clean_disconnect_stops_reconnection() {
        let net = FakeConnector::new();
        let mut t = transport(&net);
        let t0 = Instant::now();
        t.connect_at(t0);

        t.disconnect();
        assert_eq!(t.state(), ConnectionState::Disconnected);

        // No reconnection attempts ever fire
        assert!(t.poll_at(t0 + Duration::from_secs(60)).is_empty());
        assert_eq!(net.connect_calls(), 1);
    }

    #[test]
    fn test_send_failure_triggers_reconnect() {
        let net = FakeConnector::new();
        let mut t = transport(&net);
        let t0 = Instant::now();
        t.connect_at(t0);

        net.drop_link();
        // The failed send reports the frame as not sent and schedules a
        // retry instead of erroring out
        assert!(!t.send_frame_at(t0, "f1".to_string()).unwrap());
        assert_eq!(t.stats().frames_sent, 0);
        assert_eq!(t.state(), ConnectionState::Reconnecting { attempt: 1 });

        // The loss is reported on the next poll, then the retry reconnects
        let events = t.poll_at(t0 + Duration::from_millis(10));
        assert_eq!(events, vec![TransportEvent::ConnectionLost]);
        let events = t.poll_at(t0 + Duration::from_millis(1000));
        assert_eq!(events, vec![TransportEvent::Connected]);
    }

    #[test]
    fn test_connection_state_description() {
        assert_eq!(ConnectionState::Connected.description(), "Connected");
        assert_eq!(ConnectionState::Connecting.description(), "Connecting");
        assert!(!ConnectionState::Connecting.is_connected());
        assert_eq!(
            ConnectionState::Reconnecting { attempt: 3 }.description(),
            "Reconnecting (attempt 3)"
        );
    }

    #[test]
    fn test_connecting_resolves_within_the_attempt() {
        // The transport marks itself Connecting before dialing; by the time
        // the attempt returns, the state has resolved one way or the other
        let net = FakeConnector::new();
        net.accept_next(&[false, true]);
        let mut t = transport(&net);
        let t0 = Instant::now();

        t.connect_at(t0);
        assert_eq!(t.state(), ConnectionState::Reconnecting { attempt: 1 });

        t.poll_at(t0 + Duration::from_millis(1000));
        assert_eq!(t.state(), ConnectionState::Connected);
    }
}

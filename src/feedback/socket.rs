use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use super::messages::{InboundMessage, LiveFeedback, OutboundMessage, VideoMetrics};
use crate::error::SocketError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ChannelState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Closing => 2,
            Self::Closed => 3,
        }
    }
}

/// The seam between the session controller and the feedback service
pub trait FeedbackChannel: Send + Sync {
    fn state(&self) -> ChannelState;

    /// Queue an outbound message. Fails unless the channel is open.
    fn send(&self, message: OutboundMessage) -> Result<(), SocketError>;

    /// Live feedback ticks as they arrive
    fn subscribe_live(&self) -> broadcast::Receiver<LiveFeedback>;

    /// Install the finalize listener and send `end_session`. The receiver
    /// resolves with the summary, or errors if the channel closes first.
    fn end_session(&self) -> Result<oneshot::Receiver<VideoMetrics>, SocketError>;

    /// Close the channel. Idempotent.
    fn close(&self);
}

/// Channel state and inbound routing shared by channel implementations
///
/// Live ticks fan out on a broadcast channel. A summary resolves the single
/// pending finalize listener, if any, and is dropped otherwise.
pub struct ChannelCore {
    state: AtomicU8,
    live_tx: broadcast::Sender<LiveFeedback>,
    pending_summary: Mutex<Option<oneshot::Sender<VideoMetrics>>>,
}

impl ChannelCore {
    pub fn new(state: ChannelState) -> Self {
        let (live_tx, _) = broadcast::channel(64);
        Self {
            state: AtomicU8::new(state.as_u8()),
            live_tx,
            pending_summary: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn set_state(&self, state: ChannelState) {
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    /// Move to `Closing` unless already closing or closed.
    /// Returns true for the caller that performed the transition.
    pub fn begin_close(&self) -> bool {
        let mut current = self.state.load(Ordering::SeqCst);
        loop {
            if ChannelState::from_u8(current) == ChannelState::Closing
                || ChannelState::from_u8(current) == ChannelState::Closed
            {
                return false;
            }
            match self.state.compare_exchange(
                current,
                ChannelState::Closing.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Mark closed and fail any pending finalize
    pub fn mark_closed(&self) {
        self.set_state(ChannelState::Closed);
        self.drop_pending();
    }

    pub fn subscribe_live(&self) -> broadcast::Receiver<LiveFeedback> {
        self.live_tx.subscribe()
    }

    pub fn install_summary_listener(&self) -> Result<oneshot::Receiver<VideoMetrics>, SocketError> {
        let mut pending = self.lock_pending();
        if pending.as_ref().is_some_and(|tx| !tx.is_closed()) {
            return Err(SocketError::FinalizePending);
        }
        let (tx, rx) = oneshot::channel();
        *pending = Some(tx);
        Ok(rx)
    }

    pub fn has_pending_summary(&self) -> bool {
        self.lock_pending().is_some()
    }

    pub fn drop_pending(&self) {
        if self.lock_pending().take().is_some() {
            debug!("Dropped pending finalize listener");
        }
    }

    /// Decode one text frame and route it
    pub fn dispatch(&self, text: &str) {
        match InboundMessage::decode(text) {
            Ok(InboundMessage::LiveFeedback { feedback }) => {
                debug!(
                    "Live feedback: attention={} sentiment={:?}",
                    feedback.attention_status, feedback.sentiment
                );
                // No subscribers is fine
                let _ = self.live_tx.send(feedback);
            }
            Ok(InboundMessage::SessionSummary { data }) => match self.lock_pending().take() {
                Some(tx) => {
                    info!("Received session summary: {:?}", data.video_metrics);
                    let _ = tx.send(data.video_metrics);
                }
                None => warn!("Session summary with no pending finalize; dropping"),
            },
            Err(e) => warn!("{}", e),
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<oneshot::Sender<VideoMetrics>>> {
        self.pending_summary
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Websocket connection to the feedback service
///
/// One connection per page session; it never reconnects.
pub struct FeedbackSocket {
    core: Arc<ChannelCore>,
    outbound: mpsc::UnboundedSender<Message>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl FeedbackSocket {
    /// Connect to the feedback endpoint
    pub async fn connect(url: &str) -> Result<Self, SocketError> {
        info!("Connecting to feedback service at {}", url);

        let (ws, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| SocketError::Connect(e.to_string()))?;

        info!("Feedback channel open");

        Ok(Self::from_stream(ws))
    }

    /// Wrap an established websocket
    pub fn from_stream<S>(ws: WebSocketStream<S>) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let core = Arc::new(ChannelCore::new(ChannelState::Open));
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (mut sink, mut stream) = ws.split();

        let writer_core = Arc::clone(&core);
        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    warn!("Feedback channel send failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            writer_core.mark_closed();
            debug!("Feedback writer stopped");
        });

        let reader_core = Arc::clone(&core);
        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => reader_core.dispatch(&text),
                    Ok(Message::Close(frame)) => {
                        info!("Feedback channel closed by server: {:?}", frame);
                        break;
                    }
                    Ok(Message::Binary(data)) => {
                        warn!("Ignoring binary feedback frame ({} bytes)", data.len());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("Feedback channel error: {}", e);
                        break;
                    }
                }
            }
            reader_core.mark_closed();
            info!("Feedback channel closed");
        });

        Self {
            core,
            outbound,
            tasks: Mutex::new(vec![writer, reader]),
        }
    }

    /// A channel that never connected
    pub fn closed() -> Self {
        let (outbound, _) = mpsc::unbounded_channel();
        Self {
            core: Arc::new(ChannelCore::new(ChannelState::Closed)),
            outbound,
            tasks: Mutex::new(Vec::new()),
        }
    }
}

impl FeedbackChannel for FeedbackSocket {
    fn state(&self) -> ChannelState {
        self.core.state()
    }

    fn send(&self, message: OutboundMessage) -> Result<(), SocketError> {
        if self.core.state() != ChannelState::Open {
            return Err(SocketError::NotOpen);
        }
        let json = serde_json::to_string(&message)?;
        self.outbound
            .send(Message::Text(json))
            .map_err(|_| SocketError::NotOpen)
    }

    fn subscribe_live(&self) -> broadcast::Receiver<LiveFeedback> {
        self.core.subscribe_live()
    }

    fn end_session(&self) -> Result<oneshot::Receiver<VideoMetrics>, SocketError> {
        if self.core.state() != ChannelState::Open {
            return Err(SocketError::NotOpen);
        }
        let rx = self.core.install_summary_listener()?;
        if let Err(e) = self.send(OutboundMessage::EndSession) {
            self.core.drop_pending();
            return Err(e);
        }
        info!("Sent end_session; awaiting summary");
        Ok(rx)
    }

    fn close(&self) {
        if !self.core.begin_close() {
            return;
        }
        info!("Closing feedback channel");
        self.core.drop_pending();
        if self.outbound.send(Message::Close(None)).is_err() {
            self.core.mark_closed();
        }
    }
}

impl Drop for FeedbackSocket {
    fn drop(&mut self) {
        let tasks = self
            .tasks
            .get_mut()
            .map(std::mem::take)
            .unwrap_or_default();
        for task in tasks {
            task.abort();
        }
    }
}

//! Pose stream transport
//!
//! The controller only sees [`PoseStream`]: a source of binary/text messages
//! that ends with `Ok(None)` when the remote side closes. Socket handling is
//! left to the embedding application, which can bridge any implementation
//! through [`ChannelConnector`].

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use marionette_core::{MarionetteError, MarionetteResult};

/// One message received on the stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    /// Pose frame payload
    Binary(Bytes),
    /// Not protocol traffic; ignored by the client
    Text(String),
}

impl StreamMessage {
    pub fn len(&self) -> usize {
        match self {
            StreamMessage::Binary(b) => b.len(),
            StreamMessage::Text(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An open stream connection
#[async_trait]
pub trait PoseStream: Send {
    /// Wait for the next message; `Ok(None)` once the remote closed the stream
    async fn recv(&mut self) -> MarionetteResult<Option<StreamMessage>>;

    /// Close the connection; later messages are discarded
    async fn close(&mut self) -> MarionetteResult<()>;
}

/// Opens stream connections
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, url: &str) -> MarionetteResult<Box<dyn PoseStream>>;
}

/// Item carried by a stream channel
pub type FeedItem = MarionetteResult<StreamMessage>;

/// Producer side of a [`ChannelStream`], owned by the socket implementation
#[derive(Debug)]
pub struct StreamFeed {
    url: String,
    tx: mpsc::Sender<FeedItem>,
}

impl StreamFeed {
    /// URL the client asked to connect to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Deliver a message; fails once the consumer has closed the stream
    pub async fn send(&self, message: StreamMessage) -> MarionetteResult<()> {
        self.tx
            .send(Ok(message))
            .await
            .map_err(|_| MarionetteError::StreamClosed)
    }

    pub async fn send_binary(&self, payload: impl Into<Bytes>) -> MarionetteResult<()> {
        self.send(StreamMessage::Binary(payload.into())).await
    }

    pub async fn send_text(&self, text: impl Into<String>) -> MarionetteResult<()> {
        self.send(StreamMessage::Text(text.into())).await
    }

    /// Report a socket error to the consumer
    pub async fn fail(&self, reason: impl Into<String>) -> MarionetteResult<()> {
        self.tx
            .send(Err(MarionetteError::TransportFailure(reason.into())))
            .await
            .map_err(|_| MarionetteError::StreamClosed)
    }

    /// Whether the consumer has closed the stream
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Channel-backed [`PoseStream`]
///
/// Dropping every [`StreamFeed`] reads as a remote close.
#[derive(Debug)]
pub struct ChannelStream {
    rx: mpsc::Receiver<FeedItem>,
    closed: bool,
}

impl ChannelStream {
    /// Create a connected stream / feed pair
    pub fn pair(url: impl Into<String>, capacity: usize) -> (ChannelStream, StreamFeed) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            ChannelStream { rx, closed: false },
            StreamFeed {
                url: url.into(),
                tx,
            },
        )
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl PoseStream for ChannelStream {
    async fn recv(&mut self) -> MarionetteResult<Option<StreamMessage>> {
        if self.closed {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(item) => item.map(Some),
            None => Ok(None), // All feeds dropped
        }
    }

    async fn close(&mut self) -> MarionetteResult<()> {
        self.closed = true;
        self.rx.close();
        // Discard anything already queued
        while self.rx.try_recv().is_ok() {}
        Ok(())
    }
}

/// Connector handing a fresh [`StreamFeed`] to an acceptor for every connect
#[derive(Clone, Debug)]
pub struct ChannelConnector {
    accept_tx: mpsc::Sender<StreamFeed>,
    capacity: usize,
}

impl ChannelConnector {
    /// Create a connector and the receiver on which new feeds arrive
    pub fn new(capacity: usize) -> (ChannelConnector, mpsc::Receiver<StreamFeed>) {
        let (accept_tx, accept_rx) = mpsc::channel(4);
        (
            ChannelConnector {
                accept_tx,
                capacity,
            },
            accept_rx,
        )
    }
}

#[async_trait]
impl StreamConnector for ChannelConnector {
    async fn connect(&self, url: &str) -> MarionetteResult<Box<dyn PoseStream>> {
        let (stream, feed) = ChannelStream::pair(url, self.capacity);
        self.accept_tx
            .send(feed)
            .await
            .map_err(|_| MarionetteError::TransportFailure(format!("no acceptor for {url}")))?;
        tracing::debug!(url, "stream channel connected");
        Ok(Box::new(stream))
    }
}

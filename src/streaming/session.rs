use super::multipart::encode_part;
use crate::error::StreamError;
use crate::frame::Frame;
use bytes::Bytes;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::trace;
use uuid::Uuid;

/// One connected MJPEG client.
///
/// Parts are handed to the HTTP body through a small channel; a full channel
/// means the client is not keeping up, which the relay bounds with a timeout.
/// Dropping the session ends the client's response.
#[derive(Debug)]
pub struct StreamSession {
    id: Uuid,
    sender: mpsc::Sender<Bytes>,
    opened_at: Instant,
    frames_sent: u64,
    bytes_sent: u64,
}

/// Final numbers for a session that has ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedSession {
    pub id: Uuid,
    pub frames_sent: u64,
    pub connected_for: Duration,
}

impl StreamSession {
    /// Create a session and the receiving end its response body reads from
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (sender, receiver) = mpsc::channel(buffer.max(1));
        (
            Self {
                id: Uuid::new_v4(),
                sender,
                opened_at: Instant::now(),
                frames_sent: 0,
                bytes_sent: 0,
            },
            receiver,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Write one frame as a multipart part, waiting at most `timeout`.
    /// Returns the number of bytes queued for the client.
    pub async fn send_frame(&mut self, frame: &Frame, timeout: Duration) -> Result<u64, StreamError> {
        let part = encode_part(frame.data());
        let len = part.len() as u64;

        match tokio::time::timeout(timeout, self.sender.send(part)).await {
            Ok(Ok(())) => {
                self.frames_sent += 1;
                self.bytes_sent += len;
                trace!("Session {} got frame {} ({} bytes)", self.id, frame.id, len);
                Ok(len)
            }
            Ok(Err(_)) => Err(StreamError::ClientDisconnected),
            Err(_) => Err(StreamError::WriteTimeout {
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    /// The client went away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub fn frames_sent(&self) -> u64 {
        self.frames_sent
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    pub fn age(&self) -> Duration {
        self.opened_at.elapsed()
    }

    pub(crate) fn close(self) -> ClosedSession {
        ClosedSession {
            id: self.id,
            frames_sent: self.frames_sent,
            connected_for: self.age(),
        }
    }
}

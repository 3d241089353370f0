use super::session::{ClosedSession, StreamSession};
use super::stats::StreamStats;
use crate::error::StreamError;
use crate::frame::{FrameLease, FrameSource};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};
use uuid::Uuid;

/// Fans live frames out to connected MJPEG clients while streaming is on.
///
/// Each pump acquires one frame, writes it to every session and releases it
/// before returning; no session holds a frame across ticks.
pub struct StreamRelay {
    streaming: bool,
    sessions: Vec<StreamSession>,
    max_clients: usize,
    write_timeout: Duration,
    stats: StreamStats,
}

impl StreamRelay {
    pub fn new(max_clients: usize, write_timeout: Duration) -> Self {
        Self {
            streaming: false,
            sessions: Vec::new(),
            max_clients,
            write_timeout,
            stats: StreamStats::default(),
        }
    }

    /// Enter streaming mode. Returns false if already streaming.
    pub fn start(&mut self) -> bool {
        if self.streaming {
            return false;
        }
        self.streaming = true;
        info!(
            "Streaming started ({} client(s) attached)",
            self.sessions.len()
        );
        true
    }

    /// Leave streaming mode. Attached clients stay connected but idle.
    pub fn stop(&mut self) -> bool {
        if !self.streaming {
            return false;
        }
        self.streaming = false;
        info!("Streaming stopped");
        true
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    /// Register a new client, subject to the client limit
    pub fn attach(&mut self, session: StreamSession) -> Result<Uuid, StreamError> {
        self.prune_closed();

        if self.sessions.len() >= self.max_clients {
            self.stats.rejected_clients += 1;
            warn!(
                "Rejecting stream client {}: {} already connected",
                session.id(),
                self.sessions.len()
            );
            return Err(StreamError::TooManyClients {
                max: self.max_clients,
            });
        }

        let id = session.id();
        self.sessions.push(session);
        self.stats.sessions_opened += 1;
        info!(
            "Stream client {} attached ({}/{})",
            id,
            self.sessions.len(),
            self.max_clients
        );
        Ok(id)
    }

    /// Drop sessions whose clients have gone away
    pub fn prune_closed(&mut self) -> Vec<ClosedSession> {
        let (closed, open): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sessions)
            .into_iter()
            .partition(StreamSession::is_closed);
        self.sessions = open;

        closed
            .into_iter()
            .map(|session| {
                self.stats.sessions_closed += 1;
                debug!(
                    "Stream client {} disconnected after {:?}",
                    session.id(),
                    session.age()
                );
                session.close()
            })
            .collect()
    }

    /// Relay one frame to every session. Returns the sessions that ended.
    ///
    /// Does nothing unless streaming with at least one client. A missing
    /// frame skips the tick; a failed write ends only that session.
    pub async fn pump(&mut self, source: &Arc<dyn FrameSource>) -> Vec<ClosedSession> {
        let mut ended = self.prune_closed();

        if !self.streaming || self.sessions.is_empty() {
            return ended;
        }

        let lease = match FrameLease::acquire(source).await {
            Ok(lease) => lease,
            Err(e) => {
                self.stats.skipped_ticks += 1;
                if e.is_transient() {
                    trace!("No frame for stream tick: {}", e);
                } else {
                    warn!("Frame source refused stream tick: {}", e);
                }
                return ended;
            }
        };

        // One slow client must not hold the frame back from the others
        let frame = lease.frame();
        let timeout = self.write_timeout;
        let results = join_all(
            self.sessions
                .iter_mut()
                .map(move |session| session.send_frame(frame, timeout)),
        )
        .await;

        let mut failed = Vec::new();
        for (index, result) in results.into_iter().enumerate() {
            match result {
                Ok(bytes) => self.stats.record_part(bytes),
                Err(e) => {
                    if e.is_write_failure() {
                        self.stats.write_failures += 1;
                    }
                    warn!("Ending stream session {}: {}", self.sessions[index].id(), e);
                    failed.push(index);
                }
            }
        }

        self.stats.frames_relayed += 1;
        lease.release();

        for index in failed.into_iter().rev() {
            let session = self.sessions.remove(index);
            self.stats.sessions_closed += 1;
            ended.push(session.close());
        }

        ended
    }

    /// Disconnect every client
    pub fn close_all(&mut self) -> Vec<ClosedSession> {
        let closed: Vec<_> = self.sessions.drain(..).map(StreamSession::close).collect();
        self.stats.sessions_closed += closed.len() as u64;
        closed
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn max_clients(&self) -> usize {
        self.max_clients
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }
}

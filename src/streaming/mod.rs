#[cfg(feature = "streaming")]
mod handlers;
mod multipart;
mod relay;
#[cfg(feature = "streaming")]
mod server;
mod session;
mod stats;
#[cfg(all(test, feature = "streaming"))]
mod tests;

pub use multipart::{encode_part, BOUNDARY, CONTENT_TYPE};
pub use relay::StreamRelay;
#[cfg(feature = "streaming")]
pub use server::{router, ServerState, StreamServer, StreamServerBuilder};
pub use session::{ClosedSession, StreamSession};
pub use stats::StreamStats;

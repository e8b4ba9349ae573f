//! Player module - playback session and its seams
//!
//! - `session`: the state machine that owns the audio output
//! - `handle`: cloneable handle injected into the UI
//! - `output`: audio output trait, resource ids and media events
//! - `resolver`: link resolution trait implemented by the service client

mod handle;
mod output;
mod resolver;
mod session;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub use handle::PlayerHandle;
pub use output::{AudioOutput, MediaEvent, MediaListener, ResourceId};
pub use resolver::{LinkOutcome, LinkResolver};
pub use session::{PlaybackState, PlayerNotice, SessionConfig, SessionPhase, SkipReason};

/// Start the session on its own task.
///
/// The returned handle is the only way in; notices are meant for the UI's
/// notification area.
pub fn spawn_session<R: LinkResolver>(
    resolver: R,
    output: Box<dyn AudioOutput>,
    config: SessionConfig,
) -> (PlayerHandle, mpsc::UnboundedReceiver<PlayerNotice>, JoinHandle<()>) {
    let (session, notices) = session::PlayerSession::new(resolver, output, config);
    let handle = PlayerHandle::new(session.inbox(), session.subscribe());
    let task = tokio::spawn(session.run());
    (handle, notices, task)
}

//! Audio output seam used by the playback session
//!
//! The session owns exactly one `AudioOutput`. Each opened link is a
//! resource with its own id and its own `MediaListener`; releasing the
//! resource drops the listener, so nothing it emitted afterwards can reach
//! the session.

use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use super::session::SessionInput;

/// Identity of one opened audio resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res-{}", self.0)
    }
}

/// Events emitted by an audio resource
#[derive(Clone, Debug, PartialEq)]
pub enum MediaEvent {
    /// Output accepted the media and audio is flowing
    Started,
    TimeUpdate {
        position: Duration,
        duration: Option<Duration>,
    },
    /// Natural end of media
    Ended,
    /// Load, decode or start failure
    Failed(String),
}

/// Single subscription of one resource to the session inbox
pub struct MediaListener {
    resource: ResourceId,
    inbox: UnboundedSender<SessionInput>,
}

impl MediaListener {
    pub(crate) fn new(resource: ResourceId, inbox: UnboundedSender<SessionInput>) -> Self {
        Self { resource, inbox }
    }

    pub fn resource(&self) -> ResourceId {
        self.resource
    }

    /// Returns false once the session is gone.
    pub fn emit(&self, event: MediaEvent) -> bool {
        self.inbox
            .send(SessionInput::Media {
                resource: self.resource,
                event,
            })
            .is_ok()
    }
}

impl fmt::Debug for MediaListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaListener")
            .field("resource", &self.resource)
            .finish()
    }
}

/// The media output owned by the playback session.
///
/// Implementations must emit `Started` or `Failed` for every `open` and
/// drop the listener on `release`. Events already in flight when a resource
/// is released are discarded by the session.
pub trait AudioOutput: Send + 'static {
    fn open(&mut self, resource: ResourceId, link: &str, volume: f32, listener: MediaListener);
    fn pause(&mut self);
    fn resume(&mut self);
    fn seek(&mut self, position: Duration);
    fn set_volume(&mut self, volume: f32);
    /// Pause, detach the listener and clear the source.
    fn release(&mut self);
}

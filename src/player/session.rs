//! Playback session state machine
//!
//! One `PlayerSession` owns the audio output and every piece of playback
//! state. All transitions happen inside `handle_input`, one input at a time:
//! commands from the UI, link results from the service, media events from
//! the output and delayed auto-advances all arrive through the same inbox.

use anyhow::Result;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

use crate::model::{PlaylistSummary, Track};
use super::output::{AudioOutput, MediaEvent, MediaListener, ResourceId};
use super::resolver::{LinkOutcome, LinkResolver};

pub const DEFAULT_TITLE: &str = "Playlist Player";
pub const DEFAULT_VOLUME: f32 = 0.5;
pub const MAX_LINK_RETRIES: u32 = 3;
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_millis(300);

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub max_retries: u32,
    /// Gap between releasing a finished resource and opening the next one
    pub advance_delay: Duration,
    pub initial_volume: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_LINK_RETRIES,
            advance_delay: DEFAULT_ADVANCE_DELAY,
            initial_volume: DEFAULT_VOLUME,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
    Errored,
}

/// Snapshot of the session published to the UI after every input
#[derive(Clone, Debug)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    pub playlist: Option<PlaylistSummary>,
    pub sequence: Vec<Track>,
    pub phase: SessionPhase,
    pub is_playing: bool,
    pub position: Duration,
    pub duration: Duration,
    pub volume: f32,
    pub visible: bool,
    pub retries: u32,
    pub title: String,
}

impl PlaybackState {
    fn new(volume: f32) -> Self {
        Self {
            current_track: None,
            playlist: None,
            sequence: Vec::new(),
            phase: SessionPhase::Idle,
            is_playing: false,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            volume,
            visible: false,
            retries: 0,
            title: DEFAULT_TITLE.to_string(),
        }
    }

    /// True when `track` is the active track, compared by source id.
    pub fn is_current(&self, track: &Track) -> bool {
        self.current_track
            .as_ref()
            .is_some_and(|current| current.same_as(track))
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SeekTarget {
    /// 0-100 of the track duration
    Percent(f64),
    Absolute(Duration),
}

#[derive(Debug)]
pub enum PlayerCommand {
    Play {
        track: Track,
        playlist: Option<PlaylistSummary>,
        sequence: Option<Vec<Track>>,
    },
    Toggle,
    Seek(SeekTarget),
    SetVolume(f32),
    Next(Option<Vec<Track>>),
    Previous(Option<Vec<Track>>),
    UpdateSequence(Vec<Track>),
    Stop,
    Shutdown,
}

#[derive(Debug)]
pub enum SessionInput {
    Command(PlayerCommand),
    LinkResolved {
        source_id: String,
        generation: u64,
        result: Result<LinkOutcome>,
    },
    Media {
        resource: ResourceId,
        event: MediaEvent,
    },
    Advance {
        generation: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    RetriesExhausted,
    NoAlternatives,
    ServiceUnavailable,
    NoSourceId,
}

/// One-shot messages for the UI
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayerNotice {
    Pending { track: String, message: String },
    Skipped { track: String, reason: SkipReason },
}

#[derive(Clone, Copy, Debug)]
enum Step {
    Next,
    Previous,
}

struct ActiveResource {
    id: ResourceId,
    link: String,
}

pub struct PlayerSession<R: LinkResolver> {
    resolver: R,
    output: Box<dyn AudioOutput>,
    config: SessionConfig,
    state: PlaybackState,
    active: Option<ActiveResource>,
    next_resource: u64,
    /// Bumped on every load and stop; stale link results and advances carry an older value
    generation: u64,
    /// Generation an auto-advance was scheduled for
    pending_advance: Option<u64>,
    /// Pause asked for before the resource started; applied on `Started`
    pause_requested: bool,
    inbox_tx: mpsc::UnboundedSender<SessionInput>,
    inbox_rx: mpsc::UnboundedReceiver<SessionInput>,
    notices: mpsc::UnboundedSender<PlayerNotice>,
    state_tx: watch::Sender<PlaybackState>,
    closed: bool,
}

impl<R: LinkResolver> PlayerSession<R> {
    pub fn new(
        resolver: R,
        output: Box<dyn AudioOutput>,
        config: SessionConfig,
    ) -> (Self, mpsc::UnboundedReceiver<PlayerNotice>) {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let state = PlaybackState::new(config.initial_volume.clamp(0.0, 1.0));
        let (state_tx, _) = watch::channel(state.clone());

        let session = Self {
            resolver,
            output,
            config,
            state,
            active: None,
            next_resource: 0,
            generation: 0,
            pending_advance: None,
            pause_requested: false,
            inbox_tx,
            inbox_rx,
            notices,
            state_tx,
            closed: false,
        };
        (session, notice_rx)
    }

    pub fn inbox(&self) -> mpsc::UnboundedSender<SessionInput> {
        self.inbox_tx.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state_tx.subscribe()
    }

    #[cfg(test)]
    fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub async fn run(mut self) {
        tracing::info!("Playback session started");
        while let Some(input) = self.inbox_rx.recv().await {
            self.handle_input(input);
            if self.closed {
                break;
            }
        }
        self.stop();
        self.publish();
        tracing::info!("Playback session closed");
    }

    pub fn handle_input(&mut self, input: SessionInput) {
        match input {
            SessionInput::Command(command) => self.handle_command(command),
            SessionInput::LinkResolved {
                source_id,
                generation,
                result,
            } => self.on_link_resolved(&source_id, generation, result),
            SessionInput::Media { resource, event } => self.on_media(resource, event),
            SessionInput::Advance { generation } => self.on_advance(generation),
        }
        self.publish();
    }

    fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::Play {
                track,
                playlist,
                sequence,
            } => self.play(track, playlist, sequence),
            PlayerCommand::Toggle => self.toggle(),
            PlayerCommand::Seek(target) => self.seek(target),
            PlayerCommand::SetVolume(level) => self.set_volume(level),
            PlayerCommand::Next(sequence) => self.step(Step::Next, sequence),
            PlayerCommand::Previous(sequence) => self.step(Step::Previous, sequence),
            PlayerCommand::UpdateSequence(tracks) => self.update_sequence(tracks),
            PlayerCommand::Stop => self.stop(),
            PlayerCommand::Shutdown => {
                self.stop();
                self.closed = true;
            }
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.state.clone());
    }

    // ========================================================================
    // Commands
    // ========================================================================

    pub fn play(
        &mut self,
        track: Track,
        playlist: Option<PlaylistSummary>,
        sequence: Option<Vec<Track>>,
    ) {
        let has_context = playlist.is_some() || sequence.is_some();

        if self.state.is_current(&track) {
            if has_context {
                self.set_context(playlist, sequence);
            }
            tracing::debug!(source_id = %track.source_id, "Play on active track, toggling");
            self.toggle();
            return;
        }

        self.pause_requested = false;
        self.set_context(playlist, sequence);
        self.load_track(track);
    }

    pub fn pause(&mut self) {
        if self.state.current_track.is_none() {
            return;
        }
        match self.state.phase {
            SessionPhase::Playing if self.active.is_some() => {
                self.output.pause();
                self.state.phase = SessionPhase::Paused;
                tracing::debug!(position_ms = self.state.position.as_millis() as u64, "Paused");
            }
            // Nothing is audible yet; the next resource starts paused
            SessionPhase::Loading => self.pause_requested = true,
            _ if self.advance_pending() => self.pause_requested = true,
            _ => {}
        }
        self.state.is_playing = false;
    }

    pub fn resume(&mut self) {
        if self.state.current_track.is_none() {
            return;
        }
        self.pause_requested = false;
        if self.advance_pending() {
            tracing::debug!("Resume during advance gap, advancing now");
            self.advance();
            return;
        }
        if self.active.is_none() {
            // Ended, errored or pending: nothing to resume, load the track again
            if self.state.phase != SessionPhase::Loading {
                self.start_loading();
            }
            return;
        }
        if self.state.phase == SessionPhase::Paused {
            self.output.resume();
            self.state.phase = SessionPhase::Playing;
            self.state.is_playing = true;
            tracing::debug!("Resumed");
        }
    }

    /// Pause when playing or about to play, resume otherwise
    pub fn toggle(&mut self) {
        let starting = self.state.phase == SessionPhase::Loading && !self.pause_requested;
        if self.state.is_playing || starting {
            self.pause();
        } else {
            self.resume();
        }
    }

    pub fn seek(&mut self, target: SeekTarget) {
        if self.active.is_none() {
            return;
        }
        let duration = self.state.duration;
        let position = match target {
            SeekTarget::Percent(percent) => {
                if !percent.is_finite() {
                    return;
                }
                duration.mul_f64((percent / 100.0).clamp(0.0, 1.0))
            }
            SeekTarget::Absolute(time) => time.min(duration),
        };
        self.output.seek(position);
        self.state.position = position;
    }

    pub fn set_volume(&mut self, level: f32) {
        if !level.is_finite() {
            tracing::warn!(level, "Ignoring non-finite volume");
            return;
        }
        let volume = level.clamp(0.0, 1.0);
        self.state.volume = volume;
        if self.active.is_some() {
            self.output.set_volume(volume);
        }
    }

    fn step(&mut self, step: Step, sequence: Option<Vec<Track>>) {
        if let Some(sequence) = sequence {
            self.state.sequence = sequence;
        }
        match self.adjacent(step) {
            Some(track) => {
                self.pause_requested = false;
                self.load_track(track);
            }
            None => tracing::debug!(?step, "No adjacent track, ignoring"),
        }
    }

    pub fn update_sequence(&mut self, tracks: Vec<Track>) {
        tracing::debug!(count = tracks.len(), "Sequence updated");
        self.state.sequence = tracks;
    }

    /// Release the output and clear the active track. Volume and sequence survive.
    pub fn stop(&mut self) {
        self.release_active();
        self.generation += 1;
        self.pause_requested = false;
        self.state.current_track = None;
        self.state.phase = SessionPhase::Idle;
        self.state.is_playing = false;
        self.state.position = Duration::ZERO;
        self.state.duration = Duration::ZERO;
        self.state.retries = 0;
        self.state.visible = false;
        self.state.title = DEFAULT_TITLE.to_string();
    }

    // ========================================================================
    // Loading
    // ========================================================================

    fn set_context(&mut self, playlist: Option<PlaylistSummary>, sequence: Option<Vec<Track>>) {
        self.state.playlist = playlist;
        self.state.sequence = sequence.unwrap_or_default();
    }

    fn load_track(&mut self, track: Track) {
        tracing::info!(
            track = %track.name,
            author = %track.author,
            source_id = %track.source_id,
            "Loading track"
        );
        self.state.retries = 0;
        self.state.visible = true;
        self.state.title = format!("{} - {}", track.name, track.author);
        self.state.current_track = Some(track);
        self.start_loading();
    }

    /// (Re)load the active track from its known link, or ask the service for one.
    fn start_loading(&mut self) {
        self.release_active();
        self.generation += 1;
        self.state.phase = SessionPhase::Loading;
        self.state.is_playing = false;
        self.state.position = Duration::ZERO;
        self.state.duration = Duration::ZERO;

        let link = self
            .state
            .current_track
            .as_ref()
            .and_then(|track| track.link.clone())
            .filter(|link| !link.is_empty());
        match link {
            Some(link) => self.open_link(link),
            None => self.request_link(None),
        }
    }

    fn open_link(&mut self, link: String) {
        self.release_active();

        let id = ResourceId(self.next_resource);
        self.next_resource += 1;
        let listener = MediaListener::new(id, self.inbox_tx.clone());

        tracing::debug!(resource = %id, link = %link, volume = self.state.volume, "Opening audio resource");
        self.output.open(id, &link, self.state.volume, listener);

        if let Some(track) = self.state.current_track.as_mut() {
            track.link = Some(link.clone());
        }
        self.active = Some(ActiveResource { id, link });
        self.state.phase = SessionPhase::Loading;
    }

    fn request_link(&mut self, failed_link: Option<String>) {
        let Some(track) = self.state.current_track.as_ref() else {
            return;
        };
        if track.source_id.is_empty() {
            self.skip(SkipReason::NoSourceId);
            return;
        }

        let source_id = track.source_id.clone();
        let generation = self.generation;
        let resolver = self.resolver.clone();
        let inbox = self.inbox_tx.clone();
        self.state.phase = SessionPhase::Loading;

        tracing::debug!(
            source_id = %source_id,
            failed_link = ?failed_link,
            attempt = self.state.retries,
            "Requesting playable link"
        );
        tokio::spawn(async move {
            let result = resolver.resolve_link(source_id.clone(), failed_link).await;
            let _ = inbox.send(SessionInput::LinkResolved {
                source_id,
                generation,
                result,
            });
        });
    }

    fn release_active(&mut self) -> Option<ActiveResource> {
        let active = self.active.take()?;
        self.output.release();
        tracing::trace!(resource = %active.id, "Released audio resource");
        Some(active)
    }

    // ========================================================================
    // Events
    // ========================================================================

    fn on_link_resolved(&mut self, source_id: &str, generation: u64, result: Result<LinkOutcome>) {
        let still_current = self
            .state
            .current_track
            .as_ref()
            .is_some_and(|track| track.source_id == source_id);
        if generation != self.generation || !still_current {
            tracing::debug!(source_id, generation, "Dropping stale link result");
            return;
        }

        match result {
            Ok(LinkOutcome::Ready(link)) => self.open_link(link),
            Ok(LinkOutcome::Pending(message)) => {
                tracing::info!(source_id, message = %message, "Link not ready yet");
                self.state.phase = SessionPhase::Idle;
                self.state.is_playing = false;
                self.pause_requested = false;
                let track = self.current_name();
                let _ = self.notices.send(PlayerNotice::Pending { track, message });
            }
            Ok(LinkOutcome::NoAlternatives) => self.skip(SkipReason::NoAlternatives),
            Err(e) => {
                tracing::warn!(source_id, error = %e, "Link request failed");
                self.skip(SkipReason::ServiceUnavailable);
            }
        }
    }

    fn on_media(&mut self, resource: ResourceId, event: MediaEvent) {
        let is_live = self.active.as_ref().is_some_and(|active| active.id == resource);
        if !is_live {
            tracing::trace!(resource = %resource, ?event, "Ignoring event from released resource");
            return;
        }

        match event {
            MediaEvent::Started if self.pause_requested => {
                tracing::info!(resource = %resource, "Playback started paused");
                self.pause_requested = false;
                self.output.pause();
                self.state.phase = SessionPhase::Paused;
                self.state.is_playing = false;
                self.state.visible = true;
            }
            MediaEvent::Started => {
                tracing::info!(resource = %resource, "Playback started");
                self.state.phase = SessionPhase::Playing;
                self.state.is_playing = true;
                self.state.visible = true;
            }
            MediaEvent::TimeUpdate { position, duration } => {
                self.state.position = position;
                if let Some(duration) = duration {
                    self.state.duration = duration;
                }
            }
            MediaEvent::Ended => self.on_ended(),
            MediaEvent::Failed(reason) => self.on_failed(reason),
        }
    }

    fn on_ended(&mut self) {
        tracing::debug!("Track ended");
        self.release_active();
        self.state.is_playing = false;
        self.state.phase = SessionPhase::Ended;
        self.advance_or_idle();
    }

    fn on_failed(&mut self, reason: String) {
        let failed = self.release_active();
        self.state.is_playing = false;
        self.state.phase = SessionPhase::Errored;
        tracing::warn!(
            track = %self.current_name(),
            reason = %reason,
            retries = self.state.retries,
            "Playback failed"
        );

        if self.state.retries >= self.config.max_retries {
            self.skip(SkipReason::RetriesExhausted);
            return;
        }
        self.state.retries += 1;
        self.request_link(failed.map(|active| active.link));
    }

    fn skip(&mut self, reason: SkipReason) {
        let track = self.current_name();
        tracing::warn!(track = %track, ?reason, "Skipping track");
        let _ = self.notices.send(PlayerNotice::Skipped { track, reason });

        self.release_active();
        self.state.is_playing = false;
        self.state.phase = SessionPhase::Errored;
        self.advance_or_idle();
    }

    fn advance_or_idle(&mut self) {
        if self.adjacent(Step::Next).is_none() {
            self.state.phase = SessionPhase::Idle;
            return;
        }

        let generation = self.generation;
        self.pending_advance = Some(generation);
        let delay = self.config.advance_delay;
        let inbox = self.inbox_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = inbox.send(SessionInput::Advance { generation });
        });
    }

    fn on_advance(&mut self, generation: u64) {
        if generation != self.generation {
            tracing::debug!(generation, "Dropping stale advance");
            return;
        }
        self.advance();
    }

    fn advance_pending(&self) -> bool {
        self.pending_advance == Some(self.generation)
    }

    fn advance(&mut self) {
        self.pending_advance = None;
        match self.adjacent(Step::Next) {
            Some(track) => self.load_track(track),
            None => self.state.phase = SessionPhase::Idle,
        }
    }

    fn adjacent(&self, step: Step) -> Option<Track> {
        let current = self.state.current_track.as_ref()?;
        let index = self
            .state
            .sequence
            .iter()
            .position(|track| track.same_as(current))?;
        let target = match step {
            Step::Next => index + 1,
            Step::Previous => index.checked_sub(1)?,
        };
        self.state.sequence.get(target).cloned()
    }

    fn current_name(&self) -> String {
        self.state
            .current_track
            .as_ref()
            .map(|track| track.name.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{HashSet, VecDeque};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct ScriptedResolver {
        responses: Arc<Mutex<VecDeque<Result<LinkOutcome, String>>>>,
        requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
    }

    impl ScriptedResolver {
        fn with(responses: Vec<Result<LinkOutcome, String>>) -> Self {
            let resolver = Self::default();
            resolver.responses.lock().unwrap().extend(responses);
            resolver
        }

        fn requests(&self) -> Vec<(String, Option<String>)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl LinkResolver for ScriptedResolver {
        async fn resolve_link(
            &self,
            source_id: String,
            failed_link: Option<String>,
        ) -> Result<LinkOutcome> {
            self.requests.lock().unwrap().push((source_id, failed_link));
            let next = self.responses.lock().unwrap().pop_front();
            match next {
                Some(Ok(outcome)) => Ok(outcome),
                Some(Err(message)) => Err(anyhow::anyhow!(message)),
                None => Ok(LinkOutcome::NoAlternatives),
            }
        }
    }

    #[derive(Clone, Debug, PartialEq)]
    enum OutputCall {
        Open { resource: ResourceId, link: String, volume: f32 },
        Pause,
        Resume,
        Seek(Duration),
        SetVolume(f32),
        Release,
    }

    #[derive(Default)]
    struct OutputLog {
        calls: Vec<OutputCall>,
        attached: Option<MediaListener>,
        overlaps: usize,
        failing_links: HashSet<String>,
    }

    #[derive(Clone, Default)]
    struct RecordingOutput {
        log: Arc<Mutex<OutputLog>>,
    }

    impl RecordingOutput {
        fn failing(links: &[&str]) -> Self {
            let output = Self::default();
            output
                .log
                .lock()
                .unwrap()
                .failing_links
                .extend(links.iter().map(|link| link.to_string()));
            output
        }

        fn calls(&self) -> Vec<OutputCall> {
            self.log.lock().unwrap().calls.clone()
        }

        fn opened_links(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|call| match call {
                    OutputCall::Open { link, .. } => Some(link),
                    _ => None,
                })
                .collect()
        }

        fn overlaps(&self) -> usize {
            self.log.lock().unwrap().overlaps
        }

        fn emit(&self, event: MediaEvent) {
            let log = self.log.lock().unwrap();
            let listener = log.attached.as_ref().expect("no attached resource");
            listener.emit(event);
        }
    }

    impl AudioOutput for RecordingOutput {
        fn open(&mut self, resource: ResourceId, link: &str, volume: f32, listener: MediaListener) {
            let mut log = self.log.lock().unwrap();
            if log.attached.is_some() {
                log.overlaps += 1;
            }
            log.calls.push(OutputCall::Open {
                resource,
                link: link.to_string(),
                volume,
            });
            if log.failing_links.contains(link) {
                listener.emit(MediaEvent::Failed("404 Not Found".to_string()));
            } else {
                listener.emit(MediaEvent::Started);
            }
            log.attached = Some(listener);
        }

        fn pause(&mut self) {
            self.log.lock().unwrap().calls.push(OutputCall::Pause);
        }

        fn resume(&mut self) {
            self.log.lock().unwrap().calls.push(OutputCall::Resume);
        }

        fn seek(&mut self, position: Duration) {
            self.log.lock().unwrap().calls.push(OutputCall::Seek(position));
        }

        fn set_volume(&mut self, volume: f32) {
            self.log.lock().unwrap().calls.push(OutputCall::SetVolume(volume));
        }

        fn release(&mut self) {
            let mut log = self.log.lock().unwrap();
            log.calls.push(OutputCall::Release);
            log.attached = None;
        }
    }

    fn track(n: u32) -> Track {
        Track {
            id: n as i64,
            source_id: format!("src-{n}"),
            name: format!("Track {n}"),
            author: "Artist".to_string(),
            link: Some(link(n)),
        }
    }

    fn link(n: u32) -> String {
        format!("https://cdn.example/{n}.mp3")
    }

    fn session(
        resolver: ScriptedResolver,
        output: RecordingOutput,
    ) -> (PlayerSession<ScriptedResolver>, mpsc::UnboundedReceiver<PlayerNotice>) {
        let config = SessionConfig {
            advance_delay: Duration::from_millis(1),
            ..SessionConfig::default()
        };
        PlayerSession::new(resolver, Box::new(output), config)
    }

    /// Feed queued inputs (link results, media events, advances) until the inbox stays quiet.
    async fn settle(session: &mut PlayerSession<ScriptedResolver>) {
        while let Ok(Some(input)) =
            tokio::time::timeout(Duration::from_millis(50), session.inbox_rx.recv()).await
        {
            session.handle_input(input);
        }
    }

    fn current_source(session: &PlayerSession<ScriptedResolver>) -> Option<String> {
        session
            .state()
            .current_track
            .as_ref()
            .map(|track| track.source_id.clone())
    }

    #[tokio::test]
    async fn new_track_releases_previous_resource_first() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        for n in 1..=3 {
            session.play(track(n), None, None);
            settle(&mut session).await;
        }

        assert_eq!(output.overlaps(), 0);
        assert_eq!(output.opened_links(), vec![link(1), link(2), link(3)]);
        let releases = output
            .calls()
            .iter()
            .filter(|call| **call == OutputCall::Release)
            .count();
        assert_eq!(releases, 2);
        assert_eq!(current_source(&session).as_deref(), Some("src-3"));
        assert!(session.state().is_playing);
    }

    #[tokio::test]
    async fn events_from_released_resource_are_ignored() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.play(track(1), None, None);
        settle(&mut session).await;
        session.play(track(2), None, None);
        settle(&mut session).await;

        session.handle_input(SessionInput::Media {
            resource: ResourceId(0),
            event: MediaEvent::Failed("late error".to_string()),
        });
        settle(&mut session).await;

        assert_eq!(session.state().phase, SessionPhase::Playing);
        assert_eq!(session.state().retries, 0);
        assert_eq!(output.opened_links().len(), 2);
    }

    #[tokio::test]
    async fn playing_active_track_again_toggles_without_reload() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.play(track(1), None, None);
        settle(&mut session).await;
        assert!(session.state().is_playing);

        // Same logical track seen from another view with a different local id
        let mut again = track(1);
        again.id = 99;
        session.play(again.clone(), None, None);
        settle(&mut session).await;
        assert!(!session.state().is_playing);
        assert_eq!(session.state().phase, SessionPhase::Paused);

        session.play(again, None, None);
        settle(&mut session).await;
        assert!(session.state().is_playing);

        assert_eq!(output.opened_links().len(), 1);
        assert!(output.calls().contains(&OutputCall::Pause));
        assert!(output.calls().contains(&OutputCall::Resume));
    }

    #[tokio::test]
    async fn retries_are_bounded_then_track_is_skipped() {
        let first = link(1);
        let alternates: Vec<String> = (1..=4).map(|n| format!("https://mirror.example/{n}.mp3")).collect();
        let mut failing: Vec<&str> = alternates.iter().map(String::as_str).collect();
        failing.push(&first);
        let output = RecordingOutput::failing(&failing);
        let resolver = ScriptedResolver::with(
            alternates
                .iter()
                .map(|alt| Ok(LinkOutcome::Ready(alt.clone())))
                .collect(),
        );
        let (mut session, mut notices) = session(resolver.clone(), output.clone());

        session.play(track(1), None, Some(vec![track(1), track(2)]));
        settle(&mut session).await;

        let requests = resolver.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0], ("src-1".to_string(), Some(link(1))));
        assert_eq!(requests[1], ("src-1".to_string(), Some(alternates[0].clone())));
        assert_eq!(requests[2], ("src-1".to_string(), Some(alternates[1].clone())));

        assert_eq!(
            notices.try_recv().ok(),
            Some(PlayerNotice::Skipped {
                track: "Track 1".to_string(),
                reason: SkipReason::RetriesExhausted,
            })
        );
        assert_eq!(current_source(&session).as_deref(), Some("src-2"));
        assert_eq!(session.state().retries, 0);
        assert!(session.state().is_playing);
        assert_eq!(output.overlaps(), 0);
    }

    #[tokio::test]
    async fn no_alternatives_skips_before_retry_budget_is_spent() {
        let alternate = "https://mirror.example/1.mp3".to_string();
        let first = link(1);
        let output = RecordingOutput::failing(&[first.as_str(), alternate.as_str()]);
        let resolver = ScriptedResolver::with(vec![
            Ok(LinkOutcome::Ready(alternate.clone())),
            Ok(LinkOutcome::NoAlternatives),
        ]);
        let (mut session, mut notices) = session(resolver.clone(), output.clone());

        session.play(track(1), None, Some(vec![track(1), track(2)]));
        settle(&mut session).await;

        assert_eq!(resolver.requests().len(), 2);
        assert_eq!(output.opened_links(), vec![first, alternate, link(2)]);
        assert_eq!(
            notices.try_recv().ok(),
            Some(PlayerNotice::Skipped {
                track: "Track 1".to_string(),
                reason: SkipReason::NoAlternatives,
            })
        );
        assert_eq!(current_source(&session).as_deref(), Some("src-2"));
    }

    #[tokio::test]
    async fn service_failure_is_treated_as_no_alternative() {
        let first = link(1);
        let output = RecordingOutput::failing(&[first.as_str()]);
        let resolver = ScriptedResolver::with(vec![Err("connection refused".to_string())]);
        let (mut session, mut notices) = session(resolver, output);

        session.play(track(1), None, Some(vec![track(1), track(2)]));
        settle(&mut session).await;

        assert!(matches!(
            notices.try_recv(),
            Ok(PlayerNotice::Skipped { reason: SkipReason::ServiceUnavailable, .. })
        ));
        assert_eq!(current_source(&session).as_deref(), Some("src-2"));
    }

    #[tokio::test]
    async fn navigation_stops_at_sequence_boundaries() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());
        let sequence = vec![track(1), track(2), track(3)];

        session.play(track(1), None, Some(sequence));
        settle(&mut session).await;
        session.step(Step::Previous, None);
        settle(&mut session).await;
        assert_eq!(current_source(&session).as_deref(), Some("src-1"));

        session.step(Step::Next, None);
        settle(&mut session).await;
        session.step(Step::Next, None);
        settle(&mut session).await;
        assert_eq!(current_source(&session).as_deref(), Some("src-3"));

        session.step(Step::Next, None);
        settle(&mut session).await;
        assert_eq!(current_source(&session).as_deref(), Some("src-3"));
        assert_eq!(output.opened_links(), vec![link(1), link(2), link(3)]);
    }

    #[tokio::test]
    async fn next_without_sequence_is_a_no_op() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.play(track(1), None, None);
        settle(&mut session).await;
        session.step(Step::Next, None);
        session.step(Step::Previous, None);
        settle(&mut session).await;

        assert_eq!(current_source(&session).as_deref(), Some("src-1"));
        assert!(session.state().is_playing);
        assert_eq!(output.opened_links().len(), 1);
    }

    #[tokio::test]
    async fn next_finds_track_by_source_id_in_override_sequence() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.play(track(2), None, None);
        settle(&mut session).await;

        // Refreshed sequence with different local ids for the same tracks
        let refreshed: Vec<Track> = (1..=3)
            .map(|n| Track { id: 100 + n as i64, ..track(n) })
            .collect();
        session.step(Step::Next, Some(refreshed));
        settle(&mut session).await;

        assert_eq!(current_source(&session).as_deref(), Some("src-3"));
        assert_eq!(session.state().sequence.len(), 3);
    }

    #[tokio::test]
    async fn volume_carries_over_to_next_track() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.play(track(1), None, None);
        settle(&mut session).await;
        session.set_volume(0.2);
        session.play(track(2), None, None);
        settle(&mut session).await;

        let volumes: Vec<f32> = output
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                OutputCall::Open { volume, .. } => Some(volume),
                _ => None,
            })
            .collect();
        assert_eq!(volumes, vec![DEFAULT_VOLUME, 0.2]);
        assert!(output.calls().contains(&OutputCall::SetVolume(0.2)));
    }

    #[tokio::test]
    async fn volume_is_clamped() {
        let (mut session, _notices) = session(ScriptedResolver::default(), RecordingOutput::default());

        session.set_volume(1.7);
        assert_eq!(session.state().volume, 1.0);
        session.set_volume(-0.5);
        assert_eq!(session.state().volume, 0.0);
        session.set_volume(f32::NAN);
        assert_eq!(session.state().volume, 0.0);
    }

    #[tokio::test]
    async fn seek_uses_percentage_of_duration() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.play(track(1), None, None);
        settle(&mut session).await;
        output.emit(MediaEvent::TimeUpdate {
            position: Duration::from_secs(3),
            duration: Some(Duration::from_secs(200)),
        });
        settle(&mut session).await;

        session.seek(SeekTarget::Percent(50.0));
        assert_eq!(session.state().position, Duration::from_secs(100));
        assert!(output.calls().contains(&OutputCall::Seek(Duration::from_secs(100))));

        session.seek(SeekTarget::Percent(150.0));
        assert_eq!(session.state().position, Duration::from_secs(200));
        session.seek(SeekTarget::Absolute(Duration::from_secs(500)));
        assert_eq!(session.state().position, Duration::from_secs(200));
    }

    #[tokio::test]
    async fn seek_without_track_is_ignored() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.seek(SeekTarget::Percent(50.0));
        session.pause();
        session.resume();

        assert!(output.calls().is_empty());
        assert_eq!(session.state().phase, SessionPhase::Idle);
    }

    #[tokio::test]
    async fn natural_end_advances_to_next_track() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.play(track(1), None, Some(vec![track(1), track(2), track(3)]));
        settle(&mut session).await;
        output.emit(MediaEvent::Ended);
        settle(&mut session).await;

        assert_eq!(current_source(&session).as_deref(), Some("src-2"));
        assert_eq!(session.state().phase, SessionPhase::Playing);
        assert!(session.state().is_playing);
        assert_eq!(session.state().title, "Track 2 - Artist");
        assert_eq!(output.overlaps(), 0);
    }

    #[tokio::test]
    async fn end_of_last_track_goes_idle() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.play(track(2), None, Some(vec![track(1), track(2)]));
        settle(&mut session).await;
        output.emit(MediaEvent::Ended);
        settle(&mut session).await;

        assert_eq!(session.state().phase, SessionPhase::Idle);
        assert!(!session.state().is_playing);
        assert_eq!(current_source(&session).as_deref(), Some("src-2"));
        assert_eq!(output.opened_links().len(), 1);
    }

    #[tokio::test]
    async fn pause_then_resume_keeps_position() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.play(track(1), None, None);
        settle(&mut session).await;
        output.emit(MediaEvent::TimeUpdate {
            position: Duration::from_secs(42),
            duration: Some(Duration::from_secs(180)),
        });
        settle(&mut session).await;

        session.pause();
        session.pause();
        assert!(!session.state().is_playing);
        session.resume();

        assert!(session.state().is_playing);
        assert_eq!(session.state().position, Duration::from_secs(42));
        let pauses = output
            .calls()
            .iter()
            .filter(|call| **call == OutputCall::Pause)
            .count();
        assert_eq!(pauses, 1);
    }

    #[tokio::test]
    async fn track_without_link_is_resolved_through_service() {
        let output = RecordingOutput::default();
        let resolver = ScriptedResolver::with(vec![Ok(LinkOutcome::Ready(link(7)))]);
        let (mut session, _notices) = session(resolver.clone(), output.clone());

        let mut unresolved = track(7);
        unresolved.link = None;
        session.play(unresolved, None, None);
        assert_eq!(session.state().phase, SessionPhase::Loading);
        settle(&mut session).await;

        assert_eq!(resolver.requests(), vec![("src-7".to_string(), None)]);
        assert_eq!(output.opened_links(), vec![link(7)]);
        assert!(session.state().is_playing);
    }

    #[tokio::test]
    async fn pending_link_posts_notice_and_keeps_track() {
        let output = RecordingOutput::default();
        let resolver = ScriptedResolver::with(vec![Ok(LinkOutcome::Pending(
            "Please try again in a minute.".to_string(),
        ))]);
        let (mut session, mut notices) = session(resolver, output.clone());

        let mut unresolved = track(4);
        unresolved.link = None;
        session.play(unresolved, None, Some(vec![track(4), track(5)]));
        settle(&mut session).await;

        assert_eq!(
            notices.try_recv().ok(),
            Some(PlayerNotice::Pending {
                track: "Track 4".to_string(),
                message: "Please try again in a minute.".to_string(),
            })
        );
        assert_eq!(current_source(&session).as_deref(), Some("src-4"));
        assert_eq!(session.state().phase, SessionPhase::Idle);
        assert!(!session.state().is_playing);
        assert!(output.opened_links().is_empty());
    }

    #[tokio::test]
    async fn stale_link_result_is_dropped() {
        let output = RecordingOutput::default();
        let resolver = ScriptedResolver::with(vec![Ok(LinkOutcome::Ready(link(1)))]);
        let (mut session, _notices) = session(resolver, output.clone());

        let mut unresolved = track(1);
        unresolved.link = None;
        session.play(unresolved, None, None);
        // Superseded before the request above resolves
        session.play(track(2), None, None);
        settle(&mut session).await;

        assert_eq!(output.opened_links(), vec![link(2)]);
        assert_eq!(current_source(&session).as_deref(), Some("src-2"));
    }

    #[tokio::test]
    async fn stop_resets_playback_but_keeps_volume_and_sequence() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.play(track(1), None, Some(vec![track(1), track(2)]));
        settle(&mut session).await;
        assert_eq!(session.state().title, "Track 1 - Artist");
        session.set_volume(0.8);
        session.stop();

        let state = session.state();
        assert!(state.current_track.is_none());
        assert!(!state.is_playing);
        assert!(!state.visible);
        assert_eq!(state.position, Duration::ZERO);
        assert_eq!(state.duration, Duration::ZERO);
        assert_eq!(state.title, DEFAULT_TITLE);
        assert_eq!(state.volume, 0.8);
        assert_eq!(state.sequence.len(), 2);
        assert_eq!(output.calls().last(), Some(&OutputCall::Release));
    }

    #[tokio::test]
    async fn resume_after_end_reloads_track() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        session.play(track(1), None, None);
        settle(&mut session).await;
        output.emit(MediaEvent::Ended);
        settle(&mut session).await;
        assert_eq!(session.state().phase, SessionPhase::Idle);

        session.play(track(1), None, None);
        settle(&mut session).await;

        assert!(session.state().is_playing);
        assert_eq!(output.opened_links(), vec![link(1), link(1)]);
    }

    /// Handle exactly one queued input, leaving anything scheduled after it in flight.
    async fn step_once(session: &mut PlayerSession<ScriptedResolver>) {
        let input = session.inbox_rx.recv().await.expect("inbox closed");
        session.handle_input(input);
    }

    /// Play the first track of `sequence`, let it finish and stop inside the advance gap.
    async fn ended_with_advance_scheduled(
        session: &mut PlayerSession<ScriptedResolver>,
        output: &RecordingOutput,
        sequence: Vec<Track>,
    ) {
        session.play(sequence[0].clone(), None, Some(sequence));
        settle(session).await;
        output.emit(MediaEvent::Ended);
        step_once(session).await;
        assert_eq!(session.state().phase, SessionPhase::Ended);
    }

    #[tokio::test]
    async fn pause_while_loading_starts_the_track_paused() {
        let output = RecordingOutput::default();
        let resolver = ScriptedResolver::with(vec![Ok(LinkOutcome::Ready(link(1)))]);
        let (mut session, _notices) = session(resolver, output.clone());

        let mut unresolved = track(1);
        unresolved.link = None;
        session.play(unresolved, None, None);
        session.pause();
        settle(&mut session).await;

        assert_eq!(session.state().phase, SessionPhase::Paused);
        assert!(!session.state().is_playing);
        assert!(session.state().visible);
        assert_eq!(output.calls().last(), Some(&OutputCall::Pause));

        session.resume();
        assert!(session.state().is_playing);
        assert_eq!(output.calls().last(), Some(&OutputCall::Resume));
    }

    #[tokio::test]
    async fn toggle_while_loading_pauses_then_resumes() {
        let output = RecordingOutput::default();
        let resolver = ScriptedResolver::with(vec![Ok(LinkOutcome::Ready(link(1)))]);
        let (mut session, _notices) = session(resolver, output.clone());

        let mut unresolved = track(1);
        unresolved.link = None;
        session.play(unresolved, None, None);
        session.toggle();
        session.toggle();
        settle(&mut session).await;
        assert_eq!(session.state().phase, SessionPhase::Playing);
        assert!(!output.calls().contains(&OutputCall::Pause));

        session.play(track(2), None, None);
        session.toggle();
        settle(&mut session).await;
        assert_eq!(session.state().phase, SessionPhase::Paused);
        assert!(!session.state().is_playing);
    }

    #[tokio::test]
    async fn pause_during_advance_gap_keeps_next_track_paused() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        ended_with_advance_scheduled(&mut session, &output, vec![track(1), track(2)]).await;
        session.pause();
        settle(&mut session).await;

        assert_eq!(current_source(&session).as_deref(), Some("src-2"));
        assert_eq!(session.state().phase, SessionPhase::Paused);
        assert!(!session.state().is_playing);
        assert_eq!(output.calls().last(), Some(&OutputCall::Pause));
    }

    #[tokio::test]
    async fn resume_during_advance_gap_moves_on_immediately() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        ended_with_advance_scheduled(&mut session, &output, vec![track(1), track(2), track(3)]).await;
        session.toggle();
        assert_eq!(current_source(&session).as_deref(), Some("src-2"));
        settle(&mut session).await;

        assert_eq!(current_source(&session).as_deref(), Some("src-2"));
        assert!(session.state().is_playing);
        assert_eq!(output.opened_links(), vec![link(1), link(2)]);
    }

    #[tokio::test]
    async fn stop_during_advance_gap_cancels_the_advance() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        ended_with_advance_scheduled(&mut session, &output, vec![track(1), track(2)]).await;
        session.stop();
        settle(&mut session).await;

        assert!(session.state().current_track.is_none());
        assert_eq!(session.state().phase, SessionPhase::Idle);
        assert_eq!(output.opened_links(), vec![link(1)]);
    }

    #[tokio::test]
    async fn next_during_advance_gap_opens_only_the_requested_track() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        ended_with_advance_scheduled(&mut session, &output, vec![track(1), track(2), track(3)]).await;
        session.step(Step::Next, None);
        settle(&mut session).await;

        assert_eq!(current_source(&session).as_deref(), Some("src-2"));
        assert_eq!(output.opened_links(), vec![link(1), link(2)]);
        assert_eq!(output.overlaps(), 0);
    }

    #[tokio::test]
    async fn play_during_advance_gap_opens_only_the_requested_track() {
        let output = RecordingOutput::default();
        let (mut session, _notices) = session(ScriptedResolver::default(), output.clone());

        ended_with_advance_scheduled(&mut session, &output, vec![track(1), track(2)]).await;
        session.play(track(5), None, None);
        settle(&mut session).await;

        assert_eq!(current_source(&session).as_deref(), Some("src-5"));
        assert!(session.state().is_playing);
        assert_eq!(output.opened_links(), vec![link(1), link(5)]);
    }

    #[tokio::test]
    async fn shutdown_closes_the_loop() {
        let output = RecordingOutput::default();
        let (session, _notices) = session(ScriptedResolver::default(), output.clone());
        let inbox = session.inbox();
        let state = session.subscribe();

        inbox
            .send(SessionInput::Command(PlayerCommand::Play {
                track: track(1),
                playlist: None,
                sequence: None,
            }))
            .unwrap();
        inbox.send(SessionInput::Command(PlayerCommand::Shutdown)).unwrap();
        session.run().await;

        assert!(state.borrow().current_track.is_none());
        assert_eq!(output.calls().last(), Some(&OutputCall::Release));
    }
}

//! rodio audio output
//!
//! rodio's output stream is not `Send`, so a dedicated thread owns it and
//! takes commands over a std channel. Links are downloaded on the tokio
//! runtime and handed to the thread as bytes.

use anyhow::Result;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use crate::player::{AudioOutput, MediaEvent, MediaListener, ResourceId};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

enum AudioCommand {
    Claim {
        volume: f32,
        listener: MediaListener,
    },
    Attach {
        resource: ResourceId,
        bytes: Vec<u8>,
    },
    Fail {
        resource: ResourceId,
        reason: String,
    },
    Pause,
    Resume,
    Seek(Duration),
    SetVolume(f32),
    Release,
}

/// Output backed by the default audio device
pub struct RodioOutput {
    commands: Sender<AudioCommand>,
    http: reqwest::Client,
    download: Option<JoinHandle<()>>,
}

impl RodioOutput {
    pub fn new() -> Result<Self> {
        let (commands, rx) = mpsc::channel();
        thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || audio_thread(rx))?;

        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            commands,
            http,
            download: None,
        })
    }

    fn send(&self, command: AudioCommand) {
        if self.commands.send(command).is_err() {
            tracing::error!("Audio thread is gone");
        }
    }

    fn abort_download(&mut self) {
        if let Some(task) = self.download.take() {
            task.abort();
        }
    }
}

impl AudioOutput for RodioOutput {
    fn open(&mut self, resource: ResourceId, link: &str, volume: f32, listener: MediaListener) {
        self.abort_download();
        self.send(AudioCommand::Claim { volume, listener });

        let http = self.http.clone();
        let commands = self.commands.clone();
        let link = link.to_string();
        self.download = Some(tokio::spawn(async move {
            let command = match fetch_bytes(&http, &link).await {
                Ok(bytes) => {
                    tracing::debug!(%resource, bytes = bytes.len(), "Downloaded media");
                    AudioCommand::Attach { resource, bytes }
                }
                Err(e) => AudioCommand::Fail {
                    resource,
                    reason: format!("download failed: {e}"),
                },
            };
            let _ = commands.send(command);
        }));
    }

    fn pause(&mut self) {
        self.send(AudioCommand::Pause);
    }

    fn resume(&mut self) {
        self.send(AudioCommand::Resume);
    }

    fn seek(&mut self, position: Duration) {
        self.send(AudioCommand::Seek(position));
    }

    fn set_volume(&mut self, level: f32) {
        self.send(AudioCommand::SetVolume(level));
    }

    fn release(&mut self) {
        self.abort_download();
        self.send(AudioCommand::Release);
    }
}

async fn fetch_bytes(http: &reqwest::Client, link: &str) -> Result<Vec<u8>> {
    let response = http.get(link).send().await?.error_for_status()?;
    Ok(response.bytes().await?.to_vec())
}

fn decode(bytes: Vec<u8>) -> Result<(Decoder<Cursor<Vec<u8>>>, Option<Duration>)> {
    let source = Decoder::new(Cursor::new(bytes))?;
    let duration = source.total_duration();
    Ok((source, duration))
}

/// The claimed resource and, once its bytes arrive, the sink playing it
struct Loaded {
    listener: MediaListener,
    volume: f32,
    paused: bool,
    sink: Option<Sink>,
    duration: Option<Duration>,
    finished: bool,
}

impl Loaded {
    fn attach(&mut self, device: Option<&OutputStreamHandle>, bytes: Vec<u8>) {
        let Some(handle) = device else {
            self.listener.emit(MediaEvent::Failed("no audio device".to_string()));
            return;
        };

        let started = decode(bytes).and_then(|(source, duration)| {
            let sink = Sink::try_new(handle)?;
            sink.set_volume(self.volume);
            sink.append(source);
            if self.paused {
                sink.pause();
            }
            Ok((sink, duration))
        });

        match started {
            Ok((sink, duration)) => {
                tracing::info!(resource = %self.listener.resource(), ?duration, "Playback started");
                self.sink = Some(sink);
                self.duration = duration;
                self.listener.emit(MediaEvent::Started);
            }
            Err(e) => {
                self.listener.emit(MediaEvent::Failed(e.to_string()));
            }
        }
    }

    fn poll(&mut self) {
        if self.finished || self.paused {
            return;
        }
        let Some(sink) = &self.sink else {
            return;
        };

        if sink.empty() {
            self.finished = true;
            self.listener.emit(MediaEvent::Ended);
        } else {
            self.listener.emit(MediaEvent::TimeUpdate {
                position: sink.get_pos(),
                duration: self.duration,
            });
        }
    }
}

fn audio_thread(commands: Receiver<AudioCommand>) {
    // The stream must stay alive for its handle to produce sound
    let device = match OutputStream::try_default() {
        Ok((stream, handle)) => Some((stream, handle)),
        Err(e) => {
            tracing::error!(error = %e, "Failed to open audio output");
            None
        }
    };
    let handle = device.as_ref().map(|(_, handle)| handle);

    let mut current: Option<Loaded> = None;
    let mut last_poll = Instant::now();

    loop {
        match commands.recv_timeout(POLL_INTERVAL) {
            Ok(command) => match command {
                AudioCommand::Claim { volume, listener } => {
                    tracing::debug!(resource = %listener.resource(), "Claimed output");
                    current = Some(Loaded {
                        listener,
                        volume,
                        paused: false,
                        sink: None,
                        duration: None,
                        finished: false,
                    });
                }
                AudioCommand::Attach { resource, bytes } => match current.as_mut() {
                    Some(loaded) if loaded.listener.resource() == resource => {
                        loaded.attach(handle, bytes);
                    }
                    _ => tracing::debug!(%resource, "Discarding media for released resource"),
                },
                AudioCommand::Fail { resource, reason } => {
                    if let Some(loaded) = current.as_ref().filter(|l| l.listener.resource() == resource) {
                        loaded.listener.emit(MediaEvent::Failed(reason));
                    }
                }
                AudioCommand::Pause => {
                    if let Some(loaded) = current.as_mut() {
                        loaded.paused = true;
                        if let Some(sink) = &loaded.sink {
                            sink.pause();
                        }
                    }
                }
                AudioCommand::Resume => {
                    if let Some(loaded) = current.as_mut() {
                        loaded.paused = false;
                        if let Some(sink) = &loaded.sink {
                            sink.play();
                        }
                    }
                }
                AudioCommand::Seek(position) => {
                    if let Some(sink) = current.as_ref().and_then(|l| l.sink.as_ref()) {
                        if let Err(e) = sink.try_seek(position) {
                            tracing::warn!(error = %e, ?position, "Seek failed");
                        }
                    }
                }
                AudioCommand::SetVolume(level) => {
                    if let Some(loaded) = current.as_mut() {
                        loaded.volume = level;
                        if let Some(sink) = &loaded.sink {
                            sink.set_volume(level);
                        }
                    }
                }
                AudioCommand::Release => {
                    if let Some(loaded) = current.take() {
                        tracing::debug!(resource = %loaded.listener.resource(), "Released output");
                    }
                }
            },
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }

        if last_poll.elapsed() >= POLL_INTERVAL {
            last_poll = Instant::now();
            if let Some(loaded) = current.as_mut() {
                loaded.poll();
            }
        }
    }

    tracing::debug!("Audio thread stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undecodable_bytes_are_rejected() {
        assert!(decode(b"<html>not audio</html>".to_vec()).is_err());
    }

    #[tokio::test]
    async fn unreachable_link_fails_download() {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        assert!(fetch_bytes(&http, "http://127.0.0.1:9/missing.mp3").await.is_err());
    }
}

//! Player notice listener

use tokio::sync::mpsc;

use crate::player::{PlayerNotice, SkipReason};
use super::AppController;

fn describe(notice: &PlayerNotice) -> String {
    match notice {
        PlayerNotice::Pending { track, message } => format!("{track}: {message}"),
        PlayerNotice::Skipped { track, reason } => {
            let why = match reason {
                SkipReason::RetriesExhausted => "no working source found",
                SkipReason::NoAlternatives => "no alternative sources available",
                SkipReason::ServiceUnavailable => "playlist service unavailable",
                SkipReason::NoSourceId => "track has no source id",
            };
            format!("Skipped \"{track}\": {why}")
        }
    }
}

impl AppController {
    /// Route session notices into the message overlay until the session ends
    pub fn start_notice_listener(&self, mut notices: mpsc::UnboundedReceiver<PlayerNotice>) {
        let model = self.model.clone();
        tracing::info!("Starting player notice listener");

        tokio::spawn(async move {
            while let Some(notice) = notices.recv().await {
                let text = describe(&notice);
                let model = model.lock().await;
                match notice {
                    PlayerNotice::Pending { .. } => model.set_info(text).await,
                    PlayerNotice::Skipped { .. } => model.set_error(text).await,
                }
            }
            tracing::debug!("Player notice listener stopped");
        });
    }
}

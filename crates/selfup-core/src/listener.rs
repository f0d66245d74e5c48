use tokio::sync::mpsc;

use crate::manifest::ChangeLog;

/// Receives every outcome of update checks, downloads, and installs.
///
/// Callbacks run on the updater's task and must return promptly; hand work
/// off to the UI's own queue rather than blocking here.
pub trait UpdateStatusListener: Send + Sync {
    /// Result of a check. An empty changelog means no update is available.
    fn on_update_available(&self, changelog: ChangeLog);
    /// Download progress in percent, `0.0..=100.0`.
    fn on_update_download_progress(&self, percent: f32);
    fn on_update_download_finished(&self);
    fn on_update_error(&self, message: String);
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpdateEvent {
    Available(ChangeLog),
    Progress(f32),
    DownloadFinished,
    Error(String),
}

/// Forwards callbacks into an unbounded queue with a single consumer.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    sender: mpsc::UnboundedSender<UpdateEvent>,
}

impl ChannelListener {
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UpdateEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn forward(&self, event: UpdateEvent) {
        // A dropped receiver means nobody is listening any more.
        let _ = self.sender.send(event);
    }
}

impl UpdateStatusListener for ChannelListener {
    fn on_update_available(&self, changelog: ChangeLog) {
        self.forward(UpdateEvent::Available(changelog));
    }

    fn on_update_download_progress(&self, percent: f32) {
        self.forward(UpdateEvent::Progress(percent));
    }

    fn on_update_download_finished(&self) {
        self.forward(UpdateEvent::DownloadFinished);
    }

    fn on_update_error(&self, message: String) {
        self.forward(UpdateEvent::Error(message));
    }
}

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::UpdateError;

/// Tracks whether a download session is open. Only one may be.
#[derive(Debug, Default)]
pub struct SessionSlot {
    open: AtomicBool,
}

/// Holds the slot until the session's file is closed.
#[derive(Debug)]
pub struct SessionGuard<'a> {
    slot: &'a SessionSlot,
}

impl SessionSlot {
    /// Claim the slot for a new download session.
    ///
    /// # Panics
    /// Panics if a session is already open. Starting a second download while
    /// one is in flight is a caller bug, not a runtime condition.
    pub fn open(&self) -> SessionGuard<'_> {
        let already_open = self.open.swap(true, Ordering::AcqRel);
        assert!(
            !already_open,
            "a download session is already open; wait for it to finish before starting another"
        );
        SessionGuard { slot: self }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

impl Drop for SessionGuard<'_> {
    fn drop(&mut self) {
        self.slot.open.store(false, Ordering::Release);
    }
}

/// Percentage to report after `received` bytes of `total`.
///
/// Unknown totals and complete transfers both report 100.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub fn download_percentage(received: u64, total: Option<u64>) -> f32 {
    match total {
        Some(total) if received < total => (received as f64 * 100.0 / total as f64) as f32,
        _ => 100.0,
    }
}

/// Append every chunk of `stream` to `writer` as it arrives, reporting
/// progress after each one. Returns the number of bytes written.
///
/// # Errors
/// Returns the stream's own error converted into an [`UpdateError`], or
/// [`UpdateError::Write`] when writing to `writer` fails.
pub async fn stream_to_file<S, E, W, F>(
    stream: S,
    total: Option<u64>,
    writer: &mut W,
    path: &Path,
    mut on_progress: F,
) -> Result<u64, UpdateError>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<UpdateError>,
    W: AsyncWrite + Unpin,
    F: FnMut(f32),
{
    let mut stream = std::pin::pin!(stream);
    let mut received: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|error| -> UpdateError { error.into() })?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|source| UpdateError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        received += chunk.len() as u64;
        on_progress(download_percentage(received, total));
    }

    writer.flush().await.map_err(|source| UpdateError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(received)
}

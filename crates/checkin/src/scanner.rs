//! Decode sources feeding the check-in session.
//!
//! A [`DecodeSource`] stands where a camera would: while running it pushes
//! each decoded QR payload into the session channel as
//! [`SessionEvent::Decoded`]. The [`Scanner`] handle owns one source and
//! guarantees it is released when the handle is closed or dropped.
//!
//! [`FeedSource`] reads newline-delimited payloads from a file or FIFO,
//! which is how external decoders such as `zbarcam --raw` are attached.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncSeekExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::error::{Error, Result};
use crate::session::SessionEvent;

/// How long a feed waits at end of input before reading again.
const FEED_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A producer of decoded QR payloads.
///
/// Implementations spawn their reader onto the current tokio runtime in
/// [`start`](DecodeSource::start) and must stop sending once
/// [`stop`](DecodeSource::stop) returns.
pub trait DecodeSource: std::fmt::Debug + Send {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Begin sending decoded payloads through `tx`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CameraAccess`] if the device or feed cannot be
    /// acquired.
    fn start(&mut self, tx: mpsc::Sender<SessionEvent>) -> Result<()>;

    /// Release the device or feed. Does nothing if not running.
    fn stop(&mut self);

    /// Check whether the source is currently sending.
    fn is_running(&self) -> bool;
}

/// Reads decoded payloads, one per line, from a file or FIFO.
///
/// Regular files are tailed: reading resumes where the previous run left
/// off, so lines consumed before a prompt opened are not scanned again.
///
/// A last line without a trailing newline is delivered once it has not
/// grown for a full poll interval. Text appended to it afterwards arrives
/// as a separate payload.
#[derive(Debug)]
pub struct FeedSource {
    path: PathBuf,
    offset: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl FeedSource {
    /// Create a source reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            offset: Arc::new(AtomicU64::new(0)),
            task: None,
        }
    }
}

impl DecodeSource for FeedSource {
    fn name(&self) -> &'static str {
        "feed"
    }

    fn start(&mut self, tx: mpsc::Sender<SessionEvent>) -> Result<()> {
        if self.is_running() {
            return Ok(());
        }

        let metadata = std::fs::metadata(&self.path).map_err(|e| {
            Error::camera_access(
                self.name(),
                format!("{}: {e}; check the feed path and retry", self.path.display()),
            )
        })?;
        if metadata.is_dir() {
            return Err(Error::camera_access(
                self.name(),
                format!("{} is a directory", self.path.display()),
            ));
        }

        let path = self.path.clone();
        let offset = Arc::clone(&self.offset);
        let seekable = metadata.is_file();
        self.task = Some(tokio::spawn(async move {
            if let Err(e) = read_feed(&path, &offset, seekable, &tx).await {
                warn!(path = %path.display(), error = %e, "Decode feed stopped");
            }
        }));

        info!(path = %self.path.display(), "Scanner opened");
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            info!(path = %self.path.display(), "Scanner released");
        }
    }

    fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }
}

async fn read_feed(
    path: &Path,
    offset: &AtomicU64,
    seekable: bool,
    tx: &mpsc::Sender<SessionEvent>,
) -> std::io::Result<()> {
    let mut file = File::open(path).await?;
    if seekable {
        file.seek(SeekFrom::Start(offset.load(Ordering::SeqCst)))
            .await?;
    }
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    let mut stalled = false;

    loop {
        let read = reader.read_line(&mut line).await?;
        if !line.ends_with('\n') && (read > 0 || !stalled || line.is_empty()) {
            // End of input, or a line still being written.
            stalled = read == 0 && !line.is_empty();
            tokio::time::sleep(FEED_POLL_INTERVAL).await;
            continue;
        }
        stalled = false;

        offset.fetch_add(line.len() as u64, Ordering::SeqCst);
        let payload = line.trim();
        if payload.is_empty() {
            trace!("Skipping blank feed line");
        } else {
            debug!(payload, "Decoded");
            if tx
                .send(SessionEvent::Decoded(payload.to_string()))
                .await
                .is_err()
            {
                return Ok(());
            }
        }
        line.clear();
    }
}

/// Owns a decode source and releases it on close or drop.
#[derive(Debug)]
pub struct Scanner {
    source: Box<dyn DecodeSource>,
    tx: mpsc::Sender<SessionEvent>,
}

impl Scanner {
    /// Wrap `source`, sending its payloads through `tx` while open.
    #[must_use]
    pub fn new(source: Box<dyn DecodeSource>, tx: mpsc::Sender<SessionEvent>) -> Self {
        Self { source, tx }
    }

    /// Open the source if it is not already open.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CameraAccess`] if the source cannot be acquired.
    pub fn open(&mut self) -> Result<()> {
        if self.source.is_running() {
            return Ok(());
        }
        self.source.start(self.tx.clone())
    }

    /// Release the source.
    pub fn close(&mut self) {
        if self.source.is_running() {
            self.source.stop();
        }
    }

    /// Check whether the source is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.source.is_running()
    }

    /// Name of the underlying source.
    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }
}

impl Drop for Scanner {
    fn drop(&mut self) {
        self.close();
    }
}

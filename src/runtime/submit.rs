//! Frame submission: a dedicated backend thread fed over a bounded channel.
//!
//! The pipeline thread encodes; the submitter thread hands each encoded
//! frame to a [`Backend`]. At most `max_in_flight` frames are outstanding.
//! Past that, newer frames coalesce into a single pending slot that is
//! sent as soon as the backend catches up, so a slow backend sees the
//! latest state rather than a growing queue.
//!
//! ```text
//!   pipeline ──submit──▶ [pending] ──bounded chan──▶ weft-submit ──▶ Backend
//!                  ▲                                      │
//!                  └────────────── in_flight ◀────────────┘
//! ```

use crossbeam_channel::{bounded, Receiver, Sender};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Consumer of encoded frames, run on the submitter thread.
pub trait Backend: Send + 'static {
    /// Accept one encoded drawlist.
    fn submit(&mut self, frame: &[u8]) -> io::Result<()>;
}

impl<F> Backend for F
where
    F: FnMut(&[u8]) -> io::Result<()> + Send + 'static,
{
    fn submit(&mut self, frame: &[u8]) -> io::Result<()> {
        self(frame)
    }
}

/// Backend writing each frame to a byte sink, length-prefixed.
#[derive(Debug)]
pub struct WriterBackend<W> {
    writer: W,
}

impl<W: Write + Send + 'static> WriterBackend<W> {
    /// Wrap `writer`.
    pub const fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Unwrap the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send + 'static> Backend for WriterBackend<W> {
    fn submit(&mut self, frame: &[u8]) -> io::Result<()> {
        let len = u32::try_from(frame.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "frame exceeds 4 GiB"))?;
        self.writer.write_all(&len.to_le_bytes())?;
        self.writer.write_all(frame)?;
        self.writer.flush()
    }
}

/// How [`FrameSubmitter::shutdown`] treats frames not yet written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Send the pending frame, write every queued frame, then stop.
    Flush,
    /// Drop the pending frame and every queued frame; only a write already
    /// in progress completes.
    Abandon,
}

/// Result of [`FrameSubmitter::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// Handed to the backend thread.
    Sent,
    /// Held back; replaces any earlier pending frame.
    Coalesced,
}

/// Submission counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitStats {
    /// Frames written to the backend.
    pub frames: u64,
    /// Bytes written to the backend.
    pub bytes: u64,
    /// Backend write failures.
    pub errors: u64,
    /// Pending frames replaced by a newer one.
    pub coalesced: u64,
    /// Frames dropped by [`ShutdownMode::Abandon`].
    pub abandoned: u64,
    /// Smoothed backend write time in microseconds.
    pub avg_submit_us: u64,
    /// Last backend write time in microseconds.
    pub last_submit_us: u64,
}

const RUNNING: u8 = 0;
const ABANDON: u8 = 1;

/// Handle to the submitter thread.
pub struct FrameSubmitter {
    sender: Option<Sender<Vec<u8>>>,
    handle: Option<JoinHandle<SubmitStats>>,
    in_flight: Arc<AtomicUsize>,
    mode: Arc<AtomicU8>,
    max_in_flight: usize,
    pending: Option<Vec<u8>>,
    coalesced: u64,
}

impl std::fmt::Debug for FrameSubmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSubmitter")
            .field("in_flight", &self.in_flight())
            .field("max_in_flight", &self.max_in_flight)
            .field("pending", &self.pending.is_some())
            .finish_non_exhaustive()
    }
}

impl FrameSubmitter {
    /// Spawn the submitter thread around `backend`.
    ///
    /// `max_in_flight` is raised to at least one.
    pub fn spawn(backend: impl Backend, max_in_flight: usize) -> io::Result<Self> {
        let max_in_flight = max_in_flight.max(1);
        let (sender, receiver) = bounded(max_in_flight);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let mode = Arc::new(AtomicU8::new(RUNNING));

        let worker_in_flight = Arc::clone(&in_flight);
        let worker_mode = Arc::clone(&mode);
        let handle = thread::Builder::new()
            .name("weft-submit".to_string())
            .spawn(move || run_loop(backend, &receiver, &worker_in_flight, &worker_mode))?;

        Ok(Self {
            sender: Some(sender),
            handle: Some(handle),
            in_flight,
            mode,
            max_in_flight,
            pending: None,
            coalesced: 0,
        })
    }

    /// Frames sent but not yet written.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Whether a coalesced frame is waiting for capacity.
    pub const fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Offer a frame. Sends it when under the in-flight cap, otherwise
    /// keeps it as the pending frame.
    pub fn submit(&mut self, frame: Vec<u8>) -> Submitted {
        self.poll();
        if self.pending.is_none() {
            return match self.try_send(frame) {
                Ok(()) => Submitted::Sent,
                Err(frame) => {
                    self.pending = Some(frame);
                    Submitted::Coalesced
                }
            };
        }
        // Still full after polling: the newer frame wins.
        self.pending = Some(frame);
        self.coalesced += 1;
        tracing::warn!(coalesced = self.coalesced, "frame coalesced under backpressure");
        Submitted::Coalesced
    }

    /// Send the pending frame if capacity freed up. Returns whether a
    /// frame was sent.
    pub fn poll(&mut self) -> bool {
        let Some(frame) = self.pending.take() else {
            return false;
        };
        match self.try_send(frame) {
            Ok(()) => true,
            Err(frame) => {
                self.pending = Some(frame);
                false
            }
        }
    }

    fn try_send(&self, frame: Vec<u8>) -> Result<(), Vec<u8>> {
        let Some(sender) = &self.sender else {
            return Err(frame);
        };
        let claimed = self
            .in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_in_flight).then_some(n + 1)
            });
        if claimed.is_err() {
            return Err(frame);
        }
        sender.try_send(frame).map_err(|e| {
            self.in_flight.fetch_sub(1, Ordering::AcqRel);
            e.into_inner()
        })
    }

    /// Stop the thread and return its counters.
    pub fn shutdown(mut self, mode: ShutdownMode) -> SubmitStats {
        self.stop(mode)
    }

    fn stop(&mut self, mode: ShutdownMode) -> SubmitStats {
        let mut abandoned = 0;
        match mode {
            ShutdownMode::Flush => {
                if let (Some(frame), Some(sender)) = (self.pending.take(), &self.sender) {
                    self.in_flight.fetch_add(1, Ordering::AcqRel);
                    if sender.send(frame).is_err() {
                        self.in_flight.fetch_sub(1, Ordering::AcqRel);
                    }
                }
            }
            ShutdownMode::Abandon => {
                self.mode.store(ABANDON, Ordering::Release);
                if self.pending.take().is_some() {
                    abandoned += 1;
                }
            }
        }
        // Disconnecting lets the worker drain the queue and exit.
        self.sender = None;
        let mut stats = self
            .handle
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        stats.coalesced = self.coalesced;
        stats.abandoned += abandoned;
        tracing::debug!(
            frames = stats.frames,
            abandoned = stats.abandoned,
            coalesced = stats.coalesced,
            ?mode,
            "submitter stopped"
        );
        stats
    }
}

impl Drop for FrameSubmitter {
    fn drop(&mut self) {
        if self.handle.is_some() {
            self.stop(ShutdownMode::Abandon);
        }
    }
}

fn run_loop(
    mut backend: impl Backend,
    receiver: &Receiver<Vec<u8>>,
    in_flight: &AtomicUsize,
    mode: &AtomicU8,
) -> SubmitStats {
    let mut stats = SubmitStats::default();
    while let Ok(frame) = receiver.recv() {
        if mode.load(Ordering::Acquire) == ABANDON {
            stats.abandoned += 1;
            in_flight.fetch_sub(1, Ordering::AcqRel);
            continue;
        }

        let start = Instant::now();
        match backend.submit(&frame) {
            Ok(()) => {
                stats.frames += 1;
                stats.bytes += frame.len() as u64;
            }
            Err(e) => {
                stats.errors += 1;
                tracing::error!(error = %e, "backend rejected frame");
            }
        }
        in_flight.fetch_sub(1, Ordering::AcqRel);

        stats.last_submit_us = u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX);
        // Smoothed average
        stats.avg_submit_us = if stats.avg_submit_us == 0 {
            stats.last_submit_us
        } else {
            (stats.avg_submit_us * 15 + stats.last_submit_us) / 16
        };
    }
    stats
}

//! Screen capture: one frame per session, delivered at most once.
//!
//! A capture follows a strict start → deliver-once → stop protocol. The
//! stream keeps producing frames until stopped, so delivery races are
//! normal; the `DeliveryCell` guarantees only the first frame completes
//! the pending result and every later frame is discarded.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{ImageFormat, RgbaImage};
use tokio::sync::oneshot;
use tokio::time;

/// What the caller asked to capture. Explicit window id wins when it
/// resolves, else explicit display id, else the first available display.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptureTarget {
    pub display_id: Option<u32>,
    pub window_id: Option<u32>,
}

/// A started stream produces frames asynchronously into a [`DeliveryCell`]
/// until stopped. `stop` must release every capture resource and is called
/// unconditionally, frame or no frame.
pub trait CaptureStream: Send {
    fn start(&mut self, cell: Arc<DeliveryCell>) -> Result<(), String>;
    fn stop(&mut self);
}

/// Resolves a target against the currently available sources and opens a
/// stream configured to the source's dimensions.
pub trait CaptureBackend: Send + Sync {
    fn open(&self, target: &CaptureTarget) -> Result<Box<dyn CaptureStream>, String>;
}

/// One-shot result slot for a capture in flight.
///
/// The sender lives behind a mutexed `Option`; whichever frame callback
/// takes it first owns the completion. Taking and sending are a single
/// critical section, so concurrent callbacks cannot double-complete.
pub struct DeliveryCell {
    slot: Mutex<Option<oneshot::Sender<Vec<u8>>>>,
}

impl DeliveryCell {
    pub fn new() -> (Arc<DeliveryCell>, oneshot::Receiver<Vec<u8>>) {
        let (tx, rx) = oneshot::channel();
        (
            Arc::new(DeliveryCell {
                slot: Mutex::new(Some(tx)),
            }),
            rx,
        )
    }

    /// Encode the frame and complete the pending capture. Returns whether
    /// this call won the delivery; losers' frames are dropped silently.
    /// An encode failure consumes the slot without retrying later frames.
    pub fn deliver(&self, frame: RgbaImage) -> bool {
        let Some(tx) = self.slot.lock().unwrap().take() else {
            log::debug!("discarding frame after first delivery");
            return false;
        };
        match encode_png(&frame) {
            Ok(bytes) => tx.send(bytes).is_ok(),
            Err(e) => {
                log::warn!("frame encoding failed: {e}");
                false
            }
        }
    }
}

fn encode_png(frame: &RgbaImage) -> Result<Vec<u8>, String> {
    let mut buf = Cursor::new(Vec::new());
    frame
        .write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(buf.into_inner())
}

/// Bound on a stream that neither emits a frame nor reports failure
/// (source revoked mid-stream, headless display, ...).
const FIRST_FRAME_DEADLINE: Duration = Duration::from_secs(10);

/// One end-to-end image acquisition attempt.
pub struct CaptureSession {
    backend: Box<dyn CaptureBackend>,
    first_frame_deadline: Duration,
}

impl CaptureSession {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        CaptureSession {
            backend,
            first_frame_deadline: FIRST_FRAME_DEADLINE,
        }
    }

    #[cfg(test)]
    fn with_deadline(backend: Box<dyn CaptureBackend>, deadline: Duration) -> Self {
        CaptureSession {
            backend,
            first_frame_deadline: deadline,
        }
    }

    /// Capture a single PNG frame from the resolved target, or `None` on
    /// any failure. The stream never outlives this call.
    pub async fn capture(&self, target: &CaptureTarget) -> Option<Vec<u8>> {
        let mut stream = match self.backend.open(target) {
            Ok(stream) => stream,
            Err(e) => {
                log::warn!("capture open failed: {e}");
                return None;
            }
        };

        let (cell, rx) = DeliveryCell::new();
        if let Err(e) = stream.start(cell) {
            log::warn!("capture start failed: {e}");
            stream.stop();
            return None;
        }

        let result = match time::timeout(self.first_frame_deadline, rx).await {
            Ok(Ok(png)) => Some(png),
            Ok(Err(_)) => {
                log::warn!("capture stream ended without a frame");
                None
            }
            Err(_) => {
                log::warn!(
                    "no frame within {:?}, abandoning capture",
                    self.first_frame_deadline
                );
                None
            }
        };
        stream.stop();
        result
    }
}

// ---------------------------------------------------------------------------
// xcap-backed screen backend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum SourceKind {
    Display(u32),
    Window(u32),
}

/// Backend over the OS display/window list.
pub struct ScreenBackend;

impl CaptureBackend for ScreenBackend {
    fn open(&self, target: &CaptureTarget) -> Result<Box<dyn CaptureStream>, String> {
        let (kind, width, height) = resolve(target)?;
        log::debug!("capture source {kind:?} configured at {width}x{height}");
        Ok(Box::new(ShotStream {
            kind,
            stopped: Arc::new(AtomicBool::new(false)),
        }))
    }
}

fn resolve(target: &CaptureTarget) -> Result<(SourceKind, u32, u32), String> {
    if let Some(wid) = target.window_id {
        let windows = xcap::Window::all().map_err(|e| format!("window enumeration failed: {e}"))?;
        if let Some(win) = windows.iter().find(|w| w.id() == wid) {
            return Ok((SourceKind::Window(wid), win.width(), win.height()));
        }
        log::debug!("window {wid} not found, falling back to display");
    }

    let monitors = xcap::Monitor::all().map_err(|e| format!("display enumeration failed: {e}"))?;
    if let Some(did) = target.display_id {
        if let Some(mon) = monitors.iter().find(|m| m.id() == did) {
            return Ok((SourceKind::Display(did), mon.width(), mon.height()));
        }
        log::debug!("display {did} not found, falling back to first display");
    }

    monitors
        .iter()
        .find(|m| m.is_primary())
        .or_else(|| monitors.first())
        .map(|m| (SourceKind::Display(m.id()), m.width(), m.height()))
        .ok_or_else(|| "no capture source available".to_string())
}

struct ShotStream {
    kind: SourceKind,
    stopped: Arc<AtomicBool>,
}

impl CaptureStream for ShotStream {
    fn start(&mut self, cell: Arc<DeliveryCell>) -> Result<(), String> {
        let kind = self.kind;
        let stopped = self.stopped.clone();
        // Source handles are not Send on every platform; the worker
        // re-resolves by id on the blocking pool.
        tokio::task::spawn_blocking(move || {
            let frame = grab_frame(kind);
            if stopped.load(Ordering::SeqCst) {
                return;
            }
            match frame {
                Some(frame) => {
                    cell.deliver(frame);
                }
                None => log::warn!("capture source {kind:?} produced no frame"),
            }
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

fn grab_frame(kind: SourceKind) -> Option<RgbaImage> {
    match kind {
        SourceKind::Display(id) => xcap::Monitor::all()
            .ok()?
            .into_iter()
            .find(|m| m.id() == id)?
            .capture_image()
            .map_err(|e| log::warn!("display capture failed: {e}"))
            .ok(),
        SourceKind::Window(id) => xcap::Window::all()
            .ok()?
            .into_iter()
            .find(|w| w.id() == id)?
            .capture_image()
            .map_err(|e| log::warn!("window capture failed: {e}"))
            .ok(),
    }
}

//! Selector domain: drag-to-select a screen region over a transparent overlay.
//!
//! External code should only use the items exported here.
//!   - `RegionSelector::select` resolves to the chosen `CaptureRegion` or `None`.
//!   - `OverlayHost` is the seam to the windowing layer (overlay.rs on macOS).
//!   - cursor.rs owns the push/pop cursor stack and its guard.
//!
//! Every `select()` delivers exactly one completion. The overlay, its key
//! monitors and the cursor push are all released before that completion is
//! sent.

pub mod cursor;
pub mod geometry;

pub use cursor::{CursorGuard, CursorShape, CursorStack, ShapeStack};
pub use geometry::{
    to_capture_region, LocalRect, OverlayFrame, Point, VerticalAxis, MIN_SELECTION_SIZE,
};

use crate::capture::CaptureRegion;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::oneshot;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectorState {
    Idle,
    Armed,
    Dragging { origin: Point, current: Point },
}

/// Which monitor observed an Escape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Local,
    Global,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayEvent {
    PointerDown(Point),
    PointerMoved(Point),
    PointerUp(Point),
    Escape(KeySource),
}

#[derive(Debug, thiserror::Error)]
pub enum OverlayError {
    #[error("overlay could not be created: {0}")]
    Create(String),
}

/// The visible overlay window.
pub trait OverlaySurface: Send {
    /// Overlay frame in global points.
    fn frame(&self) -> OverlayFrame;
    /// Redraw the selection outline; `None` clears it.
    fn draw_selection(&self, rect: Option<LocalRect>);
    fn dismiss(&self);
}

/// A registered Escape listener.
pub trait KeyMonitor: Send {
    fn remove(&mut self);
}

pub struct OverlayParts {
    pub surface: Box<dyn OverlaySurface>,
    /// Both the local and the system-wide Escape monitor.
    pub monitors: Vec<Box<dyn KeyMonitor>>,
}

pub trait OverlayHost: Send + Sync {
    /// Raise the overlay and start forwarding its input into `sink`.
    fn present(&self, sink: EventSink) -> Result<OverlayParts, OverlayError>;
}

/// Where the overlay and key monitors deliver input.
///
/// Holds the selector weakly, so a monitor that outlives its session can
/// never keep the selector alive or complete a later session twice.
#[derive(Clone)]
pub struct EventSink {
    inner: Weak<SelectorInner>,
    session: u64,
}

impl EventSink {
    pub fn send(&self, event: OverlayEvent) {
        if let Some(inner) = self.inner.upgrade() {
            inner.handle(self.session, event);
        }
    }
}

struct Session {
    id: u64,
    state: SelectorState,
    /// None until the host has finished presenting.
    surface: Option<Box<dyn OverlaySurface>>,
    monitors: Vec<Box<dyn KeyMonitor>>,
    guard: Option<CursorGuard>,
    prior_cursor: CursorShape,
    reply: oneshot::Sender<Option<CaptureRegion>>,
}

struct SelectorInner {
    host: Arc<dyn OverlayHost>,
    cursor: Arc<dyn CursorStack>,
    axis: VerticalAxis,
    session: Mutex<Option<Session>>,
    next_id: Mutex<u64>,
}

impl SelectorInner {
    fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        match self.session.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn handle(&self, id: u64, event: OverlayEvent) {
        let mut slot = self.lock();
        let Some(session) = slot.as_mut().filter(|s| s.id == id) else {
            return;
        };
        // Only Escape is meaningful before the overlay is up.
        let Some(surface) = session.surface.as_ref() else {
            if let OverlayEvent::Escape(source) = event {
                log::info!("[SELECT] Cancelled by {:?} Escape while presenting", source);
                let finished = slot.take();
                drop(slot);
                if let Some(session) = finished {
                    self.finish(session, None);
                }
            }
            return;
        };

        let outcome = match (event, session.state) {
            (OverlayEvent::Escape(source), _) => {
                log::info!("[SELECT] Cancelled by {:?} Escape", source);
                Some(None)
            }
            (OverlayEvent::PointerDown(p), SelectorState::Armed) => {
                session.guard = Some(CursorGuard::acquire(
                    Arc::clone(&self.cursor),
                    CursorShape::Crosshair,
                ));
                session.state = SelectorState::Dragging { origin: p, current: p };
                surface.draw_selection(Some(LocalRect::from_corners(p, p)));
                None
            }
            (OverlayEvent::PointerMoved(p), SelectorState::Dragging { origin, .. }) => {
                surface.draw_selection(Some(LocalRect::from_corners(origin, p)));
                session.state = SelectorState::Dragging { origin, current: p };
                None
            }
            (OverlayEvent::PointerUp(p), SelectorState::Dragging { origin, .. }) => {
                let rect = LocalRect::from_corners(origin, p);
                if rect.exceeds_minimum() {
                    let region = to_capture_region(&rect, &surface.frame(), self.axis);
                    Some(region)
                } else {
                    log::info!(
                        "[SELECT] Selection {:.0}x{:.0} below minimum, treating as cancel",
                        rect.width,
                        rect.height
                    );
                    Some(None)
                }
            }
            _ => None,
        };

        if let Some(region) = outcome {
            let finished = slot.take();
            drop(slot);
            if let Some(session) = finished {
                self.finish(session, region);
            }
        }
    }

    /// Tear the session down, then deliver its single completion.
    fn finish(&self, session: Session, region: Option<CaptureRegion>) {
        let Session {
            mut monitors,
            surface,
            guard,
            prior_cursor,
            reply,
            ..
        } = session;

        tear_down(&mut monitors, surface);

        if let Some(guard) = guard {
            guard.release();
        }
        self.cursor.set(prior_cursor);

        if let Some(region) = &region {
            log::info!(
                "[SELECT] Selected {:.0}x{:.0} at ({:.0}, {:.0})",
                region.width(),
                region.height(),
                region.x(),
                region.y()
            );
        }
        // Receiver may already be gone if the caller stopped waiting.
        let _ = reply.send(region);
    }
}

fn tear_down(monitors: &mut Vec<Box<dyn KeyMonitor>>, surface: Option<Box<dyn OverlaySurface>>) {
    for monitor in monitors.iter_mut() {
        monitor.remove();
    }
    monitors.clear();
    if let Some(surface) = surface {
        surface.dismiss();
    }
}

/// A started selection; await `wait` for its outcome.
pub struct Selection {
    reply: Option<oneshot::Receiver<Option<CaptureRegion>>>,
}

impl Selection {
    pub async fn wait(self) -> Option<CaptureRegion> {
        match self.reply {
            Some(rx) => rx.await.unwrap_or(None),
            None => None,
        }
    }
}

/// Drives one overlay session at a time.
#[derive(Clone)]
pub struct RegionSelector {
    inner: Arc<SelectorInner>,
}

impl RegionSelector {
    pub fn new(
        host: Arc<dyn OverlayHost>,
        cursor: Arc<dyn CursorStack>,
        axis: VerticalAxis,
    ) -> Self {
        Self {
            inner: Arc::new(SelectorInner {
                host,
                cursor,
                axis,
                session: Mutex::new(None),
                next_id: Mutex::new(0),
            }),
        }
    }

    pub async fn select(&self) -> Option<CaptureRegion> {
        self.start().wait().await
    }

    /// Raise the overlay and arm the crosshair without waiting.
    ///
    /// A session still in flight is cancelled first.
    pub fn start(&self) -> Selection {
        self.cancel();

        let id = {
            let mut next = match self.inner.next_id.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            *next += 1;
            *next
        };
        let sink = EventSink {
            inner: Arc::downgrade(&self.inner),
            session: id,
        };

        // Crosshair goes up in the same turn as the overlay.
        let prior_cursor = self.inner.cursor.current();
        self.inner.cursor.set(CursorShape::Crosshair);

        // The session exists before the host can deliver any key event.
        let (tx, rx) = oneshot::channel();
        *self.inner.lock() = Some(Session {
            id,
            state: SelectorState::Armed,
            surface: None,
            monitors: Vec::new(),
            guard: None,
            prior_cursor,
            reply: tx,
        });

        match self.inner.host.present(sink) {
            Ok(parts) => {
                let mut slot = self.inner.lock();
                match slot.as_mut().filter(|s| s.id == id) {
                    Some(session) => {
                        session.surface = Some(parts.surface);
                        session.monitors = parts.monitors;
                        log::debug!("[SELECT] Overlay armed");
                    }
                    None => {
                        drop(slot);
                        let OverlayParts {
                            surface,
                            mut monitors,
                        } = parts;
                        tear_down(&mut monitors, Some(surface));
                    }
                }
            }
            Err(e) => {
                log::error!("[SELECT] {}", e);
                let finished = {
                    let mut slot = self.inner.lock();
                    if slot.as_ref().is_some_and(|s| s.id == id) {
                        slot.take()
                    } else {
                        None
                    }
                };
                if let Some(session) = finished {
                    self.inner.finish(session, None);
                }
            }
        }
        Selection { reply: Some(rx) }
    }

    /// Feed one input event into the current session.
    pub fn handle(&self, event: OverlayEvent) {
        let id = self.inner.lock().as_ref().map(|s| s.id);
        if let Some(id) = id {
            self.inner.handle(id, event);
        }
    }

    pub fn state(&self) -> SelectorState {
        self.inner
            .lock()
            .as_ref()
            .map_or(SelectorState::Idle, |s| s.state)
    }

    /// Cancel the session in flight, if any.
    pub fn cancel(&self) {
        let finished = self.inner.lock().take();
        if let Some(session) = finished {
            log::info!("[SELECT] Prior selection cancelled");
            self.inner.finish(session, None);
        }
    }
}

//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use typeclip_lib::capture::{CaptureBackend, CaptureError, CaptureRegion, DisplayShot, WindowShot};
use typeclip_lib::capture::CapturedImage;
use typeclip_lib::clipboard::{ChangeTracker, ClipboardError, ClipboardSource};
use typeclip_lib::inject::{KeyPoster, Keystroke, PostError};
use typeclip_lib::ocr::{NormalizedRect, RecognizeError, TextFragment, TextRecognizer};
use typeclip_lib::permissions::Authorization;
use typeclip_lib::selector::{
    EventSink, KeyMonitor, LocalRect, OverlayError, OverlayFrame, OverlayHost, OverlayParts,
    OverlaySurface,
};

/// One synthetic key event as the receiving app would see it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Down(Keystroke),
    Up(Keystroke),
}

/// Records every posted pair as a down event followed by an up event.
#[derive(Default)]
pub struct RecordingPoster {
    pub events: Mutex<Vec<KeyEvent>>,
}

impl RecordingPoster {
    pub fn events(&self) -> Vec<KeyEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Unicode payloads of the key-down events, in order.
    pub fn typed_payloads(&self) -> Vec<String> {
        self.events()
            .iter()
            .filter_map(|e| match e {
                KeyEvent::Down(k) => k.text(),
                KeyEvent::Up(_) => None,
            })
            .collect()
    }
}

impl KeyPoster for RecordingPoster {
    fn post(&self, stroke: &Keystroke) -> Result<(), PostError> {
        let mut events = self.events.lock().unwrap();
        events.push(KeyEvent::Down(stroke.clone()));
        events.push(KeyEvent::Up(stroke.clone()));
        Ok(())
    }
}

pub struct Grants {
    pub injection: bool,
    pub capture: bool,
}

impl Grants {
    pub fn all() -> Arc<Self> {
        Arc::new(Self { injection: true, capture: true })
    }

    pub fn none() -> Arc<Self> {
        Arc::new(Self { injection: false, capture: false })
    }
}

impl Authorization for Grants {
    fn injection_authorized(&self) -> bool {
        self.injection
    }
    fn capture_authorized(&self) -> bool {
        self.capture
    }
}

/// In-memory clipboard.
#[derive(Default)]
pub struct MemoryClipboard {
    pub text: Mutex<String>,
    pub clears: AtomicUsize,
    tracker: ChangeTracker,
}

impl MemoryClipboard {
    pub fn with_text(text: &str) -> Arc<Self> {
        let board = Self::default();
        *board.text.lock().unwrap() = text.to_string();
        Arc::new(board)
    }
}

impl ClipboardSource for MemoryClipboard {
    fn read_text(&self) -> String {
        self.text.lock().unwrap().clone()
    }
    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        *self.text.lock().unwrap() = text.to_string();
        Ok(())
    }
    fn clear(&self) -> Result<(), ClipboardError> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.text.lock().unwrap().clear();
        Ok(())
    }
    fn change_count(&self) -> u64 {
        self.tracker.observe(&self.read_text())
    }
}

/// Capture backend whose strategies succeed or fail on command, and which
/// records the order they were tried in.
pub struct ScriptedBackend {
    pub region_ok: bool,
    pub display_ok: bool,
    pub windows_ok: bool,
    pub attempts: Mutex<Vec<&'static str>>,
}

impl ScriptedBackend {
    pub fn new(region_ok: bool, display_ok: bool, windows_ok: bool) -> Arc<Self> {
        Arc::new(Self {
            region_ok,
            display_ok,
            windows_ok,
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn attempts(&self) -> Vec<&'static str> {
        self.attempts.lock().unwrap().clone()
    }
}

fn solid(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_pixel(w, h, Rgba([255, 255, 255, 255]))
}

impl CaptureBackend for ScriptedBackend {
    fn capture_region(&self, region: &CaptureRegion) -> Result<RgbaImage, CaptureError> {
        self.attempts.lock().unwrap().push("region");
        if !self.region_ok {
            return Err(CaptureError::Backend("region capture denied".into()));
        }
        Ok(solid(region.width() as u32, region.height() as u32))
    }

    fn capture_display(&self) -> Result<DisplayShot, CaptureError> {
        self.attempts.lock().unwrap().push("display");
        if !self.display_ok {
            return Err(CaptureError::Backend("display capture denied".into()));
        }
        Ok(DisplayShot {
            image: solid(2000, 1200),
            origin_x: 0.0,
            origin_y: 0.0,
            scale: 2.0,
        })
    }

    fn capture_windows(&self, region: &CaptureRegion) -> Result<Vec<WindowShot>, CaptureError> {
        self.attempts.lock().unwrap().push("windows");
        if !self.windows_ok {
            return Err(CaptureError::NoWindows);
        }
        Ok(vec![WindowShot {
            frame: *region,
            image: solid(region.width() as u32, region.height() as u32),
            z: 0,
        }])
    }
}

/// Recognizer returning canned fragments, or an error.
pub struct CannedRecognizer {
    pub result: Result<Vec<TextFragment>, String>,
    pub calls: AtomicUsize,
}

impl CannedRecognizer {
    pub fn fragments(fragments: Vec<TextFragment>) -> Arc<Self> {
        Arc::new(Self { result: Ok(fragments), calls: AtomicUsize::new(0) })
    }

    pub fn failing(msg: &str) -> Arc<Self> {
        Arc::new(Self { result: Err(msg.to_string()), calls: AtomicUsize::new(0) })
    }
}

impl TextRecognizer for CannedRecognizer {
    fn recognize(&self, _image: &CapturedImage) -> Result<Vec<TextFragment>, RecognizeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone().map_err(RecognizeError::Processing)
    }
}

/// Fragment centred at `mid_y` (normalized, bottom-up).
pub fn fragment(text: &str, x: f64, mid_y: f64) -> TextFragment {
    TextFragment::new(
        text,
        NormalizedRect { x, y: mid_y - 0.01, width: 0.2, height: 0.02 },
    )
}

#[derive(Default)]
pub struct OverlayCounters {
    pub presented: AtomicUsize,
    pub dismissed: AtomicUsize,
    pub monitors_removed: AtomicUsize,
    pub redraws: AtomicUsize,
}

struct FakeSurface {
    frame: OverlayFrame,
    counters: Arc<OverlayCounters>,
}

impl OverlaySurface for FakeSurface {
    fn frame(&self) -> OverlayFrame {
        self.frame
    }
    fn draw_selection(&self, _rect: Option<LocalRect>) {
        self.counters.redraws.fetch_add(1, Ordering::SeqCst);
    }
    fn dismiss(&self) {
        self.counters.dismissed.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeMonitor(Arc<OverlayCounters>);

impl KeyMonitor for FakeMonitor {
    fn remove(&mut self) {
        self.0.monitors_removed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Overlay host that hands its sink to the test so input can be scripted.
pub struct FakeOverlayHost {
    pub frame: OverlayFrame,
    pub fail: bool,
    pub counters: Arc<OverlayCounters>,
    pub sink: Mutex<Option<EventSink>>,
}

impl FakeOverlayHost {
    pub fn new(frame: OverlayFrame) -> Arc<Self> {
        Arc::new(Self {
            frame,
            fail: false,
            counters: Arc::default(),
            sink: Mutex::new(None),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            frame: OverlayFrame { x: 0.0, y: 0.0, width: 1.0, height: 1.0 },
            fail: true,
            counters: Arc::default(),
            sink: Mutex::new(None),
        })
    }

    pub fn sink(&self) -> EventSink {
        self.sink.lock().unwrap().clone().expect("overlay not presented")
    }
}

impl OverlayHost for FakeOverlayHost {
    fn present(&self, sink: EventSink) -> Result<OverlayParts, OverlayError> {
        if self.fail {
            return Err(OverlayError::Create("window server unavailable".into()));
        }
        self.counters.presented.fetch_add(1, Ordering::SeqCst);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(OverlayParts {
            surface: Box::new(FakeSurface { frame: self.frame, counters: self.counters.clone() }),
            monitors: vec![
                Box::new(FakeMonitor(self.counters.clone())),
                Box::new(FakeMonitor(self.counters.clone())),
            ],
        })
    }
}

//! Integration tests for the region selector's lifecycle.

mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use support::FakeOverlayHost;
use typeclip_lib::selector::{
    CursorShape, CursorStack, KeySource, OverlayEvent, OverlayFrame, Point, RegionSelector,
    SelectorState, ShapeStack, VerticalAxis,
};

fn frame() -> OverlayFrame {
    OverlayFrame { x: 0.0, y: 25.0, width: 1440.0, height: 875.0 }
}

fn cursor() -> Arc<ShapeStack<impl Fn(CursorShape) + Send + Sync>> {
    Arc::new(ShapeStack::new(|_| {}))
}

#[tokio::test]
async fn cursor_depth_restored_after_drag_then_escape() {
    let host = FakeOverlayHost::new(frame());
    let cursor = cursor();
    cursor.push(CursorShape::Arrow);
    let depth_before = cursor.depth();
    let selector = RegionSelector::new(host.clone(), cursor.clone(), VerticalAxis::TopDown);

    let pending = selector.start();
    assert_eq!(selector.state(), SelectorState::Armed);
    let sink = host.sink();
    sink.send(OverlayEvent::PointerDown(Point::new(100.0, 100.0)));
    sink.send(OverlayEvent::PointerMoved(Point::new(300.0, 200.0)));
    assert_eq!(cursor.depth(), depth_before + 1);
    sink.send(OverlayEvent::Escape(KeySource::Global));

    assert_eq!(pending.wait().await, None);
    assert_eq!(cursor.depth(), depth_before);
    assert_eq!(cursor.current(), CursorShape::Arrow);
    assert_eq!(host.counters.monitors_removed.load(Ordering::SeqCst), 2);
    assert_eq!(host.counters.dismissed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn crosshair_is_set_as_soon_as_overlay_is_up() {
    let host = FakeOverlayHost::new(frame());
    let cursor = cursor();
    let selector = RegionSelector::new(host.clone(), cursor.clone(), VerticalAxis::TopDown);
    let _pending = selector.start();
    assert_eq!(host.counters.presented.load(Ordering::SeqCst), 1);
    assert_eq!(cursor.current(), CursorShape::Crosshair);
    selector.cancel();
    assert_eq!(cursor.current(), CursorShape::Arrow);
}

#[tokio::test]
async fn small_drags_are_cancellations() {
    for (w, h) in [(5.0, 100.0), (100.0, 5.0), (0.0, 0.0), (3.0, 3.0)] {
        let host = FakeOverlayHost::new(frame());
        let selector = RegionSelector::new(host.clone(), cursor(), VerticalAxis::TopDown);
        let pending = selector.start();
        let sink = host.sink();
        sink.send(OverlayEvent::PointerDown(Point::new(50.0, 50.0)));
        sink.send(OverlayEvent::PointerUp(Point::new(50.0 + w, 50.0 + h)));
        assert_eq!(pending.wait().await, None, "{}x{}", w, h);
    }
}

#[tokio::test]
async fn completed_region_is_absolute_and_flipped() {
    let host = FakeOverlayHost::new(frame());
    let axis = VerticalAxis::BottomUp { desktop_height: 900.0 };
    let selector = RegionSelector::new(host.clone(), cursor(), axis);
    let pending = selector.start();
    let sink = host.sink();
    sink.send(OverlayEvent::PointerDown(Point::new(200.0, 100.0)));
    sink.send(OverlayEvent::PointerUp(Point::new(100.0, 150.0)));

    let region = pending.wait().await.unwrap();
    assert_eq!(region.x(), 100.0);
    assert_eq!(region.width(), 100.0);
    assert_eq!(region.height(), 50.0);
    // top at 25 + 100 = 125 from the top; bottom edge 175 → 725 from the bottom
    assert_eq!(region.y(), 725.0);
}

#[tokio::test]
async fn overlay_failure_resolves_to_cancel() {
    let cursor = cursor();
    let selector =
        RegionSelector::new(FakeOverlayHost::failing(), cursor.clone(), VerticalAxis::TopDown);
    assert_eq!(selector.select().await, None);
    assert_eq!(cursor.depth(), 0);
}

#[tokio::test]
async fn both_escape_sources_deliver_one_completion() {
    let host = FakeOverlayHost::new(frame());
    let selector = RegionSelector::new(host.clone(), cursor(), VerticalAxis::TopDown);
    let pending = selector.start();
    let sink = host.sink();
    sink.send(OverlayEvent::Escape(KeySource::Local));
    sink.send(OverlayEvent::Escape(KeySource::Global));
    sink.send(OverlayEvent::PointerUp(Point::new(10.0, 10.0)));
    assert_eq!(pending.wait().await, None);
    assert_eq!(host.counters.dismissed.load(Ordering::SeqCst), 1);
    assert_eq!(selector.state(), SelectorState::Idle);
}

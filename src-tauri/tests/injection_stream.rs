//! Integration tests for the text injector's key-event stream.
//!
//! A recording poster stands in for Core Graphics; each posted keystroke
//! shows up as a down event followed by an up event.

mod support;

use std::sync::Arc;
use std::time::Duration;
use support::{Grants, KeyEvent, RecordingPoster};
use typeclip_lib::cancel::CancelToken;
use typeclip_lib::inject::{run_injection, InjectionRequest, Keystroke, TextInjector};
use unicode_segmentation::UnicodeSegmentation;

fn type_all(text: &str) -> Arc<RecordingPoster> {
    let poster = Arc::new(RecordingPoster::default());
    let injector = TextInjector::new(poster.clone(), Grants::all());
    if let Some(handle) = injector.inject(text, 2.0) {
        let report = handle.join();
        assert!(report.completed());
    }
    poster
}

#[test]
fn order_is_preserved() {
    let samples = [
        "plain ascii",
        "caf\u{00E9} na\u{0131}ve",
        "e\u{0301}t\u{00E9} \u{1F44D}\u{1F3FD} \u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}",
        "\u{1F1EB}\u{1F1F7}\u{1F1EF}\u{1F1F5}",
        "\u{4F60}\u{597D}\u{FF0C}\u{4E16}\u{754C}",
    ];
    for sample in samples {
        let poster = type_all(sample);
        assert_eq!(poster.typed_payloads().concat(), sample, "sample {:?}", sample);
    }
}

#[test]
fn graphemes_are_never_split() {
    let text = "a\u{0301}\u{1F1FA}\u{1F1F8}\u{1F469}\u{1F3FD}\u{200D}\u{1F4BB}z";
    let poster = type_all(text);
    let expected: Vec<&str> = text.graphemes(true).collect();
    assert_eq!(poster.typed_payloads(), expected);
    assert_eq!(poster.events().len(), expected.len() * 2);
}

#[test]
fn each_pair_completes_before_the_next() {
    let poster = type_all("xyz");
    let events = poster.events();
    for pair in events.chunks(2) {
        match pair {
            [KeyEvent::Down(a), KeyEvent::Up(b)] => assert_eq!(a, b),
            other => panic!("unpaired events: {:?}", other),
        }
    }
}

#[test]
fn empty_input_posts_nothing() {
    let poster = Arc::new(RecordingPoster::default());
    let injector = TextInjector::new(poster.clone(), Grants::all());
    assert!(injector.inject("", 20.0).is_none());
    assert!(poster.events().is_empty());
}

#[test]
fn line_break_becomes_one_enter_between_neighbours() {
    let poster = type_all("A\nB");
    let events = poster.events();
    let a = Keystroke::Unicode(vec!['A' as u16]);
    let b = Keystroke::Unicode(vec!['B' as u16]);
    assert_eq!(
        events,
        vec![
            KeyEvent::Down(a.clone()),
            KeyEvent::Up(a),
            KeyEvent::Down(Keystroke::Enter),
            KeyEvent::Up(Keystroke::Enter),
            KeyEvent::Down(b.clone()),
            KeyEvent::Up(b),
        ]
    );
}

#[test]
fn crlf_is_a_single_enter() {
    let poster = type_all("1\r\n2");
    let enters = poster
        .events()
        .iter()
        .filter(|e| matches!(e, KeyEvent::Down(Keystroke::Enter)))
        .count();
    assert_eq!(enters, 1);
    assert_eq!(poster.typed_payloads(), vec!["1", "2"]);
}

#[test]
fn unauthorized_injection_is_silent_noop() {
    let poster = Arc::new(RecordingPoster::default());
    let injector = TextInjector::new(poster.clone(), Grants::none());
    assert!(injector.inject("secret", 2.0).is_none());
    assert!(poster.events().is_empty());
}

#[test]
fn cancel_stops_before_the_next_character() {
    let poster = Arc::new(RecordingPoster::default());
    let injector = TextInjector::new(poster.clone(), Grants::all());
    let handle = injector.inject(&"x".repeat(200), 20.0).unwrap();
    std::thread::sleep(Duration::from_millis(70));
    handle.cancel();
    let report = handle.join();

    assert!(report.cancelled);
    assert!(report.posted < 200);
    // Only whole characters were typed, in order.
    let typed = poster.typed_payloads();
    assert_eq!(typed.len(), report.posted);
    assert!(typed.iter().all(|t| t == "x"));
}

#[test]
fn worker_honours_external_token() {
    let poster = RecordingPoster::default();
    let cancel = CancelToken::new();
    cancel.cancel();
    let report = run_injection(InjectionRequest::new("abc", 2.0), &poster, &cancel);
    assert!(report.cancelled);
    assert!(poster.events().is_empty());
}

use std::path::Path;

use yeller::{build_notification, capture_stack, capture_stack_with_depth, CustomData, StackFrame};

fn library_src() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/src"))
}

fn assert_no_library_frames(frames: &[StackFrame]) {
    for frame in frames {
        assert!(
            !frame.function_name.starts_with("yeller::"),
            "library frame leaked: {}",
            frame
        );
        assert!(
            !Path::new(&frame.filename).starts_with(library_src()),
            "library frame leaked: {}",
            frame
        );
    }
}

#[inline(never)]
fn application_frame() -> Vec<StackFrame> {
    capture_stack(0)
}

#[inline(never)]
fn outer() -> Vec<StackFrame> {
    inner()
}

#[inline(never)]
fn inner() -> Vec<StackFrame> {
    capture_stack(1)
}

#[inline(never)]
fn recurse(depth: usize, max_depth: usize) -> Vec<StackFrame> {
    if depth == 0 {
        capture_stack_with_depth(0, max_depth)
    } else {
        let frames = recurse(depth - 1, max_depth);
        std::hint::black_box(frames)
    }
}

#[test]
fn test_capture_contains_caller() {
    let frames = application_frame();
    assert!(!frames.is_empty());
    assert!(frames
        .iter()
        .any(|frame| frame.function_name.ends_with("application_frame")));
    assert_no_library_frames(&frames);
}

#[test]
fn test_skip_frames() {
    let frames = outer();
    assert!(!frames
        .iter()
        .any(|frame| frame.function_name.ends_with("::inner")));
    assert!(frames
        .iter()
        .any(|frame| frame.function_name.ends_with("::outer")));
}

#[test]
fn test_depth_is_bounded() {
    let frames = recurse(40, 10);
    assert_eq!(frames.len(), 10);
    assert_no_library_frames(&frames);
}

#[test]
fn test_default_depth_is_bounded() {
    let handle = std::thread::Builder::new()
        .stack_size(32 * 1024 * 1024)
        .spawn(|| recurse(300, yeller::MAX_STACK_DEPTH))
        .unwrap();
    let frames = handle.join().unwrap();
    assert_eq!(frames.len(), yeller::MAX_STACK_DEPTH);
}

#[test]
fn test_unbounded_depth() {
    let frames = recurse(5, usize::MAX);
    assert!(frames.len() > 5);
    assert!(frames[0].function_name.ends_with("recurse"));
    assert_no_library_frames(&frames);
}

#[test]
fn test_notification_stack_starts_outside_library() {
    let notification = build_notification("boom", "test", "yeller-rust: test", CustomData::new());
    assert_eq!(notification.message, "boom");
    assert_no_library_frames(&notification.stacktrace);
    assert!(notification
        .stacktrace
        .iter()
        .any(|frame| frame.function_name.ends_with("test_notification_stack_starts_outside_library")));

    let json = serde_json::to_value(&notification).unwrap();
    assert_eq!(json["custom-data"], serde_json::json!({}));
    for frame in json["stacktrace"].as_array().unwrap() {
        let parts = frame.as_array().expect("frames are arrays");
        assert_eq!(parts.len(), 3);
        assert!(parts.iter().all(|part| part.is_string()));
    }
}

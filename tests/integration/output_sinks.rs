// tests/integration/output_sinks.rs

use relaunch::exec::{OutputSink, SharedBuffer, StdStream};
use relaunch::project::Project;

#[tokio::test]
async fn forwarding_keeps_a_bounded_tail() {
    let buf = SharedBuffer::new();
    let sink = OutputSink::Buffer(buf.clone());
    let input: &[u8] = b"one\ntwo\nthree\nfour\n";

    let tail = sink.forward_and_capture(input, 2).await.unwrap();

    assert_eq!(tail, vec!["three".to_string(), "four".to_string()]);
    assert_eq!(buf.lines(), vec!["one", "two", "three", "four"]);
}

#[tokio::test]
async fn zero_tail_captures_nothing() {
    let sink = OutputSink::Null;
    let input: &[u8] = b"one\ntwo\n";
    assert!(sink.forward_and_capture(input, 0).await.unwrap().is_empty());
}

#[test]
fn only_mismatched_sinks_are_forwarded() {
    assert!(!OutputSink::Stdout.needs_forwarding(StdStream::Out));
    assert!(!OutputSink::Stderr.needs_forwarding(StdStream::Err));
    assert!(!OutputSink::Null.needs_forwarding(StdStream::Out));
    assert!(OutputSink::Stdout.needs_forwarding(StdStream::Err));
    assert!(OutputSink::Buffer(SharedBuffer::new()).needs_forwarding(StdStream::Out));
}

#[test]
fn reports_are_prefixed_with_the_project_name() {
    let err = SharedBuffer::new();
    let named = Project::new("/srv/api/main.go")
        .with_name("api")
        .with_output(OutputSink::Null, OutputSink::Buffer(err.clone()));
    named.report("build failed");

    let anonymous = Project::new("/srv/worker/main.go")
        .with_output(OutputSink::Null, OutputSink::Buffer(err.clone()));
    anonymous.report("launch failed");

    assert_eq!(err.lines(), vec!["[api] build failed", "launch failed"]);
}

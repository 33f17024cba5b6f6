use claritas::event_bus::{Event, EventBus, MemorySink, RunOutcome};

#[tokio::test]
async fn memory_sink_captures_events_in_order() {
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.listen_for_events();

    let sender = bus.get_sender();
    sender
        .send(Event::token("agent", "hel", vec!["agent:a1".to_string()]))
        .unwrap();
    sender.send(Event::diagnostic("runner", "superstep 1")).unwrap();
    bus.stop_listener().await;

    let events = sink.snapshot();
    assert_eq!(events.len(), 2);
    assert!(matches!(&events[0], Event::Token(t) if t.text == "hel"));
    assert!(matches!(&events[1], Event::Diagnostic(d) if d.message == "superstep 1"));
}

#[tokio::test]
async fn stop_listener_drains_events_queued_before_shutdown() {
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.listen_for_events();

    let sender = bus.get_sender();
    for i in 0..100 {
        sender
            .send(Event::diagnostic("runner", format!("line {i}")))
            .unwrap();
    }
    sender
        .send(Event::run_ended("run-1", RunOutcome::Completed, 3))
        .unwrap();
    bus.stop_listener().await;

    let events = sink.snapshot();
    assert_eq!(events.len(), 101);
    assert!(events.last().is_some_and(Event::is_terminal));
}

#[tokio::test]
async fn listener_is_idempotent() {
    let sink = MemorySink::new();
    let bus = EventBus::with_sink(sink.clone());
    bus.listen_for_events();
    bus.listen_for_events();

    bus.get_sender()
        .send(Event::diagnostic("runner", "once"))
        .unwrap();
    bus.stop_listener().await;
    assert_eq!(sink.snapshot().len(), 1);
}

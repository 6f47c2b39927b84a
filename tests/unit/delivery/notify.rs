use super::*;

#[test]
fn memory_notifier_keeps_order_and_filters_by_level() {
    let notes = MemoryNotifier::new();
    notes.info("sending");
    notes.error("Email failed (503)");
    notes.success("Ticket emailed to rider@example.com");

    assert_eq!(
        notes.notifications(),
        vec![
            Notification::new(Level::Info, "sending"),
            Notification::new(Level::Error, "Email failed (503)"),
            Notification::new(Level::Success, "Ticket emailed to rider@example.com"),
        ]
    );
    assert_eq!(notes.messages(Level::Error), vec!["Email failed (503)"]);

    notes.clear();
    assert!(notes.notifications().is_empty());
}

#[test]
fn notifier_is_object_safe() {
    let sinks: Vec<Box<dyn Notifier>> = vec![Box::new(MemoryNotifier::new()), Box::new(TracingNotifier)];
    for sink in &sinks {
        sink.warning("Ticket image may be incomplete");
    }
}

use std::cell::RefCell;
use std::rc::Rc;

use ai_tools::{NullTraceSink, TraceEvent, TraceKind, TraceLog, TraceSink, VecTraceSink};

#[derive(Clone, Default)]
struct RcSink(Rc<RefCell<Vec<TraceEvent>>>);

impl TraceSink for RcSink {
    fn emit(&mut self, event: TraceEvent) {
        self.0.borrow_mut().push(event);
    }
}

fn record(sink: &mut dyn TraceSink) {
    sink.emit(TraceEvent::new(1, TraceKind::Init, 0, "Root").with_depth(1));
    sink.emit(TraceEvent::new(1, TraceKind::Call, 0, "Root").with_depth(1));
    sink.emit(TraceEvent::new(2, TraceKind::Yield, 0, "Root").with_depth(1));
}

#[test]
fn vec_sink_keeps_order() {
    let mut sink = VecTraceSink::default();
    record(&mut sink);

    assert_eq!(sink.events.len(), 3);
    assert_eq!(sink.events[0].kind, TraceKind::Init);
    assert_eq!(sink.events[2].cycle, 2);
}

#[test]
fn trace_log_renders_kind_and_node_type() {
    let mut log = TraceLog::default();
    record(&mut log);

    assert_eq!(log.render(), ["Init(Root)", "Call(Root)", "Yield(Root)"]);
    assert_eq!(log.cycle(1).count(), 2);
    assert_eq!(log.cycle(2).next().map(|e| e.kind), Some(TraceKind::Yield));
}

#[test]
fn custom_sink_sees_every_event() {
    let handle = RcSink::default();
    let shared = handle.0.clone();
    let mut boxed: Box<dyn TraceSink> = Box::new(handle);
    record(boxed.as_mut());

    let events = shared.borrow();
    assert_eq!(events.len(), 3);
    assert_eq!(events[1].node_type, "Root");
}

#[test]
fn null_sink_discards() {
    let mut sink = NullTraceSink;
    record(&mut sink);
}

#[test]
fn vec_sink_converts_into_log() {
    let mut sink = VecTraceSink::default();
    record(&mut sink);
    let log = TraceLog::from(sink);
    assert_eq!(log.events.len(), 3);
}

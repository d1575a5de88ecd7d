#![cfg(feature = "serde")]

use ai_tools::{TraceEvent, TraceKind, TraceLog};

#[test]
fn trace_log_json_roundtrip() {
    let log = TraceLog {
        events: vec![
            TraceEvent::new(1, TraceKind::Init, 0, "Root").with_depth(1),
            TraceEvent::new(1, TraceKind::Call, 1, "Sequence").with_depth(2),
            TraceEvent::new(2, TraceKind::Wait, 3, "Wait").with_depth(3),
        ],
    };

    let json = serde_json::to_string(&log).expect("serialize");
    let roundtrip: TraceLog = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(roundtrip, log);
}

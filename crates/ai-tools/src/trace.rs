#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// What the interpreter did at one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TraceKind {
    /// Empty stack seeded with the root.
    Init,
    /// First node inspected by a call.
    Start,
    Call,
    Return,
    Fail,
    /// A failure was absorbed by a catch frame.
    Catch,
    Wait,
    /// Root was reached a second time in one call.
    Yield,
}

impl TraceKind {
    pub fn name(self) -> &'static str {
        match self {
            TraceKind::Init => "Init",
            TraceKind::Start => "Start",
            TraceKind::Call => "Call",
            TraceKind::Return => "Return",
            TraceKind::Fail => "Fail",
            TraceKind::Catch => "Catch",
            TraceKind::Wait => "Wait",
            TraceKind::Yield => "Yield",
        }
    }
}

/// A single recorded interpreter step.
///
/// This is plain data so it can be recorded during simulation and rendered or diffed later.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceEvent {
    /// Per-instance call counter at the time of the event.
    pub cycle: u64,
    pub kind: TraceKind,
    pub node: u32,
    pub node_type: Cow<'static, str>,
    /// Stack depth when the event was recorded.
    pub depth: u32,
}

impl TraceEvent {
    pub fn new(cycle: u64, kind: TraceKind, node: u32, node_type: impl Into<Cow<'static, str>>) -> Self {
        Self {
            cycle,
            kind,
            node,
            node_type: node_type.into(),
            depth: 0,
        }
    }

    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }
}

/// Renders as `Kind(NodeType)`, e.g. `Call(Sequence)`.
impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.name(), self.node_type)
    }
}

pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

#[derive(Debug, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

#[derive(Debug, Default)]
pub struct VecTraceSink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for VecTraceSink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    fn emit(&mut self, event: TraceEvent) {
        (**self).emit(event);
    }
}

/// Exportable event log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TraceLog {
    pub events: Vec<TraceEvent>,
}

impl TraceLog {
    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Events of one cycle, in order.
    pub fn cycle(&self, cycle: u64) -> impl Iterator<Item = &TraceEvent> + '_ {
        self.events.iter().filter(move |e| e.cycle == cycle)
    }

    /// Each event rendered as `Kind(NodeType)`.
    pub fn render(&self) -> Vec<String> {
        self.events.iter().map(ToString::to_string).collect()
    }
}

impl TraceSink for TraceLog {
    fn emit(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

impl From<VecTraceSink> for TraceLog {
    fn from(sink: VecTraceSink) -> Self {
        Self { events: sink.events }
    }
}

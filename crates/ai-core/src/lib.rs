//! Deterministic, engine-agnostic AI kernel primitives.
//!
//! Everything in here is shared by the expression evaluator, the behavior tree interpreter and the
//! utility query scorer: entity ids, type-erased component views and their binding checks,
//! cross-entity lookups, the fixed-layout byte blackboard, and deterministic RNG.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod agent;
pub mod blackboard;
pub mod component;
pub mod error;
pub mod lookup;
pub mod registry;
pub mod rng;
pub mod tick;

pub use agent::{AgentId, Entity};
pub use blackboard::{BbRegion, BbSlot, Blackboard, BlackboardLayout};
pub use component::{write_field, ComponentRef, ComponentType, ComponentTypeId, Components, TypeHash};
pub use error::{BindingKind, CoreError, SchemaMismatch};
pub use lookup::{ComponentLookup, LookupHandle, Lookups, MapLookup};
pub use registry::TypeRegistry;
pub use rng::{DeterministicRng, SplitMix64};
pub use tick::TickContext;

//! Umbrella crate that re-exports the `ai-*` building blocks.
//!
//! A host owns the entities and their component bytes; per agent it keeps a [`bt::BtInstance`]
//! and calls [`bt::execute`] once per scheduling slice. Everything here is deterministic given
//! the same tree, component bytes, entity sets and seed.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

#[cfg(feature = "core")]
#[cfg_attr(docsrs, doc(cfg(feature = "core")))]
pub use ai_core as core;

#[cfg(feature = "expr")]
#[cfg_attr(docsrs, doc(cfg(feature = "expr")))]
pub use ai_expr as expr;

#[cfg(feature = "tools")]
#[cfg_attr(docsrs, doc(cfg(feature = "tools")))]
pub use ai_tools as tools;

#[cfg(feature = "utility")]
#[cfg_attr(docsrs, doc(cfg(feature = "utility")))]
pub use ai_utility as utility;

#[cfg(feature = "bt")]
#[cfg_attr(docsrs, doc(cfg(feature = "bt")))]
pub use ai_bt as bt;

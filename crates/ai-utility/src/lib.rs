//! Utility queries: generate candidate items, filter them, score the survivors and keep the best.
//!
//! Passes run in order and later passes only run as fallbacks while fewer than `result_count`
//! items have been scored. Ranking is a stable sort, so equal scores keep generation order.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod error;
pub mod execute;
pub mod generator;
pub mod item;
pub mod query;

pub use error::QueryError;
pub use execute::{execute, execute_values, QueryContext, ScoredItem};
pub use generator::{EntitySets, Generator};
pub use item::QueryItem;
pub use query::{
    Normalizer, QueryConfig, QueryData, QueryOutput, QueryPass, ScoreDirection, Scorer,
};

//! Account and portfolio caches, one row per kind.

mod cache_model;
mod cache_traits;

pub use cache_model::{CacheKind, CachedPayload};
pub use cache_traits::CacheRepositoryTrait;

//! Peercache - An embeddable distributed cache node
//!
//! Byte-budgeted LRU/LFU caches grouped into namespaces, with keys spread
//! over peers by a consistent-hash ring and concurrent misses for the same
//! key collapsed into a single load.

pub mod api;
pub mod byteview;
pub mod cache;
pub mod config;
pub mod consistenthash;
pub mod error;
pub mod group;
pub mod models;
pub mod peers;
pub mod singleflight;

pub use api::AppState;
pub use byteview::ByteView;
pub use cache::EvictionPolicy;
pub use config::Config;
pub use error::{CacheError, Result};
pub use group::{Getter, GetterFunc, Group, GroupRegistry};
pub use peers::{HttpPool, PeerGetter, PeerPicker};

//! Landing cache.
//!
//! The cache memoizes the landing page's heavy content (recent comments and
//! gallery uploads). It is advisory: every operation degrades to a miss or a
//! no-op when the backend misbehaves, and activity counts never come from it.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! backend = "memory"        # or "redis"
//! redis_url = "redis://127.0.0.1/"
//! landing_ttl_seconds = 3600
//! ```

mod backend;
mod config;
mod keys;
mod lock;
mod memory;
mod redis_backend;
mod store;

pub use backend::{CacheBackend, CacheError, DisabledBackend};
pub use config::{BackendKind, CacheConfig};
pub use keys::CacheKey;
pub use memory::MemoryBackend;
pub use redis_backend::RedisBackend;
pub use store::{CacheStore, Generation};

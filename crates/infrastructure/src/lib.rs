//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_authorization_repository;
mod in_memory_decision_cache;
mod postgres_authorization_repository;
mod redis_decision_cache;

pub use in_memory_authorization_repository::InMemoryAuthorizationRepository;
pub use in_memory_decision_cache::InMemoryDecisionCache;
pub use postgres_authorization_repository::PostgresAuthorizationRepository;
pub use redis_decision_cache::RedisDecisionCache;

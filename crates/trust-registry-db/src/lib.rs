//! Persistence layer for the trust registry
//!
//! This crate provides the narrow query/command interface the scoring,
//! dependency-resolution and lineage components consume:
//! - The [`ArtifactRepository`] trait
//! - A PostgreSQL implementation with SQLx and migrations
//! - An in-memory implementation for embedding and tests
//! - Connection pool management and error handling
//!
//! # Example
//!
//! ```rust,no_run
//! use trust_registry_db::{create_pool, PoolConfig, PostgresArtifactRepository};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PoolConfig::new("postgres://localhost/trust_registry")
//!     .max_connections(10);
//! let pool = create_pool(&config).await?;
//! let repo = PostgresArtifactRepository::new(pool);
//! # Ok(())
//! # }
//! ```

// Re-export core domain types for convenience
pub use trust_registry_core;

pub mod error;
pub mod memory;
pub mod pool;
pub mod postgres;
pub mod repository;

pub use error::{DbError, DbResult};
pub use memory::InMemoryArtifactRepository;
pub use pool::{close_pool, create_pool, run_migrations, verify_pool_health, PoolConfig};
pub use postgres::PostgresArtifactRepository;
pub use repository::{ArtifactRepository, NewArtifact};

// Re-export sqlx types that users may need
pub use sqlx::postgres::PgPool;

/// Default database URL environment variable name
pub const DEFAULT_DATABASE_URL_ENV: &str = "DATABASE_URL";

//! ABOUTME: PostgreSQL-backed persistence for jobs, steps, evals, personas, and system logs
//! ABOUTME: Implements the `Repository` trait seam declared in `quillforge-core`

pub mod codec;
pub mod config;
pub mod pool;
pub mod repository;

pub use config::PostgresConfig;
pub use repository::PostgresRepository;

//! Storage layer for the collaborators this service reads and writes.
//!
//! # Modules
//!
//! - [`options`]: persisted key/value option store ([`options::OptionStore`])
//! - [`users`]: user directory ([`users::UserDirectory`]) and its TTL cache
//! - [`errors`]: storage error type
//! - `postgres`: PostgreSQL implementations (behind the `postgres` feature)
//!
//! Each collaborator is a trait with an in-memory implementation used for development and tests,
//! and a PostgreSQL implementation for production:
//!
//! ```ignore
//! let options: Arc<dyn OptionStore> = Arc::new(PostgresOptionStore::new(pool.clone()));
//! let persisted = options.get("ModelRatio").await?;
//! ```

pub mod errors;
pub mod options;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod users;

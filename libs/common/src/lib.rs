//! Common library for the OneGoodIntro services
//!
//! This crate provides functionality shared by the API and the worker:
//! database connectivity, error types, layered settings, language model
//! backends and the durable job queue.
//!
//! ```rust,no_run
//! use common::database::{DatabaseConfig, init_pool, health_check};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DatabaseConfig::from_env()?;
//!     let pool = init_pool(&config).await?;
//!     let is_healthy = health_check(&pool).await?;
//!     println!("Database health check: {}", is_healthy);
//!     Ok(())
//! }
//! ```

pub mod database;
pub mod error;
pub mod jobs;
pub mod llm;
pub mod settings;

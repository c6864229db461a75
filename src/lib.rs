//! tiergate — a cost-aware request router for LLM-backed assistants.
//!
//! Every inbound request flows through one pipeline: complexity analysis and
//! tier selection, per-caller rate limiting, credit gating, tier-specific
//! prompt assembly (with a short-TTL context cache), provider execution with
//! retries and model fallback, optional worker-to-thinker escalation, and
//! fire-and-forget usage recording.
//!
//! The crate owns the routing and execution logic; the provider, credit
//! ledger, department guidance, and usage sink are injected behind traits.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tiergate::config::RouterConfig;
//! use tiergate::engine::ExecutionEngine;
//! use tiergate::ledger::InMemoryLedger;
//! use tiergate::prompt::StaticDepartmentPrompts;
//! use tiergate::request::{Request, RequestKind};
//! use tiergate::usage::LoggingSink;
//! # use tiergate::provider::{ChatTurn, GenerationProvider};
//! # use tiergate::error::ProviderError;
//! # struct MyProvider;
//! # #[async_trait::async_trait]
//! # impl GenerationProvider for MyProvider {
//! #     async fn generate(&self, _: &str, _: &str, _: &[ChatTurn]) -> Result<String, ProviderError> {
//! #         Ok(String::new())
//! #     }
//! # }
//!
//! # async fn run() {
//! let engine = ExecutionEngine::new(
//!     Arc::new(MyProvider),
//!     Arc::new(InMemoryLedger::new()),
//!     Arc::new(LoggingSink),
//!     Arc::new(StaticDepartmentPrompts::with_defaults()),
//!     RouterConfig::default(),
//! );
//! engine.spawn_rate_limit_sweeper();
//!
//! let request = Request::new(uuid::Uuid::new_v4(), RequestKind::Chart, "create a chart of sales");
//! let result = engine.execute(&request).await;
//! # let _ = result;
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod credits;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod prompt;
pub mod provider;
pub mod rate_limit;
pub mod request;
pub mod routing;
pub mod usage;

pub use engine::ExecutionEngine;
pub use error::{ProviderError, RouterError};
pub use request::{ExecutionResult, Request, RequestKind, Tier};

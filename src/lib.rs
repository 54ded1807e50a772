/// mlproject library crate.
///
/// Exposes the pipeline modules so that integration tests in tests/ can
/// import them via `mlproject::`. The binary entry point (src/main.rs) is a
/// thin CLI over `pipeline::run`.
pub mod components;
pub mod config;
pub mod exception;
pub mod logger;
pub mod pipeline;

#[doc(hidden)]
pub mod __private {
    pub use anyhow;
}

//! Reelsmith Core Library
//!
//! Media derivation pipeline and asset ledger for recorded video.
//! Turns user edit parameters into injection-safe transformation
//! directives, executes them against external tools (ffmpeg, an external
//! speech-to-text engine, a text-to-speech network service) with bounded
//! concurrency and deadlines, and maintains a durable, concurrency-safe
//! metadata record per asset, including monotonic view/completion
//! analytics.
//!
//! The browser capture UI, byte serving, and the external engines
//! themselves are out of scope; this crate is the core consumed by an
//! API or CLI layer.

pub mod core;

/// Initializes the global tracing subscriber for library consumers that
/// do not install their own.
///
/// Honors `RUST_LOG`; defaults to `info`. Safe to call more than once
/// (tests, embedding hosts) — subsequent calls are no-ops.
pub fn init_logging() {
    use tracing_subscriber::prelude::*;

    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());

    // Avoid panics if already initialized (tests, embedding hosts).
    let _ = tracing::subscriber::set_global_default(subscriber);
}

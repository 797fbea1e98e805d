//! External Tool Adapters
//!
//! The invocation seam between the pipeline and its external
//! collaborators (ffmpeg, ffprobe, the speech-to-text engine). The
//! `Transformer` trait carries the contract — argument vector in, exit
//! outcome out, under a deadline — so stage logic tests against a stub
//! instead of real binaries.

mod detection;
mod host;
mod probe;

pub use detection::*;
pub use host::*;
pub use probe::*;

use std::time::Duration;

use async_trait::async_trait;

use crate::core::{directives::TransformationDirective, CoreResult};

/// Captured outcome of a finished tool process.
#[derive(Clone, Debug)]
pub struct ToolOutput {
    /// Process exit code, when the platform reports one.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Executes transformation directives against external tools.
///
/// Implementations must:
/// - pass `directive.args` as a verbatim argument vector, never through a
///   shell;
/// - enforce `deadline`, terminating the underlying process and returning
///   `Timeout` when it elapses;
/// - map a nonzero exit to `Upstream` carrying the diagnostic output;
/// - terminate the process if the returned future is dropped before
///   completion (caller disconnect).
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn run(
        &self,
        directive: &TransformationDirective,
        deadline: Duration,
    ) -> CoreResult<ToolOutput>;
}

#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x08000000;

/// Apply platform-specific flags to a tool process command.
///
/// On Windows, spawning console binaries from a GUI host pops a console
/// window per invocation unless suppressed.
pub(crate) fn configure_tool_command(cmd: &mut tokio::process::Command) {
    #[cfg(target_os = "windows")]
    {
        cmd.creation_flags(CREATE_NO_WINDOW);
    }
    #[cfg(not(target_os = "windows"))]
    let _ = cmd;
}

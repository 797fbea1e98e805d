//! System Transformer
//!
//! Executes directives against the detected binaries as real child
//! processes: argument vector spawning, deadline enforcement with
//! termination, and outcome mapping.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

use super::{configure_tool_command, ToolOutput, ToolPaths, Transformer};
use crate::core::{
    directives::{ToolKind, TransformationDirective},
    CoreError, CoreResult,
};

/// Runs directives as child processes of the detected tool binaries.
#[derive(Debug, Clone)]
pub struct SystemTransformer {
    paths: ToolPaths,
}

impl SystemTransformer {
    pub fn new(paths: ToolPaths) -> Self {
        Self { paths }
    }

    fn program_for(&self, tool: ToolKind) -> &std::path::Path {
        match tool {
            ToolKind::Ffmpeg => &self.paths.ffmpeg,
            ToolKind::Ffprobe => &self.paths.ffprobe,
            ToolKind::Whisper => &self.paths.whisper,
        }
    }
}

#[async_trait]
impl Transformer for SystemTransformer {
    async fn run(
        &self,
        directive: &TransformationDirective,
        deadline: Duration,
    ) -> CoreResult<ToolOutput> {
        let program = self.program_for(directive.tool);
        debug!(tool = ?directive.tool, args = ?directive.args, "invoking tool");

        let mut cmd = tokio::process::Command::new(program);
        cmd.args(&directive.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Reap the child if the awaiting request is dropped.
            .kill_on_drop(true);
        configure_tool_command(&mut cmd);

        let mut child = cmd.spawn()?;

        // Drain both pipes concurrently so a chatty tool never deadlocks
        // on a full pipe while we wait for it to exit.
        let mut stdout_pipe = child.stdout.take();
        let mut stderr_pipe = child.stderr.take();
        let stdout_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(pipe) = stdout_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });
        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut buf).await;
            }
            buf
        });

        let status = match tokio::time::timeout(deadline, child.wait()).await {
            Ok(status) => status?,
            Err(_elapsed) => {
                warn!(tool = ?directive.tool, ?deadline, "tool deadline elapsed, terminating");
                let _ = child.start_kill();
                let _ = child.wait().await;
                return Err(CoreError::Timeout(format!(
                    "{:?} exceeded deadline of {deadline:?}",
                    directive.tool
                )));
            }
        };

        let stdout = stdout_task
            .await
            .map_err(|e| CoreError::Internal(format!("stdout reader failed: {e}")))?;
        let stderr = stderr_task
            .await
            .map_err(|e| CoreError::Internal(format!("stderr reader failed: {e}")))?;

        let stdout = String::from_utf8_lossy(&stdout).into_owned();
        let stderr = String::from_utf8_lossy(&stderr).into_owned();

        if !status.success() {
            return Err(CoreError::upstream_exit(status.code(), &stderr));
        }

        Ok(ToolOutput {
            exit_code: status.code(),
            stdout,
            stderr,
        })
    }
}

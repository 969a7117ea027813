use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use c3d_core::PlannerService;
use log::{debug, info, warn};
use tokio::process::Command;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Lifecycle handle for the language-model service. Start and stop are
/// shell commands from configuration, e.g. `docker start llm`.
pub struct LlmContainer {
    client: reqwest::Client,
    health_url: String,
    start_command: Option<String>,
    stop_command: Option<String>,
}

impl LlmContainer {
    pub fn new(
        client: reqwest::Client,
        base_url: &str,
        start_command: Option<String>,
        stop_command: Option<String>,
    ) -> Self {
        Self {
            client,
            health_url: format!("{}/health/ready", base_url.trim_end_matches('/')),
            start_command,
            stop_command,
        }
    }
}

fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command).stdin(Stdio::null());
    cmd
}

#[async_trait]
impl PlannerService for LlmContainer {
    async fn is_ready(&self) -> bool {
        debug!("Checking agent health at: {}", self.health_url);
        match self.client.get(&self.health_url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Agent health check failed: {}", e);
                false
            }
        }
    }

    /// Spawns the start command without waiting for the service to come up.
    async fn start(&self) -> c3d_core::Result<()> {
        let Some(command) = &self.start_command else {
            return Err(c3d_core::Error::Service("no LLM start command configured".to_string()));
        };

        info!("Starting LLM service: {}", command);
        let mut child = shell(command)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => debug!("LLM start command finished"),
                Ok(status) => warn!("LLM start command exited with {}", status),
                Err(e) => warn!("LLM start command failed: {}", e),
            }
        });
        Ok(())
    }

    async fn stop(&self) -> c3d_core::Result<()> {
        let Some(command) = &self.stop_command else {
            debug!("No LLM stop command configured");
            return Ok(());
        };

        info!("Stopping LLM service: {}", command);
        let status = shell(command).status().await?;
        if status.success() {
            Ok(())
        } else {
            Err(c3d_core::Error::Service(format!("stop command exited with {}", status)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(start: Option<&str>, stop: Option<&str>) -> LlmContainer {
        LlmContainer::new(
            reqwest::Client::new(),
            "http://127.0.0.1:9/v1",
            start.map(String::from),
            stop.map(String::from),
        )
    }

    #[tokio::test]
    async fn test_unreachable_service_is_not_ready() {
        assert!(!container(None, None).is_ready().await);
    }

    #[tokio::test]
    async fn test_start_without_command_fails() {
        let err = container(None, None).start().await.unwrap_err();
        assert!(matches!(err, c3d_core::Error::Service(_)));
    }

    #[tokio::test]
    async fn test_stop_runs_command() {
        assert!(container(None, None).stop().await.is_ok());
        assert!(container(None, Some("true")).stop().await.is_ok());
        assert!(container(None, Some("exit 3")).stop().await.is_err());
    }
}

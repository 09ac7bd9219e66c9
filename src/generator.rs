//! Text generation backends. The pipeline only sees [`SectionGenerator`]:
//! one prompt in, free-form labeled text out.

use std::process::Stdio;
use std::time::Duration;

use anyhow::Context as _;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt as _;
use tokio::process::Command;

use crate::openai::{self, Sampling};
use crate::sections::SYSTEM_INSTRUCTIONS;

#[async_trait]
pub trait SectionGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

pub struct OpenAiGenerator {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    sampling: Sampling,
}

impl OpenAiGenerator {
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        sampling: Sampling,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            endpoint: openai::responses_endpoint(base_url),
            api_key,
            model,
            sampling,
        })
    }
}

#[async_trait]
impl SectionGenerator for OpenAiGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        openai::responses_text(
            &self.client,
            &self.endpoint,
            &self.api_key,
            &self.model,
            SYSTEM_INSTRUCTIONS,
            prompt,
            self.sampling,
        )
        .await
    }
}

/// Runs an external program per prompt: the prompt is written to stdin and
/// stdout is taken as the response.
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    pub program: String,
    pub args: Vec<String>,
    pub model: String,
}

/// The child is killed when the returned future is dropped, so a timed-out
/// call leaves no process behind.
#[async_trait]
impl SectionGenerator for CommandGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let program = self.program.as_str();
        let mut child = Command::new(program)
            .args(&self.args)
            .env("SERVICEPAGES_MODEL", &self.model)
            .env("SERVICEPAGES_INSTRUCTIONS", SYSTEM_INSTRUCTIONS)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawn generator command: {program}"))?;

        {
            let mut stdin = child.stdin.take().context("open generator stdin")?;
            stdin
                .write_all(prompt.as_bytes())
                .await
                .context("write generator stdin")?;
        }

        let output = child
            .wait_with_output()
            .await
            .context("wait generator process")?;
        if !output.status.success() {
            anyhow::bail!("generator command failed: {program} ({})", output.status);
        }

        String::from_utf8(output.stdout).context("generator stdout is not valid UTF-8")
    }
}

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::app::{LowdownError, Result};
use crate::generator::response::{parse_highlight_response, parse_summary_response, truncate_chars};
use crate::generator::{Generated, Generator, GeneratorConfig};

const SUMMARY_SYSTEM_PROMPT: &str = "You write for The Lowdown, a defense and aviation \
newsletter. You always answer in the exact labelled format you are given and nothing else.";

const HIGHLIGHT_SYSTEM_PROMPT: &str = "You write single-sentence news highlights for The \
Lowdown, a defense and aviation newsletter. You always answer in the exact labelled format \
you are given and nothing else.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

fn summary_prompt(title: &str, content: &str, url: &str) -> String {
    format!(
        r#"Analyse the article below and write a new headline and a newsletter summary.

Article title: {title}
Article URL: {url}
Content:
---
{content}
---

Answer with exactly these two labelled sections:

HEADLINE: <a concise, engaging headline with a touch of dry humour, plain text, distinct from the original title>
SUMMARY_BODY: <one markdown block starting with 🎯 and the headline in bold, then a compact 3-5 sentence paragraph with concrete figures and program names, ending with ([more]({url}))>

Do not use em-dashes."#
    )
}

fn highlight_prompt(title: &str, content: &str, url: &str) -> String {
    format!(
        r#"Summarise the article below as a single sentence with the key facts and numbers.

Article title: {title}
Article URL: {url}
Content:
---
{content}
---

Answer with exactly these two labelled sections, each on one line:

HEADLINE: <a short plain-text headline>
HIGHLIGHT: 🚩 <one sentence> ([more]({url}))

Example:
HEADLINE: Senate Signs Off
HIGHLIGHT: 🚩 The Senate confirmed Lohmeier as the 29th under-secretary of the Air Force. ([more](https://example.com))"#
    )
}

/// Generator backed by an OpenAI-compatible chat completions endpoint.
pub struct ChatGenerator {
    client: Client,
    config: GeneratorConfig,
    api_key: Option<String>,
}

impl ChatGenerator {
    pub fn new(config: GeneratorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .gzip(true)
            .brotli(true)
            .build()?;
        let api_key = config.resolve_api_key();

        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    async fn complete(
        &self,
        model: &str,
        system: &str,
        prompt: String,
        max_tokens: u32,
    ) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            LowdownError::Generation(format!(
                "API key not configured; set {} or generator.api_key",
                self.config.api_key_env
            ))
        })?;

        let request = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LowdownError::Generation(format!(
                "API error ({}): {}",
                status,
                error_text.trim()
            )));
        }

        let chat: ChatResponse = response.json().await?;
        let reply = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| LowdownError::Generation("model returned an empty reply".into()))?;

        debug!("Model {} replied with {} chars", model, reply.len());
        Ok(reply)
    }
}

#[async_trait]
impl Generator for ChatGenerator {
    async fn summarize(&self, title: &str, content: &str, url: &str) -> Result<Generated> {
        let content = truncate_chars(content, self.config.max_content_chars);
        let reply = self
            .complete(
                &self.config.summary_model,
                SUMMARY_SYSTEM_PROMPT,
                summary_prompt(title, content, url),
                self.config.summary_max_tokens,
            )
            .await?;
        parse_summary_response(&reply, url)
    }

    async fn highlight(&self, title: &str, content: &str, url: &str) -> Result<Generated> {
        let content = truncate_chars(content, self.config.max_content_chars);
        let reply = self
            .complete(
                &self.config.highlight_model,
                HIGHLIGHT_SYSTEM_PROMPT,
                highlight_prompt(title, content, url),
                self.config.highlight_max_tokens,
            )
            .await?;
        parse_highlight_response(&reply, url)
    }
}

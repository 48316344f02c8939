use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{Extraction, TextUnderstandingProvider, Understanding, UnderstandingError};
use crate::workflows::job_search::dialogue::{RequirementField, Role, Stage, Turn};

/// Connection settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

pub struct RemoteUnderstanding {
    client: Client,
    settings: RemoteSettings,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    understood: bool,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    confidence: Option<f32>,
}

impl RemoteUnderstanding {
    pub fn new(settings: RemoteSettings) -> Result<Self, UnderstandingError> {
        if settings.endpoint.trim().is_empty() {
            return Err(UnderstandingError::Disabled);
        }

        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| UnderstandingError::Transport(err.to_string()))?;

        Ok(Self { client, settings })
    }

    async fn complete(&self, prompt: String) -> Result<String, UnderstandingError> {
        let request = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: 0.1,
        };

        let mut builder = self.client.post(&self.settings.endpoint).json(&request);
        if let Some(api_key) = &self.settings.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| UnderstandingError::Transport(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(%status, body = %body, "understanding backend rejected request");
            return Err(UnderstandingError::Transport(format!(
                "backend returned {status}"
            )));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|err| UnderstandingError::MalformedReply(err.to_string()))?;

        reply
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| UnderstandingError::MalformedReply("reply has no choices".to_string()))
    }
}

#[async_trait]
impl TextUnderstandingProvider for RemoteUnderstanding {
    async fn extract(
        &self,
        text: &str,
        stage: Stage,
        recent: &[Turn],
    ) -> Result<Understanding, UnderstandingError> {
        let Some(field) = stage.collected_field() else {
            return Ok(Understanding::NotUnderstood);
        };

        let content = self.complete(build_prompt(field, text, recent)).await?;
        debug!(stage = stage.label(), "understanding backend replied");
        parse_reply(field, &content)
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

fn build_prompt(field: RequirementField, text: &str, recent: &[Turn]) -> String {
    let (subject, examples) = match field {
        RequirementField::JobType => ("职位类型", "Python开发工程师、UI设计师、产品经理、数据分析师"),
        RequirementField::Location => ("工作地点", "北京、上海、深圳、远程办公"),
        _ => ("薪资期望", "15-20K、月薪1万、年薪30万、面议"),
    };

    let history = recent
        .iter()
        .map(|turn| {
            let speaker = match turn.role {
                Role::User => "用户",
                Role::Assistant => "助手",
            };
            format!("{speaker}: {}", turn.text)
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "你是一个专业的求职顾问，正在帮助用户收集{subject}信息。\n\
         示例：{examples}\n\n\
         对话历史：\n{history}\n\n\
         用户输入：{text}\n\n\
         只返回JSON：{{\"understood\": true/false, \"value\": \"提取的{subject}\" 或 null, \"confidence\": 0.0-1.0}}"
    )
}

/// Parse the model's answer, tolerating a surrounding Markdown code fence.
fn parse_reply(field: RequirementField, content: &str) -> Result<Understanding, UnderstandingError> {
    let verdict: Verdict = serde_json::from_str(strip_code_fence(content))
        .map_err(|err| UnderstandingError::MalformedReply(err.to_string()))?;

    let value = verdict
        .value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());

    match (verdict.understood, value) {
        (true, Some(value)) => Ok(Understanding::Extracted(Extraction {
            field,
            value,
            confidence: verdict.confidence.unwrap_or(0.0).clamp(0.0, 1.0),
        })),
        _ => Ok(Understanding::NotUnderstood),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the meeting-notes extraction service.
//!
//! Talks to any OpenAI-compatible chat-completions endpoint and asks for a
//! JSON object response, which is parsed into a [`TranscriptAnalysis`].

use crate::error::AppError;
use crate::models::TranscriptAnalysis;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 4096;

#[derive(Clone)]
pub struct MeetingAnalyzer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for MeetingAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MeetingAnalyzer")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish()
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage; 2],
    response_format: ResponseFormat,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl MeetingAnalyzer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Summarize a transcript and pull out the action items relevant to
    /// `user_name`.
    pub async fn analyze(
        &self,
        transcript: &str,
        user_name: &str,
    ) -> Result<TranscriptAnalysis, AppError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt(user_name),
                },
                ChatMessage {
                    role: "user",
                    content: format!("Here is the meeting transcript to analyze:\n\n{}", transcript),
                },
            ],
            response_format: ResponseFormat {
                kind: "json_object",
            },
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let started = std::time::Instant::now();
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Extraction(format!("Request failed: {}", e)))?;

        let chat: ChatResponse = self.check_response_json(response).await?;
        let analysis = parse_completion(chat)?;

        tracing::info!(
            model = %self.model,
            action_items = analysis.action_items.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Transcript analyzed"
        );
        Ok(analysis)
    }

    async fn check_response_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AppError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                tracing::warn!("Extraction service rate limit hit (429)");
            }

            return Err(AppError::Extraction(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::Extraction(format!("JSON parse error: {}", e)))
    }
}

fn parse_completion(chat: ChatResponse) -> Result<TranscriptAnalysis, AppError> {
    let content = chat
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::Extraction("Empty completion".to_string()))?;

    serde_json::from_str(&content)
        .map_err(|e| AppError::Extraction(format!("Malformed analysis: {}", e)))
}

fn system_prompt(user_name: &str) -> String {
    format!(
        "You are a meeting notes analyst. Summarize the meeting in 2-3 sentences and \
         extract the action items relevant to the user named \"{user_name}\", including \
         tasks assigned to everyone or the team. Use priority URGENT for tight deadlines \
         or blockers, HIGH for important items, MEDIUM for standard tasks and LOW for \
         nice-to-haves. Set suggestedDueDate to an ISO 8601 date only when a deadline is \
         mentioned, otherwise null. Respond with JSON only, in the form \
         {{\"summary\": string, \"actionItems\": [{{\"title\": string, \
         \"description\": string, \"priority\": \"LOW\"|\"MEDIUM\"|\"HIGH\"|\"URGENT\", \
         \"suggestedDueDate\": string|null}}]}}"
    )
}

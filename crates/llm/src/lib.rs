use anyhow::{anyhow, Context, Result};
use reqwest::{header::HeaderValue, Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::env;
use tokio::time::{sleep, Duration};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    OpenRouter,
    OpenAi,
    Local,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenRouter => "openrouter",
            LlmProvider::OpenAi => "openai",
            LlmProvider::Local => "local",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "openrouter" => Some(LlmProvider::OpenRouter),
            "openai" => Some(LlmProvider::OpenAi),
            "local" => Some(LlmProvider::Local),
            _ => None,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::OpenRouter => "openrouter/auto",
            LlmProvider::OpenAi => "gpt-4.1-mini",
            LlmProvider::Local => "local",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LlmRequest {
    pub system: Option<String>,
    pub user: String,
}

/// Chat client for the generative fallback provider.
///
/// Rate-limit retries live here, not in the resolution engine: the engine
/// treats one `answer` call as a single fallible delegation.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    provider: LlmProvider,
    model: String,
    config: ProviderConfig,
}

#[derive(Clone)]
enum ProviderConfig {
    OpenRouter(OpenRouterConfig),
    OpenAi(OpenAiConfig),
    Local,
}

#[derive(Clone)]
struct OpenRouterConfig {
    api_key: String,
    base_url: String,
    referer: Option<String>,
    title: Option<String>,
}

#[derive(Clone)]
struct OpenAiConfig {
    api_key: String,
    base_url: String,
}

const SYSTEM_PROMPT: &str = "You are a helpful support assistant. Prefer the provided \
knowledge base excerpt when it is relevant, and say so when it is not.";

impl LlmClient {
    pub fn new(provider: LlmProvider, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let http = Client::new();
        let config = match provider {
            LlmProvider::OpenRouter => ProviderConfig::OpenRouter(OpenRouterConfig {
                api_key: read_api_key("OPENROUTER_API_KEY")?,
                base_url: env::var("OPENROUTER_BASE_URL")
                    .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string()),
                referer: env::var("OPENROUTER_REFERER").ok(),
                title: env::var("OPENROUTER_TITLE").ok(),
            }),
            LlmProvider::OpenAi => ProviderConfig::OpenAi(OpenAiConfig {
                api_key: read_api_key("OPENAI_API_KEY")?,
                base_url: env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            }),
            LlmProvider::Local => ProviderConfig::Local,
        };
        Ok(Self {
            http,
            provider,
            model,
            config,
        })
    }

    /// Reads `QNA_PROVIDER` (default `openrouter`) and `QNA_MODEL`.
    pub fn from_env() -> Result<Self> {
        let provider_name = env::var("QNA_PROVIDER").unwrap_or_else(|_| "openrouter".to_string());
        let provider = LlmProvider::from_str(&provider_name)
            .ok_or_else(|| anyhow!("unknown provider {provider_name}"))?;
        let model =
            env::var("QNA_MODEL").unwrap_or_else(|_| provider.default_model().to_string());
        Self::new(provider, model)
    }

    pub fn provider(&self) -> LlmProvider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the provider for an answer, optionally grounded in a
    /// knowledge-base excerpt. Returns the raw answer text verbatim.
    pub async fn answer(&self, question: &str, context: Option<&str>) -> Result<String> {
        let user = match context {
            Some(context) if !context.is_empty() => format!(
                "Knowledge base excerpt:\n\n{context}\n\nQuestion: {}",
                question.trim()
            ),
            _ => question.trim().to_string(),
        };
        self.chat(&LlmRequest {
            system: Some(SYSTEM_PROMPT.to_string()),
            user,
        })
        .await
    }

    pub async fn chat(&self, req: &LlmRequest) -> Result<String> {
        match &self.config {
            ProviderConfig::OpenRouter(cfg) => {
                let mut extra = Vec::new();
                if let Some(referer) = &cfg.referer {
                    extra.push(("HTTP-Referer", referer.clone()));
                }
                if let Some(title) = &cfg.title {
                    extra.push(("X-Title", title.clone()));
                }
                self.chat_completions(&cfg.base_url, &cfg.api_key, &extra, req)
                    .await
            }
            ProviderConfig::OpenAi(cfg) => {
                self.chat_completions(&cfg.base_url, &cfg.api_key, &[], req)
                    .await
            }
            ProviderConfig::Local => Ok(synthesize_local_answer(req)),
        }
    }

    async fn chat_completions(
        &self,
        base_url: &str,
        api_key: &str,
        extra_headers: &[(&'static str, String)],
        req: &LlmRequest,
    ) -> Result<String> {
        const MAX_RETRIES: usize = 6;
        let url = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        let mut messages = Vec::new();
        if let Some(system) = &req.system {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": req.user }));
        let payload = json!({
            "model": self.model,
            "messages": messages,
        });
        let mut attempt = 0usize;
        loop {
            attempt += 1;
            let mut request = self.http.post(&url).bearer_auth(api_key).json(&payload);
            for (name, value) in extra_headers {
                request = request.header(*name, value);
            }
            let response = match request.send().await {
                Ok(resp) => resp,
                Err(err) => {
                    if attempt > MAX_RETRIES {
                        return Err(err)
                            .with_context(|| format!("{} request failed", self.provider.as_str()));
                    }
                    sleep(backoff_delay(attempt, None)).await;
                    continue;
                }
            };
            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                if attempt > MAX_RETRIES {
                    return Err(anyhow!(
                        "{} rate limited after {MAX_RETRIES} retries",
                        self.provider.as_str()
                    ));
                }
                let wait = backoff_delay(attempt, response.headers().get("retry-after"));
                warn!(attempt, wait_secs = wait.as_secs(), "provider rate limited");
                sleep(wait).await;
                continue;
            }
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            if !status.is_success() {
                return Err(anyhow!(
                    "{} returned error (status {status}): {body}",
                    self.provider.as_str()
                ));
            }
            let parsed: ChatResponse = serde_json::from_str(&body).with_context(|| {
                format!("failed to decode {} response", self.provider.as_str())
            })?;
            return parsed
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| {
                    anyhow!("missing text in {} response", self.provider.as_str())
                });
        }
    }
}

fn backoff_delay(attempt: usize, retry_after: Option<&HeaderValue>) -> Duration {
    if let Some(value) = retry_after {
        if let Ok(text) = value.to_str() {
            if let Ok(secs) = text.parse::<u64>() {
                return Duration::from_secs(secs.max(1));
            }
        }
    }
    let capped = attempt.min(6) as u32;
    Duration::from_secs(1u64 << capped)
}

/// Deterministic offline answer used by the `local` provider. No network,
/// no key; tests and air-gapped runs rely on it.
fn synthesize_local_answer(req: &LlmRequest) -> String {
    let question = extract_section(&req.user, "Question:")
        .unwrap_or_else(|| req.user.trim().to_string());
    let question = summarize_text(&question, 24);
    match extract_between(&req.user, "Knowledge base excerpt:", "Question:") {
        Some(excerpt) if !excerpt.is_empty() => format!(
            "The closest guidance on record: {}",
            summarize_text(&excerpt, 60)
        ),
        _ => format!("I do not have a curated answer for \"{question}\"."),
    }
}

fn extract_section(text: &str, marker: &str) -> Option<String> {
    text.find(marker)
        .map(|idx| text[idx + marker.len()..].trim().to_string())
}

fn extract_between(text: &str, start_marker: &str, stop_marker: &str) -> Option<String> {
    let start_idx = text.find(start_marker)?;
    let after = &text[start_idx + start_marker.len()..];
    match after.find(stop_marker) {
        Some(end_idx) => Some(after[..end_idx].trim().to_string()),
        None => Some(after.trim().to_string()),
    }
}

fn summarize_text(text: &str, max_words: usize) -> String {
    if max_words == 0 {
        return String::new();
    }
    let cleaned = text
        .lines()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<&str>>()
        .join(" ");
    cleaned
        .split_whitespace()
        .take(max_words)
        .collect::<Vec<&str>>()
        .join(" ")
}

fn read_api_key(var: &str) -> Result<String> {
    let value = env::var(var).map_err(|_| anyhow!("{var} is not set"))?;
    validate_api_key(var, &value)?;
    Ok(value)
}

fn validate_api_key(var: &str, value: &str) -> Result<()> {
    if var.contains("OPENROUTER") && !value.starts_with("sk-or-") {
        return Err(anyhow!("{var} must start with 'sk-or-'"));
    }
    if var.contains("OPENAI") && !value.starts_with("sk-") {
        return Err(anyhow!(
            "{var} must start with 'sk-' (see https://platform.openai.com/)"
        ));
    }
    Ok(())
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

//! Ollama advisory oracle adapter.
//!
//! Talks to a local Ollama server over `/api/generate` with streaming off
//! and a low temperature. The model is asked for a single JSON object; the
//! completion is free text, so the adapter scans for the outermost brace
//! pair and then decodes strictly — anything that does not deserialize into
//! the reply schema is an error, never a guess.

use crate::domain::error::CryptosimError;
use crate::ports::oracle_port::{OraclePort, OracleReply, OracleRequest};
use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f64,
    num_predict: i64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

pub struct OllamaOracle {
    client: Client,
    endpoint: String,
    model: String,
}

impl OllamaOracle {
    pub fn new(endpoint: String, model: String, timeout: Duration) -> Result<Self, CryptosimError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CryptosimError::Oracle {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            endpoint,
            model,
        })
    }

    /// Check the server is up and the configured model is pulled.
    pub fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.endpoint);
        let tags: TagsResponse = match self.client.get(&url).send().and_then(|r| r.json()) {
            Ok(tags) => tags,
            Err(e) => {
                debug!("oracle availability probe failed: {e}");
                return false;
            }
        };
        tags.models.iter().any(|m| m.name == self.model)
    }

    fn build_prompt(request: &OracleRequest) -> String {
        format!(
            "You are reviewing a proposed crypto trade. Current market: \
             price={:.2}, RSI={:.1}, SMA50={:.2}, SMA200={:.2}, MACD={:.2}, ATR={:.2}. \
             Portfolio: cash={:.2} USD, holdings={:.6} units. \
             Proposed: {} {:.1}% because {:?}. \
             Reply with only a JSON object: \
             {{\"action\": \"BUY\"|\"SELL\"|\"HOLD\", \"size_percent\": number, \
             \"reason\": string, \"improvement\": string}}. \
             Only deviate from the proposal if you see a concrete improvement.",
            request.price,
            request.rsi,
            request.sma50,
            request.sma200,
            request.macd,
            request.atr,
            request.cash,
            request.holdings,
            request.rule_action,
            request.rule_size_percent,
            request.rule_reason,
        )
    }
}

/// Extract the first balanced `{...}` block from free text.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

impl OraclePort for OllamaOracle {
    fn consult(&self, request: &OracleRequest) -> Result<OracleReply, CryptosimError> {
        let url = format!("{}/api/generate", self.endpoint);
        let body = GenerateRequest {
            model: &self.model,
            prompt: Self::build_prompt(request),
            stream: false,
            options: GenerateOptions {
                temperature: 0.1,
                num_predict: 256,
            },
        };

        let response: GenerateResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| CryptosimError::Oracle {
                reason: format!("request failed: {e}"),
            })?
            .error_for_status()
            .map_err(|e| CryptosimError::Oracle {
                reason: format!("server error: {e}"),
            })?
            .json()
            .map_err(|e| CryptosimError::Oracle {
                reason: format!("undecodable response envelope: {e}"),
            })?;

        let json = extract_json_object(&response.response).ok_or_else(|| {
            CryptosimError::Oracle {
                reason: format!("no JSON object in completion: {:?}", response.response),
            }
        })?;
        serde_json::from_str(json).map_err(|e| CryptosimError::Oracle {
            reason: format!("reply does not match schema: {e}"),
        })
    }
}

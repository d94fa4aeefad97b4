use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::app_config::LegacyTranslatorConfig;
use crate::errors::ProviderError;
use crate::language_utils::{normalize_language_code, primary_subtag};
use crate::providers::{error_for_status, send_cancellable};

use super::{LanguageSupport, LegacyTranslator};

/// Client for a LibreTranslate server
pub struct LibreTranslate {
    name: String,
    client: Client,
    endpoint: String,
    api_key: String,
    languages: LanguageSupport,
}

impl std::fmt::Debug for LibreTranslate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibreTranslate")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: String,
    target: String,
    format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText", default)]
    translated_text: String,
}

/// LibreTranslate expects two-letter codes where they exist
fn wire_code(code: &str) -> String {
    normalize_language_code(code).unwrap_or_else(|_| primary_subtag(code))
}

impl LibreTranslate {
    pub fn from_config(config: &LegacyTranslatorConfig) -> Self {
        Self {
            name: config.name.clone(),
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()
                .unwrap_or_default(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            languages: LanguageSupport::from_codes(&config.languages),
        }
    }
}

#[async_trait]
impl LegacyTranslator for LibreTranslate {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_languages(&self) -> LanguageSupport {
        self.languages.clone()
    }

    async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        let source = if source_language.trim().is_empty() {
            "auto".to_string()
        } else {
            wire_code(source_language)
        };
        let body = TranslateRequest {
            q: text,
            source,
            target: wire_code(target_language),
            format: "text",
            api_key: Some(self.api_key.as_str()).filter(|k| !k.is_empty()),
        };

        let url = format!("{}/translate", self.endpoint);
        debug!("Sending LibreTranslate request to {} ({} -> {})", url, body.source, body.target);
        let response = send_cancellable(self.client.post(&url).json(&body), cancel).await?;
        let response = error_for_status(response).await?;
        let parsed = response.json::<TranslateResponse>().await?;
        Ok(parsed.translated_text)
    }
}

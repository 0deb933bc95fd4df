//! The three-tier extraction chain.
//!
//! Strategies run in order and the first success wins. A strategy marked
//! [`Trigger::AfterAuthorizationFailure`] only runs when the previous attempt
//! failed with [`ProviderError::Authorization`]; the last strategy is always
//! attempted before the chain gives up.

use std::sync::Arc;

use crate::config::ProviderSettings;
use crate::identifier::VideoId;
use crate::providers::timedtext::TimedTextProvider;
use crate::providers::ytdlp::YtDlpProvider;
use crate::providers::{ProviderError, TranscriptProvider};
use crate::transcript::{LanguagePlan, SourceMethod, TranscriptResult};
use crate::ExtractError;

/// When a strategy is eligible to run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Always,
    AfterAuthorizationFailure,
}

pub struct Strategy {
    pub method: SourceMethod,
    pub provider: Arc<dyn TranscriptProvider>,
    pub trigger: Trigger,
}

impl Strategy {
    pub fn new(method: SourceMethod, provider: Arc<dyn TranscriptProvider>, trigger: Trigger) -> Self {
        Self {
            method,
            provider,
            trigger,
        }
    }

    fn is_eligible(&self, last_error: Option<&ProviderError>) -> bool {
        match self.trigger {
            Trigger::Always => true,
            Trigger::AfterAuthorizationFailure => {
                last_error.map(ProviderError::is_authorization).unwrap_or(false)
            }
        }
    }
}

pub struct TranscriptExtractor {
    strategies: Vec<Strategy>,
}

impl TranscriptExtractor {
    pub fn new(strategies: Vec<Strategy>) -> Self {
        Self { strategies }
    }

    /// yt-dlp, yt-dlp with the alternate clients, then the timedtext fetch
    pub fn from_settings(settings: &ProviderSettings) -> Self {
        Self::new(vec![
            Strategy::new(
                SourceMethod::Primary,
                Arc::new(YtDlpProvider::primary(settings)),
                Trigger::Always,
            ),
            Strategy::new(
                SourceMethod::Alternate,
                Arc::new(YtDlpProvider::alternate(settings)),
                Trigger::AfterAuthorizationFailure,
            ),
            Strategy::new(
                SourceMethod::Fallback,
                Arc::new(TimedTextProvider::new()),
                Trigger::Always,
            ),
        ])
    }

    pub async fn extract(
        &self,
        video_id: &VideoId,
        plan: &LanguagePlan,
    ) -> Result<TranscriptResult, ExtractError> {
        let mut last_error: Option<ProviderError> = None;

        for strategy in &self.strategies {
            if !strategy.is_eligible(last_error.as_ref()) {
                tracing::debug!(
                    "Skipping {} strategy for {}: previous failure was not an authorization failure",
                    strategy.method,
                    video_id
                );
                continue;
            }

            tracing::debug!(
                "Trying {} strategy ({}) for {}",
                strategy.method,
                strategy.provider.name(),
                video_id
            );

            match strategy.provider.fetch(video_id, plan).await {
                Ok(fetched) => {
                    tracing::info!(
                        "Extracted {} transcript for {} via {} ({} segments)",
                        fetched.language_code,
                        video_id,
                        strategy.method,
                        fetched.segments.len()
                    );
                    return Ok(TranscriptResult {
                        video_id: video_id.to_string(),
                        title: fetched.title,
                        language_code: fetched.language_code,
                        is_auto_generated: fetched.is_auto_generated,
                        segments: fetched.segments,
                        source_method: strategy.method,
                        metadata: fetched.metadata,
                        available_tracks: fetched.available_tracks,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "{} strategy ({}) failed for {}: {}",
                        strategy.method,
                        strategy.provider.name(),
                        video_id,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(ExtractError::TranscriptUnavailable {
            video_id: video_id.to_string(),
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no extraction strategy configured".to_string()),
        })
    }
}

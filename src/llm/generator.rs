//! Site generator: the two-stage generation pipeline
//!
//! prompt → requirement document → HTML, with fence stripping and a
//! deterministic fallback page when the provider fails.

use crate::error::{Result, SiteForgeError};
use crate::llm::prompts;
use crate::llm::registry::{ActiveProvider, ProviderRegistry};
use crate::stream::{EventSink, StreamEncoder};
use crate::types::{
    GeneratedSite, GenerationContext, GenerationMetrics, MetricsSnapshot, StreamEvent, StreamStep,
};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

/// Characters of the requirement document shown in the stream preview
pub const REQUIREMENT_PREVIEW_CHARS: usize = 200;

/// Site generator that drives the provider through both stages
#[derive(Clone)]
pub struct SiteGenerator {
    registry: Arc<ProviderRegistry>,
    metrics: Arc<GenerationMetrics>,
}

impl SiteGenerator {
    /// Create a new site generator over a provider registry
    pub fn new(registry: Arc<ProviderRegistry>) -> Self {
        Self {
            registry,
            metrics: Arc::new(GenerationMetrics::new()),
        }
    }

    /// The registry this generator resolves providers from
    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// Buffered generation.
    ///
    /// Upstream failures never surface here: the fallback page is returned
    /// with `degraded: true`. Only an empty prompt is rejected.
    pub async fn generate(&self, ctx: &GenerationContext, prompt: &str) -> Result<GeneratedSite> {
        let prompt = validate_prompt(prompt)?;
        let start_time = Instant::now();
        self.metrics.increment_requests();

        let provider = match self.registry.resolve(ctx) {
            Ok(provider) => provider,
            Err(e) => {
                tracing::warn!(error = %e, "No provider for generation, using fallback page");
                return Ok(self.fallback(prompt, None));
            }
        };

        match run_pipeline(&provider, prompt, |_| {}).await {
            Ok(html) => {
                self.metrics.increment_completed();
                tracing::info!(
                    provider = %provider.id(),
                    html_bytes = %html.len(),
                    duration_ms = %start_time.elapsed().as_millis(),
                    "Site generation completed"
                );
                Ok(GeneratedSite {
                    html,
                    degraded: false,
                    provider_id: Some(provider.id().to_string()),
                })
            }
            Err(e) => {
                self.record_failure(&e);
                tracing::warn!(
                    provider = %provider.id(),
                    error = %e,
                    duration_ms = %start_time.elapsed().as_millis(),
                    "Site generation failed, using fallback page"
                );
                Ok(self.fallback(prompt, Some(provider.id().to_string())))
            }
        }
    }

    /// Streaming generation.
    ///
    /// Emits start, requirement, requirement-complete, html, then either a
    /// success event with the HTML or a single error event, and finally a
    /// finished marker. No fallback page is substituted in this mode.
    /// Returns the generated site on success.
    pub async fn generate_stream<S: EventSink>(
        &self,
        ctx: &GenerationContext,
        prompt: &str,
        sink: S,
    ) -> Result<Option<GeneratedSite>> {
        let prompt = validate_prompt(prompt)?;
        let start_time = Instant::now();
        self.metrics.increment_requests();

        let mut encoder = StreamEncoder::new(sink);

        let result = match self.registry.resolve(ctx) {
            Ok(provider) => {
                encoder.emit(StreamEvent::info(
                    StreamStep::Start,
                    format!("Starting generation with {}", provider.descriptor.display_name),
                ));
                let outcome = run_pipeline(&provider, prompt, |milestone| {
                    encoder.emit(milestone.into_event());
                })
                .await;
                outcome.map(|html| (provider, html))
            }
            Err(e) => {
                encoder.emit(StreamEvent::info(StreamStep::Start, "Starting generation"));
                Err(e)
            }
        };

        let site = match result {
            Ok((provider, html)) => {
                self.metrics.increment_completed();
                tracing::info!(
                    provider = %provider.id(),
                    html_bytes = %html.len(),
                    duration_ms = %start_time.elapsed().as_millis(),
                    client_connected = !encoder.is_closed(),
                    "Streaming generation completed"
                );
                encoder.emit(StreamEvent::success(StreamStep::Complete, html.clone()));
                Some(GeneratedSite {
                    html,
                    degraded: false,
                    provider_id: Some(provider.id().to_string()),
                })
            }
            Err(e) => {
                self.record_failure(&e);
                tracing::warn!(
                    error = %e,
                    upstream = e.is_upstream(),
                    duration_ms = %start_time.elapsed().as_millis(),
                    "Streaming generation failed"
                );
                encoder.emit(StreamEvent::error(e.to_string()));
                None
            }
        };

        encoder.emit(StreamEvent::info(StreamStep::Finished, "Generation finished"));
        Ok(site)
    }

    /// Only adapter failures count against the provider
    fn record_failure(&self, err: &SiteForgeError) {
        if err.is_upstream() {
            self.metrics.increment_upstream_failures();
        }
    }

    fn fallback(&self, prompt: &str, provider_id: Option<String>) -> GeneratedSite {
        self.metrics.increment_degraded();
        GeneratedSite {
            html: prompts::fallback_html(prompt),
            degraded: true,
            provider_id,
        }
    }

    /// Get current metrics snapshot
    pub fn get_metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.get_stats()
    }
}

/// Pipeline progress reported to the streaming encoder
enum Milestone {
    RequirementStage,
    RequirementComplete(String),
    HtmlStage,
}

impl Milestone {
    fn into_event(self) -> StreamEvent {
        match self {
            Milestone::RequirementStage => {
                StreamEvent::info(StreamStep::Requirement, "Generating requirement document...")
            }
            Milestone::RequirementComplete(preview) => {
                StreamEvent::progress(StreamStep::RequirementComplete, preview)
            }
            Milestone::HtmlStage => {
                StreamEvent::info(StreamStep::Html, "Generating HTML from requirement document...")
            }
        }
    }
}

/// Run both stages against one provider; stage 2 starts only after stage 1
async fn run_pipeline<F>(
    provider: &ActiveProvider,
    prompt: &str,
    mut on_milestone: F,
) -> Result<String>
where
    F: FnMut(Milestone),
{
    on_milestone(Milestone::RequirementStage);
    let requirement_doc = provider.generate_requirement_doc(prompt).await?;
    tracing::debug!(
        provider = %provider.id(),
        doc_chars = %requirement_doc.chars().count(),
        "Requirement document ready"
    );
    on_milestone(Milestone::RequirementComplete(preview(
        &requirement_doc,
        REQUIREMENT_PREVIEW_CHARS,
    )));

    on_milestone(Milestone::HtmlStage);
    let raw = provider.generate_html_from_requirement(&requirement_doc).await?;
    let html = strip_code_fence(&raw);

    if html.trim().is_empty() {
        return Err(SiteForgeError::malformed_response(
            provider.id(),
            "HTML stage returned no content",
            Some(raw),
        ));
    }
    Ok(html)
}

fn validate_prompt(prompt: &str) -> Result<&str> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(SiteForgeError::validation("Prompt is required"));
    }
    Ok(trimmed)
}

fn fence_regex() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"```(?i:html)?([\s\S]*?)```").ok())
        .as_ref()
}

/// Extract the first fenced code block, discarding surrounding prose.
///
/// Text without a complete fence is returned unchanged.
pub fn strip_code_fence(text: &str) -> String {
    if !text.contains("```") {
        return text.to_string();
    }
    match fence_regex()
        .and_then(|re| re.captures(text))
        .and_then(|c| c.get(1))
    {
        Some(inner) if !inner.as_str().trim().is_empty() => inner.as_str().trim().to_string(),
        _ => text.to_string(),
    }
}

/// First `max_chars` characters, with an ellipsis when truncated
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fence_with_language_tag() {
        let raw = "Here you go:\n```html\n<!DOCTYPE html>\n<html></html>\n```\nEnjoy!";
        assert_eq!(strip_code_fence(raw), "<!DOCTYPE html>\n<html></html>");
    }

    #[test]
    fn test_strip_fence_without_language_tag() {
        let raw = "```\n<html><body>hi</body></html>\n```";
        assert_eq!(strip_code_fence(raw), "<html><body>hi</body></html>");
    }

    #[test]
    fn test_strip_fence_takes_first_block_only() {
        let raw = "```html\n<html>one</html>\n```\ntext\n```css\nbody{}\n```";
        assert_eq!(strip_code_fence(raw), "<html>one</html>");
    }

    #[test]
    fn test_unfenced_and_unclosed_pass_through() {
        assert_eq!(strip_code_fence("<html></html>"), "<html></html>");
        assert_eq!(strip_code_fence("```html\n<html>"), "```html\n<html>");
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("个人博客网站", 2), "个人...");
        assert_eq!(preview("abcdef", 6), "abcdef");
    }

    #[test]
    fn test_validate_prompt() {
        assert!(validate_prompt("   ").is_err());
        assert_eq!(validate_prompt("  blog ").unwrap(), "blog");
    }
}

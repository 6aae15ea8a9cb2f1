//! Research retrieval and the research stage
//!
//! Market research and competitor analysis run concurrently, each through
//! its own agent. Reference material is fetched from configured source URLs
//! (HTML converted to markdown) and handed to both agents. Every failure
//! path degrades - a research problem never aborts discovery.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::agents::Agent;
use crate::config::ResearchConfig;
use crate::domain::PipelineInput;
use crate::llm::LlmClient;
use crate::prompts::PromptLoader;

/// Per-source size cap for fetched reference material
const MAX_REFERENCE_CHARS: usize = 20_000;

#[derive(Serialize)]
struct ResearchContext<'a> {
    product_name: &'a str,
    product_context: &'a str,
    target_audience: &'a str,
    references: Option<&'a str>,
}

/// The conditional research stage
pub struct ResearchStage {
    market: Agent,
    competitor: Agent,
    prompts: Arc<PromptLoader>,
    config: ResearchConfig,
}

impl ResearchStage {
    /// Create the research stage
    pub fn new(
        llm: Arc<dyn LlmClient>,
        prompts: Arc<PromptLoader>,
        config: ResearchConfig,
        model: &str,
        max_tokens: u32,
    ) -> eyre::Result<Self> {
        debug!(source_count = config.sources.len(), "ResearchStage::new: called");
        let market = Agent::new(
            "Market Researcher",
            prompts.instructions("research")?,
            llm.clone(),
            model,
            max_tokens,
        );
        let competitor = Agent::new(
            "Competitor Researcher",
            prompts.instructions("research")?,
            llm,
            model,
            max_tokens,
        );

        Ok(Self {
            market,
            competitor,
            prompts,
            config,
        })
    }

    /// Run research for the given input, if the input calls for it
    ///
    /// Returns None when research is disabled for this input or every
    /// enabled research path failed.
    pub async fn run(&self, input: &PipelineInput) -> eyre::Result<Option<String>> {
        debug!(product = %input.product_name, "ResearchStage::run: called");
        if !input.research_enabled() {
            debug!("ResearchStage::run: research disabled for this input");
            return Ok(None);
        }

        let references = fetch_references(&self.config.sources, self.config.fetch_timeout_ms).await;
        if references.is_some() {
            debug!("ResearchStage::run: reference material fetched");
        }

        let ctx = ResearchContext {
            product_name: &input.product_name,
            product_context: &input.product_context,
            target_audience: input.target_audience.as_deref().unwrap_or("Not specified"),
            references: references.as_deref(),
        };

        let market_fut = async {
            if !input.enable_research {
                return None;
            }
            info!("Conducting market research");
            let prompt = match self.prompts.render("market-research", &ctx) {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "Market research prompt failed to render");
                    return None;
                }
            };
            match self.market.run(prompt).await {
                Ok(text) => Some(format!("## Market Research\n\n{}", text)),
                Err(e) => {
                    warn!(error = %e, "Market research failed");
                    None
                }
            }
        };

        let competitor_fut = async {
            if !input.enable_competitor_analysis {
                return None;
            }
            info!("Conducting competitor analysis");
            let prompt = match self.prompts.render("competitor-research", &ctx) {
                Ok(p) => p,
                Err(e) => {
                    warn!(error = %e, "Competitor research prompt failed to render");
                    return None;
                }
            };
            match self.competitor.run(prompt).await {
                Ok(text) => Some(format!("## Competitor Analysis\n\n{}", text)),
                Err(e) => {
                    warn!(error = %e, "Competitor analysis failed");
                    None
                }
            }
        };

        // Market and competitor research run concurrently
        let (market, competitor) = tokio::join!(market_fut, competitor_fut);

        let sections: Vec<String> = [market, competitor].into_iter().flatten().collect();
        if sections.is_empty() {
            warn!("Research was enabled but produced no findings");
            return Ok(None);
        }

        debug!(section_count = sections.len(), "ResearchStage::run: research complete");
        Ok(Some(sections.join("\n\n---\n\n")))
    }
}

/// Fetch reference URLs and convert them to markdown
///
/// Returns None when no source yields content. HTML is converted to
/// markdown; everything else passes through as text. Oversized documents are
/// truncated per source.
pub async fn fetch_references(sources: &[String], timeout_ms: u64) -> Option<String> {
    debug!(source_count = sources.len(), "fetch_references: called");
    if sources.is_empty() {
        return None;
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .user_agent("crew/0.1 (research)")
        .build()
        .ok()?;

    let mut sections = Vec::new();
    for url in sources {
        match fetch_one(&client, url).await {
            Some(content) => {
                debug!(%url, content_len = content.len(), "fetch_references: fetched");
                sections.push(format!("### {}\n\n{}", url, content));
            }
            None => {
                warn!(%url, "Failed to fetch reference source");
            }
        }
    }

    if sections.is_empty() {
        debug!("fetch_references: no source yielded content");
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

async fn fetch_one(client: &reqwest::Client, url: &str) -> Option<String> {
    debug!(%url, "fetch_one: called");
    if !url.starts_with("http://") && !url.starts_with("https://") {
        debug!(%url, "fetch_one: invalid URL protocol");
        return None;
    }

    let response = client.get(url).send().await.ok()?;
    if !response.status().is_success() {
        debug!(status = %response.status(), "fetch_one: HTTP error status");
        return None;
    }

    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    let body = response.text().await.ok()?;

    let content = if content_type.contains("text/html") || content_type.contains("application/xhtml") {
        debug!("fetch_one: converting HTML to markdown");
        html2md::rewrite_html(&body, false)
    } else {
        body
    };

    if content.len() > MAX_REFERENCE_CHARS {
        debug!(original_len = content.len(), "fetch_one: truncating long content");
        Some(format!(
            "{}...\n\n[truncated, {} chars total]",
            &content[..MAX_REFERENCE_CHARS],
            content.len()
        ))
    } else {
        Some(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Scope;
    use crate::llm::client::mock::MockLlmClient;

    fn stage(llm: MockLlmClient, sources: Vec<String>) -> ResearchStage {
        ResearchStage::new(
            Arc::new(llm),
            Arc::new(PromptLoader::embedded_only()),
            ResearchConfig {
                sources,
                fetch_timeout_ms: 1000,
            },
            "claude-sonnet-4",
            1024,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_research_skipped_for_features() {
        let stage = stage(MockLlmClient::replies(Vec::<String>::new()), vec![]);
        let input = PipelineInput::new("Dark Mode", "toggle").with_research(true, true);

        // Feature scope: no research, no LLM calls
        let result = stage.run(&input).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_research_skipped_when_flags_off() {
        let stage = stage(MockLlmClient::replies(Vec::<String>::new()), vec![]);
        let input = PipelineInput::new("Assistant", "email helper").with_scope(Scope::Product);

        let result = stage.run(&input).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_market_research_only() {
        let stage = stage(MockLlmClient::repeating("market findings"), vec![]);
        let input = PipelineInput::new("Assistant", "email helper")
            .with_scope(Scope::Product)
            .with_research(true, false);

        let result = stage.run(&input).await.unwrap().unwrap();
        assert!(result.contains("## Market Research"));
        assert!(result.contains("market findings"));
        assert!(!result.contains("## Competitor Analysis"));
    }

    #[tokio::test]
    async fn test_both_research_sections() {
        let stage = stage(MockLlmClient::repeating("findings"), vec![]);
        let input = PipelineInput::new("Assistant", "email helper")
            .with_scope(Scope::Product)
            .with_research(true, true);

        let result = stage.run(&input).await.unwrap().unwrap();
        assert!(result.contains("## Market Research"));
        assert!(result.contains("## Competitor Analysis"));
    }

    #[tokio::test]
    async fn test_llm_failure_degrades_to_none() {
        // Mock with zero responses: every agent call errors
        let stage = stage(MockLlmClient::new(vec![]), vec![]);
        let input = PipelineInput::new("Assistant", "email helper")
            .with_scope(Scope::Product)
            .with_research(true, true);

        let result = stage.run(&input).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_fetch_references_empty_sources() {
        assert!(fetch_references(&[], 1000).await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_references_bad_urls() {
        let sources = vec!["not-a-url".to_string()];
        assert!(fetch_references(&sources, 1000).await.is_none());
    }

    #[test]
    fn test_html_to_markdown() {
        let html = "<html><body><h1>Title</h1><p>A paragraph.</p></body></html>";
        let md = html2md::rewrite_html(html, false);
        assert!(md.contains("Title"));
        assert!(md.contains("A paragraph"));
    }
}

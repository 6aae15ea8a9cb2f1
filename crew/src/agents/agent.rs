//! Agent runner
//!
//! An agent is an instruction document bound to the LLM client. Each call is
//! a fresh conversation: the step builds the full context into one prompt,
//! so steps stay independent and re-runnable.

use std::sync::Arc;

use eyre::{Result, eyre};
use tracing::{debug, info};

use crate::agents::AgentRole;
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::prompts::PromptLoader;

/// A role-bound LLM agent
pub struct Agent {
    /// Agent name for logging
    name: String,

    /// Instruction document used as the system prompt
    instructions: String,

    /// Model identifier (for cost accounting)
    model: String,

    /// LLM client
    llm: Arc<dyn LlmClient>,

    /// Max tokens per response
    max_tokens: u32,
}

impl Agent {
    /// Create an agent with explicit instructions
    pub fn new(
        name: impl Into<String>,
        instructions: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        let name = name.into();
        debug!(%name, max_tokens, "Agent::new: called");
        Self {
            name,
            instructions: instructions.into(),
            model: model.into(),
            llm,
            max_tokens,
        }
    }

    /// Create an agent for one of the delivery-team roles
    ///
    /// Loads the role's instruction template through the prompt loader.
    pub fn for_role(
        role: AgentRole,
        prompts: &PromptLoader,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
        max_tokens: u32,
    ) -> Result<Self> {
        debug!(%role, "Agent::for_role: called");
        let instructions = prompts.instructions(role.instructions_template())?;
        Ok(Self::new(role.name(), instructions, llm, model, max_tokens))
    }

    /// Agent name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run one prompt through the agent, returning the text reply
    ///
    /// Errors on transport failure and on an empty model reply - a step must
    /// never mistake silence for content.
    pub async fn run(&self, prompt: impl Into<String>) -> Result<String> {
        let prompt = prompt.into();
        debug!(agent = %self.name, prompt_len = prompt.len(), "Agent::run: called");

        let request = CompletionRequest {
            system_prompt: self.instructions.clone(),
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
        };

        let response = self
            .llm
            .complete(request)
            .await
            .map_err(|e| eyre!("{} agent call failed: {}", self.name, e))?;

        info!(
            agent = %self.name,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            cost_usd = format!("{:.4}", response.usage.cost_usd(&self.model)),
            "Agent call complete"
        );

        match response.content {
            Some(text) if !text.trim().is_empty() => {
                debug!(agent = %self.name, reply_len = text.len(), "Agent::run: got reply");
                Ok(text)
            }
            _ => {
                debug!(agent = %self.name, "Agent::run: empty reply");
                Err(eyre!("{} agent returned an empty reply", self.name))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::mock::MockLlmClient;

    fn mock_agent(replies: Vec<&str>) -> Agent {
        let llm = Arc::new(MockLlmClient::replies(replies));
        Agent::new("Test", "You are a test agent", llm, "claude-sonnet-4", 1024)
    }

    #[tokio::test]
    async fn test_run_returns_reply() {
        let agent = mock_agent(vec!["the reply"]);
        let reply = agent.run("hello").await.unwrap();
        assert_eq!(reply, "the reply");
    }

    #[tokio::test]
    async fn test_run_rejects_empty_reply() {
        let agent = mock_agent(vec!["   "]);
        assert!(agent.run("hello").await.is_err());
    }

    #[tokio::test]
    async fn test_for_role_loads_instructions() {
        let prompts = PromptLoader::embedded_only();
        let llm = Arc::new(MockLlmClient::replies(vec!["ok"]));
        let agent = Agent::for_role(AgentRole::SecurityEngineer, &prompts, llm, "claude-sonnet-4", 1024).unwrap();

        assert_eq!(agent.name(), "Security Engineer");
        assert!(agent.instructions.contains("Security Engineer"));
    }
}

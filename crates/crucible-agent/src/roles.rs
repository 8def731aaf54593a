//! The six role agents and the roster that holds one of each

use crate::agent::{Agent, AgentContext, AgentCore, PhaseInput};
use crate::prompt;
use async_trait::async_trait;
use crucible_core::{AgentOutput, AgentUsage, CrucibleConfig, Result, Role, SamplingParameters};
use std::sync::Arc;
use tracing::debug;

/// Section headers the reviewer is asked to produce
const REVIEW_ISSUES_HEADER: &str = "ISSUES";
const REVIEW_RECOMMENDATIONS_HEADER: &str = "RECOMMENDATIONS";

/// Section headers the security auditor is asked to produce
const SECURITY_ISSUES_HEADER: &str = "VULNERABILITIES";
const SECURITY_FIXES_HEADER: &str = "FIXES";

/// Designs the architecture from the requirements
#[derive(Debug)]
pub struct ArchitectAgent {
    core: AgentCore,
}

impl ArchitectAgent {
    pub fn new(context: AgentContext, params: SamplingParameters) -> Self {
        Self {
            core: AgentCore::new(Role::Architect, params, context),
        }
    }
}

#[async_trait]
impl Agent for ArchitectAgent {
    fn role(&self) -> Role {
        self.core.role()
    }

    async fn execute(&self, input: &PhaseInput<'_>) -> Result<AgentOutput> {
        let prompt = prompt::architect_prompt(input.requirements, input.iteration, self.core.limits());
        let (content, tokens) = self.core.call(&prompt, input.iteration).await;
        Ok(AgentOutput::from_content(Role::Architect, content, tokens))
    }

    fn usage(&self) -> AgentUsage {
        self.core.usage()
    }
}

/// Implements the architecture in the target language
#[derive(Debug)]
pub struct DeveloperAgent {
    core: AgentCore,
}

impl DeveloperAgent {
    pub fn new(context: AgentContext, params: SamplingParameters) -> Self {
        Self {
            core: AgentCore::new(Role::Developer, params, context),
        }
    }
}

#[async_trait]
impl Agent for DeveloperAgent {
    fn role(&self) -> Role {
        self.core.role()
    }

    async fn execute(&self, input: &PhaseInput<'_>) -> Result<AgentOutput> {
        let prompt = prompt::developer_prompt(
            input.architecture,
            input.requirements,
            input.language,
            input.iteration,
            self.core.limits(),
        );
        let (content, tokens) = self.core.call(&prompt, input.iteration).await;
        Ok(AgentOutput::from_content(Role::Developer, content, tokens))
    }

    fn usage(&self) -> AgentUsage {
        self.core.usage()
    }
}

/// Scores code quality and lists issues and recommendations
#[derive(Debug)]
pub struct ReviewerAgent {
    core: AgentCore,
}

impl ReviewerAgent {
    pub fn new(context: AgentContext, params: SamplingParameters) -> Self {
        Self {
            core: AgentCore::new(Role::Reviewer, params, context),
        }
    }
}

#[async_trait]
impl Agent for ReviewerAgent {
    fn role(&self) -> Role {
        self.core.role()
    }

    async fn execute(&self, input: &PhaseInput<'_>) -> Result<AgentOutput> {
        let prompt = prompt::reviewer_prompt(
            input.code,
            input.architecture,
            input.iteration,
            self.core.limits(),
        );
        let (content, tokens) = self.core.call(&prompt, input.iteration).await;

        let extraction = self.core.extraction();
        let score = extraction.score(&content);
        let issues = extraction.section(&content, REVIEW_ISSUES_HEADER);
        let recommendations = extraction.section(&content, REVIEW_RECOMMENDATIONS_HEADER);
        debug!(
            "Review scored {:.0} with {} issue(s), {} recommendation(s)",
            score,
            issues.len(),
            recommendations.len()
        );

        Ok(AgentOutput::from_content(Role::Reviewer, content, tokens)
            .with_score(score)
            .with_issues(issues)
            .with_recommendations(recommendations))
    }

    fn usage(&self) -> AgentUsage {
        self.core.usage()
    }
}

/// Audits security; reports a safety score of 100 minus the extracted risk
#[derive(Debug)]
pub struct SecurityAgent {
    core: AgentCore,
}

impl SecurityAgent {
    pub fn new(context: AgentContext, params: SamplingParameters) -> Self {
        Self {
            core: AgentCore::new(Role::Security, params, context),
        }
    }
}

#[async_trait]
impl Agent for SecurityAgent {
    fn role(&self) -> Role {
        self.core.role()
    }

    async fn execute(&self, input: &PhaseInput<'_>) -> Result<AgentOutput> {
        let prompt = prompt::security_prompt(
            input.code,
            input.requirements,
            input.iteration,
            self.core.limits(),
        );
        let (content, tokens) = self.core.call(&prompt, input.iteration).await;
        let output = AgentOutput::from_content(Role::Security, content, tokens);

        // No audit text means no audit, not a clean bill of health
        if !output.success {
            return Ok(output.with_score(0.0));
        }

        let extraction = self.core.extraction();
        let risk = extraction.score(&output.content);
        let issues = extraction.section(&output.content, SECURITY_ISSUES_HEADER);
        let fixes = extraction.section(&output.content, SECURITY_FIXES_HEADER);
        debug!("Security risk {:.0}, {} vulnerability(ies)", risk, issues.len());

        Ok(output
            .with_score(100.0 - risk)
            .with_issues(issues)
            .with_recommendations(fixes))
    }

    fn usage(&self) -> AgentUsage {
        self.core.usage()
    }
}

/// Writes the test suite for the code
#[derive(Debug)]
pub struct TesterAgent {
    core: AgentCore,
}

impl TesterAgent {
    pub fn new(context: AgentContext, params: SamplingParameters) -> Self {
        Self {
            core: AgentCore::new(Role::Tester, params, context),
        }
    }
}

#[async_trait]
impl Agent for TesterAgent {
    fn role(&self) -> Role {
        self.core.role()
    }

    async fn execute(&self, input: &PhaseInput<'_>) -> Result<AgentOutput> {
        let prompt = prompt::tester_prompt(
            input.code,
            input.requirements,
            input.iteration,
            self.core.limits(),
        );
        let (content, tokens) = self.core.call(&prompt, input.iteration).await;
        Ok(AgentOutput::from_content(Role::Tester, content, tokens))
    }

    fn usage(&self) -> AgentUsage {
        self.core.usage()
    }
}

/// Writes project documentation
#[derive(Debug)]
pub struct DocumentationAgent {
    core: AgentCore,
}

impl DocumentationAgent {
    pub fn new(context: AgentContext, params: SamplingParameters) -> Self {
        Self {
            core: AgentCore::new(Role::Documentation, params, context),
        }
    }
}

#[async_trait]
impl Agent for DocumentationAgent {
    fn role(&self) -> Role {
        self.core.role()
    }

    async fn execute(&self, input: &PhaseInput<'_>) -> Result<AgentOutput> {
        let prompt = prompt::documentation_prompt(
            input.architecture,
            input.code,
            input.requirements,
            input.iteration,
            self.core.limits(),
        );
        let (content, tokens) = self.core.call(&prompt, input.iteration).await;
        Ok(AgentOutput::from_content(Role::Documentation, content, tokens))
    }

    fn usage(&self) -> AgentUsage {
        self.core.usage()
    }
}

/// One agent per role
#[derive(Clone)]
pub struct AgentRoster {
    architect: Arc<dyn Agent>,
    developer: Arc<dyn Agent>,
    reviewer: Arc<dyn Agent>,
    security: Arc<dyn Agent>,
    tester: Arc<dyn Agent>,
    documentation: Arc<dyn Agent>,
}

impl AgentRoster {
    /// The six standard agents, configured from `config`
    pub fn standard(context: AgentContext, config: &CrucibleConfig) -> Self {
        Self {
            architect: Arc::new(ArchitectAgent::new(
                context.clone(),
                config.sampling_for(Role::Architect),
            )),
            developer: Arc::new(DeveloperAgent::new(
                context.clone(),
                config.sampling_for(Role::Developer),
            )),
            reviewer: Arc::new(ReviewerAgent::new(
                context.clone(),
                config.sampling_for(Role::Reviewer),
            )),
            security: Arc::new(SecurityAgent::new(
                context.clone(),
                config.sampling_for(Role::Security),
            )),
            tester: Arc::new(TesterAgent::new(
                context.clone(),
                config.sampling_for(Role::Tester),
            )),
            documentation: Arc::new(DocumentationAgent::new(
                context,
                config.sampling_for(Role::Documentation),
            )),
        }
    }

    /// Replace the agent serving `agent.role()`
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        let role = agent.role();
        *self.slot_mut(role) = agent;
        self
    }

    pub fn get(&self, role: Role) -> &Arc<dyn Agent> {
        match role {
            Role::Architect => &self.architect,
            Role::Developer => &self.developer,
            Role::Reviewer => &self.reviewer,
            Role::Security => &self.security,
            Role::Tester => &self.tester,
            Role::Documentation => &self.documentation,
        }
    }

    fn slot_mut(&mut self, role: Role) -> &mut Arc<dyn Agent> {
        match role {
            Role::Architect => &mut self.architect,
            Role::Developer => &mut self.developer,
            Role::Reviewer => &mut self.reviewer,
            Role::Security => &mut self.security,
            Role::Tester => &mut self.tester,
            Role::Documentation => &mut self.documentation,
        }
    }

    /// Usage of every agent, in phase order
    pub fn usage(&self) -> Vec<AgentUsage> {
        Role::ALL.iter().map(|role| self.get(*role).usage()).collect()
    }
}

impl std::fmt::Debug for AgentRoster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.usage()).finish()
    }
}

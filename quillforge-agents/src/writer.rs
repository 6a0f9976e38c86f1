//! ABOUTME: Writer Agent (§4.3) — drafts the article via `generateJSON`, revising against QA feedback

use async_trait::async_trait;
use quillforge_core::agent_io::{AgentOutcome, AgentRequest, AgentResponse, WriterInput, WriterOutput};
use quillforge_core::agent_type::AgentType;
use quillforge_core::error::{PipelineError, Result};
use quillforge_core::eval::IssueSeverity;
use quillforge_core::traits::agent::{Agent, AgentContext};
use quillforge_providers::json_completion::generate_json;
use serde_json::json;
use std::fmt::Write as _;

const MAX_RETRIES: u32 = 2;

pub struct WriterAgent;

impl WriterAgent {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn build_prompt(input: &WriterInput) -> String {
        let mut prompt = format!(
            "Write an SEO-optimized article for the keyword \"{}\".\nTarget word count: {}.\n",
            input.keyword, input.target_word_count
        );

        if !input.research_data.paa_questions.is_empty() {
            let _ = write!(
                prompt,
                "\nAddress these \"people also ask\" questions where relevant:\n{}\n",
                bulleted(&input.research_data.paa_questions)
            );
        }
        if !input.research_data.related_keywords.is_empty() {
            let _ = write!(
                prompt,
                "\nWork in these related keywords naturally:\n{}\n",
                bulleted(&input.research_data.related_keywords)
            );
        }
        if let Some(gaps) = &input.research_data.content_gaps {
            if !gaps.is_empty() {
                let _ = write!(prompt, "\nCover these content gaps competitors miss:\n{}\n", bulleted(gaps));
            }
        }

        if let Some(previous) = &input.previous_article {
            let iteration = input.iteration.unwrap_or(1);
            let _ = write!(
                prompt,
                "\nThis is revision iteration {iteration}. Revise the previous article below rather than starting over.\n\nPrevious article:\n{previous}\n"
            );
            if let Some(issues) = &input.issues_to_fix {
                let _ = write!(prompt, "\nIssues to fix, grouped by severity:\n{}\n", issues_by_severity(issues));
            }
            if let Some(feedback) = &input.qa_feedback {
                let _ = write!(prompt, "\nQA feedback:\n{feedback}\n");
            }
        }

        prompt
    }

    fn output_schema() -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["title", "slug", "content", "excerpt", "wordCount", "headings"],
            "properties": {
                "title": {"type": "string", "maxLength": 60},
                "excerpt": {"type": "string", "maxLength": 160},
                "wordCount": {"type": "integer", "minimum": 1}
            }
        })
    }
}

fn bulleted(items: &[String]) -> String {
    items.iter().map(|item| format!("- {item}")).collect::<Vec<_>>().join("\n")
}

/// Issues that have survived 2+ QA passes are flagged "must fix" so the
/// revision prompt escalates language for findings the model already failed
/// to address once (§4.6 feedback-loop correctness).
const MUST_FIX_PERSIST_COUNT: u32 = 2;

fn issues_by_severity(issues: &[quillforge_core::eval::Issue]) -> String {
    let mut out = String::new();
    for severity in [IssueSeverity::Critical, IssueSeverity::High, IssueSeverity::Medium, IssueSeverity::Low] {
        let matching: Vec<_> = issues.iter().filter(|i| i.severity == severity).collect();
        if matching.is_empty() {
            continue;
        }
        let _ = writeln!(out, "{severity:?}:");
        for issue in matching {
            let must_fix = if issue.persist_count >= MUST_FIX_PERSIST_COUNT {
                " [must fix: unresolved across multiple revisions]"
            } else {
                ""
            };
            let _ = writeln!(out, "- {}: {} ({}){must_fix}", issue.category, issue.description, issue.suggestion);
        }
    }
    out
}

impl Default for WriterAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for WriterAgent {
    fn agent_type(&self) -> AgentType {
        AgentType::Writer
    }

    fn name(&self) -> &str {
        "writer"
    }

    fn description(&self) -> &str {
        "Drafts and revises the article body via an LLM completion"
    }

    async fn validate_input(&self, input: &AgentRequest) -> Result<()> {
        match input {
            AgentRequest::Writer(writer) if writer.target_word_count == 0 => {
                Err(PipelineError::validation_field("targetWordCount must be positive", "targetWordCount"))
            }
            AgentRequest::Writer(_) => Ok(()),
            _ => Err(PipelineError::validation("writer agent received a non-writer input")),
        }
    }

    fn output_schema(&self) -> serde_json::Value {
        Self::output_schema()
    }

    async fn execute(&self, input: AgentRequest, ctx: AgentContext) -> Result<AgentOutcome> {
        let AgentRequest::Writer(writer_input) = input else {
            return Err(PipelineError::validation("writer agent received a non-writer input"));
        };

        let prompt = Self::build_prompt(&writer_input);
        let schema = Self::output_schema();

        let completion = generate_json(
            ctx.provider.as_ref(),
            &prompt,
            Some(&ctx.persona.system_prompt),
            &ctx.persona.model,
            &schema,
            MAX_RETRIES,
        )
        .await?;

        let mut output: WriterOutput = serde_json::from_value(completion.value)
            .map_err(|e| PipelineError::internal(format!("writer output did not match WriterOutput: {e}")))?;
        output.slug = quillforge_utils::slugify(&output.title);

        Ok(AgentOutcome::success(
            AgentResponse::Writer(output),
            completion.usage,
            completion.cost_usd,
        ))
    }
}

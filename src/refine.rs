//! Bounded draft/review loop for a slide outline.
//!
//! A drafter writes a Markdown slide outline from the content; a reviewer
//! compares it with the content and either approves it or returns feedback
//! for the next draft. The loop ends on approval or after a fixed number of
//! iterations, keeping the latest draft either way.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RefineConfig;
use crate::summarizer::{ChatModel, SummarizerError};

/// Stand-in feedback when the reviewer produced nothing usable
pub const INCOMPLETE_FEEDBACK: &str = "Incomplete feedback";

const DRAFTER_SYSTEM_PROMPT: &str = "\
You are a presentation designer. Turn the provided document content into a clear, \
engaging slide outline in Markdown. Use one `## ` heading per slide followed by \
concise bullet points. Structure the deck as: a title slide with the document's \
title and purpose, a table of contents, one slide per major section or key insight \
(split content over several slides when it is too long for one), and a conclusion \
slide with the key takeaways.";

#[derive(Debug, Error)]
pub enum RefineError {
    #[error("Draft {iteration} failed: {source}")]
    Draft {
        iteration: u32,
        #[source]
        source: SummarizerError,
    },
}

/// Final outline and how it was reached
#[derive(Debug, Clone)]
pub struct RefineResult {
    pub outline: String,
    pub iterations: u32,
    pub approved: bool,
    pub feedback_history: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RefineLoop {
    max_iterations: u32,
    approval_phrase: String,
}

impl RefineLoop {
    pub fn new(max_iterations: u32, approval_phrase: impl Into<String>) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            approval_phrase: approval_phrase.into().to_lowercase(),
        }
    }

    pub fn from_config(config: &RefineConfig) -> Self {
        Self::new(config.max_iterations, config.approval_phrase.clone())
    }

    pub fn is_approval(&self, review: &str) -> bool {
        review.to_lowercase().contains(&self.approval_phrase)
    }

    pub async fn run(
        &self,
        drafter: &dyn ChatModel,
        reviewer: &dyn ChatModel,
        content: &str,
    ) -> Result<RefineResult, RefineError> {
        let mut feedback_history: Vec<String> = Vec::new();
        let mut latest_feedback: Option<String> = None;
        let mut outline = String::new();

        for iteration in 1..=self.max_iterations {
            info!(iteration, max = self.max_iterations, "Refine iteration");

            let system = self.drafter_system_prompt(&feedback_history);
            let user = draft_prompt(content, latest_feedback.as_deref());
            outline = drafter
                .complete(&system, &user)
                .await
                .map_err(|source| RefineError::Draft { iteration, source })?;
            debug!(iteration, outline_len = outline.len(), "draft received");

            let review = match reviewer
                .complete(&self.reviewer_system_prompt(), &review_prompt(content, &outline))
                .await
            {
                Ok(review) => review,
                Err(e) => {
                    warn!(iteration, error = %e, "review failed");
                    INCOMPLETE_FEEDBACK.to_string()
                }
            };

            if self.is_approval(&review) {
                info!(iteration, "Outline approved");
                return Ok(RefineResult {
                    outline,
                    iterations: iteration,
                    approved: true,
                    feedback_history,
                });
            }

            if review != INCOMPLETE_FEEDBACK {
                feedback_history.push(review.clone());
            }
            latest_feedback = Some(review);
        }

        warn!(max = self.max_iterations, "Max iterations reached, keeping the latest draft");
        Ok(RefineResult {
            outline,
            iterations: self.max_iterations,
            approved: false,
            feedback_history,
        })
    }

    fn drafter_system_prompt(&self, feedback_history: &[String]) -> String {
        let mut prompt = DRAFTER_SYSTEM_PROMPT.to_string();
        for feedback in feedback_history {
            prompt.push_str("\nEvaluator Feedback: ");
            prompt.push_str(feedback);
            prompt.push('\n');
        }
        prompt
    }

    fn reviewer_system_prompt(&self) -> String {
        format!(
            "You evaluate slide outlines created from a document. Check that every relevant \
             piece of information is included, nothing irrelevant was added, and no slide is \
             overloaded with text. If the outline is complete, reply with the phrase \
             \"{}\". Otherwise give specific feedback for improvement.",
            self.approval_phrase
        )
    }
}

fn draft_prompt(content: &str, feedback: Option<&str>) -> String {
    let mut prompt = format!("Create a slide outline for this document content:\n{content}\n");
    if let Some(feedback) = feedback.filter(|f| *f != INCOMPLETE_FEEDBACK) {
        prompt.push_str(&format!(
            "\nRevise the previous outline using the evaluator's feedback:\n{feedback}\n"
        ));
    }
    prompt
}

fn review_prompt(content: &str, outline: &str) -> String {
    format!(
        "Original document content:\n{content}\n\nSlide outline to evaluate:\n{outline}\n\n\
         Identify missing or irrelevant information and presentation problems."
    )
}

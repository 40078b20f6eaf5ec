//! Structured answer generation with citation checks.

use crate::config::Prompts;
use crate::error::{DocentError, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Answer the model is told to give when the context does not cover the question.
pub const FALLBACK_ANSWER: &str =
    "I don't have sufficient context in the provided documents to answer this question comprehensively.";

/// Phrases that switch the answer to the elaborate directive.
pub const ELABORATION_CUES: &[&str] = &[
    "explain in detail",
    "elaborate",
    "thoroughly",
    "in depth",
    "in-depth",
];

/// The answer contract returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuredAnswer {
    pub question: String,
    pub answer: String,
    /// Sources, each `(Page N)` or `(Timestamp: mm:ss - mm:ss)`.
    pub citations: Vec<String>,
}

/// One completion request sent to an [`AnswerModel`].
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub system: String,
    pub user: String,
    /// JSON schema the reply must satisfy.
    pub schema: serde_json::Value,
}

/// Language model that produces a raw JSON answer.
#[async_trait]
pub trait AnswerModel: Send + Sync {
    async fn complete(&self, request: AnswerRequest) -> Result<String>;
}

/// JSON schema of [`StructuredAnswer`].
pub fn answer_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "question": { "type": "string" },
            "answer": { "type": "string" },
            "citations": {
                "type": "array",
                "items": { "type": "string" }
            }
        },
        "required": ["question", "answer", "citations"],
        "additionalProperties": false
    })
}

/// Whether the question asks for a detailed explanation.
pub fn wants_elaboration(question: &str) -> bool {
    let question = question.to_lowercase();
    ELABORATION_CUES.iter().any(|cue| question.contains(cue))
}

/// Generates answers from retrieved context.
pub struct AnswerSynthesizer {
    model: Arc<dyn AnswerModel>,
    prompts: Prompts,
    page_citation: Regex,
    timestamp_citation: Regex,
    inline_marker: Regex,
}

impl AnswerSynthesizer {
    pub fn new(model: Arc<dyn AnswerModel>, prompts: Prompts) -> Self {
        let page_citation = Regex::new(r"^\(Page (\d+)\)$").expect("Invalid regex");
        let timestamp_citation =
            Regex::new(r"^\(Timestamp: (\d+:\d{2}) - (\d+:\d{2})\)$").expect("Invalid regex");
        let inline_marker = Regex::new(
            r"(?x)
            \[Page\s+\d+\]
            | \(Page\s+\d+\)
            | \[\d+:\d{2}\s+-\s+\d+:\d{2}\]
            | \(Timestamp:
        ",
        )
        .expect("Invalid regex");

        Self {
            model,
            prompts,
            page_citation,
            timestamp_citation,
            inline_marker,
        }
    }

    /// Build the completion request for a question.
    pub fn build_request(&self, context: &str, question: &str) -> AnswerRequest {
        let detail = if wants_elaboration(question) {
            &self.prompts.answer.elaborate_directive
        } else {
            &self.prompts.answer.concise_directive
        };

        let mut vars = HashMap::new();
        vars.insert("detail".to_string(), detail.clone());
        vars.insert("fallback".to_string(), FALLBACK_ANSWER.to_string());
        vars.insert("documents".to_string(), context.to_string());
        vars.insert("question".to_string(), question.to_string());

        AnswerRequest {
            system: self
                .prompts
                .render_with_custom(&self.prompts.answer.system, &vars),
            user: self.prompts.render_with_custom(&self.prompts.answer.user, &vars),
            schema: answer_schema(),
        }
    }

    /// Answer a question from the given context.
    #[instrument(skip(self, context), fields(question = %question))]
    pub async fn answer(&self, context: &str, question: &str) -> Result<StructuredAnswer> {
        if context.trim().is_empty() {
            return Err(DocentError::NoContent);
        }

        let request = self.build_request(context, question);
        info!("Requesting answer");
        let raw = self.model.complete(request).await.map_err(|e| {
            warn!("Answer model failed: {}", e);
            DocentError::synthesis(e)
        })?;
        debug!("Model returned {} bytes", raw.len());

        self.validate(&raw, context).map_err(|e| {
            warn!("Rejected model answer: {}", e);
            e
        })
    }

    /// Parse a raw reply and check it against the context it was given.
    pub fn validate(&self, raw: &str, context: &str) -> Result<StructuredAnswer> {
        let parsed: StructuredAnswer =
            serde_json::from_str(raw.trim()).map_err(DocentError::synthesis)?;

        if parsed.question.trim().is_empty() {
            return Err(DocentError::synthesis("question is empty"));
        }
        if parsed.answer.trim().is_empty() {
            return Err(DocentError::synthesis("answer is empty"));
        }
        if let Some(marker) = self.inline_marker.find(&parsed.answer) {
            return Err(DocentError::synthesis(format!(
                "answer contains inline citation {:?}",
                marker.as_str()
            )));
        }

        for citation in &parsed.citations {
            let locator = self.locator_for(citation.trim()).ok_or_else(|| {
                DocentError::synthesis(format!("malformed citation {:?}", citation))
            })?;
            if !context.contains(&locator) {
                return Err(DocentError::synthesis(format!(
                    "citation {:?} is not in the context",
                    citation
                )));
            }
        }

        Ok(parsed)
    }

    /// The context locator a citation points at.
    fn locator_for(&self, citation: &str) -> Option<String> {
        if let Some(caps) = self.page_citation.captures(citation) {
            return Some(format!("[Page {}]", &caps[1]));
        }
        self.timestamp_citation
            .captures(citation)
            .map(|caps| format!("[{} - {}]", &caps[1], &caps[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::UnavailableModel;
    use std::sync::Mutex;

    /// Replies with a canned string and records what it was asked.
    struct ScriptedModel {
        reply: String,
        requests: Mutex<Vec<AnswerRequest>>,
    }

    impl ScriptedModel {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AnswerModel for ScriptedModel {
        async fn complete(&self, request: AnswerRequest) -> Result<String> {
            self.requests.lock().unwrap().push(request);
            Ok(self.reply.clone())
        }
    }

    const CONTEXT: &str = "[Page 2] Cells divide by mitosis.\n\n[01:00 - 02:05] The lecturer explains meiosis.";

    fn synthesizer(model: Arc<ScriptedModel>) -> AnswerSynthesizer {
        AnswerSynthesizer::new(model, Prompts::default())
    }

    #[test]
    fn test_wants_elaboration() {
        assert!(wants_elaboration("Please explain in detail how cells divide"));
        assert!(wants_elaboration("ELABORATE on meiosis"));
        assert!(wants_elaboration("an in-depth look at mitosis"));
        assert!(!wants_elaboration("What is mitosis?"));
    }

    #[test]
    fn test_build_request_directives() {
        let synth = synthesizer(ScriptedModel::new("{}"));

        let concise = synth.build_request(CONTEXT, "What is mitosis?");
        assert!(concise.user.contains(&Prompts::default().answer.concise_directive));
        assert!(concise.user.contains(CONTEXT));
        assert!(concise.user.contains("What is mitosis?"));
        assert!(concise.user.contains(FALLBACK_ANSWER));
        assert!(!concise.user.contains("{{"));

        let elaborate = synth.build_request(CONTEXT, "Explain thoroughly");
        assert!(elaborate
            .user
            .contains(&Prompts::default().answer.elaborate_directive));
        assert_eq!(elaborate.schema["required"][2], "citations");
    }

    #[tokio::test]
    async fn test_valid_answer() {
        let model = ScriptedModel::new(
            r#"{"question":"How do cells divide?","answer":"Cells divide by mitosis, and meiosis produces gametes.","citations":["(Page 2)","(Timestamp: 01:00 - 02:05)"]}"#,
        );
        let synth = synthesizer(model.clone());

        let answer = synth.answer(CONTEXT, "How do cells divide?").await.unwrap();
        assert_eq!(answer.citations.len(), 2);
        assert_eq!(model.request_count(), 1);
    }

    #[tokio::test]
    async fn test_blank_context_skips_model() {
        let model = ScriptedModel::new("{}");
        let synth = synthesizer(model.clone());

        let result = synth.answer("  \n", "Anything?").await;
        assert!(matches!(result, Err(DocentError::NoContent)));
        assert_eq!(model.request_count(), 0);
    }

    #[tokio::test]
    async fn test_non_json_reply() {
        let synth = synthesizer(ScriptedModel::new("Cells divide by mitosis."));
        let result = synth.answer(CONTEXT, "How?").await;
        assert!(matches!(result, Err(DocentError::Synthesis { .. })));
    }

    #[tokio::test]
    async fn test_model_failure_is_synthesis_error() {
        let synth = AnswerSynthesizer::new(Arc::new(UnavailableModel), Prompts::default());
        let err = synth.answer(CONTEXT, "How?").await.unwrap_err();
        match err {
            DocentError::Synthesis { details } => assert!(details.contains("503")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_fallback_answer_accepted() {
        let synth = synthesizer(ScriptedModel::new("{}"));
        let raw = json!({
            "question": "Who won the match?",
            "answer": FALLBACK_ANSWER,
            "citations": []
        })
        .to_string();
        let answer = synth.validate(&raw, CONTEXT).unwrap();
        assert_eq!(answer.answer, FALLBACK_ANSWER);
        assert!(answer.citations.is_empty());
    }

    #[test]
    fn test_rejects_unknown_locator() {
        let synth = synthesizer(ScriptedModel::new("{}"));
        let raw = r#"{"question":"q","answer":"a","citations":["(Page 9)"]}"#;
        assert!(matches!(
            synth.validate(raw, CONTEXT),
            Err(DocentError::Synthesis { .. })
        ));
    }

    #[test]
    fn test_rejects_malformed_citation() {
        let synth = synthesizer(ScriptedModel::new("{}"));
        let raw = r#"{"question":"q","answer":"a","citations":["page 2"]}"#;
        assert!(synth.validate(raw, CONTEXT).is_err());
    }

    #[test]
    fn test_rejects_inline_markers() {
        let synth = synthesizer(ScriptedModel::new("{}"));
        for answer in [
            "Cells divide by mitosis [Page 2].",
            "Cells divide by mitosis (Page 2).",
            "Meiosis is covered at [01:00 - 02:05].",
            "Meiosis (Timestamp: 01:00 - 02:05) is covered.",
        ] {
            let raw = json!({"question": "q", "answer": answer, "citations": []}).to_string();
            assert!(synth.validate(&raw, CONTEXT).is_err(), "accepted {:?}", answer);
        }
    }

    #[test]
    fn test_rejects_missing_fields() {
        let synth = synthesizer(ScriptedModel::new("{}"));
        assert!(synth
            .validate(r#"{"question":"q","answer":"a"}"#, CONTEXT)
            .is_err());
        assert!(synth
            .validate(r#"{"question":"q","answer":"  ","citations":[]}"#, CONTEXT)
            .is_err());
    }
}

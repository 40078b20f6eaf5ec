//! Prompt templates for Docent.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub answer: AnswerPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for structured answer generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPrompts {
    pub system: String,
    pub user: String,
    /// Inserted as {{detail}} for ordinary questions.
    pub concise_directive: String,
    /// Inserted as {{detail}} when the question asks for depth.
    pub elaborate_directive: String,
}

impl Default for AnswerPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert assistant for document and video question answering. You answer strictly from the context documents you are given, which are excerpts from PDF pages and video transcripts.

Tone:
- Respectful, friendly and professional
- Pedagogical: explain concepts clearly

Content:
- Base the answer on the provided context
- You may expand explanations, but every expansion must directly relate to the context
- Include specific details and evidence from the documents

Output:
- Reply with a single JSON object with the fields "question", "answer" and "citations"
- "question" repeats the user's question
- "answer" is the answer text only
- "citations" lists the sources you used, formatted exactly as "(Page X)" or "(Timestamp: mm:ss - mm:ss)"
- Each context excerpt starts with its locator, e.g. "[Page 3]" or "[01:00 - 02:05]"; only cite locators that appear in the context
- Do NOT put page numbers or timestamps inside the answer text; citations live only in the citations array"#
                .to_string(),

            user: r#"Detail level:
{{detail}}

If the context does not contain sufficient information to answer the question, set "answer" to exactly:
"{{fallback}}"
and return an empty citations array.

Context documents:
{{documents}}

User question:
{{question}}"#
                .to_string(),

            concise_directive: "Respond clearly and concisely without unnecessary elaboration.".to_string(),

            elaborate_directive: r#"The user asked for a detailed explanation. Your answer must be comprehensive:
- 4 to 6 paragraphs, each of 4 to 8 sentences
- Open with an overview paragraph, follow with detailed explanations of the key points, close with a paragraph that synthesizes the information
- Break down complex concepts and cover implications and applications found in the context"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let answer_path = custom_path.join("answer.toml");
            if answer_path.exists() {
                let content = std::fs::read_to_string(&answer_path)?;
                prompts.answer = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Placeholders are replaced in one left-to-right pass; substituted values are
    /// never scanned again. Unknown placeholders are left as written.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(open) = rest.find("{{") {
            result.push_str(&rest[..open]);
            let after = &rest[open + 2..];
            let Some(close) = after.find("}}") else {
                rest = &rest[open..];
                break;
            };

            let key = &after[..close];
            match vars.get(key) {
                Some(value) => result.push_str(value),
                None => result.push_str(&rest[open..open + 2 + close + 2]),
            }
            rest = &after[close + 2..];
        }

        result.push_str(rest);
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

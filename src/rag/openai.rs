//! OpenAI chat completions as an [`AnswerModel`].

use super::synthesizer::{AnswerModel, AnswerRequest};
use crate::error::{DocentError, Result};
use crate::openai::create_client;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs, ResponseFormat,
    ResponseFormatJsonSchema,
};
use async_trait::async_trait;
use tracing::{debug, instrument};

/// Schema name sent with the response format.
const SCHEMA_NAME: &str = "structured_answer";

/// Chat model constrained to the answer schema.
pub struct OpenAIAnswerModel {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl OpenAIAnswerModel {
    pub fn new(model: &str, temperature: f32) -> Result<Self> {
        Ok(Self {
            client: create_client()?,
            model: model.to_string(),
            temperature,
        })
    }
}

fn build_error(e: impl std::fmt::Display) -> DocentError {
    DocentError::OpenAI(format!("Failed to build request: {}", e))
}

#[async_trait]
impl AnswerModel for OpenAIAnswerModel {
    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn complete(&self, request: AnswerRequest) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system)
                .build()
                .map_err(build_error)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user)
                .build()
                .map_err(build_error)?
                .into(),
        ];

        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: Some("Answer with citations to the context".to_string()),
                name: SCHEMA_NAME.to_string(),
                schema: Some(request.schema),
                strict: Some(true),
            },
        };

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .response_format(response_format)
            .build()
            .map_err(build_error)?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| DocentError::OpenAI(format!("Failed to generate response: {}", e)))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| DocentError::synthesis("Empty response from LLM"))?;

        debug!("Received {} characters", content.len());
        Ok(content)
    }
}

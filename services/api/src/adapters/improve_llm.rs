//! services/api/src/adapters/improve_llm.rs
//!
//! This module contains the adapter for the report-improving LLM.
//! It implements the `TextImprovementService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use berichtsheft_core::ports::{ImproveRequest, PortError, PortResult, TextImprovementService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextImprovementService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiImproveAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiImproveAdapter {
    /// Creates a new `OpenAiImproveAdapter`.
    pub fn new(
        client: Client<OpenAIConfig>,
        model: String,
        temperature: f32,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            model,
            temperature,
            max_tokens,
        }
    }

    /// System instruction, then one user/assistant pair per example, then the report text.
    fn build_messages(
        request: &ImproveRequest<'_>,
    ) -> PortResult<Vec<ChatCompletionRequestMessage>> {
        let mut messages = Vec::with_capacity(request.examples.len() * 2 + 2);

        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        );

        for example in request.examples {
            messages.push(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(example.input.as_str())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
            );
            messages.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(example.output.as_str())
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
                    .into(),
            );
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.input)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        );

        Ok(messages)
    }
}

//=========================================================================================
// `TextImprovementService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextImprovementService for OpenAiImproveAdapter {
    /// Rewrites raw report text. A response without text content yields an empty string.
    async fn improve_text(&self, request: ImproveRequest<'_>) -> PortResult<String> {
        let messages = Self::build_messages(&request)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use berichtsheft_core::PromptExample;

    #[test]
    fn examples_become_user_assistant_pairs_between_system_and_input() {
        let examples = vec![
            PromptExample::new("Montag: Urlaub", "Am Montag hatte ich Urlaub."),
            PromptExample::new("Dienstag: PC eingerichtet", "Am Dienstag richtete ich den PC ein."),
        ];
        let request = ImproveRequest {
            system: "Schreibe Berichtshefte.",
            examples: &examples,
            input: "Mittwoch: Tickets bearbeitet",
        };

        let messages = OpenAiImproveAdapter::build_messages(&request).unwrap();

        assert_eq!(messages.len(), 6);
        assert!(matches!(messages[0], ChatCompletionRequestMessage::System(_)));
        assert!(matches!(messages[1], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[2], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[3], ChatCompletionRequestMessage::User(_)));
        assert!(matches!(messages[4], ChatCompletionRequestMessage::Assistant(_)));
        assert!(matches!(messages[5], ChatCompletionRequestMessage::User(_)));
    }
}

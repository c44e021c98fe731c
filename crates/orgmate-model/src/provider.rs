use async_trait::async_trait;
use futures::{Stream, StreamExt};
use std::pin::Pin;

use crate::{CompletionRequest, ModelError, ResponseEvent};

pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<ResponseEvent, ModelError>> + Send>>;

#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Human-readable provider name for status display.
    fn name(&self) -> &str;

    /// Model identifier as reported to users.
    fn model_name(&self) -> &str;

    /// Start a generation and return its fragments as a stream.
    ///
    /// Every call opens a fresh generation; the stream is finite and can be
    /// consumed once.
    async fn complete(&self, req: CompletionRequest) -> Result<ResponseStream, ModelError>;

    /// Run a generation to completion and return the whole reply.
    ///
    /// The default implementation drains [`ModelProvider::complete`].
    async fn chat(&self, req: CompletionRequest) -> Result<String, ModelError> {
        let mut stream = self
            .complete(CompletionRequest { stream: true, ..req })
            .await?;
        let mut text = String::new();
        while let Some(event) = stream.next().await {
            if let ResponseEvent::TextDelta(delta) = event? {
                text.push_str(&delta);
            }
        }
        Ok(text)
    }

    /// Models available from this provider.
    ///
    /// The default implementation only knows the configured model.
    async fn list_models(&self) -> Result<Vec<String>, ModelError> {
        Ok(vec![self.model_name().to_string()])
    }
}

use async_trait::async_trait;
use futures_core::Stream;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use glyph_types::{is_sentinel, ProviderError};

/// A lazy, finite sequence of text fragments from a streaming generation.
pub type FragmentStream<'a> =
    Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send + 'a>>;

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Buffered generation: one prompt in, one complete candidate out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, ProviderError>;

    /// Pure capability probe. Must not perform I/O.
    fn is_available(&self) -> bool;

    fn name(&self) -> &str;
}

/// Generators that can also deliver a candidate incrementally.
pub trait StreamingGenerator: TextGenerator {
    fn generate_stream(&self, prompt: &str, system_prompt: &str) -> FragmentStream<'_>;
}

// ---------------------------------------------------------------------------
// Sentinel classification
// ---------------------------------------------------------------------------

/// Turn a raw reply into a typed result. Replies carrying an `ERROR_CODE:`
/// sentinel become `Err` so nothing downstream mistakes them for content.
pub fn classify_reply(text: String) -> Result<String, ProviderError> {
    if is_sentinel(&text) {
        if let Some(err) = ProviderError::from_sentinel(&text) {
            return Err(err);
        }
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// Collaborator
// ---------------------------------------------------------------------------

/// The generation collaborator, tagged by capability at construction time.
pub enum Collaborator {
    Basic(Box<dyn TextGenerator>),
    Streaming(Box<dyn StreamingGenerator>),
}

impl Collaborator {
    pub fn basic(generator: impl TextGenerator + 'static) -> Self {
        Collaborator::Basic(Box::new(generator))
    }

    pub fn streaming(generator: impl StreamingGenerator + 'static) -> Self {
        Collaborator::Streaming(Box::new(generator))
    }

    pub fn supports_streaming(&self) -> bool {
        matches!(self, Collaborator::Streaming(_))
    }

    pub fn is_available(&self) -> bool {
        match self {
            Collaborator::Basic(g) => g.is_available(),
            Collaborator::Streaming(g) => g.is_available(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Collaborator::Basic(g) => g.name(),
            Collaborator::Streaming(g) => g.name(),
        }
    }

    pub async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> Result<String, ProviderError> {
        let reply = match self {
            Collaborator::Basic(g) => g.generate(prompt, system_prompt).await,
            Collaborator::Streaming(g) => g.generate(prompt, system_prompt).await,
        };
        reply.and_then(classify_reply)
    }

    /// Open a fragment stream. A `Basic` collaborator yields its whole reply
    /// as a single fragment.
    pub fn open_stream(&self, prompt: &str, system_prompt: &str) -> FragmentStream<'_> {
        match self {
            Collaborator::Streaming(g) => g.generate_stream(prompt, system_prompt),
            Collaborator::Basic(g) => {
                let generator: &dyn TextGenerator = g.as_ref();
                let prompt = prompt.to_owned();
                let system_prompt = system_prompt.to_owned();
                let reply: ReplyFuture<'_> = Box::pin(async move {
                    generator.generate(&prompt, &system_prompt).await
                });
                Box::pin(SingleReply {
                    pending: Some(reply),
                })
            }
        }
    }
}

impl std::fmt::Debug for Collaborator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self {
            Collaborator::Basic(_) => "Basic",
            Collaborator::Streaming(_) => "Streaming",
        };
        f.debug_struct("Collaborator")
            .field("kind", &kind)
            .field("name", &self.name())
            .finish()
    }
}

type ReplyFuture<'a> = Pin<Box<dyn Future<Output = Result<String, ProviderError>> + Send + 'a>>;

/// Stream adapter yielding the output of one buffered call, then ending.
struct SingleReply<'a> {
    pending: Option<ReplyFuture<'a>>,
}

impl Stream for SingleReply<'_> {
    type Item = Result<String, ProviderError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(fut) = self.pending.as_mut() else {
            return Poll::Ready(None);
        };
        match fut.as_mut().poll(cx) {
            Poll::Ready(reply) => {
                self.pending = None;
                Poll::Ready(Some(reply))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    struct EchoGenerator;

    #[async_trait]
    impl TextGenerator for EchoGenerator {
        async fn generate(
            &self,
            prompt: &str,
            _system_prompt: &str,
        ) -> Result<String, ProviderError> {
            Ok(format!("echo: {prompt}"))
        }

        fn is_available(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    struct SentinelGenerator;

    #[async_trait]
    impl TextGenerator for SentinelGenerator {
        async fn generate(&self, _p: &str, _s: &str) -> Result<String, ProviderError> {
            Ok("ERROR_CODE: TIMEOUT\nERROR_MESSAGE: too slow".into())
        }

        fn is_available(&self) -> bool {
            false
        }

        fn name(&self) -> &str {
            "sentinel"
        }
    }

    #[tokio::test]
    async fn basic_collaborator_generates() {
        let c = Collaborator::basic(EchoGenerator);
        assert!(!c.supports_streaming());
        assert!(c.is_available());
        assert_eq!(c.name(), "echo");
        assert_eq!(c.generate("cat", "sys").await.unwrap(), "echo: cat");
    }

    #[tokio::test]
    async fn basic_collaborator_streams_single_fragment() {
        let c = Collaborator::basic(EchoGenerator);
        let fragments: Vec<_> = c.open_stream("dog", "sys").collect().await;
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].as_deref().unwrap(), "echo: dog");
    }

    #[tokio::test]
    async fn sentinel_reply_becomes_error() {
        let c = Collaborator::basic(SentinelGenerator);
        let err = c.generate("x", "y").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));
        assert_eq!(err.message(), "too slow");
    }

    #[test]
    fn classify_reply_passes_content() {
        assert_eq!(classify_reply("( o.o )".into()).unwrap(), "( o.o )");
        assert!(classify_reply("ERROR_CODE: NO_RESPONSE\nERROR_MESSAGE: none".into()).is_err());
    }

    #[test]
    fn collaborator_debug_names_kind() {
        let c = Collaborator::basic(EchoGenerator);
        let dbg = format!("{c:?}");
        assert!(dbg.contains("Basic"));
        assert!(dbg.contains("echo"));
    }
}

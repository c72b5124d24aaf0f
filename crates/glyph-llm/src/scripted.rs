use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::{classify_reply, FragmentStream, StreamingGenerator, TextGenerator};
use glyph_types::{Mode, ProviderError};

/// A single call observed by a [`ScriptedGenerator`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub prompt: String,
    pub system_prompt: String,
    pub streamed: bool,
}

/// Shared handle onto the calls a [`ScriptedGenerator`] has received.
///
/// Clones observe the same log, so a test can keep one after handing the
/// generator to an orchestrator.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    inner: Arc<Mutex<Vec<RecordedCall>>>,
}

impl CallLog {
    pub fn len(&self) -> usize {
        self.inner.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.inner.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, prompt: &str, system_prompt: &str, streamed: bool) -> usize {
        match self.inner.lock() {
            Ok(mut calls) => {
                calls.push(RecordedCall {
                    prompt: prompt.to_string(),
                    system_prompt: system_prompt.to_string(),
                    streamed,
                });
                calls.len() - 1
            }
            Err(_) => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedGenerator
// ---------------------------------------------------------------------------

/// Deterministic generator that replays a fixed list of replies.
///
/// Call `n` receives reply `n`; once the script runs out the last reply repeats.
/// Streaming splits each reply into line-sized fragments, or into fixed-size
/// character chunks when `with_chunk_size` is set.
#[derive(Debug, Clone)]
pub struct ScriptedGenerator {
    replies: Vec<Result<String, ProviderError>>,
    chunk_size: Option<usize>,
    log: CallLog,
    name: String,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_results(replies.into_iter().map(|r| Ok(r.into())).collect())
    }

    pub fn from_results(replies: Vec<Result<String, ProviderError>>) -> Self {
        Self {
            replies,
            chunk_size: None,
            log: CallLog::default(),
            name: "scripted".into(),
        }
    }

    /// Canned output for `--offline` runs.
    pub fn demo(mode: Mode) -> Self {
        let sample = match mode {
            Mode::Art | Mode::Logo => DEMO_ART,
            Mode::Chart => DEMO_CHART,
            Mode::Diagram => DEMO_DIAGRAM,
        };
        let mut generator = Self::new([sample]);
        generator.name = "offline".into();
        generator
    }

    pub fn with_chunk_size(mut self, chars: usize) -> Self {
        self.chunk_size = Some(chars.max(1));
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    fn reply_for(&self, index: usize) -> Result<String, ProviderError> {
        self.replies
            .get(index)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::no_response()))
    }

    fn split(&self, text: &str) -> Vec<String> {
        match self.chunk_size {
            Some(size) => {
                let chars: Vec<char> = text.chars().collect();
                chars.chunks(size).map(|c| c.iter().collect()).collect()
            }
            None => text.split_inclusive('\n').map(String::from).collect(),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String, ProviderError> {
        let index = self.log.record(prompt, system_prompt, false);
        self.reply_for(index).and_then(classify_reply)
    }

    fn is_available(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl StreamingGenerator for ScriptedGenerator {
    fn generate_stream(&self, prompt: &str, system_prompt: &str) -> FragmentStream<'_> {
        let index = self.log.record(prompt, system_prompt, true);
        let fragments: Vec<Result<String, ProviderError>> = match self.reply_for(index) {
            Ok(text) => self.split(&text).into_iter().map(Ok).collect(),
            Err(err) => vec![Err(err)],
        };
        Box::pin(tokio_stream::iter(fragments))
    }
}

const DEMO_ART: &str = r#"   /\_/\
  ( o.o )
   > ^ <
  /     \
 (       )
  \__ __/"#;

const DEMO_CHART: &str = "Sales by quarter
┌────────────────────────┐
│ Q1 ████████      40%   │
│ Q2 ██████████    50%   │
│ Q3 ████          20%   │
│ Q4 ████████████  60%   │
└────────────────────────┘";

const DEMO_DIAGRAM: &str = "┌─────────┐
│ Client  │
└─────────┘
     ↓
┌─────────┐
│ Server  │
└─────────┘";

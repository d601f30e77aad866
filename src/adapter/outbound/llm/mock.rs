//! Mock LLM clients for tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::port::outbound::Llm;

/// Mock LLM returning a fixed response.
pub struct MockLlm {
    response: String,
}

impl MockLlm {
    /// Creates a mock with the given canned response.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }
}

/// Mock LLM that counts calls; used for budget tests.
pub struct CountingMockLlm {
    call_count: AtomicUsize,
    response: String,
}

impl CountingMockLlm {
    /// Creates a counting mock with the given response.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            call_count: AtomicUsize::new(0),
            response: response.into(),
        }
    }

    /// Number of completions served.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Llm for CountingMockLlm {
    fn name(&self) -> &'static str {
        "counting_mock"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.response.clone())
    }
}

/// Mock LLM that records prompts; used to assert the rules text is
/// included in analysis prompts.
pub struct RecordingMockLlm {
    prompts: Mutex<Vec<String>>,
    response: String,
}

impl RecordingMockLlm {
    /// Creates a recording mock with the given response.
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            prompts: Mutex::new(Vec::new()),
            response: response.into(),
        }
    }

    /// All prompts seen so far.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    /// The most recent prompt, if any.
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }
}

#[async_trait]
impl Llm for RecordingMockLlm {
    fn name(&self) -> &'static str {
        "recording_mock"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        Ok(self.response.clone())
    }
}

/// Mock LLM that fails a set number of times before succeeding; used for
/// retry tests.
pub struct FailingMockLlm {
    failures_remaining: AtomicUsize,
    success_response: String,
}

impl FailingMockLlm {
    /// Creates a mock failing `fail_count` times before succeeding.
    pub fn new(fail_count: usize, success_response: impl Into<String>) -> Self {
        Self {
            failures_remaining: AtomicUsize::new(fail_count),
            success_response: success_response.into(),
        }
    }
}

#[async_trait]
impl Llm for FailingMockLlm {
    fn name(&self) -> &'static str {
        "failing_mock"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        if self.failures_remaining.load(Ordering::SeqCst) > 0 {
            self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
            Err(Error::Connection("simulated API failure".into()))
        } else {
            Ok(self.success_response.clone())
        }
    }
}

/// Scripted mock: returns responses in sequence, repeating the last one.
pub struct SequenceMockLlm {
    responses: Vec<String>,
    cursor: AtomicUsize,
}

impl SequenceMockLlm {
    /// Creates a mock that serves `responses` in order.
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            cursor: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Llm for SequenceMockLlm {
    fn name(&self) -> &'static str {
        "sequence_mock"
    }

    async fn complete(&self, _prompt: &str) -> Result<String> {
        let i = self.cursor.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .responses
            .get(i)
            .or_else(|| self.responses.last())
            .cloned()
            .unwrap_or_default())
    }
}

//! Fake collaborators shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream;
use pdf2cards::{CardSchema, CompletionSource, FragmentStream, Pdf2CardsError, TextExtractor};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n%fake body\n";

/// Returns a fixed text and counts how often it was asked.
pub struct FakeExtractor {
    text: Result<String, String>,
    pub calls: AtomicUsize,
}

impl FakeExtractor {
    pub fn returning(text: impl Into<String>) -> Self {
        Self {
            text: Ok(text.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(detail: impl Into<String>) -> Self {
        Self {
            text: Err(detail.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    fn name(&self) -> &str {
        "fake"
    }

    async fn extract(&self, label: &str, _pdf: &[u8]) -> Result<String, Pdf2CardsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.text.clone().map_err(|detail| Pdf2CardsError::CorruptPdf {
            name: label.to_string(),
            detail,
        })
    }
}

/// What the fake model does on a given call.
#[derive(Clone)]
pub enum Reply {
    /// Stream this text, cut into small fragments.
    Text(String),
    /// Fail before the first fragment.
    Fail(String),
}

/// Replays scripted replies in call order and records every prompt.
pub struct ScriptedCompletion {
    replies: Vec<Reply>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call answers with the same text.
    pub fn always(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(vec![Reply::Text(text); 16])
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompt(&self, i: usize) -> String {
        self.prompts.lock().unwrap()[i].clone()
    }
}

#[async_trait]
impl CompletionSource for ScriptedCompletion {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, prompt: &str) -> Result<FragmentStream, Pdf2CardsError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len() - 1
        };
        match self.replies.get(call).cloned() {
            Some(Reply::Text(text)) => {
                let chars: Vec<char> = text.chars().collect();
                let fragments: Vec<Result<String, Pdf2CardsError>> = chars
                    .chunks(7)
                    .map(|c| Ok(c.iter().collect::<String>()))
                    .collect();
                Ok(Box::pin(stream::iter(fragments)))
            }
            Some(Reply::Fail(detail)) => Err(Pdf2CardsError::CompletionFailed { chunk: 0, detail }),
            None => Err(Pdf2CardsError::Internal(format!("unscripted call {call}"))),
        }
    }
}

/// A reply whose every value is `"<prefix> <key>"`.
pub fn card_reply(schema: &CardSchema, prefix: &str) -> String {
    let obj: serde_json::Map<String, serde_json::Value> = schema
        .keys()
        .map(|k| (k.to_string(), serde_json::Value::String(format!("{prefix} {k}"))))
        .collect();
    serde_json::to_string(&obj).unwrap()
}

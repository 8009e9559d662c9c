//! Card schemas: the fixed set of keys a card summary must contain.
//!
//! A schema is an ordered, closed list of [`CardField`]s. The order drives
//! both the prompt (fields are enumerated in this order) and the serialised
//! output (keys are emitted in this order). Two revisions ship built in; a
//! custom schema can be assembled with [`CardSchema::new`].

use serde::{Deserialize, Serialize};

/// One key of a card summary and the meaning the model is asked to fill in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardField {
    pub key: String,
    pub description: String,
}

impl CardField {
    pub fn new(key: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            description: description.into(),
        }
    }
}

/// Ordered, non-extensible list of card keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSchema {
    fields: Vec<CardField>,
}

const QUESTION: &str = "Summarize the main problem or research question the paper addresses. Keep it simple and relatable.";
const RESEARCHER: &str = "Briefly introduce the scientist(s) who conducted the research, or the institution they are affiliated with.";
const METHOD: &str = "Briefly explain what the researchers did to conduct the study, without technical jargon.";
const FINDINGS: &str = "Summarize the key findings in a way that highlights their significance.";
const IMPLICATIONS: &str = "Explain why these findings matter for people's lives, society, or future research.";
const CLOSING: &str = "End with a question or call to action that invites comments, shares, or questions.";

impl CardSchema {
    /// Build a schema from explicit fields. Duplicate keys keep their first
    /// occurrence.
    pub fn new(fields: Vec<CardField>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let fields = fields
            .into_iter()
            .filter(|f| seen.insert(f.key.clone()))
            .collect();
        Self { fields }
    }

    /// `{hook, question, researcher, method, findings, implications, closing}`.
    pub fn hook() -> Self {
        Self::new(vec![
            CardField::new(
                "hook",
                "The most interesting finding or surprising fact from the paper, phrased as a catchy, attention-grabbing opener.",
            ),
            CardField::new("question", QUESTION),
            CardField::new("researcher", RESEARCHER),
            CardField::new("method", METHOD),
            CardField::new("findings", FINDINGS),
            CardField::new("implications", IMPLICATIONS),
            CardField::new("closing", CLOSING),
        ])
    }

    /// `{intro, question, researcher, method, findings, implications, closing}`.
    pub fn intro() -> Self {
        Self::new(vec![
            CardField::new(
                "intro",
                "A short, friendly introduction to what the paper is about that makes a non-scientist want to keep reading.",
            ),
            CardField::new("question", QUESTION),
            CardField::new("researcher", RESEARCHER),
            CardField::new("method", METHOD),
            CardField::new("findings", FINDINGS),
            CardField::new("implications", IMPLICATIONS),
            CardField::new("closing", CLOSING),
        ])
    }

    pub fn fields(&self) -> &[CardField] {
        &self.fields
    }

    /// Keys in schema order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.key.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.iter().any(|f| f.key == key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for CardSchema {
    fn default() -> Self {
        Self::hook()
    }
}

// core/src/engine.rs
//
// Decoding engine contract plus a table-driven reference implementation.
// The real pinyin decoder lives outside this crate; anything implementing
// `DecodingEngine` can be plugged into the state machine.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::candidate::Candidate;

/// Failure raised by a decoding engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("malformed input {0:?}")]
    MalformedInput(String),
    #[error("candidate {index} not available for {input:?}")]
    NoSuchCandidate { input: String, index: usize },
    #[error("{0}")]
    Other(String),
}

/// Outcome of choosing a candidate for the current input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    /// The whole remaining input is decided and can be committed.
    /// `complete` is true when the engine recognised the input in full.
    Commit { text: String, complete: bool },
    /// `text` covers the first `consumed` units; more input is expected.
    Partial { text: String, consumed: usize },
}

/// Trait the state machine uses to turn composing input into candidates.
pub trait DecodingEngine {
    /// Ranked candidates for `input`.
    fn candidates_for(&mut self, input: &str) -> Result<Vec<Candidate>, EngineError>;

    /// Whether the engine recognises `input` completely.
    fn is_finished(&self, input: &str) -> bool;

    /// Choose candidate `index` of the list last returned for `input`.
    fn choose(&mut self, input: &str, index: usize) -> Result<Choice, EngineError>;

    /// Associative suggestions following `committed` text.
    fn predictions_for(&mut self, _committed: &str) -> Result<Vec<Candidate>, EngineError> {
        Ok(Vec::new())
    }

    /// Display form of `input` for the composing area.
    fn display_for(&self, input: &str) -> String {
        input.to_string()
    }

    /// Drop any per-input state.
    fn reset(&mut self);
}

/// Table-driven engine: input keys map to phrase lists.
///
/// Candidates for an input are the phrases for the full input, then phrases
/// for shorter prefixes (partial choices), then the raw input itself.
/// Apostrophes act as syllable separators and are ignored for lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableEngine {
    #[serde(default)]
    lexicon: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    predictions: BTreeMap<String, Vec<String>>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(skip)]
    last_input: String,
    /// (text, units consumed) for the last candidate list.
    #[serde(skip)]
    last: Vec<(String, usize)>,
}

fn default_limit() -> usize {
    20
}

impl TableEngine {
    pub fn new() -> Self {
        Self {
            limit: default_limit(),
            ..Self::default()
        }
    }

    /// Insert a mapping from input key to phrase.
    pub fn insert<K: Into<String>, V: Into<String>>(&mut self, key: K, phrase: V) {
        self.lexicon.entry(key.into()).or_default().push(phrase.into());
    }

    /// Insert an associative suggestion following `after`.
    pub fn insert_prediction<K: Into<String>, V: Into<String>>(&mut self, after: K, phrase: V) {
        self.predictions
            .entry(after.into())
            .or_default()
            .push(phrase.into());
    }

    pub fn set_limit(&mut self, limit: usize) {
        self.limit = limit.max(1);
    }

    /// Load a table from TOML (`[lexicon]` and `[predictions]` tables).
    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let mut engine: TableEngine = toml::from_str(content)?;
        engine.limit = engine.limit.max(1);
        Ok(engine)
    }

    /// Load a table from a TOML file.
    pub fn load_toml<P: AsRef<std::path::Path>>(
        path: P,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_toml_str(&content)?)
    }

    /// Small built-in table used when no table file is given.
    pub fn demo() -> Self {
        let mut engine = Self::new();
        for (key, phrases) in [
            ("ni", &["你", "尼", "泥"][..]),
            ("hao", &["好", "号", "浩"][..]),
            ("nihao", &["你好"][..]),
            ("zhong", &["中", "钟"][..]),
            ("guo", &["国", "过"][..]),
            ("zhongguo", &["中国"][..]),
            ("wo", &["我", "握"][..]),
            ("men", &["们", "门"][..]),
            ("women", &["我们"][..]),
            ("hello", &["hello"][..]),
            ("world", &["world"][..]),
        ] {
            for phrase in phrases {
                engine.insert(key, *phrase);
            }
        }
        engine.insert_prediction("你", "好");
        engine.insert_prediction("你", "们");
        engine.insert_prediction("中", "国");
        engine.insert_prediction("我", "们");
        engine
    }

    fn lookup_key(prefix: &str) -> String {
        prefix.chars().filter(|c| *c != '\'').collect()
    }

    fn validate(input: &str) -> Result<(), EngineError> {
        if input
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '\'' || c == ';')
        {
            Ok(())
        } else {
            Err(EngineError::MalformedInput(input.to_string()))
        }
    }

    fn build(&self, input: &str) -> Vec<(String, usize)> {
        let mut out: Vec<(String, usize)> = Vec::new();
        let push = |text: &str, span: usize, out: &mut Vec<(String, usize)>| {
            if !out.iter().any(|(t, _)| t == text) {
                out.push((text.to_string(), span));
            }
        };

        // Input is ASCII after validation, so byte offsets are unit counts.
        for end in (1..=input.len()).rev() {
            let key = Self::lookup_key(&input[..end]);
            if let Some(phrases) = self.lexicon.get(&key) {
                for phrase in phrases {
                    push(phrase, end, &mut out);
                }
            }
        }
        push(input, input.len(), &mut out);
        out.truncate(self.limit.max(1));
        out
    }
}

impl DecodingEngine for TableEngine {
    fn candidates_for(&mut self, input: &str) -> Result<Vec<Candidate>, EngineError> {
        Self::validate(input)?;
        self.last = self.build(input);
        self.last_input = input.to_string();
        Ok(self.last.iter().map(|(t, _)| Candidate::new(t.as_str())).collect())
    }

    fn is_finished(&self, input: &str) -> bool {
        !input.is_empty() && self.lexicon.contains_key(&Self::lookup_key(input))
    }

    fn choose(&mut self, input: &str, index: usize) -> Result<Choice, EngineError> {
        if self.last_input != input {
            self.candidates_for(input)?;
        }
        let (text, span) = self
            .last
            .get(index)
            .cloned()
            .ok_or_else(|| EngineError::NoSuchCandidate {
                input: input.to_string(),
                index,
            })?;
        if span >= input.len() {
            Ok(Choice::Commit {
                text,
                complete: self.is_finished(input),
            })
        } else {
            Ok(Choice::Partial {
                text,
                consumed: span,
            })
        }
    }

    fn predictions_for(&mut self, committed: &str) -> Result<Vec<Candidate>, EngineError> {
        // Longest suffix of the committed text with an entry wins.
        let starts: Vec<usize> = committed.char_indices().map(|(i, _)| i).collect();
        for start in starts {
            if let Some(list) = self.predictions.get(&committed[start..]) {
                return Ok(list.iter().map(|t| Candidate::new(t.as_str())).collect());
            }
        }
        Ok(Vec::new())
    }

    fn reset(&mut self) {
        self.last.clear();
        self.last_input.clear();
    }
}

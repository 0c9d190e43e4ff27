//! Payload analyzers.
//!
//! An analyzer recognises a structured payload format and summarises a
//! payload's structure. The tree map only asks for a structure when a message
//! name is needed, and caches the result in the message content.

pub mod json;

use log::{debug, warn};

use crate::error::Result;
use crate::websocket::Payload;

pub use self::json::{JsonAnalyzer, JsonShape};

/// Structural summary of a payload, tagged by the format that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadStructure {
    Json(serde_json::Value),
}

impl PayloadStructure {
    /// Value-free shape of a JSON structure; `None` for other formats.
    pub fn json_structure(&self) -> Option<JsonShape> {
        match self {
            PayloadStructure::Json(value) => Some(JsonShape::of(value)),
        }
    }
}

pub trait PayloadAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap check whether `payload` is in this analyzer's format.
    fn recognizer(&self, payload: &Payload) -> bool;

    fn payload_structure(&self, payload: &Payload) -> Result<PayloadStructure>;

    fn leaf_name(&self, structure: &PayloadStructure) -> String;
}

/// Structure produced for a payload, remembering which analyzer produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzedPayload {
    pub analyzer: &'static str,
    pub structure: PayloadStructure,
}

/// Ordered set of analyzers, unique by name.
#[derive(Default)]
pub struct AnalyzerManager {
    analyzers: Vec<Box<dyn PayloadAnalyzer>>,
}

impl AnalyzerManager {
    pub fn new() -> Self {
        AnalyzerManager { analyzers: Vec::new() }
    }

    /// Build a manager from analyzer names; unknown names are skipped.
    pub fn from_names(names: &[String]) -> Self {
        let mut manager = AnalyzerManager::new();
        for name in names {
            match name.as_str() {
                JsonAnalyzer::NAME => {
                    manager.add(Box::new(JsonAnalyzer));
                }
                unknown => warn!("Ignoring unknown payload analyzer {:?}", unknown),
            }
        }
        manager
    }

    /// Append an analyzer; returns false if one with the same name is present.
    pub fn add(&mut self, analyzer: Box<dyn PayloadAnalyzer>) -> bool {
        if self.analyzers.iter().any(|existing| existing.name() == analyzer.name()) {
            return false;
        }
        self.analyzers.push(analyzer);
        true
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.analyzers.len();
        self.analyzers.retain(|analyzer| analyzer.name() != name);
        self.analyzers.len() != before
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.analyzers.iter().map(|analyzer| analyzer.name()).collect()
    }

    /// Structure from the first analyzer that recognises the payload.
    pub fn analyze(&self, payload: &Payload) -> Option<AnalyzedPayload> {
        let analyzer = self.analyzers.iter().find(|analyzer| analyzer.recognizer(payload))?;
        match analyzer.payload_structure(payload) {
            Ok(structure) => Some(AnalyzedPayload {
                analyzer: analyzer.name(),
                structure,
            }),
            Err(e) => {
                debug!("Analyzer {} recognised but could not parse payload: {}", analyzer.name(), e);
                None
            }
        }
    }

    pub fn leaf_name(&self, analyzed: &AnalyzedPayload) -> Option<String> {
        self.analyzers
            .iter()
            .find(|analyzer| analyzer.name() == analyzed.analyzer)
            .map(|analyzer| analyzer.leaf_name(&analyzed.structure))
    }
}

impl std::fmt::Debug for AnalyzerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyzerManager")
            .field("analyzers", &self.names())
            .finish()
    }
}

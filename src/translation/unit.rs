use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::placeholders;

/// One translatable string on its way through the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Text as extracted from the file
    pub source: String,

    /// Text sent to providers, placeholders replaced by tokens
    pub protected: String,

    /// Token -> original placeholder
    pub placeholders: HashMap<String, String>,

    /// Translation of `protected`, still carrying tokens
    pub translation: Option<String>,

    /// Why the unit could not be translated
    pub error: Option<String>,

    /// Whether the translation came from the cache
    pub from_cache: bool,
}

impl TranslationUnit {
    /// Create a unit, protecting its placeholders
    pub fn new(source: impl Into<String>) -> Self {
        let source = source.into();
        let (protected, placeholders) = placeholders::protect(&source);
        Self {
            source,
            protected,
            placeholders,
            ..Self::default()
        }
    }

    /// Whether the unit has a translation
    pub fn is_resolved(&self) -> bool {
        self.translation.is_some()
    }

    /// Whether there is nothing to translate
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }

    /// Record a translation for the protected text
    pub fn resolve(&mut self, translation: impl Into<String>, from_cache: bool) {
        self.translation = Some(translation.into());
        self.error = None;
        self.from_cache = from_cache;
    }

    /// Record why the unit stays untranslated
    pub fn fail(&mut self, error: impl Into<String>) {
        self.translation = None;
        self.error = Some(error.into());
    }

    /// Final text: the restored translation, or the source when unresolved
    pub fn output(&self) -> String {
        match &self.translation {
            Some(translation) => placeholders::restore(translation, &self.placeholders),
            None => self.source.clone(),
        }
    }
}

use crate::utils::error::{CopilotError, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

const BUILTIN_VOCABULARY: &str = include_str!("../../data/skills.toml");

#[derive(Debug, Deserialize)]
struct VocabularyFile {
    version: String,
    #[serde(default)]
    fuzzy: FuzzySection,
    #[serde(default)]
    skills: Vec<SkillEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct FuzzySection {
    #[serde(default)]
    stopwords: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SkillEntry {
    name: String,
    category: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    case_sensitive: Vec<String>,
}

/// Curated skill dictionary with alias resolution.
///
/// Loaded from versioned TOML data so the alias tables can change without
/// touching extraction or matching code.
#[derive(Debug, Clone)]
pub struct SkillVocabulary {
    version: String,
    phrases: HashMap<String, String>,
    exact_case: HashMap<String, String>,
    categories: HashMap<String, String>,
    fuzzy_terms: BTreeMap<String, String>,
    stopwords: HashSet<String>,
    max_phrase_words: usize,
}

/// Lower-cases and collapses inner whitespace.
pub fn phrase_key(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

impl SkillVocabulary {
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_VOCABULARY)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CopilotError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: VocabularyFile =
            toml::from_str(content).map_err(|e| CopilotError::ConfigValidationError {
                field: "vocabulary".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;

        let mut vocabulary = SkillVocabulary {
            version: file.version,
            phrases: HashMap::new(),
            exact_case: HashMap::new(),
            categories: HashMap::new(),
            fuzzy_terms: BTreeMap::new(),
            stopwords: file
                .fuzzy
                .stopwords
                .iter()
                .map(|w| phrase_key(w))
                .collect(),
            max_phrase_words: 1,
        };

        for entry in file.skills {
            let canonical = phrase_key(&entry.name);
            if canonical.is_empty() {
                return Err(CopilotError::ConfigValidationError {
                    field: "vocabulary.skills".to_string(),
                    message: "skill name cannot be empty".to_string(),
                });
            }
            vocabulary
                .categories
                .insert(canonical.clone(), entry.category.clone());

            for form in &entry.case_sensitive {
                vocabulary
                    .exact_case
                    .insert(form.trim().to_string(), canonical.clone());
            }

            let mut forms = entry.aliases.clone();
            if entry.case_sensitive.is_empty() {
                forms.push(entry.name.clone());
            }
            for form in forms {
                vocabulary.insert_phrase(&form, &canonical)?;
            }
        }

        tracing::debug!(
            "Loaded skill vocabulary {} ({} skills, {} phrases)",
            vocabulary.version,
            vocabulary.categories.len(),
            vocabulary.phrases.len()
        );

        Ok(vocabulary)
    }

    fn insert_phrase(&mut self, form: &str, canonical: &str) -> Result<()> {
        let key = phrase_key(form);
        if key.is_empty() {
            return Ok(());
        }
        if let Some(existing) = self.phrases.get(&key) {
            if existing != canonical {
                return Err(CopilotError::InvalidConfigValueError {
                    field: "vocabulary.skills".to_string(),
                    value: key,
                    reason: format!("alias already maps to '{}'", existing),
                });
            }
        }

        let words = key.split(' ').count();
        self.max_phrase_words = self.max_phrase_words.max(words);
        if words == 1 {
            self.fuzzy_terms.insert(key.clone(), canonical.to_string());
        }
        self.phrases.insert(key, canonical.to_string());
        Ok(())
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn max_phrase_words(&self) -> usize {
        self.max_phrase_words
    }

    /// Looks up an already lower-cased, single-spaced phrase.
    pub fn lookup_phrase(&self, key: &str) -> Option<&str> {
        self.phrases.get(key).map(String::as_str)
    }

    pub fn lookup_exact_case(&self, surface: &str) -> Option<&str> {
        self.exact_case.get(surface).map(String::as_str)
    }

    /// Single-word forms in sorted order, so fuzzy ties resolve the same way
    /// on every run.
    pub fn fuzzy_terms(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fuzzy_terms
            .iter()
            .map(|(term, canonical)| (term.as_str(), canonical.as_str()))
    }

    pub fn is_stopword(&self, key: &str) -> bool {
        self.stopwords.contains(key)
    }

    pub fn category_of(&self, canonical: &str) -> Option<&str> {
        self.categories.get(canonical).map(String::as_str)
    }

    /// Normalizes a free-form skill string: alias resolution when the
    /// vocabulary knows it, otherwise lower-cased with single spaces.
    pub fn normalize_skill(&self, raw: &str) -> String {
        if let Some(canonical) = self.lookup_exact_case(raw.trim()) {
            return canonical.to_string();
        }
        let key = phrase_key(raw);
        match self.lookup_phrase(&key) {
            Some(canonical) => canonical.to_string(),
            None => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_vocabulary_loads() {
        let vocabulary = SkillVocabulary::builtin().unwrap();
        assert!(!vocabulary.version().is_empty());
        assert!(vocabulary.len() > 50);
        assert!(vocabulary.max_phrase_words() >= 3);
    }

    #[test]
    fn test_normalize_skill_resolves_aliases() {
        let vocabulary = SkillVocabulary::builtin().unwrap();
        assert_eq!(vocabulary.normalize_skill("JS"), "javascript");
        assert_eq!(vocabulary.normalize_skill("  Google   Cloud "), "gcp");
        assert_eq!(vocabulary.normalize_skill("Golang"), "go");
        assert_eq!(vocabulary.normalize_skill("Go"), "go");
        assert_eq!(
            vocabulary.normalize_skill("Underwater Basket Weaving"),
            "underwater basket weaving"
        );
    }

    #[test]
    fn test_case_sensitive_forms_are_not_phrases() {
        let vocabulary = SkillVocabulary::builtin().unwrap();
        assert_eq!(vocabulary.lookup_phrase("go"), None);
        assert_eq!(vocabulary.lookup_exact_case("Go"), Some("go"));
        assert_eq!(vocabulary.lookup_exact_case("GO"), None);
    }

    #[test]
    fn test_conflicting_alias_is_rejected() {
        let content = r#"
version = "test"

[[skills]]
name = "javascript"
category = "languages"
aliases = ["js"]

[[skills]]
name = "jscript"
category = "languages"
aliases = ["js"]
"#;
        let err = SkillVocabulary::from_toml_str(content).unwrap_err();
        assert!(matches!(err, CopilotError::InvalidConfigValueError { .. }));
    }

    #[test]
    fn test_categories_follow_canonical_names() {
        let vocabulary = SkillVocabulary::builtin().unwrap();
        assert_eq!(vocabulary.category_of("postgresql"), Some("databases"));
        assert_eq!(vocabulary.category_of("postgres"), None);
    }
}

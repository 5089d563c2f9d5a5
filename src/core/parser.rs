use crate::core::details::DetailsExtractor;
use crate::core::extractor::EntityExtractor;
use crate::core::normalizer::TextNormalizer;
use crate::core::record_builder::RecordBuilder;
use crate::core::segmenter::SectionSegmenter;
use crate::core::vocabulary::SkillVocabulary;
use crate::domain::model::{CanonicalRecord, RecordType, SkillRequirements};
use crate::utils::error::Result;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserSettings {
    pub repeated_line_threshold: usize,
    pub max_heading_chars: usize,
    pub fuzzy_min_token_chars: usize,
    pub max_edit_distance: usize,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            repeated_line_threshold: 3,
            max_heading_chars: 40,
            fuzzy_min_token_chars: 5,
            max_edit_distance: 1,
        }
    }
}

/// Raw document text to `CanonicalRecord`: normalize, segment, extract, build.
#[derive(Debug, Clone)]
pub struct DocumentParser {
    vocabulary: Arc<SkillVocabulary>,
    normalizer: TextNormalizer,
    segmenter: SectionSegmenter,
    extractor: EntityExtractor,
    details: DetailsExtractor,
    builder: RecordBuilder,
}

impl DocumentParser {
    pub fn new(vocabulary: Arc<SkillVocabulary>, settings: ParserSettings) -> Result<Self> {
        Ok(Self {
            normalizer: TextNormalizer::new(settings.repeated_line_threshold)?,
            segmenter: SectionSegmenter::new(settings.max_heading_chars)?,
            extractor: EntityExtractor::new(
                Arc::clone(&vocabulary),
                settings.fuzzy_min_token_chars,
                settings.max_edit_distance,
            )?,
            details: DetailsExtractor::new()?,
            builder: RecordBuilder::new(Arc::clone(&vocabulary)),
            vocabulary,
        })
    }

    pub fn with_builtin_vocabulary() -> Result<Self> {
        Self::new(Arc::new(SkillVocabulary::builtin()?), ParserSettings::default())
    }

    pub fn vocabulary(&self) -> &SkillVocabulary {
        &self.vocabulary
    }

    pub fn parse(&self, raw: &str, record_type: RecordType) -> Result<CanonicalRecord> {
        let text = self.normalizer.normalize(raw)?;

        let sections: Vec<_> = self.segmenter.segment(&text).collect();
        let entities: Vec<_> = sections
            .iter()
            .enumerate()
            .flat_map(|(index, section)| self.extractor.extract(section, index))
            .collect();

        let contact = self.details.extract_contact(&text);
        let posting = match record_type {
            RecordType::JobPosting => Some(self.details.extract_posting(&text, &sections)),
            RecordType::Resume => None,
        };

        tracing::debug!(
            "Parsed {} into {} sections and {} entities",
            record_type,
            sections.len(),
            entities.len()
        );

        self.builder
            .build(record_type, sections, entities, contact, posting)
    }

    /// Normalizes caller-supplied requirement lists through the vocabulary so
    /// they compare against extracted skills.
    pub fn normalize_requirements(&self, requirements: &SkillRequirements) -> SkillRequirements {
        let normalize = |skills: &std::collections::BTreeSet<String>| {
            skills
                .iter()
                .map(|skill| self.vocabulary.normalize_skill(skill))
                .filter(|skill| !skill.is_empty())
                .collect()
        };
        SkillRequirements {
            required: normalize(&requirements.required),
            nice_to_have: normalize(&requirements.nice_to_have),
        }
    }
}

use crate::core::vocabulary::SkillVocabulary;
use crate::domain::model::{
    CanonicalRecord, ContactInfo, DocumentSection, Entity, EntityKind, PostingDetails, RecordType,
};
use crate::utils::error::{CopilotError, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

const UNCATEGORIZED: &str = "other";

/// Assembles extracted entities into a validated `CanonicalRecord`.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    vocabulary: Arc<SkillVocabulary>,
}

impl RecordBuilder {
    pub fn new(vocabulary: Arc<SkillVocabulary>) -> Self {
        Self { vocabulary }
    }

    pub fn build(
        &self,
        record_type: RecordType,
        sections: Vec<DocumentSection>,
        entities: Vec<Entity>,
        contact: ContactInfo,
        posting: Option<PostingDetails>,
    ) -> Result<CanonicalRecord> {
        if let Some(orphan) = entities.iter().find(|e| e.source_section >= sections.len()) {
            return Err(CopilotError::processing(format!(
                "entity '{}' references section {} but only {} sections exist",
                orphan.surface_form,
                orphan.source_section,
                sections.len()
            )));
        }

        let mut skills = BTreeSet::new();
        let mut degrees = BTreeSet::new();
        let mut titles = Vec::new();
        let mut organizations = Vec::new();
        let mut dates = Vec::new();

        for entity in &entities {
            let value = entity.normalized_form.clone();
            match entity.kind {
                EntityKind::Skill => {
                    skills.insert(value);
                }
                EntityKind::Degree => {
                    degrees.insert(value);
                }
                EntityKind::Title => push_unique(&mut titles, value),
                EntityKind::Organization => push_unique(&mut organizations, value),
                EntityKind::Date => push_unique(&mut dates, value),
            }
        }

        if skills.is_empty() && titles.is_empty() {
            return Err(CopilotError::EmptyRecordError { record_type });
        }

        let mut skill_categories: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for skill in &skills {
            let category = self
                .vocabulary
                .category_of(skill)
                .unwrap_or(UNCATEGORIZED)
                .to_string();
            skill_categories
                .entry(category)
                .or_default()
                .insert(skill.clone());
        }

        tracing::debug!(
            "Built {} record: {} skills, {} titles, {} organizations",
            record_type,
            skills.len(),
            titles.len(),
            organizations.len()
        );

        Ok(CanonicalRecord {
            record_type,
            skills,
            titles,
            organizations,
            degrees,
            dates,
            skill_categories,
            contact,
            posting,
            entities,
            raw_sections: sections,
        })
    }
}

fn push_unique(values: &mut Vec<String>, value: String) {
    if !values.contains(&value) {
        values.push(value);
    }
}

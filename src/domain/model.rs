use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Resume,
    JobPosting,
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Resume => write!(f, "resume"),
            RecordType::JobPosting => write!(f, "job posting"),
        }
    }
}

/// Closed set of section labels. Headings that are recognized but carry no
/// extraction meaning land in `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionLabel {
    Experience,
    Skills,
    Education,
    Summary,
    Other,
}

/// A labeled span of normalized text. `text` is exactly
/// `normalized[start_offset..end_offset]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub label: SectionLabel,
    pub text: String,
    pub start_offset: usize,
    pub end_offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Skill,
    Title,
    Organization,
    Date,
    Degree,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub surface_form: String,
    pub normalized_form: String,
    /// Index into the owning record's `raw_sections`.
    pub source_section: usize,
    /// Byte offset of `surface_form` in the normalized document.
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub linkedin: Option<String>,
    pub github: Option<String>,
}

/// Posting-level facts pulled from a job description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingDetails {
    pub job_title: Option<String>,
    pub seniority: Option<String>,
    pub employment_types: Vec<String>,
    pub salary_range: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub company_size: Option<String>,
    pub responsibilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub record_type: RecordType,
    pub skills: BTreeSet<String>,
    pub titles: Vec<String>,
    pub organizations: Vec<String>,
    pub degrees: BTreeSet<String>,
    pub dates: Vec<String>,
    pub skill_categories: BTreeMap<String, BTreeSet<String>>,
    pub contact: ContactInfo,
    pub posting: Option<PostingDetails>,
    pub entities: Vec<Entity>,
    pub raw_sections: Vec<DocumentSection>,
}

impl CanonicalRecord {
    pub fn entities_of(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }

    pub fn section_of(&self, entity: &Entity) -> Option<&DocumentSection> {
        self.raw_sections.get(entity.source_section)
    }
}

/// Required vs nice-to-have skills for a posting, supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRequirements {
    #[serde(default)]
    pub required: BTreeSet<String>,
    #[serde(default)]
    pub nice_to_have: BTreeSet<String>,
}

impl SkillRequirements {
    pub fn is_empty(&self) -> bool {
        self.required.is_empty() && self.nice_to_have.is_empty()
    }

    pub fn all_skills(&self) -> BTreeSet<String> {
        self.required.union(&self.nice_to_have).cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticMatch {
    pub job_skill: String,
    pub resume_skill: String,
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub score: f64,
    pub matched_skills: BTreeSet<String>,
    pub missing_required_skills: BTreeSet<String>,
    pub missing_nice_to_have_skills: BTreeSet<String>,
    pub semantic_matches: Vec<SemanticMatch>,
    pub no_requirements_listed: bool,
    pub provider: String,
}

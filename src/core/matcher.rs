use crate::domain::model::{
    CanonicalRecord, MatchReport, RecordType, SemanticMatch, SkillRequirements,
};
use crate::domain::ports::SimilarityProvider;
use crate::utils::error::{CopilotError, Result};
use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherSettings {
    pub semantic_threshold: f32,
    pub required_weight: f64,
    pub nice_to_have_weight: f64,
    pub similarity_timeout: Duration,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            semantic_threshold: 0.75,
            required_weight: 2.0,
            nice_to_have_weight: 1.0,
            similarity_timeout: Duration::from_millis(2_000),
        }
    }
}

/// Scores a resume against a job posting's required and nice-to-have skills.
///
/// Exact matches are taken first; every remaining job skill is compared with
/// each resume skill through the injected provider and counts as matched when
/// the best similarity is strictly above `semantic_threshold`.
pub struct SkillMatcher<P: SimilarityProvider> {
    provider: P,
    settings: MatcherSettings,
}

impl<P: SimilarityProvider> SkillMatcher<P> {
    pub fn new(provider: P, settings: MatcherSettings) -> Self {
        Self { provider, settings }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn settings(&self) -> &MatcherSettings {
        &self.settings
    }

    pub async fn match_records(
        &self,
        resume: &CanonicalRecord,
        job: &CanonicalRecord,
        requirements: &SkillRequirements,
    ) -> Result<MatchReport> {
        if resume.skills.is_empty() {
            return Err(CopilotError::InsufficientDataError {
                side: RecordType::Resume,
            });
        }

        // A skill listed as both required and nice-to-have counts once, as required.
        let required = &requirements.required;
        let nice_to_have: BTreeSet<String> = requirements
            .nice_to_have
            .difference(required)
            .cloned()
            .collect();

        if required.is_empty() && nice_to_have.is_empty() {
            tracing::warn!("Job posting lists no requirements; score is 0");
            return Ok(MatchReport {
                score: 0.0,
                matched_skills: BTreeSet::new(),
                missing_required_skills: BTreeSet::new(),
                missing_nice_to_have_skills: BTreeSet::new(),
                semantic_matches: Vec::new(),
                no_requirements_listed: true,
                provider: self.provider.name().to_string(),
            });
        }
        if job.skills.is_empty() {
            return Err(CopilotError::InsufficientDataError {
                side: RecordType::JobPosting,
            });
        }

        let wanted: BTreeSet<String> = required.union(&nice_to_have).cloned().collect();
        let mut matched: BTreeSet<String> =
            wanted.intersection(&resume.skills).cloned().collect();

        let mut semantic_matches = Vec::new();
        for job_skill in wanted.difference(&resume.skills) {
            let best = self.best_match(job_skill, &resume.skills).await?;
            if let Some((resume_skill, similarity)) = best {
                if similarity > self.settings.semantic_threshold {
                    tracing::debug!(
                        "Semantic match '{}' ~ '{}' ({:.3})",
                        job_skill,
                        resume_skill,
                        similarity
                    );
                    matched.insert(job_skill.clone());
                    semantic_matches.push(SemanticMatch {
                        job_skill: job_skill.clone(),
                        resume_skill,
                        similarity,
                    });
                }
            }
        }

        let score = self.score(&matched, required, &nice_to_have);
        let missing_required_skills = required.difference(&matched).cloned().collect();
        let missing_nice_to_have_skills = nice_to_have.difference(&matched).cloned().collect();

        tracing::info!(
            "Match score {:.3} ({} of {} job skills matched, {} semantic)",
            score,
            matched.len(),
            wanted.len(),
            semantic_matches.len()
        );

        Ok(MatchReport {
            score,
            matched_skills: matched,
            missing_required_skills,
            missing_nice_to_have_skills,
            semantic_matches,
            no_requirements_listed: false,
            provider: self.provider.name().to_string(),
        })
    }

    /// Highest-scoring resume skill for `job_skill`; the first one in sorted
    /// order wins a tie.
    async fn best_match(
        &self,
        job_skill: &str,
        resume_skills: &BTreeSet<String>,
    ) -> Result<Option<(String, f32)>> {
        let mut best: Option<(String, f32)> = None;
        for resume_skill in resume_skills {
            let similarity = self.bounded_similarity(job_skill, resume_skill).await?;
            if best.as_ref().map_or(true, |(_, current)| similarity > *current) {
                best = Some((resume_skill.clone(), similarity));
            }
        }
        Ok(best)
    }

    async fn bounded_similarity(&self, a: &str, b: &str) -> Result<f32> {
        let similarity = tokio::time::timeout(
            self.settings.similarity_timeout,
            self.provider.similarity(a, b),
        )
        .await
        .map_err(|_| {
            CopilotError::embedding_unavailable(format!(
                "{} provider timed out after {} ms comparing '{}' and '{}'",
                self.provider.name(),
                self.settings.similarity_timeout.as_millis(),
                a,
                b
            ))
        })??;

        if similarity.is_nan() {
            return Err(CopilotError::embedding_unavailable(format!(
                "{} provider returned NaN for '{}' and '{}'",
                self.provider.name(),
                a,
                b
            )));
        }
        Ok(similarity.clamp(0.0, 1.0))
    }

    fn score(
        &self,
        matched: &BTreeSet<String>,
        required: &BTreeSet<String>,
        nice_to_have: &BTreeSet<String>,
    ) -> f64 {
        let weight_r = self.settings.required_weight;
        let weight_n = self.settings.nice_to_have_weight;
        let denominator = weight_r * required.len() as f64 + weight_n * nice_to_have.len() as f64;
        if denominator <= 0.0 {
            return 0.0;
        }
        let numerator = weight_r * matched.intersection(required).count() as f64
            + weight_n * matched.intersection(nice_to_have).count() as f64;
        (numerator / denominator).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{ContactInfo, SectionLabel};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap};

    struct StubProvider {
        scores: HashMap<(String, String), f32>,
        delay: Option<Duration>,
    }

    impl StubProvider {
        fn new(pairs: &[(&str, &str, f32)]) -> Self {
            Self {
                scores: pairs
                    .iter()
                    .map(|(a, b, s)| ((a.to_string(), b.to_string()), *s))
                    .collect(),
                delay: None,
            }
        }
    }

    #[async_trait]
    impl SimilarityProvider for StubProvider {
        async fn similarity(&self, a: &str, b: &str) -> Result<f32> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if a == b {
                return Ok(1.0);
            }
            Ok(*self.scores.get(&(a.to_string(), b.to_string())).unwrap_or(&0.1))
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    fn record(record_type: RecordType, skills: &[&str]) -> CanonicalRecord {
        CanonicalRecord {
            record_type,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            titles: Vec::new(),
            organizations: Vec::new(),
            degrees: BTreeSet::new(),
            dates: Vec::new(),
            skill_categories: BTreeMap::new(),
            contact: ContactInfo::default(),
            posting: None,
            entities: Vec::new(),
            raw_sections: vec![crate::domain::model::DocumentSection {
                label: SectionLabel::Summary,
                text: String::new(),
                start_offset: 0,
                end_offset: 0,
            }],
        }
    }

    fn requirements(required: &[&str], nice: &[&str]) -> SkillRequirements {
        SkillRequirements {
            required: required.iter().map(|s| s.to_string()).collect(),
            nice_to_have: nice.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn set(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_weighted_score_with_missing_required_skill() {
        let matcher = SkillMatcher::new(
            StubProvider::new(&[("aws", "python", 0.3), ("aws", "sql", 0.2)]),
            MatcherSettings::default(),
        );
        let resume = record(RecordType::Resume, &["python", "sql"]);
        let job = record(RecordType::JobPosting, &["python", "aws", "sql"]);

        let report = matcher
            .match_records(&resume, &job, &requirements(&["python", "aws"], &["sql"]))
            .await
            .unwrap();

        assert_eq!(report.matched_skills, set(&["python", "sql"]));
        assert!((report.score - 0.6).abs() < 1e-9);
        assert_eq!(report.missing_required_skills, set(&["aws"]));
        assert!(report.missing_nice_to_have_skills.is_empty());
        assert!(report.semantic_matches.is_empty());
        assert!(!report.no_requirements_listed);
        assert_eq!(report.provider, "stub");
    }

    #[tokio::test]
    async fn test_semantic_match_above_threshold() {
        let matcher = SkillMatcher::new(
            StubProvider::new(&[("postgresql", "mysql", 0.8), ("kafka", "mysql", 0.75)]),
            MatcherSettings::default(),
        );
        let resume = record(RecordType::Resume, &["mysql"]);
        let job = record(RecordType::JobPosting, &["postgresql", "kafka"]);

        let report = matcher
            .match_records(&resume, &job, &requirements(&["postgresql"], &["kafka"]))
            .await
            .unwrap();

        // 0.75 is not strictly above the threshold.
        assert_eq!(report.matched_skills, set(&["postgresql"]));
        assert_eq!(report.missing_nice_to_have_skills, set(&["kafka"]));
        assert_eq!(
            report.semantic_matches,
            vec![SemanticMatch {
                job_skill: "postgresql".to_string(),
                resume_skill: "mysql".to_string(),
                similarity: 0.8,
            }]
        );
        assert!((report.score - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_requirements_flag_without_error() {
        let matcher = SkillMatcher::new(StubProvider::new(&[]), MatcherSettings::default());
        let resume = record(RecordType::Resume, &["python"]);
        let job = record(RecordType::JobPosting, &["python"]);

        let report = matcher
            .match_records(&resume, &job, &SkillRequirements::default())
            .await
            .unwrap();

        assert_eq!(report.score, 0.0);
        assert!(report.no_requirements_listed);
        assert!(report.matched_skills.is_empty());
    }

    #[tokio::test]
    async fn test_skill_less_posting_without_requirements_is_flagged() {
        let matcher = SkillMatcher::new(StubProvider::new(&[]), MatcherSettings::default());
        let resume = record(RecordType::Resume, &["python"]);
        let job = record(RecordType::JobPosting, &[]);

        let report = matcher
            .match_records(&resume, &job, &SkillRequirements::default())
            .await
            .unwrap();

        assert_eq!(report.score, 0.0);
        assert!(report.no_requirements_listed);
    }

    #[tokio::test]
    async fn test_record_without_skills_is_insufficient() {
        let matcher = SkillMatcher::new(StubProvider::new(&[]), MatcherSettings::default());
        let with_skills = record(RecordType::Resume, &["python"]);
        let without = record(RecordType::JobPosting, &[]);
        let reqs = requirements(&["python"], &[]);

        let err = matcher
            .match_records(&with_skills, &without, &reqs)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CopilotError::InsufficientDataError {
                side: RecordType::JobPosting
            }
        ));

        let empty_resume = record(RecordType::Resume, &[]);
        let job = record(RecordType::JobPosting, &["python"]);
        let err = matcher
            .match_records(&empty_resume, &job, &reqs)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CopilotError::InsufficientDataError {
                side: RecordType::Resume
            }
        ));
    }

    #[tokio::test]
    async fn test_slow_provider_is_embedding_unavailable() {
        let mut provider = StubProvider::new(&[]);
        provider.delay = Some(Duration::from_millis(200));
        let settings = MatcherSettings {
            similarity_timeout: Duration::from_millis(10),
            ..MatcherSettings::default()
        };
        let matcher = SkillMatcher::new(provider, settings);
        let resume = record(RecordType::Resume, &["python"]);
        let job = record(RecordType::JobPosting, &["rust"]);

        let err = matcher
            .match_records(&resume, &job, &requirements(&["rust"], &[]))
            .await
            .unwrap_err();
        assert!(matches!(err, CopilotError::EmbeddingUnavailableError { .. }));
    }

    #[test]
    fn test_full_coverage_scores_one_and_is_reproducible() {
        let matcher = SkillMatcher::new(StubProvider::new(&[]), MatcherSettings::default());
        let resume = record(RecordType::Resume, &["python", "sql", "docker"]);
        let job = record(RecordType::JobPosting, &["python", "sql"]);
        let reqs = requirements(&["python"], &["sql", "python"]);

        let first = tokio_test::block_on(matcher.match_records(&resume, &job, &reqs)).unwrap();
        let second = tokio_test::block_on(matcher.match_records(&resume, &job, &reqs)).unwrap();

        assert_eq!(first.score, 1.0);
        assert_eq!(first, second);
        assert!(first.missing_required_skills.is_empty());
        assert!(first.missing_nice_to_have_skills.is_empty());
    }

    #[tokio::test]
    async fn test_score_stays_in_bounds() {
        let matcher = SkillMatcher::new(StubProvider::new(&[]), MatcherSettings::default());
        let resume = record(RecordType::Resume, &["go"]);
        let job = record(RecordType::JobPosting, &["rust", "go", "java"]);
        let cases = [
            requirements(&["rust"], &[]),
            requirements(&["rust", "go"], &["java"]),
            requirements(&[], &["go"]),
            requirements(&["go"], &["go"]),
        ];
        for reqs in cases {
            let report = matcher.match_records(&resume, &job, &reqs).await.unwrap();
            assert!((0.0..=1.0).contains(&report.score));
            let all = reqs.all_skills();
            assert_eq!(report.score == 1.0, report.matched_skills.is_superset(&all));
        }
    }
}

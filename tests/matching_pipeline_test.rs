use anyhow::Result;
use async_trait::async_trait;
use career_copilot::{
    CopilotEngine, CopilotError, DocumentParser, MatcherSettings, RecordType, Requirements,
    SimilarityProvider, SkillMatcher, SkillRequirements,
};
use std::collections::BTreeSet;

/// Scores only identical strings as similar, and counts calls.
struct ExactOnly {
    calls: std::sync::atomic::AtomicUsize,
}

#[async_trait]
impl SimilarityProvider for ExactOnly {
    async fn similarity(&self, a: &str, b: &str) -> career_copilot::Result<f32> {
        self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(if a == b { 1.0 } else { 0.1 })
    }

    fn name(&self) -> &str {
        "exact-only"
    }
}

fn engine() -> CopilotEngine<ExactOnly> {
    CopilotEngine::new(
        DocumentParser::with_builtin_vocabulary().unwrap(),
        SkillMatcher::new(
            ExactOnly {
                calls: Default::default(),
            },
            MatcherSettings::default(),
        ),
        4,
    )
}

fn skills(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|s| s.to_string()).collect()
}

const RESUME: &str = "Sam Rivera\nsam.rivera@example.com\n\nSummary\nData engineer who likes tidy pipelines.\n\nSkills\n• Python\n• SQL\n\nExperience\nData Engineer\nGlobex Inc\nMar 2020 - Present\nMaintained reporting jobs\n\nEducation\nB.S. Mathematics, 2016";

const JOB: &str = "Data Platform Engineer\nFull-time | Remote\n\nRequirements:\n- Python\n- AWS\n\nNice to have:\n- SQL\n\nBenefits\nFlexible hours";

#[tokio::test]
async fn test_weighted_score_from_raw_documents() -> Result<()> {
    let requirements = Requirements::Supplied(SkillRequirements {
        required: skills(&["Python", "Amazon Web Services"]),
        nice_to_have: skills(&["sql"]),
    });

    let evaluation = engine().evaluate(RESUME, JOB, &requirements).await?;

    assert_eq!(evaluation.resume.skills, skills(&["python", "sql"]));
    assert_eq!(evaluation.requirements.required, skills(&["aws", "python"]));

    let report = &evaluation.report;
    assert_eq!(report.matched_skills, skills(&["python", "sql"]));
    assert!((report.score - 0.6).abs() < 1e-9);
    assert_eq!(report.missing_required_skills, skills(&["aws"]));
    assert!(report.missing_nice_to_have_skills.is_empty());
    assert_eq!(report.provider, "exact-only");

    let posting = evaluation.job.posting.as_ref().unwrap();
    assert_eq!(posting.job_title.as_deref(), Some("Data Platform Engineer"));
    assert_eq!(posting.employment_types, vec!["full-time", "remote"]);
    Ok(())
}

#[tokio::test]
async fn test_empty_requirements_are_flagged_not_failed() -> Result<()> {
    let evaluation = engine()
        .evaluate(
            RESUME,
            JOB,
            &Requirements::Supplied(SkillRequirements::default()),
        )
        .await?;

    assert_eq!(evaluation.report.score, 0.0);
    assert!(evaluation.report.no_requirements_listed);
    Ok(())
}

#[tokio::test]
async fn test_resume_without_skills_or_titles_is_empty_record() {
    let err = engine()
        .evaluate(
            "Hello there\n\nI enjoy long walks and good coffee.",
            JOB,
            &Requirements::AllJobSkillsRequired,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CopilotError::EmptyRecordError {
            record_type: RecordType::Resume
        }
    ));
}

#[tokio::test]
async fn test_resume_with_titles_but_no_skills_is_insufficient() {
    let resume = "Experience\nOffice Manager\nInitech LLC\n2012 - 2019";
    let err = engine()
        .evaluate(resume, JOB, &Requirements::AllJobSkillsRequired)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CopilotError::InsufficientDataError {
            side: RecordType::Resume
        }
    ));
}

#[test]
fn test_duplicate_skill_mentions_collapse() {
    let parser = DocumentParser::with_builtin_vocabulary().unwrap();
    let record = parser
        .parse("Skills\nPython, python\n\nProjects\nA CLI in Python", RecordType::Resume)
        .unwrap();
    assert_eq!(record.skills, skills(&["python"]));
}

#[test]
fn test_sections_reconstruct_normalized_text() {
    let parser = DocumentParser::with_builtin_vocabulary().unwrap();
    let record = parser.parse(RESUME, RecordType::Resume).unwrap();

    let rebuilt: String = record.raw_sections.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(record.raw_sections.first().unwrap().start_offset, 0);
    assert_eq!(record.raw_sections.last().unwrap().end_offset, rebuilt.len());
    for pair in record.raw_sections.windows(2) {
        assert_eq!(pair[0].end_offset, pair[1].start_offset);
    }
    assert!(!rebuilt.contains("  "));
    assert!(!rebuilt.contains('•'));
}

#[test]
fn test_running_headers_are_removed_before_extraction() {
    let raw = "Sam Rivera | Resume\nSkills\nRust\n\x0cSam Rivera | Resume\nExperience\nBackend Engineer\nAcme Corp\n\x0cSam Rivera | Resume\nEducation\nMSc Physics";
    let parser = DocumentParser::with_builtin_vocabulary().unwrap();
    let record = parser.parse(raw, RecordType::Resume).unwrap();

    assert!(record
        .raw_sections
        .iter()
        .all(|s| !s.text.contains("Sam Rivera | Resume")));
    assert_eq!(record.titles, vec!["backend engineer"]);
    assert!(record.degrees.contains("master"));
}

#[tokio::test]
async fn test_repeated_evaluation_is_identical() -> Result<()> {
    let engine = engine();
    let first = engine
        .evaluate(RESUME, JOB, &Requirements::AllJobSkillsRequired)
        .await?;
    let second = engine
        .evaluate(RESUME, JOB, &Requirements::AllJobSkillsRequired)
        .await?;
    assert_eq!(first.report, second.report);
    assert_eq!(first.resume, second.resume);
    Ok(())
}

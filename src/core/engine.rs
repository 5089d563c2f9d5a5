use crate::core::matcher::SkillMatcher;
use crate::core::parser::DocumentParser;
use crate::domain::model::{CanonicalRecord, MatchReport, RecordType, SkillRequirements};
use crate::domain::ports::SimilarityProvider;
use crate::utils::error::{CopilotError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Where the required/nice-to-have split for a posting comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirements {
    /// Caller-supplied lists, normalized through the vocabulary before use.
    Supplied(SkillRequirements),
    /// Every skill found in the posting counts as required.
    AllJobSkillsRequired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub resume: CanonicalRecord,
    pub job: CanonicalRecord,
    pub requirements: SkillRequirements,
    pub report: MatchReport,
}

#[derive(Debug, Clone)]
pub struct ResumeInput {
    pub id: String,
    pub text: String,
}

/// One resume's outcome in a batch. Failures stay attached to the resume they
/// belong to instead of aborting the batch.
#[derive(Debug)]
pub struct BatchOutcome {
    pub resume_id: String,
    pub result: Result<MatchReport>,
}

pub struct CopilotEngine<P: SimilarityProvider + 'static> {
    parser: Arc<DocumentParser>,
    matcher: Arc<SkillMatcher<P>>,
    concurrent_requests: usize,
}

impl<P: SimilarityProvider + 'static> CopilotEngine<P> {
    pub fn new(
        parser: DocumentParser,
        matcher: SkillMatcher<P>,
        concurrent_requests: usize,
    ) -> Self {
        Self {
            parser: Arc::new(parser),
            matcher: Arc::new(matcher),
            concurrent_requests: concurrent_requests.max(1),
        }
    }

    pub fn parser(&self) -> &DocumentParser {
        &self.parser
    }

    pub fn parse(&self, text: &str, record_type: RecordType) -> Result<CanonicalRecord> {
        self.parser.parse(text, record_type)
    }

    pub fn resolve_requirements(
        &self,
        job: &CanonicalRecord,
        requirements: &Requirements,
    ) -> SkillRequirements {
        match requirements {
            Requirements::Supplied(listed) => self.parser.normalize_requirements(listed),
            Requirements::AllJobSkillsRequired => SkillRequirements {
                required: job.skills.clone(),
                nice_to_have: Default::default(),
            },
        }
    }

    pub async fn evaluate(
        &self,
        resume_text: &str,
        job_text: &str,
        requirements: &Requirements,
    ) -> Result<Evaluation> {
        tracing::info!("Parsing resume and job posting");
        let resume = self.parser.parse(resume_text, RecordType::Resume)?;
        let job = self.parser.parse(job_text, RecordType::JobPosting)?;
        let requirements = self.resolve_requirements(&job, requirements);

        tracing::info!(
            "Matching {} resume skills against {} required and {} nice-to-have skills",
            resume.skills.len(),
            requirements.required.len(),
            requirements.nice_to_have.len()
        );
        let report = self
            .matcher
            .match_records(&resume, &job, &requirements)
            .await?;

        Ok(Evaluation {
            resume,
            job,
            requirements,
            report,
        })
    }

    /// Matches many resumes against one posting with at most
    /// `concurrent_requests` evaluations in flight. Outcomes come back in
    /// input order. Only a job posting that fails to parse aborts the batch.
    pub async fn evaluate_batch(
        &self,
        resumes: Vec<ResumeInput>,
        job_text: &str,
        requirements: &Requirements,
    ) -> Result<Vec<BatchOutcome>> {
        let job = Arc::new(self.parser.parse(job_text, RecordType::JobPosting)?);
        let requirements = Arc::new(self.resolve_requirements(&job, requirements));
        let semaphore = Arc::new(Semaphore::new(self.concurrent_requests));

        tracing::info!(
            "Evaluating {} resumes (concurrency {})",
            resumes.len(),
            self.concurrent_requests
        );

        let total = resumes.len();
        let mut tasks = JoinSet::new();
        for (index, input) in resumes.into_iter().enumerate() {
            let parser = Arc::clone(&self.parser);
            let matcher = Arc::clone(&self.matcher);
            let job = Arc::clone(&job);
            let requirements = Arc::clone(&requirements);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let result = match semaphore.acquire_owned().await {
                    Ok(_permit) => match parser.parse(&input.text, RecordType::Resume) {
                        Ok(resume) => matcher.match_records(&resume, &job, &requirements).await,
                        Err(e) => Err(e),
                    },
                    Err(e) => Err(CopilotError::processing(format!("semaphore closed: {}", e))),
                };
                (
                    index,
                    BatchOutcome {
                        resume_id: input.id,
                        result,
                    },
                )
            });
        }

        let mut slots: Vec<Option<BatchOutcome>> = (0..total).map(|_| None).collect();
        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = joined.map_err(|e| {
                CopilotError::processing(format!("evaluation task failed: {}", e))
            })?;
            match &outcome.result {
                Ok(report) => tracing::debug!("{}: score {:.3}", outcome.resume_id, report.score),
                Err(e) => tracing::warn!("{}: {}", outcome.resume_id, e),
            }
            slots[index] = Some(outcome);
        }

        let outcomes: Vec<BatchOutcome> = slots.into_iter().flatten().collect();
        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        tracing::info!(
            "Batch finished: {} succeeded, {} failed",
            outcomes.len() - failed,
            failed
        );
        Ok(outcomes)
    }
}

pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};

#[cfg(feature = "cli")]
use crate::utils::validation::{validate_file_extension, validate_path, Validate};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "career-copilot")]
#[command(about = "Structure resumes and job postings and score how well they match")]
pub struct CliConfig {
    /// TOML configuration file; defaults apply when omitted
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Overrides `[output] output_path`
    #[arg(long, global = true)]
    pub output_path: Option<String>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit logs as JSON")]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Parse one document into a canonical record and print it as JSON
    Parse {
        /// Extracted document text
        file: String,

        #[arg(long, value_enum, default_value = "resume")]
        kind: DocumentKind,
    },
    /// Match one resume against one job posting
    Match {
        resume: String,
        job: String,

        #[command(flatten)]
        requirements: RequirementsArgs,

        /// Also write the report as JSON under the output path
        #[arg(long)]
        save: Option<String>,
    },
    /// Match many resumes against one job posting and write a ZIP of reports
    Batch {
        job: String,

        #[arg(required = true)]
        resumes: Vec<String>,

        #[command(flatten)]
        requirements: RequirementsArgs,

        #[arg(long, default_value = "match_reports.zip")]
        archive: String,
    },
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Args)]
pub struct RequirementsArgs {
    /// TOML or JSON file with `required` and `nice_to_have` skill lists
    #[arg(long, conflicts_with = "all_required")]
    pub requirements: Option<String>,

    /// Treat every skill found in the job posting as required
    #[arg(long)]
    pub all_required: bool,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DocumentKind {
    Resume,
    Job,
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> crate::utils::error::Result<()> {
        if let Some(path) = &self.config {
            validate_path("config", path)?;
        }
        if let Some(path) = &self.output_path {
            validate_path("output_path", path)?;
        }
        let requirements = match &self.command {
            Command::Parse { file, .. } => {
                validate_path("file", file)?;
                None
            }
            Command::Match {
                resume,
                job,
                requirements,
                ..
            } => {
                validate_path("resume", resume)?;
                validate_path("job", job)?;
                Some(requirements)
            }
            Command::Batch {
                job,
                resumes,
                requirements,
                archive,
            } => {
                validate_path("job", job)?;
                for resume in resumes {
                    validate_path("resumes", resume)?;
                }
                validate_file_extension("archive", archive, &["zip"])?;
                Some(requirements)
            }
        };
        if let Some(path) = requirements.and_then(|r| r.requirements.as_ref()) {
            validate_file_extension("requirements", path, &["toml", "json"])?;
        }
        Ok(())
    }
}

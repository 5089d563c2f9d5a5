use anyhow::Context;
use career_copilot::config::{Command, DocumentKind, RequirementsArgs};
use career_copilot::utils::error::CopilotError;
use career_copilot::utils::{logger, validation::Validate};
use career_copilot::{
    load_requirements, CliConfig, CopilotConfig, LocalStorage, RecordType, ReportWriter,
    Requirements, ResumeInput, SkillRequirements,
};
use clap::Parser;
use std::path::Path;

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting career-copilot CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(err) = run(cli).await {
        let exit_code = match err.downcast_ref::<CopilotError>() {
            Some(e) => {
                tracing::error!(
                    "❌ {} (Category: {:?}, Severity: {:?})",
                    err,
                    e.category(),
                    e.severity()
                );
                tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
                eprintln!("❌ {}", e.user_friendly_message());
                eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
                e.severity().exit_code()
            }
            None => {
                tracing::error!("❌ {:#}", err);
                eprintln!("❌ {:#}", err);
                1
            }
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: CliConfig) -> anyhow::Result<()> {
    cli.validate()?;

    let mut config = match &cli.config {
        Some(path) => CopilotConfig::from_file(path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => CopilotConfig::default(),
    };
    if let Some(output_path) = &cli.output_path {
        config.output.output_path = output_path.clone();
    }
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        return Err(e.into());
    }

    let engine = config.build_engine()?;
    let writer = ReportWriter::new(LocalStorage::new(config.output_path()));

    match cli.command {
        Command::Parse { file, kind } => {
            let text = read_input(&file).await?;
            let record_type = match kind {
                DocumentKind::Resume => RecordType::Resume,
                DocumentKind::Job => RecordType::JobPosting,
            };
            let record = engine.parse(&text, record_type)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Match {
            resume,
            job,
            requirements,
            save,
        } => {
            let resume_text = read_input(&resume).await?;
            let job_text = read_input(&job).await?;
            let requirements = resolve_requirements(&requirements)?;

            let evaluation = engine
                .evaluate(&resume_text, &job_text, &requirements)
                .await?;
            println!("{}", serde_json::to_string_pretty(&evaluation.report)?);

            if let Some(filename) = save {
                let saved = writer.write_report(&evaluation, &filename).await?;
                tracing::info!("📁 Report saved to: {}/{}", config.output_path(), saved);
            }
        }
        Command::Batch {
            job,
            resumes,
            requirements,
            archive,
        } => {
            let job_text = read_input(&job).await?;
            let requirements = resolve_requirements(&requirements)?;

            let mut inputs = Vec::with_capacity(resumes.len());
            for path in &resumes {
                inputs.push(ResumeInput {
                    id: Path::new(path)
                        .file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_else(|| path.clone()),
                    text: read_input(path).await?,
                });
            }

            let outcomes = engine
                .evaluate_batch(inputs, &job_text, &requirements)
                .await?;
            for outcome in &outcomes {
                match &outcome.result {
                    Ok(report) => println!("{}\t{:.3}", outcome.resume_id, report.score),
                    Err(e) => println!("{}\terror: {}", outcome.resume_id, e),
                }
            }

            let saved = writer.write_batch(&outcomes, &archive).await?;
            println!("✅ Batch completed: {} resumes", outcomes.len());
            println!("📁 Output saved to: {}/{}", config.output_path(), saved);
        }
    }

    Ok(())
}

async fn read_input(path: &str) -> anyhow::Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(CopilotError::IoError)
        .with_context(|| format!("reading {}", path))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn resolve_requirements(args: &RequirementsArgs) -> anyhow::Result<Requirements> {
    if args.all_required {
        return Ok(Requirements::AllJobSkillsRequired);
    }
    match &args.requirements {
        Some(path) => {
            let listed = load_requirements(path)
                .with_context(|| format!("loading requirements from {}", path))?;
            Ok(Requirements::Supplied(listed))
        }
        None => {
            tracing::warn!("No requirements given; pass --requirements or --all-required");
            Ok(Requirements::Supplied(SkillRequirements::default()))
        }
    }
}

use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;

use crate::check::{self, DuplicateParagraph};
use crate::cli::{GenerateArgs, LlmEngine};
use crate::formats::{FailedRecord, PagePlanRecord};
use crate::generator::{CommandGenerator, OpenAiGenerator, SectionGenerator};
use crate::openai::Sampling;
use crate::{inject, plan, sections, sitemap};

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub out_dir: PathBuf,
    pub timeout: Duration,
    pub delay: Duration,
}

#[derive(Debug, Default)]
pub struct GenerateSummary {
    pub dry_run: bool,
    /// Output filenames a dry run would generate.
    pub would_generate: Vec<String>,
    /// Output filenames written by this run, in plan order.
    pub created: Vec<String>,
    /// Output filenames skipped because the page already exists.
    pub skipped: Vec<String>,
    pub failed: Vec<FailedRecord>,
    pub duplicates: Vec<DuplicateParagraph>,
    pub sitemap_added: usize,
    /// Set when the sitemap could not be updated. Pages stay written and the
    /// exit status is unaffected.
    pub sitemap_error: Option<String>,
}

impl GenerateSummary {
    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

pub async fn run(args: GenerateArgs) -> anyhow::Result<GenerateSummary> {
    let records = plan::read_plan(Path::new(&args.plan)).context("load plan")?;
    let template = std::fs::read_to_string(&args.template)
        .with_context(|| format!("read template: {}", args.template))?;
    inject::validate_template(&template)
        .with_context(|| format!("validate template: {}", args.template))?;
    let prompt_template = match args.prompt.as_deref() {
        Some(path) => {
            std::fs::read_to_string(path).with_context(|| format!("read prompt: {path}"))?
        }
        None => sections::DEFAULT_PROMPT.to_owned(),
    };
    let site_url = args
        .site_url
        .as_deref()
        .map(url::Url::parse)
        .transpose()
        .context("parse --site-url")?;

    let selected = &records[..records.len().min(args.limit)];
    let out_dir = PathBuf::from(&args.out);
    tracing::info!(
        plan = %args.plan,
        records = records.len(),
        selected = selected.len(),
        limit = args.limit,
        dry_run = args.dry_run,
        "generate"
    );

    if args.dry_run {
        let summary = dry_run(selected, &prompt_template, &out_dir);
        print_summary(&summary);
        return Ok(summary);
    }

    let generator = build_generator(&args)?;
    std::fs::create_dir_all(&out_dir)
        .with_context(|| format!("create output dir: {}", out_dir.display()))?;

    let options = BatchOptions {
        out_dir: out_dir.clone(),
        timeout: Duration::from_secs(args.timeout_secs),
        delay: Duration::from_millis(args.delay_ms),
    };
    let mut summary = generate_batch(
        selected,
        &template,
        &prompt_template,
        generator.as_ref(),
        &options,
    )
    .await;

    if let Some(site_url) = &site_url
        && !args.no_sitemap
        && !summary.created.is_empty()
    {
        let path = args
            .sitemap
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| out_dir.join("sitemap.xml"));
        let today = chrono::Local::now().date_naive();
        match sitemap::append_urls(&path, site_url, &summary.created, today)
            .with_context(|| format!("update sitemap: {}", path.display()))
        {
            Ok(added) => summary.sitemap_added = added,
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!(%error, "sitemap not updated");
                summary.sitemap_error = Some(error);
            }
        }
    }

    print_summary(&summary);
    Ok(summary)
}

fn build_generator(args: &GenerateArgs) -> anyhow::Result<Box<dyn SectionGenerator>> {
    match args.engine {
        LlmEngine::Openai => {
            let api_key = std::env::var("OPENAI_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY is not set"))?;
            let generator = OpenAiGenerator::new(
                &args.openai_base_url,
                api_key,
                args.openai_model.clone(),
                Sampling {
                    temperature: args.openai_temperature,
                    max_output_tokens: Some(args.openai_max_output_tokens),
                },
                Duration::from_secs(args.timeout_secs),
            )?;
            tracing::info!(engine = "openai", model = %args.openai_model, "generator ready");
            Ok(Box::new(generator))
        }
        LlmEngine::Command => {
            let Some(program) = args.command.clone() else {
                anyhow::bail!("missing --command (required when --engine=command)");
            };
            tracing::info!(engine = "command", command = %program, "generator ready");
            Ok(Box::new(CommandGenerator {
                program,
                args: args.command_args.clone(),
                model: args.openai_model.clone(),
            }))
        }
    }
}

/// Processes `records` in order, one generator call each. Failures are
/// recorded per record and never stop the batch.
pub async fn generate_batch(
    records: &[PagePlanRecord],
    template: &str,
    prompt_template: &str,
    generator: &dyn SectionGenerator,
    options: &BatchOptions,
) -> GenerateSummary {
    let mut summary = GenerateSummary::default();
    let total = records.len();

    for (idx, record) in records.iter().enumerate() {
        let file = record.output_filename.clone();
        let path = options.out_dir.join(&file);
        if path.exists() {
            tracing::info!(%file, "skip: page exists");
            summary.skipped.push(file);
            continue;
        }

        tracing::info!(%file, n = idx + 1, total, "generating");
        match materialize(record, template, prompt_template, generator, options.timeout, &path)
            .await
        {
            Ok(words) => {
                tracing::info!(%file, words, "page written");
                summary.created.push(file);
                if idx + 1 < total && !options.delay.is_zero() {
                    tokio::time::sleep(options.delay).await;
                }
            }
            Err(err) => {
                let error = format!("{err:#}");
                tracing::error!(%file, %error, "page failed");
                summary.failed.push(FailedRecord { file, error });
            }
        }
    }

    if !summary.created.is_empty() {
        let paths = summary
            .created
            .iter()
            .map(|file| options.out_dir.join(file))
            .collect::<Vec<_>>();
        summary.duplicates = check::find_duplicate_paragraphs_in_files(&paths);
        for dup in &summary.duplicates {
            tracing::warn!(
                first = %dup.first_file,
                second = %dup.second_file,
                fingerprint = %dup.fingerprint,
                "duplicate paragraph"
            );
        }
    }

    summary
}

/// Generates, injects, validates and writes one page. Returns the body's
/// word count.
async fn materialize(
    record: &PagePlanRecord,
    template: &str,
    prompt_template: &str,
    generator: &dyn SectionGenerator,
    timeout: Duration,
    path: &Path,
) -> anyhow::Result<usize> {
    let prompt = sections::build_prompt(prompt_template, record);
    let response = tokio::time::timeout(timeout, generator.generate(&prompt))
        .await
        .map_err(|_| anyhow::anyhow!("generation timed out after {}s", timeout.as_secs_f32()))?
        .context("generate sections")?;

    let content = sections::parse_response(&response)?;
    let html = inject::inject_content(template, record, &content);

    let violations = check::check_page(&html, record);
    if !violations.is_empty() {
        anyhow::bail!("integrity check failed: {}", violations.join("; "));
    }

    write_new(path, &html)?;
    Ok(sections::word_count(&content.body))
}

fn write_new(path: &Path, contents: &str) -> anyhow::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("create page: {}", path.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("write page: {}", path.display()))?;
    file.flush()
        .with_context(|| format!("flush page: {}", path.display()))?;
    Ok(())
}

fn dry_run(records: &[PagePlanRecord], prompt_template: &str, out_dir: &Path) -> GenerateSummary {
    let mut summary = GenerateSummary {
        dry_run: true,
        ..GenerateSummary::default()
    };
    for (idx, record) in records.iter().enumerate() {
        let file = &record.output_filename;
        if out_dir.join(file).exists() {
            println!("  [{:>3}/{}] {file} (skip: exists)", idx + 1, records.len());
            summary.skipped.push(file.clone());
            continue;
        }
        let prompt = sections::build_prompt(prompt_template, record);
        println!(
            "  [{:>3}/{}] {file} (would generate; {} / {} / {}; parent {}; prompt {} chars)",
            idx + 1,
            records.len(),
            record.location,
            record.category,
            record.symptom,
            record.parent_page,
            prompt.chars().count()
        );
        summary.would_generate.push(file.clone());
    }
    summary
}

fn print_summary(summary: &GenerateSummary) {
    if summary.dry_run {
        println!();
        println!("Dry run");
        println!("  would generate: {}", summary.would_generate.len());
        println!("  would skip:     {}", summary.skipped.len());
        return;
    }

    println!();
    println!("Created: {}", summary.created.len());
    for file in &summary.created {
        println!("  + {file}");
    }
    println!("Skipped: {}", summary.skipped.len());
    for file in &summary.skipped {
        println!("  ~ {file}");
    }
    println!("Failed:  {}", summary.failed.len());
    for failed in &summary.failed {
        println!("  ! {}: {}", failed.file, failed.error);
    }
    check::print_duplicates(&summary.duplicates);
    if summary.sitemap_added > 0 {
        println!("Sitemap: {} URL(s) added", summary.sitemap_added);
    }
    if let Some(error) = &summary.sitemap_error {
        println!("Sitemap: not updated ({error})");
    }
}

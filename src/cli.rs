use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Enumerate page identities into a plan JSON file.
    Plan(PlanArgs),
    /// Generate pages for the records of a plan.
    Generate(GenerateArgs),
    /// Re-validate pages of a plan that already exist.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    /// Catalog YAML (default: built-in Denver catalog).
    #[arg(long)]
    pub catalog: Option<String>,

    /// Site repository root to probe for existing pages.
    #[arg(long, default_value = ".")]
    pub root: String,

    /// Output file path for the plan JSON.
    #[arg(long)]
    pub out: String,

    /// Comma-separated location slugs to include.
    #[arg(long)]
    pub locations: Option<String>,

    /// Comma-separated category slugs to include.
    #[arg(long)]
    pub categories: Option<String>,

    /// Maximum number of records to emit.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Overwrite an existing plan file.
    #[arg(long, default_value_t = false)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LlmEngine {
    Openai,
    Command,
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Plan JSON (created by `plan`).
    #[arg(long)]
    pub plan: String,

    /// HTML template with SEO_* marker pairs.
    #[arg(long)]
    pub template: String,

    /// Prompt template file (default: built-in prompt).
    #[arg(long)]
    pub prompt: Option<String>,

    /// Directory pages are written to.
    #[arg(long, default_value = ".")]
    pub out: String,

    /// Maximum number of plan records to process.
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Report what would be generated without calling the engine or writing files.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, value_enum, default_value_t = LlmEngine::Openai)]
    pub engine: LlmEngine,

    #[arg(long, default_value = "gpt-4o")]
    pub openai_model: String,

    #[arg(long, default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    #[arg(long, default_value_t = 0.75)]
    pub openai_temperature: f32,

    #[arg(long, default_value_t = 3000)]
    pub openai_max_output_tokens: u32,

    /// Per-record generation timeout.
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Pause after each successful generation.
    #[arg(long, default_value_t = 1000)]
    pub delay_ms: u64,

    /// Public base URL of the site; enables the sitemap update.
    #[arg(long)]
    pub site_url: Option<String>,

    /// Sitemap to append to (default: `<out>/sitemap.xml`).
    #[arg(long)]
    pub sitemap: Option<String>,

    #[arg(long, default_value_t = false)]
    pub no_sitemap: bool,

    /// Generator program for `--engine command` (reads the prompt on stdin).
    #[arg(long)]
    pub command: Option<String>,

    /// Arguments passed to `--command` (after `--`).
    #[arg(last = true)]
    pub command_args: Vec<String>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Plan JSON whose pages should be checked.
    #[arg(long)]
    pub plan: String,

    /// Directory holding the generated pages.
    #[arg(long, default_value = ".")]
    pub site: String,
}

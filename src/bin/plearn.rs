//! CLI binary for personallearn.
//!
//! A thin shim over the library crate: each subcommand maps its flags to
//! library calls and prints the result.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use personallearn::{
    estimate, extract_text, render_json_to_file, render_to_file, resolve_input, safe_filename,
    CalibrationSession, CourseGenerator, CourseRequest, GenerationConfig,
    PipelineProgressCallback, Profile, ProgressCallback, Stage,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner driven by pipeline stage events. The generation stage is
/// a single long model call, so a spinner is all the feedback there is.
struct StageSpinner {
    bar: ProgressBar,
}

impl StageSpinner {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl PipelineProgressCallback for StageSpinner {
    fn on_stage_start(&self, stage: Stage) {
        let msg = match stage {
            Stage::Extract => "Extracting text…",
            Stage::Generate => "Waiting for the model…",
            Stage::Render => "Laying out pages…",
        };
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message(msg);
        self.bar.reset_elapsed();
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<9} {}",
            green("✓"),
            stage,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        let first_line = error.lines().next().unwrap_or_default();
        self.bar
            .println(format!("  {} {:<9} {}", red("✗"), stage, red(first_line)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Estimate a learner profile from a calibration result
  plearn profile --score 2 --duration 20

  # Take the timed calibration quiz interactively
  plearn quiz

  # Generate a course for a known level
  plearn generate lecture.pdf --title "Neural Networks" --level Intermediate --units 7

  # Let the calibration result pick level and unit count
  plearn generate lecture.pdf --title "Neural Networks" --score 3 --duration 25 -o nn.pdf

  # JSON response with the PDF attached as base64
  plearn generate https://example.com/notes.pdf --title Notes --level Beginner --units 10 \
      --json --include-pdf > course.json

  # Re-render a saved course document
  plearn render course.json -o course.pdf

PROFILES:
  efficiency = score / (duration + 1) × 100
  > 12        Advanced       4 units   High Density
  > 6         Intermediate   7 units   Balanced
  otherwise   Beginner      10 units   Micro-Learning

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (gemini-2.5-flash by default)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (with EDGEQUAKE_MODEL)
  EDGEQUAKE_MODEL         Override model ID (with EDGEQUAKE_LLM_PROVIDER)
  RUST_LOG                Log filter, e.g. personallearn=debug
"#;

/// Generate adaptive courses from PDF documents with a language model.
#[derive(Parser, Debug)]
#[command(
    name = "plearn",
    version,
    about = "Generate adaptive courses from PDF documents with a language model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PLEARN_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PLEARN_QUIET")]
    quiet: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "PLEARN_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a calibration result into a learner profile.
    Profile {
        /// Number of correct calibration answers.
        #[arg(long)]
        score: u32,

        /// Seconds taken to answer.
        #[arg(long)]
        duration: f64,

        /// Print the profile as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Take the timed calibration quiz on the terminal.
    Quiz {
        /// Print the resulting profile as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate a course from a PDF (or text) and render it.
    Generate(GenerateArgs),

    /// Render a course JSON document to PDF.
    Render {
        /// Path to a course JSON file (`-` for stdin).
        course: String,

        /// Output PDF path. Defaults to a name derived from the course title.
        #[arg(short, long, env = "PLEARN_OUTPUT")]
        output: Option<PathBuf>,
    },

    /// Print the plain text extracted from a PDF.
    Extract {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// HTTP download timeout in seconds.
        #[arg(long, env = "PLEARN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
        download_timeout: u64,
    },
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Local PDF file path or HTTP/HTTPS URL (a text file with --text).
    input: String,

    /// Course title.
    #[arg(long)]
    title: String,

    /// Target level, e.g. Beginner, Intermediate, Advanced.
    #[arg(long, requires = "units", conflicts_with = "score")]
    level: Option<String>,

    /// Number of units to generate.
    #[arg(long, requires = "level")]
    units: Option<usize>,

    /// Calibration score; picks level and units together with --duration.
    #[arg(long, requires = "duration", conflicts_with = "level")]
    score: Option<u32>,

    /// Calibration duration in seconds.
    #[arg(long, requires = "score")]
    duration: Option<f64>,

    /// Treat INPUT as a UTF-8 text file and skip PDF extraction.
    #[arg(long)]
    text: bool,

    /// Write the PDF to this path. Defaults to a name derived from the title.
    #[arg(short, long, env = "PLEARN_OUTPUT")]
    output: Option<PathBuf>,

    /// Print the course as JSON on stdout instead of writing a PDF.
    #[arg(long, env = "PLEARN_JSON")]
    json: bool,

    /// With --json, attach the rendered PDF as base64.
    #[arg(long, requires = "json")]
    include_pdf: bool,

    /// LLM model ID (e.g. gemini-2.5-flash, gpt-4.1-mini).
    #[arg(long, env = "PLEARN_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama.
    #[arg(long, env = "PLEARN_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PLEARN_TEMPERATURE", default_value_t = 0.4)]
    temperature: f32,

    /// Max LLM output tokens.
    #[arg(long, env = "PLEARN_MAX_TOKENS", default_value_t = 16384)]
    max_tokens: usize,

    /// Source characters forwarded to the model.
    #[arg(long, env = "PLEARN_SOURCE_CHARS", default_value_t = 25_000)]
    source_chars: usize,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PLEARN_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner covers INFO-level feedback for `generate`.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress(&cli) {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match &cli.command {
        Command::Profile {
            score,
            duration,
            json,
        } => print_profile(&estimate(*score, *duration), *json),
        Command::Quiz { json } => run_quiz(*json),
        Command::Generate(args) => run_generate(&cli, args).await,
        Command::Render { course, output } => run_render(&cli, course, output.clone()),
        Command::Extract {
            input,
            download_timeout,
        } => run_extract(input, *download_timeout).await,
    }
}

fn show_progress(cli: &Cli) -> bool {
    matches!(&cli.command, Command::Generate(args) if !args.json)
        && !cli.quiet
        && !cli.no_progress
        && !cli.verbose
}

fn print_profile(profile: &Profile, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(profile).context("Failed to serialise profile")?
        );
    } else {
        println!("Level:       {}", bold(profile.level.as_str()));
        println!("Units:       {}", profile.units);
        println!("Style:       {}", profile.description);
        println!("Efficiency:  {:.2}", profile.efficiency);
    }
    Ok(())
}

/// Ask the calibration questions on stdin and time the answers.
fn run_quiz(json: bool) -> Result<()> {
    let mut session = CalibrationSession::new();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut asked = 0;

    eprintln!("{}", cyan("Answer with the option number or its text."));
    while let Some(question) = session.current().cloned() {
        asked += 1;
        eprintln!("\n{} {}", bold(&format!("{asked}.")), question.prompt);
        for (i, option) in question.options.iter().enumerate() {
            eprintln!("   {}  {}", dim(&format!("{})", i + 1)), option);
        }
        eprint!("> ");
        io::stderr().flush().ok();

        let Some(line) = lines.next() else {
            bail!("Quiz aborted: stdin closed before all questions were answered");
        };
        let line = line.context("Failed to read answer")?;
        let answer = match line.trim().parse::<usize>() {
            Ok(n) if (1..=question.options.len()).contains(&n) => question.options[n - 1].clone(),
            _ => line.trim().to_string(),
        };
        session.answer(answer);
    }

    let score = session.score();
    let profile = session.finish();
    eprintln!("\n{} {}/{} correct\n", green("✔"), score, asked);
    print_profile(&profile, json)
}

async fn run_generate(cli: &Cli, args: &GenerateArgs) -> Result<()> {
    let (level, unit_count) = match (&args.level, args.units, args.score, args.duration) {
        (Some(level), Some(units), _, _) => (level.clone(), units),
        (_, _, Some(score), Some(duration)) => {
            let profile = estimate(score, duration);
            if !cli.quiet {
                eprintln!(
                    "{} {} profile: {} units, {}",
                    cyan("◆"),
                    bold(profile.level.as_str()),
                    profile.units,
                    profile.description
                );
            }
            (profile.level.as_str().to_string(), profile.units)
        }
        _ => bail!("Pass either --level and --units, or --score and --duration"),
    };

    let spinner = show_progress(cli).then(StageSpinner::new);
    let config = build_config(args, spinner.clone().map(|s| s as ProgressCallback))?;
    let generator =
        CourseGenerator::from_config(config).context("No completion service available")?;

    let request = CourseRequest::new(&args.title, level, unit_count).with_pdf(args.include_pdf);
    let start = Instant::now();
    let result = if args.text {
        let text = tokio::fs::read_to_string(&args.input)
            .await
            .with_context(|| format!("Failed to read text from {:?}", args.input))?;
        generator.generate_from_text(&text, &request).await
    } else {
        generator.generate_from_pdf(&args.input, &request).await
    };
    if let Some(ref s) = spinner {
        s.finish();
    }
    let output = result.context("Course generation failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    let path = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(output.download_filename()));
    render_to_file(&output.course, &path).context("Failed to write course PDF")?;

    if !cli.quiet {
        eprintln!(
            "{}  {} units  {}ms  →  {}",
            green("✔"),
            output.course.units.len(),
            start.elapsed().as_millis(),
            bold(&path.display().to_string()),
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out{}",
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            if output.stats.truncated {
                format!("  (source cut to {} chars)", args.source_chars)
            } else {
                String::new()
            }
        );
    }
    Ok(())
}

/// Map CLI args to `GenerationConfig`.
fn build_config(
    args: &GenerateArgs,
    progress: Option<ProgressCallback>,
) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .source_char_budget(args.source_chars)
        .download_timeout_secs(args.download_timeout);

    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn run_render(cli: &Cli, course_path: &str, output: Option<PathBuf>) -> Result<()> {
    let raw = if course_path == "-" {
        let mut buf = String::new();
        io::Read::read_to_string(&mut io::stdin(), &mut buf).context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(course_path)
            .with_context(|| format!("Failed to read course from {course_path:?}"))?
    };
    let value: serde_json::Value =
        serde_json::from_str(&raw).context("Course file is not valid JSON")?;

    // Accept both a bare course and a saved `generate --json` response.
    let course = value.get("course").unwrap_or(&value);
    let path = output.unwrap_or_else(|| {
        PathBuf::from(safe_filename(
            course.get("title").and_then(|t| t.as_str()).unwrap_or_default(),
        ))
    });
    render_json_to_file(course, &path).context("Failed to render course")?;

    if !cli.quiet {
        eprintln!("{}  {}", green("✔"), bold(&path.display().to_string()));
    }
    Ok(())
}

async fn run_extract(input: &str, download_timeout: u64) -> Result<()> {
    let resolved = resolve_input(input, download_timeout)
        .await
        .context("Failed to read PDF")?;
    let text = extract_text(&resolved.bytes).context("Failed to extract text")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

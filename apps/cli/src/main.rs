use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use recap_core::{
    ChatSummarizer, Config, InteractiveCredential, Pipeline, Progress, Provider, RecapError,
    RecordOutcome, TimeWindow, YoutubeContentResolver, YoutubeHistory, authenticate,
    config::YOUTUBE_API_KEY_ENV, error::ConfigError, format_report_readable,
    get_token_cache_path, write_report,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Copy, Default, ValueEnum)]
enum CliProvider {
    Grok,
    #[default]
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(name = "recap")]
#[command(about = "Summarize the YouTube videos you watched this week with AI")]
struct Cli {
    /// YouTube Data API key
    #[arg(long, env = YOUTUBE_API_KEY_ENV, hide_env_values = true)]
    youtube_api_key: Option<String>,

    /// Number of days of watch history to include
    #[arg(short, long, env = "RECAP_DAYS", default_value_t = 7)]
    days: u32,

    /// Directory the dated digest is written to
    #[arg(short, long, env = "RECAP_OUTPUT_DIR", default_value = "data")]
    output_dir: PathBuf,

    /// AI provider for summaries
    #[arg(short, long, env = "RECAP_PROVIDER", default_value = "openai")]
    provider: CliProvider,

    /// Summary language (e.g., "English", "Ukrainian")
    #[arg(short, long, env = "RECAP_LANG", default_value = "English")]
    lang: String,

    /// Caption language requested from YouTube
    #[arg(long, env = "RECAP_TRANSCRIPT_LANG", default_value = "en")]
    transcript_lang: String,

    /// OAuth client file downloaded from the Google Cloud console
    #[arg(long, env = "RECAP_CLIENT_SECRET", default_value = "client_secret.json")]
    client_secret: PathBuf,

    /// Where the OAuth token is cached between runs
    #[arg(long, env = "RECAP_TOKEN_CACHE")]
    token_cache: Option<PathBuf>,

    /// Extra .env file to load before reading the environment
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Chat-completions endpoint overriding the provider default
    #[arg(long, env = "RECAP_LLM_API_URL")]
    llm_api_url: Option<String>,

    /// Model overriding the provider default
    #[arg(long, env = "RECAP_LLM_MODEL")]
    model: Option<String>,

    /// Timeout for every HTTP request
    #[arg(long, env = "RECAP_HTTP_TIMEOUT_SECS", default_value_t = 60)]
    http_timeout_secs: u64,

    /// How long to wait for browser consent
    #[arg(long, env = "RECAP_AUTH_TIMEOUT_SECS", default_value_t = 300)]
    auth_timeout_secs: u64,

    /// Longest transcript or description sent to the model, in characters
    #[arg(long, env = "RECAP_MAX_INPUT_CHARS", default_value_t = 48_000)]
    max_input_chars: usize,
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn build_config(cli: &Cli) -> Result<Config, ConfigError> {
    if cli.days == 0 {
        return Err(ConfigError::Invalid {
            key: "days".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if cli.max_input_chars == 0 {
        return Err(ConfigError::Invalid {
            key: "max-input-chars".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let window = chrono::Duration::days(i64::from(cli.days));
    if TimeWindow::trailing(window, Utc::now()).is_none() {
        return Err(ConfigError::Invalid {
            key: "days".to_string(),
            reason: format!("{} days reaches past the earliest representable date", cli.days),
        });
    }

    let provider: Provider = cli.provider.into();
    let youtube_api_key = cli
        .youtube_api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingEnv {
            env_var: YOUTUBE_API_KEY_ENV.to_string(),
        })?;
    let llm_api_key = provider.api_key_from_env()?;

    let mut config = Config::new(youtube_api_key, llm_api_key, provider);
    config.llm_api_url = cli.llm_api_url.clone();
    config.llm_model = cli.model.clone();
    config.client_secret_path = cli.client_secret.clone();
    config.token_cache_path = cli.token_cache.clone().unwrap_or_else(get_token_cache_path);
    config.output_dir = cli.output_dir.clone();
    config.window = window;
    config.summary_lang = cli.lang.clone();
    config.transcript_lang = cli.transcript_lang.clone();
    config.max_input_chars = cli.max_input_chars;
    config.http_timeout = Duration::from_secs(cli.http_timeout_secs);
    config.auth_timeout = Duration::from_secs(cli.auth_timeout_secs);
    Ok(config)
}

fn outcome_marker(outcome: &RecordOutcome) -> console::StyledObject<&'static str> {
    match outcome {
        RecordOutcome::Summarized { .. } => style("✓").green().bold(),
        RecordOutcome::NoContent => style("–").dim(),
        _ => style("!").yellow().bold(),
    }
}

async fn run(config: Config) -> Result<(), RecapError> {
    let http = config.http_client().map_err(|e| ConfigError::Invalid {
        key: "http client".to_string(),
        reason: e.to_string(),
    })?;
    info!(
        provider = config.provider.name(),
        model = config.llm_model(),
        days = config.window.num_days(),
        "Starting digest run"
    );

    println!(
        "\n{}  {}\n",
        style("recap").cyan().bold(),
        style("Weekly Watch Digest").dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let total_start = Instant::now();

    // Step 1: Authenticate (cached token, refresh, or browser consent)
    let step_start = Instant::now();
    let spinner = create_spinner("Authenticating with YouTube...");
    let prompt_spinner = spinner.clone();
    let interactive = InteractiveCredential::new(
        http.clone(),
        config.client_secret_path.clone(),
        config.token_cache_path.clone(),
        config.auth_timeout,
    )
    .with_prompt(move |url| {
        prompt_spinner.suspend(|| {
            println!(
                "\n{} Open this URL in your browser to authorize recap:\n\n  {}\n",
                style("→").cyan().bold(),
                style(url).underlined()
            );
        });
        prompt_spinner.set_message("Waiting for browser consent...");
    });
    let handle = match authenticate(&config, &http, interactive).await {
        Ok(handle) => handle,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };
    spinner.finish_with_message(format!(
        "{} Authenticated {}",
        style("✓").green().bold(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    ));

    // Step 2: Fetch history, then resolve and summarize each video
    let step_start = Instant::now();
    let window = TimeWindow::trailing(config.window, Utc::now()).ok_or_else(|| {
        ConfigError::Invalid {
            key: "days".to_string(),
            reason: "window start is out of range".to_string(),
        }
    })?;
    let history = YoutubeHistory::new(http.clone(), &config.youtube_api_url);
    let resolver = YoutubeContentResolver::new(
        http.clone(),
        &config.timedtext_url,
        &config.youtube_api_url,
        &config.youtube_api_key,
        &config.transcript_lang,
    );
    let summarizer = ChatSummarizer::new(http.clone(), &config);
    let pipeline = Pipeline::new(&history, &resolver, &summarizer, config.provider.name());

    let spinner = create_spinner(&format!(
        "Fetching the last {} days of history...",
        config.window.num_days()
    ));
    let report = pipeline
        .run(&handle, &window, |progress| match progress {
            Progress::Fetched { total } => spinner.println(format!(
                "{} Fetched history: {} videos {}",
                style("✓").green().bold(),
                total,
                style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
            )),
            Progress::Started {
                index,
                total,
                video,
            } => spinner.set_message(format!(
                "[{}/{}] Summarizing {} with {}...",
                index + 1,
                total,
                style(&video.title).yellow(),
                config.provider.name()
            )),
            Progress::Finished { record, .. } => spinner.println(format!(
                "  {} {} {}",
                outcome_marker(&record.outcome),
                record.video.title,
                style(format!("({})", record.outcome.label())).dim()
            )),
        })
        .await;
    spinner.finish_and_clear();
    let report = report?;

    println!(
        "{} Summarized {}/{} videos ({}) {}",
        style("✓").green().bold(),
        report.summarized_count(),
        report.videos.len(),
        config.provider.name(),
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    );

    // Step 3: Write the dated artifact
    let report_path = write_report(&report, &config.output_dir).await?;

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );

    println!(
        "\n{} {}\n",
        style("Saved:").dim(),
        style(report_path.display()).cyan()
    );
    println!("{}", style("─".repeat(60)).dim());

    // Human-readable output
    let readable = format_report_readable(&report);
    println!("{}", readable);

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let mut cli = Cli::parse();
    if let Some(env_file) = cli.env_file.clone() {
        dotenvy::from_path(&env_file)?;
        // Re-read so values from the extra file reach env-backed flags.
        cli = Cli::parse();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match build_config(&cli) {
        Ok(config) => run(config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!(
            "{} [{}] {}",
            style("Error:").red().bold(),
            e.stage(),
            e
        );
        std::process::exit(1);
    }

    Ok(())
}

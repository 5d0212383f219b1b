use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use revisor_auth::firebase::{FirebaseAuth, FirebaseConfig};
use revisor_auth::SessionGate;
use revisor_core::{OutputFormat, RevisorConfig, MODEL_KEY_VARS, SEARCH_KEY_VARS};
use revisor_docs::DocumentLoader;
use revisor_review::{LlmClient, ReviewPipeline, ReviewerChat, SearchTool, SerperSearch};
use revisor_shell::repl::{self, ReplOptions};
use revisor_shell::{InteractionShell, ShellServices};

const CONFIG_FILE: &str = ".revisor.toml";

#[derive(Parser)]
#[command(
    name = "revisor",
    version,
    about = "ABAP code review with a reviewer/optimizer agent pair",
    long_about = "Revisor reviews ABAP code with two cooperating AI agents grounded on your\n\
                   reference manuals: a reviewer that finds problems and an optimizer that\n\
                   returns improved code or an XML review document.\n\n\
                   Examples:\n  \
                     revisor shell                           Log in and review interactively\n  \
                     revisor review --file zreport.abap      One-shot review of a file\n  \
                     revisor review --file z.abap --question 'Why is this slow?'\n  \
                     revisor doctor                          Check setup and environment"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .revisor.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        global = true,
        default_value = "text",
        long_help = "Output format for command results.\n\n\
                       Formats:\n  \
                         text      Human-readable output (default)\n  \
                         json      Machine-readable JSON with camelCase keys\n  \
                         markdown  Fenced result plus an HTML download link"
    )]
    format: OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and review code interactively
    #[command(long_about = "Log in and review code interactively.\n\n\
        Prompts for email and password, then accepts commands: upload <path>,\n\
        ask <question>, review, show, logout, help, quit. Each review result is\n\
        saved into the configured output directory.")]
    Shell,
    /// Review a single ABAP file and save the result
    #[command(long_about = "Review a single ABAP file and save the result.\n\n\
        Logs in, runs the reviewer and optimizer agents over the file using the\n\
        reference manuals in [documents].dir, prints the result and saves it as\n\
        revisao.xml or codigo_otimizado.abap. With --question, also asks the\n\
        reviewer a free-form question about the code.\n\n\
        Examples:\n  revisor review --file zreport.abap --email me@corp.com\n  \
        REVISOR_PASSWORD=... revisor review --file z.abap --question 'Any N+1 selects?'")]
    Review {
        /// ABAP source file to review
        #[arg(long)]
        file: PathBuf,
        /// Free-form question about the code
        #[arg(long)]
        question: Option<String>,
        /// Login email
        #[arg(long, env = "REVISOR_EMAIL")]
        email: Option<String>,
        /// Login password
        #[arg(long, env = "REVISOR_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Directory to save the result in (overrides [output].dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Create a default .revisor.toml configuration file
    #[command(long_about = "Create a default .revisor.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .revisor.toml already exists.")]
    Init,
    /// Check your Revisor setup and environment
    #[command(long_about = "Check your Revisor setup and environment.\n\n\
        Runs diagnostics for the config file, Firebase config, model and search\n\
        API keys, and reference documents. Use --format json for machine-readable\n\
        output.")]
    Doctor,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1m\x1b[33m⚡\x1b[0m \x1b[1mrevisor\x1b[0m v{version} · ABAP review agents grounded on your manuals\n");

        println!("Quick start:");
        println!("  \x1b[36mrevisor init\x1b[0m                       Create a .revisor.toml config file");
        println!("  \x1b[36mrevisor shell\x1b[0m                      Log in and review interactively");
        println!("  \x1b[36mrevisor review --file z.abap\x1b[0m       One-shot review of a file\n");

        println!("All commands:");
        println!("  \x1b[32mshell\x1b[0m     Interactive session (upload, ask, review)");
        println!("  \x1b[32mreview\x1b[0m    Review one file and save the result");
        println!("  \x1b[32mdoctor\x1b[0m    Check your setup and environment");
        println!("  \x1b[32minit\x1b[0m      Create default configuration\n");
    } else {
        println!("revisor v{version} · ABAP review agents grounded on your manuals\n");

        println!("Quick start:");
        println!("  revisor init                       Create a .revisor.toml config file");
        println!("  revisor shell                      Log in and review interactively");
        println!("  revisor review --file z.abap       One-shot review of a file\n");

        println!("All commands:");
        println!("  shell     Interactive session (upload, ask, review)");
        println!("  review    Review one file and save the result");
        println!("  doctor    Check your setup and environment");
        println!("  init      Create default configuration\n");
    }

    println!("Run 'revisor <command> --help' for details.");
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<RevisorConfig> {
    let mut config = match path {
        Some(path) => RevisorConfig::from_file(path)?,
        None => {
            let default_path = Path::new(CONFIG_FILE);
            if default_path.exists() {
                RevisorConfig::from_file(default_path)?
            } else {
                RevisorConfig::default()
            }
        }
    };
    config.apply_env(|name| std::env::var(name).ok());
    Ok(config)
}

fn open_gate(config: &RevisorConfig) -> Result<SessionGate> {
    let path = &config.auth.firebase_config;
    if !path.exists() {
        miette::bail!(miette::miette!(
            help = format!(
                "Save the Firebase web app config as {}, or point [auth].firebase_config at it",
                path.display()
            ),
            "Firebase config not found: {}",
            path.display()
        ));
    }
    let firebase = FirebaseConfig::from_file(path)?;
    let auth = FirebaseAuth::new(firebase, &config.auth.identity_url)?;
    Ok(SessionGate::new(auth))
}

fn build_services(config: &RevisorConfig) -> Result<ShellServices> {
    if config.llm.api_key.is_none() && config.llm.base_url.is_none() {
        miette::bail!(miette::miette!(
            help = format!(
                "Set {} or add api_key in your {CONFIG_FILE} under [llm]",
                MODEL_KEY_VARS.join(" or ")
            ),
            "No API key configured for LLM provider '{}'",
            config.llm.provider
        ));
    }

    let llm = Arc::new(LlmClient::new(&config.llm)?);
    let chat = Arc::new(LlmClient::new(&config.chat.to_llm_config())?);

    let search: Option<Arc<dyn SearchTool>> = if config.search.has_api_key() {
        Some(Arc::new(SerperSearch::new(&config.search)?))
    } else {
        tracing::warn!(
            "no search API key ({}), agents will run without web search",
            SEARCH_KEY_VARS.join(" or ")
        );
        None
    };

    Ok(ShellServices {
        loader: DocumentLoader::new(config.documents.clone()),
        reviewer: Arc::new(ReviewPipeline::new(llm, search, &config.agents)),
        chat: ReviewerChat::new(chat),
        output: config.output.clone(),
    })
}

fn spinner(message: &'static str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Some(pb)
}

fn finish(spinner: Option<indicatif::ProgressBar>, message: &'static str) {
    if let Some(pb) = spinner {
        pb.finish_with_message(message);
    }
}

#[derive(serde::Serialize)]
struct CheckResult {
    name: &'static str,
    status: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl CheckResult {
    fn pass(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "pass",
            detail: detail.into(),
            hint: None,
        }
    }

    fn fail(name: &'static str, detail: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            name,
            status: "fail",
            detail: detail.into(),
            hint: Some(hint.into()),
        }
    }

    fn info(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            status: "info",
            detail: detail.into(),
            hint: None,
        }
    }

    fn symbol(&self) -> &'static str {
        match self.status {
            "pass" => "\u{2713}",
            "fail" => "\u{2717}",
            _ => "~",
        }
    }

    fn colored_symbol(&self) -> String {
        match self.status {
            "pass" => "\x1b[32m\u{2713}\x1b[0m".into(),
            "fail" => "\x1b[31m\u{2717}\x1b[0m".into(),
            _ => "\x1b[33m~\x1b[0m".into(),
        }
    }
}

fn run_doctor(config: &RevisorConfig, format: OutputFormat, use_color: bool) -> Result<()> {
    let mut checks: Vec<CheckResult> = Vec::new();

    // 1. Config file
    if Path::new(CONFIG_FILE).exists() {
        checks.push(CheckResult::pass("config_file", format!("{CONFIG_FILE} found")));
    } else {
        checks.push(CheckResult::fail(
            "config_file",
            format!("{CONFIG_FILE} not found"),
            "run 'revisor init' to create a default config",
        ));
    }

    // 2. Firebase config
    let firebase_path = &config.auth.firebase_config;
    match FirebaseConfig::from_file(firebase_path) {
        Ok(firebase) => {
            let project = firebase.project_id.as_deref().unwrap_or("unknown project");
            checks.push(CheckResult::pass(
                "firebase_config",
                format!("{} ({project})", firebase_path.display()),
            ));
        }
        Err(e) => checks.push(CheckResult::fail(
            "firebase_config",
            e.to_string(),
            "save the Firebase web app config as JSON and point [auth].firebase_config at it",
        )),
    }

    // 3. Model provider + API key
    checks.push(CheckResult::pass(
        "llm_provider",
        format!(
            "{} (review: {}, chat: {})",
            config.llm.provider, config.llm.model, config.chat.model
        ),
    ));
    if config.llm.api_key.is_some() {
        checks.push(CheckResult::pass("llm_api_key", "API key set"));
    } else {
        checks.push(CheckResult::fail(
            "llm_api_key",
            format!("{} not set", MODEL_KEY_VARS.join(" / ")),
            format!(
                "export {}=... or set api_key in {CONFIG_FILE}",
                MODEL_KEY_VARS[0]
            ),
        ));
    }

    // 4. Search API key
    if config.search.has_api_key() {
        checks.push(CheckResult::pass(
            "search_api_key",
            format!("{} key set", config.search.provider),
        ));
    } else {
        checks.push(CheckResult::fail(
            "search_api_key",
            format!("{} not set", SEARCH_KEY_VARS.join(" / ")),
            format!(
                "export {}=... (agents run without web search otherwise)",
                SEARCH_KEY_VARS[0]
            ),
        ));
    }

    // 5. Reference documents
    let docs = &config.documents;
    let found = revisor_docs::walker::discover_documents(&docs.dir, &docs.extension, docs.max_depth);
    if found.is_empty() {
        checks.push(CheckResult::info(
            "reference_docs",
            format!("no *.{} files in {}", docs.extension, docs.dir.display()),
        ));
    } else {
        checks.push(CheckResult::pass(
            "reference_docs",
            format!(
                "{} *.{} files in {}",
                found.len(),
                docs.extension,
                docs.dir.display()
            ),
        ));
    }

    // Output
    match format {
        OutputFormat::Json => {
            let version = env!("CARGO_PKG_VERSION");
            let json = serde_json::json!({
                "version": version,
                "checks": checks,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            let version = env!("CARGO_PKG_VERSION");
            println!("Revisor v{version} · Environment Check\n");

            for check in &checks {
                let sym = if use_color {
                    check.colored_symbol()
                } else {
                    check.symbol().to_string()
                };
                let label = check.name.replace('_', " ");
                println!("  {sym} {label:<20} {}", check.detail);
                if let Some(hint) = &check.hint {
                    println!("    hint: {hint}");
                }
            }

            let passed = checks.iter().filter(|c| c.status == "pass").count();
            let failed = checks.iter().filter(|c| c.status == "fail").count();
            let info = checks.iter().filter(|c| c.status == "info").count();
            println!("\n{passed} checks passed, {failed} failed, {info} info");
        }
    }

    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# Revisor Configuration

[llm]
# Model for the reviewer and optimizer agents (OpenAI-compatible endpoint)
# provider = "openai"
# model = "gpt-4o-mini"
# temperature = 0.2
# max_tokens = 4000
# base_url = "https://api.openai.com"
# api_key = "..."            # or OPENAI_API_KEY / OPENAI

[chat]
# Model for follow-up questions
# model = "gpt-4"
# temperature = 0.2

[search]
# Web search tool for both agents
# provider = "serper"
# base_url = "https://google.serper.dev"
# num_results = 5
# api_key = "..."            # or SERPER_API_KEY / SERPER

[documents]
# Reference manuals the agents are grounded on
# dir = "."
# extension = "pdf"
# max_chars = 8000
# chat_chars = 2000
# max_depth = 1

[auth]
# firebase_config = "firebase_config.json"
# identity_url = "https://identitytoolkit.googleapis.com"

[agents]
# max_iterations = 4

[output]
# dir = "."
# markup_filename = "revisao.xml"
# source_filename = "codigo_otimizado.abap"
# source_language = "abap"
"#;

async fn run_review(
    config: RevisorConfig,
    format: OutputFormat,
    file: &Path,
    question: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<()> {
    if !file.is_file() {
        return Err(revisor_core::RevisorError::FileNotFound(file.to_path_buf()).into());
    }
    let (Some(email), Some(password)) = (email, password) else {
        miette::bail!(miette::miette!(
            help = "Pass --email and --password, or set REVISOR_EMAIL and REVISOR_PASSWORD",
            "Login required"
        ));
    };

    let mut gate = open_gate(&config)?;
    let services = build_services(&config)?;
    let session = gate.login(&email, &password).await?.clone();

    let mut shell = InteractionShell::new(session, services);
    shell.upload_file(file)?;
    shell.set_question(question);

    let pb = spinner("Processing with the agents...");
    let rendered = match shell.run_review().await {
        Ok(r) => r,
        Err(e) => {
            finish(pb, "Failed");
            return Err(e.into());
        }
    };
    finish(pb, "Done");

    let answer = if shell.question().is_some() {
        let pb = spinner("Asking the reviewer...");
        let answer = shell.ask().await.inspect_err(|_| {
            if let Some(pb) = &pb {
                pb.finish_with_message("Failed");
            }
        })?;
        finish(pb, "Done");
        answer
    } else {
        None
    };

    let Some(rendered) = rendered else {
        return Ok(());
    };
    let saved = rendered.artifact.write_to(&shell.output().dir)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "result": rendered,
                "answer": answer,
                "savedTo": saved,
            });
            println!("{}", serde_json::to_string_pretty(&json).into_diagnostic()?);
        }
        _ => {
            print!("{}", rendered.format(format)?);
            if let Some(answer) = answer {
                println!("\n🧠 {answer}");
            }
            eprintln!("📥 Saved {}", saved.display());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .into_diagnostic()?;
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    };

    if cli.verbose {
        eprintln!("format: {}", cli.format);
        eprintln!(
            "models: review={} chat={}, documents: {}/*.{}",
            config.llm.model,
            config.chat.model,
            config.documents.dir.display(),
            config.documents.extension
        );
    }

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Shell) => {
            let mut gate = open_gate(&config)?;
            let services = build_services(&config)?;
            let options = ReplOptions {
                format: cli.format,
                spinner: std::io::stderr().is_terminal(),
                save_artifacts: true,
            };
            let stdin = std::io::stdin();
            repl::run(
                &mut gate,
                services,
                stdin.lock(),
                std::io::stdout(),
                &options,
            )
            .await?;
        }
        Some(Command::Review {
            file,
            question,
            email,
            password,
            output_dir,
        }) => {
            if let Some(dir) = output_dir {
                config.output.dir = dir;
            }
            run_review(config, cli.format, &file, question, email, password).await?;
        }
        Some(Command::Init) => {
            let path = Path::new(CONFIG_FILE);
            if path.exists() {
                miette::bail!("{CONFIG_FILE} already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created {CONFIG_FILE} with default configuration");
        }
        Some(Command::Doctor) => {
            run_doctor(&config, cli.format, use_color)?;
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "revisor", &mut std::io::stdout());
        }
    }

    Ok(())
}

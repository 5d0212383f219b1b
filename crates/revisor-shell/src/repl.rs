//! Line-oriented interactive session.
//!
//! Reads commands from any [`BufRead`] and writes replies to any [`Write`],
//! so the same loop drives a terminal and the tests.

use std::io::{BufRead, Write};
use std::path::Path;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use revisor_auth::SessionGate;
use revisor_core::{OutputFormat, RevisorError};

use crate::shell::{InteractionShell, ShellServices};

const HELP: &str = "\
Commands:
  upload <path>     Load an ABAP source file for review
  ask <question>    Ask the reviewer a question about the uploaded code
  review            Run the reviewer and optimizer agents
  show              Show the current file, question and last result
  logout            End the session and return to the login prompt
  help              Show this help
  quit              Leave";

/// How the loop presents results.
#[derive(Debug, Clone)]
pub struct ReplOptions {
    /// Format for review results.
    pub format: OutputFormat,
    /// Show a spinner while agents run. Only useful on a terminal.
    pub spinner: bool,
    /// Save each review artifact into the configured output directory.
    pub save_artifacts: bool,
}

impl Default for ReplOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            spinner: false,
            save_artifacts: true,
        }
    }
}

enum Flow {
    Logout,
    Quit,
}

/// Run the interactive session until `quit` or end of input.
///
/// Each user must log in through `gate` before any command is accepted.
/// Command failures are reported and the session continues.
///
/// # Errors
///
/// Returns [`RevisorError::Io`] only when reading input or writing output fails.
pub async fn run<R: BufRead, W: Write>(
    gate: &mut SessionGate,
    mut services: ShellServices,
    mut input: R,
    mut out: W,
    options: &ReplOptions,
) -> Result<(), RevisorError> {
    loop {
        let Some(session) = login(gate, &mut input, &mut out).await? else {
            return Ok(());
        };
        writeln!(out, "Welcome, {}. Type 'help' for commands.", session.email())?;

        let mut shell = InteractionShell::new(session, services);
        let flow = command_loop(&mut shell, &mut input, &mut out, options).await?;
        services = shell.into_services();

        match flow {
            Flow::Logout => {
                gate.logout();
                writeln!(out, "Logged out.")?;
            }
            Flow::Quit => return Ok(()),
        }
    }
}

fn prompt<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    label: &str,
) -> Result<Option<String>, RevisorError> {
    write!(out, "{label}")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
}

async fn login<R: BufRead, W: Write>(
    gate: &mut SessionGate,
    input: &mut R,
    out: &mut W,
) -> Result<Option<revisor_auth::Session>, RevisorError> {
    writeln!(out, "🔐 Login")?;
    loop {
        let Some(email) = prompt(input, out, "Email: ")? else {
            return Ok(None);
        };
        let Some(password) = prompt(input, out, "Password: ")? else {
            return Ok(None);
        };
        match gate.login(&email, &password).await {
            Ok(session) => return Ok(Some(session.clone())),
            Err(e) => writeln!(out, "{e}")?,
        }
    }
}

async fn command_loop<R: BufRead, W: Write>(
    shell: &mut InteractionShell,
    input: &mut R,
    out: &mut W,
    options: &ReplOptions,
) -> Result<Flow, RevisorError> {
    loop {
        let Some(line) = prompt(input, out, "revisor> ")? else {
            return Ok(Flow::Quit);
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((c, a)) => (c, a.trim()),
            None => (line, ""),
        };

        let outcome = match command {
            "help" => writeln!(out, "{HELP}").map_err(RevisorError::from),
            "quit" | "exit" => return Ok(Flow::Quit),
            "logout" => return Ok(Flow::Logout),
            "upload" => upload(shell, out, arg),
            "ask" => ask(shell, out, arg, options).await,
            "review" => review(shell, out, options).await,
            "show" => show(shell, out),
            other => writeln!(out, "Unknown command '{other}'. Type 'help' for commands.")
                .map_err(RevisorError::from),
        };

        if let Err(e) = outcome {
            tracing::debug!(error = %e, command, "command failed");
            writeln!(out, "error: {e}")?;
        }
    }
}

fn upload<W: Write>(shell: &mut InteractionShell, out: &mut W, arg: &str) -> Result<(), RevisorError> {
    if arg.is_empty() {
        writeln!(out, "usage: upload <path>")?;
        return Ok(());
    }
    let language = shell.output().source_language.clone();
    let submission = shell.upload_file(Path::new(arg))?;
    writeln!(
        out,
        "Loaded {} ({} lines).",
        submission.name(),
        submission.line_count()
    )?;
    writeln!(out, "{}", fenced(&language, submission.content()))?;
    Ok(())
}

fn fenced(language: &str, body: &str) -> String {
    format!("```{language}\n{}\n```", body.trim_end_matches('\n'))
}

async fn ask<W: Write>(
    shell: &mut InteractionShell,
    out: &mut W,
    arg: &str,
    options: &ReplOptions,
) -> Result<(), RevisorError> {
    shell.set_question(Some(arg.to_string()));
    let spinner = spinner(options, "Asking the reviewer...");
    let answer = shell.ask().await;
    finish(spinner, answer.is_ok());
    match answer? {
        Some(answer) => writeln!(out, "🧠 {answer}")?,
        None if shell.submission().is_none() => writeln!(out, "Upload a file first.")?,
        None => writeln!(out, "usage: ask <question>")?,
    }
    Ok(())
}

async fn review<W: Write>(
    shell: &mut InteractionShell,
    out: &mut W,
    options: &ReplOptions,
) -> Result<(), RevisorError> {
    let spinner = spinner(options, "Processing with the agents...");
    let result = shell.run_review().await;
    finish(spinner, result.is_ok());
    let Some(rendered) = result? else {
        writeln!(out, "Upload a file first.")?;
        return Ok(());
    };

    writeln!(out, "{}", rendered.format(options.format)?)?;
    if options.save_artifacts {
        let path = rendered.artifact.write_to(&shell.output().dir)?;
        writeln!(out, "📥 Saved {}", display_path(&path))?;
    }
    Ok(())
}

fn show<W: Write>(shell: &InteractionShell, out: &mut W) -> Result<(), RevisorError> {
    writeln!(out, "User: {}", shell.session().email())?;
    match shell.submission() {
        Some(s) => writeln!(out, "File: {} ({} lines)", s.name(), s.line_count())?,
        None => writeln!(out, "File: none")?,
    }
    writeln!(out, "Question: {}", shell.question().unwrap_or("none"))?;
    match shell.last_result() {
        Some(r) => writeln!(out, "Last result: {} ({})", r.artifact.filename, r.kind)?,
        None => writeln!(out, "Last result: none")?,
    }
    Ok(())
}

fn spinner(options: &ReplOptions, message: &'static str) -> Option<ProgressBar> {
    if !options.spinner {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

fn finish(spinner: Option<ProgressBar>, ok: bool) {
    if let Some(pb) = spinner {
        pb.finish_with_message(if ok { "Done" } else { "Failed" });
    }
}

fn display_path(path: &Path) -> String {
    path.strip_prefix(".").unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_reads_until_eof() {
        let mut input = std::io::Cursor::new("dev@example.com\r\n");
        let mut out = Vec::new();
        assert_eq!(
            prompt(&mut input, &mut out, "Email: ").unwrap().as_deref(),
            Some("dev@example.com")
        );
        assert!(prompt(&mut input, &mut out, "Email: ").unwrap().is_none());
        assert_eq!(String::from_utf8(out).unwrap(), "Email: Email: ");
    }

    #[test]
    fn fenced_labels_the_language() {
        assert_eq!(
            fenced("abap", "WRITE 'x'.\n"),
            "```abap\nWRITE 'x'.\n```"
        );
    }

    #[test]
    fn help_lists_every_command() {
        for cmd in ["upload", "ask", "review", "show", "logout", "help", "quit"] {
            assert!(HELP.contains(cmd), "missing {cmd}");
        }
    }
}

// UI layer: the numbered main menu and the five flows behind it. Every
// flow reads through a `Console` and talks to the remote side through a
// `FineTuningService`; nothing is cached between menu actions.

use anyhow::{Context, Result};
use chrono::{Local, TimeZone};
use crossterm::style::Stylize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

use crate::api::{succeeded_jobs, FineTuningJob, FineTuningService, FINE_TUNE_PURPOSE};
use crate::chat;
use crate::config::Config;
use crate::console::Console;
use crate::selection::{is_confirmed, pick};
use crate::training::{self, TrainingFile, TRAINING_FILE_EXTENSION};

/// Page size used by the job lister.
pub const JOB_PAGE_SIZE: u32 = 10;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const SEPARATOR_WIDTH: usize = 50;

/// A main menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    Upload,
    ViewJobs,
    FineTune,
    Chat,
    AddTrainingData,
    Exit,
}

impl MenuChoice {
    pub const ALL: [MenuChoice; 6] = [
        MenuChoice::Upload,
        MenuChoice::ViewJobs,
        MenuChoice::FineTune,
        MenuChoice::Chat,
        MenuChoice::AddTrainingData,
        MenuChoice::Exit,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuChoice::Upload => "Upload a file for fine-tuning (has to be in the data directory)",
            MenuChoice::ViewJobs => "View your existing fine-tuning jobs",
            MenuChoice::FineTune => "Start a fine-tuning job",
            MenuChoice::Chat => "Chat with one of your fine-tuned models",
            MenuChoice::AddTrainingData => "Add sample conversation to training data",
            MenuChoice::Exit => "Exit program",
        }
    }

    /// Map the raw menu input ("1".."6") to a choice.
    pub fn parse(input: &str) -> Option<Self> {
        pick(&Self::ALL, input).copied()
    }
}

/// Main interactive menu. Loops until the user picks "Exit".
///
/// A flow that fails (typically a remote error) is reported and control
/// returns to the menu; a failure to read the menu choice itself ends
/// the session.
pub fn main_menu<S, C>(service: &S, console: &mut C, config: &Config) -> Result<()>
where
    S: FineTuningService + ?Sized,
    C: Console,
{
    loop {
        console.say(&format!("\n{}", "Actions:".bold()));
        for (idx, choice) in MenuChoice::ALL.iter().enumerate() {
            console.say(&format!("{}. {}", idx + 1, choice.label()));
        }
        let input = console.read_line("\nSelect an option by entering the number")?;

        let outcome = match MenuChoice::parse(&input) {
            Some(MenuChoice::Upload) => upload_file(service, console, &config.data_dir),
            Some(MenuChoice::ViewJobs) => view_jobs(service, console),
            Some(MenuChoice::FineTune) => fine_tune_model(service, console, &config.base_model),
            Some(MenuChoice::Chat) => converse_with_model(service, console),
            Some(MenuChoice::AddTrainingData) => add_training_data(console, &config.data_dir),
            Some(MenuChoice::Exit) => {
                console.say("Exiting the Fine Tuning CLI.");
                break;
            }
            None => {
                console.say("Invalid option. Please try again.");
                continue;
            }
        };

        if let Err(e) = outcome {
            error!(error = %format!("{:#}", e), "menu action failed");
            console.say(&format!("Error: {:#}", e));
        }
    }
    Ok(())
}

/// Regular files in `dir`, sorted by name so indices are stable.
pub fn list_local_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read data directory {}", dir.display()))?;
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("Failed to read entry in {}", dir.display()))?
            .path();
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Upload one file from the data directory after confirmation.
pub fn upload_file<S, C>(service: &S, console: &mut C, data_dir: &Path) -> Result<()>
where
    S: FineTuningService + ?Sized,
    C: Console,
{
    console.say("\nAvailable files for uploading:");
    let files = list_local_files(data_dir)?;
    if files.is_empty() {
        console.say("No files available for uploading.");
        return Ok(());
    }
    for (idx, file) in files.iter().enumerate() {
        console.say(&format!("{}: {}", idx + 1, display_name(file)));
    }

    let input = console.read_line("\nSelect a file to upload (number)")?;
    let Some(path) = pick(&files, &input) else {
        console.say("Invalid selection.");
        return Ok(());
    };

    let name = display_name(path);
    let confirm = console.read_line(&format!("Are you sure you want to upload {}? (yes/no)", name))?;
    if !is_confirmed(&confirm) {
        console.say("Upload cancelled.");
        return Ok(());
    }

    let uploaded = console.busy("Uploading...", || service.upload_file(path, FINE_TUNE_PURPOSE))?;
    console.say(&format!("\nFile uploaded successfully! File ID: {}", uploaded.id));
    Ok(())
}

/// Print the most recent fine-tuning jobs.
pub fn view_jobs<S, C>(service: &S, console: &mut C) -> Result<()>
where
    S: FineTuningService + ?Sized,
    C: Console,
{
    let jobs = console.busy("Fetching jobs...", || service.list_jobs(Some(JOB_PAGE_SIZE)))?;
    if jobs.is_empty() {
        console.say("No fine-tuning jobs found.");
        return Ok(());
    }
    for job in &jobs {
        console.say(&"-".repeat(SEPARATOR_WIDTH));
        for line in describe_job(job) {
            console.say(&line);
        }
    }
    Ok(())
}

/// Create a fine-tuning job from a remote file, on top of either the
/// configured base model or one of the user's succeeded models.
pub fn fine_tune_model<S, C>(service: &S, console: &mut C, base_model: &str) -> Result<()>
where
    S: FineTuningService + ?Sized,
    C: Console,
{
    console.say("\nFiles available to fine-tune from:");
    let files = console.busy("Fetching files...", || service.list_files())?;
    if files.is_empty() {
        console.say("No files available for fine-tuning.");
        return Ok(());
    }
    for (idx, file) in files.iter().enumerate() {
        console.say(&format!("{}: {} (ID: {})", idx + 1, file.filename, file.id));
    }

    let input = console.read_line("\nSelect a file to fine-tune (number)")?;
    let Some(selected_file) = pick(&files, &input) else {
        console.say("Invalid selection.");
        return Ok(());
    };

    let branch = console.read_line(&format!(
        "\nType '1' to fine-tune an existing model of yours or '2' to fine-tune the base model {}",
        base_model
    ))?;

    let model = match branch.trim() {
        "2" => Some(base_model.to_string()),
        "1" => {
            console.say("\nModels available for fine-tuning:");
            match choose_succeeded_job(service, console, "\nSelect a model to fine-tune (number)")? {
                Pick::Unavailable => return Ok(()),
                Pick::Invalid => None,
                Pick::Chosen(job) => job.fine_tuned_model,
            }
        }
        _ => None,
    };
    let Some(model) = model else {
        console.say("\nInvalid input.");
        return Ok(());
    };

    let confirm = console.read_line(&format!(
        "\nAre you sure you want to fine-tune the model {} using {}? (yes/no)",
        model, selected_file.filename
    ))?;
    if !is_confirmed(&confirm) {
        console.say("Fine-tuning cancelled.");
        return Ok(());
    }

    let job = console.busy("Starting fine-tuning job...", || {
        service.create_job(&selected_file.id, &model)
    })?;
    console.say(&format!("\nFine-tuning job started. Job ID: {}", job.id));
    Ok(())
}

/// Pick a fine-tuned model and open a chat session with it.
pub fn converse_with_model<S, C>(service: &S, console: &mut C) -> Result<()>
where
    S: FineTuningService + ?Sized,
    C: Console,
{
    console.say("\nModels available:");
    let job = match choose_succeeded_job(service, console, "\nSelect a model to chat with (number)")? {
        Pick::Unavailable => return Ok(()),
        Pick::Invalid => {
            console.say("Invalid selection.");
            return Ok(());
        }
        Pick::Chosen(job) => job,
    };
    let Some(model) = job.fine_tuned_model else {
        warn!(job_id = %job.id, "succeeded job has no fine-tuned model");
        console.say("The selected job has no fine-tuned model.");
        return Ok(());
    };

    chat::run_session(service, console, &model)?;
    Ok(())
}

/// Ask for a training file name and collect examples into it.
pub fn add_training_data<C: Console>(console: &mut C, data_dir: &Path) -> Result<()> {
    let name = console.read_line(&format!(
        "\nEnter the name of the training file (without the .{} extension)",
        TRAINING_FILE_EXTENSION
    ))?;
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) {
        console.say("Invalid file name.");
        return Ok(());
    }

    let file = TrainingFile::new(data_dir, name);
    if file.exists() {
        console.say(&format!("Adding to existing file: {}", file.file_name()));
        match file.read_all() {
            Ok(records) => console.say(&format!("It currently holds {} example(s).", records.len())),
            Err(e) => {
                warn!(error = %format!("{:#}", e), "existing training file is not clean JSONL");
                console.say(&format!("Warning: {:#}", e));
            }
        }
    } else {
        console.say(&format!("Creating new file: {}", file.file_name()));
    }

    training::run_authoring(console, &file)?;
    Ok(())
}

/// Outcome of picking one of the user's succeeded jobs.
enum Pick {
    /// No succeeded jobs exist; already reported to the user.
    Unavailable,
    /// The input did not name a listed job.
    Invalid,
    Chosen(FineTuningJob),
}

/// Fetch jobs, list the succeeded ones and let the user pick one.
fn choose_succeeded_job<S, C>(service: &S, console: &mut C, prompt: &str) -> Result<Pick>
where
    S: FineTuningService + ?Sized,
    C: Console,
{
    let jobs = console.busy("Fetching jobs...", || service.list_jobs(None))?;
    let completed = succeeded_jobs(jobs);
    if completed.is_empty() {
        console.say("No completed fine-tuning jobs available.");
        return Ok(Pick::Unavailable);
    }

    for (idx, job) in completed.iter().enumerate() {
        console.say(&"-".repeat(SEPARATOR_WIDTH));
        console.say(&describe_model(idx + 1, job));
    }

    let input = console.read_line(prompt)?;
    Ok(match pick(&completed, &input) {
        Some(job) => Pick::Chosen(job.clone()),
        None => Pick::Invalid,
    })
}

/// Lines printed for one job by the job lister.
pub fn describe_job(job: &FineTuningJob) -> Vec<String> {
    let mut lines = vec![
        format!("Job ID: {}", job.id),
        format!("Status: {}", job.status),
        format!("Model: {}", job.fine_tuned_model.as_deref().unwrap_or("None")),
        format!("Created at: {}", format_timestamp(job.created_at)),
    ];
    if let Some(finished) = job.finished_at {
        lines.push(format!("Finished at: {}", format_timestamp(finished)));
    }
    lines.push(format!("Trained Tokens: {}", trained_tokens(job)));
    lines
}

/// Entry shown when picking a fine-tuned model.
pub fn describe_model(position: usize, job: &FineTuningJob) -> String {
    format!(
        "{}: Model: {}\n   Completion Date: {}\n   Tokens Trained: {}",
        position,
        job.fine_tuned_model.as_deref().unwrap_or("None"),
        format_timestamp(job.finished_at.unwrap_or(job.created_at)),
        trained_tokens(job)
    )
}

fn trained_tokens(job: &FineTuningJob) -> String {
    match job.trained_tokens {
        Some(n) if n > 0 => n.to_string(),
        _ => "N/A".into(),
    }
}

/// Epoch seconds as local `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(secs: i64) -> String {
    format_timestamp_in(secs, &Local)
}

pub fn format_timestamp_in<Tz>(secs: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match tz.timestamp_opt(secs, 0).single() {
        Some(dt) => dt.format(TIMESTAMP_FORMAT).to_string(),
        None => secs.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::JobStatus;
    use chrono::Utc;

    fn job(status: JobStatus, tokens: Option<u64>, finished: Option<i64>) -> FineTuningJob {
        FineTuningJob {
            id: "ftjob-1".into(),
            status,
            fine_tuned_model: Some("ft:gpt-3.5-turbo:acme::1".into()),
            created_at: 1_700_000_000,
            finished_at: finished,
            trained_tokens: tokens,
        }
    }

    #[test]
    fn menu_parses_one_through_six() {
        assert_eq!(MenuChoice::parse("1"), Some(MenuChoice::Upload));
        assert_eq!(MenuChoice::parse("6"), Some(MenuChoice::Exit));
        assert_eq!(MenuChoice::parse("7"), None);
        assert_eq!(MenuChoice::parse("exit"), None);
    }

    #[test]
    fn timestamps_render_in_given_zone() {
        assert_eq!(format_timestamp_in(0, &Utc), "1970-01-01 00:00:00");
        assert_eq!(format_timestamp_in(1_700_000_000, &Utc), "2023-11-14 22:13:20");
    }

    #[test]
    fn describe_job_omits_missing_finish_and_uses_placeholder() {
        let lines = describe_job(&job(JobStatus::Running, None, None));
        assert_eq!(lines[0], "Job ID: ftjob-1");
        assert_eq!(lines[1], "Status: running");
        assert!(!lines.iter().any(|l| l.starts_with("Finished at:")));
        assert_eq!(lines.last().unwrap(), "Trained Tokens: N/A");
    }

    #[test]
    fn describe_job_includes_finish_and_tokens_when_present() {
        let lines = describe_job(&job(JobStatus::Succeeded, Some(1234), Some(1_700_003_600)));
        assert!(lines.iter().any(|l| l.starts_with("Finished at:")));
        assert_eq!(lines.last().unwrap(), "Trained Tokens: 1234");
    }

    #[test]
    fn describe_model_is_one_based() {
        let text = describe_model(3, &job(JobStatus::Succeeded, Some(0), None));
        assert!(text.starts_with("3: Model: ft:gpt-3.5-turbo:acme::1"));
        assert!(text.ends_with("Tokens Trained: N/A"));
    }

    #[test]
    fn local_files_are_sorted_and_skip_directories() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.jsonl"), "").unwrap();
        std::fs::write(dir.path().join("a.jsonl"), "").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let names: Vec<String> = list_local_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| display_name(p))
            .collect();
        assert_eq!(names, vec!["a.jsonl", "b.jsonl"]);
    }
}

// Training data authoring. A training file is newline-delimited JSON: one
// record per line, each holding exactly three messages (system, user,
// assistant). Files are only ever appended to.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::api::{ChatMessage, Role};
use crate::console::Console;
use crate::selection::is_exit;

/// System message written into every training record.
pub const TRAINING_SYSTEM_PROMPT: &str =
    "This assistant will help you with your modeling software.";

/// Extension appended to the base name the user enters.
pub const TRAINING_FILE_EXTENSION: &str = "jsonl";

/// One supervised sample: fixed system instruction, a user turn and the
/// desired assistant turn.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TrainingExample {
    pub messages: Vec<ChatMessage>,
}

impl TrainingExample {
    pub fn new(user: impl Into<String>, assistant: impl Into<String>) -> Self {
        TrainingExample {
            messages: vec![
                ChatMessage::new(Role::System, TRAINING_SYSTEM_PROMPT),
                ChatMessage::new(Role::User, user),
                ChatMessage::new(Role::Assistant, assistant),
            ],
        }
    }

    /// Whether the record has the system/user/assistant shape.
    pub fn is_well_formed(&self) -> bool {
        let roles: Vec<Role> = self.messages.iter().map(|m| m.role).collect();
        roles == [Role::System, Role::User, Role::Assistant]
    }

    /// Pretty form echoed back to the user, indented by four spaces.
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)
            .context("Failed to serialize training example")?;
        String::from_utf8(buf).context("Serialized training example is not UTF-8")
    }
}

/// Append-only handle on `<dir>/<name>.jsonl`.
#[derive(Debug, Clone)]
pub struct TrainingFile {
    path: PathBuf,
    file_name: String,
}

impl TrainingFile {
    /// `base_name` is the name without extension.
    pub fn new(dir: &Path, base_name: &str) -> Self {
        let file_name = format!("{}.{}", base_name, TRAINING_FILE_EXTENSION);
        TrainingFile {
            path: dir.join(&file_name),
            file_name,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append one record as a single newline-terminated line, creating the
    /// file (and its directory) on first use.
    pub fn append(&self, example: &TrainingExample) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open training file: {}", self.path.display()))?;

        let json = serde_json::to_string(example).context("Failed to serialize training example")?;

        writeln!(file, "{}", json)
            .with_context(|| format!("Failed to write training file: {}", self.path.display()))?;
        info!(path = %self.path.display(), "training example appended");
        Ok(())
    }

    /// Read every record back. Fails on the first line that does not parse
    /// or lacks the system/user/assistant shape.
    pub fn read_all(&self) -> Result<Vec<TrainingExample>> {
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        let mut records = Vec::new();
        for (i, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: TrainingExample = serde_json::from_str(line)
                .with_context(|| format!("{} line {} is not a valid record", self.file_name, i + 1))?;
            if !record.is_well_formed() {
                bail!("{} line {} is not a system/user/assistant record", self.file_name, i + 1);
            }
            records.push(record);
        }
        Ok(records)
    }
}

/// Prompt for user/assistant pairs and append each one until either
/// prompt receives "exit". A pair with a blank side is skipped. Returns
/// how many records were written.
pub fn run_authoring<C: Console>(console: &mut C, file: &TrainingFile) -> Result<usize> {
    console.say("\nType 'exit' at any prompt to stop adding examples and return to the main menu.");

    let mut written = 0;
    loop {
        let user = console.read_line("\nEnter the sample user prompt")?;
        let user = user.trim();
        if is_exit(user) {
            break;
        }

        let assistant = console.read_line("\nEnter the corresponding assistant response")?;
        let assistant = assistant.trim();
        if is_exit(assistant) {
            break;
        }

        if user.is_empty() || assistant.is_empty() {
            console.say("\nBoth the user prompt and the assistant response must be non-empty. Example skipped.");
            continue;
        }

        let example = TrainingExample::new(user, assistant);
        file.append(&example)?;
        written += 1;

        console.say("\nTraining data added successfully.");
        console.say("\nAdded JSON object:");
        console.say(&example.to_pretty_json()?);
    }

    console.say("Returning to the main menu.");
    Ok(written)
}

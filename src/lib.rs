// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) parses flags, builds the configuration and the API client,
// and hands them to the interactive menu.
//
// Module responsibilities:
// - `config`: Layered configuration (defaults, JSON file, env, flags).
// - `api`: HTTP interactions with the fine-tuning service (files, jobs,
//   chat completions) behind the `FineTuningService` trait.
// - `console`: Line input/output used by every flow, with a terminal
//   implementation and a scripted one.
// - `selection`: 1-based index parsing, yes/no gate, exit sentinel.
// - `chat`: Conversation buffer and the chat loop.
// - `training`: Training-example records and the JSONL appender.
// - `ui`: The main menu and the flows behind each entry.
pub mod api;
pub mod chat;
pub mod config;
pub mod console;
pub mod selection;
pub mod training;
pub mod ui;

//! Fixed-width text report of the task store.
//!
//! [`render`] is the single source of the report text: the `todo.txt`
//! artifact and both remote messages are built from the same [`Report`], so
//! the local and remote views cannot drift apart.

use std::fmt::Write as _;
use std::path::Path;

use crate::error::{IntoTodoError, Result};
use crate::store::{Task, TaskStatus, TaskStore};
use crate::sync::Role;

/// Display width of the task name column.
pub const NAME_WIDTH: usize = 45;

/// Display width of the code pointer column.
pub const CODE_POINTER_WIDTH: usize = 22;

/// Minimum width of the id column. It grows to fit the largest id ever
/// allocated, so both sections share one layout.
const MIN_ID_WIDTH: usize = 4;

/// Width of the status column (fits `PENDING`).
const STATUS_WIDTH: usize = 7;

/// Marker appended to values cut to fit their column.
const ELLIPSIS: &str = "...";

/// Maximum length of a Discord message body.
pub const MESSAGE_LIMIT: usize = 2000;

/// The two rendered sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub pending: String,
    pub done: String,
}

impl Report {
    /// Section rendered for a role.
    #[must_use]
    pub fn section(&self, role: Role) -> &str {
        match role {
            Role::Pending => &self.pending,
            Role::Done => &self.done,
        }
    }

    /// Full report text, pending section first.
    #[must_use]
    pub fn to_text(&self) -> String {
        format!("{}{}", self.pending, self.done)
    }
}

/// Render the store into its pending and done sections.
#[must_use]
pub fn render(store: &TaskStore) -> Report {
    let id_width = id_width(store.last_id());
    let mut pending = section_header(TaskStatus::Pending, id_width);
    let mut done = section_header(TaskStatus::Done, id_width);

    for task in store.tasks() {
        let target = match task.status {
            TaskStatus::Pending => &mut pending,
            TaskStatus::Done => &mut done,
        };
        push_row(target, task, id_width);
    }

    pending.push('\n');
    done.push('\n');
    Report { pending, done }
}

/// Write the report text to `path`.
pub fn write_report(path: &Path, report: &Report) -> Result<()> {
    std::fs::write(path, report.to_text()).into_storage(path)
}

/// Wrap a section in a code block for the chat transport.
#[must_use]
pub fn code_block(section: &str) -> String {
    format!("```\n{section}```")
}

/// Whether a section no longer fits into a single chat message.
#[must_use]
pub fn exceeds_message_limit(section: &str) -> bool {
    code_block(section).chars().count() > MESSAGE_LIMIT
}

/// Cut `value` to `width` chars, ending in `...` when something was dropped.
#[must_use]
pub fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        return value.to_string();
    }
    let keep = width.saturating_sub(ELLIPSIS.len());
    let mut cut: String = value.chars().take(keep).collect();
    cut.push_str(ELLIPSIS);
    cut
}

fn id_width(last_id: u64) -> usize {
    last_id.to_string().len().max(MIN_ID_WIDTH)
}

fn section_header(status: TaskStatus, id_width: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}:", status.label());
    let _ = writeln!(
        out,
        "  {:<id_width$} | {:<NAME_WIDTH$} | {:<CODE_POINTER_WIDTH$} | Status",
        "ID", "Task", "Code Pointer"
    );
    let _ = writeln!(out, "  {}", "-".repeat(table_width(id_width)));
    out
}

fn push_row(out: &mut String, task: &Task, id_width: usize) {
    let _ = writeln!(
        out,
        "  {:<id_width$} | {:<NAME_WIDTH$} | {:<CODE_POINTER_WIDTH$} | {}",
        task.id,
        truncate(&task.name, NAME_WIDTH),
        truncate(&task.code_pointer, CODE_POINTER_WIDTH),
        task.status.label()
    );
}

fn table_width(id_width: usize) -> usize {
    // columns plus the three " | " separators
    id_width + NAME_WIDTH + CODE_POINTER_WIDTH + STATUS_WIDTH + 3 * 3
}

use markbook_core::notify::{Notifier, Severity};
use markbook_core::Project;
use serde::Serialize;
use std::io::{BufRead, Write};

/// How command results are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
}

impl OutputMode {
    /// Print `value` as JSON, or run the human renderer.
    pub fn emit<T: Serialize>(self, value: &T, human: impl FnOnce()) -> anyhow::Result<()> {
        match self {
            Self::Json => println!("{}", serde_json::to_string_pretty(value)?),
            Self::Human => human(),
        }
        Ok(())
    }
}

/// One-line project summary for list output.
#[derive(Debug, Serialize)]
pub struct ProjectRow {
    pub id: String,
    pub name: String,
    pub subject: String,
    pub status: String,
    pub updated: String,
}

impl ProjectRow {
    pub fn from_project(project: &Project) -> Self {
        Self {
            id: short_id(&project.id),
            name: project.name.clone(),
            subject: project.subject.clone(),
            status: project.status.to_string(),
            updated: project.last_modified(),
        }
    }
}

/// First id segment, enough to address a project interactively.
#[must_use]
pub fn short_id(id: &str) -> String {
    id.split('-').next().unwrap_or(id).to_string()
}

/// Sink that renders notifications on stderr and asks confirmations on
/// the terminal. stdout stays clean for command output.
pub struct ConsoleNotifier {
    pub assume_yes: bool,
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Warning | Severity::Error => eprintln!("{severity}: {message}"),
            Severity::Info | Severity::Success => eprintln!("{message}"),
        }
    }

    fn report_error(&self, title: &str, message: &str) {
        eprintln!("error: {title}: {message}");
    }

    fn confirm(&self, title: &str, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        eprint!("{title} {message} [y/N] ");
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim(), "y" | "Y" | "yes" | "Yes")
    }
}

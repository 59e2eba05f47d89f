//! Progress reporting for long-running commands.
//!
//! `tubeflow sync` and `tubeflow describe` walk many records and shell out
//! to external tools for some of them. Progress goes to **stderr**, which
//! keeps stdout parseable for scripts and for `--json` reports.

use std::io::Write;

/// A single progress event.
#[derive(Clone, Debug)]
pub enum ProgressEvent {
    /// Scanning the output directory or loading the index. Total unknown.
    Scanning { stage: String },
    /// Record `n` of `total` is being handled.
    Processing {
        stage: String,
        n: u64,
        total: u64,
        title: String,
    },
}

/// Reports progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Human-friendly progress on stderr: "sync  processing  12 / 1,024  Title".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: ProgressEvent) {
        let line = match &event {
            ProgressEvent::Scanning { stage } => format!("{}  scanning...\n", stage),
            ProgressEvent::Processing {
                stage,
                n,
                total,
                title,
            } => format!(
                "{}  processing  {} / {}  {}\n",
                stage,
                format_number(*n),
                format_number(*total),
                title
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let obj = match &event {
            ProgressEvent::Scanning { stage } => serde_json::json!({
                "event": "progress",
                "stage": stage,
                "phase": "scanning"
            }),
            ProgressEvent::Processing {
                stage,
                n,
                total,
                title,
            } => serde_json::json!({
                "event": "progress",
                "stage": stage,
                "phase": "processing",
                "n": n,
                "total": total,
                "title": title
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: ProgressEvent) {}
}

pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Parse the `--progress` flag value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "off" | "none" => Some(ProgressMode::Off),
            "human" => Some(ProgressMode::Human),
            "json" => Some(ProgressMode::Json),
            _ => None,
        }
    }

    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}

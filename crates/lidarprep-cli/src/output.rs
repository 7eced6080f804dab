use console::style;
use lidarprep_core::logging::RunLog;
use lidarprep_core::{LogEvent, LogLevel, LogSink};
use serde::Serialize;
use std::fmt::Display;
use tabled::{settings::Style, Table, Tabled};

/// Output format mode
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy)]
pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Human
            },
        }
    }

    fn status_json(status: &str, message: impl Display) -> String {
        let output = serde_json::json!({
            "status": status,
            "message": message.to_string(),
        });
        serde_json::to_string_pretty(&output).unwrap_or_else(|_| output.to_string())
    }

    pub fn success(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                println!("{} {}", style("✓").green().bold(), message);
            }
            OutputFormat::Json => {
                println!("{}", Self::status_json("success", message));
            }
        }
    }

    pub fn info(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                println!("{} {}", style("ℹ").blue().bold(), message);
            }
            OutputFormat::Json => {
                println!("{}", Self::status_json("info", message));
            }
        }
    }

    pub fn warning(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                eprintln!("{} {}", style("⚠").yellow().bold(), message);
            }
            OutputFormat::Json => {
                eprintln!("{}", Self::status_json("warning", message));
            }
        }
    }

    pub fn error(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                eprintln!("{} {}", style("✗").red().bold(), message);
            }
            OutputFormat::Json => {
                eprintln!("{}", Self::status_json("error", message));
            }
        }
    }

    /// Render a progress log line. JSON mode keeps stdout for the final result only.
    pub fn log_event(&self, event: &LogEvent) {
        if self.is_json() {
            return;
        }
        match event.level {
            LogLevel::Success => self.success(&event.message),
            LogLevel::Info => self.info(&event.message),
            LogLevel::Warning => self.warning(&event.message),
            LogLevel::Error => self.error(&event.message),
        }
    }

    pub fn table<T: Tabled>(&self, data: Vec<T>) {
        if self.is_json() {
            return;
        }
        if data.is_empty() {
            println!("{}", style("(no data)").dim());
        } else {
            let mut table = Table::new(data);
            table.with(Style::rounded());
            println!("{}", table);
        }
    }

    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Human => {
                println!("{}", serde_json::to_string_pretty(&data)?);
            }
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "status": "success",
                    "data": data,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }
        Ok(())
    }

    pub fn kv(&self, key: impl Display, value: impl Display) {
        if let OutputFormat::Human = self.format {
            println!("{}: {}", style(key).bold(), value);
        }
    }

    pub fn section(&self, title: impl Display) {
        if let OutputFormat::Human = self.format {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}

/// Log sink printing to the terminal, optionally keeping a run-history file
pub struct ConsoleSink {
    output: OutputWriter,
    history: Option<RunLog>,
}

impl ConsoleSink {
    pub fn new(output: OutputWriter, history: Option<RunLog>) -> Self {
        Self { output, history }
    }
}

impl LogSink for ConsoleSink {
    fn emit(&self, event: LogEvent) {
        event.trace();
        if let Some(history) = &self.history {
            history.log(&event);
        }
        self.output.log_event(&event);
    }
}

use console::style;
use lidarprep_core::LidarError;
use std::fmt;
use std::path::Path;

/// Enhanced error type with suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());

        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("To fix this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Create error for a missing input directory
pub fn input_dir_not_found(path: &Path) -> CliError {
    CliError::new("Input directory not found")
        .with_context(format!(
            "The input path does not exist or is not a directory.\n\nPath: {}",
            path.display()
        ))
        .with_suggestion("Check the --input path and try again")
        .with_suggestion("Use an absolute path or a path relative to the current directory")
        .with_help("Run: lidarprep downsample --help")
}

/// Create error for a parameter that does not fit its method
pub fn invalid_parameter(method: &str, value: &str, reason: &str) -> CliError {
    let example = match method {
        "ratio" => "--param 0.1 keeps a tenth of the points",
        "grid" => "--param 1.0 keeps one point per 1x1 cell",
        _ => "--param 1000 keeps 1000 points",
    };

    CliError::new(format!("Invalid parameter for {}", method))
        .with_context(format!("Value: {}\nReason: {}", value, reason))
        .with_suggestion(format!("Example: {}", example))
        .with_help("Run: lidarprep downsample --help")
}

/// Create error for invalid configuration
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check lidarprep.toml (or the file given with --config) for syntax errors")
        .with_suggestion("Check LIDARPREP_* environment variables")
        .with_help("Run: lidarprep config")
}

/// Map a core error to a user-facing error with suggestions
pub fn from_core(error: LidarError) -> CliError {
    match error {
        LidarError::InputDirNotFound { ref path } => input_dir_not_found(path),
        LidarError::InvalidParameter { ref method, ref value, ref reason } => {
            invalid_parameter(method, value, reason)
        }
        LidarError::ConfigInvalid { ref key, ref reason } => invalid_config(key, reason),
        LidarError::UnknownMethod { .. } => CliError::new(error.to_string())
            .with_suggestion("Use one of: ratio, count, grid, kmeans")
            .with_help("Run: lidarprep downsample --help"),
        other => CliError::new(other.to_string()),
    }
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    let error = match error.downcast::<LidarError>() {
        Ok(core) => return from_core(core),
        Err(other) => other,
    };
    let message = format!("{:#}", error);

    // Try to provide context based on error message
    if message.contains("No such file or directory") {
        CliError::new("File not found")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check the file path and try again")
    } else if message.to_lowercase().contains("permission denied") {
        CliError::new("Permission denied")
            .with_context(format!("Error: {}", message))
            .with_suggestion("Check file permissions")
            .with_suggestion("Or run with appropriate privileges")
    } else {
        CliError::new(message)
    }
}

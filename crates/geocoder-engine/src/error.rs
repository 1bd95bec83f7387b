use std::time::Duration;

use thiserror::Error;

/// Longest stderr excerpt surfaced to callers. The full text is only logged.
const MAX_DIAGNOSTIC_CHARS: usize = 200;

/// Errors produced while invoking the resolution engine or reading its output.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine (or the wait for an admission slot) exceeded the wall-clock budget.
    #[error("resolution engine timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The engine executable could not be started.
    #[error("failed to start resolution engine {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Pipe I/O with a running engine failed.
    #[error("I/O error talking to resolution engine: {0}")]
    Io(#[from] std::io::Error),

    /// The engine exited unsuccessfully or was killed by a signal.
    #[error("resolution engine exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    /// The engine's stdout did not match the expected record schema.
    #[error("malformed resolution engine output: {reason}")]
    Malformed { reason: String },
}

/// Caller-facing classification of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    ResolutionTimeout,
    ResolutionEngineFailure,
    MalformedEngineOutput,
}

impl FailureKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ResolutionTimeout => "ResolutionTimeout",
            Self::ResolutionEngineFailure => "ResolutionEngineFailure",
            Self::MalformedEngineOutput => "MalformedEngineOutput",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl EngineError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::ResolutionTimeout,
            Self::Spawn { .. } | Self::Io(_) | Self::Failed { .. } => {
                FailureKind::ResolutionEngineFailure
            }
            Self::Malformed { .. } => FailureKind::MalformedEngineOutput,
        }
    }

    /// Short message safe to return to an HTTP caller.
    ///
    /// Engine stderr is reduced to its first non-empty line and truncated.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            Self::Failed { status, stderr } => {
                let excerpt = first_line_excerpt(stderr);
                if excerpt.is_empty() {
                    format!("resolution engine exited with {status}")
                } else {
                    format!("resolution engine exited with {status}: {excerpt}")
                }
            }
            Self::Spawn { program, source } => {
                format!("failed to start resolution engine {program}: {}", source.kind())
            }
            Self::Malformed { reason } => {
                format!(
                    "malformed resolution engine output: {}",
                    first_line_excerpt(reason)
                )
            }
            Self::Timeout { .. } | Self::Io(_) => self.to_string(),
        }
    }
}

fn first_line_excerpt(text: &str) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    if line.chars().count() > MAX_DIAGNOSTIC_CHARS {
        let cut: String = line.chars().take(MAX_DIAGNOSTIC_CHARS).collect();
        format!("{cut}…")
    } else {
        line.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let timeout = EngineError::Timeout {
            timeout: Duration::from_secs(30),
        };
        assert_eq!(timeout.kind(), FailureKind::ResolutionTimeout);

        let failed = EngineError::Failed {
            status: "exit status: 1".to_string(),
            stderr: String::new(),
        };
        assert_eq!(failed.kind(), FailureKind::ResolutionEngineFailure);

        let spawn = EngineError::Spawn {
            program: "abrg".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert_eq!(spawn.kind(), FailureKind::ResolutionEngineFailure);

        let malformed = EngineError::Malformed {
            reason: "expected a JSON array".to_string(),
        };
        assert_eq!(malformed.kind(), FailureKind::MalformedEngineOutput);
    }

    #[test]
    fn timeout_message_names_budget() {
        let err = EngineError::Timeout {
            timeout: Duration::from_secs(30),
        };
        assert_eq!(err.diagnostic(), "resolution engine timed out after 30s");
    }

    #[test]
    fn diagnostic_keeps_first_stderr_line_only() {
        let err = EngineError::Failed {
            status: "exit status: 2".to_string(),
            stderr: "\n  database not found at /data\n    at Object.<anonymous> (/app/x.js:1:1)\n"
                .to_string(),
        };
        assert_eq!(
            err.diagnostic(),
            "resolution engine exited with exit status: 2: database not found at /data"
        );
    }

    #[test]
    fn diagnostic_truncates_long_stderr() {
        let err = EngineError::Failed {
            status: "exit status: 1".to_string(),
            stderr: "x".repeat(1000),
        };
        let msg = err.diagnostic();
        assert!(msg.ends_with('…'));
        assert!(msg.chars().count() < 260, "message too long: {}", msg.len());
    }

    #[test]
    fn diagnostic_without_stderr_names_status() {
        let err = EngineError::Failed {
            status: "signal: 9 (SIGKILL)".to_string(),
            stderr: "   ".to_string(),
        };
        assert_eq!(
            err.diagnostic(),
            "resolution engine exited with signal: 9 (SIGKILL)"
        );
    }
}

use serde::{Deserialize, Serialize};

/// How the scan engine's container finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitSignal {
    /// The container ran and exited with this status code.
    Code(i32),
    /// The engine image could not be pulled.
    ImageNotFound { image: String },
    /// The container runtime itself failed before an exit status was known.
    RuntimeFailure { reason: String },
}

/// Classified result of a single scan engine invocation.
///
/// | Exit signal | Outcome |
/// |-------------|---------|
/// | `0` | [`ScanOutcome::Success`] |
/// | `1` | [`ScanOutcome::VulnerabilitiesFound`] |
/// | `2` | [`ScanOutcome::EngineError`] |
/// | `3` | [`ScanOutcome::NoSupportedManifest`] |
/// | image missing | [`ScanOutcome::ImageNotFound`] |
/// | anything else | [`ScanOutcome::Unknown`] |
///
/// None of these abort a run; they only decide how the invocation is logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScanOutcome {
    Success,
    VulnerabilitiesFound,
    EngineError,
    NoSupportedManifest,
    ImageNotFound { image: String },
    Unknown { signal: ExitSignal },
}

impl ScanOutcome {
    pub fn from_exit_code(code: i32) -> Self {
        Self::classify(ExitSignal::Code(code))
    }

    pub fn classify(signal: ExitSignal) -> Self {
        match signal {
            ExitSignal::Code(0) => ScanOutcome::Success,
            ExitSignal::Code(1) => ScanOutcome::VulnerabilitiesFound,
            ExitSignal::Code(2) => ScanOutcome::EngineError,
            ExitSignal::Code(3) => ScanOutcome::NoSupportedManifest,
            ExitSignal::ImageNotFound { image } => ScanOutcome::ImageNotFound { image },
            other => ScanOutcome::Unknown { signal: other },
        }
    }

    /// The container exit status behind this outcome, if the container ran.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ScanOutcome::Success => Some(0),
            ScanOutcome::VulnerabilitiesFound => Some(1),
            ScanOutcome::EngineError => Some(2),
            ScanOutcome::NoSupportedManifest => Some(3),
            ScanOutcome::ImageNotFound { .. } => None,
            ScanOutcome::Unknown { signal } => match signal {
                ExitSignal::Code(code) => Some(*code),
                _ => None,
            },
        }
    }

    /// True for outcomes logged at error level.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ScanOutcome::EngineError | ScanOutcome::ImageNotFound { .. } | ScanOutcome::Unknown { .. }
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOutcome::Success => "success",
            ScanOutcome::VulnerabilitiesFound => "vulnerabilities_found",
            ScanOutcome::EngineError => "engine_error",
            ScanOutcome::NoSupportedManifest => "no_supported_manifest",
            ScanOutcome::ImageNotFound { .. } => "image_not_found",
            ScanOutcome::Unknown { .. } => "unknown",
        }
    }

    pub fn description(&self) -> String {
        match self {
            ScanOutcome::Success => "No vulnerabilities found".to_string(),
            ScanOutcome::VulnerabilitiesFound => "Vulnerabilities found".to_string(),
            ScanOutcome::EngineError => "Scan engine error".to_string(),
            ScanOutcome::NoSupportedManifest => "No supported manifests found".to_string(),
            ScanOutcome::ImageNotFound { image } => format!("Scanner image not found: {}", image),
            ScanOutcome::Unknown { signal } => match signal {
                ExitSignal::Code(code) => format!("Unexpected exit code {}", code),
                ExitSignal::RuntimeFailure { reason } => format!("Container runtime failed: {}", reason),
                ExitSignal::ImageNotFound { image } => format!("Scanner image not found: {}", image),
            },
        }
    }
}

impl std::fmt::Display for ScanOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_exit_codes() {
        assert_eq!(ScanOutcome::from_exit_code(0), ScanOutcome::Success);
        assert_eq!(ScanOutcome::from_exit_code(1), ScanOutcome::VulnerabilitiesFound);
        assert_eq!(ScanOutcome::from_exit_code(2), ScanOutcome::EngineError);
        assert_eq!(ScanOutcome::from_exit_code(3), ScanOutcome::NoSupportedManifest);
    }

    #[test]
    fn test_classify_image_not_found() {
        let outcome = ScanOutcome::classify(ExitSignal::ImageNotFound {
            image: "snyk/snyk-cli:npm".to_string(),
        });
        assert_eq!(
            outcome,
            ScanOutcome::ImageNotFound {
                image: "snyk/snyk-cli:npm".to_string()
            }
        );
        assert_eq!(outcome.exit_code(), None);
        assert!(outcome.is_error());
    }

    #[test]
    fn test_classify_unknown_keeps_raw_signal() {
        let outcome = ScanOutcome::from_exit_code(137);
        assert_eq!(
            outcome,
            ScanOutcome::Unknown {
                signal: ExitSignal::Code(137)
            }
        );
        assert_eq!(outcome.exit_code(), Some(137));

        let outcome = ScanOutcome::classify(ExitSignal::RuntimeFailure {
            reason: "killed".to_string(),
        });
        assert_eq!(outcome.exit_code(), None);
        assert!(outcome.description().contains("killed"));
    }

    #[test]
    fn test_exit_code_round_trips_for_known_codes() {
        for code in 0..=3 {
            assert_eq!(ScanOutcome::from_exit_code(code).exit_code(), Some(code));
        }
    }

    #[test]
    fn test_error_severity() {
        assert!(!ScanOutcome::Success.is_error());
        assert!(!ScanOutcome::VulnerabilitiesFound.is_error());
        assert!(!ScanOutcome::NoSupportedManifest.is_error());
        assert!(ScanOutcome::EngineError.is_error());
    }

    #[test]
    fn test_serialize_tagged() {
        let json = serde_json::to_value(ScanOutcome::NoSupportedManifest).unwrap();
        assert_eq!(json["outcome"], "no_supported_manifest");
    }
}

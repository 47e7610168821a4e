//! Structured CLI errors with meaningful exit codes.
//!
//! Exit code scheme:
//! - 0:  success
//! - 2:  clap arg parse error (automatic, before our code runs)
//! - 10: core error (unknown solver, unsupported plot, bad dimensions)
//! - 11: I/O error (scene read, PNG write)
//! - 12: input error (malformed scene, bad JSON params)
//! - 13: serialization error

use fieldviz_core::FieldError;
use std::fmt;

/// Errors produced by CLI operations, each mapped to a distinct exit code.
#[derive(Debug)]
pub enum CliError {
    /// A core error (unknown solver, unsupported plot, bad dimensions).
    Core(FieldError),
    /// An I/O error (reading a scene, writing output).
    Io(String),
    /// A user input error (malformed scene or params).
    Input(String),
    /// A serialization error (JSON output failure).
    Serialization(String),
}

impl CliError {
    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(_) => 10,
            CliError::Io(_) => 11,
            CliError::Input(_) => 12,
            CliError::Serialization(_) => 13,
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Core(e) => write!(f, "{e}"),
            CliError::Io(msg) => write!(f, "{msg}"),
            CliError::Input(msg) => write!(f, "{msg}"),
            CliError::Serialization(msg) => write!(f, "{msg}"),
        }
    }
}

impl From<FieldError> for CliError {
    fn from(e: FieldError) -> Self {
        match e {
            FieldError::Io(msg) => CliError::Io(msg),
            e @ (FieldError::InvalidScene(_)
            | FieldError::ParamNotFound(_)
            | FieldError::ParamTypeMismatch { .. }) => CliError::Input(e.to_string()),
            other => CliError::Core(other),
        }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_error_exit_code_is_10() {
        let err = CliError::Core(FieldError::UnknownSolver("foo".into()));
        assert_eq!(err.exit_code(), 10);
    }

    #[test]
    fn io_error_exit_code_is_11() {
        let err = CliError::Io("write failed".into());
        assert_eq!(err.exit_code(), 11);
    }

    #[test]
    fn input_error_exit_code_is_12() {
        let err = CliError::Input("bad scene".into());
        assert_eq!(err.exit_code(), 12);
    }

    #[test]
    fn serialization_error_exit_code_is_13() {
        let err = CliError::Serialization("json fail".into());
        assert_eq!(err.exit_code(), 13);
    }

    #[test]
    fn from_field_error_io_routes_to_cli_io() {
        let cli_err = CliError::from(FieldError::Io("disk full".into()));
        assert_eq!(cli_err.exit_code(), 11);
        assert!(cli_err.to_string().contains("disk full"));
    }

    #[test]
    fn from_field_error_scene_routes_to_input() {
        let cli_err = CliError::from(FieldError::InvalidScene("charges: missing id".into()));
        assert_eq!(cli_err.exit_code(), 12);
        assert!(cli_err.to_string().contains("missing id"));

        let cli_err = CliError::from(FieldError::ParamNotFound("width".into()));
        assert_eq!(cli_err.exit_code(), 12);
    }

    #[test]
    fn from_field_error_other_routes_to_cli_core() {
        let cli_err = CliError::from(FieldError::UnsupportedPlot {
            solver: "magnetostatic".into(),
            plot: "field-line".into(),
        });
        assert_eq!(cli_err.exit_code(), 10);
        assert!(cli_err.to_string().contains("magnetostatic"));
    }

    #[test]
    fn from_serde_json_error_routes_to_serialization() {
        let bad_json = serde_json::from_str::<serde_json::Value>("{invalid");
        let cli_err = CliError::from(bad_json.unwrap_err());
        assert_eq!(cli_err.exit_code(), 13);
    }

    #[test]
    fn debug_output_names_the_variant() {
        let err = CliError::Io("disk full".into());
        let dbg = format!("{err:?}");
        assert!(dbg.contains("Io"));
        assert!(dbg.contains("disk full"));

        let result: Result<(), CliError> = Err(CliError::Core(FieldError::UnknownSolver("x".into())));
        assert_eq!(result.unwrap_err().exit_code(), 10);
    }
}

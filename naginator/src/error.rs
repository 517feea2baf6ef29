#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the naginator crate."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.

use std::path::{Path, PathBuf};

/// Unified error type returned by the configuration loader, the PuppetDB
/// client, the renderers and the CLI.
///
/// Duplicate resources, unknown object types and empty derived groups are
/// not represented here: they are expected conditions that are logged and
/// skipped.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// Wraps I/O errors that occur while reading configuration files.
    #[error("failed to read configuration from {path:?}: {source}")]
    Io {
        /// Location of the configuration file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors.
    #[error("failed to parse configuration: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Returned when the configuration violates invariants.
    #[error("invalid configuration: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// The CMDB could not be reached or answered with a failure status.
    #[error("puppetdb query failed: {message}")]
    Cmdb {
        /// Human readable message describing the transport failure.
        message: String
    },
    /// Wraps JSON decoding errors for CMDB responses.
    #[error("failed to decode puppetdb response: {source}")]
    Decode {
        /// Underlying decoding error.
        source: serde_json::Error
    },
    /// Wraps I/O errors that occur while writing generated Nagios files.
    #[error("failed to write nagios configuration at {path:?}: {source}")]
    Write {
        /// Location of the output file being produced.
        path:   PathBuf,
        /// Underlying I/O error reported by the operating system.
        source: std::io::Error
    },
    /// A hostgroup template referenced facts the host does not have.
    #[error("host {host} lacks facts {facts:?} required by hostgroup template '{template}'")]
    MissingFact {
        /// Node whose facts were used as the substitution context.
        host:     String,
        /// Template that failed to expand.
        template: String,
        /// Every fact name the template referenced but the host lacks.
        facts:    Vec<String>
    }
}

impl Error {
    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs a CMDB transport error from the provided message.
    pub fn cmdb<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Cmdb {
            message: message.into()
        }
    }

    /// Formats the error for diagnostics without the variant name.
    ///
    /// This method is primarily intended for CLI contexts where the variant
    /// name does not add value to end users. The returned string matches the
    /// [`std::fmt::Display`] implementation.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Decode {
            source
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Cmdb {
            message: error.to_string()
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the configuration file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}

/// Creates an [`Error::Write`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the generated file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn write_error(path: &Path, source: std::io::Error) -> Error {
    Error::Write {
        path: path.to_path_buf(),
        source
    }
}

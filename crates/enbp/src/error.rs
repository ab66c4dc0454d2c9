//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use enbp_config::ConfigError;
use enbp_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const CANCELLED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(enbp::unreachable),
        help(
            "Check that the site is reachable from this machine.\n\
             Try: enbp sites check"
        )
    )]
    Unreachable { message: String },

    #[error("Could not connect to {url}: {reason}")]
    #[diagnostic(
        code(enbp::connection_failed),
        help("Gateways use self-signed certificates; pass --insecure (-k) or set `insecure = true`.")
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(enbp::auth_failed),
        help(
            "Re-enter the API token:\n  \
             enbp sites add-gateway --address <ADDRESS>\n  \
             enbp sites add-cloud --token <TOKEN>"
        )
    )]
    AuthFailed { message: String },

    // ── Resources ────────────────────────────────────────────────────
    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(enbp::not_found),
        help("Run: enbp {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    #[error("No active site")]
    #[diagnostic(
        code(enbp::no_active_site),
        help("Connect one with: enbp sites connect <ID>")
    )]
    NoActiveSite,

    #[error("No device selected")]
    #[diagnostic(
        code(enbp::no_active_device),
        help("Select one with: enbp devices select <ID>")
    )]
    NoActiveDevice,

    // ── Blueprints ───────────────────────────────────────────────────
    #[error("{message}")]
    #[diagnostic(
        code(enbp::manifest),
        help("Check blueprint_spec and the firmware path in the manifest.")
    )]
    Manifest { message: String },

    #[error("Failed to zip blueprint {manifest}")]
    #[diagnostic(
        code(enbp::packaging_failed),
        help("Make sure the file or directory the manifest points to exists.")
    )]
    PackagingFailed { manifest: String },

    #[error(
        "Blueprint {blueprint_id} was uploaded but not assigned to device {device_id}: {reason}"
    )]
    #[diagnostic(code(enbp::assign_failed), help("Retry with: enbp upload"))]
    AssignFailed {
        blueprint_id: String,
        device_id: String,
        reason: String,
    },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error: {message}")]
    #[diagnostic(code(enbp::api_error))]
    ApiError { message: String, status: Option<u16> },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(enbp::validation))]
    Validation { field: String, reason: String },

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(enbp::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Configuration / storage ──────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(enbp::config))]
    Config(#[from] ConfigError),

    #[error("Storage error: {message}")]
    #[diagnostic(code(enbp::storage))]
    Storage { message: String },

    #[error("Internal error: {message}")]
    #[diagnostic(code(enbp::internal))]
    Internal { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Cancelled")]
    #[diagnostic(code(enbp::cancelled))]
    Cancelled,

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(enbp::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unreachable { .. } | Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::NoActiveSite | Self::NoActiveDevice => {
                exit_code::NOT_FOUND
            }
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::Cancelled => exit_code::CANCELLED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            e @ (CoreError::Unauthorized { .. }
            | CoreError::AuthenticationFailed { .. }
            | CoreError::TokenNotFound { .. }) => CliError::AuthFailed {
                message: e.to_string(),
            },

            e @ (CoreError::Unreachable { .. } | CoreError::SiteIdMismatch { .. }) => {
                CliError::Unreachable {
                    message: e.to_string(),
                }
            }

            CoreError::ConnectionFailed { url, reason } => {
                CliError::ConnectionFailed { url, reason }
            }

            CoreError::SiteNotFound { site, site_id } => CliError::NotFound {
                resource_type: "site".into(),
                identifier: format!("{site} ({site_id})"),
                list_command: "sites list".into(),
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => {
                let resource_type = entity_type.to_lowercase();
                CliError::NotFound {
                    list_command: format!("{resource_type}s list"),
                    resource_type,
                    identifier,
                }
            }

            CoreError::NoActiveSite => CliError::NoActiveSite,
            CoreError::NoActiveDevice => CliError::NoActiveDevice,

            CoreError::InvalidAddress { address, reason } => CliError::Validation {
                field: "address".into(),
                reason: format!("{address:?}: {reason}"),
            },

            e @ (CoreError::Manifest(_) | CoreError::Package(_)) => CliError::Manifest {
                message: e.to_string(),
            },

            CoreError::PackagingFailed { manifest } => CliError::PackagingFailed { manifest },

            CoreError::AssignFailed {
                blueprint_id,
                device_id,
                reason,
            } => CliError::AssignFailed {
                blueprint_id,
                device_id,
                reason,
            },

            CoreError::Api { message, status } => CliError::ApiError { message, status },

            CoreError::Storage(e) => CliError::Storage {
                message: e.to_string(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            e @ CoreError::SiteTypeMismatch { .. } => CliError::Internal {
                message: e.to_string(),
            },

            CoreError::Cancelled => CliError::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::Cancelled, exit_code::CANCELLED),
            (CoreError::NoActiveDevice, exit_code::NOT_FOUND),
            (
                CoreError::Unauthorized {
                    site: "Lab".into(),
                    site_id: "g1".into(),
                },
                exit_code::AUTH,
            ),
            (
                CoreError::Unreachable {
                    site: "Lab".into(),
                    site_id: "g1".into(),
                    reason: "timed out".into(),
                },
                exit_code::CONNECTION,
            ),
            (
                CoreError::InvalidAddress {
                    address: "gw".into(),
                    reason: "relative URL without a base".into(),
                },
                exit_code::USAGE,
            ),
            (
                CoreError::PackagingFailed {
                    manifest: "manifest.yml".into(),
                },
                exit_code::GENERAL,
            ),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }

    #[test]
    fn not_found_points_at_list_command() {
        let err = CliError::from(CoreError::NotFound {
            entity_type: "Device",
            identifier: "d9".into(),
        });
        match err {
            CliError::NotFound { list_command, .. } => assert_eq!(list_command, "devices list"),
            other => panic!("unexpected: {other:?}"),
        }
    }
}

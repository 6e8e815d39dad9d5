//! Component configuration errors and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{Diagnostic, UserNotification};

fn describe_file(file: &Option<PathBuf>) -> String {
    file.as_ref()
        .map(|f| f.display().to_string())
        .unwrap_or_else(|| "<unknown>".to_string())
}

/// Error in the component graph of a project.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ComponentError {
    #[error("component `{name}` is defined in multiple configuration files")]
    DuplicateDefinition {
        name: String,
        first: Option<PathBuf>,
        second: Option<PathBuf>,
    },

    #[error("component `{name}` not found in the configuration")]
    NotFound {
        name: String,
        /// Variant, platform or component referencing the name
        referenced_by: String,
        file: Option<PathBuf>,
    },

    #[error("component `{component}` requires `{required}`, which is not available")]
    MissingRequired {
        component: String,
        required: String,
        file: Option<PathBuf>,
    },

    #[error("`{alias}` is provided by more than one component")]
    AmbiguousAlias {
        alias: String,
        requested_by: String,
        candidates: Vec<String>,
    },
}

impl ComponentError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ComponentError::DuplicateDefinition { name, first, second } => Diagnostic::error(
                format!(
                    "Component '{}' is defined in multiple configuration files.",
                    name
                ),
            )
            .with_context(format!(
                "See {} and {}",
                describe_file(first),
                describe_file(second)
            ))
            .with_suggestion("help: Rename one of the components or remove the duplicate"),

            ComponentError::NotFound {
                name,
                referenced_by,
                file,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "Component '{}' not found in the configuration.",
                    name
                ))
                .with_context(format!("referenced by {}", referenced_by));
                if let Some(f) = file {
                    diag = diag.with_location(f.clone());
                }
                diag
            }

            ComponentError::MissingRequired {
                component,
                required,
                file,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "Component '{}' requires '{}', which is neither a selected component nor an alias of one.",
                    component, required
                ))
                .with_suggestion(format!(
                    "help: Add a component named or aliased '{}' to the variant or platform",
                    required
                ));
                if let Some(f) = file {
                    diag = diag.with_location(f.clone());
                }
                diag
            }

            ComponentError::AmbiguousAlias {
                alias,
                requested_by,
                candidates,
            } => Diagnostic::error(format!(
                "'{}' requested by {} is provided by several components.",
                alias, requested_by
            ))
            .with_context(format!("candidates: {}", candidates.join(", ")))
            .with_suggestion(
                "help: Select exactly one of the candidates for the variant or platform",
            ),
        }
    }
}

impl From<ComponentError> for UserNotification {
    fn from(err: ComponentError) -> Self {
        err.to_diagnostic().into()
    }
}

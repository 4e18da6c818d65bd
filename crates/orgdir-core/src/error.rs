use thiserror::Error;

use crate::taxonomy::MAX_DEPTH;

/// Errors raised while loading [`crate::AppConfig`] from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

/// Typed failures of directory operations.
///
/// Every variant is detected before any mutation is applied, so an `Err`
/// always means nothing was written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DirectoryError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("parent activity {0} not found")]
    ParentNotFound(i64),
    #[error("an activity named {name:?} already exists under {}", describe_parent(.parent_id))]
    DuplicateSibling { name: String, parent_id: Option<i64> },
    #[error("activity {0} cannot be its own parent")]
    SelfParent(i64),
    #[error("moving activity {node_id} under {new_parent_id} would create a cycle")]
    CycleDetected { node_id: i64, new_parent_id: i64 },
    #[error("activity depth limit exceeded (max {max} levels, got {depth})", max = MAX_DEPTH)]
    DepthExceeded { depth: u8 },
    #[error("building {building_id} is still referenced by {organizations} organization(s)")]
    ReferentialRestriction { building_id: i64, organizations: i64 },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
}

/// Stable identity of a [`DirectoryError`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidParameter,
    ParentNotFound,
    DuplicateSibling,
    SelfParent,
    CycleDetected,
    DepthExceeded,
    ReferentialRestriction,
    NotFound,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidParameter => "invalid_parameter",
            ErrorKind::ParentNotFound => "parent_not_found",
            ErrorKind::DuplicateSibling => "duplicate_sibling",
            ErrorKind::SelfParent => "self_parent",
            ErrorKind::CycleDetected => "cycle_detected",
            ErrorKind::DepthExceeded => "depth_exceeded",
            ErrorKind::ReferentialRestriction => "referential_restriction",
            ErrorKind::NotFound => "not_found",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DirectoryError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            DirectoryError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            DirectoryError::ParentNotFound(_) => ErrorKind::ParentNotFound,
            DirectoryError::DuplicateSibling { .. } => ErrorKind::DuplicateSibling,
            DirectoryError::SelfParent(_) => ErrorKind::SelfParent,
            DirectoryError::CycleDetected { .. } => ErrorKind::CycleDetected,
            DirectoryError::DepthExceeded { .. } => ErrorKind::DepthExceeded,
            DirectoryError::ReferentialRestriction { .. } => ErrorKind::ReferentialRestriction,
            DirectoryError::NotFound { .. } => ErrorKind::NotFound,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        DirectoryError::InvalidParameter(message.into())
    }
}

/// Page sizes must fall in `1..=max`.
pub(crate) fn check_limit(limit: usize, max: usize) -> Result<(), DirectoryError> {
    if limit == 0 || limit > max {
        return Err(invalid(format!(
            "limit must be between 1 and {max}, got {limit}"
        )));
    }
    Ok(())
}

pub(crate) fn invalid(message: impl Into<String>) -> DirectoryError {
    DirectoryError::invalid(message)
}

fn describe_parent(parent_id: &Option<i64>) -> String {
    parent_id.map_or_else(|| "the roots".to_string(), |id| format!("activity {id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_codes_are_stable() {
        let cases = [
            (DirectoryError::invalid("x"), "invalid_parameter"),
            (DirectoryError::ParentNotFound(1), "parent_not_found"),
            (
                DirectoryError::DuplicateSibling {
                    name: "x".to_string(),
                    parent_id: None,
                },
                "duplicate_sibling",
            ),
            (DirectoryError::SelfParent(1), "self_parent"),
            (
                DirectoryError::CycleDetected {
                    node_id: 1,
                    new_parent_id: 2,
                },
                "cycle_detected",
            ),
            (DirectoryError::DepthExceeded { depth: 4 }, "depth_exceeded"),
            (
                DirectoryError::ReferentialRestriction {
                    building_id: 1,
                    organizations: 2,
                },
                "referential_restriction",
            ),
            (
                DirectoryError::NotFound {
                    entity: "building",
                    id: 9,
                },
                "not_found",
            ),
        ];

        for (error, code) in cases {
            assert_eq!(error.kind().as_str(), code, "{error}");
        }
    }

    #[test]
    fn duplicate_sibling_message_names_the_parent() {
        let root = DirectoryError::DuplicateSibling {
            name: "Food".to_string(),
            parent_id: None,
        };
        assert!(root.to_string().contains("the roots"));

        let child = DirectoryError::DuplicateSibling {
            name: "Meat".to_string(),
            parent_id: Some(7),
        };
        assert!(child.to_string().contains("activity 7"));
    }
}

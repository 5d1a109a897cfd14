use crate::domain::{CommandKind, ElementId};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("host execution context is unavailable ({kind:?})")]
    Unavailable { kind: CommandKind },

    #[error("host failed to execute {kind:?}: {message}")]
    HostExecution { kind: CommandKind, message: String },

    #[error("{kind:?} request was replaced by a newer one before it ran")]
    Superseded { kind: CommandKind },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("dispatch unavailable: {0}")]
    DispatchUnavailable(String),

    #[error("host execution failure: {0}")]
    HostExecutionFailure(String),

    #[error("enumeration failure: {0}")]
    EnumerationFailure(String),
}

impl From<DispatchError> for WorkflowError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Unavailable { .. } | DispatchError::Superseded { .. } => {
                WorkflowError::DispatchUnavailable(err.to_string())
            }
            DispatchError::HostExecution { message, .. } => {
                WorkflowError::HostExecutionFailure(message)
            }
        }
    }
}

impl WorkflowError {
    pub fn missing_id(name: &str) -> Self {
        WorkflowError::EnumerationFailure(format!("element {name:?} has no id"))
    }

    pub fn duplicate_id(id: ElementId) -> Self {
        WorkflowError::EnumerationFailure(format!("duplicate element id {id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_errors_map_into_workflow_taxonomy() {
        let unavailable = DispatchError::Unavailable {
            kind: CommandKind::DeleteMany,
        };
        assert!(matches!(
            WorkflowError::from(unavailable),
            WorkflowError::DispatchUnavailable(_)
        ));

        let failed = DispatchError::HostExecution {
            kind: CommandKind::DeleteOne,
            message: "locked".to_string(),
        };
        assert_eq!(
            WorkflowError::from(failed),
            WorkflowError::HostExecutionFailure("locked".to_string())
        );
    }
}

use crate::docs::DocFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TillerError {
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("unknown document: {0}")]
    UnknownDocument(String),

    #[error("document not found: {0}")]
    MissingDocument(DocFile),

    #[error("invalid workflow definition '{0}': {1}")]
    InvalidDefinition(String, String),

    #[error("combined workflow '{combined}' references unknown step '{step}'")]
    UnknownStep { combined: String, step: String },

    #[error("no combined workflow in progress")]
    NoCombinedWorkflow,

    #[error("no pending proposals to apply")]
    NoPendingProposals,

    #[error("no workflow is awaiting a generation response")]
    NotAwaitingResponse,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TillerError>;

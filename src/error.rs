use crate::types::{Role, Stage, StageStatus};

pub type Result<T> = std::result::Result<T, WorkflowError>;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Request {request_id} cannot take this decision: {refusal}")]
    InvalidTransition { request_id: String, refusal: Refusal },
    #[error("No {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },
    #[error("Record {index} in {collection} is malformed: {reason}")]
    MalformedRecord {
        collection: String,
        index: usize,
        reason: String,
    },
    #[error("Submission rejected: {0}")]
    InvalidSubmission(String),
    #[error("Storage failure: {0}")]
    Storage(String),
}

/// Why the transition authority refused a decision.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Refusal {
    #[error("role {0} has no stage in this pipeline")]
    RoleNotInPipeline(Role),
    #[error("stage {0} is already {1}")]
    StageTerminal(Stage, StageStatus),
    #[error("stage {0} is locked")]
    StageLocked(Stage),
    #[error("request has no {0} stage")]
    StageMissing(Stage),
    #[error("stage {stage} waits on {predecessor}, which is {status}")]
    PredecessorNotApproved {
        stage: Stage,
        predecessor: Stage,
        status: StageStatus,
    },
    #[error("final stage {stage} needs the first stages approved, they are {derived}")]
    FirstStagesNotApproved { stage: Stage, derived: StageStatus },
    #[error("{0} is not a decision")]
    NotADecision(StageStatus),
    #[error("request is outside the approver's scope")]
    OutOfScope,
}

impl WorkflowError {
    pub(crate) fn refused(request_id: &str, refusal: Refusal) -> Self {
        Self::InvalidTransition {
            request_id: request_id.to_string(),
            refusal,
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<sled::Error> for WorkflowError {
    fn from(err: sled::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

//! Status derivation. Combined statuses are computed from the current stage
//! values on every read and never stored.
use crate::pipeline::{Layout, Pipeline};
use crate::request::Request;
use crate::types::{RequestKind, StageStatus};

/// Emergent completion state of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    InProgress,
    Approved,
    Rejected,
}

/// Combines two co-equal stages: a rejection dominates, otherwise one
/// approval is enough.
pub fn derive_combined(a: StageStatus, b: StageStatus) -> StageStatus {
    derive_any([a, b])
}

/// [`derive_combined`] over a group of any size. Locked counts as pending.
pub fn derive_any(statuses: impl IntoIterator<Item = StageStatus>) -> StageStatus {
    let mut approved = false;
    for status in statuses {
        match status {
            StageStatus::Rejected => return StageStatus::Rejected,
            StageStatus::Approved => approved = true,
            StageStatus::Pending | StageStatus::Locked => {}
        }
    }

    if approved {
        StageStatus::Approved
    } else {
        StageStatus::Pending
    }
}

pub fn can_advance_to_final(derived: StageStatus, final_current: StageStatus) -> bool {
    derived == StageStatus::Approved && final_current == StageStatus::Pending
}

/// Chain gating: the first stage may act while pending, later stages once
/// their predecessor approved and they are still pending.
pub fn can_act_on_stage(index: usize, statuses: &[StageStatus]) -> bool {
    let Some(own) = statuses.get(index) else {
        return false;
    };
    if *own != StageStatus::Pending {
        return false;
    }

    index == 0 || statuses[index - 1] == StageStatus::Approved
}

/// Combined status of the first group of a gated pipeline.
pub fn first_stage_status(request: &Request, pipeline: &Pipeline) -> StageStatus {
    match pipeline.layout {
        Layout::Gated { first, .. } => derive_any(
            first
                .iter()
                .map(|stage| request.status(*stage).unwrap_or(StageStatus::Pending)),
        ),
        Layout::Chain => request
            .statuses(pipeline)
            .first()
            .copied()
            .unwrap_or(StageStatus::Pending),
    }
}

/// True only when every applicable stage has approved. Used to pick the
/// records that get an approval letter or appear in exports.
pub fn is_fully_approved(request: &Request, kind: RequestKind) -> bool {
    outcome(request, kind) == Outcome::Approved
}

pub fn outcome(request: &Request, kind: RequestKind) -> Outcome {
    let pipeline = kind.pipeline();

    match pipeline.layout {
        Layout::Gated { last, .. } => {
            let first = first_stage_status(request, pipeline);
            let last = request.status(last).unwrap_or(StageStatus::Pending);

            if first == StageStatus::Rejected || last == StageStatus::Rejected {
                Outcome::Rejected
            } else if first == StageStatus::Approved && last == StageStatus::Approved {
                Outcome::Approved
            } else {
                Outcome::InProgress
            }
        }
        Layout::Chain => {
            let statuses = request.statuses(pipeline);
            if statuses.contains(&StageStatus::Rejected) {
                Outcome::Rejected
            } else if statuses.iter().all(|s| *s == StageStatus::Approved) {
                Outcome::Approved
            } else {
                Outcome::InProgress
            }
        }
    }
}

//! The transition authority: the only place a stage status changes.
use crate::derive::{can_act_on_stage, can_advance_to_final, derive_any};
use crate::error::{Refusal, Result, WorkflowError};
use crate::pipeline::{Layout, Pipeline};
use crate::request::{Request, TimelineEntry};
use crate::types::{Decision, RequestKind, Role, Stage, StageStatus, TimeStamp};

/// Stage `role` would act on right now, or why it cannot.
pub fn eligible_stage(
    request: &Request,
    kind: RequestKind,
    role: Role,
) -> std::result::Result<Stage, Refusal> {
    let pipeline = kind.pipeline();
    let stage = pipeline
        .stage_for(role)
        .ok_or(Refusal::RoleNotInPipeline(role))?;

    check_stage(request, pipeline, stage)?;
    Ok(stage)
}

pub fn can_act(request: &Request, kind: RequestKind, role: Role) -> bool {
    eligible_stage(request, kind, role).is_ok()
}

fn check_stage(
    request: &Request,
    pipeline: &Pipeline,
    stage: Stage,
) -> std::result::Result<(), Refusal> {
    let own = request.status(stage).ok_or(Refusal::StageMissing(stage))?;
    if own.is_terminal() {
        return Err(Refusal::StageTerminal(stage, own));
    }

    match pipeline.layout {
        Layout::Gated { first, last } if stage == last => {
            let derived = derive_any(
                first
                    .iter()
                    .map(|s| request.status(*s).unwrap_or(StageStatus::Pending)),
            );
            if can_advance_to_final(derived, own) {
                Ok(())
            } else {
                Err(Refusal::FirstStagesNotApproved { stage, derived })
            }
        }
        // first-group stages stay open whatever the other co-equal stage did
        Layout::Gated { .. } => Ok(()),
        Layout::Chain => {
            let statuses = request.statuses(pipeline);
            let index = pipeline
                .index_of(stage)
                .ok_or(Refusal::StageLocked(stage))?;

            if can_act_on_stage(index, &statuses) {
                return Ok(());
            }
            match index.checked_sub(1).map(|prev| (prev, statuses[prev])) {
                Some((prev, status)) if status != StageStatus::Approved => {
                    Err(Refusal::PredecessorNotApproved {
                        stage,
                        predecessor: pipeline.stages[prev].stage,
                        status,
                    })
                }
                _ => Err(Refusal::StageLocked(stage)),
            }
        }
    }
}

/// Records `decision` by `actor_id` acting as `role`, returning the new
/// version of the request. The input is left untouched and nothing is
/// applied when a precondition fails.
pub fn apply_decision(
    request: &Request,
    kind: RequestKind,
    role: Role,
    actor_id: &str,
    decision: Decision,
    at: TimeStamp,
) -> Result<Request> {
    let pipeline = kind.pipeline();
    let stage = eligible_stage(request, kind, role)
        .map_err(|refusal| WorkflowError::refused(&request.id, refusal))?;

    let mut next = request.clone();
    let slot = next
        .stages
        .get_mut(&stage)
        .ok_or_else(|| WorkflowError::refused(&request.id, Refusal::StageMissing(stage)))?;
    slot.status = decision.into();
    slot.by = Some(actor_id.to_string());

    // a rejection leaves the rest of the chain locked for good
    if matches!(pipeline.layout, Layout::Chain) && decision == Decision::Approved {
        let following = pipeline
            .index_of(stage)
            .and_then(|i| pipeline.stages.get(i + 1));
        if let Some(def) = following {
            if let Some(slot) = next.stages.get_mut(&def.stage) {
                if slot.status == StageStatus::Locked {
                    slot.status = StageStatus::Pending;
                }
            }
        }
    }

    next.timeline.push(TimelineEntry {
        at,
        by: actor_id.to_string(),
        action: decision.into(),
        role: Some(role),
    });

    Ok(next)
}

/// Like [`apply_decision`] for callers holding a raw target status. Only
/// APPROVED and REJECTED are accepted.
pub fn apply_target_status(
    request: &Request,
    kind: RequestKind,
    role: Role,
    actor_id: &str,
    target: StageStatus,
    at: TimeStamp,
) -> Result<Request> {
    let decision = Decision::try_from(target)
        .map_err(|status| WorkflowError::refused(&request.id, Refusal::NotADecision(status)))?;

    apply_decision(request, kind, role, actor_id, decision, at)
}

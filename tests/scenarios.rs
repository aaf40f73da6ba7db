mod common;

use anyhow::Context;
use campus_approval::{
    Refusal, WorkflowError,
    clock::ManualClock,
    derive::{self, Outcome},
    repository::RequestRepository,
    request::Action,
    service::{ApprovalService, ExportFilter},
    store::SledStore,
    types::{Decision, RequestKind, Stage, StageStatus, TimeStamp},
};
use chrono::Duration;
use sled::open;
use std::sync::Arc;

use tempfile::tempdir; // Use for test db cleanup.

fn refusal(err: &anyhow::Error) -> Option<&Refusal> {
    match err.downcast_ref::<WorkflowError>() {
        Some(WorkflowError::InvalidTransition { refusal, .. }) => Some(refusal),
        _ => None,
    }
}

fn start() -> TimeStamp {
    TimeStamp::new_with(2026, 1, 20, 8, 0, 0).unwrap()
}

#[test]
fn od_request_through_both_stages() -> anyhow::Result<()> {
    common::init_tracing();
    // Sled locks its directory, so every test gets its own database.
    let temp_dir = tempdir()?;
    let db = Arc::new(open(temp_dir.path().join("od_flow.db"))?);

    let repo = RequestRepository::new(SledStore::new(db));
    repo.save_users(&common::campus())?;
    let clock = ManualClock::new(start());
    let service = ApprovalService::new(repo, &clock);

    let req = service
        .submit(RequestKind::Od, "stu1", common::od_submission())
        .context("OD failed on submit: ")?;
    assert_eq!(req.timeline.len(), 1);
    assert_eq!(req.timeline[0].action, Action::Created);
    assert_eq!(req.timeline[0].by, "SYSTEM");

    // HOD cannot jump the queue
    let err = service
        .decide(RequestKind::Od, &req.id, "hod1", Decision::Approved)
        .unwrap_err();
    assert!(matches!(
        refusal(&err),
        Some(Refusal::FirstStagesNotApproved { .. })
    ));

    clock.advance(Duration::minutes(30));
    let req = service
        .decide(RequestKind::Od, &req.id, "cc1", Decision::Approved)
        .context("OD failed on CC approval: ")?;

    let first = derive::first_stage_status(&req, &campus_approval::pipeline::OD);
    assert_eq!(first, StageStatus::Approved);
    assert_eq!(req.status(Stage::Yc), Some(StageStatus::Pending));
    assert_eq!(
        service.inbox("hod1", RequestKind::Od)?.len(),
        1,
        "HOD may act once either coordinator approved"
    );

    clock.advance(Duration::minutes(30));
    let req = service.decide(RequestKind::Od, &req.id, "hod1", Decision::Approved)?;
    assert!(derive::is_fully_approved(&req, RequestKind::Od));
    assert_eq!(req.timeline.len(), 3);
    assert!(req.timeline.windows(2).all(|w| w[0].at <= w[1].at));

    // the year coordinator can still record a rejection, and derivation is
    // live: the request reads as rejected from now on
    let req = service.decide(RequestKind::Od, &req.id, "yc1", Decision::Rejected)?;
    assert_eq!(req.status(Stage::Hod), Some(StageStatus::Approved));
    assert_eq!(req.status(Stage::Cc), Some(StageStatus::Approved));
    assert_eq!(
        derive::first_stage_status(&req, &campus_approval::pipeline::OD),
        StageStatus::Rejected
    );
    assert_eq!(derive::outcome(&req, RequestKind::Od), Outcome::Rejected);
    assert!(!derive::is_fully_approved(&req, RequestKind::Od));
    assert_eq!(req.timeline.len(), 4);

    Ok(())
}

#[test]
fn hostel_chain_unlocks_in_order() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(open(temp_dir.path().join("hostel_chain.db"))?);

    let repo = RequestRepository::new(SledStore::new(db));
    repo.save_users(&common::campus())?;
    let service = ApprovalService::new(repo, ManualClock::new(start()));

    let req = service.submit(RequestKind::Hostel, "stu1", common::hostel_submission())?;
    assert_eq!(req.status(Stage::Chief), Some(StageStatus::Pending));
    assert_eq!(req.status(Stage::Warden), Some(StageStatus::Locked));
    assert_eq!(req.status(Stage::Security), Some(StageStatus::Locked));

    let err = service
        .decide(RequestKind::Hostel, &req.id, "sec1", Decision::Approved)
        .unwrap_err();
    assert!(matches!(
        refusal(&err),
        Some(Refusal::PredecessorNotApproved { .. })
    ));

    let req = service.decide(RequestKind::Hostel, &req.id, "cw1", Decision::Approved)?;
    assert_eq!(req.status(Stage::Warden), Some(StageStatus::Pending));
    assert_eq!(req.status(Stage::Security), Some(StageStatus::Locked));
    assert!(!derive::is_fully_approved(&req, RequestKind::Hostel));

    let req = service.decide(RequestKind::Hostel, &req.id, "w1", Decision::Approved)?;
    assert!(!derive::is_fully_approved(&req, RequestKind::Hostel));
    let req = service.decide(RequestKind::Hostel, &req.id, "sec1", Decision::Approved)?;

    assert!(derive::is_fully_approved(&req, RequestKind::Hostel));
    assert_eq!(req.timeline.len(), 4);

    let names: Vec<String> = service
        .signatories(RequestKind::Hostel, &req)?
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, ["Chief Warden", "Warden", "Security"]);

    Ok(())
}

#[test]
fn hostel_rejection_abandons_the_chain() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(open(temp_dir.path().join("hostel_reject.db"))?);

    let repo = RequestRepository::new(SledStore::new(db));
    repo.save_users(&common::campus())?;
    let service = ApprovalService::new(repo, ManualClock::new(start()));

    let req = service.submit(RequestKind::Hostel, "stu3", common::hostel_submission())?;
    let req = service.decide(RequestKind::Hostel, &req.id, "cw1", Decision::Rejected)?;

    assert_eq!(req.status(Stage::Warden), Some(StageStatus::Locked));
    assert_eq!(req.status(Stage::Security), Some(StageStatus::Locked));
    assert_eq!(derive::outcome(&req, RequestKind::Hostel), Outcome::Rejected);

    for actor in ["w1", "sec1", "cw1"] {
        for decision in [Decision::Approved, Decision::Rejected] {
            let err = service
                .decide(RequestKind::Hostel, &req.id, actor, decision)
                .unwrap_err();
            assert!(refusal(&err).is_some(), "{actor} should be refused");
        }
    }

    let stored = service.repository().find(RequestKind::Hostel, &req.id)?;
    assert_eq!(stored, req, "refused decisions must not touch the record");
    assert!(service.inbox("w1", RequestKind::Hostel)?.is_empty());

    Ok(())
}

#[test]
fn lab_request_with_class_coordinator_as_mentor() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(open(temp_dir.path().join("lab_flow.db"))?);

    let repo = RequestRepository::new(SledStore::new(db));
    repo.save_users(&common::campus())?;
    let service = ApprovalService::new(repo, ManualClock::new(start()));

    let req = service.submit(RequestKind::Lab, "stu2", common::lab_submission())?;
    let req = service.decide(RequestKind::Lab, &req.id, "cc1", Decision::Approved)?;
    assert_eq!(req.actor(Stage::Mentor), Some("cc1"));

    let req = service.decide(RequestKind::Lab, &req.id, "hod1", Decision::Approved)?;
    assert!(derive::is_fully_approved(&req, RequestKind::Lab));

    let exported = service.approved_for_export("hod1", RequestKind::Lab, &ExportFilter::default())?;
    assert_eq!(exported.len(), 1);
    assert_eq!(exported[0].id, req.id);

    Ok(())
}

#[test]
fn out_of_scope_coordinator_is_refused() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(open(temp_dir.path().join("scope.db"))?);

    let repo = RequestRepository::new(SledStore::new(db));
    repo.save_users(&common::campus())?;
    let service = ApprovalService::new(repo, ManualClock::new(start()));

    // stu3 sits in section A1, cc1 coordinates A2
    let req = service.submit(RequestKind::Od, "stu3", common::od_submission())?;
    let err = service
        .decide(RequestKind::Od, &req.id, "cc1", Decision::Approved)
        .unwrap_err();

    assert_eq!(refusal(&err), Some(&Refusal::OutOfScope));
    assert!(service.visible_requests("cc1", RequestKind::Od)?.is_empty());
    assert_eq!(service.visible_requests("yc1", RequestKind::Od)?.len(), 1);

    Ok(())
}

#[test]
fn signed_in_user_decides() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db = Arc::new(open(temp_dir.path().join("session.db"))?);

    let repo = RequestRepository::new(SledStore::new(db));
    repo.save_users(&common::campus())?;
    let service = ApprovalService::new(repo, ManualClock::new(start()));

    let req = service.submit(RequestKind::Od, "stu1", common::od_submission())?;

    let err = service
        .decide_as_current(RequestKind::Od, &req.id, Decision::Approved)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<WorkflowError>(),
        Some(WorkflowError::NotFound {
            entity: "session",
            ..
        })
    ));

    service.sign_in("yc1")?;
    let req = service.decide_as_current(RequestKind::Od, &req.id, Decision::Approved)?;
    assert_eq!(req.actor(Stage::Yc), Some("yc1"));

    service.sign_out()?;
    assert_eq!(service.current_user()?, None);

    Ok(())
}

#[test]
fn requests_survive_reopening_the_database() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let path = temp_dir.path().join("reopen.db");

    let id = {
        let repo = RequestRepository::new(SledStore::open(&path)?);
        repo.save_users(&common::campus())?;
        let service = ApprovalService::new(repo, ManualClock::new(start()));

        let req = service.submit(RequestKind::Od, "stu1", common::od_submission())?;
        service.decide(RequestKind::Od, &req.id, "cc1", Decision::Approved)?;
        req.id
    };

    let repo = RequestRepository::new(SledStore::open(&path)?);
    let stored = repo.find(RequestKind::Od, &id)?;

    assert_eq!(stored.status(Stage::Cc), Some(StageStatus::Approved));
    assert_eq!(stored.timeline.len(), 2);
    assert_eq!(stored.student.student_name, "Anjali R");

    Ok(())
}

//! Service layer API for request workflow operations
use crate::authority::{apply_decision, can_act};
use crate::clock::{Clock, SystemClock};
use crate::config::WorkflowConfig;
use crate::derive::is_fully_approved;
use crate::error::{Refusal, WorkflowError};
use crate::prefs::{Session, Theme};
use crate::repository::RequestRepository;
use crate::request::{Request, Submission, TimelineEntry};
use crate::scope::is_visible;
use crate::store::{KvStore, MemoryStore, SledStore};
use crate::types::{Decision, RequestKind, Role, Stage, User};
use crate::utils;
use anyhow::Context;
use tracing::{info, warn};

/// Shown where a stage has no known actor.
pub const UNKNOWN_NAME: &str = "—";

pub struct ApprovalService<S: KvStore, C: Clock = SystemClock> {
    repo: RequestRepository<S>,
    clock: C,
}

/// Narrowing applied to approved-record exports. Empty fields match all.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportFilter {
    pub year: Option<String>,
    pub program: Option<String>,
    pub section: Option<String>,
}

/// Name of the person who signed off a stage, for approval letters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signatory {
    pub stage: Stage,
    pub name: String,
}

impl ApprovalService<Box<dyn KvStore>> {
    /// Opens the store named by `config`: sled when a path is set, memory
    /// otherwise.
    pub fn open(config: &WorkflowConfig) -> anyhow::Result<Self> {
        let store: Box<dyn KvStore> = match &config.storage.path {
            Some(path) => Box::new(
                SledStore::open(path)
                    .with_context(|| format!("failed to open store at {}", path.display()))?,
            ),
            None => Box::new(MemoryStore::new()),
        };

        Ok(Self::new(
            RequestRepository::with_config(store, config),
            SystemClock,
        ))
    }
}

impl<S: KvStore, C: Clock> ApprovalService<S, C> {
    pub fn new(repo: RequestRepository<S>, clock: C) -> Self {
        Self { repo, clock }
    }

    pub fn repository(&self) -> &RequestRepository<S> {
        &self.repo
    }

    /// File a new request on behalf of a student
    pub fn submit(
        &self,
        kind: RequestKind,
        student_id: &str,
        submission: Submission,
    ) -> anyhow::Result<Request> {
        let student = self.repo.find_user(student_id)?;
        if student.role != Role::Student {
            return Err(WorkflowError::InvalidSubmission(format!(
                "{student_id} is a {}, not a student",
                student.role
            ))
            .into());
        }
        if submission.details.kind() != kind {
            return Err(WorkflowError::InvalidSubmission(format!(
                "{:?} details filed as a {kind:?} request",
                submission.details.kind()
            ))
            .into());
        }
        if kind == RequestKind::Hostel && student.hosteller == Some(false) {
            return Err(WorkflowError::InvalidSubmission(format!(
                "{student_id} is not a hosteller"
            ))
            .into());
        }
        if !submission.window.is_ordered() {
            return Err(WorkflowError::InvalidSubmission(
                "request ends before it starts".to_string(),
            )
            .into());
        }
        let snapshot = student.snapshot().ok_or_else(|| {
            WorkflowError::InvalidSubmission(format!("{student_id} has an incomplete profile"))
        })?;

        let request = Request {
            id: utils::new_uuid_to_bech32(kind.id_prefix())?,
            student_id: student.id.clone(),
            student: snapshot,
            details: submission.details,
            window: submission.window,
            proof_name: submission.proof_name,
            stages: kind.pipeline().initial_stages(),
            timeline: vec![TimelineEntry::created(self.clock.now())],
        };

        let mut requests = self.repo.list(kind)?;
        requests.push(request.clone());
        self.repo
            .save(kind, &requests)
            .context("failed to store submission")?;

        info!(kind = ?kind, request_id = %request.id, student_id, "request submitted");
        Ok(request)
    }

    /// Record an approver's decision on a request
    pub fn decide(
        &self,
        kind: RequestKind,
        request_id: &str,
        actor_id: &str,
        decision: Decision,
    ) -> anyhow::Result<Request> {
        let actor = self.repo.find_user(actor_id)?;

        let mut requests = self.repo.list(kind)?;
        let position = requests
            .iter()
            .position(|r| r.id == request_id)
            .ok_or_else(|| WorkflowError::not_found("request", request_id))?;

        let current = &requests[position];
        if !is_visible(&actor, &current.student) {
            warn!(request_id, actor_id, "decision outside approver scope");
            return Err(WorkflowError::refused(request_id, Refusal::OutOfScope).into());
        }

        let updated = apply_decision(
            current,
            kind,
            actor.role,
            &actor.id,
            decision,
            self.clock.now(),
        )
        .inspect_err(|e| warn!(request_id, actor_id, error = %e, "decision refused"))?;

        requests[position] = updated.clone();
        self.repo
            .save(kind, &requests)
            .context("failed to store decision")?;

        info!(
            kind = ?kind,
            request_id,
            actor_id,
            role = %actor.role,
            decision = ?decision,
            "decision recorded"
        );
        Ok(updated)
    }

    /// [`Self::decide`] as whoever is signed in
    pub fn decide_as_current(
        &self,
        kind: RequestKind,
        request_id: &str,
        decision: Decision,
    ) -> anyhow::Result<Request> {
        let session = self
            .repo
            .session()?
            .ok_or_else(|| WorkflowError::not_found("session", "current"))?;

        self.decide(kind, request_id, &session.user_id, decision)
    }

    pub fn sign_in(&self, user_id: &str) -> anyhow::Result<User> {
        let user = self.repo.find_user(user_id)?;
        self.repo.set_session(&Session {
            user_id: user.id.clone(),
        })?;

        info!(user_id, role = %user.role, "signed in");
        Ok(user)
    }

    pub fn sign_out(&self) -> anyhow::Result<()> {
        self.repo.clear_session()?;
        Ok(())
    }

    /// The signed-in user. A session naming a user that no longer exists
    /// reads as signed out.
    pub fn current_user(&self) -> anyhow::Result<Option<User>> {
        let Some(session) = self.repo.session()? else {
            return Ok(None);
        };

        match self.repo.find_user(&session.user_id) {
            Ok(user) => Ok(Some(user)),
            Err(WorkflowError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Requests of `kind` inside the approver's scope.
    pub fn visible_requests(
        &self,
        actor_id: &str,
        kind: RequestKind,
    ) -> anyhow::Result<Vec<Request>> {
        let actor = self.repo.find_user(actor_id)?;

        Ok(self
            .repo
            .list(kind)?
            .into_iter()
            .filter(|r| is_visible(&actor, &r.student))
            .collect())
    }

    /// Requests the approver can decide on right now.
    pub fn inbox(&self, actor_id: &str, kind: RequestKind) -> anyhow::Result<Vec<Request>> {
        let actor = self.repo.find_user(actor_id)?;

        Ok(self
            .visible_requests(actor_id, kind)?
            .into_iter()
            .filter(|r| can_act(r, kind, actor.role))
            .collect())
    }

    pub fn student_requests(
        &self,
        student_id: &str,
        kind: RequestKind,
    ) -> anyhow::Result<Vec<Request>> {
        Ok(self
            .repo
            .list(kind)?
            .into_iter()
            .filter(|r| r.student_id == student_id)
            .collect())
    }

    /// Fully approved requests in the approver's scope, narrowed by `filter`.
    pub fn approved_for_export(
        &self,
        actor_id: &str,
        kind: RequestKind,
        filter: &ExportFilter,
    ) -> anyhow::Result<Vec<Request>> {
        Ok(self
            .visible_requests(actor_id, kind)?
            .into_iter()
            .filter(|r| is_fully_approved(r, kind) && filter.matches(r))
            .collect())
    }

    /// Who signed each stage of `request`, in pipeline order.
    pub fn signatories(
        &self,
        kind: RequestKind,
        request: &Request,
    ) -> anyhow::Result<Vec<Signatory>> {
        let users = self.repo.users()?;

        Ok(kind
            .pipeline()
            .stages
            .iter()
            .map(|def| {
                let name = request
                    .actor(def.stage)
                    .and_then(|id| users.iter().find(|u| u.id == id))
                    .map_or_else(|| UNKNOWN_NAME.to_string(), |u| u.name.clone());
                Signatory {
                    stage: def.stage,
                    name,
                }
            })
            .collect())
    }

    pub fn theme(&self) -> anyhow::Result<Theme> {
        Ok(self.repo.theme()?)
    }

    pub fn toggle_theme(&self) -> anyhow::Result<Theme> {
        let next = self.repo.theme()?.toggled();
        self.repo.set_theme(next)?;
        Ok(next)
    }
}

impl ExportFilter {
    pub fn matches(&self, request: &Request) -> bool {
        fn wanted(field: &Option<String>) -> Option<&str> {
            field.as_deref().filter(|s| !s.is_empty())
        }
        let contains = |haystack: &str, needle: &str| {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        };

        let year_ok = wanted(&self.year).is_none_or(|y| request.student.year.to_string() == y);
        let program_ok =
            wanted(&self.program).is_none_or(|p| contains(&request.student.program, p));
        let section_ok =
            wanted(&self.section).is_none_or(|s| contains(&request.student.section, s));

        year_ok && program_ok && section_ok
    }
}

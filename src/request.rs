//! Request records and their append-only timeline
use crate::pipeline::{Layout, Pipeline};
use crate::types::{Decision, RequestKind, Role, Stage, StageStatus, StudentSnapshot, TimeStamp};
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Actor recorded on entries written by the system itself.
pub const SYSTEM_ACTOR: &str = "SYSTEM";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: String,
    pub student_id: String,
    #[serde(flatten)]
    pub student: StudentSnapshot,
    #[serde(flatten)]
    pub details: Details,
    #[serde(flatten)]
    pub window: TimeWindow,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_name: Option<String>,
    pub stages: BTreeMap<Stage, StageSlot>,
    pub timeline: Vec<TimelineEntry>,
}

/// Kind specific payload. Variant order matters for untagged decoding: a
/// lab request also carries `reason`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Details {
    Lab { lab: String, reason: String },
    Od { reason: String },
    Hostel { purpose: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeWindow {
    pub from_date: NaiveDate,
    pub to_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub from_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub to_time: NaiveTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSlot {
    pub status: StageStatus,
    pub by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Created,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub at: TimeStamp,
    pub by: String, // user id or SYSTEM
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

/// Everything a student provides when filing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub details: Details,
    pub window: TimeWindow,
    pub proof_name: Option<String>,
}

impl Details {
    pub fn kind(&self) -> RequestKind {
        match self {
            Details::Od { .. } => RequestKind::Od,
            Details::Lab { .. } => RequestKind::Lab,
            Details::Hostel { .. } => RequestKind::Hostel,
        }
    }
}

impl TimeWindow {
    pub fn new(
        from_date: NaiveDate,
        from_time: NaiveTime,
        to_date: NaiveDate,
        to_time: NaiveTime,
    ) -> Self {
        Self {
            from_date,
            to_date,
            from_time,
            to_time,
        }
    }

    /// Checks `from <= to`, comparing dates first then times.
    pub fn is_ordered(&self) -> bool {
        self.from_date.and_time(self.from_time) <= self.to_date.and_time(self.to_time)
    }
}

impl StageSlot {
    pub fn new(status: StageStatus) -> Self {
        Self { status, by: None }
    }
}

impl From<Decision> for Action {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Approved => Action::Approved,
            Decision::Rejected => Action::Rejected,
        }
    }
}

impl TimelineEntry {
    pub fn created(at: TimeStamp) -> Self {
        Self {
            at,
            by: SYSTEM_ACTOR.to_string(),
            action: Action::Created,
            role: None,
        }
    }
}

impl Request {
    pub fn status(&self, stage: Stage) -> Option<StageStatus> {
        self.stages.get(&stage).map(|slot| slot.status)
    }

    /// Statuses in pipeline order. Missing stages read as pending.
    pub fn statuses(&self, pipeline: &Pipeline) -> Vec<StageStatus> {
        pipeline
            .stages
            .iter()
            .map(|def| self.status(def.stage).unwrap_or(StageStatus::Pending))
            .collect()
    }

    /// Who acted on `stage`, if anyone has.
    pub fn actor(&self, stage: Stage) -> Option<&str> {
        self.stages.get(&stage).and_then(|slot| slot.by.as_deref())
    }

    /// Structural check of a loaded record against its pipeline.
    pub fn validate(&self, pipeline: &Pipeline) -> Result<(), String> {
        if self.details.kind() != pipeline.kind {
            return Err(format!(
                "details describe a {:?} request, collection holds {:?}",
                self.details.kind(),
                pipeline.kind
            ));
        }

        let expected: Vec<Stage> = pipeline.stages.iter().map(|def| def.stage).collect();
        let found: Vec<Stage> = self.stages.keys().copied().collect();
        if expected.len() != found.len() || expected.iter().any(|s| !self.stages.contains_key(s)) {
            return Err(format!("expected stages {expected:?}, found {found:?}"));
        }

        for (stage, slot) in &self.stages {
            if slot.status == StageStatus::Locked && !matches!(pipeline.layout, Layout::Chain) {
                return Err(format!("stage {stage} is LOCKED outside a chain pipeline"));
            }
            if slot.status.is_terminal() != slot.by.is_some() {
                return Err(format!(
                    "stage {stage} is {} but its actor is {:?}",
                    slot.status, slot.by
                ));
            }
        }

        match self.timeline.first() {
            Some(entry) if entry.action == Action::Created => Ok(()),
            Some(entry) => Err(format!(
                "timeline starts with {:?} instead of CREATED",
                entry.action
            )),
            None => Err("timeline is empty".to_string()),
        }
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, FORMAT)
            .map_err(|e| serde::de::Error::custom(format!("invalid time {raw:?}: {e}")))
    }
}

//! Pipeline definitions. Each request kind is described as data: its stages,
//! the roles allowed to act on each stage, and how the stages combine.
use crate::request::StageSlot;
use crate::types::{RequestKind, Role, Stage, StageStatus};
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct StageDef {
    pub stage: Stage,
    pub roles: &'static [Role],
}

#[derive(Debug)]
pub enum Layout {
    /// Co-equal first stages combined by the OR rule, then a final stage
    /// gated on their combined outcome.
    Gated {
        first: &'static [Stage],
        last: Stage,
    },
    /// Strict sequence, later stages start locked.
    Chain,
}

#[derive(Debug)]
pub struct Pipeline {
    pub kind: RequestKind,
    pub stages: &'static [StageDef],
    pub layout: Layout,
}

pub static OD: Pipeline = Pipeline {
    kind: RequestKind::Od,
    stages: &[
        StageDef {
            stage: Stage::Cc,
            roles: &[Role::ClassCoordinator],
        },
        StageDef {
            stage: Stage::Yc,
            roles: &[Role::YearCoordinator],
        },
        StageDef {
            stage: Stage::Hod,
            roles: &[Role::Hod],
        },
    ],
    layout: Layout::Gated {
        first: &[Stage::Cc, Stage::Yc],
        last: Stage::Hod,
    },
};

// class coordinators act as mentors unless a dedicated mentor exists
pub static LAB: Pipeline = Pipeline {
    kind: RequestKind::Lab,
    stages: &[
        StageDef {
            stage: Stage::Mentor,
            roles: &[Role::Mentor, Role::ClassCoordinator],
        },
        StageDef {
            stage: Stage::Hod,
            roles: &[Role::Hod],
        },
    ],
    layout: Layout::Gated {
        first: &[Stage::Mentor],
        last: Stage::Hod,
    },
};

pub static HOSTEL: Pipeline = Pipeline {
    kind: RequestKind::Hostel,
    stages: &[
        StageDef {
            stage: Stage::Chief,
            roles: &[Role::ChiefWarden],
        },
        StageDef {
            stage: Stage::Warden,
            roles: &[Role::Warden],
        },
        StageDef {
            stage: Stage::Security,
            roles: &[Role::Security],
        },
    ],
    layout: Layout::Chain,
};

impl RequestKind {
    pub fn pipeline(self) -> &'static Pipeline {
        match self {
            RequestKind::Od => &OD,
            RequestKind::Lab => &LAB,
            RequestKind::Hostel => &HOSTEL,
        }
    }
}

impl Pipeline {
    /// The stage `role` acts on in this pipeline, if any.
    pub fn stage_for(&self, role: Role) -> Option<Stage> {
        self.stages
            .iter()
            .find(|def| def.roles.contains(&role))
            .map(|def| def.stage)
    }

    pub fn index_of(&self, stage: Stage) -> Option<usize> {
        self.stages.iter().position(|def| def.stage == stage)
    }

    /// Stage map for a freshly submitted request.
    pub fn initial_stages(&self) -> BTreeMap<Stage, StageSlot> {
        self.stages
            .iter()
            .enumerate()
            .map(|(i, def)| {
                let status = match self.layout {
                    Layout::Chain if i > 0 => StageStatus::Locked,
                    _ => StageStatus::Pending,
                };
                (def.stage, StageSlot::new(status))
            })
            .collect()
    }
}

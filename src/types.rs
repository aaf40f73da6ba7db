//! Roles, stages, statuses and the people who hold them
use chrono::{DateTime, SecondsFormat, SubsecRound, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    ClassCoordinator,
    YearCoordinator,
    Hod,
    Mentor,
    ChiefWarden,
    Warden,
    Security,
}

/// One approver slot in a pipeline. Serialised as the key of the stage map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Cc,
    Yc,
    Mentor,
    Chief,
    Warden,
    Security,
    Hod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StageStatus {
    Pending,
    Approved,
    Rejected,
    Locked,
}

/// The only two outcomes an approver may record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestKind {
    Od,
    Lab,
    Hostel,
}

/// Year of study, or `*` for approvers whose scope spans every year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Year {
    Of(u8),
    Any,
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
pub struct TimeStamp(DateTime<Utc>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub role: Role,
    pub username: String,
    pub password: String, // plaintext, demo only
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<Year>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dept: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosteller: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// Student attributes copied onto a request when it is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSnapshot {
    pub reg_no: String,
    pub student_name: String,
    pub program: String,
    pub section: String,
    pub year: Year,
    pub dept: String,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "STUDENT",
            Role::ClassCoordinator => "CLASS_COORDINATOR",
            Role::YearCoordinator => "YEAR_COORDINATOR",
            Role::Hod => "HOD",
            Role::Mentor => "MENTOR",
            Role::ChiefWarden => "CHIEF_WARDEN",
            Role::Warden => "WARDEN",
            Role::Security => "SECURITY",
        }
    }
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Cc => "CC",
            Stage::Yc => "YC",
            Stage::Mentor => "MENTOR",
            Stage::Chief => "CHIEF",
            Stage::Warden => "WARDEN",
            Stage::Security => "SECURITY",
            Stage::Hod => "HOD",
        }
    }
}

impl StageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            StageStatus::Pending => "PENDING",
            StageStatus::Approved => "APPROVED",
            StageStatus::Rejected => "REJECTED",
            StageStatus::Locked => "LOCKED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, StageStatus::Approved | StageStatus::Rejected)
    }
}

impl From<Decision> for StageStatus {
    fn from(value: Decision) -> Self {
        match value {
            Decision::Approved => StageStatus::Approved,
            Decision::Rejected => StageStatus::Rejected,
        }
    }
}

impl TryFrom<StageStatus> for Decision {
    type Error = StageStatus;

    fn try_from(value: StageStatus) -> Result<Self, Self::Error> {
        match value {
            StageStatus::Approved => Ok(Decision::Approved),
            StageStatus::Rejected => Ok(Decision::Rejected),
            other => Err(other),
        }
    }
}

impl RequestKind {
    pub const ALL: [RequestKind; 3] = [RequestKind::Od, RequestKind::Lab, RequestKind::Hostel];

    /// Human readable prefix for request ids, must be a valid bech32 hrp.
    pub fn id_prefix(self) -> &'static str {
        match self {
            RequestKind::Od => "od",
            RequestKind::Lab => "lab",
            RequestKind::Hostel => "hos",
        }
    }

    /// Suffix of the storage key holding this kind's collection.
    pub fn collection(self) -> &'static str {
        match self {
            RequestKind::Od => "od",
            RequestKind::Lab => "lab",
            RequestKind::Hostel => "hostel",
        }
    }
}

impl User {
    /// Snapshot of a student's academic attributes, `None` if any is missing
    /// or the year is a wildcard.
    pub fn snapshot(&self) -> Option<StudentSnapshot> {
        let year = match self.year? {
            Year::Any => return None,
            year => year,
        };

        Some(StudentSnapshot {
            reg_no: self.username.clone(),
            student_name: self.name.clone(),
            program: self.program.clone()?,
            section: self.section.clone()?,
            year,
            dept: self.dept.clone()?,
        })
    }
}

impl TimeStamp {
    /// Current time truncated to the millisecond precision we persist.
    pub fn new() -> Self {
        Self(Utc::now().trunc_subsecs(3))
    }
    pub fn new_with(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        Utc.with_ymd_and_hms(year, month, day, hour, min, sec)
            .single()
            .map(Self)
    }
    pub fn to_datetime_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

impl Default for TimeStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl From<DateTime<Utc>> for TimeStamp {
    fn from(value: DateTime<Utc>) -> Self {
        TimeStamp(value.trunc_subsecs(3))
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Role, Stage, StageStatus);

impl fmt::Display for Year {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Year::Of(n) => write!(f, "{n}"),
            Year::Any => f.write_str("*"),
        }
    }
}

impl fmt::Display for TimeStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

impl Serialize for Year {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Year::Of(n) => serializer.serialize_u8(*n),
            Year::Any => serializer.serialize_str("*"),
        }
    }
}

impl<'de> Deserialize<'de> for Year {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawYear {
            Number(u8),
            Text(String),
        }

        match RawYear::deserialize(deserializer)? {
            RawYear::Number(n) => Ok(Year::Of(n)),
            RawYear::Text(s) if s == "*" => Ok(Year::Any),
            RawYear::Text(s) => Err(serde::de::Error::custom(format!(
                "year must be a number or \"*\", got {s:?}"
            ))),
        }
    }
}

impl Serialize for TimeStamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeStamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;

        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| TimeStamp(dt.with_timezone(&Utc)))
            .map_err(|e| serde::de::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}

//! Shared fixtures for the integration tests: the demo campus directory.
#![allow(dead_code)]

use campus_approval::request::{Details, Submission, TimeWindow};
use campus_approval::types::{Role, User, Year};
use chrono::{NaiveDate, NaiveTime};

pub const PROGRAM: &str = "B.E CSE AIML";
pub const DEPT: &str = "CSE(AIML)";

fn user(id: &str, role: Role, username: &str, name: &str) -> User {
    User {
        id: id.into(),
        role,
        username: username.into(),
        password: "password123".into(),
        name: name.into(),
        program: None,
        section: None,
        year: None,
        dept: None,
        hosteller: None,
        gender: None,
    }
}

fn scoped(mut user: User, program: &str, section: &str, year: Year) -> User {
    user.program = Some(program.into());
    user.section = Some(section.into());
    user.year = Some(year);
    user.dept = Some(DEPT.into());
    user
}

fn student(id: &str, username: &str, name: &str, section: &str, hosteller: bool) -> User {
    let mut user = scoped(
        user(id, Role::Student, username, name),
        PROGRAM,
        section,
        Year::Of(3),
    );
    user.hosteller = Some(hosteller);
    user
}

/// Three students, the academic approvers and the hostel chain.
pub fn campus() -> Vec<User> {
    let mut chief = user("cw1", Role::ChiefWarden, "chiefwarden01", "Chief Warden");
    chief.gender = Some("FEMALE".into());

    vec![
        student("stu1", "1456111001", "Anjali R", "A2", true),
        student("stu2", "1456111002", "Ravi Kumar", "A2", false),
        student("stu3", "1456111003", "Kiran P", "A1", true),
        scoped(
            user("cc1", Role::ClassCoordinator, "cc01", "Class Coordinator"),
            PROGRAM,
            "A2",
            Year::Of(3),
        ),
        scoped(
            user("yc1", Role::YearCoordinator, "yc01", "Year Coordinator"),
            PROGRAM,
            "*",
            Year::Of(3),
        ),
        scoped(
            user("hod1", Role::Hod, "hod01", "HOD - CSE(AIML)"),
            "*",
            "*",
            Year::Any,
        ),
        chief,
        user("w1", Role::Warden, "warden01", "Warden"),
        user("sec1", Role::Security, "security01", "Security"),
    ]
}

pub fn window(day: u32, from_hour: u32, to_hour: u32) -> TimeWindow {
    let date = NaiveDate::from_ymd_opt(2026, 1, day).unwrap();
    TimeWindow::new(
        date,
        NaiveTime::from_hms_opt(from_hour, 0, 0).unwrap(),
        date,
        NaiveTime::from_hms_opt(to_hour, 0, 0).unwrap(),
    )
}

pub fn od_submission() -> Submission {
    Submission {
        details: Details::Od {
            reason: "TECH EVENT - MINDCRAFT AI".into(),
        },
        window: window(22, 9, 15),
        proof_name: Some("invite.pdf".into()),
    }
}

pub fn lab_submission() -> Submission {
    Submission {
        details: Details::Lab {
            lab: "AI Lab - SCAS".into(),
            reason: "LAB PROJECT WORK".into(),
        },
        window: window(24, 9, 13),
        proof_name: Some("letter.jpg".into()),
    }
}

pub fn hostel_submission() -> Submission {
    Submission {
        details: Details::Hostel {
            purpose: "Home visit (Parent consent required)".into(),
        },
        window: window(23, 10, 18),
        proof_name: Some("parent_msg.png".into()),
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

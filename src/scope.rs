//! Visibility scoping: which approver may see and act on which student.
use crate::types::{Role, StudentSnapshot, User, Year};

/// Pure check of an approver's scope against a student's attributes.
///
/// Academic roles match on exact attribute equality; an approver missing the
/// attribute never matches. Hostel chain roles see every hostel request.
/// Students are never approvers, they reach their own requests by id.
pub fn is_visible(approver: &User, student: &StudentSnapshot) -> bool {
    let program = || same(approver.program.as_deref(), &student.program);
    let section = || same(approver.section.as_deref(), &student.section);
    let year = || approver.year == Some(student.year) && student.year != Year::Any;
    let dept = || same(approver.dept.as_deref(), &student.dept);

    match approver.role {
        Role::ClassCoordinator | Role::Mentor => program() && section() && year(),
        Role::YearCoordinator => program() && year(),
        Role::Hod => dept(),
        Role::ChiefWarden | Role::Warden | Role::Security => true,
        Role::Student => false,
    }
}

fn same(scope: Option<&str>, value: &str) -> bool {
    scope == Some(value)
}

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use course_resources::{
    AppState, CapabilityCatalog, InMemoryRepository, ModuleRegistry,
    auth::AuthUser,
    config::AppConfig,
    models::{Archetype, Course, CourseFormat, CourseModule, InstalledModule, Instance, User},
    registry::ModuleDescriptor,
};
use std::sync::Arc;

// --- Shared Fixtures ---

pub const COURSE_ID: i64 = 2;
pub const STUDENT_ID: i64 = 10;
pub const TEACHER_ID: i64 = 11;
pub const OUTSIDER_ID: i64 = 12;
pub const ADMIN_ID: i64 = 1;
pub const WWWROOT: &str = "https://lms.example.org";

pub fn student() -> AuthUser {
    AuthUser {
        id: STUDENT_ID,
        role: "user".to_string(),
    }
}

pub fn teacher() -> AuthUser {
    AuthUser {
        id: TEACHER_ID,
        role: "user".to_string(),
    }
}

pub fn outsider() -> AuthUser {
    AuthUser {
        id: OUTSIDER_ID,
        role: "user".to_string(),
    }
}

pub fn admin() -> AuthUser {
    AuthUser {
        id: ADMIN_ID,
        role: "admin".to_string(),
    }
}

pub fn at_minute(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 9, 2, 9, minute, 0).unwrap()
}

pub fn course(format: CourseFormat) -> Course {
    Course {
        id: COURSE_ID,
        short_name: "BIO101".to_string(),
        full_name: "Introduction to Biology".to_string(),
        format,
        start_date: Utc.with_ymd_and_hms(2024, 9, 2, 0, 0, 0).unwrap(),
        ..Course::default()
    }
}

/// A visible, viewable placement of `module_type` instance `instance_id`.
pub fn course_module(id: i64, module_type: &str, instance_id: i64, section: Option<i32>) -> CourseModule {
    CourseModule {
        id,
        module_type: module_type.to_string(),
        instance_id,
        section_number: section,
        visible: true,
        user_visible: true,
        has_view_page: true,
        time_modified: at_minute(0),
        ..CourseModule::default()
    }
}

pub fn instance(id: i64, name: &str) -> Instance {
    Instance {
        id,
        name: name.to_string(),
        ..Instance::default()
    }
}

/// Stock catalog plus `rawfile`, a resource type that declares no intro support.
pub fn catalog() -> CapabilityCatalog {
    CapabilityCatalog::standard().with(
        "rawfile",
        ModuleDescriptor::new(Archetype::Resource, false, "rawfile", "Raw file"),
    )
}

pub const INSTALLED: [&str; 7] = ["resource", "page", "url", "label", "forum", "assign", "rawfile"];

pub fn installed() -> Vec<InstalledModule> {
    INSTALLED
        .iter()
        .map(|name| InstalledModule {
            name: name.to_string(),
            visible: true,
            has_view: *name != "label",
        })
        .collect()
}

pub fn registry() -> ModuleRegistry {
    ModuleRegistry::from_installed(&installed(), &catalog())
}

/// Users, enrolments and installed types, with no course yet.
pub fn base_repo() -> InMemoryRepository {
    let mut repo = InMemoryRepository::new()
        .with_user(User {
            id: ADMIN_ID,
            email: "admin@example.org".to_string(),
            role: "admin".to_string(),
        })
        .with_user(User {
            id: STUDENT_ID,
            email: "student@example.org".to_string(),
            role: "user".to_string(),
        })
        .with_user(User {
            id: TEACHER_ID,
            email: "teacher@example.org".to_string(),
            role: "user".to_string(),
        })
        .with_user(User {
            id: OUTSIDER_ID,
            email: "outsider@example.org".to_string(),
            role: "user".to_string(),
        })
        .with_enrolment(COURSE_ID, STUDENT_ID, "student")
        .with_enrolment(COURSE_ID, TEACHER_ID, "editingteacher");
    for module in installed() {
        repo = repo.with_installed(&module.name, module.visible, module.has_view);
    }
    repo
}

pub fn test_config() -> AppConfig {
    AppConfig {
        wwwroot: WWWROOT.to_string(),
        ..AppConfig::default()
    }
}

pub fn app_state(repo: Arc<InMemoryRepository>) -> AppState {
    AppState::new(repo, registry(), test_config())
}

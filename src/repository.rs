use crate::error::StoreError;
use crate::models::{Course, CourseModule, InstalledModule, Instance, IntroFormat, LogEvent, Section, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// Course roles allowed to see modules hidden from students.
const HIDDEN_VIEWER_ROLES: [&str; 3] = ["manager", "editingteacher", "teacher"];

/// Repository Trait
///
/// Read-only contract of the course store. Handlers and the listing pipeline only
/// see this trait, so Postgres and the in-memory store are interchangeable.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across Axum tasks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity & Access ---
    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn is_enrolled(&self, course_id: i64, user_id: i64) -> Result<bool, StoreError>;

    // --- Course Structure ---
    async fn get_course(&self, id: i64) -> Result<Option<Course>, StoreError>;
    // Every module placed in the course, in display order. `user_visible` is the
    // student view: module and section both visible. The graph is the same for every user.
    async fn get_course_structure(&self, course_id: i64) -> Result<Vec<CourseModule>, StoreError>;
    // Site admins and course teachers see hidden modules too.
    async fn can_view_hidden(&self, course_id: i64, user_id: i64) -> Result<bool, StoreError>;
    // Sections ordered by number.
    async fn get_sections(&self, course_id: i64) -> Result<Vec<Section>, StoreError>;

    // --- Module Types & Instances ---
    async fn get_installed_modules(&self) -> Result<Vec<InstalledModule>, StoreError>;
    /// One lookup for all `ids` of `module_type`. Ids that do not exist are absent from the map.
    async fn get_instances(
        &self,
        module_type: &str,
        ids: &BTreeSet<i64>,
        with_intro: bool,
    ) -> Result<HashMap<i64, Instance>, StoreError>;

    // --- Activity Log ---
    async fn record_event(&self, event: &LogEvent) -> Result<(), StoreError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// validate_table_name
///
/// Module type names double as table names, so they are restricted to
/// `[a-z][a-z0-9_]*` before being spliced into SQL.
pub fn validate_table_name(name: &str) -> Result<&str, StoreError> {
    let mut chars = name.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidTable(name.to_string()))
    }
}

// --- Postgres ---

#[derive(FromRow)]
struct CourseModuleRow {
    id: i64,
    module_type: String,
    instance_id: i64,
    section_number: Option<i32>,
    visible: bool,
    section_visible: Option<bool>,
    has_view: bool,
    extra: Option<String>,
    icon: Option<String>,
    time_modified: DateTime<Utc>,
}

impl CourseModuleRow {
    fn into_course_module(self) -> CourseModule {
        let shown = self.visible && self.section_visible.unwrap_or(true);
        CourseModule {
            id: self.id,
            module_type: self.module_type,
            instance_id: self.instance_id,
            section_number: self.section_number,
            visible: self.visible,
            user_visible: shown,
            has_view_page: self.has_view,
            extra_attributes: self.extra.unwrap_or_default(),
            icon_override: self.icon.filter(|icon| !icon.is_empty()),
            time_modified: self.time_modified,
        }
    }
}

// Intro columns are absent from the select list for types without intro support.
#[derive(FromRow)]
struct InstanceRow {
    id: i64,
    name: String,
    #[sqlx(default)]
    intro: Option<String>,
    #[sqlx(default, rename = "introformat")]
    intro_format: Option<i16>,
}

impl From<InstanceRow> for Instance {
    fn from(row: InstanceRow) -> Self {
        Instance {
            id: row.id,
            name: row.name,
            intro: row.intro,
            intro_format: row.intro_format.and_then(IntroFormat::from_code),
        }
    }
}

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT id, email, role FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn is_enrolled(&self, course_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let enrolled = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM enrolments WHERE course_id = $1 AND user_id = $2 AND active)",
        )
        .bind(course_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(enrolled)
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>, StoreError> {
        let course = sqlx::query_as::<_, Course>(
            r#"SELECT id, short_name, full_name, format, start_date, visible, cache_revision
               FROM courses WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(course)
    }

    /// get_course_structure
    ///
    /// Display order is section number, then position within the section. Modules of a
    /// hidden section count as hidden.
    async fn get_course_structure(&self, course_id: i64) -> Result<Vec<CourseModule>, StoreError> {
        let rows = sqlx::query_as::<_, CourseModuleRow>(
            r#"
            SELECT
                cm.id, m.name AS module_type, cm.instance AS instance_id,
                cs.section AS section_number, cm.visible, cs.visible AS section_visible,
                m.has_view, cm.extra, cm.icon, cm.time_modified
            FROM course_modules cm
            JOIN modules m ON m.id = cm.module
            LEFT JOIN course_sections cs ON cs.id = cm.section
            WHERE cm.course = $1 AND NOT cm.deletion_in_progress
            ORDER BY cs.section ASC NULLS LAST, cm.position ASC, cm.id ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CourseModuleRow::into_course_module).collect())
    }

    async fn can_view_hidden(&self, course_id: i64, user_id: i64) -> Result<bool, StoreError> {
        let allowed = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (SELECT 1 FROM users WHERE id = $2 AND role = 'admin')
                OR EXISTS (
                    SELECT 1 FROM enrolments
                    WHERE course_id = $1 AND user_id = $2 AND role = ANY($3)
                )
            "#,
        )
        .bind(course_id)
        .bind(user_id)
        .bind(HIDDEN_VIEWER_ROLES.map(String::from).to_vec())
        .fetch_one(&self.pool)
        .await?;
        Ok(allowed)
    }

    async fn get_sections(&self, course_id: i64) -> Result<Vec<Section>, StoreError> {
        let sections = sqlx::query_as::<_, Section>(
            "SELECT section AS number, name FROM course_sections WHERE course = $1 ORDER BY section ASC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(sections)
    }

    async fn get_installed_modules(&self) -> Result<Vec<InstalledModule>, StoreError> {
        let modules = sqlx::query_as::<_, InstalledModule>("SELECT name, visible, has_view FROM modules ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(modules)
    }

    /// get_instances
    ///
    /// Uses QueryBuilder so the validated table name can be spliced in while the id
    /// list stays a bound parameter (`id = ANY($1)`).
    async fn get_instances(
        &self,
        module_type: &str,
        ids: &BTreeSet<i64>,
        with_intro: bool,
    ) -> Result<HashMap<i64, Instance>, StoreError> {
        let table = validate_table_name(module_type)?;
        let columns = if with_intro { "id, name, intro, introformat" } else { "id, name" };

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!("SELECT {columns} FROM "));
        builder.push(table);
        builder.push(" WHERE id = ANY(");
        builder.push_bind(ids.iter().copied().collect::<Vec<i64>>());
        builder.push(") ORDER BY id");

        let rows = builder.build_query_as::<InstanceRow>().fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|row| (row.id, Instance::from(row)))
            .collect())
    }

    async fn record_event(&self, event: &LogEvent) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO log (course_id, user_id, module, action, url, time) VALUES ($1, $2, $3, $4, $5, NOW())",
        )
        .bind(event.course_id)
        .bind(event.user_id)
        .bind(&event.module_type)
        .bind(&event.action)
        .bind(&event.url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

// --- In-Memory ---

/// InMemoryRepository
///
/// A `Repository` over plain maps, used by the test suites.
/// It counts instance lookups and keeps every logged event so callers can assert on them.
#[derive(Default)]
pub struct InMemoryRepository {
    users: HashMap<i64, User>,
    courses: HashMap<i64, Course>,
    // (course_id, user_id) -> course role
    enrolments: HashMap<(i64, i64), String>,
    installed: Vec<InstalledModule>,
    course_modules: HashMap<i64, Vec<CourseModule>>,
    sections: HashMap<i64, Vec<Section>>,
    instances: HashMap<String, HashMap<i64, Instance>>,
    fail_event_log: bool,
    structure_loads: AtomicUsize,
    instance_lookups: Mutex<Vec<(String, Vec<i64>, bool)>>,
    events: Mutex<Vec<LogEvent>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.users.insert(user.id, user);
        self
    }

    pub fn with_course(mut self, course: Course) -> Self {
        self.courses.insert(course.id, course);
        self
    }

    pub fn with_enrolment(mut self, course_id: i64, user_id: i64, role: &str) -> Self {
        self.enrolments.insert((course_id, user_id), role.to_string());
        self
    }

    pub fn with_installed(mut self, name: &str, visible: bool, has_view: bool) -> Self {
        self.installed.push(InstalledModule {
            name: name.to_string(),
            visible,
            has_view,
        });
        self
    }

    /// Appends in display order.
    pub fn with_course_module(mut self, course_id: i64, module: CourseModule) -> Self {
        self.course_modules.entry(course_id).or_default().push(module);
        self
    }

    pub fn with_section(mut self, course_id: i64, number: i32, name: Option<&str>) -> Self {
        let sections = self.sections.entry(course_id).or_default();
        sections.push(Section {
            number,
            name: name.map(str::to_string),
        });
        sections.sort_by_key(|s| s.number);
        self
    }

    pub fn with_instance(mut self, module_type: &str, instance: Instance) -> Self {
        self.instances
            .entry(module_type.to_string())
            .or_default()
            .insert(instance.id, instance);
        self
    }

    /// Makes every `record_event` call fail.
    pub fn with_failing_event_log(mut self) -> Self {
        self.fail_event_log = true;
        self
    }

    pub fn structure_loads(&self) -> usize {
        self.structure_loads.load(Ordering::SeqCst)
    }

    /// Every `get_instances` call as (module type, ids, with_intro).
    pub async fn instance_lookups(&self) -> Vec<(String, Vec<i64>, bool)> {
        self.instance_lookups.lock().await.clone()
    }

    pub async fn events(&self) -> Vec<LogEvent> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        Ok(self.users.get(&id).cloned())
    }

    async fn is_enrolled(&self, course_id: i64, user_id: i64) -> Result<bool, StoreError> {
        Ok(self.enrolments.contains_key(&(course_id, user_id)))
    }

    async fn get_course(&self, id: i64) -> Result<Option<Course>, StoreError> {
        Ok(self.courses.get(&id).cloned())
    }

    async fn get_course_structure(&self, course_id: i64) -> Result<Vec<CourseModule>, StoreError> {
        self.structure_loads.fetch_add(1, Ordering::SeqCst);
        Ok(self.course_modules.get(&course_id).cloned().unwrap_or_default())
    }

    async fn can_view_hidden(&self, course_id: i64, user_id: i64) -> Result<bool, StoreError> {
        Ok(self.users.get(&user_id).is_some_and(User::is_site_admin)
            || self
                .enrolments
                .get(&(course_id, user_id))
                .is_some_and(|role| HIDDEN_VIEWER_ROLES.contains(&role.as_str())))
    }

    async fn get_sections(&self, course_id: i64) -> Result<Vec<Section>, StoreError> {
        Ok(self.sections.get(&course_id).cloned().unwrap_or_default())
    }

    async fn get_installed_modules(&self) -> Result<Vec<InstalledModule>, StoreError> {
        Ok(self.installed.clone())
    }

    async fn get_instances(
        &self,
        module_type: &str,
        ids: &BTreeSet<i64>,
        with_intro: bool,
    ) -> Result<HashMap<i64, Instance>, StoreError> {
        validate_table_name(module_type)?;
        self.instance_lookups.lock().await.push((
            module_type.to_string(),
            ids.iter().copied().collect(),
            with_intro,
        ));

        let Some(table) = self.instances.get(module_type) else {
            return Ok(HashMap::new());
        };
        Ok(ids
            .iter()
            .filter_map(|id| table.get(id))
            .map(|instance| {
                let mut instance = instance.clone();
                if !with_intro {
                    instance.intro = None;
                    instance.intro_format = None;
                }
                (instance.id, instance)
            })
            .collect())
    }

    async fn record_event(&self, event: &LogEvent) -> Result<(), StoreError> {
        if self.fail_event_log {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

use chrono::{DateTime, Duration, Utc};
use sqlx::FromRow;

// --- Identity & Course Schemas (Mapped to Database) ---

/// User
///
/// The caller's identity record from the `users` table, resolved during authentication.
/// `role` is either a site role (`admin`) or `user`; course-level roles live on enrolments.
#[derive(Debug, Clone, FromRow, Default)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: String,
}

impl User {
    pub fn is_site_admin(&self) -> bool {
        self.role == "admin"
    }
}

/// CourseFormat
///
/// The layout mode of a course. Only `Topics` and `Weeks` organise modules into
/// named sections; every other format is listed flat, ordered by modification time.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CourseFormat {
    #[default]
    Topics,
    Weeks,
    Social,
    SingleActivity,
    Other(String),
}

impl CourseFormat {
    pub fn uses_sections(&self) -> bool {
        matches!(self, CourseFormat::Topics | CourseFormat::Weeks)
    }

    pub fn as_str(&self) -> &str {
        match self {
            CourseFormat::Topics => "topics",
            CourseFormat::Weeks => "weeks",
            CourseFormat::Social => "social",
            CourseFormat::SingleActivity => "singleactivity",
            CourseFormat::Other(name) => name,
        }
    }
}

impl From<String> for CourseFormat {
    fn from(value: String) -> Self {
        match value.as_str() {
            "topics" => CourseFormat::Topics,
            "weeks" => CourseFormat::Weeks,
            "social" => CourseFormat::Social,
            "singleactivity" => CourseFormat::SingleActivity,
            _ => CourseFormat::Other(value),
        }
    }
}

impl From<&str> for CourseFormat {
    fn from(value: &str) -> Self {
        CourseFormat::from(value.to_string())
    }
}

impl From<CourseFormat> for String {
    fn from(value: CourseFormat) -> Self {
        value.as_str().to_string()
    }
}

/// Course
///
/// A row from the `courses` table. `cache_revision` is bumped by whatever edits the
/// course structure; the structure cache keys its entries on it.
#[derive(Debug, Clone, FromRow)]
pub struct Course {
    pub id: i64,
    pub short_name: String,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub format: CourseFormat,
    pub start_date: DateTime<Utc>,
    pub visible: bool,
    pub cache_revision: i64,
}

impl Default for Course {
    fn default() -> Self {
        Self {
            id: 0,
            short_name: String::new(),
            full_name: String::new(),
            format: CourseFormat::default(),
            start_date: DateTime::<Utc>::UNIX_EPOCH,
            visible: true,
            cache_revision: 1,
        }
    }
}

// --- Module Schemas ---

/// InstalledModule
///
/// One row of the installation's `modules` table. `has_view` is false for types
/// such as labels that have no standalone view page.
#[derive(Debug, Clone, FromRow, Default)]
pub struct InstalledModule {
    pub name: String,
    pub visible: bool,
    pub has_view: bool,
}

/// Archetype
///
/// Broad classification a module type declares for itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Archetype {
    Resource,
    #[default]
    Other,
    System,
    Assignment,
}

/// CourseModule
///
/// A placement of one module instance within a course, with visibility already
/// resolved for the requesting user.
#[derive(Debug, Clone, Default)]
pub struct CourseModule {
    pub id: i64,
    pub module_type: String,
    pub instance_id: i64,
    // `None` for modules not attached to any section.
    pub section_number: Option<i32>,
    // Visibility set by course editors; hidden modules are rendered dimmed.
    pub visible: bool,
    // Whether this particular user may see the module at all.
    pub user_visible: bool,
    pub has_view_page: bool,
    // Raw HTML attributes appended to the title anchor.
    pub extra_attributes: String,
    pub icon_override: Option<String>,
    pub time_modified: DateTime<Utc>,
}

/// IntroFormat
///
/// Markup dialect of an instance's intro text, stored as a small integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntroFormat {
    Moodle,
    Html,
    Plain,
    Markdown,
}

impl IntroFormat {
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            0 => Some(IntroFormat::Moodle),
            1 => Some(IntroFormat::Html),
            2 => Some(IntroFormat::Plain),
            4 => Some(IntroFormat::Markdown),
            _ => None,
        }
    }
}

/// Instance
///
/// The module-type-specific record a course module points at. Intro fields are
/// only populated for types that declare intro support.
#[derive(Debug, Clone, Default)]
pub struct Instance {
    pub id: i64,
    pub name: String,
    pub intro: Option<String>,
    pub intro_format: Option<IntroFormat>,
}

impl Instance {
    /// True when both intro fields are present and the text is non-empty.
    pub fn has_intro(&self) -> bool {
        self.intro_format.is_some() && self.intro.as_deref().is_some_and(|text| !text.is_empty())
    }
}

/// Section
///
/// A numbered section of a section-based course. Section 0 is the general,
/// unlabelled section at the top of the course.
#[derive(Debug, Clone, FromRow, Default)]
pub struct Section {
    pub number: i32,
    pub name: Option<String>,
}

impl Section {
    /// display_name
    ///
    /// A custom name wins. Otherwise topics courses get "Topic N" and weekly
    /// courses get the week's date range counted from the course start date.
    pub fn display_name(&self, course: &Course) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }
        match course.format {
            CourseFormat::Weeks if self.number > 0 => {
                // Out-of-range section numbers fall back to the topic label.
                let range = Duration::try_weeks(i64::from(self.number - 1))
                    .and_then(|offset| course.start_date.checked_add_signed(offset))
                    .and_then(|start| Some((start, start.checked_add_signed(Duration::days(6))?)));
                match range {
                    Some((start, end)) => format!("{} - {}", start.format("%-d %B"), end.format("%-d %B")),
                    None => format!("Topic {}", self.number),
                }
            }
            CourseFormat::Weeks | CourseFormat::Topics if self.number == 0 => "General".to_string(),
            _ => format!("Topic {}", self.number),
        }
    }
}

// --- Listing Schemas (Output) ---

/// DataRow
///
/// One rendered line of the listing. `group_label` is empty when the row continues
/// the previous row's group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataRow {
    pub group_label: String,
    pub title_markup: String,
    pub description_markup: String,
}

/// ListingRow
///
/// A table line is either data or a visual break between two sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingRow {
    Data(DataRow),
    Separator,
}

impl ListingRow {
    pub fn as_data(&self) -> Option<&DataRow> {
        match self {
            ListingRow::Data(row) => Some(row),
            ListingRow::Separator => None,
        }
    }
}

/// ResourceTable
///
/// Generic row-oriented table model handed to the renderer.
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    pub group_header: String,
    pub name_header: String,
    pub description_header: String,
    // Section-grouped courses centre the first column.
    pub section_mode: bool,
    pub rows: Vec<ListingRow>,
}

/// Listing
///
/// Terminal result of the pipeline. `Empty` is a normal outcome, rendered as a notice.
#[derive(Debug, Clone)]
pub enum Listing {
    Table(ResourceTable),
    Empty,
}

// --- Activity Log ---

/// LogEvent
///
/// One activity-log entry written by the listing page ("view all" per resource type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    pub course_id: i64,
    pub user_id: i64,
    pub module_type: String,
    pub action: String,
    pub url: String,
}

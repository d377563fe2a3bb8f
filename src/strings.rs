use crate::models::CourseFormat;

/// Localizer
///
/// String lookup for the listing page. `component` scopes keys that differ by
/// course format, e.g. the section column header.
pub trait Localizer: Send + Sync {
    fn label(&self, key: &str, component: Option<&str>) -> String;
}

/// EnglishStrings
///
/// Built-in English strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishStrings;

impl Localizer for EnglishStrings {
    fn label(&self, key: &str, component: Option<&str>) -> String {
        let text = match (key, component) {
            ("sectionname", Some("weeks")) => "Week",
            ("sectionname", _) => "Topic",
            ("resources", _) => "Resources",
            ("name", _) => "Name",
            ("moduleintro", _) => "Description",
            ("lastmodified", _) => "Last modified",
            ("continue", _) => "Continue",
            ("thereareno", Some(what)) => return format!("There are no {what} in this course"),
            _ => return format!("[[{key}]]"),
        };
        text.to_string()
    }
}

/// Column header for the grouping column of a course in `format`.
pub fn group_header(strings: &dyn Localizer, format: &CourseFormat) -> String {
    if format.uses_sections() {
        strings.label("sectionname", Some(format.as_str()))
    } else {
        strings.label("lastmodified", None)
    }
}

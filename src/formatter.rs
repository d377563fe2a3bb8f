use chrono::{DateTime, Utc};

use crate::models::{Instance, IntroFormat};

/// Escapes text for use in HTML element content and quoted attribute values.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// ContentFormatter
///
/// Turns stored content into markup for the listing. Module-specific rendering
/// lives elsewhere; this only covers names, intros, dates and icons.
pub trait ContentFormatter: Send + Sync {
    fn escape_text(&self, text: &str) -> String;

    /// Markup for an instance's intro. Only called when the instance has one.
    fn format_intro(&self, module_type: &str, instance: &Instance, course_module_id: i64) -> String;

    fn format_date(&self, time: DateTime<Utc>) -> String;

    /// URL of a pix icon such as `mod/page/icon` or `f/pdf-24`.
    fn icon_url(&self, key: &str) -> String;
}

/// HtmlFormatter
///
/// Default formatter. Dates render as "Monday, 2 September 2024, 9:05 AM".
#[derive(Debug, Clone)]
pub struct HtmlFormatter {
    wwwroot: String,
    date_format: String,
}

impl HtmlFormatter {
    pub fn new(wwwroot: &str) -> Self {
        Self {
            wwwroot: wwwroot.trim_end_matches('/').to_string(),
            date_format: "%A, %-d %B %Y, %-I:%M %p".to_string(),
        }
    }

    pub fn with_date_format(mut self, date_format: &str) -> Self {
        self.date_format = date_format.to_string();
        self
    }
}

/// Markdown to HTML. Raw HTML inside the source passes through and is
/// sanitised by the caller.
fn markdown_to_html(text: &str) -> String {
    let mut html = String::with_capacity(text.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, pulldown_cmark::Parser::new(text));
    html
}

impl ContentFormatter for HtmlFormatter {
    fn escape_text(&self, text: &str) -> String {
        escape_html(text)
    }

    fn format_intro(&self, module_type: &str, instance: &Instance, course_module_id: i64) -> String {
        let Some(intro) = instance.intro.as_deref() else {
            return String::new();
        };
        let body = match instance.intro_format.unwrap_or(IntroFormat::Html) {
            IntroFormat::Html => ammonia::clean(intro),
            IntroFormat::Moodle => ammonia::clean(&intro.replace('\n', "<br />")),
            IntroFormat::Plain => escape_html(intro).replace('\n', "<br />"),
            IntroFormat::Markdown => ammonia::clean(&markdown_to_html(intro)),
        };
        format!(
            "<div class=\"no-overflow\" data-module=\"{}\" data-cmid=\"{}\">{}</div>",
            escape_html(module_type),
            course_module_id,
            body
        )
    }

    fn format_date(&self, time: DateTime<Utc>) -> String {
        time.format(&self.date_format).to_string()
    }

    fn icon_url(&self, key: &str) -> String {
        format!("{}/theme/image.php?image={}", self.wwwroot, escape_html(key))
    }
}

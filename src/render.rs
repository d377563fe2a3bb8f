use crate::formatter::escape_html;
use crate::models::{Listing, ListingRow, ResourceTable};
use crate::service::ResourcePage;
use crate::strings::Localizer;

/// render_table
///
/// Generic table writer. Separator rows span all three columns.
pub fn render_table(table: &ResourceTable) -> String {
    let first_align = if table.section_mode { "center" } else { "left" };
    let mut html = String::from("<table class=\"generaltable mod_index\">\n<thead>\n<tr>");
    for (header, align) in [
        (&table.group_header, first_align),
        (&table.name_header, "left"),
        (&table.description_header, "left"),
    ] {
        html.push_str(&format!("<th class=\"header\" style=\"text-align:{align};\" scope=\"col\">{}</th>", escape_html(header)));
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in &table.rows {
        match row {
            ListingRow::Separator => html.push_str("<tr class=\"separator\"><td colspan=\"3\"><div class=\"tabledivider\"></div></td></tr>\n"),
            ListingRow::Data(data) => html.push_str(&format!(
                "<tr><td style=\"text-align:{first_align};\">{}</td><td>{}</td><td>{}</td></tr>\n",
                escape_html(&data.group_label),
                data.title_markup,
                data.description_markup
            )),
        }
    }
    html.push_str("</tbody>\n</table>");
    html
}

/// render_page
///
/// Minimal document around the listing, or the empty-state notice linking back to the course.
pub fn render_page(page: &ResourcePage, strings: &dyn Localizer, wwwroot: &str) -> String {
    let resources = strings.label("resources", None);
    let title = format!("{}: {}", escape_html(&page.course.short_name), escape_html(&resources));
    let body = match &page.listing {
        Listing::Table(table) => render_table(table),
        Listing::Empty => format!(
            "<div class=\"box generalbox notice\"><p>{}</p><a href=\"{}/course/view.php?id={}\">{}</a></div>",
            escape_html(&strings.label("thereareno", Some(&resources))),
            wwwroot.trim_end_matches('/'),
            page.course.id,
            escape_html(&strings.label("continue", None))
        ),
    };

    format!(
        "<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\" /><title>{title}</title></head>\n<body>\n<h1>{}</h1>\n<h2>{}</h2>\n{body}\n</body>\n</html>\n",
        escape_html(&page.course.full_name),
        escape_html(&resources)
    )
}

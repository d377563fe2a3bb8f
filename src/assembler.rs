use std::collections::HashMap;

use crate::batch::InstanceIndex;
use crate::formatter::ContentFormatter;
use crate::models::{Course, CourseModule, DataRow, Instance, Listing, ListingRow, ResourceTable, Section};
use crate::registry::ModuleRegistry;
use crate::strings::{self, Localizer};

/// AssemblyContext
///
/// Everything the assembler needs besides the modules themselves.
pub struct AssemblyContext<'a> {
    pub course: &'a Course,
    pub registry: &'a ModuleRegistry,
    pub formatter: &'a dyn ContentFormatter,
    pub strings: &'a dyn Localizer,
    pub wwwroot: &'a str,
}

impl AssemblyContext<'_> {
    fn title_markup(&self, cm: &CourseModule, instance: &Instance) -> String {
        let dimmed = if cm.visible { "" } else { " class=\"dimmed\"" };
        let extra = if cm.extra_attributes.is_empty() {
            String::new()
        } else {
            format!(" {}", cm.extra_attributes)
        };
        let icon_key = cm
            .icon_override
            .clone()
            .or_else(|| self.registry.default_icon(&cm.module_type).map(str::to_string))
            .unwrap_or_else(|| format!("mod/{}/icon", cm.module_type));
        let label = self.formatter.escape_text(self.registry.label(&cm.module_type));

        format!(
            "<a{dimmed}{extra} href=\"{root}/mod/{module}/view.php?id={id}\"><img src=\"{icon}\" class=\"activityicon\" alt=\"{label}\" /> {name}</a>",
            root = self.wwwroot.trim_end_matches('/'),
            module = cm.module_type,
            id = cm.id,
            icon = self.formatter.icon_url(&icon_key),
            name = self.formatter.escape_text(&instance.name),
        )
    }

    fn description_markup(&self, cm: &CourseModule, instance: &Instance) -> String {
        if self.registry.supports_intro(&cm.module_type) && instance.has_intro() {
            self.formatter.format_intro(&cm.module_type, instance, cm.id)
        } else {
            String::new()
        }
    }
}

/// assemble
///
/// Single pass over `modules` in the order given. Modules without a loaded instance
/// are dropped silently. With `sections`, a `Separator` precedes every group after the
/// first and the first row of each group carries the section name (none for section
/// 0). Without `sections`, every row is labelled with its modification date.
///
/// Yields `Listing::Empty` when no row survives.
pub fn assemble(
    ctx: &AssemblyContext<'_>,
    modules: &[CourseModule],
    sections: Option<&[Section]>,
    instances: &InstanceIndex,
) -> Listing {
    let section_names: Option<HashMap<i32, String>> = sections.map(|sections| {
        sections
            .iter()
            .map(|s| (s.number, s.display_name(ctx.course)))
            .collect()
    });

    let mut rows = Vec::with_capacity(modules.len());
    // Outer `None` means no group has started yet.
    let mut current_section: Option<Option<i32>> = None;

    for cm in modules {
        let Some(instance) = instances.get(&cm.module_type, cm.instance_id) else {
            tracing::debug!(cmid = cm.id, module = %cm.module_type, instance = cm.instance_id, "instance missing, row dropped");
            continue;
        };

        let group_label = match &section_names {
            Some(names) => {
                let mut label = String::new();
                if current_section != Some(cm.section_number) {
                    if let Some(number) = cm.section_number.filter(|n| *n != 0) {
                        label = names.get(&number).cloned().unwrap_or_default();
                    }
                    if current_section.is_some() {
                        rows.push(ListingRow::Separator);
                    }
                    current_section = Some(cm.section_number);
                }
                label
            }
            None => ctx.formatter.format_date(cm.time_modified),
        };

        rows.push(ListingRow::Data(DataRow {
            group_label,
            title_markup: ctx.title_markup(cm, instance),
            description_markup: ctx.description_markup(cm, instance),
        }));
    }

    if rows.is_empty() {
        return Listing::Empty;
    }

    Listing::Table(ResourceTable {
        group_header: strings::group_header(ctx.strings, &ctx.course.format),
        name_header: ctx.strings.label("name", None),
        description_header: ctx.strings.label("moduleintro", None),
        section_mode: sections.is_some(),
        rows,
    })
}

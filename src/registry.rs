use std::collections::{BTreeMap, HashMap};

use crate::models::{Archetype, InstalledModule};

/// ModuleDescriptor
///
/// Closed capability description of one module type. The registry only knows
/// about types that have a descriptor; anything else is treated as not deployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub archetype: Archetype,
    pub supports_intro: bool,
    /// Pix key of the type's default icon, e.g. `mod/page/icon`.
    pub default_icon: String,
    /// Human readable type name ("File", "Page", ...).
    pub label: String,
}

impl ModuleDescriptor {
    pub fn new(archetype: Archetype, supports_intro: bool, name: &str, label: &str) -> Self {
        Self {
            archetype,
            supports_intro,
            default_icon: format!("mod/{name}/icon"),
            label: label.to_string(),
        }
    }
}

/// CapabilityCatalog
///
/// Descriptors for every module type this deployment ships code for.
#[derive(Debug, Clone, Default)]
pub struct CapabilityCatalog {
    descriptors: HashMap<String, ModuleDescriptor>,
}

impl CapabilityCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, descriptor: ModuleDescriptor) -> Self {
        self.descriptors.insert(name.to_string(), descriptor);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.descriptors.get(name)
    }

    /// standard
    ///
    /// The module types of a stock installation.
    pub fn standard() -> Self {
        use Archetype::{Assignment, Other, Resource, System};

        let entries: [(&str, Archetype, bool, &str); 21] = [
            ("resource", Resource, true, "File"),
            ("folder", Resource, true, "Folder"),
            ("page", Resource, true, "Page"),
            ("url", Resource, true, "URL"),
            ("book", Resource, true, "Book"),
            ("imscp", Resource, true, "IMS content package"),
            ("label", Resource, true, "Label"),
            ("assign", Assignment, true, "Assignment"),
            ("forum", Other, true, "Forum"),
            ("quiz", Other, true, "Quiz"),
            ("chat", Other, true, "Chat"),
            ("choice", Other, true, "Choice"),
            ("data", Other, true, "Database"),
            ("glossary", Other, true, "Glossary"),
            ("lesson", Other, true, "Lesson"),
            ("wiki", Other, true, "Wiki"),
            ("workshop", Other, true, "Workshop"),
            ("feedback", Other, true, "Feedback"),
            ("scorm", Other, true, "SCORM package"),
            ("lti", Other, true, "External tool"),
            ("survey", System, false, "Survey"),
        ];

        entries
            .into_iter()
            .fold(Self::new(), |catalog, (name, archetype, intro, label)| {
                catalog.with(name, ModuleDescriptor::new(archetype, intro, name, label))
            })
    }
}

/// ModuleRegistry
///
/// The installed, visible and deployed module types of this installation.
/// Built once at startup and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    types: BTreeMap<String, ModuleDescriptor>,
}

impl ModuleRegistry {
    /// from_installed
    ///
    /// Keeps visible installed types that have a descriptor in `catalog`.
    /// A type registered in the database without shipped code is skipped.
    pub fn from_installed(installed: &[InstalledModule], catalog: &CapabilityCatalog) -> Self {
        let mut types = BTreeMap::new();
        for module in installed.iter().filter(|m| m.visible) {
            match catalog.get(&module.name) {
                Some(descriptor) => {
                    types.insert(module.name.clone(), descriptor.clone());
                }
                None => {
                    tracing::debug!(module = %module.name, "installed module has no descriptor, skipping");
                }
            }
        }
        Self { types }
    }

    /// Unknown types classify as `Other`.
    pub fn classify(&self, module_type: &str) -> Archetype {
        self.types
            .get(module_type)
            .map(|d| d.archetype)
            .unwrap_or_default()
    }

    pub fn supports_intro(&self, module_type: &str) -> bool {
        self.types.get(module_type).is_some_and(|d| d.supports_intro)
    }

    pub fn default_icon(&self, module_type: &str) -> Option<&str> {
        self.types.get(module_type).map(|d| d.default_icon.as_str())
    }

    /// Falls back to the raw type name.
    pub fn label<'a>(&'a self, module_type: &'a str) -> &'a str {
        self.types
            .get(module_type)
            .map(|d| d.label.as_str())
            .unwrap_or(module_type)
    }

    /// resource_types
    ///
    /// Type name to display label for every resource-archetype type. This map is
    /// the filter applied to course modules downstream.
    pub fn resource_types(&self) -> BTreeMap<String, String> {
        self.types
            .iter()
            .filter(|(_, d)| d.archetype == Archetype::Resource)
            .map(|(name, d)| (name.clone(), d.label.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

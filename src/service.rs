use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    assembler::{self, AssemblyContext},
    auth::{self, AuthUser},
    batch,
    config::AppConfig,
    error::ListingError,
    formatter::{ContentFormatter, HtmlFormatter},
    models::{Course, Listing, LogEvent},
    registry::ModuleRegistry,
    repository::RepositoryState,
    strings::{EnglishStrings, Localizer},
    structure::{self, StructureCache},
};

/// EventLog
///
/// Activity logging for the listing page. Fire-and-forget: implementations must
/// not fail the request.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn record_view_all(&self, course_id: i64, user_id: i64, module_type: &str);
}

/// RepositoryEventLog
///
/// Writes events through the repository and only logs failures.
pub struct RepositoryEventLog {
    repo: RepositoryState,
}

impl RepositoryEventLog {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl EventLog for RepositoryEventLog {
    async fn record_view_all(&self, course_id: i64, user_id: i64, module_type: &str) {
        let event = LogEvent {
            course_id,
            user_id,
            module_type: module_type.to_string(),
            action: "view all".to_string(),
            url: format!("index.php?id={course_id}"),
        };
        if let Err(e) = self.repo.record_event(&event).await {
            tracing::warn!(error = %e, course_id, module = module_type, "failed to record view all event");
        }
    }
}

/// ResourcePage
///
/// What the renderer needs: the course for headings and links, and the listing.
#[derive(Debug, Clone)]
pub struct ResourcePage {
    pub course: Course,
    pub listing: Listing,
}

/// ListingService
///
/// Runs the resource listing pipeline for one request:
/// course lookup, access check, structure load, resource filter, batch load, assembly.
#[derive(Clone)]
pub struct ListingService {
    repo: RepositoryState,
    registry: Arc<ModuleRegistry>,
    cache: Arc<StructureCache>,
    formatter: Arc<dyn ContentFormatter>,
    strings: Arc<dyn Localizer>,
    events: Arc<dyn EventLog>,
    wwwroot: String,
}

impl ListingService {
    pub fn new(repo: RepositoryState, registry: Arc<ModuleRegistry>, config: &AppConfig) -> Self {
        Self {
            events: Arc::new(RepositoryEventLog::new(Arc::clone(&repo))),
            repo,
            registry,
            cache: Arc::new(StructureCache::with_capacity(config.structure_cache_capacity)),
            formatter: Arc::new(HtmlFormatter::new(&config.wwwroot)),
            strings: Arc::new(EnglishStrings),
            wwwroot: config.wwwroot.clone(),
        }
    }

    pub fn with_formatter(mut self, formatter: Arc<dyn ContentFormatter>) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_strings(mut self, strings: Arc<dyn Localizer>) -> Self {
        self.strings = strings;
        self
    }

    pub fn with_event_log(mut self, events: Arc<dyn EventLog>) -> Self {
        self.events = events;
        self
    }

    pub fn strings(&self) -> &dyn Localizer {
        self.strings.as_ref()
    }

    pub fn wwwroot(&self) -> &str {
        &self.wwwroot
    }

    /// build_listing
    ///
    /// Hard errors (`NotFound`, `AccessDenied`, store failures) abort before any
    /// instance is loaded. A course without listable resources yields `Listing::Empty`.
    pub async fn build_listing(&self, course_id: i64, user: &AuthUser) -> Result<ResourcePage, ListingError> {
        if course_id <= 0 {
            return Err(ListingError::Validation(format!("invalid course id {course_id}")));
        }

        let course = self
            .repo
            .get_course(course_id)
            .await?
            .ok_or(ListingError::NotFound(course_id))?;
        auth::require_course_access(self.repo.as_ref(), &course, user).await?;

        let resource_types = self.registry.resource_types();
        for module_type in resource_types.keys() {
            self.events.record_view_all(course.id, user.id, module_type).await;
        }

        let visible = structure::load_visible_modules(self.repo.as_ref(), &self.cache, &course, user.id).await?;
        let modules = structure::retain_resources(visible.modules, &resource_types);
        if modules.is_empty() {
            tracing::info!(course_id, user_id = user.id, "no resources to list");
            return Ok(ResourcePage {
                course,
                listing: Listing::Empty,
            });
        }

        let instances = batch::load_instances(self.repo.as_ref(), &self.registry, &modules).await?;

        let ctx = AssemblyContext {
            course: &course,
            registry: &self.registry,
            formatter: self.formatter.as_ref(),
            strings: self.strings.as_ref(),
            wwwroot: &self.wwwroot,
        };
        let listing = assembler::assemble(&ctx, &modules, visible.sections.as_deref(), &instances);
        tracing::info!(
            course_id,
            user_id = user.id,
            modules = modules.len(),
            instances = instances.len(),
            "resource listing assembled"
        );

        Ok(ResourcePage { course, listing })
    }
}

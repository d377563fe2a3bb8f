use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{Course, CourseModule, Section};
use crate::repository::Repository;

const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// VisibleStructure
///
/// The user-visible modules of a course plus, for section-based formats, its sections.
#[derive(Debug, Clone, Default)]
pub struct VisibleStructure {
    pub modules: Vec<CourseModule>,
    pub sections: Option<Vec<Section>>,
}

struct CachedStructure {
    revision: i64,
    modules: Arc<Vec<CourseModule>>,
}

/// StructureCache
///
/// Read-through cache of course module graphs keyed by course. Entries hold the
/// student view only, so every user shares them and per-user visibility is
/// resolved on each request. An entry is valid only while the course's
/// `cache_revision` is unchanged. When full, the cache is emptied rather than
/// tracking recency.
pub struct StructureCache {
    entries: RwLock<HashMap<i64, CachedStructure>>,
    capacity: usize,
}

impl Default for StructureCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl StructureCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// get_or_load
    ///
    /// Returns the cached module graph for the current revision, loading it from
    /// `repo` on a miss or after the course changed.
    pub async fn get_or_load(&self, repo: &dyn Repository, course: &Course) -> Result<Arc<Vec<CourseModule>>, StoreError> {
        let key = course.id;
        if let Some(hit) = self.entries.read().await.get(&key) {
            if hit.revision == course.cache_revision {
                tracing::debug!(course_id = course.id, "course structure cache hit");
                return Ok(Arc::clone(&hit.modules));
            }
        }

        let modules = Arc::new(repo.get_course_structure(course.id).await?);

        let mut entries = self.entries.write().await;
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            tracing::debug!(capacity = self.capacity, "course structure cache full, clearing");
            entries.clear();
        }
        entries.insert(
            key,
            CachedStructure {
                revision: course.cache_revision,
                modules: Arc::clone(&modules),
            },
        );
        Ok(modules)
    }
}

/// load_visible_modules
///
/// Section-based courses keep the stored display order and load their sections.
/// Other formats get no sections and are ordered by modification time (stable, oldest
/// first), so the date column never goes backwards.
pub async fn load_visible_modules(
    repo: &dyn Repository,
    cache: &StructureCache,
    course: &Course,
    user_id: i64,
) -> Result<VisibleStructure, StoreError> {
    let graph = cache.get_or_load(repo, course).await?;
    // Looked up on every request: enrolment changes do not bump the course revision.
    let can_view_hidden = repo.can_view_hidden(course.id, user_id).await?;
    let mut modules: Vec<CourseModule> = graph
        .iter()
        .filter(|cm| cm.user_visible || can_view_hidden)
        .cloned()
        .map(|mut cm| {
            cm.user_visible = true;
            cm
        })
        .collect();

    let sections = if course.format.uses_sections() {
        Some(repo.get_sections(course.id).await?)
    } else {
        modules.sort_by_key(|cm| cm.time_modified);
        None
    };

    tracing::debug!(
        course_id = course.id,
        user_id,
        can_view_hidden,
        total = graph.len(),
        visible = modules.len(),
        "loaded course structure"
    );
    Ok(VisibleStructure { modules, sections })
}

/// is_listed
///
/// A course module appears in the listing iff the user can see it, its type is a
/// resource type and it has a view page to link to.
pub fn is_listed(cm: &CourseModule, resource_types: &BTreeMap<String, String>) -> bool {
    cm.user_visible && cm.has_view_page && resource_types.contains_key(&cm.module_type)
}

/// Keeps the listed modules, preserving order.
pub fn retain_resources(modules: Vec<CourseModule>, resource_types: &BTreeMap<String, String>) -> Vec<CourseModule> {
    modules.into_iter().filter(|cm| is_listed(cm, resource_types)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CourseFormat;
    use crate::repository::InMemoryRepository;
    use chrono::{TimeZone, Utc};

    fn module(id: i64, minute: u32, user_visible: bool) -> CourseModule {
        CourseModule {
            id,
            module_type: "page".to_string(),
            instance_id: id,
            section_number: Some(1),
            visible: true,
            user_visible,
            has_view_page: true,
            time_modified: Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap(),
            ..CourseModule::default()
        }
    }

    fn course(format: CourseFormat, revision: i64) -> Course {
        Course {
            id: 1,
            format,
            cache_revision: revision,
            ..Course::default()
        }
    }

    #[test]
    fn test_retain_resources_requires_all_conditions() {
        let types = BTreeMap::from([("page".to_string(), "Page".to_string())]);
        let mut no_view = module(2, 0, true);
        no_view.has_view_page = false;
        let mut forum = module(3, 0, true);
        forum.module_type = "forum".to_string();

        let kept = retain_resources(vec![module(1, 0, true), no_view, forum, module(4, 0, false)], &types);
        assert_eq!(kept.iter().map(|cm| cm.id).collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn test_cache_hits_until_revision_changes() {
        let repo = InMemoryRepository::new().with_course_module(1, module(1, 0, true));
        let cache = StructureCache::new();

        cache.get_or_load(&repo, &course(CourseFormat::Topics, 1)).await.unwrap();
        cache.get_or_load(&repo, &course(CourseFormat::Topics, 1)).await.unwrap();
        assert_eq!(repo.structure_loads(), 1);

        cache.get_or_load(&repo, &course(CourseFormat::Topics, 2)).await.unwrap();
        assert_eq!(repo.structure_loads(), 2);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_clears_when_full() {
        let repo = InMemoryRepository::new();
        let cache = StructureCache::with_capacity(2);

        for id in 1..=3 {
            let c = Course { id, ..course(CourseFormat::Topics, 1) };
            cache.get_or_load(&repo, &c).await.unwrap();
        }
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_cached_graph_is_shared_and_visibility_resolved_per_request() {
        let graph = || {
            InMemoryRepository::new()
                .with_course_module(1, module(1, 0, true))
                .with_course_module(1, module(2, 0, false))
        };
        let as_teacher = graph().with_enrolment(1, 9, "editingteacher");
        let as_student = graph().with_enrolment(1, 9, "student");
        let cache = StructureCache::new();
        let c = course(CourseFormat::Social, 1);

        let before = load_visible_modules(&as_teacher, &cache, &c, 9).await.unwrap();
        assert_eq!(before.modules.len(), 2);
        assert!(before.modules.iter().all(|cm| cm.user_visible));

        // Same revision, so the graph comes from the cache; the role does not.
        let after = load_visible_modules(&as_student, &cache, &c, 9).await.unwrap();
        assert_eq!(as_student.structure_loads(), 0);
        assert_eq!(after.modules.iter().map(|cm| cm.id).collect::<Vec<_>>(), vec![1]);
    }

    #[tokio::test]
    async fn test_sections_only_for_section_formats() {
        let repo = InMemoryRepository::new()
            .with_course_module(1, module(1, 0, true))
            .with_section(1, 1, Some("Week 1"));
        let cache = StructureCache::new();

        let topics = load_visible_modules(&repo, &cache, &course(CourseFormat::Topics, 1), 9).await.unwrap();
        assert_eq!(topics.sections.map(|s| s.len()), Some(1));

        let social = load_visible_modules(&repo, &cache, &course(CourseFormat::Social, 2), 9).await.unwrap();
        assert!(social.sections.is_none());
    }

    #[tokio::test]
    async fn test_filters_hidden_and_orders_by_date_without_sections() {
        let repo = InMemoryRepository::new()
            .with_course_module(1, module(1, 30, true))
            .with_course_module(1, module(2, 10, false))
            .with_course_module(1, module(3, 20, true));
        let cache = StructureCache::new();

        let flat = load_visible_modules(&repo, &cache, &course(CourseFormat::from("weeks-no-sections"), 1), 9)
            .await
            .unwrap();
        let ids: Vec<i64> = flat.modules.iter().map(|cm| cm.id).collect();
        assert_eq!(ids, vec![3, 1]);

        let sectioned = load_visible_modules(&repo, &cache, &course(CourseFormat::Topics, 2), 9).await.unwrap();
        let ids: Vec<i64> = sectioned.modules.iter().map(|cm| cm.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }
}

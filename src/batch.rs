use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::error::StoreError;
use crate::models::{CourseModule, Instance};
use crate::registry::ModuleRegistry;
use crate::repository::Repository;

/// InstanceIndex
///
/// Batch-loaded instances keyed by module type, then instance id.
#[derive(Debug, Clone, Default)]
pub struct InstanceIndex {
    by_type: HashMap<String, HashMap<i64, Instance>>,
}

impl InstanceIndex {
    pub fn insert_type(&mut self, module_type: &str, instances: HashMap<i64, Instance>) {
        self.by_type.insert(module_type.to_string(), instances);
    }

    /// `None` for dangling references, e.g. an instance deleted after the structure was read.
    pub fn get(&self, module_type: &str, instance_id: i64) -> Option<&Instance> {
        self.by_type.get(module_type)?.get(&instance_id)
    }

    pub fn len(&self) -> usize {
        self.by_type.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Distinct instance ids per module type.
pub fn group_by_type(modules: &[CourseModule]) -> BTreeMap<String, BTreeSet<i64>> {
    let mut groups: BTreeMap<String, BTreeSet<i64>> = BTreeMap::new();
    for cm in modules {
        groups.entry(cm.module_type.clone()).or_default().insert(cm.instance_id);
    }
    groups
}

/// load_instances
///
/// Issues exactly one `get_instances` call per distinct module type in `modules`.
/// Intro columns are requested only for types whose descriptor supports them.
pub async fn load_instances(
    repo: &dyn Repository,
    registry: &ModuleRegistry,
    modules: &[CourseModule],
) -> Result<InstanceIndex, StoreError> {
    let mut index = InstanceIndex::default();
    for (module_type, ids) in group_by_type(modules) {
        let with_intro = registry.supports_intro(&module_type);
        let found = repo.get_instances(&module_type, &ids, with_intro).await?;
        if found.len() < ids.len() {
            tracing::debug!(
                module = %module_type,
                requested = ids.len(),
                found = found.len(),
                "some instances are missing"
            );
        }
        index.insert_type(&module_type, found);
    }
    Ok(index)
}

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::db::CategoryRecord;
use crate::ids::slugify;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryView {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub path: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryNode {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub path: String,
    pub children: Vec<CategoryNode>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BreadcrumbEntry {
    pub id: String,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FacetCount {
    pub id: String,
    pub name: String,
    pub path: String,
    pub active_listings: i64,
}

/// Document shape accepted by `category import`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CategorySeed {
    pub name: String,
    #[serde(default)]
    pub children: Vec<CategorySeed>,
}

/// In-memory snapshot of the category table.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    by_id: HashMap<String, CategoryRecord>,
    children: HashMap<Option<String>, Vec<String>>,
}

impl CategoryIndex {
    pub fn new(records: Vec<CategoryRecord>) -> Self {
        let mut index = CategoryIndex::default();
        for record in records {
            index
                .children
                .entry(record.parent_id.clone())
                .or_default()
                .push(record.id.clone());
            index.by_id.insert(record.id.clone(), record);
        }
        let by_id = &index.by_id;
        for siblings in index.children.values_mut() {
            siblings.sort_by(|left, right| {
                let left = &by_id[left];
                let right = &by_id[right];
                left.position
                    .cmp(&right.position)
                    .then_with(|| left.name.cmp(&right.name))
            });
        }
        index
    }

    /// Root-to-node chain. A corrupt parent cycle stops at the repeat.
    pub fn breadcrumb(&self, id: &str) -> Vec<BreadcrumbEntry> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = self.by_id.get(id);
        while let Some(record) = cursor {
            if !seen.insert(record.id.as_str()) {
                break;
            }
            chain.push(BreadcrumbEntry {
                id: record.id.clone(),
                name: record.name.clone(),
                slug: record.slug.clone(),
            });
            cursor = record
                .parent_id
                .as_deref()
                .and_then(|parent| self.by_id.get(parent));
        }
        chain.reverse();
        chain
    }

    pub fn path(&self, id: &str) -> String {
        self.breadcrumb(id)
            .into_iter()
            .map(|entry| entry.slug)
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn view(&self, id: &str) -> Option<CategoryView> {
        let record = self.by_id.get(id)?;
        Some(CategoryView {
            id: record.id.clone(),
            name: record.name.clone(),
            slug: record.slug.clone(),
            path: self.path(id),
            parent_id: record.parent_id.clone(),
        })
    }

    /// Resolves `a/b/c` one slug at a time from the roots.
    pub fn resolve_path(&self, raw_path: &str) -> Option<&CategoryRecord> {
        let mut parent: Option<String> = None;
        let mut found = None;
        for segment in split_path(raw_path) {
            let slug = slugify(segment);
            let siblings = self.children.get(&parent)?;
            let record = siblings
                .iter()
                .filter_map(|id| self.by_id.get(id))
                .find(|record| record.slug == slug)?;
            parent = Some(record.id.clone());
            found = Some(record);
        }
        found
    }

    /// Child of `parent` whose slug or folded name equals `needle`.
    pub fn find_child(&self, parent: Option<&str>, needle: &str) -> Option<&CategoryRecord> {
        let wanted = slugify(needle);
        if wanted.is_empty() {
            return None;
        }
        self.children
            .get(&parent.map(str::to_string))?
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .find(|record| record.slug == wanted || slugify(&record.name) == wanted)
    }

    pub fn is_descendant(&self, candidate: &str, ancestor: &str) -> bool {
        self.breadcrumb(candidate)
            .iter()
            .any(|entry| entry.id == ancestor)
    }

    pub fn has_children(&self, id: &str) -> bool {
        self.children
            .get(&Some(id.to_string()))
            .is_some_and(|children| !children.is_empty())
    }

    pub fn tree(&self, root: Option<&str>) -> Vec<CategoryNode> {
        match root {
            Some(id) => self
                .by_id
                .get(id)
                .map(|record| vec![self.node(record, &mut HashSet::new())])
                .unwrap_or_default(),
            None => self.nodes_under(None, &mut HashSet::new()),
        }
    }

    fn nodes_under(&self, parent: Option<&str>, seen: &mut HashSet<String>) -> Vec<CategoryNode> {
        let Some(children) = self.children.get(&parent.map(str::to_string)) else {
            return Vec::new();
        };
        let mut nodes = Vec::with_capacity(children.len());
        for record in children.iter().filter_map(|id| self.by_id.get(id)) {
            if seen.contains(&record.id) {
                continue;
            }
            nodes.push(self.node(record, seen));
        }
        nodes
    }

    fn node(&self, record: &CategoryRecord, seen: &mut HashSet<String>) -> CategoryNode {
        seen.insert(record.id.clone());
        CategoryNode {
            id: record.id.clone(),
            name: record.name.clone(),
            slug: record.slug.clone(),
            path: self.path(&record.id),
            children: self.nodes_under(Some(&record.id), seen),
        }
    }
}

pub fn split_path(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(['/', '>'])
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}

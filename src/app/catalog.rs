use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{required_text, App, AppError};
use crate::catalog::{
    split_path, BreadcrumbEntry, CategoryIndex, CategoryNode, CategorySeed, CategoryView,
    FacetCount,
};
use crate::db::{self, CategoryRecord};
use crate::ids::{new_id, slugify};
use rusqlite::Connection;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CategoryImportSummary {
    pub created: usize,
    pub reused: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RemovedCategory {
    pub id: String,
    pub path: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SeedDocument {
    Many(Vec<CategorySeed>),
    One(CategorySeed),
}

impl App {
    pub(super) fn category_index(&self) -> Result<CategoryIndex, AppError> {
        Ok(CategoryIndex::new(db::list_categories(&self.conn)?))
    }

    pub(super) fn resolve_category_id(&self, path: &str) -> Result<String, AppError> {
        let index = self.category_index()?;
        index
            .resolve_path(path)
            .map(|record| record.id.clone())
            .ok_or_else(|| AppError::NotFound {
                kind: "category",
                key: path.trim().to_string(),
            })
    }

    fn view_of(&self, id: &str) -> Result<CategoryView, AppError> {
        self.category_index()?
            .view(id)
            .ok_or_else(|| AppError::NotFound {
                kind: "category",
                key: id.to_string(),
            })
    }

    pub fn add_category(
        &self,
        parent_path: Option<&str>,
        name: &str,
    ) -> Result<CategoryView, AppError> {
        self.require_admin()?;
        let parent_id = match parent_path {
            Some(path) => Some(self.resolve_category_id(path)?),
            None => None,
        };
        let record = self.insert_child(&self.conn, parent_id.as_deref(), name)?;
        tracing::info!(category = %record.id, slug = %record.slug, "category added");
        self.view_of(&record.id)
    }

    fn insert_child(
        &self,
        conn: &Connection,
        parent_id: Option<&str>,
        name: &str,
    ) -> Result<CategoryRecord, AppError> {
        let name = required_text(name, "category name")?;
        let slug = slug_for(&name)?;
        if db::child_by_slug(conn, parent_id, &slug)?.is_some() {
            return Err(AppError::Conflict(format!(
                "a sibling category with slug '{slug}' already exists"
            )));
        }
        let record = CategoryRecord {
            id: new_id("C"),
            parent_id: parent_id.map(str::to_string),
            name,
            slug,
            position: db::next_category_position(conn, parent_id)?,
            created_at: self.now_ts(),
        };
        db::insert_category(conn, &record)?;
        Ok(record)
    }

    pub fn category_tree(&self, root: Option<&str>) -> Result<Vec<CategoryNode>, AppError> {
        let index = self.category_index()?;
        match root {
            Some(path) => {
                let record = index.resolve_path(path).ok_or_else(|| AppError::NotFound {
                    kind: "category",
                    key: path.trim().to_string(),
                })?;
                Ok(index.tree(Some(&record.id)))
            }
            None => Ok(index.tree(None)),
        }
    }

    pub fn show_category(&self, path: &str) -> Result<CategoryView, AppError> {
        let id = self.resolve_category_id(path)?;
        self.view_of(&id)
    }

    pub fn breadcrumb(&self, path: &str) -> Result<Vec<BreadcrumbEntry>, AppError> {
        let index = self.category_index()?;
        let record = index.resolve_path(path).ok_or_else(|| AppError::NotFound {
            kind: "category",
            key: path.trim().to_string(),
        })?;
        Ok(index.breadcrumb(&record.id))
    }

    pub fn descendants(&self, path: &str) -> Result<Vec<String>, AppError> {
        let id = self.resolve_category_id(path)?;
        Ok(db::subtree_ids(&self.conn, &id)?)
    }

    pub fn move_category(
        &self,
        path: &str,
        new_parent: Option<&str>,
    ) -> Result<CategoryView, AppError> {
        self.require_admin()?;
        let index = self.category_index()?;
        let mut record = index
            .resolve_path(path)
            .cloned()
            .ok_or_else(|| AppError::NotFound {
                kind: "category",
                key: path.trim().to_string(),
            })?;
        let parent_id = match new_parent {
            Some(parent_path) => {
                let parent = index.resolve_path(parent_path).ok_or_else(|| AppError::NotFound {
                    kind: "category",
                    key: parent_path.trim().to_string(),
                })?;
                if index.is_descendant(&parent.id, &record.id) {
                    return Err(AppError::Conflict(format!(
                        "cannot move '{}' under itself or its own descendant",
                        index.path(&record.id)
                    )));
                }
                Some(parent.id.clone())
            }
            None => None,
        };
        if parent_id == record.parent_id {
            return self.view_of(&record.id);
        }
        if db::child_by_slug(&self.conn, parent_id.as_deref(), &record.slug)?.is_some() {
            return Err(AppError::Conflict(format!(
                "target parent already has a child with slug '{}'",
                record.slug
            )));
        }

        let from = record.parent_id.clone();
        record.position = db::next_category_position(&self.conn, parent_id.as_deref())?;
        record.parent_id = parent_id;
        db::update_category(&self.conn, &record)?;
        tracing::info!(
            category = %record.id,
            from = from.as_deref().unwrap_or("<root>"),
            to = record.parent_id.as_deref().unwrap_or("<root>"),
            "category moved"
        );
        self.view_of(&record.id)
    }

    pub fn rename_category(&self, path: &str, new_name: &str) -> Result<CategoryView, AppError> {
        self.require_admin()?;
        let id = self.resolve_category_id(path)?;
        let mut record = db::get_category(&self.conn, &id)?.ok_or_else(|| AppError::NotFound {
            kind: "category",
            key: id.clone(),
        })?;
        let name = required_text(new_name, "category name")?;
        let slug = slug_for(&name)?;
        if let Some(existing) = db::child_by_slug(&self.conn, record.parent_id.as_deref(), &slug)? {
            if existing.id != record.id {
                return Err(AppError::Conflict(format!(
                    "a sibling category with slug '{slug}' already exists"
                )));
            }
        }
        record.name = name;
        record.slug = slug;
        db::update_category(&self.conn, &record)?;
        tracing::info!(category = %record.id, slug = %record.slug, "category renamed");
        self.view_of(&record.id)
    }

    pub fn remove_category(&self, path: &str) -> Result<RemovedCategory, AppError> {
        self.require_admin()?;
        let index = self.category_index()?;
        let record = index.resolve_path(path).ok_or_else(|| AppError::NotFound {
            kind: "category",
            key: path.trim().to_string(),
        })?;
        if index.has_children(&record.id) {
            return Err(AppError::Conflict(format!(
                "category '{}' still has subcategories",
                index.path(&record.id)
            )));
        }
        let listings = db::count_listings_in_category(&self.conn, &record.id)?;
        if listings > 0 {
            return Err(AppError::Conflict(format!(
                "category '{}' is referenced by {listings} listing(s)",
                index.path(&record.id)
            )));
        }
        db::delete_category(&self.conn, &record.id)?;
        tracing::info!(category = %record.id, "category removed");
        Ok(RemovedCategory {
            id: record.id.clone(),
            path: index.path(&record.id),
        })
    }

    /// Active listing counts for each direct child of `path` (or of the roots).
    pub fn facets(&self, path: Option<&str>) -> Result<Vec<FacetCount>, AppError> {
        let parent_id = match path {
            Some(path) => Some(self.resolve_category_id(path)?),
            None => None,
        };
        let index = self.category_index()?;
        let counts = db::child_facet_counts(&self.conn, parent_id.as_deref())?;
        Ok(counts
            .into_iter()
            .map(|(record, active_listings)| FacetCount {
                path: index.path(&record.id),
                id: record.id,
                name: record.name,
                active_listings,
            })
            .collect())
    }

    pub fn vehicle_lookup(
        &self,
        brand: &str,
        model: Option<&str>,
        submodel: Option<&str>,
    ) -> Result<CategoryView, AppError> {
        let id = self.vehicle_lookup_id(None, brand, model, submodel)?;
        self.view_of(&id)
    }

    /// Walks brand, model and submodel names below `base`, or below the
    /// configured vehicle root.
    pub(super) fn vehicle_lookup_id(
        &self,
        base: Option<&str>,
        brand: &str,
        model: Option<&str>,
        submodel: Option<&str>,
    ) -> Result<String, AppError> {
        if model.is_none() && submodel.is_some() {
            return Err(AppError::InvalidArgument(
                "submodel lookup requires a model".to_string(),
            ));
        }
        let index = self.category_index()?;
        let root_path = base.unwrap_or(&self.config.catalog.vehicle_root);
        let root = index.resolve_path(root_path).ok_or_else(|| AppError::NotFound {
            kind: "category",
            key: root_path.to_string(),
        })?;

        let mut cursor = root.id.clone();
        let mut walked = index.path(&cursor);
        for (level, name) in [("brand", Some(brand)), ("model", model), ("submodel", submodel)] {
            let Some(name) = name else {
                break;
            };
            let child = index
                .find_child(Some(&cursor), name)
                .ok_or_else(|| AppError::NotFound {
                    kind: level,
                    key: format!("{walked}/{}", name.trim()),
                })?;
            cursor = child.id.clone();
            walked = index.path(&cursor);
        }
        Ok(cursor)
    }

    pub fn import_categories(
        &self,
        file: &Path,
        under: Option<&str>,
    ) -> Result<CategoryImportSummary, AppError> {
        self.require_admin()?;
        let raw = std::fs::read_to_string(file)?;
        let seeds = match serde_json::from_str::<SeedDocument>(&raw)? {
            SeedDocument::Many(seeds) => seeds,
            SeedDocument::One(seed) => vec![seed],
        };
        let parent_id = match under {
            Some(path) => Some(self.resolve_category_id(path)?),
            None => None,
        };

        let tx = self.conn.unchecked_transaction()?;
        let mut summary = CategoryImportSummary::default();
        let mut stack = seeds
            .into_iter()
            .rev()
            .map(|seed| (parent_id.clone(), seed))
            .collect::<Vec<_>>();
        while let Some((parent, seed)) = stack.pop() {
            let slug = slug_for(&seed.name)?;
            let id = match db::child_by_slug(&tx, parent.as_deref(), &slug)? {
                Some(existing) => {
                    summary.reused += 1;
                    existing.id
                }
                None => {
                    summary.created += 1;
                    self.insert_child(&tx, parent.as_deref(), &seed.name)?.id
                }
            };
            for child in seed.children.into_iter().rev() {
                stack.push((Some(id.clone()), child));
            }
        }
        tx.commit()?;
        tracing::info!(
            created = summary.created,
            reused = summary.reused,
            "categories imported"
        );
        Ok(summary)
    }
}

fn slug_for(name: &str) -> Result<String, AppError> {
    let slug = slugify(name);
    if slug.is_empty() || split_path(name).count() != 1 {
        return Err(AppError::InvalidArgument(format!(
            "category name '{}' must contain letters or digits and no '/' or '>'",
            name.trim()
        )));
    }
    Ok(slug)
}

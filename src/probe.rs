//! Discovery of pages that already exist in the target site repository.

use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context as _;

use crate::catalog::Catalog;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositoryIndex {
    /// `*.html` filenames directly under the root.
    pub root_pages: BTreeSet<String>,
    /// Sub-pages as `{dir}/{file}.html`, relative to the root.
    pub subpages: BTreeSet<String>,
}

impl RepositoryIndex {
    pub fn new<R, S>(root_pages: R, subpages: S) -> Self
    where
        R: IntoIterator,
        R::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            root_pages: root_pages.into_iter().map(Into::into).collect(),
            subpages: subpages.into_iter().map(Into::into).collect(),
        }
    }

    /// Every filename a new record must not collide with: root pages plus the
    /// file part of every sub-page.
    pub fn occupied_filenames(&self) -> BTreeSet<String> {
        let nested = self
            .subpages
            .iter()
            .map(|p| p.rsplit('/').next().unwrap_or(p).to_owned());
        self.root_pages.iter().cloned().chain(nested).collect()
    }
}

/// Scans `root` for top-level pages and for pages inside directories whose
/// name ends with `subpage_dir_suffix`. A missing root yields an empty index.
pub fn probe(root: &Path, subpage_dir_suffix: &str) -> anyhow::Result<RepositoryIndex> {
    let mut index = RepositoryIndex::default();

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(root = %root.display(), "repository root not found; nothing exists");
            return Ok(index);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read repository root: {}", root.display()));
        }
    };

    for entry in entries {
        let entry = entry.with_context(|| format!("read entry under {}", root.display()))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if path.is_dir() {
            if name.ends_with(subpage_dir_suffix) {
                for file in html_files_in(&path)? {
                    index.subpages.insert(format!("{name}/{file}"));
                }
            }
            continue;
        }

        if is_html(name) {
            index.root_pages.insert(name.to_owned());
        }
    }

    tracing::debug!(
        root = %root.display(),
        root_pages = index.root_pages.len(),
        subpages = index.subpages.len(),
        "probed repository"
    );
    Ok(index)
}

fn html_files_in(dir: &Path) -> anyhow::Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).with_context(|| format!("read sub-page dir: {}", dir.display()));
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("read entry under {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str())
            && is_html(name)
        {
            files.push(name.to_owned());
        }
    }
    files.sort();
    Ok(files)
}

fn is_html(name: &str) -> bool {
    name.ends_with(".html")
}

/// The primary location resolves to the catalog's root document, every other
/// location to `{slug}.html`. Existence is the only criterion.
pub fn resolve_location_page(
    catalog: &Catalog,
    location_slug: &str,
    existing: &BTreeSet<String>,
) -> Option<String> {
    let page = catalog.location_page(location_slug);
    existing.contains(&page).then_some(page)
}

pub fn resolve_category_page(service_page: &str, existing: &BTreeSet<String>) -> Option<String> {
    existing.contains(service_page).then(|| service_page.to_owned())
}

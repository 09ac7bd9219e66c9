use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use sha2::{Digest as _, Sha256};

use crate::cli::CheckArgs;
use crate::formats::{FailedRecord, PagePlanRecord};
use crate::inject::{self, SEED_LOCATION, SEED_LOCATION_SLUG};

/// Body paragraphs shorter than this (in characters, markup stripped) are
/// expected to repeat across pages and are not fingerprinted.
pub const MIN_PARAGRAPH_CHARS: usize = 80;

const PREVIEW_CHARS: usize = 100;

const MERGE_CONFLICT_MARKERS: [&str; 3] = ["<<<<<<<", "=======", ">>>>>>>"];

/// Validates one produced page. An empty list means the page passed.
pub fn check_page(html: &str, record: &PagePlanRecord) -> Vec<String> {
    let mut violations = inject::missing_markers(html)
        .into_iter()
        .map(|marker| format!("missing marker: {marker}"))
        .collect::<Vec<_>>();

    if record.location != SEED_LOCATION
        && let Some(main) = main_region(html)
        && without_seed_nav_links(main).contains(SEED_LOCATION)
    {
        violations.push(format!(
            "{SEED_LOCATION} reference found in {} page content",
            record.location
        ));
    }

    if MERGE_CONFLICT_MARKERS.iter().any(|m| html.contains(m)) {
        violations.push("merge conflict markers detected".to_owned());
    }

    violations
}

/// Text between the end of the header and the start of the (last) footer.
fn main_region(html: &str) -> Option<&str> {
    let start = html.find("</header>")? + "</header>".len();
    let end = html.rfind("<footer")?;
    (start <= end).then(|| &html[start..end])
}

/// Drops whole `<a>` elements linking to the seed location's own page.
fn without_seed_nav_links(html: &str) -> String {
    let seed_href = format!("href=\"/{SEED_LOCATION_SLUG}.html\"");
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(idx) = find_anchor_open(rest) {
        let (before, anchor) = rest.split_at(idx);
        out.push_str(before);

        let Some(tag_end) = anchor.find('>') else {
            rest = anchor;
            break;
        };
        let open_tag = &anchor[..=tag_end];
        if !open_tag.contains(&seed_href) {
            out.push_str(open_tag);
            rest = &anchor[tag_end + 1..];
            continue;
        }
        match anchor.find("</a>") {
            Some(close) => rest = &anchor[close + "</a>".len()..],
            None => {
                rest = &anchor[tag_end + 1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn find_anchor_open(html: &str) -> Option<usize> {
    html.match_indices("<a")
        .find(|(idx, _)| {
            html[idx + 2..]
                .chars()
                .next()
                .is_some_and(|c| c.is_whitespace() || c == '>')
        })
        .map(|(idx, _)| idx)
}

/// Removes markup, collapsing whitespace runs to single spaces.
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain-text `<p>` paragraphs inside the body marker region.
pub fn body_paragraphs(html: &str) -> Vec<String> {
    let Some(start) = html.find(inject::BODY.open) else {
        return Vec::new();
    };
    let inner = &html[start + inject::BODY.open.len()..];
    let Some(end) = inner.find(inject::BODY.close) else {
        return Vec::new();
    };
    let mut body = &inner[..end];

    let mut paragraphs = Vec::new();
    while let Some(idx) = find_paragraph_open(body) {
        let after = &body[idx..];
        let Some(tag_end) = after.find('>') else {
            break;
        };
        let content = &after[tag_end + 1..];
        let Some(close) = content.find("</p>") else {
            break;
        };
        paragraphs.push(strip_tags(&content[..close]));
        body = &content[close + "</p>".len()..];
    }
    paragraphs
}

fn find_paragraph_open(html: &str) -> Option<usize> {
    html.match_indices("<p")
        .find(|(idx, _)| {
            html[idx + 2..]
                .chars()
                .next()
                .is_some_and(|c| c.is_whitespace() || c == '>')
        })
        .map(|(idx, _)| idx)
}

pub fn fingerprint(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateParagraph {
    pub first_file: String,
    pub second_file: String,
    pub fingerprint: String,
    pub preview: String,
}

/// Cross-page duplicate detection over `(file, html)` pairs, in order. A
/// paragraph repeated within one file is not a duplicate.
pub fn find_duplicate_paragraphs(pages: &[(String, String)]) -> Vec<DuplicateParagraph> {
    let mut first_seen: HashMap<String, &str> = HashMap::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();

    for (file, html) in pages {
        for paragraph in body_paragraphs(html) {
            if paragraph.chars().count() < MIN_PARAGRAPH_CHARS {
                continue;
            }
            let fingerprint = fingerprint(&paragraph);
            let Some(first_file) = first_seen.get(&fingerprint).copied() else {
                first_seen.insert(fingerprint, file);
                continue;
            };
            if first_file == file.as_str() {
                continue;
            }
            if !reported.insert((first_file, file.as_str(), fingerprint.clone())) {
                continue;
            }
            duplicates.push(DuplicateParagraph {
                first_file: first_file.to_owned(),
                second_file: file.clone(),
                fingerprint,
                preview: preview(&paragraph),
            });
        }
    }
    duplicates
}

fn preview(text: &str) -> String {
    let mut preview = text.chars().take(PREVIEW_CHARS).collect::<String>();
    preview.push_str("...");
    preview
}

/// Reads `paths` and runs [`find_duplicate_paragraphs`] keyed by file name.
/// Unreadable files are logged and left out.
pub fn find_duplicate_paragraphs_in_files(paths: &[PathBuf]) -> Vec<DuplicateParagraph> {
    let mut pages = Vec::with_capacity(paths.len());
    for path in paths {
        match std::fs::read_to_string(path) {
            Ok(html) => pages.push((display_name(path), html)),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "skip unreadable page in duplicate check");
            }
        }
    }
    find_duplicate_paragraphs(&pages)
}

pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn print_duplicates(duplicates: &[DuplicateParagraph]) {
    if duplicates.is_empty() {
        println!("Duplicate paragraphs: none");
        return;
    }
    println!("Duplicate paragraphs: {} (warning)", duplicates.len());
    for dup in duplicates {
        println!("  {} <-> {}", dup.first_file, dup.second_file);
        println!("    \"{}\"", dup.preview);
    }
}

#[derive(Debug, Default)]
pub struct CheckSummary {
    pub checked: usize,
    pub not_materialized: Vec<String>,
    pub violations: Vec<FailedRecord>,
    pub duplicates: Vec<DuplicateParagraph>,
}

impl CheckSummary {
    pub fn has_failures(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Re-validates the materialized pages of a plan and runs the duplicate pass
/// over them.
pub fn run(args: CheckArgs) -> anyhow::Result<CheckSummary> {
    let plan_path = PathBuf::from(&args.plan);
    let site = PathBuf::from(&args.site);
    let records = crate::plan::read_plan(&plan_path).context("load plan")?;
    tracing::info!(plan = %plan_path.display(), site = %site.display(), records = records.len(), "check");

    let mut summary = CheckSummary::default();
    let mut pages = Vec::new();
    for record in &records {
        let path = site.join(&record.output_filename);
        let html = match std::fs::read_to_string(&path) {
            Ok(html) => html,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                summary.not_materialized.push(record.output_filename.clone());
                continue;
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read page: {}", path.display()));
            }
        };

        summary.checked += 1;
        let violations = check_page(&html, record);
        if !violations.is_empty() {
            tracing::warn!(file = %record.output_filename, ?violations, "integrity check failed");
            summary.violations.push(FailedRecord {
                file: record.output_filename.clone(),
                error: violations.join("; "),
            });
        }
        pages.push((record.output_filename.clone(), html));
    }
    summary.duplicates = find_duplicate_paragraphs(&pages);

    println!("Checked:          {}", summary.checked);
    println!("Not materialized: {}", summary.not_materialized.len());
    println!("Violations:       {}", summary.violations.len());
    for failed in &summary.violations {
        println!("  ! {}: {}", failed.file, failed.error);
    }
    print_duplicates(&summary.duplicates);

    Ok(summary)
}

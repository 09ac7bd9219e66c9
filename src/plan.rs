use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fs::OpenOptions;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::catalog::{Catalog, LocationEntry};
use crate::cli::PlanArgs;
use crate::formats::{Breadcrumb, PagePlanRecord, PageType, ParentLinks, PlanStats};
use crate::probe::{RepositoryIndex, resolve_category_page, resolve_location_page};

pub const PAGE_EXTENSION: &str = ".html";

/// `{location}-{brand?}-{category}-{symptom}.html`, lowercased, with runs of
/// whitespace and hyphens collapsed to a single hyphen.
pub fn canonical_slug(
    location_slug: &str,
    brand_slug: Option<&str>,
    category_slug: &str,
    symptom_slug: &str,
) -> String {
    let mut parts = vec![location_slug];
    if let Some(brand_slug) = brand_slug.filter(|b| !b.is_empty()) {
        parts.push(brand_slug);
    }
    parts.push(category_slug);
    parts.push(symptom_slug);

    let raw = parts.join("-").to_lowercase();
    let mut slug = String::with_capacity(raw.len() + PAGE_EXTENSION.len());
    let mut previous_hyphen = false;
    for ch in raw.trim().chars() {
        let ch = if ch.is_whitespace() { '-' } else { ch };
        if ch == '-' {
            if previous_hyphen {
                continue;
            }
            previous_hyphen = true;
        } else {
            previous_hyphen = false;
        }
        slug.push(ch);
    }
    slug.push_str(PAGE_EXTENSION);
    slug
}

/// Restrictions applied while walking the catalog. Unknown slugs simply match
/// nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanFilters {
    pub locations: Option<BTreeSet<String>>,
    pub categories: Option<BTreeSet<String>>,
    pub limit: Option<usize>,
}

impl PlanFilters {
    /// Builds filters from comma-separated slug lists as given on the command line.
    pub fn from_csv(locations: Option<&str>, categories: Option<&str>, limit: Option<usize>) -> Self {
        Self {
            locations: locations.map(parse_slug_list),
            categories: categories.map(parse_slug_list),
            limit,
        }
    }

    fn allows_location(&self, slug: &str) -> bool {
        self.locations.as_ref().is_none_or(|set| set.contains(slug))
    }

    fn allows_category(&self, slug: &str) -> bool {
        self.categories.as_ref().is_none_or(|set| set.contains(slug))
    }
}

fn parse_slug_list(csv: &str) -> BTreeSet<String> {
    csv.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanOutcome {
    pub records: Vec<PagePlanRecord>,
    pub stats: PlanStats,
    /// Slugs rejected because a page with that filename already exists.
    pub conflicts: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
enum Group {
    PrimaryMatrix,
    TieredMatrix,
    BrandOverrides,
}

struct Candidate<'a> {
    location: &'a LocationEntry,
    category: &'a str,
    category_slug: &'a str,
    service_page: Option<&'a str>,
    symptom: &'a str,
    symptom_slug: &'a str,
    brand: Option<(&'a str, &'a str)>,
}

impl Candidate<'_> {
    fn slug(&self) -> String {
        canonical_slug(
            &self.location.slug,
            self.brand.map(|(_, slug)| slug),
            self.category_slug,
            self.symptom_slug,
        )
    }
}

struct Admission {
    occupied: BTreeSet<String>,
    seen: HashSet<String>,
    limit: Option<usize>,
    outcome: PlanOutcome,
}

impl Admission {
    fn new(occupied: BTreeSet<String>, limit: Option<usize>) -> Self {
        Self {
            occupied,
            seen: HashSet::new(),
            limit,
            outcome: PlanOutcome::default(),
        }
    }

    fn is_full(&self) -> bool {
        self.limit
            .is_some_and(|limit| self.outcome.records.len() >= limit)
    }

    fn admit(&mut self, slug: String, group: Group, build: impl FnOnce(&str) -> PagePlanRecord) {
        let stats = &mut self.outcome.stats;
        if self.seen.contains(&slug) {
            tracing::debug!(%slug, "duplicate slug; skipping");
            stats.skipped_duplicate += 1;
            return;
        }
        if self.occupied.contains(&slug) {
            tracing::debug!(%slug, "slug already exists in repository; skipping");
            stats.skipped_existing += 1;
            self.outcome.conflicts.push(slug.clone());
            self.seen.insert(slug);
            return;
        }

        let record = build(&slug);
        match group {
            Group::PrimaryMatrix => stats.primary_location_symptoms += 1,
            Group::TieredMatrix => stats.tiered_location_symptoms += 1,
            Group::BrandOverrides => stats.brand_symptoms += 1,
        }
        self.seen.insert(slug);
        self.outcome.records.push(record);
    }
}

/// Enumerates the plan: the primary location's matrix, the remaining
/// locations by ascending tier, then brand overrides. Pure function of its
/// inputs.
pub fn build_plan(catalog: &Catalog, index: &RepositoryIndex, filters: &PlanFilters) -> PlanOutcome {
    let mut admission = Admission::new(index.occupied_filenames(), filters.limit);

    'locations: for location in catalog.enumeration_order() {
        if !filters.allows_location(&location.slug) {
            continue;
        }
        let group = if catalog.is_primary(&location.slug) {
            Group::PrimaryMatrix
        } else {
            Group::TieredMatrix
        };

        for category in catalog.matrix_for_tier(location.tier) {
            if !filters.allows_category(&category.slug) {
                continue;
            }
            for symptom in &category.symptoms {
                if admission.is_full() {
                    break 'locations;
                }
                let candidate = Candidate {
                    location,
                    category: &category.name,
                    category_slug: &category.slug,
                    service_page: Some(category.service_page.as_str()),
                    symptom: &symptom.name,
                    symptom_slug: &symptom.slug,
                    brand: None,
                };
                admission.admit(candidate.slug(), group, |slug| {
                    build_record(catalog, index, &candidate, slug)
                });
            }
        }
    }

    if let Some(primary) = catalog.primary()
        && filters.allows_location(&primary.slug)
    {
        for brand in &catalog.brands {
            if admission.is_full() {
                break;
            }
            if !filters.allows_category(&brand.category_slug) {
                continue;
            }
            let candidate = Candidate {
                location: primary,
                category: &brand.category,
                category_slug: &brand.category_slug,
                service_page: catalog.service_page(&brand.category_slug),
                symptom: &brand.symptom,
                symptom_slug: &brand.symptom_slug,
                brand: Some((brand.brand.as_str(), brand.brand_slug.as_str())),
            };
            admission.admit(candidate.slug(), Group::BrandOverrides, |slug| {
                build_record(catalog, index, &candidate, slug)
            });
        }
    }

    let outcome = admission.outcome;
    tracing::debug!(
        records = outcome.records.len(),
        conflicts = outcome.conflicts.len(),
        skipped_duplicate = outcome.stats.skipped_duplicate,
        "plan built"
    );
    outcome
}

fn build_record(
    catalog: &Catalog,
    index: &RepositoryIndex,
    candidate: &Candidate<'_>,
    slug: &str,
) -> PagePlanRecord {
    let location = candidate.location;
    let location_page = resolve_location_page(catalog, &location.slug, &index.root_pages);
    let category_page = candidate
        .service_page
        .and_then(|page| resolve_category_page(page, &index.root_pages));
    let brand_page = candidate
        .brand
        .map(|(_, brand_slug)| format!("/{}", catalog.brand_page(brand_slug)));

    let location_url = location_page.as_ref().map(|p| format!("/{p}"));
    let category_url = category_page.as_ref().map(|p| format!("/{p}"));

    let (category_label, leaf_label) = match candidate.brand {
        Some((brand, _)) => (
            format!("{brand} {} Repair", candidate.category),
            format!("{brand} {} {}", candidate.category, candidate.symptom),
        ),
        None => (
            format!("{} Repair", candidate.category),
            format!("{} {}", candidate.category, candidate.symptom),
        ),
    };

    let mut breadcrumbs = vec![Breadcrumb {
        label: "Home".to_owned(),
        url: "/".to_owned(),
    }];
    if let Some(url) = &location_url {
        breadcrumbs.push(Breadcrumb {
            label: location.name.clone(),
            url: url.clone(),
        });
    }
    if let Some(url) = &category_url {
        breadcrumbs.push(Breadcrumb {
            label: category_label,
            url: url.clone(),
        });
    }
    breadcrumbs.push(Breadcrumb {
        label: leaf_label,
        url: format!("/{slug}"),
    });

    let internal_links = [
        location_url.clone(),
        category_url.clone(),
        brand_page.clone(),
        Some(format!("/{}", catalog.booking_page)),
    ]
    .into_iter()
    .flatten()
    .collect();

    PagePlanRecord {
        location: location.name.clone(),
        location_slug: location.slug.clone(),
        region: catalog.region.clone(),
        tier: location.tier,
        page_type: if candidate.brand.is_some() {
            PageType::BrandSymptom
        } else {
            PageType::LocationSymptom
        },
        category: candidate.category.to_owned(),
        category_slug: candidate.category_slug.to_owned(),
        symptom: candidate.symptom.to_owned(),
        symptom_slug: candidate.symptom_slug.to_owned(),
        brand: candidate.brand.map(|(name, _)| name.to_owned()),
        brand_slug: candidate.brand.map(|(_, slug)| slug.to_owned()),
        slug: slug.to_owned(),
        output_filename: slug.to_owned(),
        parent_page: location_page.unwrap_or_else(|| catalog.location_page(&location.slug)),
        parents: ParentLinks {
            location_page: location_url,
            category_page: category_url,
            brand_page,
        },
        breadcrumbs,
        internal_links,
    }
}

pub fn run(args: PlanArgs) -> anyhow::Result<()> {
    let out_path = PathBuf::from(&args.out);
    if out_path.exists() && !args.force {
        anyhow::bail!("plan output already exists: {}", out_path.display());
    }

    let catalog = Catalog::load(args.catalog.as_deref().map(Path::new)).context("load catalog")?;
    let root = PathBuf::from(&args.root);
    let index = crate::probe::probe(&root, &catalog.subpage_dir_suffix).context("probe repository")?;

    let filters = PlanFilters::from_csv(
        args.locations.as_deref(),
        args.categories.as_deref(),
        args.limit,
    );
    tracing::info!(
        root = %root.display(),
        root_pages = index.root_pages.len(),
        subpages = index.subpages.len(),
        ?filters,
        "plan: build"
    );

    let outcome = build_plan(&catalog, &index, &filters);
    write_plan(&out_path, &outcome.records, args.force)?;
    tracing::info!(
        records = outcome.records.len(),
        out = %out_path.display(),
        "plan: written"
    );

    print_report(&catalog, &index, &filters, &outcome, &out_path);
    Ok(())
}

pub fn write_plan(path: &Path, records: &[PagePlanRecord], force: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create plan dir: {}", parent.display()))?;
    }

    let mut json = serde_json::to_string_pretty(records).context("serialize plan")?;
    json.push('\n');

    let mut options = OpenOptions::new();
    options.write(true);
    if force {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut file = options
        .open(path)
        .with_context(|| format!("open plan output: {}", path.display()))?;
    file.write_all(json.as_bytes())
        .with_context(|| format!("write plan: {}", path.display()))?;
    file.flush()
        .with_context(|| format!("flush plan: {}", path.display()))?;
    Ok(())
}

/// Reads a plan artifact. Any shape mismatch is a configuration error.
pub fn read_plan(path: &Path) -> anyhow::Result<Vec<PagePlanRecord>> {
    let json =
        std::fs::read_to_string(path).with_context(|| format!("read plan: {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&json).context("parse plan json")?;
    if !value.is_array() {
        anyhow::bail!("plan must be a top-level JSON array: {}", path.display());
    }
    let records: Vec<PagePlanRecord> =
        serde_json::from_value(value).context("parse plan records")?;

    for (idx, record) in records.iter().enumerate() {
        let name = &record.output_filename;
        if name.is_empty() || name.contains('/') || name.contains("..") {
            anyhow::bail!("plan record {idx} has an unsafe output_filename: {name:?}");
        }
    }
    Ok(records)
}

fn print_report(
    catalog: &Catalog,
    index: &RepositoryIndex,
    filters: &PlanFilters,
    outcome: &PlanOutcome,
    out_path: &Path,
) {
    println!("Repository detection");
    println!("  html files: {}", index.root_pages.len());
    println!("  sub-pages:  {}", index.subpages.len());
    println!();

    println!("Location pages");
    for location in catalog.enumeration_order() {
        let status = resolve_location_page(catalog, &location.slug, &index.root_pages)
            .map(|p| format!("/{p}"))
            .unwrap_or_else(|| "MISSING".to_owned());
        println!("  [tier {}] {:<20} -> {status}", location.tier, location.name);
    }
    println!();

    println!("Service pages");
    for (name, page) in catalog.service_pages() {
        let status = resolve_category_page(page, &index.root_pages)
            .map(|p| format!("/{p}"))
            .unwrap_or_else(|| "MISSING".to_owned());
        println!("  {name:<15} -> {status}");
    }
    println!();

    let mut per_location: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for record in &outcome.records {
        let counts = per_location.entry(record.location_slug.as_str()).or_default();
        match record.page_type {
            PageType::LocationSymptom => counts.0 += 1,
            PageType::BrandSymptom => counts.1 += 1,
        }
    }
    println!("Plan by location");
    for location in catalog.enumeration_order() {
        let (symptoms, brands) = per_location
            .get(location.slug.as_str())
            .copied()
            .unwrap_or_default();
        let brand_note = if brands > 0 {
            format!(" + {brands} brand")
        } else {
            String::new()
        };
        println!(
            "  [tier {}] {:<20} {:>4} pages ({symptoms} symptom{brand_note})",
            location.tier,
            location.name,
            symptoms + brands
        );
    }
    println!("  {:<29} {:>4} pages", "TOTAL", outcome.records.len());
    println!();

    if outcome.conflicts.is_empty() {
        println!("Slug conflicts: none");
    } else {
        println!("Slug conflicts (skipped, already in repository)");
        for slug in &outcome.conflicts {
            println!("  !! {slug}");
        }
    }
    println!();

    let stats = &outcome.stats;
    println!("Summary");
    println!("  primary location symptoms: {:>4}", stats.primary_location_symptoms);
    println!("  tiered location symptoms:  {:>4}", stats.tiered_location_symptoms);
    println!("  brand symptoms:            {:>4}", stats.brand_symptoms);
    println!("  skipped (existing):        {:>4}", stats.skipped_existing);
    println!("  skipped (duplicate):       {:>4}", stats.skipped_duplicate);
    println!("  total planned:             {:>4}", outcome.records.len());
    println!("  output: {}", out_path.display());

    if let Some(limit) = filters.limit {
        println!("  (capped at {limit})");
    }
    if let Some(locations) = &filters.locations {
        let list = locations.iter().cloned().collect::<Vec<_>>().join(",");
        println!("  (filtered locations: {list})");
    }
    if let Some(categories) = &filters.categories {
        let list = categories.iter().cloned().collect::<Vec<_>>().join(",");
        println!("  (filtered categories: {list})");
    }
}

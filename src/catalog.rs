//! Static location / category / symptom tables.
//!
//! The catalog is pure data: the plan builder walks it in declaration order,
//! so every list here is a `Vec` and order is significant.

use std::collections::HashSet;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationEntry {
    pub name: String,
    pub slug: String,
    pub tier: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymptomEntry {
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    pub slug: String,
    /// Filename of the category's top-level landing page.
    pub service_page: String,
    pub symptoms: Vec<SymptomEntry>,
}

/// Category matrix used by every location of one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMatrix {
    pub tier: u32,
    pub categories: Vec<CategoryEntry>,
}

/// A single brand-qualified page for the primary location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandOverrideEntry {
    pub brand: String,
    pub brand_slug: String,
    pub category: String,
    pub category_slug: String,
    pub symptom: String,
    pub symptom_slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default = "default_region")]
    pub region: String,
    /// Slug of the location whose page is the site root document.
    #[serde(default)]
    pub primary_location: Option<String>,
    #[serde(default = "default_primary_page")]
    pub primary_page: String,
    #[serde(default = "default_booking_page")]
    pub booking_page: String,
    /// Directories whose name ends with this suffix hold materialized sub-pages.
    #[serde(default = "default_subpage_dir_suffix")]
    pub subpage_dir_suffix: String,
    /// Brand pages are named `{brand_slug}-{brand_page_suffix}.html`.
    #[serde(default = "default_brand_page_suffix")]
    pub brand_page_suffix: String,
    pub locations: Vec<LocationEntry>,
    pub matrices: Vec<TierMatrix>,
    #[serde(default)]
    pub brands: Vec<BrandOverrideEntry>,
}

fn default_region() -> String {
    "CO".to_owned()
}

fn default_primary_page() -> String {
    "index.html".to_owned()
}

fn default_booking_page() -> String {
    "book.html".to_owned()
}

fn default_subpage_dir_suffix() -> String {
    "-repair-denver".to_owned()
}

fn default_brand_page_suffix() -> String {
    "appliance-repair-denver".to_owned()
}

impl Catalog {
    /// Loads a YAML catalog, or the built-in one when `path` is `None`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(default_catalog());
        };
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("read catalog: {}", path.display()))?;
        Self::from_yaml_str(&yaml).with_context(|| format!("load catalog: {}", path.display()))
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let catalog: Catalog = serde_yaml::from_str(yaml).context("parse catalog yaml")?;
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.locations.is_empty() {
            anyhow::bail!("catalog has no locations");
        }

        let mut location_slugs = HashSet::new();
        for location in &self.locations {
            ensure_named(&location.name, &location.slug, "location")?;
            if location.tier == 0 {
                anyhow::bail!("location {} has tier 0 (tiers start at 1)", location.slug);
            }
            if !location_slugs.insert(location.slug.as_str()) {
                anyhow::bail!("duplicate location slug: {}", location.slug);
            }
        }

        if let Some(primary) = self.primary_location.as_deref()
            && !location_slugs.contains(primary)
        {
            anyhow::bail!("primary location is not a catalog location: {primary}");
        }
        ensure_html_filename(&self.primary_page, "primary page")?;
        ensure_html_filename(&self.booking_page, "booking page")?;

        let mut tiers = HashSet::new();
        for matrix in &self.matrices {
            if !tiers.insert(matrix.tier) {
                anyhow::bail!("duplicate matrix for tier {}", matrix.tier);
            }
            let mut category_slugs = HashSet::new();
            for category in &matrix.categories {
                ensure_named(&category.name, &category.slug, "category")?;
                ensure_html_filename(&category.service_page, "service page")?;
                if !category_slugs.insert(category.slug.as_str()) {
                    anyhow::bail!(
                        "duplicate category slug in tier {}: {}",
                        matrix.tier,
                        category.slug
                    );
                }
                let mut symptom_slugs = HashSet::new();
                for symptom in &category.symptoms {
                    ensure_named(&symptom.name, &symptom.slug, "symptom")?;
                    if !symptom_slugs.insert(symptom.slug.as_str()) {
                        anyhow::bail!(
                            "duplicate symptom slug under {}: {}",
                            category.slug,
                            symptom.slug
                        );
                    }
                }
            }
        }

        if !self.brands.is_empty() && self.primary_location.is_none() {
            anyhow::bail!("brand overrides require a primary location");
        }
        for brand in &self.brands {
            ensure_named(&brand.brand, &brand.brand_slug, "brand")?;
            ensure_named(&brand.symptom, &brand.symptom_slug, "brand symptom")?;
            if self.service_page(&brand.category_slug).is_none() {
                anyhow::bail!(
                    "brand {} references unknown category: {}",
                    brand.brand_slug,
                    brand.category_slug
                );
            }
        }

        Ok(())
    }

    pub fn primary(&self) -> Option<&LocationEntry> {
        let slug = self.primary_location.as_deref()?;
        self.locations.iter().find(|l| l.slug == slug)
    }

    pub fn is_primary(&self, location_slug: &str) -> bool {
        self.primary_location.as_deref() == Some(location_slug)
    }

    /// Primary location first, then the rest by ascending tier (catalog order within a tier).
    pub fn enumeration_order(&self) -> Vec<&LocationEntry> {
        let mut rest = self
            .locations
            .iter()
            .filter(|l| !self.is_primary(&l.slug))
            .collect::<Vec<_>>();
        rest.sort_by_key(|l| l.tier);

        self.primary().into_iter().chain(rest).collect()
    }

    pub fn matrix_for_tier(&self, tier: u32) -> &[CategoryEntry] {
        self.matrices
            .iter()
            .find(|m| m.tier == tier)
            .map(|m| m.categories.as_slice())
            .unwrap_or(&[])
    }

    /// Service page of a category, preferring the primary location's matrix.
    pub fn service_page(&self, category_slug: &str) -> Option<&str> {
        let primary_tier = self.primary().map(|l| l.tier);
        let preferred = primary_tier
            .into_iter()
            .flat_map(|tier| self.matrix_for_tier(tier));
        let all = self.matrices.iter().flat_map(|m| m.categories.iter());

        preferred
            .chain(all)
            .find(|c| c.slug == category_slug)
            .map(|c| c.service_page.as_str())
    }

    /// Every distinct `(category name, service page)` in matrix order.
    pub fn service_pages(&self) -> Vec<(&str, &str)> {
        let mut seen = HashSet::new();
        self.matrices
            .iter()
            .flat_map(|m| m.categories.iter())
            .filter(|c| seen.insert(c.service_page.as_str()))
            .map(|c| (c.name.as_str(), c.service_page.as_str()))
            .collect()
    }

    /// Filename a location's page has (or would have) at the repository root.
    pub fn location_page(&self, location_slug: &str) -> String {
        if self.is_primary(location_slug) {
            self.primary_page.clone()
        } else {
            format!("{location_slug}.html")
        }
    }

    pub fn brand_page(&self, brand_slug: &str) -> String {
        format!("{brand_slug}-{}.html", self.brand_page_suffix)
    }
}

fn ensure_named(name: &str, slug: &str, kind: &str) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("{kind} has an empty name (slug: {slug:?})");
    }
    if !is_slug(slug) {
        anyhow::bail!("{kind} {name:?} has an invalid slug: {slug:?}");
    }
    Ok(())
}

fn ensure_html_filename(name: &str, kind: &str) -> anyhow::Result<()> {
    if name.is_empty() || name.contains('/') || name.contains("..") || !name.ends_with(".html") {
        anyhow::bail!("{kind} must be a bare .html filename: {name:?}");
    }
    Ok(())
}

fn is_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn location(name: &str, slug: &str, tier: u32) -> LocationEntry {
    LocationEntry {
        name: name.to_owned(),
        slug: slug.to_owned(),
        tier,
    }
}

fn category(name: &str, slug: &str, service_page: &str, symptoms: &[(&str, &str)]) -> CategoryEntry {
    CategoryEntry {
        name: name.to_owned(),
        slug: slug.to_owned(),
        service_page: service_page.to_owned(),
        symptoms: symptoms
            .iter()
            .map(|(name, slug)| SymptomEntry {
                name: (*name).to_owned(),
                slug: (*slug).to_owned(),
            })
            .collect(),
    }
}

fn brand(brand: &str, brand_slug: &str, category: &str, symptom: &str, symptom_slug: &str) -> BrandOverrideEntry {
    BrandOverrideEntry {
        brand: brand.to_owned(),
        brand_slug: brand_slug.to_owned(),
        category: category.to_owned(),
        category_slug: category.to_lowercase(),
        symptom: symptom.to_owned(),
        symptom_slug: symptom_slug.to_owned(),
    }
}

/// The Denver cluster: a full tier-1 matrix, a narrower tier-2 matrix and
/// ten premium brand pages.
pub fn default_catalog() -> Catalog {
    let tier1 = vec![
        category(
            "Washer",
            "washer",
            "washer-repair-denver.html",
            &[
                ("Not Draining", "not-draining"),
                ("Not Spinning", "not-spinning"),
                ("Leaking Water", "leaking-water"),
                ("Not Starting", "not-starting"),
                ("Shaking Vibrating", "shaking-vibrating"),
                ("Not Filling", "not-filling"),
                ("Making Loud Noise", "making-loud-noise"),
                ("Won't Agitate", "wont-agitate"),
            ],
        ),
        category(
            "Dryer",
            "dryer",
            "dryer-repair-denver.html",
            &[
                ("Not Heating", "not-heating"),
                ("Not Spinning", "not-spinning"),
                ("Not Starting", "not-starting"),
                ("Making Loud Noise", "making-loud-noise"),
                ("Takes Too Long", "takes-too-long"),
                ("Overheating", "overheating"),
                ("Won't Tumble", "wont-tumble"),
                ("Not Drying", "not-drying"),
            ],
        ),
        category(
            "Refrigerator",
            "refrigerator",
            "fridge-repair-denver.html",
            &[
                ("Not Cooling", "not-cooling"),
                ("Leaking Water", "leaking-water"),
                ("Ice Maker Not Working", "ice-maker-not-working"),
                ("Not Running", "not-running"),
                ("Freezer Not Freezing", "freezer-not-freezing"),
                ("Making Noise", "making-noise"),
                ("Too Cold", "too-cold"),
                ("Water Dispenser Not Working", "water-dispenser-not-working"),
            ],
        ),
        category(
            "Dishwasher",
            "dishwasher",
            "dishwasher-repair-denver.html",
            &[
                ("Not Draining", "not-draining"),
                ("Not Cleaning Dishes", "not-cleaning-dishes"),
                ("Leaking Water", "leaking-water"),
                ("Not Starting", "not-starting"),
                ("Not Drying", "not-drying"),
                ("Making Noise", "making-noise"),
                ("Won't Fill", "wont-fill"),
                ("Door Won't Close", "door-wont-close"),
            ],
        ),
        category(
            "Oven",
            "oven",
            "oven-repair-denver.html",
            &[
                ("Not Heating", "not-heating"),
                ("Not Turning On", "not-turning-on"),
                ("Temperature Inaccurate", "temperature-inaccurate"),
                ("Burner Not Working", "burner-not-working"),
                ("Won't Turn Off", "wont-turn-off"),
                ("Self-Clean Not Working", "self-clean-not-working"),
                ("Door Won't Close", "door-wont-close"),
                ("Uneven Heating", "uneven-heating"),
            ],
        ),
    ];

    let tier2 = vec![
        category(
            "Washer",
            "washer",
            "washer-repair-denver.html",
            &[
                ("Not Draining", "not-draining"),
                ("Not Spinning", "not-spinning"),
                ("Leaking Water", "leaking-water"),
                ("Not Starting", "not-starting"),
                ("Not Filling", "not-filling"),
            ],
        ),
        category(
            "Dryer",
            "dryer",
            "dryer-repair-denver.html",
            &[
                ("Not Heating", "not-heating"),
                ("Not Spinning", "not-spinning"),
                ("Not Starting", "not-starting"),
                ("Making Loud Noise", "making-loud-noise"),
                ("Not Drying", "not-drying"),
            ],
        ),
        category(
            "Refrigerator",
            "refrigerator",
            "fridge-repair-denver.html",
            &[
                ("Not Cooling", "not-cooling"),
                ("Leaking Water", "leaking-water"),
                ("Ice Maker Not Working", "ice-maker-not-working"),
                ("Not Running", "not-running"),
                ("Making Noise", "making-noise"),
            ],
        ),
        category(
            "Dishwasher",
            "dishwasher",
            "dishwasher-repair-denver.html",
            &[
                ("Not Draining", "not-draining"),
                ("Not Cleaning Dishes", "not-cleaning-dishes"),
                ("Leaking Water", "leaking-water"),
                ("Not Starting", "not-starting"),
                ("Not Drying", "not-drying"),
            ],
        ),
    ];

    Catalog {
        region: default_region(),
        primary_location: Some("denver".to_owned()),
        primary_page: default_primary_page(),
        booking_page: default_booking_page(),
        subpage_dir_suffix: default_subpage_dir_suffix(),
        brand_page_suffix: default_brand_page_suffix(),
        locations: vec![
            location("Denver", "denver", 1),
            location("Aurora", "aurora", 2),
            location("Highlands Ranch", "highlands-ranch", 2),
            location("Lakewood", "lakewood", 2),
            location("Arvada", "arvada", 2),
            location("Westminster", "westminster", 2),
        ],
        matrices: vec![
            TierMatrix {
                tier: 1,
                categories: tier1,
            },
            TierMatrix {
                tier: 2,
                categories: tier2,
            },
        ],
        brands: vec![
            brand("Sub-Zero", "sub-zero", "Refrigerator", "Not Cooling", "not-cooling"),
            brand("Viking", "viking", "Refrigerator", "Not Cooling", "not-cooling"),
            brand("Thermador", "thermador", "Refrigerator", "Not Cooling", "not-cooling"),
            brand("Bosch", "bosch", "Refrigerator", "Leaking Water", "leaking-water"),
            brand(
                "Miele",
                "miele",
                "Refrigerator",
                "Ice Maker Not Working",
                "ice-maker-not-working",
            ),
            brand("Samsung", "samsung", "Dryer", "Not Heating", "not-heating"),
            brand("LG", "lg", "Dryer", "Not Heating", "not-heating"),
            brand("Miele", "miele", "Dryer", "Not Heating", "not-heating"),
            brand("Bosch", "bosch", "Dryer", "Not Starting", "not-starting"),
            brand("Whirlpool", "whirlpool", "Dryer", "Not Spinning", "not-spinning"),
        ],
    }
}

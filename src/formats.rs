use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    LocationSymptom,
    BrandSymptom,
}

/// Root-relative URLs of the pages a record links up to. `None` when the page
/// does not exist in the target repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLinks {
    pub location_page: Option<String>,
    pub category_page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand_page: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    pub label: String,
    pub url: String,
}

/// One planned page. This is the hand-off contract between `plan` and
/// `generate`; field names are part of the plan JSON schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePlanRecord {
    pub location: String,
    pub location_slug: String,
    pub region: String,
    pub tier: u32,
    pub page_type: PageType,
    pub category: String,
    pub category_slug: String,
    pub symptom: String,
    pub symptom_slug: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub brand_slug: Option<String>,
    pub slug: String,
    pub output_filename: String,
    pub parent_page: String,
    pub parents: ParentLinks,
    pub breadcrumbs: Vec<Breadcrumb>,
    pub internal_links: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStats {
    pub primary_location_symptoms: usize,
    pub tiered_location_symptoms: usize,
    pub brand_symptoms: usize,
    pub skipped_existing: usize,
    pub skipped_duplicate: usize,
}

/// Generated text for exactly one record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSections {
    pub title: String,
    pub description: String,
    pub heading: String,
    pub intro: String,
    pub body: String,
}

impl ContentSections {
    /// Labels of the sections that are empty, in response order.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            ("title", &self.title),
            ("description", &self.description),
            ("heading", &self.heading),
            ("intro", &self.intro),
            ("body", &self.body),
        ]
        .into_iter()
        .filter(|(_, text)| text.trim().is_empty())
        .map(|(label, _)| label)
        .collect()
    }
}

/// A plan record that could not be materialized, or a page that failed its
/// integrity check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub file: String,
    pub error: String,
}

//! Prompt rendering and parsing of the generator's labeled response.

use crate::formats::{ContentSections, PagePlanRecord};

pub const SYSTEM_INSTRUCTIONS: &str = "You are an expert SEO content writer for a local appliance repair company. \
Write unique, helpful, accurate content. Follow the output format exactly. \
Do not wrap output in code fences. Output raw text and HTML as instructed.";

pub const DEFAULT_PROMPT: &str = r#"Write a landing page for {brand}{category} repair in {location}, {region}, focused on one problem: "{category} {symptom}".

The page links up to {parent_page}. Homeowners reading it have a {category_lower} that is {symptom_lower} and want to know what causes it, what they can safely check themselves, and when to call a technician.

Requirements:
- Mention {location} naturally; do not stuff keywords.
- Explain three to five likely causes specific to a {category_lower} that is {symptom_lower}.
- Include a short list of safe checks a homeowner can do before booking.
- Close with a call to book a same-day visit.
- Every paragraph must be original to this page.

Respond in exactly this format, each label at the start of its own line:

TITLE: <page title, at most 60 characters>
DESCRIPTION: <meta description, at most 155 characters>
H1: <main heading, plain text>
INTRO: <one or two sentences, plain text>
BODY:
<HTML body using <h2>, <p>, <ul>/<li> only, 500-800 words>
"#;

/// Response labels in the order the generator is asked to emit them.
const LABELS: [(&str, Section); 5] = [
    ("TITLE:", Section::Title),
    ("DESCRIPTION:", Section::Description),
    ("H1:", Section::Heading),
    ("INTRO:", Section::Intro),
    ("BODY:", Section::Body),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Title,
    Description,
    Heading,
    Intro,
    Body,
}

impl Section {
    fn slot<'a>(self, sections: &'a mut ContentSections) -> &'a mut String {
        match self {
            Section::Title => &mut sections.title,
            Section::Description => &mut sections.description,
            Section::Heading => &mut sections.heading,
            Section::Intro => &mut sections.intro,
            Section::Body => &mut sections.body,
        }
    }
}

/// Substitutes the record's fields into a prompt template.
pub fn build_prompt(template: &str, record: &PagePlanRecord) -> String {
    let brand = record
        .brand
        .as_deref()
        .map(|b| format!("{b} "))
        .unwrap_or_default();

    let replacements = [
        ("{location}", record.location.clone()),
        ("{region}", record.region.clone()),
        ("{category}", record.category.clone()),
        ("{symptom}", record.symptom.clone()),
        ("{brand}", brand),
        ("{parent_page}", record.parent_page.clone()),
        ("{category_lower}", record.category.to_lowercase()),
        ("{symptom_lower}", record.symptom.to_lowercase()),
    ];

    replacements
        .iter()
        .fold(template.to_owned(), |prompt, (placeholder, value)| {
            prompt.replace(placeholder, value)
        })
}

/// Splits a response into sections by label tokens at line starts. Labels
/// may be missing; a repeated label keeps its first occurrence.
pub fn split_sections(response: &str) -> ContentSections {
    let mut sections = ContentSections::default();
    let mut seen = Vec::with_capacity(LABELS.len());
    let mut current: Option<Section> = None;

    for line in response.lines() {
        if let Some((label, section)) = LABELS.iter().find(|(label, _)| line.starts_with(label)) {
            if seen.contains(section) {
                current = None;
                continue;
            }
            seen.push(*section);
            current = Some(*section);
            let rest = line[label.len()..].trim_start();
            section.slot(&mut sections).push_str(rest);
            continue;
        }

        if let Some(section) = current {
            let slot = section.slot(&mut sections);
            slot.push('\n');
            slot.push_str(line);
        }
    }

    for (_, section) in LABELS {
        let slot = section.slot(&mut sections);
        *slot = slot.trim().to_owned();
    }
    sections
}

/// Parses a response and requires every section to be non-empty.
pub fn parse_response(response: &str) -> anyhow::Result<ContentSections> {
    let sections = split_sections(response);
    let missing = sections.missing();
    if !missing.is_empty() {
        anyhow::bail!("missing sections: {}", missing.join(", "));
    }
    Ok(sections)
}

/// Words of visible text, markup stripped.
pub fn word_count(html: &str) -> usize {
    crate::check::strip_tags(html).split_whitespace().count()
}

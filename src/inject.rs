//! Splicing generated sections into the shared page template.
//!
//! The template carries five marker pairs (`<!-- SEO_X -->` ... `<!-- /SEO_X -->`).
//! Content between a pair is replaced wholesale; the markers stay in place so
//! a produced page can be re-validated later. Everything outside the markers
//! is template boilerplate written for the seed location, and only the phrases
//! listed in [`BOILERPLATE`] are retargeted.

use crate::formats::{ContentSections, PagePlanRecord};

/// Location the template's example content is written for.
pub const SEED_LOCATION: &str = "Cherry Creek";
pub const SEED_LOCATION_SLUG: &str = "cherry-creek";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPair {
    pub name: &'static str,
    pub open: &'static str,
    pub close: &'static str,
}

pub const TITLE: MarkerPair = MarkerPair {
    name: "SEO_TITLE",
    open: "<!-- SEO_TITLE -->",
    close: "<!-- /SEO_TITLE -->",
};
pub const META_DESCRIPTION: MarkerPair = MarkerPair {
    name: "SEO_META_DESCRIPTION",
    open: "<!-- SEO_META_DESCRIPTION -->",
    close: "<!-- /SEO_META_DESCRIPTION -->",
};
pub const HEADING: MarkerPair = MarkerPair {
    name: "SEO_H1",
    open: "<!-- SEO_H1 -->",
    close: "<!-- /SEO_H1 -->",
};
pub const INTRO: MarkerPair = MarkerPair {
    name: "SEO_INTRO",
    open: "<!-- SEO_INTRO -->",
    close: "<!-- /SEO_INTRO -->",
};
pub const BODY: MarkerPair = MarkerPair {
    name: "SEO_BODY",
    open: "<!-- SEO_BODY -->",
    close: "<!-- /SEO_BODY -->",
};

pub const MARKERS: [MarkerPair; 5] = [TITLE, META_DESCRIPTION, HEADING, INTRO, BODY];

/// A literal seed-location phrase and its replacement. `{location}` and
/// `{slug}` in the replacement are filled from the target record.
#[derive(Debug, Clone, Copy)]
pub struct BoilerplateRule {
    pub literal: &'static str,
    pub replacement: &'static str,
}

pub const BOILERPLATE: &[BoilerplateRule] = &[
    BoilerplateRule {
        literal: "Appliance Repair Services in Cherry Creek",
        replacement: "Appliance Repair Services in {location}",
    },
    BoilerplateRule {
        literal: "We cover Cherry Creek North, Cherry Creek South, and all surrounding blocks between University Boulevard and Colorado Boulevard.",
        replacement: "We provide full appliance repair coverage throughout {location} and surrounding neighborhoods.",
    },
    BoilerplateRule {
        literal: "Same-day appointments available in Cherry Creek.",
        replacement: "Same-day appointments available in {location}.",
    },
    BoilerplateRule {
        literal: "Schedule Appliance Repair in Cherry Creek",
        replacement: "Schedule Appliance Repair in {location}",
    },
    BoilerplateRule {
        literal: r#"value="website-cherry-creek""#,
        replacement: r#"value="website-{slug}""#,
    },
    BoilerplateRule {
        literal: "Appliance Repair Near Cherry Creek",
        replacement: "Appliance Repair Near {location}",
    },
    BoilerplateRule {
        literal: "Appliance Brands We Service in Cherry Creek",
        replacement: "Appliance Brands We Service in {location}",
    },
    BoilerplateRule {
        literal: "Need Appliance Repair in Cherry Creek?",
        replacement: "Need Appliance Repair in {location}?",
    },
];

/// Marker tokens absent from `html`, open before close, in template order.
pub fn missing_markers(html: &str) -> Vec<&'static str> {
    MARKERS
        .iter()
        .flat_map(|pair| [pair.open, pair.close])
        .filter(|marker| !html.contains(marker))
        .collect()
}

pub fn validate_template(template: &str) -> anyhow::Result<()> {
    let missing = missing_markers(template);
    if !missing.is_empty() {
        anyhow::bail!("template is missing required markers: {}", missing.join(", "));
    }
    Ok(())
}

/// Byte range of the first `open ... close` pair, markers included.
fn marker_span(html: &str, pair: &MarkerPair) -> Option<(usize, usize)> {
    let start = html.find(pair.open)?;
    let inner = start + pair.open.len();
    let close = inner + html[inner..].find(pair.close)?;
    Some((start, close + pair.close.len()))
}

/// Replaces everything between the first occurrence of `pair`, keeping both
/// markers. Returns the input unchanged when the pair is not present.
pub fn replace_marker_block(html: &str, pair: &MarkerPair, content: &str) -> String {
    let Some((start, end)) = marker_span(html, pair) else {
        return html.to_owned();
    };
    let inner_start = start + pair.open.len();
    let inner_end = end - pair.close.len();

    let mut out = String::with_capacity(html.len() - (inner_end - inner_start) + content.len());
    out.push_str(&html[..inner_start]);
    out.push_str(content);
    out.push_str(&html[inner_end..]);
    out
}

/// Applies the boilerplate table to the parts of `html` outside every marker
/// region.
pub fn retarget_boilerplate(html: &str, location: &str, location_slug: &str) -> String {
    let mut regions = MARKERS
        .iter()
        .filter_map(|pair| marker_span(html, pair))
        .collect::<Vec<_>>();
    regions.sort_unstable();

    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    for (start, end) in regions {
        if start < cursor {
            // Overlapping pairs; keep the earlier region intact.
            continue;
        }
        out.push_str(&retarget_segment(&html[cursor..start], location, location_slug));
        out.push_str(&html[start..end]);
        cursor = end;
    }
    out.push_str(&retarget_segment(&html[cursor..], location, location_slug));
    out
}

fn retarget_segment(segment: &str, location: &str, location_slug: &str) -> String {
    BOILERPLATE.iter().fold(segment.to_owned(), |text, rule| {
        let replacement = rule
            .replacement
            .replace("{location}", location)
            .replace("{slug}", location_slug);
        text.replace(rule.literal, &replacement)
    })
}

/// Produces the page for one record. Sections are substituted as given; the
/// caller is responsible for completeness.
pub fn inject_content(template: &str, record: &PagePlanRecord, sections: &ContentSections) -> String {
    let heading = format!("<h1>{}</h1>", sections.heading);
    let intro = format!(
        "\n            <p class=\"hero-text\">{}</p>\n            ",
        sections.intro
    );
    let body = format!(
        "\n            <div class=\"content-body\">\n{}\n            </div>\n            ",
        sections.body
    );
    let description = sections.description.replace('"', "&quot;");

    // Spans come from the template so generated text containing a marker
    // cannot redirect a later splice.
    let mut splices = [
        (TITLE, sections.title.as_str()),
        (META_DESCRIPTION, description.as_str()),
        (HEADING, heading.as_str()),
        (INTRO, intro.as_str()),
        (BODY, body.as_str()),
    ]
    .into_iter()
    .filter_map(|(pair, content)| {
        let (start, end) = marker_span(template, &pair)?;
        Some((start + pair.open.len(), end - pair.close.len(), content))
    })
    .collect::<Vec<_>>();
    splices.sort_unstable_by_key(|&(start, _, _)| start);

    let mut html = String::with_capacity(template.len() + sections.body.len());
    let mut cursor = 0;
    for (start, end, content) in splices {
        if start < cursor {
            continue;
        }
        html.push_str(&template[cursor..start]);
        html.push_str(content);
        cursor = end;
    }
    html.push_str(&template[cursor..]);

    retarget_boilerplate(&html, &record.location, &record.location_slug)
}

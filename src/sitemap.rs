use std::path::Path;

use anyhow::Context as _;

const URLSET_CLOSE: &str = "</urlset>";

/// Absolute URL of a produced page under `base`.
pub fn page_url(base: &url::Url, filename: &str) -> anyhow::Result<url::Url> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(filename)
        .with_context(|| format!("build page url for {filename}"))
}

fn url_entry(loc: &url::Url, lastmod: chrono::NaiveDate) -> String {
    format!(
        "  <url>\n    <loc>{loc}</loc>\n    <lastmod>{}</lastmod>\n    <changefreq>monthly</changefreq>\n    <priority>0.7</priority>\n  </url>\n",
        lastmod.format("%Y-%m-%d")
    )
}

/// Inserts `<url>` entries before `</urlset>`. Returns the updated document,
/// or `None` when there is no `</urlset>` to anchor on.
pub fn insert_urls(
    sitemap: &str,
    base: &url::Url,
    filenames: &[String],
    lastmod: chrono::NaiveDate,
) -> anyhow::Result<Option<(String, usize)>> {
    let Some(close) = sitemap.rfind(URLSET_CLOSE) else {
        return Ok(None);
    };

    let mut entries = String::new();
    let mut added = 0;
    for filename in filenames {
        let loc = page_url(base, filename)?;
        if sitemap.contains(&format!("<loc>{loc}</loc>")) {
            tracing::debug!(%loc, "already in sitemap");
            continue;
        }
        entries.push_str(&url_entry(&loc, lastmod));
        added += 1;
    }

    let mut out = String::with_capacity(sitemap.len() + entries.len());
    out.push_str(&sitemap[..close]);
    out.push_str(&entries);
    out.push_str(&sitemap[close..]);
    Ok(Some((out, added)))
}

/// Appends new page URLs to the sitemap at `path`, leaving existing entries
/// untouched. A missing file or a file without `</urlset>` is skipped with a
/// warning. Returns the number of URLs added.
pub fn append_urls(
    path: &Path,
    base: &url::Url,
    filenames: &[String],
    lastmod: chrono::NaiveDate,
) -> anyhow::Result<usize> {
    let sitemap = match std::fs::read_to_string(path) {
        Ok(sitemap) => sitemap,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "sitemap not found; skipping sitemap update");
            return Ok(0);
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read sitemap: {}", path.display()));
        }
    };

    let Some((updated, added)) = insert_urls(&sitemap, base, filenames, lastmod)? else {
        tracing::warn!(path = %path.display(), "no {URLSET_CLOSE} in sitemap; skipping sitemap update");
        return Ok(0);
    };
    if added == 0 {
        tracing::info!(path = %path.display(), "sitemap already lists every new page");
        return Ok(0);
    }

    std::fs::write(path, updated).with_context(|| format!("write sitemap: {}", path.display()))?;
    tracing::info!(path = %path.display(), added, "sitemap updated");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SITEMAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://www.example.com/aurora-washer-not-draining.html</loc>
  </url>
</urlset>
"#;

    fn date() -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(2025, 3, 14).expect("valid date")
    }

    #[test]
    fn page_url_tolerates_missing_trailing_slash() -> anyhow::Result<()> {
        let base = url::Url::parse("https://www.example.com/services")?;
        assert_eq!(
            page_url(&base, "a.html")?.as_str(),
            "https://www.example.com/services/a.html"
        );
        let base = url::Url::parse("https://www.example.com")?;
        assert_eq!(page_url(&base, "a.html")?.as_str(), "https://www.example.com/a.html");
        Ok(())
    }

    #[test]
    fn inserts_new_urls_before_close_and_skips_listed_ones() -> anyhow::Result<()> {
        let base = url::Url::parse("https://www.example.com/")?;
        let files = vec![
            "aurora-washer-not-draining.html".to_owned(),
            "lakewood-dryer-not-heating.html".to_owned(),
        ];

        let (updated, added) = insert_urls(SITEMAP, &base, &files, date())?.expect("has urlset");
        assert_eq!(added, 1);
        assert_eq!(updated.matches("<url>").count(), 2);
        assert!(updated.contains(
            "  <url>\n    <loc>https://www.example.com/lakewood-dryer-not-heating.html</loc>\n    <lastmod>2025-03-14</lastmod>\n    <changefreq>monthly</changefreq>\n    <priority>0.7</priority>\n  </url>\n</urlset>"
        ));
        assert!(updated.starts_with(&SITEMAP[..SITEMAP.find("</urlset>").expect("close")]));
        Ok(())
    }

    #[test]
    fn missing_file_or_close_tag_is_not_an_error() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let base = url::Url::parse("https://www.example.com/")?;
        let files = vec!["a.html".to_owned()];

        assert_eq!(append_urls(&temp.path().join("sitemap.xml"), &base, &files, date())?, 0);

        let broken = temp.path().join("broken.xml");
        std::fs::write(&broken, "<urlset>")?;
        assert_eq!(append_urls(&broken, &base, &files, date())?, 0);
        assert_eq!(std::fs::read_to_string(&broken)?, "<urlset>");
        Ok(())
    }

    #[test]
    fn append_urls_rewrites_file_once() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("sitemap.xml");
        std::fs::write(&path, SITEMAP)?;
        let base = url::Url::parse("https://www.example.com/")?;
        let files = vec!["b.html".to_owned()];

        assert_eq!(append_urls(&path, &base, &files, date())?, 1);
        assert_eq!(append_urls(&path, &base, &files, date())?, 0);
        assert_eq!(std::fs::read_to_string(&path)?.matches("b.html").count(), 1);
        Ok(())
    }
}

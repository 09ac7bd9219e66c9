use std::fs;
use std::path::Path;

use predicates::prelude::*;
use servicepages::formats::{PagePlanRecord, PageType};

const RIVERTOWN: &str = r#"
locations:
  - { name: Rivertown, slug: rivertown, tier: 1 }
matrices:
  - tier: 1
    categories:
      - name: Washer
        slug: washer
        service_page: washer-repair.html
        symptoms:
          - { name: Not Draining, slug: not-draining }
"#;

fn read_plan(path: &Path) -> anyhow::Result<Vec<PagePlanRecord>> {
    Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
}

#[test]
fn single_location_catalog_yields_one_record() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let catalog = temp.path().join("catalog.yaml");
    fs::write(&catalog, RIVERTOWN)?;
    let site = temp.path().join("site");
    fs::create_dir(&site)?;
    let out = temp.path().join("plan.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("servicepages");
    cmd.args([
        "plan",
        "--catalog",
        catalog.to_str().unwrap(),
        "--root",
        site.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("washer-repair.html"))
    .stdout(predicate::str::contains("MISSING"))
    .stdout(predicate::str::contains("Slug conflicts: none"));

    let records = read_plan(&out)?;
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.slug, "rivertown-washer-not-draining.html");
    assert_eq!(record.output_filename, "rivertown-washer-not-draining.html");
    assert_eq!(record.parent_page, "rivertown.html");
    assert_eq!(record.page_type, PageType::LocationSymptom);
    assert_eq!(record.parents.location_page, None);
    let labels = record
        .breadcrumbs
        .iter()
        .map(|b| b.label.as_str())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["Home", "Washer Not Draining"]);
    assert_eq!(record.internal_links, vec!["/book.html"]);

    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out)?)?;
    assert!(raw[0]["parents"]["location_page"].is_null());
    assert!(raw[0]["parents"].get("brand_page").is_none());
    Ok(())
}

#[test]
fn existing_pages_resolve_links_and_block_slugs() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let site = temp.path();
    fs::write(site.join("index.html"), "")?;
    fs::write(site.join("washer-repair-denver.html"), "")?;
    fs::write(site.join("aurora-dryer-not-heating.html"), "")?;
    fs::create_dir(site.join("washer-repair-denver"))?;
    fs::write(
        site.join("washer-repair-denver").join("denver-washer-not-spinning.html"),
        "",
    )?;
    let out = temp.path().join("out").join("plan.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("servicepages");
    cmd.args([
        "plan",
        "--root",
        site.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--locations",
        "denver,aurora",
        "--categories",
        "washer,dryer",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("!! denver-washer-not-spinning.html"))
    .stdout(predicate::str::contains("!! aurora-dryer-not-heating.html"));

    let records = read_plan(&out)?;
    // Denver: 16 generic + 5 dryer brand pages; Aurora: 10. Minus two conflicts.
    assert_eq!(records.len(), 29);
    assert!(
        records
            .iter()
            .all(|r| r.slug != "denver-washer-not-spinning.html"
                && r.slug != "aurora-dryer-not-heating.html")
    );

    let first = &records[0];
    assert_eq!(first.slug, "denver-washer-not-draining.html");
    assert_eq!(first.parent_page, "index.html");
    assert_eq!(
        first.internal_links,
        vec!["/index.html", "/washer-repair-denver.html", "/book.html"]
    );

    let aurora = records
        .iter()
        .find(|r| r.location_slug == "aurora")
        .expect("aurora record");
    assert_eq!(aurora.parent_page, "aurora.html");
    assert_eq!(aurora.parents.location_page, None);
    Ok(())
}

#[test]
fn limit_caps_the_plan() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let out = temp.path().join("plan.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("servicepages");
    cmd.args([
        "plan",
        "--root",
        temp.path().join("empty").to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--limit",
        "45",
    ])
    .assert()
    .success()
    .stdout(predicate::str::contains("(capped at 45)"));

    let records = read_plan(&out)?;
    assert_eq!(records.len(), 45);
    assert_eq!(records[44].location_slug, "aurora");
    Ok(())
}

#[test]
fn unknown_filters_write_an_empty_plan() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let out = temp.path().join("plan.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("servicepages");
    cmd.args([
        "plan",
        "--root",
        temp.path().to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--locations",
        "atlantis",
    ])
    .assert()
    .success();

    assert!(read_plan(&out)?.is_empty());
    Ok(())
}

#[test]
fn existing_plan_requires_force() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let out = temp.path().join("plan.json");
    fs::write(&out, "keep me")?;

    let args = [
        "plan",
        "--root",
        temp.path().to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
        "--limit",
        "1",
    ];

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("servicepages");
    cmd.args(args)
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(fs::read_to_string(&out)?, "keep me");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("servicepages");
    cmd.args(args).arg("--force").assert().success();
    assert_eq!(read_plan(&out)?.len(), 1);
    Ok(())
}

#[test]
fn invalid_catalog_is_a_configuration_error() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let catalog = temp.path().join("catalog.yaml");
    fs::write(&catalog, RIVERTOWN.replace("slug: rivertown", "slug: River Town"))?;
    let out = temp.path().join("plan.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("servicepages");
    cmd.args([
        "plan",
        "--catalog",
        catalog.to_str().unwrap(),
        "--out",
        out.to_str().unwrap(),
    ])
    .assert()
    .failure()
    .stderr(predicate::str::contains("invalid slug"));
    assert!(!out.exists());
    Ok(())
}

#[test]
fn rust_log_debug_emits_debug_line_to_stderr() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let out = temp.path().join("plan.json");

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("servicepages");
    cmd.env("RUST_LOG", "debug")
        .args([
            "plan",
            "--root",
            temp.path().to_str().unwrap(),
            "--out",
            out.to_str().unwrap(),
            "--limit",
            "1",
        ])
        .assert()
        .success()
        .stderr(predicate::str::contains("parsed cli"));
    Ok(())
}

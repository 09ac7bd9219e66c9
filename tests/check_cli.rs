use std::fs;

use predicates::prelude::*;

const TEMPLATE: &str = include_str!("fixtures/template_location_base.html");

const SCRIPT: &str = "read -r line; printf 'TITLE: %s\\nDESCRIPTION: D\\nH1: H\\nINTRO: I\\nBODY:\\n<p>Body for %s.</p>\\n' \"$line\" \"$line\"";

#[test]
fn check_passes_generated_pages_and_flags_tampered_ones() -> anyhow::Result<()> {
    let temp = tempfile::TempDir::new()?;
    let site = temp.path().join("site");
    fs::create_dir(&site)?;
    let plan = temp.path().join("plan.json");
    let template = temp.path().join("template.html");
    let prompt = temp.path().join("prompt.txt");
    fs::write(&template, TEMPLATE)?;
    fs::write(&prompt, "{location} {category} {symptom}\n")?;

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("servicepages");
    cmd.args([
        "plan",
        "--root",
        site.to_str().unwrap(),
        "--out",
        plan.to_str().unwrap(),
        "--locations",
        "lakewood",
        "--limit",
        "3",
    ])
    .assert()
    .success();

    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("servicepages");
    cmd.args([
        "generate",
        "--plan",
        plan.to_str().unwrap(),
        "--template",
        template.to_str().unwrap(),
        "--prompt",
        prompt.to_str().unwrap(),
        "--out",
        site.to_str().unwrap(),
        "--limit",
        "2",
        "--delay-ms",
        "0",
        "--engine",
        "command",
        "--command",
        "sh",
        "--",
        "-c",
        SCRIPT,
    ])
    .assert()
    .success();

    let check = |expect_ok: bool| {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("servicepages");
        let assert = cmd
            .args([
                "check",
                "--plan",
                plan.to_str().unwrap(),
                "--site",
                site.to_str().unwrap(),
            ])
            .assert();
        if expect_ok {
            assert.success()
        } else {
            assert.code(1)
        }
    };

    check(true)
        .stdout(predicate::str::contains("Checked:          2"))
        .stdout(predicate::str::contains("Not materialized: 1"))
        .stdout(predicate::str::contains("Violations:       0"));

    let page = site.join("lakewood-washer-not-spinning.html");
    let html = fs::read_to_string(&page)?;
    fs::write(
        &page,
        html.replace("<p>Body for", "<p>Cherry Creek neighbors: body for"),
    )?;

    check(false)
        .stdout(predicate::str::contains("Violations:       1"))
        .stdout(predicate::str::contains(
            "! lakewood-washer-not-spinning.html: Cherry Creek reference found in Lakewood page content",
        ));
    Ok(())
}

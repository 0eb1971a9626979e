use assert_cmd::Command;
use predicates::prelude::*;

mod common;

fn viamask() -> Command {
    let mut cmd = Command::cargo_bin("viamask").unwrap();
    cmd.env_remove("VIAMASK_IMAGES")
        .env_remove("VIAMASK_OUTPUT")
        .env_remove("RUST_LOG");
    cmd
}

/// Temp dir with `images/`, `masks/` and an export covering three regions.
fn fixture() -> tempfile::TempDir {
    let temp = tempfile::tempdir().expect("create temp dir");
    let images = temp.path().join("images");
    std::fs::create_dir_all(temp.path().join("masks")).expect("create masks dir");

    common::write_jpeg(&images.join("cat.jpg"), 20, 20);
    common::write_bmp(&images.join("x.bmp"), 10, 10);
    common::write_document(
        &temp.path().join("export.json"),
        &[
            common::entry("cat.jpg", vec![common::square_region(Some("head"))]),
            common::entry(
                "x.bmp",
                vec![common::square_region(None), common::square_region(None)],
            ),
        ],
    );
    temp
}

#[test]
fn runs() {
    viamask().assert().success();
}

#[test]
fn outputs_tool_name() {
    viamask()
        .arg("-V")
        .assert()
        .success()
        .stdout(format!("viamask {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn generate_writes_masks() {
    let temp = fixture();
    viamask()
        .current_dir(temp.path())
        .args(["generate", "export.json", "--images", "images", "--output", "masks"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote 3 mask(s)"))
        .stdout(predicate::str::contains("cat.jpg -> cat_head_0.png (20x20)"));

    let masks = temp.path().join("masks");
    assert!(masks.join("cat_head_0.png").is_file());
    assert!(masks.join("x_0.png").is_file());
    assert!(masks.join("x_1.png").is_file());
}

#[test]
fn generate_reads_directories_from_env() {
    let temp = fixture();
    viamask()
        .current_dir(temp.path())
        .env("VIAMASK_IMAGES", "images")
        .env("VIAMASK_OUTPUT", "masks")
        .args(["generate", "export.json"])
        .assert()
        .success();

    assert!(temp.path().join("masks/cat_head_0.png").is_file());
}

#[test]
fn generate_json_report() {
    let temp = fixture();
    let output = viamask()
        .current_dir(temp.path())
        .args([
            "generate",
            "export.json",
            "-i",
            "images",
            "-o",
            "masks",
            "--dry-run",
            "--report",
            "json",
        ])
        .output()
        .expect("run viamask");
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json report");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["outcomes"].as_array().map(Vec::len), Some(3));
    assert_eq!(report["outcomes"][0]["status"], "planned");
    assert_eq!(report["outcomes"][2]["mask"], "x_1.png");
    assert_eq!(
        std::fs::read_dir(temp.path().join("masks")).unwrap().count(),
        0
    );
}

#[test]
fn generate_creates_output_on_request() {
    let temp = fixture();
    viamask()
        .current_dir(temp.path())
        .args(["generate", "export.json", "-i", "images", "-o", "new/masks"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to write mask"));

    viamask()
        .current_dir(temp.path())
        .args([
            "generate",
            "export.json",
            "-i",
            "images",
            "-o",
            "new/masks",
            "--create-output",
        ])
        .assert()
        .success();
    assert!(temp.path().join("new/masks/x_1.png").is_file());
}

#[test]
fn generate_missing_image_fails() {
    let temp = fixture();
    std::fs::remove_file(temp.path().join("images/cat.jpg")).unwrap();

    viamask()
        .current_dir(temp.path())
        .args(["generate", "export.json", "-i", "images", "-o", "masks"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Source image not found"))
        .stderr(predicate::str::contains("cat.jpg"));
}

#[test]
fn generate_keep_going_lists_failures() {
    let temp = fixture();
    std::fs::remove_file(temp.path().join("images/cat.jpg")).unwrap();

    viamask()
        .current_dir(temp.path())
        .args([
            "generate",
            "export.json",
            "-i",
            "images",
            "-o",
            "masks",
            "--keep-going",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Wrote 2 mask(s)"))
        .stdout(predicate::str::contains("Failed (1):"))
        .stdout(predicate::str::contains("cat.jpg -> cat_head_0.png"))
        .stderr(predicate::str::contains("failed for 1 of 3 region(s)"));

    assert!(temp.path().join("masks/x_0.png").is_file());
}

#[test]
fn generate_schema_error_fails() {
    let temp = tempfile::tempdir().expect("create temp dir");
    std::fs::write(
        temp.path().join("export.json"),
        r#"{"a": {"filename": "a.jpg", "regions": [{"shape_attributes": {"name": "polygon", "all_points_x": [1, 2, 3], "all_points_y": [1, 2]}}]}}"#,
    )
    .unwrap();

    viamask()
        .current_dir(temp.path())
        .args(["generate", "export.json", "-i", ".", "-o", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Schema error"))
        .stderr(predicate::str::contains("point count mismatch"));
}

#[test]
fn generate_requires_directories() {
    viamask()
        .args(["generate", "export.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--images"));
}

#[test]
fn generate_nonexistent_annotations_fails() {
    viamask()
        .args(["generate", "nonexistent_file.json", "-i", ".", "-o", "."])
        .assert()
        .failure()
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn inspect_text_table() {
    let temp = fixture();
    viamask()
        .current_dir(temp.path())
        .args(["inspect", "export.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("cat_head_0.png"))
        .stdout(predicate::str::contains("x_1.png"))
        .stdout(predicate::str::contains("3 region(s)"));
}

#[test]
fn inspect_csv() {
    let temp = fixture();
    viamask()
        .current_dir(temp.path())
        .args(["inspect", "export.json", "--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "filename,x_points,y_points,type,filetype,count\n",
        ))
        .stdout(predicate::str::contains(
            r#"cat,"[0,10,10,0]","[0,0,10,10]",head,jpg,0"#,
        ))
        .stdout(predicate::str::contains(r#"x,"[0,10,10,0]","[0,0,10,10]",,bmp,1"#));
}

#[test]
fn inspect_json() {
    let temp = fixture();
    let output = viamask()
        .current_dir(temp.path())
        .args(["inspect", "export.json", "--format", "json"])
        .output()
        .expect("run viamask");
    assert!(output.status.success());

    let records: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(records[1]["filename"], "x");
    assert_eq!(records[1]["type"], "");
    assert_eq!(records[2]["count"], 1);
}

#[test]
fn inspect_rejects_unknown_format() {
    let temp = fixture();
    viamask()
        .current_dir(temp.path())
        .args(["inspect", "export.json", "--format", "yaml"])
        .assert()
        .failure();
}

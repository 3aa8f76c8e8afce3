use assert_cmd::Command;
use image::{Rgb, RgbImage};
use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn cmd(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("shadekit").unwrap();
    cmd.current_dir(dir);
    cmd
}

fn json_of(out: &[u8]) -> Value {
    serde_json::from_slice(out).expect("valid json output")
}

fn write_product(dir: &Path, shades: &[&str]) -> std::path::PathBuf {
    let shades: Vec<Value> = shades
        .iter()
        .map(|n| serde_json::json!({ "name": n, "image": "" }))
        .collect();
    let product = serde_json::json!({ "slug": "cream-colors", "title": "Cream Colors", "shades": shades });
    let path = dir.join("cream-colors.json");
    fs::write(&path, serde_json::to_string_pretty(&product).unwrap()).unwrap();
    path
}

#[test]
fn help_lists_subcommands() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("flood-background"))
        .stdout(contains("prepare-queue"))
        .stdout(contains("reconcile"));
}

#[test]
fn background_replaces_white_and_reports_json() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("bottle.png");
    let mut img = RgbImage::from_pixel(10, 10, Rgb([252, 252, 252]));
    img.put_pixel(5, 5, Rgb([180, 20, 40]));
    img.save(&input).unwrap();

    let out = cmd(tmp.path())
        .args(["--json", "background", "bottle.png", "--output", "grey.png"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_of(&out);
    assert_eq!(v["ok"], true);
    assert_eq!(v["data"]["replaced_pixels"], 99);

    let grey = image::open(tmp.path().join("grey.png")).unwrap().to_rgb8();
    assert_eq!(grey.get_pixel(0, 0).0, [245, 245, 245]);
    assert_eq!(grey.get_pixel(5, 5).0, [180, 20, 40]);
}

#[test]
fn config_file_overrides_defaults() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("shadekit.toml"), "[background]\ngrey = [230, 230, 230]\n").unwrap();
    RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]))
        .save(tmp.path().join("white.png"))
        .unwrap();

    cmd(tmp.path()).args(["background", "white.png"]).assert().success();
    let img = image::open(tmp.path().join("white.png")).unwrap().to_rgb8();
    assert_eq!(img.get_pixel(0, 0).0, [230, 230, 230]);
}

#[test]
fn official_then_queue() {
    let tmp = TempDir::new().unwrap();
    let product = write_product(tmp.path(), &["49 WHITE", "970 GOLD", "*PEARL*", "MINI COLOR WITH REFLECTION"]);

    let out = cmd(tmp.path())
        .args(["--json", "official"])
        .arg(&product)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_of(&out);
    assert_eq!(v["data"]["skipped"][0], "MINI COLOR WITH REFLECTION");
    assert_eq!(v["data"]["mapping"]["color_groups"]["Gold"][0], "970 GOLD");
    assert!(tmp.path().join("color_mapping_cream-colors.json").is_file());

    cmd(tmp.path())
        .args(["prepare-queue", ".", "--output", "queue.csv"])
        .assert()
        .success()
        .stdout(contains("2 shades"));
    let csv = fs::read_to_string(tmp.path().join("queue.csv")).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Main Color,Shade Number,Shade Name,Product Slug");
    assert_eq!(lines[1], "White,49,WHITE,cream-colors");
    assert_eq!(lines[2], "Gold,970,GOLD,cream-colors");
    assert_eq!(lines.len(), 3);

    cmd(tmp.path())
        .args(["strip-special", "."])
        .assert()
        .success()
        .stdout(contains("1 files updated"));
    let mapping: Value =
        serde_json::from_str(&fs::read_to_string(tmp.path().join("color_mapping_cream-colors.json")).unwrap())
            .unwrap();
    assert!(mapping["color_groups"].get("Special").is_none());
}

#[test]
fn key_rejects_inverted_thresholds() {
    let tmp = TempDir::new().unwrap();
    cmd(tmp.path())
        .args(["key", "in.png", "out.png", "--t0", "50", "--t1", "20"])
        .assert()
        .failure()
        .stderr(contains("must be below"));
}

#[test]
fn key_writes_transparent_png() {
    let tmp = TempDir::new().unwrap();
    let mut img = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));
    img.put_pixel(1, 1, Rgb([200, 200, 200]));
    img.save(tmp.path().join("dark.png")).unwrap();

    cmd(tmp.path()).args(["key", "dark.png", "keyed.png"]).assert().success();
    let keyed = image::open(tmp.path().join("keyed.png")).unwrap().to_rgba8();
    assert_eq!(keyed.get_pixel(0, 0).0[3], 0);
    assert_eq!(keyed.get_pixel(1, 1).0, [200, 200, 200, 255]);
}

#[test]
fn reconcile_exits_nonzero_when_unmatched() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("names.txt"), "NAIL SHIELD\nLIP BALM\n").unwrap();
    fs::write(
        tmp.path().join("products.json"),
        r#"[{"slug": "all-products_nail-shield", "title": "Nail Shield", "images": ["https://cdn/x.jpg"]}]"#,
    )
    .unwrap();

    cmd(tmp.path())
        .args(["reconcile", "names.txt", "--products", "products.json"])
        .assert()
        .failure()
        .stdout(contains("matched: 1/2"))
        .stdout(contains("not found: LIP BALM"));
}

#[test]
fn classify_requires_image_dir() {
    let tmp = TempDir::new().unwrap();
    let product = write_product(tmp.path(), &["51 RED"]);
    cmd(tmp.path())
        .args(["classify", "--images", "missing-dir"])
        .arg(&product)
        .assert()
        .failure()
        .stderr(contains("missing-dir"));
}

#[test]
fn compress_dry_run_lists_large_files() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("big.jpg"), vec![0u8; 4096]).unwrap();
    fs::write(tmp.path().join("small.jpg"), vec![0u8; 10]).unwrap();
    cmd(tmp.path())
        .args(["compress", ".", "--min-size-kb", "2", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("big.jpg"))
        .stdout(contains("small.jpg").not());
}

#[test]
fn flood_background_walks_shade_tree_for_secondary_images() {
    let tmp = TempDir::new().unwrap();
    let shade = tmp.path().join("shades/100 Rose");
    fs::create_dir_all(&shade).unwrap();
    for name in ["01.png", "02.png"] {
        RgbImage::from_pixel(6, 6, Rgb([255, 255, 255]))
            .save(shade.join(name))
            .unwrap();
    }

    let out = cmd(tmp.path())
        .args(["--json", "flood-background", "shades"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v = json_of(&out);
    assert_eq!(v["data"]["report"]["succeeded"], 1);
    assert_eq!(v["data"]["files"].as_array().map(Vec::len), Some(1));

    let primary = image::open(shade.join("01.png")).unwrap().to_rgb8();
    assert_eq!(primary.get_pixel(0, 0).0, [255, 255, 255]);
    let secondary = image::open(shade.join("02.png")).unwrap().to_rgb8();
    assert_eq!(secondary.get_pixel(0, 0).0, [245, 245, 245]);

    cmd(tmp.path())
        .args(["--json", "flood-background", "shades", "--files", "01.png", "--dry-run"])
        .assert()
        .success()
        .stdout(contains("01.png"));
}

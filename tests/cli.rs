use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DATASET: &str = r#"[
  {"date": "2024-06-02", "title": "Horsehead", "explanation": "A dark nebula in Orion.", "media_type": "image", "url": "https://apod.nasa.gov/horsehead.jpg"},
  {"date": "2024-06-03", "title": "Rings", "explanation": "Saturn at opposition.", "media_type": "image", "url": "https://apod.nasa.gov/saturn.jpg", "hdurl": "https://apod.nasa.gov/saturn_hd.jpg"},
  {"date": "2024-06-04", "title": "Launch", "explanation": "Liftoff.", "media_type": "video", "url": "https://www.youtube.com/embed/abc"},
  {"date": "2024-06-04", "title": "Launch (duplicate)", "explanation": "Liftoff again.", "media_type": "video"},
  {"date": "2024-06-05", "title": "Moonrise", "explanation": "Over the hills.", "media_type": "image", "url": "https://apod.nasa.gov/moon.jpg"},
  {"date": "2024-06-06", "title": "Aurora", "explanation": "Outside the window.", "media_type": "image"}
]"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        fs::write(dir.path().join("data.json"), DATASET).expect("write dataset");
        Self { dir }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn dataset_url(&self) -> String {
        format!("file://{}", self.path().join("data.json").display())
    }

    fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("apod-tui").expect("binary");
        cmd.env("XDG_CONFIG_HOME", self.path().join("config"))
            .env(
                "APOD_TUI_FAVORITES__PATH",
                self.path().join("favorites.json"),
            )
            .env("APOD_TUI_LOG", "off")
            .arg("--dataset")
            .arg(self.dataset_url());
        cmd
    }
}

#[test]
fn prints_version() {
    Command::cargo_bin("apod-tui")
        .expect("binary")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prints_help() {
    Command::cargo_bin("apod-tui")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("APOD-TUI").and(predicate::str::contains("--print")));
}

#[test]
fn print_shows_window_newest_first() {
    let fixture = Fixture::new();
    fixture
        .command()
        .args(["--start", "2024-06-03", "--end", "2024-06-05", "--print"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("3 items matched filters (from 3 unique items)")
                .and(predicate::str::contains(
                    "2024-06-05 — Moonrise\n  https://apod.nasa.gov/moon.jpg",
                ))
                .and(predicate::str::contains("2024-06-04 — Launch [video]"))
                .and(predicate::str::contains("https://apod.nasa.gov/saturn_hd.jpg"))
                .and(predicate::str::contains("Horsehead").not())
                .and(predicate::str::contains("Aurora").not())
                .and(predicate::str::contains("Page 1 of 1")),
        );
}

#[test]
fn print_reports_unmatched_category() {
    let fixture = Fixture::new();
    fixture
        .command()
        .args([
            "--start",
            "2024-06-03",
            "--end",
            "2024-06-05",
            "--category",
            "galaxy",
            "--print",
        ])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("No images match the selected filter.")
                .and(predicate::str::contains("0 items matched filters (from 3 unique items)")),
        );
}

#[test]
fn print_filters_by_keyword_category() {
    let fixture = Fixture::new();
    fixture
        .command()
        .args(["--start", "2024-06-01", "--category", "nebula", "--print"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("2024-06-02 — Horsehead")
                .and(predicate::str::contains("Rings").not()),
        );
}

#[test]
fn print_favorites_only_reads_saved_map() {
    let fixture = Fixture::new();
    fs::write(
        fixture.path().join("favorites.json"),
        r#"{"2024-06-03": true, "2024-06-05": false}"#,
    )
    .expect("write favorites");
    fixture
        .command()
        .args(["--start", "2024-06-01", "--favorites-only", "--print"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("2024-06-03 — Rings ♥")
                .and(predicate::str::contains("Moonrise").not()),
        );
}

#[test]
fn print_empty_window() {
    let fixture = Fixture::new();
    fixture
        .command()
        .args(["--start", "2023-01-01", "--print"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No images found for that date range."));
}

#[test]
fn missing_dataset_fails() {
    let fixture = Fixture::new();
    Command::cargo_bin("apod-tui")
        .expect("binary")
        .env("XDG_CONFIG_HOME", fixture.path().join("config"))
        .env("APOD_TUI_LOG", "off")
        .args(["--dataset", "file:///nonexistent/apod.json", "--print"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Failed to load images:"))
        .stderr(predicate::str::starts_with("error:"));
}

#[test]
fn rejects_unknown_category() {
    Fixture::new()
        .command()
        .args(["--category", "comet", "--print"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown category 'comet'"));
}

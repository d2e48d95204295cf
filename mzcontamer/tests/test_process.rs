use std::{error::Error, fs, process::Command};

use assert_cmd::prelude::*;
use predicates::prelude::*;

#[test]
fn test_file_missing() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzcontamer")?;

    cmd.arg("not_real.mzML").arg("-o").arg("-");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("An IO error occurred"));
    Ok(())
}

#[test]
fn test_malformed_time_range() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzcontamer")?;

    cmd.arg("not_real.mzML").arg("-o").arg("-").args(["-r", "1-z"]);
    cmd.assert().failure().stderr(predicate::str::contains(
        "Failed to parse time range end invalid float literal",
    ));

    let mut cmd = Command::cargo_bin("mzcontamer")?;

    cmd.arg("not_real.mzML").arg("-o").arg("-").args(["-r", "a-"]);
    cmd.assert().failure().stderr(predicate::str::contains(
        "Failed to parse time range start invalid float literal",
    ));

    Ok(())
}

#[test]
fn test_negative_tolerance() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzcontamer")?;

    cmd.arg("not_real.mzML").arg("--tolerance=-0.5");
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("is less than zero"));
    Ok(())
}

#[test]
fn test_run_standard() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzcontamer")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg("./tests/data/contaminated.mgf").args(["-o", "-"]);
    let result = cmd.assert().success();
    result
        .stdout(predicate::str::contains(r#""total_spectra": 3"#))
        .stdout(predicate::str::contains(r#""total_hits": 5"#))
        .stdout(predicate::str::contains("Total contaminant hits: 5"))
        .stdout(predicate::str::contains("- Detergents: 2 hits"))
        .stderr(predicate::str::contains("Spectra Read: 3"))
        .stderr(predicate::str::contains("Contaminant Hits: 5"));
    Ok(())
}

#[test]
fn test_run_subset_custom_reference() -> Result<(), Box<dyn Error>> {
    let hits_path = std::env::temp_dir().join("mzcontamer_test_subset_hits.tsv");
    let mut cmd = Command::cargo_bin("mzcontamer")?;
    cmd.env("RUST_LOG", "info");
    cmd.arg("./tests/data/contaminated.mgf")
        .args(["-o", "-", "-r", "1.5-"])
        .args(["-f", "./tests/data/custom_reference.toml", "-z"])
        .arg("-H")
        .arg(&hits_path);
    let result = cmd.assert().success();
    result
        .stdout(predicate::str::contains(r#""total_spectra": 2"#))
        .stdout(predicate::str::contains(r#""total_hits": 2"#))
        .stdout(predicate::str::contains("- Solvent Peaks: 0 hits"));

    let table = fs::read_to_string(&hits_path)?;
    let lines: Vec<_> = table.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("Triton X"));
    assert!(lines[2].contains("Tween"));
    fs::remove_file(&hits_path)?;
    Ok(())
}

#[test]
fn test_run_no_hits() -> Result<(), Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("mzcontamer")?;
    cmd.arg("./tests/data/contaminated.mgf")
        .args(["-o", "-", "-r", "2.5-", "-R", "extended"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(r#""total_hits": 0"#))
        .stdout(predicate::str::contains("No contaminants detected."));
    Ok(())
}

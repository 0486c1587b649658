use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_cli_end_to_end() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/scenarios.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "reference,challenge_required,challenge_status",
        ))
        .stdout(predicate::str::contains("moto,true,ByPassed"))
        .stdout(predicate::str::contains("us,false,NotApplicable"))
        .stdout(predicate::str::contains("failed,true,Failed"))
        .stdout(predicate::str::contains("cancelled,true,Cancelled"))
        .stdout(predicate::str::contains("timedout,true,TimedOut"))
        .stdout(predicate::str::contains("mandate,true,Succeeded"));

    Ok(())
}

#[test]
fn test_cli_config_file() -> Result<(), Box<dyn std::error::Error>> {
    let config = tempfile::NamedTempFile::new()?;
    std::fs::write(config.path(), r#"{"psd2_markets": ["US"]}"#)?;

    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/scenarios.csv")
        .arg("--config")
        .arg(config.path());

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("us,true,TimedOut"))
        .stdout(predicate::str::contains("failed,false,NotApplicable"));

    Ok(())
}

#[test]
fn test_cli_missing_input() {
    let mut cmd = Command::new(cargo_bin!());
    cmd.arg("tests/fixtures/does_not_exist.csv");
    cmd.assert().failure();
}

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use std::error::Error;

#[test]
fn simulate_prints_requested_length() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["simulate", "--duration", "2", "--fs", "500"]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(output)?;
    let samples: Vec<f64> = text
        .lines()
        .map(|line| line.parse::<f64>())
        .collect::<Result<_, _>>()?;
    assert_eq!(samples.len(), 1000);
    Ok(())
}

#[test]
fn simulate_is_reproducible_per_seed() -> Result<(), Box<dyn Error>> {
    let run = |seed: &str| -> Result<Vec<u8>, Box<dyn Error>> {
        let mut cmd = cargo_bin_cmd!("ekg");
        cmd.args(["simulate", "--duration", "1", "--seed", seed]);
        Ok(cmd.assert().success().get_output().stdout.clone())
    };
    assert_eq!(run("7")?, run("7")?);
    assert_ne!(run("7")?, run("8")?);
    Ok(())
}

#[test]
fn simulate_with_analysis_flags_long_pr() -> Result<(), Box<dyn Error>> {
    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args([
        "simulate",
        "--noise",
        "0",
        "--pr-ms",
        "210",
        "--qt-ms",
        "380",
        "--analyze",
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let result: Value = serde_json::from_slice(&output)?;
    let conditions: Vec<&str> = result["findings"]
        .as_array()
        .expect("findings array")
        .iter()
        .filter_map(|f| f["condition"].as_str())
        .collect();
    assert!(conditions.contains(&"possible AV block"), "{conditions:?}");
    assert_eq!(result["recommendation"], "follow_up");
    Ok(())
}

#[test]
fn simulate_rejects_zero_heart_rate() {
    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["simulate", "--heart-rate", "0"]);
    cmd.assert().failure();
}

use assert_cmd::cargo::cargo_bin_cmd;
use std::error::Error;

#[test]
fn plot_rejects_rate_below_filter_band() -> Result<(), Box<dyn Error>> {
    let dir = tempfile::tempdir()?;
    let png = dir.path().join("ecg.png");
    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["plot", "--fs", "60", "--out", png.to_str().expect("utf8 path")])
        .write_stdin("0.0\n1.0\n0.0\n");
    cmd.assert().failure();
    assert!(!png.exists());
    Ok(())
}

#[test]
fn plot_requires_output_path() {
    let mut cmd = cargo_bin_cmd!("ekg");
    cmd.args(["plot", "--fs", "1000"]).write_stdin("0.0\n");
    cmd.assert().failure();
}

use std::fs;
use std::process::Command;

use tempfile::tempdir;

const TANK_SIGNALS: &str = "run\tevent\tenergy\tzenith\tparticle_type\tlateral_distance\ttotal_pe\ttotal_vem\tmuon_pe\tmuon_count\ttime_delay\n";

fn write_tank_signals(path: &std::path::Path) {
    let mut data = String::from(TANK_SIGNALS);
    for run in 0..8 {
        let particle = if run % 2 == 0 { "PPlus" } else { "Fe56Nucleus" };
        let energy = 1.2e16 + run as f64 * 1.5e15;
        let zenith = 0.05 + 0.04 * run as f64;
        for event in 0..2 {
            let muon_pe = 20.0 + 5.0 * run as f64 + event as f64;
            data.push_str(&format!(
                "{run}\t{event}\t{energy}\t{zenith}\t{particle}\t450\t100\t1.1\t{muon_pe}\t{}\t{}\n",
                2 + run,
                -10.0 + event as f64
            ));
        }
    }
    fs::write(path, data).expect("write tank signals");
}

#[test]
fn prepare_then_evaluate_and_search() {
    let tmp = tempdir().expect("temporary directory");
    let signals = tmp.path().join("tank_signals.tsv");
    write_tank_signals(&signals);
    let per_event = tmp.path().join("NN_data.tsv");
    let averaged = tmp.path().join("NN_data_avg.tsv");

    let exe = env!("CARGO_BIN_EXE_showerfit");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args([
            "prepare",
            signals.to_str().expect("path str"),
            "--output",
            per_event.to_str().expect("path str"),
            "--averaged-output",
            averaged.to_str().expect("path str"),
        ])
        .output()
        .expect("run showerfit prepare");
    assert!(output.status.success(), "prepare failed: {output:?}");
    assert!(per_event.exists(), "per-event records missing");
    assert!(averaged.exists(), "averaged records missing");

    let config = tmp.path().join("experiment.toml");
    fs::write(
        &config,
        "[training]\nbatch_size = 4\nepochs = 2\n\n[search.grid]\nbatch_sizes = [4]\nepochs = [1, 2]\n",
    )
    .expect("write config");

    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args([
            "evaluate",
            "--config",
            config.to_str().expect("path str"),
            "--data",
            per_event.to_str().expect("path str"),
            "--folds",
            "4",
        ])
        .output()
        .expect("run showerfit evaluate");
    assert!(output.status.success(), "evaluate failed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let result = stdout
        .lines()
        .find(|line| line.starts_with("Results: "))
        .expect("results line");
    assert!(result.ends_with(" MSE"), "{result}");

    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args([
            "search",
            "--config",
            config.to_str().expect("path str"),
            "--data",
            per_event.to_str().expect("path str"),
            "--folds",
            "4",
            "--jobs",
            "2",
        ])
        .output()
        .expect("run showerfit search");
    assert!(output.status.success(), "search failed: {output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    let best = lines
        .iter()
        .position(|line| line.starts_with("Best: "))
        .expect("best line");
    assert_eq!(lines.len(), best + 3);
    assert!(lines[best + 1].ends_with("with: {batch_size: 4, epochs: 1}"));
    assert!(lines[best + 2].ends_with("with: {batch_size: 4, epochs: 2}"));
}

#[test]
fn missing_data_file_exits_with_error() {
    let tmp = tempdir().expect("temporary directory");
    let exe = env!("CARGO_BIN_EXE_showerfit");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args(["evaluate", "--data", "absent.tsv"])
        .output()
        .expect("run showerfit evaluate");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Error: "), "{stderr}");
}

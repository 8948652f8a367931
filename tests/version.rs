//! Integration test: Verify binary prints correct version

use std::process::Command;

#[test]
fn binary_prints_version() {
    // EXPECT: Binary runs and prints version "0.1.0" to stdout
    let output = Command::new(env!("CARGO_BIN_EXE_colfeed"))
        .arg("--version")
        .output()
        .expect("Failed to execute binary");

    let stdout = String::from_utf8_lossy(&output.stdout);

    // VERIFY: Output contains the binary name and version from Cargo.toml
    assert!(
        stdout.contains("colfeed") && stdout.contains("0.1.0"),
        "Expected output to contain 'colfeed 0.1.0', but got: {}",
        stdout
    );
}

use assert_cmd::Command;
use predicates::prelude::*;

fn tlpctl() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_tlpctl"));
    cmd.env_remove("TLPCTL_LOG").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_subcommands() {
    tlpctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("device-id"))
        .stdout(predicate::str::contains("config-read"))
        .stdout(predicate::str::contains("tlp-recv"));
}

#[test]
fn simulated_device_id() {
    tlpctl()
        .args(["--simulate", "device-id"])
        .assert()
        .success()
        .stdout("0x00000100 (requester 01:00.0)\n");
}

#[test]
fn simulated_config_read_returns_vendor_and_device() {
    tlpctl()
        .args(["--simulate", "config-read", "0"])
        .assert()
        .success()
        .stdout("0x133710ee\n");
}

#[test]
fn simulated_read_dumps_memory() {
    tlpctl()
        .args(["--simulate", "read", "0x1002", "4"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("0000000000001002: 00 00 00 00"));
}

#[test]
fn receive_with_nothing_pending_times_out() {
    tlpctl()
        .args(["--simulate", "--timeout-ms", "10", "tlp-recv"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("timed out"));
}

#[test]
fn bad_hex_is_rejected_by_the_parser() {
    tlpctl()
        .args(["--simulate", "write", "0x0", "xyz"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-hex"));
}

#[test]
fn hardware_addresses_are_required() {
    tlpctl()
        .env_remove("TLPCTL_DMA0_BASE")
        .arg("reset")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dma0-base"));
}

use embassy_time::Duration;

/// Time to let the supply settle before toggling `PWRKEY`
pub fn pwr_on_settle_time() -> Duration {
    Duration::from_millis(100)
}

/// High time of the `PWRKEY` driver to trigger module switch on from power off mode
pub fn pwr_on_time() -> Duration {
    Duration::from_millis(200)
}

/// High time of the `RESET_N` driver to trigger module reset (reboot)
pub fn reset_time() -> Duration {
    Duration::from_millis(200)
}

/// Time to wait after releasing `RESET_N` before talking to the module
pub fn reset_settle_time() -> Duration {
    Duration::from_millis(300)
}

/// Maximum time the module takes to answer `AT` after power on or reset
pub fn boot_time() -> Duration {
    Duration::from_secs(10)
}

/// Maximum time between `AT+QPOWD` and the `POWERED DOWN` report
pub fn pwr_off_time() -> Duration {
    Duration::from_secs(60)
}

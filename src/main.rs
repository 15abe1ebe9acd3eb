//! Opens the first receiver, tunes it and keeps the tuner gain mode matched
//! to the signal until Ctrl-C.
//!
//! Usage: rtl2832-tuners [FREQUENCY_HZ] [-v...]
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use log::{error, info};
use rtl2832_tuners::error::Result;
use rtl2832_tuners::tuners::gain;
use rtl2832_tuners::{RtlSdr, MODE_UPDATE_WAIT_TIME_MS};

const FREQUENCY: u32 = 100_000_000;
// RTL Device Index
const RTL_INDEX: usize = 0;

fn main() {
    let verbosity: usize = std::env::args()
        .skip(1)
        .filter(|a| a.starts_with("-v"))
        .map(|a| a.len() - 1)
        .sum();
    // Info by default, each -v adds a level
    stderrlog::new().verbosity(2 + verbosity).init().unwrap();

    let freq = std::env::args()
        .skip(1)
        .find_map(|a| a.parse::<u32>().ok())
        .unwrap_or(FREQUENCY);

    // Shutdown flag that is set true when ctrl-c signal caught
    static SHUTDOWN: AtomicBool = AtomicBool::new(false);
    ctrlc::set_handler(|| {
        SHUTDOWN.swap(true, Ordering::Relaxed);
    })
    .unwrap();

    if let Err(e) = run(freq, &SHUTDOWN) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(freq: u32, shutdown: &AtomicBool) -> Result<()> {
    let mut sdr = RtlSdr::open(RTL_INDEX)?;
    info!("Found {} tuner", sdr.tuner_name().unwrap_or("unknown"));
    info!("Supported gains: {:?}", sdr.get_tuner_gains());

    let actual = sdr.set_center_freq(freq)?;
    info!("Tuned to {} Hz (requested {} Hz)", actual, freq);
    sdr.set_tuner_auto_gain_mode(true)?;

    while !shutdown.load(Ordering::Relaxed) {
        // A failed evaluation is retried on the next pass
        if gain::mode_kept_on_failed_evaluation(sdr.update_tuner_gain_mode())? {
            info!("Gain mode now {:?}", sdr.get_tuner_gain_mode());
        }
        thread::sleep(Duration::from_millis(MODE_UPDATE_WAIT_TIME_MS));
    }

    info!("Closing device");
    sdr.close()
}

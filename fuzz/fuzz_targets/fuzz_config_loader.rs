#![no_main]
use chrono::{DateTime, Utc};
use libfuzzer_sys::fuzz_target;
use pole_core::mocks::RecordingPublisher;
use pole_core::{Pole, PoleCfg, SessionInput};

fuzz_target!(|data: &str| {
    // Parse errors and validation errors are both fine; panics are not.
    if let Ok(cfg) = pole_config::load_toml(data) {
        if cfg.validate().is_ok() {
            // A validated config must drive a pole through a disturbed tick.
            let epoch = DateTime::<Utc>::UNIX_EPOCH;
            let mut pole = Pole::new(PoleCfg::from(&cfg), RecordingPublisher::new(), epoch);
            let _ = pole.connect();
            let _ = pole.start_session(&SessionInput::default(), epoch);
            let _ = pole.inject_movement();
            let _ = pole.tick();
        }
    }
});

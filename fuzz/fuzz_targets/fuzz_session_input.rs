#![no_main]
use chrono::{DateTime, Utc};
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use pole_core::{Session, SessionDefaults, SessionInput};

#[derive(Debug, Arbitrary)]
struct Typed {
    patient_id: Option<String>,
    drug_type: Option<String>,
    volume_ml: Option<String>,
    duration_min: Option<String>,
}

fuzz_target!(|t: Typed| {
    let input = SessionInput {
        patient_id: t.patient_id,
        drug_type: t.drug_type,
        volume_ml: t.volume_ml,
        duration_min: t.duration_min,
    };
    let s = Session::create(&input, &SessionDefaults::default(), "N", DateTime::<Utc>::UNIX_EPOCH);
    // Whatever the operator typed, the session is usable.
    assert!(s.initial_volume_ml.is_finite() && s.initial_volume_ml > 0.0);
    assert!(s.prescribed_duration_min >= 1);
    assert!(s.prescribed_end_time >= s.start_time);
});

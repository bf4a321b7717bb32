use chrono::{DateTime, TimeDelta, Utc};
use pole_core::mocks::RecordingPublisher;
use pole_core::{
    CommandOutcome, Pole, PoleCfg, PoleState, Session, SessionDefaults, SessionInput,
};
use rstest::rstest;

fn t0() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + TimeDelta::days(20_000)
}

fn quiet_cfg() -> PoleCfg {
    let mut cfg = PoleCfg::default();
    cfg.simulation.seed = Some(42);
    cfg.simulation.jitter_g = 0.0;
    cfg
}

fn active_pole(cfg: PoleCfg, input: &SessionInput) -> (Pole<RecordingPublisher>, RecordingPublisher) {
    let rec = RecordingPublisher::new();
    let mut pole = Pole::new(cfg, rec.clone(), t0());
    assert_eq!(pole.connect(), CommandOutcome::Done);
    assert_eq!(pole.start_session(input, t0()), CommandOutcome::Done);
    (pole, rec)
}

#[rstest]
#[case(500.0, 240, 42, 2.1)]
#[case(1000.0, 60, 333, 16.65)]
#[case(250.0, 120, 42, 2.1)]
#[case(100.0, 1, 2000, 100.0)]
fn drip_rate_is_rounded_once(
    #[case] volume: f64,
    #[case] minutes: u32,
    #[case] gtt: u32,
    #[case] flow: f64,
) {
    let input = SessionInput::new()
        .volume_ml(volume.to_string())
        .duration_min(minutes.to_string());
    let s = Session::create(&input, &SessionDefaults::default(), "N", t0());
    assert_eq!(s.prescribed_drip_rate_gtt, gtt);
    assert!((s.flow_rate_ml_per_min() - flow).abs() < 1e-9);
    assert_eq!(s.prescribed_end_time - s.start_time, TimeDelta::minutes(i64::from(minutes)));
}

#[rstest]
#[case(Some("abc"), Some("xyz"))]
#[case(Some("-5"), Some("0"))]
#[case(Some("0"), Some("-30"))]
#[case(None, None)]
#[case(Some(""), Some(" "))]
fn malformed_input_falls_back_to_defaults(
    #[case] volume: Option<&str>,
    #[case] minutes: Option<&str>,
) {
    let input = SessionInput {
        volume_ml: volume.map(str::to_string),
        duration_min: minutes.map(str::to_string),
        ..SessionInput::default()
    };
    let s = Session::create(&input, &SessionDefaults::default(), "N", t0());
    assert_eq!(s.initial_volume_ml, 500.0);
    assert_eq!(s.prescribed_duration_min, 240);
    assert_eq!(s.prescribed_drip_rate_gtt, 42);
}

#[test]
fn one_quiet_tick_moves_weight_by_one_second_of_flow() {
    let (mut pole, _rec) = active_pole(quiet_cfg(), &SessionInput::new());
    let out = pole.tick();
    let report = out.report().expect("active session ticks");

    assert!(report.drained);
    assert_eq!(report.snapshot.previous_weight_g, 500.0);
    assert!((report.snapshot.current_weight_g - 499.965).abs() < 1e-9);
    assert!((report.snapshot.weight_change_rate_g_per_min - 2.1).abs() < 1e-9);

    let sim = pole.simulator().unwrap();
    assert_eq!(sim.previous_weight_g(), sim.current_weight_g());
}

#[test]
fn one_tick_with_jitter_stays_within_tolerance() {
    let mut cfg = quiet_cfg();
    cfg.simulation.jitter_g = 0.05;
    let (mut pole, _rec) = active_pole(cfg, &SessionInput::new());
    let snap = pole.tick().report().unwrap().snapshot.clone();
    assert_eq!(snap.previous_weight_g, 500.0);
    assert!((snap.current_weight_g - 499.965).abs() <= 0.05 + 1e-9);
}

#[test]
fn movement_then_tick_is_unstable_and_not_drained() {
    let (mut pole, _rec) = active_pole(quiet_cfg(), &SessionInput::new());
    for _ in 0..5 {
        let _ = pole.tick();
    }
    let before = pole.simulator().unwrap().current_weight_g();
    assert_eq!(pole.inject_movement(), CommandOutcome::Done);
    let noise = pole.simulator().unwrap().movement_noise_g();
    assert!((10.0..20.0).contains(&noise));

    let out = pole.tick();
    let r = out.report().unwrap();
    assert!(!r.snapshot.is_stable);
    assert!(!r.drained);
    assert_eq!(r.snapshot.current_weight_g, before);
    assert!(r.snapshot.stability_score < 50.0);
    // published reading carries the disturbance left after one decay step
    assert!((r.snapshot.weight_g - (before + noise * 0.9)).abs() < 1e-9);
}

#[test]
fn quiet_session_becomes_stable_after_min_samples() {
    let (mut pole, _rec) = active_pole(quiet_cfg(), &SessionInput::new());
    assert!(!pole.tick().report().unwrap().snapshot.is_stable);
    assert!(!pole.tick().report().unwrap().snapshot.is_stable);
    let third = pole.tick();
    let r = third.report().unwrap();
    assert!(r.snapshot.is_stable);
    assert!(r.snapshot.stability_score >= 90.0);
}

#[test]
fn end_time_projects_from_remaining_volume() {
    let (mut pole, _rec) = active_pole(quiet_cfg(), &SessionInput::new());
    let out = pole.tick();
    let snap = &out.report().unwrap().snapshot;
    let minutes = snap.minutes_remaining.unwrap();
    assert!((minutes - (449.965 / 2.1)).abs() < 1e-6);
    let end = snap.calculated_end_time.unwrap();
    let expected_ms = (minutes * 60_000.0) as i64;
    let got_ms = (end - pole.sim_now()).num_milliseconds();
    assert!((got_ms - expected_ms).abs() <= 1);
}

#[test]
fn empty_bag_stops_draining_and_clamps_remaining() {
    let input = SessionInput::new().volume_ml("60").duration_min("1");
    let (mut pole, _rec) = active_pole(quiet_cfg(), &input);
    let mut last = None;
    for _ in 0..30 {
        last = pole.tick().report().cloned();
    }
    let r = last.unwrap();
    assert!(!r.drained);
    assert_eq!(r.snapshot.remaining_pct, 0.0);
    assert!(r.snapshot.calculated_end_time.is_none());
    assert!(r.snapshot.current_weight_g <= 50.0);
}

#[test]
fn stop_discards_device_state_and_ignores_ticks() {
    let (mut pole, rec) = active_pole(quiet_cfg(), &SessionInput::new());
    let _ = pole.tick();
    assert_eq!(pole.stop_session(), CommandOutcome::Done);
    assert_eq!(pole.state(), PoleState::Stopped);
    assert!(pole.simulator().is_none());

    let published = rec.messages().len();
    assert_eq!(pole.tick().report().map(|r| r.tick), None);
    assert_eq!(rec.messages().len(), published);
}

#[test]
fn restart_after_stop_begins_fresh() {
    let (mut pole, _rec) = active_pole(quiet_cfg(), &SessionInput::new());
    for _ in 0..10 {
        let _ = pole.tick();
    }
    let _ = pole.inject_movement();
    let _ = pole.stop_session();

    let later = t0() + TimeDelta::minutes(5);
    let input = SessionInput::new().volume_ml("250").patient_id("PAT-2");
    assert_eq!(pole.start_session(&input, later), CommandOutcome::Done);
    let sim = pole.simulator().unwrap();
    assert_eq!(sim.current_weight_g(), 250.0);
    assert_eq!(sim.movement_noise_g(), 0.0);
    assert!(!pole.is_stable());
    assert_eq!(pole.session().unwrap().patient_id, "PAT-2");
    assert_eq!(pole.sim_now(), later);
}

#[test]
fn status_view_summarises_active_session() {
    let (mut pole, _rec) = active_pole(quiet_cfg(), &SessionInput::new());
    for _ in 0..3 {
        let _ = pole.tick();
    }
    let view = pole.status_view();
    assert_eq!(view.state, PoleState::Active);
    assert_eq!(view.pole_id, "POLE-301A-1");
    let s = view.session.unwrap();
    assert_eq!(s.ticks, 3);
    assert!(s.is_stable);
    assert!((s.remaining_pct - (500.0 - 3.0 * 0.035 - 50.0) / 5.0).abs() < 1e-6);
}

use chrono::{DateTime, Utc};
use pole_core::mocks::RecordingPublisher;
use pole_core::{AlertMode, Message, Pole, PoleCfg, SessionInput};
use pole_traits::Qos;

fn alerts_of(rec: &RecordingPublisher, kind: &str) -> Vec<(Message, serde_json::Value)> {
    rec.messages()
        .into_iter()
        .filter(|m| m.topic.starts_with("hospital/alert/"))
        .filter_map(|m| {
            let v = m.json().ok()?;
            (v["type"] == kind).then_some((m, v))
        })
        .collect()
}

fn run(cfg: PoleCfg, input: &SessionInput, ticks: usize) -> RecordingPublisher {
    let rec = RecordingPublisher::new();
    let mut pole = Pole::new(cfg, rec.clone(), DateTime::<Utc>::UNIX_EPOCH);
    let _ = pole.connect();
    assert!(pole.start_session(input, DateTime::<Utc>::UNIX_EPOCH).is_done());
    for _ in 0..ticks {
        let _ = pole.tick();
    }
    rec
}

fn fast_drain() -> (PoleCfg, SessionInput) {
    let mut cfg = PoleCfg::default();
    cfg.simulation.seed = Some(3);
    cfg.simulation.jitter_g = 0.0;
    // 100 mL over one minute: 100/60 g per tick, 50% remaining at start.
    let input = SessionInput::new().volume_ml("100").duration_min("1");
    (cfg, input)
}

#[test]
fn edge_mode_fires_each_low_fluid_threshold_once() {
    let (cfg, input) = fast_drain();
    let rec = run(cfg, &input, 45);
    let low = alerts_of(&rec, "LOW_FLUID");
    assert_eq!(low.len(), 2);

    let (warn_msg, warn) = &low[0];
    assert_eq!(warn["severity"], "WARNING");
    assert_eq!(warn_msg.topic, "hospital/alert/warning/POLE-301A-1");
    assert_eq!(warn_msg.qos, Qos::AtLeastOnce);
    assert!(warn["data"]["remaining"].as_f64().unwrap() < 10.0);

    let (crit_msg, crit) = &low[1];
    assert_eq!(crit["severity"], "CRITICAL");
    assert_eq!(crit_msg.topic, "hospital/alert/critical/POLE-301A-1");
    assert_eq!(crit_msg.qos, Qos::ExactlyOnce);
    assert!(crit["data"]["remaining"].as_f64().unwrap() < 5.0);
}

#[test]
fn band_mode_misses_thresholds_a_tick_steps_over() {
    let (mut cfg, input) = fast_drain();
    // remaining = 49.5 - 5n/3: ... 11.17 -> 9.5 ... 6.17 -> 4.5, skipping both bands
    cfg.simulation.empty_container_g = 50.5;

    cfg.alerts.mode = AlertMode::Band;
    let rec = run(cfg.clone(), &input, 40);
    assert!(alerts_of(&rec, "LOW_FLUID").is_empty());

    cfg.alerts.mode = AlertMode::Edge;
    let rec = run(cfg, &input, 40);
    assert_eq!(alerts_of(&rec, "LOW_FLUID").len(), 2);
}

#[test]
fn battery_low_fires_once_on_crossing_in_edge_mode() {
    let mut cfg = PoleCfg::default();
    cfg.simulation.seed = Some(4);
    cfg.simulation.status_every_ticks = 1;
    cfg.battery.initial_pct = 21.0;
    cfg.battery.drain_per_status_pct = 0.5;
    // reports: start 21.0 -> 20.5, tick1 20.5 -> 20.0, tick2 20.0 -> 19.5 (fires), tick3 ...
    let rec = run(cfg, &SessionInput::new(), 6);
    let low = alerts_of(&rec, "BATTERY_LOW");
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].1["severity"], "WARNING");
    assert_eq!(low[0].1["data"]["battery"], 19.5);
}

#[test]
fn battery_low_fires_inside_band_in_band_mode() {
    let mut cfg = PoleCfg::default();
    cfg.simulation.seed = Some(4);
    cfg.simulation.status_every_ticks = 1;
    cfg.alerts.mode = AlertMode::Band;
    cfg.battery.initial_pct = 20.5;
    cfg.battery.drain_per_status_pct = 0.25;
    // drained values: 20.25, 20.0 (band top is exclusive), 19.75 (fires), 19.5 (band bottom exclusive)
    let rec = run(cfg, &SessionInput::new(), 6);
    let low = alerts_of(&rec, "BATTERY_LOW");
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].1["data"]["battery"], 19.75);
}

#[test]
fn battery_never_drains_below_floor() {
    let mut cfg = PoleCfg::default();
    cfg.simulation.seed = Some(4);
    cfg.simulation.status_every_ticks = 1;
    cfg.battery.initial_pct = 12.0;
    cfg.battery.drain_per_status_pct = 1.0;
    let rec = RecordingPublisher::new();
    let mut pole = Pole::new(cfg, rec.clone(), DateTime::<Utc>::UNIX_EPOCH);
    let _ = pole.connect();
    let _ = pole.start_session(&SessionInput::new(), DateTime::<Utc>::UNIX_EPOCH);
    for _ in 0..10 {
        let _ = pole.tick();
    }
    assert_eq!(pole.battery_pct(), 10.0);
    let last = rec.on("/status").pop().unwrap().json().unwrap();
    assert_eq!(last["status"]["battery"], 10);
}

#[test]
fn status_cadence_is_start_then_every_thirty_ticks() {
    let mut cfg = PoleCfg::default();
    cfg.simulation.seed = Some(8);
    let rec = run(cfg, &SessionInput::new(), 61);
    let status = rec.on("/status");
    assert_eq!(status.len(), 3);
    assert!(status.iter().all(|m| m.qos == Qos::AtMostOnce));

    let first = status[0].json().unwrap();
    assert_eq!(first["status"]["battery"], 95);
    assert_eq!(first["status"]["online"], true);
    let sig = first["status"]["hardware"]["signalStrength"].as_i64().unwrap();
    assert!((-65..-45).contains(&sig));
    // 95 -> 94.9 after the first report
    assert_eq!(status[1].json().unwrap()["status"]["battery"], 94);

    let ts = |m: &Message| m.json().unwrap()["timestamp"].as_str().unwrap().to_string();
    assert_eq!(ts(&status[1]), "1970-01-01T00:00:30Z");
    assert_eq!(ts(&status[2]), "1970-01-01T00:01:00Z");
}

#[test]
fn flow_abnormal_fires_at_configured_probability() {
    let mut cfg = PoleCfg::default();
    cfg.simulation.seed = Some(2);
    cfg.alerts.flow_abnormal_probability = 1.0;
    let rec = run(cfg.clone(), &SessionInput::new(), 5);
    let flow = alerts_of(&rec, "FLOW_ABNORMAL");
    assert_eq!(flow.len(), 5);
    assert!(flow.iter().all(|(m, _)| m.qos == Qos::AtLeastOnce));

    cfg.alerts.flow_abnormal_probability = 0.0;
    let rec = run(cfg, &SessionInput::new(), 50);
    assert!(alerts_of(&rec, "FLOW_ABNORMAL").is_empty());
}

#[test]
fn telemetry_is_published_every_tick_with_wire_keys() {
    let mut cfg = PoleCfg::default();
    cfg.simulation.seed = Some(1);
    let rec = run(cfg, &SessionInput::new(), 3);
    let tel = rec.on("/telemetry");
    assert_eq!(tel.len(), 3);
    assert!(tel.iter().all(|m| m.qos == Qos::AtLeastOnce));

    let v = tel[0].json().unwrap();
    assert_eq!(v["poleId"], "POLE-301A-1");
    assert_eq!(v["timestamp"], "1970-01-01T00:00:01Z");
    for key in [
        "weight",
        "previousWeight",
        "weightChangeRate",
        "isStable",
        "stability",
        "flowRate",
        "remaining",
        "dripRate",
        "calculatedEndTime",
    ] {
        assert!(v["telemetry"].get(key).is_some(), "missing telemetry.{key}");
    }
    assert!(v["telemetry"].get("currentWeightG").is_none());
    assert_eq!(v["session"]["prescribedDripRateGtt"], 42);
    assert_eq!(v["session"]["gttFactor"], 20);
}

//! End-to-end feature extraction over a synthetic 48 000-sample, 16 kHz
//! mono int16 waveform.

use sfe::TransformTree;

const SAMPLES: usize = 48000;
const RATE: u32 = 16000;

/// A few mixed tones plus a weak ramp, so spectra are non-trivial and no
/// buffer ends up all zero.
fn waveform() -> Vec<i16> {
    (0..SAMPLES)
        .map(|i| {
            let t = i as f32 / RATE as f32;
            let tones = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 8000.0
                + (2.0 * std::f32::consts::PI * 1320.0 * t).sin() * 4000.0
                + (2.0 * std::f32::consts::PI * 97.0 * t).sin() * 2000.0;
            (tones + (i % 17) as f32) as i16
        })
        .collect()
}

#[test]
fn scenario_energy_statistics() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = TransformTree::new(SAMPLES, RATE).unwrap();
    engine
        .add_feature_from_text(
            "Energy[Window(type=rectangular,length=512,step=205),Energy,Merge,Stats]",
        )
        .unwrap();
    engine.prepare_for_execution().unwrap();
    let results = engine.execute(&waveform()).unwrap();

    let energy = &results["Energy"];
    assert_eq!(energy.count(), 1);
    let stats = energy.values(0);
    assert_eq!(stats.len(), 4);
    let (mean, stddev) = (stats[0], stats[1]);
    assert!(mean > 0.0, "mean energy {mean}");
    assert!(stddev >= 0.0);
    assert!(stats.iter().all(|v| v.is_finite()));
}

#[test]
fn scenario_shared_prefix_runs_once() {
    let mut engine = TransformTree::new(SAMPLES, RATE).unwrap();
    for recipe in [
        "Centroid[Window(length=512,step=205),RDFT,ComplexMagnitude,Centroid]",
        "Rolloff[Window(length=512,step=205),RDFT,ComplexMagnitude,Rolloff]",
        "Flux[Window(length=512,step=205),RDFT,ComplexMagnitude,Flux]",
    ] {
        engine.add_feature_from_text(recipe).unwrap();
    }
    engine.prepare_for_execution().unwrap();
    let results = engine.execute(&waveform()).unwrap();
    assert_eq!(results.len(), 3);

    let counts = engine.invocation_counts();
    assert_eq!(counts["Window"], 1);
    assert_eq!(counts["RDFT"], 1);
    assert_eq!(counts["ComplexMagnitude"], 1);
    assert_eq!(counts["Centroid"], 1);
    assert_eq!(counts["Rolloff"], 1);
    assert_eq!(counts["Flux"], 1);

    // Centroid and rolloff are frequencies inside the band.
    let windows = (SAMPLES - 512) / 205 + 1;
    for name in ["Centroid", "Rolloff"] {
        let feature = &results[name];
        assert_eq!(feature.count(), windows);
        for i in 0..feature.count() {
            let hz = feature.values(i)[0];
            assert!((0.0..=RATE as f32 / 2.0).contains(&hz), "{name}: {hz}");
        }
    }
}

#[test]
fn scenario_mfcc_is_finite() {
    let mut engine = TransformTree::new(SAMPLES, RATE).unwrap();
    engine
        .add_feature_from_text(
            "MFCC[Preemphasis(value=0.9),Window(length=512,step=205),RDFT,SpectralEnergy,\
             FilterBank(number=40,squared=true),Log,DCT,Selector(length=16,from=left),\
             STMSN(length=25)]",
        )
        .unwrap();
    engine.prepare_for_execution().unwrap();
    let results = engine.execute(&waveform()).unwrap();

    let mfcc = &results["MFCC"];
    let windows = (SAMPLES - 512) / 205 + 1;
    assert_eq!(mfcc.count(), windows);
    for i in 0..mfcc.count() {
        let vector = mfcc.values(i);
        assert_eq!(vector.len(), 16);
        assert!(vector.iter().all(|v| v.is_finite()), "window {i}: {vector:?}");
    }
}

#[test]
fn scenario_inverse_idempotence() {
    let mut engine = TransformTree::new(SAMPLES, RATE).unwrap();
    engine
        .add_feature_from_text("Ref[Window(length=500,type=rectangular,step=205)]")
        .unwrap();
    engine
        .add_feature_from_text(
            "RT[Window(length=500,type=rectangular,step=205),RDFT,IRDFT,RDFT,IRDFT,RDFT,IRDFT]",
        )
        .unwrap();
    engine.prepare_for_execution().unwrap();
    let results = engine.execute(&waveform()).unwrap();

    let reference = &results["Ref"];
    let round_trip = &results["RT"];
    assert_eq!(reference.count(), round_trip.count());
    for i in 0..reference.count() {
        for (a, b) in reference.values(i).iter().zip(round_trip.values(i)) {
            let tolerance = 1e-4 * a.abs().max(1.0);
            assert!((a - b).abs() <= tolerance, "buffer {i}: {a} vs {b}");
        }
    }
}

#[test]
fn scenario_in_place_chain_bounds_the_arena() {
    // 8192 float samples are 32 kB; ten uniform in-place transforms behind
    // the int16 -> float converter must alias onto one storage, so the
    // backing block stays within the waveform copy plus one float edge.
    let samples = 8192;
    let mut engine = TransformTree::new(samples, RATE).unwrap();
    let mut recipe = String::from("Chain[");
    for i in 0..5 {
        recipe.push_str("Square,");
        recipe.push_str(&format!("Log(scale={})", i + 1));
        recipe.push(',');
    }
    recipe.pop();
    recipe.push(']');
    engine.add_feature_from_text(&recipe).unwrap();
    engine.prepare_for_execution().unwrap();

    let arena_len = engine.arena_len();
    let float_edge = 8192 * 4;
    let int16_edge = 8192 * 2;
    assert!(
        arena_len <= 2 * float_edge,
        "arena {arena_len} exceeds twice the 32 kB edge"
    );
    assert_eq!(arena_len, int16_edge + float_edge);

    let waveform: Vec<i16> = (0..samples).map(|i| (i % 100) as i16 + 1).collect();
    let results = engine.execute(&waveform).unwrap();
    assert_eq!(results["Chain"].count(), 1);
}

#[test]
fn scenario_invalid_filter_bank_parameter() {
    let mut engine = TransformTree::new(SAMPLES, RATE).unwrap();
    let err = engine
        .add_feature_from_text(
            "Bad[Window(length=512,step=205),RDFT,SpectralEnergy,FilterBank(number=-1)]",
        )
        .unwrap_err();
    match err {
        sfe::SfeError::InvalidValue { class, name, value } => {
            assert_eq!(class, "FilterBank");
            assert_eq!(name, "number");
            assert_eq!(value, "-1");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!engine.is_frozen());
    assert!(engine.features().is_empty());
}

#[test]
fn execute_is_idempotent() {
    let mut engine = TransformTree::new(SAMPLES, RATE).unwrap();
    engine
        .add_feature_from_text(
            "MFCC[Window(length=512,step=205),RDFT,SpectralEnergy,FilterBank(number=40),\
             Log,DCT,Selector(length=16)]",
        )
        .unwrap();
    engine
        .add_feature_from_text("ZCR[Window(length=512,step=205,type=rectangular),ZeroCrossings]")
        .unwrap();
    engine.prepare_for_execution().unwrap();

    let input = waveform();
    let first = engine.execute(&input).unwrap();
    let second = engine.execute(&input).unwrap();
    for (name, buffers) in &first {
        let again = &second[name];
        assert_eq!(buffers.count(), again.count());
        for i in 0..buffers.count() {
            assert_eq!(buffers.values(i), again.values(i), "{name} buffer {i}");
        }
    }
}

#[test]
fn delta_regression_matches_simple_on_a_ramp() {
    // The regression delta is experimental; on a linearly growing series
    // both variants must agree away from the edges.
    let samples = 8192;
    let ramp: Vec<i16> = (0..samples).map(|i| (i / 4) as i16).collect();
    let mut engine = TransformTree::new(samples, RATE).unwrap();
    engine
        .add_feature_from_text(
            "Reg[Window(length=512,step=512,type=rectangular),Energy,\
             Delta(type=regression,rlength=3)]",
        )
        .unwrap();
    engine
        .add_feature_from_text(
            "Simple[Window(length=512,step=512,type=rectangular),Energy,Delta(type=simple)]",
        )
        .unwrap();
    engine.prepare_for_execution().unwrap();
    let results = engine.execute(&ramp).unwrap();

    let regression = &results["Reg"];
    let simple = &results["Simple"];
    assert_eq!(regression.count(), simple.count());
    // With rlength=3 the regression delta is the centered difference; on a
    // smoothly growing series both estimators track the same slope on
    // interior windows.
    for i in 2..regression.count() - 2 {
        let r = regression.values(i)[0];
        let s = simple.values(i)[0];
        let scale = s.abs().max(1.0);
        assert!(
            (r - s).abs() / scale < 0.35,
            "window {i}: regression {r} vs simple {s}"
        );
    }
}

//! Engine-level behavior: converter insertion, format compatibility and
//! lifecycle errors through the public API.

use sfe::{Registry, SfeError, TransformTree};

fn waveform(samples: usize) -> Vec<i16> {
    (0..samples).map(|i| ((i * 37) % 2311) as i16 - 1000).collect()
}

#[test]
fn converters_are_inserted_automatically() {
    let _ = env_logger::builder().is_test(true).try_init();
    // Energy consumes floats; the int16 waveform needs a converter first.
    let mut engine = TransformTree::new(4096, 16000).unwrap();
    engine.add_feature_from_text("E[Energy]").unwrap();
    // Root -> converter -> Energy.
    assert_eq!(engine.node_count(), 2);
    engine.prepare_for_execution().unwrap();
    let results = engine.execute(&waveform(4096)).unwrap();
    let energy = &results["E"];
    assert_eq!(energy.count(), 1);
    assert!(energy.values(0)[0] > 0.0);
}

#[test]
fn missing_converter_is_an_incompatible_format() {
    let mut engine = TransformTree::new(4096, 16000).unwrap();
    // WindowMerge consumes float arrays and no complex -> real converter
    // is registered.
    let err = engine
        .add_feature_from_text("M[Window(length=512),RDFT,WindowMerge]")
        .unwrap_err();
    match &err {
        SfeError::IncompatibleFormat { from, to } => {
            assert_eq!(from, "ArrayComplexFloat");
            assert_eq!(to, "ArrayRealFloat");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(engine.features().is_empty());
}

#[test]
fn single_outputs_bridge_into_merge() {
    let mut engine = TransformTree::new(4096, 16000).unwrap();
    engine
        .add_feature_from_text(
            "ZCR[Window(type=rectangular,length=256,step=128),ZeroCrossings,Merge]",
        )
        .unwrap();
    engine.prepare_for_execution().unwrap();
    let results = engine.execute(&waveform(4096)).unwrap();
    let merged = &results["ZCR"];
    let windows = (4096 - 256) / 128 + 1;
    assert_eq!(merged.count(), 1);
    assert_eq!(merged.values(0).len(), windows);
}

#[test]
fn registry_exposes_a_stable_class_set() {
    let before = Registry::global().classes();
    let mut engine = TransformTree::new(4096, 16000).unwrap();
    engine
        .add_feature_from_text("A[Window(length=512),RDFT,SpectralEnergy]")
        .unwrap();
    engine.prepare_for_execution().unwrap();
    engine.execute(&waveform(4096)).unwrap();
    assert_eq!(Registry::global().classes(), before);
}

#[test]
fn validation_passes_on_healthy_data() {
    let mut engine = TransformTree::with_config(
        4096,
        16000,
        sfe::EngineConfig {
            validate_output: true,
            ..Default::default()
        },
    )
    .unwrap();
    engine
        .add_feature_from_text(
            "MFCC[Window(length=512,step=205),RDFT,SpectralEnergy,FilterBank(number=20),Log,DCT,\
             Selector(length=12)]",
        )
        .unwrap();
    engine.prepare_for_execution().unwrap();
    let results = engine.execute(&waveform(4096)).unwrap();
    assert_eq!(results.len(), 1);
}

#[test]
fn sliced_execution_matches_unsliced() {
    let input = waveform(16384);
    let recipe = "F[Window(length=512,step=205,type=rectangular),Square,Log(add1=true)]";

    let mut plain = TransformTree::new(16384, 16000).unwrap();
    plain.add_feature_from_text(recipe).unwrap();
    plain.prepare_for_execution().unwrap();
    let expected = plain.execute(&input).unwrap();

    let mut budgeted = TransformTree::with_config(
        16384,
        16000,
        sfe::EngineConfig {
            // Far below the ~150 kB window edge, forcing sliced invocations.
            memory_budget: Some(16 * 1024),
            ..Default::default()
        },
    )
    .unwrap();
    budgeted.add_feature_from_text(recipe).unwrap();
    budgeted.prepare_for_execution().unwrap();
    let sliced = budgeted.execute(&input).unwrap();

    let a = &expected["F"];
    let b = &sliced["F"];
    assert_eq!(a.count(), b.count());
    for i in 0..a.count() {
        assert_eq!(a.values(i), b.values(i), "buffer {i}");
    }
}

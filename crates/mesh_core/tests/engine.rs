//! End-to-end behaviour of the mesh engine on a manual clock

use mesh_core::{
    AttributeNames, DisplayChange, EvalError, Gesture, InputEvent, ManualClock, Mesh, MeshBuilder,
    MeshConfig, MemoryStore, MouseEvent, PersistenceAdapter, SourceSpec, TargetId, TargetSpec,
    TouchEvent, TouchPhase, FALLBACK_DISPLAY,
};
use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

fn start(source: &str, y: f64) -> Gesture {
    Gesture::Start {
        source: source.to_string(),
        y,
    }
}

fn builder(clock: &ManualClock) -> MeshBuilder {
    Mesh::builder().clock(Arc::new(clock.clone()))
}

fn targets(mesh: &Mesh) -> Vec<String> {
    mesh.target_displays().map(str::to_string).collect()
}

#[test]
fn test_bananas_scene() {
    let clock = ManualClock::new();
    let mut mesh = builder(&clock)
        .source(SourceSpec::new("bananas", "6").positive())
        .source(SourceSpec::new("others", "2").positive())
        .target(TargetSpec::new("@bananas / (@others + 1)").text("2"))
        .build()
        .unwrap();

    clock.advance(ms(50));
    mesh.tick();
    assert_eq!(targets(&mesh), vec!["2"]);

    // Drag "others" up by 10px: one more person to share with
    mesh.handle(start("others", 300.0)).unwrap();
    mesh.handle(Gesture::Move { y: 290.0 }).unwrap();
    mesh.handle(Gesture::End).unwrap();
    assert_eq!(mesh.source_display("others"), Some("3"));

    clock.advance(ms(50));
    mesh.tick();
    assert_eq!(targets(&mesh), vec!["1.5"]);
}

#[test]
fn test_render_waits_for_quiet_period() {
    let clock = ManualClock::new();
    let mut mesh = builder(&clock)
        .source(SourceSpec::new("a", "0"))
        .target(TargetSpec::new("@a").text("0"))
        .build()
        .unwrap();
    clock.advance(ms(50));
    mesh.tick();

    mesh.handle(start("a", 500.0)).unwrap();
    for step in 1..=10 {
        mesh.handle(Gesture::Move {
            y: 500.0 - 10.0 * step as f64,
        })
        .unwrap();
        clock.advance(ms(20));
        assert!(!mesh.tick().rendered, "rendered mid-drag at step {step}");
    }
    assert_eq!(targets(&mesh), vec!["0"]);

    clock.advance(ms(30));
    assert!(mesh.tick().rendered);
    assert_eq!(targets(&mesh), vec!["10"]);
}

#[test]
fn test_saves_are_debounced_per_source() {
    let clock = ManualClock::new();
    let store = MemoryStore::new();
    let mut mesh = builder(&clock)
        .persistence(store.clone())
        .source(SourceSpec::new("a", "1"))
        .source(SourceSpec::new("b", "1"))
        .build()
        .unwrap();

    clock.advance(ms(300));
    assert_eq!(mesh.tick().saved, 2);

    mesh.handle(start("a", 100.0)).unwrap();
    mesh.handle(Gesture::Move { y: 90.0 }).unwrap();
    mesh.handle(Gesture::End).unwrap();
    clock.advance(ms(200));

    mesh.handle(start("b", 100.0)).unwrap();
    mesh.handle(Gesture::Move { y: 80.0 }).unwrap();
    mesh.handle(Gesture::End).unwrap();

    // "b" moving does not push back the save of "a"
    clock.advance(ms(100));
    assert_eq!(mesh.tick().saved, 1);
    assert_eq!(store.get("data-mesh-a").as_deref(), Some("2"));
    assert_eq!(store.get("data-mesh-b").as_deref(), Some("1"));

    clock.advance(ms(200));
    assert_eq!(mesh.tick().saved, 1);
    assert_eq!(store.get("data-mesh-b").as_deref(), Some("3"));
}

#[test]
fn test_persisted_values_are_restored_and_reclamped() {
    let clock = ManualClock::new();
    let store = MemoryStore::with_entries([
        ("data-mesh-kept", "7"),
        ("data-mesh-stale", "500"),
        ("data-mesh-junk", "not a number"),
    ]);
    let mesh = builder(&clock)
        .persistence(store)
        .source(SourceSpec::new("kept", "1"))
        .source(SourceSpec::new("stale", "1").max(20.0))
        .source(SourceSpec::new("junk", "4"))
        .build()
        .unwrap();

    assert_eq!(mesh.value("kept"), Some(7.0));
    assert_eq!(mesh.value("stale"), Some(20.0));
    assert_eq!(mesh.source_display("stale"), Some("20"));
    assert_eq!(mesh.value("junk"), Some(4.0));
}

#[test]
fn test_persistence_ignored_when_save_disabled() {
    let clock = ManualClock::new();
    let store = MemoryStore::with_entries([("data-mesh-a", "9")]);
    let mut mesh = builder(&clock)
        .config(MeshConfig {
            save: Some(false),
            ..MeshConfig::default()
        })
        .persistence(store.clone())
        .source(SourceSpec::new("a", "1"))
        .build()
        .unwrap();

    assert_eq!(mesh.value("a"), Some(1.0));
    clock.advance(ms(1000));
    assert_eq!(mesh.tick().saved, 0);
    assert_eq!(store.get("data-mesh-a").as_deref(), Some("9"));
}

#[test]
fn test_custom_prefix_keys_storage() {
    let clock = ManualClock::new();
    let store = MemoryStore::with_entries([("data-x-a", "5")]);
    let mut mesh = builder(&clock)
        .config(MeshConfig {
            prefix: "data-x-".to_string(),
            ..MeshConfig::default()
        })
        .persistence(store.clone())
        .source(SourceSpec::new("a", "1"))
        .build()
        .unwrap();

    assert_eq!(mesh.value("a"), Some(5.0));
    assert_eq!(mesh.attribute_names(), &AttributeNames::new("data-x-"));
    mesh.commit("a", 6.0).unwrap();
    mesh.flush();
    assert_eq!(store.get("data-x-a").as_deref(), Some("6"));
}

#[test]
fn test_reset_restores_markup_value() {
    let clock = ManualClock::new();
    let store = MemoryStore::with_entries([("data-mesh-a", "15")]);
    let mut mesh = builder(&clock)
        .persistence(store.clone())
        .source(SourceSpec::new("a", "4"))
        .build()
        .unwrap();
    assert_eq!(mesh.value("a"), Some(15.0));

    mesh.handle(start("a", 100.0)).unwrap();
    mesh.handle(Gesture::Move { y: 50.0 }).unwrap();
    mesh.handle(Gesture::End).unwrap();
    assert_eq!(mesh.value("a"), Some(20.0));

    mesh.handle_input(&InputEvent::DoubleClick {
        source: "a".to_string(),
    })
    .unwrap();
    assert_eq!(mesh.value("a"), Some(4.0));
    assert_eq!(mesh.source_display("a"), Some("4"));

    mesh.flush();
    assert_eq!(store.get("data-mesh-a").as_deref(), Some("4"));
}

#[test]
fn test_malformed_target_does_not_block_others() {
    let clock = ManualClock::new();
    let mut mesh = builder(&clock)
        .source(SourceSpec::new("a", "3"))
        .target(TargetSpec::new("@a * 2"))
        .target(TargetSpec::new("@a * (2"))
        .target(TargetSpec::new("@a / 0"))
        .target(TargetSpec::new("@missing + 1"))
        .target(TargetSpec::new("@a + 1").currency())
        .build()
        .unwrap();

    clock.advance(ms(50));
    mesh.tick();
    assert_eq!(
        targets(&mesh),
        vec![
            "6",
            FALLBACK_DISPLAY,
            FALLBACK_DISPLAY,
            FALLBACK_DISPLAY,
            "4.00"
        ]
    );
    let ids: Vec<TargetId> = mesh.target_ids().collect();
    assert!(mesh.target_error(ids[0]).is_none());
    assert!(matches!(
        mesh.target_error(ids[1]),
        Some(EvalError::Syntax { .. })
    ));
    assert_eq!(mesh.target_error(ids[2]), Some(&EvalError::NonFinite));
    assert_eq!(
        mesh.target_error(ids[3]),
        Some(&EvalError::UnknownVariable("missing".to_string()))
    );
}

#[test]
fn test_drag_indicator_and_concurrent_drags() {
    let clock = ManualClock::new();
    let changes = Arc::new(Mutex::new(Vec::new()));
    let sink = changes.clone();
    let mut mesh = builder(&clock)
        .observer(move |change| {
            if let DisplayChange::DragActive(active) = change {
                sink.lock().unwrap().push(*active);
            }
        })
        .source(SourceSpec::new("a", "0"))
        .source(SourceSpec::new("b", "0"))
        .build()
        .unwrap();

    assert!(mesh.begin_drag("a", 100.0).unwrap());
    assert!(mesh.begin_drag("b", 50.0).unwrap());
    assert!(!mesh.begin_drag("a", 0.0).unwrap());

    // One move drives every active session from its own anchor
    mesh.drag_to(40.0);
    assert_eq!(mesh.value("a"), Some(6.0));
    assert_eq!(mesh.value("b"), Some(1.0));

    mesh.end_drag();
    mesh.end_drag();
    assert_eq!(*changes.lock().unwrap(), vec![true, false]);
}

#[test]
fn test_decimal_source_and_drag_speed() {
    let clock = ManualClock::new();
    let mut mesh = builder(&clock)
        .config(MeshConfig {
            drag_speed: 2.0,
            ..MeshConfig::default()
        })
        .source(SourceSpec::new("rate", "1.5").decimal())
        .build()
        .unwrap();

    mesh.handle(start("rate", 100.0)).unwrap();
    mesh.handle(Gesture::Move { y: 97.0 }).unwrap();
    assert_eq!(mesh.value("rate"), Some(2.1));
    mesh.handle(Gesture::Move { y: 103.0 }).unwrap();
    assert_eq!(mesh.value("rate"), Some(0.9));
}

#[test]
fn test_touch_mode_maps_touch_events() {
    let clock = ManualClock::new();
    let mut mesh = builder(&clock)
        .touch_capable(true)
        .source(SourceSpec::new("a", "10"))
        .build()
        .unwrap();

    let mouse = InputEvent::Mouse(MouseEvent::ButtonPressed {
        source: Some("a".to_string()),
        y: 100.0,
    });
    assert!(!mesh.handle_input(&mouse).unwrap());
    assert!(!mesh.is_dragging("a"));

    let touch = |phase, source: Option<&str>, y| {
        InputEvent::Touch(TouchEvent::single(phase, source.map(str::to_string), y))
    };
    assert!(mesh
        .handle_input(&touch(TouchPhase::Started, Some("a"), 100.0))
        .unwrap());
    mesh.handle_input(&touch(TouchPhase::Moved, None, 120.0))
        .unwrap();
    mesh.handle_input(&touch(TouchPhase::Ended, None, 120.0))
        .unwrap();

    assert_eq!(mesh.value("a"), Some(8.0));
    assert!(!mesh.is_drag_active());
}

proptest! {
    #[test]
    fn prop_drags_never_escape_bounds(
        min in -50.0f64..0.0,
        span in 0.0f64..100.0,
        start_y in -500.0f64..500.0,
        moves in prop::collection::vec(-2000.0f64..2000.0, 1..20),
        decimal in any::<bool>(),
    ) {
        let clock = ManualClock::new();
        let mut spec = SourceSpec::new("a", "0").min(min).max(min + span);
        if decimal {
            spec = spec.decimal();
        }
        let mut mesh = builder(&clock).source(spec).build().unwrap();

        mesh.begin_drag("a", start_y).unwrap();
        for y in moves {
            mesh.drag_to(y);
            let value = mesh.value("a").unwrap();
            prop_assert!(min <= value && value <= min + span, "{value} escaped [{min}, {}]", min + span);
        }
    }
}

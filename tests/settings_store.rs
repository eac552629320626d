//! Store round trip: persisted settings feed the engine, and synced
//! change batches propagate live into every controller.

use serde_json::json;

use wmx::registry::{Engine, EngineOptions};
use wmx::sim::SimHost;
use wmx::store::{load_settings, persist_settings, MemoryStore};
use wmx::{Rect, Settings, SettingsPatch};

fn patch(pairs: serde_json::Value) -> SettingsPatch {
    match pairs {
        serde_json::Value::Object(map) => map,
        _ => unreachable!("patch fixtures are objects"),
    }
}

#[test]
fn persisted_settings_boot_the_engine() {
    let mut store = MemoryStore::new();
    let mut authored = Settings::default();
    authored.apply_patch(&patch(json!({
        "text": "© example",
        "mode": "random-pop",
        "fontSize": 24,
    })));
    persist_settings(&mut store, &authored).expect("persist");

    let mut host = SimHost::new();
    let video = host.add_video(Rect::new(0.0, 0.0, 500.0, 300.0));
    let mut engine = Engine::new(host, load_settings(&store), EngineOptions { seed: Some(1) });
    engine.start();

    let overlay = engine.host().overlay_for_video(video).expect("overlay");
    let content = engine.host().mark_content(overlay).expect("content");
    let text = content.text.as_ref().expect("text child");
    assert_eq!(text.text, "© example");
    assert_eq!(text.font_size, 24.0);
}

#[test]
fn change_batches_reach_every_live_controller() {
    let mut store = MemoryStore::new();
    persist_settings(&mut store, &Settings::default()).expect("seed store");
    store.take_changes();

    let mut host = SimHost::new();
    let first = host.add_video(Rect::new(0.0, 0.0, 500.0, 300.0));
    let second = host.add_video(Rect::new(0.0, 400.0, 640.0, 360.0));
    let mut engine = Engine::new(host, load_settings(&store), EngineOptions { seed: Some(1) });
    engine.start();

    // The options surface writes an update; the synced feed delivers the
    // changed keys only.
    let mut updated = load_settings(&store);
    updated.apply_patch(&patch(json!({ "text": "lower third", "opacity": 0.25 })));
    persist_settings(&mut store, &updated).expect("persist update");

    for batch in store.take_changes() {
        assert!(batch.contains_key("text"));
        assert!(!batch.contains_key("mode")); // unchanged keys excluded
        engine.on_settings_patch(&batch);
    }

    for video in [first, second] {
        let overlay = engine.host().overlay_for_video(video).expect("overlay");
        let content = engine.host().mark_content(overlay).expect("content");
        let text = content.text.as_ref().expect("text child");
        assert_eq!(text.text, "lower third");
        assert_eq!(text.opacity, 0.25);
    }
}

#[test]
fn malformed_feed_values_degrade_to_defaults() {
    let mut host = SimHost::new();
    let video = host.add_video(Rect::new(0.0, 0.0, 500.0, 300.0));
    let mut engine = Engine::new(host, Settings::default(), EngineOptions { seed: Some(1) });
    engine.start();

    engine.on_settings_patch(&patch(json!({
        "fontSize": "not-a-number",
        "opacity": 4.5,
    })));

    let overlay = engine.host().overlay_for_video(video).expect("overlay");
    let content = engine.host().mark_content(overlay).expect("content");
    let text = content.text.as_ref().expect("text child");
    assert_eq!(text.font_size, 18.0); // default
    assert_eq!(text.opacity, 1.0); // clamped to range
}

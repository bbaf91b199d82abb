//! Engine configs saved to and loaded from disk

use std::path::PathBuf;

use kestrel_engine::config::ConfigError;
use kestrel_engine::prelude::*;

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("kestrel-{}-{}", std::process::id(), name))
}

#[test]
fn saved_configs_load_back() {
    let config = EngineConfig::new()
        .with_log_level("debug")
        .with_max_frames(42)
        .with_fixed_timestep(0.02)
        .with_scene(
            SceneConfig::default()
                .with_min_free_indices(16)
                .with_message_bus(32, OverflowPolicy::DropOldest)
                .with_cull_strategy(CullStrategy::BalancedTree),
        );

    for name in ["engine.toml", "engine.ron"] {
        let path = scratch_path(name);
        config.save_to_file(&path).unwrap();
        let loaded = EngineConfig::load_from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, config, "{}", name);
    }
}

#[test]
fn invalid_files_are_rejected() {
    let path = scratch_path("bad-margin.toml");
    std::fs::write(&path, "[scene.culling]\ntree_margin = -1.0\n").unwrap();
    let result = EngineConfig::load_from_file(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(matches!(
        result,
        Err(ConfigError::Invalid {
            field: "scene.culling.tree_margin",
            ..
        })
    ));

    let missing = EngineConfig::load_from_file(scratch_path("missing.ron"));
    assert!(matches!(missing, Err(ConfigError::Io(_))));

    let unsupported = EngineConfig::load_from_file(scratch_path("engine.json"));
    assert!(matches!(unsupported, Err(ConfigError::UnsupportedFormat(_))));
}

#[test]
fn engine_refuses_invalid_config() {
    let config = EngineConfig::new().with_scene(SceneConfig::default().with_message_bus(0, OverflowPolicy::RejectNew));
    let result = Engine::new(config, Box::new(CommandRecorder::new()));
    assert!(matches!(result, Err(EngineError::Config(ConfigError::Invalid { .. }))));
}

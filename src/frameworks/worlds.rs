// Loads the configured worlds from `<dir>/<world_id>.json`.

use crate::domain::{Registries, World};
use crate::interface_adapters::world_json::{WorldDecodeError, decode_world};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorldLoadError {
    #[error("no worlds configured")]
    NoWorlds,
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("world `{world_id}` is invalid: {source}")]
    Decode {
        world_id: String,
        source: WorldDecodeError,
    },
}

pub async fn load_worlds(
    dir: &Path,
    world_ids: &[String],
    registries: &Registries,
) -> Result<Vec<World>, WorldLoadError> {
    if world_ids.is_empty() {
        return Err(WorldLoadError::NoWorlds);
    }

    let mut worlds = Vec::with_capacity(world_ids.len());
    for world_id in world_ids {
        let path = dir.join(format!("{world_id}.json"));
        let json = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| WorldLoadError::Read {
                path: path.clone(),
                source,
            })?;
        let world =
            decode_world(world_id, &json, registries).map_err(|source| WorldLoadError::Decode {
                world_id: world_id.clone(),
                source,
            })?;
        tracing::debug!(
            world_id = %world_id,
            entities = world.entities.len(),
            spawn_points = world.spawn_points().len(),
            "world loaded"
        );
        worlds.push(world);
    }
    Ok(worlds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registries() -> Registries {
        Registries::standard().expect("registries")
    }

    fn bundled_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("worlds")
    }

    #[tokio::test]
    async fn when_bundled_worlds_are_loaded_then_both_have_spawns() {
        let ids = vec!["starting_world".to_string(), "second_world".to_string()];
        let worlds = load_worlds(&bundled_dir(), &ids, &registries())
            .await
            .expect("bundled worlds load");

        assert_eq!(worlds.len(), 2);
        assert!(worlds[0].spawn_point("center_spawn").is_ok());
        assert!(worlds[1].spawn_point("west").is_ok());
    }

    #[tokio::test]
    async fn when_world_file_is_missing_then_the_path_is_reported() {
        let ids = vec!["nowhere".to_string()];
        let err = load_worlds(&bundled_dir(), &ids, &registries())
            .await
            .expect_err("missing file");
        assert!(matches!(err, WorldLoadError::Read { ref path, .. } if path.ends_with("nowhere.json")));
    }

    #[tokio::test]
    async fn when_no_world_is_configured_then_loading_fails() {
        let err = load_worlds(&bundled_dir(), &[], &registries())
            .await
            .expect_err("empty list");
        assert!(matches!(err, WorldLoadError::NoWorlds));
    }
}

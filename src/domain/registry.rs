// Bidirectional string-id <-> kind tables used for (de)serialization.
//
// The tables are filled once by `Registries::standard` at startup and are read-only
// afterwards, so they are shared behind an `Arc` without locking.

use crate::domain::entity::EntityKind;
use crate::domain::errors::RegistryError;
use crate::domain::tile::TileKind;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct Registry<K> {
    category: &'static str,
    by_id: HashMap<String, K>,
    by_kind: HashMap<K, String>,
}

impl<K> Registry<K>
where
    K: Copy + Eq + Hash + Debug,
{
    pub fn new(category: &'static str) -> Self {
        Self {
            category,
            by_id: HashMap::new(),
            by_kind: HashMap::new(),
        }
    }

    /// Binds `id` to `kind`. Rebinding an id (or a kind) is a configuration error.
    pub fn register(&mut self, id: impl Into<String>, kind: K) -> Result<(), RegistryError> {
        let id = id.into();
        if self.by_id.contains_key(&id) || self.by_kind.contains_key(&kind) {
            return Err(RegistryError::DuplicateId {
                category: self.category,
                id,
            });
        }
        self.by_kind.insert(kind, id.clone());
        self.by_id.insert(id, kind);
        Ok(())
    }

    pub fn lookup_by_id(&self, id: &str) -> Result<K, RegistryError> {
        self.by_id
            .get(id)
            .copied()
            .ok_or_else(|| RegistryError::UnknownId {
                category: self.category,
                id: id.to_string(),
            })
    }

    /// Reverse lookup used when serializing a value back to its wire id.
    pub fn lookup_id(&self, kind: K) -> Result<&str, RegistryError> {
        self.by_kind
            .get(&kind)
            .map(String::as_str)
            .ok_or_else(|| RegistryError::UnregisteredClass {
                category: self.category,
                kind: format!("{kind:?}"),
            })
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Every id table the server needs.
#[derive(Debug, Clone)]
pub struct Registries {
    pub tiles: Registry<TileKind>,
    pub entities: Registry<EntityKind>,
}

impl Registries {
    /// Builds the tables for all built-in tiles and entities.
    pub fn standard() -> Result<Self, RegistryError> {
        let mut tiles = Registry::new("tile");
        tiles.register("empty", TileKind::Empty)?;
        tiles.register("grass", TileKind::Grass)?;
        tiles.register("wild_grass", TileKind::WildGrass)?;
        tiles.register("wall", TileKind::Wall)?;
        tiles.register("portal", TileKind::Portal)?;
        tiles.register("sign", TileKind::Sign)?;

        let mut entities = Registry::new("entity");
        entities.register("walker", EntityKind::Walker)?;
        entities.register("guide", EntityKind::Guide)?;

        Ok(Self { tiles, entities })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_standard_tables_are_built_then_every_kind_is_reachable_both_ways() {
        let registries = Registries::standard().expect("standard registries");
        assert_eq!(registries.tiles.len(), 6);
        assert_eq!(registries.entities.len(), 2);
        assert_eq!(
            registries.tiles.lookup_by_id("portal"),
            Ok(TileKind::Portal)
        );
        assert_eq!(registries.tiles.lookup_id(TileKind::WildGrass), Ok("wild_grass"));
        assert_eq!(registries.entities.lookup_id(EntityKind::Guide), Ok("guide"));
    }

    #[test]
    fn when_id_is_registered_twice_then_returns_duplicate_id() {
        let mut tiles = Registry::new("tile");
        tiles.register("grass", TileKind::Grass).expect("first bind");
        let result = tiles.register("grass", TileKind::Wall);
        assert!(matches!(
            result,
            Err(RegistryError::DuplicateId { ref id, .. }) if id == "grass"
        ));
    }

    #[test]
    fn when_id_is_unknown_then_returns_unknown_id() {
        let registries = Registries::standard().expect("standard registries");
        assert!(matches!(
            registries.tiles.lookup_by_id("lava"),
            Err(RegistryError::UnknownId { .. })
        ));
    }

    #[test]
    fn when_kind_was_never_bound_then_returns_unregistered_class() {
        let tiles: Registry<TileKind> = Registry::new("tile");
        assert!(matches!(
            tiles.lookup_id(TileKind::Sign),
            Err(RegistryError::UnregisteredClass { .. })
        ));
    }
}

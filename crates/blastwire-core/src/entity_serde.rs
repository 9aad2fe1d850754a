//! Serde adapters for `hecs::Entity`, stored as its raw bits.
//!
//! Entities are restored with `World::spawn_at`, so bits stay valid
//! across a save/load cycle.

use hecs::Entity;
use serde::{de::Error, Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(entity: &Entity, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(entity.to_bits().get())
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Entity, D::Error> {
    let bits = u64::deserialize(deserializer)?;
    Entity::from_bits(bits).ok_or_else(|| D::Error::custom(format!("invalid entity bits {bits}")))
}

#[cfg(test)]
mod tests {
    use hecs::{Entity, World};
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        entity: Entity,
    }

    #[test]
    fn test_entity_bits_survive() {
        let mut world = World::new();
        world.spawn(());
        let e = world.spawn(());
        let bytes = bincode::serialize(&Wrapper { entity: e }).unwrap();
        let back: Wrapper = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.entity, e);
    }
}

use indexmap::IndexMap;

use crate::alias::NO_ALIAS;

/// Readable object name to number of placements, in first-seen order.
pub type ItemTally = IndexMap<String, usize>;

/// Local position inside an island, in game units.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Shift every axis by the same amount.
    pub fn offset(self, by: f32) -> Self {
        Self {
            x: self.x + by,
            y: self.y + by,
            z: self.z + by,
        }
    }
}

/// World offset of a terrain node. The game only stores the horizontal axes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Origin {
    pub x: f32,
    pub z: f32,
}

/// One island the player can be moved to. Rebuilt on every scan.
#[derive(Debug, Clone, PartialEq)]
pub struct IslandCandidate {
    /// Node identifier cut down to start at the biome tag. Key for aliases.
    pub name: String,
    /// Identifier as written in the save.
    pub raw_id: String,
    pub alias: String,
    pub is_home: bool,
    pub origin: Origin,
    /// Spawn position, spawn offset already applied.
    pub reference: Position,
    pub items: ItemTally,
}

impl IslandCandidate {
    /// Name to show: the user's alias if one was set.
    pub fn label(&self) -> &str {
        if self.has_alias() {
            &self.alias
        } else {
            &self.name
        }
    }

    pub fn has_alias(&self) -> bool {
        self.alias != NO_ALIAS
    }

    pub fn item_count(&self) -> usize {
        self.items.values().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(alias: &str) -> IslandCandidate {
        IslandCandidate {
            name: "ISLAND_7".into(),
            raw_id: "NODE_3_ISLAND_7".into(),
            alias: alias.into(),
            is_home: true,
            origin: Origin::default(),
            reference: Position::default(),
            items: ItemTally::from([("FIRE".to_string(), 1), ("PALM TREE".to_string(), 4)]),
        }
    }

    #[test]
    fn test_label_prefers_alias() {
        assert_eq!(candidate(NO_ALIAS).label(), "ISLAND_7");
        assert_eq!(candidate("Home Base").label(), "Home Base");
    }

    #[test]
    fn test_item_count() {
        assert_eq!(candidate(NO_ALIAS).item_count(), 5);
    }

    #[test]
    fn test_offset() {
        let p = Position::new(1.0, 2.0, 3.0).offset(0.5);
        assert_eq!(p, Position::new(1.5, 2.5, 3.5));
    }
}

//! Home island discovery.
//!
//! Walks `Persistent.TerrainGeneration.Nodes` in document order and keeps
//! every generated island that carries a home marker object.

mod island;

use tracing::{debug, warn};

use crate::alias::AliasStore;
use crate::document::{NodeRef, PathError, SaveDocument};

pub use island::{IslandCandidate, ItemTally, Origin, Position};

pub const NODES_PATH: [&str; 3] = ["Persistent", "TerrainGeneration", "Nodes"];

/// Biome tag of island nodes. Node identifiers contain it too.
pub const BIOME_ISLAND: &str = "ISLAND";

/// Appended by the engine to instantiated objects, sometimes followed by an
/// instance number.
pub const CLONE_SUFFIX: &str = "(Clone)";

pub const FIRE: &str = "FIRE";

/// Crab homes double as safe spawn points and as home markers in `All` mode.
pub const CRAB_HOME: &str = "CRAB_HOME";

/// Which objects make an island a home.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomePolicy {
    /// Only a campfire counts.
    #[default]
    Fire,
    /// Any designated home marker (campfire or crab home) counts.
    AnyDesignatedHome,
}

impl HomePolicy {
    pub fn is_home_marker(self, base_name: &str) -> bool {
        match self {
            HomePolicy::Fire => base_name == FIRE,
            HomePolicy::AnyDesignatedHome => base_name == FIRE || base_name == CRAB_HOME,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IndexOptions {
    pub policy: HomePolicy,
    /// Added to every axis of the spawn position.
    pub spawn_offset: f32,
}

/// Object name without the instantiation suffix.
pub fn base_name(name: &str) -> &str {
    name.split_once(CLONE_SUFFIX).map_or(name, |(base, _)| base)
}

/// Object name as shown in item tallies, e.g. `PALM_TREE(Clone)` becomes `PALM TREE`.
pub fn readable_name(name: &str) -> String {
    base_name(name).replace('_', " ")
}

/// Identifier cut to start at the biome tag; unchanged if the tag is absent.
pub fn display_name(raw_id: &str) -> &str {
    raw_id.find(BIOME_ISLAND).map_or(raw_id, |at| &raw_id[at..])
}

/// Build the ordered list of home islands.
///
/// Nodes with unexpected shapes are skipped, only a missing node list is an
/// error. The document is never modified.
pub fn index(
    doc: &SaveDocument,
    options: &IndexOptions,
    aliases: &dyn AliasStore,
) -> Result<Vec<IslandCandidate>, PathError> {
    let nodes = doc.root().at(&NODES_PATH)?;

    let mut candidates = Vec::new();
    for (key, node) in nodes.children() {
        if let Some(candidate) = index_node(key, node, options, aliases) {
            debug!(
                island = %candidate.name,
                items = candidate.item_count(),
                "home_island_found"
            );
            candidates.push(candidate);
        }
    }
    Ok(candidates)
}

fn index_node(
    key: Option<&str>,
    node: NodeRef<'_>,
    options: &IndexOptions,
    aliases: &dyn AliasStore,
) -> Option<IslandCandidate> {
    if node.str_at(&["biome"]).ok()? != BIOME_ISLAND {
        return None;
    }
    if !node.bool_at(&["fullyGenerated"]).unwrap_or(false) {
        return None;
    }

    let raw_id = match node.str_at(&["name"]).ok().or(key) {
        Some(id) => id.to_string(),
        None => {
            debug!("island_without_identifier");
            return None;
        }
    };

    let objects = node.get("Objects")?.children();
    if objects.is_empty() {
        return None;
    }

    let mut items = ItemTally::new();
    let mut is_home = false;
    let mut home_position = None;
    let mut secondary_position = None;

    for (_, object) in objects {
        let Ok(name) = object.str_at(&["name"]) else {
            debug!(island = %raw_id, "object_without_name");
            continue;
        };
        let base = base_name(name);

        if base == CRAB_HOME {
            // The last crab home in document order wins.
            match object_position(object) {
                Ok(position) => secondary_position = Some(position),
                Err(e) => debug!(island = %raw_id, error = %e, "crab_home_without_position"),
            }
        }

        if options.policy.is_home_marker(base) {
            is_home = true;
            if home_position.is_none() {
                home_position = object_position(object).ok();
            }
        }

        *items.entry(readable_name(name)).or_insert(0) += 1;
    }

    if !is_home {
        return None;
    }

    let Some(reference) = secondary_position.or(home_position) else {
        warn!(island = %raw_id, "home_island_without_usable_position");
        return None;
    };

    let origin = match (
        node.float_at(&["positionOffset", "x"]),
        node.float_at(&["positionOffset", "z"]),
    ) {
        (Ok(x), Ok(z)) => Origin { x, z },
        (Err(e), _) | (_, Err(e)) => {
            warn!(island = %raw_id, error = %e, "home_island_without_origin");
            return None;
        }
    };

    let name = display_name(&raw_id).to_string();
    let alias = aliases.get(&name, crate::alias::NO_ALIAS);

    Some(IslandCandidate {
        name,
        raw_id,
        alias,
        is_home,
        origin,
        reference: reference.offset(options.spawn_offset),
        items,
    })
}

fn object_position(object: NodeRef<'_>) -> Result<Position, PathError> {
    Ok(Position {
        x: object.float_at(&["Transform", "localPosition", "x"])?,
        y: object.float_at(&["Transform", "localPosition", "y"])?,
        z: object.float_at(&["Transform", "localPosition", "z"])?,
    })
}

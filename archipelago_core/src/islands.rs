//! Flood-fill segmentation of the known map into islands.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{
    Position,
    agent::AgentState,
    world::{Cell, WorldModel},
};

/// Index of an island inside one [`IslandMap`]. Ids are only meaningful
/// for the segmentation pass that produced them.
pub type IslandId = usize;

/// Inventory of one connected landmass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Island {
    pub id: IslandId,
    /// The cell the flood fill started from.
    pub seed: Position,
    pub has_gold: bool,
    pub has_tree: bool,
    pub has_axe: bool,
    pub has_key: bool,
    /// The start cell lies on this island.
    pub is_home: bool,
    pub stones: u32,
    /// A single water cell standing in for the agent's position at sea.
    /// It is never a crossing destination.
    pub is_water: bool,
}

impl Island {
    fn new(id: IslandId, seed: Position, is_water: bool) -> Self {
        Island {
            id,
            seed,
            has_gold: false,
            has_tree: false,
            has_axe: false,
            has_key: false,
            is_home: false,
            stones: 0,
            is_water,
        }
    }

    fn absorb(&mut self, cell: Cell, is_start: bool) {
        self.is_home |= is_start;
        match cell {
            Cell::Gold => self.has_gold = true,
            Cell::Tree => self.has_tree = true,
            Cell::Axe => self.has_axe = true,
            Cell::Key => self.has_key = true,
            Cell::Stone => self.stones += 1,
            _ => {}
        }
    }
}

/// Labelled islands from one segmentation pass.
///
/// The island at index 0 always contains the agent's own cell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IslandMap {
    islands: Vec<Island>,
    labels: HashMap<Position, IslandId>,
}

impl IslandMap {
    /// Segments the known world as seen by `agent`.
    ///
    /// The agent's cell seeds the first island. Further seeds are found by
    /// scanning outwards over known cells for an unlabelled landmass cell
    /// that touches water, so landmasses that never meet water are left
    /// out.
    pub fn segment(world: &WorldModel, agent: &AgentState) -> Self {
        let mut map = IslandMap::default();
        let mut next_seed = Some(agent.position);
        while let Some(seed) = next_seed {
            map.fill(seed, world, agent);
            next_seed = map.find_seed(world, agent);
        }
        tracing::debug!(islands = map.islands.len(), "segmented known map");
        map
    }

    fn fill(&mut self, seed: Position, world: &WorldModel, agent: &AgentState) {
        let id = self.islands.len();
        let mut island = Island::new(id, seed, world.cell(seed) == Cell::Water);
        self.labels.insert(seed, id);

        if !island.is_water {
            let mut queue = VecDeque::from([seed]);
            while let Some(current) = queue.pop_front() {
                island.absorb(world.cell(current), current == world.start());
                for neighbor in current.neighbors() {
                    if self.labels.contains_key(&neighbor)
                        || !world.is_island_passable(neighbor, agent)
                    {
                        continue;
                    }
                    self.labels.insert(neighbor, id);
                    queue.push_back(neighbor);
                }
            }
        }
        self.islands.push(island);
    }

    fn find_seed(&self, world: &WorldModel, agent: &AgentState) -> Option<Position> {
        let mut seen = HashSet::from([agent.position]);
        let mut queue = VecDeque::from([agent.position]);
        while let Some(current) = queue.pop_front() {
            for neighbor in current.neighbors() {
                if world.is_island_passable(neighbor, agent)
                    && !self.labels.contains_key(&neighbor)
                    && world.is_adjacent_to(neighbor, Cell::Water)
                {
                    return Some(neighbor);
                }
                if world.is_known(neighbor) && seen.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        None
    }

    pub fn islands(&self) -> &[Island] {
        &self.islands
    }

    pub fn len(&self) -> usize {
        self.islands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    pub fn get(&self, id: IslandId) -> Option<&Island> {
        self.islands.get(id)
    }

    /// The island the agent stood on when the map was built.
    pub fn home(&self) -> Option<&Island> {
        self.islands.first()
    }

    pub fn island_of(&self, position: Position) -> Option<IslandId> {
        self.labels.get(&position).copied()
    }

    /// Two cells share an island, or are both unlabelled.
    pub fn same_island(&self, a: Position, b: Position) -> bool {
        self.island_of(a) == self.island_of(b)
    }

    /// Cells of an island in a stable order.
    pub fn cells_of(&self, id: IslandId) -> Vec<Position> {
        let mut cells: Vec<Position> = self
            .labels
            .iter()
            .filter(|(_, label)| **label == id)
            .map(|(position, _)| *position)
            .collect();
        cells.sort();
        cells
    }

    /// Cells of an island that touch water and can start or end a crossing.
    pub fn ports(&self, id: IslandId, world: &WorldModel) -> Vec<Position> {
        self.cells_of(id)
            .into_iter()
            .filter(|cell| world.is_adjacent_to(*cell, Cell::Water))
            .collect()
    }
}

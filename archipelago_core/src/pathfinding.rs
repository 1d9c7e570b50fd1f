//! Searches over the believed map.
//!
//! Moving forward costs one action and so does every turn, so the planner
//! works on `(cell, heading)` states rather than bare cells.

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet, VecDeque},
};

use serde::{Deserialize, Serialize};

use crate::{
    Action, Heading, Position, RelativeDirection,
    agent::AgentState,
    islands::{IslandId, IslandMap},
    world::{Cell, WorldModel},
};

/// Which cells a single-target search may step through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    Land,
    Water,
}

/// The next action towards a target and the full cost of the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    pub action: Action,
    /// Actions needed to enter the target from the current pose.
    pub cost: u32,
    /// The first cell the route moves into.
    pub next: Position,
}

/// Manhattan distance plus the turns needed before the first useful step.
///
/// A target behind the heading needs two turns, one off to either side
/// needs one. The estimate never exceeds the true action count.
pub fn oriented_distance(target: Position, from: Position, heading: Heading) -> u32 {
    let dx = target.x - from.x;
    let dy = target.y - from.y;
    let (fx, fy) = heading.offset();
    let along = dx * fx + dy * fy;
    let across = dx * fy - dy * fx;
    let turns = if along < 0 {
        2
    } else if across != 0 {
        1
    } else {
        0
    };
    target.manhattan_distance(from) + turns
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct State {
    position: Position,
    heading: Heading,
}

// For priority queue
#[derive(Clone, Eq, PartialEq)]
struct PrioritizedItem {
    priority: u32,
    cost: u32,
    state: State,
}

impl Ord for PrioritizedItem {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behavior, deeper nodes first on ties
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| self.cost.cmp(&other.cost))
    }
}

impl PartialOrd for PrioritizedItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Step and turn cost of each move relative to the current heading.
/// Reversing only makes sense from the start: anywhere else the cell
/// behind is the one just left.
const MOVES: [(RelativeDirection, u32); 4] = [
    (RelativeDirection::Ahead, 1),
    (RelativeDirection::Right, 2),
    (RelativeDirection::Left, 2),
    (RelativeDirection::Behind, 3),
];

fn turn(heading: Heading, direction: RelativeDirection) -> Heading {
    match direction {
        RelativeDirection::Ahead => heading,
        RelativeDirection::Right => heading.turned_right(),
        RelativeDirection::Left => heading.turned_left(),
        RelativeDirection::Behind => heading.reversed(),
    }
}

/// A* search from the agent's pose to `target`.
///
/// On land the route uses travel-passable cells, relaxed to
/// island-passable cells when heading home or to the sighted gold. On
/// water it uses water cells only. The target itself is always allowed.
/// Returns `None` when the target cannot be reached.
pub fn find_path(
    world: &WorldModel,
    agent: &AgentState,
    target: Position,
    domain: Domain,
) -> Option<PathStep> {
    let start = State {
        position: agent.position,
        heading: agent.heading,
    };
    if start.position == target {
        return None;
    }

    let relaxed = target == world.start() || agent.seen_gold == Some(target);
    let admissible = |position: Position| -> bool {
        if position == target {
            return true;
        }
        match domain {
            Domain::Water => world.cell(position) == Cell::Water,
            Domain::Land if relaxed => world.is_island_passable(position, agent),
            Domain::Land => world.is_travel_passable(position, agent),
        }
    };

    let mut frontier = BinaryHeap::new();
    let mut came_from: HashMap<State, State> = HashMap::new();
    let mut cost_so_far: HashMap<State, u32> = HashMap::new();

    frontier.push(PrioritizedItem {
        priority: oriented_distance(target, start.position, start.heading),
        cost: 0,
        state: start,
    });
    cost_so_far.insert(start, 0);

    while let Some(PrioritizedItem {
        cost,
        state: current,
        ..
    }) = frontier.pop()
    {
        if cost_so_far.get(&current).is_some_and(|best| cost > *best) {
            continue;
        }
        if current.position == target {
            return first_step(&came_from, start, current, cost);
        }

        for (direction, extra) in MOVES {
            if direction == RelativeDirection::Behind && current != start {
                continue;
            }
            let heading = turn(current.heading, direction);
            let position = current.position.step(heading);
            if !admissible(position) {
                continue;
            }
            let next = State { position, heading };
            let new_cost = cost + extra;
            if cost_so_far
                .get(&next)
                .is_none_or(|best| new_cost < *best)
            {
                cost_so_far.insert(next, new_cost);
                came_from.insert(next, current);
                frontier.push(PrioritizedItem {
                    priority: new_cost + oriented_distance(target, position, heading),
                    cost: new_cost,
                    state: next,
                });
            }
        }
    }
    None
}

/// Walks predecessors back to the first hop and turns it into an action.
fn first_step(
    came_from: &HashMap<State, State>,
    start: State,
    reached: State,
    cost: u32,
) -> Option<PathStep> {
    let mut hop = reached;
    loop {
        let previous = *came_from.get(&hop)?;
        if previous == start {
            break;
        }
        hop = previous;
    }
    let action = match start.heading.relative(hop.heading) {
        RelativeDirection::Ahead => Action::Forward,
        RelativeDirection::Right | RelativeDirection::Behind => Action::TurnRight,
        RelativeDirection::Left => Action::TurnLeft,
    };
    Some(PathStep {
        action,
        cost,
        next: hop.position,
    })
}

/// A class of cells for [`find_nearest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchTarget {
    /// An unknown cell next to reachable land.
    Unexplored,
    /// An unvisited water cell next to an unknown cell. The search walks
    /// over water instead of land.
    UnseenWater,
    /// Unvisited land on the shore or against a wall, to finish mapping an
    /// island's outline.
    Perimeter,
    /// Any cell of this kind.
    Kind(Cell),
    /// A cell of this kind that stands between the agent and unknown
    /// space: one of its neighbours (water for water blockers, land
    /// otherwise) touches an unknown cell.
    Blocking(Cell),
}

impl SearchTarget {
    fn matches(self, world: &WorldModel, agent: &AgentState, position: Position) -> bool {
        let cell = world.cell(position);
        match self {
            SearchTarget::Unexplored => cell == Cell::Unknown,
            SearchTarget::UnseenWater => {
                cell == Cell::Water
                    && !world.is_visited(position)
                    && world.is_adjacent_to(position, Cell::Unknown)
            }
            SearchTarget::Perimeter => {
                world.is_travel_passable(position, agent)
                    && !world.is_visited(position)
                    && world.any_neighbor(position, |_, neighbor| {
                        matches!(neighbor, Cell::Boundary | Cell::Water)
                    })
            }
            SearchTarget::Kind(kind) => cell == kind,
            SearchTarget::Blocking(kind) => {
                cell == kind
                    && world.any_neighbor(position, |neighbor, neighbor_cell| {
                        let continues = if kind == Cell::Water {
                            neighbor_cell == Cell::Water
                        } else {
                            world.is_island_passable(neighbor, agent)
                        };
                        continues && world.is_adjacent_to(neighbor, Cell::Unknown)
                    })
            }
        }
    }
}

/// Radial search for the closest cell matching `target`.
///
/// The whole reachable region is expanded and the candidate with the
/// smallest [`oriented_distance`] wins; breadth-first order alone does not
/// rank diagonal candidates correctly.
pub fn find_nearest(
    world: &WorldModel,
    agent: &AgentState,
    target: SearchTarget,
) -> Option<Position> {
    let over_water = target == SearchTarget::UnseenWater;
    let mut seen = HashSet::from([agent.position]);
    let mut queue = VecDeque::from([agent.position]);
    let mut best: Option<(u32, Position)> = None;

    while let Some(current) = queue.pop_front() {
        for neighbor in current.neighbors() {
            if !seen.insert(neighbor) {
                continue;
            }
            if target.matches(world, agent, neighbor) {
                let distance = oriented_distance(neighbor, agent.position, agent.heading);
                if best.is_none_or(|(closest, _)| distance < closest) {
                    best = Some((distance, neighbor));
                }
            }
            let expandable = if over_water {
                world.cell(neighbor) == Cell::Water
            } else {
                world.is_travel_passable(neighbor, agent)
            };
            if expandable {
                queue.push_back(neighbor);
            }
        }
    }
    best.map(|(_, position)| position)
}

/// Cells the agent can walk to, including the impassable cells it could
/// step onto last (stones, water, trees to cut).
pub fn land_reach(world: &WorldModel, agent: &AgentState) -> HashSet<Position> {
    let mut reach = HashSet::from([agent.position]);
    let mut queue = VecDeque::from([agent.position]);
    while let Some(current) = queue.pop_front() {
        for neighbor in current.neighbors() {
            if reach.contains(&neighbor) {
                continue;
            }
            if world.is_travel_passable(neighbor, agent) {
                reach.insert(neighbor);
                queue.push_back(neighbor);
            } else if !matches!(world.cell(neighbor), Cell::Unknown | Cell::Boundary) {
                reach.insert(neighbor);
            }
        }
    }
    reach
}

pub fn is_reachable(world: &WorldModel, agent: &AgentState, target: Position) -> bool {
    land_reach(world, agent).contains(&target)
}

/// The cheapest water route between one of the `sources` and an island.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRoute {
    /// The source the route leaves from.
    pub home_port: Position,
    /// The first cell of the target island the route reaches.
    pub island_port: Position,
    /// Water cells crossed, one stone each.
    pub stones: u32,
}

/// Breadth-first search over water from all `sources` at once to any cell
/// of `target`.
///
/// The destination is a class of cells, so there is no useful heuristic;
/// the first island cell reached is on a route with the fewest water
/// cells.
pub fn find_nearest_port(
    world: &WorldModel,
    islands: &IslandMap,
    sources: &[Position],
    target: IslandId,
) -> Option<PortRoute> {
    let mut origin: HashMap<Position, (Position, u32)> = HashMap::new();
    let mut queue = VecDeque::new();
    for source in sources {
        if !origin.contains_key(source) {
            origin.insert(*source, (*source, 0));
            queue.push_back(*source);
        }
    }

    while let Some(current) = queue.pop_front() {
        let Some(&(home_port, crossed)) = origin.get(&current) else {
            continue;
        };
        for neighbor in current.neighbors() {
            if origin.contains_key(&neighbor) {
                continue;
            }
            if islands.island_of(neighbor) == Some(target) {
                return Some(PortRoute {
                    home_port,
                    island_port: neighbor,
                    stones: crossed,
                });
            }
            if world.cell(neighbor) == Cell::Water {
                origin.insert(neighbor, (home_port, crossed + 1));
                queue.push_back(neighbor);
            }
        }
    }
    None
}

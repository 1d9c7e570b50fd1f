//! Choosing the next island to visit and tracking the crossing to it.

use serde::{Deserialize, Serialize};

use crate::{
    Position,
    agent::AgentState,
    islands::{Island, IslandId, IslandMap},
    pathfinding::{find_nearest_port, land_reach},
    world::WorldModel,
};

/// A committed water route to another island.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Island id in the segmentation the route was planned on.
    pub target: IslandId,
    /// Where the crossing leaves from: a port of the current island, or the
    /// agent's own cell when already afloat.
    pub home_port: Position,
    /// The first cell of the target island.
    pub island_port: Position,
    pub stones_required: u32,
    pub raft_required: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossingStage {
    Idle,
    Gathering,
    Crossing,
}

/// Progress of an island hop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossingPlan {
    /// Nothing planned; the next idle turn segments the map again.
    #[default]
    Idle,
    /// Collecting stones or a raft, then walking to the home port.
    Gathering(Route),
    /// On the water, heading for the island port.
    Crossing(Route),
}

impl CrossingPlan {
    pub fn stage(&self) -> CrossingStage {
        match self {
            CrossingPlan::Idle => CrossingStage::Idle,
            CrossingPlan::Gathering(_) => CrossingStage::Gathering,
            CrossingPlan::Crossing(_) => CrossingStage::Crossing,
        }
    }

    pub fn route(&self) -> Option<&Route> {
        match self {
            CrossingPlan::Idle => None,
            CrossingPlan::Gathering(route) | CrossingPlan::Crossing(route) => Some(route),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, CrossingPlan::Idle)
    }

    /// Leaves the home port. Only a gathering plan changes.
    pub fn embark(self) -> Self {
        match self {
            CrossingPlan::Gathering(route) => CrossingPlan::Crossing(route),
            other => other,
        }
    }
}

/// The rule that picked a route, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionRule {
    ReturnGold,
    GoldWithReturn,
    ToolWithReturn,
    StonePositive,
    AnyWithReturn,
    GoldByRaft,
    ToolByRaft,
    AnyByRaft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub route: Route,
    pub rule: SelectionRule,
}

/// Picks the island to visit next, or `None` if no island can be reached
/// with the resources at hand.
///
/// The rules are tried in order and the first that yields a route wins:
/// bring the gold home, then islands that can be left again (holding gold,
/// then a missing tool, then the best stone surplus, then anything), then
/// one-way raft trips in the same order of interest.
pub fn select_next_island(
    world: &WorldModel,
    agent: &AgentState,
    islands: &IslandMap,
) -> Option<Selection> {
    let planner = CrossingPlanner::new(world, agent, islands);
    let selection = planner.select();
    match &selection {
        Some(Selection { route, rule }) => tracing::info!(
            ?rule,
            island = route.target,
            stones = route.stones_required,
            raft = route.raft_required,
            "selected next island"
        ),
        None => tracing::debug!(islands = islands.len(), "no island reachable"),
    }
    selection
}

struct CrossingPlanner<'a> {
    world: &'a WorldModel,
    agent: &'a AgentState,
    islands: &'a IslandMap,
    sources: Vec<Position>,
    stone_budget: u32,
    raft_available: bool,
}

impl<'a> CrossingPlanner<'a> {
    fn new(world: &'a WorldModel, agent: &'a AgentState, islands: &'a IslandMap) -> Self {
        let home = islands.home();
        let stone_budget = home.map_or(0, |island| island.stones) + agent.stones;
        let raft_available =
            agent.has_raft || (agent.has_axe && home.is_some_and(|island| island.has_tree));
        let sources = if agent.on_raft {
            vec![agent.position]
        } else {
            let reach = land_reach(world, agent);
            islands
                .ports(0, world)
                .into_iter()
                .filter(|port| reach.contains(port))
                .collect()
        };
        CrossingPlanner {
            world,
            agent,
            islands,
            sources,
            stone_budget,
            raft_available,
        }
    }

    fn select(&self) -> Option<Selection> {
        let with = |rule: SelectionRule| move |route: Route| Selection { route, rule };

        if self.agent.has_gold {
            let home = self.first(
                |island| island.is_home,
                |island| self.raft_route(island).or_else(|| self.stone_route(island)),
            );
            if let Some(route) = home {
                return Some(with(SelectionRule::ReturnGold)(route));
            }
        }

        self.first(|island| island.has_gold, |island| self.return_route(island))
            .map(with(SelectionRule::GoldWithReturn))
            .or_else(|| {
                self.first(|island| self.wants_tool(island), |island| self.return_route(island))
                    .map(with(SelectionRule::ToolWithReturn))
            })
            .or_else(|| self.stone_positive().map(with(SelectionRule::StonePositive)))
            .or_else(|| {
                self.first(|_| true, |island| self.return_route(island))
                    .map(with(SelectionRule::AnyWithReturn))
            })
            .or_else(|| {
                self.first(|island| island.has_gold, |island| self.raft_route(island))
                    .map(with(SelectionRule::GoldByRaft))
            })
            .or_else(|| {
                self.first(|island| self.wants_tool(island), |island| self.raft_route(island))
                    .map(with(SelectionRule::ToolByRaft))
            })
            .or_else(|| {
                self.first(|_| true, |island| self.raft_route(island))
                    .map(with(SelectionRule::AnyByRaft))
            })
    }

    /// Islands that may be chosen: never the agent's own, never a water
    /// placeholder.
    fn candidates(&self) -> impl Iterator<Item = &'a Island> + 'a {
        self.islands
            .islands()
            .iter()
            .skip(1)
            .filter(|island| !island.is_water)
    }

    fn first(
        &self,
        wanted: impl Fn(&Island) -> bool,
        route: impl Fn(&Island) -> Option<Route>,
    ) -> Option<Route> {
        self.candidates()
            .filter(|island| wanted(*island))
            .find_map(|island| route(island))
    }

    fn wants_tool(&self, island: &Island) -> bool {
        (island.has_axe && !self.agent.has_axe) || (island.has_key && !self.agent.has_key)
    }

    /// A crossing paid for in stones, if the stockpile covers it.
    fn stone_route(&self, island: &Island) -> Option<Route> {
        let port = find_nearest_port(self.world, self.islands, &self.sources, island.id)?;
        (port.stones <= self.stone_budget).then_some(Route {
            target: island.id,
            home_port: port.home_port,
            island_port: port.island_port,
            stones_required: port.stones,
            raft_required: false,
        })
    }

    fn raft_route(&self, island: &Island) -> Option<Route> {
        if !self.raft_available {
            return None;
        }
        let port = find_nearest_port(self.world, self.islands, &self.sources, island.id)?;
        Some(Route {
            target: island.id,
            home_port: port.home_port,
            island_port: port.island_port,
            stones_required: 0,
            raft_required: true,
        })
    }

    /// A route that leaves a way back: stones to spare, or a raft trip to an
    /// island with a tree for the next raft.
    fn return_route(&self, island: &Island) -> Option<Route> {
        self.stone_route(island).or_else(|| {
            if island.has_tree {
                self.raft_route(island)
            } else {
                None
            }
        })
    }

    /// The stone-funded hop with the largest non-negative stone surplus.
    fn stone_positive(&self) -> Option<Route> {
        let mut best: Option<(u32, Route)> = None;
        for island in self.candidates().filter(|island| island.stones > 0) {
            let Some(route) = self.stone_route(island) else {
                continue;
            };
            let Some(surplus) = island.stones.checked_sub(route.stones_required) else {
                continue;
            };
            if best.is_none_or(|(most, _)| surplus > most) {
                best = Some((surplus, route));
            }
        }
        best.map(|(_, route)| route)
    }
}

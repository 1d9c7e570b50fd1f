use serde::{Deserialize, Serialize};

use crate::{
    Action, EngineError, Heading, Position,
    crossing::{CrossingPlan, Route, select_next_island},
    islands::IslandMap,
    pathfinding::{Domain, SearchTarget, find_nearest, find_path, is_reachable},
    world::{Cell, Observation, WorldModel},
};

/// Trait defining the behavior of an agent.
/// Agents decide which action to take from one turn's observation.
pub trait Agent {
    /// Determines the action for this turn.
    /// `&mut self` allows the agent to keep its map and plans between turns.
    fn act(&mut self, observation: &Observation) -> Result<Action, EngineError>;
}

/// What the agent knows about itself: pose, inventory and item sightings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Position,
    pub heading: Heading,
    pub has_axe: bool,
    pub has_key: bool,
    pub has_raft: bool,
    pub has_gold: bool,
    pub stones: u32,
    /// Afloat on the raft. The raft is lost on reaching land again.
    pub on_raft: bool,
    pub seen_gold: Option<Position>,
    pub seen_axe: Option<Position>,
    pub seen_key: Option<Position>,
}

impl AgentState {
    pub fn new(position: Position, heading: Heading) -> Self {
        AgentState {
            position,
            heading,
            has_axe: false,
            has_key: false,
            has_raft: false,
            has_gold: false,
            stones: 0,
            on_raft: false,
            seen_gold: None,
            seen_axe: None,
            seen_key: None,
        }
    }

    /// The cell the agent is facing.
    pub fn ahead(&self) -> Position {
        self.position.step(self.heading)
    }

    /// Updates the state for an action about to be sent, given the
    /// observed cell in front of the agent.
    ///
    /// Cutting and unlocking with the wrong tool or target is a planning
    /// bug and is reported as a [`EngineError::PreconditionViolation`].
    pub fn apply(&mut self, action: Action, ahead: Option<Cell>) -> Result<(), EngineError> {
        let ahead = ahead.unwrap_or(Cell::Empty);
        match action {
            Action::TurnLeft => self.heading = self.heading.turned_left(),
            Action::TurnRight => self.heading = self.heading.turned_right(),
            Action::Forward => self.step_forward(ahead),
            Action::Cut => {
                if !self.has_axe || ahead != Cell::Tree {
                    return Err(EngineError::PreconditionViolation {
                        action,
                        reason: "cutting needs an axe and a tree ahead",
                    });
                }
                self.has_raft = true;
            }
            Action::Unlock => {
                if !self.has_key || ahead != Cell::Door {
                    return Err(EngineError::PreconditionViolation {
                        action,
                        reason: "unlocking needs a key and a door ahead",
                    });
                }
            }
        }
        Ok(())
    }

    fn step_forward(&mut self, ahead: Cell) {
        if matches!(ahead, Cell::Boundary | Cell::Tree | Cell::Door) {
            return;
        }
        self.position = self.ahead();
        match ahead {
            Cell::Gold => self.has_gold = true,
            Cell::Axe => self.has_axe = true,
            Cell::Key => self.has_key = true,
            Cell::Stone => self.stones += 1,
            Cell::Water => {
                if !self.on_raft {
                    if self.stones > 0 {
                        self.stones -= 1;
                    } else {
                        self.on_raft = true;
                    }
                }
            }
            _ => {}
        }
        if ahead != Cell::Water && self.on_raft {
            self.on_raft = false;
            self.has_raft = false;
        }
    }
}

/// The decision engine: one map, one agent, one crossing plan.
#[derive(Debug, Clone)]
pub struct Explorer {
    world: WorldModel,
    agent: AgentState,
    islands: IslandMap,
    plan: CrossingPlan,
    /// Set while no rule yields an action, so the warning is logged once.
    stalled: bool,
}

impl Default for Explorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Explorer {
    /// An explorer at the origin. Views are drawn facing up, so the first
    /// heading fixes the orientation of the world frame.
    pub fn new() -> Self {
        let start = Position::new(0, 0);
        Self::from_parts(WorldModel::new(start), AgentState::new(start, Heading::Up))
    }

    /// Resumes from an existing map and agent state.
    pub fn from_parts(world: WorldModel, agent: AgentState) -> Self {
        Self {
            world,
            agent,
            islands: IslandMap::default(),
            plan: CrossingPlan::Idle,
            stalled: false,
        }
    }

    pub fn world(&self) -> &WorldModel {
        &self.world
    }

    pub fn state(&self) -> &AgentState {
        &self.agent
    }

    /// The segmentation from the most recent pass.
    pub fn islands(&self) -> &IslandMap {
        &self.islands
    }

    pub fn plan(&self) -> CrossingPlan {
        self.plan
    }

    fn head_for(&self, target: Option<Position>, domain: Domain) -> Option<Action> {
        let target = target?;
        find_path(&self.world, &self.agent, target, domain).map(|step| step.action)
    }

    fn head_for_nearest(&self, target: SearchTarget) -> Option<Action> {
        let domain = match target {
            SearchTarget::UnseenWater => Domain::Water,
            _ => Domain::Land,
        };
        self.head_for(find_nearest(&self.world, &self.agent, target), domain)
    }

    /// Prefers a cell of `kind` that gates unexplored space, else the
    /// nearest one.
    fn head_for_resource(&self, kind: Cell) -> Option<Action> {
        self.head_for_nearest(SearchTarget::Blocking(kind))
            .or_else(|| self.head_for_nearest(SearchTarget::Kind(kind)))
    }

    fn decide(&mut self) -> Action {
        if let Some(action) = self.next_action() {
            self.stalled = false;
            return action;
        }
        if !self.stalled {
            self.stalled = true;
            if self.agent.has_gold {
                tracing::warn!(
                    position = ?self.agent.position,
                    "holding the gold with no way home, turning in place"
                );
            } else {
                tracing::warn!(
                    position = ?self.agent.position,
                    plan = ?self.plan.stage(),
                    "no rule produced an action, turning in place"
                );
            }
        }
        Action::TurnLeft
    }

    fn next_action(&mut self) -> Option<Action> {
        if let Some(action) = self.cut_or_unlock() {
            return Some(action);
        }

        // Afloat, every unseen stretch of water may border an island.
        if self.agent.on_raft {
            if let Some(action) = self.head_for_nearest(SearchTarget::UnseenWater) {
                self.plan = CrossingPlan::Idle;
                return Some(action);
            }
        }

        if self.world.cell(self.agent.position) != Cell::Water {
            let explore = self
                .collect_seen_items()
                .or_else(|| self.head_for_nearest(SearchTarget::Unexplored))
                .or_else(|| self.head_for_nearest(SearchTarget::Perimeter));
            if explore.is_some() {
                self.plan = CrossingPlan::Idle;
                return explore;
            }
        }

        if self.plan.is_idle() {
            self.islands = IslandMap::segment(&self.world, &self.agent);
            if self.islands.len() > 1 {
                if let Some(selection) =
                    select_next_island(&self.world, &self.agent, &self.islands)
                {
                    self.plan = CrossingPlan::Gathering(selection.route);
                }
            } else if !self.agent.has_gold {
                if let Some(action) = self.clear_path() {
                    return Some(action);
                }
            }
        }

        if self.agent.on_raft {
            // Once afloat the crossing has begun, whatever stage the plan was in.
            self.plan = self.plan.embark();
            return self.water_crossing();
        }
        match self.plan {
            CrossingPlan::Gathering(route) => self.prepare_crossing(route),
            CrossingPlan::Crossing(_) => self.water_crossing(),
            CrossingPlan::Idle => self.head_for_resource(Cell::Stone).or_else(|| {
                if self.agent.has_axe {
                    self.head_for_resource(Cell::Tree)
                } else {
                    None
                }
            }),
        }
    }

    fn cut_or_unlock(&self) -> Option<Action> {
        match self.world.cell(self.agent.ahead()) {
            Cell::Tree if self.agent.has_axe => Some(Action::Cut),
            Cell::Door if self.agent.has_key => Some(Action::Unlock),
            _ => None,
        }
    }

    /// Walks to a sighted item on this island: the start once the gold is
    /// held, otherwise the gold, then a missing key, then a missing axe.
    fn collect_seen_items(&mut self) -> Option<Action> {
        let agent = &self.agent;
        let wanted = [
            agent.has_gold.then_some(self.world.start()),
            agent.seen_gold.filter(|_| !agent.has_gold),
            agent.seen_key.filter(|_| !agent.has_key),
            agent.seen_axe.filter(|_| !agent.has_axe),
        ];
        if wanted.iter().all(Option::is_none) {
            return None;
        }

        self.islands = IslandMap::segment(&self.world, &self.agent);
        wanted.into_iter().flatten().find_map(|target| {
            if !self.islands.same_island(self.agent.position, target)
                || !is_reachable(&self.world, &self.agent, target)
            {
                return None;
            }
            self.head_for(Some(target), Domain::Land)
        })
    }

    /// Finds something in the way of further exploration when this island
    /// has nothing left to offer.
    fn clear_path(&self) -> Option<Action> {
        let home = self.islands.home();
        let mut action = None;
        if self.agent.has_raft {
            action = self.head_for_nearest(SearchTarget::Blocking(Cell::Water));
        }
        if action.is_none() && self.agent.has_axe && home.is_some_and(|island| island.has_tree) {
            action = self.head_for_resource(Cell::Tree);
        }
        if action.is_none() && self.agent.stones > 0 {
            action = self.head_for_nearest(SearchTarget::Blocking(Cell::Water));
        }
        if action.is_none() && home.is_some_and(|island| island.stones > 0) {
            action = self.head_for_resource(Cell::Stone);
        }
        action
    }

    /// Collects what the crossing needs, walks to the home port and takes
    /// the first step onto the water.
    fn prepare_crossing(&mut self, route: Route) -> Option<Action> {
        if route.stones_required > self.agent.stones {
            let action = self.head_for_resource(Cell::Stone);
            if action.is_none() {
                return self.abandon("no stone left to collect");
            }
            return action;
        }
        if route.raft_required && !self.agent.has_raft {
            let action = self.head_for_resource(Cell::Tree);
            if action.is_none() {
                return self.abandon("no tree left for a raft");
            }
            return action;
        }
        // Stones are kept while rafting, so take along any left on this
        // island for the way back.
        if route.raft_required {
            if let Some(action) = self.head_for_resource(Cell::Stone) {
                return Some(action);
            }
        }
        if self.agent.position != route.home_port {
            let action = self.head_for(Some(route.home_port), Domain::Land);
            if action.is_none() {
                return self.abandon("home port unreachable");
            }
            return action;
        }

        tracing::info!(
            island = route.target,
            stones = self.agent.stones,
            raft = self.agent.has_raft,
            "setting off"
        );
        self.plan = self.plan.embark();
        self.water_crossing()
    }

    /// One water step towards the island port. Reaching it ends the plan.
    fn water_crossing(&mut self) -> Option<Action> {
        let Some(route) = self.plan.route().copied() else {
            return self.abandon("no crossing planned");
        };
        let Some(action) = self.head_for(Some(route.island_port), Domain::Water) else {
            return self.abandon("destination port unreachable");
        };
        if action == Action::Forward && self.agent.ahead() == route.island_port {
            tracing::info!(island = route.target, "arriving at island");
            self.plan = CrossingPlan::Idle;
        }
        Some(action)
    }

    fn abandon(&mut self, reason: &'static str) -> Option<Action> {
        if !self.plan.is_idle() {
            tracing::warn!(reason, "abandoning stale crossing plan");
        }
        self.plan = CrossingPlan::Idle;
        None
    }
}

impl Agent for Explorer {
    fn act(&mut self, observation: &Observation) -> Result<Action, EngineError> {
        self.world.update(observation, &mut self.agent);
        let action = self.decide();
        tracing::debug!(
            action = %action.code(),
            position = ?self.agent.position,
            heading = ?self.agent.heading,
            "chose action"
        );
        self.agent.apply(action, observation.ahead())?;
        Ok(action)
    }
}

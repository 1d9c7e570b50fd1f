use serde::{Deserialize, Serialize};

use crate::{
    Action, EngineError, Heading, Position,
    agent::Agent,
    map::Grid,
    session::Transport,
    world::{Observation, VIEW_RADIUS, VIEW_SIZE},
};

/// Represents the true content of a cell in the environment grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    #[default]
    Empty,
    Wall,
    Water,
    /// A stone dropped into water; walkable ground from then on.
    SteppingStone,
    Tree,
    Stone,
    Gold,
    Axe,
    Key,
    Door,
}

impl Tile {
    pub fn from_glyph(glyph: char) -> Option<Self> {
        let tile = match glyph {
            ' ' => Tile::Empty,
            '*' | '.' => Tile::Wall,
            '~' => Tile::Water,
            'O' => Tile::SteppingStone,
            'T' => Tile::Tree,
            'o' => Tile::Stone,
            '$' => Tile::Gold,
            'a' => Tile::Axe,
            'k' => Tile::Key,
            '-' => Tile::Door,
            _ => return None,
        };
        Some(tile)
    }

    pub fn glyph(self) -> char {
        match self {
            Tile::Empty => ' ',
            Tile::Wall => '*',
            Tile::Water => '~',
            Tile::SteppingStone => 'O',
            Tile::Tree => 'T',
            Tile::Stone => 'o',
            Tile::Gold => '$',
            Tile::Axe => 'a',
            Tile::Key => 'k',
            Tile::Door => '-',
        }
    }
}

/// Glyph shown for cells beyond the edge of the map.
pub const OUTSIDE_GLYPH: char = '.';

/// Represents the outcome of processing an agent's action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionResult {
    Success,
    Failure(String),
    Win,
    Drowned,
}

/// What the agent is carrying, as the game sees it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub axe: bool,
    pub key: bool,
    pub gold: bool,
    pub raft: bool,
    pub stones: u32,
    pub on_raft: bool,
}

/// Simulates the game: holds the true map and enforces its rules.
#[derive(Debug, Clone)]
pub struct Environment {
    terrain: Grid<Tile>,
    position: Position,
    heading: Heading,
    start: Position,
    inventory: Inventory,
    turns: u64,
    max_turns: Option<u64>,
    outcome: Option<ActionResult>,
}

impl Environment {
    /// Creates an empty world with the agent at `start`.
    pub fn new(width: usize, height: usize, start: Position, heading: Heading) -> Self {
        Environment {
            terrain: Grid::new(Position::new(0, 0), width, height),
            position: start,
            heading,
            start,
            inventory: Inventory::default(),
            turns: 0,
            max_turns: None,
            outcome: None,
        }
    }

    /// Ends the game as a loss after this many actions.
    pub fn with_max_turns(mut self, max_turns: u64) -> Self {
        self.max_turns = Some(max_turns);
        self
    }

    pub fn terrain(&self) -> &Grid<Tile> {
        &self.terrain
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn heading(&self) -> Heading {
        self.heading
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn inventory(&self) -> &Inventory {
        &self.inventory
    }

    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// `Win` or `Drowned` once the game has ended that way.
    pub fn outcome(&self) -> Option<&ActionResult> {
        self.outcome.as_ref()
    }

    /// The game accepts no more actions.
    pub fn is_over(&self) -> bool {
        self.outcome.is_some() || self.max_turns.is_some_and(|limit| self.turns >= limit)
    }

    /// The glyph at a map position, with the agent drawn on top.
    pub fn glyph_at(&self, position: Position) -> char {
        if position == self.position {
            return self.heading.glyph();
        }
        self.terrain
            .get(position)
            .map_or(OUTSIDE_GLYPH, |tile| tile.glyph())
    }

    /// The 5x5 view around the agent, rotated so the agent faces up.
    pub fn view_rows(&self) -> [String; VIEW_SIZE] {
        std::array::from_fn(|row| {
            (0..VIEW_SIZE)
                .map(|column| {
                    let dx = column as i32 - VIEW_RADIUS;
                    let dy = row as i32 - VIEW_RADIUS;
                    if dx == 0 && dy == 0 {
                        return Heading::Up.glyph();
                    }
                    let (world_dx, world_dy) = self.heading.rotate_view_offset(dx, dy);
                    self.terrain
                        .get(Position::new(
                            self.position.x + world_dx,
                            self.position.y + world_dy,
                        ))
                        .map_or(OUTSIDE_GLYPH, |tile| tile.glyph())
                })
                .collect()
        })
    }

    pub fn observe(&self) -> Result<Observation, EngineError> {
        Observation::from_rows(&self.view_rows())
    }

    /// Runs one observe/act/apply cycle for `agent`.
    pub fn step(&mut self, agent: &mut dyn Agent) -> Result<ActionResult, EngineError> {
        let observation = self.observe()?;
        let action = agent.act(&observation)?;
        Ok(self.apply(action))
    }

    /// Applies one action under the rules of the game.
    pub fn apply(&mut self, action: Action) -> ActionResult {
        if self.is_over() {
            return ActionResult::Failure("The game is over.".to_string());
        }
        self.turns += 1;

        let ahead = self.position.step(self.heading);
        let result = match action {
            Action::TurnLeft => {
                self.heading = self.heading.turned_left();
                ActionResult::Success
            }
            Action::TurnRight => {
                self.heading = self.heading.turned_right();
                ActionResult::Success
            }
            Action::Forward => self.move_forward(ahead),
            Action::Cut => match self.terrain.get(ahead).copied() {
                Some(Tile::Tree) if self.inventory.axe => {
                    self.terrain[ahead] = Tile::Empty;
                    self.inventory.raft = true;
                    ActionResult::Success
                }
                Some(Tile::Tree) => ActionResult::Failure("Cutting needs an axe.".to_string()),
                _ => ActionResult::Failure("There is no tree to cut.".to_string()),
            },
            Action::Unlock => match self.terrain.get(ahead).copied() {
                Some(Tile::Door) if self.inventory.key => {
                    self.terrain[ahead] = Tile::Empty;
                    ActionResult::Success
                }
                Some(Tile::Door) => ActionResult::Failure("Unlocking needs a key.".to_string()),
                _ => ActionResult::Failure("There is no door to unlock.".to_string()),
            },
        };

        tracing::trace!(action = %action.code(), ?result, turn = self.turns, "applied action");
        if matches!(result, ActionResult::Win | ActionResult::Drowned) {
            tracing::info!(?result, turns = self.turns, "game over");
            self.outcome = Some(result.clone());
        }
        result
    }

    fn move_forward(&mut self, ahead: Position) -> ActionResult {
        let Some(tile) = self.terrain.get(ahead).copied() else {
            return ActionResult::Failure("Cannot move off the map.".to_string());
        };
        match tile {
            Tile::Wall => return ActionResult::Failure("Cannot move into a wall.".to_string()),
            Tile::Tree => return ActionResult::Failure("A tree is in the way.".to_string()),
            Tile::Door => return ActionResult::Failure("The door is locked.".to_string()),
            Tile::Water => {
                self.position = ahead;
                if self.inventory.on_raft {
                    return ActionResult::Success;
                }
                if self.inventory.stones > 0 {
                    self.inventory.stones -= 1;
                    self.terrain[ahead] = Tile::SteppingStone;
                    return ActionResult::Success;
                }
                if self.inventory.raft {
                    self.inventory.on_raft = true;
                    return ActionResult::Success;
                }
                return ActionResult::Drowned;
            }
            _ => {}
        }

        self.position = ahead;
        if self.inventory.on_raft {
            // The raft is left behind at the shore.
            self.inventory.on_raft = false;
            self.inventory.raft = false;
        }
        match tile {
            Tile::Gold => self.inventory.gold = true,
            Tile::Axe => self.inventory.axe = true,
            Tile::Key => self.inventory.key = true,
            Tile::Stone => self.inventory.stones += 1,
            _ => {}
        }
        if tile != Tile::SteppingStone {
            self.terrain[ahead] = Tile::Empty;
        }

        if self.inventory.gold && self.position == self.start {
            ActionResult::Win
        } else {
            ActionResult::Success
        }
    }
}

impl Transport for Environment {
    fn receive(&mut self) -> Result<Observation, EngineError> {
        if self.is_over() {
            return Err(EngineError::ObservationStreamClosed);
        }
        self.observe()
    }

    fn send(&mut self, action: Action) -> Result<(), EngineError> {
        if let ActionResult::Failure(reason) = self.apply(action) {
            tracing::debug!(action = %action.code(), %reason, "action had no effect");
        }
        Ok(())
    }
}

/// Loads an environment from a map drawn in the game's glyphs.
///
/// Exactly one agent marker (`^ > v <`) is required; it sets the start and
/// the initial heading. Short rows are padded with wall.
pub fn load_environment_from_string(map_string: &str) -> Result<Environment, EngineError> {
    let mut lines: Vec<&str> = map_string
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return Err(EngineError::InvalidMap("map is empty".to_string()));
    }

    let height = lines.len();
    let width = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0);
    if width == 0 {
        return Err(EngineError::InvalidMap("map has zero width".to_string()));
    }

    let mut agent: Option<(Position, Heading)> = None;
    let mut terrain = Grid::from_generator(Position::new(0, 0), width, height, |_| Tile::Wall);

    for (y, line) in lines.iter().enumerate() {
        for (x, glyph) in line.chars().enumerate() {
            let position = Position::new(x as i32, y as i32);
            let tile = if let Some(heading) = Heading::from_glyph(glyph) {
                if agent.is_some() {
                    return Err(EngineError::InvalidMap(
                        "multiple agent markers found".to_string(),
                    ));
                }
                agent = Some((position, heading));
                Tile::Empty
            } else {
                Tile::from_glyph(glyph).ok_or_else(|| {
                    EngineError::InvalidMap(format!(
                        "unknown map glyph {glyph:?} at ({x}, {y})"
                    ))
                })?
            };
            terrain.set(position, tile)?;
        }
    }

    let (start, heading) =
        agent.ok_or_else(|| EngineError::InvalidMap("no agent marker found".to_string()))?;
    let mut environment = Environment::new(width, height, start, heading);
    environment.terrain = terrain;
    Ok(environment)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(rows: &[&str]) -> Environment {
        load_environment_from_string(&rows.join("\n")).expect("valid map")
    }

    #[test]
    fn loading_rejects_bad_maps() {
        assert!(matches!(
            load_environment_from_string(""),
            Err(EngineError::InvalidMap(_))
        ));
        assert!(matches!(
            load_environment_from_string("* *\n* *"),
            Err(EngineError::InvalidMap(_))
        ));
        assert!(matches!(
            load_environment_from_string("^ >"),
            Err(EngineError::InvalidMap(_))
        ));
        assert!(matches!(
            load_environment_from_string("^ #"),
            Err(EngineError::InvalidMap(_))
        ));
    }

    #[test]
    fn ragged_rows_are_padded_with_wall() {
        let environment = load(&["*****", "*^", "*****"]);
        assert_eq!(environment.terrain().width(), 5);
        assert_eq!(environment.terrain()[Position::new(3, 1)], Tile::Wall);
        assert_eq!(environment.heading(), Heading::Up);
        assert_eq!(environment.start(), Position::new(1, 1));
    }

    #[test]
    fn view_is_rotated_to_face_up() {
        let environment = load(&["*****", "*  $*", "* > *", "*  a*", "*****"]);
        let rows = environment.view_rows();
        // Facing right: the gold is ahead-left, the axe ahead-right.
        assert_eq!(rows[0], "*****");
        assert_eq!(rows[1], "*$ a*");
        assert_eq!(rows[2], "* ^ *");
        let view = environment.observe().expect("valid view");
        assert_eq!(view.ahead(), Some(crate::world::Cell::Empty));
    }

    #[test]
    fn outside_the_map_is_drawn_as_boundary() {
        let environment = load(&["v"]);
        let rows = environment.view_rows();
        assert_eq!(rows[0], ".....");
        assert_eq!(rows[2], "..^..");
        assert_eq!(environment.glyph_at(Position::new(-1, 0)), OUTSIDE_GLYPH);
        assert_eq!(environment.glyph_at(Position::new(0, 0)), 'v');
    }

    #[test]
    fn stones_become_stepping_stones() {
        let mut environment = load(&["*****", "*^o~ ", "*****"]);
        environment.apply(Action::TurnRight);
        assert_eq!(environment.apply(Action::Forward), ActionResult::Success);
        assert_eq!(environment.inventory().stones, 1);
        assert_eq!(environment.apply(Action::Forward), ActionResult::Success);
        assert_eq!(environment.inventory().stones, 0);
        assert_eq!(environment.terrain()[Position::new(3, 1)], Tile::SteppingStone);
        assert_eq!(environment.glyph_at(Position::new(2, 1)), ' ');
    }

    #[test]
    fn water_without_stones_or_raft_drowns() {
        let mut environment = load(&["***", "*~*", "*^*", "***"]);
        assert_eq!(environment.apply(Action::Forward), ActionResult::Drowned);
        assert!(environment.is_over());
        assert_eq!(environment.receive(), Err(EngineError::ObservationStreamClosed));
    }

    #[test]
    fn rafts_are_cut_used_and_lost() {
        let mut environment = load(&["*******", "*a^T~ *", "*******"]);
        environment.apply(Action::TurnLeft);
        environment.apply(Action::Forward);
        assert!(environment.inventory().axe);
        environment.apply(Action::TurnRight);
        environment.apply(Action::TurnRight);
        environment.apply(Action::Forward);
        assert!(matches!(environment.apply(Action::Forward), ActionResult::Failure(_)));
        assert_eq!(environment.apply(Action::Cut), ActionResult::Success);
        assert!(environment.inventory().raft);

        environment.apply(Action::Forward);
        environment.apply(Action::Forward);
        assert!(environment.inventory().on_raft);
        environment.apply(Action::Forward);
        assert!(!environment.inventory().on_raft && !environment.inventory().raft);
        assert_eq!(environment.position(), Position::new(5, 1));
    }

    #[test]
    fn doors_need_a_key() {
        let mut environment = load(&["*****", "*k^-*", "*****"]);
        environment.apply(Action::TurnRight);
        assert!(matches!(environment.apply(Action::Unlock), ActionResult::Failure(_)));
        environment.apply(Action::TurnLeft);
        environment.apply(Action::TurnLeft);
        environment.apply(Action::Forward);
        environment.apply(Action::TurnLeft);
        environment.apply(Action::TurnLeft);
        environment.apply(Action::Forward);
        assert_eq!(environment.apply(Action::Unlock), ActionResult::Success);
        assert_eq!(environment.terrain()[Position::new(3, 1)], Tile::Empty);
    }

    #[test]
    fn returning_with_gold_wins() {
        let mut environment = load(&["****", "*^$*", "****"]).with_max_turns(10);
        environment.apply(Action::TurnRight);
        environment.apply(Action::Forward);
        assert!(environment.inventory().gold);
        environment.apply(Action::TurnLeft);
        environment.apply(Action::TurnLeft);
        assert_eq!(environment.apply(Action::Forward), ActionResult::Win);
        assert_eq!(environment.outcome(), Some(&ActionResult::Win));
        assert!(matches!(environment.apply(Action::Forward), ActionResult::Failure(_)));
    }

    #[test]
    fn turn_limit_closes_the_stream() {
        let mut environment = load(&["***", "*^*", "***"]).with_max_turns(2);
        assert!(environment.receive().is_ok());
        environment.send(Action::TurnLeft).expect("send");
        environment.send(Action::TurnLeft).expect("send");
        assert_eq!(environment.turns(), 2);
        assert_eq!(environment.receive(), Err(EngineError::ObservationStreamClosed));
    }
}

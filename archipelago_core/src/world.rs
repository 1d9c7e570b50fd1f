//! The agent's persistent picture of the world, fused from 5x5 views.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{EngineError, Heading, Item, Position, agent::AgentState, map::Grid};

/// Side length of an observation window.
pub const VIEW_SIZE: usize = 5;

/// Distance from the window's centre to its edge.
pub const VIEW_RADIUS: i32 = 2;

/// What the agent believes occupies a cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Cell {
    #[default]
    Unknown,
    Empty,
    /// Walls and the edge of the map.
    Boundary,
    Water,
    Tree,
    Stone,
    Gold,
    Axe,
    Key,
    /// A locked door.
    Door,
}

impl Cell {
    /// Classifies a single glyph of the game's alphabet.
    ///
    /// Returns `Ok(None)` for the agent's own marker, which carries no
    /// terrain information.
    pub fn from_glyph(glyph: char) -> Result<Option<Cell>, EngineError> {
        let cell = match glyph {
            ' ' | 'O' => Cell::Empty,
            '.' | '*' => Cell::Boundary,
            '~' => Cell::Water,
            'T' => Cell::Tree,
            'o' => Cell::Stone,
            '$' => Cell::Gold,
            'a' => Cell::Axe,
            'k' => Cell::Key,
            '-' => Cell::Door,
            '^' | '>' | 'v' | '<' => return Ok(None),
            other => return Err(EngineError::UnknownGlyph { glyph: other }),
        };
        Ok(Some(cell))
    }

    /// Glyph used when drawing the belief map.
    pub fn glyph(self) -> char {
        match self {
            Cell::Unknown => '?',
            Cell::Empty => ' ',
            Cell::Boundary => '*',
            Cell::Water => '~',
            Cell::Tree => 'T',
            Cell::Stone => 'o',
            Cell::Gold => '$',
            Cell::Axe => 'a',
            Cell::Key => 'k',
            Cell::Door => '-',
        }
    }

    /// The collectable item lying in this cell, if any.
    pub fn item(self) -> Option<Item> {
        match self {
            Cell::Gold => Some(Item::Gold),
            Cell::Axe => Some(Item::Axe),
            Cell::Key => Some(Item::Key),
            _ => None,
        }
    }

    /// Whether ordinary travel may enter the cell.
    ///
    /// Trees and stones are kept impassable so that they are only used
    /// when a plan asks for them.
    pub fn is_travel_passable(self, has_key: bool) -> bool {
        match self {
            Cell::Unknown | Cell::Boundary | Cell::Water | Cell::Tree | Cell::Stone => false,
            Cell::Door => has_key,
            Cell::Empty | Cell::Gold | Cell::Axe | Cell::Key => true,
        }
    }

    /// Whether the cell belongs to a landmass when segmenting islands.
    pub fn is_island_passable(self, has_axe: bool, has_key: bool) -> bool {
        match self {
            Cell::Unknown | Cell::Boundary | Cell::Water => false,
            Cell::Tree => has_axe,
            Cell::Door => has_key,
            Cell::Empty | Cell::Stone | Cell::Gold | Cell::Axe | Cell::Key => true,
        }
    }
}

/// One turn's 5x5 view, drawn as if the agent faces up.
///
/// The centre is the agent's own cell and is never observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    cells: [[Option<Cell>; VIEW_SIZE]; VIEW_SIZE],
}

impl Observation {
    /// Parses five rows of five glyphs.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, EngineError> {
        if rows.len() != VIEW_SIZE {
            return Err(EngineError::MalformedObservation(format!(
                "expected {VIEW_SIZE} rows, got {}",
                rows.len()
            )));
        }
        let mut cells = [[None; VIEW_SIZE]; VIEW_SIZE];
        for (row_index, row) in rows.iter().enumerate() {
            let glyphs: Vec<char> = row.as_ref().chars().collect();
            if glyphs.len() != VIEW_SIZE {
                return Err(EngineError::MalformedObservation(format!(
                    "row {row_index} has {} glyphs, expected {VIEW_SIZE}",
                    glyphs.len()
                )));
            }
            for (column, glyph) in glyphs.into_iter().enumerate() {
                if is_centre(row_index, column) {
                    continue;
                }
                cells[row_index][column] = Cell::from_glyph(glyph)?;
            }
        }
        Ok(Observation { cells })
    }

    /// The classified cell at a view row and column.
    pub fn cell(&self, row: usize, column: usize) -> Option<Cell> {
        self.cells.get(row)?.get(column).copied().flatten()
    }

    /// The cell directly in front of the agent.
    pub fn ahead(&self) -> Option<Cell> {
        self.cell(1, 2)
    }

    /// Yields `(dx, dy, cell)` for every observed cell, offsets relative to
    /// the centre in view space.
    pub fn visible(&self) -> impl Iterator<Item = (i32, i32, Cell)> + '_ {
        self.cells.iter().enumerate().flat_map(|(row, cells)| {
            cells.iter().enumerate().filter_map(move |(column, cell)| {
                cell.map(|cell| {
                    (
                        column as i32 - VIEW_RADIUS,
                        row as i32 - VIEW_RADIUS,
                        cell,
                    )
                })
            })
        })
    }
}

fn is_centre(row: usize, column: usize) -> bool {
    row == VIEW_SIZE / 2 && column == VIEW_SIZE / 2
}

/// Persistent global map plus the set of visited cells.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldModel {
    cells: Grid<Cell>,
    visited: HashSet<Position>,
    start: Position,
}

impl WorldModel {
    /// Creates an empty model for an agent starting at `start`.
    pub fn new(start: Position) -> Self {
        let corner = Position::new(start.x - VIEW_RADIUS, start.y - VIEW_RADIUS);
        WorldModel {
            cells: Grid::new(corner, VIEW_SIZE, VIEW_SIZE),
            visited: HashSet::new(),
            start,
        }
    }

    /// Builds a model from a drawn map, mainly for tests and tooling.
    ///
    /// Rows use the game's glyphs plus `'?'` for unknown cells. Exactly one
    /// agent marker (`^ > v <`) is required; it fixes the agent's position
    /// and heading, and that position becomes the start.
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<KnownMap, EngineError> {
        let mut agent: Option<(Position, Heading)> = None;
        let mut known = Vec::new();

        for (y, row) in rows.iter().enumerate() {
            for (x, glyph) in row.as_ref().chars().enumerate() {
                let position = Position::new(x as i32, y as i32);
                if let Some(heading) = Heading::from_glyph(glyph) {
                    if agent.is_some() {
                        return Err(EngineError::InvalidMap(
                            "more than one agent marker".to_string(),
                        ));
                    }
                    agent = Some((position, heading));
                    continue;
                }
                if glyph == '?' {
                    continue;
                }
                if let Some(cell) = Cell::from_glyph(glyph)? {
                    known.push((position, cell));
                }
            }
        }

        let (position, heading) =
            agent.ok_or_else(|| EngineError::InvalidMap("no agent marker".to_string()))?;
        let mut world = WorldModel::new(position);
        for (cell_position, cell) in known {
            world.record(cell_position, cell);
        }
        world.record(position, Cell::Empty);
        world.visited.insert(position);

        Ok(KnownMap {
            world,
            position,
            heading,
        })
    }

    /// Moves the start cell; the start is otherwise the first position.
    pub fn with_start(mut self, start: Position) -> Self {
        self.start = start;
        self
    }

    pub fn start(&self) -> Position {
        self.start
    }

    /// The believed content of a cell; anything never observed is Unknown.
    pub fn cell(&self, position: Position) -> Cell {
        self.cells.get(position).copied().unwrap_or_default()
    }

    pub fn is_known(&self, position: Position) -> bool {
        self.cell(position) != Cell::Unknown
    }

    pub fn is_visited(&self, position: Position) -> bool {
        self.visited.contains(&position)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// The backing grid, for rendering.
    pub fn grid(&self) -> &Grid<Cell> {
        &self.cells
    }

    /// Writes a classification. Unknown is never written, so a known cell
    /// can only be refined, not forgotten.
    pub fn record(&mut self, position: Position, cell: Cell) {
        if cell == Cell::Unknown {
            return;
        }
        self.cells.insert(position, cell);
    }

    /// Fuses one observation taken from the agent's current pose.
    ///
    /// Sightings of gold, the axe and the key overwrite the agent's last
    /// known location of that item.
    pub fn update(&mut self, observation: &Observation, agent: &mut AgentState) {
        let centre = agent.position;
        for (dx, dy, cell) in observation.visible() {
            let (world_dx, world_dy) = agent.heading.rotate_view_offset(dx, dy);
            let position = Position::new(centre.x + world_dx, centre.y + world_dy);
            match cell.item() {
                Some(Item::Gold) => agent.seen_gold = Some(position),
                Some(Item::Axe) => agent.seen_axe = Some(position),
                Some(Item::Key) => agent.seen_key = Some(position),
                None => {}
            }
            self.record(position, cell);
        }

        self.visited.insert(centre);
        // At sea the own cell stays Water so it is never counted as land.
        if self.cell(centre) != Cell::Water {
            self.record(centre, Cell::Empty);
        }
    }

    /// Ordinary travel passability for the given agent.
    pub fn is_travel_passable(&self, position: Position, agent: &AgentState) -> bool {
        self.cell(position).is_travel_passable(agent.has_key)
    }

    /// Island-segmentation passability for the given agent.
    pub fn is_island_passable(&self, position: Position, agent: &AgentState) -> bool {
        self.cell(position)
            .is_island_passable(agent.has_axe, agent.has_key)
    }

    /// True if any orthogonal neighbour satisfies `predicate`.
    pub fn any_neighbor(&self, position: Position, predicate: impl Fn(Position, Cell) -> bool) -> bool {
        position
            .neighbors()
            .into_iter()
            .any(|neighbor| predicate(neighbor, self.cell(neighbor)))
    }

    pub fn is_adjacent_to(&self, position: Position, cell: Cell) -> bool {
        self.any_neighbor(position, |_, neighbor| neighbor == cell)
    }
}

/// A [`WorldModel`] parsed from a drawing, with the agent's pose.
#[derive(Debug, Clone)]
pub struct KnownMap {
    pub world: WorldModel,
    pub position: Position,
    pub heading: Heading,
}

impl KnownMap {
    /// An agent state standing at the drawn marker with empty hands.
    pub fn agent(&self) -> AgentState {
        AgentState::new(self.position, self.heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observation(rows: [&str; 5]) -> Observation {
        Observation::from_rows(&rows).expect("valid observation")
    }

    #[test]
    fn glyphs_classify_into_cells() {
        assert_eq!(Cell::from_glyph(' ').ok(), Some(Some(Cell::Empty)));
        assert_eq!(Cell::from_glyph('O').ok(), Some(Some(Cell::Empty)));
        assert_eq!(Cell::from_glyph('.').ok(), Some(Some(Cell::Boundary)));
        assert_eq!(Cell::from_glyph('*').ok(), Some(Some(Cell::Boundary)));
        assert_eq!(Cell::from_glyph('^').ok(), Some(None));
        assert_eq!(
            Cell::from_glyph('#'),
            Err(EngineError::UnknownGlyph { glyph: '#' })
        );
    }

    #[test]
    fn malformed_observations_are_rejected() {
        assert!(matches!(
            Observation::from_rows(&["     "; 4]),
            Err(EngineError::MalformedObservation(_))
        ));
        assert!(matches!(
            Observation::from_rows(&["     ", "     ", "  ^ ", "     ", "     "]),
            Err(EngineError::MalformedObservation(_))
        ));
    }

    #[test]
    fn passability_rules() {
        assert!(!Cell::Tree.is_travel_passable(true));
        assert!(Cell::Tree.is_island_passable(true, false));
        assert!(!Cell::Tree.is_island_passable(false, false));
        assert!(!Cell::Stone.is_travel_passable(false));
        assert!(Cell::Stone.is_island_passable(false, false));
        assert!(!Cell::Door.is_travel_passable(false));
        assert!(Cell::Door.is_travel_passable(true));
        assert!(!Cell::Unknown.is_island_passable(true, true));
        assert!(!Cell::Water.is_island_passable(true, true));
    }

    #[test]
    fn update_rotates_view_into_world() {
        let mut world = WorldModel::new(Position::new(0, 0));
        let mut agent = AgentState::new(Position::new(0, 0), Heading::Right);
        // Straight ahead in the view is a tree, to the left is gold.
        let view = observation(["     ", "  T  ", " $^  ", "     ", "~    "]);
        world.update(&view, &mut agent);

        assert_eq!(world.cell(Position::new(1, 0)), Cell::Tree);
        assert_eq!(world.cell(Position::new(0, -1)), Cell::Gold);
        assert_eq!(agent.seen_gold, Some(Position::new(0, -1)));
        // Bottom-left of the view while facing right is two behind, two left.
        assert_eq!(world.cell(Position::new(-2, -2)), Cell::Water);
        assert!(world.is_visited(Position::new(0, 0)));
        assert_eq!(world.cell(Position::new(0, 0)), Cell::Empty);
    }

    #[test]
    fn classification_never_regresses_to_unknown() {
        let mut world = WorldModel::new(Position::new(0, 0));
        let mut agent = AgentState::new(Position::new(0, 0), Heading::Up);
        world.update(
            &observation(["*****", "*  o*", "* ^ *", "*   *", "*****"]),
            &mut agent,
        );
        let known: Vec<Position> = world
            .grid()
            .enumerate()
            .filter(|(_, cell)| **cell != Cell::Unknown)
            .map(|(position, _)| position)
            .collect();

        world.record(Position::new(2, 2), Cell::Unknown);
        agent.position = Position::new(0, -1);
        world.update(
            &observation(["~~~~~", "~   ~", "~ ^ ~", "~   ~", "~~~~~"]),
            &mut agent,
        );
        for position in known {
            assert_ne!(world.cell(position), Cell::Unknown, "{position:?} regressed");
        }
        // A collected stone is refined to empty ground.
        assert_eq!(world.cell(Position::new(1, -1)), Cell::Empty);
    }

    #[test]
    fn own_water_cell_stays_water() {
        let mut world = WorldModel::new(Position::new(0, 0));
        let mut agent = AgentState::new(Position::new(0, 0), Heading::Up);
        world.record(Position::new(0, 0), Cell::Water);
        world.update(
            &observation(["~~~~~", "~~~~~", "~~^~~", "~~~~~", "~~~~~"]),
            &mut agent,
        );
        assert_eq!(world.cell(Position::new(0, 0)), Cell::Water);
        assert!(world.is_visited(Position::new(0, 0)));
    }

    #[test]
    fn from_rows_reads_pose_and_unknowns() {
        let map = WorldModel::from_rows(&["?~~", " > ", "*$o"]).expect("valid map");
        assert_eq!(map.position, Position::new(1, 1));
        assert_eq!(map.heading, Heading::Right);
        assert_eq!(map.world.start(), Position::new(1, 1));
        assert_eq!(map.world.cell(Position::new(0, 0)), Cell::Unknown);
        assert_eq!(map.world.cell(Position::new(2, 2)), Cell::Stone);
        assert_eq!(map.world.cell(Position::new(0, 2)), Cell::Boundary);
        assert!(WorldModel::from_rows(&["^ ^"]).is_err());
        assert!(WorldModel::from_rows(&["   "]).is_err());
    }
}

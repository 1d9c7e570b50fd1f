use serde::{Deserialize, Serialize};

pub mod agent;
pub mod crossing;
pub mod environment;
pub mod error;
pub mod generator;
pub mod islands;
pub mod map;
pub mod pathfinding;
pub mod session;
pub mod world;

pub use error::EngineError;

/// Represents a 2D coordinate in world space.
///
/// `y` grows downwards, so [`Heading::Up`] decreases `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }

    /// The cell one step away in the given heading.
    pub fn step(self, heading: Heading) -> Self {
        let (dx, dy) = heading.offset();
        Position {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The four orthogonal neighbours, clockwise from the one above.
    pub fn neighbors(self) -> [Position; 4] {
        Heading::ALL.map(|heading| self.step(heading))
    }

    pub fn manhattan_distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// The direction the agent is facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    Up,
    Right,
    Down,
    Left,
}

impl Heading {
    /// All headings in clockwise order.
    pub const ALL: [Heading; 4] = [Heading::Up, Heading::Right, Heading::Down, Heading::Left];

    /// Unit vector of a forward step.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Heading::Up => (0, -1),
            Heading::Right => (1, 0),
            Heading::Down => (0, 1),
            Heading::Left => (-1, 0),
        }
    }

    pub const fn index(self) -> u8 {
        match self {
            Heading::Up => 0,
            Heading::Right => 1,
            Heading::Down => 2,
            Heading::Left => 3,
        }
    }

    pub const fn turned_right(self) -> Self {
        match self {
            Heading::Up => Heading::Right,
            Heading::Right => Heading::Down,
            Heading::Down => Heading::Left,
            Heading::Left => Heading::Up,
        }
    }

    pub const fn turned_left(self) -> Self {
        match self {
            Heading::Up => Heading::Left,
            Heading::Left => Heading::Down,
            Heading::Down => Heading::Right,
            Heading::Right => Heading::Up,
        }
    }

    pub const fn reversed(self) -> Self {
        self.turned_right().turned_right()
    }

    /// The agent marker drawn for this heading.
    pub const fn glyph(self) -> char {
        match self {
            Heading::Up => '^',
            Heading::Right => '>',
            Heading::Down => 'v',
            Heading::Left => '<',
        }
    }

    pub fn from_glyph(glyph: char) -> Option<Self> {
        Heading::ALL.into_iter().find(|heading| heading.glyph() == glyph)
    }

    /// Rotates a view-space offset (drawn facing up) into world space.
    pub const fn rotate_view_offset(self, dx: i32, dy: i32) -> (i32, i32) {
        match self {
            Heading::Up => (dx, dy),
            Heading::Right => (-dy, dx),
            Heading::Down => (-dx, -dy),
            Heading::Left => (dy, -dx),
        }
    }

    /// Where `other` lies relative to `self`.
    pub const fn relative(self, other: Heading) -> RelativeDirection {
        match (other.index() + 4 - self.index()) % 4 {
            0 => RelativeDirection::Ahead,
            1 => RelativeDirection::Right,
            2 => RelativeDirection::Behind,
            _ => RelativeDirection::Left,
        }
    }
}

impl TryFrom<u8> for Heading {
    type Error = EngineError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Heading::Up),
            1 => Ok(Heading::Right),
            2 => Ok(Heading::Down),
            3 => Ok(Heading::Left),
            other => Err(EngineError::InvalidHeading(other)),
        }
    }
}

/// A direction relative to the current heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelativeDirection {
    Ahead,
    Right,
    Behind,
    Left,
}

/// Items the agent can carry and remembers sightings of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Item {
    Gold,
    Axe,
    Key,
}

/// Represents the one action the agent emits per turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Forward,
    TurnLeft,
    TurnRight,
    Cut,
    Unlock,
}

impl Action {
    /// The single character sent over the wire.
    pub const fn code(self) -> char {
        match self {
            Action::Forward => 'f',
            Action::TurnLeft => 'l',
            Action::TurnRight => 'r',
            Action::Cut => 'c',
            Action::Unlock => 'u',
        }
    }

    /// Parses a wire character; upper case is accepted too.
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_lowercase() {
            'f' => Some(Action::Forward),
            'l' => Some(Action::TurnLeft),
            'r' => Some(Action::TurnRight),
            'c' => Some(Action::Cut),
            'u' => Some(Action::Unlock),
            _ => None,
        }
    }
}

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One of the two seats a raw row identifier maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Odd row ids.
    Left,
    /// Even row ids.
    Right,
}

impl Side {
    /// Both sides, left first.
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];

    /// Map an external row id onto a side via `((id - 1) mod 2) + 1`.
    ///
    /// Ids `{1, 2}`, `{3, 4}`, ... all map to `(Left, Right)`.
    pub fn from_row_id(id: i64) -> Self {
        if (id - 1).rem_euclid(2) == 0 {
            Side::Left
        } else {
            Side::Right
        }
    }

    /// The opposing side.
    pub fn other(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    /// Only player 1 rows drive the shared timer.
    pub fn drives_timer(self) -> bool {
        self == Side::Left
    }

    /// Lowercase label used in logs and control routes.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Side {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "1" => Ok(Side::Left),
            "right" | "2" => Ok(Side::Right),
            other => Err(format!("unknown side `{other}`")),
        }
    }
}

/// A value per side.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SideMap<T> {
    pub left: T,
    pub right: T,
}

impl<T> SideMap<T> {
    /// Build both entries from a constructor.
    pub fn from_fn(mut make: impl FnMut(Side) -> T) -> Self {
        Self {
            left: make(Side::Left),
            right: make(Side::Right),
        }
    }
}

impl<T> Index<Side> for SideMap<T> {
    type Output = T;

    fn index(&self, side: Side) -> &T {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

impl<T> IndexMut<Side> for SideMap<T> {
    fn index_mut(&mut self, side: Side) -> &mut T {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

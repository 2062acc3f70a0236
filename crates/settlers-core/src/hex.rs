//! Hex coordinate system using axial coordinates (q, r).
//!
//! This module provides the foundational coordinate types for the board graph:
//! - `HexCoord`: Identifies individual hex cells
//! - `VertexKey`: Identifies a corner by the three cells that meet there
//! - `EdgeKey`: Identifies a side by the two cells it separates
//!
//! Vertex and edge identity is the unordered set of surrounding cells. We store
//! that set as a sorted fixed-size array so it can be hashed, compared and used
//! as a map key directly. Cells outside the playable area still take part in the
//! key, which keeps coastal corners of the same tile distinct.

use serde::{Deserialize, Serialize};

use crate::game::GameError;

/// Direction of a neighboring cell, which is also the shared edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgeDirection {
    /// East edge (right)
    East,
    /// Northeast edge (top-right)
    NorthEast,
    /// Northwest edge (top-left)
    NorthWest,
    /// West edge (left)
    West,
    /// Southwest edge (bottom-left)
    SouthWest,
    /// Southeast edge (bottom-right)
    SouthEast,
}

impl EdgeDirection {
    /// All directions in ring order starting from East.
    ///
    /// Consecutive entries (wrapping) are neighbors of each other, so each
    /// consecutive pair plus the center cell forms one corner.
    pub const ALL: [EdgeDirection; 6] = [
        EdgeDirection::East,
        EdgeDirection::NorthEast,
        EdgeDirection::NorthWest,
        EdgeDirection::West,
        EdgeDirection::SouthWest,
        EdgeDirection::SouthEast,
    ];

    const fn offset(self) -> (i32, i32) {
        match self {
            EdgeDirection::East => (1, 0),
            EdgeDirection::NorthEast => (1, -1),
            EdgeDirection::NorthWest => (0, -1),
            EdgeDirection::West => (-1, 0),
            EdgeDirection::SouthWest => (-1, 1),
            EdgeDirection::SouthEast => (0, 1),
        }
    }
}

/// Axial coordinate for hex grid.
///
/// In axial coordinates:
/// - `q` increases going east (right)
/// - `r` increases going southeast
/// - The third coordinate `s` (not stored) satisfies: q + r + s = 0
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct HexCoord {
    /// Column (increases going east)
    pub q: i32,
    /// Row (increases going southeast)
    pub r: i32,
}

impl HexCoord {
    /// Create a new hex coordinate
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    /// Build from cube coordinates, rejecting triples that do not sum to zero
    pub fn from_cube(q: i32, r: i32, s: i32) -> Result<Self, GameError> {
        if q + r + s != 0 {
            return Err(GameError::InvalidReference(format!(
                "cube coordinate ({q}, {r}, {s}) does not sum to zero"
            )));
        }
        Ok(Self::new(q, r))
    }

    /// The implicit third coordinate (s = -q - r)
    pub const fn s(&self) -> i32 {
        -self.q - self.r
    }

    /// The six neighboring hexes in ring order starting from East
    pub fn neighbors(&self) -> [HexCoord; 6] {
        EdgeDirection::ALL.map(|dir| self.neighbor(dir))
    }

    /// Get the neighbor in a specific direction
    pub fn neighbor(&self, direction: EdgeDirection) -> HexCoord {
        let (dq, dr) = direction.offset();
        HexCoord::new(self.q + dq, self.r + dr)
    }

    /// Whether `other` is one of the six neighbors
    pub fn is_adjacent(&self, other: &HexCoord) -> bool {
        self.distance_to(other) == 1
    }

    /// Distance to another hex (in hex steps)
    pub fn distance_to(&self, other: &HexCoord) -> u32 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = (self.s() - other.s()).abs();
        ((dq + dr + ds) / 2) as u32
    }

    /// The six corners of this hex, in ring order
    pub fn corner_keys(&self) -> [VertexKey; 6] {
        let ring = self.neighbors();
        std::array::from_fn(|i| VertexKey::new(*self, ring[i], ring[(i + 1) % 6]))
    }

    /// The six sides of this hex, in ring order
    pub fn side_keys(&self) -> [EdgeKey; 6] {
        self.neighbors().map(|n| EdgeKey::new(*self, n))
    }

    /// Convert to pixel coordinates (center of hex)
    /// Uses pointy-top orientation with the given hex size (radius)
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let x = hex_size * (3.0_f64.sqrt() * self.q as f64 + 3.0_f64.sqrt() / 2.0 * self.r as f64);
        let y = hex_size * (3.0 / 2.0 * self.r as f64);
        (x, y)
    }

    /// All cells within `radius` steps of the origin, scanned by (q, r)
    pub fn cells_within(radius: i32) -> Vec<HexCoord> {
        let mut cells = Vec::new();
        for q in -radius..=radius {
            for r in -radius..=radius {
                let cell = HexCoord::new(q, r);
                if cell.s().abs() <= radius {
                    cells.push(cell);
                }
            }
        }
        cells
    }
}

/// Canonical identity of a corner: the three cells meeting there, sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VertexKey([HexCoord; 3]);

impl VertexKey {
    /// Create a key from three mutually adjacent cells in any order
    pub fn new(a: HexCoord, b: HexCoord, c: HexCoord) -> Self {
        let mut cells = [a, b, c];
        cells.sort();
        Self(cells)
    }

    /// The three cells around this corner (some may be off the board)
    pub fn cells(&self) -> [HexCoord; 3] {
        self.0
    }

    /// Whether `cell` is one of the three cells
    pub fn contains(&self, cell: &HexCoord) -> bool {
        self.0.contains(cell)
    }

    /// The three sides that meet at this corner
    pub fn side_keys(&self) -> [EdgeKey; 3] {
        let [a, b, c] = self.0;
        [EdgeKey::new(a, b), EdgeKey::new(a, c), EdgeKey::new(b, c)]
    }

    /// Two corners are connected by a side iff they share exactly two cells
    pub fn shares_edge_with(&self, other: &VertexKey) -> bool {
        self != other && self.0.iter().filter(|c| other.contains(c)).count() == 2
    }
}

/// Canonical identity of a side: the two cells it separates, sorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey([HexCoord; 2]);

impl EdgeKey {
    /// Create a key from two adjacent cells in any order
    pub fn new(a: HexCoord, b: HexCoord) -> Self {
        if a <= b {
            Self([a, b])
        } else {
            Self([b, a])
        }
    }

    /// The two cells on either side
    pub fn cells(&self) -> [HexCoord; 2] {
        self.0
    }

    /// Whether `cell` is one of the two cells
    pub fn contains(&self, cell: &HexCoord) -> bool {
        self.0.contains(cell)
    }

    /// The two corners at the ends of this side.
    ///
    /// Those are the two cells adjacent to both sides of the edge, each
    /// combined with the edge's own pair.
    pub fn endpoint_keys(&self) -> [VertexKey; 2] {
        let [a, b] = self.0;
        let mut common = a.neighbors().into_iter().filter(|n| n.is_adjacent(&b));
        // Two adjacent hexes always have exactly two common neighbors.
        let c = common.next().unwrap_or(a);
        let d = common.next().unwrap_or(b);
        [VertexKey::new(a, b, c), VertexKey::new(a, b, d)]
    }

    /// Midpoint of the side in pixel space
    pub fn to_pixel(&self, hex_size: f64) -> (f64, f64) {
        let (x1, y1) = self.0[0].to_pixel(hex_size);
        let (x2, y2) = self.0[1].to_pixel(hex_size);
        ((x1 + x2) / 2.0, (y1 + y2) / 2.0)
    }
}

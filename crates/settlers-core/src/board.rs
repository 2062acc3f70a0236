//! Game board representation: tiles, the corner/side graph, buildings and harbors.
//!
//! This module contains:
//! - Resource and tile types
//! - Board generation from a `GameConfig`
//! - The vertex/edge graph derived from hex coordinates, with precomputed indices
//! - Placement predicates, resource distribution and longest road

use crate::config::GameConfig;
use crate::game::GameError;
use crate::hex::{EdgeKey, HexCoord, VertexKey};
use crate::player::ResourceHand;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Player identifier (seat index, 0-3)
pub type PlayerId = u8;

/// Radius of the playable area around the origin
pub const BOARD_RADIUS: i32 = 2;

/// Number of harbors on a generated board
pub const HARBOR_COUNT: usize = 9;

/// Resource types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Resource {
    Wood,
    Brick,
    Sheep,
    Wheat,
    Ore,
}

impl Resource {
    /// All resource types
    pub const ALL: [Resource; 5] = [
        Resource::Wood,
        Resource::Brick,
        Resource::Sheep,
        Resource::Wheat,
        Resource::Ore,
    ];
}

/// Type of hex tile on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileType {
    /// Produces a resource when its number is rolled
    Resource(Resource),
    /// Never produces
    Desert,
}

/// Harbor types for maritime trading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Harbor {
    /// 3:1 trade any resource
    Generic,
    /// 2:1 trade for a specific resource
    Specific(Resource),
}

impl Harbor {
    /// The exchange rate for this harbor
    pub fn rate(&self) -> u32 {
        match self {
            Harbor::Generic => 3,
            Harbor::Specific(_) => 2,
        }
    }
}

/// A single hex tile on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tile {
    /// Position on the hex grid
    pub coord: HexCoord,
    /// What type of tile
    pub tile_type: TileType,
    /// Dice number that triggers production (2-12, None for desert)
    pub dice_number: Option<u8>,
    /// Whether the robber is currently on this tile
    pub has_robber: bool,
}

impl Tile {
    /// Create a new resource tile
    pub fn new_resource(coord: HexCoord, resource: Resource, dice_number: u8) -> Self {
        Self {
            coord,
            tile_type: TileType::Resource(resource),
            dice_number: Some(dice_number),
            has_robber: false,
        }
    }

    /// Create a desert tile
    pub fn desert(coord: HexCoord) -> Self {
        Self {
            coord,
            tile_type: TileType::Desert,
            dice_number: None,
            has_robber: true, // Robber starts on desert
        }
    }

    /// Get the resource this tile produces (if any)
    pub fn resource(&self) -> Option<Resource> {
        match self.tile_type {
            TileType::Resource(r) => Some(r),
            TileType::Desert => None,
        }
    }
}

/// Dense index of a vertex, stable for the life of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VertexId(pub usize);

/// Dense index of an edge, stable for the life of the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeId(pub usize);

/// What stands on a vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildingKind {
    Settlement,
    City,
}

/// A building and its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    pub kind: BuildingKind,
    pub owner: PlayerId,
}

impl Building {
    /// Resource multiplier for this building
    pub fn yield_amount(&self) -> u32 {
        match self.kind {
            BuildingKind::Settlement => 1,
            BuildingKind::City => 2,
        }
    }
}

/// A road and its owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Road {
    pub owner: PlayerId,
}

/// A corner of the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vertex {
    pub id: VertexId,
    pub key: VertexKey,
    /// On-board cells around this corner (1-3)
    pub tiles: Vec<HexCoord>,
    /// Incident edges (2-3)
    pub edges: Vec<EdgeId>,
    /// Vertices one edge away
    pub neighbors: Vec<VertexId>,
    pub building: Option<Building>,
}

/// A side of the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub id: EdgeId,
    pub key: EdgeKey,
    /// On-board cells on either side (1-2)
    pub tiles: Vec<HexCoord>,
    pub endpoints: [VertexId; 2],
    pub road: Option<Road>,
}

/// Harbor placement on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarborPlacement {
    /// The coastal edge where the harbor is located
    pub edge: EdgeId,
    /// Type of harbor
    pub harbor_type: Harbor,
}

/// The game board
#[derive(Debug, Clone)]
pub struct Board {
    tiles: Vec<Tile>,
    tile_index: HashMap<HexCoord, usize>,
    vertices: Vec<Vertex>,
    vertex_index: HashMap<VertexKey, VertexId>,
    edges: Vec<Edge>,
    /// Corners of each tile, parallel to `tiles`
    tile_vertices: Vec<[VertexId; 6]>,
    harbors: Vec<HarborPlacement>,
    robber: HexCoord,
}

impl Board {
    /// Generate a randomized board from the tile bag and token pool in `config`
    pub fn generate<R: Rng>(config: &GameConfig, rng: &mut R) -> Self {
        let mut pool = config.number_tokens.clone();
        let mut drawn: Vec<(TileType, Option<u8>)> = config
            .tile_counts
            .bag()
            .into_iter()
            .map(|tile_type| {
                let token = match tile_type {
                    TileType::Desert => None,
                    TileType::Resource(_) if pool.is_empty() => None,
                    TileType::Resource(_) => Some(pool.swap_remove(rng.gen_range(0..pool.len()))),
                };
                (tile_type, token)
            })
            .collect();
        drawn.shuffle(rng);

        let tiles = HexCoord::cells_within(BOARD_RADIUS)
            .into_iter()
            .zip(drawn)
            .map(|(coord, (tile_type, dice_number))| Tile {
                coord,
                tile_type,
                dice_number,
                has_robber: tile_type == TileType::Desert,
            })
            .collect();

        let mut board = Self::build(tiles);
        board.place_harbors(rng);
        board
    }

    /// Build a board around a fixed set of tiles (no harbors).
    ///
    /// The robber goes on the first tile flagged with it, else the first desert,
    /// else the first tile.
    pub fn from_tiles(tiles: Vec<Tile>) -> Result<Self, GameError> {
        if tiles.is_empty() {
            return Err(GameError::InvalidReference("board has no tiles".into()));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = tiles.iter().find(|t| !seen.insert(t.coord)) {
            return Err(GameError::InvalidReference(format!(
                "tile ({}, {}) listed twice",
                dup.coord.q, dup.coord.r
            )));
        }
        Ok(Self::build(tiles))
    }

    fn build(mut tiles: Vec<Tile>) -> Self {
        let robber_idx = tiles
            .iter()
            .position(|t| t.has_robber)
            .or_else(|| tiles.iter().position(|t| t.tile_type == TileType::Desert))
            .unwrap_or(0);
        for (idx, tile) in tiles.iter_mut().enumerate() {
            tile.has_robber = idx == robber_idx;
        }
        let robber = tiles.get(robber_idx).map(|t| t.coord).unwrap_or_default();

        let tile_index: HashMap<HexCoord, usize> =
            tiles.iter().enumerate().map(|(i, t)| (t.coord, i)).collect();
        let on_board = |cells: &[HexCoord]| -> Vec<HexCoord> {
            cells.iter().copied().filter(|c| tile_index.contains_key(c)).collect()
        };

        let mut vertices: Vec<Vertex> = Vec::new();
        let mut vertex_index = HashMap::new();
        let mut edges: Vec<Edge> = Vec::new();
        let mut seen_edges = HashSet::new();
        let mut tile_vertices = Vec::with_capacity(tiles.len());

        for tile in &tiles {
            let corners = tile.coord.corner_keys().map(|key| {
                *vertex_index.entry(key).or_insert_with(|| {
                    let id = VertexId(vertices.len());
                    vertices.push(Vertex {
                        id,
                        key,
                        tiles: on_board(&key.cells()),
                        edges: Vec::new(),
                        neighbors: Vec::new(),
                        building: None,
                    });
                    id
                })
            });

            // Side i lies between corners i-1 and i
            for (i, key) in tile.coord.side_keys().into_iter().enumerate() {
                if !seen_edges.insert(key) {
                    continue;
                }
                let id = EdgeId(edges.len());
                let endpoints = [corners[(i + 5) % 6], corners[i]];
                for (v, other) in [(endpoints[0], endpoints[1]), (endpoints[1], endpoints[0])] {
                    let vertex = &mut vertices[v.0];
                    vertex.edges.push(id);
                    vertex.neighbors.push(other);
                }
                edges.push(Edge {
                    id,
                    key,
                    tiles: on_board(&key.cells()),
                    endpoints,
                    road: None,
                });
            }
            tile_vertices.push(corners);
        }

        Self {
            tiles,
            tile_index,
            vertices,
            vertex_index,
            edges,
            tile_vertices,
            harbors: Vec::new(),
            robber,
        }
    }

    /// Place 4 generic and 5 specific harbors evenly around the coast
    fn place_harbors<R: Rng>(&mut self, rng: &mut R) {
        let mut harbor_types = vec![Harbor::Generic; 4];
        harbor_types.extend(Resource::ALL.map(Harbor::Specific));
        harbor_types.shuffle(rng);

        let mut coastal: Vec<(f64, EdgeId)> = self
            .edges
            .iter()
            .filter(|e| e.tiles.len() == 1)
            .map(|e| {
                let (x, y) = e.key.to_pixel(1.0);
                (y.atan2(x), e.id)
            })
            .collect();
        coastal.sort_by(|a, b| a.0.total_cmp(&b.0));

        let n = coastal.len();
        if n < HARBOR_COUNT {
            return;
        }
        self.harbors = (0..HARBOR_COUNT)
            .map(|i| coastal[i * n / HARBOR_COUNT].1)
            .zip(harbor_types)
            .map(|(edge, harbor_type)| HarborPlacement { edge, harbor_type })
            .collect();
    }

    // ==================== Lookups ====================

    /// All tiles in scan order
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// All vertices, indexed by `VertexId`
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// All edges, indexed by `EdgeId`
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Harbors on the coast
    pub fn harbors(&self) -> &[HarborPlacement] {
        &self.harbors
    }

    /// Where the robber currently is
    pub fn robber(&self) -> HexCoord {
        self.robber
    }

    /// Look up a tile
    pub fn tile(&self, coord: HexCoord) -> Result<&Tile, GameError> {
        self.tile_index
            .get(&coord)
            .map(|&i| &self.tiles[i])
            .ok_or_else(|| {
                GameError::InvalidReference(format!("no tile at ({}, {})", coord.q, coord.r))
            })
    }

    /// Look up a vertex
    pub fn vertex(&self, id: VertexId) -> Result<&Vertex, GameError> {
        self.vertices
            .get(id.0)
            .ok_or_else(|| GameError::InvalidReference(format!("no vertex {}", id.0)))
    }

    /// Look up an edge
    pub fn edge(&self, id: EdgeId) -> Result<&Edge, GameError> {
        self.edges
            .get(id.0)
            .ok_or_else(|| GameError::InvalidReference(format!("no edge {}", id.0)))
    }

    /// Find the vertex with this canonical key
    pub fn vertex_id(&self, key: &VertexKey) -> Option<VertexId> {
        self.vertex_index.get(key).copied()
    }

    /// The six corners of a tile
    pub fn tile_vertices(&self, coord: HexCoord) -> Result<[VertexId; 6], GameError> {
        self.tile(coord)?;
        Ok(self.tile_vertices[self.tile_index[&coord]])
    }

    fn building(&self, v: VertexId) -> Option<Building> {
        self.vertices.get(v.0).and_then(|vx| vx.building)
    }

    fn road_owner(&self, e: EdgeId) -> Option<PlayerId> {
        self.edges.get(e.0).and_then(|ed| ed.road).map(|r| r.owner)
    }

    // ==================== Placement predicates ====================

    /// No building on this vertex or any vertex one edge away
    pub fn satisfies_distance_rule(&self, v: VertexId) -> bool {
        match self.vertices.get(v.0) {
            Some(vertex) => {
                vertex.building.is_none()
                    && vertex.neighbors.iter().all(|&n| self.building(n).is_none())
            }
            None => false,
        }
    }

    /// Whether `player` owns a road touching this vertex
    fn touches_own_road(&self, v: VertexId, player: PlayerId) -> bool {
        self.vertices
            .get(v.0)
            .is_some_and(|vx| vx.edges.iter().any(|&e| self.road_owner(e) == Some(player)))
    }

    /// Settlement legality. Outside setup the vertex must touch one of the player's roads.
    pub fn can_place_settlement(&self, v: VertexId, player: PlayerId, setup: bool) -> bool {
        self.satisfies_distance_rule(v) && (setup || self.touches_own_road(v, player))
    }

    /// Road legality. Outside setup the edge must touch the player's road or building.
    pub fn can_place_road(&self, e: EdgeId, player: PlayerId, setup: bool) -> bool {
        self.can_place_road_with(e, player, setup, &[])
    }

    /// Road legality, treating `pending` edges as already holding the player's roads
    pub fn can_place_road_with(
        &self,
        e: EdgeId,
        player: PlayerId,
        setup: bool,
        pending: &[EdgeId],
    ) -> bool {
        let Some(edge) = self.edges.get(e.0) else {
            return false;
        };
        if edge.road.is_some() || pending.contains(&e) {
            return false;
        }
        if setup {
            return true;
        }
        edge.endpoints.iter().any(|&v| {
            self.building(v).is_some_and(|b| b.owner == player)
                || self.vertices[v.0].edges.iter().any(|&other| {
                    other != e && (self.road_owner(other) == Some(player) || pending.contains(&other))
                })
        })
    }

    /// The vertex holds a settlement owned by `player`
    pub fn can_upgrade_to_city(&self, v: VertexId, player: PlayerId) -> bool {
        self.building(v)
            == Some(Building {
                kind: BuildingKind::Settlement,
                owner: player,
            })
    }

    /// Get valid settlement spots for a player
    pub fn valid_settlement_spots(&self, player: PlayerId, setup: bool) -> Vec<VertexId> {
        self.vertices
            .iter()
            .map(|v| v.id)
            .filter(|&v| self.can_place_settlement(v, player, setup))
            .collect()
    }

    /// Get valid road spots for a player
    pub fn valid_road_spots(&self, player: PlayerId) -> Vec<EdgeId> {
        self.edges
            .iter()
            .map(|e| e.id)
            .filter(|&e| self.can_place_road(e, player, false))
            .collect()
    }

    /// Get valid city upgrade spots for a player
    pub fn valid_city_spots(&self, player: PlayerId) -> Vec<VertexId> {
        self.vertices
            .iter()
            .map(|v| v.id)
            .filter(|&v| self.can_upgrade_to_city(v, player))
            .collect()
    }

    // ==================== Mutation Methods ====================

    /// Place a settlement (assumes validation already done)
    pub fn place_settlement(&mut self, v: VertexId, player: PlayerId) {
        if let Some(vertex) = self.vertices.get_mut(v.0) {
            vertex.building = Some(Building {
                kind: BuildingKind::Settlement,
                owner: player,
            });
        }
    }

    /// Upgrade a settlement to a city
    pub fn upgrade_to_city(&mut self, v: VertexId) {
        if let Some(Building { kind, .. }) = self.vertices.get_mut(v.0).and_then(|vx| vx.building.as_mut()) {
            *kind = BuildingKind::City;
        }
    }

    /// Place a road
    pub fn place_road(&mut self, e: EdgeId, player: PlayerId) {
        if let Some(edge) = self.edges.get_mut(e.0) {
            edge.road = Some(Road { owner: player });
        }
    }

    /// Move the robber to a new location
    pub fn move_robber(&mut self, coord: HexCoord) {
        let Some(&idx) = self.tile_index.get(&coord) else {
            return;
        };
        if let Some(&old) = self.tile_index.get(&self.robber) {
            self.tiles[old].has_robber = false;
        }
        self.tiles[idx].has_robber = true;
        self.robber = coord;
    }

    // ==================== Resource Distribution ====================

    /// Calculate resources produced for a dice total
    pub fn distribute(&self, total: u8) -> BTreeMap<PlayerId, ResourceHand> {
        let mut grants: BTreeMap<PlayerId, ResourceHand> = BTreeMap::new();

        for (tile, corners) in self.tiles.iter().zip(&self.tile_vertices) {
            if tile.dice_number != Some(total) || tile.has_robber {
                continue;
            }
            let Some(resource) = tile.resource() else {
                continue;
            };
            for &v in corners {
                if let Some(building) = self.building(v) {
                    grants
                        .entry(building.owner)
                        .or_default()
                        .add(resource, building.yield_amount());
                }
            }
        }

        grants
    }

    /// One of each distinct resource around a vertex
    pub fn setup_bonus(&self, v: VertexId) -> ResourceHand {
        let mut bonus = ResourceHand::new();
        let Some(vertex) = self.vertices.get(v.0) else {
            return bonus;
        };
        let resources: BTreeSet<Resource> = vertex
            .tiles
            .iter()
            .filter_map(|c| self.tile_index.get(c))
            .filter_map(|&i| self.tiles[i].resource())
            .collect();
        for resource in resources {
            bonus.add(resource, 1);
        }
        bonus
    }

    /// Get players who have buildings adjacent to a tile (for robber stealing)
    pub fn players_adjacent_to_tile(&self, coord: HexCoord) -> BTreeSet<PlayerId> {
        self.tile_index
            .get(&coord)
            .map(|&i| {
                self.tile_vertices[i]
                    .iter()
                    .filter_map(|&v| self.building(v))
                    .map(|b| b.owner)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Harbor reachable from a vertex, if it sits on a harbor edge
    pub fn vertex_harbor(&self, v: VertexId) -> Option<Harbor> {
        self.harbors
            .iter()
            .find(|h| self.edges[h.edge.0].endpoints.contains(&v))
            .map(|h| h.harbor_type)
    }

    /// Get all harbors a player has access to (through their buildings)
    pub fn player_harbors(&self, player: PlayerId) -> Vec<Harbor> {
        self.vertices
            .iter()
            .filter(|v| v.building.is_some_and(|b| b.owner == player))
            .filter_map(|v| self.vertex_harbor(v.id))
            .collect()
    }

    /// Bank exchange rate for giving `resource`
    pub fn maritime_rate(&self, player: PlayerId, resource: Resource) -> u32 {
        self.player_harbors(player)
            .into_iter()
            .filter(|h| match h {
                Harbor::Generic => true,
                Harbor::Specific(r) => *r == resource,
            })
            .map(|h| h.rate())
            .min()
            .unwrap_or(4)
    }

    // ==================== Longest Road Calculation ====================

    /// Length of the longest simple path over the player's roads.
    ///
    /// A path may end at, but not pass through, a vertex holding another
    /// player's building.
    pub fn longest_road(&self, player: PlayerId) -> u32 {
        let owned: HashSet<EdgeId> = self
            .edges
            .iter()
            .filter(|e| e.road.is_some_and(|r| r.owner == player))
            .map(|e| e.id)
            .collect();

        let mut starts: BTreeSet<VertexId> = BTreeSet::new();
        for e in &owned {
            starts.extend(self.edges[e.0].endpoints);
        }

        let mut visited = HashSet::new();
        starts
            .into_iter()
            .map(|v| self.dfs_road_length(player, v, &owned, &mut visited))
            .max()
            .unwrap_or(0)
    }

    /// DFS to find the longest continuation from a vertex
    fn dfs_road_length(
        &self,
        player: PlayerId,
        at: VertexId,
        owned: &HashSet<EdgeId>,
        visited: &mut HashSet<EdgeId>,
    ) -> u32 {
        let mut best = 0;
        for &e in &self.vertices[at.0].edges {
            if !owned.contains(&e) || visited.contains(&e) {
                continue;
            }
            let [a, b] = self.edges[e.0].endpoints;
            let next = if a == at { b } else { a };

            visited.insert(e);
            let blocked = self.building(next).is_some_and(|bld| bld.owner != player);
            let length = if blocked {
                1
            } else {
                1 + self.dfs_road_length(player, next, owned, visited)
            };
            visited.remove(&e);

            best = best.max(length);
        }
        best
    }
}

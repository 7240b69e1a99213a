//! # Terrain モジュール
//!
//! 戦場の静的なタイルグリッドと、幅優先探索（BFS）による経路探索を提供します。
//!
//! ## 主要機能
//!
//! - **地形レイアウトの読み込み**: 行数ヘッダとタイル文字列からグリッドを構築
//! - **隣接リスト**: 構築時に一度だけ作成される4方向の通行可能な隣接タイル（インデックス参照）
//! - **経路探索**: 部分経路ごとキューに積むBFSで最短のタイル列を求める
//!
//! ## レイアウトファイル形式
//!
//! ```text
//! 3
//! GGW
//! GMG
//! FRG
//! ```
//!
//! 1行目が行数、以降の各行がタイル種別（G: 草地, F: 森, R: 岩場, M: 山岳, W: 水域）です。
//! 山岳と水域は通行不可です。

use crate::models::common::{Rect2D, Vec2};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, trace};

/// 地形種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerrainKind {
    Grass,
    Forest,
    Rocks,
    Mountains,
    Water,
}

impl TerrainKind {
    /// レイアウト文字から地形種別を決定（未知の文字は草地）
    pub fn from_char(c: char) -> Self {
        match c.to_ascii_uppercase() {
            'F' => TerrainKind::Forest,
            'R' => TerrainKind::Rocks,
            'M' => TerrainKind::Mountains,
            'W' => TerrainKind::Water,
            _ => TerrainKind::Grass,
        }
    }

    /// 通行可能か（山岳と水域以外）
    pub fn is_walkable(self) -> bool {
        !matches!(self, TerrainKind::Mountains | TerrainKind::Water)
    }
}

/// 地形読み込みエラー
#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("地形ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("地形レイアウトの行数ヘッダが不正です: {0:?}")]
    InvalidHeader(String),
    #[error("地形レイアウトの行数が不足しています（宣言: {declared}, 実際: {actual}）")]
    MissingRows { declared: usize, actual: usize },
    #[error("地形グリッドが空です")]
    Empty,
    #[error("タイル数がグリッドサイズと一致しません（期待: {expected}, 実際: {actual}）")]
    SizeMismatch { expected: usize, actual: usize },
}

/// グリッド上のタイル
#[derive(Debug, Clone)]
pub struct Tile {
    pub x: usize,
    pub y: usize,
    pub kind: TerrainKind,
    /// 通行可能な隣接タイルのインデックス（構築後は不変）
    exits: Vec<usize>,
    /// 探索中のみ使用する訪問済みフラグ
    visited: bool,
}

impl Tile {
    pub fn exits(&self) -> &[usize] {
        &self.exits
    }

    pub fn is_visited(&self) -> bool {
        self.visited
    }
}

/// 地形グリッド
#[derive(Debug, Clone)]
pub struct Grid {
    width: usize,
    height: usize,
    tile_size: f32,
    tiles: Vec<Tile>,
}

impl Grid {
    /// 地形種別の配列（行優先）からグリッドを構築
    pub fn from_kinds(
        width: usize,
        height: usize,
        kinds: Vec<TerrainKind>,
        tile_size: f32,
    ) -> Result<Self, TerrainError> {
        if width == 0 || height == 0 {
            return Err(TerrainError::Empty);
        }
        if kinds.len() != width * height {
            return Err(TerrainError::SizeMismatch {
                expected: width * height,
                actual: kinds.len(),
            });
        }

        let mut tiles: Vec<Tile> = kinds
            .into_iter()
            .enumerate()
            .map(|(index, kind)| Tile {
                x: index % width,
                y: index / width,
                kind,
                exits: Vec::new(),
                visited: false,
            })
            .collect();

        // 隣接リストの構築（+x, -x, +y, -y の順）
        for index in 0..tiles.len() {
            let x = (index % width) as isize;
            let y = (index / width) as isize;
            let exits: Vec<usize> = [(x + 1, y), (x - 1, y), (x, y + 1), (x, y - 1)]
                .into_iter()
                .filter(|&(nx, ny)| nx >= 0 && ny >= 0 && (nx as usize) < width && (ny as usize) < height)
                .map(|(nx, ny)| ny as usize * width + nx as usize)
                .filter(|&neighbor| tiles[neighbor].kind.is_walkable())
                .collect();
            tiles[index].exits = exits;
        }

        Ok(Self {
            width,
            height,
            tile_size,
            tiles,
        })
    }

    /// レイアウト文字列を解析してグリッドを構築
    pub fn parse(layout: &str, tile_size: f32) -> Result<Self, TerrainError> {
        let mut lines = layout.lines();
        let header = lines.next().unwrap_or_default().trim();
        let rows: usize = header
            .split_whitespace()
            .next()
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| TerrainError::InvalidHeader(header.to_string()))?;

        let row_lines: Vec<&str> = lines.take(rows).map(|line| line.trim_end()).collect();
        if row_lines.len() < rows {
            return Err(TerrainError::MissingRows {
                declared: rows,
                actual: row_lines.len(),
            });
        }

        let width = row_lines.iter().map(|line| line.chars().count()).max().unwrap_or(0);
        let mut kinds = Vec::with_capacity(width * rows);
        for line in &row_lines {
            let mut row: Vec<TerrainKind> = line.chars().map(TerrainKind::from_char).collect();
            row.resize(width, TerrainKind::Grass);
            kinds.extend(row);
        }

        let grid = Self::from_kinds(width, rows, kinds, tile_size)?;
        debug!(
            width = grid.width,
            height = grid.height,
            tile_size = grid.tile_size,
            "TERRAIN_LOADED: 地形グリッドを構築しました"
        );
        Ok(grid)
    }

    /// レイアウトファイルを読み込み
    pub fn from_file<P: AsRef<Path>>(path: P, tile_size: f32) -> Result<Self, TerrainError> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|e| TerrainError::Io(path.to_path_buf(), e))?;
        Self::parse(&contents, tile_size)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, index: usize) -> &Tile {
        &self.tiles[index]
    }

    /// タイル座標からインデックス
    pub fn index_of(&self, x: usize, y: usize) -> Option<usize> {
        (x < self.width && y < self.height).then(|| y * self.width + x)
    }

    /// ワールド座標が属するタイルのインデックス（グリッド外はNone）
    pub fn tile_at_world(&self, position: Vec2) -> Option<usize> {
        if position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        let x = (position.x / self.tile_size) as usize;
        let y = (position.y / self.tile_size) as usize;
        self.index_of(x, y)
    }

    /// タイル中心のワールド座標
    pub fn tile_center(&self, index: usize) -> Vec2 {
        let tile = &self.tiles[index];
        Vec2::new(
            (tile.x as f32 + 0.5) * self.tile_size,
            (tile.y as f32 + 0.5) * self.tile_size,
        )
    }

    /// グリッド全体のワールド領域
    pub fn world_bounds(&self) -> Rect2D {
        Rect2D::new(
            Vec2::ZERO,
            Vec2::new(
                self.width as f32 * self.tile_size,
                self.height as f32 * self.tile_size,
            ),
        )
    }

    /// ワールド座標間の経路を探索
    ///
    /// # 戻り値
    ///
    /// 開始タイルを含むタイル中心のワールド座標列。到達不能・グリッド外の場合は空。
    pub fn get_route(&mut self, start: Vec2, target: Vec2) -> Vec<Vec2> {
        let (Some(start_tile), Some(target_tile)) =
            (self.tile_at_world(start), self.tile_at_world(target))
        else {
            return Vec::new();
        };

        self.find_tile_route(start_tile, target_tile)
            .into_iter()
            .map(|index| self.tile_center(index))
            .collect()
    }

    /// タイル間の最短経路を幅優先探索で求める
    ///
    /// キューの各要素はそこまでの部分経路全体です。隣接タイルが目標と一致した時点で
    /// 探索を終了します。探索中に立てた訪問済みフラグは、成功・失敗にかかわらず
    /// 戻る前に全て元に戻します。
    pub fn find_tile_route(&mut self, start: usize, target: usize) -> Vec<usize> {
        if start == target {
            return vec![start];
        }

        let mut queue: VecDeque<Vec<usize>> = VecDeque::new();
        let mut visited: Vec<usize> = vec![start];
        self.tiles[start].visited = true;
        queue.push_back(vec![start]);

        let mut found: Option<Vec<usize>> = None;
        'search: while let Some(route) = queue.pop_front() {
            let Some(&current) = route.last() else {
                continue;
            };

            for exit_slot in 0..self.tiles[current].exits.len() {
                let exit = self.tiles[current].exits[exit_slot];
                if exit == target {
                    let mut complete = route;
                    complete.push(exit);
                    found = Some(complete);
                    break 'search;
                }
                if !self.tiles[exit].visited {
                    self.tiles[exit].visited = true;
                    visited.push(exit);
                    let mut next = route.clone();
                    next.push(exit);
                    queue.push_back(next);
                }
            }
        }

        for index in visited {
            self.tiles[index].visited = false;
        }

        trace!(
            start,
            target,
            steps = found.as_ref().map(|route| route.len() - 1),
            "ROUTE_SEARCH: 経路探索が完了しました"
        );
        found.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn reference_distance(grid: &Grid, start: usize, target: usize) -> Option<usize> {
        let mut distance = vec![usize::MAX; grid.tiles().len()];
        let mut queue = VecDeque::new();
        distance[start] = 0;
        queue.push_back(start);
        while let Some(current) = queue.pop_front() {
            if current == target {
                return Some(distance[current]);
            }
            for &next in grid.tile(current).exits() {
                if distance[next] == usize::MAX {
                    distance[next] = distance[current] + 1;
                    queue.push_back(next);
                }
            }
        }
        None
    }

    fn assert_all_unvisited(grid: &Grid) {
        assert!(grid.tiles().iter().all(|tile| !tile.is_visited()));
    }

    #[test]
    fn test_parse_layout() {
        let grid = Grid::parse("2\nGmW\nfr\n", 16.0).expect("valid layout");
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.tile(1).kind, TerrainKind::Mountains);
        assert_eq!(grid.tile(3).kind, TerrainKind::Forest);
        assert_eq!(grid.tile(4).kind, TerrainKind::Rocks);
        // 短い行は草地で補完
        assert_eq!(grid.tile(5).kind, TerrainKind::Grass);
    }

    #[test]
    fn test_parse_rejects_bad_header_and_missing_rows() {
        assert!(matches!(Grid::parse("abc\nGG", 16.0), Err(TerrainError::InvalidHeader(_))));
        assert!(matches!(
            Grid::parse("3\nGG\nGG", 16.0),
            Err(TerrainError::MissingRows { declared: 3, actual: 2 })
        ));
        assert!(matches!(Grid::parse("0\n", 16.0), Err(TerrainError::Empty)));
    }

    #[test]
    fn test_exits_exclude_blocking_tiles() {
        let grid = Grid::parse("2\nGW\nGG", 16.0).expect("valid layout");
        // (0,0) の隣接は (0,1) のみ（(1,0) は水域）
        assert_eq!(grid.tile(0).exits(), &[2]);
        assert_eq!(grid.tile(3).exits(), &[2]);
    }

    #[test]
    fn test_blocked_middle_tile_forces_detour() {
        // 3x3 グリッドの中央行で開始と目標の間を山岳が塞ぐ
        let mut grid = Grid::parse("3\nGGG\nGMG\nGGG", 1.0).expect("valid layout");
        let start = grid.index_of(0, 1).expect("in grid");
        let target = grid.index_of(2, 1).expect("in grid");

        let route = grid.find_tile_route(start, target);
        let manhattan = 2;
        assert!(route.len() - 1 > manhattan);
        assert_eq!(route.len() - 1, 4);
        assert_eq!(route.first(), Some(&start));
        assert_eq!(route.last(), Some(&target));
        assert!(!route.contains(&grid.index_of(1, 1).expect("in grid")));
        for pair in route.windows(2) {
            assert!(grid.tile(pair[0]).exits().contains(&pair[1]));
        }
        assert_all_unvisited(&grid);
    }

    #[test]
    fn test_unreachable_target_returns_empty_route() {
        let mut grid = Grid::parse("1\nGWG", 1.0).expect("valid layout");
        assert!(grid.find_tile_route(0, 2).is_empty());
        assert_all_unvisited(&grid);
        assert!(grid.get_route(Vec2::new(0.5, 0.5), Vec2::new(2.5, 0.5)).is_empty());
    }

    #[test]
    fn test_route_outside_grid_is_empty() {
        let mut grid = Grid::parse("1\nGGG", 16.0).expect("valid layout");
        assert!(grid.get_route(Vec2::new(-1.0, 0.0), Vec2::new(20.0, 8.0)).is_empty());
        assert!(grid.get_route(Vec2::new(1.0, 1.0), Vec2::new(200.0, 8.0)).is_empty());
    }

    #[test]
    fn test_world_route_uses_tile_centers() {
        let mut grid = Grid::parse("1\nGGG", 16.0).expect("valid layout");
        let route = grid.get_route(Vec2::new(2.0, 3.0), Vec2::new(40.0, 10.0));
        assert_eq!(
            route,
            vec![Vec2::new(8.0, 8.0), Vec2::new(24.0, 8.0), Vec2::new(40.0, 8.0)]
        );
        assert_eq!(grid.get_route(Vec2::new(2.0, 3.0), Vec2::new(5.0, 5.0)), vec![Vec2::new(8.0, 8.0)]);
    }

    #[test]
    fn test_bfs_matches_reference_distance_on_random_grids() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let width = rng.random_range(3..12);
            let height = rng.random_range(3..12);
            let kinds: Vec<TerrainKind> = (0..width * height)
                .map(|_| {
                    if rng.random_range(0..100) < 25 {
                        TerrainKind::Water
                    } else {
                        TerrainKind::Grass
                    }
                })
                .collect();
            let mut grid = Grid::from_kinds(width, height, kinds, 1.0).expect("valid grid");

            for _ in 0..10 {
                let start = rng.random_range(0..width * height);
                let target = rng.random_range(0..width * height);
                let route = grid.find_tile_route(start, target);
                match reference_distance(&grid, start, target) {
                    Some(distance) => {
                        assert_eq!(route.len() - 1, distance);
                        assert_eq!(route.first(), Some(&start));
                        assert_eq!(route.last(), Some(&target));
                    }
                    None => assert!(route.is_empty()),
                }
                assert_all_unvisited(&grid);
            }
        }
    }
}

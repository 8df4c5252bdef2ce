use grid_util::grid::{BoolGrid, Grid};
use grid_util::point::Point;
use log::{info, warn};
use petgraph::unionfind::UnionFind;
use rand::Rng;
use smallvec::SmallVec;

use core::fmt;

/// Grids with a side below this are clamped up, so that a border ring and at
/// least one interior cell always exist.
pub const MIN_SIDE: usize = 3;

/// Neighbour offsets in +x, +y, -x, -y order. Solvers shuffle a copy of
/// these per visit.
pub(crate) fn cardinal_offsets() -> [Point; 4] {
    [
        Point::new(1, 0),
        Point::new(0, 1),
        Point::new(-1, 0),
        Point::new(0, -1),
    ]
}

/// [MazeGrid] owns the static maze structure and all persistent search
/// state: wall values in a [BoolGrid] ([true] means impassable), the
/// per-cell `visited`/`on_stack`/`on_path` flags a solver writes and a
/// renderer reads, and the parent links recorded when a cell is first
/// discovered. It also maintains information about components of open cells
/// using a [UnionFind] structure, which answers reachability queries without
/// searching. Implements [Grid] by building on [BoolGrid].
///
/// The wall layout is only written through [set](Grid::set) and
/// [generate](Self::generate); solvers never touch it.
#[derive(Clone, Debug)]
pub struct MazeGrid {
    pub grid: BoolGrid,
    /// Cells the search has entered at least once. Monotonic during one
    /// solve.
    pub visited: BoolGrid,
    /// Cells currently on the active search stack. After a successful solve
    /// the whole start-to-goal ancestor chain keeps this flag.
    pub on_stack: BoolGrid,
    /// Cells on the final reconstructed path; all-false until a successful
    /// solve has been reconstructed.
    pub on_path: BoolGrid,
    parents: Vec<Option<Point>>,
    pub components: UnionFind<usize>,
    pub components_dirty: bool,
    start: Point,
    goal: Point,
}

impl Default for MazeGrid {
    fn default() -> MazeGrid {
        MazeGrid::new(MIN_SIDE, MIN_SIDE, false)
    }
}

impl MazeGrid {
    /// Generates a maze in which every interior cell is a wall with
    /// probability `wall_probability`, drawn independently per cell. Cells
    /// on the outer border are always open. The start and goal are clamped
    /// into bounds and carved open regardless of the random draw; walkable
    /// endpoints are a hard postcondition solvers rely on.
    ///
    /// Dimensions below [MIN_SIDE] and probabilities outside [0, 1] are
    /// clamped rather than rejected.
    pub fn generate<R: Rng>(
        width: usize,
        height: usize,
        wall_probability: f64,
        start: Point,
        goal: Point,
        rng: &mut R,
    ) -> MazeGrid {
        let p = wall_probability.clamp(0.0, 1.0);
        if p != wall_probability {
            warn!("Wall probability {} outside [0, 1]: clamped", wall_probability);
        }
        let mut maze = MazeGrid::new(width, height, false);
        for x in 1..maze.width() - 1 {
            for y in 1..maze.height() - 1 {
                maze.grid.set(x, y, rng.gen_bool(p));
            }
        }
        maze.set_endpoints(start, goal);
        maze.generate_components();
        maze
    }

    /// Clamps `start` and `goal` into grid bounds and carves both open.
    pub fn set_endpoints(&mut self, start: Point, goal: Point) {
        self.start = self.clamp_point(start);
        self.goal = self.clamp_point(goal);
        let (start, goal) = (self.start, self.goal);
        self.set_point(start, false);
        self.set_point(goal, false);
    }

    fn clamp_point(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(0, self.width() as i32 - 1),
            p.y.clamp(0, self.height() as i32 - 1),
        )
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn goal(&self) -> Point {
        self.goal
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && self.grid.index_in_bounds(x as usize, y as usize)
    }

    pub fn can_move_to(&self, pos: Point) -> bool {
        self.in_bounds(pos.x, pos.y) && !self.grid.get(pos.x as usize, pos.y as usize)
    }

    /// Wall query. Positions outside the grid read as walls.
    pub fn is_wall(&self, pos: Point) -> bool {
        !self.can_move_to(pos)
    }

    /// Whether the search has entered `pos` at least once this solve.
    pub fn is_visited(&self, pos: Point) -> bool {
        self.in_bounds(pos.x, pos.y) && self.visited.get_point(pos)
    }

    /// Whether `pos` is an ancestor on the active search stack. After a
    /// successful solve the chain from start to goal keeps this flag.
    pub fn is_on_stack(&self, pos: Point) -> bool {
        self.in_bounds(pos.x, pos.y) && self.on_stack.get_point(pos)
    }

    /// Whether `pos` is on the final reconstructed path.
    pub fn is_on_path(&self, pos: Point) -> bool {
        self.in_bounds(pos.x, pos.y) && self.on_path.get_point(pos)
    }

    /// The cell that first discovered `pos` during the current solve, if
    /// any. The start cell never has a parent.
    pub fn parent(&self, pos: Point) -> Option<Point> {
        self.parents[self.get_ix_point(&pos)]
    }

    /// The open cells bordering `point` on the four cardinal sides.
    pub fn open_neighbours(&self, point: Point) -> SmallVec<[Point; 4]> {
        cardinal_offsets()
            .iter()
            .map(|&d| point + d)
            .filter(|p| self.can_move_to(*p))
            .collect()
    }

    /// Clears all search state: the visited/on-stack/on-path flags and the
    /// parent links. Walls and components are untouched. Must run before
    /// each solve; stale visited flags from an earlier run block
    /// re-exploration.
    pub fn reset(&mut self) {
        let (w, h) = (self.width(), self.height());
        self.visited = BoolGrid::new(w, h, false);
        self.on_stack = BoolGrid::new(w, h, false);
        self.on_path = BoolGrid::new(w, h, false);
        self.parents = vec![None; w * h];
    }

    pub(crate) fn enter(&mut self, pos: Point) {
        self.visited.set_point(pos, true);
        self.on_stack.set_point(pos, true);
    }

    pub(crate) fn leave(&mut self, pos: Point) {
        self.on_stack.set_point(pos, false);
    }

    /// Records which cell first discovered `pos`. The first write wins.
    pub(crate) fn record_parent(&mut self, pos: Point, from: Point) {
        let ix = self.get_ix_point(&pos);
        if self.parents[ix].is_none() {
            self.parents[ix] = Some(from);
        }
    }

    pub(crate) fn mark_on_path(&mut self, pos: Point) {
        self.on_path.set_point(pos, true);
    }

    /// Retrieves the component id a given [Point] belongs to.
    pub fn get_component(&self, point: &Point) -> usize {
        self.components.find(self.get_ix_point(point))
    }

    /// Checks if some 4-connected open path connects `from` and `to`.
    pub fn reachable(&self, from: &Point, to: &Point) -> bool {
        !self.unreachable(from, to)
    }

    /// Checks if `from` and `to` are not on the same component.
    pub fn unreachable(&self, from: &Point, to: &Point) -> bool {
        if self.in_bounds(from.x, from.y) && self.in_bounds(to.x, to.y) {
            let from_ix = self.get_ix_point(from);
            let to_ix = self.get_ix_point(to);
            !self.components.equiv(from_ix, to_ix)
        } else {
            true
        }
    }

    /// Regenerates the components if they are marked as dirty.
    pub fn update(&mut self) {
        if self.components_dirty {
            info!("Components are dirty: regenerating components");
            self.generate_components();
        }
    }

    /// Generates a new [UnionFind] structure and links up open grid
    /// neighbours to the same components.
    pub fn generate_components(&mut self) {
        info!("Generating connected components");
        let w = self.grid.width;
        let h = self.grid.height;
        self.components = UnionFind::new(w * h);
        self.components_dirty = false;
        for x in 0..w as i32 {
            for y in 0..h as i32 {
                let point = Point::new(x, y);
                if self.can_move_to(point) {
                    let parent_ix = self.grid.get_ix(x as usize, y as usize);
                    let neighbours = [
                        Point::new(point.x, point.y + 1),
                        Point::new(point.x + 1, point.y),
                    ]
                    .into_iter()
                    .filter(|p| self.can_move_to(*p))
                    .map(|p| self.grid.get_ix(p.x as usize, p.y as usize))
                    .collect::<Vec<usize>>();
                    for ix in neighbours {
                        self.components.union(parent_ix, ix);
                    }
                }
            }
        }
    }
}

impl fmt::Display for MazeGrid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for y in 0..self.grid.height {
            for x in 0..self.grid.width {
                let p = Point::new(x as i32, y as i32);
                let c = if p == self.start {
                    'S'
                } else if p == self.goal {
                    'G'
                } else if self.grid.get(x, y) {
                    '#'
                } else if self.on_path.get(x, y) {
                    '*'
                } else if self.on_stack.get(x, y) {
                    'o'
                } else if self.visited.get(x, y) {
                    ':'
                } else {
                    '.'
                };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Grid<bool> for MazeGrid {
    fn new(width: usize, height: usize, default_value: bool) -> Self {
        let (w, h) = (width.max(MIN_SIDE), height.max(MIN_SIDE));
        if (w, h) != (width, height) {
            warn!("Grid of {}x{} below minimum side {}: clamped", width, height, MIN_SIDE);
        }
        let mut maze = MazeGrid {
            grid: BoolGrid::new(w, h, default_value),
            visited: BoolGrid::new(w, h, false),
            on_stack: BoolGrid::new(w, h, false),
            on_path: BoolGrid::new(w, h, false),
            parents: vec![None; w * h],
            components: UnionFind::new(w * h),
            components_dirty: false,
            start: Point::new(0, 0),
            goal: Point::new(w as i32 - 1, h as i32 - 1),
        };
        // endpoints stay open even when the grid defaults to walls
        maze.grid.set(0, 0, false);
        maze.grid.set(w - 1, h - 1, false);
        maze
    }
    fn get(&self, x: usize, y: usize) -> bool {
        self.grid.get(x, y)
    }
    /// Updates a position on the grid. Joins newly connected components and
    /// flags the components as dirty if components are (potentially) broken
    /// apart into multiple.
    fn set(&mut self, x: usize, y: usize, blocked: bool) {
        let p = Point::new(x as i32, y as i32);
        if self.grid.get(x, y) != blocked && blocked {
            self.components_dirty = true;
        } else {
            let p_ix = self.grid.get_ix(x, y);
            for n in self.open_neighbours(p) {
                self.components
                    .union(p_ix, self.grid.get_ix(n.x as usize, n.y as usize));
            }
        }
        self.grid.set(x, y, blocked);
    }
    fn width(&self) -> usize {
        self.grid.width()
    }
    fn height(&self) -> usize {
        self.grid.height()
    }
}

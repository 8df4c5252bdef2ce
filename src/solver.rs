use grid_util::point::Point;
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use smallvec::SmallVec;

use crate::maze_grid::{cardinal_offsets, MazeGrid};

/// One suspension point of the search. [step](DfsSolver::step) yields
/// exactly one event per call, so a host can interleave rendering or delays
/// between search steps; between two calls the maze state is stable and safe
/// to read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepEvent {
    /// A cell was entered: it is now visited and on the active stack.
    Visit(Point),
    /// A cell was abandoned after exhausting its neighbours: it is no
    /// longer on the active stack.
    Backtrack(Point),
    /// The goal has been reached. Terminal; repeats on further calls.
    Found,
    /// Everything reachable from the start was explored without reaching
    /// the goal. Terminal; repeats on further calls.
    Exhausted,
}

#[derive(Clone, Debug)]
struct Frame {
    cell: Point,
    /// Unexplored neighbour candidates, consumed back to front.
    candidates: SmallVec<[Point; 4]>,
}

impl Frame {
    fn new<R: Rng>(cell: Point, rng: &mut R) -> Frame {
        // The visit order has no bearing on whether a path is found, only on
        // which path is found first.
        let mut offsets = cardinal_offsets();
        offsets.shuffle(rng);
        Frame {
            cell,
            candidates: offsets.iter().map(|&d| cell + d).collect(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    /// The start cell has not been entered yet.
    Pending,
    Running,
    Done { found: bool },
}

/// Depth-first maze solver in the form of an explicit state machine: the
/// recursion stack is a [Vec] of frames holding each ancestor cell and its
/// remaining shuffled neighbour candidates. This decouples solver progress
/// from host frame timing and puts no maze-size bound on the call stack.
///
/// All persistent search state lives in the [MazeGrid]; the solver owns only
/// the transient frame stack. Dropping a solver mid-search aborts it with no
/// cleanup needed, the grid is reset or regenerated before the next run
/// anyway.
#[derive(Clone, Debug)]
pub struct DfsSolver {
    stack: Vec<Frame>,
    state: State,
    goal: Point,
}

impl DfsSolver {
    /// Arms a new search on `maze`, resetting any search state left by an
    /// earlier run. The first [step](Self::step) call enters the start cell.
    pub fn new(maze: &mut MazeGrid) -> DfsSolver {
        maze.reset();
        DfsSolver {
            stack: Vec::new(),
            state: State::Pending,
            goal: maze.goal(),
        }
    }

    /// Advances the search by one suspension point and reports what
    /// happened. Entering the goal still yields [StepEvent::Visit] first;
    /// the following call reports [StepEvent::Found]. Once the goal is
    /// found no frame is popped anymore, so the whole ancestor chain keeps
    /// its on-stack flag.
    pub fn step<R: Rng>(&mut self, maze: &mut MazeGrid, rng: &mut R) -> StepEvent {
        match self.state {
            State::Done { found: true } => StepEvent::Found,
            State::Done { found: false } => StepEvent::Exhausted,
            State::Pending => {
                let start = maze.start();
                maze.enter(start);
                if start == self.goal {
                    self.state = State::Done { found: true };
                } else {
                    self.stack.push(Frame::new(start, rng));
                    self.state = State::Running;
                }
                StepEvent::Visit(start)
            }
            State::Running => self.advance(maze, rng),
        }
    }

    fn advance<R: Rng>(&mut self, maze: &mut MazeGrid, rng: &mut R) -> StepEvent {
        let Some(frame) = self.stack.last_mut() else {
            // the start cell itself backtracked on an earlier call
            self.state = State::Done { found: false };
            info!("Search exhausted without reaching {}", self.goal);
            return StepEvent::Exhausted;
        };
        let cell = frame.cell;
        let next = loop {
            match frame.candidates.pop() {
                Some(n) if maze.can_move_to(n) && !maze.is_visited(n) => break Some(n),
                Some(_) => continue,
                None => break None,
            }
        };
        match next {
            Some(n) => {
                // link back before descending so the chain to `cell` is in
                // place even if the goal turns up deeper
                maze.record_parent(n, cell);
                maze.enter(n);
                if n == self.goal {
                    self.state = State::Done { found: true };
                    info!("Reached {} from {}", n, maze.start());
                } else {
                    self.stack.push(Frame::new(n, rng));
                }
                StepEvent::Visit(n)
            }
            None => {
                maze.leave(cell);
                self.stack.pop();
                StepEvent::Backtrack(cell)
            }
        }
    }

    /// Drives the search to a terminal event without pacing.
    pub fn run<R: Rng>(&mut self, maze: &mut MazeGrid, rng: &mut R) -> bool {
        loop {
            match self.step(maze, rng) {
                StepEvent::Found => return true,
                StepEvent::Exhausted => return false,
                StepEvent::Visit(_) | StepEvent::Backtrack(_) => {}
            }
        }
    }

    pub fn finished(&self) -> bool {
        matches!(self.state, State::Done { .. })
    }

    /// Whether the goal has been reached. [false] both mid-search and after
    /// exhaustion; combine with [finished](Self::finished) to tell the two
    /// apart.
    pub fn found(&self) -> bool {
        matches!(self.state, State::Done { found: true })
    }

    /// Resets `maze` and searches from its start to its goal, returning the
    /// reconstructed start-to-goal path if one was found. On success the
    /// maze's on-path flags are populated; otherwise they stay empty.
    ///
    /// [None] is a normal outcome, not an error: depth-first search is
    /// exhaustive over the cells reachable from the start, so [None] means
    /// no path exists at all.
    pub fn solve<R: Rng>(maze: &mut MazeGrid, rng: &mut R) -> Option<Vec<Point>> {
        let mut solver = DfsSolver::new(maze);
        if solver.run(maze, rng) {
            Some(reconstruct_path(maze))
        } else {
            info!("{} is not reachable from {}", maze.goal(), maze.start());
            None
        }
    }
}

/// Rebuilds the start-to-goal path from the parent links recorded during a
/// successful search, marking every cell on it on-path.
///
/// # Panics
///
/// Panics if the goal was never reached: a goal-side cell without a parent
/// link means the caller skipped the search or ignored a failed result.
pub fn reconstruct_path(maze: &mut MazeGrid) -> Vec<Point> {
    let start = maze.start();
    let mut path: Vec<Point> = itertools::unfold(Some(maze.goal()), |state| {
        let cell = (*state)?;
        *state = if cell == start {
            None
        } else {
            let parent = maze.parent(cell);
            assert!(
                parent.is_some(),
                "path reconstruction requires a successful search: {} has no parent",
                cell
            );
            parent
        };
        Some(cell)
    })
    .collect();
    path.reverse();
    for cell in &path {
        maze.mark_on_path(*cell);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use grid_util::grid::Grid;
    use rand::prelude::*;

    /// Asserts that the case in which start and goal are equal is handled
    /// correctly.
    #[test]
    fn equal_start_goal() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut maze = MazeGrid::new(3, 3, false);
        maze.set_endpoints(Point::new(1, 1), Point::new(1, 1));
        let path = DfsSolver::solve(&mut maze, &mut rng).unwrap();
        assert_eq!(path, vec![Point::new(1, 1)]);
        assert!(maze.is_on_path(Point::new(1, 1)));
    }

    /// Asserts that a valid path around the obstacle is found.
    #[test]
    fn solve_simple_problem() {
        //  ___
        // |S  |
        // | # |
        // |  G|
        //  ___
        let mut rng = StdRng::seed_from_u64(0);
        let mut maze = MazeGrid::new(3, 3, false);
        maze.set(1, 1, true);
        maze.set_endpoints(Point::new(0, 0), Point::new(2, 2));
        let path = DfsSolver::solve(&mut maze, &mut rng).unwrap();
        assert_eq!(*path.first().unwrap(), maze.start());
        assert_eq!(*path.last().unwrap(), maze.goal());
        for pair in path.windows(2) {
            assert_eq!(pair[0].manhattan_distance(&pair[1]), 1);
        }
        for cell in &path {
            assert!(!maze.is_wall(*cell));
            assert!(maze.is_on_path(*cell));
        }
    }

    #[test]
    fn first_event_visits_start_and_terminal_repeats() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut maze = MazeGrid::new(3, 3, false);
        maze.set_endpoints(Point::new(0, 0), Point::new(2, 2));
        let mut solver = DfsSolver::new(&mut maze);
        assert_eq!(
            solver.step(&mut maze, &mut rng),
            StepEvent::Visit(Point::new(0, 0))
        );
        assert!(solver.run(&mut maze, &mut rng));
        assert_eq!(solver.step(&mut maze, &mut rng), StepEvent::Found);
        assert_eq!(solver.step(&mut maze, &mut rng), StepEvent::Found);
        assert!(solver.finished() && solver.found());
    }

    /// Every cell is visited at most once, and the step count is bounded by
    /// one visit and one backtrack per cell.
    #[test]
    fn no_revisits_and_bounded_steps() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut maze = MazeGrid::generate(
            9,
            9,
            0.4,
            Point::new(0, 0),
            Point::new(8, 8),
            &mut rng,
        );
        let mut solver = DfsSolver::new(&mut maze);
        let mut visits = Vec::new();
        let mut steps = 0;
        loop {
            steps += 1;
            assert!(steps <= 2 * 9 * 9 + 1);
            match solver.step(&mut maze, &mut rng) {
                StepEvent::Visit(cell) => visits.push(cell),
                StepEvent::Backtrack(_) => {}
                StepEvent::Found | StepEvent::Exhausted => break,
            }
        }
        let mut unique = visits.clone();
        unique.sort_by_key(|p| (p.x, p.y));
        unique.dedup();
        assert_eq!(unique.len(), visits.len());
    }

    /// After a successful solve the ancestor chain keeps its on-stack flag,
    /// while backtracked dead ends do not.
    #[test]
    fn success_leaves_ancestors_on_stack() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut maze = MazeGrid::generate(
            9,
            9,
            0.3,
            Point::new(0, 0),
            Point::new(8, 8),
            &mut rng,
        );
        let path = DfsSolver::solve(&mut maze, &mut rng).unwrap();
        for cell in &path {
            assert!(maze.is_on_stack(*cell));
        }
        for x in 0..9 {
            for y in 0..9 {
                let p = Point::new(x, y);
                if maze.is_visited(p) && !maze.is_on_path(p) {
                    assert!(!maze.is_on_stack(p));
                }
            }
        }
    }

    /// An isolated goal makes the search exhaust the reachable cells and
    /// leave the on-path flags empty.
    #[test]
    fn isolated_goal_exhausts() {
        //  _____
        // |S    |
        // | ### |
        // | #G# |
        // | ### |
        // |     |
        //  _____
        let mut rng = StdRng::seed_from_u64(4);
        let mut maze = MazeGrid::new(5, 5, false);
        for (x, y) in [
            (1, 1),
            (2, 1),
            (3, 1),
            (1, 2),
            (3, 2),
            (1, 3),
            (2, 3),
            (3, 3),
        ] {
            maze.set(x, y, true);
        }
        maze.set_endpoints(Point::new(0, 0), Point::new(2, 2));
        maze.generate_components();
        assert!(maze.unreachable(&maze.start(), &maze.goal()));
        assert!(DfsSolver::solve(&mut maze, &mut rng).is_none());
        for x in 0..5 {
            for y in 0..5 {
                assert!(!maze.is_on_path(Point::new(x, y)));
            }
        }
    }

    /// Repeated solves on the same walls agree on whether a path exists,
    /// independent of the shuffle seed.
    #[test]
    fn repeated_solves_agree() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut maze = MazeGrid::generate(
            8,
            8,
            0.35,
            Point::new(0, 0),
            Point::new(7, 7),
            &mut rng,
        );
        let first = DfsSolver::solve(&mut maze, &mut StdRng::seed_from_u64(6)).is_some();
        let second = DfsSolver::solve(&mut maze, &mut StdRng::seed_from_u64(7)).is_some();
        assert_eq!(first, second);
    }

    #[test]
    #[should_panic(expected = "path reconstruction requires a successful search")]
    fn reconstruction_without_success_panics() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut maze = MazeGrid::new(5, 5, false);
        for (x, y) in [
            (1, 1),
            (2, 1),
            (3, 1),
            (1, 2),
            (3, 2),
            (1, 3),
            (2, 3),
            (3, 3),
        ] {
            maze.set(x, y, true);
        }
        maze.set_endpoints(Point::new(0, 0), Point::new(2, 2));
        assert!(DfsSolver::solve(&mut maze, &mut rng).is_none());
        reconstruct_path(&mut maze);
    }
}

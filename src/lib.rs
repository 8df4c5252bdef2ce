//! # grid_maze
//!
//! A grid-based maze system. Generates grids with independently placed
//! random walls and solves them with
//! [depth-first search](https://en.wikipedia.org/wiki/Depth-first_search),
//! exposing the search's internal progress (cells on the active stack,
//! explored dead ends, the final reconstructed path) as queryable per-cell
//! state so an external renderer can draw it, optionally one step at a
//! time. Pre-computes
//! [connected components](https://en.wikipedia.org/wiki/Component_(graph_theory))
//! so hosts can check reachability without running a search.
pub mod maze_grid;
pub mod solver;

pub use maze_grid::MazeGrid;
pub use solver::{reconstruct_path, DfsSolver, StepEvent};

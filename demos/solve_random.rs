use grid_maze::{DfsSolver, MazeGrid};
use grid_util::point::Point;
use rand::rngs::StdRng;
use rand::SeedableRng;

// Generates a random 20x10 maze and solves it corner to corner in one go,
// printing the result:
// - # marks a wall
// - S marks the start, G the goal
// - * marks the found path
// - : marks explored cells off the final path

fn main() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut maze = MazeGrid::generate(
        20,
        10,
        0.35,
        Point::new(0, 0),
        Point::new(19, 9),
        &mut rng,
    );
    match DfsSolver::solve(&mut maze, &mut rng) {
        Some(path) => println!("Found a path of {} cells:\n{}", path.len(), maze),
        None => println!("No path exists:\n{}", maze),
    }
}

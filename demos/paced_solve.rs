use grid_maze::solver::{reconstruct_path, DfsSolver, StepEvent};
use grid_maze::MazeGrid;
use grid_util::point::Point;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::thread;
use std::time::Duration;

// Drives the solver one suspension point at a time, redrawing the maze with
// a small delay between steps. The pacing lives entirely here in the host;
// the solver only promises to advance by one event per step call.

fn main() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut maze = MazeGrid::generate(
        16,
        8,
        0.3,
        Point::new(0, 0),
        Point::new(15, 7),
        &mut rng,
    );
    let mut solver = DfsSolver::new(&mut maze);
    loop {
        let event = solver.step(&mut maze, &mut rng);
        println!("{:?}\n{}", event, maze);
        thread::sleep(Duration::from_millis(40));
        match event {
            StepEvent::Found => {
                let path = reconstruct_path(&mut maze);
                println!("Found a path of {} cells:\n{}", path.len(), maze);
                break;
            }
            StepEvent::Exhausted => {
                println!("No path exists:\n{}", maze);
                break;
            }
            StepEvent::Visit(_) | StepEvent::Backtrack(_) => {}
        }
    }
}

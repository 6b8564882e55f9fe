use crate::grid::GridShape;
use rand::seq::SliceRandom;
use rand::Rng;

/// Random-walk scramble: `steps` times, swap a random element with a
/// random neighbour given by `adjacency`.
///
/// No minimum distance from the input is enforced, so a short walk can
/// land back on the original arrangement. Indices without neighbours are
/// skipped for that step.
pub fn scramble<T, R, F>(initial: &[T], steps: usize, adjacency: F, rng: &mut R) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
    F: Fn(usize) -> Vec<usize>,
{
    let mut grid = initial.to_vec();
    if grid.len() < 2 {
        return grid;
    }
    for _ in 0..steps {
        let i = rng.gen_range(0..grid.len());
        let neighbors = adjacency(i);
        if let Some(&j) = neighbors.choose(rng) {
            if j < grid.len() {
                grid.swap(i, j);
            }
        }
    }
    grid
}

/// Scramble a row-major grid using 4-neighbour adjacency
pub fn scramble_grid<T, R>(initial: &[T], shape: GridShape, steps: usize, rng: &mut R) -> Vec<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    scramble(initial, steps, |i| shape.neighbors(i), rng)
}

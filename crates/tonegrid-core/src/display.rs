use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

/// Maps on-screen positions to logical cells.
///
/// Shuffle mode moves tiles around the screen without touching the
/// puzzle; the engine only ever sees logical indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayMap {
    logical_of: Vec<usize>,
}

impl DisplayMap {
    pub fn identity(len: usize) -> Self {
        Self {
            logical_of: (0..len).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.logical_of.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logical_of.is_empty()
    }

    pub fn is_identity(&self) -> bool {
        self.logical_of.iter().enumerate().all(|(d, &l)| d == l)
    }

    /// Logical cell shown at display position `display`
    pub fn to_logical(&self, display: usize) -> Option<usize> {
        self.logical_of.get(display).copied()
    }

    /// Display position where logical cell `logical` is shown
    pub fn to_display(&self, logical: usize) -> Option<usize> {
        self.logical_of.iter().position(|&l| l == logical)
    }

    /// Logical cell for each display position, in display order
    pub fn as_slice(&self) -> &[usize] {
        &self.logical_of
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.logical_of.shuffle(rng);
    }
}

use crate::catalog::GameKey;
use crate::error::{GameError, Result};
use crate::grid::GridShape;
use serde::Serialize;
use std::time::Duration;

/// Game-specific difficulty knobs carried by a level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum LevelExtra {
    /// Seek needs nothing beyond the grid itself
    Pairs,
    /// Number of cues to repeat and the spacing between them
    Sequence { length: usize, delay_ms: u64 },
    /// Random adjacent swaps applied to the reference grid
    Scramble { steps: usize },
}

/// Layout and difficulty of one level
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LevelConfig {
    pub game: GameKey,
    pub level: u32,
    pub rows: usize,
    pub columns: usize,
    pub cell_width: f32,
    pub cell_height: f32,
    pub cell_spacing: f32,
    pub extra: LevelExtra,
}

impl LevelConfig {
    pub fn shape(&self) -> GridShape {
        GridShape::new(self.rows, self.columns)
    }

    pub fn total_cells(&self) -> usize {
        self.rows * self.columns
    }

    /// Sequence length, if this is a sequencer level
    pub fn sequence_length(&self) -> Option<usize> {
        match self.extra {
            LevelExtra::Sequence { length, .. } => Some(length),
            _ => None,
        }
    }

    /// Spacing between played-back cues, if this is a sequencer level
    pub fn sequence_delay(&self) -> Option<Duration> {
        match self.extra {
            LevelExtra::Sequence { delay_ms, .. } => Some(Duration::from_millis(delay_ms)),
            _ => None,
        }
    }

    /// Scramble step count, if this is a sync level
    pub fn scramble_steps(&self) -> Option<usize> {
        match self.extra {
            LevelExtra::Scramble { steps } => Some(steps),
            _ => None,
        }
    }
}

// (rows, columns, cell size, spacing)
const SEEK_TABLE: [(usize, usize, f32, f32); 25] = [
    (2, 2, 120.0, 12.0),
    (2, 3, 110.0, 12.0),
    (3, 3, 100.0, 10.0),
    (3, 4, 96.0, 10.0),
    (4, 4, 88.0, 10.0),
    (4, 4, 84.0, 8.0),
    (4, 5, 80.0, 8.0),
    (4, 5, 76.0, 8.0),
    (5, 5, 72.0, 8.0),
    (5, 5, 70.0, 8.0),
    (5, 6, 66.0, 6.0),
    (5, 6, 64.0, 6.0),
    (6, 6, 60.0, 6.0),
    (6, 6, 58.0, 6.0),
    (6, 6, 56.0, 6.0),
    (6, 7, 54.0, 6.0),
    (6, 7, 52.0, 6.0),
    (6, 7, 50.0, 5.0),
    (7, 7, 48.0, 5.0),
    (7, 7, 47.0, 5.0),
    (7, 7, 46.0, 5.0),
    (7, 8, 45.0, 5.0),
    (7, 8, 44.0, 4.0),
    (8, 8, 43.0, 4.0),
    (8, 8, 42.0, 4.0),
];

// (rows, columns, cell size, spacing, sequence length, delay ms)
const SEQUENCER_TABLE: [(usize, usize, f32, f32, usize, u64); 25] = [
    (2, 2, 140.0, 16.0, 3, 900),
    (2, 2, 140.0, 16.0, 4, 880),
    (2, 2, 140.0, 16.0, 4, 850),
    (2, 3, 130.0, 14.0, 5, 820),
    (2, 3, 130.0, 14.0, 5, 800),
    (3, 3, 120.0, 12.0, 5, 780),
    (3, 3, 120.0, 12.0, 6, 750),
    (3, 3, 120.0, 12.0, 6, 720),
    (3, 3, 116.0, 12.0, 7, 700),
    (3, 4, 110.0, 10.0, 7, 680),
    (3, 4, 110.0, 10.0, 7, 660),
    (3, 4, 106.0, 10.0, 8, 640),
    (4, 4, 100.0, 10.0, 8, 620),
    (4, 4, 100.0, 10.0, 8, 600),
    (4, 4, 96.0, 10.0, 9, 580),
    (4, 4, 96.0, 8.0, 9, 560),
    (4, 5, 90.0, 8.0, 10, 540),
    (4, 5, 90.0, 8.0, 10, 520),
    (4, 5, 86.0, 8.0, 10, 500),
    (5, 5, 80.0, 8.0, 11, 480),
    (5, 5, 80.0, 8.0, 11, 460),
    (5, 5, 76.0, 6.0, 12, 440),
    (5, 5, 76.0, 6.0, 12, 420),
    (5, 6, 72.0, 6.0, 13, 400),
    (5, 6, 70.0, 6.0, 14, 380),
];

// (rows, columns, cell size, spacing, scramble steps)
const SYNC_TABLE: [(usize, usize, f32, f32, usize); 25] = [
    (2, 2, 130.0, 12.0, 2),
    (2, 2, 130.0, 12.0, 3),
    (2, 3, 120.0, 12.0, 4),
    (2, 3, 120.0, 12.0, 5),
    (3, 3, 110.0, 10.0, 6),
    (3, 3, 110.0, 10.0, 8),
    (3, 3, 106.0, 10.0, 10),
    (3, 4, 100.0, 10.0, 12),
    (3, 4, 100.0, 10.0, 14),
    (3, 4, 96.0, 8.0, 16),
    (4, 4, 90.0, 8.0, 18),
    (4, 4, 90.0, 8.0, 20),
    (4, 4, 86.0, 8.0, 22),
    (4, 4, 86.0, 8.0, 24),
    (4, 5, 80.0, 8.0, 27),
    (4, 5, 80.0, 8.0, 30),
    (4, 5, 76.0, 6.0, 33),
    (5, 5, 72.0, 6.0, 36),
    (5, 5, 72.0, 6.0, 40),
    (5, 5, 70.0, 6.0, 44),
    (5, 5, 68.0, 6.0, 48),
    (5, 6, 64.0, 6.0, 52),
    (5, 6, 62.0, 6.0, 56),
    (6, 6, 58.0, 5.0, 60),
    (6, 6, 56.0, 5.0, 65),
];

/// Look up the layout of `level` (1-based) for `game`
pub fn level_config(game: GameKey, level: u32) -> Result<LevelConfig> {
    let not_found = GameError::ConfigNotFound { game, level };
    if !game.is_active() || level == 0 || level > game.level_count() {
        return Err(not_found);
    }
    let idx = (level - 1) as usize;

    let config = match game {
        GameKey::Seek => {
            let (rows, columns, size, spacing) = *SEEK_TABLE.get(idx).ok_or(not_found)?;
            LevelConfig {
                game,
                level,
                rows,
                columns,
                cell_width: size,
                cell_height: size,
                cell_spacing: spacing,
                extra: LevelExtra::Pairs,
            }
        }
        GameKey::Sequencer => {
            let (rows, columns, size, spacing, length, delay_ms) =
                *SEQUENCER_TABLE.get(idx).ok_or(not_found)?;
            LevelConfig {
                game,
                level,
                rows,
                columns,
                cell_width: size,
                cell_height: size,
                cell_spacing: spacing,
                extra: LevelExtra::Sequence { length, delay_ms },
            }
        }
        GameKey::Sync => {
            let (rows, columns, size, spacing, steps) = *SYNC_TABLE.get(idx).ok_or(not_found)?;
            LevelConfig {
                game,
                level,
                rows,
                columns,
                cell_width: size,
                cell_height: size,
                cell_spacing: spacing,
                extra: LevelExtra::Scramble { steps },
            }
        }
        _ => return Err(not_found),
    };
    Ok(config)
}

/// All levels of a game in order; empty for inactive games
pub fn levels(game: GameKey) -> impl Iterator<Item = LevelConfig> {
    (1..=game.level_count()).filter_map(move |level| level_config(game, level).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_degenerate_grids() {
        for game in GameKey::active() {
            for level in 1..=25 {
                let config = level_config(game, level).unwrap();
                assert!(config.rows >= 1 && config.columns >= 1);
                assert!(config.total_cells() >= 2, "{} level {}", game, level);
            }
        }
    }

    #[test]
    fn test_out_of_range_levels() {
        assert_eq!(
            level_config(GameKey::Seek, 0),
            Err(GameError::ConfigNotFound { game: GameKey::Seek, level: 0 })
        );
        assert!(level_config(GameKey::Sync, 26).is_err());
        assert!(level_config(GameKey::Tempo, 1).is_err());
    }

    #[test]
    fn test_seek_first_level_is_two_by_two() {
        let config = level_config(GameKey::Seek, 1).unwrap();
        assert_eq!((config.rows, config.columns), (2, 2));
        assert_eq!(config.extra, LevelExtra::Pairs);
    }

    #[test]
    fn test_difficulty_curves_are_monotonic() {
        let seek: Vec<_> = levels(GameKey::Seek).collect();
        for pair in seek.windows(2) {
            assert!(pair[1].cell_width <= pair[0].cell_width);
            assert!(pair[1].total_cells() >= pair[0].total_cells());
        }

        let seq: Vec<_> = levels(GameKey::Sequencer).collect();
        for pair in seq.windows(2) {
            assert!(pair[1].sequence_length() >= pair[0].sequence_length());
            assert!(pair[1].sequence_delay() < pair[0].sequence_delay());
        }

        let sync: Vec<_> = levels(GameKey::Sync).collect();
        for pair in sync.windows(2) {
            assert!(pair[1].scramble_steps() > pair[0].scramble_steps());
        }
    }

    #[test]
    fn test_extra_only_for_owner() {
        let seq = level_config(GameKey::Sequencer, 5).unwrap();
        assert_eq!(seq.sequence_length(), Some(5));
        assert_eq!(seq.scramble_steps(), None);

        let sync = level_config(GameKey::Sync, 5).unwrap();
        assert_eq!(sync.scramble_steps(), Some(6));
        assert_eq!(sync.sequence_delay(), None);
    }
}

//! Preference ranking of the test colors.

use crate::error::{ExperimentError, Result};
use crate::log::TrialLog;
use crate::presenter::Presenter;
use crate::rig::{Keyboard, Screen};
use colorpref_core::{Color, Key, PreferenceRecord};
use colorpref_timing::Timer;
use rand::Rng;
use std::io::Write;
use tracing::{debug, info};

/// Cursor and rank assignments while the subject is ranking.
///
/// Each rank is held by at most one color; assigning a held rank moves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranking {
    colors: Vec<Color>,
    ranks: Vec<Option<u8>>,
    cursor: usize,
}

impl Ranking {
    pub fn new(colors: &[Color]) -> Result<Self> {
        if !(2..=9).contains(&colors.len()) {
            return Err(ExperimentError::config(format!(
                "ranking needs 2..=9 colors, got {}",
                colors.len()
            )));
        }
        Ok(Self {
            colors: colors.to_vec(),
            ranks: vec![None; colors.len()],
            cursor: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn colors(&self) -> &[Color] {
        &self.colors
    }

    pub fn ranks(&self) -> &[Option<u8>] {
        &self.ranks
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Keys that mean something on the ranking screen.
    pub fn keys(&self) -> Vec<Key> {
        let mut keys = vec![Key::Left, Key::Right, Key::Reset];
        keys.extend(Key::digits(self.len() as u8));
        keys
    }

    pub fn apply(&mut self, key: Key) {
        let n = self.len();
        match key {
            Key::Left => self.cursor = self.cursor.saturating_sub(1),
            Key::Right => self.cursor = (self.cursor + 1).min(n - 1),
            Key::Reset => self.ranks.iter_mut().for_each(|r| *r = None),
            Key::Digit(d) if (1..=n as u8).contains(&d) => {
                for held in self.ranks.iter_mut().filter(|r| **r == Some(d)) {
                    *held = None;
                }
                self.ranks[self.cursor] = Some(d);
            }
            _ => {}
        }
    }

    pub fn assigned(&self) -> usize {
        self.ranks.iter().flatten().count()
    }

    pub fn is_complete(&self) -> bool {
        self.assigned() == self.len()
    }

    pub fn holder_of(&self, rank: u8) -> Option<Color> {
        self.ranks
            .iter()
            .position(|r| *r == Some(rank))
            .map(|i| self.colors[i])
    }

    /// Committed ranking, once every color has a rank.
    pub fn record(&self) -> Option<PreferenceRecord> {
        self.is_complete().then(|| PreferenceRecord {
            ranks: self
                .colors
                .iter()
                .zip(&self.ranks)
                .filter_map(|(c, r)| r.map(|r| (*c, r)))
                .collect(),
        })
    }

    /// Most and least favorite colors.
    pub fn extremes(&self) -> Option<(Color, Color)> {
        Some((self.holder_of(1)?, self.holder_of(self.len() as u8)?))
    }
}

/// Collects a complete ranking, logs it and returns the most and least
/// favorite colors.
pub fn collect<D, T, R, W>(
    p: &mut Presenter<D, T, R>,
    log: &mut TrialLog<W>,
    colors: &[Color],
) -> Result<(Color, Color)>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
    W: Write,
{
    let mut ranking = Ranking::new(colors)?;
    let keys = ranking.keys();
    let record = loop {
        if let Some(record) = ranking.record() {
            break record;
        }
        let frame = p
            .scene
            .preference(ranking.colors(), ranking.ranks(), ranking.cursor());
        let key = p.ask(&frame, &keys)?;
        ranking.apply(key);
        debug!(%key, assigned = ranking.assigned(), "ranking input");
        p.display.clear();
    };
    log.record(&record)?;
    let (most, least) = ranking
        .extremes()
        .ok_or_else(|| ExperimentError::config("ranking finished without extremes"))?;
    info!(%most, %least, "preference ranking complete");
    Ok((most, least))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn colors(n: u8) -> Vec<Color> {
        (0..n).map(|i| Color::new(i, 0, 0)).collect()
    }

    #[test]
    fn assigning_a_held_rank_moves_it() {
        let mut r = Ranking::new(&colors(3)).unwrap();
        r.apply(Key::Digit(1));
        r.apply(Key::Right);
        r.apply(Key::Digit(1));
        assert_eq!(r.ranks(), &[None, Some(1), None]);
        assert_eq!(r.assigned(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut r = Ranking::new(&colors(2)).unwrap();
        r.apply(Key::Digit(2));
        r.apply(Key::Reset);
        assert_eq!(r.assigned(), 0);
        assert!(r.record().is_none());
    }

    #[test]
    fn cursor_is_clamped() {
        let mut r = Ranking::new(&colors(3)).unwrap();
        r.apply(Key::Left);
        assert_eq!(r.cursor(), 0);
        for _ in 0..5 {
            r.apply(Key::Right);
        }
        assert_eq!(r.cursor(), 2);
    }

    #[test]
    fn out_of_range_digits_are_ignored() {
        let mut r = Ranking::new(&colors(3)).unwrap();
        r.apply(Key::Digit(4));
        assert_eq!(r.assigned(), 0);
    }

    #[test]
    fn rejects_unrankable_sets() {
        assert!(Ranking::new(&colors(1)).is_err());
        assert!(Ranking::new(&colors(10)).is_err());
    }

    #[test]
    fn complete_ranking_logs_in_color_order() {
        let mut r = Ranking::new(&[Color::new(8, 0, 0), Color::new(0, 3, 0)]).unwrap();
        r.apply(Key::Digit(2));
        r.apply(Key::Right);
        r.apply(Key::Digit(1));
        assert_eq!(
            r.record().unwrap().to_string(),
            "preferences: (8,0,0)2 (0,3,0)1"
        );
        assert_eq!(
            r.extremes(),
            Some((Color::new(0, 3, 0), Color::new(8, 0, 0)))
        );
    }

    fn key_strategy() -> impl Strategy<Value = Key> {
        prop_oneof![
            Just(Key::Left),
            Just(Key::Right),
            Just(Key::Reset),
            (1u8..=9).prop_map(Key::Digit),
        ]
    }

    proptest! {
        #[test]
        fn ranks_stay_unique(n in 2u8..=9, keys in prop::collection::vec(key_strategy(), 0..80)) {
            let mut r = Ranking::new(&colors(n)).unwrap();
            for key in keys {
                r.apply(key);
                let mut held: Vec<u8> = r.ranks().iter().flatten().copied().collect();
                let count = held.len();
                held.sort_unstable();
                held.dedup();
                prop_assert_eq!(held.len(), count);
                prop_assert!(held.iter().all(|&k| (1..=n).contains(&k)));
            }
            if let Some(record) = r.record() {
                let mut ranks: Vec<u8> = record.ranks.iter().map(|(_, k)| *k).collect();
                ranks.sort_unstable();
                prop_assert_eq!(ranks, (1..=n).collect::<Vec<_>>());
                let (most, least) = r.extremes().unwrap();
                prop_assert_ne!(most, least);
            }
        }
    }
}

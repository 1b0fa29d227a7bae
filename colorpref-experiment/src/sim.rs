//! A display and keyboard that exist only in memory.
//!
//! Every `present` advances a shared [`ManualTimer`] by one refresh period,
//! so wall-clock latencies measured by the runners come out as exact frame
//! multiples. Keys come from three sources, checked in order: keys scheduled
//! a number of frames after the most recent `wait`, a queue of answers for
//! blocking waits, and an optional [`Subject`] that sees every frame.

use crate::error::{ExperimentError, Result};
use crate::rig::{Keyboard, Screen};
use colorpref_core::{Frame, Key};
use colorpref_timing::{FrameClock, ManualTimer};
use std::collections::VecDeque;
use std::time::Duration;

/// Give up on a subject that keeps answering with keys nobody asked for.
const MAX_REJECTED_ANSWERS: usize = 64;

/// A scripted participant.
pub trait Subject {
    fn see(&mut self, _frame: &Frame) {}

    /// Non-blocking response, `frames` refreshes after the last wait returned.
    fn react(&mut self, _allowed: &[Key], _frames: u64) -> Option<Key> {
        None
    }

    /// Answer to a blocking wait; `None` means the subject walked away.
    fn answer(&mut self, allowed: &[Key]) -> Option<Key>;
}

pub struct SimulatedRig {
    timer: ManualTimer,
    period: Duration,
    aspect: f32,
    presented: u64,
    anchor: u64,
    timed: Vec<(u64, Key)>,
    answers: VecDeque<Key>,
    subject: Option<Box<dyn Subject>>,
    last_frame: Option<Frame>,
}

impl SimulatedRig {
    pub fn new(refresh_rate: u32) -> Self {
        Self {
            timer: ManualTimer::new(),
            period: FrameClock::new(refresh_rate).period(),
            aspect: 16.0 / 9.0,
            presented: 0,
            anchor: 0,
            timed: Vec::new(),
            answers: VecDeque::new(),
            subject: None,
            last_frame: None,
        }
    }

    pub fn aspect(mut self, aspect: f32) -> Self {
        self.aspect = aspect;
        self
    }

    /// Keys handed out, in order, to blocking waits.
    pub fn answers(mut self, keys: impl IntoIterator<Item = Key>) -> Self {
        self.answers.extend(keys);
        self
    }

    /// A key press `frames` refreshes after the most recent wait returns.
    pub fn key_after(mut self, frames: u64, key: Key) -> Self {
        self.timed.push((frames, key));
        self
    }

    pub fn subject(mut self, subject: impl Subject + 'static) -> Self {
        self.subject = Some(Box::new(subject));
        self
    }

    /// Clone of the rig's clock, for the runner under test.
    pub fn timer(&self) -> ManualTimer {
        self.timer.clone()
    }

    pub fn frames_presented(&self) -> u64 {
        self.presented
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.last_frame.as_ref()
    }

    fn since_wait(&self) -> u64 {
        self.presented - self.anchor
    }

    fn accept(key: Key, allowed: &[Key]) -> Result<Option<Key>> {
        if key == Key::Escape {
            Err(ExperimentError::Aborted)
        } else if allowed.contains(&key) {
            Ok(Some(key))
        } else {
            Ok(None)
        }
    }
}

impl Screen for SimulatedRig {
    fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.presented += 1;
        self.timer.advance(self.period);
        if let Some(subject) = self.subject.as_mut() {
            subject.see(frame);
        }
        self.last_frame = Some(frame.clone());
        Ok(())
    }
}

impl Keyboard for SimulatedRig {
    fn poll(&mut self, allowed: &[Key]) -> Result<Option<Key>> {
        let since = self.since_wait();
        if let Some(i) = self
            .timed
            .iter()
            .position(|&(at, key)| at <= since && (key == Key::Escape || allowed.contains(&key)))
        {
            let (_, key) = self.timed.remove(i);
            return Self::accept(key, allowed);
        }
        match self.subject.as_mut().and_then(|s| s.react(allowed, since)) {
            Some(key) => Self::accept(key, allowed),
            None => Ok(None),
        }
    }

    fn wait(&mut self, allowed: &[Key]) -> Result<Key> {
        let key = loop {
            if let Some(key) = self.answers.pop_front() {
                if let Some(key) = Self::accept(key, allowed)? {
                    break key;
                }
                continue;
            }
            let subject = self.subject.as_mut().ok_or(ExperimentError::InputClosed)?;
            let mut rejected = 0;
            let key = loop {
                let key = subject.answer(allowed).ok_or(ExperimentError::InputClosed)?;
                if let Some(key) = Self::accept(key, allowed)? {
                    break key;
                }
                rejected += 1;
                if rejected >= MAX_REJECTED_ANSWERS {
                    return Err(ExperimentError::InputClosed);
                }
            };
            break key;
        };
        self.anchor = self.presented;
        Ok(key)
    }

    fn clear(&mut self) {
        let since = self.since_wait();
        self.timed.retain(|&(at, _)| at > since);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorpref_timing::Timer;

    struct AlwaysSpace;

    impl Subject for AlwaysSpace {
        fn answer(&mut self, _allowed: &[Key]) -> Option<Key> {
            Some(Key::Space)
        }
    }

    #[test]
    fn presents_advance_the_clock() {
        let mut rig = SimulatedRig::new(60);
        let timer = rig.timer();
        let start = timer.now();
        for _ in 0..3 {
            rig.present(&Frame::default()).unwrap();
        }
        assert_eq!(timer.elapsed(start), Duration::from_nanos(3 * 16_666_666));
        assert_eq!(rig.frames_presented(), 3);
    }

    #[test]
    fn timed_keys_are_relative_to_last_wait() {
        let mut rig = SimulatedRig::new(60)
            .answers([Key::Space])
            .key_after(2, Key::Space);
        rig.present(&Frame::default()).unwrap();
        assert_eq!(rig.wait(&[Key::Space]).unwrap(), Key::Space);
        rig.present(&Frame::default()).unwrap();
        assert_eq!(rig.poll(&[Key::Space]).unwrap(), None);
        rig.present(&Frame::default()).unwrap();
        assert_eq!(rig.poll(&[Key::Space]).unwrap(), Some(Key::Space));
        assert_eq!(rig.poll(&[Key::Space]).unwrap(), None);
    }

    #[test]
    fn disallowed_answers_are_discarded() {
        let mut rig = SimulatedRig::new(60).answers([Key::Up, Key::Left]);
        assert_eq!(rig.wait(&Key::DIRECTIONS).unwrap(), Key::Left);
        assert!(matches!(
            rig.wait(&Key::DIRECTIONS),
            Err(ExperimentError::InputClosed)
        ));
    }

    #[test]
    fn escape_aborts_everywhere() {
        let mut rig = SimulatedRig::new(60)
            .answers([Key::Escape])
            .key_after(0, Key::Escape);
        assert!(rig.poll(&[Key::Space]).unwrap_err().is_abort());
        assert!(rig.wait(&[Key::Space]).unwrap_err().is_abort());
    }

    #[test]
    fn clear_drops_due_keys_only() {
        let mut rig = SimulatedRig::new(60)
            .key_after(0, Key::Space)
            .key_after(5, Key::Space);
        rig.clear();
        assert_eq!(rig.poll(&[Key::Space]).unwrap(), None);
        for _ in 0..5 {
            rig.present(&Frame::default()).unwrap();
        }
        assert_eq!(rig.poll(&[Key::Space]).unwrap(), Some(Key::Space));
    }

    #[test]
    fn subject_answers_when_queue_is_empty() {
        let mut rig = SimulatedRig::new(60).subject(AlwaysSpace);
        assert_eq!(rig.wait(&[Key::Space]).unwrap(), Key::Space);
    }
}

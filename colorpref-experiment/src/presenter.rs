use crate::error::Result;
use crate::mask::MaskSequence;
use crate::rig::{Keyboard, Screen};
use crate::scene::Scene;
use colorpref_core::{Frame, Key};
use colorpref_timing::{FrameClock, Timer};
use rand::Rng;

/// Everything a trial runner draws with: the rig, the wall clock, the
/// random source and the per-session layout.
pub struct Presenter<D, T, R>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
{
    pub display: D,
    pub timer: T,
    pub rng: R,
    pub clock: FrameClock,
    pub scene: Scene,
    pub masks: MaskSequence,
}

impl<D, T, R> Presenter<D, T, R>
where
    D: Screen + Keyboard,
    T: Timer,
    R: Rng,
{
    pub fn new(display: D, timer: T, rng: R, clock: FrameClock, scene: Scene) -> Self {
        Self {
            masks: MaskSequence::new(&clock),
            display,
            timer,
            rng,
            clock,
            scene,
        }
    }

    pub fn present(&mut self, frame: &Frame) -> Result<()> {
        self.display.present(frame)
    }

    /// Holds `frame` on screen for `frames` refreshes.
    pub fn hold(&mut self, frame: &Frame, frames: u64) -> Result<()> {
        for _ in 0..frames {
            self.display.present(frame)?;
        }
        Ok(())
    }

    /// Empty fusion boxes for `frames` refreshes.
    pub fn blank(&mut self, frames: u64) -> Result<()> {
        let frame = self.scene.background();
        self.hold(&frame, frames)
    }

    /// Shows `frame` and blocks for one of `allowed`.
    pub fn ask(&mut self, frame: &Frame, allowed: &[Key]) -> Result<Key> {
        self.display.present(frame)?;
        self.display.wait(allowed)
    }

    pub fn wait_for_ready(&mut self, orientation_stage: bool) -> Result<()> {
        let frame = self.scene.ready(orientation_stage);
        self.ask(&frame, &[Key::Space])?;
        Ok(())
    }

    /// Drops pending keys and shows the confirmation for one second.
    pub fn confirm(&mut self) -> Result<()> {
        self.display.clear();
        let frame = self.scene.confirmation();
        self.hold(&frame, self.clock.refresh_rate() as u64)
    }
}

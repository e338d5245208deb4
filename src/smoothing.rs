//! Moving average over the most recent raw samples.

/// Fixed window moving average.
///
/// The window starts out full of zeros and every slot always counts toward
/// the mean, so the first `N - 1` outputs lean toward zero. The history is
/// kept when smoothing is switched off and on again.
#[derive(Clone, Debug)]
pub struct MovingAverage<const N: usize> {
    history: [u8; N],
    index: usize,
}

impl<const N: usize> Default for MovingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> MovingAverage<N> {
    pub const fn new() -> Self {
        Self {
            history: [0; N],
            index: 0,
        }
    }

    /// Store `sample` over the oldest slot and return the mean of the window.
    pub fn smooth(&mut self, sample: u8) -> f32 {
        if N == 0 {
            return sample as f32;
        }
        self.history[self.index] = sample;
        self.index = (self.index + 1) % N;
        let sum: u32 = self.history.iter().map(|&s| s as u32).sum();
        sum as f32 / N as f32
    }
}

//! Frame driver
//!
//! Rotates the glyph quad a little further on every tick. The only state
//! carried between frames is the frame counter.

use anyhow::Result;
use log::trace;
use std::f32::consts::PI;
use std::time::{Duration, Instant};

/// Where a frame is drawn and shown
pub trait FrameTarget {
    /// Render one frame with the given view-projection matrix
    fn draw(&mut self, matrix: &[f32; 16]) -> Result<()>;

    /// Make the last drawn frame visible
    fn present(&mut self) -> Result<()>;
}

/// Rotation about the z axis, column-major
#[rustfmt::skip]
pub fn rotation_matrix(theta: f32) -> [f32; 16] {
    let (s, c) = theta.sin_cos();
    [
         c,   s,   0.0, 0.0,
        -s,   c,   0.0, 0.0,
         0.0, 0.0, 1.0, 0.0,
         0.0, 0.0, 0.0, 1.0,
    ]
}

/// Angle of frame `frame`: π/360 per `divisor` frames, wrapped to [0, 2π)
///
/// The counter is reduced to one turn (`720 * divisor` frames) in f64 before
/// narrowing, so the step stays even however long the loop has run.
pub fn frame_angle(frame: u64, divisor: f32) -> f32 {
    let divisor = f64::from(divisor);
    let phase = (frame as f64).rem_euclid(720.0 * divisor);
    (std::f64::consts::PI / 360.0 * phase / divisor) as f32
}

/// Advances the rotation and drives a [`FrameTarget`]
pub struct FrameDriver {
    frame: u64,
    divisor: f32,
    last_matrix: [f32; 16],
}

impl FrameDriver {
    /// `divisor` is the number of frames per π/360 step of rotation
    pub fn new(divisor: f32) -> Self {
        Self {
            frame: 0,
            divisor,
            last_matrix: rotation_matrix(0.0),
        }
    }

    /// Number of frames drawn so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Draw the next frame and present it
    ///
    /// The first frame is drawn unrotated.
    pub fn tick<T: FrameTarget + ?Sized>(&mut self, target: &mut T) -> Result<()> {
        let theta = frame_angle(self.frame, self.divisor);
        self.frame += 1;
        self.last_matrix = rotation_matrix(theta);
        trace!("frame {} theta={:.5}", self.frame, theta);
        target.draw(&self.last_matrix)?;
        target.present()
    }

    /// Draw the current frame again without advancing
    pub fn redraw<T: FrameTarget + ?Sized>(&mut self, target: &mut T) -> Result<()> {
        target.draw(&self.last_matrix)?;
        target.present()
    }
}

/// Fixed-rate deadline generator
///
/// Deadlines lie on a fixed grid from the start instant, so slow frames do
/// not accumulate drift. Deadlines already in the past are skipped.
pub struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    /// Ticker at `fps` frames per second, first deadline one interval from now
    pub fn new(fps: u32) -> Self {
        Self::starting_at(Instant::now(), Duration::from_secs(1) / fps.max(1))
    }

    pub fn starting_at(start: Instant, interval: Duration) -> Self {
        Self {
            interval,
            next: start + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Time to wait from `now` until the next deadline, advancing the grid
    ///
    /// Returns zero when the deadline has already passed; any further
    /// deadlines that have also passed are dropped.
    pub fn until_next(&mut self, now: Instant) -> Duration {
        let wait = self.next.saturating_duration_since(now);
        self.next += self.interval;
        if self.next <= now && !self.interval.is_zero() {
            let behind = now.duration_since(self.next);
            let missed = behind.as_nanos() / self.interval.as_nanos() + 1;
            self.next += self.interval * missed as u32;
        }
        wait
    }

    /// Sleep until the next deadline
    pub fn wait(&mut self) {
        let wait = self.until_next(Instant::now());
        if !wait.is_zero() {
            std::thread::sleep(wait);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingTarget {
        matrices: Vec<[f32; 16]>,
        presents: usize,
    }

    impl FrameTarget for RecordingTarget {
        fn draw(&mut self, matrix: &[f32; 16]) -> Result<()> {
            self.matrices.push(*matrix);
            Ok(())
        }

        fn present(&mut self) -> Result<()> {
            self.presents += 1;
            Ok(())
        }
    }

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{} != {}", a, b);
    }

    #[test]
    fn test_identity_at_zero() {
        let m = rotation_matrix(0.0);
        #[rustfmt::skip]
        let identity = [
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        assert_eq!(m, identity);
    }

    #[test]
    fn test_quarter_turn_layout() {
        let m = rotation_matrix(PI / 2.0);
        // First column is the image of the x axis
        assert_close(m[0], 0.0);
        assert_close(m[1], 1.0);
        assert_close(m[4], -1.0);
        assert_close(m[5], 0.0);
        assert_eq!(m[10], 1.0);
        assert_eq!(m[15], 1.0);
    }

    #[test]
    fn test_frame_angle() {
        assert_eq!(frame_angle(0, 3.0), 0.0);
        assert_close(frame_angle(3, 3.0), PI / 360.0);
        // Full turn after 720 * 3 frames wraps back to zero
        assert_close(frame_angle(2159, 3.0), 2.0 * PI - PI / 1080.0);
        assert_close(frame_angle(2160, 3.0), 0.0);
        assert_close(frame_angle(2160 + 3, 3.0), PI / 360.0);
    }

    #[test]
    fn test_frame_angle_step_stays_even() {
        let step = PI / 1080.0;
        // A week at 60 Hz is about 3.6e7 frames
        for start in [10_000_000u64, 36_288_000, u32::MAX as u64 * 7] {
            for n in start..start + 500 {
                let mut delta = frame_angle(n + 1, 3.0) - frame_angle(n, 3.0);
                if delta < 0.0 {
                    delta += 2.0 * PI;
                }
                let error = (delta - step).abs() / step;
                assert!(error < 0.05, "frame {}: step {} vs {}", n, delta, step);
            }
        }
    }

    #[test]
    fn test_tick_advances_rotation() {
        let mut driver = FrameDriver::new(3.0);
        let mut target = RecordingTarget::default();
        for _ in 0..4 {
            driver.tick(&mut target).unwrap();
        }
        assert_eq!(driver.frame(), 4);
        assert_eq!(target.presents, 4);
        assert_eq!(target.matrices[0], rotation_matrix(0.0));
        for (i, m) in target.matrices.iter().enumerate() {
            assert_eq!(*m, rotation_matrix(frame_angle(i as u64, 3.0)));
        }
    }

    #[test]
    fn test_redraw_keeps_frame() {
        let mut driver = FrameDriver::new(3.0);
        let mut target = RecordingTarget::default();
        driver.tick(&mut target).unwrap();
        driver.tick(&mut target).unwrap();
        driver.redraw(&mut target).unwrap();

        assert_eq!(driver.frame(), 2);
        assert_eq!(target.matrices.len(), 3);
        assert_eq!(target.matrices[2], target.matrices[1]);
    }

    #[test]
    fn test_ticker_on_time() {
        let start = Instant::now();
        let interval = Duration::from_millis(16);
        let mut t = Ticker::starting_at(start, interval);
        assert_eq!(t.until_next(start), interval);
        assert_eq!(t.until_next(start + interval), interval);
    }

    #[test]
    fn test_ticker_does_not_drift() {
        let start = Instant::now();
        let interval = Duration::from_millis(10);
        let mut t = Ticker::starting_at(start, interval);
        // Frame finished 3ms late: next wait shrinks to stay on the grid
        assert_eq!(t.until_next(start), interval);
        let now = start + Duration::from_millis(13);
        assert_eq!(t.until_next(now), Duration::from_millis(7));
    }

    #[test]
    fn test_ticker_skips_missed_deadlines() {
        let start = Instant::now();
        let interval = Duration::from_millis(10);
        let mut t = Ticker::starting_at(start, interval);
        // 45ms stall: the overdue deadline fires now, the ones at
        // 20/30/40ms are dropped, next is 50ms
        let now = start + Duration::from_millis(45);
        assert_eq!(t.until_next(now), Duration::ZERO);
        assert_eq!(t.until_next(now), Duration::from_millis(5));
    }
}

use std::time::{Duration, Instant};

/// Length of a life point animation.
pub const TWEEN_DURATION: Duration = Duration::from_millis(1500);

fn ease_out_quad(t: f64) -> f64 {
    t * (2.0 - t)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Segment {
    from: i64,
    to: i64,
    started: Instant,
}

impl Segment {
    fn sample(&self, now: Instant) -> (i64, bool) {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        let progress = (elapsed / TWEEN_DURATION.as_secs_f64()).clamp(0.0, 1.0);
        if progress >= 1.0 {
            return (self.to, true);
        }
        let span = (self.to - self.from) as f64;
        let value = self.from as f64 + span * ease_out_quad(progress);
        ((value + 0.5).floor() as i64, false)
    }
}

/// Displayed numeric value eased towards its latest target.
#[derive(Debug, Clone)]
pub struct ValueTween {
    displayed: i64,
    active: Option<Segment>,
}

impl ValueTween {
    pub fn new(initial: i64) -> Self {
        Self {
            displayed: initial,
            active: None,
        }
    }

    pub fn displayed(&self) -> i64 {
        self.displayed
    }

    pub fn is_animating(&self) -> bool {
        self.active.is_some()
    }

    /// Aim at a new target, starting from the value currently on screen.
    ///
    /// Returns `false` when there is nothing to animate.
    pub fn retarget(&mut self, target: i64, now: Instant) -> bool {
        if self.active.is_some_and(|segment| segment.to == target) {
            return false;
        }
        if target == self.displayed {
            self.active = None;
            return false;
        }
        self.active = Some(Segment {
            from: self.displayed,
            to: target,
            started: now,
        });
        true
    }

    /// Sample the animation for a display frame.
    ///
    /// Returns the new value when it differs from what was displayed.
    pub fn advance(&mut self, now: Instant) -> Option<i64> {
        let segment = self.active?;
        let (value, done) = segment.sample(now);
        if done {
            self.active = None;
        }
        if value == self.displayed {
            return None;
        }
        self.displayed = value;
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlay::schedule::FRAME_INTERVAL;

    fn run_to_end(tween: &mut ValueTween, start: Instant) -> Vec<i64> {
        let mut samples = Vec::new();
        let mut now = start;
        while tween.is_animating() {
            now += FRAME_INTERVAL;
            if let Some(value) = tween.advance(now) {
                samples.push(value);
            }
        }
        samples
    }

    #[test]
    fn equal_target_is_noop() {
        let mut tween = ValueTween::new(8000);
        assert!(!tween.retarget(8000, Instant::now()));
        assert!(!tween.is_animating());
    }

    #[test]
    fn decreasing_target_is_monotonic_and_exact() {
        let start = Instant::now();
        let mut tween = ValueTween::new(8000);
        assert!(tween.retarget(5000, start));

        let samples = run_to_end(&mut tween, start);
        assert!(samples.windows(2).all(|pair| pair[1] <= pair[0]));
        assert_eq!(samples.last(), Some(&5000));
        assert_eq!(tween.displayed(), 5000);
        assert!(samples.len() > 10);
    }

    #[test]
    fn eases_out() {
        let start = Instant::now();
        let mut tween = ValueTween::new(0);
        tween.retarget(1000, start);
        assert_eq!(tween.advance(start + TWEEN_DURATION / 2), Some(750));
    }

    #[test]
    fn retarget_mid_flight_starts_from_current_value() {
        let start = Instant::now();
        let mut tween = ValueTween::new(8000);
        tween.retarget(7000, start);
        tween.advance(start + TWEEN_DURATION / 2);
        assert_eq!(tween.displayed(), 7250);

        assert!(tween.retarget(8000, start + TWEEN_DURATION / 2));
        let samples = run_to_end(&mut tween, start + TWEEN_DURATION / 2);
        assert!(samples.windows(2).all(|pair| pair[1] >= pair[0]));
        assert_eq!(tween.displayed(), 8000);
    }

    #[test]
    fn same_target_keeps_running_animation() {
        let start = Instant::now();
        let mut tween = ValueTween::new(8000);
        tween.retarget(7600, start);
        assert!(!tween.retarget(7600, start + Duration::from_millis(100)));
        assert!(tween.is_animating());
    }
}

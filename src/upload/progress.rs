use web_time::{Duration, Instant};

/// Something that reports how far along an upload is, 0..=100.
///
/// The only implementation today is [`SimulatedProgress`]; a backend that
/// reports real analysis progress plugs in here.
pub trait ProgressSource {
    fn value(&self) -> u8;

    /// Advances to `now`. Returns the instant at which 100 was reached, if it
    /// was reached during this call.
    fn advance(&mut self, now: Instant) -> Option<Instant>;

    /// When the value will next change, if ever.
    fn next_change(&self) -> Option<Instant>;
}

/// Fixed-step timer: `step` points every `interval`, clamped to 100.
#[derive(Debug, Clone)]
pub struct SimulatedProgress {
    value: u8,
    step: u8,
    interval: Duration,
    next_tick: Instant,
}

impl SimulatedProgress {
    pub fn start(step: u8, interval: Duration, now: Instant) -> Self {
        Self { value: 0, step: step.max(1), interval, next_tick: now + interval }
    }
}

impl ProgressSource for SimulatedProgress {
    fn value(&self) -> u8 {
        self.value
    }

    fn advance(&mut self, now: Instant) -> Option<Instant> {
        // Catch up on every tick that elapsed since the last frame.
        while self.value < 100 && self.next_tick <= now {
            let tick = self.next_tick;
            self.value = self.value.saturating_add(self.step).min(100);
            self.next_tick += self.interval;
            if self.value == 100 {
                return Some(tick);
            }
        }
        None
    }

    fn next_change(&self) -> Option<Instant> {
        (self.value < 100).then_some(self.next_tick)
    }
}

//! Frame pacing against a virtual deadline.
//!
//! The deadline is kept in "micro-frames" (frame count × 1,000,000) so
//! that one frame interval is always exactly `1_000_000` units whatever
//! the frame rate, and wall time is derived from it with exact integer
//! arithmetic. Rounding never accumulates into drift.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Deadline units per frame.
pub const FRAME_UNITS: i128 = 1_000_000;

const MICROS_PER_SECOND: i128 = 1_000_000;

/// Positive rational frame rate, kept reduced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FrameRate {
    num: u32,
    den: u32,
}

impl FrameRate {
    pub const NTSC: Self = Self {
        num: 30_000,
        den: 1001,
    };

    pub fn new(num: u32, den: u32) -> Result<Self, CaptureError> {
        if num == 0 || den == 0 {
            return Err(CaptureError::InvalidConfig(format!(
                "frame rate {num}/{den} must be positive"
            )));
        }
        let divisor = gcd(u64::from(num), u64::from(den)) as u32;
        Ok(Self {
            num: num / divisor,
            den: den / divisor,
        })
    }

    pub fn num(&self) -> u32 {
        self.num
    }

    pub fn den(&self) -> u32 {
        self.den
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    /// Frame interval in microseconds (rounded down).
    pub fn interval_us(&self) -> i64 {
        (MICROS_PER_SECOND * i128::from(self.den) / i128::from(self.num)) as i64
    }

    fn abbreviation(name: &str) -> Option<Self> {
        let (num, den) = match name {
            "ntsc" | "qntsc" | "sntsc" => (30_000, 1001),
            "pal" | "qpal" | "spal" => (25, 1),
            "film" => (24, 1),
            "ntsc-film" => (24_000, 1001),
            _ => return None,
        };
        Some(Self { num, den })
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::NTSC
    }
}

impl FromStr for FrameRate {
    type Err = CaptureError;

    /// Accepts `"30"`, `"29.97"`, `"30000/1001"`, `"30000:1001"` or an
    /// abbreviation such as `"ntsc"` or `"film"`.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let invalid = || CaptureError::InvalidConfig(format!("invalid frame rate '{raw}'"));

        if let Some(rate) = Self::abbreviation(&raw.to_ascii_lowercase()) {
            return Ok(rate);
        }

        if let Some((num, den)) = raw.split_once(['/', ':']) {
            let num = num.trim().parse::<u32>().map_err(|_| invalid())?;
            let den = den.trim().parse::<u32>().map_err(|_| invalid())?;
            return Self::new(num, den).map_err(|_| invalid());
        }

        if let Some((whole, fraction)) = raw.split_once('.') {
            if fraction.is_empty()
                || fraction.len() > 6
                || !fraction.bytes().all(|b| b.is_ascii_digit())
            {
                return Err(invalid());
            }
            let den = 10u64.pow(fraction.len() as u32);
            let whole = if whole.is_empty() {
                0
            } else {
                whole.parse::<u64>().map_err(|_| invalid())?
            };
            let fraction = fraction.parse::<u64>().map_err(|_| invalid())?;
            let num = whole
                .checked_mul(den)
                .and_then(|n| n.checked_add(fraction))
                .ok_or_else(invalid)?;
            let divisor = gcd(num, den).max(1);
            let num = u32::try_from(num / divisor).map_err(|_| invalid())?;
            let den = u32::try_from(den / divisor).map_err(|_| invalid())?;
            return Self::new(num, den).map_err(|_| invalid());
        }

        let num = raw.parse::<u32>().map_err(|_| invalid())?;
        Self::new(num, 1).map_err(|_| invalid())
    }
}

impl TryFrom<String> for FrameRate {
    type Error = CaptureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FrameRate> for String {
    fn from(rate: FrameRate) -> Self {
        rate.to_string()
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Outcome of [`FramePacer::schedule`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Schedule {
    /// Microseconds until the frame is due. Zero or negative means due now.
    pub delay_us: i64,
    /// Deadline to commit once the frame has been produced.
    pub deadline: i128,
}

impl Schedule {
    pub fn is_due(&self) -> bool {
        self.delay_us <= 0
    }
}

/// Deadlines stay in `i128`: `now_us * num` outgrows `i64` at epoch
/// timestamps once the rate passes a few thousand frames per second.
#[derive(Clone, Debug)]
pub struct FramePacer {
    rate: FrameRate,
    deadline: i128,
}

impl FramePacer {
    pub fn new(rate: FrameRate, now_us: i64) -> Self {
        Self {
            rate,
            deadline: i128::from(now_us) * i128::from(rate.num) / i128::from(rate.den),
        }
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }

    /// Committed deadline in frame units.
    pub fn deadline(&self) -> i128 {
        self.deadline
    }

    /// Wall time of a deadline, in microseconds since the epoch.
    pub fn deadline_us(&self, deadline: i128) -> i128 {
        deadline * i128::from(self.rate.den) / i128::from(self.rate.num)
    }

    /// Compute the next deadline and how long to wait for it.
    ///
    /// The deadline moves one interval past the committed one. When the
    /// caller is more than one interval late it moves one extra interval,
    /// so a slow consumer gets at most one immediately-due frame instead
    /// of a burst.
    pub fn schedule(&self, now_us: i64) -> Schedule {
        let mut deadline = self.deadline + FRAME_UNITS;
        let delay = self.deadline_us(deadline) - i128::from(now_us);
        // delay < -interval, i.e. delay * num < -1e6 * den
        if delay <= 0
            && delay * i128::from(self.rate.num) < -MICROS_PER_SECOND * i128::from(self.rate.den)
        {
            deadline += FRAME_UNITS;
        }
        let delay_us = i64::try_from(delay).unwrap_or(if delay < 0 { i64::MIN } else { i64::MAX });
        Schedule { delay_us, deadline }
    }

    pub fn commit(&mut self, schedule: &Schedule) {
        self.deadline = schedule.deadline;
    }
}

/// Wall clock used for pacing and timestamps.
pub trait Clock: Send {
    /// Microseconds since the UNIX epoch.
    fn now_us(&self) -> i64;

    fn sleep_us(&self, micros: i64);
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_us(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_micros() as i64)
            .unwrap_or_default()
    }

    fn sleep_us(&self, micros: i64) {
        if micros > 0 {
            spin_sleep(Duration::from_micros(micros as u64));
        }
    }
}

/// High-precision sleep that uses spin-waiting for the final sub-millisecond
/// portion to compensate for OS timer granularity.
fn spin_sleep(duration: Duration) {
    const SPIN_THRESHOLD: Duration = Duration::from_millis(1);

    let target = std::time::Instant::now() + duration;
    if duration > SPIN_THRESHOLD {
        std::thread::sleep(duration - SPIN_THRESHOLD);
    }
    while std::time::Instant::now() < target {
        std::hint::spin_loop();
    }
}

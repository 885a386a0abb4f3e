// Bounded polling policy for the chip's ready/tune-complete waits

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// How long a poll loop may keep asking the chip before giving up.
///
/// `None` for both bounds polls forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Give up after this many polls
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Give up once this much time has passed since the first poll
    #[serde(default, with = "opt_millis")]
    pub max_duration: Option<Duration>,

    /// Pause between unsuccessful polls
    #[serde(default = "default_delay", with = "millis")]
    pub delay: Duration,
}

fn default_delay() -> Duration {
    Duration::from_millis(10)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: None,
            max_duration: Some(Duration::from_secs(5)),
            delay: default_delay(),
        }
    }
}

impl RetryPolicy {
    /// Poll until the chip answers, however long that takes
    pub fn unbounded(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            max_duration: None,
            delay,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn start(&self) -> RetryBudget {
        RetryBudget {
            policy: *self,
            started: Instant::now(),
            attempts: 0,
        }
    }
}

/// One running poll loop
#[derive(Debug)]
pub struct RetryBudget {
    policy: RetryPolicy,
    started: Instant,
    attempts: u32,
}

impl RetryBudget {
    /// Count one attempt. Returns false once the policy is exhausted.
    pub fn try_attempt(&mut self) -> bool {
        if let Some(max) = self.policy.max_attempts {
            if self.attempts >= max {
                return false;
            }
        }
        if let Some(max) = self.policy.max_duration {
            if self.attempts > 0 && self.started.elapsed() >= max {
                return false;
            }
        }
        self.attempts += 1;
        true
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub async fn pause(&self) {
        if !self.policy.delay.is_zero() {
            tokio::time::sleep(self.policy.delay).await;
        }
    }
}

pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

mod opt_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

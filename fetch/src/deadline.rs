//! Deadline timer.
//!
//! [`after`] validates its bound up front and hands back a [`Deadline`] future
//! that settles with a [`TimeoutSignal`]. The timer lives on the caller's
//! runtime; dropping the future (or calling [`Deadline::cancel`]) deregisters
//! the wake-up, so nothing fires after the race is decided.
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tierfetch_types::InvalidArgument;
use tokio::time::{Instant, Sleep};

/// Produced when a deadline elapses. A signal, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutSignal {
    pub bound: Duration,
}

/// Pending timer returned by [`after`].
#[derive(Debug)]
#[must_use = "a deadline does nothing unless awaited"]
pub struct Deadline {
    sleep: Pin<Box<Sleep>>,
    bound: Duration,
    started: Instant,
    fired: bool,
}

/// Arm a deadline `delay_ms` milliseconds from now.
///
/// Fails before anything is scheduled if `delay_ms` is zero, negative, or not
/// finite. Bounds too large for a [`Duration`] saturate to [`Duration::MAX`].
pub fn after(delay_ms: f64) -> Result<Deadline, InvalidArgument> {
    let delay_ms = InvalidArgument::check_delay_ms(delay_ms)?;
    let bound = Duration::try_from_secs_f64(delay_ms / 1000.0).unwrap_or(Duration::MAX);
    Ok(Deadline::arm(bound))
}

/// Same as [`after`] for callers that already hold a [`Duration`].
pub fn after_duration(bound: Duration) -> Result<Deadline, InvalidArgument> {
    if bound.is_zero() {
        return Err(InvalidArgument { value: 0.0 });
    }
    Ok(Deadline::arm(bound))
}

impl Deadline {
    fn arm(bound: Duration) -> Self {
        let started = Instant::now();
        // `sleep` clamps an unrepresentable deadline to the far future.
        let sleep = match started.checked_add(bound) {
            Some(at) => tokio::time::sleep_until(at),
            None => tokio::time::sleep(bound),
        };
        Self {
            sleep: Box::pin(sleep),
            bound,
            started,
            fired: false,
        }
    }

    #[must_use]
    pub fn bound(&self) -> Duration {
        self.bound
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.bound.saturating_sub(self.started.elapsed())
    }

    /// Disarm the timer without waiting for it.
    pub fn cancel(self) {
        tracing::trace!(bound_ms = self.bound.as_millis(), "deadline cancelled");
    }
}

impl Future for Deadline {
    type Output = TimeoutSignal;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // Settles once; later polls stay pending instead of re-firing.
        if self.fired {
            return Poll::Pending;
        }
        match self.sleep.as_mut().poll(cx) {
            Poll::Ready(()) => {
                self.fired = true;
                Poll::Ready(TimeoutSignal { bound: self.bound })
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    #[tokio::test(start_paused = true)]
    async fn settles_no_earlier_than_bound() {
        let start = Instant::now();
        let signal = after(200.0).unwrap().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
        assert_eq!(signal.bound, Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_before_bound_elapses() {
        let mut deadline = after(50.0).unwrap();
        tokio::time::advance(Duration::from_millis(49)).await;
        assert!((&mut deadline).now_or_never().is_none());
        tokio::time::advance(Duration::from_millis(1)).await;
        assert!((&mut deadline).await.bound == Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn settles_exactly_once() {
        let mut deadline = after(10.0).unwrap();
        (&mut deadline).await;
        tokio::time::advance(Duration::from_secs(1)).await;
        assert!((&mut deadline).now_or_never().is_none());
    }

    #[test]
    fn rejects_zero_and_negative_synchronously() {
        // No runtime is running here: validation must not need one.
        assert_eq!(after(0.0).unwrap_err(), InvalidArgument { value: 0.0 });
        assert_eq!(after(-1.0).unwrap_err(), InvalidArgument { value: -1.0 });
        assert!(after(f64::NAN).is_err());
        assert!(after(f64::INFINITY).is_err());
        assert!(after_duration(Duration::ZERO).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn huge_bounds_saturate_instead_of_panicking() {
        let mut from_ms = after(1e23).unwrap();
        assert_eq!(from_ms.bound(), Duration::MAX);

        let mut from_duration = after_duration(Duration::MAX).unwrap();
        assert_eq!(from_duration.remaining(), Duration::MAX);

        tokio::time::advance(Duration::from_secs(86_400)).await;
        assert!((&mut from_ms).now_or_never().is_none());
        assert!((&mut from_duration).now_or_never().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn large_finite_bound_keeps_its_value() {
        let deadline = after(1e12).unwrap();
        assert_eq!(deadline.bound(), Duration::from_secs(1_000_000_000));
        deadline.cancel();
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_counts_down() {
        let deadline = after_duration(Duration::from_millis(100)).unwrap();
        tokio::time::advance(Duration::from_millis(40)).await;
        assert_eq!(deadline.remaining(), Duration::from_millis(60));
        deadline.cancel();
    }
}

//! First-resolved-wins race between independent signals under a deadline.

use std::future::Future;
use std::pin::Pin;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

use super::Settlement;

/// What a signal concluded when it finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalVerdict<T> {
    /// Terminal value; wins the race if nothing settled first.
    Settle(T),
    /// The signal has nothing to say; others keep running.
    Abstain,
}

/// Boxed signal future.
pub type SignalFuture<'a, T> = Pin<Box<dyn Future<Output = SignalVerdict<T>> + Send + 'a>>;

/// Named contender in a race.
pub struct Signal<'a, N, T> {
    name: N,
    future: SignalFuture<'a, T>,
}

impl<'a, N, T> Signal<'a, N, T> {
    /// Wrap `future` under `name`.
    pub fn new(name: N, future: impl Future<Output = SignalVerdict<T>> + Send + 'a) -> Self {
        Self {
            name,
            future: Box::pin(future),
        }
    }

    /// Signal name.
    pub fn name(&self) -> &N {
        &self.name
    }
}

/// How a race ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RaceOutcome<N, T> {
    /// A signal settled before the deadline.
    Settled {
        /// Winning signal.
        by: N,
        /// Its terminal value.
        value: T,
    },
    /// Every signal abstained before the deadline.
    Exhausted,
    /// The deadline passed first.
    TimedOut,
}

/// Drive `signals` until one settles, all abstain, or `deadline` passes.
///
/// The deadline is checked before any signal on every wake-up, so a signal
/// completing at or after the deadline loses to the timeout. The remaining
/// signals are dropped (cancelled) as soon as the race ends.
pub async fn first_resolved<'a, N, T>(
    signals: Vec<Signal<'a, N, T>>,
    deadline: Instant,
) -> RaceOutcome<N, T>
where
    N: Copy + std::fmt::Debug + Send + 'a,
    T: Send + 'a,
{
    let terminal: Settlement<RaceOutcome<N, T>> = Settlement::new();
    let mut pending: FuturesUnordered<_> = signals
        .into_iter()
        .map(|signal| {
            let Signal { name, future } = signal;
            async move { (name, future.await) }
        })
        .collect();
    let timeout = sleep_until(deadline);
    tokio::pin!(timeout);

    while !terminal.is_settled() {
        let candidate = tokio::select! {
            biased;
            () = &mut timeout => RaceOutcome::TimedOut,
            next = pending.next() => match next {
                Some((by, SignalVerdict::Settle(value))) => RaceOutcome::Settled { by, value },
                Some((name, SignalVerdict::Abstain)) => {
                    trace!(signal = ?name, "signal abstained");
                    continue;
                }
                None => RaceOutcome::Exhausted,
            },
        };
        if terminal.settle(candidate).is_err() {
            trace!("late terminal ignored");
        }
    }

    terminal.into_inner().unwrap_or(RaceOutcome::Exhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;
    use tokio::time::sleep;

    fn after(
        name: &'static str,
        delay_ms: u64,
        verdict: SignalVerdict<u32>,
    ) -> Signal<'static, &'static str, u32> {
        Signal::new(name, async move {
            sleep(Duration::from_millis(delay_ms)).await;
            verdict
        })
    }

    fn deadline_in(ms: u64) -> Instant {
        Instant::now() + Duration::from_millis(ms)
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn earliest_settling_signal_wins() {
        let outcome = first_resolved(
            vec![
                after("slow", 300, SignalVerdict::Settle(2)),
                after("fast", 100, SignalVerdict::Settle(1)),
            ],
            deadline_in(1_000),
        )
        .await;
        assert_eq!(outcome, RaceOutcome::Settled { by: "fast", value: 1 });
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn abstentions_defer_to_later_signals() {
        let outcome = first_resolved(
            vec![
                after("abstain", 10, SignalVerdict::Abstain),
                after("late", 200, SignalVerdict::Settle(7)),
            ],
            deadline_in(1_000),
        )
        .await;
        assert_eq!(outcome, RaceOutcome::Settled { by: "late", value: 7 });
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn all_abstaining_exhausts() {
        let outcome = first_resolved(
            vec![after("a", 10, SignalVerdict::Abstain), after("b", 20, SignalVerdict::Abstain)],
            deadline_in(1_000),
        )
        .await;
        assert_eq!(outcome, RaceOutcome::Exhausted);
    }

    #[rstest]
    #[case(999, RaceOutcome::Settled { by: "edge", value: 3 })]
    #[case(1_000, RaceOutcome::TimedOut)]
    #[case(1_500, RaceOutcome::TimedOut)]
    #[tokio::test(start_paused = true)]
    async fn deadline_dominates_signals_at_or_after_it(
        #[case] signal_ms: u64,
        #[case] expected: RaceOutcome<&'static str, u32>,
    ) {
        let outcome = first_resolved(
            vec![after("edge", signal_ms, SignalVerdict::Settle(3))],
            deadline_in(1_000),
        )
        .await;
        assert_eq!(outcome, expected);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn empty_race_with_passed_deadline_times_out() {
        let outcome: RaceOutcome<&str, u32> =
            first_resolved(Vec::new(), Instant::now()).await;
        assert_eq!(outcome, RaceOutcome::TimedOut);
    }
}

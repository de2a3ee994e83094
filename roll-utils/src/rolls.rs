use dice_roll::{DiceRoller, RollOutcome};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::result::Result;
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::spawn,
};

use rusty_pool::{Builder, ThreadPool};

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Roll(#[from] dice_roll::Error),
    #[error("cannot repeat a roll {requested} times, the limit is {limit}")]
    TooManyRepeats { requested: u32, limit: u32 },
    #[error("roll executor is shut down")]
    Shutdown,
}

#[derive(Debug)]
enum RngProviderOps {
    GetRng(oneshot::Sender<Xoshiro256PlusPlus>),
}

/// Hands out one independent stream per roll, seeded from a ChaCha master.
struct RngProvider {
    rng: ChaCha20Rng,
    receiver: mpsc::Receiver<RngProviderOps>,
    /// Hand-outs before the master is replaced from entropy, 0 for never.
    reseed_after: u32,
    handed_out: u32,
}

impl RngProvider {
    fn next_rng(&mut self) -> Xoshiro256PlusPlus {
        if self.reseed_after > 0 && self.handed_out >= self.reseed_after {
            log::info!("reseeding roll rng after {} hand-outs", self.handed_out);
            self.rng = ChaCha20Rng::from_entropy();
            self.handed_out = 0;
        }
        self.handed_out += 1;
        let mut seed: <Xoshiro256PlusPlus as SeedableRng>::Seed = Default::default();
        self.rng.fill(&mut seed);
        Xoshiro256PlusPlus::from_seed(seed)
    }

    pub async fn run(&mut self) {
        while let Some(op) = self.receiver.recv().await {
            match op {
                RngProviderOps::GetRng(channel) => {
                    if channel.send(self.next_rng()).is_err() {
                        log::debug!("rng requester went away");
                    }
                }
            }
        }
    }
}

fn start_rng_provider(rng: ChaCha20Rng, reseed_after: u32) -> mpsc::Sender<RngProviderOps> {
    let (sender, receiver) = mpsc::channel(32);
    spawn(async move {
        RngProvider {
            rng,
            receiver,
            reseed_after,
            handed_out: 0,
        }
        .run()
        .await
    });
    sender
}

/// Runs rolls on a worker pool. Needs a running tokio runtime.
pub struct RollExecutor {
    pool: ThreadPool,
    rng_gen: mpsc::Sender<RngProviderOps>,
}

impl RollExecutor {
    pub fn new(size: u32, reseed_after: u32) -> RollExecutor {
        RollExecutor::with_master(size, ChaCha20Rng::from_entropy(), reseed_after)
    }

    /// Reproducible executor: every stream derives from `seed`, the master is never reseeded.
    pub fn seeded(size: u32, seed: u64) -> RollExecutor {
        RollExecutor::with_master(size, ChaCha20Rng::seed_from_u64(seed), 0)
    }

    fn with_master(size: u32, rng: ChaCha20Rng, reseed_after: u32) -> RollExecutor {
        RollExecutor {
            pool: Builder::new()
                .core_size(1)
                .max_size(size.max(1) as usize)
                .name("Roll Worker".to_string())
                .build(),
            rng_gen: start_rng_provider(rng, reseed_after),
        }
    }

    async fn rng(&self) -> Result<Xoshiro256PlusPlus, ExecutorError> {
        let (rng_send, rng_receive) = oneshot::channel();
        self.rng_gen
            .send(RngProviderOps::GetRng(rng_send))
            .await
            .map_err(|_| ExecutorError::Shutdown)?;
        rng_receive.await.map_err(|_| ExecutorError::Shutdown)
    }

    /// Queues one roll and returns where its result arrives.
    async fn dispatch(
        &self,
        roller: DiceRoller,
        input: String,
    ) -> Result<oneshot::Receiver<Result<RollOutcome, dice_roll::Error>>, ExecutorError> {
        let mut rng = self.rng().await?;
        let (result_sender, result_receiver) = oneshot::channel();
        self.pool.execute(move || {
            if result_sender.send(roller.roll(&input, &mut rng)).is_err() {
                log::debug!("roll result for {} was not awaited", &input);
            }
        });
        Ok(result_receiver)
    }

    pub async fn roll(
        &self,
        roller: DiceRoller,
        input: String,
    ) -> Result<RollOutcome, ExecutorError> {
        let receiver = self.dispatch(roller, input).await?;
        Ok(receiver.await.map_err(|_| ExecutorError::Shutdown)??)
    }

    /// Rolls `input` `times` times in parallel. Results keep request order;
    /// the first failed roll fails the whole request. Nothing is rolled when
    /// `times` exceeds `limit`.
    pub async fn roll_many(
        &self,
        roller: DiceRoller,
        input: String,
        times: u32,
        limit: u32,
    ) -> Result<Vec<RollOutcome>, ExecutorError> {
        if times > limit {
            return Err(ExecutorError::TooManyRepeats {
                requested: times,
                limit,
            });
        }
        let mut receivers = Vec::new();
        for _ in 0..times {
            receivers.push(self.dispatch(roller.clone(), input.clone()).await?);
        }
        let mut outcomes = Vec::with_capacity(receivers.len());
        for receiver in receivers {
            outcomes.push(receiver.await.map_err(|_| ExecutorError::Shutdown)??);
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dice_roll::{ErrorKind, FormulaEntry, FormulaRegistry, FormulaSnapshot, RollConfig};
    use std::sync::Arc;

    fn roller() -> DiceRoller {
        DiceRoller::new(
            RollConfig::default(),
            Arc::new(FormulaRegistry::new(FormulaSnapshot::new(vec![
                FormulaEntry::new("attack", "1d20+5"),
            ]))),
        )
    }

    #[tokio::test]
    async fn test_roll() {
        let executor = RollExecutor::new(2, 16);
        let outcome = executor
            .roll(roller(), "attack".to_string())
            .await
            .unwrap();
        assert_eq!(outcome.formula, "1d20+5");
        assert!((6.0..=25.0).contains(&outcome.result.total.as_f64()));
    }

    #[tokio::test]
    async fn test_roll_error() {
        let executor = RollExecutor::new(2, 16);
        match executor.roll(roller(), "1d6 +".to_string()).await {
            Err(ExecutorError::Roll(err)) => assert_eq!(err.kind(), ErrorKind::Syntax),
            other => panic!("expected a syntax error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_roll_many() {
        let executor = RollExecutor::new(4, 3);
        let outcomes = executor
            .roll_many(roller(), "3d6".to_string(), 10, 100)
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 10);
        for outcome in &outcomes {
            assert_eq!(outcome.result.breakdown[0].dice.len(), 3);
            assert!((3.0..=18.0).contains(&outcome.result.total.as_f64()));
        }
    }

    #[tokio::test]
    async fn test_roll_many_over_limit() {
        let executor = RollExecutor::new(2, 0);
        match executor
            .roll_many(roller(), "1d6".to_string(), 4_000_000_000, 100)
            .await
        {
            Err(ExecutorError::TooManyRepeats { requested, limit }) => {
                assert_eq!(requested, 4_000_000_000);
                assert_eq!(limit, 100);
            }
            other => panic!("expected the repeat limit to apply, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_seeded_executors_agree() {
        let first = RollExecutor::seeded(4, 99)
            .roll_many(roller(), "4d20kh2!".to_string(), 20, 20)
            .await
            .unwrap();
        let second = RollExecutor::seeded(1, 99)
            .roll_many(roller(), "4d20kh2!".to_string(), 20, 20)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_rng_provider_reseeds() {
        let (_sender, receiver) = mpsc::channel(1);
        let mut provider = RngProvider {
            rng: ChaCha20Rng::seed_from_u64(1),
            receiver,
            reseed_after: 2,
            handed_out: 0,
        };
        provider.next_rng();
        provider.next_rng();
        assert_eq!(provider.handed_out, 2);
        provider.next_rng();
        assert_eq!(provider.handed_out, 1);
    }
}

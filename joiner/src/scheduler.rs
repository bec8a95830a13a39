//! Runs the queries of one batch concurrently and hands back their results in submission order.

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{error, info};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::error::{JoinerError, JoinerResult};
use crate::executor::execute_query;
use crate::operator::QueryOutput;
use crate::query::QueryInfo;

type Slot = (usize, JoinerResult<QueryOutput>);

/// Dispatches queries to a worker pool. [`BatchScheduler::flush`] is the barrier closing a batch.
pub struct BatchScheduler {
    context: Arc<ExecutionContext>,
    pool: ThreadPool,
    sender: Sender<Slot>,
    receiver: Receiver<Slot>,
    submitted: usize,
    in_flight: usize,
    rejected: Vec<Slot>,
}

impl BatchScheduler {
    pub fn new(context: Arc<ExecutionContext>) -> JoinerResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(context.config.batch_workers.unwrap_or_default())
            .thread_name(|idx| format!("query-worker-{}", idx))
            .build()?;
        let (sender, receiver) = unbounded();
        Ok(Self {
            context,
            pool,
            sender,
            receiver,
            submitted: 0,
            in_flight: 0,
            rejected: vec![],
        })
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    /// Number of results the next flush returns.
    pub fn pending(&self) -> usize {
        self.submitted
    }

    /// Starts running `query` in the background, returns its position in the batch.
    pub fn submit(&mut self, query: QueryInfo) -> usize {
        let idx = self.next_slot();
        let context = self.context.clone();
        let sender = self.sender.clone();
        self.in_flight += 1;
        self.pool.spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(|| execute_query(&context, &query)))
                .unwrap_or_else(|panic| Err(JoinerError::WorkerPanicked(panic_message(panic))));
            // The receiver lives as long as the scheduler, which waits for every task.
            if sender.send((idx, result)).is_err() {
                error!("Result of query {} dropped, scheduler is gone", idx);
            }
        });
        idx
    }

    /// Reserves a position for a query that failed before it could be submitted.
    pub fn reject(&mut self, error: JoinerError) -> usize {
        let idx = self.next_slot();
        self.rejected.push((idx, Err(error)));
        idx
    }

    /// Waits for every query of the current batch and returns their results in submission
    /// order.
    pub fn flush(&mut self) -> Vec<JoinerResult<QueryOutput>> {
        let mut slots: Vec<Option<JoinerResult<QueryOutput>>> =
            (0..self.submitted).map(|_| None).collect();
        for (idx, result) in self.rejected.drain(..) {
            slots[idx] = Some(result);
        }
        while self.in_flight > 0 {
            match self.receiver.recv() {
                Ok((idx, result)) => {
                    slots[idx] = Some(result);
                    self.in_flight -= 1;
                }
                Err(_) => break,
            }
        }
        info!("Flushed batch of {} queries", self.submitted);
        self.submitted = 0;
        self.in_flight = 0;

        slots
            .into_iter()
            .enumerate()
            .map(|(idx, slot)| {
                slot.unwrap_or_else(|| {
                    Err(JoinerError::WorkerPanicked(format!(
                        "no result for query {}",
                        idx
                    )))
                })
            })
            .collect()
    }

    fn next_slot(&mut self) -> usize {
        let idx = self.submitted;
        self.submitted += 1;
        idx
    }
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::config::ExecutionConfig;
    use crate::context::ExecutionContext;
    use crate::error::JoinerError;
    use crate::executor::execute_query;
    use crate::query::{ColumnRef, JoinPredicate, QueryInfo};
    use crate::scheduler::BatchScheduler;
    use crate::test_utils::generated_relation;

    fn scheduler(batch_workers: usize) -> BatchScheduler {
        let mut catalog = crate::catalog::Catalog::new();
        catalog.add_relation(generated_relation(2_000, 2, |row, col| row * (col as u64 + 1)));
        catalog.add_relation(generated_relation(500, 2, |row, col| row % 100 + col as u64));
        let mut config = ExecutionConfig::default();
        config.batch_workers = Some(batch_workers);
        BatchScheduler::new(Arc::new(ExecutionContext::new(Arc::new(catalog), config))).unwrap()
    }

    fn query(column: usize) -> QueryInfo {
        QueryInfo::new(
            vec![0, 1],
            vec![JoinPredicate::equi(
                ColumnRef::new(0, 0, 0),
                ColumnRef::new(1, 1, column),
            )],
            vec![],
            vec![ColumnRef::new(0, 0, 1)],
        )
        .unwrap()
    }

    #[test]
    fn test_results_keep_submission_order() {
        let mut sequential = scheduler(1);
        let expected = (0..6)
            .map(|i| {
                sequential.submit(query(i % 2));
                sequential.flush().pop().unwrap().unwrap()
            })
            .collect::<Vec<_>>();
        assert_ne!(expected[0], expected[1]);

        let mut parallel = scheduler(4);
        for i in 0..6 {
            assert_eq!(i, parallel.submit(query(i % 2)));
        }
        assert_eq!(6, parallel.pending());
        let results = parallel
            .flush()
            .into_iter()
            .map(Result::unwrap)
            .collect::<Vec<_>>();

        assert_eq!(expected, results);
        assert_eq!(0, parallel.pending());
    }

    #[test]
    fn test_late_slots_finishing_first() {
        let mut scheduler = scheduler(2);
        let (first, second) = (query(0), query(1));
        let (release, blocked) = crossbeam_channel::bounded::<()>(0);

        // Slot 0 is held back until released.
        let idx = scheduler.next_slot();
        scheduler.in_flight += 1;
        let context = scheduler.context.clone();
        let sender = scheduler.sender.clone();
        std::thread::spawn(move || {
            blocked.recv().unwrap();
            sender.send((idx, execute_query(&context, &first))).unwrap();
        });
        scheduler.submit(second);
        scheduler.reject(JoinerError::InvalidQuery("bad".to_string()));

        // Slot 1 is delivered first, put it back and let slot 0 finish after it.
        let (late_idx, late_result) = scheduler.receiver.recv().unwrap();
        assert_eq!(1, late_idx);
        scheduler.sender.send((late_idx, late_result)).unwrap();
        release.send(()).unwrap();

        let results = scheduler.flush();
        assert_eq!(3, results.len());
        assert_eq!(
            execute_query(scheduler.context(), &query(0)).unwrap(),
            *results[0].as_ref().unwrap()
        );
        assert_eq!(
            execute_query(scheduler.context(), &query(1)).unwrap(),
            *results[1].as_ref().unwrap()
        );
        assert!(matches!(results[2], Err(JoinerError::InvalidQuery(_))));
    }

    #[test]
    fn test_rejected_query_keeps_its_slot() {
        let mut scheduler = scheduler(2);
        scheduler.submit(query(0));
        scheduler.reject(JoinerError::InvalidQuery("bad".to_string()));
        scheduler.submit(query(1));

        let results = scheduler.flush();
        assert_eq!(3, results.len());
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(JoinerError::InvalidQuery(_))));
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_failed_query_keeps_its_slot() {
        let mut scheduler = scheduler(2);
        scheduler.submit(query(0));
        scheduler.submit(
            QueryInfo::new(vec![7], vec![], vec![], vec![ColumnRef::new(0, 7, 0)]).unwrap(),
        );

        let results = scheduler.flush();
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(JoinerError::RelationNotFound(7))));
        assert!(scheduler.flush().is_empty());
    }
}

//! Block dispatcher: bounded parallel transform execution with ordered output.
//!
//! Architecture (one pool per combination, built and torn down inside
//! [`dispatch`]):
//!
//! ```text
//! control thread ──batches──▶ bounded work queue ──▶ N workers
//!                                                        │
//! sink ◀── collector (reorders by index) ◀── bounded done queue
//! ```
//!
//! - The control thread zips the per-stream block sequences positionally into
//!   tuples and submits them in batches; submission blocks when the bounded
//!   work queue is full (backpressure, which is what bounds peak memory).
//! - Workers apply the transform to each tuple and push `(index, result)`.
//! - The collector holds completed blocks in a reorder buffer and feeds the
//!   sink strictly in submission order, however the workers finish.
//!
//! All threads are scoped, so every exit path (including a failing transform
//! or a failing sink) joins the pool before `dispatch` returns. A failure
//! aborts the remaining dispatch; the caller must discard any partial output.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Sender, SendTimeoutError, bounded};
use log::{debug, trace};

use crate::block::Block;
use crate::error::{PipelineError, Result};
use crate::stream::BlockIter;
use crate::transform::{Transform, TransformError};

/// Tuples per submitted batch. Internal tuning only: amortizes channel
/// traffic, never visible in the output contract.
const BATCH_SIZE: usize = 16;

/// How often a blocked submission re-checks the abort flag.
const SUBMIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// One unit of submission: a run of consecutive block tuples.
struct Batch {
    first_index: u64,
    tuples: Vec<Vec<Block>>,
}

/// Submit one batch to the bounded work queue without deadlocking on abort.
///
/// A plain blocking `send` can wedge the control thread forever: if the
/// collector exits early (sink failure, transform error at the reorder head)
/// the workers stop draining the queue, and a full queue then never frees a
/// slot. Polling with a timeout lets the submission notice the abort flag and
/// give up. Returns whether the batch was accepted.
fn submit(work_tx: &Sender<Batch>, abort: &AtomicBool, mut batch: Batch) -> bool {
    loop {
        if abort.load(Ordering::Relaxed) {
            return false;
        }
        match work_tx.send_timeout(batch, SUBMIT_POLL_INTERVAL) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(returned)) => batch = returned,
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

/// Read the next positional block tuple, one block from every source.
///
/// Iteration is lock-step: the tuple sequence ends at the shortest source,
/// even if the others still hold data. Frame-count equality is validated
/// earlier, but the zip does not structurally assume it.
fn next_tuple(sources: &mut [BlockIter]) -> Result<Option<Vec<Block>>> {
    let mut tuple = Vec::with_capacity(sources.len());
    for source in sources.iter_mut() {
        match source.next() {
            Some(Ok(block)) => tuple.push(block),
            Some(Err(e)) => return Err(e),
            None => return Ok(None),
        }
    }
    Ok(Some(tuple))
}

/// Run `transform` over every positional block tuple of the combination,
/// feeding transformed blocks to `sink` in submission order.
///
/// `sink(index, block)` is invoked exactly once per tuple, with `index`
/// counting from zero, in strictly increasing order. Returns the number of
/// blocks emitted.
pub fn dispatch<F>(mut sources: Vec<BlockIter>, transform: &dyn Transform, sink: F) -> Result<u64>
where
    F: FnMut(u64, Block) -> Result<()> + Send,
{
    if sources.is_empty() {
        return Ok(0);
    }

    let workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    debug!(
        "dispatching {} input stream(s) across {} worker(s)",
        sources.len(),
        workers
    );

    let (work_tx, work_rx) = bounded::<Batch>(workers * 2);
    let (done_tx, done_rx) =
        bounded::<(u64, std::result::Result<Block, TransformError>)>(workers * BATCH_SIZE * 2);
    let abort = AtomicBool::new(false);

    std::thread::scope(|s| {
        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let done_tx = done_tx.clone();
            let abort = &abort;
            s.spawn(move || {
                // Every batch taken from the queue is processed to completion
                // even after an abort, so the emitted index sequence never has
                // holes; the abort flag only stops further submission.
                for batch in work_rx.iter() {
                    for (offset, tuple) in batch.tuples.into_iter().enumerate() {
                        let index = batch.first_index + offset as u64;
                        let result = transform.apply(&tuple);
                        if result.is_err() {
                            abort.store(true, Ordering::Relaxed);
                        }
                        if done_tx.send((index, result)).is_err() {
                            return;
                        }
                    }
                }
            });
        }
        // Workers hold the only remaining senders; the done channel closes
        // once they all exit.
        drop(done_tx);

        let collector = s.spawn({
            let abort = &abort;
            let mut sink = sink;
            let name = transform.name().to_string();
            move || -> Result<u64> {
                let mut pending: BTreeMap<u64, std::result::Result<Block, TransformError>> =
                    BTreeMap::new();
                let mut next = 0u64;
                let mut emitted = 0u64;
                for (index, result) in done_rx.iter() {
                    pending.insert(index, result);
                    while let Some(result) = pending.remove(&next) {
                        match result {
                            Ok(block) => {
                                trace!("block {next} complete ({} samples)", block.len());
                                if let Err(e) = sink(next, block) {
                                    abort.store(true, Ordering::Relaxed);
                                    return Err(e);
                                }
                                emitted += 1;
                                next += 1;
                            }
                            Err(e) => {
                                abort.store(true, Ordering::Relaxed);
                                return Err(PipelineError::Transform {
                                    name,
                                    index: next,
                                    reason: e.to_string(),
                                });
                            }
                        }
                    }
                }
                // The in-order sweep above surfaces errors as they reach the
                // reorder head; anything still pending at close is a bug
                // guard, not an expected path.
                let first_err = pending
                    .iter()
                    .find(|(_, r)| r.is_err())
                    .map(|(&index, _)| index);
                if let Some(index) = first_err {
                    abort.store(true, Ordering::Relaxed);
                    let reason = match pending.remove(&index) {
                        Some(Err(e)) => e.to_string(),
                        _ => String::new(),
                    };
                    return Err(PipelineError::Transform { name, index, reason });
                }
                Ok(emitted)
            }
        });

        // Control loop: zip, batch, submit. Backpressure comes from the
        // bounded work queue.
        let mut read_error: Option<PipelineError> = None;
        let mut index = 0u64;
        let mut batch: Vec<Vec<Block>> = Vec::with_capacity(BATCH_SIZE);
        let mut first_index = 0u64;
        loop {
            if abort.load(Ordering::Relaxed) {
                break;
            }
            match next_tuple(&mut sources) {
                Ok(Some(tuple)) => {
                    if batch.is_empty() {
                        first_index = index;
                    }
                    batch.push(tuple);
                    index += 1;
                    if batch.len() == BATCH_SIZE {
                        let full = Batch {
                            first_index,
                            tuples: std::mem::take(&mut batch),
                        };
                        if !submit(&work_tx, &abort, full) {
                            break;
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    abort.store(true, Ordering::Relaxed);
                    read_error = Some(e);
                    break;
                }
            }
        }
        if read_error.is_none() && !batch.is_empty() && !abort.load(Ordering::Relaxed) {
            let _ = submit(
                &work_tx,
                &abort,
                Batch {
                    first_index,
                    tuples: batch,
                },
            );
        }
        // Closing the work queue lets idle workers exit; the collector then
        // drains whatever is in flight.
        drop(work_tx);
        drop(work_rx);

        let collected = collector.join().unwrap_or_else(|_| {
            Err(PipelineError::Config("dispatch collector panicked".to_string()))
        });

        match (collected, read_error) {
            (Err(e), _) => Err(e),
            (Ok(_), Some(e)) => Err(e),
            (Ok(emitted), None) => Ok(emitted),
        }
    })
}

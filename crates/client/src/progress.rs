//! Progress of on-chain writes.
//!
//! Every write is reported as a lazy, finite stream: a `Submitted` event
//! once the transaction is accepted by the node, then a `Confirmed` event
//! once it is mined. Nothing runs until the stream is polled. Dropping the
//! stream stops waiting but cannot revoke a submitted transaction.

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};

use crate::contract::TxHandle;
use crate::error::{ClientError, ClientResult};
use crate::write_queue::WriteGuard;

/// One step of a write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEvent<T> {
    /// The transaction was submitted and is waiting to be mined
    Submitted { tx: TxHandle },
    /// The transaction was mined
    Confirmed(T),
}

/// Stream of progress events for a single write
pub type ProgressStream<T> = BoxStream<'static, ClientResult<ProgressEvent<T>>>;

/// A submitted transaction, with the write queue slot held for it
pub(crate) struct Submission {
    pub tx: TxHandle,
    pub guard: Option<WriteGuard>,
}

type Confirm<T> = Box<dyn FnOnce(TxHandle) -> BoxFuture<'static, ClientResult<T>> + Send>;

enum Step<T> {
    Submit(BoxFuture<'static, ClientResult<Submission>>, Confirm<T>),
    Confirm(BoxFuture<'static, ClientResult<T>>, Option<WriteGuard>),
    Finished,
}

/// Build the progress stream of a write from its submit and confirm halves
pub(crate) fn progress_stream<T, C>(submit: BoxFuture<'static, ClientResult<Submission>>, confirm: C) -> ProgressStream<T>
where
    T: Send + 'static,
    C: FnOnce(TxHandle) -> BoxFuture<'static, ClientResult<T>> + Send + 'static,
{
    let start = Step::Submit(submit, Box::new(confirm) as Confirm<T>);

    stream::unfold(start, |step| async move {
        match step {
            Step::Submit(submit, confirm) => match submit.await {
                Ok(Submission { tx, guard }) => {
                    let next = Step::Confirm(confirm(tx.clone()), guard);
                    Some((Ok(ProgressEvent::Submitted { tx }), next))
                }
                Err(e) => Some((Err(e), Step::Finished)),
            },
            Step::Confirm(confirm, guard) => {
                let result = confirm.await;
                drop(guard);
                Some((result.map(ProgressEvent::Confirmed), Step::Finished))
            }
            Step::Finished => None,
        }
    })
    .boxed()
}

/// A stream that fails before anything is submitted
pub(crate) fn failed<T: Send + 'static>(err: ClientError) -> ProgressStream<T> {
    stream::once(async move { Err(err) }).boxed()
}

/// Drive a progress stream to the end, returning the transaction and the
/// confirmed value
pub async fn complete<T>(mut progress: ProgressStream<T>) -> ClientResult<(TxHandle, T)> {
    let mut submitted = None;
    while let Some(event) = progress.next().await {
        match event? {
            ProgressEvent::Submitted { tx } => submitted = Some(tx),
            ProgressEvent::Confirmed(value) => {
                if let Some(tx) = submitted {
                    return Ok((tx, value));
                }
                break;
            }
        }
    }
    Err(ClientError::InvalidParams(
        "progress stream ended without a confirmed transaction".to_string(),
    ))
}

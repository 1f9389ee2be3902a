//
// queue.rs
//
// Serialized intent channel in front of the dispatcher
//

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::dispatcher::{Dispatcher, Intent, Outcome};

type Envelope = (Intent, Option<oneshot::Sender<Outcome>>);

/// Handle for submitting intents. Cheap to clone; every clone feeds the same
/// queue, so intents from one sender are applied in the order they were sent.
#[derive(Clone)]
pub struct IntentSender {
    tx: mpsc::UnboundedSender<Envelope>,
}

impl IntentSender {
    /// Enqueue without waiting for the result.
    pub fn post(&self, intent: Intent) {
        if self.tx.send((intent, None)).is_err() {
            log::warn!("Intent queue is closed, dropping intent");
        }
    }

    /// Enqueue and wait until the dispatcher has applied it.
    ///
    /// A closed queue yields `Outcome::Unchanged`.
    pub async fn dispatch(&self, intent: Intent) -> Outcome {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.tx.send((intent, Some(reply_tx))).is_err() {
            log::warn!("Intent queue is closed, dropping intent");
            return Outcome::Unchanged;
        }
        reply_rx.await.unwrap_or(Outcome::Unchanged)
    }
}

/// The task that owns the dispatcher.
pub struct IntentQueue;

impl IntentQueue {
    /// Move `dispatcher` onto its own task.
    ///
    /// The task ends when every [`IntentSender`] is dropped and hands the
    /// dispatcher back through the join handle.
    pub fn spawn(dispatcher: Dispatcher) -> (IntentSender, JoinHandle<Dispatcher>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run(dispatcher, rx));
        (IntentSender { tx }, handle)
    }
}

async fn run(mut dispatcher: Dispatcher, mut rx: mpsc::UnboundedReceiver<Envelope>) -> Dispatcher {
    while let Some((intent, reply)) = rx.recv().await {
        let outcome = dispatcher.dispatch(intent);
        if let Some(reply) = reply {
            // The waiter may have given up; nothing to do then.
            let _ = reply.send(outcome);
        }
    }
    log::trace!("Intent queue closed");
    dispatcher
}

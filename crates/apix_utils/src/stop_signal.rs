//! Single-use stop signals for background tasks, such as progress loggers.
//!
//! [StopTx::stop] consumes the sender, so a signal can be fired at most once. Dropping the
//! sender without firing it also stops the receiver.

use std::{future::Future, pin::Pin, task};

use tokio::sync::oneshot::{self, Receiver, Sender};

pub struct StopTx(Sender<()>);

impl StopTx {
    pub fn stop(self) {
        // The receiving task may already have exited; there is nothing left to stop then.
        let _ = self.0.send(());
    }
}

pub struct StopRx(Receiver<()>);

impl Future for StopRx {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut task::Context<'_>) -> task::Poll<Self::Output> {
        // Either an explicit stop or a dropped sender ends the wait.
        Pin::new(&mut self.0).poll(cx).map(|_| ())
    }
}

pub fn make_pair() -> (StopTx, StopRx) {
    let (tx, rx) = oneshot::channel();
    (StopTx(tx), StopRx(rx))
}

use crate::signal::Signal;
use parking_lot::Mutex;
use std::fmt::Debug;
use tickwise_integration::channel::{ChannelTxDroppable, UnboundedTx};

/// Append-only destination for accepted [`Signal`]s, eg/ a persistence writer.
///
/// Called synchronously after a signal enters the in-memory history, so implementations must
/// not block. A failing sink never prevents signal emission.
pub trait SignalSink
where
    Self: Debug + Send + Sync + 'static,
{
    fn record_signal(&self, signal: &Signal);
}

/// [`SignalSink`] that discards every [`Signal`].
#[derive(Debug, Copy, Clone, Default)]
pub struct NoopSignalSink;

impl SignalSink for NoopSignalSink {
    fn record_signal(&self, _: &Signal) {}
}

/// [`SignalSink`] forwarding [`Signal`]s over a channel.
///
/// Forwarding is disabled, with a warning, once the receiver has been dropped.
#[derive(Debug)]
pub struct ChannelSignalSink {
    tx: Mutex<ChannelTxDroppable<UnboundedTx<Signal>>>,
}

impl ChannelSignalSink {
    pub fn new(tx: UnboundedTx<Signal>) -> Self {
        Self {
            tx: Mutex::new(ChannelTxDroppable::new(tx)),
        }
    }

    pub fn is_active(&self) -> bool {
        self.tx.lock().is_active()
    }
}

impl SignalSink for ChannelSignalSink {
    fn record_signal(&self, signal: &Signal) {
        self.tx.lock().send(signal.clone());
    }
}

//! In-process device link
//!
//! A symmetric pair of channel-backed endpoints standing in for the
//! wearable message system. Each side delivers messages to the other and
//! receives what the other delivered.

use async_trait::async_trait;
use huelink_core::DeviceMessage;
use tokio::sync::mpsc;

use crate::error::{Result, TransportError};
use crate::traits::{DeviceReceiver, DeviceSender};

/// Sending endpoint of one link direction
#[derive(Clone)]
pub struct ChannelSender {
    tx: mpsc::Sender<DeviceMessage>,
}

/// Receiving endpoint of one link direction
pub struct ChannelReceiver {
    rx: mpsc::Receiver<DeviceMessage>,
}

/// One side of an in-process link
pub struct LinkEndpoint {
    pub sender: ChannelSender,
    pub receiver: ChannelReceiver,
}

/// Build a symmetric in-process link
///
/// What one side's sender delivers arrives at the other side's receiver.
pub fn link(capacity: usize) -> (LinkEndpoint, LinkEndpoint) {
    let (a_tx, b_rx) = mpsc::channel(capacity);
    let (b_tx, a_rx) = mpsc::channel(capacity);
    (
        LinkEndpoint {
            sender: ChannelSender { tx: a_tx },
            receiver: ChannelReceiver { rx: a_rx },
        },
        LinkEndpoint {
            sender: ChannelSender { tx: b_tx },
            receiver: ChannelReceiver { rx: b_rx },
        },
    )
}

#[async_trait]
impl DeviceSender for ChannelSender {
    async fn deliver(&self, message: &DeviceMessage) -> Result<()> {
        self.tx
            .send(message.clone())
            .await
            .map_err(|_| TransportError::LinkClosed)
    }
}

#[async_trait]
impl DeviceReceiver for ChannelReceiver {
    async fn recv(&mut self) -> Option<DeviceMessage> {
        self.rx.recv().await
    }
}

//! Callback fan-out to matching connections.

use std::sync::Arc;

use paygate_core::{CallbackNotification, CorrelationKey};
use tracing::{debug, warn};

use super::registry::{ConnectionId, ConnectionRegistry};

/// Why a matched connection did not get the notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryFailure {
    /// The writer is behind by a full queue.
    #[error("send queue full")]
    QueueFull,
    /// The writer task has exited.
    #[error("connection closed")]
    Closed,
}

/// Per-recipient outcome of one fan-out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Recipients whose queue accepted the message, in registration order.
    pub delivered: Vec<ConnectionId>,
    /// Recipients that were skipped, with the reason.
    pub failed: Vec<(ConnectionId, DeliveryFailure)>,
}

impl FanOutReport {
    /// Connections that matched, whether or not delivery worked.
    pub fn recipients(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    /// Whether every recipient got it.
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Queue `payload` on every connection registered under `key`.
///
/// A failing recipient is recorded and skipped; the rest still get it.
pub fn deliver(
    registry: &ConnectionRegistry,
    key: &CorrelationKey,
    payload: &Arc<String>,
) -> FanOutReport {
    let mut report = FanOutReport::default();
    for (id, handle) in registry.for_each_matching(key) {
        match handle.send(Arc::clone(payload)) {
            Ok(()) => report.delivered.push(id),
            Err(failure) => {
                warn!(conn_id = %id, key = %key, error = %failure, "failed to deliver callback");
                report.failed.push((id, failure));
            }
        }
    }
    debug!(
        key = %key,
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "callback fan-out"
    );
    report
}

/// Serialize `notification` and deliver it under its `ref2`.
pub fn fan_out(registry: &ConnectionRegistry, notification: &CallbackNotification) -> FanOutReport {
    let payload = match notification.to_json() {
        Ok(json) => Arc::new(json),
        Err(e) => {
            warn!(error = %e, "failed to serialize callback notification");
            return FanOutReport::default();
        }
    };
    deliver(registry, &notification.correlation_key(), &payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::connection::ConnectionHandle;
    use tokio::sync::mpsc;

    fn connect(
        registry: &ConnectionRegistry,
        key: &str,
    ) -> (ConnectionId, mpsc::Receiver<Arc<String>>) {
        let (tx, rx) = mpsc::channel(4);
        let id = registry.register(Arc::new(ConnectionHandle::new(tx)), key.into());
        (id, rx)
    }

    fn notification(ref2: &str) -> CallbackNotification {
        CallbackNotification {
            code: 0,
            message: "success".into(),
            transaction_id: "T-1".into(),
            key1: "inv-1".into(),
            key2: ref2.into(),
        }
    }

    #[test]
    fn only_matching_key_receives() {
        let reg = ConnectionRegistry::new();
        let (a, mut rx_a) = connect(&reg, "tx1");
        let (_b, mut rx_b) = connect(&reg, "tx2");

        let report = fan_out(&reg, &notification("tx1"));
        assert_eq!(report.delivered, vec![a]);
        assert!(report.is_clean());

        let got: serde_json::Value = serde_json::from_str(&rx_a.try_recv().unwrap()).unwrap();
        assert_eq!(got["ref2"], "tx1");
        assert_eq!(got["transactionId"], "T-1");
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn every_match_receives() {
        let reg = ConnectionRegistry::new();
        let (a, mut rx_a) = connect(&reg, "tx1");
        let (b, mut rx_b) = connect(&reg, "tx1");

        let report = fan_out(&reg, &notification("tx1"));
        assert_eq!(report.delivered, vec![a, b]);
        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn failed_recipient_does_not_stop_later_ones() {
        let reg = ConnectionRegistry::new();
        let (a, rx_a) = connect(&reg, "tx1");
        let (b, mut rx_b) = connect(&reg, "tx1");
        drop(rx_a);

        let report = fan_out(&reg, &notification("tx1"));
        assert_eq!(report.failed, vec![(a, DeliveryFailure::Closed)]);
        assert_eq!(report.delivered, vec![b]);
        assert_eq!(report.recipients(), 2);
        assert!(!report.is_clean());
        assert!(rx_b.try_recv().is_ok());
    }

    #[test]
    fn full_queue_is_a_per_recipient_failure() {
        let reg = ConnectionRegistry::new();
        let (tx, _rx) = mpsc::channel(1);
        let a = reg.register(Arc::new(ConnectionHandle::new(tx)), "tx1".into());

        let payload = Arc::new("{}".to_string());
        let first = deliver(&reg, &"tx1".into(), &payload);
        let second = deliver(&reg, &"tx1".into(), &payload);
        assert_eq!(first.delivered, vec![a]);
        assert_eq!(second.failed, vec![(a, DeliveryFailure::QueueFull)]);
    }

    #[test]
    fn unregistered_connection_is_skipped() {
        let reg = ConnectionRegistry::new();
        let (a, mut rx_a) = connect(&reg, "tx1");
        let (_b, _rx_b) = connect(&reg, "tx2");

        assert_eq!(fan_out(&reg, &notification("tx1")).delivered, vec![a]);
        let _ = rx_a.try_recv();

        assert!(reg.unregister(a));
        let report = fan_out(&reg, &notification("tx1"));
        assert_eq!(report.recipients(), 0);
        assert!(rx_a.try_recv().is_err());
    }

    #[test]
    fn empty_ref2_reaches_connections_without_ref() {
        let reg = ConnectionRegistry::new();
        let (anon, mut rx_anon) = connect(&reg, "");
        let (_keyed, mut rx_keyed) = connect(&reg, "tx1");

        let report = fan_out(&reg, &notification(""));
        assert_eq!(report.delivered, vec![anon]);
        assert!(rx_anon.try_recv().is_ok());
        assert!(rx_keyed.try_recv().is_err());
    }
}

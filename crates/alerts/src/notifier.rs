//! Alert notification logic.

use crate::evaluator::{evaluate, Evaluation};
use crate::store::Store;
use crate::telegram::{format_alert_message, TelegramBot};
use coinwatch_core::CoinSnapshot;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Database error: {0}")]
    Store(#[from] crate::store::StoreError),
}

/// Delivery error from the outbound channel. Logged, never retried.
pub type SendError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound delivery seam, implemented by the Telegram bot.
#[async_trait::async_trait]
pub trait AlertSender: Send + Sync {
    async fn send(&self, chat_id: i64, message: &str) -> Result<(), SendError>;
}

#[async_trait::async_trait]
impl AlertSender for TelegramBot {
    async fn send(&self, chat_id: i64, message: &str) -> Result<(), SendError> {
        self.send_alert(chat_id, message).await?;
        Ok(())
    }
}

/// Evaluates snapshots against stored thresholds and sends notifications.
pub struct Notifier {
    store: Store,
    sender: Arc<dyn AlertSender>,
}

impl Notifier {
    pub fn new(store: Store, sender: Arc<dyn AlertSender>) -> Self {
        Self { store, sender }
    }

    /// Evaluate one snapshot against every enabled threshold for its coin.
    /// Returns the number of notifications sent.
    pub async fn process_snapshot(&self, snapshot: &CoinSnapshot) -> Result<u32, NotifierError> {
        let thresholds = self.store.thresholds_for_coin(&snapshot.symbol).await?;
        let mut sent_count = 0u32;

        for threshold in thresholds {
            let key = threshold.key();
            let fired = self.store.is_fired(&key).await?;

            match evaluate(&threshold, snapshot, fired) {
                Evaluation::Fire => {
                    let Some(observed) = snapshot.change(threshold.window) else {
                        continue;
                    };

                    // Fired-state goes down before the send attempt: delivery
                    // failure must not replay the crossing (at-most-once).
                    self.store.mark_fired(&key).await?;

                    let message = format_alert_message(
                        &threshold.coin_symbol,
                        threshold.window,
                        observed,
                        threshold.percent_trigger,
                    );

                    match self.sender.send(threshold.user_id, &message).await {
                        Ok(()) => {
                            info!(
                                user_id = threshold.user_id,
                                symbol = %threshold.coin_symbol,
                                window = %threshold.window,
                                observed = observed,
                                trigger = threshold.percent_trigger,
                                "Alert sent"
                            );
                            sent_count += 1;
                        }
                        Err(e) => {
                            error!(
                                user_id = threshold.user_id,
                                symbol = %threshold.coin_symbol,
                                error = %e,
                                "Failed to send alert"
                            );
                        }
                    }
                }
                Evaluation::Rearm => {
                    self.store.clear_fired(&key).await?;
                    debug!(
                        user_id = threshold.user_id,
                        symbol = %threshold.coin_symbol,
                        window = %threshold.window,
                        "Threshold re-armed"
                    );
                }
                Evaluation::Hold | Evaluation::Skip => {}
            }
        }

        Ok(sent_count)
    }

    /// Run a full poll cycle over fetched snapshots.
    pub async fn process_cycle(&self, snapshots: &[CoinSnapshot]) -> Result<u32, NotifierError> {
        let mut sent = 0;
        for snapshot in snapshots {
            sent += self.process_snapshot(snapshot).await?;
        }
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinwatch_core::{AlertThreshold, ChangeWindow};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;

    /// Records messages instead of talking to Telegram.
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(i64, String)>>,
        fail: std::sync::atomic::AtomicBool,
    }

    impl RecordingSender {
        fn messages(&self) -> Vec<(i64, String)> {
            self.sent.lock().unwrap().clone()
        }

        fn set_failing(&self, failing: bool) {
            self.fail
                .store(failing, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl AlertSender for RecordingSender {
        async fn send(&self, chat_id: i64, message: &str) -> Result<(), SendError> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err("network down".into());
            }
            self.sent.lock().unwrap().push((chat_id, message.to_string()));
            Ok(())
        }
    }

    async fn setup(threshold: AlertThreshold) -> (Notifier, Arc<RecordingSender>, Store) {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        store.add(&threshold).await.unwrap();
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(store.clone(), sender.clone());
        (notifier, sender, store)
    }

    fn btc_snap(change_24h: f64) -> CoinSnapshot {
        CoinSnapshot::new("BTC", 65000.0).with_change(ChangeWindow::Hour24, change_24h)
    }

    #[tokio::test]
    async fn crossing_fires_once_with_both_percentages() {
        let (notifier, sender, _store) =
            setup(AlertThreshold::new(42, "BTC", ChangeWindow::Hour24, 5.0)).await;

        let snap = btc_snap(6.2);
        assert_eq!(notifier.process_snapshot(&snap).await.unwrap(), 1);

        let messages = sender.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].0, 42);
        assert!(messages[0].1.contains("6.2"));
        assert!(messages[0].1.contains("5.0"));

        // Same snapshot again: still above, already notified
        assert_eq!(notifier.process_snapshot(&snap).await.unwrap(), 0);
        assert_eq!(sender.messages().len(), 1);
    }

    #[tokio::test]
    async fn below_trigger_does_not_fire_and_rearms() {
        let threshold = AlertThreshold::new(42, "BTC", ChangeWindow::Hour24, 5.0);
        let key = threshold.key();
        let (notifier, sender, store) = setup(threshold).await;

        assert_eq!(notifier.process_snapshot(&btc_snap(4.9)).await.unwrap(), 0);
        assert!(sender.messages().is_empty());
        assert!(!store.is_fired(&key).await.unwrap());

        // Fire, dip, fire again
        assert_eq!(notifier.process_snapshot(&btc_snap(6.2)).await.unwrap(), 1);
        assert_eq!(notifier.process_snapshot(&btc_snap(4.9)).await.unwrap(), 0);
        assert!(!store.is_fired(&key).await.unwrap());
        assert_eq!(notifier.process_snapshot(&btc_snap(5.5)).await.unwrap(), 1);
        assert_eq!(sender.messages().len(), 2);
    }

    #[tokio::test]
    async fn delivery_failure_keeps_fired_state() {
        let threshold = AlertThreshold::new(42, "BTC", ChangeWindow::Hour24, 5.0);
        let key = threshold.key();
        let (notifier, sender, store) = setup(threshold).await;

        sender.set_failing(true);
        assert_eq!(notifier.process_snapshot(&btc_snap(6.2)).await.unwrap(), 0);

        // At-most-once: the crossing is spent even though delivery failed
        assert!(store.is_fired(&key).await.unwrap());
        sender.set_failing(false);
        assert_eq!(notifier.process_snapshot(&btc_snap(6.5)).await.unwrap(), 0);
        assert!(sender.messages().is_empty());
    }

    #[tokio::test]
    async fn missing_window_skips_without_touching_state() {
        let threshold = AlertThreshold::new(42, "BTC", ChangeWindow::Hour24, 5.0);
        let key = threshold.key();
        let (notifier, sender, store) = setup(threshold).await;

        assert_eq!(notifier.process_snapshot(&btc_snap(6.2)).await.unwrap(), 1);
        assert!(store.is_fired(&key).await.unwrap());

        // Snapshot with no 24h reading must not re-arm or fire
        let partial = CoinSnapshot::new("BTC", 65000.0).with_change(ChangeWindow::Hour1, 0.1);
        assert_eq!(notifier.process_snapshot(&partial).await.unwrap(), 0);
        assert!(store.is_fired(&key).await.unwrap());
        assert_eq!(sender.messages().len(), 1);
    }

    #[tokio::test]
    async fn each_user_notified_independently() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        store
            .add(&AlertThreshold::new(1, "BTC", ChangeWindow::Hour24, 5.0))
            .await
            .unwrap();
        store
            .add(&AlertThreshold::new(2, "BTC", ChangeWindow::Hour24, 10.0))
            .await
            .unwrap();
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(store, sender.clone());

        // 6.2% crosses user 1's trigger but not user 2's
        assert_eq!(notifier.process_snapshot(&btc_snap(6.2)).await.unwrap(), 1);
        assert_eq!(sender.messages()[0].0, 1);

        // 12% now also crosses user 2's; user 1 is still held
        assert_eq!(notifier.process_snapshot(&btc_snap(12.0)).await.unwrap(), 1);
        assert_eq!(sender.messages()[1].0, 2);
    }

    #[tokio::test]
    async fn process_cycle_covers_all_coins() {
        let store = Store::connect("sqlite::memory:").await.unwrap();
        store
            .add(&AlertThreshold::new(1, "BTC", ChangeWindow::Hour24, 5.0))
            .await
            .unwrap();
        store
            .add(&AlertThreshold::new(1, "ETH", ChangeWindow::Hour1, -2.0))
            .await
            .unwrap();
        let sender = Arc::new(RecordingSender::default());
        let notifier = Notifier::new(store, sender.clone());

        let snapshots = vec![
            btc_snap(6.2),
            CoinSnapshot::new("ETH", 3200.0).with_change(ChangeWindow::Hour1, -3.5),
            CoinSnapshot::new("DOGE", 0.1).with_change(ChangeWindow::Hour24, 50.0),
        ];

        assert_eq!(notifier.process_cycle(&snapshots).await.unwrap(), 2);
    }
}

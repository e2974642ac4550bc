use crate::domain::Epoch;
use crate::store::StoreSnapshot;
use tokio::sync::watch::Receiver;
use tracing::{info, instrument};

/// Logs every committed change of the store until the store goes away. Returns the number of changes seen.
#[instrument(skip_all)]
pub async fn store_listener(mut rx: Receiver<StoreSnapshot>) -> usize {
    let mut epoch: Epoch = rx.borrow().epoch;
    let mut changes = 0;

    while rx.changed().await.is_ok() {
        let snapshot: StoreSnapshot = rx.borrow_and_update().clone();
        changes += 1;

        if snapshot.epoch != epoch {
            info!(epoch = %snapshot.epoch, "🟣 Epoch changed from {} to {}", epoch, snapshot.epoch);
            epoch = snapshot.epoch;
        }
        match snapshot.fix {
            Some(fix) => info!(epoch = %epoch, "🟢 Location at {:.6}, {:.6} (±{:?} m)", fix.lat, fix.lng, fix.accuracy),
            None => info!(epoch = %epoch, "⚪ No location"),
        }
    }

    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::LocationFix;
    use pretty_assertions::assert_eq;
    use test_log::test;
    use tokio::sync::watch;

    #[test(tokio::test)]
    async fn store_listener_stops_when_the_store_is_gone() {
        let epoch = Epoch::from_millis(1_000);
        let (tx, rx) = watch::channel(StoreSnapshot { fix: None, epoch });
        let listener = tokio::spawn(store_listener(rx));

        tx.send(StoreSnapshot {
            fix: Some(LocationFix {
                lat: 40.88,
                lng: -72.94,
                accuracy: None,
                client_timestamp: 1_100,
                server_timestamp: 1_100,
            }),
            epoch,
        })
        .unwrap_or_default();
        drop(tx);

        let changes = listener.await.unwrap_or_default();

        assert_eq!(changes, 1);
    }
}

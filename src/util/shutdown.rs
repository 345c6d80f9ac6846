//! Shutdown signalling shared by background loops.

use tokio::sync::watch;

/// Resolve once the shutdown flag is set or its sender is gone.
pub async fn stopped(rx: &mut watch::Receiver<bool>) {
    loop {
        let stop = *rx.borrow_and_update();
        if stop || rx.changed().await.is_err() {
            return;
        }
    }
}

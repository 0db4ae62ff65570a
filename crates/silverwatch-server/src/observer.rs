//! The change observer: turns qualifying status-store mutations into logged
//! alerts and pushes each one through the broadcast hub.
//!
//! The observer owns one change feed for its whole life. Each change is
//! processed to completion (read current status, read profile, append to the
//! alert log, broadcast) before the next is polled, so alerts are appended
//! and broadcast in journal order.

use std::{sync::Arc, time::Duration};

use silverwatch_core::{
  alert::{AlertSnapshot, NewAlert},
  change::{ChangeFeed, ChangeFilter, FeedPoll, StatusChange},
  store::MonitorStore,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
  error::{Error, Result},
  hub::BroadcastHub,
};

#[derive(Debug, Clone)]
pub struct ObserverConfig {
  /// Checkpoint name for the feed.
  pub consumer:      String,
  /// Sleep between polls when the feed is caught up.
  pub poll_interval: Duration,
  /// Sleep after a failed poll before trying again.
  pub retry_delay:   Duration,
}

impl Default for ObserverConfig {
  fn default() -> Self {
    Self {
      consumer:      "severity-observer".to_owned(),
      poll_interval: Duration::from_millis(250),
      retry_delay:   Duration::from_secs(2),
    }
  }
}

pub struct ChangeObserver<S> {
  store:  Arc<S>,
  hub:    Arc<BroadcastHub>,
  config: ObserverConfig,
}

impl<S> ChangeObserver<S>
where
  S: MonitorStore + 'static,
{
  pub fn new(store: Arc<S>, hub: Arc<BroadcastHub>, config: ObserverConfig) -> Self {
    Self { store, hub, config }
  }

  /// Open the feed and start the observer task.
  ///
  /// Fails with [`Error::FeedUnavailable`] if the feed cannot be opened; in
  /// that case no task is started.
  pub async fn spawn(self) -> Result<ObserverHandle> {
    let filter = ChangeFilter::severity(self.config.consumer.clone());
    let feed = self
      .store
      .open_feed(filter)
      .await
      .map_err(|e| Error::FeedUnavailable(Box::new(e)))?;
    info!(consumer = %self.config.consumer, position = feed.position(), "change feed opened");

    Ok(self.start(feed))
  }

  /// Start the observer task on an already opened feed.
  pub fn start<F>(self, feed: F) -> ObserverHandle
  where
    F: ChangeFeed + 'static,
  {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(self.run(feed, shutdown_rx));
    ObserverHandle { shutdown: shutdown_tx, task }
  }

  async fn run<F>(self, mut feed: F, mut shutdown: watch::Receiver<bool>)
  where
    F: ChangeFeed,
  {
    loop {
      let polled = tokio::select! {
        biased;
        _ = shutdown.changed() => break,
        polled = feed.poll() => polled,
      };

      match polled {
        Ok(FeedPoll::Change(change)) => {
          self.process(change).await;
          tokio::task::yield_now().await;
        }
        Ok(FeedPoll::Empty) => {
          if idle(&mut shutdown, self.config.poll_interval).await {
            break;
          }
        }
        Ok(FeedPoll::Invalidated) => {
          warn!(
            position = feed.position(),
            "change journal truncated past cursor; resuming from now"
          );
          if let Err(e) = feed.reset_to_now().await {
            warn!(error = %e, "failed to reset change feed");
            if idle(&mut shutdown, self.config.retry_delay).await {
              break;
            }
          }
        }
        Err(e) => {
          warn!(error = %e, "change feed poll failed; retrying");
          if idle(&mut shutdown, self.config.retry_delay).await {
            break;
          }
        }
      }
    }

    let position = feed.position();
    match feed.close().await {
      Ok(()) => info!(position, "change observer stopped"),
      Err(e) => warn!(position, error = %e, "failed to checkpoint change feed"),
    }
  }

  /// Handle one change. Failures are logged and the change is skipped.
  async fn process(&self, change: StatusChange) {
    let seq = change.seq;

    // The record is read now, not at mutation time, so it may already
    // reflect a later write.
    let status = match self.store.get_status(change.user_id).await {
      Ok(Some(status)) => status,
      Ok(None) => {
        warn!(seq, user_id = %change.user_id, "status record missing; skipping change");
        return;
      }
      Err(e) => {
        warn!(seq, error = %e, "failed to read status; skipping change");
        return;
      }
    };

    let user = match self.store.get_user_public(status.user_id).await {
      Ok(Some(user)) => user,
      Ok(None) => {
        warn!(seq, user_id = %status.user_id, "user profile missing; skipping change");
        return;
      }
      Err(e) => {
        warn!(seq, error = %e, "failed to read user profile; skipping change");
        return;
      }
    };

    let tier = status.severity_tier;
    let input = NewAlert {
      change_seq:     seq,
      operation_type: change.operation,
      observed_at:    change.observed_at,
      changed_fields: change.changed_fields,
      snapshot:       AlertSnapshot { status, user },
    };
    let alert = match self.store.append_alert(input).await {
      Ok(Some(alert)) => alert,
      Ok(None) => {
        debug!(seq, "alert already logged for change");
        return;
      }
      Err(e) => {
        warn!(seq, error = %e, "failed to append alert; skipping change");
        return;
      }
    };

    match self.hub.broadcast(&alert).await {
      Ok(delivered) => info!(seq, alert_id = %alert.id, %tier, delivered, "alert broadcast"),
      Err(e) => warn!(seq, alert_id = %alert.id, error = %e, "failed to broadcast alert"),
    }
  }
}

/// Sleep for `period` unless shutdown is requested first. Returns `true`
/// on shutdown.
async fn idle(shutdown: &mut watch::Receiver<bool>, period: Duration) -> bool {
  tokio::select! {
    biased;
    _ = shutdown.changed() => true,
    _ = tokio::time::sleep(period) => false,
  }
}

/// Owner's handle on a running observer.
pub struct ObserverHandle {
  shutdown: watch::Sender<bool>,
  task:     JoinHandle<()>,
}

impl ObserverHandle {
  /// Ask the observer to stop and wait up to `timeout` for it. An observer
  /// still running after that is aborted.
  pub async fn shutdown(self, timeout: Duration) {
    let _ = self.shutdown.send(true);
    let abort = self.task.abort_handle();
    match tokio::time::timeout(timeout, self.task).await {
      Ok(Ok(())) => {}
      Ok(Err(e)) => warn!(error = %e, "change observer task failed"),
      Err(_) => {
        warn!(?timeout, "change observer did not stop in time; aborting");
        abort.abort();
      }
    }
  }

  pub fn is_finished(&self) -> bool { self.task.is_finished() }
}

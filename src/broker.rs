use crate::frame::{now_ms, EncodedFrame};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;
use tracing::trace;

/// Frames are considered offline once this much time has passed since the
/// last distinct publish.
pub const ONLINE_THRESHOLD_MS: u64 = 5_000;

/// Window the dedup rule keys off (milliseconds, vs. frame capture time).
const DEDUP_WINDOW_MS: u64 = 1_000;

/// Window the FPS accounting keys off (wall-clock, via `tokio::time`).
const FPS_WINDOW: Duration = Duration::from_secs(1);

struct Slot {
    frame: Option<EncodedFrame>,
    sequence: u64,
}

struct FpsWindow {
    counter: u32,
    per_second_fps: u32,
    window_start: Instant,
}

/// A point-in-time snapshot of the broker's bookkeeping, used by the
/// state endpoint.
#[derive(Debug, Clone)]
pub struct BrokerSnapshot {
    pub sequence: u64,
    pub online: bool,
    pub per_second_fps: u32,
    pub width: u32,
    pub height: u32,
    pub has_frame: bool,
}

/// Central single-slot, overwrite-on-publish fan-out hub.
///
/// Holds exactly one "latest" [`EncodedFrame`]; subscribers never see a
/// backlog. The capture loop's `publish` must never block on a slow
/// subscriber, so the critical section here is a single mutex guarding
/// the latest slot plus FPS accounting — no per-subscriber queues.
pub struct FrameBroker {
    slot: Mutex<Slot>,
    fps: Mutex<FpsWindow>,
    notify: Notify,
    closed: std::sync::atomic::AtomicBool,
}

impl FrameBroker {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                frame: None,
                sequence: 0,
            }),
            fps: Mutex::new(FpsWindow {
                counter: 0,
                per_second_fps: 0,
                window_start: Instant::now(),
            }),
            notify: Notify::new(),
            closed: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Publish a newly encoded frame. Called only by the capture loop.
    ///
    /// Applies the dedup rule: identical bytes to the previous publish,
    /// less than 1s after the previous *distinct* publish, are dropped
    /// silently. Otherwise the latest slot, sequence number, and FPS
    /// window are updated and all waiters are woken.
    pub async fn publish(&self, encoded: EncodedFrame) {
        let mut slot = self.slot.lock().await;

        let is_repeat = match &slot.frame {
            Some(prev) => {
                let elapsed = encoded.captured_at_ms.saturating_sub(prev.captured_at_ms);
                prev.same_bytes(&encoded) && elapsed < DEDUP_WINDOW_MS
            }
            None => false,
        };

        if is_repeat {
            trace!("dropping duplicate frame within dedup window");
            return;
        }

        slot.sequence += 1;
        slot.frame = Some(encoded);
        drop(slot);

        self.record_publish().await;
        self.notify.notify_waiters();
    }

    async fn record_publish(&self) {
        let mut fps = self.fps.lock().await;
        let now = Instant::now();
        if now.duration_since(fps.window_start) >= FPS_WINDOW {
            fps.per_second_fps = fps.counter;
            fps.counter = 0;
            fps.window_start = now;
        }
        fps.counter += 1;
    }

    /// Register a new subscriber.
    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        Subscription {
            broker: Arc::clone(self),
            last_seen: 0,
        }
    }

    /// Wake all waiting subscribers with a cancellation signal.
    pub fn close(&self) {
        self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Current FPS, sequence and online-ness, for the state endpoint.
    pub async fn snapshot(&self) -> BrokerSnapshot {
        let slot = self.slot.lock().await;
        let fps = self.fps.lock().await;
        let online = slot
            .frame
            .as_ref()
            .map(|f| now_ms().saturating_sub(f.captured_at_ms) < ONLINE_THRESHOLD_MS)
            .unwrap_or(false);

        BrokerSnapshot {
            sequence: slot.sequence,
            online,
            per_second_fps: fps.per_second_fps,
            width: slot.frame.as_ref().map(|f| f.width).unwrap_or(0),
            height: slot.frame.as_ref().map(|f| f.height).unwrap_or(0),
            has_frame: slot.frame.is_some(),
        }
    }

    /// The most recently published frame, if any. Used by the snapshot
    /// endpoint, which does not go through a [`Subscription`].
    pub async fn latest(&self) -> Option<EncodedFrame> {
        self.slot.lock().await.frame.clone()
    }
}

impl Default for FrameBroker {
    fn default() -> Self {
        Self::new()
    }
}

/// Raised by [`Subscription::next`] when the broker has been closed
/// (supervisor shutdown) while a subscriber was waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// One subscriber's view of the broker. Tracks only the last sequence
/// number it has delivered; holds no per-subscriber frame queue.
pub struct Subscription {
    broker: Arc<FrameBroker>,
    last_seen: u64,
}

impl Subscription {
    /// Wait for and return the next frame whose sequence number is
    /// strictly greater than the last one delivered to this subscription.
    /// If the publisher has moved on since the subscriber was last ready,
    /// the older frames are skipped entirely — only the latest is ever
    /// returned.
    pub async fn next(&mut self) -> Result<EncodedFrame, Cancelled> {
        loop {
            if self.broker.closed.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(Cancelled);
            }

            // Register for the next notification before re-checking the
            // slot: a `notify_waiters()` that lands between the check and
            // the `.await` below must still be observed by this waiter,
            // not missed until the publish after it.
            let notified = self.broker.notify.notified();

            {
                let slot = self.broker.slot.lock().await;
                if slot.sequence > self.last_seen {
                    if let Some(frame) = slot.frame.clone() {
                        self.last_seen = slot.sequence;
                        return Ok(frame);
                    }
                }
            }

            if self.broker.closed.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(Cancelled);
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_at(bytes: &[u8], ms: u64) -> EncodedFrame {
        EncodedFrame::new(bytes.to_vec(), 4, 4, ms)
    }

    #[tokio::test]
    async fn sequence_increases_by_one_per_distinct_publish() {
        let broker = Arc::new(FrameBroker::new());
        broker.publish(frame_at(b"a", 0)).await;
        broker.publish(frame_at(b"b", 2_000)).await;
        broker.publish(frame_at(b"c", 4_000)).await;

        let snap = broker.snapshot().await;
        assert_eq!(snap.sequence, 3);
    }

    #[tokio::test]
    async fn identical_bytes_within_one_second_are_deduped() {
        let broker = Arc::new(FrameBroker::new());
        broker.publish(frame_at(b"same", 0)).await;
        for i in 1..10 {
            broker.publish(frame_at(b"same", i * 10)).await;
        }

        let snap = broker.snapshot().await;
        assert_eq!(snap.sequence, 1);
    }

    #[tokio::test]
    async fn identical_bytes_after_window_elapses_is_a_new_publish() {
        let broker = Arc::new(FrameBroker::new());
        broker.publish(frame_at(b"same", 0)).await;
        broker.publish(frame_at(b"same", 1_500)).await;

        let snap = broker.snapshot().await;
        assert_eq!(snap.sequence, 2);
    }

    #[tokio::test]
    async fn subscriber_skips_backlog_and_sees_latest_only() {
        let broker = Arc::new(FrameBroker::new());
        let mut sub = broker.subscribe();

        broker.publish(frame_at(b"1", 0)).await;
        broker.publish(frame_at(b"2", 2_000)).await;
        broker.publish(frame_at(b"3", 4_000)).await;

        let got = sub.next().await.unwrap();
        assert!(got.same_bytes(&frame_at(b"3", 0)));
    }

    #[tokio::test]
    async fn next_waits_for_a_publish() {
        let broker = Arc::new(FrameBroker::new());
        let mut sub = broker.subscribe();

        let broker2 = Arc::clone(&broker);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            broker2.publish(frame_at(b"late", 0)).await;
        });

        let got = sub.next().await.unwrap();
        assert!(got.same_bytes(&frame_at(b"late", 0)));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn close_wakes_waiters_with_cancelled() {
        let broker = Arc::new(FrameBroker::new());
        let mut sub = broker.subscribe();

        let broker2 = Arc::clone(&broker);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            broker2.close();
        });

        let result = sub.next().await;
        assert_eq!(result, Err(Cancelled));
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn online_is_true_shortly_after_a_publish() {
        let broker = Arc::new(FrameBroker::new());
        broker.publish(frame_at(b"x", now_ms())).await;
        let snap = broker.snapshot().await;
        assert!(snap.online);
    }

    #[tokio::test]
    async fn online_is_false_before_any_publish() {
        let broker = Arc::new(FrameBroker::new());
        let snap = broker.snapshot().await;
        assert!(!snap.online);
        assert!(!snap.has_frame);
    }

    #[tokio::test(start_paused = true)]
    async fn per_second_fps_reflects_closed_window() {
        let broker = Arc::new(FrameBroker::new());
        for i in 0..6u64 {
            broker.publish(frame_at(&[i as u8], i * 1_000_000)).await;
        }

        tokio::time::advance(Duration::from_millis(1_100)).await;
        broker.publish(frame_at(b"boundary", 7_000_000)).await;

        let snap = broker.snapshot().await;
        assert_eq!(snap.per_second_fps, 6);
    }
}

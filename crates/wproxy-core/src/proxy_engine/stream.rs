use std::time::Duration;

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use wproxy_provider_impl::StreamPlan;

/// Pause between two content pieces of a synthesized stream.
pub const PIECE_DELAY: Duration = Duration::from_millis(10);

/// Feeds the frames of `plan` into a channel, pacing the content pieces.
///
/// The task stops as soon as the receiver is dropped.
pub fn paced_frames(plan: StreamPlan) -> mpsc::Receiver<Bytes> {
    let (tx, rx) = mpsc::channel::<Bytes>(32);
    tokio::spawn(async move {
        if tx.send(plan.head).await.is_err() {
            return;
        }
        for piece in plan.pieces {
            if tx.send(piece).await.is_err() {
                debug!(event = "downstream_disconnected");
                return;
            }
            tokio::time::sleep(PIECE_DELAY).await;
        }
        for frame in plan.tail {
            if tx.send(frame).await.is_err() {
                return;
            }
        }
    });
    rx
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use wproxy_provider_impl::stream_plan;

    #[tokio::test(start_paused = true)]
    async fn frames_arrive_in_order_with_pacing() {
        let plan = stream_plan("chatcmpl-x", "gpt-5.1", "abcdefghij", 1).unwrap();
        let expected: Vec<Bytes> = std::iter::once(plan.head.clone())
            .chain(plan.pieces.iter().cloned())
            .chain(plan.tail.iter().cloned())
            .collect();

        let started = Instant::now();
        let mut rx = paced_frames(plan);
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }

        assert_eq!(frames, expected);
        assert_eq!(frames.len(), 1 + 3 + 2);
        assert!(started.elapsed() >= PIECE_DELAY * 3);
    }
}

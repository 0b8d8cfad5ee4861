//! Background task that turns a status-stream body into [`Frame`]s.

use crate::SseDecoder;
use bytes::Bytes;
use core::fmt;
use core::ops::ControlFlow;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use warband::Frame;

/// Delivery side of a subscription, remembering the last progress figures so
/// a synthesized error frame can carry them.
pub(crate) struct FrameSink {
    frames: mpsc::Sender<Frame>,
    cancel: CancellationToken,
    best_score: f64,
    elapsed_ms: u64,
}

impl FrameSink {
    pub(crate) const fn new(frames: mpsc::Sender<Frame>, cancel: CancellationToken) -> Self {
        Self {
            frames,
            cancel,
            best_score: 0.0,
            elapsed_ms: 0,
        }
    }

    /// Resolves once the subscription is closed.
    pub(crate) async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }

    /// Sends one frame. Breaks once the frame was terminal, the subscription
    /// was closed, or its receiver is gone.
    async fn deliver(&mut self, frame: Frame) -> ControlFlow<()> {
        self.best_score = frame.best_score;
        self.elapsed_ms = frame.elapsed_ms;
        let terminal = frame.is_terminal();

        tokio::select! {
            biased;
            () = self.cancel.cancelled() => return ControlFlow::Break(()),
            sent = self.frames.send(frame) => {
                if sent.is_err() {
                    return ControlFlow::Break(());
                }
            }
        }

        if terminal {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    async fn payload(&mut self, payload: &str) -> ControlFlow<()> {
        match serde_json::from_str::<Frame>(payload) {
            Ok(frame) => self.deliver(frame).await,
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Dropping malformed frame: {_e}");
                ControlFlow::Continue(())
            }
        }
    }

    /// Ends the stream with one synthesized terminal `error` frame.
    pub(crate) async fn fail(mut self, reason: String) {
        #[cfg(feature = "tracing")]
        tracing::warn!("Stream transport error: {reason}");
        let frame = Frame::transport_error(self.best_score, self.elapsed_ms, reason);
        let _ = self.deliver(frame).await;
    }
}

/// Decodes `body` until a terminal frame, cancellation, or a transport
/// failure.
///
/// Malformed frames are skipped. A body error, or the body ending before a
/// terminal frame was seen, produces one synthesized `error` frame.
pub(crate) async fn pump<S, E>(body: S, mut sink: FrameSink)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: fmt::Display,
{
    let mut body = core::pin::pin!(body);
    let mut decoder = SseDecoder::new();

    loop {
        let next = tokio::select! {
            biased;
            () = sink.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Stream closed by subscriber");
                return;
            }
            next = body.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for payload in decoder.feed(&chunk) {
                    if sink.payload(&payload).await.is_break() {
                        return;
                    }
                }
            }
            Some(Err(e)) => {
                sink.fail(format!("stream read failed: {e}")).await;
                return;
            }
            None => {
                if let Some(payload) = decoder.finish() {
                    if sink.payload(&payload).await.is_break() {
                        return;
                    }
                }
                sink.fail("stream ended before the job finished".to_string())
                    .await;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use warband::JobStatus;

    fn chunks(parts: &[&str]) -> impl Stream<Item = Result<Bytes, String>> {
        stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from(p.to_string())))
                .collect::<Vec<_>>(),
        )
    }

    async fn run<S>(body: S) -> Vec<Frame>
    where
        S: Stream<Item = Result<Bytes, String>>,
    {
        let (tx, mut rx) = mpsc::channel(16);
        pump(body, FrameSink::new(tx, CancellationToken::new())).await;

        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn delivers_frames_until_terminal() {
        let frames = run(chunks(&[
            "data: {\"status\":\"queued\"}\n\n",
            "data: {\"status\":\"running\",\"best_score\":0.4,\"elapsed_ms\":120}\n\n",
            "data: {\"status\":\"completed\",\"best_score\":0.8,\"elapsed_ms\":900}\n\n",
            "data: {\"status\":\"running\"}\n\n",
        ]))
        .await;

        let statuses: Vec<_> = frames.iter().map(|f| f.status).collect();
        assert_eq!(
            statuses,
            vec![JobStatus::Queued, JobStatus::Running, JobStatus::Complete]
        );
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped() {
        let frames = run(chunks(&[
            "data: not json\n\n",
            "data: {\"status\":\"paused\"}\n\n",
            "data: {\"status\":\"idle\",\"best_score\":0.9}\n\n",
            "data: {\"status\":\"timeout\",\"best_score\":0.3}\n\n",
        ]))
        .await;
        assert_eq!(frames, vec![Frame::progress(JobStatus::Timeout, 0.3, 0)]);
    }

    #[tokio::test]
    async fn premature_end_synthesizes_one_error_frame() {
        let frames = run(chunks(&[
            "data: {\"status\":\"running\",\"best_score\":0.5,\"elapsed_ms\":2000}\n\n",
        ]))
        .await;

        assert_eq!(frames.len(), 2);
        let last = &frames[1];
        assert_eq!(last.status, JobStatus::Error);
        assert_eq!(last.best_score, 0.5);
        assert_eq!(last.elapsed_ms, 2000);
        assert!(last.message.is_some());
    }

    #[tokio::test]
    async fn body_error_synthesizes_error_frame() {
        let body = stream::iter(vec![
            Ok(Bytes::from_static(b"data: {\"status\":\"running\"}\n\n")),
            Err("connection reset".to_string()),
            Ok(Bytes::from_static(b"data: {\"status\":\"complete\"}\n\n")),
        ]);
        let frames = run(body).await;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].status, JobStatus::Error);
        assert_eq!(
            frames[1].message.as_deref(),
            Some("stream read failed: connection reset")
        );
    }

    #[tokio::test]
    async fn unterminated_final_event_is_flushed() {
        let frames = run(chunks(&["data: {\"status\":\"cancelled\"}"])).await;
        assert_eq!(frames, vec![Frame::progress(JobStatus::Cancelled, 0.0, 0)]);
    }

    #[tokio::test]
    async fn cancelled_pump_delivers_nothing() {
        let (tx, mut rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        pump(
            chunks(&["data: {\"status\":\"running\"}\n\n"]),
            FrameSink::new(tx, cancel),
        )
        .await;
        assert!(rx.recv().await.is_none());
    }
}

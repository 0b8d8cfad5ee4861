use core::pin::Pin;
use core::task::{Context, Poll};
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use warband::{Frame, JobId};

/// Cloneable handle that closes a [`Subscription`] from elsewhere.
#[derive(Clone, Debug)]
pub struct CloseHandle(CancellationToken);

impl CloseHandle {
    /// Stops the stream task and releases its connection. Idempotent.
    pub fn close(&self) {
        if !self.0.is_cancelled() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Closing job stream");
            self.0.cancel();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.0.is_cancelled()
    }
}

/// Frames of one job's status stream.
///
/// Yields frames in arrival order and ends after a terminal frame, after
/// [`close`](Self::close), or when the stream task stops. Dropping the
/// subscription closes it.
#[derive(Debug)]
pub struct Subscription {
    job_id: JobId,
    frames: ReceiverStream<Frame>,
    handle: CloseHandle,
}

impl Subscription {
    pub(crate) fn new(
        job_id: JobId,
        frames: mpsc::Receiver<Frame>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            job_id,
            frames: ReceiverStream::new(frames),
            handle: CloseHandle(cancel),
        }
    }

    #[must_use]
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    pub fn close(&self) {
        self.handle.close();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }

    #[must_use]
    pub fn close_handle(&self) -> CloseHandle {
        self.handle.clone()
    }
}

impl Stream for Subscription {
    type Item = Frame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Frame>> {
        if self.handle.is_closed() {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.frames).poll_next(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use warband::JobStatus;

    fn subscription() -> (mpsc::Sender<Frame>, CancellationToken, Subscription) {
        let (tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        let sub = Subscription::new(JobId::new("job-7"), rx, cancel.clone());
        (tx, cancel, sub)
    }

    #[tokio::test]
    async fn yields_frames_then_ends() {
        let (tx, _cancel, mut sub) = subscription();
        tx.send(Frame::progress(JobStatus::Running, 0.1, 10))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(sub.job_id().as_str(), "job-7");
        assert_eq!(sub.next().await.map(|f| f.status), Some(JobStatus::Running));
        assert_eq!(sub.next().await, None);
    }

    #[tokio::test]
    async fn close_is_idempotent_and_ends_the_stream() {
        let (tx, cancel, mut sub) = subscription();
        tx.send(Frame::progress(JobStatus::Running, 0.1, 10))
            .await
            .unwrap();

        let handle = sub.close_handle();
        handle.close();
        handle.close();
        sub.close();

        assert!(cancel.is_cancelled());
        assert!(sub.is_closed());
        assert_eq!(sub.next().await, None);
    }

    #[test]
    fn drop_closes() {
        let (_tx, cancel, sub) = subscription();
        let handle = sub.close_handle();
        drop(sub);
        assert!(cancel.is_cancelled());
        assert!(handle.is_closed());
    }
}

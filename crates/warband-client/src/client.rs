use crate::{
    ClientConfig, Result, SubmissionError, Subscription,
    pump::{FrameSink, pump},
};
use reqwest::{RequestBuilder, Url, header};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use warband::{Frame, JobId, OptimizeRequest};

/// Body of a successful `POST /optimize`.
#[derive(Deserialize)]
struct Accepted {
    job_id: serde_json::Value,
}

/// Talks to the remote optimizer: submits jobs and opens their status
/// streams.
///
/// Cheap to clone; clones share one connection pool.
#[derive(Clone, Debug)]
pub struct JobClient {
    http: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
}

impl JobClient {
    /// # Errors
    ///
    /// - [`SubmissionError::InvalidBaseUrl`] if `config.base_url` is not an
    ///   absolute URL that paths can be appended to.
    /// - [`SubmissionError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| SubmissionError::InvalidBaseUrl {
                url: config.base_url.clone(),
            })?;
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url,
            config,
        })
    }

    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Validates `request` locally, then posts it to `{base_url}/optimize`.
    ///
    /// Nothing is retried.
    ///
    /// # Errors
    ///
    /// - [`SubmissionError::InvalidRequest`] when local validation fails; no
    ///   request is sent.
    /// - [`SubmissionError::Transport`] on connect, timeout or IO failure.
    /// - [`SubmissionError::Rejected`] on a non-2xx answer.
    /// - [`SubmissionError::MalformedResponse`] when a 2xx answer has no
    ///   usable `job_id`.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(squad_size = request.squad_size))
    )]
    pub async fn submit(&self, request: &OptimizeRequest) -> Result<JobId> {
        request.validate()?;

        let response = self
            .http
            .post(self.endpoint(&["optimize"]))
            .timeout(self.config.request_timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.bytes().await?;
        let accepted: Accepted =
            serde_json::from_slice(&body).map_err(|e| SubmissionError::MalformedResponse {
                reason: e.to_string(),
            })?;
        let job_id = match accepted.job_id {
            serde_json::Value::String(id) if !id.trim().is_empty() => JobId::new(id),
            serde_json::Value::Number(id) => JobId::new(id.to_string()),
            other => {
                return Err(SubmissionError::MalformedResponse {
                    reason: format!("unusable job_id {other}"),
                });
            }
        };

        #[cfg(feature = "tracing")]
        tracing::info!(%job_id, "Job submitted");
        Ok(job_id)
    }

    /// Opens `{base_url}/optimize/stream/{job_id}` on a background task.
    ///
    /// Connection failures are not returned here: like every other
    /// transport failure they arrive as a single terminal `error` frame on
    /// the subscription.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn open_stream(&self, job_id: JobId) -> Subscription {
        let (frames_tx, frames_rx) = mpsc::channel(self.config.frame_buffer.max(1));
        let cancel = CancellationToken::new();

        let request = self
            .http
            .get(self.endpoint(&["optimize", "stream", job_id.as_str()]))
            .header(header::ACCEPT, "text/event-stream");

        let fut = stream_job(request, FrameSink::new(frames_tx, cancel.clone()));
        #[cfg(feature = "tracing")]
        let fut = {
            use tracing::Instrument;
            let span = tracing::debug_span!("job_stream", job_id = %job_id);
            fut.instrument(span)
        };
        tokio::spawn(fut);

        Subscription::new(job_id, frames_rx, cancel)
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

async fn stream_job(request: RequestBuilder, sink: FrameSink) {
    let response = tokio::select! {
        biased;
        () = sink.cancelled() => return,
        response = request.send() => response,
    };

    let reason = match response {
        Ok(response) if response.status().is_success() => {
            #[cfg(feature = "tracing")]
            tracing::debug!("Stream opened");
            pump(response.bytes_stream(), sink).await;
            return;
        }
        Ok(response) => format!("stream request failed with status {}", response.status()),
        Err(e) => format!("stream request failed: {e}"),
    };
    sink.fail(reason).await;
}

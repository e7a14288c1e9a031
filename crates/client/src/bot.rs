//! The transport dispatcher.
//!
//! [`Bot::call`] drives one call through
//! `Idle → AwaitingAdmission → InFlight → Succeeded | Failed → Released`:
//!
//! 1. wait for admission on the call's destination and weight;
//! 2. encode the request and POST it through the [`HttpTransport`];
//! 3. decode the envelope into the method's response type or a [`BotError`];
//! 4. release the lease, on every exit path including cancellation and
//!    the call future being dropped.
//!
//! Nothing is retried here. See [`crate::retry`] for the opt-in helper.

use std::sync::Arc;

use admission::{AdmissionError, Scheduler};
use botapi::{
    encode, BotError, CallId, HttpResponse, HttpTransport, Method, RequestBody, ResponseEnvelope,
    TransportError, TransportErrorKind,
};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, debug_span, warn, Instrument};

use crate::{ClientConfig, ClientError, Endpoint, ReqwestTransport};

/// A Bot API client: one scheduler, one transport, one token.
///
/// Cheap to clone; clones share the scheduler, so every clone is metered
/// against the same pools.
pub struct Bot<T = ReqwestTransport> {
    transport: Arc<T>,
    scheduler: Scheduler,
    endpoint: Endpoint,
}

impl<T> Clone for Bot<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            scheduler: self.scheduler.clone(),
            endpoint: self.endpoint.clone(),
        }
    }
}

impl<T> std::fmt::Debug for Bot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bot")
            .field("endpoint", &self.endpoint)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Bot {
    /// Builds a bot that talks HTTPS to the configured server.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(transport, &config)
    }
}

impl<T: HttpTransport> Bot<T> {
    /// Builds a bot over any transport. The rate policy comes from `config`.
    pub fn with_transport(transport: T, config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            transport: Arc::new(transport),
            scheduler: Scheduler::new(config.rate),
            endpoint: config.endpoint(),
        })
    }

    /// The scheduler metering this bot's calls.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Download URL for a `file_path` returned by [`botapi::methods::GetFile`].
    ///
    /// The URL embeds the token.
    pub fn file_url(&self, file_path: &str) -> String {
        self.endpoint.file_url(file_path)
    }

    /// Dispatches `method` and waits for its typed result.
    pub async fn call<M: Method>(&self, method: &M) -> Result<M::Response, BotError> {
        self.call_with_cancel(method, &CancellationToken::new()).await
    }

    /// Like [`Bot::call`], but gives up with [`BotError::Cancelled`] as soon
    /// as `cancel` fires, whether the call is still waiting for admission or
    /// already in flight.
    pub async fn call_with_cancel<M: Method>(
        &self,
        method: &M,
        cancel: &CancellationToken,
    ) -> Result<M::Response, BotError> {
        let call_id = CallId::new_random();
        let destination = method.destination();
        let weight = method.weight();
        let span = debug_span!(
            "bot_call",
            %call_id,
            method = M::NAME,
            %destination,
            weight
        );

        async move {
            debug!("awaiting admission");
            let outcome = self
                .scheduler
                .admitted(&destination, weight, cancel, async {
                    let result = tokio::select! {
                        _ = cancel.cancelled() => Err(BotError::Cancelled),
                        result = self.exchange(method) => result,
                    };
                    match &result {
                        Ok(_) => debug!("succeeded"),
                        Err(BotError::RateLimited { retry_after, description }) => warn!(
                            retry_after_secs = retry_after.as_secs(),
                            %description,
                            "rate limited by the platform"
                        ),
                        Err(e) => debug!(error = %e, "failed"),
                    }
                    result
                })
                .await;

            let result = match outcome {
                Ok(result) => result,
                Err(AdmissionError::Cancelled) => Err(BotError::Cancelled),
            };
            debug!(ok = result.is_ok(), "released");
            result
        }
        .instrument(span)
        .await
    }

    async fn exchange<M: Method>(&self, method: &M) -> Result<M::Response, BotError> {
        let request = encode(method)?;
        debug!(multipart = matches!(request.body, RequestBody::Multipart(_)), "in flight");
        let response = self.transport.post(request).await?;
        decode_response(&response)
    }
}

/// Maps a raw HTTP response to a typed result.
///
/// Error statuses normally still carry an envelope. A body that is not an
/// envelope is a transport failure when the status is an error and a decode
/// failure when it is not.
fn decode_response<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, BotError> {
    match ResponseEnvelope::from_slice(&response.body) {
        Ok(envelope) => envelope.into_result(),
        Err(_) if !response.is_success() => Err(BotError::Transport(TransportError::new(
            TransportErrorKind::Status(response.status),
            format!("HTTP {} without a Bot API envelope", response.status),
        ))),
        Err(e) => Err(e.into()),
    }
}

//! End-to-end dispatch through an in-memory transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use admission::{PoolPolicy, RatePolicy};
use async_trait::async_trait;
use botapi::methods::{EditMessageText, EditTarget, GetMe, SendDocument, SendMessage};
use botapi::{
    BotError, ChatId, DecodeError, EncodedRequest, HttpResponse, HttpTransport, InlineMessageId,
    InputFile, MessageId, ObjectOrTrue, PartContent, RequestBody, TransportError,
    TransportErrorKind,
};
use client::{retry_rate_limited, Bot, ClientConfig, RetryConfig};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

// ---------------------------------------------------------------------------
// Test transport
// ---------------------------------------------------------------------------

/// Records every request and replays scripted replies in order. With no
/// reply left, `post` never completes.
#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<EncodedRequest>>,
}

impl ScriptedTransport {
    fn replying(replies: impl IntoIterator<Item = Result<HttpResponse, TransportError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    fn requests(&self) -> Vec<EncodedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn post(&self, request: EncodedRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(reply) => reply,
            None => std::future::pending().await,
        }
    }
}

/// Lets tests inspect the transport after handing it to a `Bot`.
#[derive(Clone, Default)]
struct Shared(Arc<ScriptedTransport>);

#[async_trait]
impl HttpTransport for Shared {
    async fn post(&self, request: EncodedRequest) -> Result<HttpResponse, TransportError> {
        self.0.post(request).await
    }
}

fn ok(body: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status: 200,
        body: body.as_bytes().to_vec(),
    })
}

fn status(status: u16, body: &str) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse {
        status,
        body: body.as_bytes().to_vec(),
    })
}

fn config() -> ClientConfig {
    ClientConfig::new("123:test-token")
}

fn bot(
    replies: impl IntoIterator<Item = Result<HttpResponse, TransportError>>,
) -> (Bot<Shared>, Shared) {
    let transport = Shared(Arc::new(ScriptedTransport::replying(replies)));
    let bot = Bot::with_transport(transport.clone(), &config()).unwrap();
    (bot, transport)
}

const ME: &str = r#"{"ok":true,"result":{"id":42,"is_bot":true,"first_name":"Courier","username":"courier_bot"}}"#;
const SENT: &str = r#"{"ok":true,"result":{"message_id":7,"date":1700000000,"chat":{"id":5,"type":"private"},"text":"hi"}}"#;
const FLOOD: &str = r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 5","parameters":{"retry_after":5}}"#;

fn assert_no_leases(bot: &Bot<Shared>) {
    let stats = bot.scheduler().stats();
    assert_eq!(stats.acquired, stats.released);
    assert_eq!(stats.acquired_weight, stats.released_weight);
    assert_eq!(bot.scheduler().snapshot().global.outstanding, 0);
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn successful_call_decodes_the_result_and_sends_json() {
    let (bot, transport) = bot([ok(ME)]);

    let me = bot.call(&GetMe).await.unwrap();
    assert_eq!(me.first_name, "Courier");
    assert_eq!(me.username.as_deref(), Some("courier_bot"));

    let requests = transport.0.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "getMe");
    assert_eq!(requests[0].body, RequestBody::Json(b"{}".to_vec()));
    assert_eq!(bot.scheduler().stats().acquired, 1);
    assert_no_leases(&bot);
}

#[tokio::test(start_paused = true)]
async fn flood_control_surfaces_as_rate_limited() {
    let (bot, _) = bot([status(429, FLOOD)]);

    let err = bot.call(&SendMessage::new(5_i64, "hi")).await.unwrap_err();
    assert_eq!(
        err,
        BotError::RateLimited {
            retry_after: Duration::from_secs(5),
            description: "Too Many Requests: retry after 5".into(),
        }
    );
    assert!(err.retry_policy().is_retryable());
    assert_no_leases(&bot);
}

#[tokio::test(start_paused = true)]
async fn api_errors_keep_code_and_description() {
    let (bot, _) = bot([status(
        400,
        r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
    )]);

    let err = bot.call(&SendMessage::new(-1_i64, "hi")).await.unwrap_err();
    assert_eq!(
        err,
        BotError::Api {
            code: 400,
            description: "Bad Request: chat not found".into(),
            migrate_to_chat_id: None,
        }
    );
    assert!(!err.retry_policy().is_retryable());
    assert_no_leases(&bot);
}

#[tokio::test(start_paused = true)]
async fn transport_failures_release_the_lease() {
    let (bot, _) = bot([Err(TransportError::new(
        TransportErrorKind::Timeout,
        "operation timed out",
    ))]);

    let err = bot.call(&SendMessage::new(5_i64, "hi")).await.unwrap_err();
    assert!(matches!(
        err,
        BotError::Transport(TransportError {
            kind: TransportErrorKind::Timeout,
            ..
        })
    ));
    assert_no_leases(&bot);
}

#[tokio::test(start_paused = true)]
async fn non_envelope_bodies_are_classified_by_status() {
    let (bot, _) = bot([status(502, "<html>Bad Gateway</html>"), ok("<html>ok</html>")]);

    let err = bot.call(&GetMe).await.unwrap_err();
    assert!(matches!(
        err,
        BotError::Transport(TransportError {
            kind: TransportErrorKind::Status(502),
            ..
        })
    ));

    let err = bot.call(&GetMe).await.unwrap_err();
    assert!(matches!(err, BotError::Decode(DecodeError::Envelope(_))));
    assert_no_leases(&bot);
}

#[tokio::test(start_paused = true)]
async fn edits_decode_either_the_message_or_a_confirmation() {
    let (bot, _) = bot([
        ok(r#"{"ok":true,"result":true}"#),
        ok(r#"{"ok":true,"result":{"message_id":1,"date":0,"chat":{"id":5,"type":"private"}}}"#),
    ]);

    let inline = EditMessageText::new(
        EditTarget::Inline {
            inline_message_id: InlineMessageId::new("AAQ").unwrap(),
        },
        "edited",
    );
    assert_eq!(bot.call(&inline).await.unwrap(), ObjectOrTrue::Confirmed);

    let in_chat = EditMessageText::new(
        EditTarget::Chat {
            chat_id: ChatId::Id(5),
            message_id: MessageId::new(1),
        },
        "edited",
    );
    let message = bot.call(&in_chat).await.unwrap().into_object().unwrap();
    assert_eq!(message.message_id, MessageId::new(1));
    assert_eq!(message.sent_at(), None);
}

#[tokio::test(start_paused = true)]
async fn uploads_are_sent_as_multipart() {
    let (bot, transport) = bot([ok(SENT)]);

    let mut request = SendDocument::new(5_i64, InputFile::upload("report.pdf", b"%PDF".to_vec()));
    request.caption = Some("weekly".into());
    bot.call(&request).await.unwrap();

    let requests = transport.0.requests();
    let RequestBody::Multipart(parts) = &requests[0].body else {
        panic!("expected a multipart body, got {:?}", requests[0].body);
    };
    let document = parts.iter().find(|p| p.name == "document").unwrap();
    assert_eq!(
        document.content,
        PartContent::File {
            file_name: "report.pdf".into(),
            bytes: b"%PDF".to_vec(),
        }
    );
    assert!(parts
        .iter()
        .any(|p| p.name == "caption" && p.content == PartContent::Text("weekly".into())));
}

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn cancelled_before_admission_sends_nothing() {
    let (bot, transport) = bot([ok(SENT)]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = bot
        .call_with_cancel(&SendMessage::new(5_i64, "hi"), &cancel)
        .await
        .unwrap_err();
    assert_eq!(err, BotError::Cancelled);
    assert!(transport.0.requests().is_empty());
    assert_eq!(bot.scheduler().stats().acquired, 0);
}

#[tokio::test(start_paused = true)]
async fn cancelling_an_in_flight_call_releases_its_lease() {
    // No scripted reply: the request hangs until cancelled.
    let (bot, transport) = bot(Vec::new());
    let cancel = CancellationToken::new();

    let task = tokio::spawn({
        let bot = bot.clone();
        let cancel = cancel.clone();
        async move { bot.call_with_cancel(&SendMessage::new(5_i64, "hi"), &cancel).await }
    });
    while transport.0.requests().is_empty() {
        tokio::task::yield_now().await;
    }
    assert_eq!(bot.scheduler().stats().in_flight(), 1);

    cancel.cancel();
    assert_eq!(task.await.unwrap().unwrap_err(), BotError::Cancelled);
    assert_eq!(bot.scheduler().stats().released, 1);
    assert_no_leases(&bot);
}

#[tokio::test(start_paused = true)]
async fn dropping_the_call_future_releases_its_lease() {
    let (bot, _) = bot(Vec::new());

    let message = SendMessage::new(5_i64, "hi");
    let call = bot.call(&message);
    assert!(tokio::time::timeout(Duration::from_secs(1), call).await.is_err());
    assert_eq!(bot.scheduler().stats().acquired, 1);
    assert_no_leases(&bot);
}

// ---------------------------------------------------------------------------
// Pacing and retry
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn calls_to_one_chat_are_paced_by_the_destination_interval() {
    let transport = ScriptedTransport::replying([ok(SENT), ok(SENT)]);
    let mut config = config();
    config.rate = RatePolicy::uniform(
        PoolPolicy::new(30, Duration::from_secs(1)),
        PoolPolicy::new(1, Duration::from_secs(1)),
    );
    let bot = Bot::with_transport(transport, &config).unwrap();
    let start = Instant::now();

    bot.call(&SendMessage::new(5_i64, "one")).await.unwrap();
    assert!(start.elapsed() < Duration::from_millis(10));
    bot.call(&SendMessage::new(5_i64, "two")).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(1));

    assert_eq!(bot.transport().requests().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn retry_helper_waits_out_flood_control() {
    let (bot, transport) = bot([status(429, FLOOD), ok(SENT)]);
    let request = SendMessage::new(5_i64, "hi");
    let start = Instant::now();

    let cancel = CancellationToken::new();

    let message = retry_rate_limited(&RetryConfig::default(), &cancel, || bot.call(&request))
        .await
        .unwrap();

    assert_eq!(message.message_id, MessageId::new(7));
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_eq!(transport.0.requests().len(), 2);
    assert_no_leases(&bot);
}

#[tokio::test(start_paused = true)]
async fn retry_helper_gives_up_when_the_wait_is_too_long() {
    let (bot, transport) = bot([status(429, FLOOD), ok(SENT)]);
    let request = SendMessage::new(5_i64, "hi");
    let config = RetryConfig {
        max_attempts: 5,
        max_wait_secs: 1,
    };

    let cancel = CancellationToken::new();

    let err = retry_rate_limited(&config, &cancel, || bot.call(&request))
        .await
        .unwrap_err();

    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    assert_eq!(transport.0.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn retry_helper_stops_after_the_configured_attempts() {
    let (bot, transport) = bot([status(429, FLOOD), status(429, FLOOD), ok(SENT)]);
    let request = SendMessage::new(5_i64, "hi");
    let config = RetryConfig {
        max_attempts: 2,
        max_wait_secs: 60,
    };
    let start = Instant::now();

    let cancel = CancellationToken::new();

    let err = retry_rate_limited(&config, &cancel, || bot.call(&request))
        .await
        .unwrap_err();

    assert!(matches!(err, BotError::RateLimited { .. }));
    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
    assert_eq!(transport.0.requests().len(), 2);
    assert!(start.elapsed() >= Duration::from_secs(5));
    assert_no_leases(&bot);
}

#[tokio::test(start_paused = true)]
async fn retry_helper_does_not_retry_other_errors() {
    let (bot, transport) = bot([
        status(400, r#"{"ok":false,"error_code":400,"description":"Bad Request"}"#),
        ok(SENT),
    ]);
    let request = SendMessage::new(5_i64, "hi");

    let cancel = CancellationToken::new();

    let err = retry_rate_limited(&RetryConfig::default(), &cancel, || bot.call(&request))
        .await
        .unwrap_err();

    assert!(matches!(err, BotError::Api { code: 400, .. }));
    assert_eq!(transport.0.requests().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancelling_during_a_retry_wait_stops_the_helper() {
    let (bot, transport) = bot([status(429, FLOOD), ok(SENT)]);
    let request = SendMessage::new(5_i64, "hi");
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        }
    });

    let err = retry_rate_limited(&RetryConfig::default(), &cancel, || {
        bot.call_with_cancel(&request, &cancel)
    })
    .await
    .unwrap_err();

    assert_eq!(err, BotError::Cancelled);
    assert_eq!(transport.0.requests().len(), 1);
    assert_no_leases(&bot);
}

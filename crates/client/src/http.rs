//! HTTPS implementation of [`HttpTransport`] backed by `reqwest`.

use async_trait::async_trait;
use botapi::{
    EncodedRequest, HttpResponse, HttpTransport, Part, PartContent, RequestBody, TransportError,
    TransportErrorKind,
};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart;

use crate::{ClientConfig, ClientError, Endpoint};

/// Posts encoded requests to the Bot API over HTTPS.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    endpoint: Endpoint,
}

impl ReqwestTransport {
    /// Builds a transport with the configured endpoint and timeout.
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::HttpClient(e.without_url().to_string()))?;
        Ok(Self::with_client(client, config.endpoint()))
    }

    /// Uses an existing `reqwest` client, e.g. one shared with other
    /// services.
    pub fn with_client(client: reqwest::Client, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: EncodedRequest) -> Result<HttpResponse, TransportError> {
        let builder = self.client.post(self.endpoint.method_url(request.method));
        let builder = match request.body {
            RequestBody::Json(bytes) => builder.header(CONTENT_TYPE, "application/json").body(bytes),
            RequestBody::Multipart(parts) => builder.multipart(form(parts)),
        };

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;
        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

fn form(parts: Vec<Part>) -> multipart::Form {
    parts
        .into_iter()
        .fold(multipart::Form::new(), |form, part| match part.content {
            PartContent::Text(text) => form.text(part.name, text),
            PartContent::File { file_name, bytes } => {
                form.part(part.name, multipart::Part::bytes(bytes).file_name(file_name))
            }
        })
}

/// Classifies a `reqwest` failure. The URL is stripped first because it
/// contains the bot token.
fn transport_error(err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if err.is_body() || err.is_decode() {
        TransportErrorKind::Io
    } else if let Some(status) = err.status() {
        TransportErrorKind::Status(status.as_u16())
    } else {
        TransportErrorKind::Other
    };
    TransportError::new(kind, err.without_url().to_string())
}

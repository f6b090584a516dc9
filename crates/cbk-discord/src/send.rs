//! Outbound messages: JSON for text/embeds, multipart when files are attached.

use async_trait::async_trait;
use reqwest::{
    header::AUTHORIZATION,
    multipart::{Form, Part},
    Response, StatusCode,
};
use serde::Deserialize;
use serde_json::{json, Value};

use cbk_core::{
    domain::{ChannelId, MessageId, OutgoingPayload},
    errors::SendError,
    messaging::port::MessageSink,
};

use crate::{api, drain_rate_limit, DiscordClient};

#[derive(Deserialize)]
pub(crate) struct Created {
    pub(crate) id: String,
}

/// A file re-uploaded from its source URL.
struct Download {
    filename: String,
    bytes: Vec<u8>,
}

/// `payload_json` body. Attachments are referenced by their `files[n]` index.
pub fn message_body(payload: &OutgoingPayload, filenames: &[String]) -> Value {
    let mut body = json!({});
    if let Some(text) = &payload.text {
        body["content"] = json!(text);
    }
    if let Some(embeds) = &payload.embeds {
        body["embeds"] = Value::Array(embeds.iter().map(|e| e.raw.clone()).collect());
    }
    if !filenames.is_empty() {
        body["attachments"] = Value::Array(
            filenames
                .iter()
                .enumerate()
                .map(|(id, name)| json!({ "id": id, "filename": name }))
                .collect(),
        );
    }
    body
}

/// Last path segment of an attachment URL, without the query string.
pub fn filename_from_url(url: &str, index: usize) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .map(str::trim)
        .filter(|name| !name.is_empty() && !name.contains(':'))
        .map(str::to_string)
        .unwrap_or_else(|| format!("attachment-{index}"))
}

impl DiscordClient {
    async fn download(&self, url: &str, index: usize) -> Result<Download, SendError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| SendError::Rejected(format!("failed to download attachment {url}: {e}")))?;
        if !resp.status().is_success() {
            return Err(SendError::Rejected(format!(
                "failed to download attachment {url}: {}",
                resp.status()
            )));
        }
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| SendError::Rejected(format!("failed to download attachment {url}: {e}")))?;
        Ok(Download {
            filename: filename_from_url(url, index),
            bytes: bytes.to_vec(),
        })
    }
}

async fn classify(resp: Response) -> Result<MessageId, SendError> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let (body, header) = drain_rate_limit(resp).await;
        return Err(SendError::RateLimited {
            retry_after: api::retry_after(&body, header.as_deref()),
        });
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(SendError::Rejected(format!(
            "{status} {}",
            body.chars().take(200).collect::<String>()
        )));
    }

    let created: Created = resp
        .json()
        .await
        .map_err(|e| SendError::Rejected(format!("unexpected send response: {e}")))?;
    created
        .id
        .parse::<u64>()
        .map(MessageId)
        .map_err(|_| SendError::Rejected(format!("invalid message id {}", created.id)))
}

#[async_trait]
impl MessageSink for DiscordClient {
    async fn send(
        &self,
        channel: ChannelId,
        payload: &OutgoingPayload,
    ) -> Result<MessageId, SendError> {
        let req = self
            .http
            .post(self.url(&format!("/channels/{channel}/messages")))
            .header(AUTHORIZATION, self.auth());

        let req = match &payload.attachment_urls {
            None => req.json(&message_body(payload, &[])),
            Some(urls) => {
                let mut files = Vec::with_capacity(urls.len());
                for (index, url) in urls.iter().enumerate() {
                    files.push(self.download(url, index).await?);
                }
                let names: Vec<String> = files.iter().map(|f| f.filename.clone()).collect();

                let mut form =
                    Form::new().text("payload_json", message_body(payload, &names).to_string());
                for (index, file) in files.into_iter().enumerate() {
                    form = form.part(
                        format!("files[{index}]"),
                        Part::bytes(file.bytes).file_name(file.filename),
                    );
                }
                req.multipart(form)
            }
        };

        let resp = req
            .send()
            .await
            .map_err(|e| SendError::Rejected(format!("discord request error: {e}")))?;
        classify(resp).await
    }
}

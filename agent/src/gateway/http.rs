//! reqwest implementations of the gateway traits.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fieldsync_engine::{NewMeterRecord, OldMeterRecord, OwnerSerials, SerialDirectoryResponse};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde_json::Value;
use tracing::debug;

use super::{CredentialProvider, GatewayError, SerialDirectory, UploadAck, UploadGateway};

const ACCOUNT_INSTANCE_PATH: &str = "/api/account-instances";
const OLD_METER_PATH: &str = "/api/old-meter";
const NEW_METER_PATH: &str = "/api/new-meter";

/// Longest raw body echoed into an error message.
const MAX_ERROR_BODY: usize = 200;

/// Pull a readable message out of an error body.
///
/// The first field message of a validation body (`{"errors": {"field":
/// ["..."]}}`) wins over `message` and `error`. Falls back to the raw text.
pub fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        if let Some(first) = value
            .get("errors")
            .and_then(Value::as_object)
            .and_then(|errors| errors.values().next())
        {
            let text = match first {
                Value::Array(items) => items.first().and_then(Value::as_str),
                other => other.as_str(),
            };
            if let Some(text) = text {
                return text.to_string();
            }
        }
        if let Some(message) = value.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            return message.to_string();
        }
    }

    body.trim().chars().take(MAX_ERROR_BODY).collect()
}

/// Turn a response into an ack, or a [`GatewayError::Status`].
///
/// A 2xx body carrying `"status": false` or `"success": false` is treated as
/// a rejection too.
async fn read_ack(response: Response) -> Result<UploadAck, GatewayError> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let mut message = error_message(&body);
        if message.is_empty() {
            message = status.canonical_reason().unwrap_or("request failed").to_string();
        }
        return Err(GatewayError::Status {
            status: status.as_u16(),
            message,
        });
    }

    let data = serde_json::from_str::<Value>(&body).ok();
    let rejected = data.as_ref().is_some_and(|value| {
        ["status", "success"]
            .iter()
            .any(|key| value.get(key) == Some(&Value::Bool(false)))
    });
    if rejected {
        return Err(GatewayError::Status {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }

    Ok(UploadAck {
        status: status.as_u16(),
        data,
    })
}

/// Read a captured image into a multipart part.
async fn image_part(reference: &str) -> Result<Part, GatewayError> {
    let path = reference.strip_prefix("file://").unwrap_or(reference);
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| GatewayError::Image(format!("{}: {}", path, e)))?;
    let file_name = Path::new(path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image.jpg")
        .to_string();

    Part::bytes(bytes)
        .file_name(file_name)
        .mime_str("image/jpeg")
        .map_err(|e| GatewayError::Image(e.to_string()))
}

fn text_fields(mut form: Form, fields: &[(&'static str, Option<String>)]) -> Form {
    for (name, value) in fields {
        if let Some(value) = value {
            form = form.text(*name, value.clone());
        }
    }
    form
}

async fn attach_images(
    mut form: Form,
    images: &[(&'static str, Option<&String>)],
) -> Result<Form, GatewayError> {
    for (name, reference) in images {
        if let Some(reference) = reference {
            form = form.part(*name, image_part(reference).await?);
        }
    }
    Ok(form)
}

/// Multipart upload gateway over HTTP.
#[derive(Clone)]
pub struct HttpGateway {
    http: Client,
    upload_http: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpGateway {
    /// `request_timeout` applies to small JSON calls, `upload_timeout` to
    /// multipart uploads with images.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        request_timeout: Duration,
        upload_timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            http: Client::builder().timeout(request_timeout).build()?,
            upload_http: Client::builder().timeout(upload_timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<UploadAck, GatewayError> {
        let token = self.credentials.require_token()?;
        let response = request
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        read_ack(response).await
    }
}

#[async_trait]
impl UploadGateway for HttpGateway {
    async fn create_account_instance(&self, account_id: &str) -> Result<(), GatewayError> {
        debug!(account_id = %account_id, "Creating account instance");
        let request = self
            .http
            .post(self.url(ACCOUNT_INSTANCE_PATH))
            .json(&serde_json::json!({ "account_id": account_id }));
        self.send(request).await.map(|_| ())
    }

    async fn upload_old_meter(&self, record: &OldMeterRecord) -> Result<UploadAck, GatewayError> {
        let draft = &record.draft;
        let form = text_fields(
            Form::new(),
            &[
                ("account_id", Some(draft.account_id.trim().to_string())),
                ("serial_no_old", draft.serial_no_old.clone()),
                ("mfd_year_old", draft.mfd_year_old.clone()),
                ("final_reading", draft.final_reading.clone()),
                ("meter_make_old", draft.meter_make_old.clone()),
                ("category", draft.category.map(|c| c.as_str().to_string())),
                ("section_code", draft.section_code.clone()),
                ("created_by", draft.created_by.clone()),
            ],
        );
        let form = attach_images(
            form,
            &[
                ("image_1_old", draft.image_1_old.as_ref()),
                ("image_2_old", draft.image_2_old.as_ref()),
            ],
        )
        .await?;

        debug!(record_id = record.id, account_id = %draft.account_id, "Uploading old meter");
        self.send(self.upload_http.post(self.url(OLD_METER_PATH)).multipart(form))
            .await
    }

    async fn upload_new_meter(&self, record: &NewMeterRecord) -> Result<UploadAck, GatewayError> {
        let draft = &record.draft;
        let form = text_fields(
            Form::new(),
            &[
                ("account_id", Some(draft.account_id.trim().to_string())),
                ("serial_no_new", draft.serial_no_new.clone()),
                ("mfd_year_new", draft.mfd_year_new.clone()),
                ("meter_make_new", draft.meter_make_new.clone()),
                ("initial_reading_kwh", draft.initial_reading_kwh.clone()),
                ("initial_reading_kvah", draft.initial_reading_kvah.clone()),
                ("lat", draft.lat.map(|v| v.to_string())),
                ("lon", draft.lon.map(|v| v.to_string())),
                ("created_by", draft.created_by.clone()),
            ],
        );
        let form = attach_images(
            form,
            &[
                ("image_1_new", draft.image_1_new.as_ref()),
                ("image_2_new", draft.image_2_new.as_ref()),
            ],
        )
        .await?;

        debug!(record_id = record.id, account_id = %draft.account_id, "Uploading new meter");
        self.send(self.upload_http.post(self.url(NEW_METER_PATH)).multipart(form))
            .await
    }
}

/// Serial directory client.
#[derive(Clone)]
pub struct HttpSerialDirectory {
    http: Client,
    url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl HttpSerialDirectory {
    pub fn new(
        url: impl Into<String>,
        credentials: Arc<dyn CredentialProvider>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            url: url.into(),
            credentials,
        })
    }
}

#[async_trait]
impl SerialDirectory for HttpSerialDirectory {
    async fn fetch_serials(&self) -> Result<Vec<OwnerSerials>, GatewayError> {
        let token = self.credentials.require_token()?;
        let response = self
            .http
            .get(&self.url)
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let parsed =
            SerialDirectoryResponse::parse(&body).map_err(|e| GatewayError::Format(e.to_string()))?;
        Ok(parsed.user_information.unwrap_or_default())
    }
}

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_DISPOSITION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::{BankId, Record};
use crate::error::FdError;
use crate::registry::BankConfigurations;

pub const DEFAULT_EXPORT_FILENAME: &str = "Bank_FD_Rates.xlsx";

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: String,
    pub data: Vec<Record>,
    pub message: Option<String>,
}

impl FetchResponse {
    pub fn success(data: Vec<Record>) -> Self {
        Self {
            status: "success".to_string(),
            data,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: Vec::new(),
            message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

#[derive(Debug, Clone)]
pub struct ExportPayload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

pub trait BankApi: Send + Sync {
    fn list_banks(&self) -> Result<BankConfigurations, FdError>;
    /// `Ok` for any parseable reply, including ones whose `status` is not
    /// `"success"`; `Err` only when the call or its decoding failed.
    fn fetch_bank(&self, id: &BankId) -> Result<FetchResponse, FdError>;
    fn export(&self) -> Result<ExportPayload, FdError>;
    fn clear(&self) -> Result<(), FdError>;
}

impl<A: BankApi + ?Sized> BankApi for std::sync::Arc<A> {
    fn list_banks(&self) -> Result<BankConfigurations, FdError> {
        (**self).list_banks()
    }

    fn fetch_bank(&self, id: &BankId) -> Result<FetchResponse, FdError> {
        (**self).fetch_bank(id)
    }

    fn export(&self) -> Result<ExportPayload, FdError> {
        (**self).export()
    }

    fn clear(&self) -> Result<(), FdError> {
        (**self).clear()
    }
}

#[derive(Clone)]
pub struct HttpBankApi {
    client: Client,
    base_url: String,
}

impl HttpBankApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FdError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("bank-fd-rates/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| FdError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| FdError::Http(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn handle_status(response: Response) -> Result<Response, FdError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let text = response.text().unwrap_or_default();
        Err(FdError::Status {
            status,
            message: error_message(&text),
        })
    }
}

impl BankApi for HttpBankApi {
    fn list_banks(&self) -> Result<BankConfigurations, FdError> {
        let response = self
            .client
            .get(self.url("banks"))
            .send()
            .map_err(|err| FdError::Http(err.to_string()))?;
        let response = Self::handle_status(response)?;
        response.json().map_err(|err| FdError::Decode(err.to_string()))
    }

    fn fetch_bank(&self, id: &BankId) -> Result<FetchResponse, FdError> {
        let response = self
            .client
            .get(self.url(&format!("fetch/{}", id.as_str())))
            .send()
            .map_err(|err| FdError::Http(err.to_string()))?;
        debug!(bank = %id, status = response.status().as_u16(), "fetch response");
        // The backend reports per-bank failures in the body, whatever the
        // status code, so the body is read either way.
        let text = response
            .text()
            .map_err(|err| FdError::Http(err.to_string()))?;
        parse_fetch_body(&text)
    }

    fn export(&self) -> Result<ExportPayload, FdError> {
        let response = self
            .client
            .get(self.url("export"))
            .send()
            .map_err(|err| FdError::Http(err.to_string()))?;
        let response = Self::handle_status(response)?;
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(filename_from_content_disposition)
            .unwrap_or_else(|| DEFAULT_EXPORT_FILENAME.to_string());
        let bytes = response
            .bytes()
            .map_err(|err| FdError::Http(err.to_string()))?;
        Ok(ExportPayload {
            filename,
            bytes: bytes.to_vec(),
        })
    }

    fn clear(&self) -> Result<(), FdError> {
        let response = self
            .client
            .delete(self.url("clear"))
            .send()
            .map_err(|err| FdError::Http(err.to_string()))?;
        Self::handle_status(response)?;
        Ok(())
    }
}

pub fn parse_fetch_body(text: &str) -> Result<FetchResponse, FdError> {
    let value: Value =
        serde_json::from_str(text).map_err(|err| FdError::Decode(err.to_string()))?;
    let Value::Object(mut body) = value else {
        return Err(FdError::Decode("response body is not a JSON object".to_string()));
    };
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let message = body
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string);
    if status != "success" {
        return Ok(FetchResponse {
            status,
            data: Vec::new(),
            message,
        });
    }

    let Some(Value::Array(rows)) = body.remove("data") else {
        return Err(FdError::Decode(
            "success response without a data array".to_string(),
        ));
    };
    let data = rows
        .into_iter()
        .map(|row| match row {
            Value::Object(record) => Ok(record),
            other => Err(FdError::Decode(format!("data row is not an object: {other}"))),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(FetchResponse {
        status,
        data,
        message,
    })
}

static FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"filename="?([^";]+)"?"#).unwrap());

pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    let name = FILENAME_RE.captures(header)?.get(1)?.as_str().trim();
    (!name.is_empty()).then(|| name.to_string())
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.message)
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "no message from backend".to_string()
            } else {
                trimmed.to_string()
            }
        })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn filename_with_and_without_quotes() {
        assert_eq!(
            filename_from_content_disposition(r#"attachment; filename="FD_Rates_2024.xlsx""#),
            Some("FD_Rates_2024.xlsx".to_string())
        );
        assert_eq!(
            filename_from_content_disposition("attachment; filename=rates.xlsx"),
            Some("rates.xlsx".to_string())
        );
        assert_eq!(filename_from_content_disposition("inline"), None);
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(error_message(r#"{"message":"no data"}"#), "no data");
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
        assert_eq!(error_message(""), "no message from backend");
    }

    #[test]
    fn fetch_body_keeps_column_order() {
        let body = r#"{"status":"success","data":[{"term":"12M","rate":11.5,"min":1000}]}"#;
        let response = parse_fetch_body(body).unwrap();
        assert!(response.is_success());
        let columns: Vec<_> = response.data[0].keys().cloned().collect();
        assert_eq!(columns, vec!["term", "rate", "min"]);
    }

    #[test]
    fn fetch_body_failures() {
        let failed = parse_fetch_body(r#"{"status":"error","message":"site down"}"#).unwrap();
        assert!(!failed.is_success());
        assert_eq!(failed.message.as_deref(), Some("site down"));

        assert_matches!(parse_fetch_body("<html>"), Err(FdError::Decode(_)));
        assert_matches!(parse_fetch_body("[]"), Err(FdError::Decode(_)));
        assert_matches!(
            parse_fetch_body(r#"{"status":"success"}"#),
            Err(FdError::Decode(_))
        );
    }

    #[test]
    fn failure_bodies_keep_backend_message() {
        let null_data =
            parse_fetch_body(r#"{"status":"error","message":"site down","data":null}"#).unwrap();
        assert!(!null_data.is_success());
        assert_eq!(null_data.message.as_deref(), Some("site down"));
        assert!(null_data.data.is_empty());

        let no_status = parse_fetch_body(r#"{"message":"bank not configured"}"#).unwrap();
        assert!(!no_status.is_success());
        assert_eq!(no_status.status, "");
        assert_eq!(no_status.message.as_deref(), Some("bank not configured"));
    }

    #[test]
    fn success_rows_must_be_objects() {
        assert_matches!(
            parse_fetch_body(r#"{"status":"success","data":[1,2]}"#),
            Err(FdError::Decode(_))
        );
    }
}

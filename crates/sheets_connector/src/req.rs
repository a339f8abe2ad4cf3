use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, IntoUrl, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheetstore::record::json_scalar_to_cell;
use sheetstore::{InputOption, RenderMode, SheetRange};
use tracing::trace;

use crate::errors::{Result, SheetsError};

const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
const REQ_ACCEPT: &str = "application/json";
const MAJOR_DIMENSION_ROWS: &str = "ROWS";

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/";

/// Body of a values request or response.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub major_dimension: Option<String>,

    /// Omitted by the service entirely for an empty range.
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl ValueRange {
    /// Cell text for every returned cell. Unformatted renders return
    /// numbers and booleans, those are stringified.
    pub fn into_strings(self) -> Result<Vec<Vec<String>>> {
        self.values
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|v| {
                        json_scalar_to_cell(v)
                            .ok_or_else(|| SheetsError::UnexpectedCellValue(v.to_string()))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateBody<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateValuesResponse {
    pub spreadsheet_id: Option<String>,
    pub updated_range: Option<String>,
    pub updated_rows: Option<u64>,
    pub updated_columns: Option<u64>,
    pub updated_cells: Option<u64>,
}

#[derive(Debug, Default)]
pub struct SheetsClientBuilder {
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl SheetsClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = Some(connect_timeout);
        self
    }

    pub fn build<U: IntoUrl>(self, base_url: U) -> Result<SheetsClient> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static(REQ_ACCEPT));

        let mut builder = Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(default_headers);

        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }

        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder.build()?;
        Ok(SheetsClient {
            base_url: base_url.into_url()?,
            inner: client,
        })
    }
}

#[derive(Debug, Clone)]
pub struct SheetsClient {
    base_url: Url,
    inner: Client,
}

impl SheetsClient {
    pub fn builder() -> SheetsClientBuilder {
        SheetsClientBuilder::default()
    }

    pub(crate) fn http(&self) -> &Client {
        &self.inner
    }

    /// `{base}/v4/spreadsheets/{id}/values/{range}` with each segment
    /// percent encoded.
    pub fn values_url(&self, target: &SheetRange) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                SheetsError::UrlParseError(format!("cannot be a base url: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                target.spreadsheet_id.as_str(),
                "values",
                target.range.as_str(),
            ]);
        Ok(url)
    }

    pub async fn get_values(
        &self,
        target: &SheetRange,
        render: RenderMode,
        token: &str,
    ) -> Result<ValueRange> {
        let url = self.values_url(target)?;
        let res = self
            .inner
            .get(url)
            .query(&[
                ("valueRenderOption", render.as_str()),
                ("majorDimension", MAJOR_DIMENSION_ROWS),
            ])
            .bearer_auth(token)
            .send()
            .await?;

        parse_response(res).await
    }

    pub async fn update_values(
        &self,
        target: &SheetRange,
        values: &[Vec<String>],
        input: InputOption,
        token: &str,
    ) -> Result<UpdateValuesResponse> {
        let url = self.values_url(target)?;
        let body = UpdateBody {
            range: &target.range,
            major_dimension: MAJOR_DIMENSION_ROWS,
            values,
        };

        let res = self
            .inner
            .put(url)
            .query(&[("valueInputOption", input.as_str())])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        parse_response(res).await
    }
}

/// Turn a non-2xx response into an `HttpError` carrying the body, otherwise
/// decode the json body.
pub(crate) async fn parse_response<R: DeserializeOwned>(res: Response) -> Result<R> {
    let status = res.status();
    let body = res.text().await?;
    if !status.is_success() {
        return Err(SheetsError::HttpError { status, body });
    }
    trace!(%body, "response");

    let res: R = serde_json::from_str(&body)?;
    Ok(res)
}

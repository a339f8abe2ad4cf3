//! Google Sheets transport for `sheetstore`.
//!
//! Talks to the Sheets v4 REST api, authenticating either with a service
//! account key or a pre-issued bearer token.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use sheetstore::{GridTransport, InputOption, RenderMode, SheetRange};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::auth::{
    Authenticator,
    SPREADSHEETS_SCOPE,
    ServiceAccountAuthenticator,
    ServiceAccountKey,
    Token,
    credentials_path_from_env,
};
use crate::errors::Result;
use crate::req::{DEFAULT_BASE_URL, SheetsClient};

pub mod auth;
pub mod errors;
pub mod req;

#[derive(Debug, Default)]
pub struct ConnectionBuilder {
    base_url: Option<String>,
    credentials_path: Option<PathBuf>,
    service_account: Option<ServiceAccountKey>,
    access_token: Option<String>,
    scope: Option<String>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

macro_rules! builder_fn {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut self, $name: $ty) -> Self {
            self.$name = Some($name);
            self
        }
    };
}

impl ConnectionBuilder {
    builder_fn! {base_url, String}

    builder_fn! {credentials_path, PathBuf}

    builder_fn! {service_account, ServiceAccountKey}

    builder_fn! {access_token, String}

    builder_fn! {scope, String}

    builder_fn! {timeout, Duration}

    builder_fn! {connect_timeout, Duration}

    pub fn new() -> Self {
        Self::default()
    }

    /// Build the connection.
    ///
    /// Credentials are picked in order: an explicit access token, an
    /// explicit service account key, a key file at `credentials_path`, and
    /// finally the key file named by `GSHEETS_CREDENTIALS` (or
    /// `config/credentials.json`).
    pub fn build(self) -> Result<Connection> {
        let mut client = SheetsClient::builder();
        if let Some(timeout) = self.timeout {
            client = client.timeout(timeout);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            client = client.connect_timeout(connect_timeout);
        }
        let base_url = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let client = client.build(base_url)?;

        let auth = match (self.access_token, self.service_account) {
            (Some(token), _) => Authenticator::Static(token),
            (None, Some(key)) => Self::service_account_auth(key, self.scope)?,
            (None, None) => {
                let path = self
                    .credentials_path
                    .unwrap_or_else(credentials_path_from_env);
                let key = ServiceAccountKey::from_file(&path)?;
                Self::service_account_auth(key, self.scope)?
            }
        };

        Ok(Connection {
            client,
            auth,
            token: Mutex::new(None),
        })
    }

    fn service_account_auth(key: ServiceAccountKey, scope: Option<String>) -> Result<Authenticator> {
        let scope = scope.unwrap_or_else(|| SPREADSHEETS_SCOPE.to_string());
        let auth = ServiceAccountAuthenticator::try_new(key, scope)?;
        Ok(Authenticator::ServiceAccount(auth))
    }
}

#[derive(Debug)]
pub struct Connection {
    client: SheetsClient,
    auth: Authenticator,
    token: Mutex<Option<Token>>,
}

impl Connection {
    pub fn builder() -> ConnectionBuilder {
        ConnectionBuilder::new()
    }

    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        self.auth.token(&self.client, &mut cached).await
    }

    pub async fn get_values(
        &self,
        target: &SheetRange,
        render: RenderMode,
    ) -> Result<Vec<Vec<String>>> {
        let token = self.access_token().await?;
        let range = self.client.get_values(target, render, &token).await?;
        let values = range.into_strings()?;
        debug!(%target, %render, rows = values.len(), "fetched values");
        Ok(values)
    }

    pub async fn update_values(
        &self,
        target: &SheetRange,
        values: &[Vec<String>],
        input: InputOption,
    ) -> Result<()> {
        let token = self.access_token().await?;
        let res = self
            .client
            .update_values(target, values, input, &token)
            .await?;
        trace!(?res, "update response");
        debug!(
            %target,
            %input,
            updated_range = res.updated_range.as_deref().unwrap_or_default(),
            updated_cells = res.updated_cells.unwrap_or_default(),
            "updated values"
        );
        Ok(())
    }
}

#[async_trait]
impl GridTransport for Connection {
    async fn fetch_grid(
        &self,
        target: &SheetRange,
        render: RenderMode,
    ) -> sheetstore::Result<Vec<Vec<String>>> {
        Ok(self.get_values(target, render).await?)
    }

    async fn write_grid(
        &self,
        target: &SheetRange,
        values: Vec<Vec<String>>,
        input: InputOption,
    ) -> sheetstore::Result<()> {
        Ok(self.update_values(target, &values, input).await?)
    }
}

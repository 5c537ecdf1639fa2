use std::{sync::Arc, time::Duration};

use log::*;
use reqwest::{Client, Method};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::PoliConfig,
    helpers::join_url,
    InitiateTransaction,
    InitiateTransactionResponse,
    PoliApiError,
    PoliTransaction,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct PoliApi {
    config: PoliConfig,
    client: Arc<Client>,
}

impl PoliApi {
    pub fn new(config: PoliConfig) -> Result<Self, PoliApiError> {
        let client =
            Client::builder().timeout(REQUEST_TIMEOUT).build().map_err(|e| PoliApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn config(&self) -> &PoliConfig {
        &self.config
    }

    pub fn url(&self, path: &str) -> String {
        join_url(self.config.base_url(), path)
    }

    /// Sends an authenticated request. Transport failures and non-2xx responses are errors; the body of a successful
    /// response is deserialized as `T`.
    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, PoliApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.merchant_code, Some(self.config.authentication_code.reveal()));
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| PoliApiError::Unreachable(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| PoliApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| PoliApiError::RestResponseError(e.to_string()))?;
            Err(PoliApiError::QueryError { status, message })
        }
    }

    /// Starts a remote transaction. A business-level rejection (`Success: false`) is *not* an error here; the caller
    /// inspects the response.
    pub async fn initiate_transaction(
        &self,
        request: &InitiateTransaction,
    ) -> Result<InitiateTransactionResponse, PoliApiError> {
        debug!("Initiating POLi transaction for order {}", request.merchant_reference);
        let result = self
            .rest_query::<InitiateTransactionResponse, _>(
                Method::POST,
                "/api/v2/Transaction/Initiate",
                &[],
                Some(request),
            )
            .await?;
        if result.success {
            info!(
                "POLi transaction {} initiated for order {}",
                result.transaction_ref_no.as_deref().unwrap_or_default(),
                request.merchant_reference
            );
        }
        Ok(result)
    }

    pub async fn get_transaction(&self, token: &str) -> Result<PoliTransaction, PoliApiError> {
        debug!("Fetching POLi transaction {token}");
        let result = self
            .rest_query::<PoliTransaction, ()>(
                Method::GET,
                "/api/v2/Transaction/GetTransaction",
                &[("token", token)],
                None,
            )
            .await?;
        trace!("Fetched POLi transaction {token}: {:?}", result.status_code());
        Ok(result)
    }
}

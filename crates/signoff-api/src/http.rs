use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use signoff_config::{ApiConfig, HeaderRecord};
use tracing::debug;
use url::Url;

use crate::backend::{ChecklistSource, DecisionSink, MasterData, SlaCommitter, WorkflowSource};
use crate::error::ApiError;
use crate::types::{
  AgreedSla, ChecklistItem, DecisionRequest, DecisionResponse, SavedSlaRecords, SlaCommitRequest,
  Technician, VendorRecord,
};

/// Header carrying a decision's idempotency key.
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// JSON REST client for the approval backend.
///
/// Routes are relative to `base_url`:
/// - `GET  workflows/{header_id}`
/// - `POST workflows/{header_id}/decisions`
/// - `GET  workflows/{header_id}/sla-records?vendor_id=...`
/// - `POST sla-records`
/// - `GET  vendors/{vendor_id}/slas`
/// - `GET  vendors/{vendor_id}/technicians`
/// - `GET  asset-types/{asset_type_id}/vendors?active=true`
/// - `GET  asset-types/{asset_type_id}/checklist`
#[derive(Debug, Clone)]
pub struct HttpBackend {
  client: Client,
  base_url: Url,
  token: Option<String>,
}

impl HttpBackend {
  pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
    let base_url =
      Url::parse(&config.base_url).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
    if base_url.cannot_be_a_base() {
      return Err(ApiError::InvalidUrl(config.base_url.clone()));
    }

    let client = Client::builder()
      .timeout(Duration::from_millis(config.timeout_ms))
      .build()?;

    Ok(Self {
      client,
      base_url,
      token: config.token.clone(),
    })
  }

  /// Build an endpoint URL; each segment is percent-encoded.
  fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    let request = self.client.request(method, url);
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn get_json<T: DeserializeOwned>(&self, url: Url, what: &str) -> Result<T, ApiError> {
    debug!(url = %url, "GET");
    let response = self.request(Method::GET, url).send().await?;
    read_json(response, what).await
  }
}

/// Check the status and decode the body.
async fn read_json<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ApiError> {
  let response = check_status(response, what).await?;
  let body = response.text().await?;
  serde_json::from_str(&body).map_err(|e| ApiError::Decode(format!("{}: {}", what, e)))
}

async fn check_status(response: Response, what: &str) -> Result<Response, ApiError> {
  let status = response.status();
  if status == StatusCode::NOT_FOUND {
    return Err(ApiError::NotFound(what.to_string()));
  }
  if !status.is_success() {
    let body = response.text().await.unwrap_or_default();
    return Err(ApiError::Status {
      status: status.as_u16(),
      body,
    });
  }
  Ok(response)
}

#[async_trait]
impl WorkflowSource for HttpBackend {
  async fn fetch_header(&self, header_id: &str) -> Result<HeaderRecord, ApiError> {
    let url = self.endpoint(&["workflows", header_id])?;
    self
      .get_json(url, &format!("workflow '{}'", header_id))
      .await
  }
}

#[async_trait]
impl DecisionSink for HttpBackend {
  async fn submit_decision(
    &self,
    decision: &DecisionRequest,
  ) -> Result<DecisionResponse, ApiError> {
    let url = self.endpoint(&["workflows", &decision.header_id, "decisions"])?;
    debug!(url = %url, step_id = %decision.step_id, action = %decision.action, "POST decision");

    let response = self
      .request(Method::POST, url)
      .header(IDEMPOTENCY_HEADER, &decision.idempotency_key)
      .json(decision)
      .send()
      .await?;
    read_json(response, &format!("decision on step '{}'", decision.step_id)).await
  }
}

#[async_trait]
impl MasterData for HttpBackend {
  async fn agreed_slas(&self, vendor_id: &str) -> Result<Vec<AgreedSla>, ApiError> {
    let url = self.endpoint(&["vendors", vendor_id, "slas"])?;
    self
      .get_json(url, &format!("SLAs of vendor '{}'", vendor_id))
      .await
  }

  async fn active_vendors(&self, asset_type_id: &str) -> Result<Vec<VendorRecord>, ApiError> {
    let mut url = self.endpoint(&["asset-types", asset_type_id, "vendors"])?;
    url.query_pairs_mut().append_pair("active", "true");
    self
      .get_json(url, &format!("vendors of asset type '{}'", asset_type_id))
      .await
  }

  async fn technicians(&self, vendor_id: &str) -> Result<Vec<Technician>, ApiError> {
    let url = self.endpoint(&["vendors", vendor_id, "technicians"])?;
    self
      .get_json(url, &format!("technicians of vendor '{}'", vendor_id))
      .await
  }

  async fn saved_sla_records(
    &self,
    header_id: &str,
    vendor_id: &str,
  ) -> Result<SavedSlaRecords, ApiError> {
    let mut url = self.endpoint(&["workflows", header_id, "sla-records"])?;
    url.query_pairs_mut().append_pair("vendor_id", vendor_id);
    match self
      .get_json(url, &format!("SLA records of workflow '{}'", header_id))
      .await
    {
      Err(ApiError::NotFound(_)) => Ok(SavedSlaRecords::default()),
      other => other,
    }
  }
}

#[async_trait]
impl SlaCommitter for HttpBackend {
  async fn commit_sla(&self, request: &SlaCommitRequest) -> Result<(), ApiError> {
    let url = self.endpoint(&["sla-records"])?;
    debug!(
      url = %url,
      header_id = %request.header_id,
      records = request.records.len(),
      "POST sla records"
    );

    let response = self.request(Method::POST, url).json(request).send().await?;
    check_status(response, "SLA commit").await?;
    Ok(())
  }
}

#[async_trait]
impl ChecklistSource for HttpBackend {
  async fn checklist(&self, asset_type_id: &str) -> Result<Vec<ChecklistItem>, ApiError> {
    let url = self.endpoint(&["asset-types", asset_type_id, "checklist"])?;
    self
      .get_json(url, &format!("checklist of asset type '{}'", asset_type_id))
      .await
  }
}

//! Requisitions and their bank authorization links

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;

/// A request to link an end user's accounts.
///
/// `id`, `status` and `accounts` are assigned by the API.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Requisition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub redirect: String,
    pub reference: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enduser_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default)]
    pub agreements: Vec<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequisitionLinkRequest {
    pub aspsp_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequisitionLinkResponse {
    /// URL the end user follows to authorize access at their bank.
    pub initiate: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct RequisitionPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<Requisition>,
}

impl Client {
    pub async fn create_requisition(&self, requisition: &Requisition) -> Result<Requisition> {
        self.post_json("requisitions/", requisition, StatusCode::CREATED)
            .await
    }

    pub async fn requisition(&self, id: &str) -> Result<Requisition> {
        self.get_json(&format!("requisitions/{id}/"), &[]).await
    }

    /// First page of requisitions. Follow `next` manually for more.
    pub async fn list_requisitions(&self) -> Result<RequisitionPage> {
        self.get_json("requisitions/", &[]).await
    }

    pub async fn create_requisition_link(
        &self,
        id: &str,
        request: &RequisitionLinkRequest,
    ) -> Result<RequisitionLinkResponse> {
        self.post_json(&format!("requisitions/{id}/links/"), request, StatusCode::OK)
            .await
    }
}

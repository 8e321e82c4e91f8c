//! End user agreements

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;

/// Terms of access to an end user's accounts.
///
/// Send with only the request fields set; the API fills in `id`,
/// `created`, and `accepted`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EndUserAgreement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_historical_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_valid_for_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_scope: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_id: Option<String>,
}

impl Client {
    pub async fn create_end_user_agreement(
        &self,
        agreement: &EndUserAgreement,
    ) -> Result<EndUserAgreement> {
        self.post_json("agreements/enduser/", agreement, StatusCode::CREATED)
            .await
    }
}

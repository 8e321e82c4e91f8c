//! Institution lookup

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::Result;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Institution {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub bic: Option<String>,
    /// Days of history the institution exposes. Sent as a string.
    #[serde(default)]
    pub transaction_total_days: Option<String>,
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub logo: Option<String>,
}

impl Client {
    /// Institutions available in a country (ISO 3166 two-letter code).
    pub async fn list_institutions(&self, country: &str) -> Result<Vec<Institution>> {
        self.get_json("institutions/", &[("country", country)]).await
    }

    pub async fn institution(&self, id: &str) -> Result<Institution> {
        self.get_json(&format!("institutions/{id}/"), &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::test_client;
    use axum::extract::Query;
    use axum::routing::get;
    use std::collections::HashMap;

    const SANDBOX: &str = r#"{"id":"SANDBOXFINANCE_SFIN0000","name":"Sandbox Finance","bic":"SFIN0000","transaction_total_days":"90","countries":["XX"],"logo":"https://cdn.example.com/sandbox.png"}"#;

    fn routes() -> axum::Router {
        axum::Router::new()
            .route(
                "/api/v2/institutions/",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    match params.get("country").map(String::as_str) {
                        Some("XX") => format!("[{SANDBOX}]"),
                        _ => "[]".to_string(),
                    }
                }),
            )
            .route(
                "/api/v2/institutions/SANDBOXFINANCE_SFIN0000/",
                get(|| async { SANDBOX }),
            )
    }

    #[tokio::test]
    async fn lists_by_country() {
        let client = test_client(routes()).await;

        let list = client.list_institutions("XX").await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "Sandbox Finance");
        assert_eq!(list[0].transaction_total_days.as_deref(), Some("90"));

        let empty = client.list_institutions("GB").await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn fetches_single_institution() {
        let client = test_client(routes()).await;
        let inst = client
            .institution("SANDBOXFINANCE_SFIN0000")
            .await
            .unwrap();
        assert_eq!(inst.bic.as_deref(), Some("SFIN0000"));
        assert_eq!(inst.countries, vec!["XX"]);
    }
}

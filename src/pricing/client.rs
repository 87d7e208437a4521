//! Shopping search client
//!
//! Credentials come from the secret store only. Lookups run one ingredient at
//! a time; a failed lookup degrades to an empty offer list.

use super::types::{IngredientPrices, Offer};
use crate::abstractions::{FetchRequest, HttpFetcher, SecretStore};
use crate::config::ShoppingConfig;
use crate::error::{ChefError, Result};
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

static MARKUP: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?b>").expect("valid markup regex"));

/// API credentials as stored in the secret store
#[derive(Debug, Clone, Deserialize)]
pub struct ShoppingCredentials {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    lprice: Value,
    #[serde(default)]
    mall_name: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    category1: String,
    #[serde(default)]
    product_id: String,
    #[serde(default)]
    brand: String,
}

impl SearchItem {
    fn price(&self) -> Option<u64> {
        match &self.lprice {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
        .filter(|p| *p > 0)
    }

    fn into_offer(self) -> Option<Offer> {
        let price = self.price()?;
        Some(Offer {
            name: strip_markup(&self.title),
            price,
            vendor: self.mall_name,
            link: self.link,
            image: self.image,
            category: self.category1,
            product_id: self.product_id,
            brand: self.brand,
            availability: "available".to_string(),
        })
    }
}

/// Remove the `<b>` highlight tags the search API wraps around matches
pub fn strip_markup(title: &str) -> String {
    MARKUP.replace_all(title, "").into_owned()
}

/// Keep positive prices, cheapest first (stable), at most `top_n`
pub fn rank_offers(mut offers: Vec<Offer>, top_n: usize) -> Vec<Offer> {
    offers.retain(|o| o.price > 0);
    offers.sort_by_key(|o| o.price);
    offers.truncate(top_n);
    offers
}

pub struct ShoppingClient {
    fetcher: Arc<dyn HttpFetcher>,
    secrets: Arc<dyn SecretStore>,
    config: ShoppingConfig,
}

impl ShoppingClient {
    pub fn new(
        fetcher: Arc<dyn HttpFetcher>,
        secrets: Arc<dyn SecretStore>,
        config: ShoppingConfig,
    ) -> Self {
        Self {
            fetcher,
            secrets,
            config,
        }
    }

    /// Load credentials; any problem is a credentials error, never a silent default
    pub async fn credentials(&self) -> Result<ShoppingCredentials> {
        let name = self.config.secret_name.as_deref().ok_or_else(|| {
            ChefError::Credentials("shopping.secret_name is not configured".to_string())
        })?;
        let value = self
            .secrets
            .get_secret(name)
            .await
            .map_err(|e| ChefError::Credentials(format!("{e:#}")))?;
        let credentials: ShoppingCredentials = serde_json::from_value(value)
            .map_err(|e| ChefError::Credentials(format!("Secret {name} is malformed: {e}")))?;
        if credentials.client_id.is_empty() || credentials.client_secret.is_empty() {
            return Err(ChefError::Credentials(format!(
                "Secret {name} has empty credentials"
            )));
        }
        Ok(credentials)
    }

    /// Search offers for one ingredient
    pub async fn search(
        &self,
        credentials: &ShoppingCredentials,
        ingredient: &str,
    ) -> anyhow::Result<Vec<Offer>> {
        let request = FetchRequest::get(&self.config.endpoint)
            .query("query", ingredient)
            .query("display", self.config.display)
            .query("sort", "asc")
            .header("X-Naver-Client-Id", &credentials.client_id)
            .header("X-Naver-Client-Secret", &credentials.client_secret)
            .timeout(self.config.timeout);

        let body = self.fetcher.send(request).await?;
        let response: SearchResponse =
            serde_json::from_value(body).context("Unexpected shopping search response")?;
        let offers = response
            .items
            .into_iter()
            .filter_map(SearchItem::into_offer)
            .collect();
        Ok(rank_offers(offers, self.config.top_n))
    }

    /// Look up every ingredient in order
    ///
    /// Fails only when credentials are unavailable.
    pub async fn lookup_all(&self, ingredients: &[String]) -> Result<Vec<IngredientPrices>> {
        let credentials = self.credentials().await?;
        let mut results = Vec::with_capacity(ingredients.len());
        for ingredient in ingredients {
            let offers = match self.search(&credentials, ingredient).await {
                Ok(offers) => {
                    debug!("{} offers for {}", offers.len(), ingredient);
                    offers
                }
                Err(e) => {
                    warn!("Price lookup for {} failed: {:#}", ingredient, e);
                    Vec::new()
                }
            };
            results.push(IngredientPrices {
                ingredient: ingredient.clone(),
                offers,
            });
        }
        Ok(results)
    }
}

use serde::{Deserialize, Serialize};

/// One shopping-search listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub name: String,
    pub price: u64,
    pub vendor: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default = "default_availability")]
    pub availability: String,
}

fn default_availability() -> String {
    "available".to_string()
}

/// Offers found for one ingredient, cheapest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngredientPrices {
    pub ingredient: String,
    pub offers: Vec<Offer>,
}

impl IngredientPrices {
    pub fn cheapest(&self) -> Option<&Offer> {
        self.offers.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSummary {
    pub total_ingredients: usize,
    pub found_ingredients: usize,
    /// Fraction of ingredients with at least one offer, 0 when none were asked
    pub success_rate: f64,
}

/// Cheapest picks that share a vendor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorGroup {
    pub vendor: String,
    pub items: Vec<VendorItem>,
    pub total_price: u64,
    pub item_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorItem {
    pub ingredient: String,
    #[serde(flatten)]
    pub offer: Offer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub total_estimated_cost: u64,
    pub optimal_vendors: Vec<VendorGroup>,
}

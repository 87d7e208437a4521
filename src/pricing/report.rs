//! Aggregating per-ingredient offers into the price-stage payload

use super::types::{IngredientPrices, PriceSummary, Recommendations, VendorGroup, VendorItem};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// Aggregated price lookup for one request
#[derive(Debug, Clone, PartialEq)]
pub struct PriceReport {
    pub results: Vec<IngredientPrices>,
    pub summary: PriceSummary,
    pub recommendations: Recommendations,
}

impl PriceReport {
    pub fn from_results(results: Vec<IngredientPrices>) -> Self {
        let total = results.len();
        let found = results.iter().filter(|r| !r.offers.is_empty()).count();
        let summary = PriceSummary {
            total_ingredients: total,
            found_ingredients: found,
            success_rate: if total == 0 {
                0.0
            } else {
                found as f64 / total as f64
            },
        };
        let total_estimated_cost = results
            .iter()
            .filter_map(|r| r.cheapest())
            .map(|o| o.price)
            .fold(0, u64::saturating_add);
        let recommendations = Recommendations {
            total_estimated_cost,
            optimal_vendors: optimal_vendors(&results),
        };
        Self {
            results,
            summary,
            recommendations,
        }
    }

    /// `{ingredient: [offer, ...]}` keeping at most `limit` offers each
    pub fn ingredients_json(&self, limit: Option<usize>) -> Value {
        let mut map = Map::new();
        for result in &self.results {
            let offers = match limit {
                Some(n) => &result.offers[..result.offers.len().min(n)],
                None => &result.offers[..],
            };
            map.insert(result.ingredient.clone(), to_value(offers));
        }
        Value::Object(map)
    }

    /// The `data` block of the price-stage output
    pub fn data_json(&self) -> Value {
        json!({
            "summary": to_value(&self.summary),
            "ingredients": self.ingredients_json(None),
            "recommendations": to_value(&self.recommendations),
        })
    }

    /// `data` as persisted on the session, trimmed when it would exceed `max_bytes`
    pub fn stored_data_json(&self, max_bytes: usize, per_ingredient: usize) -> Value {
        let data = self.data_json();
        let size = serde_json::to_string(&data).map(|s| s.len()).unwrap_or(0);
        if size <= max_bytes {
            return data;
        }
        let mut trimmed = data;
        trimmed["ingredients"] = self.ingredients_json(Some(per_ingredient));
        trimmed
    }
}

/// Group every ingredient's cheapest offer by vendor, cheapest basket first
pub fn optimal_vendors(results: &[IngredientPrices]) -> Vec<VendorGroup> {
    let mut groups: HashMap<&str, VendorGroup> = HashMap::new();
    for result in results {
        let Some(cheapest) = result.cheapest() else {
            continue;
        };
        let group = groups
            .entry(cheapest.vendor.as_str())
            .or_insert_with(|| VendorGroup {
                vendor: cheapest.vendor.clone(),
                items: Vec::new(),
                total_price: 0,
                item_count: 0,
            });
        group.items.push(VendorItem {
            ingredient: result.ingredient.clone(),
            offer: cheapest.clone(),
        });
        group.total_price = group.total_price.saturating_add(cheapest.price);
        group.item_count += 1;
    }

    let mut vendors: Vec<VendorGroup> = groups.into_values().collect();
    vendors.sort_by(|a, b| {
        a.total_price
            .cmp(&b.total_price)
            .then_with(|| a.vendor.cmp(&b.vendor))
    });
    vendors
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::types::Offer;

    fn offer(price: u64, vendor: &str) -> Offer {
        Offer {
            name: format!("상품 {price}"),
            price,
            vendor: vendor.to_string(),
            link: String::new(),
            image: String::new(),
            category: String::new(),
            product_id: String::new(),
            brand: String::new(),
            availability: "available".to_string(),
        }
    }

    fn prices(ingredient: &str, offers: Vec<Offer>) -> IngredientPrices {
        IngredientPrices {
            ingredient: ingredient.to_string(),
            offers,
        }
    }

    #[test]
    fn test_report_totals_and_vendors() {
        let report = PriceReport::from_results(vec![
            prices("양파", vec![offer(1000, "마트"), offer(1200, "시장")]),
            prices("마늘", vec![offer(3000, "마트")]),
            prices("새우", vec![offer(2500, "수산")]),
            prices("바질", vec![]),
        ]);

        assert_eq!(report.summary.total_ingredients, 4);
        assert_eq!(report.summary.found_ingredients, 3);
        assert!((report.summary.success_rate - 0.75).abs() < f64::EPSILON);
        assert_eq!(report.recommendations.total_estimated_cost, 6500);

        let vendors = &report.recommendations.optimal_vendors;
        assert_eq!(vendors.len(), 2);
        assert_eq!(vendors[0].vendor, "수산");
        assert_eq!(vendors[1].vendor, "마트");
        assert_eq!(vendors[1].total_price, 4000);
        assert_eq!(vendors[1].item_count, 2);
    }

    #[test]
    fn test_vendor_ties_break_by_name() {
        let vendors = optimal_vendors(&[
            prices("a", vec![offer(500, "나")]),
            prices("b", vec![offer(500, "가")]),
        ]);
        assert_eq!(vendors[0].vendor, "가");
    }

    #[test]
    fn test_empty_report() {
        let report = PriceReport::from_results(Vec::new());
        assert_eq!(report.summary.success_rate, 0.0);
        let data = report.data_json();
        assert_eq!(data["recommendations"]["totalEstimatedCost"], 0);
        assert_eq!(data["recommendations"]["optimalVendors"], json!([]));
    }

    #[test]
    fn test_stored_data_is_trimmed_when_too_large() {
        let offers: Vec<Offer> = (1..=8).map(|p| offer(p * 100, "마트")).collect();
        let report = PriceReport::from_results(vec![prices("양파", offers)]);

        let full = report.stored_data_json(usize::MAX, 5);
        assert_eq!(full["ingredients"]["양파"].as_array().unwrap().len(), 8);

        let trimmed = report.stored_data_json(10, 5);
        assert_eq!(trimmed["ingredients"]["양파"].as_array().unwrap().len(), 5);
        assert_eq!(trimmed["summary"]["foundIngredients"], 1);
    }

    #[test]
    fn test_totals_saturate_on_extreme_prices() {
        let report = PriceReport::from_results(vec![
            prices("a", vec![offer(u64::MAX, "마트")]),
            prices("b", vec![offer(7, "마트")]),
        ]);
        assert_eq!(report.recommendations.total_estimated_cost, u64::MAX);
        assert_eq!(report.recommendations.optimal_vendors[0].total_price, u64::MAX);
        assert_eq!(report.recommendations.optimal_vendors[0].item_count, 2);
    }
}

//! Ingredient price lookup through the shopping search API

pub mod client;
pub mod report;
pub mod types;

pub use client::{rank_offers, strip_markup, ShoppingClient, ShoppingCredentials};
pub use report::{optimal_vendors, PriceReport};
pub use types::{IngredientPrices, Offer, PriceSummary, Recommendations, VendorGroup, VendorItem};

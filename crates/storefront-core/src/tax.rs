//! # GST Rate Resolution
//!
//! Decides which GST slab applies to a product.
//!
//! ## Priority Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  resolve_rate(product, hsn, rates)          first match wins            │
//! │                                                                         │
//! │  1. product.custom_gst_rate_id ──► rate exists?  ──► Custom             │
//! │            │ no                                                         │
//! │            ▼                                                            │
//! │  2. hsn.default_gst_rate_id    ──► rate exists?  ──► Hsn                │
//! │            │ no                                                         │
//! │            ▼                                                            │
//! │  3. (is_branded, is_packaged)  ──► rate by name? ──► Rule               │
//! │       (true,  true)  → Branded_Packaged                                 │
//! │       (true,  false) → Branded_Only                                     │
//! │       (false, true)  → Packaged_Only                                    │
//! │       (false, false) → Default                                          │
//! │            │ no                                                         │
//! │            ▼                                                            │
//! │  4. rate named "Default"       ──────────────────► Default              │
//! │            │ no                                                         │
//! │            ▼                                                            │
//! │  5. { rate_id: 0, rate_name: "None", 0% }  ──────► None                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Resolution never fails on incomplete configuration. Loading the inputs
//! (the product, its HSN code, the rate table) is the database layer's job
//! and its errors propagate from there.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{GstRate, HsnCode, Product};

// =============================================================================
// Rule Keys
// =============================================================================

/// Rate names used by the flag-based fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum RateRule {
    Default,
    BrandedPackaged,
    BrandedOnly,
    PackagedOnly,
}

impl RateRule {
    /// Picks the rule for a product's branding and packaging flags.
    pub fn for_flags(is_branded: bool, is_packaged: bool) -> Self {
        match (is_branded, is_packaged) {
            (true, true) => RateRule::BrandedPackaged,
            (true, false) => RateRule::BrandedOnly,
            (false, true) => RateRule::PackagedOnly,
            (false, false) => RateRule::Default,
        }
    }

    /// The `rate_name` this rule looks up.
    pub fn rate_name(&self) -> &'static str {
        match self {
            RateRule::Default => "Default",
            RateRule::BrandedPackaged => "Branded_Packaged",
            RateRule::BrandedOnly => "Branded_Only",
            RateRule::PackagedOnly => "Packaged_Only",
        }
    }
}

// =============================================================================
// Resolution Result
// =============================================================================

/// Which step of the chain produced the rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    Custom,
    Hsn,
    Rule,
    Default,
    None,
}

/// A resolved rate together with the step that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResolvedRate {
    pub rate: GstRate,
    pub source: RateSource,
}

// =============================================================================
// Resolver
// =============================================================================

/// Resolves the GST rate for `product`.
///
/// `hsn` is the product's HSN code row if it has one and it still exists.
/// `rates` is the full rate table.
///
/// ## Example
/// ```rust
/// use storefront_core::tax::{resolve_rate, RateSource};
/// use storefront_core::types::{GstRate, HsnCode, Product};
///
/// let rates = vec![
///     GstRate { rate_id: 1, rate_name: "Default".into(), percentage_bps: 1800, description: None },
///     GstRate { rate_id: 2, rate_name: "Food".into(), percentage_bps: 1200, description: None },
/// ];
/// let hsn = HsnCode { hsn_code_id: 5, code: "1001".into(), description: None, default_gst_rate_id: Some(2) };
/// let product = Product {
///     product_id: 1, name: "Wheat".into(), sku: None, price_paise: 10_000,
///     regular_price_paise: None, quantity: 10, hsn_code_id: Some(5),
///     is_branded: false, is_packaged: false, custom_gst_rate_id: None, category_id: None,
/// };
///
/// let resolved = resolve_rate(&product, Some(&hsn), &rates);
/// assert_eq!(resolved.rate.percentage_bps, 1200);
/// assert_eq!(resolved.source, RateSource::Hsn);
/// ```
pub fn resolve_rate(product: &Product, hsn: Option<&HsnCode>, rates: &[GstRate]) -> ResolvedRate {
    let by_id = |id: i64| rates.iter().find(|r| r.rate_id == id);
    let by_name = |name: &str| rates.iter().find(|r| r.rate_name == name);

    if let Some(rate) = product.custom_gst_rate_id.and_then(by_id) {
        return ResolvedRate {
            rate: rate.clone(),
            source: RateSource::Custom,
        };
    }

    // An HSN row that doesn't belong to this product is ignored.
    let hsn_default = hsn
        .filter(|h| product.hsn_code_id == Some(h.hsn_code_id))
        .and_then(|h| h.default_gst_rate_id)
        .and_then(by_id);
    if let Some(rate) = hsn_default {
        return ResolvedRate {
            rate: rate.clone(),
            source: RateSource::Hsn,
        };
    }

    let rule = RateRule::for_flags(product.is_branded, product.is_packaged);
    if let Some(rate) = by_name(rule.rate_name()) {
        let source = if rule == RateRule::Default {
            RateSource::Default
        } else {
            RateSource::Rule
        };
        return ResolvedRate {
            rate: rate.clone(),
            source,
        };
    }

    if let Some(rate) = by_name(RateRule::Default.rate_name()) {
        return ResolvedRate {
            rate: rate.clone(),
            source: RateSource::Default,
        };
    }

    ResolvedRate {
        rate: GstRate::none(),
        source: RateSource::None,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(id: i64, name: &str, bps: u32) -> GstRate {
        GstRate {
            rate_id: id,
            rate_name: name.to_string(),
            percentage_bps: bps,
            description: None,
        }
    }

    fn standard_rates() -> Vec<GstRate> {
        vec![
            rate(1, "Default", 1800),
            rate(2, "Branded_Packaged", 1200),
            rate(3, "Branded_Only", 1200),
            rate(4, "Packaged_Only", 500),
            rate(5, "Luxury", 2800),
            rate(6, "Food Grains", 1200),
        ]
    }

    fn product() -> Product {
        Product {
            product_id: 1,
            name: "Basmati Rice".to_string(),
            sku: Some("RICE-1KG".to_string()),
            price_paise: 12_000,
            regular_price_paise: None,
            quantity: 50,
            hsn_code_id: None,
            is_branded: false,
            is_packaged: false,
            custom_gst_rate_id: None,
            category_id: None,
        }
    }

    fn hsn(id: i64, code: &str, default_rate: Option<i64>) -> HsnCode {
        HsnCode {
            hsn_code_id: id,
            code: code.to_string(),
            description: None,
            default_gst_rate_id: default_rate,
        }
    }

    #[test]
    fn test_custom_rate_wins_over_everything() {
        let mut p = product();
        p.custom_gst_rate_id = Some(5);
        p.hsn_code_id = Some(10);
        p.is_branded = true;
        p.is_packaged = true;
        let h = hsn(10, "1001", Some(6));

        let resolved = resolve_rate(&p, Some(&h), &standard_rates());
        assert_eq!(resolved.rate.rate_id, 5);
        assert_eq!(resolved.source, RateSource::Custom);
    }

    #[test]
    fn test_dangling_custom_rate_falls_through() {
        let mut p = product();
        p.custom_gst_rate_id = Some(99);
        p.hsn_code_id = Some(10);
        let h = hsn(10, "1001", Some(6));

        let resolved = resolve_rate(&p, Some(&h), &standard_rates());
        assert_eq!(resolved.rate.rate_id, 6);
        assert_eq!(resolved.source, RateSource::Hsn);
    }

    #[test]
    fn test_hsn_1001_defaults_to_twelve_percent() {
        let mut p = product();
        p.hsn_code_id = Some(10);
        let h = hsn(10, "1001", Some(6));

        let resolved = resolve_rate(&p, Some(&h), &standard_rates());
        assert_eq!(resolved.rate.percentage_bps, 1200);
    }

    #[test]
    fn test_hsn_without_default_uses_rules() {
        let mut p = product();
        p.hsn_code_id = Some(10);
        p.is_packaged = true;
        let h = hsn(10, "1001", None);

        let resolved = resolve_rate(&p, Some(&h), &standard_rates());
        assert_eq!(resolved.rate.rate_name, "Packaged_Only");
        assert_eq!(resolved.source, RateSource::Rule);
    }

    #[test]
    fn test_mismatched_hsn_row_is_ignored() {
        let mut p = product();
        p.hsn_code_id = Some(11);
        let h = hsn(10, "1001", Some(6));

        let resolved = resolve_rate(&p, Some(&h), &standard_rates());
        assert_eq!(resolved.rate.rate_name, "Default");
    }

    #[test]
    fn test_rule_by_flags() {
        let rates = standard_rates();
        let cases = [
            (true, true, "Branded_Packaged"),
            (true, false, "Branded_Only"),
            (false, true, "Packaged_Only"),
            (false, false, "Default"),
        ];

        for (branded, packaged, expected) in cases {
            let mut p = product();
            p.is_branded = branded;
            p.is_packaged = packaged;
            let resolved = resolve_rate(&p, None, &rates);
            assert_eq!(resolved.rate.rate_name, expected);
        }
    }

    #[test]
    fn test_missing_rule_rate_falls_back_to_default() {
        let rates = vec![rate(1, "Default", 1800)];
        let mut p = product();
        p.is_branded = true;

        let resolved = resolve_rate(&p, None, &rates);
        assert_eq!(resolved.rate.rate_name, "Default");
        assert_eq!(resolved.source, RateSource::Default);
    }

    #[test]
    fn test_empty_configuration_yields_zero_sentinel() {
        let mut p = product();
        p.custom_gst_rate_id = Some(1);
        p.hsn_code_id = Some(2);
        p.is_branded = true;

        let resolved = resolve_rate(&p, None, &[]);
        assert_eq!(resolved.rate, GstRate::none());
        assert_eq!(resolved.source, RateSource::None);
    }
}

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One priced product entry in an audited quote.
///
/// Every price-derived field is recomputed by the validator before a line
/// reaches this type; after that the line is immutable for the rest of the
/// request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteLine {
    pub product_code: String,
    pub quantity: Decimal,
    pub list_price: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Decimal,
    pub total_price: Decimal,
    #[serde(default)]
    pub rules_applied: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuoteSummary {
    pub subtotal: Decimal,
    pub total_discount: Decimal,
    pub net_total: Decimal,
}

/// Approval routing reported by the generation service. Passed through
/// untouched; approval policy is evaluated elsewhere.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Approval {
    pub required: bool,
    pub chain: String,
    pub reason: String,
}

/// The audited quote document returned to the caller. Serializes to the same
/// wire schema the generation service produces, so an audited document can be
/// fed back through validation and come out unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditedQuote {
    pub quote_lines: Vec<QuoteLine>,
    pub quote_summary: QuoteSummary,
    #[serde(default)]
    pub approval: Approval,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Value>,
}

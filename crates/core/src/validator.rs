//! Deterministic audit of generation output.
//!
//! The candidate document is adversarial by default: every price-derived
//! field is recomputed from the trusted inputs and overwritten, and every
//! correction leaves exactly one warning behind. Only a structurally
//! unusable document is an error; line-level defects are repaired in place.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;

use crate::domain::document::{Approval, AuditedQuote, QuoteLine, QuoteSummary};
use crate::domain::product::ProductCatalog;
use crate::errors::AuditError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorConfig {
    /// Maximum deviation a reported amount may show before it is flagged.
    /// The recomputed value is written out either way.
    pub price_tolerance: Decimal,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self { price_tolerance: Decimal::new(1, 2) }
    }
}

/// Recomputes every derived amount in a candidate quote document against the
/// trusted catalog. Pure: the output depends only on the candidate, the
/// catalog, and the configured tolerance, and re-validating an audited
/// document is a no-op.
#[derive(Clone, Debug)]
pub struct QuoteValidator {
    catalog: ProductCatalog,
    config: ValidatorConfig,
}

impl QuoteValidator {
    pub fn new(catalog: ProductCatalog, config: ValidatorConfig) -> Self {
        Self { catalog, config }
    }

    pub fn validate(&self, candidate: &Value) -> Result<AuditedQuote, AuditError> {
        let root = candidate.as_object().ok_or(AuditError::InputShape)?;

        let mut warnings = read_warnings(root.get("warnings"));

        let mut quote_lines = Vec::new();
        if let Some(raw_lines) = root.get("quote_lines").and_then(Value::as_array) {
            for (index, raw_line) in raw_lines.iter().enumerate() {
                if let Some(line) = self.audit_line(index, raw_line, &mut warnings) {
                    quote_lines.push(line);
                }
            }
        }

        let quote_summary =
            self.audit_summary(&quote_lines, root.get("quote_summary"), &mut warnings);

        Ok(AuditedQuote {
            quote_lines,
            quote_summary,
            approval: read_approval(root.get("approval")),
            warnings,
            intent: root.get("intent").cloned(),
        })
    }

    /// Audits one line in isolation. Returns `None` only for a line that
    /// cannot name a product; every other defect is corrected in place.
    fn audit_line(
        &self,
        index: usize,
        raw_line: &Value,
        warnings: &mut Vec<String>,
    ) -> Option<QuoteLine> {
        let product_code = raw_line
            .as_object()
            .and_then(|fields| fields.get("product_code"))
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string);
        let (Some(product_code), Some(fields)) = (product_code, raw_line.as_object()) else {
            warnings.push(format!("Line {} missing product_code - line dropped", index + 1));
            return None;
        };

        let quantity = match read_decimal(fields.get("quantity")) {
            Some(quantity) if quantity > Decimal::ZERO => quantity,
            _ => {
                warnings.push(format!(
                    "Invalid quantity ({}) for {product_code} - corrected to 1",
                    render_raw(fields.get("quantity"))
                ));
                Decimal::ONE
            }
        };

        let reported_discount = read_decimal(fields.get("discount_percent")).unwrap_or_default();
        let discount_percent = if reported_discount < Decimal::ZERO
            || reported_discount > Decimal::ONE_HUNDRED
        {
            let clamped = reported_discount.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);
            warnings.push(format!(
                "Discount {reported_discount}% out of range for {product_code} - clamped to {clamped}%"
            ));
            clamped
        } else {
            reported_discount
        };

        let reported_list = read_decimal(fields.get("list_price")).unwrap_or_default();
        let list_price = match self.catalog.find(&product_code) {
            Some(product) => {
                if deviates(reported_list, product.list_price, self.config.price_tolerance) {
                    warnings.push(format!(
                        "List price corrected for {product_code}: reported={reported_list}, catalog={}",
                        product.list_price
                    ));
                }
                product.list_price
            }
            None => reported_list,
        };

        let unit_price =
            round4(list_price * (Decimal::ONE - discount_percent / Decimal::ONE_HUNDRED));
        let reported_unit = read_decimal(fields.get("unit_price")).unwrap_or_default();
        if deviates(reported_unit, unit_price, self.config.price_tolerance) {
            warnings.push(format!(
                "Unit price corrected for {product_code}: reported={reported_unit}, expected={unit_price}"
            ));
        }

        let total_price = round2(unit_price * quantity);
        let reported_total = read_decimal(fields.get("total_price")).unwrap_or_default();
        if deviates(reported_total, total_price, self.config.price_tolerance) {
            warnings.push(format!(
                "Total price corrected for {product_code}: reported={reported_total}, expected={total_price}"
            ));
        }

        Some(QuoteLine {
            product_code,
            quantity,
            list_price,
            unit_price,
            discount_percent,
            total_price,
            rules_applied: read_rules(fields.get("rules_applied")),
        })
    }

    /// Rebuilds the summary from the surviving corrected lines. The reported
    /// totals are only consulted to decide whether a warning is owed; the
    /// recomputed amounts always win, and total_discount is always derived.
    fn audit_summary(
        &self,
        lines: &[QuoteLine],
        reported: Option<&Value>,
        warnings: &mut Vec<String>,
    ) -> QuoteSummary {
        let subtotal =
            round2(lines.iter().map(|line| line.list_price * line.quantity).sum::<Decimal>());
        let net_total = round2(lines.iter().map(|line| line.total_price).sum::<Decimal>());

        let fields = reported.and_then(Value::as_object);
        let reported_subtotal =
            read_decimal(fields.and_then(|fields| fields.get("subtotal"))).unwrap_or_default();
        if deviates(reported_subtotal, subtotal, self.config.price_tolerance) {
            warnings.push(format!(
                "Subtotal corrected: reported={reported_subtotal}, expected={subtotal}"
            ));
        }

        let reported_net =
            read_decimal(fields.and_then(|fields| fields.get("net_total"))).unwrap_or_default();
        if deviates(reported_net, net_total, self.config.price_tolerance) {
            warnings.push(format!(
                "Net total corrected: reported={reported_net}, expected={net_total}"
            ));
        }

        QuoteSummary { subtotal, total_discount: subtotal - net_total, net_total }
    }
}

fn deviates(reported: Decimal, expected: Decimal, tolerance: Decimal) -> bool {
    (reported - expected).abs() > tolerance
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn round4(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(4, RoundingStrategy::MidpointAwayFromZero)
}

/// Lenient numeric read from the untrusted document: JSON numbers and
/// numeric strings both count, anything else is absent.
fn read_decimal(value: Option<&Value>) -> Option<Decimal> {
    match value? {
        Value::Number(number) => {
            if let Some(int) = number.as_i64() {
                Some(Decimal::from(int))
            } else {
                number.as_f64().and_then(Decimal::from_f64)
            }
        }
        Value::String(raw) => raw.trim().parse().ok(),
        _ => None,
    }
}

fn render_raw(value: Option<&Value>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => "missing".to_string(),
    }
}

fn read_warnings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn read_rules(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

fn read_approval(value: Option<&Value>) -> Approval {
    let Some(fields) = value.and_then(Value::as_object) else {
        return Approval::default();
    };
    Approval {
        required: fields.get("required").and_then(Value::as_bool).unwrap_or_default(),
        chain: fields.get("chain").and_then(Value::as_str).unwrap_or_default().to_string(),
        reason: fields.get("reason").and_then(Value::as_str).unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use crate::domain::product::{ProductCatalog, ProductRef};
    use crate::errors::AuditError;

    use super::{QuoteValidator, ValidatorConfig};

    fn catalog() -> ProductCatalog {
        ProductCatalog::new(vec![
            ProductRef {
                product_code: "LAPTOP13".to_string(),
                list_price: Decimal::new(130_000, 2),
            },
            ProductRef {
                product_code: "MONITOR4K".to_string(),
                list_price: Decimal::new(40_000, 2),
            },
        ])
    }

    fn validator() -> QuoteValidator {
        QuoteValidator::new(catalog(), ValidatorConfig::default())
    }

    #[test]
    fn incorrect_unit_price_is_recomputed_from_list_and_discount() {
        let candidate = json!({
            "quote_lines": [{
                "product_code": "LAPTOP13",
                "quantity": 2,
                "list_price": 1300,
                "unit_price": 1000,
                "discount_percent": 20,
                "total_price": 2080.00,
                "rules_applied": ["Standard Laptop Discount"]
            }],
            "quote_summary": { "subtotal": 2600.00, "total_discount": 520.00, "net_total": 2080.00 }
        });

        let audited = validator().validate(&candidate).expect("validate");

        let line = &audited.quote_lines[0];
        assert_eq!(line.unit_price, Decimal::new(104_000, 2));
        assert_eq!(line.total_price, Decimal::new(208_000, 2));
        assert_eq!(audited.warnings.len(), 1);
        assert!(audited.warnings[0].contains("Unit price corrected for LAPTOP13"));
        assert!(audited.warnings[0].contains("1000"));
        assert!(audited.warnings[0].contains("1040"));
    }

    #[test]
    fn discount_above_hundred_is_clamped() {
        let candidate = json!({
            "quote_lines": [{
                "product_code": "LAPTOP13",
                "quantity": 1,
                "list_price": 1300,
                "unit_price": 0.00,
                "discount_percent": 150,
                "total_price": 0.00
            }],
            "quote_summary": { "subtotal": 1300.00, "total_discount": 1300.00, "net_total": 0.00 }
        });

        let audited = validator().validate(&candidate).expect("validate");

        let line = &audited.quote_lines[0];
        assert_eq!(line.discount_percent, Decimal::new(100, 0));
        assert_eq!(line.unit_price, Decimal::ZERO);
        assert_eq!(audited.warnings.len(), 1);
        assert!(audited.warnings[0].contains("Discount 150% out of range"));
        assert!(audited.warnings[0].contains("clamped to 100%"));
    }

    #[test]
    fn negative_discount_is_clamped_to_zero() {
        let candidate = json!({
            "quote_lines": [{
                "product_code": "MONITOR4K",
                "quantity": 1,
                "list_price": 400,
                "unit_price": 400.00,
                "discount_percent": -10,
                "total_price": 400.00
            }],
            "quote_summary": { "subtotal": 400.00, "total_discount": 0.00, "net_total": 400.00 }
        });

        let audited = validator().validate(&candidate).expect("validate");

        assert_eq!(audited.quote_lines[0].discount_percent, Decimal::ZERO);
        assert_eq!(audited.quote_lines[0].unit_price, Decimal::new(40_000, 2));
        assert_eq!(audited.warnings.len(), 1);
        assert!(audited.warnings[0].contains("clamped to 0%"));
    }

    #[test]
    fn line_without_product_code_is_dropped_with_one_warning() {
        let candidate = json!({
            "quote_lines": [
                { "quantity": 3, "list_price": 50, "unit_price": 50, "discount_percent": 0, "total_price": 150 },
                { "product_code": "MONITOR4K", "quantity": 1, "list_price": 400,
                  "unit_price": 400.00, "discount_percent": 0, "total_price": 400.00 }
            ],
            "quote_summary": { "subtotal": 400.00, "total_discount": 0.00, "net_total": 400.00 }
        });

        let audited = validator().validate(&candidate).expect("validate");

        assert_eq!(audited.quote_lines.len(), 1);
        assert_eq!(audited.quote_lines[0].product_code, "MONITOR4K");
        assert_eq!(audited.warnings.len(), 1);
        assert!(audited.warnings[0].contains("Line 1 missing product_code"));
    }

    #[test]
    fn non_numeric_quantity_is_coerced_to_one() {
        let candidate = json!({
            "quote_lines": [{
                "product_code": "MONITOR4K",
                "quantity": "plenty",
                "list_price": 400,
                "unit_price": 400.00,
                "discount_percent": 0,
                "total_price": 400.00
            }],
            "quote_summary": { "subtotal": 400.00, "total_discount": 0.00, "net_total": 400.00 }
        });

        let audited = validator().validate(&candidate).expect("validate");

        assert_eq!(audited.quote_lines[0].quantity, Decimal::ONE);
        assert_eq!(audited.warnings.len(), 1);
        assert!(audited.warnings[0].contains("Invalid quantity (\"plenty\") for MONITOR4K"));
    }

    #[test]
    fn zero_quantity_warning_cites_original_value() {
        let candidate = json!({
            "quote_lines": [{
                "product_code": "MONITOR4K",
                "quantity": 0,
                "list_price": 400,
                "unit_price": 400.00,
                "discount_percent": 0,
                "total_price": 400.00
            }],
            "quote_summary": { "subtotal": 400.00, "total_discount": 0.00, "net_total": 400.00 }
        });

        let audited = validator().validate(&candidate).expect("validate");

        assert_eq!(audited.quote_lines[0].quantity, Decimal::ONE);
        assert!(audited.warnings[0].contains("Invalid quantity (0)"));
    }

    #[test]
    fn catalog_price_overrides_reported_list_price() {
        let candidate = json!({
            "quote_lines": [{
                "product_code": "LAPTOP13",
                "quantity": 1,
                "list_price": 999,
                "unit_price": 999.00,
                "discount_percent": 0,
                "total_price": 999.00
            }],
            "quote_summary": { "subtotal": 1300.00, "total_discount": 0.00, "net_total": 1300.00 }
        });

        let audited = validator().validate(&candidate).expect("validate");

        let line = &audited.quote_lines[0];
        assert_eq!(line.list_price, Decimal::new(130_000, 2));
        assert_eq!(line.unit_price, Decimal::new(130_000, 2));
        assert!(audited
            .warnings
            .iter()
            .any(|warning| warning.contains("List price corrected for LAPTOP13")));
    }

    #[test]
    fn unknown_product_keeps_reported_list_price() {
        let candidate = json!({
            "quote_lines": [{
                "product_code": "FIREWALL",
                "quantity": 1,
                "list_price": 2400,
                "unit_price": 2400.00,
                "discount_percent": 0,
                "total_price": 2400.00
            }],
            "quote_summary": { "subtotal": 2400.00, "total_discount": 0.00, "net_total": 2400.00 }
        });

        let audited = validator().validate(&candidate).expect("validate");

        assert_eq!(audited.quote_lines[0].list_price, Decimal::new(2_400, 0));
        assert!(audited.warnings.is_empty());
    }

    #[test]
    fn summary_is_rebuilt_from_corrected_lines() {
        let candidate = json!({
            "quote_lines": [
                { "product_code": "LAPTOP13", "quantity": 2, "list_price": 1300,
                  "unit_price": 1040.00, "discount_percent": 20, "total_price": 2080.00 },
                { "product_code": "MONITOR4K", "quantity": 3, "list_price": 400,
                  "unit_price": 360.00, "discount_percent": 10, "total_price": 1080.00 }
            ],
            "quote_summary": { "subtotal": 9999.00, "total_discount": 0.00, "net_total": 1.00 }
        });

        let audited = validator().validate(&candidate).expect("validate");

        assert_eq!(audited.quote_summary.subtotal, Decimal::new(380_000, 2));
        assert_eq!(audited.quote_summary.net_total, Decimal::new(316_000, 2));
        assert_eq!(
            audited.quote_summary.total_discount,
            audited.quote_summary.subtotal - audited.quote_summary.net_total
        );
        assert!(audited.warnings.iter().any(|warning| warning.contains("Subtotal corrected")));
        assert!(audited.warnings.iter().any(|warning| warning.contains("Net total corrected")));
    }

    #[test]
    fn line_arithmetic_invariants_hold_after_audit() {
        let candidate = json!({
            "quote_lines": [
                { "product_code": "LAPTOP13", "quantity": 7, "list_price": 1300,
                  "unit_price": 1.00, "discount_percent": 12.5, "total_price": 1.00 },
                { "product_code": "UNLISTED", "quantity": 3, "list_price": 19.99,
                  "unit_price": 1.00, "discount_percent": 33.33, "total_price": 1.00 }
            ],
            "quote_summary": {}
        });

        let audited = validator().validate(&candidate).expect("validate");

        let hundred = Decimal::new(100, 0);
        for line in &audited.quote_lines {
            let expected_unit =
                line.list_price * (Decimal::ONE - line.discount_percent / hundred);
            assert!((line.unit_price - expected_unit).abs() <= Decimal::new(1, 4));
            assert!(
                (line.total_price - line.unit_price * line.quantity).abs() <= Decimal::new(1, 2)
            );
        }
        let net: Decimal = audited.quote_lines.iter().map(|line| line.total_price).sum();
        assert_eq!(audited.quote_summary.net_total, net);
    }

    #[test]
    fn validation_is_idempotent() {
        let candidate = json!({
            "quote_lines": [
                { "product_code": "LAPTOP13", "quantity": 2, "list_price": 1300,
                  "unit_price": 1000, "discount_percent": 20, "total_price": 2000 },
                { "quantity": 1, "list_price": 10 },
                { "product_code": "MONITOR4K", "quantity": -4, "list_price": 400,
                  "unit_price": 400, "discount_percent": 120, "total_price": 400 }
            ],
            "quote_summary": { "subtotal": 1.00, "total_discount": 2.00, "net_total": 3.00 },
            "approval": { "required": true, "chain": "Sales Manager", "reason": "large deal" },
            "intent": { "action": "create_quote" }
        });

        let first = validator().validate(&candidate).expect("first pass");
        let reencoded = serde_json::to_value(&first).expect("serialize audited document");
        let second = validator().validate(&reencoded).expect("second pass");

        assert_eq!(second, first);
        assert_eq!(second.warnings, first.warnings);
    }

    #[test]
    fn non_object_root_is_a_hard_failure() {
        let validator = validator();
        assert_eq!(validator.validate(&json!([])), Err(AuditError::InputShape));
        assert_eq!(validator.validate(&json!("quote")), Err(AuditError::InputShape));
        assert_eq!(validator.validate(&json!(null)), Err(AuditError::InputShape));
    }

    #[test]
    fn incoming_warnings_are_retained_and_appended_to() {
        let candidate = json!({
            "quote_lines": [{
                "product_code": "LAPTOP13",
                "quantity": 2,
                "list_price": 1300,
                "unit_price": 1000,
                "discount_percent": 20,
                "total_price": 2080.00
            }],
            "quote_summary": { "subtotal": 2600.00, "total_discount": 520.00, "net_total": 2080.00 },
            "warnings": ["Generated for account EMAIL_0"]
        });

        let audited = validator().validate(&candidate).expect("validate");

        assert_eq!(audited.warnings.len(), 2);
        assert_eq!(audited.warnings[0], "Generated for account EMAIL_0");
        assert!(audited.warnings[1].contains("Unit price corrected"));
    }

    #[test]
    fn approval_and_intent_pass_through() {
        let candidate = json!({
            "quote_lines": [],
            "quote_summary": { "subtotal": 0, "total_discount": 0, "net_total": 0 },
            "approval": { "required": true, "chain": "Sales Manager > VP Sales", "reason": "threshold" },
            "intent": { "action": "create_quote", "products": ["LAPTOP13"] }
        });

        let audited = validator().validate(&candidate).expect("validate");

        assert!(audited.approval.required);
        assert_eq!(audited.approval.chain, "Sales Manager > VP Sales");
        assert_eq!(audited.intent, Some(json!({ "action": "create_quote", "products": ["LAPTOP13"] })));
        assert!(audited.warnings.is_empty());
    }

    #[test]
    fn drift_within_tolerance_is_not_flagged() {
        let candidate = json!({
            "quote_lines": [{
                "product_code": "MONITOR4K",
                "quantity": 1,
                "list_price": 400,
                "unit_price": 399.995,
                "discount_percent": 0,
                "total_price": 400.004
            }],
            "quote_summary": { "subtotal": 400.00, "total_discount": 0.00, "net_total": 400.00 }
        });

        let audited = validator().validate(&candidate).expect("validate");

        assert!(audited.warnings.is_empty());
        assert_eq!(audited.quote_lines[0].unit_price, Decimal::new(40_000, 2));
        assert_eq!(audited.quote_lines[0].total_price, Decimal::new(40_000, 2));
    }

    #[test]
    fn tolerance_is_configurable() {
        let strict = QuoteValidator::new(
            catalog(),
            ValidatorConfig { price_tolerance: Decimal::new(1, 4) },
        );
        let candidate = json!({
            "quote_lines": [{
                "product_code": "MONITOR4K",
                "quantity": 1,
                "list_price": 400,
                "unit_price": 399.995,
                "discount_percent": 0,
                "total_price": 400.00
            }],
            "quote_summary": { "subtotal": 400.00, "total_discount": 0.00, "net_total": 400.00 }
        });

        let audited = strict.validate(&candidate).expect("validate");
        assert!(audited.warnings.iter().any(|warning| warning.contains("Unit price corrected")));
    }
}

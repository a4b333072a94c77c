use std::collections::HashSet;
use std::fmt;

use chrono::{Datelike, Local, NaiveDate};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

const LINE_ID_LEN: usize = 9;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductLineId(pub String);

impl fmt::Display for ProductLineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One ordered product: `quantity` is the number of rolls requested.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductLine {
    pub id: ProductLineId,
    pub name: String,
    pub variant: String,
    pub quantity: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesOrder {
    pub order_id: OrderId,
    pub customer_name: String,
    pub gst_number: Option<String>,
    pub customer_address: String,
    pub order_date: NaiveDate,
    pub lines: Vec<ProductLine>,
}

impl SalesOrder {
    pub fn total_rolls(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }
}

/// Order as typed in by a user, before any validation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderDraft {
    pub order_id: Option<String>,
    pub customer_name: String,
    pub gst_number: Option<String>,
    pub customer_address: String,
    pub order_date: Option<String>,
    pub products: Vec<DraftLine>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftLine {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub variant: String,
    #[serde(default = "default_draft_quantity")]
    pub quantity: i64,
}

fn default_draft_quantity() -> i64 {
    1
}

impl Default for DraftLine {
    fn default() -> Self {
        Self { id: None, name: String::new(), variant: String::new(), quantity: 1 }
    }
}

impl OrderDraft {
    /// Skeleton for a new order with a generated id and one empty line.
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            order_id: Some(generate_order_id(today.year())),
            order_date: Some(today.to_string()),
            products: vec![DraftLine { id: Some(generate_line_id()), ..DraftLine::default() }],
            ..Self::default()
        }
    }

    pub fn submit(self) -> Result<SalesOrder, DomainError> {
        self.submit_on(Local::now().date_naive())
    }

    /// Validates the draft; `today` fills in a missing order date.
    pub fn submit_on(self, today: NaiveDate) -> Result<SalesOrder, DomainError> {
        let order_id = match self.order_id {
            Some(value) => required("order_id", &value)?,
            None => generate_order_id(today.year()),
        };
        let customer_name = required("customer_name", &self.customer_name)?;
        let customer_address = required("customer_address", &self.customer_address)?;
        let gst_number = self
            .gst_number
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        let order_date = match self.order_date.as_deref().map(str::trim) {
            None | Some("") => today,
            Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| DomainError::InvalidOrderDate(raw.to_string()))?,
        };

        if self.products.is_empty() {
            return Err(DomainError::EmptyOrder);
        }

        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(self.products.len());
        for (position, draft) in self.products.into_iter().enumerate() {
            let line = draft.into_line(position)?;
            if !seen.insert(line.id.clone()) {
                return Err(DomainError::DuplicateProductId(line.id.0));
            }
            lines.push(line);
        }

        tracing::debug!(
            event_name = "packslip.order.submitted",
            order_id = %order_id,
            lines = lines.len(),
            "order draft validated"
        );

        Ok(SalesOrder {
            order_id: OrderId(order_id),
            customer_name,
            gst_number,
            customer_address,
            order_date,
            lines,
        })
    }
}

impl DraftLine {
    fn into_line(self, position: usize) -> Result<ProductLine, DomainError> {
        let id = match self.id.as_deref().map(str::trim) {
            None | Some("") => generate_line_id(),
            Some(value) => value.to_string(),
        };
        let label = format!("#{}", position + 1);
        let name = required(&format!("products[{position}].name"), &self.name)?;
        let variant = required(&format!("products[{position}].variant"), &self.variant)?;

        let quantity = u32::try_from(self.quantity)
            .ok()
            .filter(|quantity| *quantity >= 1)
            .ok_or(DomainError::InvalidQuantity { line: label, quantity: self.quantity })?;

        Ok(ProductLine { id: ProductLineId(id), name, variant, quantity })
    }
}

fn required(field: &str, value: &str) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::MissingField { field: field.to_string() });
    }
    Ok(trimmed.to_string())
}

/// Default order id, e.g. `SO-2024-4821`.
pub fn generate_order_id(year: i32) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!("SO-{year}-{suffix}")
}

pub fn generate_line_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(LINE_ID_LEN)
        .map(|byte| char::from(byte).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use crate::errors::DomainError;

    use super::{generate_line_id, generate_order_id, DraftLine, OrderDraft};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 17).expect("valid date")
    }

    fn draft() -> OrderDraft {
        OrderDraft {
            order_id: Some("SO-2024-0001".to_string()),
            customer_name: "Greenfield Farms".to_string(),
            gst_number: Some("29ABCDE1234F1Z5".to_string()),
            customer_address: "12 Orchard Road\nNashik".to_string(),
            order_date: None,
            products: vec![
                DraftLine {
                    id: Some("a".to_string()),
                    name: "Anti-Bird Net".to_string(),
                    variant: "Green, 25mm".to_string(),
                    quantity: 2,
                },
                DraftLine {
                    id: Some("b".to_string()),
                    name: "Shade Net".to_string(),
                    variant: "Black 50%".to_string(),
                    quantity: 1,
                },
            ],
        }
    }

    #[test]
    fn submit_produces_validated_order() {
        let order = draft().submit_on(today()).expect("valid draft");

        assert_eq!(order.order_id.0, "SO-2024-0001");
        assert_eq!(order.order_date, today());
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.total_rolls(), 3);
        assert_eq!(order.customer_address, "12 Orchard Road\nNashik");
    }

    #[test]
    fn blank_gst_number_is_treated_as_absent() {
        let mut draft = draft();
        draft.gst_number = Some("   ".to_string());

        let order = draft.submit_on(today()).expect("valid draft");
        assert_eq!(order.gst_number, None);
    }

    #[test]
    fn explicit_order_date_is_parsed() {
        let mut draft = draft();
        draft.order_date = Some("2023-12-01".to_string());

        let order = draft.submit_on(today()).expect("valid draft");
        assert_eq!(order.order_date, NaiveDate::from_ymd_opt(2023, 12, 1).expect("date"));
    }

    #[test]
    fn malformed_order_date_is_rejected() {
        let mut draft = draft();
        draft.order_date = Some("17/05/2024".to_string());

        let error = draft.submit_on(today()).expect_err("bad date");
        assert_eq!(error, DomainError::InvalidOrderDate("17/05/2024".to_string()));
    }

    #[test]
    fn blank_required_fields_are_rejected() {
        let mut draft = draft();
        draft.customer_name = "  ".to_string();

        let error = draft.submit_on(today()).expect_err("missing customer");
        assert_eq!(error, DomainError::MissingField { field: "customer_name".to_string() });
    }

    #[test]
    fn empty_order_id_is_rejected_but_absent_one_is_generated() {
        let mut explicit = draft();
        explicit.order_id = Some(String::new());
        assert!(matches!(
            explicit.submit_on(today()),
            Err(DomainError::MissingField { ref field }) if field == "order_id"
        ));

        let mut generated = draft();
        generated.order_id = None;
        let order = generated.submit_on(today()).expect("generated id");
        assert!(order.order_id.0.starts_with("SO-2024-"));
    }

    #[test]
    fn order_without_lines_is_rejected() {
        let mut draft = draft();
        draft.products.clear();

        assert_eq!(draft.submit_on(today()), Err(DomainError::EmptyOrder));
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        for quantity in [0, -3] {
            let mut draft = draft();
            draft.products[1].quantity = quantity;

            let error = draft.submit_on(today()).expect_err("invalid quantity");
            assert_eq!(error, DomainError::InvalidQuantity { line: "#2".to_string(), quantity });
        }
    }

    #[test]
    fn duplicate_line_ids_are_rejected() {
        let mut draft = draft();
        draft.products[1].id = Some("a".to_string());

        assert_eq!(draft.submit_on(today()), Err(DomainError::DuplicateProductId("a".to_string())));
    }

    #[test]
    fn missing_line_ids_are_generated_and_unique() {
        let mut draft = draft();
        for line in &mut draft.products {
            line.id = None;
        }

        let order = draft.submit_on(today()).expect("valid draft");
        assert_eq!(order.lines[0].id.0.len(), 9);
        assert_ne!(order.lines[0].id, order.lines[1].id);
    }

    #[test]
    fn blank_draft_has_generated_identifiers() {
        let blank = OrderDraft::blank(today());

        assert_eq!(blank.order_date.as_deref(), Some("2024-05-17"));
        assert_eq!(blank.products.len(), 1);
        assert_eq!(blank.products[0].quantity, 1);
        assert!(blank.order_id.as_deref().is_some_and(|id| id.starts_with("SO-2024-")));
    }

    #[test]
    fn generated_order_id_has_four_digit_suffix() {
        let id = generate_order_id(2025);
        let suffix: u16 = id.trim_start_matches("SO-2025-").parse().expect("numeric suffix");
        assert!((1000..=9999).contains(&suffix));
    }

    #[test]
    fn generated_line_ids_are_lowercase_alphanumeric() {
        let id = generate_line_id();
        assert_eq!(id.len(), 9);
        assert!(id.chars().all(|ch| ch.is_ascii_digit() || ch.is_ascii_lowercase()));
    }
}

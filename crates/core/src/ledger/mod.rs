//! Weight ledger: one user-entered weight per roll, plus the aggregation views
//! consumed by the packing slip, the workbook export and the dispatch email.
//!
//! Weights are stored verbatim. Coercion to a number only happens on read, in
//! [`parse_weight`]: the leading number of the entry is used (`"12 kg"` is 12),
//! text without one counts as zero, and the original text stays available for
//! correction.

use std::collections::HashMap;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::domain::order::{ProductLine, ProductLineId, SalesOrder};
use crate::domain::roll::{expand, RollRecord};
use crate::errors::LedgerError;

/// Largest accepted weight magnitude. Together with [`WEIGHT_SCALE`] this keeps
/// every ledger sum inside `Decimal`'s 28 exact digits.
pub const MAX_WEIGHT: Decimal = Decimal::from_parts(0xD4A5_1000, 0xE8, 0, false, 0);
/// Parsed weights are rounded to this many decimal places.
pub const WEIGHT_SCALE: u32 = 6;

/// Parse-or-zero coercion of a weight entry.
///
/// Reads the longest leading `[+-]digits[.digits][e[+-]digits]` prefix after
/// leading whitespace, so trailing units or a decimal comma are ignored. Entries
/// with no leading number, or beyond [`MAX_WEIGHT`], count as zero.
pub fn parse_weight(text: &str) -> Decimal {
    leading_number(text)
        .map(|value| {
            value.round_dp_with_strategy(WEIGHT_SCALE, RoundingStrategy::MidpointAwayFromZero)
        })
        .filter(|value| value.abs() <= MAX_WEIGHT)
        .map(|value| value.normalize())
        .unwrap_or(Decimal::ZERO)
}

fn leading_number(text: &str) -> Option<Decimal> {
    let bytes = text.trim_start().as_bytes();
    let digits_from = |start: usize| {
        start + bytes[start.min(bytes.len())..].iter().take_while(|b| b.is_ascii_digit()).count()
    };

    let mut number = String::new();
    let mut cursor = 0;
    if let Some(sign @ (b'+' | b'-')) = bytes.first() {
        if *sign == b'-' {
            number.push('-');
        }
        cursor = 1;
    }

    let int_end = digits_from(cursor);
    let int_digits = &bytes[cursor..int_end];
    cursor = int_end;

    let mut frac_digits: &[u8] = &[];
    if bytes.get(cursor) == Some(&b'.') {
        let frac_end = digits_from(cursor + 1);
        frac_digits = &bytes[cursor + 1..frac_end];
        cursor = frac_end;
    }
    if int_digits.is_empty() && frac_digits.is_empty() {
        return None;
    }

    number.push_str(if int_digits.is_empty() { "0" } else { std::str::from_utf8(int_digits).ok()? });
    if !frac_digits.is_empty() {
        number.push('.');
        number.push_str(std::str::from_utf8(frac_digits).ok()?);
    }

    if let Some(b'e' | b'E') = bytes.get(cursor) {
        let mut exp_start = cursor + 1;
        let negative = bytes.get(exp_start) == Some(&b'-');
        if matches!(bytes.get(exp_start), Some(b'+' | b'-')) {
            exp_start += 1;
        }
        let exp_end = digits_from(exp_start);
        if exp_end > exp_start {
            let exponent = std::str::from_utf8(&bytes[exp_start..exp_end]).ok()?;
            let sign = if negative { "-" } else { "" };
            // Exponents Decimal cannot represent leave no usable weight.
            return Decimal::from_scientific(&format!("{number}e{sign}{exponent}")).ok();
        }
    }

    Decimal::from_str(&number).ok()
}

/// Full-precision sum of parsed weights.
pub fn total_weight<'a, I>(records: I) -> Decimal
where
    I: IntoIterator<Item = &'a RollRecord>,
{
    records
        .into_iter()
        .map(|record| parse_weight(&record.weight))
        .fold(Decimal::ZERO, |total, weight| total.saturating_add(weight))
}

pub fn round_for_display(weight: Decimal) -> Decimal {
    let rounded = weight.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

/// Two-decimal rendering used everywhere a weight is shown, e.g. `10.50`.
pub fn format_weight(weight: Decimal) -> String {
    let mut rounded = round_for_display(weight);
    rounded.rescale(2);
    rounded.to_string()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProductGroup<'a> {
    pub line: &'a ProductLine,
    /// Global ledger position and record, in ledger order.
    pub rolls: Vec<(usize, &'a RollRecord)>,
}

impl ProductGroup<'_> {
    pub fn subtotal(&self) -> Decimal {
        total_weight(self.rolls.iter().map(|(_, record)| *record))
    }
}

/// Partitions `records` by originating line. Groups follow line order, rolls keep
/// ledger order, and lines without rolls still get an (empty) group.
pub fn group_by_product<'a>(
    lines: &'a [ProductLine],
    records: &'a [RollRecord],
) -> Vec<ProductGroup<'a>> {
    let mut slots: HashMap<&ProductLineId, usize> = HashMap::with_capacity(lines.len());
    let mut groups: Vec<ProductGroup<'a>> = Vec::with_capacity(lines.len());

    for line in lines {
        slots.entry(&line.id).or_insert(groups.len());
        groups.push(ProductGroup { line, rolls: Vec::new() });
    }

    for (position, record) in records.iter().enumerate() {
        if let Some(slot) = slots.get(&record.product_id) {
            groups[*slot].rolls.push((position, record));
        }
    }

    groups
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightLedger {
    lines: Vec<ProductLine>,
    rolls: Vec<RollRecord>,
}

impl WeightLedger {
    pub fn from_lines(lines: &[ProductLine]) -> Self {
        let rolls = expand(lines);
        tracing::debug!(
            event_name = "packslip.ledger.expanded",
            lines = lines.len(),
            rolls = rolls.len(),
            "roll ledger expanded"
        );
        Self { lines: lines.to_vec(), rolls }
    }

    pub fn from_order(order: &SalesOrder) -> Self {
        Self::from_lines(&order.lines)
    }

    pub fn lines(&self) -> &[ProductLine] {
        &self.lines
    }

    pub fn rolls(&self) -> &[RollRecord] {
        &self.rolls
    }

    pub fn len(&self) -> usize {
        self.rolls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rolls.is_empty()
    }

    pub fn weight(&self, index: usize) -> Option<&str> {
        self.rolls.get(index).map(|record| record.weight.as_str())
    }

    /// Replaces the weight text at `index`. Any text is accepted.
    pub fn set_weight(&mut self, index: usize, text: impl Into<String>) -> Result<(), LedgerError> {
        let len = self.rolls.len();
        let record = self.rolls.get_mut(index).ok_or(LedgerError::IndexOutOfRange {
            index: i64::try_from(index).unwrap_or(i64::MAX),
            len,
        })?;
        record.weight = text.into();
        Ok(())
    }

    /// Signed entry point for positions typed at a boundary.
    pub fn set_weight_at(&mut self, position: i64, text: impl Into<String>) -> Result<(), LedgerError> {
        let index = usize::try_from(position)
            .map_err(|_| LedgerError::IndexOutOfRange { index: position, len: self.rolls.len() })?;
        self.set_weight(index, text)
    }

    pub fn groups(&self) -> Vec<ProductGroup<'_>> {
        group_by_product(&self.lines, &self.rolls)
    }

    pub fn total_weight(&self) -> Decimal {
        total_weight(&self.rolls)
    }

    pub fn summary(&self) -> LedgerSummary {
        let groups: Vec<GroupSummary> = self
            .groups()
            .into_iter()
            .map(|group| GroupSummary {
                product_id: group.line.id.clone(),
                name: group.line.name.clone(),
                variant: group.line.variant.clone(),
                quantity: group.line.quantity,
                subtotal: group.subtotal(),
                rolls: group
                    .rolls
                    .iter()
                    .map(|(position, record)| RollSummary {
                        position: *position,
                        roll_number: record.roll_number,
                        weight_text: record.weight.clone(),
                        weight: parse_weight(&record.weight),
                    })
                    .collect(),
            })
            .collect();

        LedgerSummary { groups, total_rolls: self.rolls.len(), grand_total: self.total_weight() }
    }

    /// Re-expands `lines`, carrying weights over for every (product id, roll number)
    /// that still exists. Rolls that disappear take their weights with them.
    pub fn rebuild_preserving(&self, lines: &[ProductLine]) -> Self {
        let previous: HashMap<(&ProductLineId, u32), &str> =
            self.rolls.iter().map(|record| (record.key(), record.weight.as_str())).collect();

        let mut rebuilt = Self::from_lines(lines);
        for record in &mut rebuilt.rolls {
            if let Some(weight) = previous.get(&(&record.product_id, record.roll_number)) {
                record.weight = (*weight).to_string();
            }
        }
        rebuilt
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollSummary {
    pub position: usize,
    pub roll_number: u32,
    pub weight_text: String,
    pub weight: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub product_id: ProductLineId,
    pub name: String,
    pub variant: String,
    pub quantity: u32,
    pub rolls: Vec<RollSummary>,
    pub subtotal: Decimal,
}

/// Pre-computed view handed to renderers and exporters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub groups: Vec<GroupSummary>,
    pub total_rolls: usize,
    pub grand_total: Decimal,
}

impl LedgerSummary {
    pub fn grand_total_display(&self) -> String {
        format_weight(self.grand_total)
    }
}

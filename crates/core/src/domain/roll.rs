use serde::{Deserialize, Serialize};

use crate::domain::order::{ProductLine, ProductLineId};

/// One physical roll. Name and variant are copied from the line at expansion time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRecord {
    pub product_id: ProductLineId,
    pub product_name: String,
    pub variant: String,
    /// 1-based, local to the originating product.
    pub roll_number: u32,
    /// Weight exactly as entered; empty until the user records one.
    pub weight: String,
}

impl RollRecord {
    pub fn key(&self) -> (&ProductLineId, u32) {
        (&self.product_id, self.roll_number)
    }
}

/// Expands product lines into numbered rolls: line order first, then roll number.
/// A line with quantity 0 contributes nothing.
pub fn expand(lines: &[ProductLine]) -> Vec<RollRecord> {
    let capacity = lines.iter().map(|line| line.quantity as usize).sum();
    let mut rolls = Vec::with_capacity(capacity);

    for line in lines {
        rolls.extend((1..=line.quantity).map(|roll_number| RollRecord {
            product_id: line.id.clone(),
            product_name: line.name.clone(),
            variant: line.variant.clone(),
            roll_number,
            weight: String::new(),
        }));
    }

    rolls
}

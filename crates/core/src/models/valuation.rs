use serde::{Deserialize, Serialize};

/// Current allocation of the portfolio across held instruments.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Named instruments with a positive position, largest value first
    pub items: Vec<AllocationItem>,

    /// Value of every positive position, including unnamed instruments
    pub total_value: f64,
}

impl Allocation {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// One held instrument in an [`Allocation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationItem {
    pub symbol: String,
    pub name: String,

    /// Units currently held (always > 0)
    pub quantity: f64,

    /// Latest raw close, 0 when no price history exists
    pub price: f64,

    /// quantity × price
    pub value: f64,

    /// Share of `total_value` in percent
    pub percentage: f64,
}

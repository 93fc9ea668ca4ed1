//! Credit ledger types and pricing
//!
//! Balances are non-negative by construction. The cost of a generation is a
//! pure function of the requested content type and the image toggle, so the
//! dashboard and the generation service always agree on the price.

use crate::config::CreditsConfig;
use crate::generation::ContentType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Credit balance of one account
///
/// Wraps a `u32` so that a negative balance cannot be represented.
/// Conversions from signed database values clamp at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreditBalance(u32);

impl CreditBalance {
    /// Creates a balance from a credit count
    pub const fn new(credits: u32) -> Self {
        Self(credits)
    }

    /// Creates a balance from a signed value, clamping negatives to zero
    ///
    /// # Examples
    ///
    /// ```
    /// use lesson_forge::credits::CreditBalance;
    ///
    /// assert_eq!(CreditBalance::from_signed(-4).credits(), 0);
    /// assert_eq!(CreditBalance::from_signed(7).credits(), 7);
    /// ```
    pub fn from_signed(value: i64) -> Self {
        Self(value.clamp(0, i64::from(u32::MAX)) as u32)
    }

    /// Number of credits held
    pub const fn credits(&self) -> u32 {
        self.0
    }

    /// Whether the balance covers `cost`
    pub const fn covers(&self, cost: u32) -> bool {
        self.0 >= cost
    }
}

impl fmt::Display for CreditBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credits charged for one generation
///
/// # Examples
///
/// ```
/// use lesson_forge::config::CreditsConfig;
/// use lesson_forge::credits::generation_cost;
/// use lesson_forge::generation::ContentType;
///
/// let pricing = CreditsConfig::default();
/// assert_eq!(generation_cost(ContentType::Lesson, false, &pricing), 1);
/// assert_eq!(generation_cost(ContentType::Presentation, true, &pricing), 3);
/// ```
pub fn generation_cost(content_type: ContentType, include_images: bool, pricing: &CreditsConfig) -> u32 {
    let base = match content_type {
        ContentType::Lesson => pricing.lesson_cost,
        ContentType::Presentation => pricing.presentation_cost,
    };
    if include_images {
        base.saturating_add(pricing.image_surcharge)
    } else {
        base
    }
}

/// A purchasable credit bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CreditBundle {
    /// Credits added by the bundle
    pub credits: u32,
    /// Price in US cents
    pub price_cents: u32,
    /// Highlighted as the best value offer
    pub best_value: bool,
}

impl CreditBundle {
    /// Price formatted as dollars, e.g. `$9.99`
    pub fn price_label(&self) -> String {
        format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }

    /// Button label, e.g. `10 Credits | $9.99`
    pub fn label(&self) -> String {
        format!("{} Credits | {}", self.credits, self.price_label())
    }
}

/// Bundles offered on the purchase panel
pub const BUNDLES: [CreditBundle; 2] = [
    CreditBundle {
        credits: 10,
        price_cents: 999,
        best_value: false,
    },
    CreditBundle {
        credits: 50,
        price_cents: 3999,
        best_value: true,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_never_negative() {
        assert_eq!(CreditBalance::from_signed(i64::MIN).credits(), 0);
        assert_eq!(
            CreditBalance::from_signed(i64::MAX).credits(),
            u32::MAX
        );
    }

    #[test]
    fn test_balance_covers() {
        let balance = CreditBalance::new(2);
        assert!(balance.covers(2));
        assert!(!balance.covers(3));
        assert!(CreditBalance::default().covers(0));
    }

    #[test]
    fn test_generation_cost_table() {
        let pricing = CreditsConfig::default();
        assert_eq!(generation_cost(ContentType::Lesson, false, &pricing), 1);
        assert_eq!(generation_cost(ContentType::Lesson, true, &pricing), 2);
        assert_eq!(generation_cost(ContentType::Presentation, false, &pricing), 2);
        assert_eq!(generation_cost(ContentType::Presentation, true, &pricing), 3);
    }

    #[test]
    fn test_generation_cost_saturates() {
        let pricing = CreditsConfig {
            lesson_cost: u32::MAX,
            presentation_cost: 1,
            image_surcharge: 5,
            starting_balance: 0,
        };
        assert_eq!(generation_cost(ContentType::Lesson, true, &pricing), u32::MAX);
    }

    #[test]
    fn test_bundle_labels() {
        assert_eq!(BUNDLES[0].label(), "10 Credits | $9.99");
        assert_eq!(BUNDLES[1].label(), "50 Credits | $39.99");
        assert!(BUNDLES[1].best_value);
    }

    #[test]
    fn test_balance_serializes_as_number() {
        let json = serde_json::to_string(&CreditBalance::new(12)).unwrap();
        assert_eq!(json, "12");
    }
}

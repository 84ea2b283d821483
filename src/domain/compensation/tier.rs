use crate::domain::sales::CommissionTier;
use rust_decimal::Decimal;

/// Highest tier whose threshold is at or below `achievement`.
///
/// Below the first threshold the first tier applies. Tiers are expected sorted
/// ascending (checked when settings are built); an empty list resolves to `None`.
pub fn resolve_tier(tiers: &[CommissionTier], achievement: Decimal) -> Option<&CommissionTier> {
    tiers
        .iter()
        .rev()
        .find(|tier| tier.threshold <= achievement)
        .or_else(|| tiers.first())
}

/// Commission rate for an achievement ratio; zero for an empty tier list.
pub fn resolve_rate(tiers: &[CommissionTier], achievement: Decimal) -> Decimal {
    resolve_tier(tiers, achievement)
        .map(|tier| tier.rate)
        .unwrap_or(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tiers() -> Vec<CommissionTier> {
        vec![
            CommissionTier::new(dec!(0.5), "Entry", dec!(0.03)),
            CommissionTier::new(dec!(1.0), "Target", dec!(0.10)),
            CommissionTier::new(dec!(1.5), "Overachiever", dec!(0.15)),
        ]
    }

    #[test]
    fn test_resolve_rate_bands() {
        let tiers = tiers();
        assert_eq!(resolve_rate(&tiers, dec!(0.5)), dec!(0.03));
        assert_eq!(resolve_rate(&tiers, dec!(0.99)), dec!(0.03));
        assert_eq!(resolve_rate(&tiers, dec!(1.0)), dec!(0.10));
        assert_eq!(resolve_rate(&tiers, dec!(3.2)), dec!(0.15));
    }

    #[test]
    fn test_below_lowest_threshold_uses_first_tier() {
        let tiers = tiers();
        assert_eq!(resolve_rate(&tiers, Decimal::ZERO), dec!(0.03));
        assert_eq!(resolve_tier(&tiers, dec!(0.1)).map(|t| t.label.as_str()), Some("Entry"));
    }

    #[test]
    fn test_empty_tiers_resolve_to_zero() {
        assert_eq!(resolve_rate(&[], dec!(1.2)), Decimal::ZERO);
        assert!(resolve_tier(&[], dec!(1.2)).is_none());
    }

    #[test]
    fn test_two_band_plan() {
        let tiers = vec![
            CommissionTier::new(dec!(0), "Base", dec!(0.05)),
            CommissionTier::new(dec!(1.0), "Target", dec!(0.10)),
        ];
        assert_eq!(resolve_rate(&tiers, dec!(1.2)), dec!(0.10));
        assert_eq!(resolve_rate(&tiers, dec!(0.8)), dec!(0.05));
    }
}

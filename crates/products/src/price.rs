use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reserva_core::{DomainError, DomainResult, PriceId, ResourceId};

/// A price row belonging to a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub id: PriceId,
    pub resource: ResourceId,
    /// Price in smallest currency unit (e.g., cents).
    pub amount: i64,
    /// ISO currency code (e.g., "USD", "EUR").
    pub currency: String,
    pub is_default: bool,
    pub sale_amount: Option<i64>,
    /// Open when absent.
    pub sale_start: Option<DateTime<Utc>>,
    /// Open when absent.
    pub sale_end: Option<DateTime<Utc>>,
}

impl Price {
    pub fn new(resource: ResourceId, amount: i64, currency: impl Into<String>) -> DomainResult<Self> {
        let currency = currency.into();
        if amount < 0 {
            return Err(DomainError::validation("price amount cannot be negative"));
        }
        if currency.trim().is_empty() {
            return Err(DomainError::validation("currency cannot be empty"));
        }
        Ok(Self {
            id: PriceId::new(),
            resource,
            amount,
            currency: currency.to_uppercase(),
            is_default: false,
            sale_amount: None,
            sale_start: None,
            sale_end: None,
        })
    }

    pub fn as_default(mut self) -> Self {
        self.is_default = true;
        self
    }

    pub fn with_sale(
        mut self,
        sale_amount: i64,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> DomainResult<Self> {
        if sale_amount < 0 {
            return Err(DomainError::validation("sale amount cannot be negative"));
        }
        if let (Some(s), Some(e)) = (start, end) {
            if s >= e {
                return Err(DomainError::InvalidWindow { start: s, end: e });
            }
        }
        self.sale_amount = Some(sale_amount);
        self.sale_start = start;
        self.sale_end = end;
        Ok(self)
    }

    /// True when a sale amount exists and `now` lies in `[sale_start, sale_end)`.
    pub fn on_sale(&self, now: DateTime<Utc>) -> bool {
        if self.sale_amount.is_none() {
            return false;
        }
        let started = self.sale_start.is_none_or(|s| s <= now);
        let not_ended = self.sale_end.is_none_or(|e| now < e);
        started && not_ended
    }

    /// Amount charged at `now`: the sale amount while the sale runs.
    pub fn current_amount(&self, now: DateTime<Utc>) -> i64 {
        match self.sale_amount {
            Some(sale) if self.on_sale(now) => sale,
            _ => self.amount,
        }
    }
}

/// Pick the price a resource is sold at in `currency`.
///
/// No prices → `None`. One price → that price. Several → exactly one must be
/// the default, otherwise resolution fails.
pub fn resolve_default_price<'a>(
    resource: ResourceId,
    prices: &'a [Price],
    currency: &str,
) -> DomainResult<Option<&'a Price>> {
    let mut in_currency = prices
        .iter()
        .filter(|p| p.resource == resource && p.currency.eq_ignore_ascii_case(currency));

    let first = match in_currency.next() {
        Some(p) => p,
        None => return Ok(None),
    };
    let rest: Vec<&Price> = in_currency.collect();
    if rest.is_empty() {
        return Ok(Some(first));
    }

    let mut defaults = core::iter::once(first).chain(rest).filter(|p| p.is_default);
    match (defaults.next(), defaults.next()) {
        (Some(only), None) => Ok(Some(only)),
        _ => Err(DomainError::AmbiguousDefaultPrice(resource)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn single_price_resolves_without_default_flag() {
        let resource = ResourceId::new();
        let prices = vec![Price::new(resource, 10_000, "usd").unwrap()];
        let resolved = resolve_default_price(resource, &prices, "USD").unwrap().unwrap();
        assert_eq!(resolved.amount, 10_000);
        assert_eq!(resolved.currency, "USD");
    }

    #[test]
    fn several_prices_need_exactly_one_default() {
        let resource = ResourceId::new();
        let mut prices = vec![
            Price::new(resource, 10_000, "USD").unwrap(),
            Price::new(resource, 12_000, "USD").unwrap(),
        ];
        let err = resolve_default_price(resource, &prices, "USD").unwrap_err();
        assert_eq!(err, DomainError::AmbiguousDefaultPrice(resource));

        prices[1].is_default = true;
        let resolved = resolve_default_price(resource, &prices, "USD").unwrap().unwrap();
        assert_eq!(resolved.amount, 12_000);

        prices[0].is_default = true;
        assert!(resolve_default_price(resource, &prices, "USD").is_err());
    }

    #[test]
    fn other_currencies_are_ignored() {
        let resource = ResourceId::new();
        let prices = vec![
            Price::new(resource, 9_000, "EUR").unwrap().as_default(),
            Price::new(resource, 10_000, "USD").unwrap().as_default(),
        ];
        let resolved = resolve_default_price(resource, &prices, "USD").unwrap().unwrap();
        assert_eq!(resolved.amount, 10_000);
        assert!(resolve_default_price(resource, &prices, "GBP").unwrap().is_none());
    }

    #[test]
    fn sale_amount_applies_inside_half_open_window() {
        let resource = ResourceId::new();
        let price = Price::new(resource, 10_000, "USD")
            .unwrap()
            .with_sale(8_000, Some(now()), Some(now() + Duration::days(1)))
            .unwrap();

        assert_eq!(price.current_amount(now() - Duration::seconds(1)), 10_000);
        assert_eq!(price.current_amount(now()), 8_000);
        assert_eq!(price.current_amount(now() + Duration::days(1)), 10_000);
    }

    #[test]
    fn open_ended_sale_never_expires() {
        let price = Price::new(ResourceId::new(), 10_000, "USD")
            .unwrap()
            .with_sale(7_500, None, None)
            .unwrap();
        assert!(price.on_sale(now()));
        assert_eq!(price.current_amount(now()), 7_500);
    }

    #[test]
    fn rejects_negative_amounts() {
        assert!(Price::new(ResourceId::new(), -1, "USD").is_err());
        let price = Price::new(ResourceId::new(), 1, "USD").unwrap();
        assert!(price.with_sale(-1, None, None).is_err());
    }
}

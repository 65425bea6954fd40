//! Deterministic slicing of a historical series into pages.

use crate::{DailyRates, HistoricalPage, HistoricalSeries, PageRequest};

pub const DEFAULT_PAGE_SIZE: u32 = 5;
pub const MAX_PAGE_SIZE: u32 = 50;

/// Sorts series dates newest first and cuts out one page.
///
/// Pages are derived on every call; only the unpaginated series is cached.
#[derive(Debug, Default, Clone, Copy)]
pub struct HistoricalPaginator;

impl HistoricalPaginator {
    /// An offset past the end yields an empty page that still reports the
    /// full `total_count`.
    pub fn paginate(series: &HistoricalSeries, request: PageRequest) -> HistoricalPage {
        let mut dates: Vec<&String> = series.rates.keys().collect();
        dates.sort_unstable_by(|left, right| right.cmp(left));
        let total_count = dates.len();

        let rates = dates
            .into_iter()
            .skip(request.offset())
            .take(request.page_size() as usize)
            .filter_map(|date| {
                series.rates.get(date).map(|table| DailyRates {
                    date: date.clone(),
                    rates: table.clone(),
                })
            })
            .collect();

        HistoricalPage {
            amount: series.amount,
            base: series.base.clone(),
            start_date: series.start_date,
            end_date: series.end_date,
            page: request.page(),
            page_size: request.page_size(),
            total_count,
            rates,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use super::*;
    use crate::{CurrencyCode, RateTable};

    fn series(days: &[(&str, Decimal)]) -> HistoricalSeries {
        let usd = CurrencyCode::parse("USD").expect("valid");
        let rates = days
            .iter()
            .map(|(day, factor)| {
                let table: RateTable = [(usd.clone(), *factor)].into_iter().collect();
                (String::from(*day), table)
            })
            .collect::<BTreeMap<_, _>>();

        HistoricalSeries::new(
            Decimal::ONE,
            CurrencyCode::parse("EUR").expect("valid"),
            date!(2024 - 01 - 01),
            date!(2024 - 01 - 31),
            rates,
        )
        .expect("valid series")
    }

    fn page(page: u32, page_size: u32) -> PageRequest {
        PageRequest::new(page, page_size, MAX_PAGE_SIZE).expect("valid page")
    }

    #[test]
    fn pages_are_sorted_newest_first() {
        let series = series(&[
            ("2024-01-01", dec!(1.10)),
            ("2024-01-02", dec!(1.12)),
            ("2024-01-03", dec!(1.15)),
        ]);

        let first = HistoricalPaginator::paginate(&series, page(1, 2));
        assert_eq!(first.dates(), vec!["2024-01-03", "2024-01-02"]);
        assert_eq!(first.total_count, 3);

        let second = HistoricalPaginator::paginate(&series, page(2, 2));
        assert_eq!(second.dates(), vec!["2024-01-01"]);
        assert_eq!(second.total_count, 3);
        assert_eq!(second.last_page(), 2);
    }

    #[test]
    fn page_past_the_end_is_empty_with_total() {
        let series = series(&[("2024-01-01", dec!(1.10)), ("2024-01-02", dec!(1.12))]);

        let page = HistoricalPaginator::paginate(&series, page(9, 5));
        assert!(page.rates.is_empty());
        assert_eq!(page.total_count, 2);
        assert_eq!(page.page, 9);
    }

    #[test]
    fn page_carries_series_metadata() {
        let series = series(&[("2024-01-05", dec!(1.09))]);

        let page = HistoricalPaginator::paginate(&series, page(1, 5));
        assert_eq!(page.base.as_str(), "EUR");
        assert_eq!(page.start_date, date!(2024 - 01 - 01));
        assert_eq!(page.end_date, date!(2024 - 01 - 31));
        assert_eq!(page.amount, Decimal::ONE);
        assert_eq!(page.rates[0].rates.values().next(), Some(&dec!(1.09)));
    }

    #[test]
    fn empty_series_yields_empty_first_page() {
        let series = series(&[]);

        let page = HistoricalPaginator::paginate(&series, page(1, 5));
        assert!(page.rates.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.last_page(), 0);
    }
}

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Currency every mixed-currency booking is settled in.
pub const SETTLEMENT_CURRENCY: &str = "USD";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotStatus {
    Available,
    SoldOut,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Available => "AVAILABLE",
            SlotStatus::SoldOut => "SOLD_OUT",
        }
    }

    /// Status a slot must carry for the given number of remaining vacancies.
    pub fn for_vacancies(vacancies: i32) -> Self {
        if vacancies > 0 {
            SlotStatus::Available
        } else {
            SlotStatus::SoldOut
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SlotStatus::Available)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Reserved,
    Confirmed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Reserved => "RESERVED",
            BookingStatus::Confirmed => "CONFIRMED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for SlotStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(SlotStatus::Available),
            "SOLD_OUT" => Ok(SlotStatus::SoldOut),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RESERVED" => Ok(BookingStatus::Reserved),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response shape negotiated through the `Capability` request header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Capability {
    #[default]
    Standard,
    Pricing,
}

impl Capability {
    pub const HEADER: &'static str = "Capability";

    pub fn from_header(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.trim().eq_ignore_ascii_case("pricing") => Capability::Pricing,
            _ => Capability::Standard,
        }
    }

    pub fn includes_pricing(&self) -> bool {
        matches!(self, Capability::Pricing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("Invalid {field} format. Please use YYYY-MM-DD.")]
    Format { field: &'static str },
    #[error("{field} is required")]
    Missing { field: &'static str },
    #[error("localDateEnd {end} is before localDateStart {start}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateError> {
        if end < start {
            return Err(DateError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    pub fn len_days(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.len_days() as i64).map(move |offset| start + Duration::days(offset))
    }
}

/// Either a single `localDate` or a `localDateStart`/`localDateEnd` pair.
/// A present `localDate` takes precedence over the pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateSelector {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_date_start: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_date_end: Option<String>,
}

impl DateSelector {
    pub fn resolve(&self) -> Result<DateRange, DateError> {
        if let Some(date) = non_empty(&self.local_date) {
            return Ok(DateRange::single(parse_date(date, "localDate")?));
        }

        let start = non_empty(&self.local_date_start)
            .ok_or(DateError::Missing { field: "localDateStart" })?;
        let end = non_empty(&self.local_date_end)
            .ok_or(DateError::Missing { field: "localDateEnd" })?;

        DateRange::new(
            parse_date(start, "localDateStart")?,
            parse_date(end, "localDateEnd")?,
        )
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn parse_date(value: &str, field: &'static str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| DateError::Format { field })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductRequest {
    pub name: String,
    pub capacity: i32,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAvailabilityRequest {
    pub product_id: Uuid,
    #[serde(flatten)]
    pub dates: DateSelector,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBookingRequest {
    /// Accepted for compatibility; the product is always taken from the slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<Uuid>,
    pub availability_id: Uuid,
    pub units: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("currency must be a three-letter code, got {0:?}")]
pub struct InvalidCurrency(pub String);

/// Upper-cases a three-letter currency code, falling back to the settlement
/// currency when blank.
pub fn normalize_currency_code(code: &str) -> Result<String, InvalidCurrency> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(SETTLEMENT_CURRENCY.to_string());
    }
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
        return Err(InvalidCurrency(code.to_string()));
    }
    Ok(code.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, DATE_FORMAT).unwrap()
    }

    #[test]
    fn slot_status_follows_vacancies() {
        assert_eq!(SlotStatus::for_vacancies(3), SlotStatus::Available);
        assert_eq!(SlotStatus::for_vacancies(0), SlotStatus::SoldOut);
        assert!(!SlotStatus::SoldOut.is_available());
    }

    #[test]
    fn statuses_round_trip_through_their_column_text() {
        for status in [SlotStatus::Available, SlotStatus::SoldOut] {
            assert_eq!(status.as_str().parse::<SlotStatus>(), Ok(status));
        }
        for status in [BookingStatus::Reserved, BookingStatus::Confirmed] {
            assert_eq!(status.as_str().parse::<BookingStatus>(), Ok(status));
        }
        assert!("reserved".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn capability_header_is_case_insensitive() {
        assert_eq!(Capability::from_header(Some("pricing")), Capability::Pricing);
        assert_eq!(Capability::from_header(Some("PRICING")), Capability::Pricing);
        assert_eq!(Capability::from_header(Some(" Pricing ")), Capability::Pricing);
        assert_eq!(Capability::from_header(Some("pricing,extra")), Capability::Standard);
        assert_eq!(Capability::from_header(Some("")), Capability::Standard);
        assert_eq!(Capability::from_header(None), Capability::Standard);
    }

    #[test]
    fn single_date_takes_precedence() {
        let selector = DateSelector {
            local_date: Some("2024-05-01".into()),
            local_date_start: Some("2024-06-01".into()),
            local_date_end: Some("2024-06-10".into()),
        };
        assert_eq!(selector.resolve(), Ok(DateRange::single(date("2024-05-01"))));
    }

    #[test]
    fn range_selector_resolves_inclusive_days() {
        let selector = DateSelector {
            local_date: None,
            local_date_start: Some("2024-02-27".into()),
            local_date_end: Some("2024-03-01".into()),
        };
        let range = selector.resolve().unwrap();
        assert_eq!(range.len_days(), 4);
        let days: Vec<_> = range.days().collect();
        assert_eq!(
            days,
            vec![date("2024-02-27"), date("2024-02-28"), date("2024-02-29"), date("2024-03-01")]
        );
    }

    #[test]
    fn bad_selectors_are_rejected() {
        let bad_format = DateSelector {
            local_date: Some("01/05/2024".into()),
            ..Default::default()
        };
        assert_eq!(bad_format.resolve(), Err(DateError::Format { field: "localDate" }));

        let missing_end = DateSelector {
            local_date_start: Some("2024-05-01".into()),
            ..Default::default()
        };
        assert_eq!(missing_end.resolve(), Err(DateError::Missing { field: "localDateEnd" }));

        let inverted = DateSelector {
            local_date_start: Some("2024-05-02".into()),
            local_date_end: Some("2024-05-01".into()),
            ..Default::default()
        };
        assert!(matches!(inverted.resolve(), Err(DateError::Inverted { .. })));
    }

    #[test]
    fn availability_request_flattens_date_fields() {
        let raw = r#"{
            "productId": "6b1f0a52-3c1e-4f7e-9a43-1d7c1b5a2e10",
            "localDateStart": "2024-05-01",
            "localDateEnd": "2024-05-03",
            "price": 20.5
        }"#;
        let request: NewAvailabilityRequest = serde_json::from_str(raw).unwrap();
        assert_eq!(request.dates.resolve().unwrap().len_days(), 3);
        assert_eq!(request.currency, "");
        assert_eq!(request.price, 20.5);
    }

    #[test]
    fn currency_codes_default_to_settlement_currency() {
        assert_eq!(normalize_currency_code(""), Ok("USD".to_string()));
        assert_eq!(normalize_currency_code(" eur "), Ok("EUR".to_string()));
    }

    #[test]
    fn currency_codes_must_be_three_letters() {
        for bad in ["euro", "US", "U$D", "12A", "ÉUR"] {
            assert_eq!(normalize_currency_code(bad), Err(InvalidCurrency(bad.to_string())));
        }
    }
}

//! External representations of stored records.
//!
//! Every view carries `price`/`currency` only when the caller asked for the
//! `pricing` capability; otherwise those keys are left out of the JSON.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use num_traits::ToPrimitive;
use serde::Serialize;
use shared::{Capability, SlotStatus};
use uuid::Uuid;

use crate::models::*;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityView {
    pub id: Uuid,
    pub local_date: NaiveDate,
    pub status: SlotStatus,
    pub product_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    pub vacancies: i32,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingUnitView {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    pub id: Uuid,
    pub status: String,
    pub availability_id: Uuid,
    pub units: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    pub booking_units: Vec<BookingUnitView>,
}

fn priced(capability: Capability, amount: &BigDecimal, currency: &str) -> (Option<f64>, Option<String>) {
    if capability.includes_pricing() {
        (amount.to_f64(), Some(currency.to_string()))
    } else {
        (None, None)
    }
}

impl ProductView {
    pub fn project(product: &Product, capability: Capability) -> Self {
        let (price, currency) = priced(capability, &product.price, &product.currency);
        Self {
            id: product.id,
            name: product.name.clone(),
            capacity: product.capacity,
            price,
            currency,
        }
    }
}

impl AvailabilityView {
    pub fn project(slot: &Availability, capability: Capability) -> Self {
        let (price, currency) = priced(capability, &slot.price, &slot.currency);
        Self {
            id: slot.id,
            local_date: slot.local_date,
            status: slot.slot_status(),
            product_id: slot.product_id,
            product_name: None,
            vacancies: slot.vacancies,
            available: slot.available,
            price,
            currency,
        }
    }

    pub fn project_listing(listing: &SlotListing, capability: Capability) -> Self {
        Self {
            product_name: Some(listing.product_name.clone()),
            ..Self::project(&listing.slot, capability)
        }
    }
}

impl BookingUnitView {
    pub fn project(unit: &BookingUnit, capability: Capability) -> Self {
        let (price, currency) = priced(capability, &unit.price, &unit.currency);
        Self {
            id: unit.id,
            booking_id: unit.booking_id,
            reference: unit.reference.clone(),
            price,
            currency,
        }
    }
}

impl BookingView {
    pub fn project(booking: &Booking, units: &[BookingUnit], capability: Capability) -> Self {
        let (price, currency) = priced(capability, &booking.price, &booking.currency);
        Self {
            id: booking.id,
            status: booking.status.clone(),
            availability_id: booking.availability_id,
            units: booking.units,
            price,
            currency,
            booking_units: units
                .iter()
                .map(|unit| BookingUnitView::project(unit, capability))
                .collect(),
        }
    }

    pub fn project_with_units(record: &BookingWithUnits, capability: Capability) -> Self {
        Self::project(&record.booking, &record.units, capability)
    }
}

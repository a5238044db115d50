use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use shared::SlotStatus;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = crate::schema::products)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub price: BigDecimal,
    pub currency: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::products)]
pub struct NewProduct {
    pub id: Uuid,
    pub name: String,
    pub capacity: i32,
    pub price: BigDecimal,
    pub currency: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = crate::schema::availabilities)]
#[diesel(belongs_to(Product))]
pub struct Availability {
    pub id: Uuid,
    pub local_date: NaiveDate,
    pub status: String,
    pub product_id: Uuid,
    pub vacancies: i32,
    pub available: bool,
    pub price: BigDecimal,
    pub currency: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Availability {
    pub fn slot_status(&self) -> SlotStatus {
        // Stored rows are only ever written through SlotStatus, vacancies are the fallback.
        self.status
            .parse()
            .unwrap_or_else(|_| SlotStatus::for_vacancies(self.vacancies))
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::availabilities)]
pub struct NewAvailability {
    pub id: Uuid,
    pub local_date: NaiveDate,
    pub status: String,
    pub product_id: Uuid,
    pub vacancies: i32,
    pub available: bool,
    pub price: BigDecimal,
    pub currency: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = crate::schema::bookings)]
#[diesel(belongs_to(Availability))]
pub struct Booking {
    pub id: Uuid,
    pub status: String,
    pub availability_id: Uuid,
    pub units: i32,
    pub price: BigDecimal,
    pub currency: String,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::bookings)]
pub struct NewBooking {
    pub id: Uuid,
    pub status: String,
    pub availability_id: Uuid,
    pub units: i32,
    pub price: BigDecimal,
    pub currency: String,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations)]
#[diesel(table_name = crate::schema::booking_units)]
#[diesel(belongs_to(Booking))]
pub struct BookingUnit {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub reference: String,
    pub position: i32,
    pub price: BigDecimal,
    pub currency: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = crate::schema::booking_units)]
pub struct NewBookingUnit {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub reference: String,
    pub position: i32,
    pub price: BigDecimal,
    pub currency: String,
}

impl NewBookingUnit {
    /// Ticket for the `index`-th unit of a booking, priced from the product as it is now.
    pub fn ticket(booking_id: Uuid, index: i32, product: &Product) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            reference: format!("TICKET-{}-{}", index, booking_id),
            position: index,
            price: product.price.clone(),
            currency: product.currency.clone(),
        }
    }
}

/// A booking together with the units materialized at confirmation.
#[derive(Debug, Clone)]
pub struct BookingWithUnits {
    pub booking: Booking,
    pub units: Vec<BookingUnit>,
}

/// A slot joined with the name of the product it belongs to.
#[derive(Debug, Clone)]
pub struct SlotListing {
    pub slot: Availability,
    pub product_name: String,
}

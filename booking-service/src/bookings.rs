use chrono::Utc;
use diesel::prelude::*;
use diesel_async::{AsyncConnection, RunQueryDsl};
use shared::BookingStatus;
use tracing::info;
use uuid::Uuid;

use crate::currency::CurrencyNormalizer;
use crate::error::{AppError, AppResult};
use crate::ledger::AvailabilityLedger;
use crate::models::*;
use crate::pricing;
use crate::schema::*;
use crate::{DbPool, INSERT_BATCH_ROWS};

pub struct BookingManager {
    pool: DbPool,
    normalizer: CurrencyNormalizer,
}

impl BookingManager {
    pub fn new(pool: DbPool, normalizer: CurrencyNormalizer) -> Self {
        Self { pool, normalizer }
    }

    /// Reserves `units` on a slot and records a `RESERVED` booking for them.
    ///
    /// The settlement price is worked out before the transaction opens, so a
    /// slow rate lookup never holds the slot row lock.
    pub async fn create_booking(&self, availability_id: Uuid, units: i32) -> AppResult<Booking> {
        if units <= 0 {
            return Err(AppError::Validation("units must be greater than zero".to_string()));
        }

        let (slot, product) = {
            let mut conn = self.pool.get().await?;

            let slot = availabilities::table
                .find(availability_id)
                .first::<Availability>(&mut conn)
                .await
                .optional()?
                .ok_or(AppError::UnknownAvailability)?;

            let product = products::table
                .find(slot.product_id)
                .first::<Product>(&mut conn)
                .await
                .map_err(|e| {
                    anyhow::anyhow!("availability {} has no usable product {}: {}", slot.id, slot.product_id, e)
                })?;

            (slot, product)
        };

        let settlement = pricing::settle(&self.normalizer, product.price_tag(), slot.price_tag(), units).await?;

        let new_booking = NewBooking {
            id: Uuid::new_v4(),
            status: BookingStatus::Reserved.as_str().to_string(),
            availability_id,
            units,
            price: settlement.price,
            currency: settlement.currency,
        };

        let mut conn = self.pool.get().await?;
        let (booking, reservation) = conn
            .transaction::<_, AppError, _>(|conn| {
                Box::pin(async move {
                    let reservation =
                        AvailabilityLedger::reserve(conn, new_booking.availability_id, new_booking.units).await?;

                    let booking = diesel::insert_into(bookings::table)
                        .values(&new_booking)
                        .get_result::<Booking>(conn)
                        .await?;

                    Ok((booking, reservation))
                })
            })
            .await?;

        info!(
            "Booking {} reserved {} unit(s) on {} for {} {}, {} vacancies left ({})",
            booking.id,
            booking.units,
            booking.availability_id,
            booking.price,
            booking.currency,
            reservation.remaining,
            reservation.status
        );
        Ok(booking)
    }

    /// Promotes a `RESERVED` booking to `CONFIRMED` and issues one unit per
    /// booked seat.
    ///
    /// Units are priced from the product as it is at confirmation time, which
    /// can differ from the settlement price stored on the booking. A booking
    /// that is already confirmed is rejected rather than confirmed again.
    pub async fn confirm_booking(&self, booking_id: Uuid) -> AppResult<BookingWithUnits> {
        let mut conn = self.pool.get().await?;

        let issued = conn
            .transaction::<_, AppError, _>(|conn| {
                Box::pin(async move {
                    let flipped = diesel::update(
                        bookings::table
                            .filter(bookings::id.eq(booking_id))
                            .filter(bookings::status.eq(BookingStatus::Reserved.as_str())),
                    )
                    .set((
                        bookings::status.eq(BookingStatus::Confirmed.as_str()),
                        bookings::updated_at.eq(Some(Utc::now())),
                    ))
                    .returning((bookings::availability_id, bookings::units))
                    .get_result::<(Uuid, i32)>(conn)
                    .await
                    .optional()?;

                    let (availability_id, units) = match flipped {
                        Some(row) => row,
                        None => {
                            let exists = diesel::select(diesel::dsl::exists(bookings::table.find(booking_id)))
                                .get_result::<bool>(conn)
                                .await?;
                            return Err(if exists {
                                AppError::AlreadyConfirmed(booking_id)
                            } else {
                                AppError::NotFound(format!("booking {} not found", booking_id))
                            });
                        }
                    };

                    let slot = availabilities::table
                        .find(availability_id)
                        .first::<Availability>(conn)
                        .await?;
                    let product = products::table
                        .find(slot.product_id)
                        .first::<Product>(conn)
                        .await?;

                    let tickets: Vec<NewBookingUnit> = (0..units)
                        .map(|index| NewBookingUnit::ticket(booking_id, index, &product))
                        .collect();

                    let mut issued = 0;
                    for batch in tickets.chunks(INSERT_BATCH_ROWS) {
                        issued += diesel::insert_into(booking_units::table)
                            .values(batch)
                            .execute(conn)
                            .await?;
                    }

                    Ok(issued)
                })
            })
            .await?;

        info!("Booking {} confirmed with {} unit(s)", booking_id, issued);
        self.get(booking_id).await
    }

    pub async fn get(&self, booking_id: Uuid) -> AppResult<BookingWithUnits> {
        let mut conn = self.pool.get().await?;

        let booking = bookings::table
            .find(booking_id)
            .first::<Booking>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("booking {} not found", booking_id)))?;

        let units = BookingUnit::belonging_to(&booking)
            .order(booking_units::position.asc())
            .load::<BookingUnit>(&mut conn)
            .await?;

        Ok(BookingWithUnits { booking, units })
    }

    pub async fn list(&self) -> AppResult<Vec<BookingWithUnits>> {
        let mut conn = self.pool.get().await?;

        let all = bookings::table
            .order((bookings::created_at.asc(), bookings::id.asc()))
            .load::<Booking>(&mut conn)
            .await?;

        let units = BookingUnit::belonging_to(&all)
            .order(booking_units::position.asc())
            .load::<BookingUnit>(&mut conn)
            .await?
            .grouped_by(&all);

        Ok(all
            .into_iter()
            .zip(units)
            .map(|(booking, units)| BookingWithUnits { booking, units })
            .collect())
    }
}

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Text, Uuid as SqlUuid};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use shared::{DateRange, SlotStatus};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::schema::*;
use crate::{DbPool, INSERT_BATCH_ROWS};

// Decrement and status flip happen in one guarded statement so that two
// concurrent reservations cannot both pass the capacity check.
const RESERVE_SQL: &str = "\
UPDATE availabilities \
SET vacancies = vacancies - $1, \
    status = CASE WHEN vacancies - $1 = 0 THEN $3 ELSE status END, \
    available = vacancies - $1 > 0, \
    updated_at = NOW() \
WHERE id = $2 AND vacancies >= $1 \
RETURNING vacancies";

#[derive(Debug, QueryableByName)]
struct Remaining {
    #[diesel(sql_type = Integer)]
    vacancies: i32,
}

/// Outcome of a successful reservation against a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reservation {
    pub remaining: i32,
    pub status: SlotStatus,
}

pub struct AvailabilityLedger {
    pool: DbPool,
}

impl AvailabilityLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Opens one slot per day of `range` for the product, all or nothing.
    pub async fn create_range(
        &self,
        product_id: Uuid,
        range: DateRange,
        price: BigDecimal,
        currency: String,
    ) -> AppResult<Vec<Availability>> {
        let mut conn = self.pool.get().await?;

        let created = conn
            .transaction::<_, AppError, _>(|conn| {
                Box::pin(async move {
                    let product = products::table
                        .find(product_id)
                        .first::<Product>(conn)
                        .await
                        .optional()?
                        .ok_or_else(|| AppError::Validation(format!("unknown product id {}", product_id)))?;

                    let status = SlotStatus::for_vacancies(product.capacity);
                    let slots: Vec<NewAvailability> = range
                        .days()
                        .map(|day| NewAvailability {
                            id: Uuid::new_v4(),
                            local_date: day,
                            status: status.as_str().to_string(),
                            product_id,
                            vacancies: product.capacity,
                            available: status.is_available(),
                            price: price.clone(),
                            currency: currency.clone(),
                        })
                        .collect();

                    let mut created = Vec::with_capacity(slots.len());
                    for batch in slots.chunks(INSERT_BATCH_ROWS) {
                        let inserted = diesel::insert_into(availabilities::table)
                            .values(batch)
                            .get_results::<Availability>(conn)
                            .await?;
                        created.extend(inserted);
                    }

                    Ok(created)
                })
            })
            .await?;

        info!(
            "Opened {} slot(s) for product {} from {} to {}",
            created.len(),
            product_id,
            range.start,
            range.end
        );
        Ok(created)
    }

    pub async fn find(&self, slot_id: Uuid) -> AppResult<Option<Availability>> {
        let mut conn = self.pool.get().await?;
        let slot = availabilities::table
            .find(slot_id)
            .first::<Availability>(&mut conn)
            .await
            .optional()?;
        Ok(slot)
    }

    /// Slots dated within `range`, with their product names, earliest first.
    pub async fn search(&self, range: DateRange) -> AppResult<Vec<SlotListing>> {
        let mut conn = self.pool.get().await?;

        let rows = availabilities::table
            .inner_join(products::table)
            .filter(availabilities::local_date.between(range.start, range.end))
            .order((availabilities::local_date.asc(), products::name.asc()))
            .select((availabilities::all_columns, products::name))
            .load::<(Availability, String)>(&mut conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(slot, product_name)| SlotListing { slot, product_name })
            .collect())
    }

    /// Takes `units` vacancies from a slot on the caller's connection.
    ///
    /// Meant to run inside the caller's transaction: the slot row stays locked
    /// until it commits or rolls back.
    pub async fn reserve(
        conn: &mut AsyncPgConnection,
        slot_id: Uuid,
        units: i32,
    ) -> AppResult<Reservation> {
        if units <= 0 {
            return Err(AppError::Validation("units must be greater than zero".to_string()));
        }

        let remaining = diesel::sql_query(RESERVE_SQL)
            .bind::<Integer, _>(units)
            .bind::<SqlUuid, _>(slot_id)
            .bind::<Text, _>(SlotStatus::SoldOut.as_str())
            .get_result::<Remaining>(conn)
            .await
            .optional()?;

        match remaining {
            Some(Remaining { vacancies }) => Ok(Reservation {
                remaining: vacancies,
                status: SlotStatus::for_vacancies(vacancies),
            }),
            None => {
                let vacancies = availabilities::table
                    .find(slot_id)
                    .select(availabilities::vacancies)
                    .first::<i32>(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| AppError::NotFound(format!("availability {} not found", slot_id)))?;
                warn!("Slot {} cannot take {} unit(s), {} left", slot_id, units, vacancies);
                Err(AppError::InsufficientCapacity {
                    requested: units,
                    remaining: vacancies,
                })
            }
        }
    }
}

use bigdecimal::BigDecimal;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::schema::*;
use crate::DbPool;

pub struct ProductCatalog {
    pool: DbPool,
}

impl ProductCatalog {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, product: NewProduct) -> AppResult<Product> {
        let mut conn = self.pool.get().await?;

        let created = diesel::insert_into(products::table)
            .values(&product)
            .get_result::<Product>(&mut conn)
            .await?;

        info!("Product {} ({}) created with capacity {}", created.id, created.name, created.capacity);
        Ok(created)
    }

    pub async fn get(&self, product_id: Uuid) -> AppResult<Product> {
        let mut conn = self.pool.get().await?;

        products::table
            .find(product_id)
            .first::<Product>(&mut conn)
            .await
            .optional()?
            .ok_or_else(|| AppError::NotFound(format!("product {} not found", product_id)))
    }

    pub async fn list(&self) -> AppResult<Vec<Product>> {
        let mut conn = self.pool.get().await?;

        let all = products::table
            .order((products::name.asc(), products::id.asc()))
            .load::<Product>(&mut conn)
            .await?;
        Ok(all)
    }
}

impl NewProduct {
    pub fn new(name: String, capacity: i32, price: BigDecimal, currency: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            capacity,
            price,
            currency,
        }
    }
}

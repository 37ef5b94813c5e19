use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use cine_domain::error::BookingError;
use cine_domain::repository::CustomerDirectory;
use cine_domain::reservation::Customer;

/// Plain read/write wrapper over the customers table. No concurrency logic
/// lives here.
pub struct CustomerRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    id: Uuid,
    name: String,
    email: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            email: row.email,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn infra(err: sqlx::Error) -> BookingError {
    BookingError::Infrastructure(err.into())
}

impl CustomerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(&self) -> Result<Vec<Customer>, BookingError> {
        let rows = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, name, email, created_at, updated_at FROM customers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(infra)?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<Customer>, BookingError> {
        let row = sqlx::query_as::<_, CustomerRow>(
            "SELECT id, name, email, created_at, updated_at FROM customers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(infra)?;

        Ok(row.map(Customer::from))
    }

    pub async fn create(&self, name: &str, email: &str) -> Result<Customer, BookingError> {
        let now = Utc::now();
        let customer = Customer {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            created_at: now,
            updated_at: now,
        };

        let result = sqlx::query(
            "INSERT INTO customers (id, name, email, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(customer),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505") => Err(
                BookingError::Validation(format!("email {} is already registered", email)),
            ),
            Err(e) => Err(infra(e)),
        }
    }

    pub async fn update(
        &self,
        id: Uuid,
        name: &str,
        email: &str,
    ) -> Result<Option<Customer>, BookingError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE customers SET name = $1, email = $2, updated_at = $3 WHERE id = $4",
        )
        .bind(name)
        .bind(email)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(infra)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get(id).await
    }

    /// Returns `None` when no such customer exists. Deleting a customer
    /// with reservations on file is rejected rather than cascaded.
    pub async fn delete(&self, id: Uuid) -> Result<Option<()>, BookingError> {
        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(None),
            Ok(_) => Ok(Some(())),
            // 23503: reservations still reference this customer
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23503") => Err(
                BookingError::Validation(format!("customer {} has reservations on file", id)),
            ),
            Err(e) => Err(infra(e)),
        }
    }
}

#[async_trait]
impl CustomerDirectory for CustomerRepository {
    async fn customer_exists(&self, id: Uuid) -> Result<bool, BookingError> {
        let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(infra)?;

        Ok(row.is_some())
    }
}

use async_trait::async_trait;
use sqlx::PgPool;

use skyfare_core::repository::CustomerDirectory;
use skyfare_core::{Customer, StoreError};

use crate::database::map_sqlx;

pub struct PostgresCustomers {
    pool: PgPool,
}

impl PostgresCustomers {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CustomerRow {
    customer_id: String,
    name: String,
    email: String,
    password: String,
    passport_number: Option<String>,
    is_admin: bool,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            customer_id: row.customer_id,
            name: row.name,
            email: row.email,
            passport_number: row.passport_number,
            is_admin: row.is_admin,
        }
    }
}

#[async_trait]
impl CustomerDirectory for PostgresCustomers {
    async fn verify_credentials(
        &self,
        customer_id: &str,
        password: &str,
    ) -> Result<Option<Customer>, StoreError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT customer_id, name, email, password, passport_number, is_admin
            FROM customers
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.filter(|r| r.password == password).map(Customer::from))
    }

    async fn find_customer(&self, customer_id: &str) -> Result<Option<Customer>, StoreError> {
        let row: Option<CustomerRow> = sqlx::query_as(
            r#"
            SELECT customer_id, name, email, password, passport_number, is_admin
            FROM customers
            WHERE customer_id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx)?;

        Ok(row.map(Customer::from))
    }

    async fn set_passport_number(
        &self,
        customer_id: &str,
        passport_number: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE customers SET passport_number = $1 WHERE customer_id = $2")
            .bind(passport_number)
            .bind(customer_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx)?;

        Ok(())
    }
}

//! Company (tenant) rows. Every other table is scoped by `company_id`.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use kardex_core::validation::validate_branch_name;
use kardex_core::Company;

#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    pub async fn create(&self, name: &str) -> DbResult<Company> {
        let name = validate_branch_name(name)?;

        let company = sqlx::query_as::<_, Company>(
            r#"
            INSERT INTO companies (name, is_active, created_at)
            VALUES (?1, 1, ?2)
            RETURNING id, name, is_active, created_at
            "#,
        )
        .bind(&name)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        info!(company_id = company.id, name = %company.name, "Company created");
        Ok(company)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Company>> {
        debug!(id, "Getting company");

        let company = sqlx::query_as::<_, Company>(
            "SELECT id, name, is_active, created_at FROM companies WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(company)
    }

    pub async fn list_active(&self) -> DbResult<Vec<Company>> {
        let companies = sqlx::query_as::<_, Company>(
            "SELECT id, name, is_active, created_at FROM companies WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(companies)
    }

    pub async fn set_active(&self, id: i64, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE companies SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Company", id));
        }

        Ok(())
    }
}

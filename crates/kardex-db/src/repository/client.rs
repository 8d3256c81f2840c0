//! Client (customer) rows. A client's type selects the price tier at
//! checkout.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use kardex_core::validation::{validate_client_name, validate_search_query};
use kardex_core::{Client, CoreError, NewClient};

const SELECT_CLIENT: &str = r#"
    SELECT id, company_id, full_name, phone, email, client_type, is_active, created_at
    FROM clients
"#;

#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    pub async fn insert(&self, client: &NewClient) -> DbResult<Client> {
        let full_name = validate_client_name(&client.full_name)?;
        let phone = non_blank(client.phone.as_deref());
        let email = non_blank(client.email.as_deref());

        let inserted = sqlx::query_as::<_, Client>(
            r#"
            INSERT INTO clients (company_id, full_name, phone, email, client_type, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)
            RETURNING id, company_id, full_name, phone, email, client_type, is_active, created_at
            "#,
        )
        .bind(client.company_id)
        .bind(&full_name)
        .bind(phone)
        .bind(email)
        .bind(client.client_type)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        info!(client_id = inserted.id, client_type = %inserted.client_type, "Client created");
        Ok(inserted)
    }

    pub async fn get_by_id(&self, company_id: i64, id: i64) -> DbResult<Option<Client>> {
        let sql = format!("{SELECT_CLIENT} WHERE company_id = ?1 AND id = ?2");
        let client = sqlx::query_as::<_, Client>(&sql)
            .bind(company_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(client)
    }

    /// Active clients whose name, phone or email contains `query`.
    pub async fn search(&self, company_id: i64, query: &str, limit: u32) -> DbResult<Vec<Client>> {
        let query = validate_search_query(query)?;

        debug!(company_id, query = %query, "Searching clients");

        let sql = format!(
            "{SELECT_CLIENT} WHERE company_id = ?1 AND is_active = 1 \
             AND (?2 = '' \
                  OR instr(lower(full_name), lower(?2)) > 0 \
                  OR instr(COALESCE(phone, ''), ?2) > 0 \
                  OR instr(lower(COALESCE(email, '')), lower(?2)) > 0) \
             ORDER BY full_name LIMIT ?3"
        );
        let clients = sqlx::query_as::<_, Client>(&sql)
            .bind(company_id)
            .bind(&query)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(clients)
    }

    pub async fn set_active(&self, company_id: i64, id: i64, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE clients SET is_active = ?3 WHERE company_id = ?1 AND id = ?2")
            .bind(company_id)
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        Ok(())
    }
}

/// The client if it exists in the company and is active.
pub(crate) async fn fetch_active_client(
    conn: &mut SqliteConnection,
    company_id: i64,
    client_id: i64,
) -> DbResult<Client> {
    let sql = format!("{SELECT_CLIENT} WHERE company_id = ?1 AND id = ?2 AND is_active = 1");
    let client = sqlx::query_as::<_, Client>(&sql)
        .bind(company_id)
        .bind(client_id)
        .fetch_optional(&mut *conn)
        .await?;

    client.ok_or_else(|| CoreError::ClientNotFound(client_id).into())
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use kardex_core::{ClientType, PriceTier};

    #[tokio::test]
    async fn test_insert_search_and_tier() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let company = db.companies().create("Acme").await.unwrap();
        let repo = db.clients();

        let client = repo
            .insert(&NewClient {
                company_id: company.id,
                full_name: "Ana Perez".to_string(),
                phone: Some("  ".to_string()),
                email: Some("ana@example.com".to_string()),
                client_type: ClientType::Wholesale,
            })
            .await
            .unwrap();

        assert!(client.phone.is_none());
        assert_eq!(client.client_type.price_tier(), PriceTier::Wholesale);

        let found = repo.search(company.id, "perez", 10).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(repo.search(company.id, "", 10).await.unwrap().len(), 1);

        repo.set_active(company.id, client.id, false).await.unwrap();
        assert!(repo.search(company.id, "ana", 10).await.unwrap().is_empty());

        let mut conn = db.pool().acquire().await.unwrap();
        let err = fetch_active_client(&mut conn, company.id, client.id)
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ClientNotFound(_))));
    }
}

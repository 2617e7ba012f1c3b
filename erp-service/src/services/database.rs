//! SQLite access for single-table reads and writes.
//!
//! Anything that touches an association table lives in `relations`.

use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::FromRow;
use uuid::Uuid;

use super::error::ServiceError;
use crate::dtos::{Page, PaginationParams};
use crate::models::{
    normalize_email, Account, Client, Company, Organization, PersonType, Service, Tag, User,
};

/// SQLite database wrapper.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database wrapper from a connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Health check - ping the database.
    pub async fn health_check(&self) -> Result<(), ServiceError> {
        crate::db::health_check(&self.pool).await.map_err(|e| {
            tracing::error!("Database health check failed: {}", e);
            ServiceError::Database(e)
        })
    }

    /// One page of `table` ordered by creation time. `total` is the full row count.
    async fn paginate<T>(
        &self,
        table: &'static str,
        id_column: &'static str,
        params: PaginationParams,
    ) -> Result<Page<T>, ServiceError>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&self.pool)
            .await?;

        let items = sqlx::query_as::<_, T>(&format!(
            "SELECT * FROM {} ORDER BY created_at, {} LIMIT ? OFFSET ?",
            table, id_column
        ))
        .bind(params.limit)
        .bind(params.offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Page::new(items, total, params))
    }

    /// Rename rows of `table` in one transaction. If any id is absent nothing
    /// is written and every absent id is reported.
    async fn rename_rows<T>(
        &self,
        table: &'static str,
        id_column: &'static str,
        entity: &'static str,
        items: &[(Uuid, String)],
    ) -> Result<Vec<T>, ServiceError>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let now = Utc::now();
        let sql = format!(
            "UPDATE {} SET name = ?, updated_at = ? WHERE {} = ? RETURNING *",
            table, id_column
        );

        let mut tx = self.pool.begin().await?;
        let mut updated = Vec::with_capacity(items.len());
        let mut missing = Vec::new();

        for (id, name) in items {
            let row = sqlx::query_as::<_, T>(&sql)
                .bind(name)
                .bind(now)
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

            match row {
                Some(row) => updated.push(row),
                None => missing.push(*id),
            }
        }

        if !missing.is_empty() {
            tx.rollback().await?;
            return Err(ServiceError::missing(entity, missing));
        }

        tx.commit().await?;
        Ok(updated)
    }

    // ==================== Client Operations ====================

    pub async fn insert_client(&self, client: &Client) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO clients (client_id, name, email, phone, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(client.client_id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(client.created_at)
        .bind(client.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_client(&self, client_id: Uuid) -> Result<Option<Client>, ServiceError> {
        Ok(
            sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE client_id = ?")
                .bind(client_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn list_clients(&self, params: PaginationParams) -> Result<Page<Client>, ServiceError> {
        self.paginate("clients", "client_id", params).await
    }

    /// Patch a client. `None` fields keep their stored value.
    pub async fn update_client(
        &self,
        client_id: Uuid,
        name: Option<&str>,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<Option<Client>, ServiceError> {
        Ok(sqlx::query_as::<_, Client>(
            r#"
            UPDATE clients
            SET name = COALESCE(?, name),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                updated_at = ?
            WHERE client_id = ?
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(Utc::now())
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn companies_for_client(&self, client_id: Uuid) -> Result<Vec<Company>, ServiceError> {
        Ok(sqlx::query_as::<_, Company>(
            r#"
            SELECT c.* FROM companies c
            JOIN client_companies cc ON cc.rnc = c.rnc
            WHERE cc.client_id = ?
            ORDER BY c.name, c.rnc
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ==================== Company Operations ====================

    pub async fn find_company(&self, rnc: &str) -> Result<Option<Company>, ServiceError> {
        Ok(
            sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE rnc = ?")
                .bind(rnc)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn list_companies(
        &self,
        params: PaginationParams,
    ) -> Result<Page<Company>, ServiceError> {
        self.paginate("companies", "rnc", params).await
    }

    pub async fn update_company(
        &self,
        rnc: &str,
        name: Option<&str>,
        person_type: Option<PersonType>,
    ) -> Result<Option<Company>, ServiceError> {
        Ok(sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET name = COALESCE(?, name),
                person_type = COALESCE(?, person_type),
                updated_at = ?
            WHERE rnc = ?
            RETURNING *
            "#,
        )
        .bind(name)
        .bind(person_type.map(|p| p.as_str()))
        .bind(Utc::now())
        .bind(rnc)
        .fetch_optional(&self.pool)
        .await?)
    }

    pub async fn clients_for_company(&self, rnc: &str) -> Result<Vec<Client>, ServiceError> {
        Ok(sqlx::query_as::<_, Client>(
            r#"
            SELECT c.* FROM clients c
            JOIN client_companies cc ON cc.client_id = c.client_id
            WHERE cc.rnc = ?
            ORDER BY c.created_at, c.client_id
            "#,
        )
        .bind(rnc)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn account_for_company(&self, rnc: &str) -> Result<Option<Account>, ServiceError> {
        Ok(
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE rnc = ?")
                .bind(rnc)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    // ==================== Service Operations ====================

    pub async fn find_service(&self, service_id: Uuid) -> Result<Option<Service>, ServiceError> {
        Ok(
            sqlx::query_as::<_, Service>("SELECT * FROM services WHERE service_id = ?")
                .bind(service_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn list_services(
        &self,
        params: PaginationParams,
    ) -> Result<Page<Service>, ServiceError> {
        self.paginate("services", "service_id", params).await
    }

    pub async fn rename_services(
        &self,
        items: &[(Uuid, String)],
    ) -> Result<Vec<Service>, ServiceError> {
        self.rename_rows("services", "service_id", "Service", items)
            .await
    }

    pub async fn tags_for_service(&self, service_id: Uuid) -> Result<Vec<Tag>, ServiceError> {
        Ok(sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.* FROM tags t
            JOIN tag_services ts ON ts.tag_id = t.tag_id
            WHERE ts.service_id = ?
            ORDER BY t.name, t.tag_id
            "#,
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ==================== Tag Operations ====================

    /// Insert several tags at once; all or none are stored.
    pub async fn insert_tags(&self, tags: &[Tag]) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        for tag in tags {
            sqlx::query(
                "INSERT INTO tags (tag_id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
            )
            .bind(tag.tag_id)
            .bind(&tag.name)
            .bind(tag.created_at)
            .bind(tag.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn find_tag(&self, tag_id: Uuid) -> Result<Option<Tag>, ServiceError> {
        Ok(
            sqlx::query_as::<_, Tag>("SELECT * FROM tags WHERE tag_id = ?")
                .bind(tag_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn list_tags(&self, params: PaginationParams) -> Result<Page<Tag>, ServiceError> {
        self.paginate("tags", "tag_id", params).await
    }

    pub async fn rename_tags(&self, items: &[(Uuid, String)]) -> Result<Vec<Tag>, ServiceError> {
        self.rename_rows("tags", "tag_id", "Tag", items).await
    }

    pub async fn services_for_tag(&self, tag_id: Uuid) -> Result<Vec<Service>, ServiceError> {
        Ok(sqlx::query_as::<_, Service>(
            r#"
            SELECT s.* FROM services s
            JOIN tag_services ts ON ts.service_id = s.service_id
            WHERE ts.tag_id = ?
            ORDER BY s.name, s.service_id
            "#,
        )
        .bind(tag_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ==================== Account Operations ====================

    pub async fn find_account(&self, account_id: Uuid) -> Result<Option<Account>, ServiceError> {
        Ok(
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE account_id = ?")
                .bind(account_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn list_accounts(
        &self,
        params: PaginationParams,
    ) -> Result<Page<Account>, ServiceError> {
        self.paginate("accounts", "account_id", params).await
    }

    pub async fn services_for_account(
        &self,
        account_id: Uuid,
    ) -> Result<Vec<Service>, ServiceError> {
        Ok(sqlx::query_as::<_, Service>(
            r#"
            SELECT s.* FROM services s
            JOIN account_services a ON a.service_id = s.service_id
            WHERE a.account_id = ?
            ORDER BY s.name, s.service_id
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?)
    }

    // ==================== User Operations ====================

    /// Insert a user. A taken email is a `Conflict`.
    pub async fn insert_user(&self, user: &User) -> Result<(), ServiceError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_id, name, email, password_hash, active, role, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.active)
        .bind(&user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(ServiceError::conflict_on_unique("Email already registered"))?;
        Ok(())
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, ServiceError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
                .bind(normalize_email(email))
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    pub async fn set_user_active(&self, user_id: Uuid, active: bool) -> Result<bool, ServiceError> {
        let result = sqlx::query("UPDATE users SET active = ? WHERE user_id = ?")
            .bind(active)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    // ==================== Organization Operations ====================

    pub async fn find_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Option<Organization>, ServiceError> {
        Ok(sqlx::query_as::<_, Organization>(
            "SELECT * FROM organizations WHERE organization_id = ?",
        )
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    /// Organizations the user is a member of.
    pub async fn organizations_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Organization>, ServiceError> {
        Ok(sqlx::query_as::<_, Organization>(
            r#"
            SELECT o.* FROM organizations o
            JOIN organization_users ou ON ou.organization_id = o.organization_id
            WHERE ou.user_id = ?
            ORDER BY o.created_at, o.organization_id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    pub async fn is_member(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, ServiceError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM organization_users WHERE organization_id = ? AND user_id = ?",
        )
        .bind(organization_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}

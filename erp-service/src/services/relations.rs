//! Writes to the association tables.
//!
//! Every public operation runs in one transaction: referenced ids are checked
//! first, then rows are written, then the transaction commits. An error at any
//! step drops the transaction, which rolls it back.
//!
//! Duplicate links are handled per relation. Client-company links have set
//! semantics and re-linking is a no-op. Tag-service, account-service and
//! organization-user links reject duplicates with `Conflict`.

use chrono::Utc;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::{SqliteConnection, Transaction};
use std::collections::HashSet;
use uuid::Uuid;

use super::error::ServiceError;
use crate::models::{Account, Company, Organization, Service, User};

#[derive(Clone)]
pub struct Relations {
    pool: SqlitePool,
}

/// Drop repeated ids, keeping first-seen order.
fn dedup(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Ids from `ids` with no row in `table`.
async fn absent(
    conn: &mut SqliteConnection,
    table: &'static str,
    column: &'static str,
    ids: &[Uuid],
) -> Result<Vec<Uuid>, ServiceError> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?", table, column);
    let mut missing = Vec::new();

    for id in ids {
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(id)
            .fetch_one(&mut *conn)
            .await?;
        if count == 0 {
            missing.push(*id);
        }
    }

    Ok(missing)
}

async fn require_all(
    conn: &mut SqliteConnection,
    entity: &'static str,
    table: &'static str,
    column: &'static str,
    ids: &[Uuid],
) -> Result<(), ServiceError> {
    let missing = absent(conn, table, column, ids).await?;
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::missing(entity, missing))
    }
}

async fn company_exists(conn: &mut SqliteConnection, rnc: &str) -> Result<bool, ServiceError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM companies WHERE rnc = ?")
        .bind(rnc)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

async fn require_exists(
    conn: &mut SqliteConnection,
    entity: &'static str,
    table: &'static str,
    column: &'static str,
    id: Uuid,
) -> Result<(), ServiceError> {
    if absent(conn, table, column, &[id]).await?.is_empty() {
        Ok(())
    } else {
        Err(ServiceError::NotFound(entity))
    }
}

/// Delete the link rows that reference `key`, then the row itself.
/// Link tables name their foreign key column the same as the owning table.
async fn delete_with_links<K>(
    tx: &mut Transaction<'_, Sqlite>,
    entity: &'static str,
    table: &'static str,
    column: &'static str,
    key: K,
    link_tables: &[&'static str],
) -> Result<(), ServiceError>
where
    K: for<'q> sqlx::Encode<'q, Sqlite> + sqlx::Type<Sqlite> + Clone + Send + 'static,
{
    let mut unlinked = 0;
    for link_table in link_tables {
        unlinked += sqlx::query(&format!("DELETE FROM {} WHERE {} = ?", link_table, column))
            .bind(key.clone())
            .execute(&mut **tx)
            .await?
            .rows_affected();
    }

    let deleted = sqlx::query(&format!("DELETE FROM {} WHERE {} = ?", table, column))
        .bind(key)
        .execute(&mut **tx)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(ServiceError::NotFound(entity));
    }

    tracing::info!(entity, unlinked, "Deleted record and its links");
    Ok(())
}

impl Relations {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== Client <-> Company ====================

    /// Insert a company related to `client_ids`.
    pub async fn create_company(
        &self,
        company: &Company,
        client_ids: &[Uuid],
    ) -> Result<(), ServiceError> {
        let client_ids = dedup(client_ids);
        let mut tx = self.pool.begin().await?;

        require_all(&mut tx, "Client", "clients", "client_id", &client_ids).await?;

        sqlx::query(
            r#"
            INSERT INTO companies (rnc, name, person_type, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&company.rnc)
        .bind(&company.name)
        .bind(&company.person_type)
        .bind(company.created_at)
        .bind(company.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(ServiceError::conflict_on_unique("Company already exists"))?;

        for client_id in &client_ids {
            sqlx::query(
                "INSERT INTO client_companies (client_id, rnc, created_at) VALUES (?, ?, ?)",
            )
            .bind(client_id)
            .bind(&company.rnc)
            .bind(company.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(rnc = %company.rnc, related = client_ids.len(), "Company created");
        Ok(())
    }

    /// Relate clients to a company. Already related clients are skipped.
    /// Returns how many new links were written.
    pub async fn link_clients(&self, rnc: &str, client_ids: &[Uuid]) -> Result<u64, ServiceError> {
        let client_ids = dedup(client_ids);
        let mut tx = self.pool.begin().await?;

        if !company_exists(&mut tx, rnc).await? {
            return Err(ServiceError::NotFound("Company"));
        }
        require_all(&mut tx, "Client", "clients", "client_id", &client_ids).await?;

        let now = Utc::now();
        let mut linked = 0;
        for client_id in &client_ids {
            linked += sqlx::query(
                r#"
                INSERT INTO client_companies (client_id, rnc, created_at) VALUES (?, ?, ?)
                ON CONFLICT (client_id, rnc) DO NOTHING
                "#,
            )
            .bind(client_id)
            .bind(rnc)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(linked)
    }

    pub async fn unlink_client(&self, rnc: &str, client_id: Uuid) -> Result<(), ServiceError> {
        let removed = sqlx::query("DELETE FROM client_companies WHERE rnc = ? AND client_id = ?")
            .bind(rnc)
            .bind(client_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(ServiceError::NotFound("Client link"));
        }
        Ok(())
    }

    // ==================== Tag <-> Service ====================

    pub async fn create_service(
        &self,
        service: &Service,
        tag_ids: &[Uuid],
    ) -> Result<(), ServiceError> {
        let tag_ids = dedup(tag_ids);
        let mut tx = self.pool.begin().await?;

        require_all(&mut tx, "Tag", "tags", "tag_id", &tag_ids).await?;

        sqlx::query(
            "INSERT INTO services (service_id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(service.service_id)
        .bind(&service.name)
        .bind(service.created_at)
        .bind(service.updated_at)
        .execute(&mut *tx)
        .await?;

        for tag_id in &tag_ids {
            sqlx::query("INSERT INTO tag_services (tag_id, service_id, created_at) VALUES (?, ?, ?)")
                .bind(tag_id)
                .bind(service.service_id)
                .bind(service.created_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Attach tags to a service. Any missing tag or any tag already attached
    /// fails the whole request.
    pub async fn link_tags(&self, service_id: Uuid, tag_ids: &[Uuid]) -> Result<u64, ServiceError> {
        let tag_ids = dedup(tag_ids);
        let mut tx = self.pool.begin().await?;

        require_exists(&mut tx, "Service", "services", "service_id", service_id).await?;
        require_all(&mut tx, "Tag", "tags", "tag_id", &tag_ids).await?;

        let now = Utc::now();
        for tag_id in &tag_ids {
            sqlx::query("INSERT INTO tag_services (tag_id, service_id, created_at) VALUES (?, ?, ?)")
                .bind(tag_id)
                .bind(service_id)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(ServiceError::conflict_on_unique(
                    "Tag is already linked to this service",
                ))?;
        }

        tx.commit().await?;
        Ok(tag_ids.len() as u64)
    }

    pub async fn unlink_tag(&self, service_id: Uuid, tag_id: Uuid) -> Result<(), ServiceError> {
        let removed = sqlx::query("DELETE FROM tag_services WHERE service_id = ? AND tag_id = ?")
            .bind(service_id)
            .bind(tag_id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        if removed == 0 {
            return Err(ServiceError::NotFound("Tag link"));
        }
        Ok(())
    }

    // ==================== Account <-> Service ====================

    /// Open the company's account with an initial set of services.
    pub async fn create_account(
        &self,
        account: &Account,
        service_ids: &[Uuid],
    ) -> Result<(), ServiceError> {
        let service_ids = dedup(service_ids);
        let mut tx = self.pool.begin().await?;

        if !company_exists(&mut tx, &account.rnc).await? {
            return Err(ServiceError::NotFound("Company"));
        }

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE rnc = ?")
            .bind(&account.rnc)
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Err(ServiceError::Conflict(
                "Company already has an account".to_string(),
            ));
        }

        require_all(&mut tx, "Service", "services", "service_id", &service_ids).await?;

        sqlx::query(
            "INSERT INTO accounts (account_id, rnc, created_at, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind(account.account_id)
        .bind(&account.rnc)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(ServiceError::conflict_on_unique(
            "Company already has an account",
        ))?;

        for service_id in &service_ids {
            sqlx::query(
                "INSERT INTO account_services (account_id, service_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(account.account_id)
            .bind(service_id)
            .bind(account.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!(rnc = %account.rnc, services = service_ids.len(), "Account created");
        Ok(())
    }

    pub async fn link_services(
        &self,
        account_id: Uuid,
        service_ids: &[Uuid],
    ) -> Result<u64, ServiceError> {
        let service_ids = dedup(service_ids);
        let mut tx = self.pool.begin().await?;

        require_exists(&mut tx, "Account", "accounts", "account_id", account_id).await?;
        require_all(&mut tx, "Service", "services", "service_id", &service_ids).await?;

        let now = Utc::now();
        for service_id in &service_ids {
            sqlx::query(
                "INSERT INTO account_services (account_id, service_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(account_id)
            .bind(service_id)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(ServiceError::conflict_on_unique(
                "Service is already linked to this account",
            ))?;
        }

        tx.commit().await?;
        Ok(service_ids.len() as u64)
    }

    pub async fn unlink_service(&self, account_id: Uuid, service_id: Uuid) -> Result<(), ServiceError> {
        let removed =
            sqlx::query("DELETE FROM account_services WHERE account_id = ? AND service_id = ?")
                .bind(account_id)
                .bind(service_id)
                .execute(&self.pool)
                .await?
                .rows_affected();

        if removed == 0 {
            return Err(ServiceError::NotFound("Service link"));
        }
        Ok(())
    }

    // ==================== User <-> Organization ====================

    /// Insert an organization with `creator_id` as its first member.
    pub async fn create_organization(
        &self,
        organization: &Organization,
        creator_id: Uuid,
    ) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        if !absent(&mut tx, "users", "user_id", &[creator_id]).await?.is_empty() {
            return Err(ServiceError::UserNotFound);
        }

        sqlx::query("INSERT INTO organizations (organization_id, name, created_at) VALUES (?, ?, ?)")
            .bind(organization.organization_id)
            .bind(&organization.name)
            .bind(organization.created_at)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO organization_users (organization_id, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(organization.organization_id)
        .bind(creator_id)
        .bind(organization.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(organization_id = %organization.organization_id, "Organization created");
        Ok(())
    }

    /// Create a user and make it a member of the organization.
    pub async fn add_employee(&self, organization_id: Uuid, user: &User) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        require_exists(
            &mut tx,
            "Organization",
            "organizations",
            "organization_id",
            organization_id,
        )
        .await?;

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
        .execute(&mut *tx)
        .await
        .map_err(ServiceError::conflict_on_unique("Email already registered"))?;

        sqlx::query(
            "INSERT INTO organization_users (organization_id, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(organization_id)
        .bind(user.user_id)
        .bind(user.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(%organization_id, user_id = %user.user_id, "Employee added");
        Ok(())
    }

    /// Make an existing user a member. Re-adding a member is a `Conflict`.
    pub async fn add_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        require_exists(
            &mut tx,
            "Organization",
            "organizations",
            "organization_id",
            organization_id,
        )
        .await?;
        if !absent(&mut tx, "users", "user_id", &[user_id]).await?.is_empty() {
            return Err(ServiceError::UserNotFound);
        }

        sqlx::query(
            "INSERT INTO organization_users (organization_id, user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(organization_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await
        .map_err(ServiceError::conflict_on_unique(
            "User is already a member of this organization",
        ))?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn remove_member(&self, organization_id: Uuid, user_id: Uuid) -> Result<(), ServiceError> {
        let removed = sqlx::query(
            "DELETE FROM organization_users WHERE organization_id = ? AND user_id = ?",
        )
        .bind(organization_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if removed == 0 {
            return Err(ServiceError::NotFound("Membership"));
        }
        Ok(())
    }

    // ==================== Cascading deletes ====================

    pub async fn delete_client(&self, client_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        delete_with_links(
            &mut tx,
            "Client",
            "clients",
            "client_id",
            client_id,
            &["client_companies"],
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Delete a company, its client links, its account and the account's
    /// service links.
    pub async fn delete_company(&self, rnc: &str) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            DELETE FROM account_services
            WHERE account_id IN (SELECT account_id FROM accounts WHERE rnc = ?)
            "#,
        )
        .bind(rnc)
        .execute(&mut *tx)
        .await?;

        delete_with_links(
            &mut tx,
            "Company",
            "companies",
            "rnc",
            rnc.to_string(),
            &["client_companies", "accounts"],
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_service(&self, service_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        delete_with_links(
            &mut tx,
            "Service",
            "services",
            "service_id",
            service_id,
            &["tag_services", "account_services"],
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_tag(&self, tag_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        delete_with_links(&mut tx, "Tag", "tags", "tag_id", tag_id, &["tag_services"]).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_account(&self, account_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        delete_with_links(
            &mut tx,
            "Account",
            "accounts",
            "account_id",
            account_id,
            &["account_services"],
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_organization(&self, organization_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        delete_with_links(
            &mut tx,
            "Organization",
            "organizations",
            "organization_id",
            organization_id,
            &["organization_users"],
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_user(&self, user_id: Uuid) -> Result<(), ServiceError> {
        let mut tx = self.pool.begin().await?;
        match delete_with_links(
            &mut tx,
            "User",
            "users",
            "user_id",
            user_id,
            &["organization_users"],
        )
        .await
        {
            Err(ServiceError::NotFound(_)) => return Err(ServiceError::UserNotFound),
            other => other?,
        }
        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(dedup(&[a, b, a, b, a]), vec![a, b]);
        assert!(dedup(&[]).is_empty());
    }
}

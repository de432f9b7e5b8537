use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info, warn};

use super::RepositoryError;
use crate::auth::{
    Officer, OfficerAccount, OfficerDirectory, OfficerIdentity, Role, Session, SessionStore,
};
use crate::config::DatabaseConfig;
use crate::leaderboard::{OfficerTally, ProgressStats};
use crate::pagination::{Page, PageRequest};
use crate::regions::{Region, RegionCode, RegionQuery, RegionRepository, ROOT_CODE_MAX_LEN};
use crate::verification::{
    Coordinate, Decision, Idsbr, OperatingStatus, Ownership, VerificationRecord,
    VerificationStore, VerificationUpdate, WriteGate, WriteOutcome,
};

const SCHEMA: &str = include_str!("../../migrations/0001_schema.sql");

const RECORD_COLUMNS: &str = "idsbr, name, address, region_code, latitude, longitude, status, \
     is_verified, officer_name, officer_email, verified_at";

/// Store shared by every service instance and bulk job.
///
/// Each write runs in its own transaction with `statement_timeout` and
/// `lock_timeout` set locally, so a stalled writer releases its row lock
/// within a bounded interval. Dropping an uncommitted transaction (for example
/// when the client disconnects) rolls it back.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    statement_timeout: Duration,
}

impl PgStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, RepositoryError> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| RepositoryError::Unavailable("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(url)
            .await
            .map_err(|err| {
                warn!(error = %err, "failed to connect to database");
                RepositoryError::from(err)
            })?;

        info!(
            max_connections = config.max_connections,
            "database connection pool created"
        );
        Ok(Self::from_pool(pool, config.statement_timeout))
    }

    pub fn from_pool(pool: PgPool, statement_timeout: Duration) -> Self {
        Self {
            pool,
            statement_timeout,
        }
    }

    /// Create tables and indexes that do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), RepositoryError> {
        for statement in SCHEMA.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("database schema ensured");
        Ok(())
    }

    async fn begin_bounded(&self) -> Result<Transaction<'static, Postgres>, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        let millis = self.statement_timeout.as_millis();
        sqlx::query(&format!("SET LOCAL statement_timeout = {millis}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("SET LOCAL lock_timeout = {millis}"))
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut => RepositoryError::Timeout,
            sqlx::Error::Database(db) => match db.code().as_deref() {
                Some("23505") => RepositoryError::Conflict,
                Some("23503") => RepositoryError::MissingReference,
                // query_canceled (statement_timeout), lock_not_available (lock_timeout)
                Some("57014") | Some("55P03") => RepositoryError::Timeout,
                _ => RepositoryError::Unavailable(err.to_string()),
            },
            _ => RepositoryError::Unavailable(err.to_string()),
        }
    }
}

/// `%term%` for ILIKE with the term's own wildcards escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for ch in term.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn record_from_row(row: &PgRow) -> Result<VerificationRecord, sqlx::Error> {
    let latitude: Option<f64> = row.try_get("latitude")?;
    let longitude: Option<f64> = row.try_get("longitude")?;
    let status: Option<String> = row.try_get("status")?;
    let officer_name: Option<String> = row.try_get("officer_name")?;
    let officer_email: Option<String> = row.try_get("officer_email")?;
    let region_code: String = row.try_get("region_code")?;

    Ok(VerificationRecord {
        idsbr: Idsbr(row.try_get("idsbr")?),
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        region_code: RegionCode::new(region_code),
        coordinate: latitude
            .zip(longitude)
            .map(|(latitude, longitude)| Coordinate {
                latitude,
                longitude,
            }),
        status: status.map(OperatingStatus::from_stored),
        is_verified: row.try_get("is_verified")?,
        owner: officer_email.map(|email| OfficerIdentity {
            name: officer_name.unwrap_or_default(),
            email,
        }),
        verified_at: row.try_get("verified_at")?,
    })
}

fn region_from_row(row: &PgRow) -> Result<Region, sqlx::Error> {
    let code: String = row.try_get("code")?;
    Ok(Region {
        code: RegionCode::new(code),
        name: row.try_get("name")?,
        allow_new: row.try_get("allow_new")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<Session, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(Session {
        token: row.try_get("token")?,
        officer: Officer::new(
            OfficerIdentity {
                name: row.try_get("officer_name")?,
                email: row.try_get("officer_email")?,
            },
            Role::parse(&role),
        ),
        expires_at: row.try_get("expires_at")?,
    })
}

fn account_from_row(row: &PgRow) -> Result<OfficerAccount, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(OfficerAccount {
        identity: OfficerIdentity {
            name: row.try_get("name")?,
            email: row.try_get("email")?,
        },
        credential: row.try_get("credential")?,
        role: Role::parse(&role),
    })
}

#[async_trait]
impl RegionRepository for PgStore {
    async fn find_regions(&self, query: &RegionQuery) -> Result<Vec<Region>, RepositoryError> {
        let rows = match query {
            RegionQuery::Roots => {
                sqlx::query(
                    "SELECT code, name, allow_new FROM regions WHERE char_length(code) <= $1",
                )
                .bind(ROOT_CODE_MAX_LEN as i32)
                .fetch_all(&self.pool)
                .await?
            }
            RegionQuery::DescendantsOf(parent) => {
                sqlx::query(
                    "SELECT code, name, allow_new FROM regions \
                     WHERE left(code, char_length($1)) = $1 AND code <> $1",
                )
                .bind(parent.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            RegionQuery::PathTo(target) => {
                sqlx::query(
                    "SELECT code, name, allow_new FROM regions \
                     WHERE left($1, char_length(code)) = code",
                )
                .bind(target.as_str())
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter()
            .map(region_from_row)
            .collect::<Result<_, _>>()
            .map_err(RepositoryError::from)
    }

    async fn set_allow_new(
        &self,
        code: &RegionCode,
        allow: bool,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query("UPDATE regions SET allow_new = $1 WHERE code = $2")
            .bind(allow)
            .bind(code.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl VerificationStore for PgStore {
    async fn list_by_region(
        &self,
        region: &RegionCode,
        request: &PageRequest,
    ) -> Result<Page<VerificationRecord>, RepositoryError> {
        let pattern = like_pattern(request.search());

        let total: i64 = sqlx::query_scalar(
            r"SELECT COUNT(*) FROM business_locations
              WHERE region_code = $1 AND name ILIKE $2 ESCAPE '\'",
        )
        .bind(region.as_str())
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r"SELECT {RECORD_COLUMNS} FROM business_locations
              WHERE region_code = $1 AND name ILIKE $2 ESCAPE '\'
              ORDER BY is_verified ASC, lower(name) ASC, seq ASC
              LIMIT $3 OFFSET $4"
        );
        let rows = sqlx::query(&sql)
            .bind(region.as_str())
            .bind(&pattern)
            .bind(request.limit() as i64)
            .bind(request.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .iter()
            .map(record_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total.max(0) as u64, request))
    }

    async fn fetch(&self, idsbr: &Idsbr) -> Result<Option<VerificationRecord>, RepositoryError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM business_locations WHERE idsbr = $1");
        let row = sqlx::query(&sql)
            .bind(idsbr.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(record_from_row).transpose()?)
    }

    async fn count_verified_by(&self, email: &str) -> Result<u64, RepositoryError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM business_locations WHERE is_verified AND officer_email = $1",
        )
        .bind(email)
        .fetch_one(&self.pool)
        .await?;
        Ok(total.max(0) as u64)
    }

    async fn insert_discovered(
        &self,
        record: VerificationRecord,
    ) -> Result<VerificationRecord, RepositoryError> {
        let (officer_name, officer_email) = match &record.owner {
            Some(owner) => (Some(owner.name.as_str()), Some(owner.email.as_str())),
            None => (None, None),
        };

        sqlx::query(
            "INSERT INTO business_locations \
             (idsbr, name, address, region_code, latitude, longitude, status, \
              is_verified, officer_name, officer_email, verified_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(record.idsbr.as_str())
        .bind(&record.name)
        .bind(&record.address)
        .bind(record.region_code.as_str())
        .bind(record.coordinate.map(|c| c.latitude))
        .bind(record.coordinate.map(|c| c.longitude))
        .bind(record.status.as_ref().map(OperatingStatus::as_str))
        .bind(record.is_verified)
        .bind(officer_name)
        .bind(officer_email)
        .bind(record.verified_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn apply_write(
        &self,
        update: VerificationUpdate,
        gate: WriteGate,
    ) -> Result<WriteOutcome, RepositoryError> {
        let mut tx = self.begin_bounded().await?;

        let current = sqlx::query(
            "SELECT is_verified, officer_name, officer_email FROM business_locations \
             WHERE idsbr = $1 FOR UPDATE",
        )
        .bind(update.idsbr.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current) = current else {
            tx.rollback().await?;
            return Ok(WriteOutcome::NotFound);
        };

        let owner_email: Option<String> = current.try_get("officer_email")?;
        let owner_name: Option<String> = current.try_get("officer_name")?;
        let ownership = Ownership {
            is_verified: current.try_get("is_verified")?,
            owner: owner_email.map(|email| OfficerIdentity {
                name: owner_name.unwrap_or_default(),
                email,
            }),
        };

        let reason = match gate.evaluate(&ownership) {
            Decision::Reject(conflict) => {
                tx.rollback().await?;
                return Ok(WriteOutcome::Rejected(conflict));
            }
            Decision::Proceed(reason) => reason,
        };

        let sql = format!(
            "UPDATE business_locations SET \
               latitude = COALESCE($2, latitude), \
               longitude = COALESCE($3, longitude), \
               status = $4, \
               is_verified = TRUE, \
               officer_name = $5, \
               officer_email = $6, \
               verified_at = $7 \
             WHERE idsbr = $1 \
             RETURNING {RECORD_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(update.idsbr.as_str())
            .bind(update.coordinate.map(|c| c.latitude))
            .bind(update.coordinate.map(|c| c.longitude))
            .bind(update.status.as_str())
            .bind(&update.owner.name)
            .bind(&update.owner.email)
            .bind(update.verified_at)
            .fetch_one(&mut *tx)
            .await?;
        let record = record_from_row(&row)?;

        tx.commit().await?;
        Ok(WriteOutcome::Applied { record, reason })
    }

    async fn officer_tallies(
        &self,
        name_search: &str,
    ) -> Result<Vec<OfficerTally>, RepositoryError> {
        let rows = sqlx::query(
            r"SELECT officer_name, officer_email, COUNT(*) AS total
              FROM business_locations
              WHERE is_verified AND officer_name ILIKE $1 ESCAPE '\'
              GROUP BY officer_name, officer_email",
        )
        .bind(like_pattern(name_search))
        .fetch_all(&self.pool)
        .await?;

        let mut tallies = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: Option<String> = row.try_get("officer_name")?;
            let email: Option<String> = row.try_get("officer_email")?;
            let total: i64 = row.try_get("total")?;
            tallies.push(OfficerTally {
                name: name.unwrap_or_default(),
                email: email.unwrap_or_default(),
                total: total.max(0) as u64,
            });
        }
        Ok(tallies)
    }

    async fn progress(&self) -> Result<ProgressStats, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, COUNT(*) FILTER (WHERE is_verified) AS verified \
             FROM business_locations",
        )
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.try_get("total")?;
        let verified: i64 = row.try_get("verified")?;
        let (total, verified) = (total.max(0) as u64, verified.max(0) as u64);
        Ok(ProgressStats {
            total,
            verified,
            pending: total.saturating_sub(verified),
        })
    }

    async fn verified_records(&self) -> Result<Vec<VerificationRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM business_locations \
             WHERE is_verified ORDER BY verified_at DESC NULLS LAST, seq DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter()
            .map(record_from_row)
            .collect::<Result<_, _>>()
            .map_err(RepositoryError::from)
    }
}

#[async_trait]
impl OfficerDirectory for PgStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<OfficerAccount>, RepositoryError> {
        let row = sqlx::query("SELECT name, email, credential, role FROM officers WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(account_from_row).transpose()?)
    }

    async fn insert_account(&self, account: OfficerAccount) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO officers (name, email, credential, role) VALUES ($1, $2, $3, $4)")
            .bind(&account.identity.name)
            .bind(&account.identity.email)
            .bind(&account.credential)
            .bind(account.role.label())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn replace_account(&self, account: OfficerAccount) -> Result<(), RepositoryError> {
        let mut tx = self.begin_bounded().await?;
        sqlx::query("DELETE FROM officers WHERE email = $1")
            .bind(&account.identity.email)
            .execute(&mut *tx)
            .await?;
        sqlx::query("INSERT INTO officers (name, email, credential, role) VALUES ($1, $2, $3, $4)")
            .bind(&account.identity.name)
            .bind(&account.identity.email)
            .bind(&account.credential)
            .bind(account.role.label())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn save_session(&self, session: &Session) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO sessions (token, officer_name, officer_email, role, expires_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&session.token)
        .bind(&session.officer.identity.name)
        .bind(&session.officer.identity.email)
        .bind(session.officer.role.label())
        .bind(session.expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, RepositoryError> {
        let row = sqlx::query(
            "SELECT token, officer_name, officer_email, role, expires_at FROM sessions \
             WHERE token = $1 AND expires_at > $2",
        )
        .bind(token)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(session_from_row).transpose()?)
    }

    async fn delete_session(&self, token: &str) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(""), "%%");
        assert_eq!(like_pattern("warung"), "%warung%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn schema_creates_every_table() {
        for table in ["regions", "business_locations", "officers", "sessions"] {
            assert!(SCHEMA.contains(&format!("CREATE TABLE IF NOT EXISTS {table}")));
        }
        assert!(SCHEMA.contains("verified_has_owner"));
        assert!(SCHEMA.contains("REFERENCES regions (code)"));
    }
}

//! Shared file metadata and its repository.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::token::TokenLookup;
use crate::datetime;
use crate::db::DbPool;
use crate::{Result, ShareError};

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page size a listing may request.
pub const MAX_PAGE_SIZE: i64 = 100;

const COLUMNS: &str = "id, owner_id, stored_name, original_name, relative_path, size_bytes,
     mime_type, download_token, password_hash, expires_at, created_at, updated_at";

/// Metadata of one shared file.
#[derive(Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: Uuid,
    /// Account that uploaded the file.
    pub owner_id: i64,
    /// Final path component on disk.
    pub stored_name: String,
    /// Filename as supplied by the uploader.
    pub original_name: String,
    /// Path relative to the storage root.
    pub relative_path: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub download_token: String,
    /// Argon2 PHC string, `None` when the file is not protected.
    pub password_hash: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    /// Whether a download password is set.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Whether the record is expired at `now`. The expiration instant itself
    /// counts as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the record is expired right now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(datetime::now())
    }
}

impl std::fmt::Debug for FileRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileRecord")
            .field("id", &self.id)
            .field("owner_id", &self.owner_id)
            .field("stored_name", &self.stored_name)
            .field("original_name", &self.original_name)
            .field("relative_path", &self.relative_path)
            .field("size_bytes", &self.size_bytes)
            .field("mime_type", &self.mime_type)
            .field("download_token", &self.download_token)
            .field("has_password", &self.has_password())
            .field("expires_at", &self.expires_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// Row as stored in SQLite.
#[derive(sqlx::FromRow)]
struct FileRow {
    id: String,
    owner_id: i64,
    stored_name: String,
    original_name: String,
    relative_path: String,
    size_bytes: i64,
    mime_type: String,
    download_token: String,
    password_hash: Option<String>,
    expires_at: String,
    created_at: String,
    updated_at: String,
}

impl TryFrom<FileRow> for FileRecord {
    type Error = ShareError;

    fn try_from(row: FileRow) -> Result<Self> {
        let id = Uuid::parse_str(&row.id)
            .map_err(|e| ShareError::Database(format!("invalid file id '{}': {e}", row.id)))?;
        Ok(Self {
            id,
            owner_id: row.owner_id,
            stored_name: row.stored_name,
            original_name: row.original_name,
            relative_path: row.relative_path,
            size_bytes: row.size_bytes,
            mime_type: row.mime_type,
            download_token: row.download_token,
            password_hash: row.password_hash,
            expires_at: datetime::from_db(&row.expires_at)?,
            created_at: datetime::from_db(&row.created_at)?,
            updated_at: datetime::from_db(&row.updated_at)?,
        })
    }
}

/// New file record for creation.
#[derive(Clone)]
pub struct NewFileRecord {
    pub id: Uuid,
    pub owner_id: i64,
    pub stored_name: String,
    pub original_name: String,
    pub relative_path: String,
    pub size_bytes: i64,
    pub mime_type: String,
    pub download_token: String,
    pub password_hash: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl NewFileRecord {
    fn into_record(self) -> FileRecord {
        FileRecord {
            id: self.id,
            owner_id: self.owner_id,
            stored_name: self.stored_name,
            original_name: self.original_name,
            relative_path: self.relative_path,
            size_bytes: self.size_bytes,
            mime_type: self.mime_type,
            download_token: self.download_token,
            password_hash: self.password_hash,
            expires_at: self.expires_at,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// Listing sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedAt,
    FileSize,
    OriginalName,
    ExpirationDate,
}

impl SortKey {
    /// Parse a client-facing property name.
    pub fn from_property(s: &str) -> Option<Self> {
        match s {
            "createdAt" => Some(SortKey::CreatedAt),
            "fileSize" => Some(SortKey::FileSize),
            "originalName" => Some(SortKey::OriginalName),
            "expirationDate" => Some(SortKey::ExpirationDate),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self {
            SortKey::CreatedAt => "created_at",
            SortKey::FileSize => "size_bytes",
            SortKey::OriginalName => "original_name",
            SortKey::ExpirationDate => "expires_at",
        }
    }
}

/// Listing sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Normalized listing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    /// Zero-based page index, never negative.
    pub page: i64,
    /// Page size in `[1, MAX_PAGE_SIZE]`.
    pub page_size: i64,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    pub include_expired: bool,
}

impl ListQuery {
    /// Build a query, clamping page and size and parsing a
    /// `property[,direction]` sort string.
    pub fn new(page: i64, page_size: i64, sort: Option<&str>, include_expired: bool) -> Self {
        let (sort_key, sort_direction) = sort.map(parse_sort).unwrap_or(DEFAULT_SORT);
        Self {
            page: page.max(0),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            sort_key,
            sort_direction,
            include_expired,
        }
    }

    fn offset(&self) -> i64 {
        self.page.saturating_mul(self.page_size)
    }
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE, None, true)
    }
}

const DEFAULT_SORT: (SortKey, SortDirection) = (SortKey::CreatedAt, SortDirection::Desc);

/// Parse `property[,direction]`.
///
/// Unknown properties fall back to newest first; a missing or unknown
/// direction means descending.
pub fn parse_sort(s: &str) -> (SortKey, SortDirection) {
    let mut parts = s.split(',').map(str::trim);
    let Some(key) = parts.next().and_then(SortKey::from_property) else {
        return DEFAULT_SORT;
    };
    let direction = match parts.next() {
        Some(d) if d.eq_ignore_ascii_case("asc") => SortDirection::Asc,
        _ => SortDirection::Desc,
    };
    (key, direction)
}

/// One page of an owner's files.
#[derive(Debug, Clone)]
pub struct FilePage {
    pub records: Vec<FileRecord>,
    pub total_count: i64,
    pub total_pages: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Repository for file metadata.
pub struct FileRecordRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRecordRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Insert a new record.
    ///
    /// Returns `Ok(None)` when the insert hit a uniqueness constraint
    /// (normally a download token taken since it was generated).
    pub async fn try_create(&self, new_record: &NewFileRecord) -> Result<Option<FileRecord>> {
        let created_at = datetime::to_db(&new_record.created_at);
        let result = sqlx::query(
            "INSERT INTO files (id, owner_id, stored_name, original_name, relative_path,
                                size_bytes, mime_type, download_token, password_hash,
                                expires_at, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(new_record.id.to_string())
        .bind(new_record.owner_id)
        .bind(&new_record.stored_name)
        .bind(&new_record.original_name)
        .bind(&new_record.relative_path)
        .bind(new_record.size_bytes)
        .bind(&new_record.mime_type)
        .bind(&new_record.download_token)
        .bind(&new_record.password_hash)
        .bind(datetime::to_db(&new_record.expires_at))
        .bind(&created_at)
        .bind(&created_at)
        .execute(self.pool)
        .await;

        match result {
            Ok(_) => Ok(Some(new_record.clone().into_record())),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Ok(None),
            Err(e) => Err(ShareError::Database(e.to_string())),
        }
    }

    /// Insert a new record, treating a uniqueness conflict as an error.
    pub async fn create(&self, new_record: &NewFileRecord) -> Result<FileRecord> {
        self.try_create(new_record).await?.ok_or_else(|| {
            ShareError::Database(format!(
                "duplicate download token for file {}",
                new_record.id
            ))
        })
    }

    /// Get a record by download token.
    pub async fn find_by_token(&self, token: &str) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM files WHERE download_token = ?");
        let row = sqlx::query_as::<_, FileRow>(&sql)
            .bind(token)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| ShareError::Database(e.to_string()))?;

        row.map(FileRecord::try_from).transpose()
    }

    /// Get a record by id regardless of owner.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM files WHERE id = ?");
        let row = sqlx::query_as::<_, FileRow>(&sql)
            .bind(id.to_string())
            .fetch_optional(self.pool)
            .await
            .map_err(|e| ShareError::Database(e.to_string()))?;

        row.map(FileRecord::try_from).transpose()
    }

    /// Get a record by id, only if `owner_id` owns it.
    pub async fn find_by_id_and_owner(&self, id: Uuid, owner_id: i64) -> Result<Option<FileRecord>> {
        let sql = format!("SELECT {COLUMNS} FROM files WHERE id = ? AND owner_id = ?");
        let row = sqlx::query_as::<_, FileRow>(&sql)
            .bind(id.to_string())
            .bind(owner_id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| ShareError::Database(e.to_string()))?;

        row.map(FileRecord::try_from).transpose()
    }

    /// Whether any record holds `token`.
    pub async fn exists_by_token(&self, token: &str) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM files WHERE download_token = ?)")
                .bind(token)
                .fetch_one(self.pool)
                .await
                .map_err(|e| ShareError::Database(e.to_string()))?;
        Ok(exists)
    }

    /// Delete a record by id.
    ///
    /// Returns true if a row was removed.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id.to_string())
            .execute(self.pool)
            .await
            .map_err(|e| ShareError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Page through an owner's records.
    ///
    /// `now` decides which records count as expired when
    /// `query.include_expired` is false.
    pub async fn list_by_owner(
        &self,
        owner_id: i64,
        query: &ListQuery,
        now: DateTime<Utc>,
    ) -> Result<FilePage> {
        let filter = if query.include_expired {
            "owner_id = ?"
        } else {
            "owner_id = ? AND expires_at > ?"
        };
        let now = datetime::to_db(&now);

        let count_sql = format!("SELECT COUNT(*) FROM files WHERE {filter}");
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql).bind(owner_id);
        if !query.include_expired {
            count_query = count_query.bind(&now);
        }
        let total_count = count_query
            .fetch_one(self.pool)
            .await
            .map_err(|e| ShareError::Database(e.to_string()))?;

        // Secondary order on id keeps pages stable when the sort column ties.
        let direction = query.sort_direction.as_sql();
        let list_sql = format!(
            "SELECT {COLUMNS} FROM files WHERE {filter}
             ORDER BY {} {direction}, id {direction}
             LIMIT ? OFFSET ?",
            query.sort_key.column()
        );
        let mut list_query = sqlx::query_as::<_, FileRow>(&list_sql).bind(owner_id);
        if !query.include_expired {
            list_query = list_query.bind(&now);
        }
        let rows = list_query
            .bind(query.page_size)
            .bind(query.offset())
            .fetch_all(self.pool)
            .await
            .map_err(|e| ShareError::Database(e.to_string()))?;

        let records = rows
            .into_iter()
            .map(FileRecord::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(FilePage {
            records,
            total_count,
            total_pages: (total_count + query.page_size - 1) / query.page_size,
            page: query.page,
            page_size: query.page_size,
        })
    }
}

impl TokenLookup for FileRecordRepository<'_> {
    async fn token_exists(&self, token: &str) -> Result<bool> {
        self.exists_by_token(token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::Duration;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn new_record(owner_id: i64, name: &str, size: i64, expires_in: Duration) -> NewFileRecord {
        let now = datetime::now();
        let id = Uuid::new_v4();
        NewFileRecord {
            id,
            owner_id,
            stored_name: format!("{id}_{name}"),
            original_name: name.to_string(),
            relative_path: format!("{owner_id}/2024/01/01/{id}_{name}"),
            size_bytes: size,
            mime_type: "text/plain".to_string(),
            download_token: Uuid::new_v4().to_string(),
            password_hash: None,
            expires_at: now + expires_in,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());

        let new = new_record(1, "a.txt", 10, Duration::days(3));
        let created = repo.create(&new).await.unwrap();
        assert_eq!(created.id, new.id);
        assert_eq!(created.updated_at, created.created_at);

        let by_token = repo.find_by_token(&new.download_token).await.unwrap().unwrap();
        assert_eq!(by_token, created);

        let by_id = repo.find_by_id(new.id).await.unwrap().unwrap();
        assert_eq!(by_id, created);

        assert!(repo.find_by_id_and_owner(new.id, 1).await.unwrap().is_some());
        assert!(repo.find_by_id_and_owner(new.id, 2).await.unwrap().is_none());
        assert!(repo.find_by_token("missing").await.unwrap().is_none());
        assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_password_hash_round_trip() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());

        let mut new = new_record(1, "p.txt", 1, Duration::days(1));
        new.password_hash = Some("$argon2id$v=19$stub".to_string());
        repo.create(&new).await.unwrap();

        let found = repo.find_by_token(&new.download_token).await.unwrap().unwrap();
        assert!(found.has_password());
        assert!(!format!("{found:?}").contains("argon2id"));
    }

    #[tokio::test]
    async fn test_duplicate_token_is_reported() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());

        let first = new_record(1, "a.txt", 1, Duration::days(1));
        repo.create(&first).await.unwrap();

        let mut second = new_record(2, "b.txt", 1, Duration::days(1));
        second.download_token = first.download_token.clone();
        assert!(repo.try_create(&second).await.unwrap().is_none());
        assert!(matches!(
            repo.create(&second).await,
            Err(ShareError::Database(_))
        ));
        assert!(repo.find_by_id(second.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_token_lookup() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        let new = new_record(1, "a.txt", 1, Duration::days(1));
        repo.create(&new).await.unwrap();

        assert!(repo.token_exists(&new.download_token).await.unwrap());
        assert!(!repo.token_exists("other").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        let new = new_record(1, "a.txt", 1, Duration::days(1));
        repo.create(&new).await.unwrap();

        assert!(repo.delete(new.id).await.unwrap());
        assert!(!repo.delete(new.id).await.unwrap());
        assert!(repo.find_by_id(new.id).await.unwrap().is_none());
    }

    #[test]
    fn test_expiry_boundary() {
        let now = datetime::now();
        let mut record = new_record(1, "a.txt", 1, Duration::days(1)).into_record();

        record.expires_at = now;
        assert!(record.is_expired_at(now));
        record.expires_at = now + Duration::microseconds(1);
        assert!(!record.is_expired_at(now));
        record.expires_at = now - Duration::seconds(1);
        assert!(record.is_expired_at(now));
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!(parse_sort("fileSize,asc"), (SortKey::FileSize, SortDirection::Asc));
        assert_eq!(parse_sort("originalName,DESC"), (SortKey::OriginalName, SortDirection::Desc));
        assert_eq!(parse_sort("expirationDate"), (SortKey::ExpirationDate, SortDirection::Desc));
        assert_eq!(parse_sort("createdAt,sideways"), (SortKey::CreatedAt, SortDirection::Desc));
        assert_eq!(parse_sort("password_hash,asc"), DEFAULT_SORT);
        assert_eq!(parse_sort(""), DEFAULT_SORT);
    }

    #[test]
    fn test_list_query_clamps() {
        let q = ListQuery::new(-3, 0, None, false);
        assert_eq!(q.page, 0);
        assert_eq!(q.page_size, 1);

        let q = ListQuery::new(2, 1000, Some("fileSize,asc"), true);
        assert_eq!(q.page, 2);
        assert_eq!(q.page_size, MAX_PAGE_SIZE);
        assert_eq!(q.sort_key, SortKey::FileSize);

        let q = ListQuery::default();
        assert_eq!(q.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!((q.sort_key, q.sort_direction), DEFAULT_SORT);
        assert!(q.include_expired);
    }

    #[tokio::test]
    async fn test_list_by_owner_pages_and_sorts() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());

        for (name, size) in [("b.txt", 30), ("a.txt", 10), ("c.txt", 20)] {
            repo.create(&new_record(1, name, size, Duration::days(2)))
                .await
                .unwrap();
        }
        repo.create(&new_record(2, "other.txt", 5, Duration::days(2)))
            .await
            .unwrap();

        let query = ListQuery::new(0, 2, Some("fileSize,asc"), true);
        let page = repo.list_by_owner(1, &query, datetime::now()).await.unwrap();
        assert_eq!(page.total_count, 3);
        assert_eq!(page.total_pages, 2);
        let sizes: Vec<i64> = page.records.iter().map(|r| r.size_bytes).collect();
        assert_eq!(sizes, vec![10, 20]);

        let query = ListQuery::new(1, 2, Some("fileSize,asc"), true);
        let page = repo.list_by_owner(1, &query, datetime::now()).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].size_bytes, 30);

        let query = ListQuery::new(0, 10, Some("originalName,desc"), true);
        let page = repo.list_by_owner(1, &query, datetime::now()).await.unwrap();
        let names: Vec<&str> = page.records.iter().map(|r| r.original_name.as_str()).collect();
        assert_eq!(names, vec!["c.txt", "b.txt", "a.txt"]);
    }

    #[tokio::test]
    async fn test_list_by_owner_excludes_expired() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());

        repo.create(&new_record(1, "live.txt", 1, Duration::days(1)))
            .await
            .unwrap();
        repo.create(&new_record(1, "dead.txt", 1, Duration::seconds(-1)))
            .await
            .unwrap();

        let all = repo
            .list_by_owner(1, &ListQuery::new(0, 20, None, true), datetime::now())
            .await
            .unwrap();
        assert_eq!(all.total_count, 2);

        let live = repo
            .list_by_owner(1, &ListQuery::new(0, 20, None, false), datetime::now())
            .await
            .unwrap();
        assert_eq!(live.total_count, 1);
        assert_eq!(live.records[0].original_name, "live.txt");
    }

    #[tokio::test]
    async fn test_list_empty() {
        let db = setup_db().await;
        let repo = FileRecordRepository::new(db.pool());
        let page = repo
            .list_by_owner(9, &ListQuery::default(), datetime::now())
            .await
            .unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.total_pages, 0);
    }
}

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::PgPool;
use std::collections::HashMap;
use tracing::debug;
use uuid::Uuid;

use cine_domain::catalog::{Movie, SeatInfo, SeatKind, ShowingInfo};
use cine_domain::error::BookingError;
use cine_domain::repository::{SeatDirectory, ShowingDirectory};

use crate::redis_repo::RedisClient;

/// Cache-aside reads for seat, room-layout and showing metadata.
///
/// Only immutable descriptive attributes live here; occupancy is always
/// answered by the relational store.
pub struct CatalogRepository {
    pool: PgPool,
    redis: RedisClient,
    seat_cache_seconds: u64,
    showing_cache_seconds: u64,
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct SeatRow {
    id: Uuid,
    room_id: Uuid,
    row_letter: String,
    seat_number: i32,
    kind: String,
}

#[derive(sqlx::FromRow)]
struct ShowingRow {
    id: Uuid,
    room_id: Uuid,
    movie_id: Uuid,
    starts_at: chrono::DateTime<chrono::Utc>,
    unit_price: bigdecimal::BigDecimal,
    language: String,
}

#[derive(sqlx::FromRow)]
struct MovieRow {
    id: Uuid,
    title: String,
    genre: String,
    duration_min: i32,
    rating: String,
    synopsis: Option<String>,
}

impl SeatRow {
    fn into_info(self) -> Result<SeatInfo, BookingError> {
        let kind = SeatKind::parse(&self.kind)
            .ok_or_else(|| BookingError::Infrastructure(anyhow!("unknown seat kind {}", self.kind)))?;
        Ok(SeatInfo {
            id: self.id,
            room_id: self.room_id,
            row_letter: self.row_letter,
            seat_number: self.seat_number,
            kind,
        })
    }
}

impl From<ShowingRow> for ShowingInfo {
    fn from(row: ShowingRow) -> Self {
        ShowingInfo {
            id: row.id,
            room_id: row.room_id,
            movie_id: row.movie_id,
            starts_at: row.starts_at,
            unit_price: row.unit_price,
            language: row.language,
        }
    }
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        Movie {
            id: row.id,
            title: row.title,
            genre: row.genre,
            duration_min: row.duration_min,
            rating: row.rating,
            synopsis: row.synopsis,
        }
    }
}

fn seat_cache_key(id: Uuid) -> String {
    format!("seat:{}", id)
}

fn showing_cache_key(id: Uuid) -> String {
    format!("showing:{}", id)
}

fn room_seats_cache_key(room_id: Uuid) -> String {
    format!("room:{}:seats", room_id)
}

impl CatalogRepository {
    pub fn new(
        pool: PgPool,
        redis: RedisClient,
        seat_cache_seconds: u64,
        showing_cache_seconds: u64,
    ) -> Self {
        Self {
            pool,
            redis,
            seat_cache_seconds,
            showing_cache_seconds,
        }
    }

    /// Cache probe that degrades to a miss on any redis failure.
    async fn cached_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let cached = self.redis.cache_get(key).await.ok().flatten()?;
        serde_json::from_str(&cached).ok()
    }

    async fn populate_cache<T: serde::Serialize>(&self, key: &str, value: &T, ttl: u64) {
        if let Ok(payload) = serde_json::to_string(value) {
            // Cache writes are best-effort; the next read re-seeds on miss
            let _ = self.redis.cache_set_ex(key, &payload, ttl).await;
        }
    }

    /// Full seat layout of a room, ordered by row then number.
    pub async fn room_seats(&self, room_id: Uuid) -> Result<Vec<SeatInfo>, BookingError> {
        let key = room_seats_cache_key(room_id);
        if let Some(seats) = self.cached_json::<Vec<SeatInfo>>(&key).await {
            debug!(%room_id, "cache hit: room layout");
            return Ok(seats);
        }

        debug!(%room_id, "cache miss: loading room layout from database");
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT id, room_id, row_letter, seat_number, kind FROM seats \
             WHERE room_id = $1 ORDER BY row_letter, seat_number",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BookingError::Infrastructure(e.into()))?;

        let seats = rows
            .into_iter()
            .map(SeatRow::into_info)
            .collect::<Result<Vec<_>, _>>()?;

        self.populate_cache(&key, &seats, self.seat_cache_seconds).await;
        Ok(seats)
    }

    pub async fn list_showings(&self) -> Result<Vec<ShowingInfo>, BookingError> {
        let rows = sqlx::query_as::<_, ShowingRow>(
            "SELECT id, room_id, movie_id, starts_at, unit_price, language \
             FROM showings ORDER BY starts_at",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BookingError::Infrastructure(e.into()))?;

        Ok(rows.into_iter().map(ShowingInfo::from).collect())
    }

    pub async fn list_movies(&self) -> Result<Vec<Movie>, BookingError> {
        let rows = sqlx::query_as::<_, MovieRow>(
            "SELECT id, title, genre, duration_min, rating, synopsis FROM movies ORDER BY title",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| BookingError::Infrastructure(e.into()))?;

        Ok(rows.into_iter().map(Movie::from).collect())
    }

    pub async fn get_movie(&self, id: Uuid) -> Result<Option<Movie>, BookingError> {
        let row = sqlx::query_as::<_, MovieRow>(
            "SELECT id, title, genre, duration_min, rating, synopsis FROM movies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookingError::Infrastructure(e.into()))?;

        Ok(row.map(Movie::from))
    }
}

#[async_trait]
impl SeatDirectory for CatalogRepository {
    async fn resolve_seats(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, SeatInfo>, BookingError> {
        // One MGET over the whole batch; any redis failure degrades to a
        // full miss
        let keys: Vec<String> = ids.iter().map(|&id| seat_cache_key(id)).collect();
        let cached = self
            .redis
            .cache_get_many(&keys)
            .await
            .unwrap_or_else(|_| vec![None; keys.len()]);

        let mut result = HashMap::with_capacity(ids.len());
        let mut missing: Vec<Uuid> = Vec::new();

        for (i, &id) in ids.iter().enumerate() {
            let hit = cached
                .get(i)
                .and_then(|v| v.as_deref())
                .and_then(|json| serde_json::from_str::<SeatInfo>(json).ok());
            match hit {
                Some(info) => {
                    result.insert(id, info);
                }
                None => missing.push(id),
            }
        }

        // One batch fetch for everything the cache did not have
        if !missing.is_empty() {
            debug!(count = missing.len(), "cache miss: loading seats from database");
            let rows = sqlx::query_as::<_, SeatRow>(
                "SELECT id, room_id, row_letter, seat_number, kind FROM seats WHERE id = ANY($1)",
            )
            .bind(&missing)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BookingError::Infrastructure(e.into()))?;

            for row in rows {
                let info = row.into_info()?;
                self.populate_cache(&seat_cache_key(info.id), &info, self.seat_cache_seconds)
                    .await;
                result.insert(info.id, info);
            }
        }

        Ok(result)
    }
}

#[async_trait]
impl ShowingDirectory for CatalogRepository {
    async fn resolve_showing(&self, id: Uuid) -> Result<ShowingInfo, BookingError> {
        let key = showing_cache_key(id);
        if let Some(info) = self.cached_json::<ShowingInfo>(&key).await {
            debug!(showing_id = %id, "cache hit: showing");
            return Ok(info);
        }

        debug!(showing_id = %id, "cache miss: loading showing from database");
        let row = sqlx::query_as::<_, ShowingRow>(
            "SELECT id, room_id, movie_id, starts_at, unit_price, language \
             FROM showings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| BookingError::Infrastructure(e.into()))?
        .ok_or(BookingError::ShowingNotFound(id))?;

        let info = ShowingInfo::from(row);
        self.populate_cache(&key, &info, self.showing_cache_seconds).await;
        Ok(info)
    }
}

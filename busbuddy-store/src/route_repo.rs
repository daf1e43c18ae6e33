use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use busbuddy_core::error::RepoError;
use busbuddy_core::pagination::PageQuery;
use busbuddy_core::repository::{RouteFilter, RouteRepository};
use busbuddy_core::route::{CreateRouteRequest, Route, RouteStatus, RouteUpdate, Stop};

use crate::database::map_db_err;

pub struct PgRouteRepository {
    pool: PgPool,
}

impl PgRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    route_name: String,
    origin: String,
    destination: String,
    distance_km: f64,
    estimated_duration_minutes: i32,
    stops: serde_json::Value,
    base_price: i64,
    status: String,
    popularity_score: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RouteRow {
    fn into_route(self) -> Result<Route, RepoError> {
        let status = RouteStatus::parse(&self.status)
            .ok_or_else(|| RepoError::Database(format!("invalid route status: {}", self.status)))?;
        let stops: Vec<Stop> = serde_json::from_value(self.stops)
            .map_err(|e| RepoError::Database(format!("corrupt stops payload: {}", e)))?;

        Ok(Route {
            id: self.id,
            route_name: self.route_name,
            origin: self.origin,
            destination: self.destination,
            distance_km: self.distance_km,
            estimated_duration_minutes: self.estimated_duration_minutes,
            stops,
            base_price: self.base_price,
            status,
            popularity_score: self.popularity_score,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const ROUTE_COLUMNS: &str = "id, route_name, origin, destination, distance_km, \
     estimated_duration_minutes, stops, base_price, status, popularity_score, \
     created_at, updated_at";

fn push_route_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RouteFilter) {
    if let Some(status) = &filter.status {
        builder.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(origin) = &filter.origin {
        builder
            .push(" AND origin ILIKE ")
            .push_bind(format!("%{}%", origin));
    }
    if let Some(destination) = &filter.destination {
        builder
            .push(" AND destination ILIKE ")
            .push_bind(format!("%{}%", destination));
    }
}

#[async_trait]
impl RouteRepository for PgRouteRepository {
    async fn create_route(&self, req: CreateRouteRequest) -> Result<Route, RepoError> {
        let stops = serde_json::to_value(&req.stops)
            .map_err(|e| RepoError::Database(format!("failed to encode stops: {}", e)))?;
        let status = req.status.as_deref().unwrap_or("active");
        let route_name = req.resolved_name();

        let sql = format!(
            "INSERT INTO routes (id, route_name, origin, destination, distance_km, \
             estimated_duration_minutes, stops, base_price, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {ROUTE_COLUMNS}"
        );

        let row: RouteRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(route_name)
            .bind(req.origin.trim())
            .bind(req.destination.trim())
            .bind(req.distance_km)
            .bind(req.estimated_duration_minutes)
            .bind(stops)
            .bind(req.base_price)
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.into_route()
    }

    async fn list_routes(
        &self,
        filter: RouteFilter,
        page: PageQuery,
    ) -> Result<(Vec<Route>, u64), RepoError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM routes WHERE 1=1");
        push_route_filter(&mut count_builder, &filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {ROUTE_COLUMNS} FROM routes WHERE 1=1"
        ));
        push_route_filter(&mut builder, &filter);
        builder
            .push(" ORDER BY popularity_score DESC, created_at DESC LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<RouteRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        let routes = rows
            .into_iter()
            .map(RouteRow::into_route)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((routes, total as u64))
    }

    async fn popular_routes(&self, limit: i64) -> Result<Vec<Route>, RepoError> {
        let sql = format!(
            "SELECT {ROUTE_COLUMNS} FROM routes WHERE status = 'active' \
             ORDER BY popularity_score DESC, created_at DESC LIMIT $1"
        );
        let rows: Vec<RouteRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        rows.into_iter().map(RouteRow::into_route).collect()
    }

    async fn find_matching_active(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Vec<Route>, RepoError> {
        let sql = format!(
            "SELECT {ROUTE_COLUMNS} FROM routes \
             WHERE status = 'active' AND origin ILIKE $1 AND destination ILIKE $2"
        );
        let rows: Vec<RouteRow> = sqlx::query_as(&sql)
            .bind(format!("%{}%", origin))
            .bind(format!("%{}%", destination))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        rows.into_iter().map(RouteRow::into_route).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Route>, RepoError> {
        let sql = format!("SELECT {ROUTE_COLUMNS} FROM routes WHERE id = $1");
        let row: Option<RouteRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(RouteRow::into_route).transpose()
    }

    async fn update_route(
        &self,
        id: Uuid,
        update: RouteUpdate,
    ) -> Result<Option<Route>, RepoError> {
        let stops = match &update.stops {
            Some(stops) => Some(
                serde_json::to_value(stops)
                    .map_err(|e| RepoError::Database(format!("failed to encode stops: {}", e)))?,
            ),
            None => None,
        };

        let sql = format!(
            "UPDATE routes SET \
             route_name = COALESCE($2, route_name), \
             origin = COALESCE($3, origin), \
             destination = COALESCE($4, destination), \
             distance_km = COALESCE($5, distance_km), \
             estimated_duration_minutes = COALESCE($6, estimated_duration_minutes), \
             stops = COALESCE($7, stops), \
             base_price = COALESCE($8, base_price), \
             status = COALESCE($9, status), \
             popularity_score = COALESCE($10, popularity_score), \
             updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {ROUTE_COLUMNS}"
        );

        let row: Option<RouteRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(update.route_name.as_deref().map(str::trim))
            .bind(update.origin.as_deref().map(str::trim))
            .bind(update.destination.as_deref().map(str::trim))
            .bind(update.distance_km)
            .bind(update.estimated_duration_minutes)
            .bind(stops)
            .bind(update.base_price)
            .bind(update.status)
            .bind(update.popularity_score)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(RouteRow::into_route).transpose()
    }

    async fn delete_route(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use busbuddy_core::bus::{Bus, BusStatus, BusType, BusUpdate, CreateBusRequest};
use busbuddy_core::error::RepoError;
use busbuddy_core::pagination::PageQuery;
use busbuddy_core::repository::{BusFilter, BusRepository};

use crate::database::map_db_err;

pub struct PgBusRepository {
    pool: PgPool,
}

impl PgBusRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BusRow {
    id: Uuid,
    bus_number: String,
    bus_name: String,
    bus_type: String,
    total_seats: i32,
    available_seats: i32,
    amenities: Vec<String>,
    operator_id: Uuid,
    route_id: Uuid,
    price_per_seat: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BusRow {
    fn into_bus(self) -> Result<Bus, RepoError> {
        let bus_type = BusType::parse(&self.bus_type)
            .ok_or_else(|| RepoError::Database(format!("invalid bus type: {}", self.bus_type)))?;
        let status = BusStatus::parse(&self.status)
            .ok_or_else(|| RepoError::Database(format!("invalid bus status: {}", self.status)))?;

        Ok(Bus {
            id: self.id,
            bus_number: self.bus_number,
            bus_name: self.bus_name,
            bus_type,
            total_seats: self.total_seats,
            available_seats: self.available_seats,
            amenities: self.amenities,
            operator_id: self.operator_id,
            route_id: self.route_id,
            price_per_seat: self.price_per_seat,
            status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const BUS_COLUMNS: &str = "id, bus_number, bus_name, bus_type, total_seats, available_seats, \
     amenities, operator_id, route_id, price_per_seat, status, created_at, updated_at";

fn push_bus_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BusFilter) {
    if let Some(status) = &filter.status {
        builder.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(bus_type) = &filter.bus_type {
        builder.push(" AND bus_type = ").push_bind(bus_type.clone());
    }
    if let Some(route_id) = filter.route_id {
        builder.push(" AND route_id = ").push_bind(route_id);
    }
}

#[async_trait]
impl BusRepository for PgBusRepository {
    async fn create_bus(
        &self,
        req: CreateBusRequest,
        operator_id: Uuid,
    ) -> Result<Bus, RepoError> {
        let status = req.status.as_deref().unwrap_or("active");

        // A new bus starts fully available.
        let sql = format!(
            "INSERT INTO buses (id, bus_number, bus_name, bus_type, total_seats, \
             available_seats, amenities, operator_id, route_id, price_per_seat, status) \
             VALUES ($1, $2, $3, $4, $5, $5, $6, $7, $8, $9, $10) \
             RETURNING {BUS_COLUMNS}"
        );

        let row: BusRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(req.bus_number.trim())
            .bind(req.bus_name.trim())
            .bind(&req.bus_type)
            .bind(req.total_seats)
            .bind(&req.amenities)
            .bind(operator_id)
            .bind(req.route_id)
            .bind(req.price_per_seat)
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.into_bus()
    }

    async fn list_buses(
        &self,
        filter: BusFilter,
        page: PageQuery,
    ) -> Result<(Vec<Bus>, u64), RepoError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM buses WHERE 1=1");
        push_bus_filter(&mut count_builder, &filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {BUS_COLUMNS} FROM buses WHERE 1=1"));
        push_bus_filter(&mut builder, &filter);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<BusRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        let buses = rows
            .into_iter()
            .map(BusRow::into_bus)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((buses, total as u64))
    }

    async fn search_by_routes(
        &self,
        route_ids: &[Uuid],
        min_available: i32,
    ) -> Result<Vec<Bus>, RepoError> {
        let sql = format!(
            "SELECT {BUS_COLUMNS} FROM buses \
             WHERE route_id = ANY($1) AND status = 'active' AND available_seats >= $2 \
             ORDER BY price_per_seat ASC"
        );
        let rows: Vec<BusRow> = sqlx::query_as(&sql)
            .bind(route_ids)
            .bind(min_available)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        rows.into_iter().map(BusRow::into_bus).collect()
    }

    async fn list_by_route(&self, route_id: Uuid) -> Result<Vec<Bus>, RepoError> {
        let sql = format!(
            "SELECT {BUS_COLUMNS} FROM buses \
             WHERE route_id = $1 AND status = 'active' \
             ORDER BY price_per_seat ASC"
        );
        let rows: Vec<BusRow> = sqlx::query_as(&sql)
            .bind(route_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        rows.into_iter().map(BusRow::into_bus).collect()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Bus>, RepoError> {
        let sql = format!("SELECT {BUS_COLUMNS} FROM buses WHERE id = $1");
        let row: Option<BusRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(BusRow::into_bus).transpose()
    }

    async fn update_bus(&self, id: Uuid, update: BusUpdate) -> Result<Option<Bus>, RepoError> {
        let sql = format!(
            "UPDATE buses SET \
             bus_name = COALESCE($2, bus_name), \
             bus_type = COALESCE($3, bus_type), \
             amenities = COALESCE($4, amenities), \
             route_id = COALESCE($5, route_id), \
             price_per_seat = COALESCE($6, price_per_seat), \
             status = COALESCE($7, status), \
             updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {BUS_COLUMNS}"
        );

        let row: Option<BusRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(update.bus_name.as_deref().map(str::trim))
            .bind(update.bus_type)
            .bind(update.amenities)
            .bind(update.route_id)
            .bind(update.price_per_seat)
            .bind(update.status)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(BusRow::into_bus).transpose()
    }

    async fn delete_bus(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM buses WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected() > 0)
    }
}

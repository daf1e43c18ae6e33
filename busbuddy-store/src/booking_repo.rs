use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use busbuddy_core::booking::{
    seat_conflicts, Booking, BookingStatus, BookingUpdate, Cancellation, ContactDetails,
    PassengerDetail, PaymentInfo, PaymentMethod, PaymentStatus, Pricing, RefundStatus,
};
use busbuddy_core::error::RepoError;
use busbuddy_core::pagination::PageQuery;
use busbuddy_core::repository::{BookingCreateError, BookingFilter, BookingRepository, NewBooking};

use crate::database::map_db_err;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    booking_ref: String,
    user_id: Uuid,
    bus_id: Uuid,
    route_id: Uuid,
    travel_date: NaiveDate,
    seat_numbers: Vec<String>,
    passenger_details: serde_json::Value,
    contact_phone: String,
    contact_email: String,
    base_price: i64,
    taxes: i64,
    discount: i64,
    total_amount: i64,
    payment_method: String,
    payment_status: String,
    payment_transaction_id: Option<String>,
    paid_at: Option<DateTime<Utc>>,
    status: String,
    special_requests: Vec<String>,
    boarding_point: Option<String>,
    dropping_point: Option<String>,
    cancelled_at: Option<DateTime<Utc>>,
    cancelled_by: Option<Uuid>,
    cancellation_reason: Option<String>,
    refund_amount: Option<i64>,
    refund_status: Option<String>,
    refund_processed_at: Option<DateTime<Utc>>,
    refund_processed_by: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, RepoError> {
        let passenger_details: Vec<PassengerDetail> =
            serde_json::from_value(self.passenger_details)
                .map_err(|e| RepoError::Database(format!("corrupt passenger payload: {}", e)))?;

        let payment_method = PaymentMethod::parse(&self.payment_method).ok_or_else(|| {
            RepoError::Database(format!("invalid payment method: {}", self.payment_method))
        })?;
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            RepoError::Database(format!("invalid payment status: {}", self.payment_status))
        })?;
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| RepoError::Database(format!("invalid booking status: {}", self.status)))?;

        // The cancellation sub-record exists only when all its mandatory
        // parts were written together.
        let cancellation = match (
            self.cancelled_at,
            self.cancelled_by,
            self.refund_amount,
            self.refund_status.as_deref().and_then(RefundStatus::parse),
        ) {
            (Some(cancelled_at), Some(cancelled_by), Some(refund_amount), Some(refund_status)) => {
                Some(Cancellation {
                    cancelled_at,
                    cancelled_by,
                    reason: self.cancellation_reason.unwrap_or_default(),
                    refund_amount,
                    refund_status,
                    processed_at: self.refund_processed_at,
                    processed_by: self.refund_processed_by,
                })
            }
            _ => None,
        };

        let mut pricing = Pricing {
            base_price: self.base_price,
            taxes: self.taxes,
            discount: self.discount,
            total_amount: 0,
        };
        // Never trust the stored total.
        pricing.recompute_total();

        Ok(Booking {
            id: self.id,
            booking_ref: self.booking_ref,
            user_id: self.user_id,
            bus_id: self.bus_id,
            route_id: self.route_id,
            travel_date: self.travel_date,
            seat_numbers: self.seat_numbers,
            passenger_details,
            contact_details: ContactDetails {
                phone: self.contact_phone,
                email: self.contact_email,
            },
            pricing,
            payment: PaymentInfo {
                method: payment_method,
                status: payment_status,
                transaction_id: self.payment_transaction_id,
                paid_at: self.paid_at,
            },
            status,
            special_requests: self.special_requests,
            boarding_point: self.boarding_point,
            dropping_point: self.dropping_point,
            cancellation,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const BOOKING_COLUMNS: &str = "id, booking_ref, user_id, bus_id, route_id, travel_date, \
     seat_numbers, passenger_details, contact_phone, contact_email, \
     base_price, taxes, discount, total_amount, \
     payment_method, payment_status, payment_transaction_id, paid_at, \
     status, special_requests, boarding_point, dropping_point, \
     cancelled_at, cancelled_by, cancellation_reason, \
     refund_amount, refund_status, refund_processed_at, refund_processed_by, \
     created_at, updated_at";

fn push_booking_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookingFilter) {
    if let Some(status) = &filter.status {
        builder.push(" AND status = ").push_bind(status.clone());
    }
    if let Some(bus_id) = filter.bus_id {
        builder.push(" AND bus_id = ").push_bind(bus_id);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ").push_bind(user_id);
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn taken_seats(
        &self,
        bus_id: Uuid,
        travel_date: NaiveDate,
    ) -> Result<Vec<String>, RepoError> {
        let seats: Vec<String> = sqlx::query_scalar(
            "SELECT UNNEST(seat_numbers) FROM bookings \
             WHERE bus_id = $1 AND travel_date = $2 AND status <> 'cancelled'",
        )
        .bind(bus_id)
        .bind(travel_date)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(seats)
    }

    async fn create_booking(&self, new: NewBooking) -> Result<Booking, BookingCreateError> {
        let seat_count = new.seat_numbers.len() as i32;
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        // Conditional decrement: the availability check and the write are
        // one statement, so a concurrent booking cannot slip between them.
        let decremented = sqlx::query(
            "UPDATE buses SET available_seats = available_seats - $1, updated_at = NOW() \
             WHERE id = $2 AND available_seats >= $1",
        )
        .bind(seat_count)
        .bind(new.bus_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        if decremented.rows_affected() == 0 {
            let exists: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM buses WHERE id = $1")
                .bind(new.bus_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_db_err)?;
            return Err(if exists == 0 {
                BookingCreateError::BusNotFound
            } else {
                BookingCreateError::InsufficientSeats
            });
        }

        // Seat-level conflict check, re-run inside the transaction while the
        // bus row is locked by the decrement above.
        let taken: Vec<String> = sqlx::query_scalar(
            "SELECT UNNEST(seat_numbers) FROM bookings \
             WHERE bus_id = $1 AND travel_date = $2 AND status <> 'cancelled'",
        )
        .bind(new.bus_id)
        .bind(new.travel_date)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_db_err)?;

        let conflicts = seat_conflicts(&new.seat_numbers, &taken);
        if !conflicts.is_empty() {
            // Dropping the transaction rolls back the decrement.
            return Err(BookingCreateError::SeatsTaken(conflicts));
        }

        let passenger_details = serde_json::to_value(&new.passenger_details)
            .map_err(|e| RepoError::Database(format!("failed to encode passengers: {}", e)))?;

        let sql = format!(
            "INSERT INTO bookings (id, booking_ref, user_id, bus_id, route_id, travel_date, \
             seat_numbers, passenger_details, contact_phone, contact_email, \
             base_price, taxes, discount, total_amount, payment_method, \
             special_requests, boarding_point, dropping_point) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18) \
             RETURNING {BOOKING_COLUMNS}"
        );

        let row: BookingRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(&new.booking_ref)
            .bind(new.user_id)
            .bind(new.bus_id)
            .bind(new.route_id)
            .bind(new.travel_date)
            .bind(&new.seat_numbers)
            .bind(passenger_details)
            .bind(&new.contact_details.phone)
            .bind(&new.contact_details.email)
            .bind(new.pricing.base_price)
            .bind(new.pricing.taxes)
            .bind(new.pricing.discount)
            .bind(new.pricing.total_amount)
            .bind(new.payment_method.as_str())
            .bind(&new.special_requests)
            .bind(&new.boarding_point)
            .bind(&new.dropping_point)
            .fetch_one(&mut *tx)
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;

        Ok(row.into_booking()?)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Booking>, RepoError> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn list_for_user(
        &self,
        user_id: Uuid,
        status: Option<String>,
        page: PageQuery,
    ) -> Result<(Vec<Booking>, u64), RepoError> {
        let filter = BookingFilter {
            status,
            bus_id: None,
            user_id: Some(user_id),
        };
        self.list_all(filter, page).await
    }

    async fn list_all(
        &self,
        filter: BookingFilter,
        page: PageQuery,
    ) -> Result<(Vec<Booking>, u64), RepoError> {
        let mut count_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT COUNT(*) FROM bookings WHERE 1=1");
        push_booking_filter(&mut count_builder, &filter);
        let total: i64 = count_builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)?;

        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE 1=1"));
        push_booking_filter(&mut builder, &filter);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(page.limit_i64())
            .push(" OFFSET ")
            .push_bind(page.offset());

        let rows: Vec<BookingRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        let bookings = rows
            .into_iter()
            .map(BookingRow::into_booking)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((bookings, total as u64))
    }

    async fn update_details(
        &self,
        id: Uuid,
        update: BookingUpdate,
    ) -> Result<Option<Booking>, RepoError> {
        let contact = update.contact_details.as_ref();

        let sql = format!(
            "UPDATE bookings SET \
             contact_phone = COALESCE($2, contact_phone), \
             contact_email = COALESCE($3, contact_email), \
             special_requests = COALESCE($4, special_requests), \
             boarding_point = COALESCE($5, boarding_point), \
             dropping_point = COALESCE($6, dropping_point), \
             updated_at = NOW() \
             WHERE id = $1 AND status <> 'completed' \
             RETURNING {BOOKING_COLUMNS}"
        );

        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(contact.map(|c| c.phone.clone()))
            .bind(contact.map(|c| c.email.clone()))
            .bind(update.special_requests)
            .bind(update.boarding_point)
            .bind(update.dropping_point)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn cancel_booking(
        &self,
        id: Uuid,
        cancellation: Cancellation,
    ) -> Result<Option<Booking>, RepoError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        // Status guard in the WHERE clause keeps a double-cancel from
        // crediting the seats twice.
        let sql = format!(
            "UPDATE bookings SET \
             status = 'cancelled', \
             cancelled_at = $2, cancelled_by = $3, cancellation_reason = $4, \
             refund_amount = $5, refund_status = $6, \
             updated_at = NOW() \
             WHERE id = $1 AND status <> 'cancelled' AND status <> 'completed' \
             RETURNING {BOOKING_COLUMNS}"
        );

        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(cancellation.cancelled_at)
            .bind(cancellation.cancelled_by)
            .bind(&cancellation.reason)
            .bind(cancellation.refund_amount)
            .bind(cancellation.refund_status.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(map_db_err)?;

        let Some(row) = row else {
            return Ok(None);
        };

        // Release the seats, clamped so restoration can never push the
        // count past capacity.
        sqlx::query(
            "UPDATE buses SET \
             available_seats = LEAST(total_seats, available_seats + $1), \
             updated_at = NOW() \
             WHERE id = $2",
        )
        .bind(row.seat_numbers.len() as i32)
        .bind(row.bus_id)
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;

        row.into_booking().map(Some)
    }

    async fn set_refund_decision(
        &self,
        id: Uuid,
        decision: RefundStatus,
        processed_by: Uuid,
        processed_at: DateTime<Utc>,
    ) -> Result<Option<Booking>, RepoError> {
        // A processed refund also flips the payment record to refunded.
        let sql = format!(
            "UPDATE bookings SET \
             refund_status = $2, \
             refund_processed_at = $3, refund_processed_by = $4, \
             payment_status = CASE WHEN $2 = 'processed' THEN 'refunded' ELSE payment_status END, \
             updated_at = NOW() \
             WHERE id = $1 AND status = 'cancelled' AND refund_status = 'pending' \
             RETURNING {BOOKING_COLUMNS}"
        );

        let row: Option<BookingRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(decision.as_str())
            .bind(processed_at)
            .bind(processed_by)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        row.map(BookingRow::into_booking).transpose()
    }
}

//! Database service for fieldbill-service.

use crate::models::{
    CreateCustomer, CreateEstimate, CreateInvoice, CreatePhoto, Customer, DocumentKind, Estimate,
    Invoice, LineItem, ListEstimatesFilter, ListInvoicesFilter, ListPhotosFilter, NewLineItem,
    Photo, RecordPayment, UpdateCustomer, UpdateEstimate, UpdateInvoice,
};
use crate::services::ledger;
use crate::services::metrics::{DB_QUERY_DURATION, DOCUMENTS_CREATED_TOTAL, PAYMENTS_RECORDED_TOTAL};
use chrono::{Days, Utc};
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::postgres::{PgConnection, PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};

const ESTIMATE_COLUMNS: &str = "id, customer_id, estimate_number, status, title, description, \
    subtotal, tax_rate, tax_amount, total, valid_until, notes, \
    created_at, updated_at, sent_at, approved_at";

const INVOICE_COLUMNS: &str = "id, customer_id, estimate_id, invoice_number, status, title, description, \
    subtotal, tax_rate, tax_amount, total, amount_paid, amount_due, \
    issue_date, due_date, paid_date, payment_reference, payment_method, notes, \
    created_at, updated_at, sent_at";

const LINE_ITEM_COLUMNS: &str =
    "id, estimate_id, invoice_id, item_type, description, quantity, unit_price, total, sort_order, created_at";

const PHOTO_COLUMNS: &str = "id, url, storage_key, filename, mime_type, file_size, caption, \
    customer_id, estimate_id, invoice_id, sort_order, created_at";

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "fieldbill-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Allocate the next sequential number for a document kind.
    ///
    /// The counter row is locked and bumped inside the caller's transaction,
    /// so concurrent creations serialize instead of duplicating numbers, and
    /// a rollback returns the number to the pool.
    async fn next_document_number(
        conn: &mut PgConnection,
        kind: DocumentKind,
    ) -> Result<String, AppError> {
        let value: i64 = sqlx::query_scalar(
            r#"
            UPDATE document_counters
            SET next_value = next_value + 1
            WHERE kind = $1
            RETURNING next_value - 1
            "#,
        )
        .bind(kind.as_str())
        .fetch_one(conn)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Failed to allocate {} number: {}",
                kind.as_str(),
                e
            ))
        })?;

        Ok(kind.format_number(value))
    }

    /// Insert a batch of line items for one parent document.
    ///
    /// `use_position` takes the sort order from the array position instead of
    /// the caller-supplied index (document creation semantics).
    async fn insert_line_items(
        conn: &mut PgConnection,
        estimate_id: Option<i64>,
        invoice_id: Option<i64>,
        line_items: &[NewLineItem],
        use_position: bool,
    ) -> Result<Vec<LineItem>, AppError> {
        let mut inserted = Vec::with_capacity(line_items.len());

        for (position, item) in line_items.iter().enumerate() {
            let sort_order = if use_position {
                position as i32
            } else {
                item.sort_order
            };

            let row = sqlx::query_as::<_, LineItem>(&format!(
                r#"
                INSERT INTO line_items (
                    estimate_id, invoice_id, item_type, description, quantity, unit_price, total, sort_order
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {LINE_ITEM_COLUMNS}
                "#,
            ))
            .bind(estimate_id)
            .bind(invoice_id)
            .bind(item.item_type.as_str())
            .bind(&item.description)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(item.total)
            .bind(sort_order)
            .fetch_one(&mut *conn)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert line item: {}", e))
            })?;

            inserted.push(row);
        }

        Ok(inserted)
    }

    // -------------------------------------------------------------------------
    // Customer Operations
    // -------------------------------------------------------------------------

    /// Create a new customer.
    #[instrument(skip(self, input))]
    pub async fn create_customer(&self, input: &CreateCustomer) -> Result<Customer, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_customer"])
            .start_timer();

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            INSERT INTO customers (name, email, phone, address, notes)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, email, phone, address, notes, created_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.notes)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create customer: {}", e)))?;

        timer.observe_duration();

        info!(customer_id = %customer.id, "Customer created");

        Ok(customer)
    }

    /// Get a customer by ID.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn get_customer(&self, customer_id: i64) -> Result<Option<Customer>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_customer"])
            .start_timer();

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone, address, notes, created_at
            FROM customers
            WHERE id = $1
            "#,
        )
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get customer: {}", e)))?;

        timer.observe_duration();

        Ok(customer)
    }

    /// List customers, newest first.
    #[instrument(skip(self))]
    pub async fn list_customers(&self) -> Result<Vec<Customer>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_customers"])
            .start_timer();

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, name, email, phone, address, notes, created_at
            FROM customers
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list customers: {}", e)))?;

        timer.observe_duration();

        Ok(customers)
    }

    /// Update a customer's contact fields.
    #[instrument(skip(self, input), fields(customer_id = %customer_id))]
    pub async fn update_customer(
        &self,
        customer_id: i64,
        input: &UpdateCustomer,
    ) -> Result<Option<Customer>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_customer"])
            .start_timer();

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            UPDATE customers
            SET name = $2,
                email = $3,
                phone = $4,
                address = $5,
                notes = $6
            WHERE id = $1
            RETURNING id, name, email, phone, address, notes, created_at
            "#,
        )
        .bind(customer_id)
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.notes)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update customer: {}", e)))?;

        timer.observe_duration();

        Ok(customer)
    }

    /// Delete a customer. Documents and photos referencing it cascade.
    #[instrument(skip(self), fields(customer_id = %customer_id))]
    pub async fn delete_customer(&self, customer_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_customer"])
            .start_timer();

        let result = sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(customer_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete customer: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(customer_id = %customer_id, "Customer deleted");
        }

        Ok(deleted)
    }

    async fn customer_exists(&self, customer_id: i64) -> Result<bool, AppError> {
        let id: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE id = $1")
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to look up customer: {}", e))
            })?;
        Ok(id.is_some())
    }

    // -------------------------------------------------------------------------
    // Estimate Operations
    // -------------------------------------------------------------------------

    /// Create a new draft estimate with its line items.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_estimate(
        &self,
        input: &CreateEstimate,
    ) -> Result<(Estimate, Vec<LineItem>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_estimate"])
            .start_timer();

        if !self.customer_exists(input.customer_id).await? {
            return Err(AppError::NotFound(anyhow::anyhow!("Customer not found")));
        }

        let tax_rate = input.tax_rate.unwrap_or(Decimal::ZERO);
        let totals = ledger::compute_totals(&input.line_items, tax_rate)?;

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let estimate_number =
            Self::next_document_number(&mut *tx, DocumentKind::Estimate).await?;

        let estimate = sqlx::query_as::<_, Estimate>(&format!(
            r#"
            INSERT INTO estimates (
                customer_id, estimate_number, title, description,
                subtotal, tax_rate, tax_amount, total, valid_until, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ESTIMATE_COLUMNS}
            "#,
        ))
        .bind(input.customer_id)
        .bind(&estimate_number)
        .bind(&input.title)
        .bind(&input.description)
        .bind(totals.subtotal)
        .bind(tax_rate)
        .bind(totals.tax_amount)
        .bind(totals.total)
        .bind(input.valid_until)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create estimate: {}", e)))?;

        let line_items =
            Self::insert_line_items(&mut *tx, Some(estimate.id), None, &input.line_items, true)
                .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit estimate: {}", e))
        })?;

        timer.observe_duration();
        DOCUMENTS_CREATED_TOTAL
            .with_label_values(&["estimate"])
            .inc();

        info!(
            estimate_id = %estimate.id,
            estimate_number = %estimate.estimate_number,
            "Estimate created"
        );

        Ok((estimate, line_items))
    }

    /// Get an estimate by ID.
    #[instrument(skip(self), fields(estimate_id = %estimate_id))]
    pub async fn get_estimate(&self, estimate_id: i64) -> Result<Option<Estimate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_estimate"])
            .start_timer();

        let estimate = sqlx::query_as::<_, Estimate>(&format!(
            "SELECT {ESTIMATE_COLUMNS} FROM estimates WHERE id = $1",
        ))
        .bind(estimate_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get estimate: {}", e)))?;

        timer.observe_duration();

        Ok(estimate)
    }

    /// List estimates, newest first, optionally filtered by customer and status.
    #[instrument(skip(self, filter))]
    pub async fn list_estimates(
        &self,
        filter: &ListEstimatesFilter,
    ) -> Result<Vec<Estimate>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_estimates"])
            .start_timer();

        let status_str = filter.status.map(|s| s.as_str().to_string());

        let estimates = sqlx::query_as::<_, Estimate>(&format!(
            r#"
            SELECT {ESTIMATE_COLUMNS}
            FROM estimates
            WHERE ($1::bigint IS NULL OR customer_id = $1)
              AND ($2::varchar IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        ))
        .bind(filter.customer_id)
        .bind(&status_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list estimates: {}", e)))?;

        timer.observe_duration();

        Ok(estimates)
    }

    /// Line items of an estimate, in display order.
    #[instrument(skip(self), fields(estimate_id = %estimate_id))]
    pub async fn estimate_line_items(&self, estimate_id: i64) -> Result<Vec<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["estimate_line_items"])
            .start_timer();

        let line_items = sqlx::query_as::<_, LineItem>(&format!(
            r#"
            SELECT {LINE_ITEM_COLUMNS}
            FROM line_items
            WHERE estimate_id = $1
            ORDER BY sort_order, id
            "#,
        ))
        .bind(estimate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        timer.observe_duration();

        Ok(line_items)
    }

    /// Update an estimate. Blocked once approved. A non-empty line item batch
    /// replaces the existing set and recomputes totals atomically.
    #[instrument(skip(self, input), fields(estimate_id = %estimate_id))]
    pub async fn update_estimate(
        &self,
        estimate_id: i64,
        input: &UpdateEstimate,
    ) -> Result<Option<(Estimate, Vec<LineItem>)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_estimate"])
            .start_timer();

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM estimates WHERE id = $1")
                .bind(estimate_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get estimate: {}", e))
                })?;

        match status.as_deref() {
            None => return Ok(None),
            Some("approved") => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Cannot update approved estimate"
                )))
            }
            Some(_) => {}
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query(
            r#"
            UPDATE estimates
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                valid_until = COALESCE($4, valid_until),
                notes = COALESCE($5, notes),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(estimate_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.valid_until)
        .bind(&input.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update estimate: {}", e)))?;

        if let Some(line_items) = input.line_items.as_deref().filter(|items| !items.is_empty()) {
            let tax_rate = input.tax_rate.unwrap_or(Decimal::ZERO);
            let totals = ledger::compute_totals(line_items, tax_rate)?;

            sqlx::query(
                r#"
                UPDATE estimates
                SET subtotal = $2,
                    tax_rate = $3,
                    tax_amount = $4,
                    total = $5,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(estimate_id)
            .bind(totals.subtotal)
            .bind(tax_rate)
            .bind(totals.tax_amount)
            .bind(totals.total)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update totals: {}", e))
            })?;

            sqlx::query("DELETE FROM line_items WHERE estimate_id = $1")
                .bind(estimate_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to delete line items: {}", e))
                })?;

            Self::insert_line_items(&mut *tx, Some(estimate_id), None, line_items, false).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit estimate update: {}", e))
        })?;

        timer.observe_duration();

        let estimate = self
            .get_estimate(estimate_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Estimate not found")))?;
        let line_items = self.estimate_line_items(estimate_id).await?;

        info!(estimate_id = %estimate_id, "Estimate updated");

        Ok(Some((estimate, line_items)))
    }

    /// Delete an estimate. Blocked once approved; line items cascade.
    #[instrument(skip(self), fields(estimate_id = %estimate_id))]
    pub async fn delete_estimate(&self, estimate_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_estimate"])
            .start_timer();

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM estimates WHERE id = $1")
                .bind(estimate_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get estimate: {}", e))
                })?;

        match status.as_deref() {
            None => return Ok(false),
            Some("approved") => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Cannot delete approved estimate"
                )))
            }
            Some(_) => {}
        }

        let result = sqlx::query("DELETE FROM estimates WHERE id = $1")
            .bind(estimate_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete estimate: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(estimate_id = %estimate_id, "Estimate deleted");
        }

        Ok(deleted)
    }

    /// Approve an estimate and materialize an invoice from it.
    ///
    /// Runs as one transaction: the estimate row is locked, marked approved,
    /// an invoice number is allocated, the invoice is inserted copying the
    /// estimate's amounts, and every line item is copied over. Any failure
    /// rolls the whole conversion back, so an approved estimate always has
    /// its invoice.
    #[instrument(skip(self), fields(estimate_id = %estimate_id))]
    pub async fn approve_estimate(
        &self,
        estimate_id: i64,
    ) -> Result<Option<(Estimate, Vec<LineItem>, i64)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["approve_estimate"])
            .start_timer();

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let existing = sqlx::query_as::<_, Estimate>(&format!(
            "SELECT {ESTIMATE_COLUMNS} FROM estimates WHERE id = $1 FOR UPDATE",
        ))
        .bind(estimate_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get estimate: {}", e)))?;

        let existing = match existing {
            Some(estimate) if estimate.is_approved() => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Estimate already approved"
                )))
            }
            Some(estimate) => estimate,
            None => return Ok(None),
        };

        let estimate = sqlx::query_as::<_, Estimate>(&format!(
            r#"
            UPDATE estimates
            SET status = 'approved', approved_at = NOW(), updated_at = NOW()
            WHERE id = $1
            RETURNING {ESTIMATE_COLUMNS}
            "#,
        ))
        .bind(estimate_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to approve estimate: {}", e)))?;

        let invoice_number = Self::next_document_number(&mut *tx, DocumentKind::Invoice).await?;

        let issue_date = Utc::now().date_naive();
        let due_date = issue_date + Days::new(30);

        let invoice_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (
                customer_id, estimate_id, invoice_number, title, description,
                subtotal, tax_rate, tax_amount, total, amount_due,
                issue_date, due_date, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10, $11, $12)
            RETURNING id
            "#,
        )
        .bind(existing.customer_id)
        .bind(estimate_id)
        .bind(&invoice_number)
        .bind(&existing.title)
        .bind(&existing.description)
        .bind(existing.subtotal)
        .bind(existing.tax_rate)
        .bind(existing.tax_amount)
        .bind(existing.total)
        .bind(issue_date)
        .bind(due_date)
        .bind(&existing.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO line_items (invoice_id, item_type, description, quantity, unit_price, total, sort_order)
            SELECT $2::bigint, item_type, description, quantity, unit_price, total, sort_order
            FROM line_items
            WHERE estimate_id = $1
            "#,
        )
        .bind(estimate_id)
        .bind(invoice_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to copy line items: {}", e)))?;

        let line_items = sqlx::query_as::<_, LineItem>(&format!(
            r#"
            SELECT {LINE_ITEM_COLUMNS}
            FROM line_items
            WHERE estimate_id = $1
            ORDER BY sort_order, id
            "#,
        ))
        .bind(estimate_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit approval: {}", e))
        })?;

        timer.observe_duration();
        DOCUMENTS_CREATED_TOTAL
            .with_label_values(&["invoice"])
            .inc();

        info!(
            estimate_id = %estimate_id,
            invoice_id = %invoice_id,
            invoice_number = %invoice_number,
            "Estimate approved and converted to invoice"
        );

        Ok(Some((estimate, line_items, invoice_id)))
    }

    // -------------------------------------------------------------------------
    // Invoice Operations
    // -------------------------------------------------------------------------

    /// Create a new draft invoice with its line items.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_invoice(
        &self,
        input: &CreateInvoice,
    ) -> Result<(Invoice, Vec<LineItem>), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invoice"])
            .start_timer();

        if !self.customer_exists(input.customer_id).await? {
            return Err(AppError::NotFound(anyhow::anyhow!("Customer not found")));
        }

        let tax_rate = input.tax_rate.unwrap_or(Decimal::ZERO);
        let totals = ledger::compute_totals(&input.line_items, tax_rate)?;

        let today = Utc::now().date_naive();
        let issue_date = input.issue_date.unwrap_or(today);
        let due_date = input.due_date.unwrap_or_else(|| today + Days::new(30));

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let invoice_number = Self::next_document_number(&mut *tx, DocumentKind::Invoice).await?;

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            INSERT INTO invoices (
                customer_id, estimate_id, invoice_number, title, description,
                subtotal, tax_rate, tax_amount, total, amount_due,
                issue_date, due_date, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $10, $11, $12)
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(input.customer_id)
        .bind(input.estimate_id)
        .bind(&invoice_number)
        .bind(&input.title)
        .bind(&input.description)
        .bind(totals.subtotal)
        .bind(tax_rate)
        .bind(totals.tax_amount)
        .bind(totals.total)
        .bind(issue_date)
        .bind(due_date)
        .bind(&input.notes)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create invoice: {}", e)))?;

        let line_items =
            Self::insert_line_items(&mut *tx, None, Some(invoice.id), &input.line_items, true)
                .await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit invoice: {}", e))
        })?;

        timer.observe_duration();
        DOCUMENTS_CREATED_TOTAL
            .with_label_values(&["invoice"])
            .inc();

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            "Invoice created"
        );

        Ok((invoice, line_items))
    }

    /// Get an invoice by ID.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn get_invoice(&self, invoice_id: i64) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1",
        ))
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    /// List invoices, newest first, optionally filtered by customer and status.
    #[instrument(skip(self, filter))]
    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let status_str = filter.status.map(|s| s.as_str().to_string());

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            SELECT {INVOICE_COLUMNS}
            FROM invoices
            WHERE ($1::bigint IS NULL OR customer_id = $1)
              AND ($2::varchar IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
        ))
        .bind(filter.customer_id)
        .bind(&status_str)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list invoices: {}", e)))?;

        timer.observe_duration();

        Ok(invoices)
    }

    /// Line items of an invoice, in display order.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn invoice_line_items(&self, invoice_id: i64) -> Result<Vec<LineItem>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["invoice_line_items"])
            .start_timer();

        let line_items = sqlx::query_as::<_, LineItem>(&format!(
            r#"
            SELECT {LINE_ITEM_COLUMNS}
            FROM line_items
            WHERE invoice_id = $1
            ORDER BY sort_order, id
            "#,
        ))
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get line items: {}", e)))?;

        timer.observe_duration();

        Ok(line_items)
    }

    /// Update an invoice. Blocked once paid. A non-empty line item batch
    /// replaces the existing set, recomputes totals, and resets the amount
    /// due to the new total. The amount already paid is left as-is.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id))]
    pub async fn update_invoice(
        &self,
        invoice_id: i64,
        input: &UpdateInvoice,
    ) -> Result<Option<(Invoice, Vec<LineItem>)>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_invoice"])
            .start_timer();

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM invoices WHERE id = $1")
                .bind(invoice_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e))
                })?;

        match status.as_deref() {
            None => return Ok(None),
            Some("paid") => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Cannot update paid invoice"
                )))
            }
            Some(_) => {}
        }

        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        sqlx::query(
            r#"
            UPDATE invoices
            SET title = COALESCE($2, title),
                description = COALESCE($3, description),
                due_date = COALESCE($4, due_date),
                notes = COALESCE($5, notes),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(invoice_id)
        .bind(&input.title)
        .bind(&input.description)
        .bind(input.due_date)
        .bind(&input.notes)
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update invoice: {}", e)))?;

        if let Some(line_items) = input.line_items.as_deref().filter(|items| !items.is_empty()) {
            let tax_rate = input.tax_rate.unwrap_or(Decimal::ZERO);
            let totals = ledger::compute_totals(line_items, tax_rate)?;

            sqlx::query(
                r#"
                UPDATE invoices
                SET subtotal = $2,
                    tax_rate = $3,
                    tax_amount = $4,
                    total = $5,
                    amount_due = $5,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(invoice_id)
            .bind(totals.subtotal)
            .bind(tax_rate)
            .bind(totals.tax_amount)
            .bind(totals.total)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update totals: {}", e))
            })?;

            sqlx::query("DELETE FROM line_items WHERE invoice_id = $1")
                .bind(invoice_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to delete line items: {}", e))
                })?;

            Self::insert_line_items(&mut *tx, None, Some(invoice_id), line_items, false).await?;
        }

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit invoice update: {}", e))
        })?;

        timer.observe_duration();

        let invoice = self
            .get_invoice(invoice_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;
        let line_items = self.invoice_line_items(invoice_id).await?;

        info!(invoice_id = %invoice_id, "Invoice updated");

        Ok(Some((invoice, line_items)))
    }

    /// Delete an invoice. Blocked once paid; line items cascade.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn delete_invoice(&self, invoice_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_invoice"])
            .start_timer();

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM invoices WHERE id = $1")
                .bind(invoice_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e))
                })?;

        match status.as_deref() {
            None => return Ok(false),
            Some("paid") => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Cannot delete paid invoice"
                )))
            }
            Some(_) => {}
        }

        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(invoice_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete invoice: {}", e))
            })?;

        timer.observe_duration();

        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(invoice_id = %invoice_id, "Invoice deleted");
        }

        Ok(deleted)
    }

    /// Record a payment against an invoice.
    ///
    /// Accumulates into `amount_paid` in a single guarded statement so
    /// concurrent payments add up instead of clobbering each other. The
    /// invoice flips to `paid` (and `paid_date` is stamped) once the amount
    /// due reaches zero or below; a partial payment leaves it `sent`.
    #[instrument(skip(self, input), fields(invoice_id = %invoice_id))]
    pub async fn record_payment(
        &self,
        invoice_id: i64,
        input: &RecordPayment,
    ) -> Result<Option<Invoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["record_payment"])
            .start_timer();

        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM invoices WHERE id = $1")
                .bind(invoice_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to get invoice: {}", e))
                })?;

        match status.as_deref() {
            None => return Ok(None),
            Some("paid") => {
                return Err(AppError::Conflict(anyhow::anyhow!("Invoice already paid")))
            }
            Some(_) => {}
        }

        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            UPDATE invoices
            SET amount_paid = amount_paid + $2,
                amount_due = total - (amount_paid + $2),
                status = CASE WHEN total - (amount_paid + $2) <= 0 THEN 'paid' ELSE 'sent' END,
                paid_date = CASE WHEN total - (amount_paid + $2) <= 0 THEN NOW() ELSE NULL END,
                payment_method = $3,
                payment_reference = $4,
                updated_at = NOW()
            WHERE id = $1 AND status <> 'paid'
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice_id)
        .bind(input.amount)
        .bind(&input.payment_method)
        .bind(&input.payment_reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to record payment: {}", e)))?;

        // Lost the race against a concurrent payment that settled the invoice.
        let invoice = invoice
            .ok_or_else(|| AppError::Conflict(anyhow::anyhow!("Invoice already paid")))?;

        timer.observe_duration();
        PAYMENTS_RECORDED_TOTAL
            .with_label_values(&[input.payment_method.as_str()])
            .inc();

        info!(
            invoice_id = %invoice_id,
            amount = %input.amount,
            amount_due = %invoice.amount_due,
            status = %invoice.status,
            "Payment recorded"
        );

        Ok(Some(invoice))
    }

    // -------------------------------------------------------------------------
    // Photo Operations
    // -------------------------------------------------------------------------

    /// Persist an uploaded photo row.
    #[instrument(skip(self, input), fields(storage_key = %input.storage_key))]
    pub async fn create_photo(&self, input: &CreatePhoto) -> Result<Photo, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_photo"])
            .start_timer();

        let photo = sqlx::query_as::<_, Photo>(&format!(
            r#"
            INSERT INTO photos (
                url, storage_key, filename, mime_type, file_size, caption,
                customer_id, estimate_id, invoice_id, sort_order
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, 0)
            RETURNING {PHOTO_COLUMNS}
            "#,
        ))
        .bind(&input.url)
        .bind(&input.storage_key)
        .bind(&input.filename)
        .bind(&input.mime_type)
        .bind(input.file_size)
        .bind(&input.caption)
        .bind(input.customer_id)
        .bind(input.estimate_id)
        .bind(input.invoice_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to save photo: {}", e)))?;

        timer.observe_duration();

        info!(photo_id = %photo.id, "Photo saved");

        Ok(photo)
    }

    /// Get a photo by ID.
    #[instrument(skip(self), fields(photo_id = %photo_id))]
    pub async fn get_photo(&self, photo_id: i64) -> Result<Option<Photo>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["get_photo"])
            .start_timer();

        let photo = sqlx::query_as::<_, Photo>(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos WHERE id = $1",
        ))
        .bind(photo_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get photo: {}", e)))?;

        timer.observe_duration();

        Ok(photo)
    }

    /// List photos for one parent, in display order.
    #[instrument(skip(self, filter))]
    pub async fn list_photos(&self, filter: &ListPhotosFilter) -> Result<Vec<Photo>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_photos"])
            .start_timer();

        let photos = sqlx::query_as::<_, Photo>(&format!(
            r#"
            SELECT {PHOTO_COLUMNS}
            FROM photos
            WHERE ($1::bigint IS NULL OR customer_id = $1)
              AND ($2::bigint IS NULL OR estimate_id = $2)
              AND ($3::bigint IS NULL OR invoice_id = $3)
            ORDER BY sort_order ASC, created_at DESC
            "#,
        ))
        .bind(filter.customer_id)
        .bind(filter.estimate_id)
        .bind(filter.invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list photos: {}", e)))?;

        timer.observe_duration();

        Ok(photos)
    }

    /// Delete a photo row. The caller removes the blob first.
    #[instrument(skip(self), fields(photo_id = %photo_id))]
    pub async fn delete_photo(&self, photo_id: i64) -> Result<bool, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_photo"])
            .start_timer();

        let result = sqlx::query("DELETE FROM photos WHERE id = $1")
            .bind(photo_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to delete photo: {}", e)))?;

        timer.observe_duration();

        Ok(result.rows_affected() > 0)
    }
}

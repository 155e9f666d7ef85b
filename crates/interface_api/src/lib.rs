//! HTTP API Layer
//!
//! This crate provides the REST API for the fee ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for fees, payments, students and revenue
//! - **Middleware**: Authentication, tracing, audit logging
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::new(store, fee_types, students, clock, config);
//! axum::serve(listener, create_router(state)).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use core_kernel::Clock;
use domain_fees::{
    FeeService, FeeStore, FeeTypeCatalog, OverdueSweeper, PaymentRecorder, RevenueAggregator, StudentDirectory,
};

use crate::config::ApiConfig;
use crate::handlers::{fees, health, payments, revenue, students};
use crate::middleware::{audit_middleware, auth_middleware};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub fees: FeeService,
    pub payments: PaymentRecorder,
    pub revenue: RevenueAggregator,
    pub store: Arc<dyn FeeStore>,
    pub clock: Arc<dyn Clock>,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the ledger components over the given adapters
    pub fn new(
        store: Arc<dyn FeeStore>,
        fee_types: Arc<dyn FeeTypeCatalog>,
        students: Arc<dyn StudentDirectory>,
        clock: Arc<dyn Clock>,
        config: ApiConfig,
    ) -> Self {
        let ledger = config.ledger.clone();
        Self {
            fees: FeeService::new(store.clone(), fee_types, students, clock.clone(), ledger.clone()),
            payments: PaymentRecorder::new(store.clone(), clock.clone(), ledger),
            revenue: RevenueAggregator::new(store.clone(), clock.clone()),
            store,
            clock,
            config,
        }
    }

    /// A sweeper over the same store and clock
    pub fn overdue_sweeper(&self) -> OverdueSweeper {
        OverdueSweeper::new(self.store.clone(), self.clock.clone())
    }
}

/// Creates the main API router
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let fee_routes = Router::new()
        .route("/", get(fees::list_fees).post(fees::create_fee))
        .route("/bulk", post(fees::create_fees_bulk))
        .route(
            "/:id",
            get(fees::get_fee).put(fees::update_fee).delete(fees::delete_fee),
        )
        .route("/:id/cancel", post(fees::cancel_fee))
        .route("/:id/balance", get(fees::get_balance))
        .route(
            "/:id/schedules",
            get(fees::list_schedules)
                .post(fees::generate_schedule)
                .put(fees::regenerate_schedule),
        )
        .route("/:id/payments", get(fees::list_payments));

    let payment_routes = Router::new()
        .route("/", get(payments::list_payments).post(payments::record_payment))
        .route(
            "/:id",
            get(payments::get_payment)
                .put(payments::update_payment)
                .delete(payments::delete_payment),
        );

    let student_routes = Router::new()
        .route("/:id/fees", get(students::list_fees))
        .route("/:id/payments", get(students::list_payments))
        .route("/:id/summary", get(students::summary));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/fees", fee_routes)
        .nest("/payments", payment_routes)
        .nest("/students", student_routes)
        .route("/schedules/overdue", get(fees::list_overdue_schedules))
        .route("/revenue", get(revenue::get_revenue))
        .layer(axum_middleware::from_fn(audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

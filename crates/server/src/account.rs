//! Account API endpoints: the running totals of the caller.

use api_types::account::{AggregateReportView, AggregateView, TotalsView};
use axum::{Extension, Json, extract::State, http::StatusCode};
use engine::{AggregateReport, Totals, UserAggregate};

use crate::{Owner, ServerError, server::ServerState};

fn aggregate_view(aggregate: UserAggregate) -> AggregateView {
    AggregateView {
        user_id: aggregate.user_id,
        total_balance: aggregate.total_balance.to_string(),
        total_budget: aggregate.total_budget.to_string(),
        updated_at: aggregate.updated_at.fixed_offset(),
    }
}

fn totals_view(totals: Totals) -> TotalsView {
    TotalsView {
        total_balance: totals.total_balance.to_string(),
        total_budget: totals.total_budget.to_string(),
    }
}

fn report_view(report: AggregateReport) -> AggregateReportView {
    AggregateReportView {
        consistent: report.is_consistent(),
        user_id: report.user_id,
        stored: totals_view(report.stored),
        derived: totals_view(report.derived),
        entries: report.entries,
    }
}

pub async fn open(
    Extension(owner): Extension<Owner>,
    State(state): State<ServerState>,
) -> Result<(StatusCode, Json<AggregateView>), ServerError> {
    let aggregate = state.engine.open_account(&owner.0).await?;
    Ok((StatusCode::CREATED, Json(aggregate_view(aggregate))))
}

pub async fn aggregate(
    Extension(owner): Extension<Owner>,
    State(state): State<ServerState>,
) -> Result<Json<AggregateView>, ServerError> {
    let aggregate = state.engine.aggregate(&owner.0).await?;
    Ok(Json(aggregate_view(aggregate)))
}

/// Returns the report as it was before the correction.
pub async fn reconcile(
    Extension(owner): Extension<Owner>,
    State(state): State<ServerState>,
) -> Result<Json<AggregateReportView>, ServerError> {
    let report = state.engine.recompute_aggregate(&owner.0).await?;
    Ok(Json(report_view(report)))
}

pub async fn verify(
    Extension(owner): Extension<Owner>,
    State(state): State<ServerState>,
) -> Result<Json<AggregateReportView>, ServerError> {
    let report = state.engine.verify_aggregate(&owner.0).await?;
    Ok(Json(report_view(report)))
}

//! Transactions API endpoints

use api_types::transaction::{
    TransactionKind as ApiKind, TransactionList, TransactionListResponse, TransactionNew,
    TransactionUpdate, TransactionView,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{CreateEntryCmd, EntryKind, EntryListFilter, EntryPatch, LedgerEntry, Money};
use uuid::Uuid;

use crate::{Owner, ServerError, server::ServerState};

fn map_kind(kind: EntryKind) -> ApiKind {
    match kind {
        EntryKind::Income => ApiKind::Income,
        EntryKind::Expense => ApiKind::Expense,
        EntryKind::Budget => ApiKind::Budget,
    }
}

fn map_api_kind(kind: ApiKind) -> EntryKind {
    match kind {
        ApiKind::Income => EntryKind::Income,
        ApiKind::Expense => EntryKind::Expense,
        ApiKind::Budget => EntryKind::Budget,
    }
}

/// Parses `income,expense` style lists.
fn parse_kinds(raw: &str) -> Result<Vec<EntryKind>, ServerError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            EntryKind::try_from(s).map_err(|_| ServerError::Generic(format!("unknown kind: {s}")))
        })
        .collect()
}

fn view(entry: LedgerEntry) -> TransactionView {
    TransactionView {
        id: entry.id,
        kind: map_kind(entry.kind),
        amount: entry.amount.to_string(),
        title: entry.title,
        category: entry.category,
        description: entry.description,
        occurred_at: entry.occurred_at.fixed_offset(),
        version: entry.version,
        created_at: entry.created_at.fixed_offset(),
        updated_at: entry.updated_at.fixed_offset(),
    }
}

pub async fn create(
    Extension(owner): Extension<Owner>,
    State(state): State<ServerState>,
    Json(payload): Json<TransactionNew>,
) -> Result<(StatusCode, Json<TransactionView>), ServerError> {
    let amount: Money = payload.amount.parse()?;
    let occurred_at = payload
        .occurred_at
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    let mut cmd = CreateEntryCmd::new(
        owner.0,
        map_api_kind(payload.kind),
        amount,
        payload.title,
        occurred_at,
    );
    cmd.category = payload.category;
    cmd.description = payload.description;
    cmd.idempotency_key = payload.idempotency_key;

    let entry = state.engine.create_transaction(cmd).await?;
    Ok((StatusCode::CREATED, Json(view(entry))))
}

pub async fn list(
    Extension(owner): Extension<Owner>,
    State(state): State<ServerState>,
    Query(query): Query<TransactionList>,
) -> Result<Json<TransactionListResponse>, ServerError> {
    let kinds = query.kinds.as_deref().map(parse_kinds).transpose()?;
    let filter = EntryListFilter {
        kinds,
        from: query.from.map(|dt| dt.with_timezone(&Utc)),
        to: query.to.map(|dt| dt.with_timezone(&Utc)),
        page: query.page,
        limit: query.limit,
    };

    let page = state.engine.list_transactions(&owner.0, &filter).await?;
    Ok(Json(TransactionListResponse {
        transactions: page.entries.into_iter().map(view).collect(),
        page: page.page,
        limit: page.limit,
        total: page.total,
        total_pages: page.total_pages,
    }))
}

pub async fn get(
    Extension(owner): Extension<Owner>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let entry = state.engine.transaction(&owner.0, id).await?;
    Ok(Json(view(entry)))
}

pub async fn update(
    Extension(owner): Extension<Owner>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TransactionUpdate>,
) -> Result<Json<TransactionView>, ServerError> {
    let amount = payload
        .amount
        .as_deref()
        .map(str::parse::<Money>)
        .transpose()?;
    let patch = EntryPatch {
        amount,
        title: payload.title,
        category: payload.category,
        description: payload.description,
        occurred_at: payload.occurred_at.map(|dt| dt.with_timezone(&Utc)),
    };

    let mut cmd = engine::UpdateEntryCmd::new(owner.0, id).patch(patch);
    if let Some(version) = payload.expected_version {
        cmd = cmd.expected_version(version);
    }

    let entry = state.engine.update_transaction(cmd).await?;
    Ok(Json(view(entry)))
}

/// Returns the deleted entry.
pub async fn delete(
    Extension(owner): Extension<Owner>,
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, ServerError> {
    let entry = state.engine.delete_transaction(&owner.0, id).await?;
    Ok(Json(view(entry)))
}

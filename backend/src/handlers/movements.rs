//! HTTP handlers for the movement ledger

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use shared::{DateRange, MovementFilter, MovementType};

use crate::error::{AppError, AppResult};
use crate::store::{InventoryStore, MovementEntry};
use crate::AppState;

const MAX_LIMIT: u32 = 1000;

#[derive(Debug, Deserialize)]
pub struct MovementQuery {
    #[serde(rename = "type")]
    pub movement_type: Option<String>,
    pub part_code: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub limit: Option<u32>,
}

impl TryFrom<MovementQuery> for MovementFilter {
    type Error = AppError;

    fn try_from(query: MovementQuery) -> AppResult<Self> {
        let movement_type = query
            .movement_type
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(str::parse::<MovementType>)
            .transpose()?;

        if let (Some(start), Some(end)) = (query.start_date, query.end_date) {
            if start > end {
                return Err(AppError::validation("start_date", "start_date is after end_date"));
            }
        }

        Ok(MovementFilter {
            movement_type,
            part_code: query.part_code.filter(|c| !c.trim().is_empty()),
            created: DateRange {
                start: query.start_date,
                end: query.end_date,
            },
            limit: Some(query.limit.unwrap_or(MAX_LIMIT).min(MAX_LIMIT)),
        })
    }
}

/// Movement history, newest first
pub async fn list_movements<S: InventoryStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<MovementQuery>,
) -> AppResult<Json<Vec<MovementEntry>>> {
    let filter = MovementFilter::try_from(query)?;
    let movements = state.ledger().list(&filter).await?;
    Ok(Json(movements))
}

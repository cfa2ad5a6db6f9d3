//! Fixtures shared by the integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use partstock_backend::store::MemoryStore;
use partstock_backend::{AppState, Config};
use shared::{DocumentInput, DocumentStatus, NewLineItem, NewPart, OperationContext, Part};

pub fn state() -> AppState<MemoryStore> {
    AppState::new(MemoryStore::new(), Config::default())
}

pub fn ctx() -> OperationContext {
    OperationContext::now(Uuid::new_v4())
}

/// Context pinned to a fixed instant
pub fn ctx_at(y: i32, m: u32, d: u32, h: u32) -> OperationContext {
    OperationContext::new(Uuid::new_v4(), instant(y, m, d, h))
}

pub fn instant(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub async fn seed_part(state: &AppState<MemoryStore>, code: &str, stock: i32) -> Part {
    state
        .parts()
        .create(
            NewPart {
                code: code.to_string(),
                name: format!("Part {code}"),
                stock,
                attributes: shared::PartAttributes::default(),
                is_active: true,
            },
            Utc::now(),
        )
        .await
        .unwrap()
}

pub fn items(lines: &[(&Part, i32)]) -> Vec<NewLineItem> {
    lines
        .iter()
        .map(|(part, qty)| NewLineItem::new(part.id, *qty))
        .collect()
}

pub fn outgoing(status: DocumentStatus, lines: &[(&Part, i32)]) -> DocumentInput {
    DocumentInput::new(status, items(lines))
}

pub fn receiving(number: &str, status: DocumentStatus, lines: &[(&Part, i32)]) -> DocumentInput {
    DocumentInput::new(status, items(lines)).with_number(number)
}

pub fn request(destination: &str, lines: &[(&Part, i32)]) -> DocumentInput {
    DocumentInput::new(DocumentStatus::Draft, items(lines)).with_destination(destination)
}

pub async fn stock_of(state: &AppState<MemoryStore>, part: &Part) -> i32 {
    state.parts().get(part.id).await.unwrap().stock
}

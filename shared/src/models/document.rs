//! Document models shared by receivings, outgoings and requests

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DocumentRef, MovementType};
use crate::error::DomainError;

/// The three document kinds the lifecycle engine serves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Receiving,
    Outgoing,
    Request,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Receiving => "receiving",
            DocumentKind::Outgoing => "outgoing",
            DocumentKind::Request => "request",
        }
    }

    /// What the lifecycle engine is allowed to do with this kind
    pub fn capabilities(&self) -> DocumentCapabilities {
        match self {
            DocumentKind::Receiving => DocumentCapabilities {
                applies_stock: true,
                has_confirmation_flag: true,
                stock_sign: 1,
            },
            DocumentKind::Outgoing => DocumentCapabilities {
                applies_stock: true,
                has_confirmation_flag: true,
                stock_sign: -1,
            },
            DocumentKind::Request => DocumentCapabilities {
                applies_stock: false,
                has_confirmation_flag: false,
                stock_sign: 0,
            },
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "receiving" => Ok(DocumentKind::Receiving),
            "outgoing" => Ok(DocumentKind::Outgoing),
            "request" => Ok(DocumentKind::Request),
            other => Err(DomainError::validation(
                "kind",
                format!("unknown document kind '{other}'"),
            )),
        }
    }
}

/// Capability set that parameterises the lifecycle engine per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentCapabilities {
    /// Completing the document moves stock
    pub applies_stock: bool,
    /// The document carries a goods receipt/issue confirmation flag
    pub has_confirmation_flag: bool,
    /// +1 adds stock, -1 removes it, 0 never touches it
    pub stock_sign: i32,
}

impl DocumentCapabilities {
    pub fn movement_type(&self) -> Option<MovementType> {
        if !self.applies_stock {
            return None;
        }
        match self.stock_sign {
            s if s > 0 => Some(MovementType::In),
            s if s < 0 => Some(MovementType::Out),
            _ => None,
        }
    }
}

/// Document status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Completed,
    Cancelled,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "draft",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(DocumentStatus::Draft),
            "completed" => Ok(DocumentStatus::Completed),
            "cancelled" => Ok(DocumentStatus::Cancelled),
            other => Err(DomainError::validation(
                "status",
                format!("unknown status '{other}'"),
            )),
        }
    }
}

/// A receiving, outgoing or request with its line items
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Document {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub number: String,
    /// Who received, issued or requested the goods
    pub actor_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub status: DocumentStatus,
    /// Goods receipt (receivings) or goods issue (outgoings) confirmed
    pub confirmed: bool,
    pub notes: Option<String>,
    /// Where requested parts should be delivered (requests only)
    pub destination: Option<String>,
    pub items: Vec<LineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn reference(&self) -> DocumentRef {
        DocumentRef::new(self.kind, self.id)
    }

    pub fn capabilities(&self) -> DocumentCapabilities {
        self.kind.capabilities()
    }

    /// Completed documents of a stock-applying kind own ledger movements
    pub fn holds_movements(&self) -> bool {
        self.status == DocumentStatus::Completed && self.capabilities().applies_stock
    }
}

/// One part/quantity row of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LineItem {
    pub id: Uuid,
    pub document_id: Uuid,
    pub part_id: Uuid,
    pub qty: i32,
    pub is_urgent: bool,
    pub is_supplied: bool,
}

/// A line item as submitted by the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewLineItem {
    pub part_id: Uuid,
    pub qty: i32,
    #[serde(default)]
    pub is_urgent: bool,
    #[serde(default)]
    pub is_supplied: bool,
}

impl NewLineItem {
    pub fn new(part_id: Uuid, qty: i32) -> Self {
        Self {
            part_id,
            qty,
            is_urgent: false,
            is_supplied: false,
        }
    }
}

/// Header fields and items submitted for create or update
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentInput {
    /// Caller-supplied number; outgoings and requests are numbered
    /// automatically when absent
    pub number: Option<String>,
    /// Defaults to the operation time
    pub occurred_at: Option<DateTime<Utc>>,
    pub status: DocumentStatus,
    pub notes: Option<String>,
    pub destination: Option<String>,
    pub items: Vec<NewLineItem>,
}

impl DocumentInput {
    pub fn new(status: DocumentStatus, items: Vec<NewLineItem>) -> Self {
        Self {
            number: None,
            occurred_at: None,
            status,
            notes: None,
            destination: None,
            items,
        }
    }

    pub fn with_number(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }
}

/// A document header ready to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub kind: DocumentKind,
    pub number: String,
    pub actor_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub status: DocumentStatus,
    pub notes: Option<String>,
    pub destination: Option<String>,
}

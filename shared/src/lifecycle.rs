//! Document state machine
//!
//! ```text
//!            create            update/cancel
//!   (none) ─────────► draft ◄──────────────► completed
//!                       │                        │
//!                       └──── cancel ──► cancelled ◄┘
//! ```
//!
//! `confirmed` is orthogonal to the status and freezes items and status
//! once set. Every decision here is pure; the backend turns a
//! [`TransitionPlan`] into ledger calls inside one transaction.

use crate::error::{DomainError, DomainResult};
use crate::models::{Document, DocumentKind, DocumentStatus};

/// Ledger work a transition requires, executed in field order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionPlan {
    /// Undo every movement the document currently owns
    pub reverse_existing: bool,
    /// Record one movement per line item of the new item set
    pub apply_new: bool,
}

impl TransitionPlan {
    pub fn touches_stock(&self) -> bool {
        self.reverse_existing || self.apply_new
    }
}

/// Items and status may change only on unconfirmed, uncancelled documents
pub fn ensure_editable(document: &Document) -> DomainResult<()> {
    if document.confirmed || document.status == DocumentStatus::Cancelled {
        return Err(DomainError::NotEditable {
            kind: document.kind,
            status: document.status,
            confirmed: document.confirmed,
        });
    }
    Ok(())
}

pub fn plan_create(kind: DocumentKind, status: DocumentStatus) -> DomainResult<TransitionPlan> {
    if status == DocumentStatus::Cancelled {
        return Err(DomainError::validation(
            "status",
            "documents are created as draft or completed",
        ));
    }
    Ok(TransitionPlan {
        reverse_existing: false,
        apply_new: kind.capabilities().applies_stock && status == DocumentStatus::Completed,
    })
}

/// Completed to completed reverses and reapplies rather than diffing item
/// sets, so an edit can fail reversal even when its net effect is valid.
pub fn plan_update(document: &Document, new_status: DocumentStatus) -> DomainResult<TransitionPlan> {
    ensure_editable(document)?;
    let applies = document.capabilities().applies_stock;
    Ok(TransitionPlan {
        reverse_existing: applies && document.status == DocumentStatus::Completed,
        apply_new: applies && new_status == DocumentStatus::Completed,
    })
}

pub fn plan_cancel(document: &Document) -> DomainResult<TransitionPlan> {
    if document.status == DocumentStatus::Cancelled {
        return Err(DomainError::AlreadyCancelled {
            kind: document.kind,
        });
    }
    Ok(TransitionPlan {
        reverse_existing: document.holds_movements(),
        apply_new: false,
    })
}

/// Returns the flag value after the toggle
pub fn plan_toggle_confirmation(document: &Document) -> DomainResult<bool> {
    if !document.capabilities().has_confirmation_flag {
        return Err(DomainError::NoConfirmationFlag {
            kind: document.kind,
        });
    }
    if document.status == DocumentStatus::Cancelled {
        return Err(DomainError::NotEditable {
            kind: document.kind,
            status: document.status,
            confirmed: document.confirmed,
        });
    }
    Ok(!document.confirmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn document(kind: DocumentKind, status: DocumentStatus, confirmed: bool) -> Document {
        Document {
            id: Uuid::new_v4(),
            kind,
            number: "DOC-1".to_string(),
            actor_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            status,
            confirmed,
            notes: None,
            destination: None,
            items: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn completed_create_applies_stock_only_for_stock_kinds() {
        assert!(plan_create(DocumentKind::Outgoing, DocumentStatus::Completed).unwrap().apply_new);
        assert!(plan_create(DocumentKind::Receiving, DocumentStatus::Completed).unwrap().apply_new);
        assert!(!plan_create(DocumentKind::Request, DocumentStatus::Completed).unwrap().apply_new);
        assert!(!plan_create(DocumentKind::Outgoing, DocumentStatus::Draft).unwrap().apply_new);
    }

    #[test]
    fn cannot_create_cancelled() {
        assert!(plan_create(DocumentKind::Receiving, DocumentStatus::Cancelled).is_err());
    }

    #[test]
    fn update_matrix() {
        use DocumentStatus::*;
        let cases = [
            (Draft, Draft, false, false),
            (Draft, Completed, false, true),
            (Completed, Draft, true, false),
            (Completed, Completed, true, true),
            (Completed, Cancelled, true, false),
        ];
        for (from, to, reverse, apply) in cases {
            let plan = plan_update(&document(DocumentKind::Outgoing, from, false), to).unwrap();
            assert_eq!(plan.reverse_existing, reverse, "{from} -> {to}");
            assert_eq!(plan.apply_new, apply, "{from} -> {to}");
        }
    }

    #[test]
    fn request_updates_never_touch_stock() {
        let doc = document(DocumentKind::Request, DocumentStatus::Completed, false);
        let plan = plan_update(&doc, DocumentStatus::Completed).unwrap();
        assert!(!plan.touches_stock());
    }

    #[test]
    fn confirmed_or_cancelled_documents_are_frozen() {
        let confirmed = document(DocumentKind::Receiving, DocumentStatus::Completed, true);
        assert!(matches!(
            plan_update(&confirmed, DocumentStatus::Draft),
            Err(DomainError::NotEditable { confirmed: true, .. })
        ));

        let cancelled = document(DocumentKind::Outgoing, DocumentStatus::Cancelled, false);
        assert!(matches!(
            plan_update(&cancelled, DocumentStatus::Draft),
            Err(DomainError::NotEditable { .. })
        ));
    }

    #[test]
    fn cancel_reverses_only_completed_stock_documents() {
        let completed = document(DocumentKind::Outgoing, DocumentStatus::Completed, true);
        assert!(plan_cancel(&completed).unwrap().reverse_existing);

        let draft = document(DocumentKind::Outgoing, DocumentStatus::Draft, false);
        assert_eq!(plan_cancel(&draft).unwrap(), TransitionPlan::default());

        let request = document(DocumentKind::Request, DocumentStatus::Completed, false);
        assert!(!plan_cancel(&request).unwrap().reverse_existing);
    }

    #[test]
    fn cancelling_twice_is_rejected() {
        let cancelled = document(DocumentKind::Receiving, DocumentStatus::Cancelled, false);
        assert!(matches!(
            plan_cancel(&cancelled),
            Err(DomainError::AlreadyCancelled { .. })
        ));
    }

    #[test]
    fn toggling_confirmation() {
        let doc = document(DocumentKind::Outgoing, DocumentStatus::Draft, false);
        assert_eq!(plan_toggle_confirmation(&doc), Ok(true));

        let confirmed = document(DocumentKind::Outgoing, DocumentStatus::Completed, true);
        assert_eq!(plan_toggle_confirmation(&confirmed), Ok(false));

        let request = document(DocumentKind::Request, DocumentStatus::Draft, false);
        assert!(matches!(
            plan_toggle_confirmation(&request),
            Err(DomainError::NoConfirmationFlag { .. })
        ));

        let cancelled = document(DocumentKind::Receiving, DocumentStatus::Cancelled, false);
        assert!(plan_toggle_confirmation(&cancelled).is_err());
    }
}

//! Ownership split structures.
//!
//! Every work carries a [`SplitModel`] with up to three composition slots and
//! up to three production slots. A slot's payee is either a resolved payable
//! identity or a pending placeholder name, see [`Payee`].

use serde::{Deserialize, Serialize};

use crate::is_wallet_address;

/// A payee reference inside a split slot.
///
/// Stored as an internally tagged object, so a placeholder name can never be
/// mistaken for an identity string.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payee {
    /// A payable wallet identity.
    Resolved { identity: String },
    /// A named collaborator with no payable identity yet.
    Pending { name: String },
}

impl Payee {
    /// Create a resolved payee.
    pub fn resolved(identity: impl Into<String>) -> Self {
        Self::Resolved {
            identity: identity.into(),
        }
    }

    /// Create a pending placeholder.
    pub fn pending(name: impl Into<String>) -> Self {
        Self::Pending { name: name.into() }
    }

    /// Classify raw user input from an upload form.
    ///
    /// Wallet addresses become [`Payee::Resolved`] (lower-cased), any other
    /// non-empty text becomes a [`Payee::Pending`] placeholder. Blank input
    /// means "no payee".
    pub fn from_input(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if is_wallet_address(trimmed) {
            Some(Self::resolved(trimmed.to_ascii_lowercase()))
        } else {
            Some(Self::pending(trimmed))
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// True if this is a placeholder whose name equals `name` ignoring case.
    /// Names are compared as stored; surrounding whitespace is stripped when
    /// input is classified, not here.
    pub fn matches_pending(&self, name: &str) -> bool {
        match self {
            Self::Pending { name: own } => own.to_lowercase() == name.to_lowercase(),
            Self::Resolved { .. } => false,
        }
    }

    /// Display label: the identity or the placeholder name.
    pub fn label(&self) -> &str {
        match self {
            Self::Resolved { identity } => identity,
            Self::Pending { name } => name,
        }
    }
}

/// Which rights a slot represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SplitCategory {
    Composition,
    Production,
}

impl std::fmt::Display for SplitCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Composition => f.write_str("composition"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// One payee + percentage entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct SplitSlot {
    /// `None` for an empty slot.
    pub payee: Option<Payee>,
    /// Whole percent, 0-100.
    pub percentage: u8,
}

impl SplitSlot {
    pub fn new(payee: Payee, percentage: u8) -> Self {
        Self {
            payee: Some(payee),
            percentage,
        }
    }

    pub fn is_populated(&self) -> bool {
        self.payee.is_some()
    }
}

/// Canonical ownership record of a work.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct SplitModel {
    #[serde(default)]
    pub composition: Vec<SplitSlot>,
    #[serde(default)]
    pub production: Vec<SplitSlot>,
}

impl SplitModel {
    /// Slots of one category.
    pub fn slots(&self, category: SplitCategory) -> &[SplitSlot] {
        match category {
            SplitCategory::Composition => &self.composition,
            SplitCategory::Production => &self.production,
        }
    }

    /// All slots, composition first.
    pub fn iter_slots(&self) -> impl Iterator<Item = &SplitSlot> {
        self.composition.iter().chain(self.production.iter())
    }

    /// All slots, mutably.
    pub fn iter_slots_mut(&mut self) -> impl Iterator<Item = &mut SplitSlot> {
        self.composition.iter_mut().chain(self.production.iter_mut())
    }

    /// Whether any slot still points at a placeholder.
    pub fn has_pending(&self) -> bool {
        self.iter_slots()
            .any(|s| s.payee.as_ref().is_some_and(Payee::is_pending))
    }
}

/// Result of checking a split model, as reported to callers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct SplitValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

/// Money owed to one payee.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct PayeeShare {
    pub payee: Payee,
    /// Amount in micro-units.
    pub amount: u64,
    /// True while the payee is an unresolved placeholder; routing is deferred.
    pub pending: bool,
}

/// An unresolved payee name and the works that still reference it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ts_rs::TS)]
#[ts(export)]
pub struct PendingPlaceholder {
    /// Name as first spelled on the uploader's works.
    pub name: String,
    pub work_ids: Vec<crate::WorkId>,
    /// Slots referencing the name across those works.
    pub slot_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_input_classifies() {
        let addr =
            Payee::from_input(" 0xAB908400098527886e0f7030069857d2e4169ee7 ").expect("payee");
        assert_eq!(
            addr,
            Payee::resolved("0xab908400098527886e0f7030069857d2e4169ee7")
        );

        let name = Payee::from_input("Marcy Rae").expect("payee");
        assert_eq!(name, Payee::pending("Marcy Rae"));

        assert!(Payee::from_input("   ").is_none());
    }

    #[test]
    fn test_matches_pending_ignores_case() {
        let p = Payee::pending("Marcy Rae");
        assert!(p.matches_pending("marcy rae"));
        assert!(p.matches_pending("MARCY RAE"));
        assert!(!p.matches_pending("Marcy"));
        assert!(!p.matches_pending("Marcy Rae "));
        assert_eq!(Payee::from_input("  Marcy Rae "), Some(p.clone()));
        assert!(!Payee::resolved("marcy rae").matches_pending("marcy rae"));
    }

    #[test]
    fn test_payee_serialization_is_tagged() {
        let json = serde_json::to_value(Payee::pending("0xdeadbeef")).expect("serialize");
        assert_eq!(json["kind"], "pending");
        assert_eq!(json["name"], "0xdeadbeef");

        let back: Payee = serde_json::from_value(json).expect("deserialize");
        assert!(back.is_pending());
    }

    #[test]
    fn test_has_pending() {
        let mut model = SplitModel {
            composition: vec![SplitSlot::new(Payee::resolved("0xa"), 100)],
            production: vec![],
        };
        assert!(!model.has_pending());
        model.production.push(SplitSlot::new(Payee::pending("Lou"), 100));
        assert!(model.has_pending());
    }
}

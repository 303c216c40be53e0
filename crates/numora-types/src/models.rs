use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{LedgerError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Status-like enums are stored as snake_case TEXT columns.
macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError { kind: $kind, value: other.to_string() }),
                }
            }
        }
    };
}

text_enum!(Role, "role", {
    Admin => "admin",
    User => "user",
});

text_enum!(TransactionKind, "transaction type", {
    Credit => "credit",
    RechargeDebit => "recharge_debit",
    Bonus => "bonus",
});

text_enum!(TransactionStatus, "transaction status", {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
});

text_enum!(SellerStatus, "seller status", {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

text_enum!(CodeStatus, "code status", {
    Pending => "pending",
    CanEnter => "can_enter",
    Approved => "approved",
});

text_enum!(RechargeStatus, "recharge status", {
    Pending => "pending",
    Completed => "completed",
    Rejected => "rejected",
});

impl TransactionKind {
    /// Direction of the balance change this kind of entry records.
    pub fn signed(&self, magnitude: Decimal) -> Decimal {
        match self {
            Self::Credit | Self::Bonus => magnitude,
            Self::RechargeDebit => -magnitude,
        }
    }
}

impl RechargeStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

// -- Users --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub full_name: String,
    pub balance: Decimal,
    pub referral_code: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Referral {
    pub id: String,
    pub referrer_id: String,
    pub referred_id: String,
    /// Display name of the referred user, if their profile still exists.
    pub referred_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

// -- Ledger --

/// One audit-trail entry. `amount` is always a positive magnitude; the
/// direction is implied by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub status: TransactionStatus,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    pub fn signed_amount(&self) -> Decimal {
        self.kind.signed(self.amount)
    }
}

// -- Seller submissions --

/// A phone number a user offers for resale.
///
/// Listing approval (`status`) and code verification (`code_status`) are two
/// independent phases; the second only opens once the first is approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerSubmission {
    pub id: String,
    pub user_id: String,
    pub phone_number: String,
    pub status: SellerStatus,
    pub code: Option<String>,
    pub code_status: CodeStatus,
    pub balance_added: Decimal,
    pub created_at: DateTime<Utc>,
}

impl SellerSubmission {
    pub fn approve(&mut self) -> Result<()> {
        self.require_listing_pending("approve")?;
        self.status = SellerStatus::Approved;
        Ok(())
    }

    pub fn reject(&mut self) -> Result<()> {
        self.require_listing_pending("reject")?;
        self.status = SellerStatus::Rejected;
        Ok(())
    }

    /// Let the seller enter their verification code.
    pub fn grant_code_entry(&mut self) -> Result<()> {
        if self.status != SellerStatus::Approved {
            return Err(self.invalid("grant code entry", "listing is not approved"));
        }
        if self.code_status != CodeStatus::Pending {
            return Err(self.invalid("grant code entry", "code phase is not pending"));
        }
        if self.code.is_some() {
            return Err(self.invalid("grant code entry", "a code was already submitted"));
        }
        self.code_status = CodeStatus::CanEnter;
        Ok(())
    }

    /// Seller-side: record the entered code and hand it back for review.
    pub fn submit_code(&mut self, code: &str) -> Result<()> {
        let code = code.trim();
        if code.is_empty() {
            return Err(LedgerError::validation("code is required"));
        }
        if self.status != SellerStatus::Approved || self.code_status != CodeStatus::CanEnter {
            return Err(self.invalid("submit code", "code entry was not granted"));
        }
        self.code = Some(code.to_string());
        self.code_status = CodeStatus::Pending;
        Ok(())
    }

    /// Mark the code verified and remember the credit it earned. The caller
    /// must post the matching ledger entry in the same unit of work.
    pub fn approve_code(&mut self, credit: Decimal) -> Result<()> {
        if self.status != SellerStatus::Approved
            || self.code_status != CodeStatus::Pending
            || self.code.is_none()
        {
            return Err(self.invalid("approve code", "no submitted code is awaiting review"));
        }
        self.balance_added = credit;
        self.code_status = CodeStatus::Approved;
        Ok(())
    }

    fn require_listing_pending(&self, action: &str) -> Result<()> {
        if self.status != SellerStatus::Pending {
            return Err(self.invalid(action, "listing already decided"));
        }
        Ok(())
    }

    fn invalid(&self, action: &str, reason: &str) -> LedgerError {
        LedgerError::InvalidStateTransition(format!(
            "cannot {} seller number {} (status={}, code_status={}): {}",
            action, self.id, self.status, self.code_status, reason
        ))
    }
}

// -- Recharge requests --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RechargeRequest {
    pub id: String,
    pub user_id: String,
    pub phone_number: String,
    pub amount: Decimal,
    pub status: RechargeStatus,
    pub created_at: DateTime<Utc>,
}

impl RechargeRequest {
    pub fn complete(&mut self) -> Result<()> {
        self.transition(RechargeStatus::Completed)
    }

    pub fn reject(&mut self) -> Result<()> {
        self.transition(RechargeStatus::Rejected)
    }

    fn transition(&mut self, next: RechargeStatus) -> Result<()> {
        if self.status.is_terminal() {
            return Err(LedgerError::InvalidStateTransition(format!(
                "recharge request {} is already {}",
                self.id, self.status
            )));
        }
        self.status = next;
        Ok(())
    }
}

// -- Offers --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    /// Higher is shown first.
    pub priority: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// -- Read-side bundles --

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDetail {
    pub profile: Profile,
    pub seller_numbers: Vec<SellerSubmission>,
    pub transactions: Vec<Transaction>,
    pub referrals: Vec<Referral>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelStats {
    pub users: u64,
    pub seller_numbers: u64,
    pub pending_recharges: u64,
}

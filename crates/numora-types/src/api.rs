use serde::{Deserialize, Serialize};

use crate::amount::AmountInput;

// -- JWT Claims --

/// Bearer token claims. Tokens are issued by the platform's sign-in flow;
/// the panel only verifies them and looks up the subject's role grants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

// -- Users --

#[derive(Debug, Default, Deserialize)]
pub struct UserSearchQuery {
    /// Matches full name or referral code, case-insensitive.
    pub q: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreditUserRequest {
    #[serde(default)]
    pub amount: AmountInput,
    pub description: Option<String>,
}

// -- Seller numbers --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApproveCodeRequest {
    #[serde(default)]
    pub credit_amount: AmountInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EditPhoneRequest {
    pub phone_number: String,
}

// -- Offers --

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateOfferRequest {
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleOfferRequest {
    pub is_active: bool,
}

// -- Errors --

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

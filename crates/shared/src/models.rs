use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Identifiers & enums
// ============================================================================

/// Entity identifier. The API sends ids as JSON numbers or strings; both are
/// kept as their string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<u64> for Id {
    fn from(value: u64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(s) => Ok(Self(s)),
            serde_json::Value::Number(n) => Ok(Self(n.to_string())),
            other => Err(de::Error::custom(format!(
                "expected string or number id, got {other}"
            ))),
        }
    }
}

/// Which login endpoint and dashboard a user goes through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Customer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Role::Admin => Role::Customer,
            Role::Customer => Role::Admin,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Subscription lifecycle status as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Requested,
    Approved,
    Active,
    Inactive,
    Expired,
    /// Any status string this client does not know about
    #[serde(other)]
    Unknown,
}

impl SubscriptionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Requested => "requested",
            SubscriptionStatus::Approved => "approved",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Inactive => "inactive",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Unknown => "unknown",
        }
    }

    /// Human label; requested subscriptions are shown as "Pending"
    pub fn label(self) -> &'static str {
        match self {
            SubscriptionStatus::Requested => "Pending",
            SubscriptionStatus::Approved => "Approved",
            SubscriptionStatus::Active => "Active",
            SubscriptionStatus::Inactive => "Inactive",
            SubscriptionStatus::Expired => "Expired",
            SubscriptionStatus::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric field that older rows may carry as a string (`"19.99"`) or null.
/// Values that do not read as a number fall back to the default so one bad
/// row cannot fail a whole list.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
{
    Ok(lenient_opt(deserializer)?.unwrap_or_default())
}

fn lenient_opt<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let parsed = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n.to_string().parse().ok(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    Ok(parsed)
}

// ============================================================================
// Entities
// ============================================================================

/// A purchasable subscription plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pack {
    pub id: Id,
    pub name: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default, deserialize_with = "lenient")]
    pub price: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub validity_months: u32,
}

/// A customer's association with a pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Id,
    #[serde(default)]
    pub customer_id: Option<Id>,
    #[serde(default)]
    pub pack_id: Option<Id>,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub requested_at: Option<String>,
    #[serde(default)]
    pub approved_at: Option<String>,
    #[serde(default)]
    pub assigned_at: Option<String>,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub pack_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub pack_price: Option<f64>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub customer_email: Option<String>,
}

impl Subscription {
    /// Pack name if the server joined it in, else a placeholder built from the id
    pub fn pack_display(&self) -> String {
        match (&self.pack_name, &self.pack_id) {
            (Some(name), _) if !name.is_empty() => name.clone(),
            (_, Some(id)) => format!("Pack ID: {id}"),
            _ => "Unknown pack".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Id,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_subscriptions: u32,
    #[serde(default)]
    pub has_active_subscription: bool,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// The signed-in customer's own profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Aggregates shown on the admin dashboard; field names are camelCase on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    #[serde(default, deserialize_with = "lenient")]
    pub total_customers: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub total_subscriptions: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub active_subscriptions: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub pending_subscriptions: u64,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub expired_subscriptions: Option<u64>,
    #[serde(default, deserialize_with = "lenient_opt")]
    pub inactive_subscriptions: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_revenue: f64,
}

// ============================================================================
// Request / response bodies
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub phone: String,
}

/// Body for creating or updating a pack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackInput {
    pub name: String,
    pub description: String,
    pub sku: String,
    pub price: f64,
    pub validity_months: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerUpdate {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRequest {
    pub pack_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: SubscriptionStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignRequest {
    pub customer_id: String,
    pub pack_id: String,
}

// ============================================================================
// Display helpers
// ============================================================================

/// Render a server timestamp as a calendar date (`YYYY-MM-DD`).
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS` and plain
/// dates; anything else is returned unchanged.
pub fn display_date(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().to_string();
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.date().to_string();
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return d.to_string();
    }
    raw.to_string()
}

// ============================================================================
// Tests
// ============================================================================

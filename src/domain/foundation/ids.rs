//! Strongly-typed identifier value objects.
//!
//! Records owned by this engine (purchases, subscriptions, transactions,
//! invoices, events) use UUIDs. Identifiers handed in by the surrounding
//! platform (users, hosts, packages, plans) are opaque non-empty strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random ", stringify!($name), ".")]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Creates a ", stringify!($name), " from an existing UUID.")]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident, $field:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a new ", stringify!($name), ", returning error if empty.")]
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::empty_field($field));
                }
                Ok(Self(id))
            }

            /// Returns the inner string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

uuid_identifier!(
    /// Unique identifier for a package purchase on a host.
    PurchaseId
);

uuid_identifier!(
    /// Unique identifier for a recurring-billing subscription.
    SubscriptionId
);

uuid_identifier!(
    /// Unique identifier for a transaction audit record.
    TransactionId
);

uuid_identifier!(
    /// Unique identifier for an invoice view.
    InvoiceId
);

string_identifier!(
    /// User identifier (typically from auth provider).
    UserId,
    "user_id"
);

string_identifier!(
    /// Identifier of the resource a package is provisioned onto (site, server).
    HostId,
    "host_id"
);

string_identifier!(
    /// Identifier of a sellable package.
    PackageId,
    "package_id"
);

string_identifier!(
    /// Identifier of a pricing plan.
    PlanId,
    "plan_id"
);

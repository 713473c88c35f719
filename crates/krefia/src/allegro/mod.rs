//! Client core for the Allegro SOAP backend: session handling, relation
//! lookup, the four domain fetchers, and the aggregation into one Krefia
//! overview record.

mod berichten;
mod budgetbeheer;
mod client;
mod currency;
mod extract;
mod gateway;
mod lening;
mod schuldhulp;

pub use client::{AllegroClient, LoginError};
pub use currency::format_currency;
pub use extract::{extract, extract_list, Extract};
pub use gateway::{AllegroGateway, Args, GatewayError, Operation, SessionId};
pub use schuldhulp::schuldhulp_title;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// The two Kredietbank business lines a citizen can have a relation with.
/// Fixed set; used as a map key, never extended at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bedrijf {
    Fibu,
    Kredietbank,
}

impl Bedrijf {
    /// Numeric Bedrijfscode as Allegro reports it in relation lookups.
    pub fn code(&self) -> &'static str {
        match self {
            Bedrijf::Fibu => "10",
            Bedrijf::Kredietbank => "2",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "10" => Some(Bedrijf::Fibu),
            "2" => Some(Bedrijf::Kredietbank),
            _ => None,
        }
    }
}

/// Display-ready summary of one backend dossier (schuldhulp aanvraag,
/// lening, or budgetbeheer case).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepLink {
    pub title: String,
    pub url: String,
}

/// Signals unread correspondence in the Berichtenbox of a business line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationTrigger {
    pub url: String,
    /// Date of the query, not of the message itself.
    pub date_published: NaiveDate,
}

/// All three slots are always serialized, null when empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeepLinks {
    pub schuldhulp: Option<DeepLink>,
    pub lening: Option<DeepLink>,
    pub budgetbeheer: Option<DeepLink>,
}

/// Only the business lines that actually have unread mail get a key.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationTriggers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fibu: Option<NotificationTrigger>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub krediet: Option<NotificationTrigger>,
}

/// The merged response for one citizen. When nothing at all was found the
/// aggregate collapses to `None` instead of an all-null record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    pub deep_links: DeepLinks,
    pub notification_triggers: Option<NotificationTriggers>,
}

impl AggregateResult {
    /// The "nothing found" collapse rule.
    pub fn is_empty(&self) -> bool {
        self.deep_links.schuldhulp.is_none()
            && self.deep_links.lening.is_none()
            && self.deep_links.budgetbeheer.is_none()
            && self.notification_triggers.is_none()
    }
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bedrijf_codes_round_trip() {
        assert_eq!(Bedrijf::from_code("10"), Some(Bedrijf::Fibu));
        assert_eq!(Bedrijf::from_code("2"), Some(Bedrijf::Kredietbank));
        assert_eq!(Bedrijf::from_code("7"), None);
        assert_eq!(Bedrijf::Fibu.code(), "10");
    }

    #[test]
    fn aggregate_serializes_camel_case_with_null_slots() {
        let aggregate = AggregateResult {
            deep_links: DeepLinks {
                budgetbeheer: Some(DeepLink {
                    title: "Lopend".to_string(),
                    url: "https://localhost/fibu/sso-login".to_string(),
                }),
                ..DeepLinks::default()
            },
            notification_triggers: None,
        };

        let value = serde_json::to_value(&aggregate).expect("serializes");
        assert_eq!(
            value,
            json!({
                "deepLinks": {
                    "schuldhulp": null,
                    "lening": null,
                    "budgetbeheer": {
                        "title": "Lopend",
                        "url": "https://localhost/fibu/sso-login"
                    }
                },
                "notificationTriggers": null
            })
        );
    }

    #[test]
    fn aggregate_is_empty_only_when_every_slot_is() {
        let mut aggregate = AggregateResult {
            deep_links: DeepLinks::default(),
            notification_triggers: None,
        };
        assert!(aggregate.is_empty());

        aggregate.deep_links.lening = Some(DeepLink {
            title: "Lopend".to_string(),
            url: "https://localhost/krediet/sso-login".to_string(),
        });
        assert!(!aggregate.is_empty());

        let triggers_only = AggregateResult {
            deep_links: DeepLinks::default(),
            notification_triggers: Some(NotificationTriggers::default()),
        };
        assert!(!triggers_only.is_empty());
    }

    #[test]
    fn absent_triggers_are_omitted_per_bedrijf() {
        let triggers = NotificationTriggers {
            fibu: Some(NotificationTrigger {
                url: "https://localhost/fibu/sso-login".to_string(),
                date_published: chrono::NaiveDate::from_ymd_opt(2021, 7, 14).expect("valid date"),
            }),
            krediet: None,
        };

        let value = serde_json::to_value(&triggers).expect("serializes");
        assert_eq!(
            value,
            json!({
                "fibu": {
                    "url": "https://localhost/fibu/sso-login",
                    "datePublished": "2021-07-14"
                }
            })
        );
    }
}

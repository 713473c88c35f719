use chrono::{Local, NaiveDate};
use serde_json::json;

use super::client::AllegroClient;
use super::extract::extract_list;
use super::gateway::{AllegroGateway, Operation};
use super::{Bedrijf, NotificationTrigger};

/// Fixed start of the Berichtenbox query window.
fn berichten_vanaf() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid date literal")
}

impl<G: AllegroGateway + ?Sized> AllegroClient<G> {
    /// Checks the Berichtenbox for unread received messages. The filter
    /// parameters are fixed; callers only choose the relatiecode and the
    /// business line the trigger should point at.
    ///
    /// The published date is the date of the query, not of the newest
    /// message: the trigger only signals that something is waiting.
    pub async fn notification(
        &self,
        relatiecode: &str,
        bedrijf: Bedrijf,
    ) -> Option<NotificationTrigger> {
        let today = Local::now().date_naive();
        let body = self
            .call(
                Operation::BerichtenOverzicht,
                vec![
                    json!(relatiecode),
                    json!(berichten_vanaf()),
                    json!(today),
                    json!("ovOntvangen"),
                    json!("Nee"),
                    json!("Nee"),
                    json!("Oplopend"),
                ],
            )
            .await?;

        if extract_list(&body, "TBBoxHeader").is_empty() {
            return None;
        }

        Some(NotificationTrigger {
            url: self.config().sso_url(bedrijf).to_string(),
            date_published: today,
        })
    }
}

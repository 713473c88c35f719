use serde_json::json;

use super::client::AllegroClient;
use super::extract::extract_list;
use super::gateway::{AllegroGateway, Operation};
use super::DeepLink;

/// Budgetbeheer has no per-case phases to report, every open case is simply
/// "Lopend".
const BUDGETBEHEER_TITLE: &str = "Lopend";

impl<G: AllegroGateway + ?Sized> AllegroClient<G> {
    /// Overview fetch of budgetbeheer cases for the FIBU relatiecode; no
    /// detail step, every header maps straight to a deep link.
    pub async fn budgetbeheer(&self, relatiecode: &str) -> Vec<DeepLink> {
        let Some(body) = self
            .call(Operation::BudgetbeheerOverzicht, vec![json!(relatiecode)])
            .await
        else {
            return Vec::new();
        };

        extract_list(&body, "TBBRHeader")
            .into_iter()
            .map(|_header| DeepLink {
                title: BUDGETBEHEER_TITLE.to_string(),
                url: self.config().sso_fibu.clone(),
            })
            .collect()
    }
}

use serde_json::{json, Value};
use tracing::warn;

use super::client::AllegroClient;
use super::currency::format_currency;
use super::extract::{extract, extract_list, field_f64};
use super::gateway::{AllegroGateway, Operation};
use super::DeepLink;

impl<G: AllegroGateway + ?Sized> AllegroClient<G> {
    /// Overview-then-detail fetch of persoonlijke leningen for the
    /// KREDIETBANK relatiecode.
    pub async fn leningen(&self, relatiecode: &str) -> Vec<DeepLink> {
        let Some(body) = self
            .call(Operation::LeningOverzicht, vec![json!(relatiecode)])
            .await
        else {
            return Vec::new();
        };

        let mut leningen = Vec::new();
        for header in extract_list(&body, "TPLHeader") {
            if let Some(lening) = self.lening(&header).await {
                leningen.push(lening);
            }
        }

        leningen
    }

    pub async fn lening(&self, header: &Value) -> Option<DeepLink> {
        let body = self
            .call(Operation::LeningDetail, vec![header.clone()])
            .await?;
        let detail = extract(&body, None).into_value()?;

        let Some(total) = field_f64(&detail, "NettoKredietsom") else {
            warn!("lening detail without NettoKredietsom");
            return None;
        };
        let Some(monthly_term) = field_f64(&detail, "MaandTermijn") else {
            warn!("lening detail without MaandTermijn");
            return None;
        };

        let title = format!(
            "U hebt {} geleend. Hierop moet u iedere maand {} aflossen.",
            format_currency(total),
            format_currency(monthly_term)
        );

        Some(DeepLink {
            title,
            url: self.config().sso_kredietbank.clone(),
        })
    }
}

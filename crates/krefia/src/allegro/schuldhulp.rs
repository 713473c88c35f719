use serde_json::{json, Value};
use tracing::debug;

use super::client::AllegroClient;
use super::extract::{extract, extract_list, field_str};
use super::gateway::{AllegroGateway, Operation};
use super::DeepLink;

/// Maps the three Allegro status fields onto a citizen-facing phase title.
/// Priority order matters: the first matching rule wins.
pub fn schuldhulp_title(status: &str, extra_status: &str, eind_status: &str) -> &'static str {
    if eind_status == "I" {
        "Schuldeisers akkoord"
    } else if matches!(eind_status, "T" | "U" | "V" | "W" | "X" | "Y" | "Z") {
        "Aanvraag afgewezen"
    } else if extra_status == "Voorlopig afgewezen" {
        "Dwangprocedure loopt"
    } else if status == "A" {
        "Inventariseren ingediende aanvraag"
    } else if matches!(status, "B" | "C" | "D") {
        "Schuldhoogte wordt opgevraagd"
    } else if matches!(status, "E" | "F" | "G") {
        "Afkoopvoorstellen zijn verstuurd"
    } else {
        "Lopend"
    }
}

/// The detail call wants the overview header echoed back as a
/// `TSRVAanvraagHeader` record, with nullable text fields defaulted to "".
fn detail_request(header: &Value) -> Value {
    let passthrough = |key: &str| header.get(key).cloned().unwrap_or(Value::Null);

    json!({
        "RelatieCode": passthrough("RelatieCode"),
        "Volgnummer": passthrough("Volgnummer"),
        "IsNPS": passthrough("IsNPS"),
        "Status": field_str(header, "Status"),
        "Statustekst": passthrough("Statustekst"),
        "Aanvraagdatum": passthrough("Aanvraagdatum"),
        "ExtraStatus": field_str(header, "ExtraStatus"),
    })
}

impl<G: AllegroGateway + ?Sized> AllegroClient<G> {
    /// Overview-then-detail fetch of schuldhulp dossiers for one
    /// relatiecode. Items of excluded opdrachtgevers are dropped entirely.
    pub async fn schuldhulp_aanvragen(&self, relatiecode: &str) -> Vec<DeepLink> {
        let Some(body) = self
            .call(Operation::SchuldhulpOverzicht, vec![json!(relatiecode)])
            .await
        else {
            return Vec::new();
        };

        let mut aanvragen = Vec::new();
        for header in extract_list(&body, "TSRVAanvraagHeader") {
            if let Some(aanvraag) = self.schuldhulp_aanvraag(&header).await {
                aanvragen.push(aanvraag);
            }
        }

        aanvragen
    }

    pub async fn schuldhulp_aanvraag(&self, header: &Value) -> Option<DeepLink> {
        let body = self
            .call(Operation::SchuldhulpAanvraag, vec![detail_request(header)])
            .await?;

        let detail = extract(&body, None).into_value()?;
        // Some Allegro revisions wrap the record in a TSRVAanvraag element.
        let detail = match detail.get("TSRVAanvraag") {
            Some(inner) if inner.is_object() => inner.clone(),
            _ => detail,
        };

        let opdrachtgever = field_str(&detail, "Opdrachtgever");
        if !opdrachtgever.is_empty()
            && self
                .config()
                .exclude_opdrachtgever
                .iter()
                .any(|excluded| excluded == opdrachtgever)
        {
            debug!(opdrachtgever, "schuldhulp dossier excluded");
            return None;
        }

        let title = schuldhulp_title(
            field_str(header, "Status"),
            field_str(header, "ExtraStatus"),
            field_str(&detail, "Eindstatus"),
        );

        Some(DeepLink {
            title: title.to_string(),
            url: self.config().sso_kredietbank.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::MockGateway;
    use super::*;
    use crate::config::AllegroConfig;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn config_excluding(opdrachtgevers: &[&str]) -> Arc<AllegroConfig> {
        Arc::new(AllegroConfig {
            soap_endpoint: "https://localhost/SOAP".to_string(),
            request_timeout: Duration::from_secs(60),
            exclude_opdrachtgever: opdrachtgevers.iter().map(|s| s.to_string()).collect(),
            sso_fibu: "https://localhost/fibu/sso-login".to_string(),
            sso_kredietbank: "https://localhost/kredietbank/sso-login".to_string(),
        })
    }

    fn overview_header() -> Value {
        json!({
            "RelatieCode": 2442531,
            "Volgnummer": 2,
            "IsNPS": false,
            "Status": "E",
            "Statustekst": "Derde fiattering akkoord- wacht op accoord client.",
            "Aanvraagdatum": "2020-06-22T00:00:00",
            "ExtraStatus": null
        })
    }

    #[test]
    fn title_rules_fire_in_priority_order() {
        assert_eq!(schuldhulp_title("", "", "I"), "Schuldeisers akkoord");
        assert_eq!(schuldhulp_title("E", "Voorlopig afgewezen", "Z"), "Aanvraag afgewezen");
        assert_eq!(schuldhulp_title("C", "Voorlopig afgewezen", ""), "Dwangprocedure loopt");
        assert_eq!(schuldhulp_title("A", "", ""), "Inventariseren ingediende aanvraag");
        assert_eq!(schuldhulp_title("C", "Aanvraag beperkt", ""), "Schuldhoogte wordt opgevraagd");
        assert_eq!(schuldhulp_title("E", "", ""), "Afkoopvoorstellen zijn verstuurd");
        assert_eq!(schuldhulp_title("F", "", ""), "Afkoopvoorstellen zijn verstuurd");
    }

    #[test]
    fn out_of_set_values_fall_back_to_lopend() {
        assert_eq!(schuldhulp_title("", "", ""), "Lopend");
        assert_eq!(schuldhulp_title("Q", "Iets anders", "H"), "Lopend");
    }

    #[test]
    fn detail_request_defaults_nullable_text_fields() {
        let request = detail_request(&overview_header());
        assert_eq!(request["Volgnummer"], json!(2));
        assert_eq!(request["Status"], json!("E"));
        assert_eq!(request["ExtraStatus"], json!(""));
    }

    #[tokio::test]
    async fn aanvraag_title_combines_header_and_detail_fields() {
        let gateway = Arc::new(MockGateway::new().with_response(
            Operation::SchuldhulpAanvraag,
            json!({
                "Result": {
                    "TSRVAanvraag": {
                        "Volgnummer": "1",
                        "RelatieCode": "123",
                        "Eindstatus": null,
                        "Status": "C",
                        "ExtraStatus": "Voorlopig afgewezen"
                    }
                }
            }),
        ));
        let client = AllegroClient::new(gateway.clone(), config_excluding(&[]));

        let aanvraag = client
            .schuldhulp_aanvraag(&overview_header())
            .await
            .expect("deep link produced");

        assert_eq!(aanvraag.title, "Afkoopvoorstellen zijn verstuurd");
        assert_eq!(aanvraag.url, "https://localhost/kredietbank/sso-login");

        let args = gateway.args_for(Operation::SchuldhulpAanvraag);
        assert_eq!(args[0][0]["Volgnummer"], json!(2));
    }

    #[tokio::test]
    async fn excluded_opdrachtgever_produces_no_deep_link() {
        let gateway = Arc::new(
            MockGateway::new()
                .with_response(
                    Operation::SchuldhulpOverzicht,
                    json!({ "Result": { "TSRVAanvraagHeader": [overview_header()] } }),
                )
                .with_response(
                    Operation::SchuldhulpAanvraag,
                    json!({
                        "Result": {
                            "Eindstatus": "I",
                            "Opdrachtgever": "Gemeente X"
                        }
                    }),
                ),
        );
        let client = AllegroClient::new(gateway, config_excluding(&["Gemeente X"]));

        let aanvragen = client.schuldhulp_aanvragen("123123").await;
        assert!(aanvragen.is_empty());
    }

    #[tokio::test]
    async fn overview_failure_degrades_to_no_items() {
        let gateway =
            Arc::new(MockGateway::new().with_failure(Operation::SchuldhulpOverzicht));
        let client = AllegroClient::new(gateway.clone(), config_excluding(&[]));

        assert!(client.schuldhulp_aanvragen("123123").await.is_empty());
        assert_eq!(gateway.call_count(Operation::SchuldhulpAanvraag), 0);
    }
}

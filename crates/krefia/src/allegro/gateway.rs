use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// Opaque Allegro session token, scoped to one aggregate request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Positional call arguments, matching the SOAP operation signatures.
/// Scalars go in as JSON scalars, records as JSON objects.
pub type Args = Vec<Value>;

/// The backend operations the aggregator uses. A closed set so dispatch is
/// typed rather than driven by `"Service.Method"` strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    LoginTijdelijk,
    BsnNaarRelatieMetBedrijf,
    MagAanmelden,
    SchuldhulpOverzicht,
    SchuldhulpAanvraag,
    LeningOverzicht,
    LeningDetail,
    BudgetbeheerOverzicht,
    BerichtenOverzicht,
}

impl Operation {
    pub fn service(&self) -> &'static str {
        match self {
            Operation::LoginTijdelijk
            | Operation::BsnNaarRelatieMetBedrijf
            | Operation::MagAanmelden => "LoginService",
            Operation::SchuldhulpOverzicht | Operation::SchuldhulpAanvraag => "SchuldHulpService",
            Operation::LeningOverzicht | Operation::LeningDetail => "FinancieringService",
            Operation::BudgetbeheerOverzicht => "BBRService",
            Operation::BerichtenOverzicht => "BerichtenBoxService",
        }
    }

    pub fn method(&self) -> &'static str {
        match self {
            Operation::LoginTijdelijk => "AllegroWebLoginTijdelijk",
            Operation::BsnNaarRelatieMetBedrijf => "BSNNaarRelatieMetBedrijf",
            Operation::MagAanmelden => "AllegroWebMagAanmelden",
            Operation::SchuldhulpOverzicht => "GetSRVOverzicht",
            Operation::SchuldhulpAanvraag => "GetSRVAanvraag",
            Operation::LeningOverzicht => "GetPLOverzicht",
            Operation::LeningDetail => "GetPL",
            Operation::BudgetbeheerOverzicht => "GetBBROverzicht",
            Operation::BerichtenOverzicht => "GetBerichten",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.service(), self.method())
    }
}

/// Failure of a single backend call. The fetchers recover from these; only
/// the initial login treats a gateway failure as fatal.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Capability boundary to the Allegro SOAP services. Implementations own
/// the transport and attach the `ROClientIDHeader` when a session is given;
/// they carry no per-user state and may be shared across requests.
#[async_trait]
pub trait AllegroGateway: Send + Sync {
    /// Returns the decoded response body element for the operation, with
    /// XML nesting mapped onto `serde_json::Value`.
    async fn call(
        &self,
        operation: Operation,
        session: Option<&SessionId>,
        args: Args,
    ) -> Result<Value, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operations_map_to_allegro_wire_names() {
        assert_eq!(
            Operation::LoginTijdelijk.to_string(),
            "LoginService.AllegroWebLoginTijdelijk"
        );
        assert_eq!(
            Operation::SchuldhulpAanvraag.to_string(),
            "SchuldHulpService.GetSRVAanvraag"
        );
        assert_eq!(
            Operation::LeningOverzicht.to_string(),
            "FinancieringService.GetPLOverzicht"
        );
        assert_eq!(
            Operation::BudgetbeheerOverzicht.to_string(),
            "BBRService.GetBBROverzicht"
        );
        assert_eq!(
            Operation::BerichtenOverzicht.to_string(),
            "BerichtenBoxService.GetBerichten"
        );
    }
}

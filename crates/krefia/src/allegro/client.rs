use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::AllegroConfig;

use super::extract::{extract, extract_list, field_text, truthy};
use super::gateway::{AllegroGateway, Args, Operation, SessionId};
use super::{AggregateResult, Bedrijf, DeepLinks, NotificationTriggers};

/// The temporary Allegro login failed; nothing else is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("could not login to Allegro")]
pub struct LoginError;

/// One client instance per aggregate request. The session id lives here and
/// nowhere else, so concurrent requests cannot see each other's session.
pub struct AllegroClient<G: ?Sized> {
    gateway: Arc<G>,
    config: Arc<AllegroConfig>,
    session: Option<SessionId>,
}

impl<G: AllegroGateway + ?Sized> AllegroClient<G> {
    pub fn new(gateway: Arc<G>, config: Arc<AllegroConfig>) -> Self {
        Self {
            gateway,
            config,
            session: None,
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    pub(super) fn config(&self) -> &AllegroConfig {
        &self.config
    }

    /// Single call path for every operation: gateway failures are logged with
    /// the operation name and degrade to "no data". Only the login step
    /// escalates a missing body into a request failure.
    pub(super) async fn call(&self, operation: Operation, args: Args) -> Option<Value> {
        match self.gateway.call(operation, self.session.as_ref(), args).await {
            Ok(body) => {
                debug!(operation = %operation, "Allegro response received");
                Some(body)
            }
            Err(error) => {
                warn!(operation = %operation, %error, "Allegro call failed");
                None
            }
        }
    }

    fn adopt_session_from(&mut self, body: &Value) -> bool {
        match body.pointer("/aUserInfo/SessionID").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => {
                self.session = Some(SessionId::new(id));
                true
            }
            _ => false,
        }
    }

    /// Anonymous login opening the request's session. Returns `false` on any
    /// failure; the caller decides that this is fatal.
    pub async fn login_tijdelijk(&mut self) -> bool {
        let Some(body) = self
            .call(Operation::LoginTijdelijk, vec![json!(""), json!("")])
            .await
        else {
            return false;
        };

        let logged_in = extract(&body, None)
            .into_value()
            .is_some_and(|result| truthy(&result));

        if logged_in && !self.adopt_session_from(&body) {
            warn!("login result without a SessionID");
            return false;
        }

        logged_in
    }

    /// Maps the citizen's BSN to at most one relatiecode per business line.
    /// Unknown Bedrijfscodes are dropped; an unusable response yields an
    /// empty map, never an error.
    pub async fn relatiecodes(&self, bsn: &str) -> BTreeMap<Bedrijf, String> {
        let Some(body) = self
            .call(Operation::BsnNaarRelatieMetBedrijf, vec![json!(bsn)])
            .await
        else {
            return BTreeMap::new();
        };

        let mut relatiecodes = BTreeMap::new();
        for relatie in extract_list(&body, "TRelatiecodeBedrijfcode") {
            let bedrijfscode = field_text(&relatie, "Bedrijfscode");
            if let Some(bedrijf) = Bedrijf::from_code(&bedrijfscode) {
                relatiecodes.insert(bedrijf, field_text(&relatie, "Relatiecode"));
            }
        }

        debug!(?relatiecodes, "resolved relatiecodes");
        relatiecodes
    }

    /// Permission check for one relatiecode. Fail-closed: anything but an
    /// explicit `true` in the result means no access. When `adopt_session` is
    /// set the session id carried on the response replaces the current one.
    pub async fn login_allowed(&mut self, relatiecode: &str, adopt_session: bool) -> bool {
        let Some(body) = self
            .call(
                Operation::MagAanmelden,
                vec![json!(relatiecode), json!(""), json!("")],
            )
            .await
        else {
            return false;
        };

        let is_allowed = body.get("Result").and_then(Value::as_bool).unwrap_or(false);

        if adopt_session {
            self.adopt_session_from(&body);
        }

        is_allowed
    }

    /// Aggregates everything Allegro knows about one citizen. `Ok(None)` is
    /// the "nothing found" terminal state; a failed login is the only fatal
    /// outcome. A single fetcher failing degrades to a null slot.
    pub async fn get_all(&mut self, bsn: &str) -> Result<Option<AggregateResult>, LoginError> {
        if !self.login_tijdelijk().await {
            return Err(LoginError);
        }

        let relaties = self.relatiecodes(bsn).await;
        if relaties.is_empty() {
            info!("no relaties for this user");
            return Ok(None);
        }

        let fibu_relatiecode = relaties.get(&Bedrijf::Fibu).cloned();
        let kredietbank_relatiecode = relaties.get(&Bedrijf::Kredietbank).cloned();

        let mut budgetbeheer = Vec::new();
        let mut schuldhulp = Vec::new();
        let mut lening = Vec::new();
        let mut fibu_notification = None;
        let mut kredietbank_notification = None;

        if let Some(relatiecode) = &fibu_relatiecode {
            if self.login_allowed(relatiecode, true).await {
                budgetbeheer = self.budgetbeheer(relatiecode).await;
                fibu_notification = self.notification(relatiecode, Bedrijf::Fibu).await;
            }
        }

        if let Some(relatiecode) = &kredietbank_relatiecode {
            // The KREDIETBANK line adopts the session when no FIBU line
            // preceded it.
            if self
                .login_allowed(relatiecode, fibu_relatiecode.is_none())
                .await
            {
                schuldhulp = self.schuldhulp_aanvragen(relatiecode).await;
                lening = self.leningen(relatiecode).await;
                kredietbank_notification =
                    self.notification(relatiecode, Bedrijf::Kredietbank).await;
            }
        }

        let notification_triggers =
            if fibu_notification.is_some() || kredietbank_notification.is_some() {
                Some(NotificationTriggers {
                    fibu: fibu_notification,
                    krediet: kredietbank_notification,
                })
            } else {
                None
            };

        let aggregate = AggregateResult {
            deep_links: DeepLinks {
                schuldhulp: schuldhulp.into_iter().next(),
                lening: lening.into_iter().next(),
                budgetbeheer: budgetbeheer.into_iter().next(),
            },
            notification_triggers,
        };

        if aggregate.is_empty() {
            return Ok(None);
        }

        Ok(Some(aggregate))
    }
}

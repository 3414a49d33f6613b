use crate::error::Error;
use tracing::info;

/// An identity obtained by one scenario. Owned by that scenario and dropped with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    username: String,
    auth_token: Option<String>,
}

impl Session {
    pub fn anonymous<S: Into<String>>(username: S) -> Self {
        Self {
            username: username.into(),
            auth_token: None,
        }
    }

    pub fn authenticated<S1: Into<String>, S2: Into<String>>(username: S1, token: S2) -> Self {
        Self {
            username: username.into(),
            auth_token: Some(token.into()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> Option<&str> {
        self.auth_token.as_deref()
    }

    /// The token, which stays valid for the rest of the scenario once present.
    pub fn require_token(&self) -> Result<&str, Error> {
        self.token()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                Error::InvalidRequest(format!("session for {} has no auth token", self.username))
            })
    }
}

/// An order whose number is known. There is no unresolved variant: when the
/// number cannot be found the scenario fails instead.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderHandle {
    order_number: String,
    product_name: String,
    quantity: u32,
    unit_price: f64,
}

impl OrderHandle {
    pub(crate) fn new(order_number: String, product_name: &str, quantity: u32, unit_price: f64) -> Self {
        Self {
            order_number,
            product_name: product_name.to_string(),
            quantity,
            unit_price,
        }
    }

    pub fn order_number(&self) -> &str {
        &self.order_number
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> f64 {
        self.unit_price
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum ScenarioState {
    Init,
    Credentialed,
    Ordered,
    Paid,
    Notified,
    Done,
}

/// Progress of one scenario. States only move forward; a failure simply
/// leaves the run where it stopped.
///
/// The orchestrator never touches a run. The test driving the scenario owns it
/// and calls [`ScenarioRun::advance`] after each orchestrator step succeeds, so
/// a panic or an early `?` leaves the last state reached:
///
/// ```text
/// let session = orchestrator.register_or_login(..)?;
/// run.advance(ScenarioState::Credentialed)?;
/// let order = orchestrator.create_order(&session, ..)?;
/// run.advance(ScenarioState::Ordered)?;
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    name: String,
    state: ScenarioState,
}

impl ScenarioRun {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            state: ScenarioState::Init,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ScenarioState {
        self.state
    }

    pub fn advance(&mut self, to: ScenarioState) -> Result<(), Error> {
        let leaves_init_wrongly =
            self.state == ScenarioState::Init && to != ScenarioState::Credentialed;

        if to <= self.state || leaves_init_wrongly {
            return Err(Error::InvalidScenarioTransition {
                from: self.state,
                to,
            });
        }

        info!(scenario = %self.name, from = ?self.state, to = ?to, "scenario advanced");
        self.state = to;
        Ok(())
    }
}

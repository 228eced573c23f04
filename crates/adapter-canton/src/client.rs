//! Access to a Canton participant through the JSON Ledger API v2.

use std::time::Duration;

use async_trait::async_trait;
use eyre::{Result, WrapErr, bail};
use mcms_core::{
    ChainFamily, ContractIdentity, Error, TransactionResult, metrics::AdapterMetrics, retry::with_retry,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    choices::Choice,
    contract::{MCMS_TEMPLATE_ID, MCMS_TEMPLATE_KEY, McmsState, normalize_template_key},
    handle::{McmsHandle, Mutation},
};

/// A choice exercised on one contract.
#[derive(Clone, Debug, PartialEq)]
pub struct ExerciseCommand {
    pub workflow_id: String,
    pub template_id: String,
    pub contract_id: String,
    pub choice: String,
    pub argument: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedEvent {
    pub contract_id: String,
    pub template_id: String,
    #[serde(rename = "createArgument")]
    pub payload: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LedgerEvent {
    Created(CreatedEvent),
    Exercised { choice: String, result: Value },
    Archived { contract_id: String },
}

/// A committed transaction with its ledger-effects events.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerTransaction {
    pub command_id: String,
    pub update_id: String,
    pub events: Vec<LedgerEvent>,
}

impl LedgerTransaction {
    /// The first contract created from the template with normalized key `template_key`.
    pub fn created(&self, template_key: &str) -> Option<&CreatedEvent> {
        self.events.iter().find_map(|event| match event {
            LedgerEvent::Created(created) if normalize_template_key(&created.template_id) == template_key => {
                Some(created)
            }
            _ => None,
        })
    }

    /// Result of the first exercise of `choice`.
    pub fn exercise_result(&self, choice: &str) -> Option<&Value> {
        self.events.iter().find_map(|event| match event {
            LedgerEvent::Exercised { choice: exercised, result } if exercised == choice => Some(result),
            _ => None,
        })
    }
}

/// Submission and query collaborator the Canton adapters run against.
///
/// Implementations act as a single party and wait for each command's
/// transaction before returning.
#[async_trait]
pub trait CantonLedger: Send + Sync {
    /// The party commands are submitted as.
    fn party(&self) -> &str;

    async fn exercise(&self, command: ExerciseCommand) -> Result<LedgerTransaction>;

    /// The active contract `contract_id` of `template_id`, if the party sees one.
    async fn fetch_contract(&self, template_id: &str, contract_id: &str) -> Result<Option<CreatedEvent>>;
}

/// [`CantonLedger`] over the participant's JSON Ledger API v2.
#[derive(Clone, Debug)]
pub struct JsonLedgerClient {
    http: reqwest::Client,
    base_url: String,
    user_id: String,
    party: String,
    token: Option<String>,
}

impl JsonLedgerClient {
    pub fn new(base_url: impl Into<String>, user_id: impl Into<String>, party: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            user_id: user_id.into(),
            party: party.into(),
            token: None,
        })
    }

    /// Sends `token` as a bearer token with every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    async fn request<T: serde::de::DeserializeOwned>(&self, path: &str, body: Option<&Value>) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        let mut request = match body {
            Some(body) => self.http.post(&url).json(body),
            None => self.http.get(&url),
        };
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.wrap_err_with(|| format!("request to {path} failed"))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            bail!("{path} returned {status}: {text}");
        }
        Ok(response.json().await?)
    }

    fn party_filter(&self, template_id: Option<&str>) -> Value {
        let cumulative = match template_id {
            Some(template_id) => json!([{
                "identifierFilter": {
                    "TemplateFilter": {
                        "value": { "templateId": template_id, "includeCreatedEventBlob": false }
                    }
                }
            }]),
            None => json!([]),
        };
        let mut filters = serde_json::Map::new();
        filters.insert(self.party.clone(), json!({ "cumulative": cumulative }));
        json!({ "filtersByParty": filters, "verbose": true })
    }

    async fn ledger_end(&self) -> Result<i64> {
        #[derive(Deserialize)]
        struct LedgerEnd {
            offset: i64,
        }
        let end: LedgerEnd = self.request("/v2/state/ledger-end", None).await?;
        Ok(end.offset)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsExercised {
    choice: String,
    #[serde(default)]
    exercise_result: Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsArchived {
    contract_id: String,
}

#[derive(Deserialize)]
enum JsEvent {
    CreatedEvent(CreatedEvent),
    ExercisedEvent(JsExercised),
    ArchivedEvent(JsArchived),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsTransaction {
    update_id: String,
    #[serde(default)]
    command_id: String,
    #[serde(default)]
    events: Vec<JsEvent>,
}

#[derive(Deserialize)]
struct TransactionResponse {
    transaction: JsTransaction,
}

impl From<JsEvent> for LedgerEvent {
    fn from(event: JsEvent) -> Self {
        match event {
            JsEvent::CreatedEvent(created) => Self::Created(created),
            JsEvent::ExercisedEvent(exercised) => {
                Self::Exercised { choice: exercised.choice, result: exercised.exercise_result }
            }
            JsEvent::ArchivedEvent(archived) => Self::Archived { contract_id: archived.contract_id },
        }
    }
}

#[async_trait]
impl CantonLedger for JsonLedgerClient {
    fn party(&self) -> &str {
        &self.party
    }

    async fn exercise(&self, command: ExerciseCommand) -> Result<LedgerTransaction> {
        let command_id = Uuid::new_v4().to_string();
        let body = json!({
            "commands": {
                "commands": [{
                    "ExerciseCommand": {
                        "templateId": command.template_id,
                        "contractId": command.contract_id,
                        "choice": command.choice,
                        "choiceArgument": command.argument,
                    }
                }],
                "workflowId": command.workflow_id,
                "userId": self.user_id,
                "commandId": command_id,
                "actAs": [self.party],
            },
            "transactionFormat": {
                "eventFormat": self.party_filter(None),
                "transactionShape": "TRANSACTION_SHAPE_LEDGER_EFFECTS",
            },
        });

        let response: TransactionResponse = self
            .request("/v2/commands/submit-and-wait-for-transaction", Some(&body))
            .await
            .wrap_err_with(|| format!("{} on {} failed", command.choice, command.contract_id))?;
        let tx = response.transaction;

        info!(choice = %command.choice, contract_id = %command.contract_id, update_id = %tx.update_id, "Command committed");
        Ok(LedgerTransaction {
            command_id: if tx.command_id.is_empty() { command_id } else { tx.command_id },
            update_id: tx.update_id,
            events: tx.events.into_iter().map(Into::into).collect(),
        })
    }

    async fn fetch_contract(&self, template_id: &str, contract_id: &str) -> Result<Option<CreatedEvent>> {
        let entries: Vec<Value> = with_retry("active_contracts", || async {
            let offset = self.ledger_end().await?;
            let body = json!({ "eventFormat": self.party_filter(Some(template_id)), "activeAtOffset": offset });
            self.request("/v2/state/active-contracts", Some(&body)).await
        })
        .await?;
        debug!(template_id, contracts = entries.len(), "Fetched active contracts");

        for entry in entries {
            let created = &entry["contractEntry"]["JsActiveContract"]["createdEvent"];
            if created["contractId"].as_str() != Some(contract_id) {
                continue;
            }
            return Ok(Some(serde_json::from_value(created.clone())?));
        }
        Ok(None)
    }
}

/// Builds the command exercising `choice` on the MCMS contract `contract_id`.
pub(crate) fn command<C: Choice>(
    contract_id: &str,
    workflow_id: impl Into<String>,
    choice: &C,
) -> mcms_core::Result<ExerciseCommand> {
    let argument = serde_json::to_value(choice).map_err(|err| Error::decode("choice argument", err))?;
    Ok(ExerciseCommand {
        workflow_id: workflow_id.into(),
        template_id: MCMS_TEMPLATE_ID.to_owned(),
        contract_id: contract_id.to_owned(),
        choice: C::NAME.to_owned(),
        argument,
    })
}

/// Exercises a consuming choice, recording the outcome.
pub(crate) async fn submit<C: Choice>(
    ledger: &dyn CantonLedger,
    metrics: &AdapterMetrics,
    contract_id: &str,
    workflow_id: &str,
    choice: &C,
) -> mcms_core::Result<LedgerTransaction> {
    let command = command(contract_id, workflow_id, choice)?;
    match ledger.exercise(command).await {
        Ok(tx) => {
            metrics.record_submission(C::NAME);
            Ok(tx)
        }
        Err(err) => {
            metrics.record_failure(C::NAME);
            Err(Error::submission(C::NAME, err))
        }
    }
}

/// Exercises a non-consuming choice and returns its result.
pub(crate) async fn view<C: Choice>(
    ledger: &dyn CantonLedger,
    contract_id: &str,
    choice: &C,
) -> mcms_core::Result<Value> {
    let command = command(contract_id, format!("mcms-timelock-{}", C::NAME), choice)?;
    let tx = ledger.exercise(command).await.map_err(|err| Error::query(C::NAME, err))?;
    tx.exercise_result(C::NAME)
        .cloned()
        .ok_or_else(|| Error::query(C::NAME, eyre::eyre!("no exercised event for {}", C::NAME)))
}

/// Reads and decodes the active MCMS contract `contract_id`.
pub(crate) async fn fetch_mcms(ledger: &dyn CantonLedger, contract_id: &str) -> mcms_core::Result<McmsState> {
    let created = ledger
        .fetch_contract(MCMS_TEMPLATE_ID, contract_id)
        .await
        .map_err(|err| Error::query("mcms_contract", err))?
        .ok_or_else(|| Error::query("mcms_contract", eyre::eyre!("MCMS contract with ID {contract_id} not found")))?;
    serde_json::from_value(created.payload).map_err(|err| Error::decode("MCMS contract", err))
}

/// The MCMS contract that replaced `previous` in `tx`.
pub(crate) fn recreated_mcms(tx: &LedgerTransaction, previous: &str) -> mcms_core::Result<McmsHandle> {
    tx.created(MCMS_TEMPLATE_KEY)
        .map(|created| {
            McmsHandle::from(ContractIdentity {
                contract_id: created.contract_id.clone(),
                template_id: created.template_id.clone(),
            })
        })
        .ok_or_else(|| Error::NoCreatedEvent { template: MCMS_TEMPLATE_KEY.to_owned(), contract_id: previous.to_owned() })
}

/// A mutation that re-created the multisig as `next`.
pub(crate) fn mutation(tx: &LedgerTransaction, next: McmsHandle) -> Mutation {
    let result = TransactionResult::new(tx.command_id.clone(), ChainFamily::Canton).with_raw_data(json!({
        "newMcmsContractId": next.contract_id(),
        "newMcmsTemplateId": next.template_id(),
        "updateId": tx.update_id,
    }));
    Mutation { result, next }
}

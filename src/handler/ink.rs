//! Chain handler for ink!-contract chains.
//!
//! Translates between the cross-chain contract's JSON-shaped query results
//! (hex byte fields, decimal-text wide integers, named sqos variants) and
//! the core message model, and drives the Reveal and Challenge SQoS
//! protocols against the contract.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::client::{ChainClient, Signer};
use crate::message::{
    canonical_hash, commitment_hash, validate, Bytes, Content, CrossChainMessage, MessageKey,
    Session, SqosItem, SqosType,
};
use crate::payload::{decode_payload, encode_payload};
use crate::sqos::{plan_challenge, plan_reveal, ChallengeContext, ChallengeStep, RevealStep};

use super::{
    ChainHandler, FetchError, HandlerError, MessageGroup, PushError, PushOutcome, ReceivedState,
};

const GET_SENT_MESSAGE_COUNT: &str = "crossChainBase::getSentMessageNumber";
const GET_SENT_MESSAGE: &str = "crossChainBase::getSentMessage";
const GET_NEXT_MESSAGE_ID: &str = "getMsgPortingTask";
const RECEIVE_MESSAGE: &str = "crossChainBase::receiveMessage";
const EXECUTE_MESSAGE: &str = "crossChainBase::executeMessage";
const ABANDON_MESSAGE: &str = "crossChainBase::abandonMessage";
const GET_EXECUTABLE_MESSAGES: &str = "crossChainBase::getExecutableMessages";
const GET_EXECUTABLE_MESSAGE: &str = "getExecutableMessage";
const GET_RECEIVED_MESSAGE: &str = "crossChainBase::getReceivedMessage";
const GET_SQOS: &str = "getSqos";
const GET_SQOS_MESSAGE: &str = "getSqosMessage";
const RECEIVE_HIDDEN_MESSAGE: &str = "sQoSBase::receiveHiddenMessage";
const CHALLENGE: &str = "sQoSBase::challenge";

/// Sent message as the contract reports it. `sqos` entries stay untyped so
/// their decoding remains a distinct failure point.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSentMessage {
    id: Value,
    from_chain: String,
    to_chain: String,
    sender: String,
    signer: String,
    sqos: Vec<Value>,
    content: RawContent,
    session: RawSession,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawSqos {
    t: String,
    v: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawContent {
    contract: String,
    action: String,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSession {
    id: Value,
    session_type: u8,
    callback: String,
    commitment: String,
    answer: String,
}

/// Message in the shape `receiveMessage` expects.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawTargetMessage {
    id: String,
    from_chain: String,
    to_chain: String,
    sender: String,
    signer: String,
    sqos: Vec<RawSqos>,
    contract: String,
    action: String,
    data: String,
    session: RawTargetSession,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RawTargetSession {
    id: String,
    session_type: u8,
    callback: String,
    commitment: String,
    answer: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawGroup {
    message_hash: String,
    message: RawGroupMessage,
    routers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawGroupMessage {
    contract: String,
}

fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn decode_hex(text: &str) -> Result<Bytes, hex::FromHexError> {
    hex::decode(text.trim_start_matches("0x"))
}

/// Wide integers arrive as decimal text; small ones may come as numbers.
fn parse_u128(value: &Value) -> Option<u128> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().map(u128::from),
        _ => None,
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Handler for one ink!-compatible chain, bound to its cross-chain contract
/// through the chain client and signing as one relayer account.
pub struct InkHandler {
    chain_name: String,
    client: Arc<dyn ChainClient>,
    signer: Signer,
}

impl InkHandler {
    pub fn new(chain_name: impl Into<String>, client: Arc<dyn ChainClient>, signer: Signer) -> Self {
        let chain_name = chain_name.into();
        info!(chain = %chain_name, relayer = %signer.address, "initialized ink handler");
        Self {
            chain_name,
            client,
            signer,
        }
    }

    async fn query(&self, method: &str, args: &[Value]) -> Result<Value, HandlerError> {
        self.client
            .query(method, args)
            .await
            .map_err(|e| HandlerError::Query(e.to_string()))
    }

    /// The destination contract's configured SQoS, if any.
    async fn contract_sqos(&self, contract_hex: &str) -> Result<Option<SqosItem>, HandlerError> {
        let raw = self.query(GET_SQOS, &[json!(contract_hex)]).await?;
        if raw.is_null() {
            return Ok(None);
        }
        let raw: RawSqos = serde_json::from_value(raw)
            .map_err(|e| HandlerError::BadReply(format!("contract sqos: {e}")))?;
        let sqos_type = SqosType::from_name(&raw.t)
            .ok_or_else(|| HandlerError::BadReply(format!("contract sqos type {}", raw.t)))?;
        let value = decode_hex(&raw.v)
            .map_err(|e| HandlerError::BadReply(format!("contract sqos value: {e}")))?;
        Ok(Some(SqosItem::new(sqos_type, value)))
    }

    /// Hidden commits (or challenges) recorded for a slot: the submitting
    /// addresses and whether the phase is complete.
    async fn sqos_message(
        &self,
        from_chain: &str,
        id: u128,
    ) -> Result<(Vec<String>, bool), HandlerError> {
        let raw = self
            .query(
                GET_SQOS_MESSAGE,
                &[json!(from_chain), json!(id.to_string())],
            )
            .await?;
        let (entries, completed): (Vec<(String, Value)>, bool) = serde_json::from_value(raw)
            .map_err(|e| HandlerError::BadReply(format!("sqos message: {e}")))?;
        Ok((entries.into_iter().map(|(addr, _)| addr).collect(), completed))
    }

    async fn received_state(
        &self,
        from_chain: &str,
        id: u128,
    ) -> Result<ReceivedState, HandlerError> {
        let raw = self
            .query(
                GET_RECEIVED_MESSAGE,
                &[json!(from_chain), json!(id.to_string())],
            )
            .await?;
        let (groups, (completed, last_received_ms)): (Vec<RawGroup>, (bool, u64)) =
            serde_json::from_value(raw)
                .map_err(|e| HandlerError::BadReply(format!("received message: {e}")))?;

        let mut translated = Vec::with_capacity(groups.len());
        for group in groups {
            let hash: [u8; 32] = decode_hex(&group.message_hash)
                .ok()
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| {
                    HandlerError::BadReply(format!("group hash {}", group.message_hash))
                })?;
            let contract = decode_hex(&group.message.contract)
                .map_err(|e| HandlerError::BadReply(format!("group contract: {e}")))?;
            translated.push(MessageGroup {
                hash,
                contract,
                submitters: group.routers,
            });
        }
        Ok(ReceivedState {
            groups: translated,
            completed,
            last_received_ms: u128::from(last_received_ms),
        })
    }

    /// Runs the Reveal sub-protocol for a push. Returns the outcome, or
    /// `None` when the plan is to deliver the full message.
    async fn run_reveal(
        &self,
        message: &CrossChainMessage,
        contract_hex: &str,
    ) -> Result<Option<PushOutcome>, PushError> {
        let (committers, completed) = self
            .sqos_message(&message.from_chain, message.id)
            .await
            .map_err(|e| PushError::Query(e.to_string()))?;
        let committed = committers.iter().any(|c| c == &self.signer.address);
        let revealed = if completed && committed {
            let state = self
                .received_state(&message.from_chain, message.id)
                .await
                .map_err(|e| PushError::Query(e.to_string()))?;
            state
                .groups
                .iter()
                .any(|g| g.submitters.iter().any(|s| s == &self.signer.address))
        } else {
            false
        };

        match plan_reveal(completed, committed, revealed) {
            RevealStep::Commit => {
                let hash = commitment_hash(message, &self.signer.public_key);
                self.client
                    .submit(
                        RECEIVE_HIDDEN_MESSAGE,
                        &[
                            json!(message.from_chain),
                            json!(message.id.to_string()),
                            json!(contract_hex),
                            json!(encode_hex(&hash)),
                        ],
                    )
                    .await
                    .map_err(|e| PushError::SendTransaction(e.to_string()))?;
                info!(
                    from = %message.from_chain,
                    id = %message.id,
                    "committed hidden message hash"
                );
                Ok(Some(PushOutcome::Committed))
            }
            RevealStep::AlreadySubmitted => Ok(Some(PushOutcome::AlreadySubmitted)),
            RevealStep::Skip => {
                info!(
                    from = %message.from_chain,
                    id = %message.id,
                    "reveal closed without our commitment, skipping"
                );
                Ok(Some(PushOutcome::Skipped))
            }
            RevealStep::Reveal => Ok(None),
        }
    }
}

#[async_trait]
impl ChainHandler for InkHandler {
    fn chain_name(&self) -> &str {
        &self.chain_name
    }

    async fn sent_message_count(&self, to_chain: &str) -> Result<u128, HandlerError> {
        let raw = self.query(GET_SENT_MESSAGE_COUNT, &[json!(to_chain)]).await?;
        parse_u128(&raw).ok_or_else(|| HandlerError::BadReply(format!("message count: {raw}")))
    }

    async fn next_message_id(&self, from_chain: &str) -> Result<u128, HandlerError> {
        let raw = self
            .query(
                GET_NEXT_MESSAGE_ID,
                &[json!(from_chain), json!(self.signer.address)],
            )
            .await?;
        parse_u128(&raw).ok_or_else(|| HandlerError::BadReply(format!("next id: {raw}")))
    }

    async fn sent_message(
        &self,
        to_chain: &str,
        id: u128,
    ) -> Result<CrossChainMessage, FetchError> {
        let raw = self
            .client
            .query(GET_SENT_MESSAGE, &[json!(to_chain), json!(id.to_string())])
            .await
            .map_err(|e| FetchError::Query(e.to_string()))?;
        let raw: RawSentMessage =
            serde_json::from_value(raw).map_err(|e| FetchError::ToCoreMessage(e.to_string()))?;

        let mut sqos = Vec::with_capacity(raw.sqos.len());
        for entry in raw.sqos {
            let entry: RawSqos = serde_json::from_value(entry)
                .map_err(|e| FetchError::DecodeSqos(e.to_string()))?;
            let sqos_type = SqosType::from_name(&entry.t)
                .ok_or_else(|| FetchError::DecodeSqos(format!("unknown sqos type {}", entry.t)))?;
            let value = decode_hex(&entry.v).map_err(|e| FetchError::DecodeSqos(e.to_string()))?;
            sqos.push(SqosItem::new(sqos_type, value));
        }

        let data_bytes =
            decode_hex(&raw.content.data).map_err(|e| FetchError::DecodeData(e.to_string()))?;
        let data = decode_payload(&data_bytes).map_err(|e| FetchError::DecodeData(e.to_string()))?;

        let to_core = |field: &str| FetchError::ToCoreMessage(format!("bad field {field}"));
        let message = CrossChainMessage {
            id: parse_u128(&raw.id).ok_or_else(|| to_core("id"))?,
            from_chain: raw.from_chain,
            to_chain: raw.to_chain,
            sender: decode_hex(&raw.sender).map_err(|_| to_core("sender"))?,
            signer: decode_hex(&raw.signer).map_err(|_| to_core("signer"))?,
            sqos,
            content: Content {
                contract: decode_hex(&raw.content.contract).map_err(|_| to_core("contract"))?,
                action: decode_hex(&raw.content.action).map_err(|_| to_core("action"))?,
                data,
            },
            session: Session {
                id: parse_u128(&raw.session.id).ok_or_else(|| to_core("session.id"))?,
                session_type: raw.session.session_type,
                callback: decode_hex(&raw.session.callback).map_err(|_| to_core("callback"))?,
                commitment: decode_hex(&raw.session.commitment)
                    .map_err(|_| to_core("commitment"))?,
                answer: decode_hex(&raw.session.answer).map_err(|_| to_core("answer"))?,
            },
        };

        validate(&message)?;
        debug!(to = %to_chain, id = %id, "fetched sent message");
        Ok(message)
    }

    async fn push_message(&self, message: &CrossChainMessage) -> Result<PushOutcome, PushError> {
        let sqos: Vec<RawSqos> = message
            .sqos
            .iter()
            .map(|s| RawSqos {
                t: s.sqos_type.name().to_string(),
                v: encode_hex(&s.value),
            })
            .collect();
        let target = RawTargetMessage {
            id: message.id.to_string(),
            from_chain: message.from_chain.clone(),
            to_chain: self.chain_name.clone(),
            sender: encode_hex(&message.sender),
            signer: encode_hex(&message.signer),
            sqos,
            contract: encode_hex(&message.content.contract),
            action: encode_hex(&message.content.action),
            data: encode_hex(&encode_payload(&message.content.data)),
            session: RawTargetSession {
                id: message.session.id.to_string(),
                session_type: message.session.session_type,
                callback: encode_hex(&message.session.callback),
                commitment: encode_hex(&message.session.commitment),
                answer: encode_hex(&message.session.answer),
            },
        };
        let target =
            serde_json::to_value(&target).map_err(|e| PushError::ToTargetMessage(e.to_string()))?;

        // Reveal-gated contracts get the commit/reveal treatment instead of
        // direct delivery.
        let contract_hex = encode_hex(&message.content.contract);
        let contract_sqos = self
            .contract_sqos(&contract_hex)
            .await
            .map_err(|e| PushError::Query(e.to_string()))?;
        if matches!(&contract_sqos, Some(s) if s.sqos_type == SqosType::Reveal) {
            if let Some(outcome) = self.run_reveal(message, &contract_hex).await? {
                return Ok(outcome);
            }
        }

        self.client
            .submit(RECEIVE_MESSAGE, &[target])
            .await
            .map_err(|e| PushError::SendTransaction(e.to_string()))?;
        info!(from = %message.from_chain, id = %message.id, "pushed message");
        Ok(PushOutcome::Delivered)
    }

    async fn execute_message(&self, from_chain: &str, id: u128) -> Result<(), HandlerError> {
        self.client
            .submit(
                EXECUTE_MESSAGE,
                &[json!(from_chain), json!(id.to_string())],
            )
            .await
            .map_err(|e| HandlerError::Transaction(e.to_string()))?;
        info!(chain = %self.chain_name, from = %from_chain, id = %id, "executed message");
        Ok(())
    }

    async fn abandon_message(
        &self,
        from_chain: &str,
        id: u128,
        error_code: u16,
    ) -> Result<(), HandlerError> {
        self.client
            .submit(
                ABANDON_MESSAGE,
                &[json!(from_chain), json!(id.to_string()), json!(error_code)],
            )
            .await
            .map_err(|e| HandlerError::Transaction(e.to_string()))?;
        info!(
            chain = %self.chain_name,
            from = %from_chain,
            id = %id,
            error_code,
            "abandoned message"
        );
        Ok(())
    }

    async fn executable_messages(
        &self,
        from_chains: &[String],
    ) -> Result<Vec<MessageKey>, HandlerError> {
        let raw = self
            .query(GET_EXECUTABLE_MESSAGES, &[json!(from_chains)])
            .await?;
        let entries: Vec<(String, Value)> = serde_json::from_value(raw)
            .map_err(|e| HandlerError::BadReply(format!("executable messages: {e}")))?;
        entries
            .into_iter()
            .map(|(chain, id)| {
                let id = parse_u128(&id)
                    .ok_or_else(|| HandlerError::BadReply(format!("executable id: {id}")))?;
                Ok(MessageKey::new(chain, id))
            })
            .collect()
    }

    async fn executable_message_hash(
        &self,
        from_chain: &str,
        id: u128,
    ) -> Result<[u8; 32], HandlerError> {
        let raw = self
            .query(
                GET_EXECUTABLE_MESSAGE,
                &[json!(from_chain), json!(id.to_string())],
            )
            .await?;
        let text: String = serde_json::from_value(raw)
            .map_err(|e| HandlerError::BadReply(format!("recorded hash: {e}")))?;
        decode_hex(&text)
            .ok()
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| HandlerError::BadReply(format!("recorded hash {text}")))
    }

    async fn received_message(
        &self,
        from_chain: &str,
        id: u128,
    ) -> Result<ReceivedState, HandlerError> {
        self.received_state(from_chain, id).await
    }

    async fn challenge(
        &self,
        candidate: &CrossChainMessage,
        key: &MessageKey,
    ) -> Result<bool, HandlerError> {
        let state = self.received_state(&key.chain, key.id).await?;
        let recorded = self.executable_message_hash(&key.chain, key.id).await?;

        let group = state.groups.iter().find(|g| g.hash == recorded);
        let challenge_sqos = match group {
            Some(g) => self
                .contract_sqos(&encode_hex(&g.contract))
                .await?
                .filter(|s| s.sqos_type == SqosType::Challenge),
            None => None,
        };

        let already_challenged = if state.completed && challenge_sqos.is_some() {
            let (challengers, _) = self.sqos_message(&key.chain, key.id).await?;
            challengers.iter().any(|c| c == &self.signer.address)
        } else {
            false
        };

        let ctx = ChallengeContext {
            group_found: group.is_some(),
            challenge_configured: challenge_sqos.is_some(),
            window_ms: challenge_sqos
                .as_ref()
                .and_then(|s| s.challenge_window_ms())
                .unwrap_or(0),
            now_ms: now_ms(),
            last_received_ms: state.last_received_ms,
            completed: state.completed,
            already_challenged,
            candidate_matches: canonical_hash(candidate) == recorded,
        };

        match plan_challenge(&ctx) {
            ChallengeStep::Execute => Ok(true),
            ChallengeStep::AlreadyChallenged => {
                debug!(from = %key.chain, id = %key.id, "already challenged, deferring");
                Ok(false)
            }
            ChallengeStep::SubmitChallenge => {
                self.client
                    .submit(CHALLENGE, &[json!(key.chain), json!(key.id.to_string())])
                    .await
                    .map_err(|e| HandlerError::Transaction(e.to_string()))?;
                info!(from = %key.chain, id = %key.id, "challenged diverging message");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientError;
    use crate::message::test_message;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    const OUR_ADDRESS: &str = "5OurRelayerAddress";

    struct MockClient {
        responses: Mutex<HashMap<String, VecDeque<Value>>>,
        submissions: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl MockClient {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(HashMap::new()),
                submissions: Mutex::new(Vec::new()),
            })
        }

        fn respond(&self, method: &str, value: Value) {
            self.responses
                .lock()
                .unwrap()
                .entry(method.to_string())
                .or_default()
                .push_back(value);
        }

        fn submissions(&self) -> Vec<(String, Vec<Value>)> {
            self.submissions.lock().unwrap().clone()
        }

        fn submissions_for(&self, method: &str) -> usize {
            self.submissions()
                .iter()
                .filter(|(m, _)| m == method)
                .count()
        }
    }

    #[async_trait]
    impl ChainClient for MockClient {
        async fn query(&self, method: &str, _args: &[Value]) -> Result<Value, ClientError> {
            let mut responses = self.responses.lock().unwrap();
            let queue = responses
                .get_mut(method)
                .ok_or_else(|| ClientError::Network(format!("no response for {method}")))?;
            // Sticky last response so repeated polls see stable state.
            if queue.len() > 1 {
                Ok(queue.pop_front().unwrap())
            } else {
                queue
                    .front()
                    .cloned()
                    .ok_or_else(|| ClientError::Network(format!("exhausted {method}")))
            }
        }

        async fn submit(&self, method: &str, args: &[Value]) -> Result<(), ClientError> {
            self.submissions
                .lock()
                .unwrap()
                .push((method.to_string(), args.to_vec()));
            Ok(())
        }
    }

    fn signer() -> Signer {
        Signer {
            address: OUR_ADDRESS.into(),
            public_key: vec![9; 32],
        }
    }

    fn handler(client: Arc<MockClient>) -> InkHandler {
        InkHandler::new("SHIBUYA", client, signer())
    }

    fn raw_message_json(msg: &CrossChainMessage) -> Value {
        json!({
            "id": msg.id.to_string(),
            "fromChain": msg.from_chain,
            "toChain": msg.to_chain,
            "sender": encode_hex(&msg.sender),
            "signer": encode_hex(&msg.signer),
            "sqos": msg.sqos.iter().map(|s| json!({
                "t": s.sqos_type.name(),
                "v": encode_hex(&s.value),
            })).collect::<Vec<_>>(),
            "content": {
                "contract": encode_hex(&msg.content.contract),
                "action": encode_hex(&msg.content.action),
                "data": encode_hex(&encode_payload(&msg.content.data)),
            },
            "session": {
                "id": msg.session.id.to_string(),
                "sessionType": msg.session.session_type,
                "callback": encode_hex(&msg.session.callback),
                "commitment": encode_hex(&msg.session.commitment),
                "answer": encode_hex(&msg.session.answer),
            },
        })
    }

    #[tokio::test]
    async fn translates_sent_message() {
        let client = MockClient::new();
        let expected = test_message(42);
        client.respond(GET_SENT_MESSAGE, raw_message_json(&expected));

        let got = handler(client).sent_message("SHIBUYA", 42).await.unwrap();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn fetch_query_failure_is_recoverable() {
        let client = MockClient::new();
        let err = handler(client)
            .sent_message("SHIBUYA", 1)
            .await
            .unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.abandon_code(), None);
    }

    #[tokio::test]
    async fn fetch_rejects_unknown_sqos_type() {
        let client = MockClient::new();
        let mut raw = raw_message_json(&test_message(1));
        raw["sqos"] = json!([{"t": "SelectionDelay", "v": "0x00"}]);
        client.respond(GET_SENT_MESSAGE, raw);

        let err = handler(client).sent_message("SHIBUYA", 1).await.unwrap_err();
        assert!(matches!(err, FetchError::DecodeSqos(_)));
        assert_eq!(err.abandon_code(), Some(crate::error::codes::DECODE_SQOS));
    }

    #[tokio::test]
    async fn fetch_rejects_undecodable_payload() {
        let client = MockClient::new();
        let mut raw = raw_message_json(&test_message(1));
        raw["content"]["data"] = json!("0x01049978");
        client.respond(GET_SENT_MESSAGE, raw);

        let err = handler(client).sent_message("SHIBUYA", 1).await.unwrap_err();
        assert!(matches!(err, FetchError::DecodeData(_)));
    }

    #[tokio::test]
    async fn fetch_rejects_untranslatable_shape() {
        let client = MockClient::new();
        let mut raw = raw_message_json(&test_message(1));
        raw["id"] = json!("not-a-number");
        client.respond(GET_SENT_MESSAGE, raw);

        let err = handler(client).sent_message("SHIBUYA", 1).await.unwrap_err();
        assert!(matches!(err, FetchError::ToCoreMessage(_)));
    }

    #[tokio::test]
    async fn fetch_rejects_bad_format() {
        let client = MockClient::new();
        let mut bad = test_message(1);
        bad.sender = vec![1; 31];
        client.respond(GET_SENT_MESSAGE, raw_message_json(&bad));

        let err = handler(client).sent_message("SHIBUYA", 1).await.unwrap_err();
        assert!(matches!(err, FetchError::Format(_)));
        assert_eq!(
            err.abandon_code(),
            Some(crate::error::codes::MESSAGE_FORMAT)
        );
    }

    #[tokio::test]
    async fn push_delivers_when_no_sqos_configured() {
        let client = MockClient::new();
        client.respond(GET_SQOS, Value::Null);

        let msg = test_message(3);
        let outcome = handler(client.clone()).push_message(&msg).await.unwrap();
        assert_eq!(outcome, PushOutcome::Delivered);

        let submissions = client.submissions();
        assert_eq!(submissions.len(), 1);
        let (method, args) = &submissions[0];
        assert_eq!(method, RECEIVE_MESSAGE);
        assert_eq!(args[0]["id"], json!("3"));
        assert_eq!(args[0]["toChain"], json!("SHIBUYA"));
        assert_eq!(
            args[0]["data"],
            json!(encode_hex(&encode_payload(&msg.content.data)))
        );
    }

    fn reveal_sqos() -> Value {
        json!({"t": "Reveal", "v": "0x"})
    }

    #[tokio::test]
    async fn push_commits_hidden_hash_first() {
        let client = MockClient::new();
        client.respond(GET_SQOS, reveal_sqos());
        client.respond(GET_SQOS_MESSAGE, json!([[], false]));

        let msg = test_message(4);
        let outcome = handler(client.clone()).push_message(&msg).await.unwrap();
        assert_eq!(outcome, PushOutcome::Committed);

        let submissions = client.submissions();
        assert_eq!(submissions.len(), 1);
        let (method, args) = &submissions[0];
        assert_eq!(method, RECEIVE_HIDDEN_MESSAGE);
        let expected_hash = commitment_hash(&msg, &signer().public_key);
        assert_eq!(args[3], json!(encode_hex(&expected_hash)));
    }

    #[tokio::test]
    async fn push_commit_retry_sends_nothing() {
        let client = MockClient::new();
        client.respond(GET_SQOS, reveal_sqos());
        client.respond(
            GET_SQOS_MESSAGE,
            json!([[[OUR_ADDRESS, "0xabcd"]], false]),
        );

        let outcome = handler(client.clone())
            .push_message(&test_message(4))
            .await
            .unwrap();
        assert_eq!(outcome, PushOutcome::AlreadySubmitted);
        assert!(client.submissions().is_empty());
    }

    #[tokio::test]
    async fn push_reveals_after_completion() {
        let client = MockClient::new();
        client.respond(GET_SQOS, reveal_sqos());
        client.respond(
            GET_SQOS_MESSAGE,
            json!([[[OUR_ADDRESS, "0xabcd"]], true]),
        );
        client.respond(GET_RECEIVED_MESSAGE, json!([[], [false, 0]]));

        let outcome = handler(client.clone())
            .push_message(&test_message(4))
            .await
            .unwrap();
        assert_eq!(outcome, PushOutcome::Delivered);
        assert_eq!(client.submissions_for(RECEIVE_MESSAGE), 1);
    }

    #[tokio::test]
    async fn push_reveal_retry_sends_nothing() {
        let client = MockClient::new();
        let msg = test_message(4);
        client.respond(GET_SQOS, reveal_sqos());
        client.respond(
            GET_SQOS_MESSAGE,
            json!([[[OUR_ADDRESS, "0xabcd"]], true]),
        );
        client.respond(
            GET_RECEIVED_MESSAGE,
            json!([
                [{
                    "messageHash": encode_hex(&canonical_hash(&msg)),
                    "message": {"contract": encode_hex(&msg.content.contract)},
                    "routers": [OUR_ADDRESS],
                }],
                [true, 0],
            ]),
        );

        let outcome = handler(client.clone()).push_message(&msg).await.unwrap();
        assert_eq!(outcome, PushOutcome::AlreadySubmitted);
        assert!(client.submissions().is_empty());
    }

    #[tokio::test]
    async fn push_skips_completed_slot_without_our_commit() {
        let client = MockClient::new();
        client.respond(GET_SQOS, reveal_sqos());
        client.respond(
            GET_SQOS_MESSAGE,
            json!([[["5SomeoneElse", "0xabcd"]], true]),
        );

        let outcome = handler(client.clone())
            .push_message(&test_message(4))
            .await
            .unwrap();
        assert_eq!(outcome, PushOutcome::Skipped);
        assert!(client.submissions().is_empty());
    }

    fn challenge_state(msg: &CrossChainMessage, recorded: [u8; 32], last_ms: u128) -> Value {
        json!([
            [{
                "messageHash": encode_hex(&recorded),
                "message": {"contract": encode_hex(&msg.content.contract)},
                "routers": ["5SomeoneElse"],
            }],
            [true, last_ms as u64],
        ])
    }

    fn challenge_sqos(window_ms: u128) -> Value {
        json!({
            "t": "Challenge",
            "v": encode_hex(&window_ms.to_be_bytes()),
        })
    }

    #[tokio::test]
    async fn challenge_matching_candidate_is_executable() {
        let client = MockClient::new();
        let msg = test_message(5);
        let recorded = canonical_hash(&msg);
        client.respond(GET_RECEIVED_MESSAGE, challenge_state(&msg, recorded, now_ms()));
        client.respond(GET_EXECUTABLE_MESSAGE, json!(encode_hex(&recorded)));
        client.respond(GET_SQOS, challenge_sqos(3_600_000));
        client.respond(GET_SQOS_MESSAGE, json!([[], true]));

        let key = MessageKey::new("PLATONEVMDEV", 5);
        let executable = handler(client.clone()).challenge(&msg, &key).await.unwrap();
        assert!(executable);
        assert!(client.submissions().is_empty());
    }

    #[tokio::test]
    async fn challenge_mismatch_submits_exactly_once() {
        let client = MockClient::new();
        let msg = test_message(5);
        let mut forged = msg.clone();
        forged.content.action = vec![0, 0, 0, 0];
        let recorded = canonical_hash(&forged);

        client.respond(GET_RECEIVED_MESSAGE, challenge_state(&msg, recorded, now_ms()));
        client.respond(GET_EXECUTABLE_MESSAGE, json!(encode_hex(&recorded)));
        client.respond(GET_SQOS, challenge_sqos(3_600_000));
        // First pass: nobody has challenged. Second pass: our challenge is
        // on the ledger.
        client.respond(GET_SQOS_MESSAGE, json!([[], true]));
        client.respond(
            GET_SQOS_MESSAGE,
            json!([[[OUR_ADDRESS, "0x00"]], true]),
        );

        let key = MessageKey::new("PLATONEVMDEV", 5);
        let h = handler(client.clone());

        assert!(!h.challenge(&msg, &key).await.unwrap());
        assert_eq!(client.submissions_for(CHALLENGE), 1);

        assert!(!h.challenge(&msg, &key).await.unwrap());
        assert_eq!(client.submissions_for(CHALLENGE), 1);
    }

    #[tokio::test]
    async fn challenge_executes_after_window_elapses() {
        let client = MockClient::new();
        let msg = test_message(5);
        let mut forged = msg.clone();
        forged.content.action = vec![0, 0, 0, 0];
        let recorded = canonical_hash(&forged);

        // Last receipt far in the past, tiny window: the dispute period is
        // over even though the candidate diverges.
        client.respond(GET_RECEIVED_MESSAGE, challenge_state(&msg, recorded, 1_000));
        client.respond(GET_EXECUTABLE_MESSAGE, json!(encode_hex(&recorded)));
        client.respond(GET_SQOS, challenge_sqos(10));
        client.respond(GET_SQOS_MESSAGE, json!([[], true]));

        let key = MessageKey::new("PLATONEVMDEV", 5);
        let executable = handler(client.clone()).challenge(&msg, &key).await.unwrap();
        assert!(executable);
        assert!(client.submissions().is_empty());
    }

    #[tokio::test]
    async fn challenge_without_matching_group_is_executable() {
        let client = MockClient::new();
        let msg = test_message(5);
        client.respond(GET_RECEIVED_MESSAGE, json!([[], [false, 0]]));
        client.respond(GET_EXECUTABLE_MESSAGE, json!(encode_hex(&[7u8; 32])));

        let key = MessageKey::new("PLATONEVMDEV", 5);
        assert!(handler(client.clone()).challenge(&msg, &key).await.unwrap());
    }

    #[tokio::test]
    async fn abandon_records_error_code() {
        let client = MockClient::new();
        handler(client.clone())
            .abandon_message("PLATONEVMDEV", 9, crate::error::codes::MESSAGE_FORMAT)
            .await
            .unwrap();

        let submissions = client.submissions();
        assert_eq!(submissions.len(), 1);
        let (method, args) = &submissions[0];
        assert_eq!(method, ABANDON_MESSAGE);
        assert_eq!(args[1], json!("9"));
        assert_eq!(args[2], json!(crate::error::codes::MESSAGE_FORMAT));
    }

    #[tokio::test]
    async fn parses_counts_and_sentinel_ids() {
        let client = MockClient::new();
        client.respond(GET_SENT_MESSAGE_COUNT, json!("12"));
        client.respond(GET_NEXT_MESSAGE_ID, json!(0));

        let h = handler(client);
        assert_eq!(h.sent_message_count("PLATONEVMDEV").await.unwrap(), 12);
        assert_eq!(h.next_message_id("PLATONEVMDEV").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lists_executable_messages() {
        let client = MockClient::new();
        client.respond(
            GET_EXECUTABLE_MESSAGES,
            json!([["PLATONEVMDEV", "3"], ["ETHEREUMGOERLI", 8]]),
        );

        let keys = handler(client)
            .executable_messages(&["PLATONEVMDEV".into(), "ETHEREUMGOERLI".into()])
            .await
            .unwrap();
        assert_eq!(
            keys,
            vec![
                MessageKey::new("PLATONEVMDEV", 3),
                MessageKey::new("ETHEREUMGOERLI", 8),
            ]
        );
    }
}

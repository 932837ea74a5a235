//! Phoenix-channel realtime subscription for `postgres_changes` updates.

use std::time::Duration;

use async_stream::try_stream;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::dao::{models::PlayerRow, row_store::RowChanges, storage::StorageError};

use super::{
    config::SupabaseConfig,
    error::{SupabaseError, SupabaseResult},
};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(25);
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);
const JOIN_REF: &str = "1";

/// Frame of the Phoenix channel protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PhoenixMessage {
    topic: String,
    event: String,
    #[serde(default)]
    payload: Value,
    #[serde(rename = "ref", default)]
    reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    join_ref: Option<String>,
}

impl PhoenixMessage {
    fn join(topic: &str, schema: &str, table: &str, id: i64, access_token: &str) -> Self {
        Self {
            topic: topic.to_string(),
            event: "phx_join".into(),
            payload: json!({
                "config": {
                    "broadcast": { "self": false },
                    "presence": { "key": "" },
                    "postgres_changes": [{
                        "event": "UPDATE",
                        "schema": schema,
                        "table": table,
                        "filter": format!("id=eq.{id}"),
                    }],
                },
                "access_token": access_token,
            }),
            reference: Some(JOIN_REF.into()),
            join_ref: Some(JOIN_REF.into()),
        }
    }

    fn heartbeat(reference: u64) -> Self {
        Self {
            topic: "phoenix".into(),
            event: "heartbeat".into(),
            payload: json!({}),
            reference: Some(reference.to_string()),
            join_ref: None,
        }
    }
}

/// What a decoded frame means for the row subscription.
#[derive(Debug, PartialEq)]
enum Frame {
    Change(Box<PlayerRow>),
    Closed(String),
    Ignored,
}

fn decode_frame(text: &str, topic: &str) -> Frame {
    let message = match serde_json::from_str::<PhoenixMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            debug!(error = %err, "ignoring undecodable realtime frame");
            return Frame::Ignored;
        }
    };

    if message.topic != topic {
        return Frame::Ignored;
    }

    let record = match message.event.as_str() {
        "postgres_changes" => message.payload.pointer("/data/record"),
        "UPDATE" => message.payload.get("record"),
        "phx_close" | "phx_error" => return Frame::Closed(message.event),
        _ => None,
    };

    match record.cloned().map(serde_json::from_value::<PlayerRow>) {
        Some(Ok(row)) => Frame::Change(Box::new(row)),
        Some(Err(err)) => {
            warn!(error = %err, topic, "realtime record did not match the row model");
            Frame::Ignored
        }
        None => Frame::Ignored,
    }
}

fn join_outcome(text: &str, topic: &str) -> Option<Result<(), String>> {
    let message = serde_json::from_str::<PhoenixMessage>(text).ok()?;
    if message.topic != topic
        || message.event != "phx_reply"
        || message.reference.as_deref() != Some(JOIN_REF)
    {
        return None;
    }

    match message.payload.get("status").and_then(Value::as_str) {
        Some("ok") => Some(Ok(())),
        _ => Some(Err(message
            .payload
            .pointer("/response/reason")
            .and_then(Value::as_str)
            .unwrap_or("join refused")
            .to_string())),
    }
}

enum Inbound {
    Heartbeat,
    Frame(Option<Result<Message, tokio_tungstenite::tungstenite::Error>>),
}

/// Open a websocket, join the per-row channel, and stream its updates.
pub(super) async fn subscribe_row(
    config: &SupabaseConfig,
    table: &str,
    id: i64,
) -> SupabaseResult<RowChanges> {
    let (mut socket, _response) = connect_async(config.realtime_url())
        .await
        .map_err(|source| SupabaseError::Realtime { source })?;

    let topic = format!("realtime:{table}-row-{id}");
    let join = PhoenixMessage::join(&topic, &config.schema, table, id, &config.api_key);
    let join = serde_json::to_string(&join).unwrap_or_default();
    socket
        .send(Message::Text(join))
        .await
        .map_err(|source| SupabaseError::Realtime { source })?;

    let joined = timeout(JOIN_TIMEOUT, async {
        while let Some(frame) = socket.next().await {
            match frame {
                Ok(Message::Text(text)) => {
                    if let Some(outcome) = join_outcome(&text, &topic) {
                        return outcome;
                    }
                }
                Ok(Message::Close(_)) => return Err("socket closed during join".to_string()),
                Ok(_) => {}
                Err(err) => return Err(err.to_string()),
            }
        }
        Err("socket ended during join".to_string())
    })
    .await
    .unwrap_or_else(|_| Err("join timed out".to_string()));

    if let Err(reason) = joined {
        return Err(SupabaseError::JoinRejected { topic, reason });
    }
    info!(%topic, "joined realtime channel");

    let table = table.to_string();
    let stream = try_stream! {
        let mut heartbeat = interval(HEARTBEAT_INTERVAL);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        heartbeat.tick().await;
        let mut next_ref: u64 = 2;

        loop {
            let inbound = tokio::select! {
                _ = heartbeat.tick() => Inbound::Heartbeat,
                frame = socket.next() => Inbound::Frame(frame),
            };

            match inbound {
                Inbound::Heartbeat => {
                    let beat = serde_json::to_string(&PhoenixMessage::heartbeat(next_ref))
                        .unwrap_or_default();
                    next_ref += 1;
                    socket
                        .send(Message::Text(beat))
                        .await
                        .map_err(|source| StorageError::from(SupabaseError::Realtime { source }))?;
                }
                Inbound::Frame(Some(Ok(Message::Text(text)))) => match decode_frame(&text, &topic) {
                    Frame::Change(row) => yield *row,
                    Frame::Closed(event) => {
                        warn!(%topic, %event, "realtime channel closed by server");
                        Err(StorageError::SubscriptionClosed { table: table.clone(), id })?;
                    }
                    Frame::Ignored => {}
                },
                Inbound::Frame(Some(Ok(Message::Close(_)))) | Inbound::Frame(None) => {
                    Err(StorageError::SubscriptionClosed { table: table.clone(), id })?;
                }
                Inbound::Frame(Some(Ok(_))) => {}
                Inbound::Frame(Some(Err(source))) => {
                    Err(StorageError::from(SupabaseError::Realtime { source }))?;
                }
            }
        }
    };

    Ok(stream.boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPIC: &str = "realtime:Stage1Scoreboard-row-1";

    #[test]
    fn decodes_postgres_change_record() {
        let text = json!({
            "topic": TOPIC,
            "event": "postgres_changes",
            "payload": {
                "ids": [1],
                "data": {
                    "type": "UPDATE",
                    "table": "Stage1Scoreboard",
                    "record": { "id": 1, "lifePoints": 7600, "phase": "Battle Phase" }
                }
            },
            "ref": null
        })
        .to_string();

        match decode_frame(&text, TOPIC) {
            Frame::Change(row) => {
                assert_eq!(row.id, 1);
                assert_eq!(row.life_points, Some(7600));
            }
            other => panic!("expected change, got {other:?}"),
        }
    }

    #[test]
    fn ignores_other_topics_and_events() {
        let other_topic = json!({
            "topic": "realtime:Stage1Scoreboard-row-2",
            "event": "postgres_changes",
            "payload": { "data": { "record": { "id": 2 } } }
        })
        .to_string();
        assert_eq!(decode_frame(&other_topic, TOPIC), Frame::Ignored);

        let presence = json!({ "topic": TOPIC, "event": "presence_state", "payload": {} }).to_string();
        assert_eq!(decode_frame(&presence, TOPIC), Frame::Ignored);
        assert_eq!(decode_frame("not json", TOPIC), Frame::Ignored);
    }

    #[test]
    fn reports_channel_close() {
        let text = json!({ "topic": TOPIC, "event": "phx_error", "payload": {} }).to_string();
        assert_eq!(decode_frame(&text, TOPIC), Frame::Closed("phx_error".into()));
    }

    #[test]
    fn reads_join_reply_status() {
        let ok = json!({
            "topic": TOPIC, "event": "phx_reply", "ref": "1",
            "payload": { "status": "ok", "response": {} }
        })
        .to_string();
        assert_eq!(join_outcome(&ok, TOPIC), Some(Ok(())));

        let refused = json!({
            "topic": TOPIC, "event": "phx_reply", "ref": "1",
            "payload": { "status": "error", "response": { "reason": "unauthorized" } }
        })
        .to_string();
        assert_eq!(join_outcome(&refused, TOPIC), Some(Err("unauthorized".into())));

        let heartbeat_reply = json!({
            "topic": "phoenix", "event": "phx_reply", "ref": "2",
            "payload": { "status": "ok" }
        })
        .to_string();
        assert_eq!(join_outcome(&heartbeat_reply, TOPIC), None);
    }
}

//! Escalation policies (REST v3).

use super::{required, EntityRef};
use crate::cancel::CancelToken;
use crate::client::ApiClient;
use crate::encode::{
    block, blocks, encode_default, AttrValue, AttributeMap, Encode, Field, Projectable, ToAttribute,
};
use crate::error::{ApiError, EncodingError};
use crate::request::CallDescriptor;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EscalationPolicy {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub owner: Option<EntityRef>,
    #[serde(default)]
    pub is_repeat_enabled: bool,
    #[serde(default)]
    pub repeat_times: u32,
    #[serde(default)]
    pub repeat_after_minutes: u32,
    #[serde(default)]
    pub rules: Vec<EscalationRule>,
}

impl Projectable for EscalationPolicy {
    const RECORD: &'static str = "EscalationPolicy";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("id", "id", |p| p.id.to_attribute()),
        Field::attr("name", "name", |p| p.name.to_attribute()),
        Field::attr("description", "description", |p| p.description.to_attribute()),
        Field::attr("rules", "rules", |p| blocks(&p.rules)),
        Field::internal("owner"),
        Field::internal("is_repeat_enabled"),
        Field::internal("repeat_times"),
        Field::internal("repeat_after_minutes"),
    ];
}

impl Encode for EscalationPolicy {
    fn encode(&self) -> Result<AttributeMap, EncodingError> {
        let mut map = encode_default(self)?;
        if let Some(owner) = &self.owner {
            map.insert("team_id".into(), AttrValue::String(owner.id.clone()));
        }
        let repeat = self.is_repeat_enabled.then(|| Repeat {
            times: self.repeat_times,
            delay_minutes: self.repeat_after_minutes,
        });
        if let Some(value) = block(&repeat)? {
            map.insert("repeat".into(), value);
        }
        Ok(map)
    }
}

struct Repeat {
    times: u32,
    delay_minutes: u32,
}

impl Projectable for Repeat {
    const RECORD: &'static str = "Repeat";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("times", "times", |r| r.times.to_attribute()),
        Field::attr("delay_minutes", "delay_minutes", |r| r.delay_minutes.to_attribute()),
    ];
}

impl Encode for Repeat {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EscalationRule {
    pub delay_minutes: u32,
    #[serde(default)]
    pub targets: Vec<EntityRef>,
    #[serde(default)]
    pub round_robin: Option<RoundRobin>,
}

impl Projectable for EscalationRule {
    const RECORD: &'static str = "EscalationRule";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("delay_minutes", "delay_minutes", |r| r.delay_minutes.to_attribute()),
        Field::attr("targets", "targets", |r| blocks(&r.targets)),
        Field::attr("round_robin", "round_robin", |r| {
            block(&r.round_robin.as_ref().filter(|rr| rr.enabled).cloned())
        }),
    ];
}

impl Encode for EscalationRule {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundRobin {
    pub enabled: bool,
    #[serde(default)]
    pub rotation: Option<RoundRobinRotation>,
}

impl Projectable for RoundRobin {
    const RECORD: &'static str = "RoundRobin";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("enabled", "enabled", |r| r.enabled.to_attribute()),
        Field::attr("rotation", "rotation", |r| block(&r.rotation)),
    ];
}

impl Encode for RoundRobin {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RoundRobinRotation {
    pub enabled: bool,
    pub delay_minutes: u32,
}

impl Projectable for RoundRobinRotation {
    const RECORD: &'static str = "RoundRobinRotation";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("enabled", "enabled", |r| r.enabled.to_attribute()),
        Field::attr("delay_minutes", "delay_minutes", |r| r.delay_minutes.to_attribute()),
    ];
}

impl Encode for RoundRobinRotation {}

#[derive(Clone, Debug, Serialize)]
pub struct EscalationPolicyRequest {
    pub name: String,
    pub description: String,
    pub owner_id: String,
    pub is_repeat_enabled: bool,
    pub repeat_times: u32,
    pub repeat_after_minutes: u32,
    pub rules: Vec<EscalationRule>,
}

impl ApiClient {
    pub async fn get_escalation_policy(
        &self,
        id: &str,
        cancel: &CancelToken,
    ) -> Result<Option<EscalationPolicy>, ApiError> {
        let url = self.v3(&format!("escalation-policies/{id}"));
        self.execute(CallDescriptor::get(url, cancel)).await
    }

    pub async fn create_escalation_policy(
        &self,
        req: &EscalationPolicyRequest,
        cancel: &CancelToken,
    ) -> Result<EscalationPolicy, ApiError> {
        let url = self.v3("escalation-policies");
        let policy = self
            .execute(CallDescriptor::new(Method::POST, url.clone(), cancel).with_payload(req))
            .await?;
        required(policy, Method::POST, &url)
    }

    pub async fn delete_escalation_policy(
        &self,
        id: &str,
        cancel: &CancelToken,
    ) -> Result<(), ApiError> {
        let url = self.v3(&format!("escalation-policies/{id}"));
        self.execute::<(), Value>(CallDescriptor::delete(url, cancel)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy(repeat: bool) -> EscalationPolicy {
        serde_json::from_value(json!({
            "id": "ep1",
            "name": "Primary",
            "owner": {"id": "t1", "type": "team"},
            "is_repeat_enabled": repeat,
            "repeat_times": 2,
            "repeat_after_minutes": 15,
            "rules": [
                {
                    "delay_minutes": 0,
                    "targets": [{"id": "u1", "type": "user"}],
                    "round_robin": {"enabled": true, "rotation": {"enabled": true, "delay_minutes": 5}}
                },
                {
                    "delay_minutes": 10,
                    "targets": [{"id": "sq1", "type": "squad"}],
                    "round_robin": {"enabled": false}
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn repeat_block_only_when_enabled() {
        let map = policy(true).encode().unwrap();
        let repeat = map["repeat"].as_list().unwrap();
        assert_eq!(repeat.len(), 1);
        assert_eq!(repeat[0].as_map().unwrap()["times"], AttrValue::Int(2));

        let map = policy(false).encode().unwrap();
        assert!(!map.contains_key("repeat"));
    }

    #[test]
    fn disabled_round_robin_is_omitted() {
        let map = policy(false).encode().unwrap();
        let rules = map["rules"].as_list().unwrap();
        let first = rules[0].as_map().unwrap();
        let second = rules[1].as_map().unwrap();
        let rr = first["round_robin"].as_list().unwrap()[0].as_map().unwrap();
        assert_eq!(rr["rotation"].as_list().unwrap().len(), 1);
        assert!(!second.contains_key("round_robin"));
    }
}

//! Services (REST v3).

use super::{required, with_query, EntityRef};
use crate::cancel::CancelToken;
use crate::client::ApiClient;
use crate::encode::{
    block, encode_default, pairs, AttrValue, AttributeMap, Encode, Field, Projectable, ToAttribute,
};
use crate::error::{ApiError, EncodingError};
use crate::request::CallDescriptor;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    pub escalation_policy_id: String,
    #[serde(default)]
    pub email_prefix: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub owner: Option<EntityRef>,
    #[serde(default)]
    pub maintainer: Option<EntityRef>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub active_alert_source_ids: Vec<String>,
    #[serde(default)]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Projectable for Service {
    const RECORD: &'static str = "Service";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("id", "id", |s| s.id.to_attribute()),
        Field::attr("name", "name", |s| s.name.to_attribute()),
        Field::attr("description", "description", |s| s.description.to_attribute()),
        Field::attr("escalation_policy_id", "escalation_policy_id", |s| {
            s.escalation_policy_id.to_attribute()
        }),
        Field::attr("email_prefix", "email_prefix", |s| s.email_prefix.to_attribute()),
        Field::attr("email", "email", |s| s.email.to_attribute()),
        Field::excluded("api_key", "api_key"),
        Field::attr("maintainer", "maintainer", |s| block(&s.maintainer)),
        Field::attr("tags", "tags", |s| pairs(&s.tags)),
        Field::attr("created_at", "created_at", |s| s.created_at.to_attribute()),
        Field::internal("slug"),
        Field::internal("owner"),
        Field::internal("active_alert_source_ids"),
    ];
}

impl Encode for Service {
    /// The owner is flattened to `team_id`; only team ownership is modelled in state.
    fn encode(&self) -> Result<AttributeMap, EncodingError> {
        let mut map = encode_default(self)?;
        if let Some(owner) = &self.owner {
            map.insert("team_id".into(), AttrValue::String(owner.id.clone()));
        }
        Ok(map)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ServiceRequest {
    pub name: String,
    pub description: String,
    pub escalation_policy_id: String,
    pub owner_id: String,
    pub email_prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer: Option<EntityRef>,
    pub tags: HashMap<String, String>,
}

impl ApiClient {
    pub async fn get_service(
        &self,
        id: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Service>, ApiError> {
        let url = self.v3(&format!("services/{id}"));
        self.execute(CallDescriptor::get(url, cancel)).await
    }

    pub async fn find_service_by_name(
        &self,
        team_id: &str,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Service>, ApiError> {
        let url = with_query(
            &self.v3("services/by-name"),
            &[("name", name), ("owner_id", team_id)],
        );
        self.execute(CallDescriptor::get(url, cancel)).await
    }

    pub async fn create_service(
        &self,
        req: &ServiceRequest,
        cancel: &CancelToken,
    ) -> Result<Service, ApiError> {
        let url = self.v3("services");
        let service = self
            .execute(CallDescriptor::new(Method::POST, url.clone(), cancel).with_payload(req))
            .await?;
        required(service, Method::POST, &url)
    }

    pub async fn update_service(
        &self,
        id: &str,
        req: &ServiceRequest,
        cancel: &CancelToken,
    ) -> Result<Service, ApiError> {
        let url = self.v3(&format!("services/{id}"));
        let service = self
            .execute(CallDescriptor::new(Method::PUT, url.clone(), cancel).with_payload(req))
            .await?;
        required(service, Method::PUT, &url)
    }

    pub async fn delete_service(&self, id: &str, cancel: &CancelToken) -> Result<(), ApiError> {
        let url = self.v3(&format!("services/{id}"));
        self.execute::<(), Value>(CallDescriptor::delete(url, cancel)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service() -> Service {
        serde_json::from_value(json!({
            "id": "s1",
            "name": "checkout",
            "slug": "checkout",
            "escalation_policy_id": "ep1",
            "api_key": "very-secret",
            "owner": {"id": "t1", "type": "team", "name": "Core"},
            "maintainer": {"id": "u1", "type": "user", "name": "Ada"},
            "tags": {"tier": "1", "env": "prod"},
            "created_at": "2024-05-01T12:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn owner_is_flattened_to_team_id() {
        let map = service().encode().unwrap();
        assert_eq!(map["team_id"], AttrValue::String("t1".into()));
        assert!(!map.contains_key("owner"));
        assert!(!map.contains_key("api_key"));
    }

    #[test]
    fn maintainer_block_drops_name() {
        let map = service().encode().unwrap();
        let maintainer = map["maintainer"].as_list().unwrap()[0].as_map().unwrap();
        let keys: Vec<&str> = maintainer.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "type"]);
    }

    #[test]
    fn tags_are_sorted_pairs() {
        let map = service().encode().unwrap();
        let first = map["tags"].as_list().unwrap()[0].as_map().unwrap();
        assert_eq!(first["key"], AttrValue::String("env".into()));
        assert_eq!(first["value"], AttrValue::String("prod".into()));
    }

    #[test]
    fn repeated_encodes_are_identical() {
        let s = service();
        assert_eq!(s.encode().unwrap(), s.encode().unwrap());
    }
}

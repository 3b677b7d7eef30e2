//! Users (REST v3). Read-only here; membership changes go through teams.

use super::with_query;
use crate::cancel::CancelToken;
use crate::client::ApiClient;
use crate::encode::{
    block, encode_default, flags, AttrValue, AttributeMap, Encode, Field, Projectable, ToAttribute,
};
use crate::error::{ApiError, EncodingError};
use crate::request::CallDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub time_zone: String,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub contact: Option<Contact>,
    #[serde(default)]
    pub abilities: HashMap<String, bool>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Projectable for User {
    const RECORD: &'static str = "User";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("id", "id", |u| u.id.to_attribute()),
        Field::attr("first_name", "first_name", |u| u.first_name.to_attribute()),
        Field::attr("last_name", "last_name", |u| u.last_name.to_attribute()),
        Field::attr("email", "email", |u| u.email.to_attribute()),
        Field::attr("role", "role", |u| u.role.to_attribute()),
        Field::attr("time_zone", "time_zone", |u| u.time_zone.to_attribute()),
        Field::attr("is_email_verified", "is_email_verified", |u| {
            u.is_email_verified.to_attribute()
        }),
        Field::attr("contact", "contact", |u| block(&u.contact)),
        Field::attr("abilities", "abilities", |u| flags(&u.abilities)),
        Field::excluded("avatar_url", "avatar_url"),
    ];
}

impl Encode for User {
    fn encode(&self) -> Result<AttributeMap, EncodingError> {
        let mut map = encode_default(self)?;
        let name = format!("{} {}", self.first_name, self.last_name);
        map.insert("name".into(), AttrValue::String(name.trim().to_string()));
        if let Some(username) = email_local_part(&self.email) {
            map.insert("username".into(), AttrValue::String(username.to_string()));
        }
        Ok(map)
    }
}

fn email_local_part(email: &str) -> Option<&str> {
    email.split_once('@').map(|(local, _)| local).filter(|l| !l.is_empty())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contact {
    pub dial_code: String,
    pub phone_number: String,
}

impl Projectable for Contact {
    const RECORD: &'static str = "Contact";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("dial_code", "dial_code", |c| c.dial_code.to_attribute()),
        Field::attr("phone_number", "phone_number", |c| c.phone_number.to_attribute()),
    ];
}

impl Encode for Contact {}

impl ApiClient {
    pub async fn get_user(&self, id: &str, cancel: &CancelToken) -> Result<Option<User>, ApiError> {
        let url = self.v3(&format!("users/{id}"));
        self.execute(CallDescriptor::get(url, cancel)).await
    }

    pub async fn list_users(&self, cancel: &CancelToken) -> Result<Vec<User>, ApiError> {
        let url = self.v3("users");
        self.execute_slice(CallDescriptor::get(url, cancel)).await
    }

    pub async fn find_user_by_email(
        &self,
        email: &str,
        cancel: &CancelToken,
    ) -> Result<Option<User>, ApiError> {
        let url = with_query(&self.v3("users"), &[("email", email)]);
        let users: Vec<User> = self.execute_slice(CallDescriptor::get(url, cancel)).await?;
        Ok(users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(email: &str) -> User {
        serde_json::from_value(json!({
            "id": "u1",
            "first_name": "Ada",
            "last_name": "Lovelace",
            "email": email,
            "role": "user",
            "avatar_url": "https://cdn.example.com/a.png",
            "contact": {"dial_code": "+44", "phone_number": "7000000000"}
        }))
        .unwrap()
    }

    #[test]
    fn derives_username_and_name() {
        let map = user("ada.l@example.com").encode().unwrap();
        assert_eq!(map["username"], AttrValue::String("ada.l".into()));
        assert_eq!(map["name"], AttrValue::String("Ada Lovelace".into()));
        assert!(!map.contains_key("avatar_url"));
    }

    #[test]
    fn malformed_email_has_no_username() {
        let map = user("@example.com").encode().unwrap();
        assert!(!map.contains_key("username"));
    }

    #[test]
    fn contact_is_single_block() {
        let map = user("ada@example.com").encode().unwrap();
        let contact = map["contact"].as_list().unwrap();
        assert_eq!(contact.len(), 1);
        assert_eq!(
            contact[0].as_map().unwrap()["dial_code"],
            AttrValue::String("+44".into())
        );
    }
}

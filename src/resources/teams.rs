//! Teams (REST v3).

use super::{required, with_query};
use crate::cancel::CancelToken;
use crate::client::ApiClient;
use crate::encode::{blocks, flags, Encode, Field, Projectable, ToAttribute};
use crate::error::ApiError;
use crate::request::CallDescriptor;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub members: Vec<TeamMember>,
    #[serde(default)]
    pub roles: Vec<TeamRole>,
}

impl Projectable for Team {
    const RECORD: &'static str = "Team";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("id", "id", |t| t.id.to_attribute()),
        Field::attr("name", "name", |t| t.name.to_attribute()),
        Field::attr("description", "description", |t| t.description.to_attribute()),
        Field::attr("default", "default", |t| t.default.to_attribute()),
        Field::attr("members", "members", |t| blocks(&t.members)),
        // Roles are managed through their own resource.
        Field::internal("roles"),
    ];
}

impl Encode for Team {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeamMember {
    pub user_id: String,
    #[serde(default)]
    pub role_ids: Vec<String>,
}

impl Projectable for TeamMember {
    const RECORD: &'static str = "TeamMember";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("user_id", "user_id", |m| m.user_id.to_attribute()),
        Field::attr("role_ids", "role_ids", |m| m.role_ids.to_attribute()),
    ];
}

impl Encode for TeamMember {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TeamRole {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub abilities: HashMap<String, bool>,
}

impl Projectable for TeamRole {
    const RECORD: &'static str = "TeamRole";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("id", "id", |r| r.id.to_attribute()),
        Field::attr("name", "name", |r| r.name.to_attribute()),
        Field::attr("default", "default", |r| r.default.to_attribute()),
        Field::attr("abilities", "abilities", |r| flags(&r.abilities)),
    ];
}

impl Encode for TeamRole {}

#[derive(Clone, Debug, Serialize)]
pub struct CreateTeam {
    pub name: String,
    pub description: String,
    pub members: Vec<TeamMember>,
}

#[derive(Clone, Debug, Serialize)]
pub struct UpdateTeam {
    pub name: String,
    pub description: String,
}

impl ApiClient {
    pub async fn get_team(&self, id: &str, cancel: &CancelToken) -> Result<Option<Team>, ApiError> {
        let url = self.v3(&format!("teams/{id}"));
        self.execute(CallDescriptor::get(url, cancel)).await
    }

    pub async fn find_team_by_name(
        &self,
        name: &str,
        cancel: &CancelToken,
    ) -> Result<Option<Team>, ApiError> {
        let url = with_query(&self.v3("teams/by-name"), &[("name", name)]);
        self.execute(CallDescriptor::get(url, cancel)).await
    }

    pub async fn list_teams(&self, cancel: &CancelToken) -> Result<Vec<Team>, ApiError> {
        let url = self.v3("teams");
        self.execute_slice(CallDescriptor::get(url, cancel)).await
    }

    pub async fn list_team_roles(
        &self,
        team_id: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<TeamRole>, ApiError> {
        let url = self.v3(&format!("teams/{team_id}/roles"));
        self.execute_slice(CallDescriptor::get(url, cancel)).await
    }

    pub async fn create_team(
        &self,
        req: &CreateTeam,
        cancel: &CancelToken,
    ) -> Result<Team, ApiError> {
        let url = self.v3("teams");
        let team = self
            .execute(CallDescriptor::new(Method::POST, url.clone(), cancel).with_payload(req))
            .await?;
        required(team, Method::POST, &url)
    }

    pub async fn update_team(
        &self,
        id: &str,
        req: &UpdateTeam,
        cancel: &CancelToken,
    ) -> Result<Team, ApiError> {
        let url = self.v3(&format!("teams/{id}"));
        let team = self
            .execute(CallDescriptor::new(Method::PATCH, url.clone(), cancel).with_payload(req))
            .await?;
        required(team, Method::PATCH, &url)
    }

    pub async fn delete_team(&self, id: &str, cancel: &CancelToken) -> Result<(), ApiError> {
        let url = self.v3(&format!("teams/{id}"));
        self.execute::<(), Value>(CallDescriptor::delete(url, cancel)).await?;
        Ok(())
    }
}

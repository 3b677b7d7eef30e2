//! Schedules and rotations (GraphQL).

use crate::cancel::CancelToken;
use crate::client::ApiClient;
use crate::encode::{
    blocks, encode_default, one_of, AttributeMap, Encode, Field, Projectable, ToAttribute,
};
use crate::error::{ApiError, EncodingError};
use crate::graphql::{GraphQLObject, GraphQLOperation, OperationKind, Selection, Variables};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(rename = "ID")]
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "teamID")]
    pub team_id: String,
    pub time_zone: String,
    #[serde(default)]
    pub paused: bool,
    #[serde(default)]
    pub tags: Vec<ScheduleTag>,
}

impl GraphQLObject for Schedule {
    fn selection() -> Selection {
        Selection::fields(&["ID", "name", "description", "teamID", "timeZone", "paused"])
            .nested("tags", ScheduleTag::selection())
    }
}

impl Projectable for Schedule {
    const RECORD: &'static str = "Schedule";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("id", "id", |s| s.id.to_attribute()),
        Field::attr("name", "name", |s| s.name.to_attribute()),
        Field::attr("description", "description", |s| s.description.to_attribute()),
        Field::attr("team_id", "team_id", |s| s.team_id.to_attribute()),
        Field::attr("time_zone", "timezone", |s| s.time_zone.to_attribute()),
        Field::attr("tags", "tags", |s| blocks(&s.tags)),
        Field::internal("paused"),
    ];
}

impl Encode for Schedule {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleTag {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub color: String,
}

impl GraphQLObject for ScheduleTag {
    fn selection() -> Selection {
        Selection::fields(&["key", "value", "color"])
    }
}

impl Projectable for ScheduleTag {
    const RECORD: &'static str = "ScheduleTag";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("key", "key", |t| t.key.to_attribute()),
        Field::attr("value", "value", |t| t.value.to_attribute()),
        Field::attr("color", "color", |t| t.color.to_attribute()),
    ];
}

impl Encode for ScheduleTag {}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "scheduleID")]
    pub schedule_id: i64,
    pub name: String,
    #[serde(default)]
    pub color: String,
    pub start_date: DateTime<Utc>,
    pub period: String,
    #[serde(default)]
    pub change_participants_frequency: u32,
    #[serde(default)]
    pub participant_groups: Vec<ParticipantGroup>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ends_after_iterations: Option<u32>,
}

impl GraphQLObject for Rotation {
    fn selection() -> Selection {
        Selection::fields(&[
            "ID",
            "scheduleID",
            "name",
            "color",
            "startDate",
            "period",
            "changeParticipantsFrequency",
            "endDate",
            "endsAfterIterations",
        ])
        .nested("participantGroups", ParticipantGroup::selection())
    }
}

impl Projectable for Rotation {
    const RECORD: &'static str = "Rotation";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("id", "id", |r| r.id.to_attribute()),
        Field::attr("schedule_id", "schedule_id", |r| r.schedule_id.to_attribute()),
        Field::attr("name", "name", |r| r.name.to_attribute()),
        Field::attr("color", "color", |r| r.color.to_attribute()),
        Field::attr("start_date", "start_date", |r| r.start_date.to_attribute()),
        Field::attr("period", "period", |r| r.period.to_attribute()),
        Field::attr("change_participants_frequency", "change_participants_frequency", |r| {
            r.change_participants_frequency.to_attribute()
        }),
        Field::attr("participant_groups", "participant_groups", |r| {
            blocks(&r.participant_groups)
        }),
        Field::attr("end_date", "end_date", |r| r.end_date.to_attribute()),
        Field::attr("ends_after_iterations", "ends_after_iterations", |r| {
            r.ends_after_iterations.to_attribute()
        }),
    ];
}

impl Encode for Rotation {
    fn encode(&self) -> Result<AttributeMap, EncodingError> {
        let mut map = encode_default(self)?;
        let end_type = one_of(&[
            (self.end_date.is_some(), "date"),
            (self.ends_after_iterations.is_some(), "after_iterations"),
            (true, "never"),
        ]);
        if let Some(end_type) = end_type {
            map.insert("end_type".into(), end_type);
        }
        Ok(map)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParticipantGroup {
    #[serde(default)]
    pub participants: Vec<Participant>,
}

impl GraphQLObject for ParticipantGroup {
    fn selection() -> Selection {
        Selection::new().nested("participants", Participant::selection())
    }
}

impl Projectable for ParticipantGroup {
    const RECORD: &'static str = "ParticipantGroup";
    const FIELDS: &'static [Field<Self>] = &[Field::attr("participants", "participants", |g| {
        blocks(&g.participants)
    })];
}

impl Encode for ParticipantGroup {}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl GraphQLObject for Participant {
    fn selection() -> Selection {
        Selection::fields(&["ID", "type"])
    }
}

impl Projectable for Participant {
    const RECORD: &'static str = "Participant";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("id", "id", |p| p.id.to_attribute()),
        Field::attr("kind", "type", |p| p.kind.to_attribute()),
    ];
}

impl Encode for Participant {}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleInput {
    pub name: String,
    pub description: String,
    #[serde(rename = "teamID")]
    pub team_id: String,
    pub time_zone: String,
    pub tags: Vec<ScheduleTag>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRotationInput {
    pub name: String,
    pub color: String,
    pub start_date: DateTime<Utc>,
    pub period: String,
    pub change_participants_frequency: u32,
    pub participant_groups: Vec<ParticipantGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_after_iterations: Option<u32>,
}

pub struct CreateSchedule;

impl GraphQLOperation for CreateSchedule {
    type Output = Schedule;
    const FIELD: &'static str = "createSchedule(input: $input)";
}

pub struct GetSchedule;

impl GraphQLOperation for GetSchedule {
    type Output = Option<Schedule>;
    const FIELD: &'static str = "schedule(ID: $ID)";
}

pub struct DeleteSchedule;

impl GraphQLOperation for DeleteSchedule {
    type Output = bool;
    const FIELD: &'static str = "deleteSchedule(ID: $ID)";
}

pub struct CreateRotation;

impl GraphQLOperation for CreateRotation {
    type Output = Rotation;
    const FIELD: &'static str = "createRotation(scheduleID: $scheduleID, input: $input)";
}

fn input_error(operation: &str, e: serde_json::Error) -> ApiError {
    ApiError::GraphQL {
        operation: operation.to_string(),
        status: 0,
        messages: vec![format!("failed to serialize input: {e}")],
    }
}

impl ApiClient {
    pub async fn create_schedule(
        &self,
        input: &CreateScheduleInput,
        cancel: &CancelToken,
    ) -> Result<Schedule, ApiError> {
        let vars = Variables::new()
            .with_input("input", "NewSchedule!", input)
            .map_err(|e| input_error("createSchedule", e))?;
        self.graphql::<CreateSchedule>(OperationKind::Mutate, &vars, cancel)
            .await
    }

    pub async fn get_schedule(
        &self,
        id: i64,
        cancel: &CancelToken,
    ) -> Result<Option<Schedule>, ApiError> {
        let vars = Variables::new().with("ID", "Int!", id);
        self.graphql::<GetSchedule>(OperationKind::Query, &vars, cancel)
            .await
    }

    pub async fn delete_schedule(&self, id: i64, cancel: &CancelToken) -> Result<(), ApiError> {
        let vars = Variables::new().with("ID", "Int!", id);
        self.graphql::<DeleteSchedule>(OperationKind::Mutate, &vars, cancel)
            .await?;
        Ok(())
    }

    pub async fn create_rotation(
        &self,
        schedule_id: i64,
        input: &CreateRotationInput,
        cancel: &CancelToken,
    ) -> Result<Rotation, ApiError> {
        let vars = Variables::new()
            .with("scheduleID", "Int!", schedule_id)
            .with_input("input", "CreateRotation!", input)
            .map_err(|e| input_error("createRotation", e))?;
        self.graphql::<CreateRotation>(OperationKind::Mutate, &vars, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::AttrValue;
    use crate::graphql::build_request;
    use serde_json::json;

    fn rotation(extra: serde_json::Value) -> Rotation {
        let mut base = json!({
            "ID": 11,
            "scheduleID": 3,
            "name": "weekly",
            "startDate": "2024-06-03T09:00:00Z",
            "period": "weekly",
            "participantGroups": [{"participants": [{"ID": "u1", "type": "user"}]}]
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        serde_json::from_value(base).unwrap()
    }

    #[test]
    fn end_type_follows_end_settings() {
        let never = rotation(json!({})).encode().unwrap();
        assert_eq!(never["end_type"], AttrValue::String("never".into()));

        let counted = rotation(json!({"endsAfterIterations": 4})).encode().unwrap();
        assert_eq!(counted["end_type"], AttrValue::String("after_iterations".into()));
        assert_eq!(counted["ends_after_iterations"], AttrValue::Int(4));

        let dated = rotation(json!({"endDate": "2024-12-31T00:00:00Z"})).encode().unwrap();
        assert_eq!(dated["end_type"], AttrValue::String("date".into()));
        assert_eq!(dated["end_date"], AttrValue::String("2024-12-31T00:00:00Z".into()));
    }

    #[test]
    fn nested_participants_encode_as_blocks() {
        let map = rotation(json!({})).encode().unwrap();
        let groups = map["participant_groups"].as_list().unwrap();
        let participants = groups[0].as_map().unwrap()["participants"].as_list().unwrap();
        assert_eq!(
            participants[0].as_map().unwrap()["type"],
            AttrValue::String("user".into())
        );
    }

    #[test]
    fn delete_query_has_no_selection() {
        let vars = Variables::new().with("ID", "Int!", 7);
        let request = build_request::<DeleteSchedule>(OperationKind::Mutate, &vars).unwrap();
        assert_eq!(request.query, "mutation ($ID: Int!) { deleteSchedule(ID: $ID) }");
    }

    #[test]
    fn create_rotation_query_declares_both_variables() {
        let vars = Variables::new()
            .with("scheduleID", "Int!", 3)
            .with("input", "CreateRotation!", json!({"name": "weekly"}));
        let request = build_request::<CreateRotation>(OperationKind::Mutate, &vars).unwrap();
        assert!(request.query.starts_with(
            "mutation ($scheduleID: Int!, $input: CreateRotation!) \
             { createRotation(scheduleID: $scheduleID, input: $input) {"
        ));
        assert!(request.query.contains("participantGroups { participants { ID type } }"));
    }
}

// Typed client for the student service endpoints

use std::sync::Arc;

use reqwest::Method;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use repit_common::{LeaderboardPeriod, StreakKind};
use repit_gamification::{
    EarnedAchievement, LeaderboardEntry, LevelUp, StatsDelta, StreakCounter, StudentDashboard,
    XpAward, XpAwardRequest, XpGrant,
};
use repit_persistence::{NewStudent, StudentProfile};

use crate::error::{ClientError, Result};
use crate::http::ServiceHttpClient;

pub const STUDENT_SERVICE: &str = "student";

/// `{code, message, data}` wrapper the services put around every payload
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub(crate) code: i32,
    #[serde(default)]
    pub(crate) message: String,
    pub(crate) data: Option<T>,
}

pub(crate) fn unwrap_envelope<T: DeserializeOwned>(value: Value) -> Result<Option<T>> {
    let envelope: Envelope<T> = serde_json::from_value(value)?;
    if envelope.code != 0 {
        return Err(ClientError::Other(anyhow::anyhow!(
            "service error {}: {}",
            envelope.code,
            envelope.message
        )));
    }
    Ok(envelope.data)
}

pub struct StudentServiceClient {
    http: Arc<ServiceHttpClient>,
}

impl StudentServiceClient {
    pub fn new(http: Arc<ServiceHttpClient>) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &ServiceHttpClient {
        &self.http
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<Option<T>> {
        let value = self
            .http
            .request(method, STUDENT_SERVICE, endpoint, &[], body.as_ref(), None)
            .await?;
        unwrap_envelope(value)
    }

    async fn call_required<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> Result<T> {
        self.call(method, endpoint, body).await?.ok_or_else(|| {
            ClientError::Other(anyhow::anyhow!("empty response from {}", endpoint))
        })
    }

    /// Profile for a platform user, `None` when they have none yet
    pub async fn get_student_by_user(&self, user_id: i64) -> Result<Option<StudentProfile>> {
        match self
            .call(Method::GET, &format!("/students/by-user/{}", user_id), None)
            .await
        {
            Err(ClientError::NotFound(_)) => Ok(None),
            other => other,
        }
    }

    pub async fn get_student(&self, student_id: i64) -> Result<Option<StudentProfile>> {
        match self
            .call(Method::GET, &format!("/students/{}", student_id), None)
            .await
        {
            Err(ClientError::NotFound(_)) => Ok(None),
            other => other,
        }
    }

    pub async fn create_student(&self, draft: &NewStudent) -> Result<StudentProfile> {
        self.call_required(Method::POST, "/students", Some(serde_json::to_value(draft)?))
            .await
    }

    /// Grant XP; `Some` carries the level-up when one happened
    pub async fn add_experience(
        &self,
        student_id: i64,
        grant: &XpGrant,
    ) -> Result<Option<LevelUp>> {
        self.call(
            Method::POST,
            &format!("/students/{}/experience", student_id),
            Some(serde_json::to_value(grant)?),
        )
        .await
    }

    pub async fn update_stats(&self, student_id: i64, delta: &StatsDelta) -> Result<()> {
        self.call::<Value>(
            Method::PATCH,
            &format!("/students/{}/stats", student_id),
            Some(serde_json::to_value(delta)?),
        )
        .await?;
        Ok(())
    }

    pub async fn get_student_achievements(
        &self,
        student_id: i64,
    ) -> Result<Vec<EarnedAchievement>> {
        Ok(self
            .call(
                Method::GET,
                &format!("/achievements/students/{}", student_id),
                None,
            )
            .await?
            .unwrap_or_default())
    }

    pub async fn get_dashboard(&self, student_id: i64) -> Result<Option<StudentDashboard>> {
        match self
            .call(
                Method::GET,
                &format!("/students/{}/dashboard", student_id),
                None,
            )
            .await
        {
            Err(ClientError::NotFound(_)) => Ok(None),
            other => other,
        }
    }

    /// Award XP for an action; a rejected award comes back as `XpAward::Rejected`
    pub async fn award_xp(&self, student_id: i64, request: &XpAwardRequest) -> Result<XpAward> {
        let endpoint = format!("/gamification/students/{}/xp", student_id);
        match self
            .call_required(Method::POST, &endpoint, Some(serde_json::to_value(request)?))
            .await
        {
            Err(ClientError::Api { status: 409, body }) => {
                let envelope: Envelope<XpAward> = serde_json::from_str(&body)?;
                envelope.data.ok_or_else(|| {
                    ClientError::Other(anyhow::anyhow!(
                        "XP award rejected: {}",
                        envelope.message
                    ))
                })
            }
            other => other,
        }
    }

    pub async fn leaderboard(
        &self,
        period: LeaderboardPeriod,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let mut query = vec![("period", period.to_string())];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        let value = self
            .http
            .request(
                Method::GET,
                STUDENT_SERVICE,
                "/gamification/leaderboard",
                &query,
                None,
                None,
            )
            .await?;
        Ok(unwrap_envelope(value)?.unwrap_or_default())
    }

    pub async fn record_streak(
        &self,
        student_id: i64,
        kind: StreakKind,
        success: bool,
    ) -> Result<StreakCounter> {
        self.call_required(
            Method::POST,
            &format!("/gamification/students/{}/streaks/{}", student_id, kind),
            Some(json!({ "success": success })),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unwrap_envelope() {
        let data: Option<i64> =
            unwrap_envelope(json!({"code": 0, "message": "success", "data": 5})).unwrap();
        assert_eq!(data, Some(5));

        let empty: Option<i64> =
            unwrap_envelope(json!({"code": 0, "message": "success", "data": null})).unwrap();
        assert_eq!(empty, None);

        let err = unwrap_envelope::<i64>(json!({"code": 21000, "message": "student not exist"}))
            .unwrap_err();
        assert!(err.to_string().contains("21000"));
    }
}

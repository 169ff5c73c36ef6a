//! Typed calls against the portal service's `/api/sunday-school` endpoints.
//!
//! Every failure mode is normalized into one [`RemoteError`]: transport
//! errors, non-2xx statuses (the body's `message` wins over the status
//! line), and the service's habit of answering 2xx with a `{ "message" }`
//! body instead of the entity.

use serde::de::DeserializeOwned;

use crate::http::{Client, Response};
use crate::model::{Asset, AssetPatch, User};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

fn status_error(response: &Response) -> RemoteError {
    match response.service_message() {
        Some(message) => RemoteError::new(message),
        None => RemoteError::new(format!("API returned status: {}", response.status)),
    }
}

/// Settle a response that should carry an entity body.
fn settle_entity<T: DeserializeOwned>(response: Response) -> RemoteResult<T> {
    if !response.is_success() {
        return Err(status_error(&response));
    }
    match response.json::<T>() {
        Ok(entity) => Ok(entity),
        // A 2xx body can still signal an application-level failure.
        Err(parse_err) => match response.service_message() {
            Some(message) => Err(RemoteError::new(message)),
            None => Err(RemoteError::new(format!(
                "Failed to parse response body: {parse_err}"
            ))),
        },
    }
}

/// Serialize an entity for creation: the service assigns ids, so the local
/// `id` field is stripped from the payload.
fn body_without_id<T: serde::Serialize>(entity: &T) -> RemoteResult<serde_json::Value> {
    let mut body = serde_json::to_value(entity)
        .map_err(|e| RemoteError::new(format!("Failed to serialize request: {e}")))?;
    if let Some(object) = body.as_object_mut() {
        object.remove("id");
    }
    Ok(body)
}

/// POST `/users`
pub async fn create_user(api_url: &str, user: &User) -> RemoteResult<User> {
    let body = body_without_id(user)?;
    let response = Client::post(format!("{api_url}/users"))
        .json(&body)
        .map_err(|e| RemoteError::new(format!("Failed to serialize request: {e}")))?
        .send()
        .await
        .map_err(|e| RemoteError::new(e.to_string()))?;
    settle_entity(response)
}

/// GET `/assets`
pub async fn list_assets(api_url: &str) -> RemoteResult<Vec<Asset>> {
    let response = Client::get(format!("{api_url}/assets"))
        .send()
        .await
        .map_err(|e| RemoteError::new(e.to_string()))?;
    settle_entity(response)
}

/// POST `/assets`
pub async fn create_asset(api_url: &str, asset: &Asset) -> RemoteResult<Asset> {
    let body = body_without_id(asset)?;
    let response = Client::post(format!("{api_url}/assets"))
        .json(&body)
        .map_err(|e| RemoteError::new(format!("Failed to serialize request: {e}")))?
        .send()
        .await
        .map_err(|e| RemoteError::new(e.to_string()))?;
    settle_entity(response)
}

/// PUT `/assets/{id}`
pub async fn update_asset(api_url: &str, id: &str, patch: &AssetPatch) -> RemoteResult<Asset> {
    let response = Client::put(format!("{api_url}/assets/{id}"))
        .json(patch)
        .map_err(|e| RemoteError::new(format!("Failed to serialize request: {e}")))?
        .send()
        .await
        .map_err(|e| RemoteError::new(e.to_string()))?;
    settle_entity(response)
}

/// DELETE `/assets/{id}`; success carries no body, so any `{ "message" }`
/// on a 2xx status is a service-reported failure.
pub async fn delete_asset(api_url: &str, id: &str) -> RemoteResult<()> {
    let response = Client::delete(format!("{api_url}/assets/{id}"))
        .send()
        .await
        .map_err(|e| RemoteError::new(e.to_string()))?;
    if !response.is_success() {
        return Err(status_error(&response));
    }
    if let Some(message) = response.service_message() {
        return Err(RemoteError::new(message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn response(status: u16, body: &[u8]) -> Response {
        Response {
            status,
            headers: HashMap::new(),
            body: body.to_vec(),
        }
    }

    #[derive(Debug, PartialEq, serde::Deserialize)]
    struct Entity {
        id: String,
    }

    #[test]
    fn test_settle_entity_prefers_body_message_on_error_status() {
        let err = settle_entity::<Entity>(response(409, br#"{"message": "code already in use"}"#))
            .unwrap_err();
        assert_eq!(err.message, "code already in use");

        let err = settle_entity::<Entity>(response(500, b"boom")).unwrap_err();
        assert_eq!(err.message, "API returned status: 500");
    }

    #[test]
    fn test_settle_entity_detects_error_shaped_success_body() {
        let err = settle_entity::<Entity>(response(200, br#"{"message": "validation failed"}"#))
            .unwrap_err();
        assert_eq!(err.message, "validation failed");
    }

    #[test]
    fn test_settle_entity_parses_entity() {
        let entity = settle_entity::<Entity>(response(201, br#"{"id": "a-1"}"#)).unwrap();
        assert_eq!(entity, Entity { id: "a-1".to_owned() });
    }

    #[test]
    fn test_create_payload_strips_local_id() {
        let user = crate::test_utils::sample_user("local-9", "abel@sundayschool.org");
        let body = body_without_id(&user).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(
            body.get("email").and_then(|v| v.as_str()),
            Some("abel@sundayschool.org")
        );
    }
}

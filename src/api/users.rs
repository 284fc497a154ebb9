use std::sync::Arc;

use http::{HeaderMap, StatusCode};
use serde::Deserialize;

use super::{ApiError, Application};
use crate::data::{User, parse_date, validate_user};
use crate::json::{Envelope, read_json, write_json};
use crate::request::Request;
use crate::response::Response;
use crate::validator::Validator;

/// Body of `PUT /hello/{username}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct SaveUserInput {
    #[serde(default)]
    date_of_birth: String,
}

impl Application {
    /// `PUT /hello/{username}`: creates the user or replaces their date of
    /// birth. Answers `204` with no body.
    pub async fn save_user(self: Arc<Self>, req: Request) -> Result<Response, ApiError> {
        let username = username(&req)?;
        let input: SaveUserInput = read_json(req.into_body()).await?;

        let date_of_birth = parse_date(&input.date_of_birth)
            .ok_or_else(|| ApiError::BadRequest("invalid date format, use YYYY-MM-DD".to_owned()))?;
        let user = User { username, date_of_birth };

        let mut v = Validator::new();
        validate_user(&mut v, &user);
        if !v.valid() {
            return Err(ApiError::FailedValidation(v.into_errors()));
        }

        self.users.upsert(&user).await?;
        Ok(Response::status(StatusCode::NO_CONTENT))
    }

    /// `GET /hello/{username}`: the birthday greeting for a stored user.
    pub async fn get_birthday_message(self: Arc<Self>, req: Request) -> Result<Response, ApiError> {
        let username = username(&req)?;
        let user = self.users.get_by_username(&username).await?;

        Ok(write_json(
            StatusCode::OK,
            &Envelope::Message(user.birthday_message()),
            HeaderMap::new(),
        )?)
    }
}

fn username(req: &Request) -> Result<String, ApiError> {
    req.param("username").map(str::to_owned).ok_or(ApiError::NotFound)
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct RegisterReqDto {
    #[schema(example = "ana@school.edu")]
    pub email: String,
    #[schema(example = "secreto1")]
    pub password: String,
    #[schema(example = "secreto1")]
    pub confirm_password: String,
    #[schema(example = "Ana")]
    pub names: String,
    #[schema(example = "Quispe")]
    pub lastnames: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginReqDto {
    #[schema(example = "ana@school.edu")]
    pub email: String,
    #[schema(example = "secreto1")]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    /// email at issue time
    pub sub: String,
    pub role: u8, // role id
    pub exp: usize,
    pub jti: String,

    pub token_type: TokenType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum TokenType {
    Access,
    Refresh,
}

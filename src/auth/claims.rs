use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JWT payload used for authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user email
    pub iat: usize,  // issued at (unix timestamp)
    pub exp: usize,  // expires at (unix timestamp)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

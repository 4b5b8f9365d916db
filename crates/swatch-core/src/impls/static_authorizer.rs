//! StaticTokenAuthorizer - 設定ファイルのトークン表による認可
//!
//! トークン → Principal の対応表を持ち、staff だけにカタログ管理を許可します。

use async_trait::async_trait;
use std::collections::HashMap;

use crate::config::AuthSettings;
use crate::domain::{CatalogError, Credential, Principal};
use crate::ports::Authorizer;

#[derive(Clone, Default)]
pub struct StaticTokenAuthorizer {
    principals: HashMap<String, Principal>,
}

impl StaticTokenAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_settings(settings: &AuthSettings) -> Self {
        settings
            .tokens
            .iter()
            .fold(Self::new(), |authorizer, entry| {
                authorizer.with_token(
                    entry.token.clone(),
                    Principal {
                        username: entry.username.clone(),
                        is_staff: entry.is_staff,
                    },
                )
            })
    }

    pub fn with_token(mut self, token: impl Into<String>, principal: Principal) -> Self {
        self.principals.insert(token.into(), principal);
        self
    }
}

#[async_trait]
impl Authorizer for StaticTokenAuthorizer {
    async fn authorize_catalog_admin(
        &self,
        credential: &Credential,
    ) -> Result<Principal, CatalogError> {
        if credential.is_blank() {
            return Err(CatalogError::Unauthorized("missing credential".to_string()));
        }
        let principal = self
            .principals
            .get(credential.token())
            .ok_or_else(|| CatalogError::Unauthorized("invalid credential".to_string()))?;
        if !principal.is_staff {
            tracing::warn!(user = %principal.username, "catalog admin action denied");
            return Err(CatalogError::Unauthorized(format!(
                "user '{}' is not staff",
                principal.username
            )));
        }
        Ok(principal.clone())
    }
}

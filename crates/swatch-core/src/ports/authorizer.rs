//! Authorizer port - 資格情報の検証
//!
//! トークン発行はこのサブシステムの外側です。ここでは提示された
//! Credential がカタログ管理操作を許可されているかだけを判定します。
//!
//! # 実装
//! - `impls::StaticTokenAuthorizer`: 設定ファイルのトークン表

use async_trait::async_trait;

use crate::domain::{CatalogError, Credential, Principal};

/// Authorizer はカタログ管理操作の認可を行う
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// 許可されていれば Principal、そうでなければ `CatalogError::Unauthorized`
    async fn authorize_catalog_admin(
        &self,
        credential: &Credential,
    ) -> Result<Principal, CatalogError>;
}

//! IdGenerator port - ID 生成の抽象化
//!
//! ストア実装（InMemoryCatalog / SqliteCatalog）は行を作るときにここから ID を取ります。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{CategoryId, ProductId, VariantId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator はカタログ用の ID を生成
///
/// # ULID の特性
/// - 時刻でソート可能
/// - 分散環境で生成可能（調整不要）
/// - 128-bit（UUID 互換）
///
/// 同じミリ秒内の ID 同士は順序が保証されないため、
/// 作成順序が必要な箇所（variant 一覧）はストア側の連番を使います。
pub trait IdGenerator: Send + Sync {
    /// Category ID を生成
    fn generate_category_id(&self) -> CategoryId;

    /// Product ID を生成
    fn generate_product_id(&self) -> ProductId;

    /// Variant ID を生成
    fn generate_variant_id(&self) -> VariantId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    /// 新しい UlidGenerator を作成
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_category_id(&self) -> CategoryId {
        CategoryId::from(self.next_ulid())
    }

    fn generate_product_id(&self) -> ProductId {
        ProductId::from(self.next_ulid())
    }

    fn generate_variant_id(&self) -> VariantId {
        VariantId::from(self.next_ulid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let id1 = id_gen.generate_product_id();
        let id2 = id_gen.generate_product_id();
        let id3 = id_gen.generate_product_id();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn ulid_generator_with_fixed_clock_shares_timestamp() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_variant_id();
        let id2 = id_gen.generate_variant_id();

        // ランダム部分があるので ID は異なるが、timestamp 部分は同じ
        assert_ne!(id1, id2);
        assert_eq!(id1.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
        assert_eq!(id2.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn different_id_types_are_generated() {
        let id_gen = UlidGenerator::new(SystemClock);

        assert!(id_gen.generate_category_id().to_string().starts_with("cat-"));
        assert!(id_gen.generate_product_id().to_string().starts_with("prod-"));
        assert!(id_gen.generate_variant_id().to_string().starts_with("var-"));
    }
}

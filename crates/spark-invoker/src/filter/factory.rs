//! 过滤器工厂：把提供者的产出折叠为有序的过滤器列表，并在执行计划内记忆化。
//!
//! # 教案式说明
//! - **意图（Why）**：提供者聚合代价较高，每个描述符版本只做一次；只有当计划中存在不可复用的条目时，
//!   才需要在每个请求上重新跑一遍提供者；
//! - **逻辑（How）**：
//!   1. 描述符上的静态声明按 `(order, scope)` 稳定排序，作为初始条目；
//!   2. 提供者按排序键升序执行，结束后丢弃仍未物化的条目；
//!   3. 若全部条目可复用，直接缓存 `Arc<[Arc<dyn Filter>]>`；
//!   4. 否则保留排序后的静态声明（带上可复用的实例），每个请求从这些声明重新跑一遍提供者，
//!      提供者追加的条目不会被带入下一轮；
//! - **契约（What）**：同一计划产出的过滤器列表顺序固定；不按实例身份去重。

use std::sync::Arc;

use tracing::debug;

use crate::context::InvocationContext;
use crate::error::Result;

use super::Filter;
use super::descriptor::FilterItem;
use super::provider::{FilterProvider, order_providers, run_providers};

/// 绑定在某个执行计划上的过滤器工厂。
#[derive(Clone)]
pub struct FilterFactory {
    providers: Arc<[Arc<dyn FilterProvider>]>,
    seeds: Arc<[FilterItem]>,
    items: Arc<[FilterItem]>,
    cached: Option<Arc<[Arc<dyn Filter>]>>,
}

impl FilterFactory {
    /// 在计划构建阶段执行一次完整装配。
    ///
    /// # 契约说明
    /// - **输入**：`providers` 可为任意顺序，这里按 `order()` 稳定排序；`context` 提供描述符及其静态声明；
    /// - **返回**：任一提供者或过滤器工厂失败时返回对应错误，调用方不得缓存任何结果。
    pub fn build(
        providers: &[Arc<dyn FilterProvider>],
        context: &InvocationContext,
    ) -> Result<Self> {
        let providers = order_providers(providers);

        let mut seeds: Vec<FilterItem> = context
            .descriptor()
            .filters()
            .iter()
            .cloned()
            .map(FilterItem::new)
            .collect();
        seeds.sort_by_key(|item| item.descriptor().sort_key());
        let seed_count = seeds.len();

        // 提供者只能追加或填空槽，前 `seed_count` 个条目仍是静态声明本身。
        let assembled = run_providers(&providers, context, seeds)?;
        let seeds: Arc<[FilterItem]> = assembled
            .iter()
            .take(seed_count)
            .map(FilterItem::for_request)
            .collect();
        let items: Vec<FilterItem> = assembled
            .into_iter()
            .filter(|item| item.filter().is_some())
            .collect();

        let cached = items
            .iter()
            .all(FilterItem::is_reusable)
            .then(|| collect_filters(&items));

        debug!(
            descriptor = %context.descriptor().id(),
            filters = items.len(),
            cached = cached.is_some(),
            "filter factory built"
        );

        Ok(Self {
            providers,
            seeds,
            items: items.into(),
            cached,
        })
    }

    /// 为一次请求产出过滤器列表。
    ///
    /// - 全部可复用时返回共享列表，仅增加引用计数；
    /// - 否则从静态声明出发重新执行提供者，可复用实例沿用计划阶段的产出。
    pub fn create_filters(&self, context: &InvocationContext) -> Result<Arc<[Arc<dyn Filter>]>> {
        if let Some(cached) = &self.cached {
            return Ok(Arc::clone(cached));
        }

        let items = run_providers(&self.providers, context, self.seeds.to_vec())?;
        Ok(collect_filters(&items))
    }

    /// 过滤器列表是否已在计划内缓存。
    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    /// 计划构建时确定的条目。
    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }
}

impl std::fmt::Debug for FilterFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterFactory")
            .field("providers", &self.providers.len())
            .field("seeds", &self.seeds.len())
            .field("items", &self.items)
            .field("cached", &self.cached.is_some())
            .finish()
    }
}

fn collect_filters(items: &[FilterItem]) -> Arc<[Arc<dyn Filter>]> {
    items.iter().filter_map(|item| item.filter().cloned()).collect()
}

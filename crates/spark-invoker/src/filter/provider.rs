//! 过滤器提供者：按排序键依次参与过滤器列表的装配。
//!
//! # 教案式说明
//! - **意图（Why）**：过滤器来源可插拔（静态声明、约定、插件），每个提供者只负责自己的那部分，
//!   并能看到排在它之前的提供者已经放入的条目；
//! - **逻辑（How）**：提供者按 `order()` 升序执行 `on_providers_executing`，键相同者保持注册顺序；
//!   随后按相反顺序执行 `on_providers_executed`；
//! - **契约（What）**：[`FilterProviderContext`] 只开放“追加”与“为空槽物化实例”两种写操作，
//!   后执行的提供者无法重排或删除前面的条目。

use std::sync::Arc;

use tracing::debug;

use crate::context::InvocationContext;
use crate::error::Result;

use super::Filter;
use super::descriptor::{FilterDescriptor, FilterItem, FilterSource};

/// 提供者共享的可增长工作列表。
pub struct FilterProviderContext<'a> {
    invocation: &'a InvocationContext,
    items: Vec<FilterItem>,
}

impl<'a> FilterProviderContext<'a> {
    /// 以静态声明为初始条目开始一轮装配。
    ///
    /// 每一轮都从静态声明出发，提供者无需区分计划构建与按请求重建。
    pub fn new(invocation: &'a InvocationContext, items: Vec<FilterItem>) -> Self {
        Self { invocation, items }
    }

    pub fn invocation(&self) -> &InvocationContext {
        self.invocation
    }

    /// 目前为止的全部条目，包含前序提供者追加的部分。
    pub fn items(&self) -> &[FilterItem] {
        &self.items
    }

    /// 追加条目，返回其下标。
    pub fn push(&mut self, item: FilterItem) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    /// 为尚未物化的条目填入实例。
    ///
    /// - **契约 (What)**：仅当 `index` 有效且该槽位为空时写入并返回 `true`；
    ///   已有实例的槽位保持不变，返回 `false`。
    pub fn materialize(&mut self, index: usize, filter: Arc<dyn Filter>, reusable: bool) -> bool {
        match self.items.get_mut(index) {
            Some(item) if item.filter().is_none() => {
                item.set_filter(filter, reusable);
                true
            }
            _ => false,
        }
    }

    pub fn into_items(self) -> Vec<FilterItem> {
        self.items
    }
}

/// 过滤器提供者契约。
pub trait FilterProvider: Send + Sync + 'static {
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// 排序键，升序执行。
    fn order(&self) -> i32;

    fn on_providers_executing(&self, context: &mut FilterProviderContext<'_>) -> Result<()>;

    fn on_providers_executed(&self, _context: &mut FilterProviderContext<'_>) -> Result<()> {
        Ok(())
    }
}

/// 默认提供者：为所有空槽位按声明来源物化实例。
///
/// - 声明为现成实例的条目总是可复用；
/// - 声明为工厂的条目是否可复用由工厂的 `is_reusable` 决定。
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultFilterProvider;

impl DefaultFilterProvider {
    /// 默认提供者的排序键，先于绝大多数自定义提供者执行。
    pub const ORDER: i32 = -1000;
}

impl FilterProvider for DefaultFilterProvider {
    fn name(&self) -> &str {
        "default"
    }

    fn order(&self) -> i32 {
        Self::ORDER
    }

    fn on_providers_executing(&self, context: &mut FilterProviderContext<'_>) -> Result<()> {
        for index in 0..context.items().len() {
            let descriptor: &FilterDescriptor = context.items()[index].descriptor();
            if context.items()[index].filter().is_some() {
                continue;
            }
            let (filter, reusable) = match descriptor.source() {
                FilterSource::Instance(filter) => (Arc::clone(filter), true),
                FilterSource::Factory(factory) => (
                    factory.create_instance(context.invocation())?,
                    factory.is_reusable(),
                ),
            };
            context.materialize(index, filter, reusable);
        }
        Ok(())
    }
}

/// 按排序键稳定排序提供者。
pub(crate) fn order_providers(
    providers: &[Arc<dyn FilterProvider>],
) -> Arc<[Arc<dyn FilterProvider>]> {
    let mut ordered = providers.to_vec();
    ordered.sort_by_key(|provider| provider.order());
    ordered.into()
}

/// 在已排序的提供者上执行一轮装配。
pub(crate) fn run_providers(
    providers: &[Arc<dyn FilterProvider>],
    invocation: &InvocationContext,
    items: Vec<FilterItem>,
) -> Result<Vec<FilterItem>> {
    let mut context = FilterProviderContext::new(invocation, items);
    for provider in providers {
        provider.on_providers_executing(&mut context)?;
        debug!(
            provider = provider.name(),
            items = context.items().len(),
            "filter provider executed"
        );
    }
    for provider in providers.iter().rev() {
        provider.on_providers_executed(&mut context)?;
    }
    Ok(context.into_items())
}

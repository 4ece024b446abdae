//! 过滤器静态声明与装配期条目。

use std::fmt;
use std::sync::Arc;

use crate::context::InvocationContext;
use crate::error::Result;

use super::Filter;

/// 过滤器声明所在的作用域，数值越小越靠外层。
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterScope {
    Global = 10,
    Controller = 20,
    Action = 30,
    Last = 100,
}

/// 按请求创建过滤器实例的工厂。
///
/// - **契约 (What)**：`is_reusable` 为 `true` 时，产出的实例会被缓存进执行计划并在所有请求间共享，
///   因此实例本身必须是无状态或线程安全的。
pub trait FilterInstanceFactory: Send + Sync + 'static {
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    fn is_reusable(&self) -> bool;

    fn create_instance(&self, context: &InvocationContext) -> Result<Arc<dyn Filter>>;
}

/// 过滤器声明的来源：现成实例或实例工厂。
#[derive(Clone)]
pub enum FilterSource {
    Instance(Arc<dyn Filter>),
    Factory(Arc<dyn FilterInstanceFactory>),
}

impl FilterSource {
    pub fn name(&self) -> &str {
        match self {
            FilterSource::Instance(filter) => filter.name(),
            FilterSource::Factory(factory) => factory.name(),
        }
    }
}

impl fmt::Debug for FilterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSource::Instance(filter) => {
                f.debug_tuple("Instance").field(&filter.name()).finish()
            }
            FilterSource::Factory(factory) => {
                f.debug_tuple("Factory").field(&factory.name()).finish()
            }
        }
    }
}

/// 描述符上的一条过滤器声明。
///
/// - **排序 (What)**：装配前按 `(order, scope)` 稳定排序，键相同的声明保持原有先后。
#[derive(Clone, Debug)]
pub struct FilterDescriptor {
    source: FilterSource,
    order: i32,
    scope: FilterScope,
}

impl FilterDescriptor {
    pub fn new(source: FilterSource, scope: FilterScope) -> Self {
        Self {
            source,
            order: 0,
            scope,
        }
    }

    pub fn instance(filter: Arc<dyn Filter>, scope: FilterScope) -> Self {
        Self::new(FilterSource::Instance(filter), scope)
    }

    pub fn factory(factory: Arc<dyn FilterInstanceFactory>, scope: FilterScope) -> Self {
        Self::new(FilterSource::Factory(factory), scope)
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn source(&self) -> &FilterSource {
        &self.source
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn scope(&self) -> FilterScope {
        self.scope
    }

    pub(crate) fn sort_key(&self) -> (i32, FilterScope) {
        (self.order, self.scope)
    }
}

/// 装配期的工作条目：一条声明加上（可能尚未）物化出的实例。
///
/// - `filter` 为 `None` 表示还没有提供者为其产出实例；装配结束后仍为 `None` 的条目会被丢弃；
/// - `reusable` 决定该实例能否跨请求复用。
#[derive(Clone, Debug)]
pub struct FilterItem {
    descriptor: FilterDescriptor,
    filter: Option<Arc<dyn Filter>>,
    reusable: bool,
}

impl FilterItem {
    /// 尚未物化的条目。
    pub fn new(descriptor: FilterDescriptor) -> Self {
        Self {
            descriptor,
            filter: None,
            reusable: false,
        }
    }

    /// 直接携带实例的条目。
    pub fn with_filter(
        descriptor: FilterDescriptor,
        filter: Arc<dyn Filter>,
        reusable: bool,
    ) -> Self {
        Self {
            descriptor,
            filter: Some(filter),
            reusable,
        }
    }

    pub fn descriptor(&self) -> &FilterDescriptor {
        &self.descriptor
    }

    pub fn filter(&self) -> Option<&Arc<dyn Filter>> {
        self.filter.as_ref()
    }

    pub fn is_reusable(&self) -> bool {
        self.reusable
    }

    pub(crate) fn set_filter(&mut self, filter: Arc<dyn Filter>, reusable: bool) {
        self.filter = Some(filter);
        self.reusable = reusable;
    }

    /// 复制条目用于按请求重新装配：可复用实例保留，其余清空。
    pub(crate) fn for_request(&self) -> Self {
        if self.reusable {
            self.clone()
        } else {
            Self::new(self.descriptor.clone())
        }
    }
}

impl fmt::Debug for dyn Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

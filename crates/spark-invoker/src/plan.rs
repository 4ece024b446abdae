//! 执行计划：某个描述符在某一缓存世代内的不可变构建产物。

use std::fmt;
use std::sync::Arc;

use crate::context::InvocationContext;
use crate::descriptor::ActionDescriptor;
use crate::error::Result;
use crate::filter::{Filter, FilterCursor, FilterFactory};
use crate::handler::{CompiledDescriptor, HandlerDisposer, HandlerFactory};

/// 缓存条目。
///
/// # 教案式说明
/// - **意图 (Why)**：把一次昂贵构建（类型解析、工厂构造、过滤器聚合）的全部产物打包为一个值，
///   以 `Arc<ExecutionPlan>` 在并发请求间共享；
/// - **契约 (What)**：
///   - 构造后不可变，没有任何内部可变性；
///   - 同一世代内同一描述符只会发布一个计划，调用方可用 `Arc::ptr_eq` 判断是否命中同一条目。
pub struct ExecutionPlan {
    compiled: Arc<CompiledDescriptor>,
    factory: HandlerFactory,
    disposer: HandlerDisposer,
    filter_factory: FilterFactory,
}

impl ExecutionPlan {
    pub fn new(
        compiled: Arc<CompiledDescriptor>,
        factory: HandlerFactory,
        disposer: HandlerDisposer,
        filter_factory: FilterFactory,
    ) -> Self {
        Self {
            compiled,
            factory,
            disposer,
            filter_factory,
        }
    }

    pub fn descriptor(&self) -> &Arc<ActionDescriptor> {
        self.compiled.descriptor()
    }

    pub fn compiled(&self) -> &Arc<CompiledDescriptor> {
        &self.compiled
    }

    pub fn factory(&self) -> &HandlerFactory {
        &self.factory
    }

    pub fn disposer(&self) -> &HandlerDisposer {
        &self.disposer
    }

    pub fn filter_factory(&self) -> &FilterFactory {
        &self.filter_factory
    }

    /// 为一次请求产出过滤器列表。
    pub fn create_filters(&self, context: &InvocationContext) -> Result<Arc<[Arc<dyn Filter>]>> {
        self.filter_factory.create_filters(context)
    }

    /// 为一次请求产出位于起点的游标。
    pub fn cursor(&self, context: &InvocationContext) -> Result<FilterCursor> {
        self.create_filters(context).map(FilterCursor::new)
    }
}

impl fmt::Debug for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionPlan")
            .field("descriptor", self.compiled.descriptor().id())
            .field("handler_type", &self.compiled.handler_type().type_name())
            .field("model_type", &self.compiled.model_type())
            .field("filter_factory", &self.filter_factory)
            .finish()
    }
}

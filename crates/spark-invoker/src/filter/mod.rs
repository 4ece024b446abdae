//! 过滤器能力契约、静态声明与装配入口。
//!
//! # 教案式说明
//! - **意图（Why）**：过滤器是包裹 Handler 执行的可插拔组件，同一个具体类型可能只提供同步钩子、
//!   只提供异步钩子，或两者兼有；调用器需要按调用点所需的能力视图来看待它；
//! - **逻辑（How）**：所有过滤器以 `Arc<dyn Filter>` 流转，[`Filter`] 上的 `as_*` 方法是显式的能力查询，
//!   默认返回 `None`，实现者覆盖自己支持的那一项；[`FilterCapability`] 把“能力视图”抽象为类型参数，
//!   供 [`FilterCursor`] 泛型化地查询；
//! - **契约（What）**：能力查询必须是纯函数：同一实例多次查询结果一致，且不产生副作用。

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::invoker::{HandlerExecutedContext, HandlerExecutingContext, Next};

pub mod cursor;
pub mod descriptor;
pub mod factory;
pub mod provider;

pub use cursor::{FilterCursor, FilterCursorItem};
pub use descriptor::{FilterDescriptor, FilterInstanceFactory, FilterItem, FilterScope, FilterSource};
pub use factory::FilterFactory;
pub use provider::{DefaultFilterProvider, FilterProvider, FilterProviderContext};

/// 所有过滤器的公共根契约。
///
/// # 教案式说明
/// - **意图 (Why)**：过滤器通过能力查询暴露自己实现了哪些角色，调用器据此分派，
///   不依赖运行时类型反射；
/// - **契约 (What)**：
///   - `as_page_filter` / `as_async_page_filter` 的默认实现返回 `None`；
///   - 实现了对应能力的类型应覆盖为 `Some(self)`；
///   - 两项都返回 `None` 的过滤器仍会占据游标中的一个位置。
pub trait Filter: Send + Sync + 'static {
    /// 诊断用名称，默认使用具体类型名。
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }

    /// 以同步页面过滤器视图查看自身。
    fn as_page_filter(self: Arc<Self>) -> Option<Arc<dyn PageFilter>> {
        None
    }

    /// 以异步页面过滤器视图查看自身。
    fn as_async_page_filter(self: Arc<Self>) -> Option<Arc<dyn AsyncPageFilter>> {
        None
    }
}

/// 同步页面过滤器：在 Handler 执行前后各被回调一次。
///
/// - **短路**：`on_handler_executing` 中调用 [`HandlerExecutingContext::set_result`] 后，
///   管线不再向内推进，本过滤器的 `on_handler_executed` 也不会被调用；
/// - **错误**：返回 `Err` 会立即终止整条管线，错误原样返回给调用方。
pub trait PageFilter: Filter {
    fn on_handler_executing(&self, context: &mut HandlerExecutingContext<'_>) -> Result<()>;

    fn on_handler_executed(&self, context: &mut HandlerExecutedContext) -> Result<()>;
}

/// 异步页面过滤器：以延续（[`Next`]）的方式包裹管线剩余部分。
///
/// - **契约 (What)**：调用 `next.run().await` 驱动内层过滤器与 Handler，并返回（可修改后的）执行结果；
///   不调用 `next` 即为短路，此时应返回 [`HandlerExecutedContext::short_circuit`] 构造的结果；
/// - `Next` 按值传入，类型层面保证至多推进一次。
#[async_trait]
pub trait AsyncPageFilter: Filter {
    async fn on_handler_execution(
        &self,
        context: &mut HandlerExecutingContext<'_>,
        next: Next<'_>,
    ) -> Result<HandlerExecutedContext>;
}

/// 游标可请求的能力视图。
///
/// - **意图 (Why)**：让 [`FilterCursor::next_filter`] 以类型参数表达“调用点需要哪种角色”，
///   同一条过滤器列表可以被不同阶段以不同视图遍历；
/// - **契约 (What)**：`view` 只做能力查询，克隆 `Arc` 不分配堆内存。
pub trait FilterCapability {
    type View: ?Sized + Send + Sync + 'static;

    fn view(filter: &Arc<dyn Filter>) -> Option<Arc<Self::View>>;
}

/// 同步页面过滤器视图。
#[derive(Debug)]
pub enum SyncPage {}

impl FilterCapability for SyncPage {
    type View = dyn PageFilter;

    fn view(filter: &Arc<dyn Filter>) -> Option<Arc<Self::View>> {
        Arc::clone(filter).as_page_filter()
    }
}

/// 异步页面过滤器视图。
#[derive(Debug)]
pub enum AsyncPage {}

impl FilterCapability for AsyncPage {
    type View = dyn AsyncPageFilter;

    fn view(filter: &Arc<dyn Filter>) -> Option<Arc<Self::View>> {
        Arc::clone(filter).as_async_page_filter()
    }
}

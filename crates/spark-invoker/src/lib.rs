//! # spark-invoker
//!
//! ## 定位与职责（Why）
//! - 作为请求调用管线的核心，把路由命中的描述符解析为可共享的执行计划，并沿过滤器游标在
//!   同步/异步过滤器的包裹下执行页面 Handler；
//! - 注册表热更新时以“世代”为单位整体失效缓存，读路径不加锁，构建路径允许并发重复但对外只发布一份。
//!
//! ## 架构嵌入（Where）
//! - `registry`、`handler` 定义外部协作者契约（描述符注册表、Handler 加载与工厂）；
//! - `cache`、`plan` 负责版本化缓存与不可变执行计划；
//! - `filter` 负责过滤器能力契约、提供者装配、记忆化与游标；
//! - `invoker`、`provider` 负责单次调用的推进与调用器提供者链；
//! - `config`、`error` 提供 TOML 配置与 `thiserror` 风格的错误域。
//!
//! ## 日志约定（Trade-offs）
//! - 只通过 `tracing` 宏输出事件，库本身不安装订阅者；
//! - 热路径（缓存命中、游标前移）不打日志，世代切换与缓存未命中为 `debug`，构建失败为 `warn`。

/// 版本化调用计划缓存与缓存世代。
pub mod cache;
/// 调用器配置。
pub mod config;
/// 单次请求上下文。
pub mod context;
/// 路由描述符与描述符集合。
pub mod descriptor;
/// 错误域。
pub mod error;
/// 过滤器契约、装配与游标。
pub mod filter;
/// Handler 编译元数据与工厂契约。
pub mod handler;
/// 页面调用推进器。
pub mod invoker;
/// 不可变执行计划。
pub mod plan;
/// 调用器提供者链。
pub mod provider;
/// 描述符注册表。
pub mod registry;

pub use cache::{CacheGeneration, InvokerCache};
pub use config::InvokerOptions;
pub use context::InvocationContext;
pub use descriptor::{ActionDescriptor, DescriptorCollection, DescriptorId, DescriptorKind};
pub use error::{InvokerError, Result};
pub use filter::{
    AsyncPage, AsyncPageFilter, DefaultFilterProvider, Filter, FilterCapability, FilterCursor,
    FilterCursorItem, FilterDescriptor, FilterFactory, FilterInstanceFactory, FilterItem,
    FilterProvider, FilterProviderContext, FilterScope, FilterSource, PageFilter, SyncPage,
};
pub use handler::{
    CompiledDescriptor, Handler, HandlerDisposer, HandlerFactory, HandlerFactoryProvider,
    HandlerLoader, HandlerResult, HandlerTypeMetadata, PropertyMetadata,
};
pub use invoker::{
    HandlerExecutedContext, HandlerExecutingContext, InvocationOutcome, Next, PageActionInvoker,
};
pub use plan::ExecutionPlan;
pub use provider::{
    InvokerProvider, InvokerProviderContext, PageInvokerProvider, create_invoker,
};
pub use registry::{DescriptorRegistry, InMemoryDescriptorRegistry};

//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为调用计划的构建、过滤器装配与页面执行提供集中定义的错误域；
//! - 区分“计划构建失败”（不会被缓存，下次 `resolve` 重试）与“单次调用失败”（仅影响当前请求）。
//!
//! ## 设计要求（What）
//! - 所有错误派生 `thiserror::Error`，可直接交给上层框架转换为响应；
//! - 变体携带描述符 ID 或过滤器名称，便于按路由聚合告警；
//! - 错误实现 `Clone + Eq`，测试可以直接比较整个值。

use thiserror::Error;

/// crate 内统一的 `Result` 别名。
pub type Result<T, E = InvokerError> = core::result::Result<T, E>;

/// 调用器核心错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：聚合计划构建与调用执行两条路径的失败；构建类错误由 [`crate::InvokerCache::resolve`]
///   同步返回，调用类错误由 [`crate::PageActionInvoker::invoke`] 返回。
/// - **契约 (What)**：
///   - `HandlerLoad`、`FactoryConstruction`、`FilterConstruction`、`FilterProvider` 发生在计划构建阶段时，
///     缓存不会保存任何条目；
///   - `Handler`、`Filter` 仅描述单次调用失败，不影响已发布的计划。
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum InvokerError {
    /// Handler 类型无法解析。
    #[error("failed to load handler for descriptor `{descriptor}`: {detail}")]
    HandlerLoad { descriptor: String, detail: String },

    /// Handler 工厂或销毁器构造失败。
    #[error("failed to construct handler factory for descriptor `{descriptor}`: {detail}")]
    FactoryConstruction { descriptor: String, detail: String },

    /// 过滤器工厂未能产出实例。
    #[error("filter `{filter}` could not be instantiated: {detail}")]
    FilterConstruction { filter: String, detail: String },

    /// 过滤器提供者在装配阶段失败。
    #[error("filter provider `{provider}` failed: {detail}")]
    FilterProvider { provider: String, detail: String },

    /// Handler 执行失败。
    #[error("handler `{handler}` failed: {detail}")]
    Handler { handler: String, detail: String },

    /// 过滤器在执行阶段失败。
    #[error("filter `{filter}` failed during execution: {detail}")]
    Filter { filter: String, detail: String },

    /// 配置解析失败。
    #[error("invalid invoker configuration: {detail}")]
    Configuration { detail: String },
}

impl InvokerError {
    /// 是否属于计划构建阶段的错误。
    ///
    /// - **契约 (What)**：返回 `true` 的错误意味着缓存中没有为该描述符写入任何条目，
    ///   下一次解析会从头构建。
    pub fn is_build_failure(&self) -> bool {
        matches!(
            self,
            InvokerError::HandlerLoad { .. }
                | InvokerError::FactoryConstruction { .. }
                | InvokerError::FilterConstruction { .. }
                | InvokerError::FilterProvider { .. }
        )
    }

    /// 错误码，遵循 `<域>.<语义>` 命名，供日志字段使用。
    pub fn code(&self) -> &'static str {
        match self {
            InvokerError::HandlerLoad { .. } => "invoker.handler.load",
            InvokerError::FactoryConstruction { .. } => "invoker.handler.factory",
            InvokerError::FilterConstruction { .. } => "invoker.filter.construct",
            InvokerError::FilterProvider { .. } => "invoker.filter.provider",
            InvokerError::Handler { .. } => "invoker.handler.execute",
            InvokerError::Filter { .. } => "invoker.filter.execute",
            InvokerError::Configuration { .. } => "invoker.config.invalid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_failures_are_classified() {
        let load = InvokerError::HandlerLoad {
            descriptor: "/index".into(),
            detail: "missing type".into(),
        };
        assert!(load.is_build_failure());
        assert_eq!(load.code(), "invoker.handler.load");
        assert_eq!(
            load.to_string(),
            "failed to load handler for descriptor `/index`: missing type"
        );

        let handler = InvokerError::Handler {
            handler: "IndexPage".into(),
            detail: "boom".into(),
        };
        assert!(!handler.is_build_failure());
    }
}

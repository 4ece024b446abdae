//! 调用器提供者链。
//!
//! # 教案式说明
//! - **意图（Why）**：宿主可能同时挂载多种调用器（页面、控制器动作等），由提供者链按排序键轮流尝试，
//!   首个认领描述符的提供者写入调用器；
//! - **逻辑（How）**：`on_providers_executing` 按 `order()` 升序执行，`on_providers_executed` 按相反顺序执行；
//!   [`PageInvokerProvider`] 在 `executed` 阶段解析执行计划；
//! - **契约（What）**：非页面描述符不会被 [`PageInvokerProvider`] 认领，`result` 保持原值。

use std::sync::Arc;

use crate::cache::InvokerCache;
use crate::context::InvocationContext;
use crate::error::Result;
use crate::invoker::PageActionInvoker;

/// 提供者之间共享的上下文。
#[derive(Debug)]
pub struct InvokerProviderContext {
    invocation: InvocationContext,
    /// 已认领描述符的调用器。
    pub result: Option<PageActionInvoker>,
}

impl InvokerProviderContext {
    pub fn new(invocation: InvocationContext) -> Self {
        Self {
            invocation,
            result: None,
        }
    }

    pub fn invocation(&self) -> &InvocationContext {
        &self.invocation
    }

    pub fn into_result(self) -> Option<PageActionInvoker> {
        self.result
    }
}

/// 调用器提供者契约。
pub trait InvokerProvider: Send + Sync + 'static {
    fn order(&self) -> i32;

    fn on_providers_executing(&self, context: &mut InvokerProviderContext) -> Result<()>;

    fn on_providers_executed(&self, context: &mut InvokerProviderContext) -> Result<()>;
}

/// 为页面描述符创建 [`PageActionInvoker`] 的提供者。
#[derive(Debug, Clone)]
pub struct PageInvokerProvider {
    cache: Arc<InvokerCache>,
}

impl PageInvokerProvider {
    pub fn new(cache: Arc<InvokerCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<InvokerCache> {
        &self.cache
    }
}

impl InvokerProvider for PageInvokerProvider {
    /// 取自 [`crate::InvokerOptions::provider_order`]。
    fn order(&self) -> i32 {
        self.cache.options().provider_order
    }

    fn on_providers_executing(&self, _context: &mut InvokerProviderContext) -> Result<()> {
        Ok(())
    }

    fn on_providers_executed(&self, context: &mut InvokerProviderContext) -> Result<()> {
        if !context.invocation().descriptor().is_page() {
            return Ok(());
        }

        let plan = self.cache.resolve(context.invocation())?;
        context.result = Some(PageActionInvoker::new(plan, context.invocation().clone()));
        Ok(())
    }
}

/// 以给定提供者链为一次请求创建调用器。
///
/// - 提供者按 `order()` 稳定排序后执行；没有提供者认领时返回 `Ok(None)`。
pub fn create_invoker(
    providers: &[Arc<dyn InvokerProvider>],
    invocation: InvocationContext,
) -> Result<Option<PageActionInvoker>> {
    let mut ordered = providers.to_vec();
    ordered.sort_by_key(|provider| provider.order());

    let mut context = InvokerProviderContext::new(invocation);
    for provider in &ordered {
        provider.on_providers_executing(&mut context)?;
    }
    for provider in ordered.iter().rev() {
        provider.on_providers_executed(&mut context)?;
    }
    Ok(context.into_result())
}

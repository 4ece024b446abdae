//! 页面调用器：沿过滤器游标推进，在过滤器包裹下执行 Handler。
//!
//! # 教案式说明
//! - **意图（Why）**：执行计划只描述“有哪些过滤器、如何创建 Handler”，真正的一次调用需要一个
//!   单所有者的推进器，负责同步/异步两种过滤器协议的分派、短路与 Handler 生命周期；
//! - **逻辑（How）**：
//!   1. 从计划取得过滤器列表与游标，再通过 [`crate::handler::HandlerFactory`] 实例化 Handler；
//!   2. 递归推进游标：异步过滤器拿到 [`Next`] 延续；同步过滤器先 `executing`，再推进剩余部分，
//!      最后 `executed`；两种能力都不具备的过滤器被跳过；终止项执行 Handler；
//!   3. Handler 在任何路径（成功、失败、短路、调用被取消）结束时都会交给计划中的销毁器；
//! - **契约（What）**：
//!   - Handler 的执行错误被捕获到 [`HandlerExecutedContext::error`]，外层过滤器可以处理并清除它；
//!     仍未处理的错误在调用结束时返回；
//!   - 过滤器自身返回的 `Err` 立即终止管线并原样返回。

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::trace;

use crate::context::InvocationContext;
use crate::error::{InvokerError, Result};
use crate::filter::{AsyncPage, FilterCursor, SyncPage};
use crate::handler::{Handler, HandlerResult};
use crate::plan::ExecutionPlan;

/// Handler 执行前交给过滤器的上下文。
///
/// - **短路 (What)**：同步过滤器在 `on_handler_executing` 中写入结果即表示短路。
#[derive(Debug)]
pub struct HandlerExecutingContext<'a> {
    invocation: &'a InvocationContext,
    result: Option<HandlerResult>,
}

impl<'a> HandlerExecutingContext<'a> {
    pub fn new(invocation: &'a InvocationContext) -> Self {
        Self {
            invocation,
            result: None,
        }
    }

    pub fn invocation(&self) -> &'a InvocationContext {
        self.invocation
    }

    pub fn result(&self) -> Option<&HandlerResult> {
        self.result.as_ref()
    }

    pub fn set_result(&mut self, result: HandlerResult) {
        self.result = Some(result);
    }

    fn take_result(&mut self) -> Option<HandlerResult> {
        self.result.take()
    }
}

/// Handler（或短路者）执行完毕后的上下文，沿管线由内向外传递。
#[derive(Debug, Default)]
pub struct HandlerExecutedContext {
    result: Option<HandlerResult>,
    error: Option<InvokerError>,
    short_circuited_by: Option<String>,
}

impl HandlerExecutedContext {
    /// 以给定结果构造短路产出，供异步过滤器在不调用 `next` 时返回。
    pub fn short_circuit(result: HandlerResult) -> Self {
        Self {
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn result(&self) -> Option<&HandlerResult> {
        self.result.as_ref()
    }

    pub fn set_result(&mut self, result: HandlerResult) {
        self.result = Some(result);
    }

    /// Handler 执行期间产生且尚未被处理的错误。
    pub fn error(&self) -> Option<&InvokerError> {
        self.error.as_ref()
    }

    /// 取走错误，视为已处理。
    pub fn take_error(&mut self) -> Option<InvokerError> {
        self.error.take()
    }

    pub fn is_short_circuited(&self) -> bool {
        self.short_circuited_by.is_some()
    }

    /// 短路者的名称。
    pub fn short_circuited_by(&self) -> Option<&str> {
        self.short_circuited_by.as_deref()
    }

    fn mark_short_circuit(&mut self, filter: &str) {
        if self.short_circuited_by.is_none() {
            self.short_circuited_by = Some(filter.to_owned());
        }
    }

    /// 转换为调用结果；仍有未处理的错误时返回该错误。
    pub fn into_outcome(self) -> Result<InvocationOutcome> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(InvocationOutcome {
                result: self.result,
                short_circuited_by: self.short_circuited_by,
            }),
        }
    }
}

/// 一次页面调用的最终产出。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationOutcome {
    pub result: Option<HandlerResult>,
    pub short_circuited_by: Option<String>,
}

impl InvocationOutcome {
    pub fn is_short_circuited(&self) -> bool {
        self.short_circuited_by.is_some()
    }
}

struct PipelineState {
    cursor: FilterCursor,
    handler: Option<Box<dyn Handler>>,
    handler_invoked: bool,
}

/// 管线剩余部分的延续。
///
/// - **契约 (What)**：`run` 按值消耗自身，同一个延续至多推进一次；不调用即为短路。
pub struct Next<'a> {
    state: &'a mut PipelineState,
    invocation: &'a InvocationContext,
}

impl<'a> Next<'a> {
    /// 驱动内层过滤器与 Handler，返回其执行结果。
    pub fn run(self) -> BoxFuture<'a, Result<HandlerExecutedContext>> {
        invoke_next(self.state, self.invocation)
    }

    /// 剩余尚未经过的过滤器数。
    pub fn remaining(&self) -> usize {
        self.state.cursor.len() - self.state.cursor.position()
    }
}

impl fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Next")
            .field("cursor", &self.state.cursor)
            .field("handler_invoked", &self.state.handler_invoked)
            .finish()
    }
}

fn invoke_next<'a>(
    state: &'a mut PipelineState,
    invocation: &'a InvocationContext,
) -> BoxFuture<'a, Result<HandlerExecutedContext>> {
    Box::pin(async move {
        loop {
            let item = state.cursor.next_filter::<SyncPage, AsyncPage>();
            if item.is_terminal() {
                return execute_handler(state, invocation).await;
            }

            let (index, filter, filter_async) = item.into_parts();
            if let Some(filter) = filter_async {
                let mut executing = HandlerExecutingContext::new(invocation);
                let next = Next {
                    state: &mut *state,
                    invocation,
                };
                let mut executed = filter.on_handler_execution(&mut executing, next).await?;
                if !state.handler_invoked {
                    executed.mark_short_circuit(filter.name());
                }
                return Ok(executed);
            }

            if let Some(filter) = filter {
                let mut executing = HandlerExecutingContext::new(invocation);
                filter.on_handler_executing(&mut executing)?;
                if let Some(result) = executing.take_result() {
                    let mut executed = HandlerExecutedContext::short_circuit(result);
                    executed.mark_short_circuit(filter.name());
                    return Ok(executed);
                }

                let mut executed = invoke_next(&mut *state, invocation).await?;
                filter.on_handler_executed(&mut executed)?;
                return Ok(executed);
            }

            trace!(index, "filter offers no page capability; skipped");
        }
    })
}

async fn execute_handler(
    state: &mut PipelineState,
    invocation: &InvocationContext,
) -> Result<HandlerExecutedContext> {
    let descriptor = invocation.descriptor();
    let Some(handler) = state.handler.as_mut() else {
        return Err(InvokerError::Handler {
            handler: descriptor.display_name().to_owned(),
            detail: "handler instance is no longer available".into(),
        });
    };

    state.handler_invoked = true;
    let mut executed = HandlerExecutedContext::default();
    match handler.execute(invocation).await {
        Ok(result) => executed.result = Some(result),
        Err(error) => {
            trace!(descriptor = %descriptor.id(), %error, "handler failed");
            executed.error = Some(error);
        }
    }
    Ok(executed)
}

/// 一次调用独占的管线；析构时释放 Handler。
struct PagePipeline {
    plan: Arc<ExecutionPlan>,
    invocation: InvocationContext,
    state: PipelineState,
}

impl Drop for PagePipeline {
    fn drop(&mut self) {
        if let Some(handler) = self.state.handler.take() {
            self.plan.disposer().dispose(&self.invocation, handler);
        }
    }
}

/// 绑定了执行计划与请求上下文的页面调用器。
#[derive(Clone, Debug)]
pub struct PageActionInvoker {
    plan: Arc<ExecutionPlan>,
    invocation: InvocationContext,
}

impl PageActionInvoker {
    pub fn new(plan: Arc<ExecutionPlan>, invocation: InvocationContext) -> Self {
        Self { plan, invocation }
    }

    pub fn plan(&self) -> &Arc<ExecutionPlan> {
        &self.plan
    }

    pub fn invocation(&self) -> &InvocationContext {
        &self.invocation
    }

    /// 执行一次页面调用。
    ///
    /// # 契约说明
    /// - **错误**：过滤器列表物化失败、Handler 实例化失败、过滤器返回 `Err`，或 Handler 错误未被任何
    ///   过滤器处理时返回 `Err`；
    /// - **后置条件**：已实例化的 Handler 必定经过销毁器，包括返回 `Err` 与 future 被提前丢弃的情形。
    pub async fn invoke(self) -> Result<InvocationOutcome> {
        let cursor = self.plan.cursor(&self.invocation)?;
        let handler = self.plan.factory().create(&self.invocation)?;

        let mut pipeline = PagePipeline {
            plan: self.plan,
            invocation: self.invocation,
            state: PipelineState {
                cursor,
                handler: Some(handler),
                handler_invoked: false,
            },
        };
        let PagePipeline {
            invocation, state, ..
        } = &mut pipeline;
        let executed = invoke_next(state, invocation).await?;
        executed.into_outcome()
    }
}

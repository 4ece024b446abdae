//! 页面调用：过滤器协议分派、短路、错误处理与 Handler 生命周期。

mod support;

use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::executor::block_on;
use spark_invoker::{
    ActionDescriptor, AsyncPageFilter, DefaultFilterProvider, Filter, FilterDescriptor,
    FilterScope, HandlerExecutedContext, HandlerExecutingContext, HandlerResult,
    InvocationContext, InvokerError, InvokerOptions, InvokerProvider, Next, PageActionInvoker,
    PageFilter, PageInvokerProvider, Result, create_invoker,
};
use support::{EventLog, Fixture, Script};

/// 同步过滤器：记录前后钩子，可选择短路或处理 Handler 错误。
struct Recording {
    label: &'static str,
    log: EventLog,
    short_circuit: Option<HandlerResult>,
    recover: bool,
}

impl Recording {
    fn new(label: &'static str, log: &EventLog) -> Self {
        Self {
            label,
            log: log.clone(),
            short_circuit: None,
            recover: false,
        }
    }
}

impl Filter for Recording {
    fn name(&self) -> &str {
        self.label
    }

    fn as_page_filter(self: Arc<Self>) -> Option<Arc<dyn PageFilter>> {
        Some(self)
    }
}

impl PageFilter for Recording {
    fn on_handler_executing(&self, context: &mut HandlerExecutingContext<'_>) -> Result<()> {
        self.log.push(format!("{}:executing", self.label));
        if let Some(result) = &self.short_circuit {
            context.set_result(result.clone());
        }
        Ok(())
    }

    fn on_handler_executed(&self, context: &mut HandlerExecutedContext) -> Result<()> {
        self.log.push(format!("{}:executed", self.label));
        if self.recover && context.take_error().is_some() {
            context.set_result(HandlerResult::Status(500));
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum AroundMode {
    Proceed,
    ShortCircuit,
    Stall,
}

/// 异步过滤器：以延续方式包裹剩余管线。
struct Around {
    label: &'static str,
    log: EventLog,
    mode: AroundMode,
}

impl Filter for Around {
    fn name(&self) -> &str {
        self.label
    }

    fn as_async_page_filter(self: Arc<Self>) -> Option<Arc<dyn AsyncPageFilter>> {
        Some(self)
    }
}

#[async_trait]
impl AsyncPageFilter for Around {
    async fn on_handler_execution(
        &self,
        _context: &mut HandlerExecutingContext<'_>,
        next: Next<'_>,
    ) -> Result<HandlerExecutedContext> {
        self.log.push(format!("{}:before", self.label));
        match self.mode {
            AroundMode::Proceed => {
                let executed = next.run().await?;
                self.log.push(format!("{}:after", self.label));
                Ok(executed)
            }
            AroundMode::ShortCircuit => Ok(HandlerExecutedContext::short_circuit(
                HandlerResult::Redirect("/login".into()),
            )),
            AroundMode::Stall => {
                futures::future::pending::<()>().await;
                next.run().await
            }
        }
    }
}

/// 同时实现两种协议的过滤器，各自记录被调用的钩子。
struct DualProtocol {
    log: EventLog,
}

impl Filter for DualProtocol {
    fn name(&self) -> &str {
        "dual"
    }

    fn as_page_filter(self: Arc<Self>) -> Option<Arc<dyn PageFilter>> {
        Some(self)
    }

    fn as_async_page_filter(self: Arc<Self>) -> Option<Arc<dyn AsyncPageFilter>> {
        Some(self)
    }
}

impl PageFilter for DualProtocol {
    fn on_handler_executing(&self, _context: &mut HandlerExecutingContext<'_>) -> Result<()> {
        self.log.push("dual:sync-executing");
        Ok(())
    }

    fn on_handler_executed(&self, _context: &mut HandlerExecutedContext) -> Result<()> {
        self.log.push("dual:sync-executed");
        Ok(())
    }
}

#[async_trait]
impl AsyncPageFilter for DualProtocol {
    async fn on_handler_execution(
        &self,
        _context: &mut HandlerExecutingContext<'_>,
        next: Next<'_>,
    ) -> Result<HandlerExecutedContext> {
        self.log.push("dual:async-before");
        let executed = next.run().await?;
        self.log.push("dual:async-after");
        Ok(executed)
    }
}

/// 在执行阶段直接失败的过滤器。
struct Broken;

impl Filter for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn as_page_filter(self: Arc<Self>) -> Option<Arc<dyn PageFilter>> {
        Some(self)
    }
}

impl PageFilter for Broken {
    fn on_handler_executing(&self, _context: &mut HandlerExecutingContext<'_>) -> Result<()> {
        Err(InvokerError::Filter {
            filter: "broken".into(),
            detail: "refused".into(),
        })
    }

    fn on_handler_executed(&self, _context: &mut HandlerExecutedContext) -> Result<()> {
        Ok(())
    }
}

struct Inert;

impl Filter for Inert {}

fn invoker_for(filters: Vec<Arc<dyn Filter>>, script: Script) -> (Fixture, PageActionInvoker) {
    let descriptor = Arc::new(ActionDescriptor::page("/index", "index").with_filters(
        filters
            .into_iter()
            .map(|filter| FilterDescriptor::instance(filter, FilterScope::Action)),
    ));
    let fixture = Fixture::with(
        vec![Arc::clone(&descriptor)],
        script,
        vec![Arc::new(DefaultFilterProvider)],
        InvokerOptions::default(),
    );
    let plan = fixture.cache.resolve_descriptor(&descriptor).expect("构建应成功");
    (fixture, PageActionInvoker::new(plan, InvocationContext::new(descriptor)))
}

#[test]
fn filters_wrap_handler_in_declared_order() {
    let log = EventLog::default();
    let (fixture, invoker) = invoker_for(
        vec![
            Arc::new(Recording::new("outer", &log)),
            Arc::new(Around {
                label: "middle",
                log: log.clone(),
                mode: AroundMode::Proceed,
            }),
            Arc::new(Inert),
            Arc::new(Recording::new("inner", &log)),
        ],
        Script::Return(HandlerResult::Content("hello".into())),
    );

    let outcome = block_on(invoker.invoke()).expect("调用应成功");
    assert_eq!(outcome.result, Some(HandlerResult::Content("hello".into())));
    assert!(!outcome.is_short_circuited());

    assert_eq!(
        log.events(),
        [
            "outer:executing",
            "middle:before",
            "inner:executing",
            "inner:executed",
            "middle:after",
            "outer:executed",
        ]
    );
    assert_eq!(fixture.log.events(), ["create", "handler", "dispose"]);
}

#[test]
fn sync_short_circuit_skips_handler_and_own_executed() {
    let log = EventLog::default();
    let mut auth = Recording::new("auth", &log);
    auth.short_circuit = Some(HandlerResult::Status(401));
    let (fixture, invoker) = invoker_for(
        vec![
            Arc::new(Recording::new("outer", &log)),
            Arc::new(auth),
            Arc::new(Recording::new("inner", &log)),
        ],
        Script::Return(HandlerResult::Page),
    );

    let outcome = block_on(invoker.invoke()).expect("短路不是错误");
    assert_eq!(outcome.result, Some(HandlerResult::Status(401)));
    assert_eq!(outcome.short_circuited_by.as_deref(), Some("auth"));
    assert_eq!(
        log.events(),
        ["outer:executing", "auth:executing", "outer:executed"]
    );
    assert_eq!(fixture.log.events(), ["create", "dispose"]);
}

#[test]
fn async_filter_short_circuits_by_not_calling_next() {
    let log = EventLog::default();
    let (fixture, invoker) = invoker_for(
        vec![
            Arc::new(Around {
                label: "gate",
                log: log.clone(),
                mode: AroundMode::ShortCircuit,
            }),
            Arc::new(Recording::new("inner", &log)),
        ],
        Script::Return(HandlerResult::Page),
    );

    let outcome = block_on(invoker.invoke()).expect("短路不是错误");
    assert_eq!(outcome.result, Some(HandlerResult::Redirect("/login".into())));
    assert_eq!(outcome.short_circuited_by.as_deref(), Some("gate"));
    assert_eq!(log.events(), ["gate:before"]);
    assert_eq!(fixture.log.events(), ["create", "dispose"]);
}

#[test]
fn dual_protocol_filter_runs_async_hook_only() {
    let log = EventLog::default();
    let (fixture, invoker) = invoker_for(
        vec![Arc::new(DualProtocol { log: log.clone() })],
        Script::Return(HandlerResult::Page),
    );

    let outcome = block_on(invoker.invoke()).expect("调用应成功");
    assert_eq!(outcome.result, Some(HandlerResult::Page));
    assert!(!outcome.is_short_circuited());
    assert_eq!(log.events(), ["dual:async-before", "dual:async-after"]);
    assert_eq!(fixture.log.events(), ["create", "handler", "dispose"]);
}

#[test]
fn unhandled_handler_error_is_returned_after_filters_observe_it() {
    let log = EventLog::default();
    let (fixture, invoker) = invoker_for(
        vec![Arc::new(Recording::new("observer", &log))],
        Script::Fail("database offline"),
    );

    let err = block_on(invoker.invoke()).expect_err("未处理的 Handler 错误必须返回");
    assert_eq!(
        err,
        InvokerError::Handler {
            handler: "/index".into(),
            detail: "database offline".into(),
        }
    );
    assert_eq!(log.events(), ["observer:executing", "observer:executed"]);
    assert_eq!(fixture.log.events(), ["create", "handler", "dispose"]);
}

#[test]
fn filter_can_recover_from_handler_error() {
    let log = EventLog::default();
    let mut recovering = Recording::new("recover", &log);
    recovering.recover = true;
    let (_fixture, invoker) = invoker_for(
        vec![Arc::new(recovering)],
        Script::Fail("boom"),
    );

    let outcome = block_on(invoker.invoke()).expect("错误已被处理");
    assert_eq!(outcome.result, Some(HandlerResult::Status(500)));
}

#[test]
fn filter_error_aborts_pipeline_and_still_disposes() {
    let log = EventLog::default();
    let (fixture, invoker) = invoker_for(
        vec![Arc::new(Recording::new("outer", &log)), Arc::new(Broken)],
        Script::Return(HandlerResult::Page),
    );

    let err = block_on(invoker.invoke()).expect_err("过滤器错误必须冒泡");
    assert_eq!(err.code(), "invoker.filter.execute");
    assert_eq!(log.events(), ["outer:executing"]);
    assert_eq!(fixture.log.events(), ["create", "dispose"]);
}

#[test]
fn dropped_invocation_disposes_handler() {
    let log = EventLog::default();
    let (fixture, invoker) = invoker_for(
        vec![Arc::new(Around {
            label: "stall",
            log: log.clone(),
            mode: AroundMode::Stall,
        })],
        Script::Return(HandlerResult::Page),
    );

    assert!(invoker.invoke().now_or_never().is_none());
    assert_eq!(log.events(), ["stall:before"]);
    assert_eq!(fixture.log.events(), ["create", "dispose"]);
}

#[test]
fn page_provider_ignores_action_descriptors() {
    let page = Arc::new(ActionDescriptor::page("/index", "index"));
    let action = Arc::new(ActionDescriptor::action("/api/orders", "api/orders"));
    let options = InvokerOptions {
        provider_order: -10,
        ..InvokerOptions::default()
    };
    let fixture = Fixture::with(
        vec![Arc::clone(&page), Arc::clone(&action)],
        Script::Return(HandlerResult::Page),
        Vec::new(),
        options,
    );

    let provider = PageInvokerProvider::new(Arc::clone(&fixture.cache));
    assert_eq!(provider.order(), -10);
    let providers: Vec<Arc<dyn InvokerProvider>> = vec![Arc::new(provider)];

    let none = create_invoker(&providers, InvocationContext::new(action)).expect("无需构建");
    assert!(none.is_none());
    assert_eq!(fixture.loader.loads(), 0);

    let invoker = create_invoker(&providers, InvocationContext::new(Arc::clone(&page)))
        .expect("页面描述符应被认领")
        .expect("应返回调用器");
    assert!(Arc::ptr_eq(invoker.plan().descriptor(), &page));

    let outcome = block_on(invoker.invoke()).expect("调用应成功");
    assert_eq!(outcome.result, Some(HandlerResult::Page));
}

//! 集成测试共用的协作者桩。
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use spark_invoker::{
    ActionDescriptor, CompiledDescriptor, FilterProvider, Handler, HandlerDisposer,
    HandlerFactory, HandlerFactoryProvider, HandlerLoader, HandlerResult, HandlerTypeMetadata,
    InMemoryDescriptorRegistry, InvocationContext, InvokerCache, InvokerError, InvokerOptions,
    Result,
};

/// 按发生顺序记录事件。
#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().expect("日志锁不应中毒").push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().expect("日志锁不应中毒").clone()
    }
}

/// 计数加载器，可切换为失败模式。
#[derive(Default)]
pub struct StubLoader {
    loads: AtomicUsize,
    failing: AtomicBool,
}

impl StubLoader {
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

impl HandlerLoader for StubLoader {
    fn load(&self, descriptor: &ActionDescriptor) -> Result<HandlerTypeMetadata> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(InvokerError::HandlerLoad {
                descriptor: descriptor.id().to_string(),
                detail: "compiled type unavailable".into(),
            });
        }
        Ok(HandlerTypeMetadata::new(descriptor.display_name())
            .with_property("Model", format!("{}Model", descriptor.display_name())))
    }
}

/// Handler 的脚本化行为。
#[derive(Clone, Debug)]
pub enum Script {
    Return(HandlerResult),
    Fail(&'static str),
}

struct ScriptedHandler {
    name: String,
    script: Script,
    log: EventLog,
}

#[async_trait]
impl Handler for ScriptedHandler {
    async fn execute(&mut self, _context: &InvocationContext) -> Result<HandlerResult> {
        self.log.push("handler");
        match &self.script {
            Script::Return(result) => Ok(result.clone()),
            Script::Fail(detail) => Err(InvokerError::Handler {
                handler: self.name.clone(),
                detail: (*detail).to_owned(),
            }),
        }
    }
}

/// 产出脚本化 Handler，并记录实例化与销毁事件。
pub struct ScriptedFactories {
    script: Script,
    log: EventLog,
}

impl ScriptedFactories {
    pub fn new(script: Script, log: EventLog) -> Self {
        Self { script, log }
    }
}

impl HandlerFactoryProvider for ScriptedFactories {
    fn create_factory(&self, compiled: &Arc<CompiledDescriptor>) -> Result<HandlerFactory> {
        let name = compiled.handler_type().type_name().to_owned();
        let script = self.script.clone();
        let log = self.log.clone();
        Ok(HandlerFactory::new(move |_| {
            log.push("create");
            Ok(Box::new(ScriptedHandler {
                name: name.clone(),
                script: script.clone(),
                log: log.clone(),
            }) as Box<dyn Handler>)
        }))
    }

    fn create_disposer(&self, _compiled: &Arc<CompiledDescriptor>) -> Result<HandlerDisposer> {
        let log = self.log.clone();
        Ok(HandlerDisposer::new(move |_, handler| {
            log.push("dispose");
            drop(handler);
        }))
    }
}

/// 组装好的缓存及其协作者。
pub struct Fixture {
    pub registry: Arc<InMemoryDescriptorRegistry>,
    pub loader: Arc<StubLoader>,
    pub log: EventLog,
    pub cache: Arc<InvokerCache>,
}

impl Fixture {
    pub fn new(descriptors: Vec<Arc<ActionDescriptor>>) -> Self {
        Self::with(
            descriptors,
            Script::Return(HandlerResult::Page),
            Vec::new(),
            InvokerOptions::default(),
        )
    }

    pub fn with(
        descriptors: Vec<Arc<ActionDescriptor>>,
        script: Script,
        filter_providers: Vec<Arc<dyn FilterProvider>>,
        options: InvokerOptions,
    ) -> Self {
        let registry = Arc::new(InMemoryDescriptorRegistry::with_descriptors(descriptors));
        let loader = Arc::new(StubLoader::default());
        let log = EventLog::default();
        let cache = Arc::new(InvokerCache::new(
            registry.clone(),
            loader.clone(),
            Arc::new(ScriptedFactories::new(script, log.clone())),
            filter_providers,
            options,
        ));
        Self {
            registry,
            loader,
            log,
            cache,
        }
    }
}

pub fn page(id: &str) -> Arc<ActionDescriptor> {
    Arc::new(ActionDescriptor::page(id, id.trim_start_matches('/')))
}

//! 版本化调用计划缓存。
//!
//! # 教案式说明
//! - **意图（Why）**：每个请求都需要“描述符 → 执行计划”的映射，而构建计划涉及类型解析、工厂构造与
//!   过滤器聚合，代价较高；缓存让同一版本下的重复请求只做一次哈希查找；
//! - **逻辑（How）**：
//!   1. `ArcSwap<CacheGeneration>` 持有当前世代，读路径无锁；
//!   2. 每次解析都重新读取注册表版本，仅当它比当前世代更新时，以 `compare_and_swap` 发布新的空世代；
//!      读到的版本比当前世代旧时说明本线程落后，重新读取而不是回退；
//!   3. 世代内部使用 `DashMap` 的 entry API 做“缺席才插入”，先写者胜出，后到者丢弃自己的构建；
//! - **契约（What）**：
//!   - 同一 (描述符, 世代) 至多一个对外可见的计划；
//!   - 世代版本只增不减；
//!   - 构建失败原样返回调用方，不写入任何条目，下次解析重试；
//!   - 旧世代被替换后由仍持有它的请求自然释放，不会被原地修改。

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, trace, warn};

use crate::config::InvokerOptions;
use crate::context::InvocationContext;
use crate::descriptor::{ActionDescriptor, DescriptorId};
use crate::error::Result;
use crate::filter::{FilterFactory, FilterProvider};
use crate::handler::{CompiledDescriptor, HandlerFactoryProvider, HandlerLoader};
use crate::plan::ExecutionPlan;
use crate::registry::DescriptorRegistry;

/// 缓存的一个世代：版本号 + 并发映射。
///
/// - **契约 (What)**：条目只增不改；`version` 为 `None` 表示尚未与任何注册表版本对齐的初始世代。
#[derive(Debug)]
pub struct CacheGeneration {
    version: Option<u64>,
    entries: DashMap<DescriptorId, Arc<ExecutionPlan>>,
}

impl CacheGeneration {
    fn new(version: Option<u64>) -> Self {
        Self {
            version,
            entries: DashMap::new(),
        }
    }

    /// 该世代对齐的注册表版本，初始世代为 `None`。
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// 世代内已发布的计划数。
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 世代内是否尚无计划。
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 查找已发布的计划。
    pub fn get(&self, id: &DescriptorId) -> Option<Arc<ExecutionPlan>> {
        self.entries.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// 缺席才插入，返回最终对外可见的计划。
    pub fn get_or_insert(&self, id: DescriptorId, plan: Arc<ExecutionPlan>) -> Arc<ExecutionPlan> {
        match self.entries.entry(id) {
            Entry::Occupied(existing) => {
                trace!(descriptor = %existing.key(), "redundant build discarded");
                Arc::clone(existing.get())
            }
            Entry::Vacant(slot) => Arc::clone(slot.insert(plan).value()),
        }
    }
}

/// 描述符到执行计划的版本化缓存。
///
/// # 教案式说明
/// - **意图 (Why)**：读路径零锁、写路径整世代替换，请求线程之间互不阻塞；
/// - **契约 (What)**：
///   - [`Self::resolve`] 在同一注册表版本下对同一描述符总是返回同一个 `Arc`；
///   - 注册表版本变化后的第一次解析必然重新构建；
///   - 构建并发进行、可能重复，但不会阻塞等待其他线程。
pub struct InvokerCache {
    registry: Arc<dyn DescriptorRegistry>,
    loader: Arc<dyn HandlerLoader>,
    factory_provider: Arc<dyn HandlerFactoryProvider>,
    filter_providers: Arc<[Arc<dyn FilterProvider>]>,
    options: InvokerOptions,
    generation: ArcSwap<CacheGeneration>,
}

impl InvokerCache {
    /// 组装缓存；初始世代未与任何注册表版本对齐，首次解析时发布。
    pub fn new(
        registry: Arc<dyn DescriptorRegistry>,
        loader: Arc<dyn HandlerLoader>,
        factory_provider: Arc<dyn HandlerFactoryProvider>,
        filter_providers: impl IntoIterator<Item = Arc<dyn FilterProvider>>,
        options: InvokerOptions,
    ) -> Self {
        Self {
            registry,
            loader,
            factory_provider,
            filter_providers: filter_providers.into_iter().collect(),
            options,
            generation: ArcSwap::from_pointee(CacheGeneration::new(None)),
        }
    }

    /// 构建计划时使用的配置。
    pub fn options(&self) -> &InvokerOptions {
        &self.options
    }

    /// 当前世代的快照。
    pub fn current_generation(&self) -> Arc<CacheGeneration> {
        self.generation.load_full()
    }

    /// 当前世代对应的注册表版本。
    pub fn version(&self) -> Option<u64> {
        self.generation.load().version
    }

    /// 当前世代内已发布的计划数。
    pub fn len(&self) -> usize {
        self.generation.load().len()
    }

    /// 当前世代是否尚无计划。
    pub fn is_empty(&self) -> bool {
        self.generation.load().is_empty()
    }

    /// 解析本次请求命中的描述符对应的执行计划。
    ///
    /// # 契约说明
    /// - **前置条件**：`context.descriptor()` 来自注册表；
    /// - **返回**：命中时返回已发布的计划；未命中时构建并以“缺席才插入”发布，
    ///   竞争失败则返回胜出者的计划；
    /// - **错误**：构建失败时返回错误，缓存保持不变。
    pub fn resolve(&self, context: &InvocationContext) -> Result<Arc<ExecutionPlan>> {
        let generation = self.generation_for_registry();
        self.resolve_in(&generation, context)
    }

    /// 以描述符本身为上下文解析计划。
    pub fn resolve_descriptor(
        &self,
        descriptor: &Arc<ActionDescriptor>,
    ) -> Result<Arc<ExecutionPlan>> {
        self.resolve(&InvocationContext::new(Arc::clone(descriptor)))
    }

    /// 为注册表当前集合中的全部页面描述符构建计划，返回当前世代内的计划数。
    ///
    /// - **错误**：遇到第一个构建失败即返回，之前已构建的计划保留。
    pub fn prewarm(&self) -> Result<usize> {
        let generation = self.generation_for_registry();
        let descriptors = self.registry.current_descriptors();
        for descriptor in descriptors.items().iter().filter(|d| d.is_page()) {
            self.resolve_in(&generation, &InvocationContext::new(Arc::clone(descriptor)))?;
        }
        Ok(generation.len())
    }

    /// 返回与注册表当前版本对齐的世代，必要时发布新世代。
    fn generation_for_registry(&self) -> Arc<CacheGeneration> {
        loop {
            let version = self.registry.current_version();
            let current = self.generation.load_full();
            if current.version == Some(version) {
                return current;
            }
            if current.version.is_some_and(|published| published > version) {
                // 本线程读到的注册表版本已落后于已发布世代，不得回退；重新读取。
                trace!(stale = version, published = ?current.version, "stale registry read");
                continue;
            }

            let fresh = Arc::new(CacheGeneration::new(Some(version)));
            let previous = self.generation.compare_and_swap(&current, Arc::clone(&fresh));
            if Arc::ptr_eq(&*previous, &current) {
                debug!(previous = ?current.version, version, "cache generation swapped");
                if self.options.prewarm_on_reload {
                    self.prewarm_generation(&fresh);
                }
                return fresh;
            }
            // 其他线程已发布世代：重新读取注册表版本后再比较。
        }
    }

    fn prewarm_generation(&self, generation: &CacheGeneration) {
        let descriptors = self.registry.current_descriptors();
        for descriptor in descriptors.items().iter().filter(|d| d.is_page()) {
            let context = InvocationContext::new(Arc::clone(descriptor));
            if let Err(error) = self.resolve_in(generation, &context) {
                warn!(descriptor = %descriptor.id(), %error, "prewarm build failed");
            }
        }
    }

    fn resolve_in(
        &self,
        generation: &CacheGeneration,
        context: &InvocationContext,
    ) -> Result<Arc<ExecutionPlan>> {
        let id = context.descriptor().id();
        if let Some(plan) = generation.get(id) {
            return Ok(plan);
        }

        debug!(descriptor = %id, version = ?generation.version, "invoker cache miss");
        let plan = self.build_plan(context).inspect_err(|error| {
            warn!(descriptor = %id, %error, "execution plan build failed");
        })?;
        Ok(generation.get_or_insert(id.clone(), Arc::new(plan)))
    }

    fn build_plan(&self, context: &InvocationContext) -> Result<ExecutionPlan> {
        let descriptor = context.descriptor();
        let handler_type = self.loader.load(descriptor)?;
        let compiled = Arc::new(CompiledDescriptor::compile(
            Arc::clone(descriptor),
            handler_type,
            &self.options.model_property,
        ));
        let factory = self.factory_provider.create_factory(&compiled)?;
        let disposer = self.factory_provider.create_disposer(&compiled)?;
        let filter_factory = FilterFactory::build(&self.filter_providers, context)?;
        Ok(ExecutionPlan::new(compiled, factory, disposer, filter_factory))
    }
}

impl std::fmt::Debug for InvokerCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokerCache")
            .field("version", &self.version())
            .field("entries", &self.len())
            .field("filter_providers", &self.filter_providers.len())
            .field("options", &self.options)
            .finish()
    }
}
